//! Tags and style schemes.
//!
//! A tag is a named marker applied over character ranges of a [`TextModel`](crate::TextModel).
//! Tags carry an optional *style name* (for example `def:comment`); the visual [`Style`] is
//! resolved lazily against the active [`StyleScheme`], so switching schemes never requires
//! re-applying tags.

use crate::region::Region;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

/// Prefix of tags that mark context classes (`context-class:string`, ...).
pub const CONTEXT_CLASS_PREFIX: &str = "context-class:";

/// Handle of a tag in a [`TagTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(pub(crate) usize);

impl TagId {
    /// Raw index of the tag in its table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Visual attributes of a style.
///
/// Colors are kept as strings (`#rrggbb` or a color name); interpreting them is up to the
/// renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    /// Foreground color.
    pub foreground: Option<String>,
    /// Background color.
    pub background: Option<String>,
    /// Bold weight.
    pub bold: bool,
    /// Italic slant.
    pub italic: bool,
    /// Underline.
    pub underline: bool,
    /// Strikethrough.
    pub strikethrough: bool,
}

impl Style {
    /// Style with only a foreground color.
    pub fn fg(color: impl Into<String>) -> Self {
        Self {
            foreground: Some(color.into()),
            ..Self::default()
        }
    }

    /// Builder: set the background color.
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Builder: make the style bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Builder: make the style italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// A named mapping from style names to [`Style`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleScheme {
    id: String,
    name: String,
    styles: HashMap<String, Style>,
}

impl StyleScheme {
    /// Create an empty scheme.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            styles: HashMap::new(),
        }
    }

    /// Builder: add (or replace) a style.
    pub fn with_style(mut self, style_name: impl Into<String>, style: Style) -> Self {
        self.set_style(style_name, style);
        self
    }

    /// Add (or replace) a style.
    pub fn set_style(&mut self, style_name: impl Into<String>, style: Style) {
        self.styles.insert(style_name.into(), style);
    }

    /// Scheme identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a style.
    ///
    /// Language specific names (`c:comment`) fall back to the default namespace (`def:comment`)
    /// when the scheme does not define them.
    pub fn style(&self, style_name: &str) -> Option<&Style> {
        if let Some(style) = self.styles.get(style_name) {
            return Some(style);
        }
        let (_, suffix) = style_name.split_once(':')?;
        self.styles.get(&format!("def:{suffix}"))
    }

    /// Number of styles defined by the scheme.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the scheme defines no styles.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// A small light scheme covering the `def:` styles used by the bundled languages.
    pub fn classic() -> Self {
        Self::new("classic", "Classic")
            .with_style("def:comment", Style::fg("#0000ff").italic())
            .with_style("def:string", Style::fg("#ff00ff"))
            .with_style("def:keyword", Style::fg("#a52a2a").bold())
            .with_style("def:type", Style::fg("#2e8b57").bold())
            .with_style("def:number", Style::fg("#ff00ff"))
            .with_style("def:preprocessor", Style::fg("#a020f0"))
            .with_style(
                "bracket-match",
                Style::fg("#ffffff").with_background("#a0a0a0").bold(),
            )
    }
}

/// Explicit registry of style schemes, passed to whoever needs scheme lookup.
#[derive(Debug, Clone, Default)]
pub struct StyleSchemeRegistry {
    schemes: BTreeMap<String, Arc<StyleScheme>>,
}

impl StyleSchemeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled [`StyleScheme::classic`] scheme.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(StyleScheme::classic());
        registry
    }

    /// Register a scheme, replacing any scheme with the same id.
    pub fn register(&mut self, scheme: StyleScheme) -> Arc<StyleScheme> {
        let scheme = Arc::new(scheme);
        self.schemes
            .insert(scheme.id().to_string(), Arc::clone(&scheme));
        scheme
    }

    /// Look up a scheme by id.
    pub fn get(&self, id: &str) -> Option<Arc<StyleScheme>> {
        self.schemes.get(id).cloned()
    }

    /// Remove a scheme. Returns `true` if it was registered.
    pub fn remove(&mut self, id: &str) -> bool {
        self.schemes.remove(id).is_some()
    }

    /// Registered scheme ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.schemes.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct TagEntry {
    name: String,
    style_name: Option<String>,
    ranges: Region,
}

/// Tags of one buffer together with the ranges they are applied to.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    entries: Vec<TagEntry>,
    by_name: HashMap<String, TagId>,
}

impl TagTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table holds no tags.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get or create the tag called `name`.
    ///
    /// When the tag already exists its style name is replaced by `style_name` (if given).
    pub fn create(&mut self, name: &str, style_name: Option<&str>) -> TagId {
        if let Some(&id) = self.by_name.get(name) {
            if let Some(style_name) = style_name {
                self.entries[id.0].style_name = Some(style_name.to_string());
            }
            return id;
        }

        let id = TagId(self.entries.len());
        self.entries.push(TagEntry {
            name: name.to_string(),
            style_name: style_name.map(str::to_string),
            ranges: Region::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Find a tag by name.
    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    /// Tag name.
    pub fn name(&self, tag: TagId) -> Option<&str> {
        self.entries.get(tag.0).map(|entry| entry.name.as_str())
    }

    /// Style name the tag resolves through.
    pub fn style_name(&self, tag: TagId) -> Option<&str> {
        self.entries.get(tag.0)?.style_name.as_deref()
    }

    /// Applied ranges of a tag.
    pub fn ranges(&self, tag: TagId) -> Option<&Region> {
        self.entries.get(tag.0).map(|entry| &entry.ranges)
    }

    pub(crate) fn ranges_mut(&mut self, tag: TagId) -> Option<&mut Region> {
        self.entries.get_mut(tag.0).map(|entry| &mut entry.ranges)
    }

    /// Tags covering `offset`, in creation order.
    pub fn tags_at(&self, offset: usize) -> Vec<TagId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.ranges.contains(offset))
            .map(|(idx, _)| TagId(idx))
            .collect()
    }

    /// Iterate over all tags.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        (0..self.entries.len()).map(TagId)
    }

    pub(crate) fn shift_for_insertion(&mut self, offset: usize, len: usize) {
        for entry in &mut self.entries {
            entry.ranges.shift_for_insertion(offset, len);
        }
    }

    pub(crate) fn shift_for_deletion(&mut self, start: usize, end: usize) {
        for entry in &mut self.entries {
            entry.ranges.shift_for_deletion(start, end);
        }
    }
}

/// Collect the ranges of a region as `Range<usize>`s.
pub(crate) fn region_ranges(region: &Region) -> Vec<Range<usize>> {
    region.iter().map(|interval| interval.range()).collect()
}
