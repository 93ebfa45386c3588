//! The incremental highlighting engine.
//!
//! [`HighlightEngine`] keeps three pieces of state per attached buffer:
//!
//! - the [`DelimiterTable`], analyzed lazily in time-sliced batches
//! - the *refresh* region: text whose styling is stale
//! - the *requests* region: ranges someone asked to see highlighted that could not be served yet
//!
//! Edits only rescan the lines they touch. Styling is applied on demand: a range is highlighted
//! when requested and only once the table covers it.

use crate::config::EngineConfig;
use crate::delimiters::{DelimiterTable, Edit, Frontier};
use crate::error::PatternError;
use crate::language::{Language, PatternDef};
use crate::pattern::{Pattern, SimplePattern, SyntaxKey, SyntaxPattern, compile};
use crate::scan::{CharIndex, Scanner, line_boundary, next_boundary, next_line_start};
use sourcebuf_core::{BufferId, EditObserver, Region, TagId, TextModel};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, trace, warn};

type Listener = Box<dyn FnMut(Range<usize>)>;

/// Regex-driven, incremental syntax highlighter.
pub struct HighlightEngine {
    config: EngineConfig,
    patterns: Vec<Pattern>,
    next_key: u32,
    escape_char: Option<char>,
    table: DelimiterTable,
    refresh: Region,
    requests: Region,
    batch_size: usize,
    attached: Option<BufferId>,
    buffer_len: usize,
    pattern_tags: HashMap<String, TagId>,
    class_tags: HashMap<String, TagId>,
    stale_tags: Vec<TagId>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for HighlightEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightEngine")
            .field("config", &self.config)
            .field("patterns", &self.patterns.len())
            .field("escape_char", &self.escape_char)
            .field("frontier", &self.table.frontier())
            .field("delimiters", &self.table.len())
            .field("refresh", &self.refresh)
            .field("requests", &self.requests)
            .field("batch_size", &self.batch_size)
            .field("attached", &self.attached)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for HighlightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightEngine {
    /// Engine with the default configuration and no patterns.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let batch_size = config.clamp_batch(config.initial_batch);
        let mut table = DelimiterTable::new();
        table.reset(true);
        Self {
            config,
            patterns: Vec::new(),
            next_key: 0,
            escape_char: None,
            table,
            refresh: Region::new(),
            requests: Region::new(),
            batch_size,
            attached: None,
            buffer_len: 0,
            pattern_tags: HashMap::new(),
            class_tags: HashMap::new(),
            stale_tags: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Engine loaded with `language`.
    pub fn for_language(language: &Language) -> Result<Self, PatternError> {
        let mut engine = Self::new();
        engine.set_language(language)?;
        Ok(engine)
    }

    /// Configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered patterns in registration order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Look up a pattern by id.
    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id() == id)
    }

    /// Escape character used when matching delimiters.
    pub fn escape_char(&self) -> Option<char> {
        self.escape_char
    }

    /// The delimiter table of the attached buffer.
    pub fn delimiter_table(&self) -> &DelimiterTable {
        &self.table
    }

    /// Current adaptive batch size, in characters.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Check if a buffer is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Text whose styling is stale.
    pub fn refresh_region(&self) -> &Region {
        &self.refresh
    }

    /// Requested ranges not highlighted yet.
    pub fn pending_requests(&self) -> &Region {
        &self.requests
    }

    /// Register a listener for "highlight updated" notifications.
    ///
    /// It is called with every range scheduled for re-styling, so views can redraw it.
    pub fn subscribe(&mut self, listener: impl FnMut(Range<usize>) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ------------------------------------------------------------------
    // Pattern registry
    // ------------------------------------------------------------------

    /// Register a simple pattern.
    pub fn add_simple_pattern(&mut self, id: &str, style: &str, regex: &str) -> Result<(), PatternError> {
        self.check_unique(id)?;
        let regex = compile(regex)?;
        self.patterns.push(Pattern::Simple(SimplePattern {
            id: id.to_string(),
            style: style.to_string(),
            regex,
        }));
        debug!(id, "simple pattern added");
        self.refresh_all();
        Ok(())
    }

    /// Register a syntax pattern.
    pub fn add_syntax_pattern(
        &mut self,
        id: &str,
        style: &str,
        start: &str,
        end: &str,
    ) -> Result<(), PatternError> {
        self.add_syntax(id, style, start, end, None)
    }

    /// Register a syntax pattern whose regions belong to context class `class`.
    pub fn add_syntax_pattern_with_class(
        &mut self,
        id: &str,
        style: &str,
        start: &str,
        end: &str,
        class: &str,
    ) -> Result<(), PatternError> {
        self.add_syntax(id, style, start, end, Some(class))
    }

    fn add_syntax(
        &mut self,
        id: &str,
        style: &str,
        start: &str,
        end: &str,
        class: Option<&str>,
    ) -> Result<(), PatternError> {
        self.check_unique(id)?;
        let pattern = self.compile_syntax(id, style, start, end, class)?;
        self.patterns.push(Pattern::Syntax(pattern));
        debug!(id, "syntax pattern added");
        self.invalidate_all();
        Ok(())
    }

    fn check_unique(&self, id: &str) -> Result<(), PatternError> {
        if self.pattern(id).is_some() {
            return Err(PatternError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    fn compile_syntax(
        &mut self,
        id: &str,
        style: &str,
        start: &str,
        end: &str,
        class: Option<&str>,
    ) -> Result<SyntaxPattern, PatternError> {
        let start = compile(start)?;
        let end = compile(end)?;
        let key = SyntaxKey(self.next_key);
        self.next_key += 1;
        Ok(SyntaxPattern {
            id: id.to_string(),
            style: style.to_string(),
            key,
            start,
            end,
            context_class: class.map(str::to_string),
        })
    }

    /// Remove a pattern. Returns `false` if no pattern has this id.
    ///
    /// Its tag leaves the model on the next [`EditObserver::sync_tags`], which
    /// [`SourceBuffer::highlighter_mut`](sourcebuf_core::SourceBuffer::highlighter_mut) issues
    /// when its guard drops.
    pub fn remove_pattern(&mut self, id: &str) -> bool {
        let Some(idx) = self.patterns.iter().position(|p| p.id() == id) else {
            return false;
        };
        let removed = self.patterns.remove(idx);
        if let Some(tag) = self.pattern_tags.remove(id) {
            self.stale_tags.push(tag);
        }
        debug!(id, "pattern removed");
        if removed.is_syntax() {
            self.invalidate_all();
        } else {
            self.refresh_all();
        }
        true
    }

    /// Set (or clear) the escape character used when matching delimiters.
    pub fn set_escape_char(&mut self, escape: Option<char>) {
        if self.escape_char != escape {
            self.escape_char = escape;
            self.invalidate_all();
        }
    }

    /// Replace every pattern and the escape character with `language`'s.
    ///
    /// On error the engine is left unchanged.
    pub fn set_language(&mut self, language: &Language) -> Result<(), PatternError> {
        let mut patterns = Vec::with_capacity(language.patterns().len());
        for def in language.patterns() {
            if patterns.iter().any(|p: &Pattern| p.id() == def.id()) {
                return Err(PatternError::DuplicateId(def.id().to_string()));
            }
            let pattern = match def {
                PatternDef::Simple { id, style, regex } => Pattern::Simple(SimplePattern {
                    id: id.clone(),
                    style: style.clone(),
                    regex: compile(regex)?,
                }),
                PatternDef::Syntax {
                    id,
                    style,
                    start,
                    end,
                    context_class,
                } => Pattern::Syntax(self.compile_syntax(id, style, start, end, context_class.as_deref())?),
            };
            patterns.push(pattern);
        }

        debug!(language = language.id(), patterns = patterns.len(), "language set");
        self.patterns = patterns;
        self.escape_char = language.escape_char();
        self.stale_tags.extend(self.pattern_tags.drain().map(|(_, tag)| tag));
        self.invalidate_all();
        Ok(())
    }

    fn has_syntax_patterns(&self) -> bool {
        self.patterns.iter().any(Pattern::is_syntax)
    }

    // ------------------------------------------------------------------
    // Invalidation and notification
    // ------------------------------------------------------------------

    fn invalidate_all(&mut self) {
        self.table.reset(!self.has_syntax_patterns());
        self.refresh_all();
    }

    fn refresh_all(&mut self) {
        if self.attached.is_some() {
            self.refresh_range(0, self.buffer_len);
        }
    }

    fn refresh_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.refresh.add(start, end);
        for listener in &mut self.listeners {
            listener(start..end);
        }
    }

    fn check_attached(&self, model: &TextModel) -> bool {
        if self.attached == Some(model.id()) {
            return true;
        }
        warn!(buffer = model.id().get(), "notification from a buffer the engine is not attached to");
        false
    }

    // ------------------------------------------------------------------
    // Incremental table maintenance
    // ------------------------------------------------------------------

    fn edited(&mut self, model: &TextModel, edit: Edit) {
        self.buffer_len = model.len_chars();
        match edit {
            Edit::Insert { offset, len } => {
                self.refresh.shift_for_insertion(offset, len);
                self.requests.shift_for_insertion(offset, len);
            }
            Edit::Delete { offset, len } => {
                self.refresh.shift_for_deletion(offset, offset + len);
                self.requests.shift_for_deletion(offset, offset + len);
            }
        }
        self.update_syntax_regions(model, edit);
    }

    /// Rescan the lines touched by `edit` and fix up the delimiter table.
    fn update_syntax_regions(&mut self, model: &TextModel, edit: Edit) {
        let head = model.line_start_of(edit.offset());
        let scan_end = next_line_start(model, edit.end());
        self.refresh_range(head, scan_end);

        if !self.has_syntax_patterns() {
            return;
        }

        if self.table.beyond_frontier(edit) {
            self.table.truncate_old_table(head);
            return;
        }

        let state = self.table.state_before(head);
        let fresh = Scanner::new(model, head, scan_end, self.escape_char).collect(&self.patterns, head, state);
        if !self.table.apply_edit(edit, head, scan_end, &fresh) {
            trace!(head, frontier = ?self.table.frontier(), "rebuild scheduled");
        }
    }

    /// Analyze one batch, extending the table to at least `needed_end`.
    fn build(&mut self, model: &TextModel, needed_end: usize) {
        let Frontier::Pending(start) = self.table.frontier() else {
            return;
        };
        let len = model.len_chars();
        let target = start.saturating_add(self.batch_size).max(needed_end).min(len);
        let end = next_line_start(model, target);
        let began = Instant::now();

        let mut scanner = Scanner::new(model, start, end, self.escape_char);
        let mut pos = start;
        let mut inside = self.table.last_state();
        let mut reused = false;
        while let Some((delimiter, resume)) = scanner.next_delimiter(&self.patterns, pos, inside) {
            if self.table.push_scanned(delimiter, start) {
                reused = true;
                break;
            }
            inside = delimiter.pattern;
            pos = resume;
        }
        if !reused {
            self.table.finish_batch(end, end >= len);
        }

        let elapsed = began.elapsed().as_secs_f64();
        let scanned = end.saturating_sub(start);
        if scanned > 0 {
            let estimate = if elapsed > 0.0 {
                (scanned as f64 * self.config.time_slice.as_secs_f64() / elapsed) as usize
            } else {
                self.config.maximum_batch
            };
            self.batch_size = self.config.clamp_batch(estimate);
        }

        debug!(
            start,
            end,
            reused,
            frontier = ?self.table.frontier(),
            batch_size = self.batch_size,
            "delimiter batch analyzed"
        );
        self.refresh_range(start, end);
    }

    /// Build until the table covers `offset`.
    fn build_until(&mut self, model: &TextModel, offset: usize) {
        while !self.table.frontier().covers(offset) {
            let before = self.table.frontier();
            self.build(model, offset);
            if self.table.frontier() == before {
                warn!(?before, "delimiter analysis made no progress");
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Highlighting
    // ------------------------------------------------------------------

    /// Analyze and style the whole buffer now.
    pub fn highlight_all(&mut self, model: &mut TextModel) {
        let len = model.len_chars();
        self.update_highlight(model, 0, len, true);
    }

    /// Style every stale line intersecting `[start, end)`. The table must cover the range.
    fn ensure_highlighted(&mut self, model: &mut TextModel, start: usize, end: usize) {
        let pending = self.refresh.intersect(start, end);
        for interval in pending.iter() {
            let line_start = model.line_start_of(interval.start);
            let mut line_end = line_boundary(model, interval.end);
            if let Frontier::Pending(frontier) = self.table.frontier() {
                line_end = line_end.min(frontier);
            }
            if line_start < line_end {
                self.highlight_region(model, line_start, line_end);
                self.refresh.subtract(line_start, line_end);
            }
        }
    }

    /// Remove the tags of patterns that are gone and create the tags of new ones.
    fn resolve_tags(&mut self, model: &mut TextModel) {
        for tag in self.stale_tags.drain(..) {
            model.remove_tag_everywhere(tag);
        }
        for pattern in &self.patterns {
            pattern_tag(&mut self.pattern_tags, model, pattern);
        }
    }

    /// Re-apply all engine tags in `[start, end)`.
    fn highlight_region(&mut self, model: &mut TextModel, start: usize, end: usize) {
        trace!(start, end, "highlighting region");
        for tag in self.stale_tags.drain(..) {
            model.remove_tag_everywhere(tag);
        }
        for &tag in self.pattern_tags.values().chain(self.class_tags.values()) {
            model.remove_tag(tag, start, end);
        }

        let text = model.slice(start, end);
        let index = CharIndex::new(&text);
        for (span_start, span_end, inside) in self.table.spans(start, end) {
            match inside {
                Some(key) => {
                    let Some(pattern) = self.patterns.iter().find(|p| p.syntax_key() == Some(key)) else {
                        continue;
                    };
                    let tag = pattern_tag(&mut self.pattern_tags, model, pattern);
                    model.apply_tag(tag, span_start, span_end);
                    if let Pattern::Syntax(syntax) = pattern
                        && let Some(class) = syntax.context_class()
                    {
                        let tag = *self
                            .class_tags
                            .entry(class.to_string())
                            .or_insert_with(|| model.context_class_tag(class));
                        model.apply_tag(tag, span_start, span_end);
                    }
                }
                None => {
                    let matches = simple_matches(&self.patterns, &text, &index, start, span_start, span_end);
                    for (match_start, match_end, idx) in matches {
                        let tag = pattern_tag(&mut self.pattern_tags, model, &self.patterns[idx]);
                        model.apply_tag(tag, match_start, match_end);
                    }
                }
            }
        }
    }

    fn reset_state(&mut self) {
        self.table.reset(!self.has_syntax_patterns());
        self.refresh.clear();
        self.requests.clear();
        self.batch_size = self.config.clamp_batch(self.config.initial_batch);
        self.attached = None;
        self.buffer_len = 0;
    }
}

fn pattern_tag(tags: &mut HashMap<String, TagId>, model: &mut TextModel, pattern: &Pattern) -> TagId {
    *tags
        .entry(pattern.id().to_string())
        .or_insert_with(|| model.create_tag(pattern.id(), Some(pattern.style())))
}

/// Simple pattern matches in `[span_start, span_end)`.
///
/// The nearest match wins; on equal starts the longest, then the first registered. `text` holds
/// the buffer from `base` on. Returns `(start, end, pattern index)` in character offsets.
fn simple_matches(
    patterns: &[Pattern],
    text: &str,
    index: &CharIndex,
    base: usize,
    span_start: usize,
    span_end: usize,
) -> Vec<(usize, usize, usize)> {
    let haystack = &text[..index.char_to_byte(span_end - base)];
    let mut byte = index.char_to_byte(span_start - base);
    let mut next: Vec<Option<Option<(usize, usize)>>> = vec![None; patterns.len()];
    let mut warned = vec![false; patterns.len()];
    let mut matches = Vec::new();

    loop {
        let mut best: Option<(usize, usize, usize)> = None;
        for (i, pattern) in patterns.iter().enumerate() {
            let Pattern::Simple(simple) = pattern else {
                continue;
            };
            let found = match next[i] {
                Some(Some((s, e))) if s >= byte => Some((s, e)),
                Some(None) => None,
                _ => {
                    let found = find_non_empty(simple, haystack, byte, &mut warned[i]);
                    next[i] = Some(found);
                    found
                }
            };
            let Some((s, e)) = found else {
                continue;
            };
            let better = match best {
                None => true,
                Some((bs, be, _)) => s < bs || (s == bs && e > be),
            };
            if better {
                best = Some((s, e, i));
            }
        }

        let Some((s, e, i)) = best else {
            break;
        };
        matches.push((base + index.byte_to_char(s), base + index.byte_to_char(e), i));
        byte = e;
    }
    matches
}

fn find_non_empty(pattern: &SimplePattern, haystack: &str, mut byte: usize, warned: &mut bool) -> Option<(usize, usize)> {
    while byte <= haystack.len() {
        let m = pattern.regex.find_at(haystack, byte)?;
        if !m.is_empty() {
            return Some((m.start(), m.end()));
        }
        if !*warned {
            warn!(id = pattern.id(), "pattern matched an empty string; match ignored");
            *warned = true;
        }
        byte = next_boundary(haystack, m.start());
    }
    None
}

impl EditObserver for HighlightEngine {
    fn attach(&mut self, model: &mut TextModel) {
        if self.attached.is_some() {
            warn!("highlight engine attached twice; previous state dropped");
        }
        self.reset_state();
        self.attached = Some(model.id());
        self.buffer_len = model.len_chars();
        debug!(buffer = model.id().get(), len = self.buffer_len, "highlight engine attached");
        self.resolve_tags(model);
        self.refresh_range(0, self.buffer_len);
    }

    fn detach(&mut self, model: &mut TextModel) {
        if !self.check_attached(model) {
            return;
        }
        let owned = self
            .pattern_tags
            .drain()
            .map(|(_, tag)| tag)
            .chain(self.class_tags.drain().map(|(_, tag)| tag))
            .chain(self.stale_tags.drain(..))
            .collect::<Vec<_>>();
        for tag in owned {
            model.remove_tag_everywhere(tag);
        }
        self.reset_state();
        debug!(buffer = model.id().get(), "highlight engine detached");
    }

    fn text_inserted(&mut self, model: &mut TextModel, offset: usize, len: usize) {
        if self.check_attached(model) {
            self.edited(model, Edit::Insert { offset, len });
        }
    }

    fn text_deleted(&mut self, model: &mut TextModel, offset: usize, len: usize) {
        if self.check_attached(model) {
            self.edited(model, Edit::Delete { offset, len });
        }
    }

    fn sync_tags(&mut self, model: &mut TextModel) {
        if self.attached == Some(model.id()) {
            self.resolve_tags(model);
        }
    }

    fn style_scheme_changed(&mut self, model: &mut TextModel) {
        if !self.check_attached(model) {
            return;
        }
        // tags resolve their style through the scheme; views only need to redraw
        let len = self.buffer_len;
        for listener in &mut self.listeners {
            listener(0..len);
        }
    }

    fn update_highlight(&mut self, model: &mut TextModel, start: usize, end: usize, synchronous: bool) {
        if !self.check_attached(model) {
            return;
        }
        let end = end.min(model.len_chars());
        let start = start.min(end);
        let needed = line_boundary(model, end);

        // a frontier at the buffer end still owes the batch that marks the table complete
        if synchronous
            && let Frontier::Pending(frontier) = self.table.frontier()
            && frontier >= model.len_chars()
        {
            self.build(model, needed);
        }

        if self.table.frontier().covers(needed) {
            self.ensure_highlighted(model, start, end);
        } else if synchronous {
            self.build_until(model, needed);
            self.ensure_highlighted(model, start, end);
        } else {
            trace!(start, end, "highlight request queued");
            self.requests.add(start, end);
        }
    }

    fn has_pending_work(&self) -> bool {
        self.attached.is_some() && (!self.table.is_complete() || !self.requests.is_empty())
    }

    fn run_idle_slice(&mut self, model: &mut TextModel) -> bool {
        if !self.check_attached(model) {
            return false;
        }
        if !self.table.is_complete() {
            self.build(model, 0);
        }

        while let Some(request) = self.requests.nth(0) {
            let limit = match self.table.frontier() {
                Frontier::Complete => request.end,
                Frontier::Pending(frontier) => request.end.min(model.line_start_of(frontier)),
            };
            if limit <= request.start {
                break;
            }
            self.requests.subtract(request.start, limit);
            self.ensure_highlighted(model, request.start, limit);
            if limit < request.end {
                break;
            }
        }
        self.has_pending_work()
    }
}
