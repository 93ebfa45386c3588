//! Text model
//!
//! [`TextModel`] is the mutable buffer everything else works on: a [`Rope`] addressed by
//! character offsets, a small set of marks (the cursor and selection bound among them), the
//! buffer's [`TagTable`] and the active [`StyleScheme`].
//!
//! Marks and tag ranges follow edits automatically. Plain [`TextIter`]s do not: every edit bumps
//! the model generation and invalidates all outstanding iterators.

use crate::error::TextError;
use crate::tags::{CONTEXT_CLASS_PREFIX, Style, StyleScheme, TagId, TagTable, region_ranges};
use ropey::Rope;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`TextModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Handle of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(usize);

const INSERT_MARK: MarkId = MarkId(0);
const SELECTION_BOUND_MARK: MarkId = MarkId(1);

#[derive(Debug, Clone, Copy)]
struct Mark {
    offset: usize,
    left_gravity: bool,
}

/// A position in a [`TextModel`], valid until the next edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextIter {
    offset: usize,
    generation: u64,
}

impl TextIter {
    /// Character offset of the iterator.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Model generation the iterator was created at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Characters that terminate a line.
pub fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// An editable text buffer addressed by character offsets.
#[derive(Debug, Clone)]
pub struct TextModel {
    id: BufferId,
    rope: Rope,
    generation: u64,
    marks: Vec<Option<Mark>>,
    tags: TagTable,
    scheme: Option<Arc<StyleScheme>>,
    scheme_generation: u64,
    modified: bool,
}

impl Default for TextModel {
    fn default() -> Self {
        Self::new("")
    }
}

impl TextModel {
    /// Create a model holding `text`, with the cursor at offset 0.
    pub fn new(text: &str) -> Self {
        Self {
            id: BufferId::next(),
            rope: Rope::from_str(text),
            generation: 0,
            marks: vec![
                Some(Mark {
                    offset: 0,
                    left_gravity: false,
                }),
                Some(Mark {
                    offset: 0,
                    left_gravity: false,
                }),
            ],
            tags: TagTable::new(),
            scheme: None,
            scheme_generation: 0,
            modified: false,
        }
    }

    /// Identity of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Edit generation; bumped by every insertion and deletion.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Character at `offset`, or `None` at (or past) the end of the buffer.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.rope.len_chars()).then(|| self.rope.char(offset))
    }

    /// Text in `[start, end)`. Out-of-range bounds are clamped.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    /// Whole buffer text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Number of lines (a trailing newline starts a final empty line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line containing `offset` (clamped to the buffer).
    pub fn line_of(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    /// Offset of the first character of `line` (clamped to the last line).
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_char(line)
    }

    /// Offset of the end of `line`, excluding its terminator.
    pub fn line_end(&self, line: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        let start = self.rope.line_to_char(line);
        let mut end = if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1)
        } else {
            self.rope.len_chars()
        };

        if end > start && is_line_break(self.rope.char(end - 1)) {
            let terminator = self.rope.char(end - 1);
            end -= 1;
            if terminator == '\n' && end > start && self.rope.char(end - 1) == '\r' {
                end -= 1;
            }
        }
        end
    }

    /// Start of the line containing `offset`.
    pub fn line_start_of(&self, offset: usize) -> usize {
        self.line_start(self.line_of(offset))
    }

    /// End (before the terminator) of the line containing `offset`.
    pub fn line_end_of(&self, offset: usize) -> usize {
        self.line_end(self.line_of(offset))
    }

    /// Check if `offset` is the start of a line.
    pub fn starts_line(&self, offset: usize) -> bool {
        offset == 0 || self.line_start_of(offset) == offset
    }

    /// Check if `offset` points at a line terminator or at the end of the buffer.
    pub fn ends_line(&self, offset: usize) -> bool {
        match self.char_at(offset) {
            None => true,
            Some('\n') => offset == 0 || self.rope.char(offset - 1) != '\r',
            Some(ch) => is_line_break(ch),
        }
    }

    fn check_offset(&self, offset: usize) -> Result<(), TextError> {
        let len = self.rope.len_chars();
        if offset > len {
            return Err(TextError::OffsetOutOfRange { offset, len });
        }
        Ok(())
    }

    /// Validate a `[start, end)` range against the buffer.
    pub fn check_range(&self, start: usize, end: usize) -> Result<(), TextError> {
        if start > end {
            return Err(TextError::InvalidRange { start, end });
        }
        self.check_offset(end)
    }

    /// Insert `text` at `offset`.
    ///
    /// Marks at `offset` move past the new text unless they have left gravity. Tag ranges that
    /// strictly contain `offset` grow to cover the inserted text.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), TextError> {
        self.check_offset(offset)?;
        if text.is_empty() {
            return Ok(());
        }

        let len = text.chars().count();
        self.rope.insert(offset, text);
        self.generation += 1;

        for mark in self.marks.iter_mut().flatten() {
            if mark.offset > offset || (mark.offset == offset && !mark.left_gravity) {
                mark.offset += len;
            }
        }
        self.tags.shift_for_insertion(offset, len);
        Ok(())
    }

    /// Delete `[start, end)` and return the removed text.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<String, TextError> {
        self.check_range(start, end)?;
        if start == end {
            return Ok(String::new());
        }

        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        self.generation += 1;

        let len = end - start;
        for mark in self.marks.iter_mut().flatten() {
            if mark.offset >= end {
                mark.offset -= len;
            } else if mark.offset > start {
                mark.offset = start;
            }
        }
        self.tags.shift_for_deletion(start, end);
        Ok(removed)
    }

    // ----- iterators -----

    /// Iterator at `offset` (clamped to the buffer).
    pub fn iter_at(&self, offset: usize) -> TextIter {
        TextIter {
            offset: offset.min(self.rope.len_chars()),
            generation: self.generation,
        }
    }

    /// Check if an iterator was created after the last edit.
    pub fn is_valid(&self, iter: &TextIter) -> bool {
        iter.generation == self.generation
    }

    /// Character under the iterator.
    pub fn iter_char(&self, iter: &TextIter) -> Option<char> {
        debug_assert!(self.is_valid(iter), "stale TextIter used after an edit");
        self.char_at(iter.offset)
    }

    /// Move forward one character. Returns `false` (without moving) at the end of the buffer.
    pub fn forward_char(&self, iter: &mut TextIter) -> bool {
        debug_assert!(self.is_valid(iter), "stale TextIter used after an edit");
        if iter.offset >= self.rope.len_chars() {
            return false;
        }
        iter.offset += 1;
        true
    }

    /// Move back one character. Returns `false` (without moving) at the start of the buffer.
    pub fn backward_char(&self, iter: &mut TextIter) -> bool {
        debug_assert!(self.is_valid(iter), "stale TextIter used after an edit");
        if iter.offset == 0 {
            return false;
        }
        iter.offset -= 1;
        true
    }

    /// Check if the iterator sits at the end of the buffer.
    pub fn iter_is_end(&self, iter: &TextIter) -> bool {
        iter.offset >= self.rope.len_chars()
    }

    // ----- marks -----

    /// The insertion cursor mark.
    pub fn insert_mark(&self) -> MarkId {
        INSERT_MARK
    }

    /// The selection bound mark.
    pub fn selection_bound_mark(&self) -> MarkId {
        SELECTION_BOUND_MARK
    }

    /// Create a mark at `offset` (clamped).
    pub fn create_mark(&mut self, offset: usize, left_gravity: bool) -> MarkId {
        let mark = Mark {
            offset: offset.min(self.rope.len_chars()),
            left_gravity,
        };
        if let Some(slot) = self.marks.iter().skip(2).position(Option::is_none) {
            self.marks[slot + 2] = Some(mark);
            return MarkId(slot + 2);
        }
        self.marks.push(Some(mark));
        MarkId(self.marks.len() - 1)
    }

    /// Move a mark to `offset` (clamped).
    pub fn move_mark(&mut self, mark: MarkId, offset: usize) {
        let len = self.rope.len_chars();
        match self.marks.get_mut(mark.0).and_then(Option::as_mut) {
            Some(mark) => mark.offset = offset.min(len),
            None => warn!(mark = mark.0, "move_mark on a deleted mark"),
        }
    }

    /// Delete a user mark. The cursor and selection bound cannot be deleted.
    pub fn delete_mark(&mut self, mark: MarkId) {
        if mark == INSERT_MARK || mark == SELECTION_BOUND_MARK {
            warn!("attempt to delete a built-in mark");
            return;
        }
        if let Some(slot) = self.marks.get_mut(mark.0) {
            *slot = None;
        }
    }

    /// Current offset of a mark.
    pub fn mark_offset(&self, mark: MarkId) -> Option<usize> {
        self.marks
            .get(mark.0)
            .and_then(|slot| slot.as_ref())
            .map(|mark| mark.offset)
    }

    /// Cursor offset.
    pub fn cursor(&self) -> usize {
        self.mark_offset(INSERT_MARK).unwrap_or(0)
    }

    /// `(insert, selection_bound)` offsets.
    pub fn selection(&self) -> (usize, usize) {
        (
            self.mark_offset(INSERT_MARK).unwrap_or(0),
            self.mark_offset(SELECTION_BOUND_MARK).unwrap_or(0),
        )
    }

    /// Ordered selection bounds, or `None` if the selection is empty.
    pub fn selection_bounds(&self) -> Option<(usize, usize)> {
        let (insert, bound) = self.selection();
        (insert != bound).then(|| (insert.min(bound), insert.max(bound)))
    }

    /// Move both the cursor and the selection bound to `offset`.
    pub fn place_cursor(&mut self, offset: usize) {
        self.select_range(offset, offset);
    }

    /// Set the cursor to `insert` and the selection bound to `bound`.
    pub fn select_range(&mut self, insert: usize, bound: usize) {
        self.move_mark(INSERT_MARK, insert);
        self.move_mark(SELECTION_BOUND_MARK, bound);
    }

    // ----- tags -----

    /// The tag table.
    pub fn tag_table(&self) -> &TagTable {
        &self.tags
    }

    /// Get or create a tag. See [`TagTable::create`].
    pub fn create_tag(&mut self, name: &str, style_name: Option<&str>) -> TagId {
        self.tags.create(name, style_name)
    }

    /// Find a tag by name.
    pub fn lookup_tag(&self, name: &str) -> Option<TagId> {
        self.tags.lookup(name)
    }

    /// Apply `tag` over `[start, end)` (clamped to the buffer).
    pub fn apply_tag(&mut self, tag: TagId, start: usize, end: usize) {
        let len = self.rope.len_chars();
        if let Some(ranges) = self.tags.ranges_mut(tag) {
            ranges.add(start.min(len), end.min(len));
        }
    }

    /// Remove `tag` from `[start, end)`.
    pub fn remove_tag(&mut self, tag: TagId, start: usize, end: usize) {
        if let Some(ranges) = self.tags.ranges_mut(tag) {
            ranges.subtract(start, end);
        }
    }

    /// Remove `tag` from the whole buffer.
    pub fn remove_tag_everywhere(&mut self, tag: TagId) {
        if let Some(ranges) = self.tags.ranges_mut(tag) {
            ranges.clear();
        }
    }

    /// Check if `tag` covers `offset`.
    pub fn has_tag(&self, offset: usize, tag: TagId) -> bool {
        self.tags
            .ranges(tag)
            .is_some_and(|ranges| ranges.contains(offset))
    }

    /// Tags covering `offset`.
    pub fn tags_at(&self, offset: usize) -> Vec<TagId> {
        self.tags.tags_at(offset)
    }

    /// Ranges `tag` is applied to, in offset order.
    pub fn tag_ranges(&self, tag: TagId) -> Vec<Range<usize>> {
        self.tags.ranges(tag).map(region_ranges).unwrap_or_default()
    }

    /// Get or create the tag marking context class `class`.
    pub fn context_class_tag(&mut self, class: &str) -> TagId {
        self.tags
            .create(&format!("{CONTEXT_CLASS_PREFIX}{class}"), None)
    }

    /// Mark `[start, end)` as belonging to context class `class`.
    pub fn apply_context_class(&mut self, class: &str, start: usize, end: usize) {
        let tag = self.context_class_tag(class);
        self.apply_tag(tag, start, end);
    }

    /// Check if `offset` belongs to context class `class`.
    pub fn has_context_class(&self, offset: usize, class: &str) -> bool {
        self.tags
            .lookup(&format!("{CONTEXT_CLASS_PREFIX}{class}"))
            .is_some_and(|tag| self.has_tag(offset, tag))
    }

    /// Context classes covering `offset`.
    pub fn context_classes_at(&self, offset: usize) -> Vec<String> {
        self.tags
            .tags_at(offset)
            .into_iter()
            .filter_map(|tag| self.tags.name(tag)?.strip_prefix(CONTEXT_CLASS_PREFIX))
            .map(str::to_string)
            .collect()
    }

    // ----- styles -----

    /// Install (or clear) the style scheme.
    pub fn set_style_scheme(&mut self, scheme: Option<Arc<StyleScheme>>) {
        self.scheme = scheme;
        self.scheme_generation += 1;
    }

    /// Active style scheme.
    pub fn style_scheme(&self) -> Option<&Arc<StyleScheme>> {
        self.scheme.as_ref()
    }

    /// Bumped every time the scheme is replaced.
    pub fn scheme_generation(&self) -> u64 {
        self.scheme_generation
    }

    /// Style of `tag` under the active scheme.
    pub fn tag_style(&self, tag: TagId) -> Option<&Style> {
        let style_name = self.tags.style_name(tag)?;
        self.scheme.as_ref()?.style(style_name)
    }

    // ----- modified flag -----

    /// Whether the buffer changed since it was last marked unmodified.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set the modified flag.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }
}
