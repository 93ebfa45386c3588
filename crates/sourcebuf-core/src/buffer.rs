//! Source buffer
//!
//! [`SourceBuffer`] is the composition root: it owns the [`TextModel`], the [`UndoManager`] and
//! an [`EditObserver`] (normally the highlighting engine), and routes every edit through them in
//! a fixed order:
//!
//! 1. undo recording, using the selection as it was before the edit
//! 2. the primitive edit on the model
//! 3. the post-edit notification to the observer
//! 4. modified-flag bookkeeping
//!
//! Undo/redo replay follows the same path minus step 1.

use crate::brackets::{BracketMatcher, MatchResult};
use crate::error::TextError;
use crate::observer::{EditObserver, PlainText};
use crate::tags::StyleScheme;
use crate::text::TextModel;
use crate::undo::{UndoManager, UndoTarget};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::warn;

/// Name (and style name) of the tag marking a matched bracket pair.
pub const BRACKET_MATCH_TAG: &str = "bracket-match";

/// Replays history onto the model, notifying the observer but never recording.
struct Replay<'a, H: EditObserver> {
    model: &'a mut TextModel,
    observer: Option<&'a mut H>,
}

impl<H: EditObserver> UndoTarget for Replay<'_, H> {
    fn insert_text(&mut self, offset: usize, text: &str) {
        if let Err(err) = self.model.insert(offset, text) {
            warn!(%err, "undo replay: insertion failed");
            return;
        }
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.text_inserted(self.model, offset, text.chars().count());
        }
    }

    fn delete_text(&mut self, start: usize, end: usize) {
        if let Err(err) = self.model.delete(start, end) {
            warn!(%err, "undo replay: deletion failed");
            return;
        }
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.text_deleted(self.model, start, end - start);
        }
    }

    fn place_cursor(&mut self, offset: usize) {
        self.model.place_cursor(offset);
    }

    fn select_range(&mut self, insert: usize, bound: usize) {
        self.model.select_range(insert, bound);
    }

    fn set_modified(&mut self, modified: bool) {
        self.model.set_modified(modified);
    }
}

/// Mutable borrow of a buffer's observer.
///
/// On drop the observer gets [`EditObserver::sync_tags`], so tags of removed or replaced
/// patterns leave the model as soon as the change is made.
pub struct HighlighterMut<'a, H: EditObserver> {
    highlighter: &'a mut H,
    model: &'a mut TextModel,
    attached: bool,
}

impl<H: EditObserver> Deref for HighlighterMut<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.highlighter
    }
}

impl<H: EditObserver> DerefMut for HighlighterMut<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.highlighter
    }
}

impl<H: EditObserver> Drop for HighlighterMut<'_, H> {
    fn drop(&mut self) {
        if self.attached {
            self.highlighter.sync_tags(self.model);
        }
    }
}

/// Text buffer with undo history, bracket matching and an edit observer.
#[derive(Debug)]
pub struct SourceBuffer<H: EditObserver = PlainText> {
    model: TextModel,
    undo: UndoManager,
    highlighter: H,
    highlight_syntax: bool,
    highlight_brackets: bool,
    brackets: BracketMatcher,
    user_action_depth: usize,
}

impl SourceBuffer<PlainText> {
    /// Buffer without highlighting.
    pub fn new(text: &str) -> Self {
        Self::with_highlighter(text, PlainText)
    }
}

impl Default for SourceBuffer<PlainText> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<H: EditObserver> SourceBuffer<H> {
    /// Buffer holding `text`, observed by `highlighter`.
    ///
    /// The initial text is not part of the undo history and the buffer starts unmodified.
    pub fn with_highlighter(text: &str, mut highlighter: H) -> Self {
        let mut model = TextModel::new(text);
        highlighter.attach(&mut model);
        Self {
            model,
            undo: UndoManager::new(),
            highlighter,
            highlight_syntax: true,
            highlight_brackets: false,
            brackets: BracketMatcher::default(),
            user_action_depth: 0,
        }
    }

    /// The text model.
    pub fn model(&self) -> &TextModel {
        &self.model
    }

    /// Mutable access to the text model, for marks, tags and other non-text state.
    ///
    /// Edits made through the model directly are neither recorded for undo nor seen by the
    /// observer.
    pub fn model_mut(&mut self) -> &mut TextModel {
        &mut self.model
    }

    /// The undo manager.
    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    /// The edit observer.
    pub fn highlighter(&self) -> &H {
        &self.highlighter
    }

    /// Mutable access to the edit observer.
    ///
    /// The model's tags are synced with the observer when the returned guard is dropped.
    pub fn highlighter_mut(&mut self) -> HighlighterMut<'_, H> {
        HighlighterMut {
            highlighter: &mut self.highlighter,
            model: &mut self.model,
            attached: self.highlight_syntax,
        }
    }

    /// Whole buffer text.
    pub fn text(&self) -> String {
        self.model.text()
    }

    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.model.len_chars()
    }

    // ----- editing -----

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), TextError> {
        self.model.check_range(offset, offset)?;
        if text.is_empty() {
            return Ok(());
        }

        self.undo
            .record_insert_with_selection(offset, text, self.model.selection());
        self.model.insert(offset, text)?;
        if self.highlight_syntax {
            self.highlighter
                .text_inserted(&mut self.model, offset, text.chars().count());
        }
        self.mark_modified();
        self.after_cursor_change();
        Ok(())
    }

    /// Delete `[start, end)` and return the removed text.
    pub fn delete(&mut self, start: usize, end: usize) -> Result<String, TextError> {
        self.model.check_range(start, end)?;
        if start == end {
            return Ok(String::new());
        }

        let text = self.model.slice(start, end);
        self.undo
            .record_delete_with_selection(start, end, &text, self.model.selection());
        let removed = self.model.delete(start, end)?;
        if self.highlight_syntax {
            self.highlighter
                .text_deleted(&mut self.model, start, end - start);
        }
        self.mark_modified();
        self.after_cursor_change();
        Ok(removed)
    }

    /// Type `text` at the cursor, replacing the selection if there is one.
    pub fn insert_at_cursor(&mut self, text: &str) {
        self.begin_user_action();
        if let Some((start, end)) = self.model.selection_bounds()
            && let Err(err) = self.delete(start, end)
        {
            warn!(%err, "failed to replace selection");
        }
        let cursor = self.model.cursor();
        if let Err(err) = self.insert(cursor, text) {
            warn!(%err, "failed to insert at cursor");
        }
        self.end_user_action();
    }

    /// Delete the selection, or the character before the cursor. Returns `false` if nothing
    /// was deleted.
    pub fn backspace(&mut self) -> bool {
        if self.model.selection_bounds().is_some() {
            return self.delete_selection();
        }
        let cursor = self.model.cursor();
        if cursor == 0 {
            return false;
        }
        self.begin_user_action();
        let deleted = self.delete(cursor - 1, cursor).is_ok();
        self.end_user_action();
        deleted
    }

    /// Delete the selection, or the character after the cursor. Returns `false` if nothing was
    /// deleted.
    pub fn delete_key(&mut self) -> bool {
        if self.model.selection_bounds().is_some() {
            return self.delete_selection();
        }
        let cursor = self.model.cursor();
        if cursor >= self.model.len_chars() {
            return false;
        }
        self.begin_user_action();
        let deleted = self.delete(cursor, cursor + 1).is_ok();
        self.end_user_action();
        deleted
    }

    /// Delete the selected text. Returns `false` if the selection is empty.
    pub fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.model.selection_bounds() else {
            return false;
        };
        self.begin_user_action();
        let deleted = self.delete(start, end).is_ok();
        self.end_user_action();
        deleted
    }

    // ----- cursor -----

    /// Cursor offset.
    pub fn cursor(&self) -> usize {
        self.model.cursor()
    }

    /// Collapse the selection to `offset`.
    pub fn place_cursor(&mut self, offset: usize) {
        self.model.place_cursor(offset);
        self.after_cursor_change();
    }

    /// Select from `bound` to `insert` (the cursor).
    pub fn select_range(&mut self, insert: usize, bound: usize) {
        self.model.select_range(insert, bound);
        self.after_cursor_change();
    }

    // ----- history -----

    /// Start a user action; nested calls are folded into the outermost one.
    pub fn begin_user_action(&mut self) {
        self.user_action_depth += 1;
        if self.user_action_depth == 1 {
            self.undo.begin_user_action();
        }
    }

    /// End a user action.
    pub fn end_user_action(&mut self) {
        if self.user_action_depth == 0 {
            debug_assert!(false, "end_user_action without begin_user_action");
            warn!("end_user_action without begin_user_action");
            return;
        }
        self.user_action_depth -= 1;
        if self.user_action_depth == 0 {
            self.undo.end_user_action();
            self.after_cursor_change();
        }
    }

    /// Check if undo is possible.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Check if redo is possible.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Undo the last group of edits.
    pub fn undo(&mut self) {
        let mut replay = Replay {
            model: &mut self.model,
            observer: self.highlight_syntax.then_some(&mut self.highlighter),
        };
        self.undo.undo(&mut replay);
        self.after_cursor_change();
    }

    /// Redo the next group of edits.
    pub fn redo(&mut self) {
        let mut replay = Replay {
            model: &mut self.model,
            observer: self.highlight_syntax.then_some(&mut self.highlighter),
        };
        self.undo.redo(&mut replay);
        self.after_cursor_change();
    }

    /// Start an edit sequence that is not recorded; the history is cleared when it ends.
    pub fn begin_not_undoable_action(&mut self) {
        self.undo.begin_not_undoable_action();
    }

    /// End a not-undoable edit sequence.
    pub fn end_not_undoable_action(&mut self) {
        self.undo.end_not_undoable_action();
        self.undo.modified_changed(self.model.is_modified());
    }

    /// Limit the number of undo steps (`-1` unlimited, `0` disables undo).
    pub fn set_max_undo_levels(&mut self, max_undo_levels: i32) {
        let was_recording = self.undo.is_recording();
        self.undo.set_max_undo_levels(max_undo_levels);
        if !was_recording && self.undo.is_recording() {
            self.undo.modified_changed(self.model.is_modified());
        }
    }

    /// Whether the buffer differs from its last saved state.
    pub fn is_modified(&self) -> bool {
        self.model.is_modified()
    }

    /// Set the modified flag; `false` marks the current state as saved.
    pub fn set_modified(&mut self, modified: bool) {
        if self.model.is_modified() == modified {
            return;
        }
        self.model.set_modified(modified);
        self.undo.modified_changed(modified);
    }

    fn mark_modified(&mut self) {
        if !self.model.is_modified() {
            self.model.set_modified(true);
            self.undo.modified_changed(true);
        }
    }

    // ----- highlighting -----

    /// Enable or disable syntax highlighting. Disabling detaches the observer.
    pub fn set_highlight_syntax(&mut self, enabled: bool) {
        if self.highlight_syntax == enabled {
            return;
        }
        self.highlight_syntax = enabled;
        if enabled {
            self.highlighter.attach(&mut self.model);
        } else {
            self.highlighter.detach(&mut self.model);
        }
    }

    /// Check if syntax highlighting is enabled.
    pub fn highlight_syntax(&self) -> bool {
        self.highlight_syntax
    }

    /// Enable or disable highlighting of the bracket pair around the cursor.
    pub fn set_highlight_matching_brackets(&mut self, enabled: bool) {
        if self.highlight_brackets == enabled {
            return;
        }
        self.highlight_brackets = enabled;
        if enabled {
            self.update_bracket_highlighting();
        } else {
            self.clear_bracket_tag();
        }
    }

    /// Check if bracket highlighting is enabled.
    pub fn highlight_matching_brackets(&self) -> bool {
        self.highlight_brackets
    }

    /// The bracket matcher used for cursor bracket highlighting.
    pub fn bracket_matcher(&self) -> BracketMatcher {
        self.brackets
    }

    /// Replace the bracket matcher.
    pub fn set_bracket_matcher(&mut self, matcher: BracketMatcher) {
        self.brackets = matcher;
    }

    /// Match the bracket at the cursor, tagging both ends with [`BRACKET_MATCH_TAG`].
    ///
    /// Context classes near the cursor are brought up to date first so strings and comments
    /// are respected.
    pub fn update_bracket_highlighting(&mut self) -> MatchResult {
        self.clear_bracket_tag();

        let cursor = self.model.cursor();
        if self.highlight_syntax {
            let start = cursor.saturating_sub(self.brackets.max_chars);
            let end = cursor
                .saturating_add(self.brackets.max_chars)
                .min(self.model.len_chars());
            self.highlighter
                .update_highlight(&mut self.model, start, end, true);
        }

        let result = self.brackets.find_match(&self.model, cursor);
        if let MatchResult::Found(found) = result {
            let tag = self
                .model
                .create_tag(BRACKET_MATCH_TAG, Some(BRACKET_MATCH_TAG));
            self.model.apply_tag(tag, found.bracket, found.bracket + 1);
            self.model.apply_tag(tag, found.matched, found.matched + 1);
        }
        result
    }

    fn clear_bracket_tag(&mut self) {
        if let Some(tag) = self.model.lookup_tag(BRACKET_MATCH_TAG) {
            self.model.remove_tag_everywhere(tag);
        }
    }

    fn after_cursor_change(&mut self) {
        if self.highlight_brackets && self.user_action_depth == 0 {
            self.update_bracket_highlighting();
        }
    }

    /// Install (or clear) the style scheme.
    pub fn set_style_scheme(&mut self, scheme: Option<Arc<StyleScheme>>) {
        self.model.set_style_scheme(scheme);
        self.highlighter.style_scheme_changed(&mut self.model);
    }

    /// Highlight `[start, end)` before returning.
    pub fn ensure_highlighted(&mut self, start: usize, end: usize) {
        if self.highlight_syntax {
            self.highlighter
                .update_highlight(&mut self.model, start, end, true);
        }
    }

    /// Ask for `[start, end)` to be highlighted, possibly in a later idle slice.
    pub fn request_highlight(&mut self, start: usize, end: usize) {
        if self.highlight_syntax {
            self.highlighter
                .update_highlight(&mut self.model, start, end, false);
        }
    }

    /// Check if the observer has deferred work.
    pub fn has_pending_work(&self) -> bool {
        self.highlight_syntax && self.highlighter.has_pending_work()
    }

    /// Run one idle slice of deferred work. Returns `true` if more work remains.
    pub fn run_idle_slice(&mut self) -> bool {
        self.highlight_syntax && self.highlighter.run_idle_slice(&mut self.model)
    }

    /// Run idle slices until no deferred work remains.
    pub fn run_until_idle(&mut self) {
        while self.run_idle_slice() {}
    }
}
