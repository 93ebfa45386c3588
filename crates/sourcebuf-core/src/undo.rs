//! Undo/redo history.
//!
//! The history is a list of [`ActionGroup`]s with a `location` cursor between them: groups before
//! the cursor can be undone, groups after it can be redone. Consecutive single-character edits
//! are merged into one group the way a user perceives "one word typed" or "one run of
//! backspaces", and the location at which the buffer was last saved is tracked so the modified
//! flag can be restored exactly by undo/redo.

use crate::text::TextModel;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// How a deletion was performed, inferred from the selection at deletion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionKind {
    /// A non-empty selection was deleted.
    Selection,
    /// The cursor sat at the end of the deleted range.
    Backspace,
    /// The cursor sat at the start of the deleted range.
    DeleteKey,
    /// The deletion was not tied to the selection.
    Programmatic,
}

impl DeletionKind {
    /// Classify the deletion of `[start, end)` given the `(insert, bound)` selection at that time.
    pub fn infer(start: usize, end: usize, selection: Option<(usize, usize)>) -> Self {
        match selection {
            None => DeletionKind::Programmatic,
            Some((insert, bound)) if insert == end && bound == end => DeletionKind::Backspace,
            Some((insert, bound)) if insert == start && bound == start => DeletionKind::DeleteKey,
            Some(_) => DeletionKind::Selection,
        }
    }
}

/// Surface the undo manager replays history onto.
///
/// Replay must not be recorded again; implementors apply the edits directly.
pub trait UndoTarget {
    /// Insert `text` at `offset`.
    fn insert_text(&mut self, offset: usize, text: &str);
    /// Delete `[start, end)`.
    fn delete_text(&mut self, start: usize, end: usize);
    /// Collapse the selection to `offset`.
    fn place_cursor(&mut self, offset: usize);
    /// Select from `bound` to `insert`.
    fn select_range(&mut self, insert: usize, bound: usize);
    /// Set the modified flag.
    fn set_modified(&mut self, modified: bool);
}

impl UndoTarget for TextModel {
    fn insert_text(&mut self, offset: usize, text: &str) {
        if let Err(err) = self.insert(offset, text) {
            warn!(%err, "undo replay: insertion failed");
        }
    }

    fn delete_text(&mut self, start: usize, end: usize) {
        if let Err(err) = self.delete(start, end) {
            warn!(%err, "undo replay: deletion failed");
        }
    }

    fn place_cursor(&mut self, offset: usize) {
        TextModel::place_cursor(self, offset);
    }

    fn select_range(&mut self, insert: usize, bound: usize) {
        TextModel::select_range(self, insert, bound);
    }

    fn set_modified(&mut self, modified: bool) {
        TextModel::set_modified(self, modified);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Insert,
    Delete,
}

#[derive(Debug, Clone)]
struct Action {
    kind: ActionKind,
    start: usize,
    end: usize,
    text: String,
    /// `(insert, bound)` when the selection was relevant to the edit.
    selection: Option<(usize, usize)>,
}

impl Action {
    fn deletion_kind(&self) -> DeletionKind {
        DeletionKind::infer(self.start, self.end, self.selection)
    }

    fn undo<T: UndoTarget + ?Sized>(&self, target: &mut T) {
        match self.kind {
            ActionKind::Insert => target.delete_text(self.start, self.end),
            ActionKind::Delete => target.insert_text(self.start, &self.text),
        }
    }

    fn redo<T: UndoTarget + ?Sized>(&self, target: &mut T) {
        match self.kind {
            ActionKind::Insert => target.insert_text(self.start, &self.text),
            ActionKind::Delete => target.delete_text(self.start, self.end),
        }
    }

    fn restore_selection<T: UndoTarget + ?Sized>(&self, target: &mut T, undo: bool) {
        match (self.kind, undo) {
            (ActionKind::Insert, true) => target.place_cursor(self.start),
            (ActionKind::Insert, false) => target.place_cursor(self.end),
            (ActionKind::Delete, true) => match self.selection {
                Some((insert, bound)) => target.select_range(insert, bound),
                None => target.place_cursor(self.end),
            },
            (ActionKind::Delete, false) => target.place_cursor(self.start),
        }
    }

    /// Try to absorb `new` (a single-character action recorded after `self`).
    fn merge(&mut self, new: &Action) -> bool {
        if self.kind != new.kind {
            return false;
        }

        match self.kind {
            ActionKind::Insert => {
                if self.end != new.start {
                    return false;
                }
                let (Some(new_char), Some(last_char)) = (new.text.chars().next(), self.text.chars().last()) else {
                    return false;
                };
                // "hello" then " " splits into two groups
                if is_blank(new_char) && !is_blank(last_char) {
                    return false;
                }
                self.text.push_str(&new.text);
                self.end = new.end;
                true
            }
            ActionKind::Delete => {
                let kind = self.deletion_kind();
                if kind != new.deletion_kind() {
                    return false;
                }
                match kind {
                    DeletionKind::Selection | DeletionKind::Programmatic => false,
                    DeletionKind::DeleteKey => {
                        if self.start != new.start {
                            return false;
                        }
                        let (Some(new_char), Some(last_char)) = (new.text.chars().next(), self.text.chars().last()) else {
                            return false;
                        };
                        if is_blank(new_char) && !is_blank(last_char) {
                            return false;
                        }
                        self.text.push_str(&new.text);
                        self.end += new.end - new.start;
                        true
                    }
                    DeletionKind::Backspace => {
                        if self.start != new.end {
                            return false;
                        }
                        let (Some(new_char), Some(first_char)) = (new.text.chars().next(), self.text.chars().next()) else {
                            return false;
                        };
                        if !is_blank(new_char) && is_blank(first_char) {
                            return false;
                        }
                        self.text.insert_str(0, &new.text);
                        self.start = new.start;
                        true
                    }
                }
            }
        }
    }
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// One undo/redo step.
#[derive(Debug, Clone, Default)]
pub struct ActionGroup {
    actions: Vec<Action>,
    force_not_mergeable: bool,
}

impl ActionGroup {
    /// Number of primitive edits in the group.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the group holds no edits.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn merge(&mut self, new: &ActionGroup) -> bool {
        if self.actions.len() != 1 || new.actions.len() != 1 {
            return false;
        }
        if self.force_not_mergeable || new.force_not_mergeable {
            return false;
        }
        match (self.actions.first_mut(), new.actions.first()) {
            (Some(action), Some(new_action)) => action.merge(new_action),
            _ => false,
        }
    }
}

/// Undo/redo history manager.
#[derive(Debug)]
pub struct UndoManager {
    groups: VecDeque<ActionGroup>,
    /// Number of groups currently applied; groups at `location..` are redoable.
    location: usize,
    /// Group being filled by the current user action.
    new_group: Option<ActionGroup>,
    /// `location` at which the buffer was last unmodified, if still reachable.
    saved_location: Option<usize>,
    running_user_action: bool,
    not_undoable_depth: usize,
    max_undo_levels: i32,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    /// Create an empty, unlimited history. The empty buffer counts as saved.
    pub fn new() -> Self {
        Self {
            groups: VecDeque::new(),
            location: 0,
            new_group: None,
            saved_location: Some(0),
            running_user_action: false,
            not_undoable_depth: 0,
            max_undo_levels: -1,
        }
    }

    /// Check if a group can be undone.
    pub fn can_undo(&self) -> bool {
        !self.running_user_action && self.location > 0
    }

    /// Check if a group can be redone.
    pub fn can_redo(&self) -> bool {
        !self.running_user_action && self.location < self.groups.len()
    }

    /// Number of undoable groups.
    pub fn undo_depth(&self) -> usize {
        self.location
    }

    /// Number of redoable groups.
    pub fn redo_depth(&self) -> usize {
        self.groups.len() - self.location
    }

    /// Current history limit (`-1` unlimited, `0` disabled).
    pub fn max_undo_levels(&self) -> i32 {
        self.max_undo_levels
    }

    /// Check if edits are currently being recorded.
    pub fn is_recording(&self) -> bool {
        self.not_undoable_depth == 0 && self.max_undo_levels != 0
    }

    /// Check if a user action is open.
    pub fn in_user_action(&self) -> bool {
        self.running_user_action
    }

    // ----- recording -----

    /// Record an insertion with no selection information.
    pub fn record_insert(&mut self, offset: usize, text: &str) {
        self.push_insert(offset, text, None);
    }

    /// Record an insertion, keeping the selection only if it is a cursor at `offset`.
    pub fn record_insert_with_selection(&mut self, offset: usize, text: &str, selection: (usize, usize)) {
        let (insert, bound) = selection;
        let selection = (insert == bound && insert == offset).then_some(selection);
        self.push_insert(offset, text, selection);
    }

    /// Record a deletion of `[start, end)`.
    ///
    /// `forward` deletions behave like the Delete key, the others like Backspace.
    pub fn record_delete(&mut self, start: usize, end: usize, text: &str, forward: bool) {
        let selection = if forward { (start, start) } else { (end, end) };
        self.push_delete(start, end, text, Some(selection));
    }

    /// Record a deletion of `[start, end)`, classifying it by the selection at deletion time.
    pub fn record_delete_with_selection(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        selection: (usize, usize),
    ) {
        let (insert, bound) = selection;
        let on_edge = |offset: usize| offset == start || offset == end;
        let selection = (on_edge(insert) && on_edge(bound)).then_some(selection);
        self.push_delete(start, end, text, selection);
    }

    fn push_insert(&mut self, offset: usize, text: &str, selection: Option<(usize, usize)>) {
        if !self.is_recording() || text.is_empty() {
            return;
        }
        self.insert_action(Action {
            kind: ActionKind::Insert,
            start: offset,
            end: offset + text.chars().count(),
            text: text.to_string(),
            selection,
        });
    }

    fn push_delete(&mut self, start: usize, end: usize, text: &str, selection: Option<(usize, usize)>) {
        if !self.is_recording() || start >= end {
            return;
        }
        self.insert_action(Action {
            kind: ActionKind::Delete,
            start,
            end,
            text: text.to_string(),
            selection,
        });
    }

    fn insert_action(&mut self, action: Action) {
        trace!(kind = ?action.kind, start = action.start, end = action.end, "recording action");

        let group = self.new_group.get_or_insert_with(ActionGroup::default);
        // Pastes and newlines always start a fresh undo step.
        if action.end - action.start > 1 || action.text == "\n" {
            group.force_not_mergeable = true;
        }
        group.actions.push(action);

        if !self.running_user_action {
            self.insert_new_group();
        }
    }

    fn insert_new_group(&mut self) {
        let Some(group) = self.new_group.take() else {
            return;
        };
        if group.is_empty() {
            return;
        }

        self.remove_redo_groups();

        let can_merge = self.saved_location != Some(self.groups.len());
        if let Some(prev) = self.groups.back_mut() {
            if can_merge && prev.merge(&group) {
                trace!(groups = self.groups.len(), "merged into previous group");
                return;
            }
            prev.force_not_mergeable = true;
        }

        self.groups.push_back(group);
        self.location = self.groups.len();
        self.check_history_size();
    }

    fn remove_redo_groups(&mut self) {
        if self.location >= self.groups.len() {
            return;
        }
        if self.saved_location.is_some_and(|saved| saved > self.location) {
            self.saved_location = None;
        }
        self.groups.truncate(self.location);
    }

    fn remove_last_group(&mut self) {
        if self.saved_location == Some(self.groups.len()) {
            self.saved_location = None;
        }
        self.groups.pop_back();
        self.location = self.location.min(self.groups.len());
    }

    fn remove_first_group(&mut self) {
        self.groups.pop_front();
        self.location = self.location.saturating_sub(1);
        self.saved_location = match self.saved_location {
            Some(0) | None => None,
            Some(saved) => Some(saved - 1),
        };
    }

    fn check_history_size(&mut self) {
        match self.max_undo_levels {
            -1 => {}
            0 => self.clear_all(),
            max => {
                let max = usize::try_from(max).unwrap_or(0);
                while self.groups.len() > max {
                    // redo side first
                    if self.location < self.groups.len() {
                        self.remove_last_group();
                    } else {
                        self.remove_first_group();
                    }
                }
                debug!(groups = self.groups.len(), max, "history trimmed");
            }
        }
    }

    fn clear_all(&mut self) {
        self.saved_location = self
            .saved_location
            .filter(|&saved| saved == self.location)
            .map(|_| 0);
        self.groups.clear();
        self.location = 0;
        self.new_group = None;
    }

    /// Forget the whole history. The saved location survives only if it is the current state.
    pub fn clear(&mut self) {
        self.clear_all();
    }

    // ----- transactions -----

    /// Open a user action; edits recorded until [`end_user_action`](Self::end_user_action)
    /// form one group.
    pub fn begin_user_action(&mut self) {
        self.running_user_action = true;
    }

    /// Close the user action and try to merge its group with the previous one.
    pub fn end_user_action(&mut self) {
        if !self.running_user_action {
            debug_assert!(false, "end_user_action without begin_user_action");
            warn!("end_user_action without begin_user_action");
            return;
        }
        self.insert_new_group();
        self.running_user_action = false;
    }

    /// Suspend recording. Nestable.
    pub fn begin_not_undoable_action(&mut self) {
        self.not_undoable_depth += 1;
    }

    /// Resume recording. When the outermost not-undoable action ends the history is cleared.
    ///
    /// The owner should report the buffer's current modified state through
    /// [`modified_changed`](Self::modified_changed) afterwards.
    pub fn end_not_undoable_action(&mut self) {
        if self.not_undoable_depth == 0 {
            debug_assert!(false, "unbalanced end_not_undoable_action");
            warn!("end_not_undoable_action without begin_not_undoable_action");
            return;
        }
        self.not_undoable_depth -= 1;
        if self.not_undoable_depth == 0 {
            debug!("not-undoable action finished, clearing history");
            self.clear_all();
        }
    }

    /// The buffer's modified flag changed to `modified`.
    pub fn modified_changed(&mut self, modified: bool) {
        if !self.is_recording() {
            return;
        }

        if modified {
            let pending = self.new_group.as_ref().is_some_and(|group| !group.is_empty());
            if self.saved_location == Some(self.location) && !pending {
                self.saved_location = None;
            }
        } else {
            // Saving in the middle of a user action splits it.
            if self.running_user_action {
                self.insert_new_group();
            }
            self.saved_location = Some(self.location);
        }
    }

    /// Change the history limit. `-1` is unlimited and `0` disables undo.
    pub fn set_max_undo_levels(&mut self, max_undo_levels: i32) {
        let max_undo_levels = max_undo_levels.max(-1);
        if self.max_undo_levels == max_undo_levels {
            return;
        }
        self.max_undo_levels = max_undo_levels;
        self.check_history_size();
    }

    // ----- replay -----

    fn restore_modified_state<T: UndoTarget + ?Sized>(&self, target: &mut T, old: usize, new: usize) {
        let Some(saved) = self.saved_location else {
            return;
        };
        if old == saved {
            target.set_modified(true);
        } else if new == saved {
            target.set_modified(false);
        }
    }

    /// Undo the group before the location.
    pub fn undo<T: UndoTarget + ?Sized>(&mut self, target: &mut T) {
        if !self.can_undo() {
            debug_assert!(false, "undo called with nothing to undo");
            warn!("undo called with nothing to undo");
            return;
        }

        let old_location = self.location;
        let new_location = old_location - 1;
        let Some(group) = self.groups.get(new_location) else {
            return;
        };

        for action in group.actions.iter().rev() {
            action.undo(target);
        }
        self.restore_modified_state(target, old_location, new_location);
        if let Some(first) = group.actions.first() {
            first.restore_selection(target, true);
        }

        debug!(actions = group.actions.len(), location = new_location, "undo");
        self.location = new_location;
    }

    /// Redo the group after the location.
    pub fn redo<T: UndoTarget + ?Sized>(&mut self, target: &mut T) {
        if !self.can_redo() {
            debug_assert!(false, "redo called with nothing to redo");
            warn!("redo called with nothing to redo");
            return;
        }

        let old_location = self.location;
        let new_location = old_location + 1;
        let Some(group) = self.groups.get(old_location) else {
            return;
        };

        for action in &group.actions {
            action.redo(target);
        }
        self.restore_modified_state(target, old_location, new_location);
        if let Some(first) = group.actions.first() {
            first.restore_selection(target, false);
        }

        debug!(actions = group.actions.len(), location = new_location, "redo");
        self.location = new_location;
    }
}
