//! Edit-observer hooks.
//!
//! A [`SourceBuffer`](crate::SourceBuffer) notifies exactly one [`EditObserver`] after every
//! primitive edit, including edits replayed by undo/redo. The highlighting engine lives behind
//! this trait so the core crate stays independent of any particular highlighter.

use crate::text::TextModel;

/// Receiver of post-edit notifications from a [`SourceBuffer`](crate::SourceBuffer).
///
/// All offsets are character offsets into the model *after* the edit.
pub trait EditObserver {
    /// Start observing `model`. Called when the observer is installed or re-enabled.
    fn attach(&mut self, model: &mut TextModel);

    /// Stop observing `model`, removing anything the observer applied to it.
    fn detach(&mut self, model: &mut TextModel);

    /// `len` characters were inserted at `offset`.
    fn text_inserted(&mut self, model: &mut TextModel, offset: usize, len: usize);

    /// `len` characters were deleted at `offset`.
    fn text_deleted(&mut self, model: &mut TextModel, offset: usize, len: usize);

    /// The model's style scheme was replaced.
    fn style_scheme_changed(&mut self, _model: &mut TextModel) {}

    /// Bring `model`'s tags in line with configuration changes made since the last call.
    ///
    /// [`SourceBuffer::highlighter_mut`](crate::SourceBuffer::highlighter_mut) calls this when
    /// its guard is dropped.
    fn sync_tags(&mut self, _model: &mut TextModel) {}

    /// Request that `[start, end)` be highlighted.
    ///
    /// With `synchronous` set the work must be complete on return; otherwise it may be deferred
    /// to [`run_idle_slice`](Self::run_idle_slice).
    fn update_highlight(
        &mut self,
        _model: &mut TextModel,
        _start: usize,
        _end: usize,
        _synchronous: bool,
    ) {
    }

    /// Check if deferred work is waiting for an idle slice.
    fn has_pending_work(&self) -> bool {
        false
    }

    /// Run one time-boxed slice of deferred work. Returns `true` if more work remains.
    fn run_idle_slice(&mut self, _model: &mut TextModel) -> bool {
        false
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl EditObserver for PlainText {
    fn attach(&mut self, _model: &mut TextModel) {}

    fn detach(&mut self, _model: &mut TextModel) {}

    fn text_inserted(&mut self, _model: &mut TextModel, _offset: usize, _len: usize) {}

    fn text_deleted(&mut self, _model: &mut TextModel, _offset: usize, _len: usize) {}
}
