//! Error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the checked edit API of [`TextModel`](crate::TextModel) and
/// [`SourceBuffer`](crate::SourceBuffer).
pub enum TextError {
    #[error("offset {offset} is out of range (buffer has {len} characters)")]
    /// A character offset lies beyond the end of the buffer.
    OffsetOutOfRange {
        /// The rejected offset.
        offset: usize,
        /// Buffer length in characters at the time of the call.
        len: usize,
    },

    #[error("invalid range {start}..{end}")]
    /// A range whose start lies after its end.
    InvalidRange {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },
}
