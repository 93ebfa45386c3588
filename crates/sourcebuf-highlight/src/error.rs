//! Error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
/// Errors reported when registering patterns or selecting languages.
///
/// A failed registration leaves the engine's pattern set unchanged.
pub enum PatternError {
    #[error("a pattern with id '{0}' is already registered")]
    /// The pattern id is already in use.
    DuplicateId(String),

    #[error("invalid regex '{pattern}': {source}")]
    /// A matcher failed to compile.
    InvalidRegex {
        /// The offending regex source.
        pattern: String,
        /// Compiler error.
        source: regex::Error,
    },

    #[error("unknown language '{0}'")]
    /// No language with this id is registered.
    UnknownLanguage(String),
}
