//! Highlighting patterns.
//!
//! There are two kinds of pattern, kept as the variants of [`Pattern`]:
//!
//! - a *simple* pattern is a single regex; every match outside syntax regions gets its style
//! - a *syntax* pattern is a start/end regex pair delimiting a region (comments, strings) that
//!   is styled as a whole and tracked in the delimiter table

use crate::error::PatternError;
use regex::{Regex, RegexBuilder};

/// Stable identity of a syntax pattern inside one engine.
///
/// Delimiter tables refer to patterns by key so that removing or re-adding patterns never leaves
/// dangling indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntaxKey(pub(crate) u32);

/// Single-regex pattern.
#[derive(Debug, Clone)]
pub struct SimplePattern {
    pub(crate) id: String,
    pub(crate) style: String,
    pub(crate) regex: Regex,
}

impl SimplePattern {
    /// Pattern id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Style name applied to matches.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// The matcher.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Start/end delimited region pattern.
#[derive(Debug, Clone)]
pub struct SyntaxPattern {
    pub(crate) id: String,
    pub(crate) style: String,
    pub(crate) key: SyntaxKey,
    pub(crate) start: Regex,
    pub(crate) end: Regex,
    pub(crate) context_class: Option<String>,
}

impl SyntaxPattern {
    /// Pattern id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Style name applied to whole regions.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Key used by the delimiter table.
    pub fn key(&self) -> SyntaxKey {
        self.key
    }

    /// Matcher of the opening delimiter.
    pub fn start(&self) -> &Regex {
        &self.start
    }

    /// Matcher of the closing delimiter.
    pub fn end(&self) -> &Regex {
        &self.end
    }

    /// Context class (`comment`, `string`, ...) regions of this pattern belong to.
    pub fn context_class(&self) -> Option<&str> {
        self.context_class.as_deref()
    }
}

/// A registered highlighting pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// See [`SimplePattern`].
    Simple(SimplePattern),
    /// See [`SyntaxPattern`].
    Syntax(SyntaxPattern),
}

impl Pattern {
    /// Pattern id.
    pub fn id(&self) -> &str {
        match self {
            Pattern::Simple(p) => p.id(),
            Pattern::Syntax(p) => p.id(),
        }
    }

    /// Style name.
    pub fn style(&self) -> &str {
        match self {
            Pattern::Simple(p) => p.style(),
            Pattern::Syntax(p) => p.style(),
        }
    }

    /// Key of a syntax pattern.
    pub fn syntax_key(&self) -> Option<SyntaxKey> {
        match self {
            Pattern::Simple(_) => None,
            Pattern::Syntax(p) => Some(p.key),
        }
    }

    /// Check if this is a syntax pattern.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Pattern::Syntax(_))
    }
}

/// Compile a matcher. `^` and `$` match at line boundaries.
pub(crate) fn compile(pattern: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}
