//! Language definitions.
//!
//! A [`Language`] is a named, uncompiled set of pattern definitions plus an escape character.
//! [`HighlightEngine::set_language`](crate::HighlightEngine::set_language) compiles and installs
//! one atomically.

use crate::error::PatternError;
use std::collections::HashMap;
use std::sync::Arc;

/// Uncompiled pattern definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternDef {
    /// Single-regex pattern.
    Simple {
        /// Pattern id.
        id: String,
        /// Style name.
        style: String,
        /// Regex source.
        regex: String,
    },
    /// Delimited region pattern.
    Syntax {
        /// Pattern id.
        id: String,
        /// Style name.
        style: String,
        /// Regex source of the opening delimiter.
        start: String,
        /// Regex source of the closing delimiter.
        end: String,
        /// Context class of the region.
        context_class: Option<String>,
    },
}

impl PatternDef {
    /// Pattern id.
    pub fn id(&self) -> &str {
        match self {
            PatternDef::Simple { id, .. } | PatternDef::Syntax { id, .. } => id,
        }
    }
}

/// A named pattern set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    id: String,
    name: String,
    escape_char: Option<char>,
    patterns: Vec<PatternDef>,
}

impl Language {
    /// Empty language.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            escape_char: None,
            patterns: Vec::new(),
        }
    }

    /// Set the escape character.
    pub fn with_escape_char(mut self, escape: char) -> Self {
        self.escape_char = Some(escape);
        self
    }

    /// Add a simple pattern.
    pub fn simple(mut self, id: &str, style: &str, regex: &str) -> Self {
        self.patterns.push(PatternDef::Simple {
            id: id.to_string(),
            style: style.to_string(),
            regex: regex.to_string(),
        });
        self
    }

    /// Add a syntax pattern.
    pub fn syntax(mut self, id: &str, style: &str, start: &str, end: &str) -> Self {
        self.patterns.push(PatternDef::Syntax {
            id: id.to_string(),
            style: style.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            context_class: None,
        });
        self
    }

    /// Add a syntax pattern whose regions belong to `class`.
    pub fn syntax_with_class(
        mut self,
        id: &str,
        style: &str,
        start: &str,
        end: &str,
        class: &str,
    ) -> Self {
        self.patterns.push(PatternDef::Syntax {
            id: id.to_string(),
            style: style.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            context_class: Some(class.to_string()),
        });
        self
    }

    /// Language id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Escape character.
    pub fn escape_char(&self) -> Option<char> {
        self.escape_char
    }

    /// Pattern definitions in registration order.
    pub fn patterns(&self) -> &[PatternDef] {
        &self.patterns
    }

    /// Built-in C definition.
    pub fn c() -> Self {
        Language::new("c", "C")
            .with_escape_char('\\')
            .syntax_with_class("c:line-comment", "c:comment", "//", "\n", "comment")
            .syntax_with_class("c:block-comment", "c:comment", r"/\*", r"\*/", "comment")
            .syntax_with_class("c:string", "c:string", "\"", "\"", "string")
            .syntax_with_class("c:char", "c:string", "'", "'", "string")
            .simple("c:preprocessor", "c:preprocessor", r"^[ \t]*#[ \t]*[a-z]+")
            .simple(
                "c:keyword",
                "c:keyword",
                r"\b(?:break|case|continue|default|do|else|enum|extern|for|goto|if|inline|return|sizeof|static|struct|switch|typedef|union|volatile|while)\b",
            )
            .simple(
                "c:type",
                "c:type",
                r"\b(?:bool|char|const|double|float|int|long|short|signed|size_t|unsigned|void)\b",
            )
            .simple(
                "c:number",
                "c:number",
                r"\b(?:0[xX][0-9a-fA-F]+|[0-9]+(?:\.[0-9]+)?)[uUlLfF]*\b",
            )
    }

    /// Built-in Rust definition.
    pub fn rust() -> Self {
        Language::new("rust", "Rust")
            .with_escape_char('\\')
            .syntax_with_class("rust:line-comment", "rust:comment", "//", "\n", "comment")
            .syntax_with_class("rust:block-comment", "rust:comment", r"/\*", r"\*/", "comment")
            .syntax_with_class("rust:string", "rust:string", "\"", "\"", "string")
            .simple(
                "rust:keyword",
                "rust:keyword",
                r"\b(?:as|async|await|break|const|continue|crate|dyn|else|enum|extern|fn|for|if|impl|in|let|loop|match|mod|move|mut|pub|ref|return|self|Self|static|struct|super|trait|type|unsafe|use|where|while)\b",
            )
            .simple(
                "rust:type",
                "rust:type",
                r"\b(?:bool|char|f32|f64|i8|i16|i32|i64|i128|isize|str|u8|u16|u32|u64|u128|usize|String|Vec|Option|Result)\b",
            )
            .simple("rust:number", "rust:number", r"\b[0-9][0-9_]*(?:\.[0-9_]+)?(?:[iuf](?:8|16|32|64|128|size))?\b")
    }
}

/// Languages by id.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<Language>>,
}

impl LanguageRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in languages.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Language::c());
        registry.register(Language::rust());
        registry
    }

    /// Add or replace a language.
    pub fn register(&mut self, language: Language) -> Arc<Language> {
        let language = Arc::new(language);
        self.languages
            .insert(language.id().to_string(), language.clone());
        language
    }

    /// Look up a language.
    pub fn get(&self, id: &str) -> Result<Arc<Language>, PatternError> {
        self.languages
            .get(id)
            .cloned()
            .ok_or_else(|| PatternError::UnknownLanguage(id.to_string()))
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
