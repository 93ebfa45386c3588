#![warn(missing_docs)]
//! Sourcebuf Highlight - incremental regex-based syntax highlighting
//!
//! # Overview
//!
//! [`HighlightEngine`] styles a [`sourcebuf_core::TextModel`] with two kinds of regex
//! pattern: *syntax* patterns, start/end pairs delimiting comments or strings, and *simple*
//! patterns (keywords, numbers) matched outside those regions. The engine implements
//! [`sourcebuf_core::EditObserver`], so it plugs straight into a
//! [`sourcebuf_core::SourceBuffer`].
//!
//! Analysis is incremental. Region boundaries live in a [`DelimiterTable`] that is built in
//! time-sliced batches; an edit rescans only the lines it touches and, when the structure
//! changed, reuses the part of the old table a rebuild proves still valid.
//!
//! # Quick Start
//!
//! ```rust
//! use sourcebuf_core::SourceBuffer;
//! use sourcebuf_highlight::{HighlightEngine, Language};
//!
//! let engine = HighlightEngine::for_language(&Language::c()).unwrap();
//! let mut buffer = SourceBuffer::with_highlighter("int x; /* note */", engine);
//! buffer.ensure_highlighted(0, buffer.len_chars());
//!
//! assert!(buffer.model().has_context_class(9, "comment"));
//! let keyword = buffer.model().lookup_tag("c:type").unwrap();
//! assert_eq!(buffer.model().tag_ranges(keyword), vec![0..3]);
//! ```
//!
//! # Module Description
//!
//! - [`pattern`] - compiled patterns
//! - [`delimiters`] - the delimiter table and its frontier
//! - [`engine`] - the highlighting engine
//! - [`language`] - language definitions and registry
//! - [`config`] - batch sizing and time slicing

pub mod config;
pub mod delimiters;
pub mod engine;
pub mod error;
pub mod language;
pub mod pattern;
mod scan;

pub use config::EngineConfig;
pub use delimiters::{Delimiter, DelimiterTable, Edit, Frontier};
pub use engine::HighlightEngine;
pub use error::PatternError;
pub use language::{Language, LanguageRegistry, PatternDef};
pub use pattern::{Pattern, SimplePattern, SyntaxKey, SyntaxPattern};
