#![warn(missing_docs)]
//! Sourcebuf Core - text buffer substrate for source code editors
//!
//! # Overview
//!
//! `sourcebuf-core` holds the editor-independent parts of a source buffer: a rope-backed text
//! model with marks and tags, the region tracker used for incremental work, an undo/redo
//! history that merges keystrokes the way users expect, and a context-aware bracket matcher.
//! Syntax highlighting plugs in through the [`EditObserver`] trait (see the
//! `sourcebuf-highlight` crate).
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  SourceBuffer (edit routing)                │  ← Public API
//! ├──────────────────────┬──────────────────────┤
//! │  UndoManager         │  EditObserver        │  ← History / Highlighting hook
//! ├──────────────────────┴──────────────────────┤
//! │  BracketMatcher                             │  ← Queries
//! ├─────────────────────────────────────────────┤
//! │  TextModel (rope, marks, tags, schemes)     │  ← Text Storage
//! ├─────────────────────────────────────────────┤
//! │  Region (merged interval sets)              │  ← Primitive
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use sourcebuf_core::SourceBuffer;
//!
//! let mut buffer = SourceBuffer::new("");
//! for ch in ["a", "b", "c"] {
//!     buffer.insert_at_cursor(ch);
//! }
//! assert_eq!(buffer.text(), "abc");
//!
//! // consecutive typing is one undo step
//! buffer.undo();
//! assert_eq!(buffer.text(), "");
//! buffer.redo();
//! assert_eq!(buffer.text(), "abc");
//! ```
//!
//! # Module Description
//!
//! - [`region`] - merged interval sets
//! - [`text`] - text model, iterators and marks
//! - [`tags`] - tag table and style schemes
//! - [`observer`] - edit-observer hooks
//! - [`undo`] - undo/redo history
//! - [`brackets`] - bracket matching
//! - [`buffer`] - the [`SourceBuffer`] composition root

pub mod brackets;
pub mod buffer;
pub mod error;
pub mod observer;
pub mod region;
pub mod tags;
pub mod text;
pub mod undo;

pub use brackets::{BracketMatch, BracketMatcher, MatchResult};
pub use buffer::{BRACKET_MATCH_TAG, HighlighterMut, SourceBuffer};
pub use error::TextError;
pub use observer::{EditObserver, PlainText};
pub use region::{Interval, Region};
pub use tags::{CONTEXT_CLASS_PREFIX, Style, StyleScheme, StyleSchemeRegistry, TagId, TagTable};
pub use text::{BufferId, MarkId, TextIter, TextModel, is_line_break};
pub use undo::{ActionGroup, DeletionKind, UndoManager, UndoTarget};
