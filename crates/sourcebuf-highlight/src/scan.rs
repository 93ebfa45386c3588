//! Delimiter scanning.
//!
//! A [`Scanner`] owns one chunk of buffer text, always starting at a line start, and walks it
//! delimiter by delimiter. All inputs and outputs are **character offsets** into the buffer;
//! the byte mapping of the chunk is kept in a [`CharIndex`].

use crate::delimiters::Delimiter;
use crate::pattern::{Pattern, SyntaxKey};
use regex::Regex;
use sourcebuf_core::TextModel;

#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .cloned()
            .unwrap_or(self.text_len)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }
}

/// Byte offset of the character boundary following `byte`.
pub(crate) fn next_boundary(text: &str, byte: usize) -> usize {
    byte + text
        .get(byte..)
        .and_then(|rest| rest.chars().next())
        .map_or(1, char::len_utf8)
}

/// Start of the line after the one containing `offset`, or the buffer length on the last line.
pub(crate) fn next_line_start(model: &TextModel, offset: usize) -> usize {
    let line = model.line_of(offset);
    if line + 1 < model.line_count() {
        model.line_start(line + 1)
    } else {
        model.len_chars()
    }
}

/// `offset` itself when it starts a line, otherwise the next line start.
pub(crate) fn line_boundary(model: &TextModel, offset: usize) -> usize {
    if model.starts_line(offset) {
        offset
    } else {
        next_line_start(model, offset)
    }
}

#[derive(Debug, Clone, Copy)]
enum Cached {
    Match(usize, usize),
    Exhausted,
}

/// Walks syntax delimiters through one chunk of text.
#[derive(Debug)]
pub(crate) struct Scanner<'a> {
    model: &'a TextModel,
    text: String,
    base: usize,
    index: CharIndex,
    escape_char: Option<char>,
    // next start match per pattern index
    starts: Vec<Option<Cached>>,
}

impl<'a> Scanner<'a> {
    /// Scanner over `[line_start_of(from), to)`.
    pub(crate) fn new(model: &'a TextModel, from: usize, to: usize, escape_char: Option<char>) -> Self {
        let base = model.line_start_of(from);
        let text = model.slice(base, to);
        let index = CharIndex::new(&text);
        Self {
            model,
            text,
            base,
            index,
            escape_char,
            starts: Vec::new(),
        }
    }

    /// Find the next delimiter at or after `pos`.
    ///
    /// Outside a region (`inside == None`) this is the earliest unescaped start match across all
    /// syntax patterns, registration order breaking ties; the delimiter sits at the match start.
    /// Inside a region it is the first unescaped end match of that pattern; the delimiter sits at
    /// the match end. Returns the delimiter and the offset scanning resumes from.
    pub(crate) fn next_delimiter(
        &mut self,
        patterns: &[Pattern],
        pos: usize,
        inside: Option<SyntaxKey>,
    ) -> Option<(Delimiter, usize)> {
        if let Some(key) = inside {
            let pattern = patterns.iter().find_map(|p| match p {
                Pattern::Syntax(s) if s.key == key => Some(s),
                _ => None,
            })?;
            let (_, end) = self.find_unescaped(&pattern.end, pos)?;
            return Some((Delimiter::closing(end), end));
        }

        if self.starts.len() != patterns.len() {
            self.starts = vec![None; patterns.len()];
        }

        let mut best: Option<(usize, usize, SyntaxKey)> = None;
        for (i, pattern) in patterns.iter().enumerate() {
            let Pattern::Syntax(syntax) = pattern else {
                continue;
            };
            let found = match self.starts[i] {
                Some(Cached::Match(start, end)) if start >= pos => Some((start, end)),
                Some(Cached::Exhausted) => None,
                _ => {
                    let found = self.find_unescaped(&syntax.start, pos);
                    self.starts[i] = Some(found.map_or(Cached::Exhausted, |(s, e)| Cached::Match(s, e)));
                    found
                }
            };
            if let Some((start, end)) = found
                && best.is_none_or(|(best_start, _, _)| start < best_start)
            {
                best = Some((start, end, syntax.key));
            }
        }

        let (start, end, key) = best?;
        Some((Delimiter::opening(start, key), end))
    }

    /// All delimiters found in the chunk from `pos` on, starting in state `inside`.
    pub(crate) fn collect(
        &mut self,
        patterns: &[Pattern],
        mut pos: usize,
        mut inside: Option<SyntaxKey>,
    ) -> Vec<Delimiter> {
        let mut found = Vec::new();
        while let Some((delimiter, resume)) = self.next_delimiter(patterns, pos, inside) {
            found.push(delimiter);
            inside = delimiter.pattern;
            pos = resume;
        }
        found
    }

    /// First non-empty, unescaped match of `regex` starting at or after `pos`.
    fn find_unescaped(&self, regex: &Regex, pos: usize) -> Option<(usize, usize)> {
        let mut byte = self.index.char_to_byte(pos.saturating_sub(self.base));
        while byte <= self.text.len() {
            let m = regex.find_at(&self.text, byte)?;
            let start = self.base + self.index.byte_to_char(m.start());
            if m.is_empty() || self.is_escaped(start) {
                byte = next_boundary(&self.text, m.start());
                continue;
            }
            let end = self.base + self.index.byte_to_char(m.end());
            return Some((start, end));
        }
        None
    }

    /// A match is escaped when an odd number of escape characters directly precede it.
    fn is_escaped(&self, offset: usize) -> bool {
        let Some(escape) = self.escape_char else {
            return false;
        };
        let mut count = 0usize;
        let mut at = offset;
        while at > 0 && self.model.char_at(at - 1) == Some(escape) {
            count += 1;
            at -= 1;
        }
        count % 2 == 1
    }
}
