//! Bracket matching.
//!
//! The search walks character by character away from a bracket, counting nesting depth, and
//! only considers candidates that live in exactly the same context classes (comment, string)
//! as the starting bracket. Leaving one of the starting classes ends the search.

use crate::text::TextModel;

/// Context classes that scope bracket matching; each one is a bit of the mask.
const CONTEXT_CLASSES: [&str; 2] = ["comment", "string"];

/// Default cap on the number of characters examined per search.
pub const DEFAULT_MAX_CHARS: usize = 10_000;

/// Offsets of a bracket and its partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatch {
    /// The bracket the search started from.
    pub bracket: usize,
    /// The matching bracket.
    pub matched: usize,
}

/// Outcome of a bracket search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// A partner was found.
    Found(BracketMatch),
    /// The buffer edge (or the edge of the starting context) was reached.
    NotFound,
    /// The search gave up after examining the maximum number of characters.
    OutOfRange,
    /// Neither probed character is a bracket.
    NotABracket,
}

impl MatchResult {
    /// The match, if one was found.
    pub fn matched(&self) -> Option<BracketMatch> {
        match self {
            MatchResult::Found(m) => Some(*m),
            _ => None,
        }
    }
}

/// Counterpart of `ch` and the search direction (`true` = forward).
fn bracket_pair(ch: char) -> Option<(char, bool)> {
    match ch {
        '(' => Some((')', true)),
        ')' => Some(('(', false)),
        '{' => Some(('}', true)),
        '}' => Some(('{', false)),
        '[' => Some((']', true)),
        ']' => Some(('[', false)),
        '<' => Some(('>', true)),
        '>' => Some(('<', false)),
        _ => None,
    }
}

fn context_class_mask(model: &TextModel, offset: usize) -> u32 {
    CONTEXT_CLASSES
        .iter()
        .enumerate()
        .filter(|(_, class)| model.has_context_class(offset, class))
        .fold(0, |mask, (bit, _)| mask | (1 << bit))
}

/// Context-aware bracket matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketMatcher {
    /// Maximum number of characters examined before giving up.
    pub max_chars: usize,
}

impl Default for BracketMatcher {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl BracketMatcher {
    /// Matcher with a custom character limit.
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Match the bracket around the cursor position `position`.
    ///
    /// The character at `position` is tried first, then (unless `position` starts a line) the
    /// character before it. When neither matches, the result for the right-hand character wins
    /// unless it is not a bracket at all.
    pub fn find_match(&self, model: &TextModel, position: usize) -> MatchResult {
        let right = self.find_at(model, position);
        if matches!(right, MatchResult::Found(_)) {
            return right;
        }

        let mut left = MatchResult::NotABracket;
        if position > 0 && !model.starts_line(position) {
            left = self.find_at(model, position - 1);
            if matches!(left, MatchResult::Found(_)) {
                return left;
            }
        }

        if right == MatchResult::NotABracket {
            left
        } else {
            right
        }
    }

    /// Match the bracket located exactly at `offset`.
    pub fn find_at(&self, model: &TextModel, offset: usize) -> MatchResult {
        let Some(base_char) = model.char_at(offset) else {
            return MatchResult::NotABracket;
        };
        let Some((search_char, forward)) = bracket_pair(base_char) else {
            return MatchResult::NotABracket;
        };

        let mask = context_class_mask(model, offset);
        let mut iter = model.iter_at(offset);
        let mut depth = 0usize;
        let mut count = 0usize;

        loop {
            let moved = if forward {
                model.forward_char(&mut iter)
            } else {
                model.backward_char(&mut iter)
            };
            if !moved {
                break;
            }
            count += 1;

            let current = context_class_mask(model, iter.offset());
            // left one of the starting classes
            if mask & current != mask {
                break;
            }

            if current == mask {
                match model.iter_char(&iter) {
                    Some(ch) if ch == search_char => {
                        if depth == 0 {
                            return MatchResult::Found(BracketMatch {
                                bracket: offset,
                                matched: iter.offset(),
                            });
                        }
                        depth -= 1;
                    }
                    Some(ch) if ch == base_char => depth += 1,
                    _ => {}
                }
            }

            if model.iter_is_end(&iter) || iter.offset() == 0 || count >= self.max_chars {
                break;
            }
        }

        if count >= self.max_chars {
            MatchResult::OutOfRange
        } else {
            MatchResult::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_forward_and_backward() {
        let model = TextModel::new("f(a, (b), c)");
        let matcher = BracketMatcher::default();
        assert_eq!(
            matcher.find_at(&model, 1).matched(),
            Some(BracketMatch {
                bracket: 1,
                matched: 11
            })
        );
        assert_eq!(matcher.find_at(&model, 11).matched().map(|m| m.matched), Some(1));
        assert_eq!(matcher.find_at(&model, 7).matched().map(|m| m.matched), Some(5));
    }

    #[test]
    fn test_not_a_bracket_and_not_found() {
        let model = TextModel::new("a (b");
        let matcher = BracketMatcher::default();
        assert_eq!(matcher.find_at(&model, 0), MatchResult::NotABracket);
        assert_eq!(matcher.find_at(&model, 2), MatchResult::NotFound);
        assert_eq!(matcher.find_at(&model, 10), MatchResult::NotABracket);
    }

    #[test]
    fn test_out_of_range() {
        let text = format!("({}", "x".repeat(50));
        let model = TextModel::new(&text);
        let matcher = BracketMatcher::with_max_chars(10);
        assert_eq!(matcher.find_at(&model, 0), MatchResult::OutOfRange);
    }

    #[test]
    fn test_skips_brackets_in_strings() {
        let mut model = TextModel::new("( \"(\" )");
        model.apply_context_class("string", 2, 5);
        let matcher = BracketMatcher::default();
        assert_eq!(matcher.find_at(&model, 0).matched().map(|m| m.matched), Some(6));

        // from inside the string the search stops at the closing quote
        assert_eq!(matcher.find_at(&model, 3), MatchResult::NotFound);
    }

    #[test]
    fn test_probe_left_of_cursor() {
        let model = TextModel::new("(x)\n)");
        let matcher = BracketMatcher::default();
        // cursor after the closing paren
        assert_eq!(matcher.find_match(&model, 3).matched().map(|m| m.matched), Some(0));
        // at a line start the previous line is not probed
        assert_eq!(matcher.find_match(&model, 4), MatchResult::NotFound);
        assert_eq!(matcher.find_match(&model, 1), MatchResult::Found(BracketMatch { bracket: 0, matched: 2 }));
    }
}
