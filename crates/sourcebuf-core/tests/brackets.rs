use sourcebuf_core::{BRACKET_MATCH_TAG, BracketMatch, BracketMatcher, MatchResult, SourceBuffer, TextModel};

fn tagged(buffer: &SourceBuffer) -> Vec<std::ops::Range<usize>> {
    buffer
        .model()
        .lookup_tag(BRACKET_MATCH_TAG)
        .map(|tag| buffer.model().tag_ranges(tag))
        .unwrap_or_default()
}

#[test]
fn test_paren_inside_string_is_skipped() {
    let mut model = TextModel::new("( \"(\" )");
    model.apply_context_class("string", 2, 5);

    let result = BracketMatcher::default().find_match(&model, 0);
    assert_eq!(
        result,
        MatchResult::Found(BracketMatch {
            bracket: 0,
            matched: 6
        })
    );
}

#[test]
fn test_brackets_in_comments_match_each_other() {
    let mut model = TextModel::new("{ /* { } */ }");
    model.apply_context_class("comment", 2, 11);
    let matcher = BracketMatcher::default();

    assert_eq!(matcher.find_at(&model, 5).matched().map(|m| m.matched), Some(7));
    assert_eq!(matcher.find_at(&model, 0).matched().map(|m| m.matched), Some(12));
}

#[test]
fn test_all_bracket_kinds() {
    let model = TextModel::new("<[{()}]>");
    let matcher = BracketMatcher::default();
    for (open, close) in [(0, 7), (1, 6), (2, 5), (3, 4)] {
        assert_eq!(matcher.find_at(&model, open).matched().map(|m| m.matched), Some(close));
        assert_eq!(matcher.find_at(&model, close).matched().map(|m| m.matched), Some(open));
    }
}

#[test]
fn test_right_result_wins_when_both_fail() {
    // both neighbours are unmatched brackets
    let model = TextModel::new("x)(x");
    let matcher = BracketMatcher::default();
    assert_eq!(matcher.find_match(&model, 2), MatchResult::NotFound);
    assert_eq!(matcher.find_match(&model, 0), MatchResult::NotABracket);
}

#[test]
fn test_source_buffer_tags_matching_pair() {
    let mut buffer = SourceBuffer::new("if (a[0]) {}");
    buffer.place_cursor(3);
    buffer.set_highlight_matching_brackets(true);
    assert_eq!(tagged(&buffer), vec![3..4, 8..9]);

    buffer.place_cursor(5);
    assert_eq!(tagged(&buffer), vec![5..6, 7..8]);

    buffer.place_cursor(1);
    assert!(tagged(&buffer).is_empty());

    buffer.place_cursor(11);
    assert_eq!(buffer.update_bracket_highlighting().matched().map(|m| m.matched), Some(10));

    buffer.set_highlight_matching_brackets(false);
    assert!(tagged(&buffer).is_empty());
}

#[test]
fn test_bracket_tag_follows_edits() {
    let mut buffer = SourceBuffer::new("(ab)");
    buffer.set_highlight_matching_brackets(true);
    assert_eq!(tagged(&buffer), vec![0..1, 3..4]);

    // typing inside the pair moves the cursor away from both brackets
    buffer.place_cursor(2);
    buffer.insert_at_cursor("x");
    assert!(tagged(&buffer).is_empty());

    buffer.place_cursor(0);
    assert_eq!(tagged(&buffer), vec![0..1, 4..5]);
}
