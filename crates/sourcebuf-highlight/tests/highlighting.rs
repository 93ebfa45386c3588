use pretty_assertions::assert_eq;
use sourcebuf_core::{SourceBuffer, StyleScheme};
use sourcebuf_highlight::{HighlightEngine, Language};
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

type Buffer = SourceBuffer<HighlightEngine>;

fn c_buffer(text: &str) -> Buffer {
    SourceBuffer::with_highlighter(text, HighlightEngine::for_language(&Language::c()).unwrap())
}

fn highlight_all(buffer: &mut Buffer) {
    let len = buffer.len_chars();
    buffer.ensure_highlighted(0, len);
}

fn ranges(buffer: &Buffer, tag: &str) -> Vec<Range<usize>> {
    let model = buffer.model();
    model.lookup_tag(tag).map(|t| model.tag_ranges(t)).unwrap_or_default()
}

#[test]
fn test_simple_patterns_skip_syntax_regions() {
    let mut buffer = c_buffer("if /* if */ \"if\" if");
    highlight_all(&mut buffer);

    assert_eq!(ranges(&buffer, "c:keyword"), vec![0..2, 17..19]);
    assert_eq!(ranges(&buffer, "c:block-comment"), vec![3..11]);
    assert_eq!(ranges(&buffer, "c:string"), vec![12..16]);
    assert!(buffer.model().has_context_class(13, "string"));
    assert!(!buffer.model().has_context_class(13, "comment"));
}

#[test]
fn test_style_resolves_through_scheme() {
    let mut buffer = c_buffer("/* c */ if");
    buffer.set_style_scheme(Some(Arc::new(StyleScheme::classic())));
    highlight_all(&mut buffer);

    let scheme = StyleScheme::classic();
    let model = buffer.model();
    let comment = model.lookup_tag("c:block-comment").unwrap();
    let keyword = model.lookup_tag("c:keyword").unwrap();
    assert_eq!(model.tag_style(comment), scheme.style("def:comment"));
    assert_eq!(model.tag_style(keyword), scheme.style("def:keyword"));
}

#[test]
fn test_listeners_see_scheduled_ranges() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut engine = HighlightEngine::for_language(&Language::c()).unwrap();
    let sink = seen.clone();
    engine.subscribe(move |range| sink.borrow_mut().push(range));

    let mut buffer = SourceBuffer::with_highlighter("int a;\nint b;\n", engine);
    assert_eq!(seen.borrow().as_slice(), &[0..14]);

    seen.borrow_mut().clear();
    buffer.insert(8, "x").unwrap();
    assert!(seen.borrow().contains(&(7..15)));
}

#[test]
fn test_remove_pattern_clears_its_tags() {
    let mut buffer = c_buffer("if (x) return 1;");
    highlight_all(&mut buffer);
    assert_eq!(ranges(&buffer, "c:keyword"), vec![0..2, 7..13]);

    assert!(buffer.highlighter_mut().remove_pattern("c:keyword"));
    assert!(ranges(&buffer, "c:keyword").is_empty());
    assert_eq!(ranges(&buffer, "c:number"), vec![14..15]);

    assert!(!buffer.highlighter_mut().remove_pattern("c:keyword"));
    highlight_all(&mut buffer);
    assert!(ranges(&buffer, "c:keyword").is_empty());
    assert_eq!(ranges(&buffer, "c:number"), vec![14..15]);
}

#[test]
fn test_added_pattern_tag_exists_before_highlighting() {
    let mut buffer = c_buffer("x = 1;");
    buffer
        .highlighter_mut()
        .add_simple_pattern("c:operator", "def:operator", "=")
        .unwrap();

    let model = buffer.model();
    let tag = model.lookup_tag("c:operator").unwrap();
    assert_eq!(model.tag_table().style_name(tag), Some("def:operator"));
    assert!(model.tag_ranges(tag).is_empty());

    highlight_all(&mut buffer);
    assert_eq!(ranges(&buffer, "c:operator"), vec![2..3]);
}

#[test]
fn test_empty_buffer_completes_synchronously() {
    let mut buffer = c_buffer("");
    assert!(buffer.has_pending_work());

    buffer.ensure_highlighted(0, 0);
    assert!(buffer.highlighter().delimiter_table().is_complete());
    assert!(!buffer.has_pending_work());
}

#[test]
fn test_escape_char_changes_string_ends() {
    let language = Language::new("q", "Quotes").syntax_with_class("str", "def:string", "\"", "\"", "string");
    let engine = HighlightEngine::for_language(&language).unwrap();
    let mut buffer = SourceBuffer::with_highlighter(r#""a\"b" c"#, engine);
    highlight_all(&mut buffer);
    assert_eq!(ranges(&buffer, "str"), vec![0..4, 5..8]);

    buffer.highlighter_mut().set_escape_char(Some('\\'));
    highlight_all(&mut buffer);
    assert_eq!(ranges(&buffer, "str"), vec![0..6]);
    assert!(!buffer.model().has_context_class(7, "string"));
}

#[test]
fn test_toggling_syntax_highlighting() {
    let mut buffer = c_buffer("/* x */ int");
    highlight_all(&mut buffer);
    assert!(buffer.model().has_context_class(3, "comment"));

    buffer.set_highlight_syntax(false);
    assert!(!buffer.model().has_context_class(3, "comment"));
    assert!(ranges(&buffer, "c:type").is_empty());
    assert!(!buffer.has_pending_work());

    buffer.insert(0, "int ").unwrap();
    buffer.set_highlight_syntax(true);
    highlight_all(&mut buffer);
    assert!(buffer.model().has_context_class(7, "comment"));
    assert_eq!(ranges(&buffer, "c:type"), vec![0..3, 12..15]);
}

#[test]
fn test_context_classes_drive_bracket_matching() {
    let mut buffer = c_buffer("f(\")\") /* ( */");
    buffer.set_highlight_matching_brackets(true);
    buffer.place_cursor(1);

    let matched = buffer.update_bracket_highlighting().matched().map(|m| m.matched);
    assert_eq!(matched, Some(5));
    assert!(buffer.model().has_context_class(3, "string"));
}
