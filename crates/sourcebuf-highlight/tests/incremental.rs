use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sourcebuf_core::{SourceBuffer, TextModel};
use sourcebuf_highlight::{Delimiter, EngineConfig, Frontier, HighlightEngine, Language};
use std::ops::Range;
use std::time::Duration;

type Buffer = SourceBuffer<HighlightEngine>;

fn language() -> Language {
    Language::new("test", "Test")
        .with_escape_char('\\')
        .syntax_with_class("block", "def:comment", r"/\*", r"\*/", "comment")
        .syntax_with_class("line", "def:comment", "//", "\n", "comment")
        .syntax_with_class("string", "def:string", "\"", "\"", "string")
        .simple("keyword", "def:keyword", r"\bif\b")
}

fn buffer(text: &str) -> Buffer {
    SourceBuffer::with_highlighter(text, HighlightEngine::for_language(&language()).unwrap())
}

fn small_batch_buffer(text: &str) -> Buffer {
    let mut engine = HighlightEngine::with_config(EngineConfig {
        time_slice: Duration::from_millis(30),
        initial_batch: 16,
        minimum_batch: 8,
        maximum_batch: 16,
    });
    engine.set_language(&language()).unwrap();
    SourceBuffer::with_highlighter(text, engine)
}

fn highlight_all(buffer: &mut Buffer) {
    let len = buffer.len_chars();
    buffer.ensure_highlighted(0, len);
}

fn table(buffer: &Buffer) -> Vec<Delimiter> {
    buffer.highlighter().delimiter_table().entries().to_vec()
}

#[derive(Debug, PartialEq, Eq)]
struct Styling {
    tags: Vec<(&'static str, Vec<Range<usize>>)>,
    comment: Vec<usize>,
    string: Vec<usize>,
}

fn styling(model: &TextModel) -> Styling {
    let tags = ["block", "line", "string", "keyword"]
        .into_iter()
        .map(|id| {
            let ranges = model.lookup_tag(id).map(|t| model.tag_ranges(t)).unwrap_or_default();
            (id, ranges)
        })
        .collect();
    let class = |class: &str| -> Vec<usize> {
        (0..model.len_chars())
            .filter(|&offset| model.has_context_class(offset, class))
            .collect()
    };
    Styling {
        tags,
        comment: class("comment"),
        string: class("string"),
    }
}

fn scratch(text: &str) -> (Vec<Delimiter>, Styling) {
    let mut fresh = buffer(text);
    highlight_all(&mut fresh);
    assert!(fresh.highlighter().delimiter_table().is_complete());
    (table(&fresh), styling(fresh.model()))
}

fn assert_matches_scratch(buffer: &mut Buffer, context: &str) {
    highlight_all(buffer);
    assert!(buffer.highlighter().delimiter_table().is_complete(), "{context}");
    let (entries, expected) = scratch(&buffer.text());
    assert_eq!(table(buffer), entries, "{context}: text {:?}", buffer.text());
    assert_eq!(styling(buffer.model()), expected, "{context}: text {:?}", buffer.text());
}

#[test]
fn test_typing_inside_comment_only_shifts_table() {
    let mut buffer = buffer("a /* b */ c\nif x\n/* d */\n");
    highlight_all(&mut buffer);
    assert_eq!(table(&buffer).len(), 4);

    buffer.insert(5, "zz").unwrap();
    let engine = buffer.highlighter();
    assert!(engine.delimiter_table().is_complete());
    assert!(!engine.delimiter_table().has_old_table());
    assert_eq!(
        table(&buffer).iter().map(|d| d.offset).collect::<Vec<_>>(),
        vec![2, 11, 19, 26]
    );
    assert_matches_scratch(&mut buffer, "after typing");
}

#[test]
fn test_opening_comment_invalidates_then_reuses_old_table() {
    let mut buffer = buffer("x = 1;\ny = 2;\n/* c */\n");
    highlight_all(&mut buffer);

    buffer.insert(0, "/*").unwrap();
    let delimiters = buffer.highlighter().delimiter_table();
    assert_eq!(delimiters.frontier(), Frontier::Pending(0));
    assert!(delimiters.is_empty());
    assert!(delimiters.has_old_table());

    assert_matches_scratch(&mut buffer, "after opening a comment");
    assert!(!buffer.highlighter().delimiter_table().has_old_table());
    assert!(buffer.model().has_context_class(9, "comment"));
}

#[test]
fn test_deleting_comment_end_extends_region() {
    let mut buffer = buffer("/* a */ b\nc\n");
    highlight_all(&mut buffer);
    assert!(!buffer.model().has_context_class(8, "comment"));

    buffer.delete(5, 7).unwrap();
    highlight_all(&mut buffer);
    assert!(buffer.model().has_context_class(6, "comment"));
    assert!(buffer.model().has_context_class(8, "comment"));
    assert_matches_scratch(&mut buffer, "after deleting */");
}

#[test]
fn test_edit_past_frontier_leaves_table_alone() {
    let text = "/* n */ if\n".repeat(20);
    let mut buffer = small_batch_buffer(&text);
    assert!(buffer.run_idle_slice());

    let before = table(&buffer);
    let Frontier::Pending(frontier) = buffer.highlighter().delimiter_table().frontier() else {
        panic!("analysis finished in one slice");
    };
    assert!(frontier < 200);

    buffer.insert(200, "\"").unwrap();
    assert_eq!(table(&buffer), before);
    assert_eq!(
        buffer.highlighter().delimiter_table().frontier(),
        Frontier::Pending(frontier)
    );

    buffer.run_until_idle();
    assert!(buffer.highlighter().delimiter_table().is_complete());
    assert_matches_scratch(&mut buffer, "after finishing analysis");
}

#[test]
fn test_requests_wait_for_analysis() {
    let text = "if /* x */\n".repeat(10);
    let mut buffer = small_batch_buffer(&text);
    buffer.request_highlight(0, buffer.len_chars());
    assert!(buffer.has_pending_work());
    let keyword = buffer.model().lookup_tag("keyword").unwrap();
    assert!(buffer.model().tag_ranges(keyword).is_empty());

    buffer.run_until_idle();
    assert!(!buffer.has_pending_work());
    assert_eq!(buffer.model().tag_ranges(keyword).len(), 10);
}

#[test]
fn test_undo_restores_styling() {
    let text = "if a\n\"s\" b\n/* c */ if\n";
    let mut buffer = buffer(text);
    highlight_all(&mut buffer);
    let original = styling(buffer.model());

    buffer.place_cursor(3);
    buffer.insert_at_cursor("\"");
    highlight_all(&mut buffer);
    assert_ne!(styling(buffer.model()), original);

    buffer.undo();
    assert_eq!(buffer.text(), text);
    highlight_all(&mut buffer);
    assert_eq!(styling(buffer.model()), original);
}

const TOKENS: &[&str] = &["/*", "*/", "\"", "//", "\n", "a", " ", "\\", "if", "x\ny"];

fn random_text(rng: &mut StdRng, tokens: usize) -> String {
    (0..tokens)
        .map(|_| TOKENS[rng.gen_range(0..TOKENS.len())])
        .collect()
}

#[test]
fn test_random_edits_match_scratch_analysis() {
    for seed in 0..6u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let initial = random_text(&mut rng, 40);
        let mut buffer = small_batch_buffer(&initial);

        for step in 0..80 {
            let len = buffer.len_chars();
            if len > 0 && rng.gen_bool(0.4) {
                let start = rng.gen_range(0..len);
                let end = (start + rng.gen_range(1..4)).min(len);
                buffer.delete(start, end).unwrap();
            } else {
                let at = rng.gen_range(0..=len);
                let token = TOKENS[rng.gen_range(0..TOKENS.len())];
                buffer.insert(at, token).unwrap();
            }

            match rng.gen_range(0..3) {
                0 => {}
                1 => {
                    buffer.run_idle_slice();
                }
                _ => assert_matches_scratch(&mut buffer, &format!("seed {seed} step {step}")),
            }
        }
        assert_matches_scratch(&mut buffer, &format!("seed {seed} final"));
    }
}
