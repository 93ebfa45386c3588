use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use sourcebuf_core::SourceBuffer;
use sourcebuf_highlight::{HighlightEngine, Language};

fn large_source(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 48);
    for i in 0..line_count {
        match i % 4 {
            0 => out.push_str(&format!("/* block {i} */ int x{i} = {i};\n")),
            1 => out.push_str(&format!("if (x{i} > 0) return \"s{i}\";\n")),
            2 => out.push_str(&format!("// line comment {i}\n")),
            _ => out.push_str(&format!("while (x{i}) {{ x{i}--; }}\n")),
        }
    }
    out
}

fn highlighted_buffer(text: &str) -> SourceBuffer<HighlightEngine> {
    let engine = HighlightEngine::for_language(&Language::c()).unwrap();
    let mut buffer = SourceBuffer::with_highlighter(text, engine);
    let len = buffer.len_chars();
    buffer.ensure_highlighted(0, len);
    buffer
}

fn bench_full_highlight(c: &mut Criterion) {
    let text = large_source(20_000);
    c.bench_function("full_highlight/20k_lines", |b| {
        b.iter(|| {
            let buffer = highlighted_buffer(black_box(&text));
            black_box(buffer.highlighter().delimiter_table().len());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_source(20_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut buffer = highlighted_buffer(&text);
                let middle = buffer.model().line_start(10_001);
                buffer.place_cursor(middle);
                buffer
            },
            |mut buffer| {
                for _ in 0..100 {
                    buffer.insert_at_cursor("x");
                    let cursor = buffer.cursor();
                    buffer.ensure_highlighted(cursor.saturating_sub(80), cursor + 80);
                }
                black_box(buffer.len_chars());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_comment_toggle(c: &mut Criterion) {
    let text = large_source(20_000);
    c.bench_function("comment_toggle/open_and_close", |b| {
        b.iter_batched(
            || highlighted_buffer(&text),
            |mut buffer| {
                let at = buffer.model().line_start(10_001);
                buffer.insert(at, "/*").unwrap();
                buffer.run_until_idle();
                buffer.delete(at, at + 2).unwrap();
                let len = buffer.len_chars();
                buffer.ensure_highlighted(0, len);
                black_box(buffer.highlighter().delimiter_table().len());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_full_highlight,
    bench_typing_in_middle,
    bench_comment_toggle
);
criterion_main!(benches);
