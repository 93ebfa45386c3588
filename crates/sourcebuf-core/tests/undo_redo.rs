use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sourcebuf_core::SourceBuffer;

#[test]
fn test_undo_redo_retraces_line_edits() {
    let mut buffer = SourceBuffer::new("");
    let mut history = vec![buffer.text()];

    buffer.insert(0, "hello\n").unwrap();
    history.push(buffer.text());
    buffer.insert(6, "world\n").unwrap();
    history.push(buffer.text());
    assert_eq!(buffer.delete(0, 6).unwrap(), "hello\n");
    history.push(buffer.text());
    assert_eq!(buffer.delete(0, 6).unwrap(), "world\n");
    history.push(buffer.text());

    assert_eq!(history, vec!["", "hello\n", "hello\nworld\n", "world\n", ""]);

    for expected in history.iter().rev().skip(1) {
        buffer.undo();
        assert_eq!(&buffer.text(), expected);
    }
    assert!(!buffer.can_undo());

    for expected in history.iter().skip(1) {
        buffer.redo();
        assert_eq!(&buffer.text(), expected);
    }
    assert!(!buffer.can_redo());
}

#[test]
fn test_typed_characters_undo_as_one_step() {
    let mut buffer = SourceBuffer::new("");
    for ch in ["a", "b", "c"] {
        buffer.insert_at_cursor(ch);
    }
    assert_eq!(buffer.text(), "abc");
    assert_eq!(buffer.undo_manager().undo_depth(), 1);

    buffer.undo();
    assert_eq!(buffer.text(), "");
    assert_eq!(buffer.cursor(), 0);
    assert!(!buffer.can_undo());
    assert!(buffer.can_redo());

    buffer.redo();
    assert_eq!(buffer.text(), "abc");
    assert_eq!(buffer.cursor(), 3);
}

#[test]
fn test_words_are_separate_steps() {
    let mut buffer = SourceBuffer::new("");
    for ch in "let x".chars() {
        buffer.insert_at_cursor(&ch.to_string());
    }
    buffer.undo();
    assert_eq!(buffer.text(), "let");
    buffer.undo();
    assert_eq!(buffer.text(), "");
}

#[test]
fn test_backspace_run_is_one_step() {
    let mut buffer = SourceBuffer::new("hello");
    buffer.place_cursor(5);
    assert!(buffer.backspace());
    assert!(buffer.backspace());
    assert!(buffer.backspace());
    assert_eq!(buffer.text(), "he");

    buffer.undo();
    assert_eq!(buffer.text(), "hello");
    assert_eq!(buffer.cursor(), 5);
}

#[test]
fn test_deleting_a_selection_restores_it_on_undo() {
    let mut buffer = SourceBuffer::new("one two three");
    buffer.select_range(4, 7);
    assert!(buffer.delete_key());
    assert_eq!(buffer.text(), "one  three");

    buffer.undo();
    assert_eq!(buffer.text(), "one two three");
    assert_eq!(buffer.model().selection(), (4, 7));
}

#[test]
fn test_typing_replaces_selection_in_one_step() {
    let mut buffer = SourceBuffer::new("one two three");
    buffer.select_range(7, 4);
    buffer.insert_at_cursor("2");
    assert_eq!(buffer.text(), "one 2 three");

    buffer.undo();
    assert_eq!(buffer.text(), "one two three");
}

#[test]
fn test_max_undo_levels_keeps_most_recent_steps() {
    let mut buffer = SourceBuffer::new("");
    buffer.set_max_undo_levels(3);
    for _ in 0..4 {
        let end = buffer.len_chars();
        buffer.insert(end, "line\n").unwrap();
    }
    assert_eq!(buffer.undo_manager().undo_depth(), 3);

    while buffer.can_undo() {
        buffer.undo();
    }
    // the oldest edit is gone for good
    assert_eq!(buffer.text(), "line\n");
}

#[test]
fn test_modified_flag_follows_saved_location() {
    let mut buffer = SourceBuffer::new("");
    buffer.set_modified(false);
    assert!(!buffer.is_modified());

    buffer.insert(0, "text").unwrap();
    assert!(buffer.is_modified());

    buffer.undo();
    assert!(!buffer.is_modified());

    buffer.redo();
    assert!(buffer.is_modified());
}

#[test]
fn test_saving_after_edits_moves_saved_location() {
    let mut buffer = SourceBuffer::new("");
    buffer.insert(0, "a\n").unwrap();
    buffer.insert(2, "b\n").unwrap();
    buffer.set_modified(false);

    buffer.undo();
    assert!(buffer.is_modified());
    buffer.redo();
    assert!(!buffer.is_modified());
}

#[test]
fn test_saved_location_lost_when_redo_history_is_dropped() {
    let mut buffer = SourceBuffer::new("");
    buffer.insert(0, "a\n").unwrap();
    buffer.set_modified(false);

    buffer.undo();
    assert!(buffer.is_modified());

    // the saved state lived in the redo history
    buffer.insert(0, "b\n").unwrap();
    buffer.undo();
    assert!(buffer.is_modified());
    assert!(!buffer.can_undo());
}

#[test]
fn test_not_undoable_action_clears_history() {
    let mut buffer = SourceBuffer::new("");
    buffer.insert(0, "draft\n").unwrap();

    buffer.begin_not_undoable_action();
    buffer.delete(0, buffer.len_chars()).unwrap();
    buffer.insert(0, "loaded").unwrap();
    buffer.end_not_undoable_action();

    assert_eq!(buffer.text(), "loaded");
    assert!(!buffer.can_undo());
    assert!(!buffer.can_redo());

    buffer.set_modified(false);
    buffer.insert(6, "!").unwrap();
    buffer.undo();
    assert_eq!(buffer.text(), "loaded");
    assert!(!buffer.is_modified());
}

#[test]
fn test_user_action_is_atomic() {
    let mut buffer = SourceBuffer::new("fn main() {}");
    buffer.begin_user_action();
    buffer.insert(0, "pub ").unwrap();
    assert!(!buffer.can_undo());
    buffer.delete(14, 16).unwrap();
    buffer.insert(14, "{ body }").unwrap();
    buffer.end_user_action();

    assert_eq!(buffer.text(), "pub fn main() { body }");
    buffer.undo();
    assert_eq!(buffer.text(), "fn main() {}");
    buffer.redo();
    assert_eq!(buffer.text(), "pub fn main() { body }");
}

#[test]
fn test_disabling_undo_then_reenabling() {
    let mut buffer = SourceBuffer::new("");
    buffer.insert(0, "a\n").unwrap();
    buffer.set_max_undo_levels(0);
    assert!(!buffer.can_undo());

    buffer.insert(2, "b\n").unwrap();
    assert!(!buffer.can_undo());

    buffer.set_max_undo_levels(-1);
    buffer.insert(4, "c\n").unwrap();
    assert!(buffer.can_undo());
    buffer.undo();
    assert_eq!(buffer.text(), "a\nb\n");
    assert!(!buffer.can_undo());
}

#[test]
fn test_random_edits_round_trip() {
    const ALPHABET: &[&str] = &["a", "b", " ", "\n", "é", "xy", "{", "\t"];

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let initial = "seed text\nwith lines\n";
        let mut buffer = SourceBuffer::new(initial);

        for _ in 0..200 {
            let len = buffer.len_chars();
            let grouped = rng.gen_bool(0.2);
            if grouped {
                buffer.begin_user_action();
            }
            match rng.gen_range(0..4) {
                0 | 1 => {
                    let offset = rng.gen_range(0..=len);
                    let text = ALPHABET[rng.gen_range(0..ALPHABET.len())];
                    buffer.place_cursor(offset);
                    buffer.insert_at_cursor(text);
                }
                2 if len > 0 => {
                    buffer.place_cursor(rng.gen_range(0..=len));
                    if rng.gen_bool(0.5) {
                        buffer.backspace();
                    } else {
                        buffer.delete_key();
                    }
                }
                _ if len > 0 => {
                    let start = rng.gen_range(0..len);
                    let end = rng.gen_range(start..=len);
                    buffer.delete(start, end).unwrap();
                }
                _ => {}
            }
            if grouped {
                buffer.end_user_action();
            }
        }

        let last = buffer.text();
        while buffer.can_undo() {
            buffer.undo();
        }
        assert_eq!(buffer.text(), initial, "seed {seed}");

        while buffer.can_redo() {
            buffer.redo();
        }
        assert_eq!(buffer.text(), last, "seed {seed}");
    }
}
