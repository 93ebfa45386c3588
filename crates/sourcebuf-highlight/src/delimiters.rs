//! The delimiter table.
//!
//! The table records, in offset order, every place where a syntax region opens or closes. It is
//! authoritative for the text before its [`Frontier`]; everything past the frontier is still to
//! be analyzed.
//!
//! Offsets follow two conventions:
//!
//! - an opening delimiter sits at the **start** of its start match
//! - a closing delimiter sits at the **end** of its end match
//!
//! so the region of an opener `o` followed by closer `c` is exactly `[o, c)`. A closer and the
//! next opener may share an offset; the closer always comes first.
//!
//! After an invalidation the entries past the edit are kept aside as an *old table*. While the
//! table is rebuilt, the first freshly found delimiter equal to an old one proves the rest of the
//! old table still holds, and it is copied back instead of being rescanned.

use crate::pattern::SyntaxKey;
use tracing::{debug, trace};

/// One region boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delimiter {
    /// Character offset of the boundary.
    pub offset: usize,
    /// Pattern whose region opens here, `None` for a closing delimiter.
    pub pattern: Option<SyntaxKey>,
    /// Nesting depth after this delimiter (1 inside a region, 0 outside).
    pub depth: u32,
}

impl Delimiter {
    /// Opening delimiter of `pattern` at `offset`.
    pub fn opening(offset: usize, pattern: SyntaxKey) -> Self {
        Self {
            offset,
            pattern: Some(pattern),
            depth: 1,
        }
    }

    /// Closing delimiter at `offset`.
    pub fn closing(offset: usize) -> Self {
        Self {
            offset,
            pattern: None,
            depth: 0,
        }
    }

    /// Check if a region opens here.
    pub fn opens(&self) -> bool {
        self.pattern.is_some()
    }
}

/// How much of the buffer the table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontier {
    /// The whole buffer is analyzed.
    Complete,
    /// Text before this offset is analyzed.
    Pending(usize),
}

impl Frontier {
    /// Check if the table is authoritative up to `offset`.
    pub fn covers(&self, offset: usize) -> bool {
        match *self {
            Frontier::Complete => true,
            Frontier::Pending(frontier) => offset <= frontier,
        }
    }
}

/// A primitive buffer edit, in post-edit coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// `len` characters inserted at `offset`.
    Insert {
        /// Insertion point.
        offset: usize,
        /// Inserted length.
        len: usize,
    },
    /// `len` characters deleted at `offset`.
    Delete {
        /// Start of the deleted range.
        offset: usize,
        /// Deleted length.
        len: usize,
    },
}

impl Edit {
    /// Offset of the edit.
    pub fn offset(&self) -> usize {
        match *self {
            Edit::Insert { offset, .. } | Edit::Delete { offset, .. } => offset,
        }
    }

    /// End of the edited text after the edit.
    pub fn end(&self) -> usize {
        match *self {
            Edit::Insert { offset, len } => offset + len,
            Edit::Delete { offset, .. } => offset,
        }
    }

    /// Map a delimiter from pre-edit to post-edit coordinates.
    ///
    /// Returns `None` when the edit destroyed text the delimiter's match was made of.
    fn map(&self, delimiter: Delimiter) -> Option<Delimiter> {
        let offset = delimiter.offset;
        let mapped = match *self {
            Edit::Insert { offset: at, len } => {
                let moves = if delimiter.opens() { offset >= at } else { offset > at };
                if moves { offset + len } else { offset }
            }
            Edit::Delete { offset: at, len } => {
                let end = at + len;
                let destroyed = if delimiter.opens() {
                    offset >= at && offset < end
                } else {
                    offset > at && offset <= end
                };
                if destroyed {
                    return None;
                }
                if offset >= end { offset - len } else { offset }
            }
        };
        Some(Delimiter {
            offset: mapped,
            ..delimiter
        })
    }

    /// Map a plain offset; offsets inside a deleted range collapse to its start.
    fn map_offset(&self, offset: usize) -> usize {
        match *self {
            Edit::Insert { offset: at, len } => {
                if offset > at {
                    offset + len
                } else {
                    offset
                }
            }
            Edit::Delete { offset: at, len } => {
                if offset >= at + len {
                    offset - len
                } else {
                    offset.min(at)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct OldTable {
    entries: Vec<Delimiter>,
    // entries passed over without a match
    passed: usize,
}

impl OldTable {
    fn map(&mut self, edit: Edit) {
        self.entries = self.entries.iter().filter_map(|d| edit.map(*d)).collect();
    }
}

/// Ordered syntax-region boundaries plus their analysis frontier.
#[derive(Debug, Clone)]
pub struct DelimiterTable {
    entries: Vec<Delimiter>,
    old: Option<OldTable>,
    frontier: Frontier,
}

impl Default for DelimiterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimiterTable {
    /// Empty table with nothing analyzed.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            old: None,
            frontier: Frontier::Pending(0),
        }
    }

    /// Delimiters in offset order.
    pub fn entries(&self) -> &[Delimiter] {
        &self.entries
    }

    /// Number of delimiters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no delimiters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Analysis frontier.
    pub fn frontier(&self) -> Frontier {
        self.frontier
    }

    /// Check if the whole buffer is analyzed.
    pub fn is_complete(&self) -> bool {
        self.frontier == Frontier::Complete
    }

    /// Check if entries from before the last invalidation are kept for reuse.
    pub fn has_old_table(&self) -> bool {
        self.old.is_some()
    }

    /// Pattern whose region contains `offset`, or `None` outside all regions.
    ///
    /// Only meaningful for offsets the frontier covers.
    pub fn state_at(&self, offset: usize) -> Option<SyntaxKey> {
        let idx = self.entries.partition_point(|d| d.offset <= offset);
        idx.checked_sub(1).and_then(|i| self.entries[i].pattern)
    }

    /// Split `[start, end)` into runs of constant region state.
    pub fn spans(&self, start: usize, end: usize) -> Vec<(usize, usize, Option<SyntaxKey>)> {
        let mut spans = Vec::new();
        let mut idx = self.entries.partition_point(|d| d.offset <= start);
        let mut inside = idx.checked_sub(1).and_then(|i| self.entries[i].pattern);
        let mut pos = start;
        while pos < end {
            let next = self
                .entries
                .get(idx)
                .map(|d| d.offset)
                .filter(|&offset| offset < end)
                .unwrap_or(end);
            if next > pos {
                spans.push((pos, next, inside));
            }
            if next < end {
                inside = self.entries[idx].pattern;
                idx += 1;
            }
            pos = next;
        }
        spans
    }

    /// State after the last entry; scanning resumes from the frontier in this state.
    pub(crate) fn last_state(&self) -> Option<SyntaxKey> {
        self.entries.last().and_then(|d| d.pattern)
    }

    /// Number of entries unaffected by a change starting at line start `head`.
    ///
    /// Closers at `head` end on the previous line and survive; openers at `head` do not.
    fn prefix_len(&self, head: usize) -> usize {
        self.entries
            .partition_point(|d| d.offset < head || (d.offset == head && !d.opens()))
    }

    /// State at line start `head`, ignoring entries a change there may affect.
    pub(crate) fn state_before(&self, head: usize) -> Option<SyntaxKey> {
        let prefix = self.prefix_len(head);
        prefix.checked_sub(1).and_then(|i| self.entries[i].pattern)
    }

    /// Forget everything. An engine without syntax patterns has nothing to analyze.
    pub(crate) fn reset(&mut self, complete: bool) {
        self.entries.clear();
        self.old = None;
        self.frontier = if complete {
            Frontier::Complete
        } else {
            Frontier::Pending(0)
        };
    }

    /// Check if `edit` lies past the frontier.
    pub(crate) fn beyond_frontier(&self, edit: Edit) -> bool {
        matches!(self.frontier, Frontier::Pending(frontier) if edit.offset() >= frontier)
    }

    /// Drop old entries from `head` on; the text they were found in has changed.
    pub(crate) fn truncate_old_table(&mut self, head: usize) {
        if let Some(old) = self.old.as_mut() {
            let keep = old.entries.partition_point(|d| d.offset < head);
            old.entries.truncate(keep);
            if old.entries.is_empty() {
                self.old = None;
            }
        }
    }

    /// Bring the table up to date with `edit`.
    ///
    /// `fresh` holds the delimiters found by rescanning `[head, scan_end)`, the lines touched by
    /// the edit. When they agree with the (mapped) entries of those lines the rest of the table is
    /// simply shifted. Otherwise the table is cut back to `head` and the tail is kept as the old
    /// table. Returns `true` when the table survived.
    pub(crate) fn apply_edit(
        &mut self,
        edit: Edit,
        head: usize,
        scan_end: usize,
        fresh: &[Delimiter],
    ) -> bool {
        let prefix = self.prefix_len(head);
        let mut lost = false;
        let mut tail: Vec<Delimiter> = self.entries[prefix..]
            .iter()
            .filter_map(|d| {
                let mapped = edit.map(*d);
                lost |= mapped.is_none();
                mapped
            })
            .collect();

        let frontier = match self.frontier {
            Frontier::Complete => Frontier::Complete,
            Frontier::Pending(frontier) => Frontier::Pending(edit.map_offset(frontier)),
        };
        let frontier_clear = frontier.covers(scan_end);

        let touched = tail
            .iter()
            .take_while(|d| {
                if d.opens() {
                    d.offset < scan_end
                } else {
                    d.offset <= scan_end
                }
            })
            .count();

        if !lost && frontier_clear && tail[..touched] == *fresh {
            trace!(head, scan_end, "delimiter table shifted");
            self.entries.truncate(prefix);
            self.entries.extend(tail);
            self.frontier = frontier;
            if let Some(old) = self.old.as_mut() {
                old.map(edit);
            }
            return true;
        }

        debug!(head, scan_end, kept = prefix, "delimiter table invalidated");
        self.entries.truncate(prefix);
        self.frontier = Frontier::Pending(head);
        let old = tail.split_off(touched);
        self.old = (!old.is_empty()).then_some(OldTable {
            entries: old,
            passed: 0,
        });
        false
    }

    /// Append a freshly scanned delimiter.
    ///
    /// If it matches an entry of the old table, the remainder of the old table is copied in and
    /// the frontier jumps to its last entry; `true` is returned and the current batch should
    /// stop. A trailing opener is dropped so that it is rediscovered by the next scan.
    pub(crate) fn push_scanned(&mut self, delimiter: Delimiter, batch_start: usize) -> bool {
        self.entries.push(delimiter);

        let Some(old) = self.old.as_mut() else {
            return false;
        };

        let skip = old
            .entries
            .iter()
            .take_while(|e| {
                e.offset < delimiter.offset || (e.offset == delimiter.offset && **e != delimiter)
            })
            .count();
        old.passed += skip;
        old.entries.drain(..skip);

        if old.entries.first() != Some(&delimiter) {
            if old.passed > 1 {
                trace!(passed = old.passed, "old delimiter table discarded");
                self.old = None;
            }
            return false;
        }

        let tail = old.entries.split_off(1);
        let frontier = tail.last().unwrap_or(&delimiter).offset;
        if frontier <= batch_start {
            self.old = None;
            return false;
        }

        debug!(reused = tail.len(), frontier, "old delimiter table reused");
        self.entries.extend(tail);
        if self.entries.last().is_some_and(Delimiter::opens) {
            self.entries.pop();
        }
        self.frontier = Frontier::Pending(frontier);
        self.old = None;
        true
    }

    /// Close a batch that ended at `end` without reusing the old table.
    pub(crate) fn finish_batch(&mut self, end: usize, complete: bool) {
        self.frontier = if complete {
            Frontier::Complete
        } else {
            Frontier::Pending(end)
        };

        let Some(old) = self.old.as_mut() else {
            return;
        };
        let skip = old
            .entries
            .iter()
            .take_while(|e| e.offset < end || (e.offset == end && !e.opens()))
            .count();
        old.passed += skip;
        old.entries.drain(..skip);
        if complete || old.passed > 1 || old.entries.is_empty() {
            self.old = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: SyntaxKey = SyntaxKey(0);

    fn table(entries: &[Delimiter], frontier: Frontier) -> DelimiterTable {
        DelimiterTable {
            entries: entries.to_vec(),
            old: None,
            frontier,
        }
    }

    #[test]
    fn test_state_at_and_spans() {
        let t = table(
            &[
                Delimiter::opening(2, C),
                Delimiter::closing(5),
                Delimiter::opening(5, C),
                Delimiter::closing(8),
            ],
            Frontier::Complete,
        );
        assert_eq!(t.state_at(0), None);
        assert_eq!(t.state_at(2), Some(C));
        assert_eq!(t.state_at(5), Some(C));
        assert_eq!(t.state_at(8), None);
        assert_eq!(
            t.spans(0, 10),
            vec![(0, 2, None), (2, 5, Some(C)), (5, 8, Some(C)), (8, 10, None)]
        );
        assert_eq!(t.spans(3, 6), vec![(3, 5, Some(C)), (5, 6, Some(C))]);
    }

    #[test]
    fn test_edit_mapping() {
        let insert = Edit::Insert { offset: 4, len: 3 };
        assert_eq!(insert.map(Delimiter::opening(4, C)), Some(Delimiter::opening(7, C)));
        assert_eq!(insert.map(Delimiter::closing(4)), Some(Delimiter::closing(4)));

        let delete = Edit::Delete { offset: 4, len: 3 };
        assert_eq!(delete.map(Delimiter::closing(4)), Some(Delimiter::closing(4)));
        assert_eq!(delete.map(Delimiter::closing(7)), None);
        assert_eq!(delete.map(Delimiter::opening(4, C)), None);
        assert_eq!(delete.map(Delimiter::opening(7, C)), Some(Delimiter::opening(4, C)));
        assert_eq!(delete.map_offset(5), 4);
        assert_eq!(delete.map_offset(9), 6);
    }

    #[test]
    fn test_apply_edit_shifts_when_lines_agree() {
        let mut t = table(&[Delimiter::opening(10, C), Delimiter::closing(14)], Frontier::Complete);
        // two characters typed on line [0, 5)
        let fresh = [];
        assert!(t.apply_edit(Edit::Insert { offset: 1, len: 2 }, 0, 7, &fresh));
        assert_eq!(t.entries(), &[Delimiter::opening(12, C), Delimiter::closing(16)]);
        assert!(t.is_complete());
    }

    #[test]
    fn test_apply_edit_invalidates_on_mismatch() {
        let mut t = table(
            &[
                Delimiter::opening(0, C),
                Delimiter::closing(4),
                Delimiter::opening(10, C),
                Delimiter::closing(14),
            ],
            Frontier::Complete,
        );
        let fresh = [Delimiter::opening(7, C)];
        assert!(!t.apply_edit(Edit::Insert { offset: 7, len: 2 }, 5, 9, &fresh));
        assert_eq!(t.entries(), &[Delimiter::opening(0, C), Delimiter::closing(4)]);
        assert_eq!(t.frontier(), Frontier::Pending(5));
        assert!(t.has_old_table());
    }

    #[test]
    fn test_push_scanned_reuses_old_tail() {
        let mut t = table(&[], Frontier::Pending(0));
        t.old = Some(OldTable {
            entries: vec![
                Delimiter::closing(6),
                Delimiter::opening(9, C),
                Delimiter::closing(12),
                Delimiter::opening(20, C),
            ],
            passed: 0,
        });
        assert!(!t.push_scanned(Delimiter::opening(1, C), 0));
        assert!(t.push_scanned(Delimiter::closing(6), 0));
        // trailing opener dropped, frontier where it started
        assert_eq!(
            t.entries(),
            &[
                Delimiter::opening(1, C),
                Delimiter::closing(6),
                Delimiter::opening(9, C),
                Delimiter::closing(12),
            ]
        );
        assert_eq!(t.frontier(), Frontier::Pending(20));
        assert!(!t.has_old_table());
    }

    #[test]
    fn test_old_table_dropped_after_passing_entries() {
        let mut t = table(&[], Frontier::Pending(0));
        t.old = Some(OldTable {
            entries: vec![Delimiter::opening(3, C), Delimiter::closing(5), Delimiter::opening(30, C)],
            passed: 0,
        });
        assert!(!t.push_scanned(Delimiter::opening(8, C), 0));
        assert!(!t.has_old_table());
    }
}
