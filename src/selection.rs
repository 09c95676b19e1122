//! Cursor and range selection over a [`Patch`].
//!
//! The explorer is either idle, with a single cursor row, or anchored, where
//! the selection runs from the anchor to the cursor in whichever direction the
//! user dragged. Rows are global indices of the patch being explored.

use crate::patch::{LineKind, Patch};
use std::collections::BTreeSet;

/// Rows a synthesized single-hunk patch file spends before the hunk body:
/// the `---` and `+++` path lines and the `@@` header.
pub const EDIT_HEADER_LINES: usize = 3;

/// Every row between two anchors, inclusive, in ascending order.
///
/// ```
/// use git_patchwork::selection::expand_range;
///
/// assert_eq!(expand_range(5, 3), expand_range(3, 5));
/// assert_eq!(expand_range(3, 5).into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
/// ```
pub fn expand_range(a: usize, b: usize) -> BTreeSet<usize> {
    (a.min(b)..=a.max(b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Idle { cursor: usize },
    RangeAnchored { anchor: usize, cursor: usize },
}

impl Selection {
    pub fn cursor(&self) -> usize {
        match *self {
            Selection::Idle { cursor } | Selection::RangeAnchored { cursor, .. } => cursor,
        }
    }

    fn with_cursor(self, cursor: usize) -> Self {
        match self {
            Selection::Idle { .. } => Selection::Idle { cursor },
            Selection::RangeAnchored { anchor, .. } => Selection::RangeAnchored { anchor, cursor },
        }
    }
}

/// A parsed patch plus where the user is in it.
#[derive(Debug, Clone)]
pub struct PatchExplorer {
    patch: Patch,
    selection: Selection,
}

impl PatchExplorer {
    /// Start exploring `patch` with the cursor on the first change at or
    /// after `row`, or the last change if there is none after it.
    pub fn new(patch: Patch, row: usize) -> Self {
        let cursor = Self::change_at_or_after(&patch, row);
        Self {
            patch,
            selection: Selection::Idle { cursor },
        }
    }

    /// Swap in a freshly parsed patch, keeping the cursor near where it was.
    ///
    /// A range selection does not survive a refresh: the rows it covered may
    /// now mean different lines.
    pub fn set_patch(&mut self, patch: Patch) {
        let cursor = Self::change_at_or_after(&patch, self.selection.cursor());
        self.patch = patch;
        self.selection = Selection::Idle { cursor };
    }

    fn change_at_or_after(patch: &Patch, row: usize) -> usize {
        let changes = patch.change_indices();
        changes
            .iter()
            .copied()
            .find(|&i| i >= row)
            .or_else(|| changes.last().copied())
            .unwrap_or(0)
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    fn clamp(&self, row: usize) -> usize {
        row.min(self.patch.line_count().saturating_sub(1))
    }

    /// Put the cursor on `row`, clamped to the patch. Keeps any anchor.
    pub fn select_line(&mut self, row: usize) {
        self.selection = self.selection.with_cursor(self.clamp(row));
    }

    /// Move by `delta` rows, skipping nothing. Clamped at both ends.
    pub fn move_cursor(&mut self, delta: isize) {
        let row = self.selection.cursor().saturating_add_signed(delta);
        self.select_line(row);
    }

    /// Jump to the next added or removed line, if any.
    pub fn next_change(&mut self) {
        let cursor = self.selection.cursor();
        if let Some(row) = self.patch.change_indices().into_iter().find(|&i| i > cursor) {
            self.select_line(row);
        }
    }

    /// Jump to the previous added or removed line, if any.
    pub fn prev_change(&mut self) {
        let cursor = self.selection.cursor();
        if let Some(row) = self
            .patch
            .change_indices()
            .into_iter()
            .rev()
            .find(|&i| i < cursor)
        {
            self.select_line(row);
        }
    }

    /// Start a range at the cursor, or drop back to a single line.
    pub fn toggle_range(&mut self) {
        self.selection = match self.selection {
            Selection::Idle { cursor } => Selection::RangeAnchored {
                anchor: cursor,
                cursor,
            },
            Selection::RangeAnchored { cursor, .. } => Selection::Idle { cursor },
        };
    }

    /// Select the whole hunk under the cursor as a range.
    pub fn select_hunk(&mut self) {
        let (start, end) = self.current_hunk_bounds();
        self.selection = Selection::RangeAnchored {
            anchor: start,
            cursor: end,
        };
    }

    pub fn selecting_range(&self) -> bool {
        matches!(self.selection, Selection::RangeAnchored { .. })
    }

    /// The selected rows as `(first, last)`, ascending and clamped.
    pub fn selected_range(&self) -> (usize, usize) {
        match self.selection {
            Selection::Idle { cursor } => (self.clamp(cursor), self.clamp(cursor)),
            Selection::RangeAnchored { anchor, cursor } => (
                self.clamp(anchor.min(cursor)),
                self.clamp(anchor.max(cursor)),
            ),
        }
    }

    /// The selected rows as a set, ready for a transform.
    pub fn selected_indices(&self) -> BTreeSet<usize> {
        let (first, last) = self.selected_range();
        expand_range(first, last)
    }

    /// Rows of the `@@` header and the last body line of the hunk under the
    /// cursor.
    ///
    /// Outside any hunk (on the file header) this is the cursor row itself.
    pub fn current_hunk_bounds(&self) -> (usize, usize) {
        let cursor = self.selection.cursor();
        match self.patch.hunk_containing(cursor) {
            Some(hunk) => (hunk.header_index, hunk.last_index()),
            None => (cursor, cursor),
        }
    }

    /// Line number in the working file for the cursor row, for opening an
    /// editor there. Removed lines report their old-file position.
    pub fn current_line_number(&self) -> u32 {
        let cursor = self.selection.cursor();
        let Some(hunk) = self.patch.hunk_containing(cursor) else {
            return 1;
        };

        let mut old = hunk.old_start;
        let mut new = hunk.new_start;
        for line in &hunk.lines {
            if line.index >= cursor {
                return match line.kind {
                    LineKind::Removed => old,
                    _ => new,
                }
                .max(1);
            }
            match line.kind {
                LineKind::Added => new += 1,
                LineKind::Removed => old += 1,
                LineKind::Context => {
                    old += 1;
                    new += 1;
                }
            }
        }
        new.max(1)
    }

    /// Line to place an editor cursor on when the current hunk is written
    /// out as a standalone patch file. `hunk_start` is the `@@` row.
    pub fn edit_cursor_line(&self, hunk_start: usize) -> usize {
        let offset = self.selection.cursor().saturating_sub(hunk_start);
        offset + EDIT_HEADER_LINES
    }

    /// After applying a range, collapse the selection to its first row.
    pub fn collapse_to_first(&mut self) {
        if self.selecting_range() {
            let (first, _) = self.selected_range();
            self.selection = Selection::Idle { cursor: first };
        }
    }
}
