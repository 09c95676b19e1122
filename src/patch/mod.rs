//! Line-addressable unified diffs.
//!
//! A [`Patch`] is the parsed form of a single-file unified diff. Every row of
//! the diff as it is displayed (header lines, hunk headers, body lines and
//! `\ No newline at end of file` markers) owns one slot of a running counter,
//! and each body [`Line`] remembers the slot it was parsed into. That slot is
//! the *global index* a selection refers to. Transforms copy lines with their
//! original index, so a selection made against the parsed diff keeps meaning
//! the same lines no matter how the output is renumbered.
//!
//! ```
//! use git_patchwork::patch::{Patch, LineKind};
//!
//! let patch = Patch::parse("--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n");
//! assert_eq!(patch.path(), Some("f"));
//! // Rows 0 and 1 are the path headers, row 2 is the hunk header.
//! assert_eq!(patch.line_at(3).map(|l| l.kind), Some(LineKind::Removed));
//! assert_eq!(patch.line_at(4).map(|l| l.kind), Some(LineKind::Added));
//! ```

mod format;
mod parse;
mod transform;

pub use transform::TransformOpts;

/// Marker git prints after a line that lacks a trailing newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// How a body line participates in the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Present on both sides (` ` prefix)
    Context,
    /// Only in the new file (`+` prefix)
    Added,
    /// Only in the old file (`-` prefix)
    Removed,
}

impl LineKind {
    /// The prefix character written in front of the content.
    pub fn prefix(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
        }
    }

    /// True for added and removed lines.
    pub fn is_change(self) -> bool {
        !matches!(self, LineKind::Context)
    }

    /// The same line seen from the other side of the diff.
    pub fn swapped(self) -> Self {
        match self {
            LineKind::Context => LineKind::Context,
            LineKind::Added => LineKind::Removed,
            LineKind::Removed => LineKind::Added,
        }
    }
}

/// A single body line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    /// Text without the prefix character or the trailing newline
    pub content: String,
    /// Row of this line in the diff it was parsed from
    pub index: usize,
    /// A `\ No newline at end of file` marker follows this line
    pub missing_newline: bool,
}

/// One `@@` block of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    /// Anything git printed after the closing `@@`, including the leading space
    pub heading: String,
    /// Row of the `@@` header line
    pub header_index: usize,
    pub lines: Vec<Line>,
}

impl Hunk {
    /// True if at least one line is added or removed.
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.kind.is_change())
    }

    /// Last row occupied by this hunk, marker rows included.
    pub fn last_index(&self) -> usize {
        self.lines
            .last()
            .map(|l| l.index + usize::from(l.missing_newline))
            .unwrap_or(self.header_index)
    }
}

/// How the bytes of a diff map onto the text of a [`Patch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// The diff was not valid UTF-8, so each byte was read as the char with
    /// the same value
    Latin1,
}

/// A parsed single-file unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// Lines before the first hunk (`diff --git`, `index`, `---`, `+++`, ...)
    pub header: Vec<String>,
    pub hunks: Vec<Hunk>,
    /// Encoding [`to_bytes`](Self::to_bytes) writes back
    pub encoding: TextEncoding,
}

impl Patch {
    /// Parse unified diff text. Never fails; see [`parse`](self::parse).
    pub fn parse(text: &str) -> Self {
        parse::parse(text)
    }

    /// Parse diff output exactly as git printed it.
    ///
    /// Files in a legacy encoding produce diffs that are not UTF-8. Those are
    /// decoded byte for byte, and [`to_bytes`](Self::to_bytes) restores the
    /// original bytes.
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => parse::parse(text),
            Err(_) => {
                let text: String = bytes.iter().copied().map(char::from).collect();
                Patch {
                    encoding: TextEncoding::Latin1,
                    ..parse::parse(&text)
                }
            }
        }
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Path of the file this patch changes, without the `a/` or `b/` prefix.
    ///
    /// Taken from the `+++` header, or from `---` when the file is deleted.
    pub fn path(&self) -> Option<&str> {
        let side = |prefix: &str| {
            self.header
                .iter()
                .find_map(|line| line.strip_prefix(prefix))
                .map(strip_path_prefix)
        };
        match side("+++ ") {
            Some("/dev/null") | None => side("--- ").filter(|p| *p != "/dev/null"),
            Some(path) => Some(path),
        }
    }

    /// Whether the old (`---`) or new (`+++`) side of the header is `/dev/null`.
    pub(crate) fn null_sides(&self) -> (bool, bool) {
        let is_null = |prefix: &str| {
            self.header
                .iter()
                .any(|line| line.strip_prefix(prefix) == Some("/dev/null"))
        };
        (is_null("--- "), is_null("+++ "))
    }

    /// Number of rows the patch occupies when displayed.
    pub fn line_count(&self) -> usize {
        self.hunks
            .last()
            .map(|h| h.last_index() + 1)
            .unwrap_or(self.header.len())
    }

    /// The body line parsed into row `index`, if that row is a body line.
    pub fn line_at(&self, index: usize) -> Option<&Line> {
        self.hunk_containing(index)?
            .lines
            .iter()
            .find(|l| l.index == index)
    }

    /// The hunk whose header or body covers row `index`.
    pub fn hunk_containing(&self, index: usize) -> Option<&Hunk> {
        self.hunks
            .iter()
            .find(|h| (h.header_index..=h.last_index()).contains(&index))
    }

    /// Rows of every added or removed line, ascending.
    pub fn change_indices(&self) -> Vec<usize> {
        self.lines()
            .filter(|l| l.kind.is_change())
            .map(|l| l.index)
            .collect()
    }

    /// Every body line in order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.hunks.iter().flat_map(|h| h.lines.iter())
    }
}

/// Strip git's `a/` or `b/` path prefix, and any tab-separated timestamp.
fn strip_path_prefix(path: &str) -> &str {
    let path = path.split('\t').next().unwrap_or(path);
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}
