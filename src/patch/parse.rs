//! Unified diff text into [`Patch`].
//!
//! Parsing is total: input that does not look like a diff becomes an empty
//! patch instead of an error. Diff text comes from git, so anything odd here
//! (binary markers, truncated output) is safer to treat as "nothing to do"
//! than to surface in the middle of an interactive session.

use super::{Hunk, Line, LineKind, NO_NEWLINE_MARKER, Patch};
use nom::bytes::complete::tag;
use nom::character::complete::u32 as number;
use nom::combinator::{opt, rest};
use nom::sequence::preceded;
use nom::{IResult, Parser};

/// Parsed `@@ -a,b +c,d @@heading` line
#[derive(Debug, PartialEq, Eq)]
struct HunkHeader<'a> {
    old_start: u32,
    old_len: u32,
    new_start: u32,
    new_len: u32,
    heading: &'a str,
}

/// `start[,len]`, where a missing length means 1
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(tag(","), number)))
        .map(|(start, len)| (start, len.unwrap_or(1)))
        .parse(input)
}

fn hunk_header(input: &str) -> IResult<&str, HunkHeader<'_>> {
    (
        preceded(tag("@@ -"), range),
        preceded(tag(" +"), range),
        preceded(tag(" @@"), rest),
    )
        .map(|((old_start, old_len), (new_start, new_len), heading)| HunkHeader {
            old_start,
            old_len,
            new_start,
            new_len,
            heading,
        })
        .parse(input)
}

/// Parse diff text for a single file.
///
/// Rows are numbered from 0 across the whole text (see [`Patch`]). Rows end
/// at `\n` only; a `\r` before it is part of the content.
pub(super) fn parse(text: &str) -> Patch {
    let mut header = Vec::new();
    let mut hunks: Vec<Hunk> = Vec::new();

    for (index, raw) in text.split_terminator('\n').enumerate() {
        if raw.starts_with("@@") {
            let Ok((_, h)) = hunk_header(raw) else {
                return Patch::default();
            };
            hunks.push(Hunk {
                old_start: h.old_start,
                old_len: h.old_len,
                new_start: h.new_start,
                new_len: h.new_len,
                heading: h.heading.to_string(),
                header_index: index,
                lines: Vec::new(),
            });
            continue;
        }

        let Some(hunk) = hunks.last_mut() else {
            header.push(raw.to_string());
            continue;
        };

        if raw.starts_with('\\') {
            // The marker belongs to the line above it. One without a line is junk.
            match hunk.lines.last_mut() {
                Some(line) if raw == NO_NEWLINE_MARKER => line.missing_newline = true,
                _ => return Patch::default(),
            }
            continue;
        }

        let (kind, content) = match raw.chars().next() {
            Some('+') => (LineKind::Added, &raw[1..]),
            Some('-') => (LineKind::Removed, &raw[1..]),
            Some(' ') => (LineKind::Context, &raw[1..]),
            // Editors commonly strip the lone space of an empty context line
            None => (LineKind::Context, ""),
            Some(_) => return Patch::default(),
        };

        hunk.lines.push(Line {
            kind,
            content: content.to_string(),
            index,
            missing_newline: false,
        });
    }

    if hunks.is_empty() && header.iter().all(|l| l.trim().is_empty()) {
        return Patch::default();
    }

    Patch {
        header,
        hunks,
        ..Patch::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn header_with_counts() {
        let (_, h) = hunk_header("@@ -10,2 +10,3 @@ fn main() {").unwrap();
        assert_eq!(
            h,
            HunkHeader {
                old_start: 10,
                old_len: 2,
                new_start: 10,
                new_len: 3,
                heading: " fn main() {",
            }
        );
    }

    #[test]
    fn header_with_elided_counts() {
        let (_, h) = hunk_header("@@ -15 +14,0 @@").unwrap();
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (15, 1, 14, 0));
        assert_eq!(h.heading, "");
    }

    #[test]
    fn header_rejects_garbage() {
        assert!(hunk_header("@@ -x +1 @@").is_err());
        assert!(hunk_header("@@ -1 +1").is_err());
    }

    #[test]
    fn indices_run_across_hunks() {
        let patch = parse(
            "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n a\n-b\n+c\n@@ -9 +9,2 @@\n x\n+y\n",
        );
        assert_eq!(patch.header, vec!["--- a/f", "+++ b/f"]);
        assert_eq!(patch.hunks.len(), 2);

        let indices: Vec<_> = patch.lines().map(|l| (l.kind.prefix(), l.index)).collect();
        assert_eq!(
            indices,
            vec![(' ', 3), ('-', 4), ('+', 5), (' ', 7), ('+', 8)]
        );
        assert_eq!(patch.hunks[1].header_index, 6);
    }

    #[test]
    fn no_newline_marker_flags_previous_line() {
        let patch = parse(
            "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n",
        );
        let lines: Vec<_> = patch.lines().collect();
        assert!(lines[0].missing_newline);
        assert!(!lines[1].missing_newline);
        // the marker still takes up a row
        assert_eq!(lines[1].index, 5);
    }

    #[test]
    fn empty_input_is_empty_patch() {
        assert_eq!(parse(""), Patch::default());
        assert_eq!(parse("\n\n"), Patch::default());
    }

    #[test]
    fn binary_diff_has_no_hunks() {
        let patch = parse(
            "diff --git a/img.png b/img.png\nindex 1..2 100644\nBinary files a/img.png and b/img.png differ\n",
        );
        assert!(patch.is_empty());
        assert_eq!(patch.header.len(), 3);
    }

    #[test]
    fn malformed_hunk_header_is_empty_patch() {
        assert_eq!(parse("--- a/f\n+++ b/f\n@@ nonsense @@\n+x\n"), Patch::default());
    }

    #[test]
    fn unknown_body_line_is_empty_patch() {
        assert_eq!(parse("--- a/f\n+++ b/f\n@@ -1 +1 @@\n?what\n"), Patch::default());
    }

    #[test]
    fn stray_marker_is_empty_patch() {
        assert_eq!(
            parse("--- a/f\n+++ b/f\n@@ -0,0 +1 @@\n\\ No newline at end of file\n"),
            Patch::default()
        );
    }

    #[test]
    fn stripped_empty_context_line() {
        let patch = parse("--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n\n-a\n+b\n");
        let first = patch.lines().next().unwrap();
        assert_eq!(first.kind, LineKind::Context);
        assert_eq!(first.content, "");
    }

    #[test]
    fn carriage_returns_stay_in_content() {
        let text = "--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n a\r\n+new\r\n b\r\n";
        let patch = parse(text);
        let contents: Vec<_> = patch.lines().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["a\r", "new\r", "b\r"]);
        assert_eq!(patch.format_plain(), text);
    }

    #[test]
    fn content_with_diff_markers() {
        let patch = parse(
            "--- a/f\n+++ b/f\n@@ -5,0 +6,3 @@\n++++ plus\n+--- minus\n+@@ header-ish\n",
        );
        let contents: Vec<_> = patch.lines().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["+++ plus", "--- minus", "@@ header-ish"]);
    }
}
