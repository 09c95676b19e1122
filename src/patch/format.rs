use super::{Hunk, LineKind, NO_NEWLINE_MARKER, Patch, TextEncoding};
use crossterm::style::Stylize;
use std::collections::BTreeSet;
use std::fmt;

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header_line())?;

        for line in &self.lines {
            writeln!(f, "{}{}", line.kind.prefix(), line.content)?;
            if line.missing_newline {
                writeln!(f, "{NO_NEWLINE_MARKER}")?;
            }
        }

        Ok(())
    }
}

impl Hunk {
    /// The `@@ -a,b +c,d @@` line, eliding counts of exactly one like git does.
    pub fn header_line(&self) -> String {
        let side = |start: u32, len: u32| match len {
            1 => format!("{start}"),
            n => format!("{start},{n}"),
        };
        format!(
            "@@ -{} +{} @@{}",
            side(self.old_start, self.old_len),
            side(self.new_start, self.new_len),
            self.heading
        )
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.header {
            writeln!(f, "{line}")?;
        }
        for hunk in &self.hunks {
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}

impl Patch {
    /// Serialize back to unified diff text, suitable for `git apply`.
    pub fn format_plain(&self) -> String {
        self.to_string()
    }

    /// Serialize to the bytes `git apply` should read, undoing the decoding
    /// done by [`Patch::parse_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let text = self.format_plain();
        match self.encoding {
            TextEncoding::Utf8 => text.into_bytes(),
            TextEncoding::Latin1 => {
                let mut bytes = Vec::with_capacity(text.len());
                for c in text.chars() {
                    match u8::try_from(c) {
                        Ok(byte) => bytes.push(byte),
                        // only paths supplied by the caller can get here
                        Err(_) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
                    }
                }
                bytes
            }
        }
    }

    /// Render for a terminal, one entry per row.
    ///
    /// Rows whose index is in `included` get a `▌` gutter so a partially
    /// built patch can be seen at a glance.
    pub fn format_colored(&self, included: &BTreeSet<usize>) -> String {
        let mut out = String::new();
        let gutter = |index: usize| {
            if included.contains(&index) {
                "▌".green().to_string()
            } else {
                " ".to_string()
            }
        };

        for line in &self.header {
            out.push_str(&format!(" {}\n", line.as_str().bold()));
        }

        for hunk in &self.hunks {
            out.push_str(&format!(" {}\n", hunk.header_line().cyan()));
            for line in &hunk.lines {
                let text = format!("{}{}", line.kind.prefix(), line.content);
                let styled = match line.kind {
                    LineKind::Added => text.green().to_string(),
                    LineKind::Removed => text.red().to_string(),
                    LineKind::Context => text,
                };
                out.push_str(&format!("{}{styled}\n", gutter(line.index)));
                if line.missing_newline {
                    out.push_str(&format!(" {}\n", NO_NEWLINE_MARKER.dark_grey()));
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn roundtrip(text: &str) {
        assert_eq!(Patch::parse(text).format_plain(), text);
    }

    #[test]
    fn roundtrip_git_header_and_context() {
        roundtrip(concat!(
            "diff --git a/src/lib.rs b/src/lib.rs\n",
            "index 3b18e51..a0e2bd3 100644\n",
            "--- a/src/lib.rs\n",
            "+++ b/src/lib.rs\n",
            "@@ -10,6 +10,7 @@ pub fn parse(text: &str) -> Patch {\n",
            " let mut header = Vec::new();\n",
            " let mut hunks = Vec::new();\n",
            "-let mut index = 0;\n",
            "+let mut row = 0;\n",
            "+let mut seen = false;\n",
            " \n",
            " for raw in text.lines() {\n",
            "     if raw.starts_with(\"@@\") {\n",
        ));
    }

    #[test]
    fn roundtrip_elided_counts() {
        roundtrip("--- a/zsh.nix\n+++ b/zsh.nix\n@@ -15 +14,0 @@ line 14\n-      enableAutosuggestions = true;\n");
        roundtrip("--- a/flake.nix\n+++ b/flake.nix\n@@ -136,0 +137 @@\n+      debug = true;\n");
    }

    #[test]
    fn roundtrip_both_missing_newline() {
        roundtrip(
            "--- a/f\n+++ b/f\n@@ -3 +3 @@\n-old version\n\\ No newline at end of file\n+new version\n\\ No newline at end of file\n",
        );
    }

    #[test]
    fn roundtrip_new_file() {
        roundtrip(
            "diff --git a/new.txt b/new.txt\nnew file mode 100644\nindex 0000000..3b18e51\n--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,2 @@\n+hello\n+world\n",
        );
    }

    #[test]
    fn roundtrip_crlf_content() {
        roundtrip("--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n a\r\n-b\r\n+c\r\n");
        roundtrip("--- a/f\n+++ b/f\n@@ -1 +1 @@\n-x\r\n+y\r\n\\ No newline at end of file\n");
    }

    #[test]
    fn latin1_bytes_survive_a_roundtrip() {
        let bytes = b"--- a/f\n+++ b/f\n@@ -1 +1 @@\n-caf\xe9\n+th\xe9\n".to_vec();
        let patch = Patch::parse_bytes(&bytes);
        assert_eq!(patch.encoding, TextEncoding::Latin1);
        let contents: Vec<_> = patch.lines().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["café", "thé"]);
        assert_eq!(patch.to_bytes(), bytes);
    }

    #[test]
    fn utf8_bytes_parse_as_text() {
        let patch = Patch::parse_bytes("--- a/f\n+++ b/f\n@@ -1 +1 @@\n-café\n+thé\n".as_bytes());
        assert_eq!(patch.encoding, TextEncoding::Utf8);
        assert_eq!(patch.to_bytes(), "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-café\n+thé\n".as_bytes());
    }

    #[test]
    fn empty_patch_formats_to_nothing() {
        assert_eq!(Patch::default().format_plain(), "");
    }

    #[test]
    fn header_line_elision() {
        let hunk = Hunk {
            old_start: 10,
            old_len: 0,
            new_start: 11,
            new_len: 1,
            heading: String::new(),
            header_index: 0,
            lines: vec![],
        };
        assert_eq!(hunk.header_line(), "@@ -10,0 +11 @@");
    }

    #[test]
    fn colored_marks_included_rows() {
        let patch = Patch::parse("--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n");
        let rendered = patch.format_colored(&BTreeSet::from([4]));
        let rows: Vec<_> = rendered.lines().collect();
        assert_eq!(rows.len(), patch.line_count());
        assert!(!rows[3].contains('▌'));
        assert!(rows[4].contains('▌'));
        assert!(rows[4].contains("+new"));
    }
}
