use super::{Hunk, Line, LineKind, Patch};
use std::collections::BTreeSet;

/// Options for [`Patch::transform`].
#[derive(Debug, Clone, Copy)]
pub struct TransformOpts<'a> {
    /// Produce the inverse change (for unstaging, discarding, or removing a
    /// patch from the commit it was built against)
    pub reverse: bool,
    /// Rows to keep, as global indices of the source patch
    pub included: &'a BTreeSet<usize>,
    /// Path to write fresh `---`/`+++` headers for. Without one the source
    /// header is copied unchanged.
    pub file_name_override: Option<&'a str>,
}

impl Patch {
    /// Build a new patch containing only the selected changes.
    ///
    /// Unselected additions are dropped and unselected removals become
    /// context, so the result still applies against the same file as the
    /// source. With `reverse`, roles are swapped first: the result applies
    /// against the *new* side and undoes the selected lines.
    ///
    /// Headers are recomputed hunk by hunk. Old starts come straight from the
    /// source, since the file the patch applies to is untouched by earlier
    /// hunks; new starts carry the net line delta of every hunk emitted
    /// before them.
    ///
    /// Hunks without a selected change are dropped entirely. If nothing is
    /// left, the result is an empty patch with no header.
    #[must_use]
    pub fn transform(&self, opts: &TransformOpts<'_>) -> Patch {
        let mut hunks = Vec::new();
        let mut delta: i64 = 0;

        for hunk in &self.hunks {
            let selected = hunk
                .lines
                .iter()
                .any(|l| l.kind.is_change() && opts.included.contains(&l.index));
            if !selected {
                continue;
            }

            let Some(out) = transform_hunk(hunk, opts, delta) else {
                continue;
            };
            delta += i64::from(out.new_len) - i64::from(out.old_len);
            hunks.push(out);
        }

        if hunks.is_empty() {
            return Patch::default();
        }

        Patch {
            header: self.transformed_header(opts, &hunks),
            hunks,
            encoding: self.encoding,
        }
    }

    fn transformed_header(&self, opts: &TransformOpts<'_>, hunks: &[Hunk]) -> Vec<String> {
        let Some(path) = opts.file_name_override else {
            return self.header.clone();
        };

        let (mut old_null, mut new_null) = self.null_sides();
        if opts.reverse {
            std::mem::swap(&mut old_null, &mut new_null);
        }
        // A deletion header is only right if nothing of the file survives.
        let removes_everything = hunks.iter().all(|h| h.new_len == 0);

        let old = if old_null {
            "/dev/null".to_string()
        } else {
            format!("a/{path}")
        };
        let new = if new_null && removes_everything {
            "/dev/null".to_string()
        } else {
            format!("b/{path}")
        };

        vec![format!("--- {old}"), format!("+++ {new}")]
    }
}

fn transform_hunk(hunk: &Hunk, opts: &TransformOpts<'_>, delta: i64) -> Option<Hunk> {
    let mut lines: Vec<Line> = hunk
        .lines
        .iter()
        .filter_map(|line| {
            let kind = if opts.reverse {
                line.kind.swapped()
            } else {
                line.kind
            };
            let kind = match kind {
                LineKind::Added if !opts.included.contains(&line.index) => return None,
                LineKind::Removed if !opts.included.contains(&line.index) => LineKind::Context,
                kind => kind,
            };
            Some(Line {
                kind,
                ..line.clone()
            })
        })
        .collect();

    if !lines.iter().any(|l| l.kind.is_change()) {
        return None;
    }

    bridge_missing_newline(&mut lines);
    removals_first(&mut lines);

    let count = |keep: fn(LineKind) -> bool| -> u32 {
        let n = lines.iter().filter(|l| keep(l.kind)).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    };
    let old_len = count(|k| k != LineKind::Added);
    let new_len = count(|k| k != LineKind::Removed);

    let old_start = if opts.reverse {
        hunk.new_start
    } else {
        hunk.old_start
    };

    // A zero-length side names the line before the change rather than the
    // first line of it.
    let old_before = if old_len == 0 {
        i64::from(old_start)
    } else {
        i64::from(old_start) - 1
    };
    let new_before = (old_before + delta).max(0);
    let new_start = if new_len == 0 {
        new_before
    } else {
        new_before + 1
    };

    Some(Hunk {
        old_start,
        old_len,
        new_start: u32::try_from(new_start).unwrap_or(u32::MAX),
        new_len,
        heading: hunk.heading.clone(),
        header_index: hunk.header_index,
        lines,
    })
}

/// A context line without a trailing newline can only be the last line of
/// the file, so nothing may be added after it. When additions do follow,
/// replace it by removing it and re-adding it with a newline.
fn bridge_missing_newline(lines: &mut Vec<Line>) {
    let Some(pos) = lines
        .iter()
        .position(|l| l.kind == LineKind::Context && l.missing_newline)
    else {
        return;
    };
    if !lines[pos + 1..].iter().any(|l| l.kind == LineKind::Added) {
        return;
    }

    let mut copy = lines[pos].clone();
    copy.kind = LineKind::Added;
    copy.missing_newline = false;
    lines[pos].kind = LineKind::Removed;
    lines.insert(pos + 1, copy);
}

/// Within every run of changed lines, put removals ahead of additions.
fn removals_first(lines: &mut [Line]) {
    for run in lines.split_mut(|l| l.kind == LineKind::Context) {
        // stable: keeps the relative order inside each kind
        run.sort_by_key(|l| l.kind == LineKind::Added);
    }
}
