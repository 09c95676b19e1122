//! Accumulating a custom patch across files.
//!
//! A [`PatchBuilder`] remembers, per file, the diff the user was looking at
//! and which of its rows they picked. The file's contribution to the custom
//! patch is that diff transformed down to the picked rows, so picking more
//! lines later, or un-picking some, just edits the row set.
//!
//! Patches built against a commit can then be moved around history; see the
//! saga methods in [`rebase`](self::rebase).

mod rebase;

pub use rebase::PendingIndexMove;

use crate::collab::{ApplyOpts, Commit, PatchApplier};
use crate::patch::{Patch, TransformOpts};
use error_set::error_set;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

error_set! {
    /// Errors from applying or relocating a custom patch
    PatchBuilderError := {
        #[display("No patch has been built yet")]
        NoPatch,
        #[display("The patch was built against the working tree, not a commit")]
        NotACommitTarget,
        #[display("Commit index {index} is outside the commit list ({len} commits)")]
        CommitOutOfRange { index: usize, len: usize },
        #[display("The patch was built against {expected}, not {found}")]
        CommitMismatch { expected: String, found: String },
        #[display("The patch already belongs to the selected commit")]
        SameCommit,
        #[display("A rebase is already in progress; finish or abort it first")]
        RebaseInProgress,
        /// `git apply` refused the patch; nothing was changed
        #[display("Patch was rejected: {reason}")]
        ApplyRejected { reason: String },
        /// The repository is left mid-rebase and needs the user to resolve it
        #[display("Rebase paused during '{step}': {reason}")]
        RebasePaused { step: String, reason: String },
        #[display("Could not {step}: {reason}")]
        RebaseFailed { step: String, reason: String },
    }
}

/// What the patch is being built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    WorkingTree,
    Commit(Commit),
}

impl PatchTarget {
    pub fn commit_id(&self) -> Option<&str> {
        match self {
            PatchTarget::Commit(commit) => Some(&commit.id),
            PatchTarget::WorkingTree => None,
        }
    }
}

/// How much of a file's diff is in the patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Whole,
    Part,
    None,
}

#[derive(Debug, Clone)]
struct FileSelection {
    source: Patch,
    included: BTreeSet<usize>,
}

impl FileSelection {
    fn patch(&self, path: &str, reverse: bool) -> Patch {
        self.source.transform(&TransformOpts {
            reverse,
            included: &self.included,
            file_name_override: Some(path),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PatchBuilder {
    target: PatchTarget,
    files: BTreeMap<String, FileSelection>,
    pending: Option<PendingIndexMove>,
}

impl PatchBuilder {
    pub fn new(target: PatchTarget) -> Self {
        Self {
            target,
            files: BTreeMap::new(),
            pending: None,
        }
    }

    pub fn target(&self) -> &PatchTarget {
        &self.target
    }

    /// True if the patch lives in a commit, so moving it means rewriting
    /// history rather than a plain apply.
    pub fn can_rebase(&self) -> bool {
        matches!(self.target, PatchTarget::Commit(_))
    }

    /// True if any file contributes something to the patch.
    pub fn active(&self) -> bool {
        !self.files.is_empty()
    }

    /// Position of the target commit in `commits`, if it is there.
    pub fn target_index(&self, commits: &[Commit]) -> Option<usize> {
        let id = self.target.commit_id()?;
        commits.iter().position(|c| c.id == id)
    }

    /// Files with a non-empty contribution, in path order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Rows of `path`'s diff currently in the patch.
    pub fn included(&self, path: &str) -> Option<&BTreeSet<usize>> {
        self.files.get(path).map(|f| &f.included)
    }

    pub fn file_status(&self, path: &str) -> FileStatus {
        let Some(file) = self.files.get(path) else {
            return FileStatus::None;
        };
        let whole = file
            .source
            .change_indices()
            .iter()
            .all(|i| file.included.contains(i));
        if whole {
            FileStatus::Whole
        } else {
            FileStatus::Part
        }
    }

    /// Add rows of `source` (the diff of `path` in the target) to the patch.
    ///
    /// If `source` differs from the diff previously recorded for `path`, the
    /// old rows no longer mean anything and are dropped.
    pub fn add_lines(&mut self, path: &str, source: Patch, indices: &BTreeSet<usize>) {
        let changes: BTreeSet<usize> = source.change_indices().into_iter().collect();
        let file = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| FileSelection {
                source: source.clone(),
                included: BTreeSet::new(),
            });
        if file.source != source {
            debug!(path, "diff changed since lines were picked, starting over");
            file.source = source;
            file.included.clear();
        }
        file.included.extend(indices.intersection(&changes));
        self.prune(path);
    }

    /// Take rows of `path` out of the patch.
    pub fn remove_lines(&mut self, path: &str, indices: &BTreeSet<usize>) {
        if let Some(file) = self.files.get_mut(path) {
            file.included.retain(|i| !indices.contains(i));
        }
        self.prune(path);
    }

    /// Put every change of `source` into the patch.
    pub fn add_file(&mut self, path: &str, source: Patch) {
        let all: BTreeSet<usize> = source.change_indices().into_iter().collect();
        self.files.remove(path);
        self.add_lines(path, source, &all);
    }

    pub fn remove_file(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// Whole file in, or whole file out if it was already entirely in.
    pub fn toggle_file(&mut self, path: &str, source: Patch) {
        match self.file_status(path) {
            FileStatus::Whole => self.remove_file(path),
            FileStatus::Part | FileStatus::None => self.add_file(path, source),
        }
    }

    pub fn reset(&mut self) {
        self.files.clear();
    }

    /// Keep the file map equal to the set of files with something to apply.
    fn prune(&mut self, path: &str) {
        let empty = self
            .files
            .get(path)
            .is_some_and(|f| f.patch(path, false).is_empty());
        if empty {
            self.files.remove(path);
        }
    }

    fn file_patches(&self, reverse: bool) -> impl Iterator<Item = Patch> + '_ {
        self.files
            .iter()
            .map(move |(path, file)| file.patch(path, reverse))
    }

    /// The whole custom patch, file by file in path order.
    ///
    /// `plain` gives text for `git apply` or the clipboard; otherwise it is
    /// coloured for display.
    pub fn render_aggregated_patch(&self, plain: bool) -> String {
        self.file_patches(false)
            .map(|patch| {
                if plain {
                    patch.format_plain()
                } else {
                    patch.format_colored(&BTreeSet::new())
                }
            })
            .collect()
    }

    /// The patch to hand to `git apply`.
    ///
    /// With `reverse` the patch already expresses the inverse change, so it is
    /// applied forwards.
    pub fn patch_to_apply(&self, reverse: bool) -> Vec<u8> {
        self.file_patches(reverse)
            .flat_map(|patch| patch.to_bytes())
            .collect()
    }

    /// The exact inverse of `patch_to_apply(true)`.
    ///
    /// Once the reverse patch is amended into the commit, unselected lines
    /// that the forward patch treats as missing are present as context, so
    /// only undoing the reverse patch puts the selected lines back in the
    /// right place.
    pub fn redo_patch(&self) -> Vec<u8> {
        self.file_patches(true)
            .flat_map(|undo| {
                let all: BTreeSet<usize> = undo.change_indices().into_iter().collect();
                let path = undo.path().map(str::to_string);
                undo.transform(&TransformOpts {
                    reverse: true,
                    included: &all,
                    file_name_override: path.as_deref(),
                })
                .to_bytes()
            })
            .collect()
    }

    /// Apply the patch (or its inverse) to the repository.
    ///
    /// A commit-target patch goes to the index and working tree; a
    /// working-tree patch is staged. On success the applied files leave the
    /// builder; on failure nothing changes so the user can adjust and retry.
    pub fn apply_custom_patch(
        &mut self,
        applier: &impl PatchApplier,
        reverse: bool,
    ) -> Result<(), PatchBuilderError> {
        if !self.active() {
            return Err(PatchBuilderError::NoPatch);
        }

        let patch = self.patch_to_apply(reverse);
        let opts = match self.target {
            PatchTarget::Commit(_) => ApplyOpts {
                index: true,
                ..ApplyOpts::default()
            },
            PatchTarget::WorkingTree => ApplyOpts {
                cached: true,
                ..ApplyOpts::default()
            },
        };

        info!(reverse, files = self.files.len(), "applying custom patch");
        applier
            .apply_patch(&patch, opts)
            .map_err(|err| PatchBuilderError::ApplyRejected {
                reason: err.to_string(),
            })?;

        self.files.clear();
        Ok(())
    }
}
