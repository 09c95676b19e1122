//! Moving a commit-target patch through history.
//!
//! Every saga follows the same shape: stop an interactive rebase at the
//! commit(s) involved, apply the patch or its inverse there, amend, and let
//! the rebase replay the rest. A rejected apply before anything was rewritten
//! aborts the rebase. Anything that goes wrong after that leaves the rebase
//! paused and is reported as [`PatchBuilderError::RebasePaused`] so the user
//! can resolve it with ordinary git commands.

use super::{PatchBuilder, PatchBuilderError, PatchTarget};
use crate::collab::{ApplyOpts, Commit, PatchApplier, RebaseError, RebaseProgress, Rebaser};
use tracing::{info, warn};

const INDEX: ApplyOpts = ApplyOpts {
    reverse: false,
    cached: false,
    index: true,
};

fn paused(step: &str) -> impl FnOnce(RebaseError) -> PatchBuilderError + '_ {
    move |err| {
        warn!(step, %err, "rebase left paused");
        PatchBuilderError::RebasePaused {
            step: step.to_string(),
            reason: err.to_string(),
        }
    }
}

fn failed(step: &str) -> impl FnOnce(RebaseError) -> PatchBuilderError + '_ {
    move |err| match err {
        RebaseError::Conflict { reason } => PatchBuilderError::RebasePaused {
            step: step.to_string(),
            reason,
        },
        RebaseError::Failed { reason, .. } => PatchBuilderError::RebaseFailed {
            step: step.to_string(),
            reason,
        },
    }
}

/// What is left of [`PatchBuilder::move_patch_into_index`] after its rebase
/// paused with the commit already rewritten.
///
/// Once the user finishes the rebase, [`PatchBuilder::resume_pending`] stages
/// the patch and restores the stash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIndexMove {
    patch: Vec<u8>,
    /// HEAD before the rebase started; finding it again means it was aborted
    orig_head: String,
    commit_index: usize,
    stash: bool,
}

impl PendingIndexMove {
    /// Position, newest first, of the commit the patch is taken out of.
    pub fn commit_index(&self) -> usize {
        self.commit_index
    }

    /// True if uncommitted changes wait in the stash.
    pub fn stashed(&self) -> bool {
        self.stash
    }
}

/// Apply inside a rebase that has not rewritten anything yet. On rejection
/// the rebase is aborted, which puts the branch back as it was.
fn apply_or_abort(
    rebaser: &impl Rebaser,
    applier: &impl PatchApplier,
    patch: &[u8],
) -> Result<(), PatchBuilderError> {
    if let Err(err) = applier.apply_patch(patch, INDEX) {
        warn!(%err, "patch rejected, aborting rebase");
        if let Err(abort) = rebaser.abort_rebase() {
            warn!(%abort, "could not abort rebase");
        }
        return Err(PatchBuilderError::ApplyRejected {
            reason: err.to_string(),
        });
    }
    Ok(())
}

/// Apply after history has already been rewritten; the rebase stays paused
/// on rejection.
fn apply_or_pause(
    applier: &impl PatchApplier,
    patch: &[u8],
    step: &str,
) -> Result<(), PatchBuilderError> {
    applier.apply_patch(patch, INDEX).map_err(|err| {
        warn!(step, %err, "patch rejected mid-rebase");
        PatchBuilderError::RebasePaused {
            step: step.to_string(),
            reason: err.to_string(),
        }
    })
}

/// Continue and expect the rebase to run to the end.
fn finish(rebaser: &impl Rebaser, step: &str) -> Result<(), PatchBuilderError> {
    match rebaser.continue_rebase().map_err(paused(step))? {
        RebaseProgress::Finished => Ok(()),
        RebaseProgress::Paused(id) => Err(PatchBuilderError::RebasePaused {
            step: step.to_string(),
            reason: format!("rebase stopped unexpectedly at {id}"),
        }),
    }
}

impl PatchBuilder {
    fn check_ready(&self, rebaser: &impl Rebaser) -> Result<(), PatchBuilderError> {
        if !self.active() {
            return Err(PatchBuilderError::NoPatch);
        }
        if !self.can_rebase() {
            return Err(PatchBuilderError::NotACommitTarget);
        }
        if rebaser.rebase_in_progress() {
            return Err(PatchBuilderError::RebaseInProgress);
        }
        Ok(())
    }

    /// The commit at `index`, which must be the one the patch was built from.
    fn source_commit<'c>(
        &self,
        commits: &'c [Commit],
        index: usize,
    ) -> Result<&'c Commit, PatchBuilderError> {
        let commit = commit_at(commits, index)?;
        match &self.target {
            PatchTarget::Commit(target) if target.id == commit.id => Ok(commit),
            PatchTarget::Commit(target) => Err(PatchBuilderError::CommitMismatch {
                expected: target.short_id().to_string(),
                found: commit.short_id().to_string(),
            }),
            PatchTarget::WorkingTree => Err(PatchBuilderError::NotACommitTarget),
        }
    }

    /// Remove the patch from the commit at `commit_index`.
    ///
    /// `commits` is the branch, newest first.
    pub fn delete_patches_from_commit(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
        commits: &[Commit],
        commit_index: usize,
    ) -> Result<(), PatchBuilderError> {
        self.check_ready(rebaser)?;
        let commit = self.source_commit(commits, commit_index)?;
        let reverse = self.patch_to_apply(true);
        info!(commit = commit.short_id(), "removing patch from commit");

        rebaser
            .checkout_commit(&commit.id)
            .map_err(failed("start rebase"))?;
        apply_or_abort(rebaser, applier, &reverse)?;
        rebaser
            .amend_current_commit()
            .map_err(paused("amend commit"))?;
        finish(rebaser, "replay later commits")?;

        self.reset();
        Ok(())
    }

    /// Take the patch out of the commit at `source_index` and put it into
    /// the one at `dest_index`.
    pub fn move_patch_to_selected_commit(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
        commits: &[Commit],
        source_index: usize,
        dest_index: usize,
    ) -> Result<(), PatchBuilderError> {
        self.check_ready(rebaser)?;
        let source = self.source_commit(commits, source_index)?;
        let dest = commit_at(commits, dest_index)?;
        if source_index == dest_index {
            return Err(PatchBuilderError::SameCommit);
        }

        info!(
            from = source.short_id(),
            to = dest.short_id(),
            "moving patch between commits"
        );

        if dest_index > source_index {
            // The destination is older. Applying the patch there first means
            // the source commit, replayed afterwards, already finds the change
            // in place and its own copy of it collapses away.
            let forward = self.patch_to_apply(false);
            rebaser
                .checkout_commit(&dest.id)
                .map_err(failed("start rebase"))?;
            apply_or_pause(applier, &forward, "apply patch to destination commit")?;
            rebaser
                .amend_current_commit()
                .map_err(paused("amend destination commit"))?;
            finish(rebaser, "replay later commits")?;
        } else {
            let reverse = self.patch_to_apply(true);
            let redo = self.redo_patch();
            rebaser
                .checkout_commits(&[&source.id, &dest.id])
                .map_err(failed("start rebase"))?;
            apply_or_abort(rebaser, applier, &reverse)?;
            rebaser
                .amend_current_commit()
                .map_err(paused("amend source commit"))?;

            match rebaser
                .continue_rebase()
                .map_err(paused("replay up to destination commit"))?
            {
                RebaseProgress::Paused(_) => {}
                RebaseProgress::Finished => {
                    return Err(PatchBuilderError::RebaseFailed {
                        step: "stop at destination commit".to_string(),
                        reason: "rebase finished before reaching it".to_string(),
                    });
                }
            }

            apply_or_pause(applier, &redo, "apply patch to destination commit")?;
            rebaser
                .amend_current_commit()
                .map_err(paused("amend destination commit"))?;
            finish(rebaser, "replay later commits")?;
        }

        self.reset();
        Ok(())
    }

    /// Take the patch out of its commit and leave it staged on top of HEAD.
    ///
    /// With `stash`, uncommitted changes are stashed first and restored at
    /// the end. If the rebase pauses after the commit was rewritten, the
    /// rest of the move is kept as [`pending`](Self::pending).
    pub fn move_patch_into_index(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
        commits: &[Commit],
        commit_index: usize,
        stash: bool,
    ) -> Result<(), PatchBuilderError> {
        self.check_ready(rebaser)?;
        let commit = self.source_commit(commits, commit_index)?;
        let reverse = self.patch_to_apply(true);
        let pending = PendingIndexMove {
            patch: self.redo_patch(),
            orig_head: rebaser.head_commit().map_err(failed("read HEAD"))?,
            commit_index,
            stash,
        };
        info!(commit = commit.short_id(), stash, "moving patch into index");

        if stash {
            rebaser
                .stash_push(&format!(
                    "git-patchwork: moving patch out of {}",
                    commit.short_id()
                ))
                .map_err(failed("stash working tree changes"))?;
        }

        let rewrite = || -> Result<(), PatchBuilderError> {
            rebaser
                .checkout_commit(&commit.id)
                .map_err(failed("start rebase"))?;
            apply_or_abort(rebaser, applier, &reverse)?;
            rebaser
                .amend_current_commit()
                .map_err(paused("amend commit"))?;
            finish(rebaser, "replay later commits")
        };

        match rewrite() {
            Ok(()) => self.finish_index_move(rebaser, applier, &pending),
            // history untouched: hand the stash back
            Err(
                err @ (PatchBuilderError::ApplyRejected { .. }
                | PatchBuilderError::RebaseFailed { .. }),
            ) => {
                if stash {
                    if let Err(pop) = rebaser.stash_pop() {
                        warn!(%pop, "could not restore stashed changes");
                    }
                }
                Err(err)
            }
            Err(err) => {
                info!("keeping the index move until the rebase is finished");
                self.pending = Some(pending);
                Err(err)
            }
        }
    }

    /// The rest of an interrupted [`move_patch_into_index`](Self::move_patch_into_index).
    pub fn pending(&self) -> Option<&PendingIndexMove> {
        self.pending.as_ref()
    }

    /// Complete the pending index move once its rebase is over.
    ///
    /// Returns `Ok(false)` if there is nothing to do yet. A rebase that was
    /// aborted left the patch in its commit, so then only the stash comes
    /// back.
    pub fn resume_pending(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
    ) -> Result<bool, PatchBuilderError> {
        let aborted = match &self.pending {
            None => return Ok(false),
            Some(_) if rebaser.rebase_in_progress() => return Ok(false),
            Some(pending) => {
                rebaser.head_commit().map_err(failed("read HEAD"))? == pending.orig_head
            }
        };
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };

        if aborted {
            info!("rebase was aborted, the patch stays in its commit");
            if pending.stash {
                rebaser
                    .stash_pop()
                    .map_err(failed("restore stashed changes"))?;
            }
            return Ok(true);
        }

        info!("rebase finished, moving patch into index");
        self.finish_index_move(rebaser, applier, &pending)?;
        Ok(true)
    }

    /// Stage the patch on the rewritten branch and bring the stash back.
    fn finish_index_move(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
        pending: &PendingIndexMove,
    ) -> Result<(), PatchBuilderError> {
        // On rejection the builder is kept so the patch can still be copied.
        let applied = applier.apply_patch(&pending.patch, INDEX);
        if applied.is_ok() {
            self.reset();
        }

        if pending.stash {
            rebaser
                .stash_pop()
                .map_err(failed("restore stashed changes"))?;
        }
        applied.map_err(|err| PatchBuilderError::ApplyRejected {
            reason: format!("{err} (the commit no longer contains the patch)"),
        })
    }

    /// Split the patch out of its commit into a new commit right after it.
    pub fn pull_patch_into_new_commit(
        &mut self,
        rebaser: &impl Rebaser,
        applier: &impl PatchApplier,
        commits: &[Commit],
        commit_index: usize,
    ) -> Result<(), PatchBuilderError> {
        self.check_ready(rebaser)?;
        let commit = self.source_commit(commits, commit_index)?;
        let reverse = self.patch_to_apply(true);
        let redo = self.redo_patch();
        info!(commit = commit.short_id(), "pulling patch into new commit");

        rebaser
            .checkout_commit(&commit.id)
            .map_err(failed("start rebase"))?;
        apply_or_abort(rebaser, applier, &reverse)?;
        rebaser
            .amend_current_commit()
            .map_err(paused("amend commit"))?;
        // Aborting here still restores the original branch.
        apply_or_abort(rebaser, applier, &redo)?;
        rebaser
            .create_commit(&format!("Split from \"{}\"", commit.summary))
            .map_err(paused("create new commit"))?;

        // The change now lives in its own commit either way.
        self.reset();
        finish(rebaser, "replay later commits")
    }
}

fn commit_at(commits: &[Commit], index: usize) -> Result<&Commit, PatchBuilderError> {
    commits
        .get(index)
        .ok_or(PatchBuilderError::CommitOutOfRange {
            index,
            len: commits.len(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::super::tests::{builder_with_greeting, commit};
    use super::*;
    use crate::collab::ApplyError;
    use similar_asserts::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Records every git primitive and replays scripted outcomes.
    #[derive(Default)]
    struct FakeGit {
        log: RefCell<Vec<String>>,
        in_progress: Cell<bool>,
        head: RefCell<String>,
        reject_applies: RefCell<VecDeque<bool>>,
        continues: RefCell<VecDeque<Result<RebaseProgress, RebaseError>>>,
    }

    impl FakeGit {
        fn calls(&self) -> Vec<String> {
            self.log.borrow().clone()
        }

        fn push(&self, entry: impl Into<String>) {
            self.log.borrow_mut().push(entry.into());
        }
    }

    impl PatchApplier for FakeGit {
        fn apply_patch(&self, patch: &[u8], opts: ApplyOpts) -> Result<(), ApplyError> {
            assert!(opts.index && !opts.reverse);
            let direction = if String::from_utf8_lossy(patch).contains("-there") {
                "reverse"
            } else {
                "forward"
            };
            self.push(format!("apply {direction}"));
            if self.reject_applies.borrow_mut().pop_front().unwrap_or(false) {
                return Err(ApplyError::Rejected {
                    reason: "does not apply".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Rebaser for FakeGit {
        fn checkout_commits(&self, ids: &[&str]) -> Result<(), RebaseError> {
            self.push(format!("checkout {}", ids.join(" ")));
            Ok(())
        }

        fn amend_current_commit(&self) -> Result<(), RebaseError> {
            self.push("amend");
            Ok(())
        }

        fn create_commit(&self, message: &str) -> Result<(), RebaseError> {
            self.push(format!("commit {message}"));
            Ok(())
        }

        fn continue_rebase(&self) -> Result<RebaseProgress, RebaseError> {
            self.push("continue");
            self.continues
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(RebaseProgress::Finished))
        }

        fn abort_rebase(&self) -> Result<(), RebaseError> {
            self.push("abort");
            Ok(())
        }

        fn rebase_in_progress(&self) -> bool {
            self.in_progress.get()
        }

        fn head_commit(&self) -> Result<String, RebaseError> {
            Ok(self.head.borrow().clone())
        }

        fn stash_push(&self, _message: &str) -> Result<(), RebaseError> {
            self.push("stash");
            Ok(())
        }

        fn stash_pop(&self) -> Result<(), RebaseError> {
            self.push("stash pop");
            Ok(())
        }
    }

    // newest first: the patch was built against index 1
    fn commits() -> Vec<Commit> {
        vec![commit("cccccccccc"), commit("bbbbbbbbbb"), commit("aaaaaaaaaa")]
    }

    #[test]
    fn delete_sequence() {
        let git = FakeGit::default();
        let mut builder = builder_with_greeting();

        builder
            .delete_patches_from_commit(&git, &git, &commits(), 1)
            .unwrap();

        assert_eq!(
            git.calls(),
            vec!["checkout bbbbbbbbbb", "apply reverse", "amend", "continue"]
        );
        assert!(!builder.active());
    }

    #[test]
    fn delete_rejected_aborts_and_keeps_patch() {
        let git = FakeGit::default();
        git.reject_applies.borrow_mut().push_back(true);
        let mut builder = builder_with_greeting();

        let err = builder
            .delete_patches_from_commit(&git, &git, &commits(), 1)
            .unwrap_err();

        assert!(matches!(err, PatchBuilderError::ApplyRejected { .. }));
        assert_eq!(
            git.calls(),
            vec!["checkout bbbbbbbbbb", "apply reverse", "abort"]
        );
        assert!(builder.active());
    }

    #[test]
    fn conflict_on_continue_is_a_paused_rebase() {
        let git = FakeGit::default();
        git.continues.borrow_mut().push_back(Err(RebaseError::Conflict {
            reason: "CONFLICT (content): greeting.txt".to_string(),
        }));
        let mut builder = builder_with_greeting();

        let err = builder
            .delete_patches_from_commit(&git, &git, &commits(), 1)
            .unwrap_err();

        let PatchBuilderError::RebasePaused { step, reason } = err else {
            panic!("expected a paused rebase, got {err:?}");
        };
        assert_eq!(step, "replay later commits");
        assert!(reason.contains("CONFLICT"));
        assert!(!git.calls().contains(&"abort".to_string()));
    }

    #[test]
    fn refuses_while_rebasing() {
        let git = FakeGit::default();
        git.in_progress.set(true);
        let err = builder_with_greeting()
            .delete_patches_from_commit(&git, &git, &commits(), 1)
            .unwrap_err();
        assert!(matches!(err, PatchBuilderError::RebaseInProgress));
        assert!(git.calls().is_empty());
    }

    #[test]
    fn validates_commit_indices() {
        let git = FakeGit::default();
        let mut builder = builder_with_greeting();

        let err = builder
            .delete_patches_from_commit(&git, &git, &commits(), 7)
            .unwrap_err();
        assert!(matches!(
            err,
            PatchBuilderError::CommitOutOfRange { index: 7, len: 3 }
        ));

        let err = builder
            .delete_patches_from_commit(&git, &git, &commits(), 0)
            .unwrap_err();
        assert!(matches!(err, PatchBuilderError::CommitMismatch { .. }));

        let err = builder
            .move_patch_to_selected_commit(&git, &git, &commits(), 1, 1)
            .unwrap_err();
        assert!(matches!(err, PatchBuilderError::SameCommit));
        assert!(git.calls().is_empty());
    }

    #[test]
    fn move_to_older_commit() {
        let git = FakeGit::default();
        let mut builder = builder_with_greeting();

        builder
            .move_patch_to_selected_commit(&git, &git, &commits(), 1, 2)
            .unwrap();

        assert_eq!(
            git.calls(),
            vec!["checkout aaaaaaaaaa", "apply forward", "amend", "continue"]
        );
    }

    #[test]
    fn move_to_newer_commit() {
        let git = FakeGit::default();
        git.continues
            .borrow_mut()
            .push_back(Ok(RebaseProgress::Paused("cccccccccc".to_string())));
        let mut builder = builder_with_greeting();

        builder
            .move_patch_to_selected_commit(&git, &git, &commits(), 1, 0)
            .unwrap();

        assert_eq!(
            git.calls(),
            vec![
                "checkout bbbbbbbbbb cccccccccc",
                "apply reverse",
                "amend",
                "continue",
                "apply forward",
                "amend",
                "continue",
            ]
        );
        assert!(!builder.active());
    }

    #[test]
    fn move_to_newer_commit_rejected_at_destination_pauses() {
        let git = FakeGit::default();
        git.continues
            .borrow_mut()
            .push_back(Ok(RebaseProgress::Paused("cccccccccc".to_string())));
        git.reject_applies.borrow_mut().extend([false, true]);
        let mut builder = builder_with_greeting();

        let err = builder
            .move_patch_to_selected_commit(&git, &git, &commits(), 1, 0)
            .unwrap_err();

        assert!(matches!(err, PatchBuilderError::RebasePaused { .. }));
        assert_eq!(git.calls().last().map(String::as_str), Some("apply forward"));
        assert!(builder.active());
    }

    #[test]
    fn into_index_with_stash() {
        let git = FakeGit::default();
        let mut builder = builder_with_greeting();

        builder
            .move_patch_into_index(&git, &git, &commits(), 1, true)
            .unwrap();

        assert_eq!(
            git.calls(),
            vec![
                "stash",
                "checkout bbbbbbbbbb",
                "apply reverse",
                "amend",
                "continue",
                "apply forward",
                "stash pop",
            ]
        );
    }

    #[test]
    fn into_index_restores_stash_when_nothing_changed() {
        let git = FakeGit::default();
        git.reject_applies.borrow_mut().push_back(true);
        let mut builder = builder_with_greeting();

        builder
            .move_patch_into_index(&git, &git, &commits(), 1, true)
            .unwrap_err();

        assert_eq!(
            git.calls(),
            vec![
                "stash",
                "checkout bbbbbbbbbb",
                "apply reverse",
                "abort",
                "stash pop"
            ]
        );
    }

    fn paused_index_move(stash: bool) -> (FakeGit, PatchBuilder) {
        let git = FakeGit::default();
        git.continues.borrow_mut().push_back(Err(RebaseError::Conflict {
            reason: "CONFLICT (content): greeting.txt".to_string(),
        }));
        let mut builder = builder_with_greeting();

        let err = builder
            .move_patch_into_index(&git, &git, &commits(), 1, stash)
            .unwrap_err();

        assert!(matches!(err, PatchBuilderError::RebasePaused { .. }));
        git.in_progress.set(true);
        (git, builder)
    }

    #[test]
    fn into_index_paused_keeps_the_rest_pending() {
        let (git, builder) = paused_index_move(true);

        assert_eq!(
            git.calls(),
            vec!["stash", "checkout bbbbbbbbbb", "apply reverse", "amend", "continue"]
        );
        let pending = builder.pending().unwrap();
        assert!(pending.stashed());
        assert_eq!(pending.commit_index(), 1);
    }

    #[test]
    fn pending_index_move_waits_for_the_rebase() {
        let (git, mut builder) = paused_index_move(true);

        assert!(!builder.resume_pending(&git, &git).unwrap());
        assert!(builder.pending().is_some());
        assert_eq!(git.calls().len(), 5);
    }

    #[test]
    fn pending_index_move_completes_after_continue() {
        let (git, mut builder) = paused_index_move(true);
        git.in_progress.set(false);
        *git.head.borrow_mut() = "rewritten".to_string();

        assert!(builder.resume_pending(&git, &git).unwrap());

        assert_eq!(git.calls()[5..].to_vec(), vec!["apply forward", "stash pop"]);
        assert!(builder.pending().is_none());
        assert!(!builder.active());
        assert!(!builder.resume_pending(&git, &git).unwrap());
    }

    #[test]
    fn pending_index_move_after_abort_only_restores_stash() {
        let (git, mut builder) = paused_index_move(true);
        git.in_progress.set(false);

        assert!(builder.resume_pending(&git, &git).unwrap());

        assert_eq!(git.calls()[5..].to_vec(), vec!["stash pop"]);
        assert!(builder.pending().is_none());
        assert!(builder.active());
    }

    #[test]
    fn rejected_index_apply_still_restores_stash() {
        let git = FakeGit::default();
        git.reject_applies.borrow_mut().extend([false, true]);
        let mut builder = builder_with_greeting();

        let err = builder
            .move_patch_into_index(&git, &git, &commits(), 1, true)
            .unwrap_err();

        assert!(matches!(err, PatchBuilderError::ApplyRejected { .. }));
        assert_eq!(git.calls().last().map(String::as_str), Some("stash pop"));
        assert!(builder.active());
    }

    #[test]
    fn new_commit_sequence() {
        let git = FakeGit::default();
        let mut builder = builder_with_greeting();

        builder
            .pull_patch_into_new_commit(&git, &git, &commits(), 1)
            .unwrap();

        assert_eq!(
            git.calls(),
            vec![
                "checkout bbbbbbbbbb",
                "apply reverse",
                "amend",
                "apply forward",
                "commit Split from \"commit bbbbbbbbbb\"",
                "continue",
            ]
        );
        assert!(!builder.active());
    }

    #[test]
    fn working_tree_patches_cannot_move() {
        let git = FakeGit::default();
        let mut builder = PatchBuilder::new(PatchTarget::WorkingTree);
        builder.add_file(
            "greeting.txt",
            crate::patch::Patch::parse(super::super::tests::GREETING),
        );

        let err = builder
            .pull_patch_into_new_commit(&git, &git, &commits(), 1)
            .unwrap_err();
        assert!(matches!(err, PatchBuilderError::NotACommitTarget));
    }
}
