//! The custom patch options menu.

use super::{BusyGuard, Common};
use crate::PatchworkError;
use crate::builder::{PatchBuilder, PatchBuilderError};
use crate::collab::{Commit, Rebaser};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Reset,
    MoveToSelectedCommit,
    Apply,
    ApplyReverse,
    RemoveFromCommit,
    MoveIntoIndex,
    MoveIntoNewCommit,
    CopyToClipboard,
}

/// What the menu needs to know to decide which entries to offer.
#[derive(Debug, Clone, Default)]
pub struct MenuContext {
    /// Short id of the commit the patch was built from, if any
    pub target: Option<String>,
    pub rebase_in_progress: bool,
    /// Commit selected in the commit list, if the list has focus
    pub selected_commit: Option<Commit>,
}

impl MenuContext {
    pub fn new(builder: &PatchBuilder, rebaser: &impl Rebaser, selected: Option<&Commit>) -> Self {
        Self {
            target: builder
                .target()
                .commit_id()
                .map(|id| id.get(..8).unwrap_or(id).to_string()),
            rebase_in_progress: rebaser.rebase_in_progress(),
            selected_commit: selected.cloned(),
        }
    }

    fn can_rewrite(&self) -> bool {
        self.target.is_some() && !self.rebase_in_progress
    }

    fn other_commit_selected(&self) -> Option<&Commit> {
        let target = self.target.as_deref()?;
        self.selected_commit
            .as_ref()
            .filter(|c| !c.id.starts_with(target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub key: char,
    pub label: String,
    pub action: MenuAction,
}

struct Entry {
    key: char,
    action: MenuAction,
    label: fn(&MenuContext) -> String,
    when: fn(&MenuContext) -> bool,
}

fn entries() -> [Entry; 8] {
    [
        Entry {
            key: 'c',
            action: MenuAction::Reset,
            label: |_| "reset patch".to_string(),
            when: |_| true,
        },
        Entry {
            key: 'm',
            action: MenuAction::MoveToSelectedCommit,
            label: |cx| {
                let id = cx.other_commit_selected().map(Commit::short_id);
                format!("move patch to selected commit ({})", id.unwrap_or_default())
            },
            when: |cx| cx.can_rewrite() && cx.other_commit_selected().is_some(),
        },
        Entry {
            key: 'a',
            action: MenuAction::Apply,
            label: |_| "apply patch".to_string(),
            when: |_| true,
        },
        Entry {
            key: 'r',
            action: MenuAction::ApplyReverse,
            label: |_| "apply patch in reverse".to_string(),
            when: |_| true,
        },
        Entry {
            key: 'd',
            action: MenuAction::RemoveFromCommit,
            label: |cx| {
                format!(
                    "remove patch from original commit ({})",
                    cx.target.as_deref().unwrap_or_default()
                )
            },
            when: MenuContext::can_rewrite,
        },
        Entry {
            key: 'i',
            action: MenuAction::MoveIntoIndex,
            label: |_| "move patch out into index".to_string(),
            when: MenuContext::can_rewrite,
        },
        Entry {
            key: 'n',
            action: MenuAction::MoveIntoNewCommit,
            label: |_| "move patch into new commit".to_string(),
            when: MenuContext::can_rewrite,
        },
        Entry {
            key: 'y',
            action: MenuAction::CopyToClipboard,
            label: |_| "copy patch to clipboard".to_string(),
            when: |_| true,
        },
    ]
}

/// The entries available in `cx`, in display order.
pub fn menu_items(cx: &MenuContext) -> Vec<MenuItem> {
    entries()
        .into_iter()
        .filter(|entry| (entry.when)(cx))
        .map(|entry| MenuItem {
            key: entry.key,
            label: (entry.label)(cx),
            action: entry.action,
        })
        .collect()
}

/// Carry out a menu choice.
///
/// `commits` is the branch, newest first, and `selected` the index of the
/// commit picked as a move destination.
pub fn execute_menu_action(
    c: &Common<'_>,
    builder: &mut PatchBuilder,
    action: MenuAction,
    commits: &[Commit],
    selected: Option<usize>,
) -> Result<(), PatchworkError> {
    if !builder.active() {
        return Err(PatchBuilderError::NoPatch.into());
    }

    let target_index = || -> Result<usize, PatchworkError> {
        builder
            .target_index(commits)
            .ok_or_else(|| PatchworkError::CommitNotFound {
                id: builder.target().commit_id().unwrap_or_default().to_string(),
            })
    };

    match action {
        MenuAction::Reset => {
            info!("Reset patch");
            builder.reset();
            c.ui.toast("Patch reset");
        }
        MenuAction::Apply | MenuAction::ApplyReverse => {
            let reverse = action == MenuAction::ApplyReverse;
            info!(reverse, "Apply patch");
            builder.apply_custom_patch(c.git, reverse)?;
            c.ui.refresh();
        }
        MenuAction::RemoveFromCommit => {
            let index = target_index()?;
            info!("Remove patch from commit");
            let result = {
                let _busy = BusyGuard::new(c.ui, "Rebasing");
                builder.delete_patches_from_commit(c.git, c.git, commits, index)
            };
            finish_rebase(c, result)?;
        }
        MenuAction::MoveToSelectedCommit => {
            let index = target_index()?;
            let dest = selected.ok_or(PatchworkError::NoCommitSelected)?;
            info!("Move patch to selected commit");
            let result = {
                let _busy = BusyGuard::new(c.ui, "Rebasing");
                builder.move_patch_to_selected_commit(c.git, c.git, commits, index, dest)
            };
            finish_rebase(c, result)?;
        }
        MenuAction::MoveIntoIndex => {
            let index = target_index()?;
            let stash = c.git.is_working_tree_dirty()?;
            if stash
                && !c.ui.confirm(
                    "Must stash",
                    "Pulling a patch out into the index requires stashing and unstashing your changes. Continue?",
                )
            {
                return Ok(());
            }
            info!(stash, "Move patch into index");
            let result = {
                let _busy = BusyGuard::new(c.ui, "Rebasing");
                builder.move_patch_into_index(c.git, c.git, commits, index, stash)
            };
            if let Some(pending) = builder.pending() {
                c.ui.toast(if pending.stashed() {
                    "Once the rebase is finished the patch will be staged and your stashed changes restored"
                } else {
                    "Once the rebase is finished the patch will be staged"
                });
            }
            finish_rebase(c, result)?;
        }
        MenuAction::MoveIntoNewCommit => {
            let index = target_index()?;
            info!("Move patch into new commit");
            let result = {
                let _busy = BusyGuard::new(c.ui, "Rebasing");
                builder.pull_patch_into_new_commit(c.git, c.git, commits, index)
            };
            finish_rebase(c, result)?;
        }
        MenuAction::CopyToClipboard => {
            info!("Copy patch to clipboard");
            c.clipboard.write(&builder.render_aggregated_patch(true))?;
            c.ui.toast("Patch copied to clipboard");
        }
    }

    Ok(())
}

/// History may have changed even when a saga fails, so redraw either way.
fn finish_rebase(
    c: &Common<'_>,
    result: Result<(), PatchBuilderError>,
) -> Result<(), PatchworkError> {
    c.ui.refresh();
    if let Err(PatchBuilderError::RebasePaused { .. }) = &result {
        c.ui.toast(
            "Rebase paused: resolve it, then run `git rebase --continue` or `git rebase --abort`",
        );
    }
    result.map_err(PatchworkError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builder::PatchTarget;
    use crate::config::Config;
    use crate::controller::tests::{FakeClipboard, FakeEditor, FakeUi};
    use crate::git::GitCli;
    use crate::patch::Patch;
    use similar_asserts::assert_eq;

    fn commit(id: &str) -> Commit {
        Commit {
            id: id.to_string(),
            summary: format!("commit {id}"),
        }
    }

    fn keys(cx: &MenuContext) -> String {
        menu_items(cx).iter().map(|item| item.key).collect()
    }

    #[test]
    fn working_tree_patch_offers_basic_entries() {
        assert_eq!(keys(&MenuContext::default()), "cary");
    }

    #[test]
    fn commit_patch_offers_history_entries() {
        let cx = MenuContext {
            target: Some("aaaaaaaa".to_string()),
            ..MenuContext::default()
        };
        assert_eq!(keys(&cx), "cardiny");
    }

    #[test]
    fn move_entry_needs_another_commit_selected() {
        let mut cx = MenuContext {
            target: Some("aaaaaaaa".to_string()),
            selected_commit: Some(commit("aaaaaaaa11")),
            ..MenuContext::default()
        };
        assert_eq!(keys(&cx), "cardiny");

        cx.selected_commit = Some(commit("bbbbbbbb22"));
        let items = menu_items(&cx);
        assert_eq!(items[1].key, 'm');
        assert_eq!(items[1].label, "move patch to selected commit (bbbbbbbb)");
    }

    #[test]
    fn rebase_in_progress_hides_history_entries() {
        let cx = MenuContext {
            target: Some("aaaaaaaa".to_string()),
            rebase_in_progress: true,
            selected_commit: Some(commit("bbbbbbbb")),
        };
        assert_eq!(keys(&cx), "cary");
    }

    #[test]
    fn copy_and_reset() {
        let git = GitCli::new(".");
        let (editor, clipboard, ui) = (
            FakeEditor::default(),
            FakeClipboard::default(),
            FakeUi::default(),
        );
        let config = Config::default();
        let c = Common {
            git: &git,
            editor: &editor,
            clipboard: &clipboard,
            ui: &ui,
            config: &config,
        };

        let mut builder = PatchBuilder::new(PatchTarget::WorkingTree);
        builder.add_file(
            "a.txt",
            Patch::parse("--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n"),
        );

        execute_menu_action(&c, &mut builder, MenuAction::CopyToClipboard, &[], None).unwrap();
        assert_eq!(
            clipboard.copied.borrow().as_slice(),
            ["--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n".to_string()]
        );

        execute_menu_action(&c, &mut builder, MenuAction::Reset, &[], None).unwrap();
        assert!(!builder.active());

        let err = execute_menu_action(&c, &mut builder, MenuAction::Apply, &[], None).unwrap_err();
        assert!(matches!(
            err,
            PatchworkError::PatchBuilderError(PatchBuilderError::NoPatch)
        ));
    }
}
