use super::{Common, ExplorerContext};
use crate::PatchworkError;
use crate::builder::{PatchBuilder, PatchTarget};
use crate::collab::Commit;
use crate::patch::Patch;
use crate::selection::PatchExplorer;
use std::collections::BTreeSet;
use tracing::info;

/// Picking lines of one file in one commit into the custom patch.
#[derive(Debug)]
pub struct PatchBuildingController {
    commit: Commit,
    path: String,
    context: ExplorerContext,
}

impl PatchBuildingController {
    pub fn new(commit: Commit, path: impl Into<String>) -> Self {
        Self {
            commit,
            path: path.into(),
            context: ExplorerContext::new(),
        }
    }

    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn context(&self) -> &ExplorerContext {
        &self.context
    }

    fn target(&self) -> PatchTarget {
        PatchTarget::Commit(self.commit.clone())
    }

    /// Load what the commit did to the file.
    pub fn refresh(&self, c: &Common<'_>) -> Result<bool, PatchworkError> {
        let patch = Patch::parse_bytes(&c.git.commit_diff(&self.commit.id, &self.path)?);
        let mut state = self.context.lock();
        if patch.is_empty() {
            *state = None;
            return Ok(false);
        }
        match state.as_mut() {
            Some(explorer) => explorer.set_patch(patch),
            None => *state = Some(PatchExplorer::new(patch, 0)),
        }
        Ok(true)
    }

    /// Make sure `builder` is collecting for this commit, asking before
    /// throwing away a patch built against another target. Returns false if
    /// the user declined.
    fn ensure_builder(&self, c: &Common<'_>, builder: &mut Option<PatchBuilder>) -> bool {
        let target = self.target();
        match builder {
            Some(existing) if *existing.target() == target => return true,
            Some(existing) if existing.active() => {
                let discard = c.config.gui.skip_discard_warning
                    || c.ui.confirm(
                        "Discard patch",
                        "You can only build a patch from one commit at a time. Discard the current patch?",
                    );
                if !discard {
                    return false;
                }
                info!("Discard patch");
            }
            _ => {}
        }
        *builder = Some(PatchBuilder::new(target));
        true
    }

    /// Add the selected lines to the patch, or take them out if the line
    /// under the cursor is already in it.
    pub fn toggle_selection(
        &self,
        c: &Common<'_>,
        builder: &mut Option<PatchBuilder>,
    ) -> Result<(), PatchworkError> {
        let mut state = self.context.lock();
        let Some(explorer) = state.as_mut() else {
            return Ok(());
        };
        if !self.ensure_builder(c, builder) {
            return Ok(());
        }
        let Some(builder) = builder.as_mut() else {
            return Ok(());
        };

        let selected = explorer.selected_indices();
        let cursor = explorer.selection().cursor();
        let included = builder
            .included(&self.path)
            .is_some_and(|rows| rows.contains(&cursor));

        if included {
            info!(path = %self.path, "Remove lines from patch");
            builder.remove_lines(&self.path, &selected);
        } else {
            info!(path = %self.path, "Add lines to patch");
            builder.add_lines(&self.path, explorer.patch().clone(), &selected);
        }

        explorer.collapse_to_first();
        c.ui.refresh();
        Ok(())
    }

    /// Whole file in, or out if it was already entirely in.
    pub fn toggle_file(
        &self,
        c: &Common<'_>,
        builder: &mut Option<PatchBuilder>,
    ) -> Result<(), PatchworkError> {
        let state = self.context.lock();
        let Some(explorer) = state.as_ref() else {
            return Ok(());
        };
        if !self.ensure_builder(c, builder) {
            return Ok(());
        }
        if let Some(builder) = builder.as_mut() {
            info!(path = %self.path, "Toggle file in patch");
            builder.toggle_file(&self.path, explorer.patch().clone());
        }
        c.ui.refresh();
        Ok(())
    }

    /// The commit's diff with the rows already in the patch marked.
    pub fn render(&self, builder: Option<&PatchBuilder>) -> Option<String> {
        let state = self.context.lock();
        let explorer = state.as_ref()?;
        let included = builder
            .filter(|b| *b.target() == self.target())
            .and_then(|b| b.included(&self.path))
            .cloned()
            .unwrap_or_else(BTreeSet::new);
        Some(explorer.patch().format_colored(&included))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builder::FileStatus;
    use crate::config::Config;
    use crate::controller::tests::{FakeClipboard, FakeEditor, FakeUi};
    use crate::git::GitCli;

    const DIFF: &str = "\
diff --git a/notes.md b/notes.md
index 3333333..4444444 100644
--- a/notes.md
+++ b/notes.md
@@ -4,0 +5,2 @@ ## Notes
+- first
+- second
";

    fn commit(id: &str) -> Commit {
        Commit {
            id: id.to_string(),
            summary: "notes".to_string(),
        }
    }

    fn loaded(id: &str) -> PatchBuildingController {
        let controller = PatchBuildingController::new(commit(id), "notes.md");
        controller
            .context()
            .set_state(Some(PatchExplorer::new(Patch::parse(DIFF), 0)));
        controller
    }

    struct Env {
        git: GitCli,
        editor: FakeEditor,
        clipboard: FakeClipboard,
        ui: FakeUi,
        config: Config,
    }

    impl Env {
        fn new() -> Self {
            Self {
                git: GitCli::new("."),
                editor: FakeEditor::default(),
                clipboard: FakeClipboard::default(),
                ui: FakeUi::default(),
                config: Config::default(),
            }
        }

        fn common(&self) -> Common<'_> {
            Common {
                git: &self.git,
                editor: &self.editor,
                clipboard: &self.clipboard,
                ui: &self.ui,
                config: &self.config,
            }
        }
    }

    #[test]
    fn toggling_creates_builder_and_flips_lines() {
        let env = Env::new();
        let controller = loaded("aaaaaaaa");
        let mut builder = None;

        controller
            .toggle_selection(&env.common(), &mut builder)
            .unwrap();
        let built = builder.as_ref().unwrap();
        assert_eq!(built.included("notes.md"), Some(&BTreeSet::from([5])));

        controller
            .toggle_selection(&env.common(), &mut builder)
            .unwrap();
        assert!(!builder.as_ref().unwrap().active());
    }

    #[test]
    fn switching_commits_asks_before_discarding() {
        let env = Env::new();
        env.ui.answers.borrow_mut().push_back(false);
        let mut builder = None;
        loaded("aaaaaaaa")
            .toggle_file(&env.common(), &mut builder)
            .unwrap();

        let other = loaded("bbbbbbbb");
        other.toggle_file(&env.common(), &mut builder).unwrap();
        assert_eq!(
            builder.as_ref().unwrap().target().commit_id(),
            Some("aaaaaaaa")
        );

        other.toggle_file(&env.common(), &mut builder).unwrap();
        let built = builder.as_ref().unwrap();
        assert_eq!(built.target().commit_id(), Some("bbbbbbbb"));
        assert_eq!(built.file_status("notes.md"), FileStatus::Whole);
        assert_eq!(
            env.ui
                .events
                .borrow()
                .iter()
                .filter(|e| e.starts_with("confirm"))
                .count(),
            2
        );
    }

    #[test]
    fn render_marks_included_rows() {
        let env = Env::new();
        let controller = loaded("aaaaaaaa");
        let mut builder = None;
        controller
            .toggle_selection(&env.common(), &mut builder)
            .unwrap();

        let rendered = controller.render(builder.as_ref()).unwrap();
        let rows: Vec<_> = rendered.lines().collect();
        assert!(rows[5].contains('▌'));
        assert!(!rows[6].contains('▌'));
    }
}
