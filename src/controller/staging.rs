use super::{Common, ExplorerContext};
use crate::PatchworkError;
use crate::collab::{ApplyOpts, PatchApplier};
use crate::patch::{Patch, TransformOpts};
use crate::selection::{PatchExplorer, expand_range};
use std::collections::BTreeSet;
use tracing::info;

/// Line-level staging for one file.
///
/// There is one controller per side: the unstaged one moves lines into the
/// index or discards them, the staged one moves lines back out.
#[derive(Debug)]
pub struct StagingController {
    path: String,
    staged: bool,
    context: ExplorerContext,
}

impl StagingController {
    pub fn new(path: impl Into<String>, staged: bool) -> Self {
        Self {
            path: path.into(),
            staged,
            context: ExplorerContext::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn staged(&self) -> bool {
        self.staged
    }

    pub fn context(&self) -> &ExplorerContext {
        &self.context
    }

    /// Re-read this side's diff. Returns false when there is nothing left
    /// on it.
    pub fn refresh(&self, c: &Common<'_>) -> Result<bool, PatchworkError> {
        let patch = Patch::parse_bytes(&c.git.diff_file(&self.path, self.staged)?);
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

    /// Stage the selection, or unstage it on the staged side.
    pub fn toggle_staged(&self, c: &Common<'_>) -> Result<(), PatchworkError> {
        self.apply_selection(c, self.staged, true)?;
        self.refresh(c)?;
        c.ui.refresh();
        Ok(())
    }

    /// Throw the selection away: discard it from the working tree, or on the
    /// staged side, unstage it.
    pub fn reset_selection(&self, c: &Common<'_>) -> Result<(), PatchworkError> {
        if !self.staged
            && !c.config.gui.skip_unstage_line_warning
            && !c.ui.confirm(
                "Discard lines",
                "Discard the selected lines from the working tree? This cannot be undone.",
            )
        {
            return Ok(());
        }

        self.apply_selection(c, true, self.staged)?;
        self.refresh(c)?;
        c.ui.refresh();
        Ok(())
    }

    fn apply_selection(
        &self,
        c: &Common<'_>,
        reverse: bool,
        cached: bool,
    ) -> Result<(), PatchworkError> {
        let mut state = self.context.lock();
        let Some(explorer) = state.as_mut() else {
            return Ok(());
        };

        let (first, last) = explorer.selected_range();
        let patch = explorer
            .patch()
            .transform(&TransformOpts {
                reverse,
                included: &expand_range(first, last),
                file_name_override: Some(&self.path),
            })
            .to_bytes();
        if patch.is_empty() {
            return Ok(());
        }

        info!(path = %self.path, reverse, cached, "Apply patch");
        c.git.apply_patch(
            &patch,
            ApplyOpts {
                cached,
                ..ApplyOpts::default()
            },
        )?;

        explorer.collapse_to_first();
        Ok(())
    }

    /// Let the user hand-edit the hunk under the cursor, then apply the
    /// edited version.
    ///
    /// The editor always sees the hunk the way `git diff` shows this side;
    /// on the staged side the edited result is inverted before it is applied.
    pub fn edit_hunk(&self, c: &Common<'_>) -> Result<(), PatchworkError> {
        {
            let state = self.context.lock();
            let Some(explorer) = state.as_ref() else {
                return Ok(());
            };

            let (start, end) = explorer.current_hunk_bounds();
            let text = explorer
                .patch()
                .transform(&TransformOpts {
                    reverse: false,
                    included: &expand_range(start, end),
                    file_name_override: Some(&self.path),
                })
                .to_bytes();
            if text.is_empty() {
                return Ok(());
            }

            let file = c.git.save_temporary_patch(&text)?;
            let file_name = file.to_string_lossy().into_owned();
            c.editor
                .open_at_line_and_wait(&file_name, explorer.edit_cursor_line(start))?;
            let edited = Patch::parse_bytes(&c.git.read_file(&file_name)?);

            let all: BTreeSet<usize> = expand_range(0, edited.line_count());
            let patch = edited
                .transform(&TransformOpts {
                    reverse: self.staged,
                    included: &all,
                    file_name_override: Some(&self.path),
                })
                .to_bytes();
            if patch.is_empty() {
                return Ok(());
            }

            info!(path = %self.path, "Apply edited hunk");
            c.git.apply_patch(
                &patch,
                ApplyOpts {
                    cached: true,
                    ..ApplyOpts::default()
                },
            )?;
        }

        self.refresh(c)?;
        c.ui.refresh();
        Ok(())
    }

    /// Open the file without waiting.
    pub fn open_file(&self, c: &Common<'_>) -> Result<(), PatchworkError> {
        c.editor.open_at_line(&self.path, 1)?;
        Ok(())
    }

    /// Edit the file at the cursor's line, then pick up whatever changed.
    pub fn edit_file(&self, c: &Common<'_>) -> Result<(), PatchworkError> {
        let line = match self.context.lock().as_ref() {
            Some(explorer) => explorer.current_line_number(),
            None => 1,
        };
        c.editor.open_at_line_and_wait(&self.path, line as usize)?;
        self.refresh(c)?;
        c.ui.refresh();
        Ok(())
    }

    /// The diff with the selection marked, for drawing.
    pub fn render(&self) -> Option<String> {
        let state = self.context.lock();
        let explorer = state.as_ref()?;
        Some(explorer.patch().format_colored(&explorer.selected_indices()))
    }
}
