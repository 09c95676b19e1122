//! A small line-driven front end.
//!
//! Each line of input is one command acting on the focused view; the view is
//! redrawn after every command. Reading from any [`BufRead`] keeps the loop
//! scriptable.

use crate::PatchworkError;
use crate::builder::PatchBuilder;
use crate::collab::{Commit, Ui};
use crate::controller::{
    Common, ExplorerContext, MenuAction, MenuContext, PatchBuildingController, StagingController,
    execute_menu_action, menu_items,
};
use crossterm::style::Stylize;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use tracing::debug;

/// How many commits to load for moving patches around.
const COMMIT_LIMIT: usize = 300;

const STAGING_HELP: &str = "\
j/k move   ]/[ next/prev change   g N go to row   v range   a hunk
space stage/unstage   d discard/unstage   e edit hunk   E edit file
o open file   tab switch side   q quit";

const PATCH_HELP: &str = "\
j/k move   ]/[ next/prev change   g N go to row   v range   a hunk
space add/remove lines   f add/remove file   l list commits
c N select commit N   s show patch   p patch options   q quit";

/// Terminal implementation of [`Ui`] over any reader and writer.
pub struct TerminalUi<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    /// Prompt and read one line. `None` at end of input.
    pub fn read_line(&self, prompt: &str) -> Option<String> {
        self.print_inline(prompt);
        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
        }
    }

    pub fn print(&self, text: &str) {
        let mut out = self.output.borrow_mut();
        if let Err(err) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            debug!(%err, "terminal write failed");
        }
    }

    fn print_inline(&self, text: &str) {
        let mut out = self.output.borrow_mut();
        if let Err(err) = write!(out, "{text}").and_then(|()| out.flush()) {
            debug!(%err, "terminal write failed");
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> Ui for TerminalUi<R, W> {
    fn refresh(&self) {}

    fn set_busy(&self, status: Option<&str>) {
        if let Some(status) = status {
            self.print(&format!("{}", format!("… {status}").yellow()));
        }
    }

    fn confirm(&self, title: &str, prompt: &str) -> bool {
        self.print(&format!("{}", title.bold()));
        self.read_line(&format!("{prompt} [y/N] "))
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"))
    }

    fn toast(&self, message: &str) {
        self.print(&format!("{}", message.green()));
    }

    fn error(&self, message: &str) {
        self.print(&format!("{}", format!("error: {message}").red()));
    }
}

/// The two sides of the staging view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Unstaged,
    Staged,
}

pub enum View {
    Staging {
        unstaged: StagingController,
        staged: StagingController,
        focus: Side,
    },
    PatchBuilding {
        controller: PatchBuildingController,
        builder: Option<PatchBuilder>,
        commits: Vec<Commit>,
        selected: Option<usize>,
    },
}

enum Flow {
    Continue,
    Quit,
}

pub struct Session<'a, R, W> {
    common: Common<'a>,
    term: &'a TerminalUi<R, W>,
    view: View,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    /// Stage and unstage lines of `path`.
    pub fn staging(
        common: Common<'a>,
        term: &'a TerminalUi<R, W>,
        path: &str,
    ) -> Result<Self, PatchworkError> {
        let unstaged = StagingController::new(path, false);
        let staged = StagingController::new(path, true);
        let has_unstaged = unstaged.refresh(&common)?;
        let has_staged = staged.refresh(&common)?;
        if !has_unstaged && !has_staged {
            return Err(PatchworkError::NoChanges {
                file: path.to_string(),
            });
        }

        let focus = if has_unstaged {
            Side::Unstaged
        } else {
            Side::Staged
        };
        Ok(Self {
            common,
            term,
            view: View::Staging {
                unstaged,
                staged,
                focus,
            },
        })
    }

    /// Build a custom patch from what `commit` did to `path`.
    pub fn patch_building(
        common: Common<'a>,
        term: &'a TerminalUi<R, W>,
        commit: Commit,
        path: &str,
    ) -> Result<Self, PatchworkError> {
        let controller = PatchBuildingController::new(commit, path);
        if !controller.refresh(&common)? {
            return Err(PatchworkError::NoChanges {
                file: path.to_string(),
            });
        }
        let commits = common.git.commits(COMMIT_LIMIT)?;
        Ok(Self {
            common,
            term,
            view: View::PatchBuilding {
                controller,
                builder: None,
                commits,
                selected: None,
            },
        })
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn builder(&self) -> Option<&PatchBuilder> {
        match &self.view {
            View::PatchBuilding { builder, .. } => builder.as_ref(),
            View::Staging { .. } => None,
        }
    }

    /// Read and run commands until `q` or end of input.
    pub fn run(&mut self) -> Result<(), PatchworkError> {
        loop {
            if let Err(err) = self.resume_pending() {
                self.term.error(&err.to_string());
            }
            self.draw();
            let Some(line) = self.term.read_line("> ") else {
                return Ok(());
            };
            match self.dispatch(&line) {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(err) => self.term.error(&err.to_string()),
            }
        }
    }

    /// Finish a move into the index that was waiting on a paused rebase.
    fn resume_pending(&mut self) -> Result<(), PatchworkError> {
        let c = &self.common;
        let View::PatchBuilding {
            controller,
            builder,
            commits,
            selected,
        } = &mut self.view
        else {
            return Ok(());
        };
        let Some(active) = builder.as_mut() else {
            return Ok(());
        };
        let Some(source) = active.pending().map(|p| p.commit_index()) else {
            return Ok(());
        };

        let resumed = active.resume_pending(c.git, c.git);
        if matches!(resumed, Ok(false)) {
            return Ok(());
        }
        *commits = c.git.commits(COMMIT_LIMIT)?;
        *selected = None;
        if !active.active() {
            *builder = None;
        }
        if let Some(commit) = commits.get(source) {
            *controller = PatchBuildingController::new(commit.clone(), controller.path());
        }
        controller.refresh(c)?;
        resumed?;
        c.ui.toast("Rebase finished, pending patch handled");
        Ok(())
    }

    fn focused(&self) -> Option<&ExplorerContext> {
        match &self.view {
            View::Staging {
                unstaged,
                staged,
                focus,
            } => Some(match focus {
                Side::Unstaged => unstaged.context(),
                Side::Staged => staged.context(),
            }),
            View::PatchBuilding { controller, .. } => Some(controller.context()),
        }
    }

    fn draw(&self) {
        match &self.view {
            View::Staging {
                unstaged,
                staged,
                focus,
            } => {
                let controller = match focus {
                    Side::Unstaged => unstaged,
                    Side::Staged => staged,
                };
                let side = if controller.staged() {
                    "staged"
                } else {
                    "unstaged"
                };
                self.term
                    .print(&format!("{}", format!("{} ({side})", controller.path()).bold()));
                if let Some(text) = controller.render() {
                    self.term.print(text.trim_end());
                }
            }
            View::PatchBuilding {
                controller,
                builder,
                ..
            } => {
                let commit = controller.commit();
                self.term.print(&format!(
                    "{}",
                    format!(
                        "{} @ {} {}",
                        controller.path(),
                        commit.short_id(),
                        commit.summary
                    )
                    .bold()
                ));
                if let Some(text) = controller.render(builder.as_ref()) {
                    self.term.print(text.trim_end());
                }
            }
        }
    }

    fn dispatch(&mut self, line: &str) -> Result<Flow, PatchworkError> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or(if line.is_empty() { "" } else { "space" });
        let arg = words.next();
        debug!(command, ?arg, "session command");

        if self.navigate(command, arg)? {
            return Ok(Flow::Continue);
        }

        match command {
            "q" => return Ok(Flow::Quit),
            "" => {}
            "?" => {
                let help = match self.view {
                    View::Staging { .. } => STAGING_HELP,
                    View::PatchBuilding { .. } => PATCH_HELP,
                };
                self.term.print(help);
            }
            _ => return self.dispatch_view(command, arg),
        }
        Ok(Flow::Continue)
    }

    /// Cursor commands shared by every view. Returns false if `command` is
    /// not one of them.
    fn navigate(&self, command: &str, arg: Option<&str>) -> Result<bool, PatchworkError> {
        let Some(context) = self.focused() else {
            return Ok(false);
        };
        let mut state = context.lock();
        let Some(explorer) = state.as_mut() else {
            return Ok(false);
        };

        match command {
            "j" => explorer.move_cursor(1),
            "k" => explorer.move_cursor(-1),
            "]" => explorer.next_change(),
            "[" => explorer.prev_change(),
            "v" => explorer.toggle_range(),
            "a" => explorer.select_hunk(),
            "g" => explorer.select_line(parse_row(arg)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn dispatch_view(&mut self, command: &str, arg: Option<&str>) -> Result<Flow, PatchworkError> {
        let c = &self.common;
        match &mut self.view {
            View::Staging {
                unstaged,
                staged,
                focus,
            } => {
                let controller = match focus {
                    Side::Unstaged => &*unstaged,
                    Side::Staged => &*staged,
                };
                match command {
                    "space" => controller.toggle_staged(c)?,
                    "d" => controller.reset_selection(c)?,
                    "e" => controller.edit_hunk(c)?,
                    "E" => controller.edit_file(c)?,
                    "o" => controller.open_file(c)?,
                    "tab" => {
                        *focus = match focus {
                            Side::Unstaged => Side::Staged,
                            Side::Staged => Side::Unstaged,
                        };
                    }
                    _ => c.ui.error(&format!("unknown command '{command}', try ?")),
                }

                // Toggling can empty the view; refresh both sides and move
                // focus to whichever still has something.
                unstaged.refresh(c)?;
                staged.refresh(c)?;
                let (has_unstaged, has_staged) =
                    (unstaged.context().has_state(), staged.context().has_state());
                match (has_unstaged, has_staged) {
                    (false, false) => {
                        c.ui.toast("No changes left");
                        return Ok(Flow::Quit);
                    }
                    (false, true) => *focus = Side::Staged,
                    (true, false) => *focus = Side::Unstaged,
                    (true, true) => {}
                }
            }
            View::PatchBuilding {
                controller,
                builder,
                commits,
                selected,
            } => match command {
                "space" => controller.toggle_selection(c, builder)?,
                "f" => controller.toggle_file(c, builder)?,
                "l" => {
                    for (index, commit) in commits.iter().enumerate() {
                        let marker = if *selected == Some(index) { '*' } else { ' ' };
                        self.term.print(&format!(
                            "{marker}{index:>3} {} {}",
                            commit.short_id(),
                            commit.summary
                        ));
                    }
                }
                "c" => {
                    let index = parse_row(arg)?;
                    if index >= commits.len() {
                        return Err(PatchworkError::InvalidRange {
                            range: index.to_string(),
                        });
                    }
                    *selected = Some(index);
                }
                "s" => match builder.as_ref().filter(|b| b.active()) {
                    Some(builder) => self.term.print(builder.render_aggregated_patch(false).trim_end()),
                    None => c.ui.toast("Patch is empty"),
                },
                "p" => {
                    let Some(active) = builder.as_mut().filter(|b| b.active()) else {
                        return Err(crate::PatchBuilderError::NoPatch.into());
                    };
                    let selected_commit = selected.and_then(|i| commits.get(i));
                    let items = menu_items(&MenuContext::new(active, c.git, selected_commit));
                    for item in &items {
                        self.term.print(&format!("  {}  {}", item.key, item.label));
                    }
                    let Some(choice) = self.term.read_line("patch option: ") else {
                        return Ok(Flow::Quit);
                    };
                    let Some(item) = items
                        .iter()
                        .find(|item| choice.trim().starts_with(item.key))
                    else {
                        return Ok(Flow::Continue);
                    };

                    let source = active.target_index(commits);
                    let rewrites = matches!(
                        item.action,
                        MenuAction::RemoveFromCommit
                            | MenuAction::MoveToSelectedCommit
                            | MenuAction::MoveIntoIndex
                            | MenuAction::MoveIntoNewCommit
                    );
                    let result = execute_menu_action(c, active, item.action, commits, *selected);

                    if rewrites {
                        // History may have moved even if the action failed.
                        *commits = c.git.commits(COMMIT_LIMIT)?;
                        *selected = None;
                    }
                    if rewrites && result.is_ok() {
                        // Commit ids changed; follow the patch's old commit
                        // to its rewritten self.
                        let index = match item.action {
                            MenuAction::MoveIntoNewCommit => source.map(|i| i + 1),
                            _ => source,
                        };
                        if let Some(commit) = index.and_then(|i| commits.get(i)) {
                            *controller =
                                PatchBuildingController::new(commit.clone(), controller.path());
                        }
                        *builder = None;
                    }
                    result?;
                    controller.refresh(c)?;
                }
                _ => c.ui.error(&format!("unknown command '{command}', try ?")),
            },
        }
        Ok(Flow::Continue)
    }
}

fn parse_row(arg: Option<&str>) -> Result<usize, PatchworkError> {
    let arg = arg.unwrap_or_default();
    arg.parse().map_err(|_| PatchworkError::InvalidRange {
        range: arg.to_string(),
    })
}
