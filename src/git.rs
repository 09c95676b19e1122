//! The real collaborators, backed by the `git` binary.

use crate::collab::{
    ApplyError, ApplyOpts, Commit, PatchApplier, RebaseError, RebaseProgress, Rebaser,
};
use error_set::error_set;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

error_set! {
    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git {command}: {message}")]
        SpawnFailed { command: String, message: String },
        #[display("Failed to write to git {command}: {message}")]
        StdinFailed { command: String, message: String },
        #[display("git {command} failed: {stderr}")]
        ExitError { command: String, stderr: String },
        #[display("Invalid UTF-8 in git {command} output: {message}")]
        InvalidUtf8 { command: String, message: String },
        #[display("Failed to write temporary file: {message}")]
        TempFileFailed { message: String },
        #[display("Failed to read {path}: {message}")]
        ReadFailed { path: String, message: String },
    }
}

/// Runs git against one repository.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    context_lines: u32,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            context_lines: 3,
        }
    }

    /// Lines of context around each change in the diffs this produces.
    pub fn with_context_lines(mut self, context_lines: u32) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo_path).args(args);
        cmd
    }

    fn output(
        &self,
        args: &[&str],
        envs: &[(&str, &str)],
        stdin: Option<&[u8]>,
    ) -> Result<Output, GitCommandError> {
        let name = args.first().copied().unwrap_or_default().to_string();
        debug!(args = ?args, "running git");

        let mut cmd = self.command(args);
        cmd.envs(envs.iter().copied())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| GitCommandError::SpawnFailed {
            command: name.clone(),
            message: e.to_string(),
        })?;

        if let Some(input) = stdin {
            child
                .stdin
                .take()
                .ok_or_else(|| GitCommandError::StdinFailed {
                    command: name.clone(),
                    message: "no stdin handle".to_string(),
                })?
                .write_all(input)
                .map_err(|e| GitCommandError::StdinFailed {
                    command: name.clone(),
                    message: e.to_string(),
                })?;
        }

        child
            .wait_with_output()
            .map_err(|e| GitCommandError::SpawnFailed {
                command: name,
                message: e.to_string(),
            })
    }

    /// Run git and return stdout, failing on a non-zero exit.
    fn run(&self, args: &[&str]) -> Result<String, GitCommandError> {
        self.run_with(args, &[], None)
    }

    fn run_with(
        &self,
        args: &[&str],
        envs: &[(&str, &str)],
        stdin: Option<&[u8]>,
    ) -> Result<String, GitCommandError> {
        let stdout = self.run_bytes(args, envs, stdin)?;
        String::from_utf8(stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            command: args.first().copied().unwrap_or_default().to_string(),
            message: e.to_string(),
        })
    }

    /// Like [`run_with`](Self::run_with), but stdout stays raw bytes. Diffs of
    /// files in other encodings are not UTF-8.
    fn run_bytes(
        &self,
        args: &[&str],
        envs: &[(&str, &str)],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, GitCommandError> {
        let output = self.output(args, envs, stdin)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ExitError {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn is_tracked(&self, path: &str) -> bool {
        self.run(&["ls-files", "--error-unmatch", "--", path]).is_ok()
    }

    /// Diff of one file: working tree against index, or with `staged`, index
    /// against HEAD. An untracked file diffs as an addition.
    pub fn diff_file(&self, path: &str, staged: bool) -> Result<Vec<u8>, GitCommandError> {
        let context = format!("-U{}", self.context_lines);

        if !staged && !self.is_tracked(path) {
            // --no-index exits 1 when the files differ, which they always do
            let output = self.output(
                &[
                    "diff",
                    "--no-index",
                    "--no-ext-diff",
                    "--no-color",
                    &context,
                    "--",
                    "/dev/null",
                    path,
                ],
                &[],
                None,
            )?;
            return Ok(output.stdout);
        }

        let mut args = vec!["diff", "--no-ext-diff", "--no-color", context.as_str()];
        if staged {
            args.push("--cached");
        }
        args.extend(["--", path]);
        self.run_bytes(&args, &[], None)
    }

    /// What `commit` did to `path`.
    pub fn commit_diff(&self, commit: &str, path: &str) -> Result<Vec<u8>, GitCommandError> {
        let context = format!("-U{}", self.context_lines);
        self.run_bytes(
            &[
                "show",
                "--format=",
                "--no-ext-diff",
                "--no-color",
                &context,
                commit,
                "--",
                path,
            ],
            &[],
            None,
        )
    }

    /// Up to `limit` commits of the current branch, newest first.
    pub fn commits(&self, limit: usize) -> Result<Vec<Commit>, GitCommandError> {
        let limit = format!("-n{limit}");
        let out = self.run(&["log", &limit, "--format=%H%x1f%s"])?;
        Ok(out
            .lines()
            .filter_map(|line| line.split_once('\x1f'))
            .map(|(id, summary)| Commit {
                id: id.to_string(),
                summary: summary.to_string(),
            })
            .collect())
    }

    /// Resolve a revision to a full commit id.
    pub fn resolve_commit(&self, rev: &str) -> Result<Commit, GitCommandError> {
        let spec = format!("{rev}^{{commit}}");
        let out = self.run(&["log", "-n1", "--format=%H%x1f%s", &spec])?;
        let (id, summary) = out.trim_end().split_once('\x1f').unwrap_or((out.trim(), ""));
        Ok(Commit {
            id: id.to_string(),
            summary: summary.to_string(),
        })
    }

    /// True if tracked files have uncommitted changes.
    pub fn is_working_tree_dirty(&self) -> Result<bool, GitCommandError> {
        let out = self.run(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!out.trim().is_empty())
    }

    /// Write `patch` to a temporary `.patch` file that lives as long as the
    /// returned path.
    pub fn save_temporary_patch(&self, patch: &[u8]) -> Result<TempPath, GitCommandError> {
        let temp_failed = |e: std::io::Error| GitCommandError::TempFileFailed {
            message: e.to_string(),
        };
        let mut file = tempfile::Builder::new()
            .prefix("git-patchwork-")
            .suffix(".patch")
            .tempfile()
            .map_err(temp_failed)?;
        file.write_all(patch).map_err(temp_failed)?;
        Ok(file.into_temp_path())
    }

    /// Read a file, relative to the repository or absolute.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, GitCommandError> {
        let full = self.repo_path.join(path.as_ref());
        std::fs::read(&full).map_err(|e| GitCommandError::ReadFailed {
            path: full.display().to_string(),
            message: e.to_string(),
        })
    }

    fn git_path(&self, name: &str) -> Option<PathBuf> {
        let out = self.run(&["rev-parse", "--git-path", name]).ok()?;
        let path = PathBuf::from(out.trim());
        Some(if path.is_absolute() {
            path
        } else {
            self.repo_path.join(path)
        })
    }

    fn head(&self) -> Result<String, GitCommandError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// The `edit`/`pick` todo list that stops at each of `ids`.
    fn rebase_todo(&self, ids: &[&str]) -> Result<(String, Option<String>), RebaseError> {
        let step_failed = |e: GitCommandError| RebaseError::Failed {
            step: "plan rebase".to_string(),
            reason: e.to_string(),
        };

        let full: Vec<String> = ids
            .iter()
            .map(|id| {
                let spec = format!("{id}^{{commit}}");
                self.run(&["rev-parse", "--verify", &spec])
                    .map(|out| out.trim().to_string())
            })
            .collect::<Result<_, _>>()
            .map_err(step_failed)?;
        let Some(oldest) = full.first() else {
            return Err(RebaseError::Failed {
                step: "plan rebase".to_string(),
                reason: "no commits to stop at".to_string(),
            });
        };

        let parent_spec = format!("{oldest}^");
        let base = self
            .run(&["rev-parse", "--verify", "--quiet", &parent_spec])
            .ok()
            .map(|out| out.trim().to_string());

        let range = match &base {
            Some(base) => format!("{base}..HEAD"),
            None => "HEAD".to_string(),
        };
        let listed = self
            .run(&["rev-list", "--reverse", "--no-merges", &range])
            .map_err(step_failed)?;

        let stops: HashSet<&str> = full.iter().map(String::as_str).collect();
        let mut todo = String::new();
        let mut found = 0;
        for id in listed.lines() {
            let verb = if stops.contains(id) {
                found += 1;
                "edit"
            } else {
                "pick"
            };
            todo.push_str(&format!("{verb} {id}\n"));
        }

        if found != stops.len() {
            return Err(RebaseError::Failed {
                step: "plan rebase".to_string(),
                reason: "commit is not on the current branch".to_string(),
            });
        }

        Ok((todo, base))
    }

    /// Turn a failed rebase command into a conflict if git left a rebase
    /// behind, or a plain failure if not.
    fn rebase_outcome(&self, step: &str, err: GitCommandError) -> RebaseError {
        let reason = match err {
            GitCommandError::ExitError { stderr, .. } => stderr,
            other => other.to_string(),
        };
        if self.rebase_in_progress() {
            RebaseError::Conflict { reason }
        } else {
            RebaseError::Failed {
                step: step.to_string(),
                reason,
            }
        }
    }
}

impl PatchApplier for GitCli {
    fn apply_patch(&self, patch: &[u8], opts: ApplyOpts) -> Result<(), ApplyError> {
        let mut args = vec!["apply"];
        // zero-context hunks have nothing to anchor on
        if self.context_lines == 0 {
            args.push("--unidiff-zero");
        }
        if opts.cached {
            args.push("--cached");
        } else if opts.index {
            args.push("--index");
        }
        if opts.reverse {
            args.push("-R");
        }
        args.push("-");

        self.run_with(&args, &[], Some(patch))
            .map(|_| ())
            .map_err(|err| ApplyError::Rejected {
                reason: match err {
                    GitCommandError::ExitError { stderr, .. } => stderr,
                    other => other.to_string(),
                },
            })
    }
}

impl Rebaser for GitCli {
    fn checkout_commits(&self, ids: &[&str]) -> Result<(), RebaseError> {
        let (todo, base) = self.rebase_todo(ids)?;

        let temp_failed = |e: std::io::Error| RebaseError::Failed {
            step: "write rebase todo".to_string(),
            reason: e.to_string(),
        };
        let mut file = NamedTempFile::new().map_err(temp_failed)?;
        file.write_all(todo.as_bytes()).map_err(temp_failed)?;
        let todo_path = file.into_temp_path();

        // git runs the sequence editor through the shell with the todo file
        // appended, so copying our list over it replaces the plan.
        let editor = format!("cp '{}'", todo_path.display());
        let mut args = vec!["rebase", "--interactive", "--no-autosquash", "--empty=keep"];
        match &base {
            Some(base) => args.push(base.as_str()),
            None => args.push("--root"),
        }

        self.run_with(
            &args,
            &[("GIT_SEQUENCE_EDITOR", editor.as_str()), ("GIT_EDITOR", "true")],
            None,
        )
        .map_err(|err| self.rebase_outcome("start rebase", err))?;

        if !self.rebase_in_progress() {
            return Err(RebaseError::Failed {
                step: "start rebase".to_string(),
                reason: "rebase did not stop at the commit".to_string(),
            });
        }
        Ok(())
    }

    fn amend_current_commit(&self) -> Result<(), RebaseError> {
        self.run(&["commit", "--amend", "--no-edit", "--allow-empty"])
            .map(|_| ())
            .map_err(|err| RebaseError::Failed {
                step: "amend commit".to_string(),
                reason: err.to_string(),
            })
    }

    fn create_commit(&self, message: &str) -> Result<(), RebaseError> {
        self.run(&["commit", "-m", message])
            .map(|_| ())
            .map_err(|err| RebaseError::Failed {
                step: "create commit".to_string(),
                reason: err.to_string(),
            })
    }

    fn continue_rebase(&self) -> Result<RebaseProgress, RebaseError> {
        self.run_with(&["rebase", "--continue"], &[("GIT_EDITOR", "true")], None)
            .map_err(|err| self.rebase_outcome("continue rebase", err))?;

        if !self.rebase_in_progress() {
            return Ok(RebaseProgress::Finished);
        }
        Ok(RebaseProgress::Paused(self.head_commit()?))
    }

    fn abort_rebase(&self) -> Result<(), RebaseError> {
        self.run(&["rebase", "--abort"])
            .map(|_| ())
            .map_err(|err| RebaseError::Failed {
                step: "abort rebase".to_string(),
                reason: err.to_string(),
            })
    }

    fn rebase_in_progress(&self) -> bool {
        ["rebase-merge", "rebase-apply"]
            .iter()
            .filter_map(|name| self.git_path(name))
            .any(|path| path.exists())
    }

    fn head_commit(&self) -> Result<String, RebaseError> {
        self.head().map_err(|err| RebaseError::Failed {
            step: "read HEAD".to_string(),
            reason: err.to_string(),
        })
    }

    fn stash_push(&self, message: &str) -> Result<(), RebaseError> {
        self.run(&["stash", "push", "-m", message])
            .map(|_| ())
            .map_err(|err| RebaseError::Failed {
                step: "stash changes".to_string(),
                reason: err.to_string(),
            })
    }

    fn stash_pop(&self) -> Result<(), RebaseError> {
        self.run(&["stash", "pop"])
            .map(|_| ())
            .map_err(|err| RebaseError::Failed {
                step: "pop stash".to_string(),
                reason: err.to_string(),
            })
    }
}
