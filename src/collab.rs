//! Seams to the outside world.
//!
//! The patch builder and the controllers never talk to git, an editor or the
//! terminal directly. They go through these traits, which [`crate::git::GitCli`]
//! and [`crate::os`] implement for real use and tests implement with fakes.

use error_set::error_set;

error_set! {
    /// `git apply` (or a stand-in) refused a patch
    ApplyError := {
        #[display("Patch does not apply: {reason}")]
        Rejected { reason: String },
    }

    /// A history rewrite primitive failed
    RebaseError := {
        /// The rebase stopped on a conflict and is waiting for the user
        #[display("Rebase stopped with conflicts: {reason}")]
        Conflict { reason: String },
        /// The primitive itself failed, e.g. the rebase could not start
        #[display("{step} failed: {reason}")]
        Failed { step: String, reason: String },
    }

    /// Launching the user's editor failed
    EditorError := {
        #[display("Failed to run editor '{command}': {message}")]
        Launch { command: String, message: String },
        #[display("Editor '{command}' exited with an error")]
        ExitError { command: String },
    }

    /// Writing to the system clipboard failed
    ClipboardError := {
        #[display("Failed to copy to clipboard with '{command}': {message}")]
        CopyFailed { command: String, message: String },
    }
}

/// Where `git apply` should put the result.
///
/// With neither `cached` nor `index` set the patch goes to the working tree
/// only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOpts {
    pub reverse: bool,
    /// Apply to the index only (`--cached`)
    pub cached: bool,
    /// Apply to both index and working tree (`--index`)
    pub index: bool,
}

/// A commit in the branch being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    pub summary: String,
}

impl Commit {
    /// Abbreviated id for messages.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Where a rebase stands after a successful step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseProgress {
    /// Stopped for editing at this commit
    Paused(String),
    Finished,
}

pub trait PatchApplier {
    /// Apply diff bytes as produced by [`Patch::to_bytes`](crate::patch::Patch::to_bytes).
    fn apply_patch(&self, patch: &[u8], opts: ApplyOpts) -> Result<(), ApplyError>;
}

/// History rewrite primitives.
///
/// Each call either completes or leaves the repository in a paused rebase
/// that git itself can report; nothing here spans two calls.
pub trait Rebaser {
    /// Start an interactive rebase that stops for editing at each of `ids`,
    /// oldest first. Returns once stopped at the oldest one.
    fn checkout_commits(&self, ids: &[&str]) -> Result<(), RebaseError>;

    fn checkout_commit(&self, id: &str) -> Result<(), RebaseError> {
        self.checkout_commits(&[id])
    }

    /// Fold the index into the commit the rebase is stopped at.
    fn amend_current_commit(&self) -> Result<(), RebaseError>;

    /// Commit the index as a new commit on top of the current stop.
    fn create_commit(&self, message: &str) -> Result<(), RebaseError>;

    fn continue_rebase(&self) -> Result<RebaseProgress, RebaseError>;

    fn abort_rebase(&self) -> Result<(), RebaseError>;

    fn rebase_in_progress(&self) -> bool;

    /// Id of the commit HEAD points at.
    fn head_commit(&self) -> Result<String, RebaseError>;

    fn stash_push(&self, message: &str) -> Result<(), RebaseError>;

    fn stash_pop(&self) -> Result<(), RebaseError>;
}

pub trait Editor {
    /// Open `path` at `line` and return straight away.
    fn open_at_line(&self, path: &str, line: usize) -> Result<(), EditorError>;

    /// Open `path` at `line` and wait until the editor exits.
    fn open_at_line_and_wait(&self, path: &str, line: usize) -> Result<(), EditorError>;
}

pub trait Clipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError>;
}

/// What the controllers need from whatever is drawing the screen.
pub trait Ui {
    /// Re-read repository state and redraw.
    fn refresh(&self);

    /// Show (or with `None`, clear) a busy indicator.
    fn set_busy(&self, status: Option<&str>);

    /// Ask a yes/no question.
    fn confirm(&self, title: &str, prompt: &str) -> bool;

    fn toast(&self, message: &str);

    fn error(&self, message: &str);
}
