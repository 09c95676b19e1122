//! Line-level staging and cross-commit patch building for git.
//!
//! The core is [`patch`]: parse a unified diff, keep a subset of its changed
//! lines, and write it back out as a patch `git apply` accepts. On top of it,
//! [`builder::PatchBuilder`] accumulates such subsets across files and moves
//! them around history, and [`controller`] wires both to user actions.
//!
//! # Examples
//! ```
//! use git_patchwork::patch::{Patch, TransformOpts};
//! use git_patchwork::selection::expand_range;
//!
//! let diff = "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n-one\n-two\n+uno\n+dos\n";
//! // Rows 3..=5 are "-one", "-two" and "+uno"
//! let staged = Patch::parse(diff).transform(&TransformOpts {
//!     reverse: false,
//!     included: &expand_range(3, 5),
//!     file_name_override: None,
//! });
//! assert_eq!(
//!     staged.format_plain(),
//!     "--- a/f\n+++ b/f\n@@ -1,2 +1 @@\n-one\n-two\n+uno\n"
//! );
//! ```

use error_set::error_set;

pub mod builder;
pub mod collab;
pub mod config;
pub mod controller;
pub mod git;
pub mod logging;
pub mod os;
pub mod patch;
pub mod selection;
pub mod session;

pub use builder::{FileStatus, PatchBuilder, PatchBuilderError, PatchTarget};
pub use collab::{ApplyError, ClipboardError, EditorError, RebaseError};
pub use config::{Config, ConfigError};
pub use git::{GitCli, GitCommandError};
pub use patch::{Patch, TransformOpts};

error_set! {
    /// Top-level error for git-patchwork operations
    PatchworkError := {
        #[display("No changes found in {file}")]
        NoChanges { file: String },
        #[display("Commit {id} is not on the current branch")]
        CommitNotFound { id: String },
        #[display("Select a commit to move the patch to first")]
        NoCommitSelected,
        #[display("Invalid line range '{range}', expected N or N..M")]
        InvalidRange { range: String },
        #[display("Terminal I/O failed: {message}")]
        Io { message: String },
        GitCommandError(GitCommandError),
        PatchBuilderError(PatchBuilderError),
        ApplyError(ApplyError),
        RebaseError(RebaseError),
        EditorError(EditorError),
        ClipboardError(ClipboardError),
        ConfigError(ConfigError),
    }
}

impl From<std::io::Error> for PatchworkError {
    fn from(e: std::io::Error) -> Self {
        PatchworkError::Io {
            message: e.to_string(),
        }
    }
}
