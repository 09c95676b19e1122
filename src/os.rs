//! Editor and clipboard collaborators that shell out to the user's tools.

use crate::collab::{Clipboard, ClipboardError, Editor, EditorError};
use crate::config::OsConfig;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Launches the configured editor with the cursor on a line.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    command: String,
    repo_path: PathBuf,
}

impl CommandEditor {
    /// Editor from config, else `$VISUAL`, else `$EDITOR`, else `vi`.
    /// Relative paths are opened inside `repo_path`.
    pub fn new(config: &OsConfig, repo_path: impl Into<PathBuf>) -> Self {
        let command = config
            .editor
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self {
            command,
            repo_path: repo_path.into(),
        }
    }

    fn build(&self, path: &str, line: usize, wait: bool) -> Result<Command, EditorError> {
        let mut words = self.command.split_whitespace();
        let program = words.next().ok_or_else(|| EditorError::Launch {
            command: self.command.clone(),
            message: "empty editor command".to_string(),
        })?;
        let file = self.repo_path.join(path);

        let mut cmd = Command::new(program);
        cmd.args(words);
        // GUI editors want a file:line argument and their own wait flag.
        if program.contains("code") || program.contains("cursor") {
            if wait {
                cmd.arg("--wait");
            }
            cmd.arg("-g").arg(format!("{}:{line}", file.display()));
        } else if program.contains("zed") {
            if wait {
                cmd.arg("--wait");
            }
            cmd.arg(format!("{}:{line}", file.display()));
        } else {
            cmd.arg(format!("+{line}")).arg(&file);
        }
        Ok(cmd)
    }

    fn launch_failed(&self, e: std::io::Error) -> EditorError {
        EditorError::Launch {
            command: self.command.clone(),
            message: e.to_string(),
        }
    }
}

impl Editor for CommandEditor {
    fn open_at_line(&self, path: &str, line: usize) -> Result<(), EditorError> {
        debug!(editor = %self.command, path, line, "opening editor");
        self.build(path, line, false)?
            .spawn()
            .map(|_| ())
            .map_err(|e| self.launch_failed(e))
    }

    fn open_at_line_and_wait(&self, path: &str, line: usize) -> Result<(), EditorError> {
        debug!(editor = %self.command, path, line, "opening editor and waiting");
        let status = self
            .build(path, line, true)?
            .status()
            .map_err(|e| self.launch_failed(e))?;
        if !status.success() {
            return Err(EditorError::ExitError {
                command: self.command.clone(),
            });
        }
        Ok(())
    }
}

/// Copies text by piping it into a clipboard program.
#[derive(Debug, Clone, Default)]
pub struct CommandClipboard {
    command: Option<String>,
}

impl CommandClipboard {
    pub fn new(config: &OsConfig) -> Self {
        Self {
            command: config.clipboard_command.clone(),
        }
    }

    /// Programs to try, in order.
    fn candidates(&self) -> Vec<(String, Vec<String>)> {
        if let Some(command) = &self.command {
            let mut words = command.split_whitespace().map(str::to_string);
            return words
                .next()
                .map(|program| vec![(program, words.collect())])
                .unwrap_or_default();
        }

        let owned = |program: &str, args: &[&str]| -> (String, Vec<String>) {
            (
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            )
        };
        if cfg!(target_os = "macos") {
            vec![owned("pbcopy", &[])]
        } else if cfg!(target_os = "windows") {
            vec![owned("clip", &[])]
        } else {
            let mut found = Vec::new();
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                found.push(owned("wl-copy", &[]));
            }
            found.push(owned("xclip", &["-selection", "clipboard"]));
            found.push(owned("xsel", &["--clipboard", "--input"]));
            found
        }
    }
}

fn pipe_into(program: &str, args: &[String], text: &str) -> std::io::Result<bool> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(text.as_bytes())?;
    }
    Ok(child.wait()?.success())
}

impl Clipboard for CommandClipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last = ClipboardError::CopyFailed {
            command: String::new(),
            message: "no clipboard command available".to_string(),
        };

        for (program, args) in self.candidates() {
            debug!(program, "copying to clipboard");
            match pipe_into(&program, &args, text) {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    last = ClipboardError::CopyFailed {
                        command: program,
                        message: "exited with an error".to_string(),
                    }
                }
                Err(e) => {
                    last = ClipboardError::CopyFailed {
                        command: program,
                        message: e.to_string(),
                    }
                }
            }
        }

        Err(last)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn terminal_editor_gets_plus_line() {
        let config = OsConfig {
            editor: Some("nvim -u NONE".to_string()),
            ..OsConfig::default()
        };
        let editor = CommandEditor::new(&config, "/repo");
        let cmd = editor.build("src/lib.rs", 12, true).unwrap();
        assert!(cmd.get_program() == "nvim");
        assert_eq!(args(&cmd), vec!["-u", "NONE", "+12", "/repo/src/lib.rs"]);
    }

    #[test]
    fn gui_editor_waits_when_asked() {
        let config = OsConfig {
            editor: Some("code".to_string()),
            ..OsConfig::default()
        };
        let editor = CommandEditor::new(&config, "/repo");
        assert_eq!(
            args(&editor.build("a.txt", 3, true).unwrap()),
            vec!["--wait", "-g", "/repo/a.txt:3"]
        );
        assert_eq!(
            args(&editor.build("a.txt", 3, false).unwrap()),
            vec!["-g", "/repo/a.txt:3"]
        );
    }

    #[test]
    fn clipboard_override_is_split_into_words() {
        let clipboard = CommandClipboard::new(&OsConfig {
            clipboard_command: Some("tmux load-buffer -".to_string()),
            ..OsConfig::default()
        });
        assert_eq!(
            clipboard.candidates(),
            vec![(
                "tmux".to_string(),
                vec!["load-buffer".to_string(), "-".to_string()]
            )]
        );
    }

    #[test]
    fn failing_clipboard_reports_command() {
        let clipboard = CommandClipboard::new(&OsConfig {
            clipboard_command: Some("git-patchwork-no-such-clipboard".to_string()),
            ..OsConfig::default()
        });
        let err = clipboard.write("text").unwrap_err();
        assert!(err.to_string().contains("git-patchwork-no-such-clipboard"));
    }
}
