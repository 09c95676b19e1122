use error_set::error_set;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

error_set! {
    /// Errors loading the configuration file
    ConfigError := {
        #[display("Failed to read config {path}: {message}")]
        ReadFailed { path: String, message: String },
        #[display("Invalid config {path}: {message}")]
        Invalid { path: String, message: String },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gui: GuiConfig,
    #[serde(default)]
    pub os: OsConfig,
    #[serde(default)]
    pub git: GitConfig,
}

/// [gui] section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuiConfig {
    /// Unstage or discard a selection without asking first
    #[serde(default)]
    pub skip_unstage_line_warning: bool,
    /// Drop an existing custom patch without asking when starting a new one
    #[serde(default)]
    pub skip_discard_warning: bool,
}

/// [os] section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsConfig {
    /// Editor command; `$VISUAL`, then `$EDITOR`, then `vi` when unset
    #[serde(default)]
    pub editor: Option<String>,
    /// Command that reads text to copy on stdin
    #[serde(default)]
    pub clipboard_command: Option<String>,
}

/// [git] section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: u32,
}

fn default_context_lines() -> u32 {
    3
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
        }
    }
}

/// `~/.config/git-patchwork/config.toml` or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("git-patchwork").join("config.toml"))
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing default file gives the defaults; a file named explicitly
    /// must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text).map_err(|message| ConfigError::Invalid {
            path: path.display().to_string(),
            message,
        })
    }

    fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn empty_file_is_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.git.context_lines, 3);
    }

    #[test]
    fn sections_override_independently() {
        let config = Config::parse(
            r#"
            [gui]
            skip_discard_warning = true

            [os]
            editor = "nvim"
            "#,
        )
        .unwrap();

        assert!(config.gui.skip_discard_warning);
        assert!(!config.gui.skip_unstage_line_warning);
        assert_eq!(config.os.editor.as_deref(), Some("nvim"));
        assert_eq!(config.git, GitConfig::default());
    }

    #[test]
    fn bad_types_are_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[git]\ncontext_lines = \"lots\"\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/patchwork.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }
}
