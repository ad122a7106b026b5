//! Optional settings file for the `chatmark` binary.
//!
//! Files ending in `.json` are read as JSON, anything else as TOML. Flags
//! given on the command line override values from the file.

use std::path::{Path, PathBuf};

use chatmark_core::{DirectorySnapshot, EmojiStyle, EntityId, RenderOptions, Scope};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory snapshot used to resolve mentions.
    pub directory: Option<PathBuf>,
    pub server: Option<EntityId>,
    pub channel: Option<EntityId>,
    /// Render as a direct message: no current server.
    pub dm: bool,
    pub emoji_style: Option<EmojiStyle>,
    pub no_big_emoji: bool,
    pub max_depth: Option<usize>,
}

impl CliConfig {
    /// Load `path`, or the default config file if there is one.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => read_file(path),
            None => {
                let default = default_config_path();
                if default.exists() {
                    tracing::debug!(path = %default.display(), "loading default config");
                    read_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn scope(&self) -> Scope {
        Scope {
            current_server: if self.dm { None } else { self.server },
            current_channel: self.channel,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            emoji_style: self.emoji_style.unwrap_or(defaults.emoji_style),
            no_big_emoji: self.no_big_emoji,
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
        }
    }

    pub fn load_directory(&self) -> Result<DirectorySnapshot, CliError> {
        match &self.directory {
            Some(path) => read_file(path),
            None => Ok(DirectorySnapshot::default()),
        }
    }
}

/// Default config path: ~/.config/chatmark/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatmark")
        .join("config.toml")
}

/// Read a JSON or TOML file, chosen by extension.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| CliError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config: CliConfig = toml::from_str(
            r#"
            directory = "dir.json"
            server = 3
            emoji_style = "image"
            max_depth = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.directory, Some(PathBuf::from("dir.json")));
        assert_eq!(config.scope().current_server, Some(3));
        let options = config.render_options();
        assert_eq!(options.emoji_style, EmojiStyle::Image);
        assert_eq!(options.max_depth, 8);
        assert!(!options.no_big_emoji);
    }

    #[test]
    fn test_dm_drops_server() {
        let config = CliConfig {
            server: Some(3),
            channel: Some(4),
            dm: true,
            ..CliConfig::default()
        };
        assert_eq!(config.scope().current_server, None);
        assert_eq!(config.scope().current_channel, Some(4));
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.render_options(), RenderOptions::default());
        assert!(config.load_directory().unwrap().users().is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/chatmark.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
