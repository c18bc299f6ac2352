use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, VaultError};

/// Settings read from `.vaultdex.toml`. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Top-level vault folders mirrored in from another vault.
    /// Notes under these lose every slug or link tie against local notes.
    #[serde(default = "default_remote_roots")]
    pub remote_roots: Vec<String>,
    /// Glob patterns matched case-insensitively against folder names.
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Abort before writing anything when an `inherits` link does not resolve.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub expand: ExpandConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_index_json")]
    pub index_json: String,
    #[serde(default = "default_index_note")]
    pub index_note: String,
    #[serde(default = "default_note_title")]
    pub note_title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpandConfig {
    #[serde(default = "default_expand_input")]
    pub input: String,
    #[serde(default = "default_expand_output")]
    pub output: String,
}

fn default_remote_roots() -> Vec<String> {
    vec!["common".to_string()]
}
fn default_excluded_folders() -> Vec<String> {
    vec!["*templates*".to_string()]
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}
fn default_index_json() -> String {
    "index/instructions_index.json".to_string()
}
fn default_index_note() -> String {
    "index/Instructions Index.md".to_string()
}
fn default_note_title() -> String {
    "Instructions Index".to_string()
}
fn default_expand_input() -> String {
    "content_index.md".to_string()
}
fn default_expand_output() -> String {
    "output/output_content.md".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_roots: default_remote_roots(),
            excluded_folders: default_excluded_folders(),
            extensions: default_extensions(),
            strict: false,
            output: OutputConfig::default(),
            expand: ExpandConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            index_json: default_index_json(),
            index_note: default_index_note(),
            note_title: default_note_title(),
        }
    }
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            input: default_expand_input(),
            output: default_expand_output(),
        }
    }
}

/// Load the config file if it exists, falling back to defaults otherwise.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)
        .map_err(|e| VaultError::Config(format!("{}: {}", path.display(), e)))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).map_err(|e| VaultError::Config(e.to_string()))?;

    config.remote_roots = config
        .remote_roots
        .iter()
        .map(|r| r.trim().trim_matches('/').to_string())
        .filter(|r| !r.is_empty())
        .collect();

    config.extensions = config
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    if config.extensions.is_empty() {
        return Err(VaultError::Config(
            "extensions must list at least one file extension".to_string(),
        ));
    }

    for (key, value) in [
        ("output.index_json", &config.output.index_json),
        ("output.index_note", &config.output.index_note),
        ("expand.output", &config.expand.output),
    ] {
        if value.trim().is_empty() {
            return Err(VaultError::Config(format!("{} must not be empty", key)));
        }
        if Path::new(value).is_absolute() {
            return Err(VaultError::Config(format!(
                "{} must be relative to the vault root, got '{}'",
                key, value
            )));
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.remote_roots, vec!["common"]);
        assert_eq!(config.excluded_folders, vec!["*templates*"]);
        assert_eq!(config.extensions, vec!["md"]);
        assert!(!config.strict);
        assert_eq!(config.output.index_json, "index/instructions_index.json");
        assert_eq!(config.output.index_note, "index/Instructions Index.md");
        assert_eq!(config.expand.output, "output/output_content.md");
    }

    #[test]
    fn test_remote_roots_and_extensions_are_normalized() {
        let config = parse_config(
            "remote_roots = [\"/shared/\", \"\", \"common\"]\nextensions = [\".MD\", \"markdown\"]\n",
        )
        .unwrap();
        assert_eq!(config.remote_roots, vec!["shared", "common"]);
        assert_eq!(config.extensions, vec!["md", "markdown"]);
    }

    #[test]
    fn test_nested_tables() {
        let config = parse_config(
            "strict = true\n[output]\nindex_json = \"out/idx.json\"\nnote_title = \"Roles\"\n",
        )
        .unwrap();
        assert!(config.strict);
        assert_eq!(config.output.index_json, "out/idx.json");
        assert_eq!(config.output.index_note, "index/Instructions Index.md");
        assert_eq!(config.output.note_title, "Roles");
    }

    #[test]
    fn test_rejects_empty_extensions() {
        let err = parse_config("extensions = []\n").unwrap_err();
        assert!(err.to_string().contains("extensions"));
    }

    #[test]
    fn test_rejects_absolute_output() {
        let err = parse_config("[output]\nindex_json = \"/tmp/idx.json\"\n").unwrap_err();
        assert!(err.to_string().contains("output.index_json"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(".vaultdex.toml")).unwrap();
        assert_eq!(config.remote_roots, vec!["common"]);
    }
}
