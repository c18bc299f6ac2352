use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to enumerate vault: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid folder pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation errors detected:\n\n{}", .problems.join("\n"))]
    Validation { problems: Vec<String> },

    #[error("Input note not found: {0}")]
    InputNotFound(String),

    #[error("Index not found at {0}. Run 'vaultdex build' first.")]
    IndexNotFound(PathBuf),

    #[error("Slug not in index: {0}")]
    UnknownSlug(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
