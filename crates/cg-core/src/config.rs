//! Configuration loading shared by the catalog and prompt templates.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

/// Read and decode a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read and decode a YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration errors.
///
/// Fatal at startup; inside an iteration (template rendering) they fail
/// that iteration only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Algorithm catalog {0} is empty")]
    EmptyCatalog(String),

    #[error("Unknown variable `{variable}` in {template} template")]
    UnknownVariable {
        template: &'static str,
        variable: String,
    },

    #[error("Unterminated placeholder in {template} template")]
    UnterminatedPlaceholder { template: &'static str },

    #[error("Invalid annotation pattern: {0}")]
    Pattern(#[from] regex::Error),
}
