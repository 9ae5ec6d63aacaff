use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FavoritesError;
use crate::history::HISTORY_LIMIT;

pub const DEFAULT_DOCUMENT_KEY: &str = "favorites";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FavoritesConfig {
    pub history_limit: usize,
    /// Globs pruned when a whole directory is favorited, matched against the
    /// absolute path and the path relative to the favorited directory.
    pub exclude_patterns: Vec<String>,
    pub document_key: String,
    pub export_dir: Option<PathBuf>,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            exclude_patterns: Vec::new(),
            document_key: DEFAULT_DOCUMENT_KEY.to_string(),
            export_dir: None,
        }
    }
}

impl FavoritesConfig {
    pub fn load(path: &Path) -> Result<Self, FavoritesError> {
        let raw = fs::read_to_string(path).map_err(|source| FavoritesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|err| FavoritesError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Like [`FavoritesConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, FavoritesError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
