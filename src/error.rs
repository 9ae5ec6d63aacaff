use std::path::PathBuf;

use crate::storage::StorageError;

#[derive(Debug)]
pub enum FavoritesError {
    DuplicateName(String),
    ProtectedGroup(String),
    UnknownGroup(String),
    InvalidName(String),
    EmptyHistory,
    Persistence(StorageError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Pattern(globset::Error),
    Config {
        path: PathBuf,
        message: String,
    },
}

impl std::fmt::Display for FavoritesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FavoritesError::DuplicateName(name) => {
                write!(f, "a group named \"{name}\" already exists")
            }
            FavoritesError::ProtectedGroup(name) => {
                write!(f, "the \"{name}\" group cannot be renamed or deleted")
            }
            FavoritesError::UnknownGroup(name) => write!(f, "no group named \"{name}\""),
            FavoritesError::InvalidName(name) => write!(f, "invalid group name \"{name}\""),
            FavoritesError::EmptyHistory => write!(f, "nothing to undo"),
            FavoritesError::Persistence(err) => write!(f, "failed to save favorites: {err}"),
            FavoritesError::Io { path, source } => {
                write!(f, "{}: {source}", path.display())
            }
            FavoritesError::Pattern(err) => write!(f, "invalid exclude pattern: {err}"),
            FavoritesError::Config { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for FavoritesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FavoritesError::Persistence(err) => Some(err),
            FavoritesError::Io { source, .. } => Some(source),
            FavoritesError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for FavoritesError {
    fn from(value: StorageError) -> Self {
        FavoritesError::Persistence(value)
    }
}

impl From<globset::Error> for FavoritesError {
    fn from(value: globset::Error) -> Self {
        FavoritesError::Pattern(value)
    }
}
