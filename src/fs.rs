use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobSet;

use crate::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileKind {
    File,
    Directory,
}

/// Filesystem queries the favorites engine needs from its environment.
pub trait FileSystem {
    /// `None` when the path is missing or is neither a file nor a directory.
    fn kind(&self, path: &Path) -> Option<FileKind>;

    /// Every regular file beneath `root`, skipping dot-entries and anything
    /// matched by `excludes`.
    fn list_files(&self, root: &Path, excludes: Option<&GlobSet>) -> Vec<PathBuf>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn kind(&self, path: &Path) -> Option<FileKind> {
        let metadata = fs::metadata(path).ok()?;
        if metadata.is_dir() {
            Some(FileKind::Directory)
        } else if metadata.is_file() {
            Some(FileKind::File)
        } else {
            None
        }
    }

    fn list_files(&self, root: &Path, excludes: Option<&GlobSet>) -> Vec<PathBuf> {
        scanner::collect_files(root, excludes).files
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
