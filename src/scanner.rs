use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, trace};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub dirs_scanned: u64,
    pub fs_errors: u64,
}

pub fn collect_files(root: &Path, excludes: Option<&GlobSet>) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry, root, excludes));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                debug!("favorites scan error: {err}");
                outcome.fs_errors += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            outcome.dirs_scanned += 1;
        } else if file_type.is_file() || (file_type.is_symlink() && links_to_file(&entry)) {
            trace!("favorites scan file={}", entry.path().display());
            outcome.files.push(entry.into_path());
        }
    }

    debug!(
        "favorites scan root={} files={} dirs={} fs_errors={}",
        root.display(),
        outcome.files.len(),
        outcome.dirs_scanned,
        outcome.fs_errors
    );

    outcome
}

pub fn compile_excludes(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(build_glob(pattern)?);
    }
    builder.build().map(Some)
}

fn build_glob(pattern: &str) -> Result<Glob, globset::Error> {
    let mut builder = GlobBuilder::new(pattern);
    builder.literal_separator(true);
    builder.build()
}

fn is_excluded(entry: &DirEntry, root: &Path, excludes: Option<&GlobSet>) -> bool {
    if is_hidden(entry) {
        return true;
    }

    let Some(matcher) = excludes else {
        return false;
    };

    let path = entry.path();
    if matcher.is_match(path) {
        return true;
    }

    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => matcher.is_match(relative),
        _ => false,
    }
}

/// Symlinked directories are not descended; a link resolving to a regular
/// file counts as that file. Dangling links are skipped.
fn links_to_file(entry: &DirEntry) -> bool {
    match std::fs::metadata(entry.path()) {
        Ok(metadata) => metadata.is_file(),
        Err(err) => {
            debug!("favorites scan dangling link {}: {err}", entry.path().display());
            false
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
