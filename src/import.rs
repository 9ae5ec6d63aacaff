use std::path::PathBuf;

use log::debug;
use shellexpand::tilde;

use crate::error::FavoritesError;
use crate::fs::{FileKind, FileSystem};
use crate::tree::GroupTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub failed: usize,
}

impl ImportReport {
    pub fn level(&self) -> ReportLevel {
        match (self.added, self.failed) {
            (0, failed) if failed > 0 => ReportLevel::Error,
            (_, 0) => ReportLevel::Info,
            _ => ReportLevel::Warning,
        }
    }

    pub fn message(&self, group: &str) -> String {
        match self.level() {
            ReportLevel::Error => format!(
                "No files imported into \"{group}\": {} path(s) could not be added",
                self.failed
            ),
            ReportLevel::Warning => format!(
                "Imported {} file(s) into \"{group}\"; {} path(s) failed",
                self.added, self.failed
            ),
            ReportLevel::Info => format!("Imported {} file(s) into \"{group}\"", self.added),
        }
    }
}

/// Non-blank lines that are not `#` comments, trimmed, with `~` expanded.
pub fn candidate_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| PathBuf::from(tilde(line).into_owned()))
        .collect()
}

/// Files every regular file named in `text` into `group`. Individual bad
/// lines are counted, never raised.
pub fn import_from_text(
    tree: &mut GroupTree,
    filesystem: &dyn FileSystem,
    group: &str,
    text: &str,
) -> Result<ImportReport, FavoritesError> {
    if !tree.contains_group(group) {
        return Err(FavoritesError::UnknownGroup(group.to_string()));
    }

    let mut report = ImportReport::default();
    for candidate in candidate_paths(text) {
        match filesystem.kind(&candidate) {
            Some(FileKind::File) => {
                tree.insert_file(group, &candidate)?;
                report.added += 1;
            }
            other => {
                debug!(
                    "favorites import skipped {} (kind={other:?})",
                    candidate.display()
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
