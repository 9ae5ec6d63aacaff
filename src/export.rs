use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::warn;

use crate::error::FavoritesError;
use crate::fs::FileSystem;
use crate::model::FavoriteItem;
use crate::util::format_size;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub files: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl ExportReport {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Exported {} file(s) ({}) to {}",
            self.files,
            format_size(self.bytes),
            self.path.display()
        );
        if self.skipped > 0 {
            let _ = write!(message, "; {} unreadable file(s) skipped", self.skipped);
        }
        message
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub text: String,
    pub files: usize,
    pub skipped: usize,
}

/// Concatenates the contents of `items` into one text bundle. Every file is
/// wrapped in a `<file path="...">` tag around a fenced raw-content block.
pub fn build_bundle(filesystem: &dyn FileSystem, items: &[FavoriteItem]) -> Bundle {
    let mut bundle = Bundle::default();
    let mut seen = std::collections::BTreeSet::new();

    for item in items {
        let path = item.path();
        if !seen.insert(path.to_path_buf()) {
            continue;
        }

        let contents = match filesystem.read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!("favorites export skipped {}: {err}", path.display());
                bundle.skipped += 1;
                continue;
            }
        };

        let fence = fence_for(&contents);
        let _ = writeln!(bundle.text, "<file path=\"{}\">", path.display());
        let _ = writeln!(bundle.text, "{fence}{}", language_hint(path));
        bundle.text.push_str(&contents);
        if !contents.ends_with('\n') {
            bundle.text.push('\n');
        }
        let _ = writeln!(bundle.text, "{fence}");
        let _ = writeln!(bundle.text, "</file>");
        bundle.text.push('\n');
        bundle.files += 1;
    }

    bundle
}

/// `favorites-<label>-<YYYYMMDD-HHMMSS>.md`, with the label reduced to
/// filename-safe characters.
pub fn bundle_file_name(label: &str, now: DateTime<Local>) -> String {
    let mut safe: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    while safe.contains("--") {
        safe = safe.replace("--", "-");
    }
    let safe = safe.trim_matches('-');
    let safe = if safe.is_empty() { "selection" } else { safe };
    format!("favorites-{safe}-{}.md", now.format("%Y%m%d-%H%M%S"))
}

pub fn write_bundle(
    filesystem: &dyn FileSystem,
    items: &[FavoriteItem],
    label: &str,
    dir: &Path,
) -> Result<ExportReport, FavoritesError> {
    let bundle = build_bundle(filesystem, items);
    let path = dir.join(bundle_file_name(label, Local::now()));
    fs::write(&path, &bundle.text).map_err(|source| FavoritesError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(ExportReport {
        path,
        files: bundle.files,
        skipped: bundle.skipped,
        bytes: bundle.text.len() as u64,
    })
}

fn fence_for(contents: &str) -> String {
    let longest = contents
        .lines()
        .map(|line| line.trim_start().chars().take_while(|c| *c == '`').count())
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn language_hint(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}
