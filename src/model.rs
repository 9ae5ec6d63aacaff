use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::fs::display_name;

pub const DEFAULT_GROUP: &str = "default";

/// A reference to a file. Items stored inside a [`Group`] are always `Filed`
/// with `group` equal to the owning group's name; `Unfiled` items only exist
/// outside the store (host selections, external drops).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteItem {
    Filed {
        path: PathBuf,
        name: String,
        group: String,
    },
    Unfiled {
        path: PathBuf,
        name: String,
    },
}

impl FavoriteItem {
    pub fn unfiled(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = display_name(&path);
        FavoriteItem::Unfiled { path, name }
    }

    pub fn filed(path: impl Into<PathBuf>, group: impl Into<String>) -> Self {
        let path = path.into();
        let name = display_name(&path);
        FavoriteItem::Filed {
            path,
            name,
            group: group.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FavoriteItem::Filed { path, .. } | FavoriteItem::Unfiled { path, .. } => path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FavoriteItem::Filed { name, .. } | FavoriteItem::Unfiled { name, .. } => name,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            FavoriteItem::Filed { group, .. } => Some(group),
            FavoriteItem::Unfiled { .. } => None,
        }
    }

    /// Group the item lives in, treating unfiled items as belonging to the
    /// default group.
    pub fn group_or_default(&self) -> &str {
        self.group().unwrap_or(DEFAULT_GROUP)
    }

    pub fn filed_into(&self, group: &str) -> FavoriteItem {
        FavoriteItem::Filed {
            path: self.path().to_path_buf(),
            name: self.name().to_string(),
            group: group.to_string(),
        }
    }

    pub fn into_unfiled(self) -> FavoriteItem {
        match self {
            FavoriteItem::Filed { path, name, .. } => FavoriteItem::Unfiled { path, name },
            unfiled => unfiled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub files: BTreeMap<PathBuf, FavoriteItem>,
    pub sub_groups: BTreeSet<String>,
    pub parent: Option<String>,
}

impl Group {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            sub_groups: BTreeSet::new(),
            parent,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GROUP
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Inserts (or replaces) the entry for `path`, filed under this group.
    pub fn insert(&mut self, path: &Path) {
        let item = FavoriteItem::filed(path, self.name.as_str());
        self.files.insert(path.to_path_buf(), item);
    }

    pub fn items(&self) -> impl Iterator<Item = &FavoriteItem> {
        self.files.values()
    }
}
