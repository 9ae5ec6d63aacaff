use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::FavoritesError;
use crate::model::{DEFAULT_GROUP, FavoriteItem, Group};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    DeleteFiles,
    MoveFilesToDefault,
}

/// The group tree together with the active group. Every mutator either fully
/// applies or returns an error before touching any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTree {
    groups: BTreeMap<String, Group>,
    active_group: Option<String>,
}

impl Default for GroupTree {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), Group::new(DEFAULT_GROUP, None));
        Self {
            groups,
            active_group: None,
        }
    }
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from raw parts, restoring the default group, dropping
    /// parent links that dangle or close a cycle, and clearing an active group
    /// that does not exist.
    pub fn from_parts(groups: BTreeMap<String, Group>, active_group: Option<String>) -> Self {
        let mut tree = Self {
            groups,
            active_group,
        };
        tree.sanitize();
        tree
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<String, Group>, Option<String>) {
        (self.groups, self.active_group)
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn active_group(&self) -> Option<&str> {
        self.active_group.as_deref()
    }

    /// Group newly favorited files are filed into.
    pub fn target_group(&self) -> &str {
        match self.active_group.as_deref() {
            Some(active) if self.groups.contains_key(active) => active,
            _ => DEFAULT_GROUP,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &FavoriteItem> {
        self.groups.values().flat_map(|group| group.items())
    }

    pub fn item_count(&self) -> usize {
        self.groups.values().map(|group| group.files.len()).sum()
    }

    pub fn groups_containing(&self, path: &Path) -> Vec<&str> {
        self.groups
            .values()
            .filter(|group| group.contains(path))
            .map(|group| group.name.as_str())
            .collect()
    }

    /// Top-level groups other than the default group.
    pub fn roots(&self) -> Vec<&str> {
        self.groups
            .values()
            .filter(|group| group.parent.is_none() && !group.is_default())
            .map(|group| group.name.as_str())
            .collect()
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.groups
            .get(name)
            .map(|group| group.sub_groups.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// All groups beneath `name`, deepest first.
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut out = Vec::new();
        visited.insert(name.to_string());
        self.collect_descendants(name, &mut visited, &mut out);
        out
    }

    fn collect_descendants(&self, name: &str, visited: &mut BTreeSet<String>, out: &mut Vec<String>) {
        let Some(group) = self.groups.get(name) else {
            return;
        };
        for child in &group.sub_groups {
            if visited.insert(child.clone()) {
                self.collect_descendants(child, visited, out);
                out.push(child.clone());
            }
        }
    }

    pub fn create_group(&mut self, name: &str, parent: Option<&str>) -> Result<(), FavoritesError> {
        let name = validate_name(name)?;
        if self.groups.contains_key(&name) {
            return Err(FavoritesError::DuplicateName(name));
        }

        let parent = match parent.map(str::trim) {
            None | Some(DEFAULT_GROUP) => None,
            Some(parent) if !self.groups.contains_key(parent) => {
                return Err(FavoritesError::UnknownGroup(parent.to_string()));
            }
            Some(parent) => Some(parent.to_string()),
        };

        if let Some(parent) = parent.as_ref() {
            if let Some(parent_group) = self.groups.get_mut(parent) {
                parent_group.sub_groups.insert(name.clone());
            }
        }
        self.groups.insert(name.clone(), Group::new(name, parent));
        Ok(())
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), FavoritesError> {
        if old == DEFAULT_GROUP {
            return Err(FavoritesError::ProtectedGroup(old.to_string()));
        }
        if !self.groups.contains_key(old) {
            return Err(FavoritesError::UnknownGroup(old.to_string()));
        }
        let new = validate_name(new)?;
        if new == old {
            return Ok(());
        }
        if self.groups.contains_key(&new) {
            return Err(FavoritesError::DuplicateName(new));
        }

        let Some(mut group) = self.groups.remove(old) else {
            return Err(FavoritesError::UnknownGroup(old.to_string()));
        };
        group.name = new.clone();
        group.files = group
            .files
            .into_values()
            .map(|item| {
                let item = item.filed_into(&new);
                (item.path().to_path_buf(), item)
            })
            .collect();
        self.groups.insert(new.clone(), group);

        for group in self.groups.values_mut() {
            if group.parent.as_deref() == Some(old) {
                group.parent = Some(new.clone());
            }
        }
        if self.active_group.as_deref() == Some(old) {
            self.active_group = Some(new);
        }
        self.rebuild_sub_groups();
        Ok(())
    }

    /// Deletes `name` and every group beneath it, returning the deleted names
    /// (descendants first). With `MoveFilesToDefault` the files of every
    /// deleted group are re-filed into the default group first.
    pub fn delete_group(&mut self, name: &str, mode: DeleteMode) -> Result<Vec<String>, FavoritesError> {
        if name == DEFAULT_GROUP {
            return Err(FavoritesError::ProtectedGroup(name.to_string()));
        }
        if !self.groups.contains_key(name) {
            return Err(FavoritesError::UnknownGroup(name.to_string()));
        }

        let mut doomed = self.descendants(name);
        doomed.push(name.to_string());

        for victim in &doomed {
            let Some(group) = self.groups.remove(victim) else {
                continue;
            };
            if mode == DeleteMode::MoveFilesToDefault {
                if let Some(default) = self.groups.get_mut(DEFAULT_GROUP) {
                    for path in group.files.keys() {
                        default.insert(path);
                    }
                }
            }
        }

        if self
            .active_group
            .as_ref()
            .is_some_and(|active| doomed.contains(active))
        {
            self.active_group = None;
        }
        self.rebuild_sub_groups();
        Ok(doomed)
    }

    pub fn insert_file(&mut self, group: &str, path: &Path) -> Result<(), FavoritesError> {
        let target = self
            .groups
            .get_mut(group)
            .ok_or_else(|| FavoritesError::UnknownGroup(group.to_string()))?;
        target.insert(path);
        Ok(())
    }

    pub fn remove_file(&mut self, group: &str, path: &Path) -> bool {
        self.groups
            .get_mut(group)
            .map(|group| group.files.remove(path).is_some())
            .unwrap_or(false)
    }

    pub fn remove_item(&mut self, item: &FavoriteItem) -> bool {
        self.remove_file(item.group_or_default(), item.path())
    }

    /// Re-files `item` from its current group into `target`. Returns `false`
    /// when nothing changed: the source group is gone, no longer holds the
    /// item, or already is `target`.
    pub fn move_item(&mut self, item: &FavoriteItem, target: &str) -> Result<bool, FavoritesError> {
        if !self.groups.contains_key(target) {
            return Err(FavoritesError::UnknownGroup(target.to_string()));
        }
        let source = item.group_or_default();
        let held = self
            .groups
            .get(source)
            .is_some_and(|group| group.contains(item.path()));
        if !held || source == target {
            return Ok(false);
        }

        self.remove_file(source, item.path());
        self.insert_file(target, item.path())?;
        Ok(true)
    }

    /// Files a distinct copy of `item` into `target`, leaving the source alone.
    pub fn copy_item(&mut self, item: &FavoriteItem, target: &str) -> Result<bool, FavoritesError> {
        let group = self
            .groups
            .get_mut(target)
            .ok_or_else(|| FavoritesError::UnknownGroup(target.to_string()))?;
        if group.contains(item.path()) {
            return Ok(false);
        }
        group.insert(item.path());
        Ok(true)
    }

    pub fn set_active_group(&mut self, name: Option<&str>) -> Result<(), FavoritesError> {
        match name {
            Some(name) if !self.groups.contains_key(name) => {
                Err(FavoritesError::UnknownGroup(name.to_string()))
            }
            Some(name) => {
                self.active_group = Some(name.to_string());
                Ok(())
            }
            None => {
                self.active_group = None;
                Ok(())
            }
        }
    }

    pub fn clear_files(&mut self) {
        for group in self.groups.values_mut() {
            group.files.clear();
        }
    }

    fn sanitize(&mut self) {
        self.groups
            .entry(DEFAULT_GROUP.to_string())
            .or_insert_with(|| Group::new(DEFAULT_GROUP, None));

        for (key, group) in self.groups.iter_mut() {
            if &group.name != key {
                group.name = key.clone();
            }
            for item in group.files.values_mut() {
                if item.group() != Some(key.as_str()) {
                    *item = item.filed_into(key);
                }
            }
        }

        let names: BTreeSet<String> = self.groups.keys().cloned().collect();
        for group in self.groups.values_mut() {
            let dangling = group
                .parent
                .as_ref()
                .is_some_and(|parent| !names.contains(parent) || parent == &group.name);
            if group.is_default() || dangling {
                group.parent = None;
            }
        }

        for name in names.iter() {
            if self.parent_chain_has_cycle(name) {
                if let Some(group) = self.groups.get_mut(name) {
                    log::warn!("favorites: breaking parent cycle at group \"{name}\"");
                    group.parent = None;
                }
            }
        }

        if let Some(active) = self.active_group.as_deref() {
            if !self.groups.contains_key(active) {
                self.active_group = None;
            }
        }

        self.rebuild_sub_groups();
    }

    fn parent_chain_has_cycle(&self, start: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = Some(start);
        while let Some(name) = current {
            if !visited.insert(name) {
                return true;
            }
            current = self.groups.get(name).and_then(|g| g.parent.as_deref());
        }
        false
    }

    fn rebuild_sub_groups(&mut self) {
        let links: Vec<(String, String)> = self
            .groups
            .values()
            .filter_map(|group| {
                group
                    .parent
                    .as_ref()
                    .map(|parent| (parent.clone(), group.name.clone()))
            })
            .collect();

        for group in self.groups.values_mut() {
            group.sub_groups.clear();
        }
        for (parent, child) in links {
            if let Some(parent_group) = self.groups.get_mut(&parent) {
                parent_group.sub_groups.insert(child);
            }
        }
    }

    /// Checks every structural invariant of the tree.
    pub fn is_consistent(&self) -> bool {
        let Some(default) = self.groups.get(DEFAULT_GROUP) else {
            return false;
        };
        if default.parent.is_some() {
            return false;
        }

        for (key, group) in &self.groups {
            if &group.name != key {
                return false;
            }
            for (path, item) in &group.files {
                if item.path() != path.as_path() || item.group() != Some(key.as_str()) {
                    return false;
                }
            }
            if let Some(parent) = group.parent.as_ref() {
                let linked = self
                    .groups
                    .get(parent)
                    .is_some_and(|p| p.sub_groups.contains(key));
                if !linked || self.parent_chain_has_cycle(key) {
                    return false;
                }
            }
            for child in &group.sub_groups {
                let back = self
                    .groups
                    .get(child)
                    .is_some_and(|c| c.parent.as_deref() == Some(key.as_str()));
                if !back {
                    return false;
                }
            }
        }

        self.active_group
            .as_deref()
            .is_none_or(|active| self.groups.contains_key(active))
    }
}

fn validate_name(raw: &str) -> Result<String, FavoritesError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FavoritesError::InvalidName(raw.to_string()));
    }
    Ok(name.to_string())
}
