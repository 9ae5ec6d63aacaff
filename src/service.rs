use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, unbounded};
use globset::GlobSet;
use log::{debug, error, info, warn};
use serde_json::{Value, json};

use crate::codec;
use crate::config::FavoritesConfig;
use crate::dragdrop::{self, DropOutcome, DropSource, DropTarget};
use crate::error::FavoritesError;
use crate::export::{self, ExportReport};
use crate::fs::{FileKind, FileSystem, OsFileSystem};
use crate::history::{HistoryLog, Operation, Snapshot};
use crate::import::{self, ImportReport};
use crate::model::{DEFAULT_GROUP, FavoriteItem, Group};
use crate::path::{self, GroupChoice};
use crate::scanner;
use crate::storage::DocumentStore;
use crate::tree::{DeleteMode, GroupTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Something in the store changed; views should refresh everything.
    DataChanged,
    /// The in-memory state is newer than the persisted document.
    PersistenceFailed { message: String },
}

/// Owns the one live favorites store of a session and routes every host
/// command through snapshot, mutate, persist and notify.
pub struct FavoritesService {
    tree: GroupTree,
    history: HistoryLog,
    documents: Box<dyn DocumentStore>,
    filesystem: Box<dyn FileSystem>,
    config: FavoritesConfig,
    excludes: Option<GlobSet>,
    subscribers: Vec<Sender<ServiceEvent>>,
    last_persistence_error: Option<String>,
}

impl FavoritesService {
    pub fn open<D>(documents: D, config: FavoritesConfig) -> Result<Self, FavoritesError>
    where
        D: DocumentStore + 'static,
    {
        let excludes = scanner::compile_excludes(&config.exclude_patterns)?;
        let raw = match documents.load(&config.document_key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "favorites document \"{}\" could not be read, starting empty: {err}",
                    config.document_key
                );
                None
            }
        };
        let tree = codec::decode(raw.as_deref());
        debug!(
            "favorites loaded key={} groups={} items={}",
            config.document_key,
            tree.groups().len(),
            tree.item_count()
        );

        Ok(Self {
            tree,
            history: HistoryLog::with_limit(config.history_limit),
            documents: Box::new(documents),
            filesystem: Box::new(OsFileSystem),
            config,
            excludes,
            subscribers: Vec::new(),
            last_persistence_error: None,
        })
    }

    pub fn with_filesystem<F>(mut self, filesystem: F) -> Self
    where
        F: FileSystem + 'static,
    {
        self.filesystem = Box::new(filesystem);
        self
    }

    pub fn subscribe(&mut self) -> Receiver<ServiceEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    pub fn config(&self) -> &FavoritesConfig {
        &self.config
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.tree.group(name)
    }

    pub fn items(&self, group: &str) -> Vec<FavoriteItem> {
        self.tree
            .group(group)
            .map(|group| group.items().cloned().collect())
            .unwrap_or_default()
    }

    pub fn active_group(&self) -> Option<&str> {
        self.tree.active_group()
    }

    pub fn full_path(&self, group: &str) -> String {
        path::full_path(&self.tree, group)
    }

    pub fn all_groups_with_paths(&self) -> Vec<String> {
        path::all_groups_with_paths(&self.tree)
    }

    /// Move/copy destinations for a selection. The selection's own group is
    /// left out when every selected item shares it.
    pub fn move_targets(&self, items: &[FavoriteItem]) -> Vec<GroupChoice> {
        path::group_choices(&self.tree, path::shared_group(items))
    }

    pub fn resolve_target(&self, label: &str) -> Result<String, FavoritesError> {
        path::resolve_choice(&self.tree, label)
            .ok_or_else(|| FavoritesError::UnknownGroup(label.to_string()))
    }

    pub fn history(&self) -> impl Iterator<Item = &Snapshot> {
        self.history.entries()
    }

    pub fn history_limit(&self) -> usize {
        self.history.limit()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    pub fn create_group(&mut self, name: &str, parent: Option<&str>) -> Result<(), FavoritesError> {
        let data = json!({ "name": name, "parent": parent });
        self.mutate(Operation::CreateGroup, data, |tree, _| {
            tree.create_group(name, parent)
        })
    }

    pub fn create_sub_group(&mut self, parent: &str, name: &str) -> Result<(), FavoritesError> {
        self.create_group(name, Some(parent))
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), FavoritesError> {
        let data = json!({ "from": old, "to": new });
        self.mutate(Operation::RenameGroup, data, |tree, _| tree.rename_group(old, new))
    }

    pub fn delete_group(&mut self, name: &str, mode: DeleteMode) -> Result<Vec<String>, FavoritesError> {
        let data = json!({
            "name": name,
            "moveFilesToDefault": mode == DeleteMode::MoveFilesToDefault,
        });
        self.mutate(Operation::DeleteGroup, data, |tree, _| tree.delete_group(name, mode))
    }

    /// Files `path` into the active group (or the default group). Directories
    /// contribute every non-hidden file beneath them.
    pub fn add_favorite(&mut self, path: &Path) -> Result<usize, FavoritesError> {
        self.add_favorites(&[path.to_path_buf()])
    }

    pub fn add_favorites(&mut self, paths: &[PathBuf]) -> Result<usize, FavoritesError> {
        let group = self.tree.target_group().to_string();
        let files = self.expand_paths(paths);
        let data = json!({ "paths": path_strings(paths), "group": group });
        self.mutate(Operation::AddFavorite, data, |tree, _| {
            insert_all(tree, &group, &files)
        })
    }

    /// Files `paths` into `group`, creating it as a top-level group first when
    /// no group of that name exists.
    pub fn add_to_group(&mut self, paths: &[PathBuf], group: &str) -> Result<usize, FavoritesError> {
        let group = group.trim();
        if group.is_empty() {
            return Err(FavoritesError::InvalidName(group.to_string()));
        }
        let files = self.expand_paths(paths);
        let data = json!({ "paths": path_strings(paths), "group": group });
        self.mutate(Operation::AddToGroup, data, |tree, _| {
            if !tree.contains_group(group) {
                tree.create_group(group, None)?;
            }
            insert_all(tree, group, &files)
        })
    }

    pub fn remove_favorite(&mut self, item: &FavoriteItem) -> Result<usize, FavoritesError> {
        self.remove_favorites(std::slice::from_ref(item))
    }

    pub fn remove_favorites(&mut self, items: &[FavoriteItem]) -> Result<usize, FavoritesError> {
        let data = json!({ "paths": item_paths(items) });
        self.mutate(Operation::RemoveFavorite, data, |tree, _| {
            Ok(items.iter().filter(|item| tree.remove_item(item)).count())
        })
    }

    /// Takes items out of their named group and back into the default group.
    pub fn remove_from_group(&mut self, items: &[FavoriteItem]) -> Result<usize, FavoritesError> {
        let data = json!({ "paths": item_paths(items) });
        self.mutate(Operation::RemoveFromGroup, data, |tree, _| {
            move_all(tree, items, DEFAULT_GROUP)
        })
    }

    pub fn move_item(&mut self, item: &FavoriteItem, target: &str) -> Result<usize, FavoritesError> {
        self.move_items(std::slice::from_ref(item), target)
    }

    pub fn move_items(&mut self, items: &[FavoriteItem], target: &str) -> Result<usize, FavoritesError> {
        let data = json!({ "paths": item_paths(items), "target": target });
        self.mutate(Operation::MoveItem, data, |tree, _| move_all(tree, items, target))
    }

    pub fn copy_item(&mut self, item: &FavoriteItem, target: &str) -> Result<usize, FavoritesError> {
        self.copy_items(std::slice::from_ref(item), target)
    }

    pub fn copy_items(&mut self, items: &[FavoriteItem], target: &str) -> Result<usize, FavoritesError> {
        let data = json!({ "paths": item_paths(items), "target": target });
        self.mutate(Operation::CopyItem, data, |tree, _| {
            if !tree.contains_group(target) {
                return Err(FavoritesError::UnknownGroup(target.to_string()));
            }
            let mut copied = 0;
            for item in items {
                if tree.copy_item(item, target)? {
                    copied += 1;
                }
            }
            Ok(copied)
        })
    }

    pub fn set_active_group(&mut self, name: Option<&str>) -> Result<(), FavoritesError> {
        let data = json!({ "name": name });
        self.mutate(Operation::SetActiveGroup, data, |tree, _| tree.set_active_group(name))
    }

    pub fn remove_all(&mut self) -> Result<(), FavoritesError> {
        let data = json!({ "items": self.tree.item_count() });
        self.mutate(Operation::RemoveAll, data, |tree, _| {
            tree.clear_files();
            Ok(())
        })
    }

    /// Applies a whole drag-and-drop batch under one snapshot, one save and
    /// one refresh.
    pub fn drop_items(
        &mut self,
        sources: &[DropSource],
        target: &DropTarget,
        is_copy: bool,
    ) -> Result<DropOutcome, FavoritesError> {
        if !dragdrop::has_effect(&self.tree, sources, target) {
            debug!("favorites drop onto \"{}\" has no effect", target.group_name());
            return Ok(DropOutcome {
                skipped: sources.len(),
                ..DropOutcome::default()
            });
        }
        let data = json!({
            "paths": sources.iter().map(|s| s.item.path().display().to_string()).collect::<Vec<_>>(),
            "target": target.group_name(),
            "copy": is_copy,
        });
        self.mutate(Operation::DragDrop, data, |tree, _| {
            Ok(dragdrop::reconcile(tree, sources, target, is_copy))
        })
    }

    pub fn import_from_text(&mut self, group: &str, text: &str) -> Result<ImportReport, FavoritesError> {
        let data = json!({ "group": group });
        let report = self.mutate(Operation::Import, data, |tree, filesystem| {
            import::import_from_text(tree, filesystem, group, text)
        })?;
        info!("{}", report.message(group));
        Ok(report)
    }

    pub fn undo(&mut self) -> Result<Operation, FavoritesError> {
        let operation = self.history.undo(&mut self.tree)?;
        debug!("favorites undo operation={operation}");
        self.commit();
        Ok(operation)
    }

    pub fn export_items(
        &self,
        items: &[FavoriteItem],
        label: &str,
        dir: Option<&Path>,
    ) -> Result<ExportReport, FavoritesError> {
        let dir = self.export_dir(dir)?;
        let report = export::write_bundle(self.filesystem.as_ref(), items, label, &dir)?;
        info!("{}", report.message());
        Ok(report)
    }

    pub fn export_group(&self, group: &str, dir: Option<&Path>) -> Result<ExportReport, FavoritesError> {
        if !self.tree.contains_group(group) {
            return Err(FavoritesError::UnknownGroup(group.to_string()));
        }
        let items = self.items(group);
        let label = if group == DEFAULT_GROUP {
            group.to_string()
        } else {
            self.full_path(group)
        };
        self.export_items(&items, &label, dir)
    }

    /// Writes the current state to the document store, reporting the outcome.
    pub fn save(&mut self) -> Result<(), FavoritesError> {
        let encoded = codec::encode(&self.tree).map_err(crate::storage::StorageError::from)?;
        self.documents.save(&self.config.document_key, &encoded)?;
        self.last_persistence_error = None;
        Ok(())
    }

    fn export_dir(&self, dir: Option<&Path>) -> Result<PathBuf, FavoritesError> {
        if let Some(dir) = dir.or(self.config.export_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        std::env::current_dir().map_err(|source| FavoritesError::Io {
            path: PathBuf::from("."),
            source,
        })
    }

    fn expand_paths(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            match self.filesystem.kind(path) {
                Some(FileKind::File) => files.push(path.clone()),
                Some(FileKind::Directory) => {
                    files.extend(self.filesystem.list_files(path, self.excludes.as_ref()))
                }
                None => warn!("favorites: {} does not exist, skipping", path.display()),
            }
        }
        files
    }

    /// Runs `apply` against the live tree. A snapshot of the prior state is
    /// recorded only when `apply` succeeds and actually changed something; on
    /// failure the prior state is put back.
    fn mutate<T, F>(&mut self, operation: Operation, data: Value, apply: F) -> Result<T, FavoritesError>
    where
        F: FnOnce(&mut GroupTree, &dyn FileSystem) -> Result<T, FavoritesError>,
    {
        let snapshot = Snapshot::capture(operation, data, &self.tree);
        let value = match apply(&mut self.tree, self.filesystem.as_ref()) {
            Ok(value) => value,
            Err(err) => {
                debug!("favorites {operation} failed, restoring prior state: {err}");
                self.tree = snapshot.into_tree();
                return Err(err);
            }
        };

        let unchanged = &snapshot.groups == self.tree.groups()
            && snapshot.active_group.as_deref() == self.tree.active_group();
        if unchanged {
            debug!("favorites {operation} changed nothing");
            return Ok(value);
        }

        self.history.record(snapshot);
        self.commit();
        Ok(value)
    }

    fn commit(&mut self) {
        if let Err(err) = self.save() {
            let message = err.to_string();
            error!("favorites: {message}");
            self.last_persistence_error = Some(message.clone());
            self.notify(ServiceEvent::PersistenceFailed { message });
        }
        self.notify(ServiceEvent::DataChanged);
    }

    fn notify(&mut self, event: ServiceEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn insert_all(tree: &mut GroupTree, group: &str, files: &[PathBuf]) -> Result<usize, FavoritesError> {
    for file in files {
        tree.insert_file(group, file)?;
    }
    Ok(files.len())
}

fn move_all(tree: &mut GroupTree, items: &[FavoriteItem], target: &str) -> Result<usize, FavoritesError> {
    if !tree.contains_group(target) {
        return Err(FavoritesError::UnknownGroup(target.to_string()));
    }
    let mut moved = 0;
    for item in items {
        if tree.move_item(item, target)? {
            moved += 1;
        }
    }
    Ok(moved)
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

fn item_paths(items: &[FavoriteItem]) -> Vec<String> {
    items.iter().map(|i| i.path().display().to_string()).collect()
}
