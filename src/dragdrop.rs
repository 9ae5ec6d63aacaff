use log::debug;

use crate::fs::FileKind;
use crate::model::{DEFAULT_GROUP, FavoriteItem};
use crate::tree::GroupTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Group(String),
    /// The unfiled root of the view, backed by the default group.
    Root,
}

impl DropTarget {
    pub fn group_name(&self) -> &str {
        match self {
            DropTarget::Group(name) => name,
            DropTarget::Root => DEFAULT_GROUP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSource {
    pub item: FavoriteItem,
    pub kind: FileKind,
}

impl DropSource {
    pub fn file(item: FavoriteItem) -> Self {
        Self {
            item,
            kind: FileKind::File,
        }
    }

    pub fn directory(item: FavoriteItem) -> Self {
        Self {
            item,
            kind: FileKind::Directory,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropOutcome {
    pub moved: usize,
    pub copied: usize,
    pub skipped: usize,
}

impl DropOutcome {
    pub fn changed(&self) -> bool {
        self.moved + self.copied > 0
    }
}

/// True when dropping `sources` on `target` could change the tree.
pub fn has_effect(tree: &GroupTree, sources: &[DropSource], target: &DropTarget) -> bool {
    tree.contains_group(target.group_name())
        && sources
            .iter()
            .any(|source| classify(tree, source, target, false) != Step::Skip)
}

/// Applies a whole drop batch. Sources that cannot be reconciled (directory
/// placeholders, items no longer in their group, unfiled items dropped on the
/// root) are skipped rather than failing the batch.
pub fn reconcile(
    tree: &mut GroupTree,
    sources: &[DropSource],
    target: &DropTarget,
    is_copy: bool,
) -> DropOutcome {
    let mut outcome = DropOutcome::default();
    let target_name = target.group_name();
    if !tree.contains_group(target_name) {
        debug!("favorites drop target \"{target_name}\" is gone; skipping batch");
        outcome.skipped = sources.len();
        return outcome;
    }

    for source in sources {
        match classify(tree, source, target, is_copy) {
            Step::Copy => match tree.copy_item(&source.item, target_name) {
                Ok(true) => outcome.copied += 1,
                _ => outcome.skipped += 1,
            },
            Step::Move => {
                tree.remove_item(&source.item);
                match tree.insert_file(target_name, source.item.path()) {
                    Ok(()) => outcome.moved += 1,
                    Err(_) => outcome.skipped += 1,
                }
            }
            Step::Skip => outcome.skipped += 1,
        }
    }
    outcome
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Move,
    Copy,
    Skip,
}

fn classify(tree: &GroupTree, source: &DropSource, target: &DropTarget, is_copy: bool) -> Step {
    if source.kind != FileKind::File {
        return Step::Skip;
    }

    let target_name = target.group_name();
    match (&source.item, target) {
        (FavoriteItem::Unfiled { .. }, DropTarget::Root) => Step::Skip,
        (FavoriteItem::Filed { group, path, .. }, _)
            if !tree.group(group).is_some_and(|g| g.contains(path)) =>
        {
            Step::Skip
        }
        (FavoriteItem::Filed { group, .. }, _) if group == target_name => Step::Skip,
        _ if is_copy => Step::Copy,
        _ => Step::Move,
    }
}
