use std::collections::BTreeSet;

use crate::model::{DEFAULT_GROUP, FavoriteItem};
use crate::tree::GroupTree;

pub const PATH_SEPARATOR: &str = " > ";
pub const DEFAULT_GROUP_LABEL: &str = "(Default Group)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChoice {
    pub label: String,
    pub group: String,
}

/// Ancestor names joined root-first, e.g. `"Parent > Child"`. The walk stops
/// at the first repeated name, so a corrupt parent chain cannot loop.
pub fn full_path(tree: &GroupTree, name: &str) -> String {
    let mut segments = Vec::new();
    let mut visited = BTreeSet::new();
    let mut current = Some(name);

    while let Some(segment) = current {
        if !visited.insert(segment) {
            break;
        }
        segments.push(segment);
        current = tree.group(segment).and_then(|group| group.parent.as_deref());
    }

    segments.reverse();
    segments.join(PATH_SEPARATOR)
}

pub fn all_groups_with_paths(tree: &GroupTree) -> Vec<String> {
    group_choices(tree, None)
        .into_iter()
        .map(|choice| choice.label)
        .collect()
}

/// Destination list for move/copy pickers, without `exclude`.
pub fn group_choices(tree: &GroupTree, exclude: Option<&str>) -> Vec<GroupChoice> {
    let mut choices = Vec::with_capacity(tree.groups().len());
    if exclude != Some(DEFAULT_GROUP) {
        choices.push(GroupChoice {
            label: DEFAULT_GROUP_LABEL.to_string(),
            group: DEFAULT_GROUP.to_string(),
        });
    }

    for name in tree.groups().keys() {
        if name == DEFAULT_GROUP || exclude == Some(name.as_str()) {
            continue;
        }
        choices.push(GroupChoice {
            label: full_path(tree, name),
            group: name.clone(),
        });
    }
    choices
}

/// The group every item of a selection lives in, if they all share one.
pub fn shared_group<'a, I>(items: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a FavoriteItem>,
{
    let mut iter = items.into_iter();
    let first = iter.next()?.group_or_default();
    iter.all(|item| item.group_or_default() == first)
        .then_some(first)
}

pub fn resolve_choice(tree: &GroupTree, label: &str) -> Option<String> {
    let label = label.trim();
    if label == DEFAULT_GROUP_LABEL {
        return Some(DEFAULT_GROUP.to_string());
    }
    if tree.contains_group(label) {
        return Some(label.to_string());
    }

    let leaf = label.rsplit(PATH_SEPARATOR).next()?;
    tree.contains_group(leaf)
        .then(|| leaf.to_string())
        .filter(|name| full_path(tree, name) == label)
}
