use std::collections::BTreeMap;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::Group;
use crate::tree::GroupTree;

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupRecord>,
    #[serde(default)]
    pub active_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub parent_group: Option<String>,
}

pub fn serialize(tree: &GroupTree) -> Document {
    let groups = tree
        .groups()
        .iter()
        .map(|(name, group)| {
            let record = GroupRecord {
                files: group
                    .files
                    .keys()
                    .map(|path| path.to_string_lossy().into_owned())
                    .collect(),
                parent_group: group.parent.clone(),
            };
            (name.clone(), record)
        })
        .collect();

    Document {
        version: DOCUMENT_VERSION,
        groups,
        active_group: tree.active_group().map(|s| s.to_string()),
    }
}

/// Rebuilds the tree from a document. Display names are recomputed from the
/// paths and the sub-group index from the `parentGroup` back-references.
pub fn deserialize(document: Document) -> GroupTree {
    if document.version > DOCUMENT_VERSION {
        warn!(
            "favorites document version {} is newer than {}; reading what we understand",
            document.version, DOCUMENT_VERSION
        );
    }

    let groups = document
        .groups
        .into_iter()
        .map(|(name, record)| {
            let mut group = Group::new(name.clone(), record.parent_group);
            for file in record.files.iter().filter(|f| !f.trim().is_empty()) {
                group.insert(&PathBuf::from(file));
            }
            (name, group)
        })
        .collect();

    GroupTree::from_parts(groups, document.active_group)
}

pub fn encode(tree: &GroupTree) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serialize(tree))
}

/// Fails open: a missing or unreadable document yields a tree holding only
/// the default group.
pub fn decode(raw: Option<&str>) -> GroupTree {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return GroupTree::new();
    };

    match serde_json::from_str::<Document>(raw) {
        Ok(document) => deserialize(document),
        Err(err) => {
            warn!("favorites document is corrupt, starting empty: {err}");
            GroupTree::new()
        }
    }
}
