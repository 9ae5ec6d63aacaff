use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::FavoritesError;
use crate::model::Group;
use crate::tree::GroupTree;

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddFavorite,
    AddToGroup,
    RemoveFavorite,
    RemoveFromGroup,
    CreateGroup,
    RenameGroup,
    DeleteGroup,
    MoveItem,
    CopyItem,
    SetActiveGroup,
    RemoveAll,
    DragDrop,
    Import,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AddFavorite => "add",
            Operation::AddToGroup => "addToGroup",
            Operation::RemoveFavorite => "remove",
            Operation::RemoveFromGroup => "removeFromGroup",
            Operation::CreateGroup => "createGroup",
            Operation::RenameGroup => "renameGroup",
            Operation::DeleteGroup => "deleteGroup",
            Operation::MoveItem => "moveToGroup",
            Operation::CopyItem => "copyToGroup",
            Operation::SetActiveGroup => "setActiveGroup",
            Operation::RemoveAll => "removeAll",
            Operation::DragDrop => "dragDrop",
            Operation::Import => "import",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full copy of the group tree taken before a mutation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub operation: Operation,
    pub data: Value,
    pub groups: BTreeMap<String, Group>,
    pub active_group: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(operation: Operation, data: Value, tree: &GroupTree) -> Self {
        let (groups, active_group) = tree.clone().into_parts();
        Self {
            operation,
            data,
            groups,
            active_group,
            timestamp: Utc::now(),
        }
    }

    pub fn into_tree(self) -> GroupTree {
        GroupTree::from_parts(self.groups, self.active_group)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<Snapshot>,
    limit: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `snapshot`, evicting the oldest entries past the limit.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }


    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter().rev()
    }

    /// Pops the most recent snapshot and makes it the live state of `tree`.
    pub fn undo(&mut self, tree: &mut GroupTree) -> Result<Operation, FavoritesError> {
        let snapshot = self.entries.pop_back().ok_or(FavoritesError::EmptyHistory)?;
        let operation = snapshot.operation;
        *tree = snapshot.into_tree();
        Ok(operation)
    }
}
