// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change sets produced by apply and destroy

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::template::{LogicalId, ResourceKind, StackName};

/// What an apply does to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    /// Modified in place; physical identifier kept
    Update,
    /// Recreated under a new physical identifier
    Replace,
    Delete,
    NoChange,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Create => write!(f, "create"),
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Replace => write!(f, "replace"),
            ChangeAction::Delete => write!(f, "delete"),
            ChangeAction::NoChange => write!(f, "no-change"),
        }
    }
}

/// One resource's change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub logical_id: LogicalId,
    pub kind: ResourceKind,
    pub action: ChangeAction,
    /// Properties whose resolved value differs from the deployed one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_properties: Vec<String>,
}

/// Every resource change of one stack operation, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub stack: StackName,
    pub changes: Vec<ResourceChange>,
    /// Creation waves the engine executed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waves: Vec<Vec<LogicalId>>,
}

impl ChangeSet {
    pub fn new(stack: StackName) -> Self {
        Self {
            stack,
            changes: Vec::new(),
            waves: Vec::new(),
        }
    }

    /// True when nothing would be created, modified or deleted
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.action == ChangeAction::NoChange)
    }

    pub fn count(&self, action: ChangeAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    /// Changes other than `NoChange`
    pub fn effective(&self) -> impl Iterator<Item = &ResourceChange> {
        self.changes
            .iter()
            .filter(|c| c.action != ChangeAction::NoChange)
    }

    pub fn change(&self, logical_id: &str) -> Option<&ResourceChange> {
        self.changes
            .iter()
            .find(|c| c.logical_id.as_str() == logical_id)
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            created: self.count(ChangeAction::Create),
            updated: self.count(ChangeAction::Update),
            replaced: self.count(ChangeAction::Replace),
            deleted: self.count(ChangeAction::Delete),
            unchanged: self.count(ChangeAction::NoChange),
        }
    }
}

/// Per-action counts, for logs and events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub unchanged: usize,
}
