// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Events
//!
//! One immutable record per stack operation. Events carry change counts and
//! lifecycle status only; resolved property values and secrets never appear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::ChangeSummary;
use crate::lifecycle::StackStatus;
use crate::subjects::{event_subject, Operation};
use crate::template::StackName;

/// Current schema version of [`DeploymentEvent`]
pub const EVENT_VERSION: u32 = 1;

/// A stack operation that has happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    /// Event version for schema evolution
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Groups the events of one operator request
    pub correlation_id: Uuid,

    /// Event that directly led to this one
    pub causation_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,

    pub stage: String,
    pub stack: StackName,
    pub operation: Operation,

    /// Lifecycle status after the operation
    pub status: StackStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSummary>,

    /// Error text for failed operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DeploymentEvent {
    pub fn new(
        stage: impl Into<String>,
        stack: StackName,
        operation: Operation,
        status: StackStatus,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_version: EVENT_VERSION,
            event_id: Uuid::now_v7(),
            correlation_id,
            causation_id: None,
            timestamp: Utc::now(),
            stage: stage.into(),
            stack,
            operation,
            status,
            changes: None,
            detail: None,
        }
    }

    pub fn with_changes(mut self, changes: ChangeSummary) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Chain this event after `parent`
    pub fn caused_by(mut self, parent: &DeploymentEvent) -> Self {
        self.causation_id = Some(parent.event_id);
        self.correlation_id = parent.correlation_id;
        self
    }

    /// NATS subject this event is published on
    pub fn subject(&self) -> String {
        event_subject(&self.stage, self.stack.as_str(), self.operation)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.operation,
            Operation::DeployFailed | Operation::TeardownFailed | Operation::RolledBack
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(operation: Operation) -> DeploymentEvent {
        DeploymentEvent::new(
            "staging",
            StackName::from("demo-staging-compute"),
            operation,
            StackStatus::Deployed,
            Uuid::now_v7(),
        )
    }

    #[test]
    fn test_subject_follows_hierarchy() {
        assert_eq!(
            event(Operation::Scaled).subject(),
            "deployment.staging.demo-staging-compute.scaled"
        );
    }

    #[test]
    fn test_causation_chain_shares_correlation() {
        let first = event(Operation::Deployed);
        let second = event(Operation::Scaled).caused_by(&first);
        assert_eq!(second.causation_id, Some(first.event_id));
        assert_eq!(second.correlation_id, first.correlation_id);
        assert_ne!(second.event_id, first.event_id);
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let json = serde_json::to_value(event(Operation::Deployed)).unwrap();
        assert!(json.get("changes").is_none());
        assert!(json.get("detail").is_none());
        assert_eq!(json["operation"], "deployed");
        assert_eq!(json["event_version"], 1);

        let failed = event(Operation::DeployFailed).with_detail("rejected");
        assert!(failed.is_failure());
        let back: DeploymentEvent =
            serde_json::from_str(&serde_json::to_string(&failed).unwrap()).unwrap();
        assert_eq!(back, failed);
    }
}
