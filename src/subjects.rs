// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for deployment events
//!
//! # Subject Pattern
//!
//! ```text
//! deployment.{stage}.{stack}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`deployment.staging.demo-staging-compute.scaled`)
//! - Stage-level wildcards (`deployment.staging.>`)
//! - Per-operation wildcards across stacks (`deployment.staging.*.rolled_back`)
//!
//! # Examples
//!
//! ```rust
//! use tiered_stacks::subjects::{SubjectBuilder, Operation};
//!
//! let subject = SubjectBuilder::new("staging")
//!     .stack("demo-staging-network")
//!     .operation(Operation::Deployed)
//!     .build()
//!     .unwrap();
//! assert_eq!(subject, "deployment.staging.demo-staging-network.deployed");
//!
//! let wildcard = SubjectBuilder::new("staging").build_wildcard();
//! assert_eq!(wildcard, "deployment.staging.>");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DeployError, DeployResult};

/// Root namespace for all deployment subjects
pub const DEPLOYMENT_ROOT: &str = "deployment";

/// Stack operations that publish an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A stack converged onto its template
    Deployed,
    /// A stack apply was rejected and nothing was committed
    DeployFailed,
    /// A stack was torn down
    TornDown,
    /// Teardown was refused or failed
    TeardownFailed,
    /// The service desired count changed
    Scaled,
    /// New replicas never turned healthy and the last definition was restored
    RolledBack,
    /// Placeholder credentials were written
    CredentialsPopulated,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deployed => write!(f, "deployed"),
            Operation::DeployFailed => write!(f, "deploy_failed"),
            Operation::TornDown => write!(f, "torn_down"),
            Operation::TeardownFailed => write!(f, "teardown_failed"),
            Operation::Scaled => write!(f, "scaled"),
            Operation::RolledBack => write!(f, "rolled_back"),
            Operation::CredentialsPopulated => write!(f, "credentials_populated"),
        }
    }
}

/// Builder for deployment NATS subjects
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    stage: String,
    stack: Option<String>,
    operation: Option<Operation>,
}

impl SubjectBuilder {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            stack: None,
            operation: None,
        }
    }

    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Build the complete subject string
    ///
    /// # Errors
    ///
    /// `Configuration` if the stack or the operation is not set.
    pub fn build(self) -> DeployResult<String> {
        let stack = self
            .stack
            .ok_or_else(|| DeployError::Configuration("subject stack must be set".to_string()))?;
        let operation = self.operation.ok_or_else(|| {
            DeployError::Configuration("subject operation must be set".to_string())
        })?;
        Ok(format!(
            "{}.{}.{}.{}",
            DEPLOYMENT_ROOT, self.stage, stack, operation
        ))
    }

    /// `deployment.{stage}.{stack}.>` when a stack is set, else `deployment.{stage}.>`
    pub fn build_wildcard(self) -> String {
        match self.stack {
            Some(stack) => format!("{}.{}.{}.>", DEPLOYMENT_ROOT, self.stage, stack),
            None => format!("{}.{}.>", DEPLOYMENT_ROOT, self.stage),
        }
    }

    /// `deployment.>`
    pub fn build_all() -> String {
        format!("{}.>", DEPLOYMENT_ROOT)
    }
}

/// Subject of one operation on one stack
pub fn event_subject(stage: &str, stack: &str, operation: Operation) -> String {
    format!("{}.{}.{}.{}", DEPLOYMENT_ROOT, stage, stack, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_subject_builder() {
        let subject = SubjectBuilder::new("staging")
            .stack("demo-staging-compute")
            .operation(Operation::Scaled)
            .build()
            .unwrap();

        assert_eq!(subject, "deployment.staging.demo-staging-compute.scaled");
        assert_eq!(
            subject,
            event_subject("staging", "demo-staging-compute", Operation::Scaled)
        );
    }

    #[test]
    fn test_incomplete_builder_is_an_error() {
        assert!(SubjectBuilder::new("staging").stack("x").build().is_err());
        assert!(SubjectBuilder::new("staging")
            .operation(Operation::Deployed)
            .build()
            .is_err());
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(SubjectBuilder::new("prod").build_wildcard(), "deployment.prod.>");
        assert_eq!(
            SubjectBuilder::new("prod").stack("a-prod-data").build_wildcard(),
            "deployment.prod.a-prod-data.>"
        );
        assert_eq!(SubjectBuilder::build_all(), "deployment.>");
    }

    #[test_case(Operation::Deployed, "deployed")]
    #[test_case(Operation::DeployFailed, "deploy_failed")]
    #[test_case(Operation::TornDown, "torn_down")]
    #[test_case(Operation::RolledBack, "rolled_back")]
    #[test_case(Operation::CredentialsPopulated, "credentials_populated")]
    fn test_operation_display_matches_serde(operation: Operation, expected: &str) {
        assert_eq!(operation.to_string(), expected);
        assert_eq!(
            serde_json::to_value(operation).unwrap(),
            serde_json::Value::String(expected.to_string())
        );
    }
}
