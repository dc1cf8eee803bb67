// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Lifecycle State Machine
//!
//! # States
//!
//! - Planned: template defined, nothing applied yet
//! - Deployed: last apply committed
//! - Failed: an apply was rejected and nothing healthy exists
//! - Destroyed: torn down
//!
//! # Inputs
//!
//! - Apply: an apply committed (first deploy, update, or no-op re-apply)
//! - Fail: an apply was rejected by the engine
//! - RollBack: the circuit breaker restored the previous definition
//! - Destroy: teardown completed
//!
//! A failed apply against a deployed stack leaves it deployed; the engine
//! never commits partial changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Lifecycle state of one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackStatus {
    Planned,
    Deployed,
    Failed,
    Destroyed,
}

impl StackStatus {
    /// Whether the stack's resources currently exist
    pub fn is_live(&self) -> bool {
        matches!(self, StackStatus::Deployed)
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackStatus::Planned => write!(f, "planned"),
            StackStatus::Deployed => write!(f, "deployed"),
            StackStatus::Failed => write!(f, "failed"),
            StackStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackCommand {
    Apply,
    Fail,
    RollBack,
    Destroy,
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionOutput {
    pub warnings: Vec<String>,
    pub is_critical: bool,
}

impl TransitionOutput {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: false,
        }
    }

    pub fn critical(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: true,
        }
    }
}

impl StateMachine for StackStatus {
    type Input = StackCommand;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use StackCommand::*;
        use StackStatus::*;

        match (self, input) {
            (Planned | Failed | Destroyed, Apply) => Ok((Deployed, TransitionOutput::ok())),
            (Deployed, Apply) => Ok((Deployed, TransitionOutput::ok())),

            (Planned | Failed | Destroyed, Fail) => Ok((
                Failed,
                TransitionOutput::critical(vec!["Provisioning failed".to_string()]),
            )),
            (Deployed, Fail) => Ok((
                Deployed,
                TransitionOutput::with_warnings(vec![
                    "Update rejected, previous state kept".to_string()
                ]),
            )),

            (Deployed, RollBack) => Ok((
                Deployed,
                TransitionOutput::critical(vec![
                    "Circuit breaker restored previous definition".to_string()
                ]),
            )),
            (Planned | Failed | Destroyed, RollBack) => Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                to: "deployed (via rollback)".to_string(),
            }),

            (Deployed | Failed, Destroy) => Ok((Destroyed, TransitionOutput::ok())),
            (Planned, Destroy) => Ok((
                Destroyed,
                TransitionOutput::with_warnings(vec![
                    "Destroying a stack that was never deployed".to_string()
                ]),
            )),
            (Destroyed, Destroy) => Ok((Destroyed, TransitionOutput::ok())),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use StackCommand::*;

        match self {
            StackStatus::Deployed => vec![Apply, Fail, RollBack, Destroy],
            _ => vec![Apply, Fail, Destroy],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_apply_deploys() {
        let (state, output) = StackStatus::Planned
            .transition(&StackCommand::Apply)
            .expect("Transition should succeed");
        assert_eq!(state, StackStatus::Deployed);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_failed_update_keeps_deployed() {
        let (state, output) = StackStatus::Deployed
            .transition(&StackCommand::Fail)
            .unwrap();
        assert_eq!(state, StackStatus::Deployed);
        assert!(!output.is_critical);

        let (state, output) = StackStatus::Planned.transition(&StackCommand::Fail).unwrap();
        assert_eq!(state, StackStatus::Failed);
        assert!(output.is_critical);
    }

    #[test]
    fn test_rollback_needs_previous_definition() {
        assert!(StackStatus::Deployed.can_transition(&StackCommand::RollBack));
        assert!(matches!(
            StackStatus::Planned.transition(&StackCommand::RollBack),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (state, _) = StackStatus::Destroyed
            .transition(&StackCommand::Destroy)
            .unwrap();
        assert_eq!(state, StackStatus::Destroyed);
        assert!(!state.is_live());
    }

    #[test]
    fn test_valid_inputs() {
        assert!(StackStatus::Deployed
            .valid_inputs()
            .contains(&StackCommand::RollBack));
        for state in [StackStatus::Planned, StackStatus::Failed, StackStatus::Destroyed] {
            assert!(!state.valid_inputs().contains(&StackCommand::RollBack));
            for input in state.valid_inputs() {
                assert!(state.can_transition(&input));
            }
        }
    }
}
