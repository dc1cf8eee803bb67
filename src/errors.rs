// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for stack definition, provisioning and teardown

use thiserror::Error;

use crate::domain::{HostnameError, NetworkPlanError};
use crate::lifecycle::TransitionError;

/// Errors detected while a stack is being defined.
///
/// All of these are fatal and surface before any engine call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A generated resource name breaks the provider's naming rules
    #[error("Name '{name}' for {what} is invalid: {reason}")]
    InvalidName {
        what: &'static str,
        name: String,
        reason: String,
    },

    /// Address planning failed
    #[error("Network plan error: {0}")]
    Network(#[from] NetworkPlanError),

    /// Database engine does not run on the requested instance class
    #[error("Instance class {instance_class} is not supported by {engine}")]
    UnsupportedInstanceClass {
        engine: String,
        instance_class: String,
    },

    /// Health check definition is inconsistent
    #[error("Invalid health check: {0}")]
    InvalidHealthCheck(String),

    /// Container cpu/memory combination is not offered
    #[error("Invalid task size: {0}")]
    InvalidTaskSize(String),

    /// A tunable is outside the range the provider accepts
    #[error("Invalid {setting}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    /// Hostname value object rejected its input
    #[error("Invalid hostname: {0}")]
    Hostname(#[from] HostnameError),

    /// Two resources in one stack share a logical id
    #[error("Duplicate logical id '{logical_id}' in stack {stack}")]
    DuplicateLogicalId { stack: String, logical_id: String },

    /// A property references a resource not declared in the same stack
    #[error("Resource '{resource}' in stack {stack} references unknown resource '{target}'")]
    DanglingReference {
        stack: String,
        resource: String,
        target: String,
    },

    /// An export names a resource not declared in the stack
    #[error("Export '{export}' in stack {stack} references unknown resource '{target}'")]
    DanglingExport {
        stack: String,
        export: String,
        target: String,
    },

    /// A stack imports an export no registered stack provides
    #[error("Stack {stack} imports unknown export {export}")]
    UnknownExport { stack: String, export: String },

    /// A stack imports from a stack that is not earlier in dependency order
    #[error("Stack {stack} imports {export} from a stack that is not ordered before it")]
    ForwardReference { stack: String, export: String },

    /// Stacks import from each other in a cycle
    #[error("Circular dependency between stacks: {0:?}")]
    StackCycle(Vec<String>),

    /// Resources inside one stack reference each other in a cycle
    #[error("Circular reference between resources in stack {stack}: {resources:?}")]
    ResourceCycle { stack: String, resources: Vec<String> },

    /// Two stacks registered under one name
    #[error("Stack {0} is registered twice")]
    DuplicateStack(String),
}

/// Errors that can occur while planning, applying or tearing down stacks
#[derive(Debug, Error)]
pub enum DeployError {
    /// Definition-time error
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// The provider rejected a resource; the stack was rolled back
    #[error("Provisioning of {resource} in stack {stack} failed: {reason}")]
    ProvisioningFailed {
        stack: String,
        resource: String,
        reason: String,
    },

    /// New replicas never became healthy; the circuit breaker rolled back
    #[error("Deployment of service {service} in stack {stack} rolled back by circuit breaker")]
    RolledBack { stack: String, service: String },

    /// Teardown attempted while other stacks still import this stack's exports
    #[error("Stack {stack} is still referenced by {dependents:?}")]
    DependencyViolation {
        stack: String,
        dependents: Vec<String>,
    },

    /// Apply attempted before a producer stack was deployed
    #[error("Stack {stack} depends on {dependency}, which is not deployed")]
    DependencyNotDeployed { stack: String, dependency: String },

    /// Predicted identifiers would not match what the engine assigns
    #[error("Identifier format mismatch: stack uses v{expected}, engine uses v{actual}")]
    IdentifierFormatMismatch { expected: u32, actual: u32 },

    /// Stack is not known to the engine or the graph
    #[error("Unknown stack: {0}")]
    UnknownStack(String),

    /// Stack is deployed but has no resource with this logical id
    #[error("Stack {stack} has no resource {resource}")]
    UnknownResource { stack: String, resource: String },

    /// Operation needs a deployed stack
    #[error("Stack {0} is not deployed")]
    NotDeployed(String),

    /// Secret identifier is not known to the engine
    #[error("Unknown secret: {0}")]
    UnknownSecret(String),

    /// Lifecycle transition refused
    #[error("Lifecycle error: {0}")]
    Transition(#[from] TransitionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Event publishing error
    #[error("Publish error: {0}")]
    Publish(String),
}

/// Result type for deployment operations
pub type DeployResult<T> = Result<T, DeployError>;

impl From<serde_json::Error> for DeployError {
    fn from(err: serde_json::Error) -> Self {
        DeployError::Serialization(err.to_string())
    }
}

impl From<NetworkPlanError> for DeployError {
    fn from(err: NetworkPlanError) -> Self {
        DeployError::Definition(DefinitionError::Network(err))
    }
}

impl From<HostnameError> for DeployError {
    fn from(err: HostnameError) -> Self {
        DeployError::Definition(DefinitionError::Hostname(err))
    }
}
