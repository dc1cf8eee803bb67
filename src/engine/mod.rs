// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Engine Abstraction
//!
//! The engine turns stack templates into real resources. It is an external
//! collaborator; this crate only relies on the contract below.
//!
//! # Contract
//!
//! 1. **Idempotent**: applying an unchanged template yields only `NoChange`
//! 2. **Transactional**: a failed apply leaves the stack as it was
//! 3. **Ordered**: resources are created wave by wave along references
//! 4. **Guarded teardown**: a stack whose exports are imported by another
//!    deployed stack is not destroyed
//! 5. **Versioned identifiers**: the engine reports the service identifier
//!    format it assigns with
//!
//! [`InMemoryEngine`] implements the contract without a provider.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::{IdentifierFormat, SecretValue};
use crate::errors::DeployResult;
use crate::template::{StackName, StackTemplate};

pub mod changes;
pub mod memory;

pub use changes::{ChangeAction, ChangeSet, ChangeSummary, ResourceChange};
pub use memory::{EngineOptions, InMemoryEngine};

/// Declarative provisioning engine
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Service identifier format this engine assigns
    fn identifier_format(&self) -> IdentifierFormat;

    /// Compute the changes `apply` would make, without making them
    async fn plan(&self, template: &StackTemplate) -> DeployResult<ChangeSet>;

    /// Converge a stack onto `template`
    ///
    /// # Errors
    ///
    /// - `DependencyNotDeployed` if an imported stack is not deployed
    /// - `ProvisioningFailed` if a resource is rejected; nothing is committed
    /// - `RolledBack` if new replicas never turn healthy
    async fn apply(&self, template: &StackTemplate) -> DeployResult<ChangeSet>;

    /// Delete every resource of a stack
    ///
    /// Destroying a stack that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// `DependencyViolation` if a deployed stack imports from this one.
    async fn destroy(&self, stack: &StackName) -> DeployResult<ChangeSet>;

    /// Resolved export values of a deployed stack
    async fn outputs(&self, stack: &StackName) -> DeployResult<BTreeMap<String, String>>;

    async fn is_deployed(&self, stack: &StackName) -> bool;

    /// Physical identifier of one resource of a deployed stack
    async fn physical_id(&self, stack: &StackName, logical_id: &str) -> DeployResult<String>;

    /// Overwrite the value of an existing secret
    async fn put_secret_value(&self, secret_id: &str, value: SecretValue) -> DeployResult<()>;
}
