// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tiered deployment stacks
//!
//! A network foundation, a data tier, a compute tier and an optional traffic
//! router, defined as typed resource templates and deployed in dependency
//! order through a declarative provisioning engine.
//!
//! # Layers
//!
//! - [`domain`] - validated value objects (hostnames, address plans, access rules)
//! - [`template`] - resource declarations, deferred values and typed handles
//! - [`stacks`] - the four stack constructors
//! - [`graph`] - stack-level DAG with ordering checks
//! - [`engine`] - provisioning contract and an in-memory engine
//! - [`deployer`] - operator surface with lifecycle tracking and events
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tiered_stacks::{DeploymentConfig, Deployer, InMemoryEngine, RecordingPublisher, StackProps};
//!
//! # async fn run() -> Result<(), tiered_stacks::DeployError> {
//! let mut deployer = Deployer::new(
//!     DeploymentConfig::default(),
//!     &StackProps::default(),
//!     Arc::new(InMemoryEngine::new()),
//!     Arc::new(RecordingPublisher::new()),
//! )?;
//! deployer.deploy_all().await?;
//! deployer.scale_service(2).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deployer;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod events;
pub mod graph;
pub mod lifecycle;
pub mod nats;
pub mod stacks;
pub mod subjects;
pub mod template;

// Re-export commonly used types
pub use config::{ComputeProps, DataProps, DeploymentConfig, NetworkProps, StackProps, TrafficProps};
pub use deployer::Deployer;
pub use engine::{ChangeAction, ChangeSet, EngineOptions, InMemoryEngine, ProvisioningEngine};
pub use errors::{DefinitionError, DeployError, DeployResult};
pub use events::DeploymentEvent;
pub use graph::DeploymentGraph;
pub use lifecycle::{StackCommand, StackStatus};
pub use nats::{EventPublisher, NatsConfig, NatsEventPublisher, RecordingPublisher};
pub use stacks::{define_all, ComputeTier, DataTier, DeploymentStacks, NetworkFoundation, TrafficRouter};
pub use template::{StackName, StackTemplate};
