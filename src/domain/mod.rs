// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Value objects with validation invariants shared by the stack
//! constructors. Everything here is pure; nothing talks to an engine.
//!
//! - [`Hostname`] - DNS hostnames, canonicalized to lowercase for the workload
//! - [`NetworkPlan`] - non-overlapping public/private subnets across zones
//! - [`naming`] - provider naming rules checked at definition time
//! - [`ServiceIdentifier`] - service identifier predicted before creation
//! - [`AccessRule`] / [`AccessGroupSpec`] - directional access control
//! - [`GeneratedSecretSpec`] / [`SecretValue`] - secret recipes and redacted values
//! - [`DatabaseEngine`] / [`InstanceClass`] / [`HealthCheck`] with [`invariants`]

pub mod access;
pub mod database;
pub mod hostname;
pub mod identifier;
pub mod invariants;
pub mod naming;
pub mod network;
pub mod secret;

pub use access::{AccessGroupSpec, AccessRule, Direction, Peer, PortRange, Protocol};
pub use database::{DatabaseEngine, InstanceClass};
pub use hostname::{Hostname, HostnameError};
pub use identifier::{IdentifierFormat, ServiceIdentifier, SERVICE_RESOURCE_TYPE};
pub use invariants::HealthCheck;
pub use network::{availability_zones, NetworkPlan, NetworkPlanError, SubnetPlan, SubnetTier};
pub use secret::{GeneratedSecretSpec, SecretValue};
