// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for tiered-stacks
//!
//! Deterministic inputs shared by the integration suites: the
//! staging/demo configuration, a seeded in-memory engine with a fixed
//! mixed-case load balancer hostname, and a recording publisher.
#![allow(dead_code)]

use std::sync::Arc;

use tiered_stacks::engine::{EngineOptions, InMemoryEngine};
use tiered_stacks::{Deployer, DeploymentConfig, RecordingPublisher, StackName, StackProps};

/// Fixed engine seed
pub const SEED: u64 = 0x5eed;

/// Hostname the engine assigns to the load balancer, mixed case on purpose
pub const LOAD_BALANCER_HOSTNAME: &str = "DEMO-ABC123.example-region.provider.net";

pub const NETWORK_STACK: &str = "demo-staging-network";
pub const DATA_STACK: &str = "demo-staging-data";
pub const COMPUTE_STACK: &str = "demo-staging-compute";
pub const TRAFFIC_STACK: &str = "demo-staging-traffic";

pub fn staging_config() -> DeploymentConfig {
    DeploymentConfig::new("123456789012", "example-region", "staging", "demo")
        .expect("fixture config is valid")
}

pub fn engine() -> Arc<InMemoryEngine> {
    Arc::new(InMemoryEngine::with_options(
        EngineOptions::default()
            .with_region("example-region")
            .with_seed(SEED)
            .with_load_balancer_hostname(LOAD_BALANCER_HOSTNAME),
    ))
}

pub type TestDeployer = Deployer<InMemoryEngine, RecordingPublisher>;

/// Deployer over a fresh engine, returned with handles on both collaborators
pub fn deployer(
    props: &StackProps,
) -> (TestDeployer, Arc<InMemoryEngine>, Arc<RecordingPublisher>) {
    let engine = engine();
    let publisher = Arc::new(RecordingPublisher::new());
    let deployer = Deployer::new(staging_config(), props, engine.clone(), publisher.clone())
        .expect("fixture stacks are valid");
    (deployer, engine, publisher)
}

/// Deployer for a later operator session against an engine that already
/// runs the deployment
pub async fn connected_deployer(
    props: &StackProps,
    engine: Arc<InMemoryEngine>,
) -> (TestDeployer, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::new());
    let deployer = Deployer::connect(staging_config(), props, engine, publisher.clone())
        .await
        .expect("fixture stacks are valid");
    (deployer, publisher)
}

pub fn stack(name: &str) -> StackName {
    StackName::from(name)
}
