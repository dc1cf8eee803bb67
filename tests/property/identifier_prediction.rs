// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Service Identifier Prediction
//!
//! The identifier injected into replicas at definition time must equal the
//! one the engine assigns once the service exists, for every name pair the
//! naming rules accept.

use std::sync::Arc;

use proptest::prelude::*;
use tiered_stacks::domain::ServiceIdentifier;
use tiered_stacks::engine::{EngineOptions, InMemoryEngine, ProvisioningEngine};
use tiered_stacks::template::{PropertyValue, ResourceDecl, ResourceKind, StackName, StackTemplate};
use tiered_stacks::{Deployer, DeploymentConfig, RecordingPublisher, StackProps};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Names accepted for clusters and services
fn compute_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,48}"
}

/// Stage and application labels short enough for every derived name
fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}"
}

/// Minimal stack holding one cluster and one service
fn service_stack(cluster: &str, service: &str) -> StackTemplate {
    let mut template = StackTemplate::new(StackName::from("prop-compute"), "identifier check");
    let cluster_id = template.add(
        ResourceDecl::new("Cluster", ResourceKind::Cluster).with("cluster_name", cluster),
    );
    let service_id = template.add(
        ResourceDecl::new("Service", ResourceKind::Service)
            .with("cluster", PropertyValue::reference(&cluster_id))
            .with("service_name", service)
            .with("launch_type", "serverless")
            .with("desired_count", 0u32),
    );
    template.export("ServiceId", PropertyValue::reference(&service_id), "id");
    template
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Prediction equals assignment
    ///
    /// For any valid cluster/service pair, the predicted identifier is the
    /// physical identifier the engine gives the service.
    #[test]
    fn prop_predicted_identifier_matches_engine(
        cluster in compute_name(),
        service in compute_name(),
    ) {
        let predicted = ServiceIdentifier::predict(cluster.as_str(), service.as_str()).unwrap();
        let engine = InMemoryEngine::with_options(EngineOptions::default().with_seed(1));

        let assigned = tokio_test::block_on(async {
            engine.apply(&service_stack(&cluster, &service)).await.unwrap();
            engine
                .physical_id(&StackName::from("prop-compute"), "Service")
                .await
                .unwrap()
        });

        prop_assert_eq!(predicted.to_string(), assigned);
    }

    /// Property: Identifiers parse back to their names
    #[test]
    fn prop_identifier_parses_back(cluster in compute_name(), service in compute_name()) {
        let predicted = ServiceIdentifier::predict(cluster.as_str(), service.as_str()).unwrap();
        let parsed = ServiceIdentifier::parse(&predicted.to_string());

        prop_assert_eq!(parsed, Some(predicted));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: A full deployment exports the identifier its replicas were given
    #[test]
    fn prop_deployed_service_matches_injected_identifier(stage in label(), app in label()) {
        let config = DeploymentConfig::new("123456789012", "example-region", stage, app).unwrap();
        let mut deployer = Deployer::new(
            config,
            &StackProps::default(),
            Arc::new(InMemoryEngine::with_options(EngineOptions::default().with_seed(9))),
            Arc::new(RecordingPublisher::new()),
        )
        .unwrap();

        let injected = deployer.stacks().compute().service_identifier().to_string();
        let compute = deployer.stacks().compute().template().name.clone();
        let exported = tokio_test::block_on(async {
            deployer.deploy_all().await.unwrap();
            deployer.outputs(&compute).await.unwrap()
        });

        prop_assert_eq!(exported.get("ServiceId"), Some(&injected));
    }
}
