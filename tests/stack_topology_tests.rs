// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack topology tests
//!
//! Definition-time checks over the full staging/demo deployment: access
//! paths, handle wiring and the values injected into replicas. No engine
//! is involved.

mod fixtures;

use pretty_assertions::assert_eq;
use test_case::test_case;

use fixtures::*;
use tiered_stacks::domain::{Peer, Protocol};
use tiered_stacks::stacks::compute::{APP_GROUP, EDGE_GROUP, SERVICE, TASK_SPEC};
use tiered_stacks::stacks::data::{ACCESS_GROUP, DATABASE};
use tiered_stacks::template::{LogicalId, PropertyValue, ResourceKind};
use tiered_stacks::{define_all, DataProps, DeploymentGraph, StackProps, TrafficProps};

/// User Story: Application reachable only through its load balancer
///
/// As an operator
/// I want the application replicas reachable only from the load balancer
/// So that the public internet never talks to a replica directly
///
/// ```mermaid
/// graph LR
///     Internet -->|tcp 80| Edge[edge group]
///     Edge -->|tcp 4000| App[app group]
///     App -->|tcp 5432| DB[database group]
/// ```
#[test]
fn test_application_access_paths() {
    // Given the staging/demo deployment
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let compute = stacks.compute();
    let app = compute.app_group();

    // Then the service port is admitted only from the edge group
    let service_port_sources: Vec<&Peer> = app
        .inbound()
        .filter(|r| r.protocol == Protocol::Tcp && r.covers(Protocol::Tcp, 4000))
        .map(|r| &r.peer)
        .collect();
    assert_eq!(
        service_port_sources,
        vec![&Peer::Group(LogicalId::from(EDGE_GROUP))]
    );

    // And no inbound rule reaches the public internet
    assert!(app.inbound().all(|r| !r.peer.is_public()));

    // And outbound 5432 goes only to the database handle
    let database_paths: Vec<&Peer> = app
        .outbound()
        .filter(|r| r.covers(Protocol::Tcp, 5432))
        .map(|r| &r.peer)
        .collect();
    assert_eq!(
        database_paths,
        vec![&Peer::Resource(stacks.data().database().access_group().clone())]
    );
}

/// Sibling replicas reach each other on every port but the database port
#[test]
fn test_sibling_traffic_excludes_database_port() {
    // Given the staging/demo deployment
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let app = stacks.compute().app_group();
    let sibling = |protocol: Protocol, port: u16| {
        app.outbound()
            .any(|r| r.peer == Peer::SameGroup && r.covers(protocol, port))
    };

    // Then replicas talk to each other on other ports and over UDP
    assert!(sibling(Protocol::Tcp, 4000));
    assert!(sibling(Protocol::Tcp, 5431));
    assert!(sibling(Protocol::Tcp, 5433));
    assert!(sibling(Protocol::Udp, 5432));

    // But never on the database port over TCP
    assert!(!sibling(Protocol::Tcp, 5432));
}

#[test]
fn test_edge_group_is_the_only_public_entry() {
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let edge = stacks.compute().edge_group();

    let public: Vec<_> = edge.inbound().filter(|r| r.peer.is_public()).collect();
    assert_eq!(public.len(), 1);
    assert!(public[0].covers(Protocol::Tcp, 80));
    assert!(!public[0].covers(Protocol::Tcp, 4000));

    assert!(edge
        .outbound()
        .any(|r| r.peer == Peer::Group(LogicalId::from(APP_GROUP)) && r.covers(Protocol::Tcp, 4000)));
}

/// The database group is created empty and never gains a rule
#[test]
fn test_database_group_never_references_compute() {
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let data = stacks.data().template();

    assert!(stacks.data().access_group().rules.is_empty());
    let group = data.resource(ACCESS_GROUP).unwrap();
    assert_eq!(group.property("ingress"), Some(&PropertyValue::List(vec![])));
    assert_eq!(group.property("egress"), Some(&PropertyValue::List(vec![])));

    // Nothing in the data tier imports from the compute tier
    assert!(data.imports().iter().all(|i| i.stack.as_str() == NETWORK_STACK));
}

#[test]
fn test_group_to_group_rules_are_separate_resources() {
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let template = stacks.compute().template();

    assert_eq!(template.resources_of(ResourceKind::AccessGroupRule).count(), 2);
    for id in [EDGE_GROUP, APP_GROUP] {
        let group = template.resource(id).unwrap();
        assert!(group
            .references()
            .iter()
            .all(|r| r.as_str() != EDGE_GROUP && r.as_str() != APP_GROUP));
    }
    // Waves still resolve: the two groups come before both rules
    assert!(template.creation_waves().is_ok());
}

#[test]
fn test_replicas_receive_predicted_identifier_and_lowercase_host() {
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let compute = stacks.compute();
    let environment = compute
        .template()
        .resource(TASK_SPEC)
        .and_then(|t| t.property("container"))
        .and_then(|c| c.get("environment"))
        .cloned()
        .unwrap();

    assert_eq!(
        compute.service_identifier().to_string(),
        "compute/service/demo-staging/demo-staging-web"
    );
    assert_eq!(
        environment.get("SERVICE_IDENTIFIER").and_then(PropertyValue::as_str),
        Some("compute/service/demo-staging/demo-staging-web")
    );
    assert!(matches!(
        environment.get("PUBLIC_HOST"),
        Some(PropertyValue::Lowercase(_))
    ));
}

#[test]
fn test_desired_count_defaults_to_zero() {
    let stacks = define_all(&staging_config(), &StackProps::default()).unwrap();
    let service = stacks.compute().template().resource(SERVICE).unwrap();
    assert_eq!(
        service.property("desired_count").and_then(PropertyValue::as_int),
        Some(0)
    );
}

#[test_case(None, 3 ; "without traffic router")]
#[test_case(Some(TrafficProps::default()), 4 ; "with traffic router")]
fn test_graph_imports_only_from_earlier_stacks(traffic: Option<TrafficProps>, expected: usize) {
    let stacks = define_all(
        &staging_config(),
        &StackProps::default().with_traffic_router(traffic),
    )
    .unwrap();
    let graph = DeploymentGraph::from_stacks(&stacks).unwrap();
    assert_eq!(graph.order().len(), expected);

    for (index, name) in graph.order().iter().enumerate() {
        for dependency in graph.dependencies(name) {
            let position = graph.order().iter().position(|n| *n == dependency).unwrap();
            assert!(position < index, "{} imports from {}", name, dependency);
        }
    }
}

#[test]
fn test_database_port_follows_engine() {
    let stacks = define_all(
        &staging_config(),
        &StackProps::default().with_data(DataProps::default().with_port(6543)),
    )
    .unwrap();
    assert_eq!(stacks.data().database().port(), 6543);
    assert_eq!(
        stacks
            .data()
            .template()
            .resource(DATABASE)
            .and_then(|d| d.property("port"))
            .and_then(PropertyValue::as_int),
        Some(6543)
    );
    assert!(stacks
        .compute()
        .app_group()
        .outbound()
        .any(|r| matches!(r.peer, Peer::Resource(_)) && r.covers(Protocol::Tcp, 6543)));
}
