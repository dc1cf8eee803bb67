// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed handles passed between stack constructors
//!
//! A handle bundles the export references one stack publishes for the next.
//! Handles can only be built by the constructor of the producing stack, so a
//! consumer can only reference a stack it was handed, which in turn was
//! defined before it.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use super::{ExportRef, PropertyValue, StackName};
use crate::domain::{DatabaseEngine, HealthCheck};

/// Network exported by the foundation stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHandle {
    network_id: ExportRef,
    block: Ipv4Network,
    public_subnets: Vec<ExportRef>,
    private_subnets: Vec<ExportRef>,
}

impl NetworkHandle {
    pub(crate) fn new(
        network_id: ExportRef,
        block: Ipv4Network,
        public_subnets: Vec<ExportRef>,
        private_subnets: Vec<ExportRef>,
    ) -> Self {
        Self {
            network_id,
            block,
            public_subnets,
            private_subnets,
        }
    }

    pub fn stack(&self) -> &StackName {
        &self.network_id.stack
    }

    pub fn network_id(&self) -> &ExportRef {
        &self.network_id
    }

    /// Address block; a definition-time literal, not a deferred value
    pub fn block(&self) -> Ipv4Network {
        self.block
    }

    pub fn public_subnets(&self) -> &[ExportRef] {
        &self.public_subnets
    }

    pub fn private_subnets(&self) -> &[ExportRef] {
        &self.private_subnets
    }

    pub(crate) fn network_value(&self) -> PropertyValue {
        PropertyValue::import(&self.network_id)
    }

    pub(crate) fn public_subnet_values(&self) -> PropertyValue {
        PropertyValue::list(self.public_subnets.iter().map(PropertyValue::import))
    }

    pub(crate) fn private_subnet_values(&self) -> PropertyValue {
        PropertyValue::list(self.private_subnets.iter().map(PropertyValue::import))
    }
}

/// Database exported by the data tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHandle {
    instance_id: ExportRef,
    endpoint: ExportRef,
    access_group: ExportRef,
    port: u16,
    engine: DatabaseEngine,
    database_name: String,
}

impl DatabaseHandle {
    pub(crate) fn new(
        instance_id: ExportRef,
        endpoint: ExportRef,
        access_group: ExportRef,
        port: u16,
        engine: DatabaseEngine,
        database_name: String,
    ) -> Self {
        Self {
            instance_id,
            endpoint,
            access_group,
            port,
            engine,
            database_name,
        }
    }

    pub fn stack(&self) -> &StackName {
        &self.instance_id.stack
    }

    pub fn instance_id(&self) -> &ExportRef {
        &self.instance_id
    }

    pub fn endpoint(&self) -> &ExportRef {
        &self.endpoint
    }

    /// Peer for access rules targeting the database
    pub fn access_group(&self) -> &ExportRef {
        &self.access_group
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

/// Identifier of the database credential secret; never its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    secret_id: ExportRef,
}

impl CredentialRef {
    pub(crate) fn new(secret_id: ExportRef) -> Self {
        Self { secret_id }
    }

    pub fn stack(&self) -> &StackName {
        &self.secret_id.stack
    }

    pub fn secret_id(&self) -> &ExportRef {
        &self.secret_id
    }
}

/// Load balancer exported by the compute tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerHandle {
    load_balancer_id: ExportRef,
    hostname: ExportRef,
    listener_port: u16,
    health_check: HealthCheck,
}

impl LoadBalancerHandle {
    pub(crate) fn new(
        load_balancer_id: ExportRef,
        hostname: ExportRef,
        listener_port: u16,
        health_check: HealthCheck,
    ) -> Self {
        Self {
            load_balancer_id,
            hostname,
            listener_port,
            health_check,
        }
    }

    pub fn stack(&self) -> &StackName {
        &self.load_balancer_id.stack
    }

    pub fn load_balancer_id(&self) -> &ExportRef {
        &self.load_balancer_id
    }

    /// Lowercased DNS name
    pub fn hostname(&self) -> &ExportRef {
        &self.hostname
    }

    pub fn listener_port(&self) -> u16 {
        self.listener_port
    }

    pub fn health_check(&self) -> &HealthCheck {
        &self.health_check
    }
}

/// Stable global hostname exported by the traffic router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHostname {
    hostname: ExportRef,
}

impl PublicHostname {
    pub(crate) fn new(hostname: ExportRef) -> Self {
        Self { hostname }
    }

    pub fn stack(&self) -> &StackName {
        &self.hostname.stack
    }

    pub fn hostname(&self) -> &ExportRef {
        &self.hostname
    }
}
