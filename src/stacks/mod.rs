// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Constructors
//!
//! Each constructor takes the handles of the stacks it consumes and returns
//! its template together with the handles it exports:
//!
//! ```text
//! NetworkFoundation ──network──▶ DataTier ──database, credentials──▶ ComputeTier
//!         │                                                          ▲   │
//!         └──────────────────────────network─────────────────────────┘   │
//!                                                         load balancer  ▼
//!                                                                 TrafficRouter
//! ```
//!
//! A constructor cannot be called without the handles it needs, so the order
//! above is enforced by the type system before the graph checks it again.

pub mod compute;
pub mod data;
pub mod network;
pub mod traffic;

pub use compute::ComputeTier;
pub use data::DataTier;
pub use network::NetworkFoundation;
pub use traffic::TrafficRouter;

use crate::config::{DeploymentConfig, StackProps};
use crate::errors::DefinitionError;
use crate::template::StackTemplate;

/// Every stack of one deployment
#[derive(Debug, Clone)]
pub struct DeploymentStacks {
    network: NetworkFoundation,
    data: DataTier,
    compute: ComputeTier,
    traffic: Option<TrafficRouter>,
}

/// Define all stacks in dependency order
pub fn define_all(
    config: &DeploymentConfig,
    props: &StackProps,
) -> Result<DeploymentStacks, DefinitionError> {
    config.validate()?;
    let network = NetworkFoundation::define(config, &props.network)?;
    let data = DataTier::define(config, network.handle(), &props.data)?;
    let compute = ComputeTier::define(
        config,
        network.handle(),
        data.credentials(),
        data.database(),
        &props.compute,
    )?;
    let traffic = props
        .traffic
        .as_ref()
        .map(|traffic| TrafficRouter::define(config, compute.load_balancer(), traffic))
        .transpose()?;

    Ok(DeploymentStacks {
        network,
        data,
        compute,
        traffic,
    })
}

impl DeploymentStacks {
    pub fn network(&self) -> &NetworkFoundation {
        &self.network
    }

    pub fn data(&self) -> &DataTier {
        &self.data
    }

    pub fn compute(&self) -> &ComputeTier {
        &self.compute
    }

    pub fn traffic(&self) -> Option<&TrafficRouter> {
        self.traffic.as_ref()
    }

    /// Templates in definition order
    pub fn templates(&self) -> Vec<&StackTemplate> {
        let mut templates = vec![
            self.network.template(),
            self.data.template(),
            self.compute.template(),
        ];
        if let Some(traffic) = &self.traffic {
            templates.push(traffic.template());
        }
        templates
    }

    /// Replace the compute tier with a rescaled copy
    pub fn scale_compute(&mut self, desired_count: u32) {
        self.compute = self.compute.scaled(desired_count);
    }
}
