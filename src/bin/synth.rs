// Copyright (c) 2025 - Cowboy AI, Inc.
//! Template Synthesizer
//!
//! Defines every stack from the environment and prints the templates in
//! dependency order as one JSON document on stdout.
//!
//! Run with: cargo run --bin synth
//!
//! Environment:
//! - `DEPLOY_ACCOUNT`, `DEPLOY_REGION`, `DEPLOY_STAGE`, `APP_NAME` - naming inputs
//! - `TRAFFIC_ROUTER=1` - include the optional traffic router stack
//! - `DESIRED_COUNT` - service replica count (default 0)
//! - `RUST_LOG` - log filter; logs go to stderr

use anyhow::{Context, Result};
use serde_json::json;
use tiered_stacks::{
    define_all, ComputeProps, DeploymentConfig, DeploymentGraph, StackProps, TrafficProps,
};
use tracing::info;

fn props_from_env() -> Result<StackProps> {
    let traffic = matches!(
        std::env::var("TRAFFIC_ROUTER").as_deref(),
        Ok("1") | Ok("true")
    );
    let desired_count = match std::env::var("DESIRED_COUNT") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("DESIRED_COUNT must be a number, got {:?}", value))?,
        Err(_) => 0,
    };

    Ok(StackProps::default()
        .with_compute(ComputeProps::default().with_desired_count(desired_count))
        .with_traffic_router(traffic.then(TrafficProps::default)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = DeploymentConfig::from_env().context("Failed to load deployment config")?;
    let props = props_from_env()?;
    info!(prefix = %config.prefix(), region = %config.region, "Synthesizing stacks");

    let stacks = define_all(&config, &props).context("Stack definition rejected")?;
    let graph = DeploymentGraph::from_stacks(&stacks).context("Deployment graph rejected")?;

    let document = json!({
        "config": config,
        "order": graph.order(),
        "service_identifier": stacks.compute().service_identifier().to_string(),
        "stacks": graph.templates().collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&document)?);

    info!(stacks = graph.order().len(), "Synthesis complete");
    Ok(())
}
