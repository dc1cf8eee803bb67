// Copyright (c) 2025 - Cowboy AI, Inc.
//! Traffic router
//!
//! Optional global entry point: an accelerator with a stable hostname that
//! forwards to the load balancer as its single weighted endpoint. It only
//! reads the load balancer handle and never changes the compute tier.

use crate::config::{DeploymentConfig, TrafficProps};
use crate::domain::naming::{self, ACCELERATOR_NAME};
use crate::errors::DefinitionError;
use crate::template::{
    LoadBalancerHandle, PropertyValue, PublicHostname, ResourceDecl, ResourceKind, StackTemplate,
};

pub const ACCELERATOR: &str = "Accelerator";
pub const ACCELERATOR_LISTENER: &str = "AcceleratorListener";
pub const ENDPOINT_GROUP: &str = "EndpointGroup";

/// Defined traffic router stack
#[derive(Debug, Clone)]
pub struct TrafficRouter {
    template: StackTemplate,
    hostname: PublicHostname,
}

impl TrafficRouter {
    pub const TIER: &'static str = "traffic";

    pub fn define(
        config: &DeploymentConfig,
        load_balancer: &LoadBalancerHandle,
        props: &TrafficProps,
    ) -> Result<Self, DefinitionError> {
        let interval = props.health_check_interval.as_secs();
        if interval != 10 && interval != 30 {
            return Err(DefinitionError::InvalidHealthCheck(format!(
                "accelerator interval {}s must be 10 or 30",
                interval
            )));
        }
        if !(1..=10).contains(&props.threshold_count) {
            return Err(DefinitionError::InvalidHealthCheck(format!(
                "accelerator threshold {} outside 1..=10",
                props.threshold_count
            )));
        }

        let prefix = config.prefix();
        let name = naming::checked(&ACCELERATOR_NAME, prefix.as_str())?;
        let port = load_balancer.listener_port();

        let mut template = StackTemplate::new(
            config.stack_name(Self::TIER),
            format!("Global entry point for {}", prefix),
        );

        let accelerator = template.add(
            ResourceDecl::new(ACCELERATOR, ResourceKind::Accelerator)
                .with("name", name)
                .with("enabled", true)
                .with("ip_address_type", "ipv4"),
        );
        let listener = template.add(
            ResourceDecl::new(ACCELERATOR_LISTENER, ResourceKind::AcceleratorListener)
                .with("accelerator", PropertyValue::reference(&accelerator))
                .with("protocol", "tcp")
                .with(
                    "port_ranges",
                    PropertyValue::list([PropertyValue::map([
                        ("from_port", PropertyValue::from(port)),
                        ("to_port", PropertyValue::from(port)),
                    ])]),
                ),
        );
        template.add(
            ResourceDecl::new(ENDPOINT_GROUP, ResourceKind::EndpointGroup)
                .with("listener", PropertyValue::reference(&listener))
                .with("region", config.region.as_str())
                .with(
                    "endpoints",
                    PropertyValue::list([PropertyValue::map([
                        ("endpoint_id", PropertyValue::import(load_balancer.load_balancer_id())),
                        ("weight", PropertyValue::Int(i64::from(props.endpoint_weight))),
                    ])]),
                )
                .with("health_check_protocol", "http")
                .with("health_check_port", port)
                .with("health_check_path", load_balancer.health_check().path.as_str())
                .with("health_check_interval_seconds", PropertyValue::Int(interval as i64))
                .with("threshold_count", props.threshold_count),
        );

        let hostname = template.export(
            "AcceleratorHostname",
            PropertyValue::attr(&accelerator, "dns_name"),
            "Stable global hostname",
        );
        template.validate()?;

        Ok(Self {
            template,
            hostname: PublicHostname::new(hostname),
        })
    }

    pub fn template(&self) -> &StackTemplate {
        &self.template
    }

    pub fn hostname(&self) -> &PublicHostname {
        &self.hostname
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::define_all;
    use crate::config::StackProps;
    use std::time::Duration;

    #[test]
    fn test_single_weighted_endpoint() {
        let stacks = define_all(
            &DeploymentConfig::default(),
            &StackProps::default().with_traffic_router(Some(TrafficProps::default())),
        )
        .unwrap();
        let router = stacks.traffic().unwrap();
        let group = router.template().resource(ENDPOINT_GROUP).unwrap();

        let endpoints = match group.property("endpoints") {
            Some(PropertyValue::List(list)) => list.clone(),
            other => panic!("unexpected endpoints {:?}", other),
        };
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].get("weight"), Some(&PropertyValue::Int(128)));
        assert_eq!(
            group.property("health_check_path"),
            Some(&PropertyValue::from("/health"))
        );
        assert_eq!(
            router.template().dependencies().into_iter().collect::<Vec<_>>(),
            vec![stacks.compute().template().name.clone()]
        );
        assert_eq!(router.hostname().hostname().name, "AcceleratorHostname");
    }

    #[test]
    fn test_interval_must_be_supported() {
        let stacks = define_all(&DeploymentConfig::default(), &StackProps::default()).unwrap();
        let props = TrafficProps {
            health_check_interval: Duration::from_secs(20),
            ..TrafficProps::default()
        };
        assert!(matches!(
            TrafficRouter::define(
                &DeploymentConfig::default(),
                stacks.compute().load_balancer(),
                &props
            ),
            Err(DefinitionError::InvalidHealthCheck(_))
        ));
    }
}
