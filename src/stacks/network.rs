// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network foundation
//!
//! One address block, a public tier routed through an internet gateway and a
//! private tier with an empty route table. There is no NAT: private subnets
//! have no path to the internet in either direction.

use crate::config::{DeploymentConfig, NetworkProps};
use crate::domain::{availability_zones, NetworkPlan, SubnetTier};
use crate::errors::DefinitionError;
use crate::template::{
    ExportRef, LogicalId, NetworkHandle, PropertyValue, ResourceDecl, ResourceKind, StackTemplate,
};

pub const NETWORK: &str = "Network";
pub const INTERNET_GATEWAY: &str = "InternetGateway";
pub const PUBLIC_ROUTE_TABLE: &str = "PublicRouteTable";
pub const PRIVATE_ROUTE_TABLE: &str = "PrivateRouteTable";

/// Defined network foundation stack
#[derive(Debug, Clone)]
pub struct NetworkFoundation {
    template: StackTemplate,
    plan: NetworkPlan,
    handle: NetworkHandle,
}

impl NetworkFoundation {
    pub const TIER: &'static str = "network";

    pub fn define(config: &DeploymentConfig, props: &NetworkProps) -> Result<Self, DefinitionError> {
        let zones = availability_zones(&config.region, props.zone_count)?;
        let plan = NetworkPlan::new(props.block, zones, props.subnet_prefix)?;

        let mut template = StackTemplate::new(
            config.stack_name(Self::TIER),
            format!("Isolated address space for {}", config.prefix()),
        );

        let network = template.add(
            ResourceDecl::new(NETWORK, ResourceKind::Network)
                .with("cidr_block", plan.block().to_string())
                .with("enable_dns_hostnames", true)
                .with("enable_dns_support", true)
                .with("name", config.prefix()),
        );
        let gateway = template.add(
            ResourceDecl::new(INTERNET_GATEWAY, ResourceKind::InternetGateway)
                .with("network_id", PropertyValue::reference(&network)),
        );
        let public_routes = template.add(
            ResourceDecl::new(PUBLIC_ROUTE_TABLE, ResourceKind::RouteTable)
                .with("network_id", PropertyValue::reference(&network))
                .with(
                    "routes",
                    PropertyValue::list([PropertyValue::map([
                        ("destination", PropertyValue::from("0.0.0.0/0")),
                        ("gateway", PropertyValue::reference(&gateway)),
                    ])]),
                ),
        );
        let private_routes = template.add(
            ResourceDecl::new(PRIVATE_ROUTE_TABLE, ResourceKind::RouteTable)
                .with("network_id", PropertyValue::reference(&network))
                .with("routes", PropertyValue::List(Vec::new())),
        );

        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for tier in SubnetTier::ALL {
            let route_table = match tier {
                SubnetTier::Public => &public_routes,
                SubnetTier::Private => &private_routes,
            };
            for (index, subnet) in plan.tier(tier).enumerate() {
                let id = subnet_id(tier, index);
                let subnet_ref = template.add(
                    ResourceDecl::new(id.as_str(), ResourceKind::Subnet)
                        .with("network_id", PropertyValue::reference(&network))
                        .with("cidr_block", subnet.cidr.to_string())
                        .with("zone", subnet.zone.as_str())
                        .with("tier", tier.to_string())
                        .with("map_public_ip_on_launch", tier.has_internet_route())
                        .with("route_table", PropertyValue::reference(route_table)),
                );
                let export = template.export(
                    format!("{}Id", subnet_ref),
                    PropertyValue::reference(&subnet_ref),
                    format!("{} subnet in {}", tier, subnet.zone),
                );
                match tier {
                    SubnetTier::Public => public_subnets.push(export),
                    SubnetTier::Private => private_subnets.push(export),
                }
            }
        }

        let network_id: ExportRef = template.export(
            "NetworkId",
            PropertyValue::reference(&network),
            "Network identifier",
        );
        template.validate()?;

        let handle = NetworkHandle::new(network_id, plan.block(), public_subnets, private_subnets);
        Ok(Self {
            template,
            plan,
            handle,
        })
    }

    pub fn template(&self) -> &StackTemplate {
        &self.template
    }

    pub fn plan(&self) -> &NetworkPlan {
        &self.plan
    }

    pub fn handle(&self) -> &NetworkHandle {
        &self.handle
    }
}

fn subnet_id(tier: SubnetTier, index: usize) -> LogicalId {
    let prefix = match tier {
        SubnetTier::Public => "PublicSubnet",
        SubnetTier::Private => "PrivateSubnet",
    };
    LogicalId::new(format!("{}{}", prefix, index + 1))
}
