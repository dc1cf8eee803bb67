// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Network Plans
//!
//! Subnet tiers must tile the address block without overlap for every
//! zone count and prefix combination that fits, and the private tier must
//! never gain a route.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use proptest::prelude::*;
use tiered_stacks::domain::network::{contains, overlaps};
use tiered_stacks::domain::{availability_zones, NetworkPlan, SubnetTier};
use tiered_stacks::stacks::network::PRIVATE_ROUTE_TABLE;
use tiered_stacks::template::{PropertyValue, ResourceKind};
use tiered_stacks::{DeploymentConfig, NetworkFoundation, NetworkProps};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// (block prefix, subnet prefix, zone count) that always fits
fn plan_inputs() -> impl Strategy<Value = (u8, u8, usize)> {
    (8u8..=24, 4u8..=8, 1usize..=NetworkPlan::MAX_ZONES)
        .prop_map(|(block, extra, zones)| (block, (block + extra).min(32), zones))
}

fn block(prefix: u8) -> Ipv4Network {
    Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 0), prefix).unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Subnets never overlap and stay inside the block
    #[test]
    fn prop_subnets_are_disjoint((block_prefix, subnet_prefix, zone_count) in plan_inputs()) {
        let zones = availability_zones("example-region", zone_count).unwrap();
        let plan = NetworkPlan::new(block(block_prefix), zones, subnet_prefix).unwrap();
        let subnets = plan.subnets();

        prop_assert_eq!(subnets.len(), zone_count * 2);
        for (i, a) in subnets.iter().enumerate() {
            prop_assert!(contains(&plan.block(), &a.cidr), "{} outside {}", a.cidr, plan.block());
            for b in &subnets[i + 1..] {
                prop_assert!(!overlaps(&a.cidr, &b.cidr), "{} overlaps {}", a.cidr, b.cidr);
            }
        }
    }

    /// Property: Each tier gets exactly one subnet per zone
    #[test]
    fn prop_one_subnet_per_zone_per_tier((block_prefix, subnet_prefix, zone_count) in plan_inputs()) {
        let zones = availability_zones("example-region", zone_count).unwrap();
        let plan = NetworkPlan::new(block(block_prefix), zones.clone(), subnet_prefix).unwrap();

        for tier in SubnetTier::ALL {
            let tier_zones: Vec<&String> = plan.tier(tier).map(|s| &s.zone).collect();
            prop_assert_eq!(tier_zones, zones.iter().collect::<Vec<_>>());
        }
    }

    /// Property: Too many subnets for the block is always rejected
    #[test]
    fn prop_undersized_block_rejected(block_prefix in 16u8..=28, zone_count in 2usize..=NetworkPlan::MAX_ZONES) {
        let zones = availability_zones("example-region", zone_count).unwrap();
        // One extra bit holds only two subnets, fewer than two tiers of zones
        prop_assert!(NetworkPlan::new(block(block_prefix), zones, block_prefix + 1).is_err());
    }

    /// Property: The private route table stays empty
    #[test]
    fn prop_private_tier_has_no_routes((block_prefix, subnet_prefix, zone_count) in plan_inputs()) {
        let props = NetworkProps::default()
            .with_block(block(block_prefix))
            .with_subnet_prefix(subnet_prefix)
            .with_zone_count(zone_count);
        let network = NetworkFoundation::define(&DeploymentConfig::default(), &props).unwrap();
        let template = network.template();

        prop_assert_eq!(
            template.resource(PRIVATE_ROUTE_TABLE).and_then(|r| r.property("routes")),
            Some(&PropertyValue::List(vec![]))
        );
        let private_subnets = template
            .resources_of(ResourceKind::Subnet)
            .filter(|s| s.property("tier") == Some(&PropertyValue::from("private")))
            .count();
        prop_assert_eq!(private_subnets, zone_count);
        prop_assert_eq!(network.handle().private_subnets().len(), zone_count);
    }
}
