// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Planning with Validation Invariants
//!
//! Carves one IPv4 block into equally sized subnets, one public-routable and
//! one private-isolated subnet per availability zone.
//!
//! # Invariants
//! - Subnets never overlap each other
//! - Every subnet lies inside the block
//! - Public subnets come first, then private, each ordered by zone

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Address planning error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkPlanError {
    #[error("Invalid address block: {0}")]
    InvalidBlock(String),

    #[error("Subnet prefix /{subnet_prefix} must be longer than block prefix /{block_prefix}")]
    PrefixNotLonger { block_prefix: u8, subnet_prefix: u8 },

    #[error("Address block {block} holds {available} /{subnet_prefix} subnets, {required} required")]
    AddressSpaceTooSmall {
        block: String,
        subnet_prefix: u8,
        required: u64,
        available: u64,
    },

    #[error("At least one availability zone is required")]
    NoZones,

    #[error("Requested {requested} availability zones, at most {max} supported")]
    TooManyZones { requested: usize, max: usize },
}

/// Routing tier of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Routable from the internet through the gateway
    Public,
    /// No route to or from the internet, not even outbound
    Private,
}

impl SubnetTier {
    /// All tiers, in allocation order
    pub const ALL: [SubnetTier; 2] = [SubnetTier::Public, SubnetTier::Private];

    /// Whether the tier's route table carries a default route to the gateway
    pub fn has_internet_route(&self) -> bool {
        matches!(self, SubnetTier::Public)
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetTier::Public => write!(f, "public"),
            SubnetTier::Private => write!(f, "private"),
        }
    }
}

/// One planned subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPlan {
    pub tier: SubnetTier,
    pub zone: String,
    pub cidr: Ipv4Network,
}

/// Subdivision of an address block into tiers across zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlan {
    block: Ipv4Network,
    zones: Vec<String>,
    subnet_prefix: u8,
    subnets: Vec<SubnetPlan>,
}

impl NetworkPlan {
    /// Most zones a single plan spans
    pub const MAX_ZONES: usize = 6;

    /// Plan `zones.len()` subnets per tier of size `/subnet_prefix` inside `block`
    pub fn new(
        block: Ipv4Network,
        zones: Vec<String>,
        subnet_prefix: u8,
    ) -> Result<Self, NetworkPlanError> {
        if zones.is_empty() {
            return Err(NetworkPlanError::NoZones);
        }
        if zones.len() > Self::MAX_ZONES {
            return Err(NetworkPlanError::TooManyZones {
                requested: zones.len(),
                max: Self::MAX_ZONES,
            });
        }
        if subnet_prefix > 32 {
            return Err(NetworkPlanError::InvalidBlock(format!(
                "subnet prefix /{} exceeds 32",
                subnet_prefix
            )));
        }
        if subnet_prefix <= block.prefix() {
            return Err(NetworkPlanError::PrefixNotLonger {
                block_prefix: block.prefix(),
                subnet_prefix,
            });
        }

        let block = Ipv4Network::new(block.network(), block.prefix())
            .map_err(|e| NetworkPlanError::InvalidBlock(e.to_string()))?;

        let required = (zones.len() * SubnetTier::ALL.len()) as u64;
        let available = 1u64 << (subnet_prefix - block.prefix());
        if required > available {
            return Err(NetworkPlanError::AddressSpaceTooSmall {
                block: block.to_string(),
                subnet_prefix,
                required,
                available,
            });
        }

        let base = u32::from(block.network()) as u64;
        let step = 1u64 << (32 - subnet_prefix);

        let mut subnets = Vec::with_capacity(required as usize);
        for (tier_index, tier) in SubnetTier::ALL.iter().enumerate() {
            for (zone_index, zone) in zones.iter().enumerate() {
                let index = (tier_index * zones.len() + zone_index) as u64;
                let address = Ipv4Addr::from((base + index * step) as u32);
                let cidr = Ipv4Network::new(address, subnet_prefix)
                    .map_err(|e| NetworkPlanError::InvalidBlock(e.to_string()))?;
                subnets.push(SubnetPlan {
                    tier: *tier,
                    zone: zone.clone(),
                    cidr,
                });
            }
        }

        Ok(Self {
            block,
            zones,
            subnet_prefix,
            subnets,
        })
    }

    pub fn block(&self) -> Ipv4Network {
        self.block
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn subnet_prefix(&self) -> u8 {
        self.subnet_prefix
    }

    pub fn subnets(&self) -> &[SubnetPlan] {
        &self.subnets
    }

    /// Subnets of one tier, in zone order
    pub fn tier(&self, tier: SubnetTier) -> impl Iterator<Item = &SubnetPlan> {
        self.subnets.iter().filter(move |s| s.tier == tier)
    }
}

/// Zone names for a region: `<region>a`, `<region>b`, ...
pub fn availability_zones(region: &str, count: usize) -> Result<Vec<String>, NetworkPlanError> {
    if count == 0 {
        return Err(NetworkPlanError::NoZones);
    }
    if count > NetworkPlan::MAX_ZONES {
        return Err(NetworkPlanError::TooManyZones {
            requested: count,
            max: NetworkPlan::MAX_ZONES,
        });
    }
    Ok((b'a'..)
        .take(count)
        .map(|suffix| format!("{}{}", region, suffix as char))
        .collect())
}

/// Inclusive address range covered by a network
pub fn address_range(network: &Ipv4Network) -> (u32, u32) {
    let start = u32::from(network.network());
    let size = 1u64 << (32 - network.prefix());
    (start, (start as u64 + size - 1) as u32)
}

/// Whether two networks share any address
pub fn overlaps(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    let (a_start, a_end) = address_range(a);
    let (b_start, b_end) = address_range(b);
    a_start <= b_end && b_start <= a_end
}

/// Whether `inner` lies entirely inside `outer`
pub fn contains(outer: &Ipv4Network, inner: &Ipv4Network) -> bool {
    let (o_start, o_end) = address_range(outer);
    let (i_start, i_end) = address_range(inner);
    o_start <= i_start && i_end <= o_end
}
