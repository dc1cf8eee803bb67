// Copyright (c) 2025 - Cowboy AI, Inc.
//! Access groups and directional access rules
//!
//! A rule is declared on the group of the side that initiates the path.
//! The application group carries "outbound to the database"; the database
//! group is never edited after the data tier creates it, so the data tier
//! never needs to name a group that does not exist yet.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::template::{ExportRef, LogicalId, PropertyValue, ResourceDecl, ResourceKind};

/// Direction of a rule relative to the group that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    /// Every protocol; port range is ignored
    All,
}

impl Protocol {
    /// Whether traffic using `other` matches this rule protocol
    pub fn covers(&self, other: Protocol) -> bool {
        *self == Protocol::All || *self == other
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::All => write!(f, "all"),
        }
    }
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    pub fn all() -> Self {
        Self {
            from: 0,
            to: u16::MAX,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }

    /// Every port except `port`, as at most two ranges
    pub fn all_except(port: u16) -> Vec<Self> {
        let mut ranges = Vec::with_capacity(2);
        if let Some(below) = port.checked_sub(1) {
            ranges.push(Self { from: 0, to: below });
        }
        if let Some(above) = port.checked_add(1) {
            ranges.push(Self {
                from: above,
                to: u16::MAX,
            });
        }
        ranges
    }
}

/// Other end of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// The whole public internet
    AnyIpv4,
    /// An address range
    Cidr(Ipv4Network),
    /// Another access group declared in the same stack
    Group(LogicalId),
    /// Members of the owning group itself
    SameGroup,
    /// A resource exported by an earlier stack, referenced by handle only
    Resource(ExportRef),
}

impl Peer {
    /// True for peers that reach beyond the private address space
    pub fn is_public(&self) -> bool {
        match self {
            Peer::AnyIpv4 => true,
            Peer::Cidr(cidr) => cidr.prefix() == 0,
            _ => false,
        }
    }
}

/// One directional permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub direction: Direction,
    pub peer: Peer,
    pub protocol: Protocol,
    pub ports: PortRange,
    pub description: String,
}

impl AccessRule {
    pub fn inbound(
        peer: Peer,
        protocol: Protocol,
        ports: PortRange,
        description: impl Into<String>,
    ) -> Self {
        Self {
            direction: Direction::Inbound,
            peer,
            protocol,
            ports,
            description: description.into(),
        }
    }

    pub fn outbound(
        peer: Peer,
        protocol: Protocol,
        ports: PortRange,
        description: impl Into<String>,
    ) -> Self {
        Self {
            direction: Direction::Outbound,
            peer,
            protocol,
            ports,
            description: description.into(),
        }
    }

    /// Whether this rule admits `protocol` traffic on `port`
    pub fn covers(&self, protocol: Protocol, port: u16) -> bool {
        self.protocol.covers(protocol) && (self.protocol == Protocol::All || self.ports.contains(port))
    }

    fn to_property(&self) -> PropertyValue {
        let peer = match &self.peer {
            Peer::AnyIpv4 => PropertyValue::map([("cidr", PropertyValue::from("0.0.0.0/0"))]),
            Peer::Cidr(cidr) => PropertyValue::map([("cidr", PropertyValue::from(cidr.to_string()))]),
            Peer::Group(id) => PropertyValue::map([("group", PropertyValue::Ref(id.clone()))]),
            Peer::SameGroup => PropertyValue::map([("group", PropertyValue::from("self"))]),
            Peer::Resource(export) => {
                PropertyValue::map([("resource", PropertyValue::Import(export.clone()))])
            }
        };
        let (from, to) = match self.protocol {
            Protocol::All => (-1, -1),
            _ => (i64::from(self.ports.from), i64::from(self.ports.to)),
        };
        PropertyValue::map([
            ("peer", peer),
            ("protocol", PropertyValue::from(self.protocol.to_string())),
            ("from_port", PropertyValue::Int(from)),
            ("to_port", PropertyValue::Int(to)),
            ("description", PropertyValue::from(self.description.as_str())),
        ])
    }
}

/// Access group definition as declared by its owning stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroupSpec {
    pub name: String,
    pub description: String,
    pub rules: Vec<AccessRule>,
}

impl AccessGroupSpec {
    /// Group with no rules at all: nothing in, nothing out
    pub fn empty(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: AccessRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn inbound(&self) -> impl Iterator<Item = &AccessRule> {
        self.rules
            .iter()
            .filter(|r| r.direction == Direction::Inbound)
    }

    pub fn outbound(&self) -> impl Iterator<Item = &AccessRule> {
        self.rules
            .iter()
            .filter(|r| r.direction == Direction::Outbound)
    }

    /// Template properties of the group resource
    ///
    /// Rules naming another group of the same stack are left out; they are
    /// emitted by [`AccessGroupSpec::standalone_rules`] so two groups that
    /// admit each other do not reference each other.
    pub fn properties(&self, network: PropertyValue) -> BTreeMap<String, PropertyValue> {
        let rules = |direction: Direction| {
            PropertyValue::List(
                self.rules
                    .iter()
                    .filter(|r| r.direction == direction && !matches!(r.peer, Peer::Group(_)))
                    .map(AccessRule::to_property)
                    .collect(),
            )
        };
        BTreeMap::from([
            ("group_name".to_string(), PropertyValue::from(self.name.as_str())),
            (
                "description".to_string(),
                PropertyValue::from(self.description.as_str()),
            ),
            ("network_id".to_string(), network),
            ("ingress".to_string(), rules(Direction::Inbound)),
            ("egress".to_string(), rules(Direction::Outbound)),
        ])
    }

    /// One rule resource per group-to-group rule, attached to `owner`
    pub fn standalone_rules(&self, owner: &LogicalId) -> Vec<ResourceDecl> {
        let mut ingress = 0;
        let mut egress = 0;
        self.rules
            .iter()
            .filter(|r| matches!(r.peer, Peer::Group(_)))
            .map(|rule| {
                let (label, counter) = match rule.direction {
                    Direction::Inbound => ("Ingress", &mut ingress),
                    Direction::Outbound => ("Egress", &mut egress),
                };
                *counter += 1;
                let direction = match rule.direction {
                    Direction::Inbound => "inbound",
                    Direction::Outbound => "outbound",
                };
                ResourceDecl::new(format!("{}{}{}", owner, label, counter), ResourceKind::AccessGroupRule)
                    .with("group", PropertyValue::reference(owner))
                    .with("direction", direction)
                    .with_properties(rule.to_property().into())
            })
            .collect()
    }
}
