// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Templates
//!
//! A stack template is the declarative output of a stack constructor: a set
//! of resource declarations, the references between them, and the exports
//! later stacks may import. Templates are pure data. Engines diff and apply
//! them; nothing in this module performs I/O.
//!
//! # Deferred values
//!
//! Values only known once a resource exists are written as
//! [`PropertyValue`] expressions and resolved by the engine:
//!
//! ```text
//! Ref(id)            → physical identifier of a resource in this stack
//! Attr(id, name)     → attribute of a resource in this stack
//! Import(export)     → export of an earlier stack
//! Lowercase(value)   → ASCII-lowercased string
//! Join(sep, parts)   → concatenation
//! ```
//!
//! `Ref` and `Attr` also order creation: a resource is created only after
//! every resource it references.

pub mod handles;

pub use handles::{CredentialRef, DatabaseHandle, LoadBalancerHandle, NetworkHandle, PublicHostname};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::DefinitionError;

/// Identifier of a resource inside one stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Name of a stack, unique within a deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(String);

impl StackName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StackName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reference to a value exported by a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExportRef {
    pub stack: StackName,
    pub name: String,
}

impl ExportRef {
    pub fn new(stack: StackName, name: impl Into<String>) -> Self {
        Self {
            stack,
            name: name.into(),
        }
    }
}

impl fmt::Display for ExportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stack, self.name)
    }
}

/// Property value, literal or deferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Ref(LogicalId),
    Attr {
        resource: LogicalId,
        attribute: String,
    },
    Import(ExportRef),
    Lowercase(Box<PropertyValue>),
    Join {
        separator: String,
        parts: Vec<PropertyValue>,
    },
}

impl PropertyValue {
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PropertyValue)>,
    {
        PropertyValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = PropertyValue>,
    {
        PropertyValue::List(items.into_iter().collect())
    }

    pub fn reference(id: &LogicalId) -> Self {
        PropertyValue::Ref(id.clone())
    }

    pub fn attr(resource: &LogicalId, attribute: impl Into<String>) -> Self {
        PropertyValue::Attr {
            resource: resource.clone(),
            attribute: attribute.into(),
        }
    }

    pub fn import(export: &ExportRef) -> Self {
        PropertyValue::Import(export.clone())
    }

    pub fn lowercase(value: PropertyValue) -> Self {
        PropertyValue::Lowercase(Box::new(value))
    }

    pub fn join(separator: impl Into<String>, parts: Vec<PropertyValue>) -> Self {
        PropertyValue::Join {
            separator: separator.into(),
            parts,
        }
    }

    /// Resources of the same stack this value depends on
    pub fn collect_references(&self, out: &mut BTreeSet<LogicalId>) {
        match self {
            PropertyValue::Ref(id) => {
                out.insert(id.clone());
            }
            PropertyValue::Attr { resource, .. } => {
                out.insert(resource.clone());
            }
            PropertyValue::List(items) | PropertyValue::Join { parts: items, .. } => {
                items.iter().for_each(|v| v.collect_references(out))
            }
            PropertyValue::Map(map) => map.values().for_each(|v| v.collect_references(out)),
            PropertyValue::Lowercase(inner) => inner.collect_references(out),
            PropertyValue::Bool(_)
            | PropertyValue::Int(_)
            | PropertyValue::String(_)
            | PropertyValue::Import(_) => {}
        }
    }

    /// Exports of other stacks this value depends on
    pub fn collect_imports(&self, out: &mut BTreeSet<ExportRef>) {
        match self {
            PropertyValue::Import(export) => {
                out.insert(export.clone());
            }
            PropertyValue::List(items) | PropertyValue::Join { parts: items, .. } => {
                items.iter().for_each(|v| v.collect_imports(out))
            }
            PropertyValue::Map(map) => map.values().for_each(|v| v.collect_imports(out)),
            PropertyValue::Lowercase(inner) => inner.collect_imports(out),
            _ => {}
        }
    }

    /// Literal string content, if this is a plain string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

/// Which property changes force a resource to be replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Any change creates a new resource (immutable definitions, revisions)
    Always,
    /// Only changes to the listed properties replace; the rest update in place
    On(&'static [&'static str]),
}

impl Replacement {
    pub fn forced_by(&self, property: &str) -> bool {
        match self {
            Replacement::Always => true,
            Replacement::On(keys) => keys.contains(&property),
        }
    }
}

/// Supported resource classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnet,
    InternetGateway,
    RouteTable,
    AccessGroup,
    AccessGroupRule,
    Secret,
    SecretAttachment,
    DatabaseSubnetGroup,
    Database,
    Cluster,
    LogGroup,
    Identity,
    TaskSpec,
    LoadBalancer,
    TargetGroup,
    Listener,
    Service,
    Accelerator,
    AcceleratorListener,
    EndpointGroup,
}

impl ResourceKind {
    /// Replacement semantics of this resource class
    pub fn replacement(&self) -> Replacement {
        match self {
            ResourceKind::Network => Replacement::On(&["cidr_block"]),
            ResourceKind::Subnet => Replacement::On(&["cidr_block", "zone", "network_id"]),
            ResourceKind::InternetGateway => Replacement::On(&["network_id"]),
            ResourceKind::RouteTable => Replacement::On(&["network_id"]),
            ResourceKind::AccessGroup => {
                Replacement::On(&["group_name", "description", "network_id"])
            }
            ResourceKind::AccessGroupRule => Replacement::Always,
            ResourceKind::Secret => Replacement::On(&["name", "generate"]),
            ResourceKind::SecretAttachment => Replacement::Always,
            ResourceKind::DatabaseSubnetGroup => Replacement::On(&["name"]),
            ResourceKind::Database => Replacement::On(&[
                "identifier",
                "engine",
                "database_name",
                "credentials_secret",
                "subnet_group",
            ]),
            ResourceKind::Cluster => Replacement::On(&["cluster_name"]),
            ResourceKind::LogGroup => Replacement::On(&["name"]),
            ResourceKind::Identity => Replacement::On(&["name", "trusted_service"]),
            ResourceKind::TaskSpec => Replacement::Always,
            ResourceKind::LoadBalancer => Replacement::On(&["name", "scheme"]),
            ResourceKind::TargetGroup => {
                Replacement::On(&["name", "port", "protocol", "target_type", "network_id"])
            }
            ResourceKind::Listener => Replacement::On(&["load_balancer"]),
            ResourceKind::Service => Replacement::On(&["cluster", "service_name", "launch_type"]),
            ResourceKind::Accelerator => Replacement::On(&[]),
            ResourceKind::AcceleratorListener => Replacement::On(&["accelerator"]),
            ResourceKind::EndpointGroup => Replacement::On(&["listener", "region"]),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", name)
    }
}

/// One declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDecl {
    pub logical_id: LogicalId,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Ordering edges not visible in properties
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<LogicalId>,
}

impl ResourceDecl {
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: LogicalId::new(logical_id),
            kind,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, PropertyValue>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.insert(id.clone());
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Same-stack resources this declaration must be created after
    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut out = self.depends_on.clone();
        self.properties
            .values()
            .for_each(|v| v.collect_references(&mut out));
        out
    }

    pub fn imports(&self) -> BTreeSet<ExportRef> {
        let mut out = BTreeSet::new();
        self.properties
            .values()
            .for_each(|v| v.collect_imports(&mut out));
        out
    }
}

impl From<PropertyValue> for BTreeMap<String, PropertyValue> {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Map(map) => map,
            _ => BTreeMap::new(),
        }
    }
}

/// A value published for later stacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub value: PropertyValue,
    pub description: String,
}

/// Declarative definition of one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTemplate {
    pub name: StackName,
    pub description: String,
    pub resources: Vec<ResourceDecl>,
    pub exports: BTreeMap<String, Export>,
}

impl StackTemplate {
    pub fn new(name: StackName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            resources: Vec::new(),
            exports: BTreeMap::new(),
        }
    }

    /// Add a resource, returning its logical id for later references
    pub fn add(&mut self, decl: ResourceDecl) -> LogicalId {
        let id = decl.logical_id.clone();
        self.resources.push(decl);
        id
    }

    /// Publish a value; only the returned reference leaves the stack
    pub fn export(
        &mut self,
        name: impl Into<String>,
        value: PropertyValue,
        description: impl Into<String>,
    ) -> ExportRef {
        let name = name.into();
        self.exports.insert(
            name.clone(),
            Export {
                value,
                description: description.into(),
            },
        );
        ExportRef::new(self.name.clone(), name)
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDecl> {
        self.resources.iter().find(|r| r.logical_id.as_str() == id)
    }

    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDecl> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    /// Every export of other stacks this stack reads
    pub fn imports(&self) -> BTreeSet<ExportRef> {
        self.resources
            .iter()
            .flat_map(|r| r.imports())
            .chain(self.exports.values().flat_map(|e| {
                let mut out = BTreeSet::new();
                e.value.collect_imports(&mut out);
                out
            }))
            .collect()
    }

    /// Stacks this stack consumes exports from
    pub fn dependencies(&self) -> BTreeSet<StackName> {
        self.imports()
            .into_iter()
            .map(|e| e.stack)
            .filter(|s| *s != self.name)
            .collect()
    }

    /// Structural checks: unique ids, resolvable references, acyclic
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut seen = BTreeSet::new();
        for decl in &self.resources {
            if !seen.insert(decl.logical_id.clone()) {
                return Err(DefinitionError::DuplicateLogicalId {
                    stack: self.name.to_string(),
                    logical_id: decl.logical_id.to_string(),
                });
            }
        }

        for decl in &self.resources {
            if let Some(target) = decl.references().into_iter().find(|r| !seen.contains(r)) {
                return Err(DefinitionError::DanglingReference {
                    stack: self.name.to_string(),
                    resource: decl.logical_id.to_string(),
                    target: target.to_string(),
                });
            }
        }

        for (name, export) in &self.exports {
            let mut refs = BTreeSet::new();
            export.value.collect_references(&mut refs);
            if let Some(target) = refs.into_iter().find(|r| !seen.contains(r)) {
                return Err(DefinitionError::DanglingExport {
                    stack: self.name.to_string(),
                    export: name.clone(),
                    target: target.to_string(),
                });
            }
        }

        self.creation_waves().map(|_| ())
    }

    /// Topological levels of the intra-stack reference graph
    ///
    /// Resources in one wave share no data dependency and may be created in
    /// parallel; wave `n + 1` starts after wave `n` completes. Ordering inside
    /// a wave is by logical id so the plan is deterministic.
    pub fn creation_waves(&self) -> Result<Vec<Vec<LogicalId>>, DefinitionError> {
        let mut in_degree: BTreeMap<LogicalId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<LogicalId, Vec<LogicalId>> = BTreeMap::new();

        for decl in &self.resources {
            in_degree.entry(decl.logical_id.clone()).or_insert(0);
        }
        for decl in &self.resources {
            for dep in decl.references() {
                if dep == decl.logical_id || !in_degree.contains_key(&dep) {
                    continue;
                }
                dependents
                    .entry(dep)
                    .or_default()
                    .push(decl.logical_id.clone());
                *in_degree.entry(decl.logical_id.clone()).or_insert(0) += 1;
            }
        }

        let mut waves = Vec::new();
        let mut current: Vec<LogicalId> = in_degree
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(id, _)| id.clone())
            .collect();
        let mut placed = 0;

        while !current.is_empty() {
            placed += current.len();
            let mut next = BTreeSet::new();
            for id in &current {
                for dependent in dependents.get(id).into_iter().flatten() {
                    if let Some(count) = in_degree.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            next.insert(dependent.clone());
                        }
                    }
                }
            }
            waves.push(std::mem::take(&mut current));
            current = next.into_iter().collect();
        }

        if placed != in_degree.len() {
            let stuck = in_degree
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            return Err(DefinitionError::ResourceCycle {
                stack: self.name.to_string(),
                resources: stuck,
            });
        }

        Ok(waves)
    }
}
