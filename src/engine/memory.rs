// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provisioning Engine
//!
//! Reference implementation of [`ProvisioningEngine`] with no provider
//! behind it. It keeps the full contract: wave-ordered creation, diffing
//! with per-kind replacement rules, transactional applies, generated
//! secrets, provider-assigned identifiers and guarded teardown.
//!
//! Applies run against a copy of the state that is committed only when
//! every resource succeeded, so a failure leaves nothing behind.
//!
//! Failures and unhealthy replicas can be injected for tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ChangeAction, ChangeSet, ProvisioningEngine, ResourceChange};
use crate::domain::{
    GeneratedSecretSpec, Hostname, IdentifierFormat, SecretValue, SERVICE_RESOURCE_TYPE,
};
use crate::errors::{DeployError, DeployResult};
use crate::template::{
    ExportRef, LogicalId, PropertyValue, ResourceDecl, ResourceKind, StackName, StackTemplate,
};

/// Engine construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub region: String,
    /// Identifier format the engine assigns service identifiers with
    pub identifier_format: IdentifierFormat,
    /// Seed for generated identifiers and secrets; random when unset
    pub seed: Option<u64>,
    /// Fixed load balancer DNS name instead of a generated one
    pub load_balancer_hostname: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            region: "example-region".to_string(),
            identifier_format: IdentifierFormat::CURRENT,
            seed: None,
            load_balancer_hostname: None,
        }
    }
}

impl EngineOptions {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_identifier_format(mut self, format: IdentifierFormat) -> Self {
        self.identifier_format = format;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_load_balancer_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.load_balancer_hostname = Some(hostname.into());
        self
    }
}

#[derive(Debug, Clone)]
struct DeployedResource {
    kind: ResourceKind,
    physical_id: String,
    /// Resolved property values
    properties: BTreeMap<String, Value>,
    /// Provider-assigned attributes readable through `Attr`
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct DeployedStack {
    resources: BTreeMap<LogicalId, DeployedResource>,
    creation_order: Vec<LogicalId>,
    outputs: BTreeMap<String, String>,
    imports: BTreeSet<ExportRef>,
}

#[derive(Debug, Clone)]
struct EngineState {
    stacks: BTreeMap<StackName, DeployedStack>,
    secrets: BTreeMap<String, SecretValue>,
    /// Last revision per task family
    revisions: BTreeMap<String, u32>,
    failing: BTreeSet<ResourceKind>,
    replicas_healthy: bool,
    rng: StdRng,
}

/// Provisioning engine keeping all state in memory
pub struct InMemoryEngine {
    options: EngineOptions,
    state: RwLock<EngineState>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let rng = StdRng::seed_from_u64(options.seed.unwrap_or_else(rand::random));
        Self {
            options,
            state: RwLock::new(EngineState {
                stacks: BTreeMap::new(),
                secrets: BTreeMap::new(),
                revisions: BTreeMap::new(),
                failing: BTreeSet::new(),
                replicas_healthy: true,
                rng,
            }),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Reject every create, update or replace of `kind` until cleared
    pub async fn inject_failure(&self, kind: ResourceKind) {
        self.state.write().await.failing.insert(kind);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failing.clear();
    }

    /// Whether newly started replicas pass their health checks
    pub async fn set_replicas_healthy(&self, healthy: bool) {
        self.state.write().await.replicas_healthy = healthy;
    }

    /// Current value of a secret; only the engine and the workload see this
    pub async fn secret_value(&self, secret_id: &str) -> Option<SecretValue> {
        self.state.read().await.secrets.get(secret_id).cloned()
    }

    /// Resolved properties of one deployed resource
    pub async fn resolved_properties(
        &self,
        stack: &StackName,
        logical_id: &str,
    ) -> Option<BTreeMap<String, Value>> {
        self.state
            .read()
            .await
            .stacks
            .get(stack)
            .and_then(|s| s.resources.get(&LogicalId::from(logical_id)))
            .map(|r| r.properties.clone())
    }

    /// Names of deployed stacks
    pub async fn deployed_stacks(&self) -> Vec<StackName> {
        self.state.read().await.stacks.keys().cloned().collect()
    }

    /// Identifier the provider builds for a service
    fn assign_service_identifier(&self, cluster: &str, service: &str) -> String {
        match self.options.identifier_format.version() {
            1 => format!("{}/service/{}/{}", SERVICE_RESOURCE_TYPE, cluster, service),
            _ => format!(
                "{}/service/{}/{}/{}",
                SERVICE_RESOURCE_TYPE, self.options.region, cluster, service
            ),
        }
    }

    /// Diff `template` against the deployed stack and converge `state`
    ///
    /// With `dry_run` no failure or health check is simulated and the new
    /// stack is not stored.
    fn converge(
        &self,
        state: &mut EngineState,
        template: &StackTemplate,
        dry_run: bool,
    ) -> DeployResult<ChangeSet> {
        template.validate()?;
        let stack = &template.name;
        let failed = |resource: &str, reason: String| DeployError::ProvisioningFailed {
            stack: stack.to_string(),
            resource: resource.to_string(),
            reason,
        };

        let imports: BTreeSet<ExportRef> = template
            .imports()
            .into_iter()
            .filter(|i| &i.stack != stack)
            .collect();
        for import in &imports {
            let producer =
                state
                    .stacks
                    .get(&import.stack)
                    .ok_or_else(|| DeployError::DependencyNotDeployed {
                        stack: stack.to_string(),
                        dependency: import.stack.to_string(),
                    })?;
            if !producer.outputs.contains_key(&import.name) {
                return Err(failed(
                    &import.to_string(),
                    "export is not published by the deployed stack".to_string(),
                ));
            }
        }

        let waves = template.creation_waves()?;
        let previous = state.stacks.get(stack).cloned().unwrap_or_default();
        let mut next = DeployedStack::default();
        let mut changes = Vec::new();

        for id in waves.iter().flatten() {
            let Some(decl) = template.resource(id.as_str()) else {
                continue;
            };
            let resolved = resolve_properties(decl, &next.resources, &state.stacks)
                .map_err(|reason| failed(id.as_str(), reason))?;

            let old = previous.resources.get(id);
            let (action, changed_properties) = match old {
                None => (ChangeAction::Create, Vec::new()),
                Some(old) if old.kind != decl.kind => (ChangeAction::Replace, Vec::new()),
                Some(old) => {
                    let changed = changed_keys(&old.properties, &resolved);
                    let replacement = decl.kind.replacement();
                    let action = if changed.is_empty() {
                        ChangeAction::NoChange
                    } else if changed.iter().any(|k| replacement.forced_by(k)) {
                        ChangeAction::Replace
                    } else {
                        ChangeAction::Update
                    };
                    (action, changed)
                }
            };

            if action != ChangeAction::NoChange && !dry_run && state.failing.contains(&decl.kind) {
                return Err(failed(
                    id.as_str(),
                    format!("provider rejected {} {}", action, decl.kind),
                ));
            }

            let resource = match (action, old) {
                (ChangeAction::NoChange, Some(old)) => old.clone(),
                (ChangeAction::Update, Some(old)) => DeployedResource {
                    properties: resolved,
                    ..old.clone()
                },
                _ => {
                    let created = self.provision(state, decl, resolved, &next.resources)?;
                    if let Some(old) = old {
                        if old.kind == ResourceKind::Secret && old.physical_id != created.physical_id {
                            state.secrets.remove(&old.physical_id);
                        }
                    }
                    created
                }
            };

            if decl.kind == ResourceKind::Service && action != ChangeAction::NoChange && !dry_run {
                check_rollout(state, stack, id, &resource, old.is_some())?;
            }

            debug!(
                stack = %stack,
                resource = %id,
                kind = %decl.kind,
                action = %action,
                "Resource converged"
            );
            changes.push(ResourceChange {
                logical_id: id.clone(),
                kind: decl.kind,
                action,
                changed_properties,
            });
            next.resources.insert(id.clone(), resource);
            next.creation_order.push(id.clone());
        }

        for id in previous.creation_order.iter().rev() {
            if next.resources.contains_key(id) {
                continue;
            }
            if let Some(old) = previous.resources.get(id) {
                if old.kind == ResourceKind::Secret {
                    state.secrets.remove(&old.physical_id);
                }
                changes.push(ResourceChange {
                    logical_id: id.clone(),
                    kind: old.kind,
                    action: ChangeAction::Delete,
                    changed_properties: Vec::new(),
                });
            }
        }

        for (name, export) in &template.exports {
            let value = resolve(&export.value, &next.resources, &state.stacks)
                .map_err(|reason| failed(name, reason))?;
            next.outputs.insert(name.clone(), as_text(&value));
        }
        next.imports = imports;

        let dependents = broken_importers(state, stack, &previous.outputs, &next.outputs);
        if !dependents.is_empty() {
            warn!(stack = %stack, dependents = ?dependents, "Update would change exports in use");
            return Err(DeployError::DependencyViolation {
                stack: stack.to_string(),
                dependents,
            });
        }

        if !dry_run {
            state.stacks.insert(stack.clone(), next);
        }

        Ok(ChangeSet {
            stack: stack.clone(),
            changes,
            waves,
        })
    }

    /// Create a resource and assign its provider identifiers
    fn provision(
        &self,
        state: &mut EngineState,
        decl: &ResourceDecl,
        properties: BTreeMap<String, Value>,
        created: &BTreeMap<LogicalId, DeployedResource>,
    ) -> DeployResult<DeployedResource> {
        let text = |key: &str| properties.get(key).map(as_text).unwrap_or_default();
        let mut attributes = BTreeMap::new();
        let rng = &mut state.rng;
        let hex = |rng: &mut StdRng| format!("{:016x}", rng.gen::<u64>());

        let physical_id = match decl.kind {
            ResourceKind::Network => format!("net-{}", &hex(rng)[..12]),
            ResourceKind::Subnet => format!("subnet-{}", &hex(rng)[..12]),
            ResourceKind::InternetGateway => format!("igw-{}", &hex(rng)[..12]),
            ResourceKind::RouteTable => format!("rtb-{}", &hex(rng)[..12]),
            ResourceKind::AccessGroup => format!("grp-{}", &hex(rng)[..12]),
            ResourceKind::AccessGroupRule => format!("rule-{}", &hex(rng)[..12]),
            ResourceKind::DatabaseSubnetGroup => text("name"),
            ResourceKind::Secret => {
                let id = format!("secret:{}-{}", text("name"), &hex(rng)[..6]);
                let value = match properties.get("generate") {
                    Some(generate) => serde_json::from_value::<GeneratedSecretSpec>(generate.clone())?
                        .generate(rng),
                    None => SecretValue::new(""),
                };
                state.secrets.insert(id.clone(), value);
                id
            }
            ResourceKind::SecretAttachment => {
                let secret_id = text("secret");
                let target = text("target");
                let database = created
                    .values()
                    .find(|r| r.physical_id == target)
                    .ok_or_else(|| DeployError::ProvisioningFailed {
                        stack: String::new(),
                        resource: decl.logical_id.to_string(),
                        reason: format!("attachment target {} not found", target),
                    })?;
                let fields = BTreeMap::from([
                    (
                        "host".to_string(),
                        Value::from(database.attributes.get("endpoint_address").cloned().unwrap_or_default()),
                    ),
                    (
                        "port".to_string(),
                        database.properties.get("port").cloned().unwrap_or(Value::Null),
                    ),
                    (
                        "engine".to_string(),
                        database.properties.get("engine").cloned().unwrap_or(Value::Null),
                    ),
                    (
                        "dbname".to_string(),
                        database.properties.get("database_name").cloned().unwrap_or(Value::Null),
                    ),
                ]);
                let current = state
                    .secrets
                    .get(&secret_id)
                    .ok_or_else(|| DeployError::UnknownSecret(secret_id.clone()))?;
                let merged = current.with_fields(&fields);
                state.secrets.insert(secret_id.clone(), merged);
                format!("attachment-{}", &hex(rng)[..12])
            }
            ResourceKind::Database => {
                let identifier = text("identifier");
                attributes.insert(
                    "endpoint_address".to_string(),
                    format!("{}.{}.{}.db.provider.net", identifier, &hex(rng)[..12], self.options.region),
                );
                attributes.insert("endpoint_port".to_string(), text("port"));
                identifier
            }
            ResourceKind::Cluster => text("cluster_name"),
            ResourceKind::LogGroup => text("name"),
            ResourceKind::Identity => text("name"),
            ResourceKind::TaskSpec => {
                let family = text("family");
                let revision = state.revisions.entry(family.clone()).or_insert(0);
                *revision += 1;
                format!("{}:{}", family, revision)
            }
            ResourceKind::LoadBalancer => {
                let name = text("name");
                let dns_name = match &self.options.load_balancer_hostname {
                    Some(hostname) => hostname.clone(),
                    None => {
                        let suffix: String = (0..10)
                            .map(|_| {
                                const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
                                CHARSET[rng.gen_range(0..CHARSET.len())] as char
                            })
                            .collect();
                        format!("{}-{}.{}.lb.provider.net", name, suffix, self.options.region)
                    }
                };
                let dns_name = Hostname::new(dns_name).map_err(|e| DeployError::ProvisioningFailed {
                    stack: String::new(),
                    resource: decl.logical_id.to_string(),
                    reason: format!("provider returned an unusable DNS name: {}", e),
                })?;
                attributes.insert("dns_name".to_string(), dns_name.to_string());
                format!("loadbalancer/{}/{}", name, hex(rng))
            }
            ResourceKind::TargetGroup => format!("targetgroup/{}/{}", text("name"), hex(rng)),
            ResourceKind::Listener | ResourceKind::AcceleratorListener => {
                format!("listener/{}", hex(rng))
            }
            ResourceKind::Service => {
                self.assign_service_identifier(&text("cluster"), &text("service_name"))
            }
            ResourceKind::Accelerator => {
                let id = hex(rng);
                attributes.insert("dns_name".to_string(), format!("a{}.accelerator.provider.net", id));
                format!("accelerator/{}", id)
            }
            ResourceKind::EndpointGroup => format!("endpoint-group/{}", hex(rng)),
        };

        attributes
            .entry("arn".to_string())
            .or_insert_with(|| format!("{}:{}", decl.kind, physical_id));

        Ok(DeployedResource {
            kind: decl.kind,
            physical_id,
            properties,
            attributes,
        })
    }
}

/// Simulated rollout of a changed service
fn check_rollout(
    state: &EngineState,
    stack: &StackName,
    id: &LogicalId,
    service: &DeployedResource,
    had_previous: bool,
) -> DeployResult<()> {
    let desired = service
        .properties
        .get("desired_count")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if desired == 0 || state.replicas_healthy {
        return Ok(());
    }
    let rollback = service
        .properties
        .get("circuit_breaker")
        .and_then(|cb| cb.get("rollback"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    warn!(stack = %stack, service = %id, desired, "Replicas failed health checks");
    if rollback && had_previous {
        Err(DeployError::RolledBack {
            stack: stack.to_string(),
            service: service.physical_id.clone(),
        })
    } else {
        Err(DeployError::ProvisioningFailed {
            stack: stack.to_string(),
            resource: id.to_string(),
            reason: "replicas failed health checks".to_string(),
        })
    }
}

/// Deployed stacks importing an export of `stack` whose value would change
/// or disappear
fn broken_importers(
    state: &EngineState,
    stack: &StackName,
    previous: &BTreeMap<String, String>,
    next: &BTreeMap<String, String>,
) -> Vec<String> {
    state
        .stacks
        .iter()
        .filter(|(name, _)| *name != stack)
        .filter(|(_, other)| {
            other
                .imports
                .iter()
                .any(|i| &i.stack == stack && previous.get(&i.name) != next.get(&i.name))
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

fn resolve_properties(
    decl: &ResourceDecl,
    local: &BTreeMap<LogicalId, DeployedResource>,
    stacks: &BTreeMap<StackName, DeployedStack>,
) -> Result<BTreeMap<String, Value>, String> {
    decl.properties
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve(value, local, stacks)?)))
        .collect()
}

/// Resolve a deferred value against created resources and deployed stacks
fn resolve(
    value: &PropertyValue,
    local: &BTreeMap<LogicalId, DeployedResource>,
    stacks: &BTreeMap<StackName, DeployedStack>,
) -> Result<Value, String> {
    let resource = |id: &LogicalId| {
        local
            .get(id)
            .ok_or_else(|| format!("resource {} has not been created", id))
    };
    Ok(match value {
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Int(i) => Value::from(*i),
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::List(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve(v, local, stacks))
                .collect::<Result<_, _>>()?,
        ),
        PropertyValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), resolve(v, local, stacks)?)))
                .collect::<Result<_, String>>()?,
        ),
        PropertyValue::Ref(id) => Value::String(resource(id)?.physical_id.clone()),
        PropertyValue::Attr { resource: id, attribute } => Value::String(
            resource(id)?
                .attributes
                .get(attribute)
                .cloned()
                .ok_or_else(|| format!("resource {} has no attribute {}", id, attribute))?,
        ),
        PropertyValue::Import(export) => Value::String(
            stacks
                .get(&export.stack)
                .and_then(|s| s.outputs.get(&export.name))
                .cloned()
                .ok_or_else(|| format!("export {} is not available", export))?,
        ),
        PropertyValue::Lowercase(inner) => match resolve(inner, local, stacks)? {
            Value::String(s) => Value::String(s.to_ascii_lowercase()),
            other => other,
        },
        PropertyValue::Join { separator, parts } => Value::String(
            parts
                .iter()
                .map(|p| resolve(p, local, stacks).map(|v| as_text(&v)))
                .collect::<Result<Vec<_>, _>>()?
                .join(separator),
        ),
    })
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn changed_keys(old: &BTreeMap<String, Value>, new: &BTreeMap<String, Value>) -> Vec<String> {
    old.keys()
        .chain(new.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|k| old.get(*k) != new.get(*k))
        .cloned()
        .collect()
}

#[async_trait]
impl ProvisioningEngine for InMemoryEngine {
    fn identifier_format(&self) -> IdentifierFormat {
        self.options.identifier_format
    }

    async fn plan(&self, template: &StackTemplate) -> DeployResult<ChangeSet> {
        let mut scratch = self.state.read().await.clone();
        self.converge(&mut scratch, template, true)
    }

    async fn apply(&self, template: &StackTemplate) -> DeployResult<ChangeSet> {
        let mut state = self.state.write().await;
        let mut working = state.clone();
        match self.converge(&mut working, template, false) {
            Ok(changes) => {
                *state = working;
                let summary = changes.summary();
                info!(
                    stack = %template.name,
                    created = summary.created,
                    updated = summary.updated,
                    replaced = summary.replaced,
                    deleted = summary.deleted,
                    unchanged = summary.unchanged,
                    "Stack applied"
                );
                Ok(changes)
            }
            Err(e) => {
                warn!(stack = %template.name, error = %e, "Apply failed, stack left unchanged");
                Err(e)
            }
        }
    }

    async fn destroy(&self, stack: &StackName) -> DeployResult<ChangeSet> {
        let mut state = self.state.write().await;
        let Some(deployed) = state.stacks.get(stack) else {
            debug!(stack = %stack, "Destroy of absent stack is a no-op");
            return Ok(ChangeSet::new(stack.clone()));
        };

        let dependents: Vec<String> = state
            .stacks
            .iter()
            .filter(|(name, other)| *name != stack && other.imports.iter().any(|i| &i.stack == stack))
            .map(|(name, _)| name.to_string())
            .collect();
        if !dependents.is_empty() {
            warn!(stack = %stack, dependents = ?dependents, "Teardown refused");
            return Err(DeployError::DependencyViolation {
                stack: stack.to_string(),
                dependents,
            });
        }

        if let Some((id, _)) = deployed.resources.iter().find(|(_, r)| {
            r.kind == ResourceKind::Database
                && r.properties.get("deletion_protection") == Some(&Value::Bool(true))
        }) {
            return Err(DeployError::ProvisioningFailed {
                stack: stack.to_string(),
                resource: id.to_string(),
                reason: "deletion protection is enabled".to_string(),
            });
        }

        let Some(deployed) = state.stacks.remove(stack) else {
            return Ok(ChangeSet::new(stack.clone()));
        };
        let mut changes = ChangeSet::new(stack.clone());
        for id in deployed.creation_order.iter().rev() {
            if let Some(resource) = deployed.resources.get(id) {
                if resource.kind == ResourceKind::Secret {
                    state.secrets.remove(&resource.physical_id);
                }
                changes.changes.push(ResourceChange {
                    logical_id: id.clone(),
                    kind: resource.kind,
                    action: ChangeAction::Delete,
                    changed_properties: Vec::new(),
                });
            }
        }
        info!(stack = %stack, deleted = changes.changes.len(), "Stack destroyed");
        Ok(changes)
    }

    async fn outputs(&self, stack: &StackName) -> DeployResult<BTreeMap<String, String>> {
        self.state
            .read()
            .await
            .stacks
            .get(stack)
            .map(|s| s.outputs.clone())
            .ok_or_else(|| DeployError::UnknownStack(stack.to_string()))
    }

    async fn is_deployed(&self, stack: &StackName) -> bool {
        self.state.read().await.stacks.contains_key(stack)
    }

    async fn physical_id(&self, stack: &StackName, logical_id: &str) -> DeployResult<String> {
        let state = self.state.read().await;
        let deployed = state
            .stacks
            .get(stack)
            .ok_or_else(|| DeployError::UnknownStack(stack.to_string()))?;
        deployed
            .resources
            .get(&LogicalId::from(logical_id))
            .map(|r| r.physical_id.clone())
            .ok_or_else(|| DeployError::UnknownResource {
                stack: stack.to_string(),
                resource: logical_id.to_string(),
            })
    }

    async fn put_secret_value(&self, secret_id: &str, value: SecretValue) -> DeployResult<()> {
        let mut state = self.state.write().await;
        match state.secrets.get_mut(secret_id) {
            Some(slot) => {
                *slot = value;
                info!(secret_id, "Secret value updated");
                Ok(())
            }
            None => Err(DeployError::UnknownSecret(secret_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ResourceDecl;

    fn template(cidr: &str) -> StackTemplate {
        let mut t = StackTemplate::new(StackName::from("net"), "net");
        let network = t.add(ResourceDecl::new("Network", ResourceKind::Network).with("cidr_block", cidr));
        t.add(
            ResourceDecl::new("Gateway", ResourceKind::InternetGateway)
                .with("network_id", PropertyValue::reference(&network)),
        );
        t.export("NetworkId", PropertyValue::reference(&network), "id");
        t
    }

    fn engine() -> InMemoryEngine {
        InMemoryEngine::with_options(EngineOptions::default().with_seed(42))
    }

    #[tokio::test]
    async fn test_reapply_is_no_change() {
        let engine = engine();
        let first = engine.apply(&template("10.0.0.0/16")).await.unwrap();
        assert_eq!(first.count(ChangeAction::Create), 2);

        let second = engine.apply(&template("10.0.0.0/16")).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_replacement_propagates_to_dependents() {
        let engine = engine();
        engine.apply(&template("10.0.0.0/16")).await.unwrap();
        let before = engine.outputs(&StackName::from("net")).await.unwrap();

        let changes = engine.apply(&template("10.1.0.0/16")).await.unwrap();
        assert_eq!(changes.change("Network").map(|c| c.action), Some(ChangeAction::Replace));
        assert_eq!(changes.change("Gateway").map(|c| c.action), Some(ChangeAction::Replace));

        let after = engine.outputs(&StackName::from("net")).await.unwrap();
        assert_ne!(before["NetworkId"], after["NetworkId"]);
    }

    #[tokio::test]
    async fn test_injected_failure_commits_nothing() {
        let engine = engine();
        engine.inject_failure(ResourceKind::InternetGateway).await;
        let err = engine.apply(&template("10.0.0.0/16")).await.unwrap_err();
        assert!(matches!(err, DeployError::ProvisioningFailed { resource, .. } if resource == "Gateway"));
        assert!(!engine.is_deployed(&StackName::from("net")).await);
    }

    #[tokio::test]
    async fn test_plan_does_not_commit() {
        let engine = engine();
        let plan = engine.plan(&template("10.0.0.0/16")).await.unwrap();
        assert_eq!(plan.count(ChangeAction::Create), 2);
        assert!(engine.deployed_stacks().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_producer_is_refused() {
        let engine = engine();
        let mut consumer = StackTemplate::new(StackName::from("data"), "data");
        consumer.add(ResourceDecl::new("Group", ResourceKind::AccessGroup).with(
            "network_id",
            PropertyValue::import(&ExportRef::new(StackName::from("net"), "NetworkId")),
        ));
        assert!(matches!(
            engine.apply(&consumer).await,
            Err(DeployError::DependencyNotDeployed { dependency, .. }) if dependency == "net"
        ));
    }

    fn consumer() -> StackTemplate {
        let mut consumer = StackTemplate::new(StackName::from("data"), "data");
        consumer.add(ResourceDecl::new("Group", ResourceKind::AccessGroup).with(
            "network_id",
            PropertyValue::import(&ExportRef::new(StackName::from("net"), "NetworkId")),
        ));
        consumer
    }

    #[tokio::test]
    async fn test_imported_export_cannot_change() {
        let engine = engine();
        engine.apply(&template("10.0.0.0/16")).await.unwrap();
        engine.apply(&consumer()).await.unwrap();
        let before = engine.outputs(&StackName::from("net")).await.unwrap();

        // Replacing the network would orphan the consumer's group
        let plan = engine.plan(&template("10.1.0.0/16")).await;
        assert!(matches!(
            plan,
            Err(DeployError::DependencyViolation { dependents, .. }) if dependents == vec!["data".to_string()]
        ));
        let apply = engine.apply(&template("10.1.0.0/16")).await;
        assert!(matches!(apply, Err(DeployError::DependencyViolation { .. })));
        assert_eq!(engine.outputs(&StackName::from("net")).await.unwrap(), before);

        // Unchanged exports are still fine
        assert!(engine.apply(&template("10.0.0.0/16")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_resource_is_not_unknown_stack() {
        let engine = engine();
        engine.apply(&template("10.0.0.0/16")).await.unwrap();
        assert!(matches!(
            engine.physical_id(&StackName::from("net"), "Missing").await,
            Err(DeployError::UnknownResource { stack, resource }) if stack == "net" && resource == "Missing"
        ));
        assert!(matches!(
            engine.physical_id(&StackName::from("absent"), "Network").await,
            Err(DeployError::UnknownStack(_))
        ));
    }

    #[tokio::test]
    async fn test_put_secret_value_requires_existing_secret() {
        let engine = engine();
        assert!(matches!(
            engine.put_secret_value("secret:missing", SecretValue::new("x")).await,
            Err(DeployError::UnknownSecret(_))
        ));
    }

    #[test]
    fn test_identifier_formats() {
        let v1 = engine();
        assert_eq!(
            v1.assign_service_identifier("demo-staging", "demo-staging-web"),
            "compute/service/demo-staging/demo-staging-web"
        );
        let v2 = InMemoryEngine::with_options(
            EngineOptions::default().with_identifier_format(IdentifierFormat::new(2)),
        );
        assert_ne!(
            v2.assign_service_identifier("demo-staging", "demo-staging-web"),
            "compute/service/demo-staging/demo-staging-web"
        );
    }
}
