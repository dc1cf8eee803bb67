// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployer
//!
//! Operator surface over a defined deployment. The deployer owns the stack
//! definitions and the validated graph, drives the engine in graph order,
//! tracks each stack's lifecycle and publishes one event per operation.
//!
//! # Operation Flow
//!
//! ```text
//! deploy_all:   network → data → compute → traffic   (stops at first failure)
//! teardown_all: traffic → compute → data → network   (stops at first refusal)
//! ```
//!
//! Each stack operation:
//! 1. Checks preconditions (dependencies deployed, identifier format)
//! 2. Calls the engine
//! 3. Records the lifecycle transition
//! 4. Publishes a [`DeploymentEvent`]
//!
//! Lifecycle and publishing failures after a failed engine call are logged,
//! so the engine error is the one returned.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DeploymentConfig, StackProps};
use crate::domain::{Hostname, SecretValue};
use crate::engine::{ChangeSet, ProvisioningEngine};
use crate::errors::{DeployError, DeployResult};
use crate::events::DeploymentEvent;
use crate::graph::DeploymentGraph;
use crate::lifecycle::{StackCommand, StackStatus, StateMachineWithHistory, Transition};
use crate::nats::EventPublisher;
use crate::stacks::{define_all, DeploymentStacks};
use crate::subjects::Operation;
use crate::template::StackName;

type Lifecycle = StateMachineWithHistory<StackStatus>;

/// Drives a deployment through a provisioning engine
pub struct Deployer<E: ProvisioningEngine, P: EventPublisher> {
    config: DeploymentConfig,
    stacks: DeploymentStacks,
    graph: DeploymentGraph,
    engine: Arc<E>,
    publisher: Arc<P>,
    lifecycles: BTreeMap<StackName, Lifecycle>,
}

impl<E: ProvisioningEngine, P: EventPublisher> Deployer<E, P> {
    /// Define every stack and validate the graph; no engine call is made
    pub fn new(
        config: DeploymentConfig,
        props: &StackProps,
        engine: Arc<E>,
        publisher: Arc<P>,
    ) -> DeployResult<Self> {
        let stacks = define_all(&config, props)?;
        Self::from_stacks(config, stacks, engine, publisher)
    }

    /// Define every stack and align each lifecycle with what the engine
    /// already runs, for an operator session against a live deployment
    pub async fn connect(
        config: DeploymentConfig,
        props: &StackProps,
        engine: Arc<E>,
        publisher: Arc<P>,
    ) -> DeployResult<Self> {
        let mut deployer = Self::new(config, props, engine, publisher)?;
        deployer.sync_with_engine().await?;
        Ok(deployer)
    }

    pub fn from_stacks(
        config: DeploymentConfig,
        stacks: DeploymentStacks,
        engine: Arc<E>,
        publisher: Arc<P>,
    ) -> DeployResult<Self> {
        let graph = DeploymentGraph::from_stacks(&stacks)?;
        let lifecycles = graph
            .order()
            .iter()
            .map(|name| (name.clone(), Lifecycle::new(StackStatus::Planned)))
            .collect();
        Ok(Self {
            config,
            stacks,
            graph,
            engine,
            publisher,
            lifecycles,
        })
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn stacks(&self) -> &DeploymentStacks {
        &self.stacks
    }

    pub fn graph(&self) -> &DeploymentGraph {
        &self.graph
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn status(&self, stack: &StackName) -> Option<StackStatus> {
        self.lifecycles.get(stack).map(|l| *l.current_state())
    }

    /// Accepted lifecycle transitions of one stack, oldest first
    pub fn history(&self, stack: &StackName) -> &[Transition<StackStatus, StackCommand>] {
        self.lifecycles
            .get(stack)
            .map(Lifecycle::history)
            .unwrap_or(&[])
    }

    /// Record stacks the engine runs as deployed, and stacks it no longer
    /// runs as destroyed
    pub async fn sync_with_engine(&mut self) -> DeployResult<()> {
        for stack in self.graph.order().to_vec() {
            let deployed = self.engine.is_deployed(&stack).await;
            let current = self.status(&stack).unwrap_or(StackStatus::Planned);
            let command = match (deployed, current) {
                (true, StackStatus::Deployed) | (false, StackStatus::Planned) => continue,
                (false, StackStatus::Failed | StackStatus::Destroyed) => continue,
                (true, _) => StackCommand::Apply,
                (false, StackStatus::Deployed) => StackCommand::Destroy,
            };
            let status = self.record(&stack, command)?;
            info!(stack = %stack, from = %current, to = %status, "Lifecycle aligned with engine");
        }
        Ok(())
    }

    fn compute_stack(&self) -> &StackName {
        &self.stacks.compute().template().name
    }

    /// Changes `deploy_stack` would make
    pub async fn plan_stack(&self, stack: &StackName) -> DeployResult<ChangeSet> {
        let template = self
            .graph
            .template(stack)
            .ok_or_else(|| DeployError::UnknownStack(stack.to_string()))?;
        self.engine.plan(template).await
    }

    /// Deploy every stack in dependency order, stopping at the first failure
    pub async fn deploy_all(&mut self) -> DeployResult<Vec<ChangeSet>> {
        let correlation_id = Uuid::now_v7();
        let mut parent: Option<DeploymentEvent> = None;
        let mut applied = Vec::new();

        info!(
            stage = %self.config.stage,
            stacks = self.graph.order().len(),
            "Deploying all stacks"
        );
        for stack in self.graph.order().to_vec() {
            let (changes, event) = self
                .apply_stack(&stack, Operation::Deployed, correlation_id, parent.as_ref())
                .await?;
            applied.push(changes);
            parent = Some(event);
        }
        Ok(applied)
    }

    /// Deploy one stack whose dependencies are already deployed
    pub async fn deploy_stack(&mut self, stack: &StackName) -> DeployResult<ChangeSet> {
        let (changes, _) = self
            .apply_stack(stack, Operation::Deployed, Uuid::now_v7(), None)
            .await?;
        Ok(changes)
    }

    /// Tear every stack down in reverse dependency order
    pub async fn teardown_all(&mut self) -> DeployResult<Vec<ChangeSet>> {
        let correlation_id = Uuid::now_v7();
        let mut parent: Option<DeploymentEvent> = None;
        let mut destroyed = Vec::new();

        info!(stage = %self.config.stage, "Tearing down all stacks");
        for stack in self.graph.teardown_order() {
            let (changes, event) = self
                .destroy_stack(&stack, correlation_id, parent.as_ref())
                .await?;
            destroyed.push(changes);
            parent = Some(event);
        }
        Ok(destroyed)
    }

    /// Tear one stack down
    ///
    /// # Errors
    ///
    /// `DependencyViolation` while a deployed stack still imports from it;
    /// nothing is deleted in that case.
    pub async fn teardown_stack(&mut self, stack: &StackName) -> DeployResult<ChangeSet> {
        let (changes, _) = self.destroy_stack(stack, Uuid::now_v7(), None).await?;
        Ok(changes)
    }

    /// Resolved exports of a deployed stack
    pub async fn outputs(&self, stack: &StackName) -> DeployResult<BTreeMap<String, String>> {
        self.engine.outputs(stack).await
    }

    /// Hostname clients should use: the accelerator's when the traffic
    /// router is defined, else the lowercased load balancer hostname
    pub async fn public_hostname(&self) -> DeployResult<Hostname> {
        let export = match self.stacks.traffic() {
            Some(traffic) => traffic.hostname().hostname().clone(),
            None => self.stacks.compute().load_balancer().hostname().clone(),
        };
        let outputs = self.engine.outputs(&export.stack).await?;
        let value = outputs.get(&export.name).ok_or_else(|| DeployError::ProvisioningFailed {
            stack: export.stack.to_string(),
            resource: export.name.clone(),
            reason: "export missing from deployed stack".to_string(),
        })?;
        Ok(Hostname::canonicalize(value.as_str())?)
    }

    /// Re-apply the compute stack with a new desired count
    ///
    /// Only the service changes, in place. If the engine rejects or rolls
    /// back the change, the previous definition is kept.
    pub async fn scale_service(&mut self, desired_count: u32) -> DeployResult<ChangeSet> {
        let compute = self.compute_stack().clone();
        if !self.engine.is_deployed(&compute).await {
            return Err(DeployError::NotDeployed(compute.to_string()));
        }

        let previous_stacks = self.stacks.clone();
        let previous_graph = self.graph.clone();
        let from = self.stacks.compute().desired_count();

        self.stacks.scale_compute(desired_count);
        let result = match self.graph.replace(self.stacks.compute().template().clone()) {
            Ok(()) => {
                self.apply_stack(&compute, Operation::Scaled, Uuid::now_v7(), None)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok((changes, _)) => {
                info!(from, to = desired_count, "Service scaled");
                Ok(changes)
            }
            Err(e) => {
                self.stacks = previous_stacks;
                self.graph = previous_graph;
                Err(e)
            }
        }
    }

    /// Write the OAuth client id and secret into their placeholder secrets
    pub async fn populate_oauth_credentials(
        &mut self,
        client_id: SecretValue,
        client_secret: SecretValue,
    ) -> DeployResult<()> {
        let stack = self.compute_stack().clone();
        let [id_secret, secret_secret] = self.stacks.compute().oauth_secrets();

        for (logical_id, value) in [(id_secret, client_id), (secret_secret, client_secret)] {
            let secret_id = self.engine.physical_id(&stack, logical_id.as_str()).await?;
            self.engine.put_secret_value(&secret_id, value).await?;
            info!(stack = %stack, secret = %logical_id, "Placeholder credential written");
        }

        let status = self.status(&stack).unwrap_or(StackStatus::Planned);
        let event = DeploymentEvent::new(
            self.config.stage.clone(),
            stack,
            Operation::CredentialsPopulated,
            status,
            Uuid::now_v7(),
        );
        self.publisher.publish(&event).await
    }

    async fn apply_stack(
        &mut self,
        stack: &StackName,
        operation: Operation,
        correlation_id: Uuid,
        parent: Option<&DeploymentEvent>,
    ) -> DeployResult<(ChangeSet, DeploymentEvent)> {
        let template = self
            .graph
            .template(stack)
            .cloned()
            .ok_or_else(|| DeployError::UnknownStack(stack.to_string()))?;

        if stack == self.compute_stack() {
            let expected = self.stacks.compute().service_identifier().format();
            let actual = self.engine.identifier_format();
            if expected != actual {
                warn!(stack = %stack, %expected, %actual, "Identifier format mismatch");
                return Err(DeployError::IdentifierFormatMismatch {
                    expected: expected.version(),
                    actual: actual.version(),
                });
            }
        }

        for dependency in self.graph.dependencies(stack) {
            if !self.engine.is_deployed(&dependency).await {
                return Err(DeployError::DependencyNotDeployed {
                    stack: stack.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        match self.engine.apply(&template).await {
            Ok(changes) => {
                let status = self.record(stack, StackCommand::Apply)?;
                let event = self
                    .event(stack, operation, status, correlation_id, parent)
                    .with_changes(changes.summary());
                self.publisher.publish(&event).await?;
                Ok((changes, event))
            }
            Err(e) => {
                let (command, failed_operation) = match e {
                    DeployError::RolledBack { .. } => (StackCommand::RollBack, Operation::RolledBack),
                    _ => (StackCommand::Fail, Operation::DeployFailed),
                };
                let status = match self.record(stack, command) {
                    Ok(status) => status,
                    Err(record_error) => {
                        warn!(stack = %stack, error = %record_error, "Lifecycle not updated");
                        self.status(stack).unwrap_or(StackStatus::Planned)
                    }
                };
                let event = self
                    .event(stack, failed_operation, status, correlation_id, parent)
                    .with_detail(e.to_string());
                if let Err(publish_error) = self.publisher.publish(&event).await {
                    warn!(stack = %stack, error = %publish_error, "Failed to publish event");
                }
                Err(e)
            }
        }
    }

    async fn destroy_stack(
        &mut self,
        stack: &StackName,
        correlation_id: Uuid,
        parent: Option<&DeploymentEvent>,
    ) -> DeployResult<(ChangeSet, DeploymentEvent)> {
        if !self.lifecycles.contains_key(stack) {
            return Err(DeployError::UnknownStack(stack.to_string()));
        }

        match self.engine.destroy(stack).await {
            Ok(changes) => {
                let status = self.record(stack, StackCommand::Destroy)?;
                let event = self
                    .event(stack, Operation::TornDown, status, correlation_id, parent)
                    .with_changes(changes.summary());
                self.publisher.publish(&event).await?;
                Ok((changes, event))
            }
            Err(e) => {
                let status = self.status(stack).unwrap_or(StackStatus::Planned);
                let event = self
                    .event(stack, Operation::TeardownFailed, status, correlation_id, parent)
                    .with_detail(e.to_string());
                if let Err(publish_error) = self.publisher.publish(&event).await {
                    warn!(stack = %stack, error = %publish_error, "Failed to publish event");
                }
                Err(e)
            }
        }
    }

    fn record(&mut self, stack: &StackName, command: StackCommand) -> DeployResult<StackStatus> {
        let lifecycle = self
            .lifecycles
            .get_mut(stack)
            .ok_or_else(|| DeployError::UnknownStack(stack.to_string()))?;
        let output = lifecycle.transition_with_history(command, Utc::now())?;
        for warning in &output.warnings {
            if output.is_critical {
                warn!(stack = %stack, "{}", warning);
            } else {
                info!(stack = %stack, "{}", warning);
            }
        }
        Ok(*lifecycle.current_state())
    }

    fn event(
        &self,
        stack: &StackName,
        operation: Operation,
        status: StackStatus,
        correlation_id: Uuid,
        parent: Option<&DeploymentEvent>,
    ) -> DeploymentEvent {
        let event = DeploymentEvent::new(
            self.config.stage.clone(),
            stack.clone(),
            operation,
            status,
            correlation_id,
        );
        match parent {
            Some(parent) => event.caused_by(parent),
            None => event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, InMemoryEngine};
    use crate::nats::RecordingPublisher;

    fn deployer() -> (Deployer<InMemoryEngine, RecordingPublisher>, Arc<RecordingPublisher>) {
        let engine = Arc::new(InMemoryEngine::with_options(EngineOptions::default().with_seed(7)));
        let publisher = Arc::new(RecordingPublisher::new());
        let deployer = Deployer::new(
            DeploymentConfig::default(),
            &StackProps::default(),
            engine,
            publisher.clone(),
        )
        .unwrap();
        (deployer, publisher)
    }

    #[tokio::test]
    async fn test_deploy_all_chains_events() {
        let (mut deployer, publisher) = deployer();
        deployer.deploy_all().await.unwrap();

        let events = publisher.events().await;
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.correlation_id == events[0].correlation_id));
        assert_eq!(events[1].causation_id, Some(events[0].event_id));
        assert_eq!(events[2].causation_id, Some(events[1].event_id));

        for name in deployer.graph().order() {
            assert_eq!(deployer.status(name), Some(StackStatus::Deployed));
        }
    }

    #[tokio::test]
    async fn test_deploy_stack_requires_dependencies() {
        let (mut deployer, publisher) = deployer();
        let compute = StackName::from("demo-staging-compute");
        let err = deployer.deploy_stack(&compute).await.unwrap_err();
        assert!(matches!(err, DeployError::DependencyNotDeployed { .. }));
        assert_eq!(deployer.status(&compute), Some(StackStatus::Planned));
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_stack() {
        let (mut deployer, _) = deployer();
        assert!(matches!(
            deployer.teardown_stack(&StackName::from("nope")).await,
            Err(DeployError::UnknownStack(_))
        ));
    }

    #[tokio::test]
    async fn test_identifier_format_mismatch_stops_compute() {
        let engine = Arc::new(InMemoryEngine::with_options(
            EngineOptions::default().with_identifier_format(crate::domain::IdentifierFormat::new(2)),
        ));
        let mut deployer = Deployer::new(
            DeploymentConfig::default(),
            &StackProps::default(),
            engine.clone(),
            Arc::new(RecordingPublisher::new()),
        )
        .unwrap();

        let err = deployer.deploy_all().await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::IdentifierFormatMismatch { expected: 1, actual: 2 }
        ));
        assert!(engine.is_deployed(&StackName::from("demo-staging-data")).await);
        assert!(!engine.is_deployed(&StackName::from("demo-staging-compute")).await);
    }
}
