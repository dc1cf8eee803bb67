// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event publishing for deployment operations
//!
//! [`EventPublisher`] is the seam the deployer publishes through.
//! [`NatsEventPublisher`] sends JSON events to NATS; [`RecordingPublisher`]
//! keeps them in memory for tests and dry runs.

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{DeployError, DeployResult};
use crate::events::DeploymentEvent;

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "tiered-stacks".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl NatsConfig {
    /// Read `NATS_URL` (comma separated) and `NATS_CLIENT_NAME`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            servers: std::env::var("NATS_URL")
                .map(|urls| urls.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.servers),
            name: std::env::var("NATS_CLIENT_NAME").unwrap_or(defaults.name),
            ..defaults
        }
    }
}

/// Destination for deployment events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DeploymentEvent) -> DeployResult<()>;
}

/// Publishes events as JSON on their deployment subject
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: Client,
}

impl NatsEventPublisher {
    pub async fn connect(config: NatsConfig) -> DeployResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &DeploymentEvent) -> DeployResult<()> {
        let subject = event.subject();
        let payload = serde_json::to_vec(event)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;

        debug!("Published event to subject: {}", subject);
        Ok(())
    }
}

/// Keeps published events in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<DeploymentEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far, oldest first
    pub async fn events(&self) -> Vec<DeploymentEvent> {
        self.events.lock().await.clone()
    }

    pub async fn subjects(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(DeploymentEvent::subject)
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DeploymentEvent) -> DeployResult<()> {
        debug!(subject = %event.subject(), "Recorded event");
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::StackStatus;
    use crate::subjects::Operation;
    use crate::template::StackName;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_recording_publisher_keeps_order() {
        let publisher = RecordingPublisher::new();
        let correlation = Uuid::now_v7();
        for (stack, operation) in [("a", Operation::Deployed), ("b", Operation::DeployFailed)] {
            let event = DeploymentEvent::new(
                "dev",
                StackName::from(stack),
                operation,
                StackStatus::Deployed,
                correlation,
            );
            publisher.publish(&event).await.unwrap();
        }

        assert_eq!(
            publisher.subjects().await,
            vec!["deployment.dev.a.deployed", "deployment.dev.b.deploy_failed"]
        );

        let shared = publisher.clone();
        shared.clear().await;
        assert!(publisher.events().await.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = NatsConfig::default();
        assert_eq!(config.servers, vec!["nats://localhost:4222".to_string()]);
        assert_eq!(config.name, "tiered-stacks");
    }
}
