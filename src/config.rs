// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment configuration
//!
//! [`DeploymentConfig`] carries the naming inputs (account, region, stage,
//! application name). The per-tier props carry tunables with defaults.
//! None of it carries secret material.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::domain::naming;
use crate::domain::{DatabaseEngine, HealthCheck, InstanceClass};
use crate::errors::{DeployError, DeployResult, DefinitionError};
use crate::template::StackName;

/// Naming inputs shared by every stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub account: String,
    pub region: String,
    pub stage: String,
    pub app_name: String,
}

impl DeploymentConfig {
    /// Build and validate a configuration
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        stage: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let config = Self {
            account: account.into(),
            region: region.into(),
            stage: stage.into(),
            app_name: app_name.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// `DEPLOY_ACCOUNT`, `DEPLOY_REGION`, `DEPLOY_STAGE` and `APP_NAME`, each
    /// with a local default.
    pub fn from_env() -> DeployResult<Self> {
        let account =
            std::env::var("DEPLOY_ACCOUNT").unwrap_or_else(|_| "000000000000".to_string());
        let region = std::env::var("DEPLOY_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let stage = std::env::var("DEPLOY_STAGE").unwrap_or_else(|_| "staging".to_string());
        let app_name = std::env::var("APP_NAME").unwrap_or_else(|_| "demo".to_string());

        Self::new(account, region, stage, app_name).map_err(|e| {
            DeployError::Configuration(format!("invalid deployment environment: {}", e))
        })
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        naming::validate_label("stage", &self.stage)?;
        naming::validate_label("application name", &self.app_name)?;
        naming::validate_label("region", &self.region)?;
        if self.account.is_empty() || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(DefinitionError::InvalidName {
                what: "account",
                name: self.account.clone(),
                reason: "must be a non-empty string of digits".to_string(),
            });
        }
        Ok(())
    }

    /// `{app}-{stage}`, the root of every generated name
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.app_name, self.stage)
    }

    /// `{app}-{stage}-{tier}`
    pub fn stack_name(&self, tier: &str) -> StackName {
        StackName::new(format!("{}-{}", self.prefix(), tier))
    }

    /// Default database name: application name with underscores
    pub fn default_database_name(&self) -> String {
        self.app_name.replace('-', "_")
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            account: "000000000000".to_string(),
            region: "us-east-1".to_string(),
            stage: "staging".to_string(),
            app_name: "demo".to_string(),
        }
    }
}

/// Network foundation tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProps {
    pub block: Ipv4Network,
    pub zone_count: usize,
    pub subnet_prefix: u8,
}

impl Default for NetworkProps {
    fn default() -> Self {
        Self {
            block: Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 0), 16)
                .unwrap_or_else(|_| Ipv4Network::from(Ipv4Addr::new(10, 0, 0, 0))),
            zone_count: 2,
            subnet_prefix: 24,
        }
    }
}

impl NetworkProps {
    pub fn with_block(mut self, block: Ipv4Network) -> Self {
        self.block = block;
        self
    }

    pub fn with_zone_count(mut self, zone_count: usize) -> Self {
        self.zone_count = zone_count;
        self
    }

    pub fn with_subnet_prefix(mut self, subnet_prefix: u8) -> Self {
        self.subnet_prefix = subnet_prefix;
        self
    }
}

/// Data tier tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProps {
    pub engine: DatabaseEngine,
    pub instance_class: InstanceClass,
    /// Listener port; the engine default when unset
    pub port: Option<u16>,
    /// Initial database; derived from the application name when unset
    pub database_name: Option<String>,
    /// Administrative user; the engine default when unset
    pub username: Option<String>,
    pub password_length: usize,
    pub allocated_storage_gib: u32,
    pub multi_az: bool,
    pub deletion_protection: bool,
}

impl Default for DataProps {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::Postgres(16),
            instance_class: InstanceClass::default(),
            port: None,
            database_name: None,
            username: None,
            password_length: 30,
            allocated_storage_gib: 20,
            multi_az: false,
            deletion_protection: false,
        }
    }
}

impl DataProps {
    pub fn with_engine(mut self, engine: DatabaseEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_instance_class(mut self, instance_class: InstanceClass) -> Self {
        self.instance_class = instance_class;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn with_deletion_protection(mut self, enabled: bool) -> Self {
        self.deletion_protection = enabled;
        self
    }

    pub fn with_multi_az(mut self, enabled: bool) -> Self {
        self.multi_az = enabled;
        self
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    pub fn effective_username(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.engine.default_username().to_string())
    }
}

/// Compute tier tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeProps {
    pub image: String,
    pub cpu: u32,
    pub memory_mib: u32,
    /// Port the application listens on inside the task
    pub service_port: u16,
    /// Port the load balancer listens on
    pub public_port: u16,
    /// Zero provisions the infrastructure without workload
    pub desired_count: u32,
    pub pool_size: u32,
    pub health_check: HealthCheck,
    #[serde(with = "seconds")]
    pub deregistration_delay: Duration,
    pub log_retention_days: u32,
    /// Interactive-session channel actions on the runtime identity
    pub enable_execute_command: bool,
    pub circuit_breaker_rollback: bool,
}

impl Default for ComputeProps {
    fn default() -> Self {
        Self {
            image: "registry.local/app:latest".to_string(),
            cpu: 256,
            memory_mib: 512,
            service_port: 4000,
            public_port: 80,
            desired_count: 0,
            pool_size: 10,
            health_check: HealthCheck::default(),
            deregistration_delay: Duration::from_secs(30),
            log_retention_days: 7,
            enable_execute_command: true,
            circuit_breaker_rollback: true,
        }
    }
}

impl ComputeProps {
    /// Retention periods the log service accepts
    pub const LOG_RETENTION_DAYS: [u32; 12] = [1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365];

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_task_size(mut self, cpu: u32, memory_mib: u32) -> Self {
        self.cpu = cpu;
        self.memory_mib = memory_mib;
        self
    }

    pub fn with_service_port(mut self, port: u16) -> Self {
        self.service_port = port;
        self
    }

    pub fn with_public_port(mut self, port: u16) -> Self {
        self.public_port = port;
        self
    }

    pub fn with_desired_count(mut self, desired_count: u32) -> Self {
        self.desired_count = desired_count;
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = health_check;
        self
    }

    pub fn with_log_retention_days(mut self, days: u32) -> Self {
        self.log_retention_days = days;
        self
    }

    pub fn with_execute_command(mut self, enabled: bool) -> Self {
        self.enable_execute_command = enabled;
        self
    }
}

/// Traffic router tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficProps {
    pub endpoint_weight: u8,
    #[serde(with = "seconds")]
    pub health_check_interval: Duration,
    pub threshold_count: u32,
}

impl Default for TrafficProps {
    fn default() -> Self {
        Self {
            endpoint_weight: 128,
            health_check_interval: Duration::from_secs(30),
            threshold_count: 3,
        }
    }
}

/// Props for every tier; `traffic: None` omits the traffic router
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackProps {
    pub network: NetworkProps,
    pub data: DataProps,
    pub compute: ComputeProps,
    pub traffic: Option<TrafficProps>,
}

impl StackProps {
    pub fn with_network(mut self, network: NetworkProps) -> Self {
        self.network = network;
        self
    }

    pub fn with_data(mut self, data: DataProps) -> Self {
        self.data = data;
        self
    }

    pub fn with_compute(mut self, compute: ComputeProps) -> Self {
        self.compute = compute;
        self
    }

    pub fn with_traffic_router(mut self, traffic: Option<TrafficProps>) -> Self {
        self.traffic = traffic;
        self
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_prefix_and_stack_names() {
        let config = DeploymentConfig::new("123456789012", "eu-west-1", "staging", "demo").unwrap();
        assert_eq!(config.prefix(), "demo-staging");
        assert_eq!(config.stack_name("network").as_str(), "demo-staging-network");
    }

    #[test_case("Staging", "demo" ; "uppercase stage")]
    #[test_case("staging", "my_app" ; "underscore in app")]
    #[test_case("", "demo" ; "empty stage")]
    #[test_case("staging", "-demo" ; "leading hyphen")]
    fn test_invalid_labels(stage: &str, app: &str) {
        assert!(DeploymentConfig::new("123456789012", "eu-west-1", stage, app).is_err());
    }

    #[test]
    fn test_account_must_be_digits() {
        assert!(DeploymentConfig::new("acct", "eu-west-1", "staging", "demo").is_err());
    }

    #[test]
    fn test_defaults() {
        let data = DataProps::default();
        assert_eq!(data.effective_port(), 5432);
        assert_eq!(data.effective_username(), "postgres");
        assert_eq!(data.instance_class.to_string(), "db.t4g.micro");

        let compute = ComputeProps::default();
        assert_eq!(compute.desired_count, 0);
        assert_eq!(compute.deregistration_delay, Duration::from_secs(30));

        assert_eq!(NetworkProps::default().block.to_string(), "10.0.0.0/16");
        assert!(StackProps::default().traffic.is_none());
        assert_eq!(
            DeploymentConfig::default().default_database_name(),
            "demo"
        );
    }
}
