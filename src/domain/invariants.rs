// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Definition-time Invariants
//!
//! Every function here is pure and runs before any engine call. A failure is
//! a [`DefinitionError`] and aborts the whole deployment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::database::{DatabaseEngine, InstanceClass};
use crate::errors::DefinitionError;

/// Target group / accelerator health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    #[serde(with = "seconds")]
    pub interval: Duration,
    #[serde(with = "seconds")]
    pub timeout: Duration,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            healthy_threshold: 2,
            unhealthy_threshold: 3,
        }
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

/// Validate a health check
///
/// # Rules
/// - Path is absolute
/// - Interval 5..=300 s, timeout 2..=120 s
/// - Interval strictly greater than timeout
/// - Thresholds 2..=10
pub fn validate_health_check(check: &HealthCheck) -> Result<(), DefinitionError> {
    let invalid = |msg: String| -> Result<(), DefinitionError> {
        Err(DefinitionError::InvalidHealthCheck(msg))
    };

    if !check.path.starts_with('/') {
        return invalid(format!("path '{}' must start with '/'", check.path));
    }
    let interval = check.interval.as_secs();
    let timeout = check.timeout.as_secs();
    if !(5..=300).contains(&interval) {
        return invalid(format!("interval {}s outside 5..=300", interval));
    }
    if !(2..=120).contains(&timeout) {
        return invalid(format!("timeout {}s outside 2..=120", timeout));
    }
    if interval <= timeout {
        return invalid(format!(
            "interval {}s must be greater than timeout {}s",
            interval, timeout
        ));
    }
    for (name, value) in [
        ("healthy threshold", check.healthy_threshold),
        ("unhealthy threshold", check.unhealthy_threshold),
    ] {
        if !(2..=10).contains(&value) {
            return invalid(format!("{} {} outside 2..=10", name, value));
        }
    }
    Ok(())
}

/// Validate an engine / instance class combination
///
/// # Rules
/// - ARM instance families need postgres ≥ 12 or mysql ≥ 8
/// - Engine versions older than postgres 11 / mysql 5 are not offered
pub fn validate_instance_class(
    engine: DatabaseEngine,
    instance_class: &InstanceClass,
) -> Result<(), DefinitionError> {
    let unsupported = || DefinitionError::UnsupportedInstanceClass {
        engine: engine.to_string(),
        instance_class: instance_class.to_string(),
    };

    let (oldest, oldest_on_arm) = match engine {
        DatabaseEngine::Postgres(_) => (11, 12),
        DatabaseEngine::Mysql(_) => (5, 8),
    };
    if engine.major_version() < oldest {
        return Err(unsupported());
    }
    if instance_class.is_arm() && engine.major_version() < oldest_on_arm {
        return Err(unsupported());
    }
    Ok(())
}

/// Validate container resource limits
///
/// # Rules
/// - cpu units one of 256, 512, 1024, 2048, 4096
/// - memory within 2x..=8x cpu units (MiB), and at least 512
pub fn validate_task_size(cpu: u32, memory_mib: u32) -> Result<(), DefinitionError> {
    const CPU: [u32; 5] = [256, 512, 1024, 2048, 4096];
    let invalid = |reason: &str| {
        DefinitionError::InvalidTaskSize(format!("{} cpu / {} MiB: {}", cpu, memory_mib, reason))
    };
    if !CPU.contains(&cpu) {
        return Err(invalid("cpu must be one of 256, 512, 1024, 2048, 4096"));
    }
    if memory_mib < 512 || memory_mib < cpu * 2 || memory_mib > cpu * 8 {
        return Err(invalid("memory must be 2x to 8x cpu units and at least 512 MiB"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_health_check_is_valid() {
        assert!(validate_health_check(&HealthCheck::default()).is_ok());
    }

    #[test]
    fn test_interval_must_exceed_timeout() {
        let check = HealthCheck {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(10),
            ..HealthCheck::default()
        };
        assert!(matches!(
            validate_health_check(&check),
            Err(DefinitionError::InvalidHealthCheck(msg)) if msg.contains("greater than timeout")
        ));
    }

    #[test]
    fn test_health_check_path_and_thresholds() {
        let relative = HealthCheck {
            path: "health".to_string(),
            ..HealthCheck::default()
        };
        assert!(validate_health_check(&relative).is_err());

        let lax = HealthCheck {
            unhealthy_threshold: 11,
            ..HealthCheck::default()
        };
        assert!(validate_health_check(&lax).is_err());
    }

    #[test]
    fn test_instance_class_combinations() {
        let graviton: InstanceClass = "db.t4g.micro".parse().unwrap();
        let intel: InstanceClass = "db.t3.micro".parse().unwrap();

        assert!(validate_instance_class(DatabaseEngine::Postgres(16), &graviton).is_ok());
        assert!(validate_instance_class(DatabaseEngine::Postgres(11), &intel).is_ok());
        assert!(validate_instance_class(DatabaseEngine::Postgres(11), &graviton).is_err());
        assert!(validate_instance_class(DatabaseEngine::Mysql(5), &graviton).is_err());
        assert!(validate_instance_class(DatabaseEngine::Postgres(9), &intel).is_err());
    }

    #[test]
    fn test_instance_class_parsing() {
        assert!("db.t4g.micro".parse::<InstanceClass>().is_ok());
        assert!("t4g.micro".parse::<InstanceClass>().is_err());
        assert!("db.x9.micro".parse::<InstanceClass>().is_err());
        assert_eq!(
            "db.r6g.large".parse::<InstanceClass>().unwrap().to_string(),
            "db.r6g.large"
        );
    }

    #[test]
    fn test_task_size() {
        assert!(validate_task_size(256, 512).is_ok());
        assert!(validate_task_size(512, 1024).is_ok());
        assert!(validate_task_size(300, 1024).is_err());
        assert!(validate_task_size(256, 4096).is_err());
    }
}
