// Copyright (c) 2025 - Cowboy AI, Inc.
//! Database engine and instance class value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DefinitionError;

/// Managed relational database engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "engine", content = "major_version", rename_all = "snake_case")]
pub enum DatabaseEngine {
    Postgres(u16),
    Mysql(u16),
}

impl DatabaseEngine {
    /// Port the engine listens on
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Postgres(_) => 5432,
            DatabaseEngine::Mysql(_) => 3306,
        }
    }

    /// Administrative username stored in the credential secret
    pub fn default_username(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres(_) => "postgres",
            DatabaseEngine::Mysql(_) => "admin",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres(_) => "postgres",
            DatabaseEngine::Mysql(_) => "mysql",
        }
    }

    pub fn major_version(&self) -> u16 {
        match self {
            DatabaseEngine::Postgres(v) | DatabaseEngine::Mysql(v) => *v,
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.major_version())
    }
}

/// Instance class such as `db.t4g.micro`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceClass {
    family: String,
    size: String,
}

impl InstanceClass {
    /// Instance families with a known processor architecture
    const FAMILIES: [&'static str; 8] = ["t3", "t4g", "m5", "m6g", "m7g", "r5", "r6g", "r7g"];

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    /// ARM-based families end their generation with `g`
    pub fn is_arm(&self) -> bool {
        self.family.ends_with('g')
    }
}

impl Default for InstanceClass {
    /// `db.t4g.micro`
    fn default() -> Self {
        Self {
            family: "t4g".to_string(),
            size: "micro".to_string(),
        }
    }
}

impl FromStr for InstanceClass {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DefinitionError::UnsupportedInstanceClass {
            engine: "any engine".to_string(),
            instance_class: s.to_string(),
        };
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("db"), Some(family), Some(size), None)
                if Self::FAMILIES.contains(&family) && !size.is_empty() =>
            {
                Ok(Self {
                    family: family.to_string(),
                    size: size.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for InstanceClass {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceClass> for String {
    fn from(value: InstanceClass) -> Self {
        value.to_string()
    }
}

impl fmt::Display for InstanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db.{}.{}", self.family, self.size)
    }
}
