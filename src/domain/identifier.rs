// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service identifier prediction
//!
//! Replicas enumerate their siblings through the cluster-introspection API,
//! which needs the fully-qualified identifier of the service they belong to
//! at process start. The provider builds that identifier from a stable
//! template once the service exists:
//!
//! ```text
//! <resource-type>/service/<cluster-name>/<service-name>
//! ```
//!
//! Because the cluster and service names are caller-assigned, the identifier
//! can be reconstructed before the service is created and injected into the
//! task environment at definition time. The template is versioned; engines
//! report the version they assign with so a silent format change is caught
//! before deploy instead of as a discovery failure at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::naming::{self, CLUSTER_NAME, SERVICE_NAME};
use crate::errors::DefinitionError;

/// Resource-type prefix of service identifiers
pub const SERVICE_RESOURCE_TYPE: &str = "compute";

/// Version of the identifier template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierFormat(u32);

impl IdentifierFormat {
    /// `<resource-type>/service/<cluster>/<service>`
    pub const V1: IdentifierFormat = IdentifierFormat(1);

    /// Format this crate predicts with
    pub const CURRENT: IdentifierFormat = Self::V1;

    pub fn new(version: u32) -> Self {
        Self(version)
    }

    pub fn version(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IdentifierFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Fully-qualified service identifier, known before the service exists
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceIdentifier {
    cluster: String,
    service: String,
}

impl ServiceIdentifier {
    /// Predict the identifier the provider will assign
    ///
    /// # Errors
    /// Names the provider would reject, because auto-generated replacements
    /// would make the prediction wrong.
    pub fn predict(
        cluster: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let cluster = naming::checked(&CLUSTER_NAME, cluster)?;
        let service = naming::checked(&SERVICE_NAME, service)?;
        Ok(Self { cluster, service })
    }

    /// Parse an identifier in the current format
    pub fn parse(identifier: &str) -> Option<Self> {
        let rest = identifier.strip_prefix(SERVICE_RESOURCE_TYPE)?;
        let rest = rest.strip_prefix("/service/")?;
        let (cluster, service) = rest.split_once('/')?;
        Self::predict(cluster, service).ok()
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn format(&self) -> IdentifierFormat {
        IdentifierFormat::CURRENT
    }
}

impl fmt::Display for ServiceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/service/{}/{}",
            SERVICE_RESOURCE_TYPE, self.cluster, self.service
        )
    }
}
