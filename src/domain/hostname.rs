// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Object
//!
//! Load balancer and accelerator hostnames are generated by the provider and
//! may mix letter case. The application compares request origins
//! case-sensitively, so every hostname handed to the workload goes through
//! [`Hostname::canonical`] first.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Hostname is empty")]
    Empty,

    #[error("Hostname exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in hostname: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),

    #[error("Top-level label cannot be all numeric: {0}")]
    NumericLabel(String),
}

/// DNS hostname (RFC 1123)
///
/// # Invariants
/// - Total length ≤ 253 characters
/// - Each label 1..=63 characters of ASCII alphanumerics and hyphens
/// - Labels never start or end with a hyphen
/// - The last label is not all numeric
///
/// # Examples
///
/// ```rust
/// use tiered_stacks::domain::Hostname;
///
/// let host = Hostname::new("DEMO-ABC123.example-region.provider.net").unwrap();
/// assert_eq!(host.canonical().as_str(), "demo-abc123.example-region.provider.net");
/// assert!(Hostname::new("-invalid").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length for FQDN (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Create a new hostname with validation
    pub fn new(hostname: impl Into<String>) -> Result<Self, HostnameError> {
        let hostname = hostname.into();

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }

        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(hostname.len()));
        }

        for label in hostname.split('.') {
            Self::validate_label(label)?;
        }

        if let Some(last) = hostname.rsplit('.').next() {
            if last.chars().all(|c| c.is_ascii_digit()) {
                return Err(HostnameError::NumericLabel(last.to_string()));
            }
        }

        Ok(Self(hostname))
    }

    fn validate_label(label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::Empty);
        }

        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }

        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(HostnameError::InvalidCharacter(ch));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }

        Ok(())
    }

    /// Parse and canonicalize in one step
    pub fn canonicalize(hostname: impl Into<String>) -> Result<Self, HostnameError> {
        Self::new(hostname).map(|host| host.canonical())
    }

    /// Get the hostname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First label
    pub fn short_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Everything after the first dot
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, domain)| domain)
    }

    /// Lowercase form, the only form the workload ever sees
    pub fn canonical(&self) -> Self {
        Self(self.0.to_ascii_lowercase())
    }

    /// True when the hostname is already in canonical form
    pub fn is_canonical(&self) -> bool {
        !self.0.chars().any(|c| c.is_ascii_uppercase())
    }

    /// DNS names compare case-insensitively
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Hostname {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Hostname {
    type Error = HostnameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hostnames() {
        assert!(Hostname::new("localhost").is_ok());
        assert!(Hostname::new("demo-staging-1234567890.eu-west-1.elb.provider.net").is_ok());
        assert!(Hostname::new("a1b2c3.awsglobalaccelerator.com").is_ok());
    }

    #[test]
    fn test_invalid_hostnames() {
        assert!(Hostname::new("").is_err());
        assert!(Hostname::new("-lb.example.com").is_err());
        assert!(Hostname::new("lb-.example.com").is_err());
        assert!(Hostname::new("lb..example.com").is_err());
        assert!(Hostname::new("lb_1.example.com").is_err());
        assert!(Hostname::new("10.0.0.1").is_err());
    }

    #[test]
    fn test_length_limits() {
        let max_label = "a".repeat(63);
        assert!(Hostname::new(format!("{}.net", max_label)).is_ok());
        assert!(Hostname::new(format!("{}a.net", max_label)).is_err());

        let long_fqdn = format!("{}.{}.net", "a".repeat(125), "b".repeat(125));
        assert!(Hostname::new(long_fqdn).is_err());
    }

    #[test]
    fn test_load_balancer_hostname_is_lowercased() {
        let generated = Hostname::new("DEMO-ABC123.example-region.provider.net").unwrap();
        assert!(!generated.is_canonical());

        let canonical = generated.canonical();
        assert_eq!(canonical.as_str(), "demo-abc123.example-region.provider.net");
        assert!(canonical.is_canonical());
        assert!(canonical.matches("DEMO-ABC123.example-region.provider.net"));
    }

    #[test]
    fn test_hostname_parts() {
        let host = Hostname::canonicalize("Demo-Staging.Region.Provider.Net").unwrap();
        assert_eq!(host.short_name(), "demo-staging");
        assert_eq!(host.domain(), Some("region.provider.net"));
        assert_eq!(host.to_string(), "demo-staging.region.provider.net");
    }
}
