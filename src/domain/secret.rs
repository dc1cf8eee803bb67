// Copyright (c) 2025 - Cowboy AI, Inc.
//! Secrets: generation specs and opaque values
//!
//! Configuration only ever carries a secret's identifier or the recipe the
//! engine uses to generate it. Values exist inside the engine's credential
//! store and inside the running task; [`SecretValue`] never prints them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::template::PropertyValue;

/// Punctuation excluded from generated values
///
/// The database engine's credential parser and connection URIs choke on these.
pub const EXCLUDED_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Recipe for a value the engine generates at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSecretSpec {
    /// Length of the generated part
    pub length: usize,
    pub exclude_punctuation: bool,
    /// JSON object fields stored alongside the generated value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub template: BTreeMap<String, String>,
    /// Field that receives the generated value when `template` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_key: Option<String>,
}

impl GeneratedSecretSpec {
    /// Plain random string
    pub fn random(length: usize) -> Self {
        Self {
            length,
            exclude_punctuation: true,
            template: BTreeMap::new(),
            generate_key: None,
        }
    }

    /// JSON document with fixed fields plus one generated field
    pub fn templated(
        length: usize,
        template: BTreeMap<String, String>,
        generate_key: impl Into<String>,
    ) -> Self {
        Self {
            length,
            exclude_punctuation: true,
            template,
            generate_key: Some(generate_key.into()),
        }
    }

    /// Produce a fresh value; only engines call this
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> SecretValue {
        let generated = random_string(rng, self.length, self.exclude_punctuation);
        match &self.generate_key {
            Some(key) => {
                let mut document: serde_json::Map<String, serde_json::Value> = self
                    .template
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                document.insert(key.clone(), serde_json::Value::String(generated));
                SecretValue::new(serde_json::Value::Object(document).to_string())
            }
            None => SecretValue::new(generated),
        }
    }

    pub fn to_property(&self) -> PropertyValue {
        let mut entries = vec![
            ("length", PropertyValue::Int(self.length as i64)),
            (
                "exclude_punctuation",
                PropertyValue::Bool(self.exclude_punctuation),
            ),
        ];
        if let Some(key) = &self.generate_key {
            entries.push(("generate_key", PropertyValue::from(key.as_str())));
            entries.push((
                "template",
                PropertyValue::Map(
                    self.template
                        .iter()
                        .map(|(k, v)| (k.clone(), PropertyValue::from(v.as_str())))
                        .collect(),
                ),
            ));
        }
        PropertyValue::map(entries)
    }
}

fn random_string<R: Rng + ?Sized>(rng: &mut R, length: usize, exclude_punctuation: bool) -> String {
    const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let charset: Vec<u8> = if exclude_punctuation {
        ALPHANUMERIC.to_vec()
    } else {
        ALPHANUMERIC
            .iter()
            .chain(EXCLUDED_PUNCTUATION.as_bytes())
            .copied()
            .collect()
    };
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Secret material
///
/// `Debug` and `Display` are redacted; the only way to the plain value is
/// [`SecretValue::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Read one field of a JSON secret document
    pub fn field(&self, name: &str) -> Option<String> {
        let document: serde_json::Value = serde_json::from_str(&self.0).ok()?;
        match document.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Merge fields into a JSON secret document
    pub fn with_fields(&self, fields: &BTreeMap<String, serde_json::Value>) -> Self {
        let mut document = match serde_json::from_str::<serde_json::Value>(&self.0) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        for (k, v) in fields {
            document.insert(k.clone(), v.clone());
        }
        Self(serde_json::Value::Object(document).to_string())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_values_exclude_punctuation() {
        let mut rng = StdRng::seed_from_u64(7);
        let value = GeneratedSecretSpec::random(64).generate(&mut rng);
        assert_eq!(value.expose().len(), 64);
        assert!(value.expose().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_templated_secret() {
        let mut rng = StdRng::seed_from_u64(7);
        let spec = GeneratedSecretSpec::templated(
            30,
            BTreeMap::from([("username".to_string(), "postgres".to_string())]),
            "password",
        );
        let value = spec.generate(&mut rng);
        assert_eq!(value.field("username").as_deref(), Some("postgres"));
        assert_eq!(value.field("password").map(|p| p.len()), Some(30));
    }

    #[test]
    fn test_value_is_redacted() {
        let value = SecretValue::new("hunter2");
        assert_eq!(format!("{:?}", value), "SecretValue(***)");
        assert_eq!(value.to_string(), "***");
    }

    #[test]
    fn test_with_fields_merges() {
        let value = SecretValue::new(r#"{"username":"postgres","password":"x"}"#);
        let merged = value.with_fields(&BTreeMap::from([
            ("host".to_string(), serde_json::json!("db.internal")),
            ("port".to_string(), serde_json::json!(5432)),
        ]));
        assert_eq!(merged.field("host").as_deref(), Some("db.internal"));
        assert_eq!(merged.field("port").as_deref(), Some("5432"));
        assert_eq!(merged.field("password").as_deref(), Some("x"));
    }
}
