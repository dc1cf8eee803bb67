// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider naming constraints
//!
//! Every resource name this crate chooses itself is checked here at
//! definition time. A name the provider would reject is a fatal
//! [`DefinitionError::InvalidName`], raised before any engine call.

use crate::errors::DefinitionError;

/// Naming rule for one resource class
#[derive(Debug, Clone, Copy)]
pub struct NameRule {
    pub what: &'static str,
    pub max_len: usize,
    pub allowed: fn(char) -> bool,
    pub must_start_with_letter: bool,
    pub hyphen_edges_allowed: bool,
    pub double_hyphen_allowed: bool,
}

fn alnum_hyphen(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn alnum_hyphen_underscore(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn alnum_underscore(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lower_alnum_hyphen(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn secret_chars(c: char) -> bool {
    c.is_ascii_alphanumeric() || "/_+=.@-".contains(c)
}

fn identity_chars(c: char) -> bool {
    c.is_ascii_alphanumeric() || "+=,.@_-".contains(c)
}

fn log_group_chars(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-/.#".contains(c)
}

/// Compute clusters and services: identifier prediction depends on these
pub const CLUSTER_NAME: NameRule = NameRule {
    what: "compute cluster",
    max_len: 255,
    allowed: alnum_hyphen_underscore,
    must_start_with_letter: false,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const SERVICE_NAME: NameRule = NameRule {
    what: "service",
    ..CLUSTER_NAME
};

pub const LOAD_BALANCER_NAME: NameRule = NameRule {
    what: "load balancer",
    max_len: 32,
    allowed: alnum_hyphen,
    must_start_with_letter: false,
    hyphen_edges_allowed: false,
    double_hyphen_allowed: true,
};

pub const TARGET_GROUP_NAME: NameRule = NameRule {
    what: "target group",
    ..LOAD_BALANCER_NAME
};

pub const DATABASE_IDENTIFIER: NameRule = NameRule {
    what: "database instance",
    max_len: 63,
    allowed: alnum_hyphen,
    must_start_with_letter: true,
    hyphen_edges_allowed: false,
    double_hyphen_allowed: false,
};

pub const DATABASE_NAME: NameRule = NameRule {
    what: "database name",
    max_len: 63,
    allowed: alnum_underscore,
    must_start_with_letter: true,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const SECRET_NAME: NameRule = NameRule {
    what: "secret",
    max_len: 512,
    allowed: secret_chars,
    must_start_with_letter: false,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const IDENTITY_NAME: NameRule = NameRule {
    what: "identity",
    max_len: 64,
    allowed: identity_chars,
    must_start_with_letter: false,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const ACCESS_GROUP_NAME: NameRule = NameRule {
    what: "access group",
    max_len: 255,
    allowed: alnum_hyphen_underscore,
    must_start_with_letter: false,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const LOG_GROUP_NAME: NameRule = NameRule {
    what: "log group",
    max_len: 512,
    allowed: log_group_chars,
    must_start_with_letter: false,
    hyphen_edges_allowed: true,
    double_hyphen_allowed: true,
};

pub const ACCELERATOR_NAME: NameRule = NameRule {
    what: "accelerator",
    max_len: 64,
    allowed: alnum_hyphen,
    must_start_with_letter: false,
    hyphen_edges_allowed: false,
    double_hyphen_allowed: true,
};

/// Check `name` against `rule`
pub fn validate(rule: &NameRule, name: &str) -> Result<(), DefinitionError> {
    let invalid = |reason: String| DefinitionError::InvalidName {
        what: rule.what,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty".to_string()));
    }
    if name.len() > rule.max_len {
        return Err(invalid(format!(
            "{} characters exceeds the limit of {}",
            name.len(),
            rule.max_len
        )));
    }
    if let Some(c) = name.chars().find(|c| !(rule.allowed)(*c)) {
        return Err(invalid(format!("character '{}' is not allowed", c)));
    }
    if rule.must_start_with_letter && !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(invalid("must start with a letter".to_string()));
    }
    if !rule.hyphen_edges_allowed && (name.starts_with('-') || name.ends_with('-')) {
        return Err(invalid("cannot start or end with a hyphen".to_string()));
    }
    if !rule.double_hyphen_allowed && name.contains("--") {
        return Err(invalid("cannot contain consecutive hyphens".to_string()));
    }
    Ok(())
}

/// Validate and return an owned name
pub fn checked(rule: &NameRule, name: impl Into<String>) -> Result<String, DefinitionError> {
    let name = name.into();
    validate(rule, &name)?;
    Ok(name)
}

/// Stage labels and application names: lowercase, letter first, hyphens inside
pub fn validate_label(what: &'static str, label: &str) -> Result<(), DefinitionError> {
    let rule = NameRule {
        what,
        max_len: 24,
        allowed: lower_alnum_hyphen,
        must_start_with_letter: true,
        hyphen_edges_allowed: false,
        double_hyphen_allowed: false,
    };
    validate(&rule, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&LOAD_BALANCER_NAME, "demo-staging" ; "short load balancer")]
    #[test_case(&CLUSTER_NAME, "demo_staging-1" ; "cluster with underscore")]
    #[test_case(&DATABASE_IDENTIFIER, "demo-staging-db" ; "database identifier")]
    #[test_case(&SECRET_NAME, "demo/staging/db-credentials" ; "secret path")]
    #[test_case(&LOG_GROUP_NAME, "/demo/staging/web" ; "log group path")]
    fn accepts(rule: &NameRule, name: &str) {
        assert!(validate(rule, name).is_ok());
    }

    #[test_case(&LOAD_BALANCER_NAME, "a-very-long-application-name-staging" ; "load balancer too long")]
    #[test_case(&LOAD_BALANCER_NAME, "demo-" ; "trailing hyphen")]
    #[test_case(&DATABASE_IDENTIFIER, "1demo" ; "database starts with digit")]
    #[test_case(&DATABASE_IDENTIFIER, "demo--db" ; "double hyphen")]
    #[test_case(&CLUSTER_NAME, "demo cluster" ; "space in cluster")]
    #[test_case(&SERVICE_NAME, "" ; "empty service")]
    fn rejects(rule: &NameRule, name: &str) {
        assert!(matches!(
            validate(rule, name),
            Err(DefinitionError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_labels() {
        assert!(validate_label("stage", "staging").is_ok());
        assert!(validate_label("stage", "Staging").is_err());
        assert!(validate_label("app", "2fast").is_err());
    }
}
