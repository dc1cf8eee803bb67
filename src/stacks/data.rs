// Copyright (c) 2025 - Cowboy AI, Inc.
//! Data tier
//!
//! Managed database in the private subnets, bound to an access group with no
//! rules at all. The data tier never names the application: whoever needs
//! the database declares an outbound rule on its own group.

use std::collections::BTreeMap;

use crate::config::{DataProps, DeploymentConfig};
use crate::domain::invariants::validate_instance_class;
use crate::domain::naming::{self, ACCESS_GROUP_NAME, DATABASE_IDENTIFIER, DATABASE_NAME, SECRET_NAME};
use crate::domain::{AccessGroupSpec, GeneratedSecretSpec};
use crate::errors::DefinitionError;
use crate::template::{
    CredentialRef, DatabaseHandle, NetworkHandle, PropertyValue, ResourceDecl, ResourceKind,
    StackTemplate,
};

pub const ACCESS_GROUP: &str = "DatabaseAccessGroup";
pub const SUBNET_GROUP: &str = "DatabaseSubnetGroup";
pub const CREDENTIALS: &str = "DatabaseCredentials";
pub const DATABASE: &str = "Database";
pub const CREDENTIALS_ATTACHMENT: &str = "DatabaseCredentialsAttachment";

/// Defined data tier stack
#[derive(Debug, Clone)]
pub struct DataTier {
    template: StackTemplate,
    access_group: AccessGroupSpec,
    database: DatabaseHandle,
    credentials: CredentialRef,
}

impl DataTier {
    pub const TIER: &'static str = "data";

    pub fn define(
        config: &DeploymentConfig,
        network: &NetworkHandle,
        props: &DataProps,
    ) -> Result<Self, DefinitionError> {
        validate_instance_class(props.engine, &props.instance_class)?;
        if props.password_length < 8 || props.password_length > 128 {
            return Err(DefinitionError::InvalidSetting {
                setting: "password length",
                reason: format!("{} outside 8..=128", props.password_length),
            });
        }
        if !(20..=65536).contains(&props.allocated_storage_gib) {
            return Err(DefinitionError::InvalidSetting {
                setting: "allocated storage",
                reason: format!("{} GiB outside 20..=65536", props.allocated_storage_gib),
            });
        }

        let prefix = config.prefix();
        let identifier = naming::checked(&DATABASE_IDENTIFIER, format!("{}-db", prefix))?;
        let database_name = naming::checked(
            &DATABASE_NAME,
            props
                .database_name
                .clone()
                .unwrap_or_else(|| config.default_database_name()),
        )?;
        let secret_name = naming::checked(&SECRET_NAME, format!("{}/database-credentials", prefix))?;
        let group_name = naming::checked(&ACCESS_GROUP_NAME, format!("{}-database", prefix))?;
        let port = props.effective_port();

        let mut template = StackTemplate::new(
            config.stack_name(Self::TIER),
            format!("Managed {} database for {}", props.engine, prefix),
        );

        let access_group = AccessGroupSpec::empty(
            group_name,
            "Database; peers declare their own outbound access",
        );
        let group = template.add(
            ResourceDecl::new(ACCESS_GROUP, ResourceKind::AccessGroup)
                .with_properties(access_group.properties(network.network_value()))
                .with("allow_all_outbound", false),
        );

        let subnet_group = template.add(
            ResourceDecl::new(SUBNET_GROUP, ResourceKind::DatabaseSubnetGroup)
                .with("name", format!("{}-database", prefix))
                .with("subnet_ids", network.private_subnet_values()),
        );

        let credentials_spec = GeneratedSecretSpec::templated(
            props.password_length,
            BTreeMap::from([("username".to_string(), props.effective_username())]),
            "password",
        );
        let secret = template.add(
            ResourceDecl::new(CREDENTIALS, ResourceKind::Secret)
                .with("name", secret_name)
                .with("generate", credentials_spec.to_property()),
        );

        let database = template.add(
            ResourceDecl::new(DATABASE, ResourceKind::Database)
                .with("identifier", identifier)
                .with("engine", props.engine.name())
                .with("engine_version", u32::from(props.engine.major_version()))
                .with("instance_class", props.instance_class.to_string())
                .with("port", port)
                .with("database_name", database_name.as_str())
                .with("allocated_storage_gib", props.allocated_storage_gib)
                .with("multi_az", props.multi_az)
                .with("deletion_protection", props.deletion_protection)
                .with("publicly_accessible", false)
                .with("subnet_group", PropertyValue::reference(&subnet_group))
                .with("access_groups", PropertyValue::list([PropertyValue::reference(&group)]))
                .with("credentials_secret", PropertyValue::reference(&secret)),
        );

        template.add(
            ResourceDecl::new(CREDENTIALS_ATTACHMENT, ResourceKind::SecretAttachment)
                .with("secret", PropertyValue::reference(&secret))
                .with("target", PropertyValue::reference(&database)),
        );

        let instance_id = template.export(
            "DatabaseId",
            PropertyValue::reference(&database),
            "Database instance identifier",
        );
        let endpoint = template.export(
            "DatabaseEndpoint",
            PropertyValue::attr(&database, "endpoint_address"),
            "Database endpoint address",
        );
        template.export("DatabasePort", PropertyValue::from(port), "Database port");
        let group_export = template.export(
            "DatabaseAccessGroupId",
            PropertyValue::reference(&group),
            "Access group bound to the database",
        );
        let secret_export = template.export(
            "DatabaseSecretId",
            PropertyValue::reference(&secret),
            "Identifier of the credential secret",
        );
        template.validate()?;

        Ok(Self {
            template,
            access_group,
            database: DatabaseHandle::new(
                instance_id,
                endpoint,
                group_export,
                port,
                props.engine,
                database_name,
            ),
            credentials: CredentialRef::new(secret_export),
        })
    }

    pub fn template(&self) -> &StackTemplate {
        &self.template
    }

    /// Rules on the database group (there are none)
    pub fn access_group(&self) -> &AccessGroupSpec {
        &self.access_group
    }

    pub fn database(&self) -> &DatabaseHandle {
        &self.database
    }

    pub fn credentials(&self) -> &CredentialRef {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkProps;
    use crate::domain::DatabaseEngine;
    use crate::stacks::NetworkFoundation;

    fn network() -> NetworkFoundation {
        NetworkFoundation::define(&DeploymentConfig::default(), &NetworkProps::default()).unwrap()
    }

    #[test]
    fn test_database_group_has_no_rules() {
        let network = network();
        let data =
            DataTier::define(&DeploymentConfig::default(), network.handle(), &DataProps::default())
                .unwrap();

        assert!(data.access_group().rules.is_empty());
        let group = data.template().resource(ACCESS_GROUP).unwrap();
        assert_eq!(group.property("ingress"), Some(&PropertyValue::List(vec![])));
        assert_eq!(group.property("egress"), Some(&PropertyValue::List(vec![])));
        assert_eq!(group.property("allow_all_outbound"), Some(&PropertyValue::Bool(false)));
    }

    #[test]
    fn test_exports_identifier_not_value() {
        let network = network();
        let data =
            DataTier::define(&DeploymentConfig::default(), network.handle(), &DataProps::default())
                .unwrap();

        assert_eq!(data.credentials().secret_id().name, "DatabaseSecretId");
        assert_eq!(data.database().port(), 5432);
        assert_eq!(data.database().database_name(), "demo");

        let secret = data.template().resource(CREDENTIALS).unwrap();
        let generate = secret.property("generate").unwrap();
        assert_eq!(generate.get("length"), Some(&PropertyValue::Int(30)));
        assert_eq!(
            generate.get("template").and_then(|t| t.get("username")),
            Some(&PropertyValue::from("postgres"))
        );
        assert!(data.template().dependencies().contains(network.handle().stack()));
    }

    #[test]
    fn test_database_in_private_subnets() {
        let network = network();
        let data =
            DataTier::define(&DeploymentConfig::default(), network.handle(), &DataProps::default())
                .unwrap();
        let subnet_group = data.template().resource(SUBNET_GROUP).unwrap();
        let expected = PropertyValue::list(
            network
                .handle()
                .private_subnets()
                .iter()
                .map(PropertyValue::import),
        );
        assert_eq!(subnet_group.property("subnet_ids"), Some(&expected));
    }

    #[test]
    fn test_invalid_engine_instance_combination() {
        let network = network();
        let props = DataProps::default().with_engine(DatabaseEngine::Postgres(11));
        assert!(matches!(
            DataTier::define(&DeploymentConfig::default(), network.handle(), &props),
            Err(DefinitionError::UnsupportedInstanceClass { .. })
        ));
    }
}
