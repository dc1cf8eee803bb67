// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Tier
//!
//! Scaled container service behind a public load balancer.
//!
//! # Access topology
//!
//! ```text
//! internet ──tcp/public──▶ [edge group] ──tcp/service──▶ [app group] ──tcp/db──▶ database
//!                                                           │  ▲
//!                                                           └──┘ siblings, all but tcp/db
//! ```
//!
//! Every rule that leads to the database lives on the application group, so
//! the data tier never needs a reference to this stack.
//!
//! # Ordering
//!
//! The service references the listener and the target group; the task
//! definition reads the load balancer's DNS name. The engine therefore
//! creates the load balancer before any replica starts, and replicas boot
//! with their final public hostname, lowercased.

use crate::config::{ComputeProps, DeploymentConfig};
use crate::domain::invariants::{validate_health_check, validate_task_size};
use crate::domain::naming::{
    self, ACCESS_GROUP_NAME, IDENTITY_NAME, LOAD_BALANCER_NAME, LOG_GROUP_NAME, SECRET_NAME,
    TARGET_GROUP_NAME,
};
use crate::domain::{
    AccessGroupSpec, AccessRule, GeneratedSecretSpec, Peer, PortRange, Protocol, ServiceIdentifier,
};
use crate::errors::DefinitionError;
use crate::template::{
    CredentialRef, DatabaseHandle, LoadBalancerHandle, LogicalId, NetworkHandle, PropertyValue,
    ResourceDecl, ResourceKind, StackTemplate,
};

pub const EDGE_GROUP: &str = "EdgeAccessGroup";
pub const APP_GROUP: &str = "AppAccessGroup";
pub const SIGNING_KEY: &str = "SigningKey";
pub const CLUSTER_COOKIE: &str = "ClusterCookie";
pub const OAUTH_CLIENT_ID: &str = "OAuthClientId";
pub const OAUTH_CLIENT_SECRET: &str = "OAuthClientSecret";
pub const CLUSTER: &str = "Cluster";
pub const LOG_GROUP: &str = "LogGroup";
pub const EXECUTION_IDENTITY: &str = "ExecutionIdentity";
pub const TASK_IDENTITY: &str = "TaskIdentity";
pub const LOAD_BALANCER: &str = "LoadBalancer";
pub const TARGET_GROUP: &str = "TargetGroup";
pub const LISTENER: &str = "Listener";
pub const TASK_SPEC: &str = "TaskSpec";
pub const SERVICE: &str = "Service";

/// Outbound HTTPS for the image registry, secret store and log APIs
const HTTPS_PORT: u16 = 443;

/// Defined compute tier stack
#[derive(Debug, Clone)]
pub struct ComputeTier {
    template: StackTemplate,
    edge_group: AccessGroupSpec,
    app_group: AccessGroupSpec,
    service_identifier: ServiceIdentifier,
    load_balancer: LoadBalancerHandle,
    desired_count: u32,
}

impl ComputeTier {
    pub const TIER: &'static str = "compute";

    pub fn define(
        config: &DeploymentConfig,
        network: &NetworkHandle,
        credentials: &CredentialRef,
        database: &DatabaseHandle,
        props: &ComputeProps,
    ) -> Result<Self, DefinitionError> {
        validate_task_size(props.cpu, props.memory_mib)?;
        validate_health_check(&props.health_check)?;
        if !ComputeProps::LOG_RETENTION_DAYS.contains(&props.log_retention_days) {
            return Err(DefinitionError::InvalidSetting {
                setting: "log retention",
                reason: format!("{} days is not an offered period", props.log_retention_days),
            });
        }
        if props.deregistration_delay.as_secs() > 3600 {
            return Err(DefinitionError::InvalidSetting {
                setting: "deregistration delay",
                reason: format!("{}s exceeds 3600s", props.deregistration_delay.as_secs()),
            });
        }
        if props.image.is_empty() {
            return Err(DefinitionError::InvalidSetting {
                setting: "container image",
                reason: "image reference is empty".to_string(),
            });
        }

        let prefix = config.prefix();
        let service_identifier = ServiceIdentifier::predict(prefix.as_str(), format!("{}-web", prefix))?;
        let load_balancer_name = naming::checked(&LOAD_BALANCER_NAME, prefix.as_str())?;
        let target_group_name = naming::checked(&TARGET_GROUP_NAME, format!("{}-web", prefix))?;
        let log_group_name = naming::checked(&LOG_GROUP_NAME, format!("/compute/{}", prefix))?;

        let mut template = StackTemplate::new(
            config.stack_name(Self::TIER),
            format!("Web service for {}", prefix),
        );

        let edge = LogicalId::from(EDGE_GROUP);
        let app = LogicalId::from(APP_GROUP);

        let edge_group = AccessGroupSpec::empty(
            naming::checked(&ACCESS_GROUP_NAME, format!("{}-edge", prefix))?,
            "Load balancer; public listener in, service port out to the application",
        )
        .with_rule(AccessRule::inbound(
            Peer::AnyIpv4,
            Protocol::Tcp,
            PortRange::single(props.public_port),
            "Public listener",
        ))
        .with_rule(AccessRule::outbound(
            Peer::Group(app.clone()),
            Protocol::Tcp,
            PortRange::single(props.service_port),
            "Forward to application replicas",
        ));

        let app_group = AccessGroupSpec::empty(
            naming::checked(&ACCESS_GROUP_NAME, format!("{}-app", prefix))?,
            "Application replicas",
        )
        .with_rule(AccessRule::inbound(
            Peer::Group(edge.clone()),
            Protocol::Tcp,
            PortRange::single(props.service_port),
            "Traffic from the load balancer",
        ))
        .with_rule(AccessRule::inbound(
            Peer::Cidr(network.block()),
            Protocol::All,
            PortRange::all(),
            "Cluster membership inside the network",
        ))
        .with_rule(AccessRule::outbound(
            Peer::Resource(database.access_group().clone()),
            Protocol::Tcp,
            PortRange::single(database.port()),
            "Database",
        ))
        .with_rule(AccessRule::outbound(
            Peer::AnyIpv4,
            Protocol::Tcp,
            PortRange::single(HTTPS_PORT),
            "Registry, secret store and log APIs",
        ))
        .with_rule(AccessRule::outbound(
            Peer::SameGroup,
            Protocol::Udp,
            PortRange::all(),
            "Sibling replicas",
        ));
        // The database port stays reachable through the database handle only
        let app_group = PortRange::all_except(database.port())
            .into_iter()
            .fold(app_group, |group, ports| {
                group.with_rule(AccessRule::outbound(
                    Peer::SameGroup,
                    Protocol::Tcp,
                    ports,
                    "Sibling replicas",
                ))
            });

        for (id, spec) in [(&edge, &edge_group), (&app, &app_group)] {
            template.add(
                ResourceDecl::new(id.as_str(), ResourceKind::AccessGroup)
                    .with_properties(spec.properties(network.network_value()))
                    .with("allow_all_outbound", false),
            );
        }
        for (id, spec) in [(&edge, &edge_group), (&app, &app_group)] {
            for rule in spec.standalone_rules(id) {
                template.add(rule);
            }
        }

        let mut generated = Vec::new();
        for (id, suffix, length) in [
            (SIGNING_KEY, "signing-key", 64),
            (CLUSTER_COOKIE, "cluster-cookie", 64),
            (OAUTH_CLIENT_ID, "oauth-client-id", 32),
            (OAUTH_CLIENT_SECRET, "oauth-client-secret", 32),
        ] {
            let name = naming::checked(&SECRET_NAME, format!("{}/{}", prefix, suffix))?;
            generated.push(template.add(
                ResourceDecl::new(id, ResourceKind::Secret)
                    .with("name", name)
                    .with("generate", GeneratedSecretSpec::random(length).to_property()),
            ));
        }

        let cluster = template.add(
            ResourceDecl::new(CLUSTER, ResourceKind::Cluster)
                .with("cluster_name", service_identifier.cluster_name()),
        );
        let log_group = template.add(
            ResourceDecl::new(LOG_GROUP, ResourceKind::LogGroup)
                .with("name", log_group_name)
                .with("retention_days", props.log_retention_days),
        );

        let credential_secret = PropertyValue::import(credentials.secret_id());
        let bound_secrets: Vec<PropertyValue> = generated
            .iter()
            .map(PropertyValue::reference)
            .chain(std::iter::once(credential_secret.clone()))
            .collect();

        let execution = template.add(
            ResourceDecl::new(EXECUTION_IDENTITY, ResourceKind::Identity)
                .with(
                    "name",
                    naming::checked(&IDENTITY_NAME, format!("{}-execution", prefix))?,
                )
                .with("trusted_service", "tasks")
                .with(
                    "statements",
                    PropertyValue::list([
                        statement(
                            &["registry:GetAuthorizationToken", "registry:BatchGetImage", "registry:GetDownloadUrlForLayer"],
                            vec![PropertyValue::from("*")],
                        ),
                        statement(
                            &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                            vec![PropertyValue::attr(&log_group, "arn")],
                        ),
                        statement(
                            &["secrets:GetSecretValue", "secrets:DescribeSecret", "kms:Decrypt"],
                            bound_secrets,
                        ),
                    ]),
                ),
        );

        let mut task_statements = vec![
            statement(
                &["compute:ListTasks", "compute:DescribeTasks"],
                vec![PropertyValue::from("*")],
            ),
            statement(
                &["logs:CreateLogStream", "logs:PutLogEvents"],
                vec![PropertyValue::attr(&log_group, "arn")],
            ),
        ];
        if props.enable_execute_command {
            task_statements.push(statement(
                &[
                    "messages:CreateControlChannel",
                    "messages:CreateDataChannel",
                    "messages:OpenControlChannel",
                    "messages:OpenDataChannel",
                ],
                vec![PropertyValue::from("*")],
            ));
        }
        let task_identity = template.add(
            ResourceDecl::new(TASK_IDENTITY, ResourceKind::Identity)
                .with("name", naming::checked(&IDENTITY_NAME, format!("{}-task", prefix))?)
                .with("trusted_service", "tasks")
                .with("statements", PropertyValue::List(task_statements)),
        );

        let load_balancer = template.add(
            ResourceDecl::new(LOAD_BALANCER, ResourceKind::LoadBalancer)
                .with("name", load_balancer_name)
                .with("scheme", "internet-facing")
                .with("subnets", network.public_subnet_values())
                .with("access_groups", PropertyValue::list([PropertyValue::reference(&edge)])),
        );
        let check = &props.health_check;
        let target_group = template.add(
            ResourceDecl::new(TARGET_GROUP, ResourceKind::TargetGroup)
                .with("name", target_group_name)
                .with("port", props.service_port)
                .with("protocol", "http")
                .with("target_type", "ip")
                .with("network_id", network.network_value())
                .with(
                    "health_check",
                    PropertyValue::map([
                        ("path", PropertyValue::from(check.path.as_str())),
                        ("interval_seconds", PropertyValue::Int(check.interval.as_secs() as i64)),
                        ("timeout_seconds", PropertyValue::Int(check.timeout.as_secs() as i64)),
                        ("healthy_threshold", PropertyValue::from(check.healthy_threshold)),
                        ("unhealthy_threshold", PropertyValue::from(check.unhealthy_threshold)),
                    ]),
                )
                .with(
                    "deregistration_delay_seconds",
                    PropertyValue::Int(props.deregistration_delay.as_secs() as i64),
                ),
        );
        let listener = template.add(
            ResourceDecl::new(LISTENER, ResourceKind::Listener)
                .with("load_balancer", PropertyValue::reference(&load_balancer))
                .with("port", props.public_port)
                .with("protocol", "http")
                .with("default_target_group", PropertyValue::reference(&target_group)),
        );

        let public_host = PropertyValue::lowercase(PropertyValue::attr(&load_balancer, "dns_name"));
        let environment = PropertyValue::map([
            ("PUBLIC_HOST", public_host.clone()),
            ("PORT", PropertyValue::from(props.service_port.to_string())),
            ("POOL_SIZE", PropertyValue::from(props.pool_size.to_string())),
            ("CLUSTER_NAME", PropertyValue::from(service_identifier.cluster_name())),
            ("SERVICE_NAME", PropertyValue::from(service_identifier.service_name())),
            ("SERVICE_IDENTIFIER", PropertyValue::from(service_identifier.to_string())),
            ("DATABASE_NAME", PropertyValue::from(database.database_name())),
        ]);
        let field = |key: &str| {
            PropertyValue::map([
                ("secret", credential_secret.clone()),
                ("field", PropertyValue::from(key)),
            ])
        };
        let whole = |id: &LogicalId| PropertyValue::map([("secret", PropertyValue::reference(id))]);
        let secrets = PropertyValue::map([
            ("DATABASE_HOST", field("host")),
            ("DATABASE_PORT", field("port")),
            ("DATABASE_USERNAME", field("username")),
            ("DATABASE_PASSWORD", field("password")),
            ("SIGNING_KEY", whole(&generated[0])),
            ("CLUSTER_COOKIE", whole(&generated[1])),
            ("OAUTH_CLIENT_ID", whole(&generated[2])),
            ("OAUTH_CLIENT_SECRET", whole(&generated[3])),
        ]);

        let task_spec = template.add(
            ResourceDecl::new(TASK_SPEC, ResourceKind::TaskSpec)
                .with("family", service_identifier.service_name())
                .with("cpu", props.cpu)
                .with("memory_mib", props.memory_mib)
                .with("execution_identity", PropertyValue::reference(&execution))
                .with("task_identity", PropertyValue::reference(&task_identity))
                .with(
                    "container",
                    PropertyValue::map([
                        ("image", PropertyValue::from(props.image.as_str())),
                        ("port", PropertyValue::from(props.service_port)),
                        ("log_group", PropertyValue::reference(&log_group)),
                        ("environment", environment),
                        ("secrets", secrets),
                    ]),
                ),
        );

        template.add(
            ResourceDecl::new(SERVICE, ResourceKind::Service)
                .with("cluster", PropertyValue::reference(&cluster))
                .with("service_name", service_identifier.service_name())
                .with("launch_type", "serverless")
                .with("task_definition", PropertyValue::reference(&task_spec))
                .with("desired_count", props.desired_count)
                .with("subnets", network.public_subnet_values())
                .with("assign_public_ip", true)
                .with("access_groups", PropertyValue::list([PropertyValue::reference(&app)]))
                .with(
                    "load_balancer",
                    PropertyValue::map([
                        ("target_group", PropertyValue::reference(&target_group)),
                        ("container_port", PropertyValue::from(props.service_port)),
                    ]),
                )
                .with(
                    "circuit_breaker",
                    PropertyValue::map([
                        ("enable", PropertyValue::Bool(true)),
                        ("rollback", PropertyValue::Bool(props.circuit_breaker_rollback)),
                    ]),
                )
                .with("enable_execute_command", props.enable_execute_command)
                .depends_on(&listener),
        );

        let load_balancer_id = template.export(
            "LoadBalancerId",
            PropertyValue::reference(&load_balancer),
            "Load balancer identifier",
        );
        let hostname = template.export(
            "LoadBalancerHostname",
            public_host,
            "Lowercased load balancer DNS name",
        );
        template.export(
            "ServiceId",
            PropertyValue::reference(&LogicalId::from(SERVICE)),
            "Provider-assigned service identifier",
        );
        template.validate()?;

        Ok(Self {
            template,
            edge_group,
            app_group,
            service_identifier,
            load_balancer: LoadBalancerHandle::new(
                load_balancer_id,
                hostname,
                props.public_port,
                props.health_check.clone(),
            ),
            desired_count: props.desired_count,
        })
    }

    /// Same definition with a different replica count
    ///
    /// Only the service's `desired_count` changes, which engines apply in
    /// place; the task definition keeps its revision.
    pub fn scaled(&self, desired_count: u32) -> Self {
        let mut scaled = self.clone();
        if let Some(service) = scaled
            .template
            .resources
            .iter_mut()
            .find(|r| r.logical_id.as_str() == SERVICE)
        {
            service
                .properties
                .insert("desired_count".to_string(), PropertyValue::from(desired_count));
        }
        scaled.desired_count = desired_count;
        scaled
    }

    pub fn template(&self) -> &StackTemplate {
        &self.template
    }

    pub fn edge_group(&self) -> &AccessGroupSpec {
        &self.edge_group
    }

    pub fn app_group(&self) -> &AccessGroupSpec {
        &self.app_group
    }

    /// Identifier injected into replicas before the service exists
    pub fn service_identifier(&self) -> &ServiceIdentifier {
        &self.service_identifier
    }

    pub fn load_balancer(&self) -> &LoadBalancerHandle {
        &self.load_balancer
    }

    pub fn desired_count(&self) -> u32 {
        self.desired_count
    }

    /// Placeholder secrets an operator fills after the first deploy
    pub fn oauth_secrets(&self) -> [LogicalId; 2] {
        [LogicalId::from(OAUTH_CLIENT_ID), LogicalId::from(OAUTH_CLIENT_SECRET)]
    }
}

fn statement(actions: &[&str], resources: Vec<PropertyValue>) -> PropertyValue {
    PropertyValue::map([
        (
            "actions",
            PropertyValue::list(actions.iter().map(|a| PropertyValue::from(*a))),
        ),
        ("resources", PropertyValue::List(resources)),
    ])
}
