//! Integrations: embedded exporters scraped into a shared remote write.

use super::metrics::{remote_write_args, DiscoveryRelabelArgs, MetricsRelabelArgs, ScrapeArgs};
use super::metrics::REMOTE_WRITE;
use super::{Config, RemoteWriteConfig};
use crate::builder::{BlockOf, ComponentKind, Reference, Secret};
use crate::common::http::{BasicAuth, BasicAuthArgs, TlsArgs, TlsConfig};
use crate::common::relabel::{self, set_label_rule, RelabelConfig};
use crate::common::TargetsExpr;
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::label::label_for_parts;
use crate::state::{Staged, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const LABEL_PREFIX: &str = "integrations";

/// Settings every integration accepts next to its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntegrationCommon {
    pub enabled: Option<bool>,
    pub instance: Option<String>,
    pub scrape_integration: Option<bool>,
    pub scrape_interval: Option<Duration>,
    pub scrape_timeout: Option<Duration>,
    pub relabel_configs: Vec<RelabelConfig>,
    pub metric_relabel_configs: Vec<RelabelConfig>,
}

/// The `integrations` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub scrape_integrations: Option<bool>,
    pub prometheus_remote_write: Vec<RemoteWriteConfig>,
    pub azure_exporter: Option<AzureConfig>,
    pub dnsmasq_exporter: Option<DnsmasqConfig>,
    pub elasticsearch_exporter: Option<ElasticsearchConfig>,
    pub github_exporter: Option<GithubConfig>,
    pub memcached_exporter: Option<MemcachedConfig>,
    pub mongodb_exporter: Option<MongodbConfig>,
    pub mssql: Option<MssqlConfig>,
    pub oracledb: Option<OracledbConfig>,
    pub postgres_exporter: Option<PostgresConfig>,
    pub snowflake: Option<SnowflakeConfig>,
    pub squid: Option<SquidConfig>,
    pub vsphere: Option<VsphereConfig>,
    /// Integrations with no converted counterpart.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

/// An exporter integration with its own argument block.
trait Integration {
    /// Key under `integrations`.
    const CONFIG_NAME: &'static str;
    /// Last segment of `prometheus.exporter.<name>`.
    const EXPORTER: &'static str;
    type Args: Serialize;

    fn common(&self) -> &IntegrationCommon;
    fn to_args(&self) -> Self::Args;
}

macro_rules! integration {
    ($config:ty, $name:literal, $exporter:literal, $args:ty) => {
        impl Integration for $config {
            const CONFIG_NAME: &'static str = $name;
            const EXPORTER: &'static str = $exporter;
            type Args = $args;

            fn common(&self) -> &IntegrationCommon {
                &self.common
            }

            fn to_args(&self) -> $args {
                <$args>::from(self)
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub subscriptions: Vec<String>,
    pub resource_graph_query_filter: Option<String>,
    pub resource_type: Option<String>,
    pub metrics: Vec<String>,
    pub metric_aggregations: Vec<String>,
    pub timespan: Option<String>,
    pub included_dimensions: Vec<String>,
    pub included_resource_tags: Vec<String>,
    pub metric_namespace: Option<String>,
    pub metric_name_template: Option<String>,
    pub metric_help_template: Option<String>,
    pub azure_cloud_environment: Option<String>,
    pub validate_dimensions: Option<bool>,
    pub regions: Vec<String>,
}

#[derive(Serialize)]
struct AzureArgs {
    subscriptions: Vec<String>,
    resource_graph_query_filter: Option<String>,
    resource_type: Option<String>,
    metrics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metric_aggregations: Vec<String>,
    timespan: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included_dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included_resource_tags: Vec<String>,
    metric_namespace: Option<String>,
    metric_name_template: Option<String>,
    metric_help_template: Option<String>,
    azure_cloud_environment: Option<String>,
    validate_dimensions: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    regions: Vec<String>,
}

impl From<&AzureConfig> for AzureArgs {
    fn from(c: &AzureConfig) -> Self {
        AzureArgs {
            subscriptions: c.subscriptions.clone(),
            resource_graph_query_filter: c.resource_graph_query_filter.clone(),
            resource_type: c.resource_type.clone(),
            metrics: c.metrics.clone(),
            metric_aggregations: c.metric_aggregations.clone(),
            timespan: c.timespan.clone(),
            included_dimensions: c.included_dimensions.clone(),
            included_resource_tags: c.included_resource_tags.clone(),
            metric_namespace: c.metric_namespace.clone(),
            metric_name_template: c.metric_name_template.clone(),
            metric_help_template: c.metric_help_template.clone(),
            azure_cloud_environment: c.azure_cloud_environment.clone(),
            validate_dimensions: c.validate_dimensions,
            regions: c.regions.clone(),
        }
    }
}

integration!(AzureConfig, "azure_exporter", "azure", AzureArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsmasqConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub dnsmasq_address: Option<String>,
    pub leases_path: Option<String>,
    pub expose_leases: Option<bool>,
}

#[derive(Serialize)]
struct DnsmasqArgs {
    address: Option<String>,
    leases_file: Option<String>,
    expose_leases: Option<bool>,
}

impl From<&DnsmasqConfig> for DnsmasqArgs {
    fn from(c: &DnsmasqConfig) -> Self {
        DnsmasqArgs {
            address: c.dnsmasq_address.clone(),
            leases_file: c.leases_path.clone(),
            expose_leases: c.expose_leases,
        }
    }
}

integration!(DnsmasqConfig, "dnsmasq_exporter", "dnsmasq", DnsmasqArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub address: Option<String>,
    pub timeout: Option<Duration>,
    pub all: Option<bool>,
    pub node: Option<String>,
    pub indices: Option<bool>,
    pub indices_settings: Option<bool>,
    pub cluster_settings: Option<bool>,
    pub shards: Option<bool>,
    pub include_aliases: Option<bool>,
    pub snapshots: Option<bool>,
    pub clusterinfo_interval: Option<Duration>,
    pub ca: Option<String>,
    pub client_private_key: Option<String>,
    pub client_cert: Option<String>,
    pub ssl_skip_verify: Option<bool>,
    pub data_stream: Option<bool>,
    pub slm: Option<bool>,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Serialize)]
struct ElasticsearchArgs {
    address: Option<String>,
    timeout: Option<Duration>,
    all: Option<bool>,
    node: Option<String>,
    indices: Option<bool>,
    indices_settings: Option<bool>,
    cluster_settings: Option<bool>,
    shards: Option<bool>,
    aliases: Option<bool>,
    snapshots: Option<bool>,
    clusterinfo_interval: Option<Duration>,
    ca: Option<String>,
    client_private_key: Option<String>,
    client_cert: Option<String>,
    ssl_skip_verify: Option<bool>,
    data_stream: Option<bool>,
    slm: Option<bool>,
    basic_auth: Option<BlockOf<BasicAuthArgs>>,
}

impl From<&ElasticsearchConfig> for ElasticsearchArgs {
    fn from(c: &ElasticsearchConfig) -> Self {
        ElasticsearchArgs {
            address: c.address.clone(),
            timeout: c.timeout,
            all: c.all,
            node: c.node.clone(),
            indices: c.indices,
            indices_settings: c.indices_settings,
            cluster_settings: c.cluster_settings,
            shards: c.shards,
            aliases: c.include_aliases,
            snapshots: c.snapshots,
            clusterinfo_interval: c.clusterinfo_interval,
            ca: c.ca.clone(),
            client_private_key: c.client_private_key.clone(),
            client_cert: c.client_cert.clone(),
            ssl_skip_verify: c.ssl_skip_verify,
            data_stream: c.data_stream,
            slm: c.slm,
            basic_auth: c.basic_auth.as_ref().map(BasicAuth::to_args),
        }
    }
}

integration!(ElasticsearchConfig, "elasticsearch_exporter", "elasticsearch", ElasticsearchArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub api_url: Option<String>,
    pub repositories: Vec<String>,
    pub organizations: Vec<String>,
    pub users: Vec<String>,
    pub api_token: Option<Secret>,
    pub api_token_file: Option<String>,
}

#[derive(Serialize)]
struct GithubArgs {
    api_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    repositories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    organizations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    users: Vec<String>,
    api_token: Option<Secret>,
    api_token_file: Option<String>,
}

impl From<&GithubConfig> for GithubArgs {
    fn from(c: &GithubConfig) -> Self {
        GithubArgs {
            api_url: c.api_url.clone(),
            repositories: c.repositories.clone(),
            organizations: c.organizations.clone(),
            users: c.users.clone(),
            api_token: c.api_token.clone(),
            api_token_file: c.api_token_file.clone(),
        }
    }
}

integration!(GithubConfig, "github_exporter", "github", GithubArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemcachedConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub memcached_address: Option<String>,
    pub timeout: Option<Duration>,
    pub tls_config: Option<TlsConfig>,
}

#[derive(Serialize)]
struct MemcachedArgs {
    address: Option<String>,
    timeout: Option<Duration>,
    tls_config: Option<BlockOf<TlsArgs>>,
}

impl From<&MemcachedConfig> for MemcachedArgs {
    fn from(c: &MemcachedConfig) -> Self {
        MemcachedArgs {
            address: c.memcached_address.clone(),
            timeout: c.timeout,
            tls_config: c.tls_config.as_ref().map(TlsConfig::to_args),
        }
    }
}

integration!(MemcachedConfig, "memcached_exporter", "memcached", MemcachedArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MongodbConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub mongodb_uri: Option<Secret>,
    pub direct_connect: Option<bool>,
    pub discovering_mode: Option<bool>,
    pub tls_basic_auth_config_path: Option<String>,
}

#[derive(Serialize)]
struct MongodbArgs {
    mongodb_uri: Option<Secret>,
    direct_connect: Option<bool>,
    discovering_mode: Option<bool>,
    tls_basic_auth_config_path: Option<String>,
}

impl From<&MongodbConfig> for MongodbArgs {
    fn from(c: &MongodbConfig) -> Self {
        MongodbArgs {
            mongodb_uri: c.mongodb_uri.clone(),
            direct_connect: c.direct_connect,
            discovering_mode: c.discovering_mode,
            tls_basic_auth_config_path: c.tls_basic_auth_config_path.clone(),
        }
    }
}

integration!(MongodbConfig, "mongodb_exporter", "mongodb", MongodbArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MssqlConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub connection_string: Option<Secret>,
    pub max_idle_connections: Option<u32>,
    pub max_open_connections: Option<u32>,
    pub timeout: Option<Duration>,
}

#[derive(Serialize)]
struct MssqlArgs {
    connection_string: Option<Secret>,
    max_idle_connections: Option<u32>,
    max_open_connections: Option<u32>,
    timeout: Option<Duration>,
}

impl From<&MssqlConfig> for MssqlArgs {
    fn from(c: &MssqlConfig) -> Self {
        MssqlArgs {
            connection_string: c.connection_string.clone(),
            max_idle_connections: c.max_idle_connections,
            max_open_connections: c.max_open_connections,
            timeout: c.timeout,
        }
    }
}

integration!(MssqlConfig, "mssql", "mssql", MssqlArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracledbConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub connection_string: Option<Secret>,
    pub max_idle_conns: Option<u32>,
    pub max_open_conns: Option<u32>,
    pub query_timeout: Option<u32>,
}

#[derive(Serialize)]
struct OracledbArgs {
    connection_string: Option<Secret>,
    max_idle_conns: Option<u32>,
    max_open_conns: Option<u32>,
    query_timeout: Option<u32>,
}

impl From<&OracledbConfig> for OracledbArgs {
    fn from(c: &OracledbConfig) -> Self {
        OracledbArgs {
            connection_string: c.connection_string.clone(),
            max_idle_conns: c.max_idle_conns,
            max_open_conns: c.max_open_conns,
            query_timeout: c.query_timeout,
        }
    }
}

integration!(OracledbConfig, "oracledb", "oracledb", OracledbArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub data_source_names: Vec<Secret>,
    pub disable_settings_metrics: Option<bool>,
    pub disable_default_metrics: Option<bool>,
    pub query_path: Option<String>,
    pub autodiscover_databases: Option<bool>,
    pub include_databases: Vec<String>,
    pub exclude_databases: Vec<String>,
}

#[derive(Serialize)]
struct AutodiscoveryArgs {
    enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    database_allowlist: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    database_denylist: Vec<String>,
}

#[derive(Serialize)]
struct PostgresArgs {
    data_source_names: Vec<Secret>,
    disable_settings_metrics: Option<bool>,
    disable_default_metrics: Option<bool>,
    custom_queries_config_path: Option<String>,
    autodiscovery: Option<BlockOf<AutodiscoveryArgs>>,
}

impl From<&PostgresConfig> for PostgresArgs {
    fn from(c: &PostgresConfig) -> Self {
        let discovers = c.autodiscover_databases.unwrap_or(false)
            || !c.include_databases.is_empty()
            || !c.exclude_databases.is_empty();
        PostgresArgs {
            data_source_names: c.data_source_names.clone(),
            disable_settings_metrics: c.disable_settings_metrics,
            disable_default_metrics: c.disable_default_metrics,
            custom_queries_config_path: c.query_path.clone(),
            autodiscovery: discovers.then(|| {
                BlockOf(AutodiscoveryArgs {
                    enabled: c.autodiscover_databases.unwrap_or(false),
                    database_allowlist: c.include_databases.clone(),
                    database_denylist: c.exclude_databases.clone(),
                })
            }),
        }
    }
}

integration!(PostgresConfig, "postgres_exporter", "postgres", PostgresArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub account_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

#[derive(Serialize)]
struct SnowflakeArgs {
    account_name: Option<String>,
    username: Option<String>,
    password: Option<Secret>,
    role: Option<String>,
    warehouse: Option<String>,
}

impl From<&SnowflakeConfig> for SnowflakeArgs {
    fn from(c: &SnowflakeConfig) -> Self {
        SnowflakeArgs {
            account_name: c.account_name.clone(),
            username: c.username.clone(),
            password: c.password.clone(),
            role: c.role.clone(),
            warehouse: c.warehouse.clone(),
        }
    }
}

integration!(SnowflakeConfig, "snowflake", "snowflake", SnowflakeArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SquidConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<Secret>,
}

#[derive(Serialize)]
struct SquidArgs {
    address: Option<String>,
    username: Option<String>,
    password: Option<Secret>,
}

impl From<&SquidConfig> for SquidArgs {
    fn from(c: &SquidConfig) -> Self {
        SquidArgs {
            address: c.address.clone(),
            username: c.username.clone(),
            password: c.password.clone(),
        }
    }
}

integration!(SquidConfig, "squid", "squid", SquidArgs);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VsphereConfig {
    #[serde(flatten)]
    pub common: IntegrationCommon,
    pub request_chunk_size: Option<u32>,
    pub collect_concurrency: Option<u32>,
    pub vsphere_url: Option<String>,
    pub vsphere_user: Option<String>,
    pub vsphere_password: Option<Secret>,
    pub discovery_interval: Option<Duration>,
    pub enable_exporter_metrics: Option<bool>,
}

#[derive(Serialize)]
struct VsphereArgs {
    request_chunk_size: Option<u32>,
    collect_concurrency: Option<u32>,
    vsphere_url: Option<String>,
    vsphere_user: Option<String>,
    vsphere_password: Option<Secret>,
    discovery_interval: Option<Duration>,
    enable_exporter_metrics: Option<bool>,
}

impl From<&VsphereConfig> for VsphereArgs {
    fn from(c: &VsphereConfig) -> Self {
        VsphereArgs {
            request_chunk_size: c.request_chunk_size,
            collect_concurrency: c.collect_concurrency,
            vsphere_url: c.vsphere_url.clone(),
            vsphere_user: c.vsphere_user.clone(),
            vsphere_password: c.vsphere_password.clone(),
            discovery_interval: c.discovery_interval,
            enable_exporter_metrics: c.enable_exporter_metrics,
        }
    }
}

integration!(VsphereConfig, "vsphere", "vsphere", VsphereArgs);

/// Shared values while converting the integrations section.
struct IntegrationsContext<'a> {
    config: &'a Config,
    /// Label of the shared remote write, once some scrape forwards to it.
    write_label: Option<String>,
}

impl IntegrationsContext<'_> {
    fn receiver(&mut self, state: &mut State) -> Reference {
        let label = self
            .write_label
            .get_or_insert_with(|| state.label_in(REMOTE_WRITE, LABEL_PREFIX));
        ComponentKind::new(REMOTE_WRITE).export(label, "receiver")
    }
}

pub(super) fn append_integrations(state: &mut State, config: &Config, diags: &mut Diagnostics) {
    let integrations = &config.integrations;
    let mut ctx = IntegrationsContext {
        config,
        write_label: None,
    };

    append(state, &mut ctx, integrations.azure_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.dnsmasq_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.elasticsearch_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.github_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.memcached_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.mongodb_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.mssql.as_ref(), diags);
    append(state, &mut ctx, integrations.oracledb.as_ref(), diags);
    append(state, &mut ctx, integrations.postgres_exporter.as_ref(), diags);
    append(state, &mut ctx, integrations.snowflake.as_ref(), diags);
    append(state, &mut ctx, integrations.squid.as_ref(), diags);
    append(state, &mut ctx, integrations.vsphere.as_ref(), diags);

    if let Some(label) = ctx.write_label {
        let endpoints = if integrations.prometheus_remote_write.is_empty() {
            &config.metrics.global.remote_write
        } else {
            &integrations.prometheus_remote_write
        };
        let args = remote_write_args(endpoints, &config.metrics.global.external_labels, diags);
        state.append_args(&ComponentKind::new(REMOTE_WRITE), &label, &args, diags);
    }
}

fn append<I: Integration>(
    state: &mut State,
    ctx: &mut IntegrationsContext<'_>,
    integration: Option<&I>,
    diags: &mut Diagnostics,
) {
    let Some(integration) = integration else {
        return;
    };
    if integration.common().enabled == Some(false) {
        debug!(integration = I::CONFIG_NAME, "skipping disabled integration");
        return;
    }
    let staged = stage_integration(state, ctx, integration);
    diags.add_all(state.merge(staged));
}

fn stage_integration<I: Integration>(
    state: &mut State,
    ctx: &mut IntegrationsContext<'_>,
    integration: &I,
) -> Result<Staged, Diagnostics> {
    let common = integration.common();
    let label = state.label(&label_for_parts(&[LABEL_PREFIX, I::CONFIG_NAME]));
    let context = format!("integration {}", I::CONFIG_NAME);
    let mut staged = Staged::new();

    let exporter = ComponentKind::new(&format!("prometheus.exporter.{}", I::EXPORTER));
    if !staged.push(&exporter, &label, &integration.to_args()) {
        return Err(staged.diags);
    }
    let mut targets = TargetsExpr::Export(exporter.export(&label, "targets"));

    let mut rules = Vec::new();
    if let Some(instance) = &common.instance {
        rules.push(set_label_rule("instance", instance));
    }
    rules.extend(relabel::to_rules(&common.relabel_configs, &context, &mut staged.diags));
    if !rules.is_empty() {
        let kind = ComponentKind::new("discovery.relabel");
        if !staged.push(&kind, &label, &DiscoveryRelabelArgs { targets, rule: rules }) {
            return Err(staged.diags);
        }
        targets = TargetsExpr::Export(kind.export(&label, "output"));
    }

    let scrape = common
        .scrape_integration
        .or(ctx.config.integrations.scrape_integrations)
        .unwrap_or(true);
    if !scrape {
        return Ok(staged);
    }

    let receiver = ctx.receiver(state);
    let metric_rules =
        relabel::to_rules(&common.metric_relabel_configs, &context, &mut staged.diags);
    let relabel_kind = ComponentKind::new("prometheus.relabel");
    let forward_to = if metric_rules.is_empty() {
        vec![receiver.clone()]
    } else {
        vec![relabel_kind.export(&label, "receiver")]
    };

    let global = &ctx.config.metrics.global;
    let args = ScrapeArgs {
        targets,
        forward_to,
        job_name: format!("{}/{}", LABEL_PREFIX, I::CONFIG_NAME),
        honor_labels: None,
        honor_timestamps: None,
        params: BTreeMap::new(),
        scrape_interval: common.scrape_interval.or(global.scrape_interval),
        scrape_timeout: common.scrape_timeout.or(global.scrape_timeout),
        metrics_path: None,
        scheme: None,
        http: Default::default(),
    };
    staged.push(&ComponentKind::new("prometheus.scrape"), &label, &args);

    if !metric_rules.is_empty() {
        let args = MetricsRelabelArgs {
            forward_to: vec![receiver],
            rule: metric_rules,
        };
        staged.push(&relabel_kind, &label, &args);
    }
    Ok(staged)
}
