//! Static agent front-end: metrics instances, integrations and embedded
//! log configs.

mod integrations;
mod logs;
mod metrics;
mod validate;

pub use integrations::{
    AzureConfig, DnsmasqConfig, ElasticsearchConfig, GithubConfig, IntegrationCommon,
    IntegrationsConfig, MemcachedConfig, MongodbConfig, MssqlConfig, OracledbConfig,
    PostgresConfig, SnowflakeConfig, SquidConfig, VsphereConfig,
};
pub use logs::{LogsConfig, LogsGlobal, LogsInstance};

use crate::builder::{ComponentKind, Secret};
use crate::common::http::HttpClientConfig;
use crate::common::relabel::RelabelConfig;
use crate::common::server::ServerConfig;
use crate::common::StaticConfig;
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::state::State;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Root of a static agent configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub integrations: IntegrationsConfig,
    pub logs: Option<LogsConfig>,
    pub traces: Option<serde_yaml::Value>,
    pub agent_management: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub global: GlobalConfig,
    pub wal_directory: Option<String>,
    pub configs: Vec<InstanceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub scrape_interval: Option<Duration>,
    pub scrape_timeout: Option<Duration>,
    pub external_labels: BTreeMap<String, String>,
    pub remote_write: Vec<RemoteWriteConfig>,
}

/// One metrics instance: a set of scrape jobs sharing remote write.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub name: String,
    pub scrape_configs: Vec<ScrapeConfig>,
    pub remote_write: Vec<RemoteWriteConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub job_name: String,
    pub honor_labels: Option<bool>,
    pub honor_timestamps: Option<bool>,
    pub params: BTreeMap<String, Vec<String>>,
    pub scrape_interval: Option<Duration>,
    pub scrape_timeout: Option<Duration>,
    pub metrics_path: Option<String>,
    pub scheme: Option<String>,
    pub static_configs: Vec<StaticConfig>,
    pub dns_sd_configs: Vec<DnsSdConfig>,
    pub http_sd_configs: Vec<HttpSdConfig>,
    pub file_sd_configs: Vec<FileSdConfig>,
    pub consul_sd_configs: Vec<ConsulSdConfig>,
    pub ovhcloud_sd_configs: Vec<OvhcloudSdConfig>,
    pub relabel_configs: Vec<RelabelConfig>,
    pub metric_relabel_configs: Vec<RelabelConfig>,
    #[serde(flatten)]
    pub http: HttpClientConfig,
    /// Keys with no counterpart in the converted job.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsSdConfig {
    pub names: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub port: Option<u16>,
    pub refresh_interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSdConfig {
    pub url: String,
    pub refresh_interval: Option<Duration>,
    #[serde(flatten)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileSdConfig {
    pub files: Vec<String>,
    pub refresh_interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsulSdConfig {
    pub server: Option<String>,
    pub token: Option<Secret>,
    pub datacenter: Option<String>,
    pub namespace: Option<String>,
    pub partition: Option<String>,
    pub tag_separator: Option<String>,
    pub scheme: Option<String>,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub allow_stale: Option<bool>,
    pub services: Vec<String>,
    pub tags: Vec<String>,
    pub node_meta: BTreeMap<String, String>,
    pub refresh_interval: Option<Duration>,
    #[serde(flatten)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OvhcloudSdConfig {
    pub endpoint: Option<String>,
    pub application_key: Option<String>,
    pub application_secret: Option<Secret>,
    pub consumer_key: Option<Secret>,
    /// `vps` or `dedicated_server`.
    pub service: Option<String>,
    pub refresh_interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteWriteConfig {
    pub url: String,
    pub name: Option<String>,
    pub remote_timeout: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    pub send_exemplars: Option<bool>,
    pub send_native_histograms: Option<bool>,
    pub write_relabel_configs: Vec<RelabelConfig>,
    pub queue_config: Option<QueueConfig>,
    pub sigv4: Option<serde_yaml::Value>,
    #[serde(flatten)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: Option<u64>,
    pub max_shards: Option<u64>,
    pub min_shards: Option<u64>,
    pub max_samples_per_send: Option<u64>,
    pub batch_send_deadline: Option<Duration>,
    pub min_backoff: Option<Duration>,
    pub max_backoff: Option<Duration>,
}

/// Convert a static configuration into `state`, in document order: logging,
/// metrics instances, integrations, then log configs.
pub(crate) fn convert(config: &Config, state: &mut State) -> Diagnostics {
    let mut diags = validate::validate(config);

    if let Some(logging) = config.server.logging() {
        state.append_args(&ComponentKind::new("logging"), "", &logging, &mut diags);
    }

    for instance in &config.metrics.configs {
        debug!(
            instance = %instance.name,
            jobs = instance.scrape_configs.len(),
            "converting metrics instance"
        );
        metrics::append_instance(state, &config.metrics.global, instance, &mut diags);
    }

    integrations::append_integrations(state, config, &mut diags);

    if let Some(logs) = &config.logs {
        logs::append_logs(state, logs, &mut diags);
    }
    diags
}
