//! Log-shipping agent front-end.
//!
//! Every scrape job becomes a small chain of blocks sharing one label:
//! optional discovery relabeling, the log sources, an optional
//! `loki.process` for pipeline stages, all forwarding into the `loki.write`
//! blocks built from `clients`.

mod job;
mod sources;
mod stages;
mod validate;

pub use sources::{
    CloudflareConfig, GcplogConfig, GelfConfig, HerokuDrainConfig, PushApiConfig, SyslogConfig,
    WindowsEventsConfig,
};

use crate::builder::{BlockOf, ComponentKind, Reference};
use crate::common::byte_size;
use crate::common::http::{HttpClientArgs, HttpClientConfig};
use crate::common::relabel::RelabelConfig;
use crate::common::server::ServerConfig;
use crate::common::StaticConfig;
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const WRITE: &str = "loki.write";

/// Root of a promtail configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub clients: Vec<ClientConfig>,
    pub positions: PositionsConfig,
    pub scrape_configs: Vec<ScrapeConfig>,
    pub target_config: TargetConfig,
    pub limits_config: Option<serde_yaml::Value>,
    pub tracing: Option<serde_yaml::Value>,
}

/// A push endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub url: String,
    pub tenant_id: Option<String>,
    pub batchwait: Option<Duration>,
    pub batchsize: Option<u64>,
    pub timeout: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    pub backoff_config: BackoffConfig,
    pub external_labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub min_period: Option<Duration>,
    pub max_period: Option<Duration>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionsConfig {
    pub filename: Option<String>,
    pub sync_period: Option<Duration>,
    pub ignore_invalid_yaml: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub sync_period: Option<Duration>,
}

/// One scrape job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub job_name: String,
    /// Single-key maps, decoded stage by stage.
    pub pipeline_stages: Vec<serde_yaml::Value>,
    pub static_configs: Vec<StaticConfig>,
    pub relabel_configs: Vec<RelabelConfig>,
    pub gcplog: Option<GcplogConfig>,
    pub gelf: Option<GelfConfig>,
    pub heroku_drain: Option<HerokuDrainConfig>,
    pub loki_push_api: Option<PushApiConfig>,
    pub syslog: Option<SyslogConfig>,
    pub cloudflare: Option<CloudflareConfig>,
    pub windows_events: Option<WindowsEventsConfig>,
    /// Sources and settings with no converted counterpart.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Serialize)]
struct EndpointArgs {
    url: String,
    tenant_id: Option<String>,
    batch_wait: Option<Duration>,
    batch_size: Option<String>,
    remote_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    min_backoff_period: Option<Duration>,
    max_backoff_period: Option<Duration>,
    max_backoff_retries: Option<u32>,
    #[serde(flatten)]
    http: HttpClientArgs,
}

#[derive(Serialize)]
struct WriteArgs {
    endpoint: BlockOf<EndpointArgs>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    external_labels: BTreeMap<String, String>,
}

impl ClientConfig {
    fn to_args(&self) -> WriteArgs {
        WriteArgs {
            endpoint: BlockOf(EndpointArgs {
                url: self.url.clone(),
                tenant_id: self.tenant_id.clone(),
                batch_wait: self.batchwait,
                batch_size: self.batchsize.map(byte_size),
                remote_timeout: self.timeout,
                headers: self.headers.clone(),
                min_backoff_period: self.backoff_config.min_period,
                max_backoff_period: self.backoff_config.max_period,
                max_backoff_retries: self.backoff_config.max_retries,
                http: self.http.to_args(),
            }),
            external_labels: self.external_labels.clone(),
        }
    }
}

/// Values shared by every job of one configuration.
pub(crate) struct GlobalContext<'a> {
    pub prefix: &'a str,
    pub write_receivers: Vec<Reference>,
    pub target_sync_period: Option<Duration>,
    pub legacy_positions_file: Option<&'a str>,
}

/// Convert a standalone promtail configuration into `state`.
pub(crate) fn convert(config: &Config, state: &mut State) -> Diagnostics {
    let mut diags = Diagnostics::new();
    config.server.validate_agent(&mut diags);
    if let Some(logging) = config.server.logging() {
        state.append_args(&ComponentKind::new("logging"), "", &logging, &mut diags);
    }
    diags.add_all(append(state, "", config));
    diags
}

/// Append every job and client of `config`, labeling blocks under `prefix`.
/// The static dialect uses this for its embedded log configs.
pub(crate) fn append(state: &mut State, prefix: &str, config: &Config) -> Diagnostics {
    let mut diags = validate::validate(config);

    let write = ComponentKind::new(WRITE);
    let base = if prefix.is_empty() { "default" } else { prefix };
    let write_labels: Vec<String> = config
        .clients
        .iter()
        .map(|_| state.label_in(WRITE, base))
        .collect();

    let ctx = GlobalContext {
        prefix,
        write_receivers: write_labels
            .iter()
            .map(|label| write.export(label, "receiver"))
            .collect(),
        target_sync_period: config.target_config.sync_period,
        legacy_positions_file: config.positions.filename.as_deref(),
    };

    for scrape in &config.scrape_configs {
        debug!(job = %scrape.job_name, prefix, "converting log scrape job");
        let staged = job::stage_job(state, &ctx, scrape);
        diags.add_all(state.merge(staged));
    }

    for (client, label) in config.clients.iter().zip(&write_labels) {
        state.append_args(&write, label, &client.to_args(), &mut diags);
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use telescope_syntax::write_file;

    fn convert_yaml(yaml: &str) -> (String, Diagnostics) {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let mut state = State::new();
        let diags = convert(&config, &mut state);
        (write_file(state.file()), diags)
    }

    #[test]
    fn file_job_with_client() {
        let (out, diags) = convert_yaml(concat!(
            "positions:\n  filename: /tmp/positions.yaml\n",
            "clients:\n  - url: http://loki:3100/loki/api/v1/push\n    batchsize: 1048576\n",
            "scrape_configs:\n  - job_name: varlogs\n    static_configs:\n",
            "      - targets: [localhost]\n        labels:\n          __path__: /var/log/*.log\n",
        ));
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            out,
            concat!(
                "local.file_match \"varlogs\" {\n",
                "\tpath_targets = [{ __address__ = \"localhost\", __path__ = \"/var/log/*.log\" }]\n",
                "}\n",
                "loki.source.file \"varlogs\" {\n",
                "\ttargets = local.file_match.varlogs.targets\n",
                "\tforward_to = [loki.write.default.receiver]\n",
                "\tlegacy_positions_file = \"/tmp/positions.yaml\"\n",
                "}\n",
                "loki.write \"default\" {\n",
                "\tendpoint {\n",
                "\t\turl = \"http://loki:3100/loki/api/v1/push\"\n",
                "\t\tbatch_size = \"1MiB\"\n",
                "\t}\n",
                "}\n",
            )
        );
    }

    #[test]
    fn one_write_block_per_client() {
        let (out, _) = convert_yaml(
            "clients:\n  - url: http://a/push\n  - url: http://b/push\n    tenant_id: team-b\n",
        );
        assert!(out.contains("loki.write \"default\" {"));
        assert!(out.contains("loki.write \"default2\" {"));
        assert!(out.contains("tenant_id = \"team-b\""));
    }

    #[test]
    fn server_log_level_becomes_logging_block() {
        let (out, diags) = convert_yaml(
            "server:\n  log_level: debug\n  http_listen_port: 9080\nclients:\n  - url: http://a/push\n",
        );
        assert!(out.starts_with("logging {\n\tlevel = \"debug\"\n}\n"));
        assert_eq!(
            diags.to_string(),
            "(Warning) server.http_listen_port is not converted; set the equivalent command-line flag instead\n"
        );
    }

    #[test]
    fn prefix_labels_blocks() {
        let config: Config = serde_yaml::from_str(
            "clients:\n  - url: http://a/push\nscrape_configs:\n  - job_name: app\n    static_configs:\n      - targets: [localhost]\n",
        )
        .unwrap();
        let mut state = State::new();
        append(&mut state, "logs_default", &config);
        let out = write_file(state.file());
        assert!(out.contains("loki.source.file \"logs_default_app\""));
        assert!(out.contains("forward_to = [loki.write.logs_default.receiver]"));
    }
}
