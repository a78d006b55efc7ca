//! Exporter converters. Exporters end a pipeline: they take input and
//! forward nothing.

use super::component::{ComponentConfig, SourceKind};
use super::registry::{append_converted, mismatch, Converter};
use crate::builder::{BlockOf, ComponentKind};
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::state::{InstanceId, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientTls {
    pub insecure: Option<bool>,
    pub insecure_skip_verify: Option<bool>,
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub server_name_override: Option<String>,
}

#[derive(Serialize)]
struct ClientTlsArgs {
    insecure: Option<bool>,
    insecure_skip_verify: Option<bool>,
    ca_file: Option<String>,
    cert_file: Option<String>,
    key_file: Option<String>,
    server_name: Option<String>,
}

impl ClientTls {
    fn to_args(&self) -> BlockOf<ClientTlsArgs> {
        BlockOf(ClientTlsArgs {
            insecure: self.insecure,
            insecure_skip_verify: self.insecure_skip_verify,
            ca_file: self.ca_file.clone(),
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            server_name: self.server_name_override.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SendingQueue {
    pub enabled: Option<bool>,
    pub num_consumers: Option<u32>,
    pub queue_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryOnFailure {
    pub enabled: Option<bool>,
    pub initial_interval: Option<Duration>,
    pub max_interval: Option<Duration>,
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: Option<f64>,
    pub randomization_factor: Option<f64>,
}

#[derive(Serialize)]
struct QueueArgs {
    enabled: Option<bool>,
    num_consumers: Option<u32>,
    queue_size: Option<u32>,
}

#[derive(Serialize)]
struct RetryArgs {
    enabled: Option<bool>,
    initial_interval: Option<Duration>,
    max_interval: Option<Duration>,
    max_elapsed_time: Option<Duration>,
    multiplier: Option<f64>,
    randomization_factor: Option<f64>,
}

fn queue_args(queue: &Option<SendingQueue>) -> Option<BlockOf<QueueArgs>> {
    queue.as_ref().map(|q| {
        BlockOf(QueueArgs {
            enabled: q.enabled,
            num_consumers: q.num_consumers,
            queue_size: q.queue_size,
        })
    })
}

fn retry_args(retry: &Option<RetryOnFailure>) -> Option<BlockOf<RetryArgs>> {
    retry.as_ref().map(|r| {
        BlockOf(RetryArgs {
            enabled: r.enabled,
            initial_interval: r.initial_interval,
            max_interval: r.max_interval,
            max_elapsed_time: r.max_elapsed_time,
            multiplier: r.multiplier,
            randomization_factor: r.randomization_factor,
        })
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtlpExporterConfig {
    pub endpoint: String,
    pub compression: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub tls: Option<ClientTls>,
    pub timeout: Option<Duration>,
    pub sending_queue: Option<SendingQueue>,
    pub retry_on_failure: Option<RetryOnFailure>,
    pub balancer_name: Option<String>,
    pub auth: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ClientArgs {
    endpoint: String,
    compression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    balancer_name: Option<String>,
    tls: Option<BlockOf<ClientTlsArgs>>,
}

#[derive(Serialize)]
struct OtlpExporterArgs {
    timeout: Option<Duration>,
    client: BlockOf<ClientArgs>,
    sending_queue: Option<BlockOf<QueueArgs>>,
    retry_on_failure: Option<BlockOf<RetryArgs>>,
}

/// Kind and input of every exporter.
macro_rules! exporter_kind {
    ($variant:ident, $kind:literal) => {
        fn source_kind(&self) -> SourceKind {
            SourceKind::$variant
        }

        fn component_kind(&self) -> ComponentKind {
            ComponentKind::new($kind)
        }

        fn input_component_name(&self) -> Option<ComponentKind> {
            Some(self.component_kind())
        }
    };
}

fn auth_unsupported(id: &InstanceId, auth: &Option<serde_json::Value>, diags: &mut Diagnostics) {
    if auth.is_some() {
        diags.warning(format!(
            "{}: auth extensions are not supported and auth was dropped",
            id
        ));
    }
}

pub struct OtlpExporterConverter;

impl Converter for OtlpExporterConverter {
    exporter_kind!(OtlpExporter, "otelcol.exporter.otlp");

    fn validate(&self, id: &InstanceId, config: &ComponentConfig) -> Diagnostics {
        let ComponentConfig::OtlpExporter(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        if cfg.endpoint.is_empty() {
            diags.error(format!("{}: endpoint is required", id));
        }
        diags
    }

    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics {
        let ComponentConfig::OtlpExporter(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        auth_unsupported(id, &cfg.auth, &mut diags);
        let args = OtlpExporterArgs {
            timeout: cfg.timeout,
            client: BlockOf(ClientArgs {
                endpoint: cfg.endpoint.clone(),
                compression: cfg.compression.clone(),
                headers: cfg.headers.clone(),
                balancer_name: cfg.balancer_name.clone(),
                tls: cfg.tls.as_ref().map(ClientTls::to_args),
            }),
            sending_queue: queue_args(&cfg.sending_queue),
            retry_on_failure: retry_args(&cfg.retry_on_failure),
        };
        diags.add_all(append_converted(state, id, &self.component_kind(), &args));
        diags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtlpHttpExporterConfig {
    pub endpoint: Option<String>,
    pub traces_endpoint: Option<String>,
    pub metrics_endpoint: Option<String>,
    pub logs_endpoint: Option<String>,
    pub compression: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub tls: Option<ClientTls>,
    pub timeout: Option<Duration>,
    pub sending_queue: Option<SendingQueue>,
    pub retry_on_failure: Option<RetryOnFailure>,
    pub auth: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct HttpClientArgs {
    endpoint: Option<String>,
    compression: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    timeout: Option<Duration>,
    tls: Option<BlockOf<ClientTlsArgs>>,
}

#[derive(Serialize)]
struct OtlpHttpExporterArgs {
    client: BlockOf<HttpClientArgs>,
    traces_endpoint: Option<String>,
    metrics_endpoint: Option<String>,
    logs_endpoint: Option<String>,
    sending_queue: Option<BlockOf<QueueArgs>>,
    retry_on_failure: Option<BlockOf<RetryArgs>>,
}

pub struct OtlpHttpExporterConverter;

impl Converter for OtlpHttpExporterConverter {
    exporter_kind!(OtlpHttpExporter, "otelcol.exporter.otlphttp");

    fn validate(&self, id: &InstanceId, config: &ComponentConfig) -> Diagnostics {
        let ComponentConfig::OtlpHttpExporter(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        let per_signal = [&cfg.traces_endpoint, &cfg.metrics_endpoint, &cfg.logs_endpoint];
        if cfg.endpoint.is_none() && per_signal.iter().all(|e| e.is_none()) {
            diags.error(format!(
                "{}: endpoint or a per-signal endpoint is required",
                id
            ));
        }
        diags
    }

    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics {
        let ComponentConfig::OtlpHttpExporter(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        auth_unsupported(id, &cfg.auth, &mut diags);
        let args = OtlpHttpExporterArgs {
            client: BlockOf(HttpClientArgs {
                endpoint: cfg.endpoint.clone(),
                compression: cfg.compression.clone(),
                headers: cfg.headers.clone(),
                timeout: cfg.timeout,
                tls: cfg.tls.as_ref().map(ClientTls::to_args),
            }),
            traces_endpoint: cfg.traces_endpoint.clone(),
            metrics_endpoint: cfg.metrics_endpoint.clone(),
            logs_endpoint: cfg.logs_endpoint.clone(),
            sending_queue: queue_args(&cfg.sending_queue),
            retry_on_failure: retry_args(&cfg.retry_on_failure),
        };
        diags.add_all(append_converted(state, id, &self.component_kind(), &args));
        diags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DebugExporterConfig {
    pub verbosity: Option<String>,
    /// Spelling used by the deprecated `logging` exporter.
    pub loglevel: Option<String>,
    pub sampling_initial: Option<u32>,
    pub sampling_thereafter: Option<u32>,
}

#[derive(Serialize)]
struct DebugArgs {
    verbosity: Option<String>,
    sampling_initial: Option<u32>,
    sampling_thereafter: Option<u32>,
}

pub struct DebugExporterConverter;

impl Converter for DebugExporterConverter {
    exporter_kind!(DebugExporter, "otelcol.exporter.debug");

    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics {
        let ComponentConfig::DebugExporter(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        let verbosity = match (&cfg.verbosity, &cfg.loglevel) {
            (Some(v), _) => Some(v.clone()),
            (None, Some(level)) => {
                diags.warning(format!(
                    "{}: loglevel is deprecated and was mapped to verbosity",
                    id
                ));
                Some(match level.to_ascii_lowercase().as_str() {
                    "debug" => "detailed".to_owned(),
                    _ => "normal".to_owned(),
                })
            }
            (None, None) => None,
        };
        let args = DebugArgs {
            verbosity,
            sampling_initial: cfg.sampling_initial,
            sampling_thereafter: cfg.sampling_thereafter,
        };
        diags.add_all(append_converted(state, id, &self.component_kind(), &args));
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InstanceClass;
    use pretty_assertions::assert_eq;
    use telescope_syntax::write_file;

    fn run(converter: &dyn Converter, name: &str, config: ComponentConfig) -> (String, Diagnostics) {
        let id = InstanceId::new(InstanceClass::Exporter, name);
        let mut state = State::new();
        state.register_instance(
            &id,
            converter.component_kind(),
            "default".into(),
            converter.input_component_name(),
        );
        let diags = converter.convert_and_append(&mut state, &id, &config);
        (write_file(state.file()), diags)
    }

    #[test]
    fn otlp_client_block() {
        let cfg: OtlpExporterConfig = serde_yaml::from_str(concat!(
            "endpoint: tempo:4317\n",
            "tls:\n",
            "  insecure: true\n",
        ))
        .unwrap();
        let (text, diags) = run(&OtlpExporterConverter, "otlp", ComponentConfig::OtlpExporter(cfg));
        assert_eq!(diags.len(), 1);
        assert_eq!(
            text,
            concat!(
                "otelcol.exporter.otlp \"default\" {\n",
                "\tclient {\n",
                "\t\tendpoint = \"tempo:4317\"\n",
                "\t\ttls {\n\t\t\tinsecure = true\n\t\t}\n",
                "\t}\n",
                "}\n",
            )
        );
    }

    #[test]
    fn otlp_requires_endpoint() {
        let id = InstanceId::new(InstanceClass::Exporter, "otlp");
        let diags = OtlpExporterConverter.validate(
            &id,
            &ComponentConfig::OtlpExporter(OtlpExporterConfig::default()),
        );
        assert_eq!(diags.to_string(), "(Error) exporter \"otlp\": endpoint is required\n");
    }

    #[test]
    fn otlphttp_per_signal_endpoint_is_enough() {
        let cfg = OtlpHttpExporterConfig {
            traces_endpoint: Some("http://tempo:4318/v1/traces".into()),
            ..Default::default()
        };
        let config = ComponentConfig::OtlpHttpExporter(cfg);
        let id = InstanceId::new(InstanceClass::Exporter, "otlphttp");
        assert!(OtlpHttpExporterConverter.validate(&id, &config).is_empty());
        let (text, diags) = run(&OtlpHttpExporterConverter, "otlphttp", config);
        assert!(!diags.has_errors());
        assert!(text.contains("\ttraces_endpoint = \"http://tempo:4318/v1/traces\"\n"));
    }

    #[test]
    fn logging_loglevel_maps_to_verbosity() {
        let cfg = DebugExporterConfig {
            loglevel: Some("debug".into()),
            ..Default::default()
        };
        let (text, diags) = run(
            &DebugExporterConverter,
            "logging",
            ComponentConfig::DebugExporter(cfg),
        );
        assert_eq!(diags.count(crate::diag::Severity::Warning), 1);
        assert!(text.contains("verbosity = \"detailed\""));
    }
}
