//! Receiver converters: the pipeline entry points.

use super::component::{ComponentConfig, SourceKind};
use super::registry::{append_converted, mismatch, Converter, OutputArgs};
use crate::builder::{BlockOf, ComponentKind};
use crate::diag::Diagnostics;
use crate::state::{InstanceId, Signal, State};
use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_GRPC_ENDPOINT: &str = "0.0.0.0:4317";
const DEFAULT_HTTP_ENDPOINT: &str = "0.0.0.0:4318";
const DEFAULT_ZIPKIN_ENDPOINT: &str = "0.0.0.0:9411";

/// Present-but-null means "enabled with defaults".
fn enabled<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?.unwrap_or_default()))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerTls {
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub ca_file: Option<String>,
    pub client_ca_file: Option<String>,
    pub min_version: Option<String>,
}

#[derive(Serialize)]
struct ServerTlsArgs {
    cert_file: Option<String>,
    key_file: Option<String>,
    ca_file: Option<String>,
    client_ca_file: Option<String>,
    min_version: Option<String>,
}

impl ServerTls {
    fn to_args(&self) -> BlockOf<ServerTlsArgs> {
        BlockOf(ServerTlsArgs {
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            ca_file: self.ca_file.clone(),
            client_ca_file: self.client_ca_file.clone(),
            min_version: self.min_version.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GrpcProtocol {
    pub endpoint: Option<String>,
    pub transport: Option<String>,
    pub max_recv_msg_size_mib: Option<u64>,
    pub max_concurrent_streams: Option<u32>,
    pub read_buffer_size: Option<u64>,
    pub write_buffer_size: Option<u64>,
    pub include_metadata: Option<bool>,
    pub tls: Option<ServerTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpProtocol {
    pub endpoint: Option<String>,
    pub include_metadata: Option<bool>,
    pub max_request_body_size: Option<u64>,
    pub cors: Option<Cors>,
    pub traces_url_path: Option<String>,
    pub metrics_url_path: Option<String>,
    pub logs_url_path: Option<String>,
    pub tls: Option<ServerTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtlpProtocols {
    #[serde(deserialize_with = "enabled")]
    pub grpc: Option<GrpcProtocol>,
    #[serde(deserialize_with = "enabled")]
    pub http: Option<HttpProtocol>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtlpReceiverConfig {
    pub protocols: OtlpProtocols,
}

#[derive(Serialize)]
struct GrpcArgs {
    endpoint: String,
    transport: Option<String>,
    max_recv_msg_size: Option<String>,
    max_concurrent_streams: Option<u32>,
    read_buffer_size: Option<String>,
    write_buffer_size: Option<String>,
    include_metadata: Option<bool>,
    tls: Option<BlockOf<ServerTlsArgs>>,
}

#[derive(Serialize)]
struct CorsArgs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_origins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_headers: Vec<String>,
    max_age: Option<u32>,
}

#[derive(Serialize)]
struct HttpArgs {
    endpoint: String,
    include_metadata: Option<bool>,
    max_request_body_size: Option<String>,
    traces_url_path: Option<String>,
    metrics_url_path: Option<String>,
    logs_url_path: Option<String>,
    cors: Option<BlockOf<CorsArgs>>,
    tls: Option<BlockOf<ServerTlsArgs>>,
}

#[derive(Serialize)]
struct OtlpReceiverArgs {
    grpc: Option<BlockOf<GrpcArgs>>,
    http: Option<BlockOf<HttpArgs>>,
    output: BlockOf<OutputArgs>,
}

fn size(bytes: u64) -> String {
    crate::common::byte_size(bytes)
}

impl OtlpReceiverConfig {
    fn to_args(&self, output: OutputArgs) -> OtlpReceiverArgs {
        let grpc = self.protocols.grpc.as_ref().map(|g| {
            BlockOf(GrpcArgs {
                endpoint: g
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GRPC_ENDPOINT.to_owned()),
                transport: g.transport.clone(),
                max_recv_msg_size: g.max_recv_msg_size_mib.map(|mib| size(mib << 20)),
                max_concurrent_streams: g.max_concurrent_streams,
                read_buffer_size: g.read_buffer_size.map(size),
                write_buffer_size: g.write_buffer_size.map(size),
                include_metadata: g.include_metadata,
                tls: g.tls.as_ref().map(ServerTls::to_args),
            })
        });
        let http = self.protocols.http.as_ref().map(|h| {
            BlockOf(HttpArgs {
                endpoint: h
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_HTTP_ENDPOINT.to_owned()),
                include_metadata: h.include_metadata,
                max_request_body_size: h.max_request_body_size.map(size),
                traces_url_path: h.traces_url_path.clone(),
                metrics_url_path: h.metrics_url_path.clone(),
                logs_url_path: h.logs_url_path.clone(),
                cors: h.cors.as_ref().map(|c| {
                    BlockOf(CorsArgs {
                        allowed_origins: c.allowed_origins.clone(),
                        allowed_headers: c.allowed_headers.clone(),
                        max_age: c.max_age,
                    })
                }),
                tls: h.tls.as_ref().map(ServerTls::to_args),
            })
        });
        OtlpReceiverArgs {
            grpc,
            http,
            output: BlockOf(output),
        }
    }
}

pub struct OtlpReceiverConverter;

impl Converter for OtlpReceiverConverter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::OtlpReceiver
    }

    fn component_kind(&self) -> ComponentKind {
        ComponentKind::new("otelcol.receiver.otlp")
    }

    fn input_component_name(&self) -> Option<ComponentKind> {
        None
    }

    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics {
        let ComponentConfig::OtlpReceiver(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let output = OutputArgs::for_signals(state, id, &Signal::ALL);
        append_converted(state, id, &self.component_kind(), &cfg.to_args(output))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZipkinReceiverConfig {
    pub endpoint: Option<String>,
    pub parse_string_tags: bool,
    pub include_metadata: Option<bool>,
    pub tls: Option<ServerTls>,
}

#[derive(Serialize)]
struct ZipkinReceiverArgs {
    endpoint: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    parse_string_tags: bool,
    include_metadata: Option<bool>,
    tls: Option<BlockOf<ServerTlsArgs>>,
    output: BlockOf<OutputArgs>,
}

pub struct ZipkinReceiverConverter;

impl Converter for ZipkinReceiverConverter {
    fn source_kind(&self) -> SourceKind {
        SourceKind::ZipkinReceiver
    }

    fn component_kind(&self) -> ComponentKind {
        ComponentKind::new("otelcol.receiver.zipkin")
    }

    fn input_component_name(&self) -> Option<ComponentKind> {
        None
    }

    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics {
        let ComponentConfig::ZipkinReceiver(cfg) = config else {
            return mismatch(self.source_kind(), id);
        };
        let mut diags = Diagnostics::new();
        for signal in [Signal::Metrics, Signal::Logs] {
            if !state.graph().downstream(id, signal).is_empty() {
                diags.warning(format!(
                    "{} only receives traces; its {} pipelines were not wired",
                    id, signal
                ));
            }
        }
        let args = ZipkinReceiverArgs {
            endpoint: cfg
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ZIPKIN_ENDPOINT.to_owned()),
            parse_string_tags: cfg.parse_string_tags,
            include_metadata: cfg.include_metadata,
            tls: cfg.tls.as_ref().map(ServerTls::to_args),
            output: BlockOf(OutputArgs::for_signals(state, id, &[Signal::Traces])),
        };
        diags.add_all(append_converted(state, id, &self.component_kind(), &args));
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{InstanceClass, PipelineGraph};
    use telescope_syntax::write_file;

    fn receiver(name: &str) -> InstanceId {
        InstanceId::new(InstanceClass::Receiver, name)
    }

    #[test]
    fn otlp_defaults_and_output() {
        let cfg: OtlpReceiverConfig =
            serde_yaml::from_str("protocols:\n  grpc:\n  http:\n    endpoint: 127.0.0.1:4318\n")
                .unwrap();
        let id = receiver("otlp");
        let exporter = InstanceId::new(InstanceClass::Exporter, "otlp");
        let mut graph = PipelineGraph::new();
        graph.add_edge(&id, Signal::Traces, &exporter);
        let mut state = State::with_graph(graph);
        let converter = OtlpReceiverConverter;
        state.register_instance(&id, converter.component_kind(), "default".into(), None);
        state.register_instance(
            &exporter,
            ComponentKind::new("otelcol.exporter.otlp"),
            "default".into(),
            Some(ComponentKind::new("otelcol.exporter.otlp")),
        );

        let diags =
            converter.convert_and_append(&mut state, &id, &ComponentConfig::OtlpReceiver(cfg));
        assert_eq!(
            diags.to_string(),
            "(Info) Converted receiver \"otlp\" into otelcol.receiver.otlp.default\n"
        );
        assert_eq!(
            write_file(state.file()),
            concat!(
                "otelcol.receiver.otlp \"default\" {\n",
                "\tgrpc {\n\t\tendpoint = \"0.0.0.0:4317\"\n\t}\n",
                "\thttp {\n\t\tendpoint = \"127.0.0.1:4318\"\n\t}\n",
                "\toutput {\n\t\ttraces = [otelcol.exporter.otlp.default.input]\n\t}\n",
                "}\n",
            )
        );
    }

    #[test]
    fn absent_protocols_are_omitted() {
        let cfg: OtlpReceiverConfig = serde_yaml::from_str("protocols:\n  http:\n").unwrap();
        assert!(cfg.protocols.grpc.is_none());
        assert_eq!(cfg.protocols.http, Some(HttpProtocol::default()));
    }

    #[test]
    fn zipkin_warns_about_non_trace_pipelines() {
        let id = receiver("zipkin");
        let exporter = InstanceId::new(InstanceClass::Exporter, "debug");
        let mut graph = PipelineGraph::new();
        graph.add_edge(&id, Signal::Logs, &exporter);
        let mut state = State::with_graph(graph);
        state.register_instance(
            &id,
            ComponentKind::new("otelcol.receiver.zipkin"),
            "default".into(),
            None,
        );
        let diags = ZipkinReceiverConverter.convert_and_append(
            &mut state,
            &id,
            &ComponentConfig::ZipkinReceiver(ZipkinReceiverConfig::default()),
        );
        assert_eq!(diags.len(), 2);
        assert!(write_file(state.file()).contains("endpoint = \"0.0.0.0:9411\""));
    }
}
