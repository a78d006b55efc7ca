//! The closed set of component configurations the converters understand.

use super::exporters::{DebugExporterConfig, OtlpExporterConfig, OtlpHttpExporterConfig};
use super::processors::{
    AttributesProcessorConfig, BatchProcessorConfig, MemoryLimiterProcessorConfig,
    TransformProcessorConfig,
};
use super::receivers::{OtlpReceiverConfig, ZipkinReceiverConfig};
use crate::state::InstanceClass;
use serde::de::DeserializeOwned;
use std::fmt;

/// Which parsed configuration variant an instance has; the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    OtlpReceiver,
    ZipkinReceiver,
    BatchProcessor,
    MemoryLimiterProcessor,
    TransformProcessor,
    AttributesProcessor,
    OtlpExporter,
    OtlpHttpExporter,
    DebugExporter,
}

impl SourceKind {
    /// Resolve a component `type` within its class. Unknown types have no
    /// kind and are reported as unsupported.
    pub fn resolve(class: InstanceClass, component_type: &str) -> Option<SourceKind> {
        use InstanceClass::*;
        let kind = match (class, component_type) {
            (Receiver, "otlp") => SourceKind::OtlpReceiver,
            (Receiver, "zipkin") => SourceKind::ZipkinReceiver,
            (Processor, "batch") => SourceKind::BatchProcessor,
            (Processor, "memory_limiter") => SourceKind::MemoryLimiterProcessor,
            (Processor, "transform") => SourceKind::TransformProcessor,
            (Processor, "attributes") => SourceKind::AttributesProcessor,
            (Exporter, "otlp") => SourceKind::OtlpExporter,
            (Exporter, "otlphttp") => SourceKind::OtlpHttpExporter,
            (Exporter, "debug") | (Exporter, "logging") => SourceKind::DebugExporter,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::OtlpReceiver => "otlp receiver",
            SourceKind::ZipkinReceiver => "zipkin receiver",
            SourceKind::BatchProcessor => "batch processor",
            SourceKind::MemoryLimiterProcessor => "memory_limiter processor",
            SourceKind::TransformProcessor => "transform processor",
            SourceKind::AttributesProcessor => "attributes processor",
            SourceKind::OtlpExporter => "otlp exporter",
            SourceKind::OtlpHttpExporter => "otlphttp exporter",
            SourceKind::DebugExporter => "debug exporter",
        };
        f.write_str(name)
    }
}

/// A decoded component body.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentConfig {
    OtlpReceiver(OtlpReceiverConfig),
    ZipkinReceiver(ZipkinReceiverConfig),
    BatchProcessor(BatchProcessorConfig),
    MemoryLimiterProcessor(MemoryLimiterProcessorConfig),
    TransformProcessor(TransformProcessorConfig),
    AttributesProcessor(AttributesProcessorConfig),
    OtlpExporter(OtlpExporterConfig),
    OtlpHttpExporter(OtlpHttpExporterConfig),
    DebugExporter(DebugExporterConfig),
}

impl ComponentConfig {
    /// Decode `body` as the configuration of `kind`. A null body (a bare
    /// `otlp:` key) takes every default.
    pub fn decode(kind: SourceKind, body: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SourceKind::OtlpReceiver => ComponentConfig::OtlpReceiver(decode_body(body)?),
            SourceKind::ZipkinReceiver => ComponentConfig::ZipkinReceiver(decode_body(body)?),
            SourceKind::BatchProcessor => ComponentConfig::BatchProcessor(decode_body(body)?),
            SourceKind::MemoryLimiterProcessor => {
                ComponentConfig::MemoryLimiterProcessor(decode_body(body)?)
            }
            SourceKind::TransformProcessor => {
                ComponentConfig::TransformProcessor(decode_body(body)?)
            }
            SourceKind::AttributesProcessor => {
                ComponentConfig::AttributesProcessor(decode_body(body)?)
            }
            SourceKind::OtlpExporter => ComponentConfig::OtlpExporter(decode_body(body)?),
            SourceKind::OtlpHttpExporter => ComponentConfig::OtlpHttpExporter(decode_body(body)?),
            SourceKind::DebugExporter => ComponentConfig::DebugExporter(decode_body(body)?),
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            ComponentConfig::OtlpReceiver(_) => SourceKind::OtlpReceiver,
            ComponentConfig::ZipkinReceiver(_) => SourceKind::ZipkinReceiver,
            ComponentConfig::BatchProcessor(_) => SourceKind::BatchProcessor,
            ComponentConfig::MemoryLimiterProcessor(_) => SourceKind::MemoryLimiterProcessor,
            ComponentConfig::TransformProcessor(_) => SourceKind::TransformProcessor,
            ComponentConfig::AttributesProcessor(_) => SourceKind::AttributesProcessor,
            ComponentConfig::OtlpExporter(_) => SourceKind::OtlpExporter,
            ComponentConfig::OtlpHttpExporter(_) => SourceKind::OtlpHttpExporter,
            ComponentConfig::DebugExporter(_) => SourceKind::DebugExporter,
        }
    }
}

fn decode_body<T: DeserializeOwned>(body: &serde_json::Value) -> Result<T, serde_json::Error> {
    match body {
        serde_json::Value::Null => serde_json::from_value(serde_json::Value::Object(
            serde_json::Map::new(),
        )),
        other => serde_json::from_value(other.clone()),
    }
}
