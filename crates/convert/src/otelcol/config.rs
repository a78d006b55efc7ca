//! Collector configuration as written: component bodies stay opaque until a
//! converter decodes them.

use crate::state::{InstanceClass, Signal};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

/// Root of a collector configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub receivers: IndexMap<String, serde_json::Value>,
    pub processors: IndexMap<String, serde_json::Value>,
    pub exporters: IndexMap<String, serde_json::Value>,
    pub extensions: IndexMap<String, serde_json::Value>,
    pub connectors: IndexMap<String, serde_json::Value>,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub extensions: Vec<String>,
    pub pipelines: IndexMap<String, PipelineConfig>,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub receivers: Vec<String>,
    pub processors: Vec<String>,
    pub exporters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub logs: TelemetryLogs,
    pub metrics: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryLogs {
    pub level: Option<String>,
    pub encoding: Option<String>,
}

impl Config {
    /// Declared components of one class, in source order.
    pub fn components(&self, class: InstanceClass) -> &IndexMap<String, serde_json::Value> {
        match class {
            InstanceClass::Receiver => &self.receivers,
            InstanceClass::Processor => &self.processors,
            InstanceClass::Exporter => &self.exporters,
        }
    }
}

/// A component id, `type[/name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentId<'a> {
    pub kind: &'a str,
    pub name: Option<&'a str>,
}

impl<'a> ComponentId<'a> {
    pub fn parse(id: &'a str) -> Self {
        match id.split_once('/') {
            Some((kind, name)) => ComponentId {
                kind,
                name: Some(name),
            },
            None => ComponentId {
                kind: id,
                name: None,
            },
        }
    }

    /// The label base: the name, or `default` for an unnamed component.
    pub fn label_base(&self) -> &'a str {
        match self.name {
            Some(name) if !name.is_empty() => name,
            _ => "default",
        }
    }
}

impl fmt::Display for ComponentId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{}/{}", self.kind, name),
            None => f.write_str(self.kind),
        }
    }
}

/// A pipeline id, `signal[/name]`.
pub fn pipeline_signal(id: &str) -> Result<Signal, String> {
    let signal = ComponentId::parse(id).kind;
    signal.parse()
}
