//! Collector front-end: receivers, processors and exporters wired by
//! `service.pipelines`, converted through the [`Registry`].

mod component;
mod config;
mod exporters;
mod plan;
mod processors;
mod receivers;
mod registry;

pub use component::{ComponentConfig, SourceKind};
pub use config::{
    pipeline_signal, ComponentId, Config, PipelineConfig, ServiceConfig, TelemetryConfig,
    TelemetryLogs,
};
pub use exporters::{DebugExporterConfig, OtlpExporterConfig, OtlpHttpExporterConfig};
pub use processors::{
    AttributesProcessorConfig, BatchProcessorConfig, MemoryLimiterProcessorConfig,
    TransformProcessorConfig,
};
pub use receivers::{OtlpReceiverConfig, ZipkinReceiverConfig};
pub use registry::{Converter, Registry};

use crate::builder::ComponentKind;
use crate::common::server::LoggingArgs;
use crate::diag::Diagnostics;
use crate::state::{InstanceId, State};
use tracing::debug;

/// Convert a collector configuration into a fresh [`State`].
///
/// Every referenced instance is decoded, checked and registered before any
/// block is built, so forward references in `output` blocks resolve
/// regardless of the order pipelines list their components. Instances that
/// fail to decode or check are never registered and nothing forwards to
/// them.
pub(crate) fn convert(config: &Config, registry: &Registry) -> (State, Diagnostics) {
    let mut diags = Diagnostics::new();
    let plan = plan::build(config, &mut diags);
    let mut state = State::with_graph(plan.graph);

    if let Some(logging) = telemetry_logging(&config.service.telemetry.logs) {
        state.append_args(&ComponentKind::new("logging"), "", &logging, &mut diags);
    }

    let mut work: Vec<(&InstanceId, &dyn Converter, ComponentConfig)> = Vec::new();
    for id in &plan.order {
        let Some(body) = config.components(id.class).get(&id.name) else {
            continue;
        };
        let component = ComponentId::parse(&id.name);
        let Some(converter) =
            SourceKind::resolve(id.class, component.kind).and_then(|kind| registry.get(kind))
        else {
            diags.warning(format!(
                "unsupported {} \"{}\" component was not converted",
                id.class, component.kind
            ));
            continue;
        };
        let decoded = match ComponentConfig::decode(converter.source_kind(), body) {
            Ok(decoded) => decoded,
            Err(e) => {
                diags.error(format!("failed to decode {}: {}", id, e));
                continue;
            }
        };
        let checked = converter.validate(id, &decoded);
        let rejected = checked.has_errors();
        diags.add_all(checked);
        if rejected {
            debug!(%id, "rejected instance");
            continue;
        }
        let kind = converter.component_kind();
        let label = state.label_in(&kind.to_string(), component.label_base());
        debug!(%id, %kind, %label, "registered instance");
        state.register_instance(id, kind, label, converter.input_component_name());
        work.push((id, converter, decoded));
    }

    for (id, converter, decoded) in work {
        diags.add_all(converter.convert_and_append(&mut state, id, &decoded));
    }
    (state, diags)
}

fn telemetry_logging(logs: &TelemetryLogs) -> Option<LoggingArgs> {
    let level = logs
        .level
        .as_deref()
        .map(str::to_lowercase)
        .filter(|l| l != "info");
    let format = logs
        .encoding
        .as_deref()
        .filter(|e| *e == "json")
        .map(str::to_owned);
    if level.is_none() && format.is_none() {
        return None;
    }
    Some(LoggingArgs { level, format })
}
