//! Converter registry: one converter per [`SourceKind`].

use super::component::{ComponentConfig, SourceKind};
use super::{exporters, processors, receivers};
use crate::builder::{self, ComponentKind, Reference};
use crate::diag::Diagnostics;
use crate::state::{InstanceId, Signal, State};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Turns one decoded collector component into a target block.
pub trait Converter: Send + Sync {
    /// The configuration variant this converter accepts.
    fn source_kind(&self) -> SourceKind;

    /// Kind of the emitted block.
    fn component_kind(&self) -> ComponentKind;

    /// Kind upstream components forward into, as `<kind>.<label>.input`.
    /// `None` for pipeline entry points.
    fn input_component_name(&self) -> Option<ComponentKind>;

    /// Check `config` before the instance is registered. Any error rejects
    /// the instance: no block is built and upstream components do not
    /// forward to it.
    fn validate(&self, _id: &InstanceId, _config: &ComponentConfig) -> Diagnostics {
        Diagnostics::new()
    }

    /// Build the block for `id` and append it to `state`.
    fn convert_and_append(
        &self,
        state: &mut State,
        id: &InstanceId,
        config: &ComponentConfig,
    ) -> Diagnostics;
}

/// Immutable map from [`SourceKind`] to its converter.
pub struct Registry {
    converters: HashMap<SourceKind, Box<dyn Converter>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry {
            converters: HashMap::new(),
        }
    }

    /// Every converter shipped with the crate.
    pub fn builtin() -> Self {
        Registry::new()
            .with(receivers::OtlpReceiverConverter)
            .with(receivers::ZipkinReceiverConverter)
            .with(processors::BatchProcessorConverter)
            .with(processors::MemoryLimiterProcessorConverter)
            .with(processors::TransformProcessorConverter)
            .with(processors::AttributesProcessorConverter)
            .with(exporters::OtlpExporterConverter)
            .with(exporters::OtlpHttpExporterConverter)
            .with(exporters::DebugExporterConverter)
    }

    /// Add `converter`, replacing any converter for the same kind.
    pub fn with<C: Converter + 'static>(mut self, converter: C) -> Self {
        self.converters
            .insert(converter.source_kind(), Box::new(converter));
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&dyn Converter> {
        self.converters.get(&kind).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builtin()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.converters.keys().collect();
        kinds.sort();
        f.debug_struct("Registry").field("kinds", &kinds).finish()
    }
}

/// `output { metrics = [...] logs = [...] traces = [...] }` of a receiver or
/// processor. Signals without consumers are left out.
#[derive(Debug, Default, Serialize)]
pub(super) struct OutputArgs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<Reference>,
}

impl OutputArgs {
    /// Consumers downstream of `id` for each of `signals`.
    pub fn for_signals(state: &State, id: &InstanceId, signals: &[Signal]) -> Self {
        let mut out = OutputArgs::default();
        for signal in signals {
            let next = state.next(id, *signal);
            match signal {
                Signal::Metrics => out.metrics = next,
                Signal::Logs => out.logs = next,
                Signal::Traces => out.traces = next,
            }
        }
        out
    }
}

/// Encode `args` under the label registered for `id` and append the block,
/// reporting the conversion.
pub(super) fn append_converted<A: Serialize>(
    state: &mut State,
    id: &InstanceId,
    kind: &ComponentKind,
    args: &A,
) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let Some(label) = state.instance_label(id).map(str::to_owned) else {
        diags.error(format!("{} was converted before it was registered", id));
        return diags;
    };
    match builder::new_block(kind, &label, args) {
        Ok(block) => {
            diags.info(format!("Converted {} into {}.{}", id, kind, label));
            state.append_block(block);
        }
        Err(e) => diags.error(format!("failed to build {} {:?}: {}", kind, label, e)),
    }
    diags
}

/// A converter handed a configuration of another kind. The orchestrator
/// only dispatches on matching kinds, so this reports an internal defect.
pub(super) fn mismatch(expected: SourceKind, id: &InstanceId) -> Diagnostics {
    let mut diags = Diagnostics::new();
    diags.error(format!(
        "{} was dispatched to the {} converter with a different configuration",
        id, expected
    ));
    diags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_source_kind() {
        let registry = Registry::builtin();
        assert_eq!(registry.len(), 9);
        let converter = registry.get(SourceKind::BatchProcessor).unwrap();
        assert_eq!(converter.component_kind().to_string(), "otelcol.processor.batch");
        assert_eq!(
            converter.input_component_name().map(|k| k.to_string()).as_deref(),
            Some("otelcol.processor.batch")
        );
        let otlp = registry.get(SourceKind::OtlpReceiver).unwrap();
        assert!(otlp.input_component_name().is_none());
    }

    #[test]
    fn empty_registry_has_no_converters() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.get(SourceKind::OtlpExporter).is_none());
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
