//! Per-run conversion state: labels, registered instances, the pipeline
//! graph and the document under construction.

use crate::builder::{self, ComponentKind, Reference, ValueOverride};
use crate::diag::Diagnostics;
use crate::label::LabelRegistry;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use telescope_syntax::{Block, File, Stmt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceClass {
    Receiver,
    Processor,
    Exporter,
}

impl fmt::Display for InstanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceClass::Receiver => write!(f, "receiver"),
            InstanceClass::Processor => write!(f, "processor"),
            InstanceClass::Exporter => write!(f, "exporter"),
        }
    }
}

/// Identity of one source component instance, e.g. receiver `otlp/edge`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    pub class: InstanceClass,
    pub name: String,
}

impl InstanceId {
    pub fn new(class: InstanceClass, name: impl Into<String>) -> Self {
        InstanceId {
            class,
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.class, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Metrics,
    Logs,
    Traces,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Metrics, Signal::Logs, Signal::Traces];

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
            Signal::Traces => "traces",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metrics" => Ok(Signal::Metrics),
            "logs" => Ok(Signal::Logs),
            "traces" => Ok(Signal::Traces),
            other => Err(format!("unknown signal '{}'", other)),
        }
    }
}

/// `(instance, signal)` to ordered, de-duplicated downstream instances.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    edges: IndexMap<(InstanceId, Signal), Vec<InstanceId>>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: &InstanceId, signal: Signal, to: &InstanceId) {
        let downstream = self.edges.entry((from.clone(), signal)).or_default();
        if !downstream.contains(to) {
            downstream.push(to.clone());
        }
    }

    pub fn downstream(&self, from: &InstanceId, signal: Signal) -> &[InstanceId] {
        self.edges
            .get(&(from.clone(), signal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Signals for which `id` has downstream edges, in signal order.
    pub fn signals_from(&self, id: &InstanceId) -> Vec<Signal> {
        Signal::ALL
            .into_iter()
            .filter(|s| self.edges.contains_key(&(id.clone(), *s)))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Registered {
    kind: ComponentKind,
    label: String,
    input: Option<ComponentKind>,
}

/// Mutable state of one conversion run.
#[derive(Debug, Default)]
pub struct State {
    labels: LabelRegistry,
    graph: PipelineGraph,
    instances: HashMap<InstanceId, Registered>,
    file: File,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(graph: PipelineGraph) -> Self {
        State {
            graph,
            ..Self::default()
        }
    }

    /// A document-wide unique label derived from `base`.
    pub fn label(&mut self, base: &str) -> String {
        self.labels.assign("", base)
    }

    /// A label unique among blocks sharing `scope`.
    pub fn label_in(&mut self, scope: &str, base: &str) -> String {
        self.labels.assign(scope, base)
    }

    pub fn register_instance(
        &mut self,
        id: &InstanceId,
        kind: ComponentKind,
        label: String,
        input: Option<ComponentKind>,
    ) {
        self.instances.insert(id.clone(), Registered { kind, label, input });
    }

    pub fn instance_label(&self, id: &InstanceId) -> Option<&str> {
        self.instances.get(id).map(|r| r.label.as_str())
    }

    pub fn instance_kind(&self, id: &InstanceId) -> Option<&ComponentKind> {
        self.instances.get(id).map(|r| &r.kind)
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// References to the inputs of every instance downstream of `id` for
    /// `signal`. Instances that were never registered, or that take no
    /// input, are left out.
    pub fn next(&self, id: &InstanceId, signal: Signal) -> Vec<Reference> {
        self.graph
            .downstream(id, signal)
            .iter()
            .filter_map(|d| self.instances.get(d))
            .filter_map(|r| r.input.as_ref().map(|input| input.export(&r.label, "input")))
            .collect()
    }

    pub fn append_block(&mut self, block: Block) {
        debug!(
            kind = %block.name_string(),
            label = block.label.as_deref().unwrap_or(""),
            "appending block"
        );
        self.file.body.push(Stmt::Block(block));
    }

    /// Encode `args` and append the block. An encoding failure becomes an
    /// error diagnostic and the block is left out.
    pub fn append_args<A>(
        &mut self,
        kind: &ComponentKind,
        label: &str,
        args: &A,
        diags: &mut Diagnostics,
    ) where
        A: Serialize + ?Sized,
    {
        match builder::new_block(kind, label, args) {
            Ok(block) => self.append_block(block),
            Err(e) => diags.error(encode_failure(kind, label, &e)),
        }
    }

    /// Merge one job: its blocks when it succeeded, only its findings when it
    /// failed.
    pub fn merge(&mut self, job: Result<Staged, Diagnostics>) -> Diagnostics {
        match job {
            Ok(staged) => {
                for block in staged.blocks {
                    self.append_block(block);
                }
                staged.diags
            }
            Err(diags) => diags,
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

fn encode_failure(kind: &ComponentKind, label: &str, err: &builder::EncodeError) -> String {
    format!("failed to build {} {:?}: {}", kind, label, err)
}

/// Blocks and findings of one job, held back until the job is complete.
#[derive(Debug, Default)]
pub struct Staged {
    pub blocks: Vec<Block>,
    pub diags: Diagnostics,
}

impl Staged {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and stage a block; returns whether it was staged.
    pub fn push<A>(&mut self, kind: &ComponentKind, label: &str, args: &A) -> bool
    where
        A: Serialize + ?Sized,
    {
        self.push_with(kind, label, args, &mut builder::NoOverride)
    }

    pub fn push_with<A, H>(
        &mut self,
        kind: &ComponentKind,
        label: &str,
        args: &A,
        hook: &mut H,
    ) -> bool
    where
        A: Serialize + ?Sized,
        H: ValueOverride + ?Sized,
    {
        match builder::new_block_with_override(kind, label, args, hook) {
            Ok(block) => {
                self.blocks.push(block);
                true
            }
            Err(e) => {
                self.diags.error(encode_failure(kind, label, &e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(class: InstanceClass, name: &str) -> InstanceId {
        InstanceId::new(class, name)
    }

    #[test]
    fn graph_dedups_in_insertion_order() {
        let r = id(InstanceClass::Receiver, "otlp");
        let a = id(InstanceClass::Exporter, "otlp");
        let b = id(InstanceClass::Exporter, "debug");
        let mut g = PipelineGraph::new();
        g.add_edge(&r, Signal::Traces, &a);
        g.add_edge(&r, Signal::Traces, &b);
        g.add_edge(&r, Signal::Traces, &a);
        assert_eq!(g.downstream(&r, Signal::Traces), [a.clone(), b.clone()]);
        assert!(g.downstream(&r, Signal::Logs).is_empty());
        assert_eq!(g.signals_from(&r), [Signal::Traces]);
    }

    #[test]
    fn next_skips_unregistered_instances() {
        let r = id(InstanceClass::Receiver, "otlp");
        let p = id(InstanceClass::Processor, "batch");
        let unknown = id(InstanceClass::Processor, "groupbytrace");
        let mut g = PipelineGraph::new();
        g.add_edge(&r, Signal::Metrics, &p);
        g.add_edge(&r, Signal::Metrics, &unknown);
        let mut state = State::with_graph(g);
        state.register_instance(
            &p,
            ComponentKind::new("otelcol.processor.batch"),
            "default".into(),
            Some(ComponentKind::new("otelcol.processor.batch")),
        );
        let next: Vec<_> = state
            .next(&r, Signal::Metrics)
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(next, ["otelcol.processor.batch.default.input"]);
    }

    #[test]
    fn global_and_scoped_labels() {
        let mut state = State::new();
        assert_eq!(state.label("default"), "default");
        assert_eq!(state.label("default"), "default2");
        assert_eq!(state.label_in("otelcol.exporter.otlp", "default"), "default");
    }

    #[test]
    fn failed_jobs_contribute_only_diagnostics() {
        #[derive(Serialize)]
        struct Args {
            job_name: &'static str,
        }

        let mut state = State::new();
        let mut ok = Staged::new();
        assert!(ok.push(&ComponentKind::new("prometheus.scrape"), "a", &Args { job_name: "a" }));
        ok.diags.warning("kept");
        let mut failed = Diagnostics::new();
        failed.error("dropped");

        let mut diags = state.merge(Ok(ok));
        diags.add_all(state.merge(Err(failed)));
        assert_eq!(state.file().body.len(), 1);
        assert_eq!(diags.to_string(), "(Warning) kept\n(Error) dropped\n");
    }

    #[test]
    fn encode_failures_skip_the_block() {
        let mut staged = Staged::new();
        assert!(!staged.push(&ComponentKind::new("a.b"), "x", &vec![1]));
        assert!(staged.blocks.is_empty());
        assert!(staged.diags.has_errors());
    }

    #[test]
    fn instance_id_display() {
        let i = id(InstanceClass::Receiver, "otlp/edge");
        assert_eq!(i.to_string(), "receiver \"otlp/edge\"");
    }
}
