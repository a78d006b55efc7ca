use super::component::{ComponentConfig, SourceKind};
use super::registry::{append_converted, mismatch, Converter, OutputArgs};
use crate::builder::{BlockOf, ComponentKind};
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::state::{InstanceId, Signal, State};
use serde::{Deserialize, Serialize};

/// Implements the boilerplate of a processor converter. Processors take
/// input under their own kind and forward every signal downstream.
/// `check` rejects unusable settings before registration and `args` builds
/// the block body.
macro_rules! processor {
    ($converter:ident, $variant:ident, $kind:literal, check = $check:path, args = $args:path) => {
        pub struct $converter;

        impl Converter for $converter {
            fn source_kind(&self) -> SourceKind {
                SourceKind::$variant
            }

            fn component_kind(&self) -> ComponentKind {
                ComponentKind::new($kind)
            }

            fn input_component_name(&self) -> Option<ComponentKind> {
                Some(self.component_kind())
            }

            fn validate(&self, id: &InstanceId, config: &ComponentConfig) -> Diagnostics {
                match config {
                    ComponentConfig::$variant(cfg) => $check(id, cfg),
                    _ => mismatch(self.source_kind(), id),
                }
            }

            fn convert_and_append(
                &self,
                state: &mut State,
                id: &InstanceId,
                config: &ComponentConfig,
            ) -> Diagnostics {
                let ComponentConfig::$variant(cfg) = config else {
                    return mismatch(self.source_kind(), id);
                };
                let output = OutputArgs::for_signals(state, id, &Signal::ALL);
                let (args, mut diags) = $args(id, cfg, output);
                diags.add_all(append_converted(state, id, &self.component_kind(), &args));
                diags
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchProcessorConfig {
    pub timeout: Option<Duration>,
    pub send_batch_size: Option<u32>,
    pub send_batch_max_size: Option<u32>,
    pub metadata_keys: Vec<String>,
    pub metadata_cardinality_limit: Option<u32>,
}

#[derive(Serialize)]
struct BatchArgs {
    timeout: Option<Duration>,
    send_batch_size: Option<u32>,
    send_batch_max_size: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metadata_keys: Vec<String>,
    metadata_cardinality_limit: Option<u32>,
    output: BlockOf<OutputArgs>,
}

fn check_batch(id: &InstanceId, cfg: &BatchProcessorConfig) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if let (Some(size), Some(max)) = (cfg.send_batch_size, cfg.send_batch_max_size) {
        if max != 0 && max < size {
            diags.error(format!(
                "{}: send_batch_max_size ({}) must be greater than or equal to send_batch_size ({})",
                id, max, size
            ));
        }
    }
    diags
}

fn batch_args(
    _id: &InstanceId,
    cfg: &BatchProcessorConfig,
    output: OutputArgs,
) -> (BatchArgs, Diagnostics) {
    let args = BatchArgs {
        timeout: cfg.timeout,
        send_batch_size: cfg.send_batch_size,
        send_batch_max_size: cfg.send_batch_max_size,
        metadata_keys: cfg.metadata_keys.clone(),
        metadata_cardinality_limit: cfg.metadata_cardinality_limit,
        output: BlockOf(output),
    };
    (args, Diagnostics::new())
}

processor!(
    BatchProcessorConverter,
    BatchProcessor,
    "otelcol.processor.batch",
    check = check_batch,
    args = batch_args
);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemoryLimiterProcessorConfig {
    pub check_interval: Option<Duration>,
    pub limit_mib: Option<u32>,
    pub spike_limit_mib: Option<u32>,
    pub limit_percentage: Option<u32>,
    pub spike_limit_percentage: Option<u32>,
}

#[derive(Serialize)]
struct MemoryLimiterArgs {
    check_interval: Option<Duration>,
    limit: Option<String>,
    spike_limit: Option<String>,
    limit_percentage: Option<u32>,
    spike_limit_percentage: Option<u32>,
    output: BlockOf<OutputArgs>,
}

fn mib(value: u32) -> String {
    crate::common::byte_size(u64::from(value) << 20)
}

fn check_memory_limiter(id: &InstanceId, cfg: &MemoryLimiterProcessorConfig) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if cfg.check_interval.map_or(true, |d| d.is_zero()) {
        diags.error(format!("{}: check_interval must be greater than zero", id));
    }
    if cfg.limit_mib.is_none() && cfg.limit_percentage.is_none() {
        diags.error(format!(
            "{}: one of limit_mib or limit_percentage must be set",
            id
        ));
    }
    diags
}

fn memory_limiter_args(
    _id: &InstanceId,
    cfg: &MemoryLimiterProcessorConfig,
    output: OutputArgs,
) -> (MemoryLimiterArgs, Diagnostics) {
    let args = MemoryLimiterArgs {
        check_interval: cfg.check_interval,
        limit: cfg.limit_mib.map(mib),
        spike_limit: cfg.spike_limit_mib.map(mib),
        limit_percentage: cfg.limit_percentage,
        spike_limit_percentage: cfg.spike_limit_percentage,
        output: BlockOf(output),
    };
    (args, Diagnostics::new())
}

processor!(
    MemoryLimiterProcessorConverter,
    MemoryLimiterProcessor,
    "otelcol.processor.memory_limiter",
    check = check_memory_limiter,
    args = memory_limiter_args
);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatementGroup {
    pub context: String,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformProcessorConfig {
    pub error_mode: Option<String>,
    pub trace_statements: Vec<StatementGroup>,
    pub metric_statements: Vec<StatementGroup>,
    pub log_statements: Vec<StatementGroup>,
}

#[derive(Serialize)]
struct StatementArgs {
    context: String,
    statements: Vec<String>,
}

#[derive(Serialize)]
struct TransformArgs {
    error_mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trace_statements: Vec<BlockOf<StatementArgs>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metric_statements: Vec<BlockOf<StatementArgs>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    log_statements: Vec<BlockOf<StatementArgs>>,
    output: BlockOf<OutputArgs>,
}

fn statement_blocks(groups: &[StatementGroup]) -> Vec<BlockOf<StatementArgs>> {
    groups
        .iter()
        .map(|g| {
            BlockOf(StatementArgs {
                context: g.context.clone(),
                statements: g.statements.clone(),
            })
        })
        .collect()
}

fn check_transform(id: &InstanceId, cfg: &TransformProcessorConfig) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if let Some(mode) = cfg.error_mode.as_deref() {
        if !matches!(mode, "ignore" | "silent" | "propagate") {
            diags.error(format!("{}: unknown error_mode '{}'", id, mode));
        }
    }
    diags
}

fn transform_args(
    _id: &InstanceId,
    cfg: &TransformProcessorConfig,
    output: OutputArgs,
) -> (TransformArgs, Diagnostics) {
    let args = TransformArgs {
        error_mode: cfg.error_mode.clone(),
        trace_statements: statement_blocks(&cfg.trace_statements),
        metric_statements: statement_blocks(&cfg.metric_statements),
        log_statements: statement_blocks(&cfg.log_statements),
        output: BlockOf(output),
    };
    (args, Diagnostics::new())
}

processor!(
    TransformProcessorConverter,
    TransformProcessor,
    "otelcol.processor.transform",
    check = check_transform,
    args = transform_args
);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttributeAction {
    pub key: String,
    pub action: String,
    pub value: Option<serde_json::Value>,
    pub pattern: Option<String>,
    pub from_attribute: Option<String>,
    pub from_context: Option<String>,
    pub converted_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttributesProcessorConfig {
    pub actions: Vec<AttributeAction>,
    pub include: Option<serde_json::Value>,
    pub exclude: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ActionArgs {
    key: String,
    action: String,
    value: Option<serde_json::Value>,
    pattern: Option<String>,
    from_attribute: Option<String>,
    from_context: Option<String>,
    converted_type: Option<String>,
}

#[derive(Serialize)]
struct AttributesArgs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    action: Vec<BlockOf<ActionArgs>>,
    output: BlockOf<OutputArgs>,
}

const ACTIONS: [&str; 7] = [
    "insert", "update", "upsert", "delete", "hash", "extract", "convert",
];

fn check_attributes(id: &InstanceId, cfg: &AttributesProcessorConfig) -> Diagnostics {
    let mut diags = Diagnostics::new();
    for action in &cfg.actions {
        if !ACTIONS.contains(&action.action.as_str()) {
            diags.error(format!(
                "{}: unknown action '{}' for key '{}'",
                id, action.action, action.key
            ));
        }
    }
    diags
}

fn attributes_args(
    id: &InstanceId,
    cfg: &AttributesProcessorConfig,
    output: OutputArgs,
) -> (AttributesArgs, Diagnostics) {
    let mut diags = Diagnostics::new();
    for (name, filter) in [("include", &cfg.include), ("exclude", &cfg.exclude)] {
        if filter.is_some() {
            diags.warning(format!(
                "{}: the {} filter is not supported and was ignored",
                id, name
            ));
        }
    }
    let args = AttributesArgs {
        action: cfg
            .actions
            .iter()
            .map(|a| {
                BlockOf(ActionArgs {
                    key: a.key.clone(),
                    action: a.action.clone(),
                    value: a.value.clone(),
                    pattern: a.pattern.clone(),
                    from_attribute: a.from_attribute.clone(),
                    from_context: a.from_context.clone(),
                    converted_type: a.converted_type.clone(),
                })
            })
            .collect(),
        output: BlockOf(output),
    };
    (args, diags)
}

processor!(
    AttributesProcessorConverter,
    AttributesProcessor,
    "otelcol.processor.attributes",
    check = check_attributes,
    args = attributes_args
);
