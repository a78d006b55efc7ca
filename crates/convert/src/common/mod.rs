//! Source settings and target arguments shared by more than one dialect.

pub mod http;
pub mod relabel;
pub mod server;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use telescope_syntax::Expr;

use crate::builder::{Concat, Reference, Target, Targets};

/// A `static_configs` entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Flatten static configs into discovery targets, in source order.
pub fn static_targets(configs: &[StaticConfig]) -> Targets {
    Targets(
        configs
            .iter()
            .flat_map(|c| c.targets.iter().map(|t| Target::new(t.clone(), &c.labels)))
            .collect(),
    )
}

/// Where a component reads its targets from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TargetsExpr {
    Static(Targets),
    Export(Reference),
    Concat(Concat),
}

/// Combine target exports: none is an empty list, one is used directly,
/// several are joined with `concat`.
pub fn combine_targets(mut exports: Vec<Reference>) -> TargetsExpr {
    match exports.len() {
        0 => TargetsExpr::Static(Targets::default()),
        1 => TargetsExpr::Export(exports.remove(0)),
        _ => TargetsExpr::Concat(Concat(exports)),
    }
}

/// `[a, b]` of references.
pub fn reference_list(refs: &[Reference]) -> Expr {
    Expr::Array(refs.iter().map(Reference::to_expr).collect())
}

/// Byte sizes the way the pipeline language writes them (`1MiB`, `512KiB`).
pub fn byte_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10)];
    for (unit, size) in UNITS {
        if bytes >= size && bytes % size == 0 {
            return format!("{}{}", bytes / size, unit);
        }
    }
    format!("{}B", bytes)
}
