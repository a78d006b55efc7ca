//! telescope-convert: agent configuration to telescope pipelines.
//!
//! Three front-ends share one backend:
//!
//! - [`staticmode`] -- static agent (metrics instances, integrations, logs)
//! - [`promtail`] -- log shipping agent
//! - [`otelcol`] -- collector pipelines, converted through a [`Registry`]
//!
//! Each front-end fills a [`State`] through the [`builder`]; the result is
//! checked for dangling references, written and passed through the
//! canonical printer.
//!
//! # Public API
//!
//! - [`convert_static`], [`convert_promtail`], [`convert_otelcol`] -- one
//!   native tree in, a [`ConversionResult`] out
//! - [`Orchestrator`] -- dispatch over [`SourceConfig`], decoding bytes
//!   through [`input::load`]
//! - [`report::render`] -- a migration report from the diagnostics

pub mod builder;
pub mod common;
pub mod convert;
pub mod diag;
pub mod duration;
pub mod input;
pub mod label;
pub mod otelcol;
pub mod pretty;
pub mod promtail;
pub mod refs;
pub mod report;
pub mod state;
pub mod staticmode;

// ── Convenience re-exports ───────────────────────────────────────────

pub use convert::{
    convert_otelcol, convert_promtail, convert_static, ConversionResult, Orchestrator,
    SourceConfig,
};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use input::{expand_env, ConvertOptions, LoadError, SourceFormat};
pub use otelcol::Registry;
pub use state::State;
