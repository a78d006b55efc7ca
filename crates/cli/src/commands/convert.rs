use std::io::Write;
use std::path::Path;
use std::process;

use telescope_convert::report;
use telescope_convert::{ConversionResult, ConvertOptions, Orchestrator, Severity, SourceFormat};
use tracing::info;

use crate::DiagnosticsFormat;

pub(crate) struct ConvertArgs<'a> {
    pub file: &'a Path,
    pub format: SourceFormat,
    pub output: Option<&'a Path>,
    pub report: Option<&'a Path>,
    pub bypass_errors: bool,
    pub expand_env: bool,
    pub diagnostics: DiagnosticsFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_convert(args: ConvertArgs<'_>) {
    let bytes = match std::fs::read(args.file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", args.file.display(), e);
            process::exit(1);
        }
    };

    let orchestrator = Orchestrator::default();
    let options = ConvertOptions {
        expand_env: args.expand_env,
    };
    let result = match orchestrator.convert_bytes(args.format, &bytes, options, |name| {
        std::env::var(name).ok()
    }) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}: {}", args.file.display(), e);
            process::exit(1);
        }
    };
    info!(
        file = %args.file.display(),
        format = %args.format,
        diagnostics = result.diagnostics.len(),
        "converted configuration"
    );

    print_diagnostics(&result, args.diagnostics, args.quiet);

    if let Some(path) = args.report {
        if let Err(e) = std::fs::write(path, report::render(&result.diagnostics)) {
            eprintln!("error: failed to write report {}: {}", path.display(), e);
            process::exit(1);
        }
    }

    if result.has_errors() && !args.bypass_errors {
        eprintln!(
            "error: conversion reported {} error(s); rerun with --bypass-errors to write the output anyway",
            result.diagnostics.count(Severity::Error)
        );
        process::exit(1);
    }

    let written = match args.output {
        Some(path) => std::fs::write(path, &result.document),
        None => std::io::stdout().write_all(&result.document),
    };
    if let Err(e) = written {
        eprintln!("error: failed to write output: {}", e);
        process::exit(1);
    }
}

fn print_diagnostics(result: &ConversionResult, format: DiagnosticsFormat, quiet: bool) {
    match format {
        DiagnosticsFormat::Json => {
            let json = serde_json::to_string_pretty(&result.diagnostics)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
            eprintln!("{}", json);
        }
        DiagnosticsFormat::Text => {
            for d in &result.diagnostics {
                if quiet && d.severity != Severity::Error {
                    continue;
                }
                eprintln!("{}", d);
            }
        }
    }
}
