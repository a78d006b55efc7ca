mod commands;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use telescope_convert::SourceFormat;
use tracing_subscriber::EnvFilter;

/// Output format for diagnostics on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DiagnosticsFormat {
    Text,
    Json,
}

/// Convert agent configuration into a telescope pipeline.
#[derive(Parser)]
#[command(
    name = "telescope-convert",
    version,
    about = "Convert static, promtail and otelcol configuration into telescope pipelines"
)]
struct Cli {
    /// Path to the configuration file to convert
    file: PathBuf,

    /// Dialect of the input file (static, promtail or otelcol)
    #[arg(short = 'f', long = "source-format")]
    source_format: SourceFormat,

    /// Where to write the converted document (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a migration report to this path
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Write the output even when the conversion reported errors
    #[arg(short, long)]
    bypass_errors: bool,

    /// Expand ${VAR} and $VAR from the environment before decoding
    #[arg(long = "config.expand-env")]
    expand_env: bool,

    /// Diagnostics format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    diagnostics: DiagnosticsFormat,

    /// Only print error diagnostics
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::convert::cmd_convert(commands::convert::ConvertArgs {
        file: &cli.file,
        format: cli.source_format,
        output: cli.output.as_deref(),
        report: cli.report.as_deref(),
        bypass_errors: cli.bypass_errors,
        expand_env: cli.expand_env,
        diagnostics: cli.diagnostics,
        quiet: cli.quiet,
    });
}
