//! Entry points: one conversion per call, from a native tree to a formatted
//! document plus diagnostics.

use crate::diag::Diagnostics;
use crate::input::{self, ConvertOptions, LoadError, SourceFormat};
use crate::otelcol::{self, Registry};
use crate::pretty::pretty_print;
use crate::refs::validate_references;
use crate::state::State;
use crate::{promtail, staticmode};
use telescope_syntax::write_file;
use tracing::debug;

/// The converted document and every finding of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionResult {
    pub document: Vec<u8>,
    pub diagnostics: Diagnostics,
}

impl ConversionResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// A decoded configuration in one of the supported dialects.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Static(staticmode::Config),
    Promtail(promtail::Config),
    Otelcol(otelcol::Config),
}

impl SourceConfig {
    pub fn format(&self) -> SourceFormat {
        match self {
            SourceConfig::Static(_) => SourceFormat::Static,
            SourceConfig::Promtail(_) => SourceFormat::Promtail,
            SourceConfig::Otelcol(_) => SourceFormat::Otelcol,
        }
    }
}

pub fn convert_static(config: &staticmode::Config) -> ConversionResult {
    let mut state = State::new();
    let diags = staticmode::convert(config, &mut state);
    finish(state, diags)
}

pub fn convert_promtail(config: &promtail::Config) -> ConversionResult {
    let mut state = State::new();
    let diags = promtail::convert(config, &mut state);
    finish(state, diags)
}

pub fn convert_otelcol(config: &otelcol::Config, registry: &Registry) -> ConversionResult {
    let (state, diags) = otelcol::convert(config, registry);
    finish(state, diags)
}

/// Check references, write and format the document.
fn finish(state: State, mut diagnostics: Diagnostics) -> ConversionResult {
    let file = state.into_file();
    diagnostics.add_all(validate_references(&file));
    let (document, printed) = pretty_print(write_file(&file).as_bytes());
    diagnostics.add_all(printed);
    debug!(
        blocks = file.body.len(),
        diagnostics = diagnostics.len(),
        "conversion finished"
    );
    ConversionResult {
        document,
        diagnostics,
    }
}

/// Dispatches configurations to their front-end. Holds the otelcol
/// converter registry; shareable across threads.
#[derive(Debug, Default)]
pub struct Orchestrator {
    registry: Registry,
}

impl Orchestrator {
    pub fn new(registry: Registry) -> Self {
        Orchestrator { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn convert(&self, config: &SourceConfig) -> ConversionResult {
        debug!(format = %config.format(), "converting configuration");
        match config {
            SourceConfig::Static(c) => convert_static(c),
            SourceConfig::Promtail(c) => convert_promtail(c),
            SourceConfig::Otelcol(c) => convert_otelcol(c, &self.registry),
        }
    }

    /// Decode then convert. Only decoding can fail; conversion problems are
    /// diagnostics.
    pub fn convert_bytes<F>(
        &self,
        format: SourceFormat,
        bytes: &[u8],
        options: ConvertOptions,
        lookup: F,
    ) -> Result<ConversionResult, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = input::load(format, bytes, options, lookup)?;
        Ok(self.convert(&config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_configuration_is_an_empty_document() {
        let result = convert_static(&staticmode::Config::default());
        assert!(result.document.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn static_scrape_job_is_formatted() {
        let orchestrator = Orchestrator::default();
        let result = orchestrator
            .convert_bytes(
                SourceFormat::Static,
                concat!(
                    "metrics:\n",
                    "  configs:\n",
                    "    - scrape_configs:\n",
                    "        - job_name: node\n",
                    "          static_configs:\n",
                    "            - targets: [localhost:9100]\n",
                )
                .as_bytes(),
                ConvertOptions::default(),
                no_env,
            )
            .unwrap();
        assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);
        assert_eq!(
            String::from_utf8(result.document).unwrap(),
            concat!(
                "discovery.static \"node\" {\n",
                "\ttargets = [{\n",
                "\t\t__address__ = \"localhost:9100\",\n",
                "\t}]\n",
                "}\n",
                "\n",
                "prometheus.scrape \"node\" {\n",
                "\ttargets    = discovery.static.node.targets\n",
                "\tforward_to = []\n",
                "\tjob_name   = \"node\"\n",
                "}\n",
            )
        );
    }

    #[test]
    fn orchestrator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Orchestrator>();
    }

    #[test]
    fn source_config_reports_its_format() {
        let config = SourceConfig::Otelcol(otelcol::Config::default());
        assert_eq!(config.format(), SourceFormat::Otelcol);
        let result = Orchestrator::default().convert(&config);
        assert!(result.document.is_empty());
    }
}
