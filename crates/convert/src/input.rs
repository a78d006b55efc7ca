//! Decoding dialect text into native configuration trees.

use crate::convert::SourceConfig;
use crate::{otelcol, promtail, staticmode};
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// The dialect a configuration file is written in. Always an explicit
/// choice of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Static,
    Promtail,
    Otelcol,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [
        SourceFormat::Static,
        SourceFormat::Promtail,
        SourceFormat::Otelcol,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Static => "static",
            SourceFormat::Promtail => "promtail",
            SourceFormat::Otelcol => "otelcol",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source format '{0}', expected one of: static, promtail, otelcol")]
pub struct UnknownFormat(pub String);

impl FromStr for SourceFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFormat(s.to_owned()))
    }
}

/// Loader switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Replace `${VAR}` and `$VAR` before decoding.
    pub expand_env: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("failed to parse {format} configuration: {source}")]
    Yaml {
        format: SourceFormat,
        #[source]
        source: serde_yaml::Error,
    },
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-?([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)",
        )
        .expect("env pattern is valid")
    })
}

/// Expand environment references in `text`.
///
/// `${VAR}` and `$VAR` take the value from `lookup`, or the empty string.
/// `${VAR:default}` and `${VAR:-default}` fall back to `default`. `$$` is a
/// literal `$`.
pub fn expand_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_pattern()
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(name) = caps.get(1).or_else(|| caps.get(3)) else {
                return "$".to_owned();
            };
            lookup(name.as_str())
                .or_else(|| caps.get(2).map(|d| d.as_str().to_owned()))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Decode `bytes` as a `format` configuration. Environment lookups go
/// through `lookup` so callers decide where values come from.
pub fn load<F>(
    format: SourceFormat,
    bytes: &[u8],
    options: ConvertOptions,
    lookup: F,
) -> Result<SourceConfig, LoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let text = std::str::from_utf8(bytes)?;
    let expanded;
    let text = if options.expand_env {
        expanded = expand_env(text, lookup);
        expanded.as_str()
    } else {
        text
    };
    debug!(%format, bytes = text.len(), "decoding configuration");
    let yaml = |source| LoadError::Yaml { format, source };
    Ok(match format {
        SourceFormat::Static => {
            SourceConfig::Static(decode::<staticmode::Config>(text).map_err(yaml)?)
        }
        SourceFormat::Promtail => {
            SourceConfig::Promtail(decode::<promtail::Config>(text).map_err(yaml)?)
        }
        SourceFormat::Otelcol => {
            SourceConfig::Otelcol(decode::<otelcol::Config>(text).map_err(yaml)?)
        }
    })
}

/// An empty or comment-only document decodes as the default tree.
fn decode<T>(text: &str) -> Result<T, serde_yaml::Error>
where
    T: serde::de::DeserializeOwned + Default,
{
    if text.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with('#') || l == "---"
    }) {
        return Ok(T::default());
    }
    serde_yaml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(name: &str) -> Option<String> {
        match name {
            "HOST" => Some("node-exporter".to_owned()),
            "PORT" => Some("9100".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn expands_every_form() {
        assert_eq!(expand_env("${HOST}:$PORT", vars), "node-exporter:9100");
        assert_eq!(expand_env("${MISSING:fallback}", vars), "fallback");
        assert_eq!(expand_env("${MISSING:-fallback}", vars), "fallback");
        assert_eq!(expand_env("${HOST:-fallback}", vars), "node-exporter");
        assert_eq!(expand_env("cost: $$5 $MISSING.", vars), "cost: $5 .");
    }

    #[test]
    fn parses_formats() {
        assert_eq!("promtail".parse(), Ok(SourceFormat::Promtail));
        assert_eq!(
            "flow".parse::<SourceFormat>().unwrap_err().to_string(),
            "unknown source format 'flow', expected one of: static, promtail, otelcol"
        );
    }

    #[test]
    fn loads_with_expansion() {
        let yaml = b"clients:\n  - url: http://${HOST}:3100/loki/api/v1/push\n";
        let config = load(
            SourceFormat::Promtail,
            yaml,
            ConvertOptions { expand_env: true },
            vars,
        )
        .unwrap();
        let SourceConfig::Promtail(config) = config else {
            panic!("expected a promtail configuration");
        };
        assert_eq!(config.clients[0].url, "http://node-exporter:3100/loki/api/v1/push");
    }

    #[test]
    fn empty_input_is_the_default_config() {
        let config = load(SourceFormat::Static, b"# nothing\n", ConvertOptions::default(), vars)
            .unwrap();
        assert!(matches!(config, SourceConfig::Static(_)));
    }

    #[test]
    fn malformed_yaml_names_the_format() {
        let err = load(
            SourceFormat::Otelcol,
            b"receivers: [",
            ConvertOptions::default(),
            vars,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("failed to parse otelcol configuration"));
    }
}
