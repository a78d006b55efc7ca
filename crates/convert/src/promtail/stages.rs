//! Pipeline stages of a `loki.process` block.

use crate::builder::BlockOf;
use crate::diag::Diagnostics;
use crate::duration::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Stages without a counterpart in the target processor.
const UNSUPPORTED: &[&str] = &["metrics", "match", "multiline", "pack", "limit", "sampling"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) enum Stage {
    #[serde(rename = "stage.json")]
    Json(BlockOf<JsonStage>),
    #[serde(rename = "stage.regex")]
    Regex(BlockOf<RegexStage>),
    #[serde(rename = "stage.labels")]
    Labels(BlockOf<ValuesStage>),
    #[serde(rename = "stage.static_labels")]
    StaticLabels(BlockOf<ValuesStage>),
    #[serde(rename = "stage.timestamp")]
    Timestamp(BlockOf<TimestampStage>),
    #[serde(rename = "stage.output")]
    Output(BlockOf<OutputStage>),
    #[serde(rename = "stage.template")]
    Template(BlockOf<TemplateStage>),
    #[serde(rename = "stage.label_drop")]
    LabelDrop(BlockOf<ListStage>),
    #[serde(rename = "stage.label_keep")]
    LabelKeep(BlockOf<ListStage>),
    #[serde(rename = "stage.tenant")]
    Tenant(BlockOf<TenantStage>),
    #[serde(rename = "stage.docker")]
    Docker(BlockOf<EmptyStage>),
    #[serde(rename = "stage.cri")]
    Cri(BlockOf<EmptyStage>),
    #[serde(rename = "stage.drop")]
    Drop(BlockOf<DropStage>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct JsonStage {
    #[serde(default)]
    expressions: BTreeMap<String, Option<String>>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    drop_malformed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct RegexStage {
    expression: String,
    #[serde(default)]
    source: Option<String>,
}

/// `values = { ... }` for the label stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct ValuesStage {
    values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct TimestampStage {
    source: String,
    format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fallback_formats: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    action_on_failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct OutputStage {
    source: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct TemplateStage {
    source: String,
    template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct ListStage {
    values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct TenantStage {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct EmptyStage {}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub(super) struct DropStage {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    older_than: Option<Duration>,
    #[serde(default)]
    longer_than: Option<String>,
    #[serde(default)]
    drop_counter_reason: Option<String>,
}

/// Convert `pipeline_stages`. Unsupported or malformed stages are reported
/// against `context` and left out.
pub(super) fn convert(
    stages: &[serde_yaml::Value],
    context: &str,
    diags: &mut Diagnostics,
) -> Vec<Stage> {
    stages
        .iter()
        .filter_map(|raw| match convert_stage(raw) {
            Ok(stage) => Some(stage),
            Err(message) => {
                diags.error(format!("{} in {}", message, context));
                None
            }
        })
        .collect()
}

fn convert_stage(raw: &serde_yaml::Value) -> Result<Stage, String> {
    let (name, body) = match raw.as_mapping() {
        Some(map) if map.len() == 1 => {
            let (key, value) = map.iter().next().ok_or("empty pipeline stage")?;
            let name = key.as_str().ok_or("pipeline stage names must be strings")?;
            (name, value)
        }
        _ => return Err("each pipeline stage must be a map with a single key".to_owned()),
    };
    trace!(stage = name, "converting pipeline stage");

    let stage = match name {
        "json" => {
            let mut json: JsonStage = decode(name, body)?;
            for value in json.expressions.values_mut() {
                value.get_or_insert_with(String::new);
            }
            Stage::Json(BlockOf(json))
        }
        "regex" => Stage::Regex(BlockOf(decode(name, body)?)),
        "labels" => Stage::Labels(BlockOf(ValuesStage {
            values: decode::<BTreeMap<String, Option<String>>>(name, body)?
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or_default()))
                .collect(),
        })),
        "static_labels" => Stage::StaticLabels(BlockOf(ValuesStage {
            values: decode(name, body)?,
        })),
        "timestamp" => Stage::Timestamp(BlockOf(decode(name, body)?)),
        "output" => Stage::Output(BlockOf(decode(name, body)?)),
        "template" => Stage::Template(BlockOf(decode(name, body)?)),
        "labeldrop" => Stage::LabelDrop(BlockOf(ListStage {
            values: decode(name, body)?,
        })),
        "labelallow" => Stage::LabelKeep(BlockOf(ListStage {
            values: decode(name, body)?,
        })),
        "tenant" => Stage::Tenant(BlockOf(decode(name, body)?)),
        "docker" => Stage::Docker(BlockOf(EmptyStage {})),
        "cri" => Stage::Cri(BlockOf(EmptyStage {})),
        "drop" => Stage::Drop(BlockOf(decode(name, body)?)),
        other if UNSUPPORTED.contains(&other) => {
            return Err(format!("unsupported pipeline stage '{}' was not converted", other))
        }
        other => return Err(format!("unknown pipeline stage '{}'", other)),
    };
    Ok(stage)
}

fn decode<T: DeserializeOwned>(name: &str, body: &serde_yaml::Value) -> Result<T, String> {
    serde_yaml::from_value(body.clone()).map_err(|e| format!("invalid '{}' stage: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{new_block, ComponentKind};
    use telescope_syntax::write_block;

    #[derive(Serialize)]
    struct ProcessArgs {
        stage: Vec<Stage>,
    }

    fn stages(yaml: &str) -> (Vec<Stage>, Diagnostics) {
        let raw: Vec<serde_yaml::Value> = serde_yaml::from_str(yaml).unwrap();
        let mut diags = Diagnostics::new();
        let stages = convert(&raw, "job \"app\"", &mut diags);
        (stages, diags)
    }

    #[test]
    fn json_labels_and_docker() {
        let (stages, diags) = stages(concat!(
            "- docker: {}\n",
            "- json:\n    expressions:\n      level:\n      msg: message\n",
            "- labels:\n    level:\n",
        ));
        assert!(diags.is_empty());
        let block =
            new_block(&ComponentKind::new("loki.process"), "app", &ProcessArgs { stage: stages })
                .unwrap();
        assert_eq!(
            write_block(&block),
            concat!(
                "loki.process \"app\" {\n",
                "\tstage.docker {\n\t}\n",
                "\tstage.json {\n\t\texpressions = { level = \"\", msg = \"message\" }\n\t}\n",
                "\tstage.labels {\n\t\tvalues = { level = \"\" }\n\t}\n",
                "}\n",
            )
        );
    }

    #[test]
    fn unsupported_stages_are_reported_and_skipped() {
        let (stages, diags) = stages(concat!(
            "- multiline:\n    firstline: '^\\d'\n",
            "- output:\n    source: msg\n",
            "- frobnicate: {}\n",
        ));
        assert_eq!(stages.len(), 1);
        assert_eq!(
            diags.to_string(),
            concat!(
                "(Error) unsupported pipeline stage 'multiline' was not converted in job \"app\"\n",
                "(Error) unknown pipeline stage 'frobnicate' in job \"app\"\n",
            )
        );
    }

    #[test]
    fn malformed_stage_body() {
        let (stages, diags) = stages("- regex:\n    source: msg\n");
        assert!(stages.is_empty());
        assert!(diags.to_string().starts_with("(Error) invalid 'regex' stage: "));
    }

    #[test]
    fn drop_and_labeldrop() {
        let (stages, diags) = stages(concat!(
            "- drop:\n    source: level\n    value: debug\n    older_than: 24h\n",
            "- labeldrop: [filename]\n",
        ));
        assert!(diags.is_empty());
        assert_eq!(stages.len(), 2);
        assert!(matches!(stages[1], Stage::LabelDrop(_)));
    }
}
