//! Relabel rules shared by the static and promtail dialects.

use crate::builder::{BlockOf, Regex};
use crate::diag::Diagnostics;
use serde::{Deserialize, Serialize};

const ACTIONS: &[&str] = &[
    "replace",
    "keep",
    "drop",
    "hashmod",
    "labelmap",
    "labeldrop",
    "labelkeep",
    "lowercase",
    "uppercase",
    "keepequal",
    "dropequal",
];

/// A `relabel_configs` entry as written in the source dialects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelabelConfig {
    pub source_labels: Vec<String>,
    pub separator: Option<String>,
    pub target_label: Option<String>,
    pub regex: Option<String>,
    pub modulus: Option<u64>,
    pub replacement: Option<String>,
    pub action: Option<String>,
}

/// Body of a `rule` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleArgs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    pub separator: Option<String>,
    pub regex: Option<Regex>,
    pub modulus: Option<u64>,
    pub target_label: Option<String>,
    pub replacement: Option<String>,
    pub action: Option<String>,
}

impl RelabelConfig {
    /// Check the action and the regex, returning the rule block on success.
    pub fn to_rule(&self) -> Result<BlockOf<RuleArgs>, String> {
        let action = match &self.action {
            Some(a) => {
                let lower = a.to_lowercase();
                if !ACTIONS.contains(&lower.as_str()) {
                    return Err(format!("unknown relabel action '{}'", a));
                }
                Some(lower)
            }
            None => None,
        };
        if let Some(pattern) = &self.regex {
            regex::Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| format!("invalid relabel regex '{}': {}", pattern, regex_reason(&e)))?;
        }
        if action.as_deref() == Some("hashmod") && self.modulus.unwrap_or(0) == 0 {
            return Err("relabel action 'hashmod' requires a non-zero modulus".to_owned());
        }
        Ok(BlockOf(RuleArgs {
            source_labels: self.source_labels.clone(),
            separator: self.separator.clone(),
            regex: self.regex.clone().map(Regex),
            modulus: self.modulus,
            target_label: self.target_label.clone(),
            replacement: self.replacement.clone(),
            action,
        }))
    }
}

/// The last line of a regex error. Syntax errors repeat the pattern with a
/// caret on the lines above it.
fn regex_reason(e: &regex::Error) -> String {
    let text = e.to_string();
    let last = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default();
    last.strip_prefix("error: ").unwrap_or(last).to_owned()
}

/// Convert every rule, dropping invalid ones with an error naming `context`.
pub fn to_rules(
    configs: &[RelabelConfig],
    context: &str,
    diags: &mut Diagnostics,
) -> Vec<BlockOf<RuleArgs>> {
    configs
        .iter()
        .filter_map(|c| match c.to_rule() {
            Ok(rule) => Some(rule),
            Err(reason) => {
                diags.error(format!("dropped relabel rule in {}: {}", context, reason));
                None
            }
        })
        .collect()
}

/// A rule that sets `target_label` to a fixed value.
pub fn set_label_rule(target_label: &str, value: &str) -> BlockOf<RuleArgs> {
    BlockOf(RuleArgs {
        source_labels: Vec::new(),
        separator: None,
        regex: None,
        modulus: None,
        target_label: Some(target_label.to_owned()),
        replacement: Some(value.to_owned()),
        action: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(action: Option<&str>, regex: Option<&str>) -> RelabelConfig {
        RelabelConfig {
            action: action.map(str::to_owned),
            regex: regex.map(str::to_owned),
            ..RelabelConfig::default()
        }
    }

    #[test]
    fn actions_are_normalized() {
        let r = rule(Some("LabelDrop"), Some("tmp_.*")).to_rule().unwrap();
        assert_eq!(r.0.action.as_deref(), Some("labeldrop"));
    }

    #[test]
    fn invalid_rules_are_dropped_with_errors() {
        let configs = vec![
            rule(Some("explode"), None),
            rule(None, Some("(unclosed")),
            rule(Some("hashmod"), None),
            rule(Some("keep"), Some("node_.*")),
        ];
        let mut diags = Diagnostics::new();
        let rules = to_rules(&configs, "job \"node\"", &mut diags);
        assert_eq!(rules.len(), 1);
        assert_eq!(diags.len(), 3);
        assert!(diags
            .iter()
            .all(|d| d.message.starts_with("dropped relabel rule in job \"node\"")));
    }

    #[test]
    fn regex_errors_fit_on_one_line() {
        let mut diags = Diagnostics::new();
        to_rules(&[rule(None, Some("("))], "scrape job \"r\"", &mut diags);
        let shown = diags.to_string();
        assert_eq!(shown.lines().count(), 1, "{}", shown);
        assert_eq!(
            shown,
            "(Error) dropped relabel rule in scrape job \"r\": invalid relabel regex '(': unclosed group\n"
        );
    }
}
