//! Deterministic, collision-free block labels.

use std::collections::{HashMap, HashSet};
use telescope_syntax::ast::sanitize_identifier;

/// Join the non-empty `parts` with `_` and sanitize the result into an
/// identifier.
pub fn label_for_parts<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    sanitize_identifier(&joined)
}

/// Hands out labels unique within a scope.
///
/// The first request for a base label gets it unchanged; later requests get
/// `base2`, `base3`, and so on, skipping any candidate already taken.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    taken: HashMap<String, HashSet<String>>,
    next_suffix: HashMap<(String, String), usize>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, scope: &str, base: &str) -> String {
        let base = sanitize_identifier(base);
        let taken = self.taken.entry(scope.to_owned()).or_default();
        if taken.insert(base.clone()) {
            return base;
        }
        let counter = self
            .next_suffix
            .entry((scope.to_owned(), base.clone()))
            .or_insert(2);
        loop {
            let candidate = format!("{}{}", base, counter);
            *counter += 1;
            if taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn is_taken(&self, scope: &str, label: &str) -> bool {
        self.taken
            .get(scope)
            .is_some_and(|labels| labels.contains(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_joined_and_sanitized() {
        assert_eq!(label_for_parts(&["logs_default", "", "varlogs"]), "logs_default_varlogs");
        assert_eq!(label_for_parts(&["my-job", "1"]), "my_job_1");
        assert_eq!(label_for_parts(&["9front"]), "_9front");
        assert_eq!(label_for_parts::<&str>(&[]), "_");
    }

    #[test]
    fn repeats_get_numeric_suffixes() {
        let mut reg = LabelRegistry::new();
        assert_eq!(reg.assign("", "node"), "node");
        assert_eq!(reg.assign("", "node"), "node2");
        assert_eq!(reg.assign("", "node"), "node3");
    }

    #[test]
    fn taken_candidates_are_skipped() {
        let mut reg = LabelRegistry::new();
        assert_eq!(reg.assign("", "node2"), "node2");
        assert_eq!(reg.assign("", "node"), "node");
        assert_eq!(reg.assign("", "node"), "node3");
    }

    #[test]
    fn scopes_are_independent() {
        let mut reg = LabelRegistry::new();
        assert_eq!(reg.assign("otelcol.receiver.otlp", "default"), "default");
        assert_eq!(reg.assign("otelcol.exporter.otlp", "default"), "default");
        assert!(reg.is_taken("otelcol.receiver.otlp", "default"));
        assert!(!reg.is_taken("", "default"));
    }
}
