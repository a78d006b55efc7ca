//! Reference check over an assembled document.
//!
//! A reference whose first segment is a component namespace in use must
//! name `<kind>.<label>.<field>` of a block that exists. Anything else
//! (`env`, `constants`, ...) is left alone.

use crate::diag::Diagnostics;
use std::collections::HashSet;
use telescope_syntax::{Body, Expr, File, Stmt};

pub fn validate_references(file: &File) -> Diagnostics {
    let mut components = HashSet::new();
    let mut namespaces = HashSet::new();
    for stmt in &file.body {
        if let Stmt::Block(block) = stmt {
            if let (Some(label), Some(first)) = (&block.label, block.name.first()) {
                components.insert(format!("{}.{}", block.name_string(), label));
                namespaces.insert(first.as_str());
            }
        }
    }

    let mut diags = Diagnostics::new();
    let mut reported = HashSet::new();
    visit_body(&file.body, &mut |expr| {
        let Expr::Path(segments) = expr else {
            return;
        };
        let Some(first) = segments.first() else {
            return;
        };
        if !namespaces.contains(first.as_str()) || resolves(segments, &components) {
            return;
        }
        let dotted = segments.join(".");
        if reported.insert(dotted.clone()) {
            diags.warning(format!(
                "reference {} does not resolve to a component in the document",
                dotted
            ));
        }
    });
    diags
}

/// Some prefix of at least two segments names a block, and at least one
/// field segment follows it.
fn resolves(segments: &[String], components: &HashSet<String>) -> bool {
    (2..segments.len()).any(|end| components.contains(&segments[..end].join(".")))
}

fn visit_body<'a>(body: &'a Body, f: &mut dyn FnMut(&'a Expr)) {
    for stmt in body {
        match stmt {
            Stmt::Attribute(attr) => attr.value.walk(f),
            Stmt::Block(block) => visit_body(&block.body, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telescope_syntax::parse_file;

    fn check(src: &str) -> Diagnostics {
        validate_references(&parse_file(src).unwrap())
    }

    #[test]
    fn resolved_references_pass() {
        let diags = check(concat!(
            "discovery.static \"node\" {\n\ttargets = []\n}\n",
            "prometheus.scrape \"node\" {\n",
            "\ttargets = discovery.static.node.targets\n",
            "\tforward_to = [prometheus.remote_write.default.receiver]\n",
            "}\n",
            "prometheus.remote_write \"default\" {\n}\n",
        ));
        assert!(diags.is_empty(), "{}", diags);
    }

    #[test]
    fn dangling_references_warn_once() {
        let diags = check(concat!(
            "prometheus.scrape \"a\" {\n",
            "\tforward_to = [prometheus.remote_write.gone.receiver]\n",
            "}\n",
            "prometheus.scrape \"b\" {\n",
            "\tforward_to = [prometheus.remote_write.gone.receiver]\n",
            "\ttargets = concat(env.TARGETS, discovery.file.x.targets)\n",
            "}\n",
        ));
        assert_eq!(
            diags.to_string(),
            "(Warning) reference prometheus.remote_write.gone.receiver does not resolve to a component in the document\n"
        );
    }

    #[test]
    fn nested_blocks_are_checked() {
        let diags = check(concat!(
            "otelcol.receiver.otlp \"default\" {\n",
            "\toutput {\n\t\ttraces = [otelcol.exporter.otlp.missing.input]\n\t}\n",
            "}\n",
        ));
        assert_eq!(diags.len(), 1);
    }
}
