//! Golden fixtures: every `testdata/<dialect>/<name>.yaml` must convert to
//! `<name>.river` byte for byte, with `<name>.diags` listing the
//! diagnostics (no file means none).

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use telescope_convert::{ConvertOptions, Orchestrator, SourceFormat};

fn fixture_env(name: &str) -> Option<String> {
    match name {
        "LOKI_HOST" => Some("loki:3100".to_owned()),
        _ => None,
    }
}

fn collect_inputs(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", dir.display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .collect();
    paths.sort();
    paths
}

fn run_dialect(format: SourceFormat) {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/testdata")
        .join(format.as_str());
    let orchestrator = Orchestrator::default();
    let inputs = collect_inputs(&dir);
    assert!(!inputs.is_empty(), "no fixtures in {}", dir.display());

    for input in inputs {
        let bytes = std::fs::read(&input).unwrap();
        let result = orchestrator
            .convert_bytes(
                format,
                &bytes,
                ConvertOptions { expand_env: true },
                fixture_env,
            )
            .unwrap_or_else(|e| panic!("{}: {}", input.display(), e));

        let expected_river = std::fs::read_to_string(input.with_extension("river"))
            .unwrap_or_else(|e| panic!("{}: missing golden document: {}", input.display(), e));
        let expected_diags =
            std::fs::read_to_string(input.with_extension("diags")).unwrap_or_default();

        assert_eq!(
            String::from_utf8(result.document).unwrap(),
            expected_river,
            "document of {}",
            input.display()
        );
        assert_eq!(
            result.diagnostics.to_string(),
            expected_diags,
            "diagnostics of {}",
            input.display()
        );
    }
}

#[test]
fn static_fixtures() {
    run_dialect(SourceFormat::Static);
}

#[test]
fn promtail_fixtures() {
    run_dialect(SourceFormat::Promtail);
}

#[test]
fn otelcol_fixtures() {
    run_dialect(SourceFormat::Otelcol);
}
