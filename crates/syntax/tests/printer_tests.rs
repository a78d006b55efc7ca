//! Canonical layout and idempotence of the printer.

use pretty_assertions::assert_eq;
use telescope_syntax::{parse_file, print_file};

fn reformat(src: &str) -> String {
    print_file(&parse_file(src).expect("source parses"))
}

#[test]
fn aligns_attribute_runs_and_separates_blocks() {
    let src = r#"
prometheus.scrape "node" {
targets = discovery.static.node.targets
forward_to = [prometheus.remote_write.default.receiver]
job_name = "node"
basic_auth {
username = "admin"
password = "p@ss"
}
}
logging {
level = "debug"
}
"#;
    let expected = "\
prometheus.scrape \"node\" {
\ttargets    = discovery.static.node.targets
\tforward_to = [prometheus.remote_write.default.receiver]
\tjob_name   = \"node\"

\tbasic_auth {
\t\tusername = \"admin\"
\t\tpassword = \"p@ss\"
\t}
}

logging {
\tlevel = \"debug\"
}
";
    assert_eq!(reformat(src), expected);
}

#[test]
fn object_arrays_use_the_bracket_brace_form() {
    let src = r#"discovery.static "node" { targets = [{ __address__ = "localhost:9100", env = "prod" }, { __address__ = "localhost:9101" }] }"#;
    let expected = "\
discovery.static \"node\" {
\ttargets = [{
\t\t__address__ = \"localhost:9100\",
\t\tenv         = \"prod\",
\t}, {
\t\t__address__ = \"localhost:9101\",
\t}]
}
";
    assert_eq!(reformat(src), expected);
}

#[test]
fn mixed_multiline_elements_go_one_per_line() {
    let src = r#"a "b" { targets = concat(x.y.z.targets, [{ __address__ = "h:1" }]) }"#;
    let expected = "\
a \"b\" {
\ttargets = concat(
\t\tx.y.z.targets,
\t\t[{
\t\t\t__address__ = \"h:1\",
\t\t}],
\t)
}
";
    assert_eq!(reformat(src), expected);
}

#[test]
fn empty_values_and_blocks() {
    let src = r#"local.file_match "x" { path_targets = [] labels = {} } loki.process "y" { }"#;
    let expected = "\
local.file_match \"x\" {
\tpath_targets = []
\tlabels       = {}
}

loki.process \"y\" { }
";
    assert_eq!(reformat(src), expected);
}

#[test]
fn quoted_keys_participate_in_alignment() {
    let src = r#"a { headers = { "X-Scope-OrgID" = "t1", accept = "json" } }"#;
    let expected = "\
a {
\theaders = {
\t\t\"X-Scope-OrgID\" = \"t1\",
\t\taccept          = \"json\",
\t}
}
";
    assert_eq!(reformat(src), expected);
}

#[test]
fn printing_is_idempotent() {
    let src = r#"
otelcol.receiver.otlp "default" { grpc { endpoint = "0.0.0.0:4317" } output { traces = [otelcol.processor.batch.default.input] metrics = [] } }
x.y "z" { list = ["a", "b"] nested = { inner = { deep = [1, 2.5, -3] } } flag = true nothing = null }
"#;
    let once = reformat(src);
    let twice = reformat(&once);
    assert_eq!(once, twice);
}

#[test]
fn empty_document_prints_nothing() {
    assert_eq!(reformat("  // only a comment\n"), "");
}
