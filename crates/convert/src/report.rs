//! Human-readable migration report.

use crate::diag::{Diagnostics, Severity};
use std::fmt::Write as _;

/// Render `diags` as a report: a summary header, then one section per
/// severity from errors down to info. Findings keep their order within a
/// section.
pub fn render(diags: &Diagnostics) -> String {
    let mut out = String::new();
    let errors = diags.count(Severity::Error);
    let warnings = diags.count(Severity::Warning);
    let infos = diags.count(Severity::Info);
    let _ = writeln!(
        out,
        "Conversion report: {} error{}, {} warning{}, {} info",
        errors,
        plural(errors),
        warnings,
        plural(warnings),
        infos,
    );

    for (severity, title) in [
        (Severity::Error, "Errors"),
        (Severity::Warning, "Warnings"),
        (Severity::Info, "Info"),
    ] {
        let mut section = diags.iter().filter(|d| d.severity == severity).peekable();
        if section.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "\n{}:", title);
        for d in section {
            let _ = writeln!(out, "  {}", d);
        }
    }
    out
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
