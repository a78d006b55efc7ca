//! Canonical re-formatting of an assembled document.
//!
//! Printing is a post-pass over bytes: parse, print, then check that the
//! printed text parses back to the same tree. Any failure keeps the input
//! bytes and reports one error diagnostic; the run itself never fails here.

use crate::diag::Diagnostics;
use telescope_syntax::{parse_file, print_file};
use tracing::debug;

pub fn pretty_print(input: &[u8]) -> (Vec<u8>, Diagnostics) {
    let mut diags = Diagnostics::new();
    if input.is_empty() {
        return (Vec::new(), diags);
    }
    match format(input) {
        Ok(out) => (out.into_bytes(), diags),
        Err(reason) => {
            debug!(%reason, "leaving document unformatted");
            diags.error(format!("failed to format the output document: {}", reason));
            (input.to_vec(), diags)
        }
    }
}

fn format(input: &[u8]) -> Result<String, String> {
    let text = std::str::from_utf8(input).map_err(|e| format!("invalid UTF-8: {}", e))?;
    let file = parse_file(text).map_err(|e| e.to_string())?;
    let printed = print_file(&file);
    let reparsed = parse_file(&printed).map_err(|e| format!("printed output does not parse: {}", e))?;
    if reparsed != file {
        return Err("printed output does not round-trip".to_owned());
    }
    Ok(printed)
}
