//! Canonical printer.
//!
//! Layout rules:
//!
//! - one tab per nesting level;
//! - a blank line between two statements whenever either one is a block;
//! - `=` aligned across each run of consecutive attributes;
//! - objects always span lines, with aligned keys and trailing commas;
//! - arrays and calls stay on one line unless an element spans lines;
//! - arrays made only of non-empty objects use the `[{ ... }, { ... }]` form.
//!
//! Printing a parsed canonical document yields the same bytes.

use crate::ast::{object_key, quote, Block, Expr, File, Stmt};

pub fn print_file(file: &File) -> String {
    let mut printer = Printer { out: String::new() };
    printer.body(&file.body, 0);
    printer.out
}

struct Printer {
    out: String,
}

impl Printer {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push('\t');
        }
    }

    fn body(&mut self, stmts: &[Stmt], depth: usize) {
        let widths = attribute_widths(stmts);
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 && (is_block(&stmts[i - 1]) || is_block(stmt)) {
                self.out.push('\n');
            }
            match stmt {
                Stmt::Attribute(attr) => {
                    self.indent(depth);
                    self.out.push_str(&attr.name);
                    pad(&mut self.out, attr.name.chars().count(), widths[i]);
                    self.out.push_str(" = ");
                    self.expr(&attr.value, depth);
                    self.out.push('\n');
                }
                Stmt::Block(block) => self.block(block, depth),
            }
        }
    }

    fn block(&mut self, block: &Block, depth: usize) {
        self.indent(depth);
        self.out.push_str(&block.name_string());
        if let Some(label) = &block.label {
            self.out.push(' ');
            self.out.push_str(&quote(label));
        }
        if block.body.is_empty() {
            self.out.push_str(" { }\n");
            return;
        }
        self.out.push_str(" {\n");
        self.body(&block.body, depth + 1);
        self.indent(depth);
        self.out.push_str("}\n");
    }

    /// Write `expr` starting at the current position; continuation lines are
    /// indented relative to `depth`.
    fn expr(&mut self, expr: &Expr, depth: usize) {
        match expr {
            Expr::Array(items) if items.is_empty() => self.out.push_str("[]"),
            Expr::Array(items) if !items.iter().any(is_multiline) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(item, depth);
                }
                self.out.push(']');
            }
            Expr::Array(items) if items.iter().all(is_nonempty_object) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(item, depth);
                }
                self.out.push(']');
            }
            Expr::Array(items) => {
                self.out.push_str("[\n");
                self.items(items, depth + 1);
                self.indent(depth);
                self.out.push(']');
            }
            Expr::Object(fields) if fields.is_empty() => self.out.push_str("{}"),
            Expr::Object(fields) => {
                let keys: Vec<String> = fields.iter().map(|(k, _)| object_key(k)).collect();
                let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0);
                self.out.push_str("{\n");
                for (key, (_, value)) in keys.iter().zip(fields) {
                    self.indent(depth + 1);
                    self.out.push_str(key);
                    pad(&mut self.out, key.chars().count(), width);
                    self.out.push_str(" = ");
                    self.expr(value, depth + 1);
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push('}');
            }
            Expr::Call { callee, args } if args.iter().any(is_multiline) => {
                self.out.push_str(&callee.join("."));
                self.out.push_str("(\n");
                self.items(args, depth + 1);
                self.indent(depth);
                self.out.push(')');
            }
            // Scalars, references and single-line calls share the compact form.
            other => self.out.push_str(&other.to_string()),
        }
    }

    /// One element per line, each followed by a comma.
    fn items(&mut self, items: &[Expr], depth: usize) {
        for item in items {
            self.indent(depth);
            self.expr(item, depth);
            self.out.push_str(",\n");
        }
    }
}

fn is_block(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Block(_))
}

fn is_nonempty_object(expr: &Expr) -> bool {
    matches!(expr, Expr::Object(fields) if !fields.is_empty())
}

/// Whether the canonical form of `expr` spans more than one line.
pub fn is_multiline(expr: &Expr) -> bool {
    match expr {
        Expr::Object(fields) => !fields.is_empty(),
        Expr::Array(items) => items.iter().any(is_multiline),
        Expr::Call { args, .. } => args.iter().any(is_multiline),
        _ => false,
    }
}

/// For each statement, the alignment width of its attribute run (0 for blocks).
fn attribute_widths(stmts: &[Stmt]) -> Vec<usize> {
    let mut widths = vec![0; stmts.len()];
    let mut start = 0;
    while start < stmts.len() {
        if is_block(&stmts[start]) {
            start += 1;
            continue;
        }
        let mut end = start;
        let mut width = 0;
        while end < stmts.len() {
            match &stmts[end] {
                Stmt::Attribute(attr) => width = width.max(attr.name.chars().count()),
                Stmt::Block(_) => break,
            }
            end += 1;
        }
        for w in &mut widths[start..end] {
            *w = width;
        }
        start = end;
    }
    widths
}

fn pad(out: &mut String, len: usize, width: usize) {
    for _ in len..width {
        out.push(' ');
    }
}
