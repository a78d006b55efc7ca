//! Compact writer: renders a [`File`] without alignment or blank lines,
//! every expression on a single line. The converter assembles documents with
//! it; the canonical layout is the printer's job.

use crate::ast::{object_key, quote, Block, Expr, File, Stmt};
use std::fmt;

pub fn write_file(file: &File) -> String {
    let mut out = String::new();
    for stmt in &file.body {
        write_stmt(&mut out, stmt, 0);
    }
    out
}

pub fn write_block(block: &Block) -> String {
    let mut out = String::new();
    write_block_at(&mut out, block, 0);
    out
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::Attribute(attr) => {
            push_indent(out, depth);
            out.push_str(&format!("{} = {}\n", attr.name, attr.value));
        }
        Stmt::Block(block) => write_block_at(out, block, depth),
    }
}

fn write_block_at(out: &mut String, block: &Block, depth: usize) {
    push_indent(out, depth);
    out.push_str(&block.name_string());
    if let Some(label) = &block.label {
        out.push(' ');
        out.push_str(&quote(label));
    }
    out.push_str(" {\n");
    for stmt in &block.body {
        write_stmt(out, stmt, depth + 1);
    }
    push_indent(out, depth);
    out.push_str("}\n");
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Null => write!(f, "null"),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Str(s) => write!(f, "{}", quote(s)),
            Expr::Path(path) => write!(f, "{}", path.join(".")),
            Expr::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Object(fields) if fields.is_empty() => write!(f, "{{}}"),
            Expr::Object(fields) => {
                write!(f, "{{ ")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", object_key(key), value)?;
                }
                write!(f, " }}")
            }
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee.join("."))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
