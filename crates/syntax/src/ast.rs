//! Syntax tree for pipeline documents.
//!
//! A document is a flat list of statements. Every statement is either an
//! attribute (`name = expr`) or a block (`a.b.c "label" { ... }`). The
//! converter builds these trees directly; the parser rebuilds them from text.

use crate::lexer::{is_ident_continue, is_ident_start};

/// A complete document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub body: Body,
}

/// Ordered statements of a file or block body.
pub type Body = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Attribute(Attribute),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Dotted name segments, e.g. `["prometheus", "scrape"]`.
    pub name: Vec<String>,
    pub label: Option<String>,
    pub body: Body,
}

impl Block {
    pub fn new(name: Vec<String>, label: Option<String>) -> Self {
        Block {
            name,
            label,
            body: Vec::new(),
        }
    }

    /// The dotted block name, e.g. `prometheus.scrape`.
    pub fn name_string(&self) -> String {
        self.name.join(".")
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, value: Expr) {
        self.body.push(Stmt::Attribute(Attribute {
            name: name.into(),
            value,
        }));
    }

    pub fn push_block(&mut self, block: Block) {
        self.body.push(Stmt::Block(block));
    }

    /// Look up the first attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&Expr> {
        self.body.iter().find_map(|stmt| match stmt {
            Stmt::Attribute(a) if a.name == name => Some(&a.value),
            _ => None,
        })
    }

    /// Nested blocks in body order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::Block(b) => Some(b),
            Stmt::Attribute(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    /// Numeric literal, kept in its textual form.
    Number(String),
    Str(String),
    /// Dotted reference to another component's export, e.g.
    /// `prometheus.remote_write.default.receiver`.
    Path(Vec<String>),
    Array(Vec<Expr>),
    /// Object literal; keys keep insertion order.
    Object(Vec<(String, Expr)>),
    Call {
        callee: Vec<String>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    /// Build a reference expression from a dotted path.
    pub fn path(dotted: &str) -> Self {
        Expr::Path(dotted.split('.').map(str::to_owned).collect())
    }

    pub fn is_empty_array(&self) -> bool {
        matches!(self, Expr::Array(items) if items.is_empty())
    }

    /// Visit this expression and every expression nested inside it.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Array(items) | Expr::Call { args: items, .. } => {
                for e in items {
                    e.walk(f);
                }
            }
            Expr::Object(fields) => {
                for (_, e) in fields {
                    e.walk(f);
                }
            }
            _ => {}
        }
    }
}

/// Whether `s` can be written as a bare identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Turn an arbitrary string into a valid identifier: invalid characters
/// become `_`, and a leading digit is prefixed with `_`.
pub fn sanitize_identifier(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    for (i, c) in s.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
        }
        if is_ident_continue(c) {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Quote a string literal, escaping the characters the lexer understands.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Object keys are written bare when they are identifiers, quoted otherwise.
pub fn object_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_owned()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_identifier("node-exporter/1"), "node_exporter_1");
        assert_eq!(sanitize_identifier("9100"), "_9100");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("already_ok"), "already_ok");
    }

    #[test]
    fn identifiers_are_recognized() {
        assert!(is_identifier("__address__"));
        assert!(!is_identifier("instance-name"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn quote_escapes_specials() {
        assert_eq!(quote("a\"b\\c\td"), r#""a\"b\\c\td""#);
    }

    #[test]
    fn path_splits_on_dots() {
        assert_eq!(
            Expr::path("loki.write.default.receiver"),
            Expr::Path(vec![
                "loki".into(),
                "write".into(),
                "default".into(),
                "receiver".into()
            ])
        );
    }
}
