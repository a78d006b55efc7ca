//! Value categories that need custom rendering, and the override strategy
//! each dialect plugs into the encoder.
//!
//! Special values travel through `serde` as newtype structs with reserved
//! names; the encoder recognizes the names and turns the payload into a
//! [`SpecialValue`]. Any other serializer sees a plain inner value.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use telescope_syntax::Expr;

pub(crate) const SECRET: &str = "$telescope::Secret";
pub(crate) const REGEX: &str = "$telescope::Regex";
pub(crate) const TARGETS: &str = "$telescope::Targets";
pub(crate) const REFERENCE: &str = "$telescope::Reference";
pub(crate) const PLACEHOLDER: &str = "$telescope::Placeholder";
pub(crate) const BLOCK: &str = "$telescope::Block";
pub(crate) const CONCAT: &str = "$telescope::Concat";

/// A credential. Rendered as its literal string; `Debug` never shows it.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(SECRET, &self.0)
    }
}

/// A regular expression, rendered as its pattern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Regex(pub String);

impl Serialize for Regex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(REGEX, &self.0)
    }
}

/// One discovery target: `__address__` first, then its labels in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(Vec<(String, String)>);

impl Target {
    pub fn new(address: impl Into<String>, labels: &BTreeMap<String, String>) -> Self {
        let mut pairs = vec![("__address__".to_owned(), address.into())];
        pairs.extend(
            labels
                .iter()
                .filter(|(k, _)| k.as_str() != "__address__")
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Target(pairs)
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Target(pairs)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A homogeneous list of targets rendered through one shared helper.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Targets(pub Vec<Target>);

impl Serialize for Targets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TARGETS, &self.0)
    }
}

/// A consumer reference: a dotted path to another block's export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(String);

impl Reference {
    pub fn new(path: impl Into<String>) -> Self {
        Reference(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_expr(&self) -> Expr {
        Expr::path(&self.0)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(REFERENCE, &self.0)
    }
}

/// A value that only the front-end can resolve: the encoder hands it to the
/// dialect's override, which usually renders a reference into a shared block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Where a log source forwards entries.
    LogsReceivers,
    /// Discovery relabel rules for a push-based log source.
    RelabelRules,
    /// Where a metrics component forwards samples.
    MetricsReceivers,
}

impl Placeholder {
    fn name(self) -> &'static str {
        match self {
            Placeholder::LogsReceivers => "logs_receivers",
            Placeholder::RelabelRules => "relabel_rules",
            Placeholder::MetricsReceivers => "metrics_receivers",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "logs_receivers" => Some(Placeholder::LogsReceivers),
            "relabel_rules" => Some(Placeholder::RelabelRules),
            "metrics_receivers" => Some(Placeholder::MetricsReceivers),
            _ => None,
        }
    }
}

impl Serialize for Placeholder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(PLACEHOLDER, self.name())
    }
}

/// Marks a struct field as a nested block instead of an object attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockOf<T>(pub T);

impl<T: Serialize> Serialize for BlockOf<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(BLOCK, &self.0)
    }
}

/// A `concat(...)` call joining several target exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concat(pub Vec<Reference>);

impl Serialize for Concat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(CONCAT, &self.0)
    }
}

/// The closed set of values the override strategy sees.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialValue {
    Secret(String),
    Regex(String),
    Targets(Vec<Target>),
    Reference(String),
    Placeholder(Placeholder),
}

impl SpecialValue {
    pub fn category(&self) -> &'static str {
        match self {
            SpecialValue::Secret(_) => "secret",
            SpecialValue::Regex(_) => "regex",
            SpecialValue::Targets(_) => "targets",
            SpecialValue::Reference(_) => "reference",
            SpecialValue::Placeholder(_) => "placeholder",
        }
    }
}

/// Per-dialect rendering strategy for [`SpecialValue`]s.
///
/// Returning `Err(value)` hands the value back to the shared default
/// rendering, so an override only has to handle what it cares about.
pub trait ValueOverride {
    fn override_value(&mut self, value: SpecialValue) -> Result<Expr, SpecialValue> {
        Err(value)
    }
}

/// The shared default path with no dialect-specific behavior.
pub struct NoOverride;

impl ValueOverride for NoOverride {}

impl<F> ValueOverride for F
where
    F: FnMut(SpecialValue) -> Result<Expr, SpecialValue>,
{
    fn override_value(&mut self, value: SpecialValue) -> Result<Expr, SpecialValue> {
        self(value)
    }
}

/// Default rendering shared by every dialect.
pub fn render_default(value: SpecialValue) -> Expr {
    match value {
        SpecialValue::Secret(s) => Expr::Str(s),
        SpecialValue::Regex(pattern) => Expr::Str(pattern),
        SpecialValue::Targets(targets) => Expr::Array(
            targets
                .into_iter()
                .map(|t| {
                    Expr::Object(t.0.into_iter().map(|(k, v)| (k, Expr::Str(v))).collect())
                })
                .collect(),
        ),
        SpecialValue::Reference(path) => Expr::path(&path),
        SpecialValue::Placeholder(_) => Expr::Array(Vec::new()),
    }
}
