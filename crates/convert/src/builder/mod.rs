//! Building target blocks from typed argument structs.
//!
//! Front-ends describe each emitted component as a plain `Serialize` struct
//! and hand it to [`new_block`] or [`new_block_with_override`]:
//!
//! ```ignore
//! #[derive(Serialize)]
//! struct ScrapeArgs {
//!     targets: Reference,
//!     forward_to: Vec<Reference>,
//!     job_name: String,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     basic_auth: Option<BlockOf<BasicAuth>>,
//! }
//! ```

mod encode;
mod special;

pub use encode::EncodeError;
pub use special::{
    render_default, BlockOf, Concat, NoOverride, Placeholder, Reference, Regex, Secret,
    SpecialValue, Target, Targets, ValueOverride,
};

use serde::Serialize;
use std::fmt;
use telescope_syntax::Block;

/// Dotted component kind, e.g. `prometheus.scrape`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKind(Vec<String>);

impl ComponentKind {
    /// Parse a dotted kind. Empty segments are dropped.
    pub fn new(dotted: &str) -> Self {
        ComponentKind(
            dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A reference to `field` exported by the block `<self> "<label>"`.
    pub fn export(&self, label: &str, field: &str) -> Reference {
        Reference::new(format!("{}.{}.{}", self, label, field))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Encode `args` into a block with the default rendering of special values.
pub fn new_block<A>(kind: &ComponentKind, label: &str, args: &A) -> Result<Block, EncodeError>
where
    A: Serialize + ?Sized,
{
    new_block_with_override(kind, label, args, &mut NoOverride)
}

/// Encode `args` into a block, consulting `hook` for every special value.
///
/// An empty `label` yields an unlabeled block (such as `logging`).
pub fn new_block_with_override<A, H>(
    kind: &ComponentKind,
    label: &str,
    args: &A,
    hook: &mut H,
) -> Result<Block, EncodeError>
where
    A: Serialize + ?Sized,
    H: ValueOverride + ?Sized,
{
    tracing::trace!(%kind, label, "encoding block");
    let label = (!label.is_empty()).then(|| label.to_owned());
    let mut block = Block::new(kind.segments().to_vec(), label);
    block.body = encode::to_body(args, hook)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use telescope_syntax::{write_block, Expr};

    #[derive(Serialize)]
    struct BasicAuth {
        username: String,
        password: Secret,
    }

    #[derive(Serialize)]
    struct Endpoint {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        basic_auth: Option<BlockOf<BasicAuth>>,
    }

    #[derive(Serialize)]
    struct WriteArgs {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        endpoint: Vec<BlockOf<Endpoint>>,
        external_labels: BTreeMap<String, String>,
        tenant: Option<String>,
    }

    fn kind(s: &str) -> ComponentKind {
        ComponentKind::new(s)
    }

    #[test]
    fn fields_blocks_and_maps() {
        let mut labels = BTreeMap::new();
        labels.insert("cluster".to_owned(), "prod".to_owned());
        let args = WriteArgs {
            endpoint: vec![BlockOf(Endpoint {
                url: "http://loki:3100/push".into(),
                basic_auth: Some(BlockOf(BasicAuth {
                    username: "admin".into(),
                    password: Secret::new("p@ss"),
                })),
            })],
            external_labels: labels,
            tenant: None,
        };
        let block = new_block(&kind("loki.write"), "default", &args).unwrap();
        assert_eq!(
            write_block(&block),
            "loki.write \"default\" {\n\tendpoint {\n\t\turl = \"http://loki:3100/push\"\n\t\tbasic_auth {\n\t\t\tusername = \"admin\"\n\t\t\tpassword = \"p@ss\"\n\t\t}\n\t}\n\texternal_labels = { cluster = \"prod\" }\n}\n"
        );
    }

    #[derive(Serialize)]
    struct JsonStage {
        expressions: BTreeMap<String, String>,
    }

    #[derive(Serialize)]
    struct DropStage {
        source: String,
    }

    #[derive(Serialize)]
    enum Stage {
        #[serde(rename = "stage.json")]
        Json(BlockOf<JsonStage>),
        #[serde(rename = "stage.drop")]
        Drop(BlockOf<DropStage>),
    }

    #[derive(Serialize)]
    struct ProcessArgs {
        forward_to: Vec<Reference>,
        stage: Vec<Stage>,
    }

    #[test]
    fn enum_variants_name_their_blocks() {
        let mut exprs = BTreeMap::new();
        exprs.insert("msg".to_owned(), "message".to_owned());
        let args = ProcessArgs {
            forward_to: vec![Reference::new("loki.write.default.receiver")],
            stage: vec![
                Stage::Json(BlockOf(JsonStage { expressions: exprs })),
                Stage::Drop(BlockOf(DropStage {
                    source: "level".into(),
                })),
            ],
        };
        let block = new_block(&kind("loki.process"), "job", &args).unwrap();
        let names: Vec<_> = block.blocks().map(|b| b.name_string()).collect();
        assert_eq!(names, ["stage.json", "stage.drop"]);
        assert_eq!(
            block.attribute("forward_to"),
            Some(&Expr::Array(vec![Expr::path("loki.write.default.receiver")]))
        );
    }

    #[derive(Serialize)]
    struct SourceArgs {
        forward_to: Placeholder,
        relabel_rules: Placeholder,
    }

    #[test]
    fn override_handles_some_values_and_defers_the_rest() {
        let args = SourceArgs {
            forward_to: Placeholder::LogsReceivers,
            relabel_rules: Placeholder::RelabelRules,
        };
        let mut calls = 0;
        let mut hook = |value: SpecialValue| {
            calls += 1;
            match value {
                SpecialValue::Placeholder(Placeholder::RelabelRules) => {
                    Ok(Expr::path("discovery.relabel.job.rules"))
                }
                other => Err(other),
            }
        };
        let block = new_block_with_override(&kind("loki.source.syslog"), "job", &args, &mut hook)
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(block.attribute("forward_to"), Some(&Expr::Array(vec![])));
        assert_eq!(
            block.attribute("relabel_rules"),
            Some(&Expr::path("discovery.relabel.job.rules"))
        );
    }

    #[derive(Serialize)]
    struct StaticArgs {
        targets: Targets,
    }

    #[test]
    fn targets_render_as_object_list() {
        let mut labels = BTreeMap::new();
        labels.insert("env".to_owned(), "prod".to_owned());
        let args = StaticArgs {
            targets: Targets(vec![Target::new("localhost:9100", &labels)]),
        };
        let block = new_block(&kind("discovery.static"), "node", &args).unwrap();
        assert_eq!(
            block.attribute("targets"),
            Some(&Expr::Array(vec![Expr::Object(vec![
                ("__address__".into(), Expr::string("localhost:9100")),
                ("env".into(), Expr::string("prod")),
            ])]))
        );
    }

    #[derive(Serialize)]
    struct Empty {}

    #[test]
    fn empty_label_means_unlabeled() {
        let block = new_block(&kind("logging"), "", &Empty {}).unwrap();
        assert_eq!(block.label, None);
        assert!(block.body.is_empty());
    }

    #[test]
    fn non_struct_arguments_are_rejected() {
        let err = new_block(&kind("a.b"), "x", &vec![1, 2]).unwrap_err();
        assert_eq!(err, EncodeError::NotAStruct("a value"));
    }

    #[derive(Serialize)]
    struct ScrapeArgs {
        targets: Concat,
    }

    #[test]
    fn concat_becomes_a_call() {
        let args = ScrapeArgs {
            targets: Concat(vec![
                Reference::new("discovery.static.a.targets"),
                Reference::new("discovery.dns.a.targets"),
            ]),
        };
        let block = new_block(&kind("prometheus.scrape"), "a", &args).unwrap();
        assert_eq!(
            block.attribute("targets").map(|e| e.to_string()),
            Some("concat(discovery.static.a.targets, discovery.dns.a.targets)".to_owned())
        );
    }

    #[test]
    fn export_reference() {
        let r = kind("prometheus.remote_write").export("default", "receiver");
        assert_eq!(r.as_str(), "prometheus.remote_write.default.receiver");
    }
}
