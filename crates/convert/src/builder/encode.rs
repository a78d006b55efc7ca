//! A `serde::Serializer` that turns argument structs into block bodies.
//!
//! The serializer produces an intermediate [`Encoded`] value rather than text:
//! a struct or map becomes a list of named fields, a [`BlockOf`] wrapper
//! becomes a nested block, and everything else becomes an expression. Reserved newtype
//! names (see `special.rs`) are routed through the caller's
//! [`ValueOverride`].
//!
//! [`BlockOf`]: super::BlockOf

use super::special::{
    self, Placeholder, SpecialValue, Target, ValueOverride, BLOCK, CONCAT, PLACEHOLDER, REFERENCE,
    REGEX, SECRET, TARGETS,
};
use serde::ser::{self, Impossible, Serialize};
use std::fmt;
use telescope_syntax::{Attribute, Block, Body, Expr, Stmt};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("{0}")]
    Custom(String),
    #[error("block arguments must serialize as a struct, got {0}")]
    NotAStruct(&'static str),
    #[error("field '{0}' is a block and cannot appear inside a value")]
    BlockInValue(String),
    #[error("a list cannot mix blocks and values")]
    MixedList,
    #[error("object keys must be strings")]
    KeyNotString,
    #[error("unsupported value: {0}")]
    Unsupported(&'static str),
}

impl ser::Error for EncodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        EncodeError::Custom(msg.to_string())
    }
}

type Fields = Vec<(String, Encoded)>;

#[derive(Debug)]
pub(crate) enum Encoded {
    /// An absent optional value.
    Skip,
    Expr(Expr),
    /// A struct: attributes, possibly with nested blocks.
    Fields(Fields),
    /// A nested block, optionally carrying its own name.
    Block(Option<String>, Fields),
    Blocks(Vec<(Option<String>, Fields)>),
}

impl Encoded {
    fn kind(&self) -> &'static str {
        match self {
            Encoded::Skip => "nothing",
            Encoded::Expr(_) => "a value",
            Encoded::Fields(_) => "a struct",
            Encoded::Block(..) => "a block",
            Encoded::Blocks(_) => "a list of blocks",
        }
    }

    fn into_expr(self, context: &str) -> Result<Expr, EncodeError> {
        match self {
            Encoded::Skip => Ok(Expr::Null),
            Encoded::Expr(e) => Ok(e),
            Encoded::Fields(fields) => {
                let mut entries = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    if matches!(value, Encoded::Skip) {
                        continue;
                    }
                    let expr = value.into_expr(&name)?;
                    entries.push((name, expr));
                }
                Ok(Expr::Object(entries))
            }
            Encoded::Block(..) | Encoded::Blocks(_) => {
                Err(EncodeError::BlockInValue(context.to_owned()))
            }
        }
    }

    fn into_string(self) -> Result<String, EncodeError> {
        match self {
            Encoded::Expr(Expr::Str(s)) => Ok(s),
            other => Err(EncodeError::Custom(format!(
                "expected a string, got {}",
                other.kind()
            ))),
        }
    }
}

/// Encode `args` into the body of a block.
pub(crate) fn to_body<A, H>(args: &A, hook: &mut H) -> Result<Body, EncodeError>
where
    A: Serialize + ?Sized,
    H: ValueOverride + ?Sized,
{
    match args.serialize(ValueSerializer { hook })? {
        Encoded::Fields(fields) => fields_to_body(fields),
        Encoded::Skip => Ok(Body::new()),
        other => Err(EncodeError::NotAStruct(other.kind())),
    }
}

fn fields_to_body(fields: Fields) -> Result<Body, EncodeError> {
    let mut body = Body::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            Encoded::Skip => {}
            Encoded::Block(own, inner) => {
                body.push(nested_block(own.as_deref().unwrap_or(&name), inner)?);
            }
            Encoded::Blocks(list) => {
                for (own, inner) in list {
                    body.push(nested_block(own.as_deref().unwrap_or(&name), inner)?);
                }
            }
            other => {
                let value = other.into_expr(&name)?;
                body.push(Stmt::Attribute(Attribute { name, value }));
            }
        }
    }
    Ok(body)
}

fn nested_block(name: &str, fields: Fields) -> Result<Stmt, EncodeError> {
    let mut block = Block::new(name.split('.').map(str::to_owned).collect(), None);
    block.body = fields_to_body(fields)?;
    Ok(Stmt::Block(block))
}

fn number(text: String) -> Result<Encoded, EncodeError> {
    Ok(Encoded::Expr(Expr::Number(text)))
}

struct ValueSerializer<'h, H: ?Sized> {
    hook: &'h mut H,
}

impl<'h, H: ValueOverride + ?Sized> ValueSerializer<'h, H> {
    fn special(self, value: SpecialValue) -> Result<Encoded, EncodeError> {
        tracing::trace!(category = value.category(), "encoding special value");
        let expr = match self.hook.override_value(value) {
            Ok(expr) => expr,
            Err(value) => special::render_default(value),
        };
        Ok(Encoded::Expr(expr))
    }
}

fn collect_targets(encoded: Encoded) -> Result<Vec<Target>, EncodeError> {
    let items = match encoded.into_expr("targets")? {
        Expr::Array(items) => items,
        _ => return Err(EncodeError::Custom("targets must be a list".into())),
    };
    let mut targets = Vec::with_capacity(items.len());
    for item in items {
        let Expr::Object(entries) = item else {
            return Err(EncodeError::Custom("a target must be a map".into()));
        };
        let mut pairs = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            match v {
                Expr::Str(s) => pairs.push((k, s)),
                _ => {
                    return Err(EncodeError::Custom(format!(
                        "target label '{}' is not a string",
                        k
                    )))
                }
            }
        }
        targets.push(Target::from_pairs(pairs));
    }
    Ok(targets)
}

impl<'h, H: ValueOverride + ?Sized> ser::Serializer for ValueSerializer<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;
    type SerializeSeq = SeqEncoder<'h, H>;
    type SerializeTuple = SeqEncoder<'h, H>;
    type SerializeTupleStruct = SeqEncoder<'h, H>;
    type SerializeTupleVariant = Impossible<Encoded, EncodeError>;
    type SerializeMap = MapEncoder<'h, H>;
    type SerializeStruct = StructEncoder<'h, H>;
    type SerializeStructVariant = Impossible<Encoded, EncodeError>;

    fn serialize_bool(self, v: bool) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<Encoded, EncodeError> {
        number(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<Encoded, EncodeError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Encoded, EncodeError> {
        if !v.is_finite() {
            return Err(EncodeError::Unsupported("non-finite number"));
        }
        number(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::Str(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::string(v)))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Encoded, EncodeError> {
        Err(EncodeError::Unsupported("raw bytes"))
    }

    fn serialize_none(self) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Skip)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Encoded, EncodeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::Null))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::Null))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Expr(Expr::string(variant)))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Encoded, EncodeError> {
        let ValueSerializer { hook } = self;
        let inner = value.serialize(ValueSerializer { hook: &mut *hook })?;
        let this = ValueSerializer { hook };
        match name {
            SECRET => this.special(SpecialValue::Secret(inner.into_string()?)),
            REGEX => this.special(SpecialValue::Regex(inner.into_string()?)),
            REFERENCE => this.special(SpecialValue::Reference(inner.into_string()?)),
            TARGETS => this.special(SpecialValue::Targets(collect_targets(inner)?)),
            PLACEHOLDER => {
                let tag = inner.into_string()?;
                let placeholder = Placeholder::from_name(&tag)
                    .ok_or_else(|| EncodeError::Custom(format!("unknown placeholder '{}'", tag)))?;
                this.special(SpecialValue::Placeholder(placeholder))
            }
            CONCAT => match inner.into_expr("concat")? {
                Expr::Array(args) => Ok(Encoded::Expr(Expr::Call {
                    callee: vec!["concat".to_owned()],
                    args,
                })),
                _ => Err(EncodeError::Custom("concat takes a list".into())),
            },
            BLOCK => match inner {
                Encoded::Fields(fields) => Ok(Encoded::Block(None, fields)),
                other => Err(EncodeError::NotAStruct(other.kind())),
            },
            _ => Ok(inner),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Encoded, EncodeError> {
        match value.serialize(self)? {
            Encoded::Block(None, fields) => Ok(Encoded::Block(Some(variant.to_owned()), fields)),
            other => Ok(other),
        }
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqEncoder<'h, H>, EncodeError> {
        Ok(SeqEncoder {
            hook: self.hook,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqEncoder<'h, H>, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqEncoder<'h, H>, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, EncodeError> {
        Err(EncodeError::Unsupported("tuple variant"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapEncoder<'h, H>, EncodeError> {
        Ok(MapEncoder {
            hook: self.hook,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<StructEncoder<'h, H>, EncodeError> {
        Ok(StructEncoder {
            hook: self.hook,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, EncodeError> {
        Err(EncodeError::Unsupported("struct variant"))
    }
}

pub(crate) struct SeqEncoder<'h, H: ?Sized> {
    hook: &'h mut H,
    items: Vec<Encoded>,
}

impl<'h, H: ValueOverride + ?Sized> SeqEncoder<'h, H> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let item = value.serialize(ValueSerializer {
            hook: &mut *self.hook,
        })?;
        self.items.push(item);
        Ok(())
    }

    fn finish(self) -> Result<Encoded, EncodeError> {
        let blocks = self
            .items
            .iter()
            .filter(|i| matches!(i, Encoded::Block(..)))
            .count();
        if blocks == 0 {
            let mut exprs = Vec::with_capacity(self.items.len());
            for item in self.items {
                exprs.push(item.into_expr("list element")?);
            }
            return Ok(Encoded::Expr(Expr::Array(exprs)));
        }
        if blocks != self.items.len() {
            return Err(EncodeError::MixedList);
        }
        let list = self
            .items
            .into_iter()
            .filter_map(|item| match item {
                Encoded::Block(name, fields) => Some((name, fields)),
                _ => None,
            })
            .collect();
        Ok(Encoded::Blocks(list))
    }
}

impl<'h, H: ValueOverride + ?Sized> ser::SerializeSeq for SeqEncoder<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Encoded, EncodeError> {
        self.finish()
    }
}

impl<'h, H: ValueOverride + ?Sized> ser::SerializeTuple for SeqEncoder<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Encoded, EncodeError> {
        self.finish()
    }
}

impl<'h, H: ValueOverride + ?Sized> ser::SerializeTupleStruct for SeqEncoder<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.push(value)
    }

    fn end(self) -> Result<Encoded, EncodeError> {
        self.finish()
    }
}

/// Maps encode like structs with dynamic keys, so a flattened field can
/// still carry nested blocks. As a value they become an object literal.
pub(crate) struct MapEncoder<'h, H: ?Sized> {
    hook: &'h mut H,
    entries: Fields,
    key: Option<String>,
}

impl<'h, H: ValueOverride + ?Sized> ser::SerializeMap for MapEncoder<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EncodeError> {
        let key = match key.serialize(ValueSerializer {
            hook: &mut *self.hook,
        })? {
            Encoded::Expr(Expr::Str(s)) => s,
            Encoded::Expr(Expr::Number(n)) => n,
            _ => return Err(EncodeError::KeyNotString),
        };
        self.key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let key = self.key.take().ok_or(EncodeError::KeyNotString)?;
        let value = value.serialize(ValueSerializer {
            hook: &mut *self.hook,
        })?;
        self.entries.push((key, value));
        Ok(())
    }

    fn end(self) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Fields(self.entries))
    }
}

pub(crate) struct StructEncoder<'h, H: ?Sized> {
    hook: &'h mut H,
    fields: Fields,
}

impl<'h, H: ValueOverride + ?Sized> ser::SerializeStruct for StructEncoder<'h, H> {
    type Ok = Encoded;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        let value = value.serialize(ValueSerializer {
            hook: &mut *self.hook,
        })?;
        self.fields.push((key.to_owned(), value));
        Ok(())
    }

    fn end(self) -> Result<Encoded, EncodeError> {
        Ok(Encoded::Fields(self.fields))
    }
}
