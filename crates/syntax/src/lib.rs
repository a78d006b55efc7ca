//! telescope-syntax: the pipeline language the converter emits.
//!
//! - [`ast`] -- document tree ([`File`], [`Block`], [`Expr`])
//! - [`lexer`] / [`parser`] -- text to tree
//! - [`writer`] -- compact single-line-expression rendering
//! - [`printer`] -- canonical layout used for the final document

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod writer;

pub use ast::{Attribute, Block, Body, Expr, File, Stmt};
pub use error::SyntaxError;
pub use parser::{parse_expr, parse_file};
pub use printer::print_file;
pub use writer::{write_block, write_file};
