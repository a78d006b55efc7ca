//! Recursive-descent parser from tokens to [`File`].

use crate::ast::{Attribute, Block, Body, Expr, File, Stmt};
use crate::error::SyntaxError;
use crate::lexer::{lex, Spanned, Token};

/// Parse a complete document.
pub fn parse_file(src: &str) -> Result<File, SyntaxError> {
    let tokens = lex(src)?;
    let mut parser = Parser::new(&tokens);
    let body = parser.parse_body(true)?;
    Ok(File { body })
}

/// Parse a standalone expression (used by tests and callers that build
/// attribute values from text).
pub fn parse_expr(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = lex(src)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err(format!("unexpected {:?} after expression", parser.peek())));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::parse(self.cur_line(), msg)
    }

    fn expect(&mut self, expected: Token, shown: &str) -> Result<(), SyntaxError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {:?}", shown, self.peek())))
        }
    }

    fn take_ident(&mut self) -> Result<String, SyntaxError> {
        if let Token::Ident(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    // -- Statements ----------------------------------------------

    fn parse_body(&mut self, top_level: bool) -> Result<Body, SyntaxError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::Eof if top_level => break,
                Token::Eof => return Err(self.err("expected '}', got end of file")),
                Token::RBrace if top_level => return Err(self.err("unexpected '}'")),
                Token::RBrace => break,
                _ => body.push(self.parse_stmt()?),
            }
        }
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let first = self.take_ident()?;
        if self.peek() == &Token::Assign {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Stmt::Attribute(Attribute { name: first, value }));
        }

        let mut name = vec![first];
        while self.peek() == &Token::Dot {
            self.advance();
            name.push(self.take_ident()?);
        }
        let label = if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Some(s)
        } else {
            None
        };
        self.expect(Token::LBrace, "{")?;
        let body = self.parse_body(false)?;
        self.expect(Token::RBrace, "}")?;
        Ok(Stmt::Block(Block { name, label, body }))
    }

    // -- Expressions ---------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().clone() {
            Token::Ident(w) => {
                match w.as_str() {
                    "null" => {
                        self.advance();
                        return Ok(Expr::Null);
                    }
                    "true" | "false" => {
                        self.advance();
                        return Ok(Expr::Bool(w == "true"));
                    }
                    _ => {}
                }
                let mut path = vec![self.take_ident()?];
                while self.peek() == &Token::Dot {
                    self.advance();
                    path.push(self.take_ident()?);
                }
                if self.peek() == &Token::LParen {
                    self.advance();
                    let args = self.parse_list(Token::RParen, ")")?;
                    return Ok(Expr::Call { callee: path, args });
                }
                Ok(Expr::Path(path))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_list(Token::RBracket, "]")?;
                Ok(Expr::Array(items))
            }
            Token::LBrace => {
                self.advance();
                self.parse_object()
            }
            other => Err(self.err(format!("expected expression, got {:?}", other))),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: Token, shown: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == &close {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_expr()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                t if t == &close => {}
                other => {
                    return Err(self.err(format!("expected ',' or '{}', got {:?}", shown, other)))
                }
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expr, SyntaxError> {
        let mut fields = Vec::new();
        loop {
            let key = match self.peek().clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(Expr::Object(fields));
                }
                Token::Ident(k) | Token::Str(k) => {
                    self.advance();
                    k
                }
                other => {
                    return Err(self.err(format!("expected object key, got {:?}", other)));
                }
            };
            self.expect(Token::Assign, "=")?;
            let value = self.parse_expr()?;
            fields.push((key, value));
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RBrace => {}
                other => return Err(self.err(format!("expected ',' or '}}', got {:?}", other))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_block_with_attributes() {
        let file = parse_file(
            r#"
prometheus.scrape "node" {
    targets = discovery.static.node.targets
    forward_to = []
    job_name = "node"
}
"#,
        )
        .unwrap();
        assert_eq!(file.body.len(), 1);
        let Stmt::Block(block) = &file.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.name_string(), "prometheus.scrape");
        assert_eq!(block.label.as_deref(), Some("node"));
        assert_eq!(
            block.attribute("targets"),
            Some(&Expr::path("discovery.static.node.targets"))
        );
        assert_eq!(block.attribute("forward_to"), Some(&Expr::Array(vec![])));
    }

    #[test]
    fn parses_nested_unlabeled_blocks() {
        let file = parse_file("a.b \"x\" { inner { k = 1 } }").unwrap();
        let Stmt::Block(outer) = &file.body[0] else {
            panic!("expected block");
        };
        let inner: Vec<_> = outer.blocks().collect();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].label, None);
        assert_eq!(inner[0].attribute("k"), Some(&Expr::Number("1".into())));
    }

    #[test]
    fn parses_objects_arrays_and_calls() {
        let expr =
            parse_expr(r#"concat([{ __address__ = "a:1", "x-y" = true, }], other.thing.targets)"#)
                .unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                callee: vec!["concat".into()],
                args: vec![
                    Expr::Array(vec![Expr::Object(vec![
                        ("__address__".into(), Expr::string("a:1")),
                        ("x-y".into(), Expr::Bool(true)),
                    ])]),
                    Expr::path("other.thing.targets"),
                ],
            }
        );
    }

    #[test]
    fn null_is_a_literal() {
        assert_eq!(parse_expr("null").unwrap(), Expr::Null);
    }

    #[test]
    fn missing_close_brace_is_reported() {
        let err = parse_file("a \"b\" { c = 1").unwrap_err();
        assert!(err.message.contains("expected '}'"), "{}", err);
    }

    #[test]
    fn stray_close_brace_is_reported() {
        assert!(parse_file("}").is_err());
    }

    #[test]
    fn missing_comma_in_object_is_reported() {
        assert!(parse_expr("{ a = 1 b = 2 }").is_err());
    }
}
