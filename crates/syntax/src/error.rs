/// A lexing or parsing error in pipeline source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        SyntaxError {
            line,
            message: message.into(),
        }
    }

    pub fn lex(line: u32, message: impl Into<String>) -> Self {
        SyntaxError::new(line, format!("lex error: {}", message.into()))
    }

    pub fn parse(line: u32, message: impl Into<String>) -> Self {
        SyntaxError::new(line, format!("parse error: {}", message.into()))
    }
}
