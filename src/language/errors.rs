use crate::language::span::Span;
use miette::SourceSpan;
use thiserror::Error;

/// Compile-time failure: malformed input found by the lexer, or a node the
/// resolver and emitters cannot lower.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.into()
    }
}

pub type SyntaxResult<T> = Result<T, SyntaxError>;
