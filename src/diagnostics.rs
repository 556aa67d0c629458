use crate::{language::errors::SyntaxError, runtime::error::RuntimeError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(be::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(path: &Path, source: &str, err: &SyntaxError) -> Self {
        Self {
            src: NamedSource::new(path.display().to_string(), source.to_string()),
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
        }
    }
}

pub fn report_syntax_error(path: &Path, source: &str, err: &SyntaxError) {
    let diagnostic = SyntaxDiagnostic::from_error(path, source, err);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {}", error);
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
