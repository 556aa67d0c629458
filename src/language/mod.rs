pub mod dispatch;
pub mod emit;
pub mod errors;
pub mod ir;
pub mod lexer;
pub mod resolve;
pub mod scope;
pub mod span;
pub mod syntax;

use crate::language::{dispatch::parse_block, errors::SyntaxResult, ir::Program, scope::Scope};

/// Compiles a whole source file. `scope` must already know the host's
/// callables; it is updated with every name the program binds.
pub fn compile(source: &str, scope: &mut Scope) -> SyntaxResult<Program> {
    let body = parse_block(source, 0, scope)?;
    log::debug!("compiled {} top-level statement(s)", body.stmts.len());
    Ok(Program { body })
}
