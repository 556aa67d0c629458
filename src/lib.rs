pub mod config;
pub mod diagnostics;
pub mod error;
pub mod language;
pub mod runtime;

pub use error::Error;

use crate::{
    config::ExecConfig,
    language::{compile, scope::Scope},
    runtime::{builtins::Builtin, bytecode::lower, value::Value, Machine},
};
use std::io::Write;
use std::rc::Rc;

/// Compiles and executes a whole program, writing anything it prints to
/// `out`. Returns the value of the program's last statement.
pub fn run_source(source: &str, config: &ExecConfig, out: &mut dyn Write) -> Result<Value, Error> {
    let mut scope = Scope::with_callables(Builtin::names());
    let program = compile(source, &mut scope)?;
    let chunk = Rc::new(lower(&program));
    let value = Machine::new(config, out).run(chunk)?;
    Ok(value)
}

/// The structured program followed by its bytecode listing.
pub fn render_ir(source: &str) -> Result<String, Error> {
    let mut scope = Scope::with_callables(Builtin::names());
    let program = compile(source, &mut scope)?;
    let chunk = lower(&program);
    Ok(format!("{program}\n{chunk}"))
}

#[cfg(test)]
mod tests;
