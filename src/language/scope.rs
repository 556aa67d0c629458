use crate::language::ir::Expr;
use std::collections::HashMap;

/// What the compiler knows about a name while emitting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Callable,
    Value,
    Unknown,
}

/// Compile-time scope threaded through every parse, including the lazy
/// parses of block bodies.
///
/// Bindings are kept per function body: parameters shadow outer names and
/// vanish when the body is done. Pending arguments are kept per body and per
/// conditional branch so a comma chain inside a block never sees values
/// buffered outside it.
#[derive(Clone, Debug)]
pub struct Scope {
    bindings: Vec<HashMap<String, BindingKind>>,
    pending: Vec<Vec<Expr>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            bindings: vec![HashMap::new()],
            pending: vec![Vec::new()],
        }
    }

    /// Scope whose outermost frame already knows the host's callables.
    pub fn with_callables<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut scope = Self::new();
        for name in names {
            scope.bind(name, BindingKind::Callable);
        }
        scope
    }

    pub fn kind(&self, name: &str) -> BindingKind {
        self.bindings
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
            .unwrap_or(BindingKind::Unknown)
    }

    pub fn is_callable(&self, name: &str) -> bool {
        self.kind(name) == BindingKind::Callable
    }

    pub fn bind(&mut self, name: &str, kind: BindingKind) {
        if let Some(frame) = self.bindings.last_mut() {
            frame.insert(name.to_string(), kind);
        }
    }

    pub fn enqueue(&mut self, expr: Expr) {
        if let Some(buffer) = self.pending.last_mut() {
            buffer.push(expr);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.last().is_some_and(|buffer| !buffer.is_empty())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.last().map_or(0, Vec::len)
    }

    /// Takes every buffered argument, leaving the buffer empty.
    pub fn drain_pending(&mut self) -> Vec<Expr> {
        self.pending.last_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Drops leftovers at a statement boundary and reports how many there were.
    pub fn discard_pending(&mut self) -> usize {
        self.drain_pending().len()
    }

    pub fn enter_function<'a>(&mut self, params: impl IntoIterator<Item = &'a str>) {
        let frame = params
            .into_iter()
            .map(|param| (param.to_string(), BindingKind::Value))
            .collect();
        self.bindings.push(frame);
        self.pending.push(Vec::new());
    }

    pub fn exit_function(&mut self) {
        if self.bindings.len() > 1 {
            self.bindings.pop();
        }
        if self.pending.len() > 1 {
            self.pending.pop();
        }
    }

    /// Runs `f` with a fresh pending buffer; the enclosing buffer is restored
    /// afterwards whatever `f` returns.
    pub fn isolate_pending<T>(&mut self, f: impl FnOnce(&mut Scope) -> T) -> T {
        self.pending.push(Vec::new());
        let result = f(self);
        self.pending.pop();
        result
    }

    pub fn depth(&self) -> usize {
        self.bindings.len()
    }
}
