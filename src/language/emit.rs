use crate::language::{
    errors::{SyntaxError, SyntaxResult},
    ir::{Block, Expr, FunctionDef, Stmt},
    resolve::resolve,
    scope::{BindingKind, Scope},
    syntax::{DeferredBlock, NodeKind, SyntaxNode},
};

/// Whether the clause being emitted was closed by `.` or by `,`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallContext {
    Statement,
    Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Emission {
    Stmt(Stmt),
    /// A value for the enclosing clause: buffered as a pending argument
    /// after `,`, or kept as an expression statement after `.`.
    Value(Expr),
}

/// Builds a call. Without explicit arguments the pending buffer is drained
/// and becomes the whole argument list.
pub fn call(
    scope: &mut Scope,
    callee: String,
    explicit: Option<Vec<Expr>>,
    context: CallContext,
) -> Emission {
    let args = explicit.unwrap_or_else(|| scope.drain_pending());
    match context {
        CallContext::Statement => Emission::Stmt(Stmt::Call { callee, args }),
        CallContext::Expression => Emission::Value(Expr::Call { callee, args }),
    }
}

pub fn assignment(scope: &mut Scope, target: String, value: Expr, kind: BindingKind) -> Emission {
    scope.bind(&target, kind);
    Emission::Stmt(Stmt::Assign { target, value })
}

/// `name.` on its own: a call when the name is an unquoted callable,
/// otherwise a plain reference.
pub fn bare_name(scope: &mut Scope, name: String, safe: bool, context: CallContext) -> Emission {
    if !safe && scope.is_callable(&name) {
        call(scope, name, None, context)
    } else {
        Emission::Value(Expr::Name(name))
    }
}

/// `(params) [body] name.`
///
/// The name is marked callable before the body is parsed so recursive calls
/// inside it are emitted as calls.
pub fn definition(
    scope: &mut Scope,
    params: SyntaxNode,
    body: DeferredBlock,
    name: String,
) -> SyntaxResult<Emission> {
    let params = parameter_names(params)?;
    scope.bind(&name, BindingKind::Callable);
    scope.enter_function(params.iter().map(String::as_str));
    let body = body.parse(scope);
    scope.exit_function();
    Ok(Emission::Stmt(Stmt::FunctionDef(FunctionDef {
        name,
        params,
        body: body?,
    })))
}

/// `cond [then] [else]`
pub fn conditional(
    scope: &mut Scope,
    cond: SyntaxNode,
    then_branch: DeferredBlock,
    else_branch: DeferredBlock,
) -> SyntaxResult<Emission> {
    let cond = resolve(cond)?;
    let then_block = branch(scope, then_branch)?;
    let else_block = branch(scope, else_branch)?;
    Ok(Emission::Stmt(Stmt::Conditional {
        cond,
        then_block,
        else_block,
    }))
}

fn branch(scope: &mut Scope, block: DeferredBlock) -> SyntaxResult<Block> {
    if block.is_blank() {
        return Ok(Block::default());
    }
    scope.isolate_pending(|scope| block.parse(scope))
}

fn parameter_names(node: SyntaxNode) -> SyntaxResult<Vec<String>> {
    let NodeKind::List(items) = node.kind else {
        return Err(SyntaxError::new("Expected a parameter list", node.span));
    };
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        match item.kind {
            NodeKind::Identifier { name, .. } => {
                if names.contains(&name) {
                    return Err(SyntaxError::new(
                        format!("Duplicate parameter `{name}`"),
                        item.span,
                    ));
                }
                names.push(name);
            }
            _ => {
                return Err(SyntaxError::new(
                    format!("Parameters must be identifiers, found {}", item.describe()),
                    item.span,
                )
                .with_help("write parameters as `(a, b, ...)`"));
            }
        }
    }
    Ok(names)
}
