//! Working-stack accumulation and template dispatch.
//!
//! Nodes pile up on a working stack until a clause boundary. The whole stack
//! is then matched against the templates in order; the first one whose shape
//! covers the stack exactly fires, and the stack is cleared whether or not
//! anything matched.

use crate::language::{
    emit::{self, CallContext, Emission},
    errors::{SyntaxError, SyntaxResult},
    ir::{Block, Expr, Stmt},
    lexer::{Boundary, Lexeme, Lexer},
    resolve::resolve,
    scope::{BindingKind, Scope},
    span::Span,
    syntax::{DeferredBlock, NodeKind, SyntaxNode},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    /// `(params) [body] name`
    Definition,
    /// `name`
    BareName,
    /// `value name`
    Binding,
    /// `cond [then] [else]`
    Conditional,
    /// `value`
    Expression,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    List,
    Block,
    Identifier,
    AnyExpr,
}

impl Slot {
    fn accepts(self, node: &SyntaxNode) -> bool {
        match self {
            Slot::List => node.is_list(),
            Slot::Block => node.is_block(),
            Slot::Identifier => node.as_identifier().is_some(),
            Slot::AnyExpr => !node.is_block(),
        }
    }
}

impl Template {
    pub const ORDERED: [Template; 5] = [
        Template::Definition,
        Template::BareName,
        Template::Binding,
        Template::Conditional,
        Template::Expression,
    ];

    fn shape(self) -> &'static [Slot] {
        match self {
            Template::Definition => &[Slot::List, Slot::Block, Slot::Identifier],
            Template::BareName => &[Slot::Identifier],
            Template::Binding => &[Slot::AnyExpr, Slot::Identifier],
            Template::Conditional => &[Slot::AnyExpr, Slot::Block, Slot::Block],
            Template::Expression => &[Slot::AnyExpr],
        }
    }

    fn matches(self, stack: &[SyntaxNode]) -> bool {
        let shape = self.shape();
        shape.len() == stack.len() && shape.iter().zip(stack).all(|(slot, node)| slot.accepts(node))
    }
}

pub fn match_template(stack: &[SyntaxNode]) -> Option<Template> {
    Template::ORDERED
        .into_iter()
        .find(|template| template.matches(stack))
}

/// Lexes and emits a whole body: the program itself, a definition body or
/// a conditional branch. `offset` locates `text` in the original source.
pub fn parse_block(text: &str, offset: usize, scope: &mut Scope) -> SyntaxResult<Block> {
    let mut lexer = Lexer::new(text, offset);
    let mut accumulator = Accumulator::new(scope);
    let mut stack = Vec::new();
    while let Some(item) = lexer.next_item(&mut stack)? {
        match item {
            Lexeme::Node(node) => stack.push(node),
            Lexeme::Boundary(boundary, span) => accumulator.dispatch(&mut stack, boundary, span)?,
        }
    }
    let end = offset + text.len();
    accumulator.dispatch(&mut stack, Boundary::Statement, Span::new(end, end))?;
    Ok(accumulator.finish())
}

struct Accumulator<'s> {
    scope: &'s mut Scope,
    body: Vec<Stmt>,
}

impl<'s> Accumulator<'s> {
    fn new(scope: &'s mut Scope) -> Self {
        Self {
            scope,
            body: Vec::new(),
        }
    }

    fn finish(self) -> Block {
        Block::new(self.body)
    }

    fn dispatch(
        &mut self,
        stack: &mut Vec<SyntaxNode>,
        boundary: Boundary,
        span: Span,
    ) -> SyntaxResult<()> {
        let nodes = std::mem::take(stack);
        let result = self.fire(nodes, boundary, span);
        if boundary == Boundary::Statement {
            let dropped = self.scope.discard_pending();
            if dropped > 0 {
                log::warn!(
                    "discarding {dropped} pending argument(s) at the statement ending at byte {}",
                    span.end
                );
            }
        }
        result
    }

    fn fire(&mut self, nodes: Vec<SyntaxNode>, boundary: Boundary, span: Span) -> SyntaxResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let Some(template) = match_template(&nodes) else {
            let shape: Vec<&str> = nodes.iter().map(SyntaxNode::describe).collect();
            log::warn!(
                "no template matches [{}] ending at byte {}; clause discarded",
                shape.join(", "),
                span.end
            );
            return Ok(());
        };
        log::debug!("{template:?} fired for clause ending at byte {}", span.end);

        let context = match boundary {
            Boundary::Statement => CallContext::Statement,
            Boundary::Clause => CallContext::Expression,
        };
        let emission = match template {
            Template::Definition => {
                let [params, body, name] = take_nodes(nodes, span)?;
                let (name, _) = into_identifier(name)?;
                emit::definition(self.scope, params, into_block(body)?, name)?
            }
            Template::BareName => {
                let [name] = take_nodes(nodes, span)?;
                let (name, safe) = into_identifier(name)?;
                emit::bare_name(self.scope, name, safe, context)
            }
            Template::Binding => {
                let [value, name] = take_nodes(nodes, span)?;
                let (name, safe) = into_identifier(name)?;
                self.binding(value, name, safe, context)?
            }
            Template::Conditional => {
                let [cond, then_branch, else_branch] = take_nodes(nodes, span)?;
                emit::conditional(
                    self.scope,
                    cond,
                    into_block(then_branch)?,
                    into_block(else_branch)?,
                )?
            }
            Template::Expression => {
                let [value] = take_nodes(nodes, span)?;
                Emission::Value(resolve(value)?)
            }
        };
        self.settle(emission, boundary);
        Ok(())
    }

    /// `value name`: a pipeline result assignment, a call, an alias or a
    /// plain assignment, decided from what the scope knows about the names.
    fn binding(
        &mut self,
        value: SyntaxNode,
        name: String,
        safe: bool,
        context: CallContext,
    ) -> SyntaxResult<Emission> {
        if let Some((callee, false)) = value.as_identifier() {
            if self.scope.has_pending() {
                let callee = callee.to_string();
                let args = self.scope.drain_pending();
                let result = Expr::Call { callee, args };
                return Ok(emit::assignment(self.scope, name, result, BindingKind::Value));
            }
        }

        if !safe && self.scope.is_callable(&name) {
            let mut args = vec![resolve(value)?];
            // after `,` the call is itself the next link in the chain
            if context == CallContext::Statement {
                args.extend(self.scope.drain_pending());
            }
            return Ok(emit::call(self.scope, name, Some(args), context));
        }

        if let Some((source, _)) = value.as_identifier() {
            let kind = if self.scope.is_callable(source) {
                BindingKind::Callable
            } else {
                BindingKind::Value
            };
            return Ok(emit::assignment(self.scope, name, resolve(value)?, kind));
        }

        Ok(emit::assignment(
            self.scope,
            name,
            resolve(value)?,
            BindingKind::Value,
        ))
    }

    fn settle(&mut self, emission: Emission, boundary: Boundary) {
        match (emission, boundary) {
            (Emission::Stmt(stmt), _) => self.body.push(stmt),
            (Emission::Value(expr), Boundary::Clause) => self.scope.enqueue(expr),
            (Emission::Value(expr), Boundary::Statement) => self.body.push(Stmt::Expr(expr)),
        }
    }
}

fn take_nodes<const N: usize>(nodes: Vec<SyntaxNode>, span: Span) -> SyntaxResult<[SyntaxNode; N]> {
    nodes
        .try_into()
        .map_err(|_| SyntaxError::new("Template shape does not match the clause", span))
}

fn into_identifier(node: SyntaxNode) -> SyntaxResult<(String, bool)> {
    match node.kind {
        NodeKind::Identifier { name, safe } => Ok((name, safe)),
        _ => Err(SyntaxError::new(
            format!("Expected an identifier, found {}", node.describe()),
            node.span,
        )),
    }
}

fn into_block(node: SyntaxNode) -> SyntaxResult<DeferredBlock> {
    match node.kind {
        NodeKind::Block(block) => Ok(block),
        _ => Err(SyntaxError::new(
            format!("Expected a block, found {}", node.describe()),
            node.span,
        )),
    }
}
