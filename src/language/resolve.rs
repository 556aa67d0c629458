use crate::language::{
    errors::{SyntaxError, SyntaxResult},
    ir::Expr,
    syntax::{NodeKind, SyntaxNode},
};

/// Lowers an operand node into an IR expression.
pub fn resolve(node: SyntaxNode) -> SyntaxResult<Expr> {
    let span = node.span;
    match node.kind {
        NodeKind::Identifier { name, .. } => Ok(Expr::Name(name)),
        NodeKind::Integer(value) => Ok(Expr::Int(value)),
        NodeKind::Float(value) => Ok(Expr::Float(value)),
        NodeKind::Str(value) => Ok(Expr::Str(value)),
        NodeKind::List(items) => items
            .into_iter()
            .map(resolve)
            .collect::<SyntaxResult<Vec<_>>>()
            .map(Expr::List),
        NodeKind::Binary { op, lhs, rhs } => Ok(Expr::Binary {
            op,
            lhs: Box::new(resolve(*lhs)?),
            rhs: Box::new(resolve(*rhs)?),
        }),
        NodeKind::Compare { op, lhs, rhs } => Ok(Expr::Compare {
            op,
            lhs: Box::new(resolve(*lhs)?),
            rhs: Box::new(resolve(*rhs)?),
        }),
        NodeKind::Block(_) => Err(SyntaxError::new("A block cannot be used as a value", span)
            .with_help("blocks are only definition bodies or conditional branches")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{
        span::Span,
        syntax::{BinaryOp, DeferredBlock},
    };

    fn node(kind: NodeKind) -> SyntaxNode {
        SyntaxNode::new(kind, Span::default())
    }

    #[test]
    fn nested_operators_resolve_recursively() {
        let tree = node(NodeKind::Binary {
            op: BinaryOp::Mul,
            lhs: Box::new(node(NodeKind::Identifier {
                name: "n".into(),
                safe: true,
            })),
            rhs: Box::new(node(NodeKind::List(vec![node(NodeKind::Integer(1))]))),
        });
        let expr = resolve(tree).expect("resolve");
        assert_eq!(expr.to_string(), "(n * [1])");
    }

    #[test]
    fn blocks_are_rejected_even_inside_lists() {
        let block = node(NodeKind::Block(DeferredBlock::new("x", 0)));
        assert!(resolve(block.clone()).is_err());
        assert!(resolve(node(NodeKind::List(vec![block]))).is_err());
    }
}
