use crate::language::{
    dispatch::parse_block, errors::SyntaxResult, ir::Block, scope::Scope, span::Span,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// `safe` identifiers (written `name'`) never trigger a call.
    Identifier { name: String, safe: bool },
    Integer(i64),
    Float(f64),
    Str(String),
    Block(DeferredBlock),
    List(Vec<SyntaxNode>),
    Binary {
        op: BinaryOp,
        lhs: Box<SyntaxNode>,
        rhs: Box<SyntaxNode>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<SyntaxNode>,
        rhs: Box<SyntaxNode>,
    },
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List(_))
    }

    pub fn as_identifier(&self) -> Option<(&str, bool)> {
        match &self.kind {
            NodeKind::Identifier { name, safe } => Some((name, *safe)),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.kind {
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::Integer(_) => "integer",
            NodeKind::Float(_) => "float",
            NodeKind::Str(_) => "string",
            NodeKind::Block(_) => "block",
            NodeKind::List(_) => "list",
            NodeKind::Binary { .. } => "arithmetic expression",
            NodeKind::Compare { .. } => "comparison",
        }
    }
}

/// Raw body of a `[ ... ]` block. The text is only lexed once the dispatcher
/// knows whether it is a definition body or a conditional branch, so that
/// names bound just before (such as the function being defined) are visible.
#[derive(Clone, Debug, PartialEq)]
pub struct DeferredBlock {
    pub text: String,
    /// Byte offset of `text` within the original source.
    pub offset: usize,
}

impl DeferredBlock {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            offset,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn parse(self, scope: &mut Scope) -> SyntaxResult<Block> {
        parse_block(&self.text, self.offset, scope)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '%' => Some(BinaryOp::Rem),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
            CompareOp::EqEq => "==",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
