//! The resolved program tree.
//!
//! Unlike the syntax tree, identifiers are gone: variables are frame slot
//! addresses and every lambda knows its arity. Nodes are immutable and carry
//! the position of the source text they came from.

use std::sync::Arc;

use jet_parser::Position;

use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Statement {
    pub position: Position,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    /// Evaluate `init` and store it in slot `address`.
    VariableDeclaration { address: usize, init: Expression },
    /// Send a value to the runtime.
    Out(Expression),
    /// Send literal text to the runtime.
    Print(String),
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub position: Position,
    pub kind: ExpressionKind,
}

impl Expression {
    pub fn new(position: Position, kind: ExpressionKind) -> Self {
        Self { position, kind }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Constant(Value),
    /// Read of a frame slot.
    VarRef(usize),
    Add(Box<Expression>, Box<Expression>),
    Sub(Box<Expression>, Box<Expression>),
    Mul(Box<Expression>, Box<Expression>),
    Div(Box<Expression>, Box<Expression>),
    Pow(Box<Expression>, Box<Expression>),
    /// `{start, end}`
    RangeCtor(Box<Expression>, Box<Expression>),
    /// `lambda` is always a `LambdaLiteral` of arity 1.
    Map {
        sequence: Box<Expression>,
        lambda: Box<Expression>,
    },
    /// `lambda` is always a `LambdaLiteral` of arity 2.
    Reduce {
        sequence: Box<Expression>,
        identity: Box<Expression>,
        lambda: Box<Expression>,
    },
    /// The body is shared with every lambda value created from this literal.
    LambdaLiteral { arity: usize, body: Arc<Expression> },
}
