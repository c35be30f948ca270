/// Syntax tree types for Jet
///
/// These types mirror the grammar one-to-one; no names are resolved here.
/// All types carry a lifetime 'input for zero-copy string slices, and every
/// node records the byte offset where it starts so that later phases can
/// attribute errors to a line and column.

use lalrpop_util::ParseError;

use crate::error::GrammarError;

/// Deepest expression nesting the parser accepts. Parentheses do not count;
/// every operator, range, `map` and `reduce` adds a level. Binding and
/// evaluation walk expressions recursively.
pub const MAX_NESTING: usize = 512;

/// A top-level statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement<'input> {
    pub offset: usize,
    pub kind: StatementKind<'input>,
}

impl<'input> Statement<'input> {
    pub fn new(offset: usize, kind: StatementKind<'input>) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind<'input> {
    /// `var name = init`
    VarDecl { name: &'input str, init: Expr<'input> },
    /// `out expr`
    Out(Expr<'input>),
    /// `print "text"`, quotes stripped, no escape processing
    Print(&'input str),
    /// Placeholder left behind by error recovery. Never survives a successful parse.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr<'input> {
    pub offset: usize,
    pub kind: ExprKind<'input>,
    depth: usize,
}

impl<'input> Expr<'input> {
    pub fn new(offset: usize, kind: ExprKind<'input>) -> Self {
        let depth = 1 + match &kind {
            ExprKind::Number(_) | ExprKind::Identifier(_) => 0,
            ExprKind::Binary { left, right, .. } => left.depth.max(right.depth),
            ExprKind::Range { start, end } => start.depth.max(end.depth),
            ExprKind::Map { sequence, lambda } => sequence.depth.max(lambda.body.depth),
            ExprKind::Reduce {
                sequence,
                identity,
                lambda,
            } => sequence.depth.max(identity.depth).max(lambda.body.depth),
        };
        Self { offset, kind, depth }
    }

    /// Levels of nesting, counting this node. A literal has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn binary(offset: usize, op: BinOp, left: Expr<'input>, right: Expr<'input>) -> Self {
        Self::new(
            offset,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<'input> {
    /// Numeric literal, sign included: `-1.5e3`
    Number(f64),
    /// Variable or lambda argument reference
    Identifier(&'input str),
    /// Arithmetic: `a + b`, `a ^ b`, ...
    Binary {
        op: BinOp,
        left: Box<Expr<'input>>,
        right: Box<Expr<'input>>,
    },
    /// Integer range: `{start, end}`
    Range {
        start: Box<Expr<'input>>,
        end: Box<Expr<'input>>,
    },
    /// `map(sequence, x -> body)`
    Map {
        sequence: Box<Expr<'input>>,
        lambda: Lambda<'input>,
    },
    /// `reduce(sequence, identity, acc x -> body)`
    Reduce {
        sequence: Box<Expr<'input>>,
        identity: Box<Expr<'input>>,
        lambda: Lambda<'input>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Lambda literal: `a b -> body`. Only valid as the last argument of `map`/`reduce`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda<'input> {
    pub offset: usize,
    pub params: Vec<Param<'input>>,
    pub body: Box<Expr<'input>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'input> {
    pub offset: usize,
    pub name: &'input str,
}

pub(crate) fn parse_number<T>(offset: usize, digits: &str) -> Result<f64, ParseError<usize, T, GrammarError>> {
    // Overflowing literals saturate to infinity rather than failing.
    digits.parse::<f64>().map_err(|_| ParseError::User {
        error: GrammarError::new(offset, "malformed number literal"),
    })
}

pub(crate) fn nested<T>(expr: Expr<'_>) -> Result<Expr<'_>, ParseError<usize, T, GrammarError>> {
    if expr.depth > MAX_NESTING {
        return Err(ParseError::User {
            error: GrammarError::new(expr.offset, "expression nested too deeply"),
        });
    }
    Ok(expr)
}
