//! Turns a syntax tree into a runnable [`Program`].
//!
//! Names are resolved to frame slots in one left-to-right pass, so a variable
//! is visible only to statements after its declaration. Lambda bodies get a
//! scope of their own holding just their arguments.

use std::collections::HashMap;

use jet_parser::ast::{self, BinOp, ExprKind, StatementKind as SyntaxStatement};
use jet_parser::{SyntaxError, SyntaxTree};
use tracing::debug;

use crate::error::{BindError, SyntaxException};
use crate::interpreter::Program;
use crate::node::{Expression, ExpressionKind, Statement, StatementKind};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Identifier to slot address. Addresses are dense, assigned in declaration
/// order and never reused.
#[derive(Debug, Default)]
struct SlotTable<'input> {
    slots: HashMap<&'input str, usize>,
}

impl<'input> SlotTable<'input> {
    fn lookup(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    /// The new address, or `None` if `name` is already declared.
    fn declare(&mut self, name: &'input str) -> Option<usize> {
        if self.slots.contains_key(name) {
            return None;
        }
        let address = self.slots.len();
        self.slots.insert(name, address);
        Some(address)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Binds every statement of `tree`. Fails with all the problems found; a
/// partially bound program is never returned.
pub fn bind(tree: &SyntaxTree<'_>) -> Result<Program, SyntaxException> {
    let mut binder = Binder {
        tree,
        errors: Vec::new(),
    };
    let mut globals = SlotTable::default();

    let statements: Vec<Option<Statement>> = tree
        .statements
        .iter()
        .map(|statement| binder.bind_statement(statement, &mut globals))
        .collect();

    if !binder.errors.is_empty() {
        // An initializer is checked before its declaration, so restore source order.
        binder.errors.sort_by_key(|error| error.position);
        return Err(SyntaxException::new(binder.errors));
    }

    let statements: Vec<Statement> = statements.into_iter().flatten().collect();
    debug!(
        statements = statements.len(),
        slots = globals.len(),
        "bound program"
    );
    Ok(Program::new(statements, globals.len()))
}

struct Binder<'t, 'input> {
    tree: &'t SyntaxTree<'input>,
    errors: Vec<SyntaxError>,
}

impl<'t, 'input> Binder<'t, 'input> {
    fn error(&mut self, offset: usize, error: BindError) {
        let position = self.tree.position(offset);
        self.errors.push(SyntaxError::new(position, error.to_string()));
    }

    fn bind_statement(
        &mut self,
        statement: &ast::Statement<'input>,
        scope: &mut SlotTable<'input>,
    ) -> Option<Statement> {
        let position = self.tree.position(statement.offset);
        let kind = match &statement.kind {
            SyntaxStatement::VarDecl { name, init } => {
                // Bound before the name exists, so `var a = a` is undefined.
                let init = self.bind_expr(init, scope);
                let address = scope.declare(*name);
                if address.is_none() {
                    self.error(statement.offset, BindError::DuplicateDeclaration(name.to_string()));
                }
                StatementKind::VariableDeclaration {
                    address: address?,
                    init: init?,
                }
            }
            SyntaxStatement::Out(expr) => StatementKind::Out(self.bind_expr(expr, scope)?),
            SyntaxStatement::Print(text) => StatementKind::Print(text.to_string()),
            SyntaxStatement::Error => {
                self.error(statement.offset, BindError::Malformed);
                return None;
            }
        };
        Some(Statement { position, kind })
    }

    /// Problems are recorded in `self.errors`; `None` means this subtree had one.
    /// Both operands are always visited so that every problem gets reported.
    fn bind_expr(&mut self, expr: &ast::Expr<'input>, scope: &SlotTable<'input>) -> Option<Expression> {
        ensure_sufficient_stack(|| self.bind_expr_inner(expr, scope))
    }

    fn bind_expr_inner(&mut self, expr: &ast::Expr<'input>, scope: &SlotTable<'input>) -> Option<Expression> {
        let position = self.tree.position(expr.offset);
        let kind = match &expr.kind {
            ExprKind::Number(n) => ExpressionKind::Constant(Value::Number(*n)),
            ExprKind::Identifier(name) => match scope.lookup(name) {
                Some(address) => ExpressionKind::VarRef(address),
                None => {
                    self.error(expr.offset, BindError::UndefinedVariable(name.to_string()));
                    return None;
                }
            },
            ExprKind::Binary { op, left, right } => {
                let left = self.bind_expr(left, scope);
                let right = self.bind_expr(right, scope);
                let (left, right) = (Box::new(left?), Box::new(right?));
                match op {
                    BinOp::Add => ExpressionKind::Add(left, right),
                    BinOp::Sub => ExpressionKind::Sub(left, right),
                    BinOp::Mul => ExpressionKind::Mul(left, right),
                    BinOp::Div => ExpressionKind::Div(left, right),
                    BinOp::Pow => ExpressionKind::Pow(left, right),
                }
            }
            ExprKind::Range { start, end } => {
                let start = self.bind_expr(start, scope);
                let end = self.bind_expr(end, scope);
                ExpressionKind::RangeCtor(Box::new(start?), Box::new(end?))
            }
            ExprKind::Map { sequence, lambda } => {
                let sequence = self.bind_expr(sequence, scope);
                let lambda = self.bind_lambda(lambda, 1);
                ExpressionKind::Map {
                    sequence: Box::new(sequence?),
                    lambda: Box::new(lambda?),
                }
            }
            ExprKind::Reduce {
                sequence,
                identity,
                lambda,
            } => {
                let sequence = self.bind_expr(sequence, scope);
                let identity = self.bind_expr(identity, scope);
                let lambda = self.bind_lambda(lambda, 2);
                ExpressionKind::Reduce {
                    sequence: Box::new(sequence?),
                    identity: Box::new(identity?),
                    lambda: Box::new(lambda?),
                }
            }
        };
        Some(Expression::new(position, kind))
    }

    /// Lambdas see nothing of the enclosing scope, only their arguments.
    fn bind_lambda(&mut self, lambda: &ast::Lambda<'input>, expected_arity: usize) -> Option<Expression> {
        let mut scope = SlotTable::default();
        let mut well_formed = true;
        for param in &lambda.params {
            if scope.declare(param.name).is_none() {
                self.error(param.offset, BindError::DuplicateArgument(param.name.to_string()));
                well_formed = false;
            }
        }

        let arity = lambda.params.len();
        if arity != expected_arity {
            self.error(
                lambda.offset,
                BindError::ArityMismatch {
                    expected: expected_arity,
                    actual: arity,
                },
            );
            well_formed = false;
        }

        let body = self.bind_expr(&lambda.body, &scope);
        if !well_formed {
            return None;
        }
        Some(Expression::new(
            self.tree.position(lambda.offset),
            ExpressionKind::LambdaLiteral {
                arity,
                body: body?.into(),
            },
        ))
    }
}
