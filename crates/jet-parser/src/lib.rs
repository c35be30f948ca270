pub mod ast;
pub mod error;

// Include generated parser code from lalrpop
#[allow(clippy::all)]
mod jet {
    include!(concat!(env!("OUT_DIR"), "/jet.rs"));
}

pub use ast::*;
pub use error::{GrammarError, LineIndex, Position, SyntaxError};

/// A successfully parsed program, still unresolved.
#[derive(Debug, Clone)]
pub struct SyntaxTree<'input> {
    pub statements: Vec<Statement<'input>>,
    lines: LineIndex<'input>,
}

impl<'input> SyntaxTree<'input> {
    /// Line and column of a node offset.
    pub fn position(&self, offset: usize) -> Position {
        self.lines.position(offset)
    }
}

/// Parse a Jet program from a string
///
/// Recovers at statement boundaries, so independent mistakes are reported
/// together. A failure to tokenize ends the pass early.
pub fn parse(input: &str) -> Result<SyntaxTree<'_>, Vec<SyntaxError>> {
    let lines = LineIndex::new(input);
    let mut recovered = Vec::new();
    let result = jet::ProgramParser::new().parse(&mut recovered, input);

    let mut errors: Vec<SyntaxError> = recovered
        .into_iter()
        .map(|recovery| lines.syntax_error(recovery.error))
        .collect();

    match result {
        Ok(statements) if errors.is_empty() => Ok(SyntaxTree { statements, lines }),
        Ok(_) => Err(errors),
        Err(e) => {
            errors.push(lines.syntax_error(e));
            Err(errors)
        }
    }
}
