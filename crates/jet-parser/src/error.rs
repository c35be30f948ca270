//! Source positions and positioned syntax errors.

use std::fmt;

use lalrpop_util::lexer::Token;
use lalrpop_util::ParseError;
use thiserror::Error;

/// A 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An error detected before a program could be run: a malformed source text
/// from the parser, or an ill-formed program from the binder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position} {message}")]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// An error raised by a grammar action, at the byte offset of the construct
/// it rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarError {
    pub offset: usize,
    pub message: &'static str,
}

impl GrammarError {
    pub fn new(offset: usize, message: &'static str) -> Self {
        Self { offset, message }
    }
}

/// Maps byte offsets in a source text to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'input> {
    source: &'input str,
    line_starts: Vec<usize>,
}

impl<'input> LineIndex<'input> {
    pub fn new(source: &'input str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position::new(line, column)
    }

    pub(crate) fn syntax_error(&self, error: ParseError<usize, Token<'_>, GrammarError>) -> SyntaxError {
        match error {
            ParseError::InvalidToken { location } => {
                SyntaxError::new(self.position(location), "unrecognized input")
            }
            ParseError::UnrecognizedEof { location, expected } => SyntaxError::new(
                self.position(location),
                format!("unexpected end of input{}", expecting(&expected)),
            ),
            ParseError::UnrecognizedToken {
                token: (start, token, _),
                expected,
            } => SyntaxError::new(
                self.position(start),
                format!("unexpected `{}`{}", token.1, expecting(&expected)),
            ),
            ParseError::ExtraToken {
                token: (start, token, _),
            } => SyntaxError::new(self.position(start), format!("unexpected `{}`", token.1)),
            ParseError::User { error } => SyntaxError::new(self.position(error.offset), error.message),
        }
    }
}

fn expecting(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [only] => format!(", expected {}", only),
        _ => format!(", expected one of {}", expected.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let index = LineIndex::new("out 1");
        assert_eq!(index.position(0), Position::new(1, 1));
        assert_eq!(index.position(4), Position::new(1, 5));
    }

    #[test]
    fn test_position_later_lines() {
        let index = LineIndex::new("var a = 1\n  out a\n");
        assert_eq!(index.position(10), Position::new(2, 1));
        assert_eq!(index.position(12), Position::new(2, 3));
        assert_eq!(index.position(18), Position::new(3, 1));
    }

    #[test]
    fn test_position_counts_characters() {
        let index = LineIndex::new("print \"你好\" out x");
        // `out` starts after two three-byte characters
        assert_eq!(index.position(15), Position::new(1, 12));
    }

    #[test]
    fn test_grammar_errors_keep_their_offset() {
        let index = LineIndex::new("out 1\nout  7");
        let error: ParseError<usize, Token<'_>, GrammarError> = ParseError::User {
            error: GrammarError::new(11, "malformed number literal"),
        };
        assert_eq!(index.syntax_error(error).to_string(), "2:6 malformed number literal");
    }

    #[test]
    fn test_position_past_end_is_clamped() {
        let index = LineIndex::new("out");
        assert_eq!(index.position(99), Position::new(1, 4));
    }

    #[test]
    fn test_display() {
        let error = SyntaxError::new(Position::new(3, 7), "Undefined variable: x");
        assert_eq!(error.to_string(), "3:7 Undefined variable: x");
    }
}
