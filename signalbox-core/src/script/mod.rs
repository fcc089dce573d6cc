//! The strategy-script language: lexer, AST, and recursive-descent parser.
//!
//! Scripts are straight-line dataflow programs in a small Python-flavoured
//! dialect. One statement per line; `#` starts a comment. Statements:
//!
//! - `import NAME` / `from NAME import NAME, ...`
//! - assignment to a name, a mask-indexed series (`signals[mask] = 1`),
//!   or a frame column (`df["sma"] = ...`)
//! - bare expressions
//!
//! There are no loops, conditionals, or function definitions: every script
//! is a finite sequence of expression evaluations, so termination is a
//! property of the grammar rather than of a runtime quota.
//!
//! Parsing never executes anything; the syntax tree is handed to the
//! policy validator before any evaluation happens.

pub mod ast;
pub mod parser;
pub mod token;

pub use ast::{BinOp, CmpOp, Expr, Stmt, Target, UnaryOp};
pub use parser::parse;
pub use token::{lex, Tok, Token};

use thiserror::Error;

/// Script text that is not syntactically valid. Reported before any
/// policy check or execution.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("parse error at line {line}, column {col}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}
