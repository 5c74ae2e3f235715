//! Query front end
//!
//! SELECT query lexing, parsing, and lowering into circuit plans.

/// Abstract Syntax Tree types
#[allow(missing_docs)]
pub mod ast;
/// Query lexer
#[allow(missing_docs)]
pub mod lexer;
/// Query parser
#[allow(missing_docs)]
pub mod parser;
/// Query planner
#[allow(missing_docs)]
pub mod planner;

// Re-export main types
pub use ast::*;
pub use lexer::{Lexer, LexerError, Token};
pub use parser::{parse_query, ParseError, Parser, MAX_NESTING_DEPTH};
pub use planner::{
    CircuitPlan, Instruction, Op, Operand, PlanError, Planner, Register,
    MAX_COLUMNS,
};
