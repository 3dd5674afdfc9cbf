// minipy interpreter library
//
// Tree-walking interpreter for a small Python-like language: integer and
// boolean variables, arithmetic, for/while loops, if/elif/else, print and
// input, with blocks delimited by 4-space indentation.

pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod structurer;
pub mod value;

// Re-export commonly used items
pub use ast::{Condition, Expr, Statement};
pub use environment::Environment;
pub use error::{ErrorKind, ScriptError, Span};
pub use evaluator::Evaluator;
pub use interpreter::Interpreter;
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use structurer::{structure, Line};
pub use value::Value;

pub use runner::run;
