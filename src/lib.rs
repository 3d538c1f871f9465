// Monkey Language Interpreter Library
//
// Lexer, Pratt parser and tree-walking evaluator for Monkey, a small
// dynamically typed language with first-class functions and closures.

// Public modules
pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

mod stack;

// Re-export commonly used items
pub use ast::{Expression, Program, Statement};
pub use environment::{Env, Environment};
pub use error::{ParseError, RunError, Span};
pub use evaluator::{eval, EvalConfig, Evaluator};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
