use crate::ast::Statement;
use crate::environment::{Env, Environment};
use crate::evaluator::{EvalConfig, Evaluator};
use crate::parser::parse;
use crate::value::Value;
use std::io::{self, BufRead, Write};

const PROMPT: &str = ">> ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Evaluate each line and print its value.
    #[default]
    Evaluate,
    /// Print each line's parsed program instead of evaluating it.
    Echo,
}

/// Interactive loop over stdin. Bindings persist between lines.
pub fn start(mode: Mode, config: EvalConfig) {
    println!("Monkey Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let env = Environment::new();
    let mut evaluator = Evaluator::with_config(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", PROMPT);
        if let Err(error) = io::stdout().flush() {
            tracing::warn!(%error, "failed to flush prompt");
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
            None => {
                // Ctrl+D or end of piped input
                println!();
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            println!("Goodbye!");
            break;
        }

        if let Some(output) = run_line(line, mode, &mut evaluator, &env) {
            println!("{}", output);
        }
    }
}

/// Handles one line of input and returns the text to print, if any.
/// Syntax diagnostics are reported to stderr as a side effect.
pub fn run_line(line: &str, mode: Mode, evaluator: &mut Evaluator, env: &Env) -> Option<String> {
    let (program, errors) = parse(line);
    if !errors.is_empty() {
        for error in &errors {
            error.report(line, None);
        }
        return None;
    }

    if mode == Mode::Echo {
        return Some(program.to_string());
    }

    let value = evaluator.eval_program(&program, env);
    let ends_with_let = matches!(program.statements.last(), Some(Statement::Let { .. }));
    match value {
        Value::Null if ends_with_let => None,
        value => Some(value.render()),
    }
}
