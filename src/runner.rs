use crate::environment::Environment;
use crate::error::{report_runtime_error, RunError};
use crate::evaluator::{EvalConfig, Evaluator};
use crate::parser::parse;
use crate::value::Value;

/// Parses and evaluates a whole script in a fresh global scope.
///
/// Every syntax diagnostic is reported before giving up; a script with
/// syntax errors is never evaluated.
pub fn run(source: &str, filename: Option<&str>, config: EvalConfig) -> Result<Value, RunError> {
    let (program, errors) = parse(source);
    if !errors.is_empty() {
        for error in &errors {
            error.report(source, filename);
        }
        return Err(RunError::Syntax(errors.len()));
    }

    let env = Environment::new();
    let mut evaluator = Evaluator::with_config(config);
    match evaluator.eval_program(&program, &env) {
        Value::Error(message) => {
            report_runtime_error(&message, source, filename);
            Err(RunError::Runtime(message))
        }
        value => Ok(value),
    }
}
