use crate::ast::{BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement};
use crate::environment::{Env, Environment};
use crate::stack::ensure_sufficient_stack;
use crate::value::{Function, Value, NULL};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Nested function applications allowed before evaluation gives up
    /// with an error value.
    pub max_call_depth: usize,
}

impl EvalConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Evaluates `program` in `env` with the default configuration.
pub fn eval(program: &Program, env: &Env) -> Value {
    Evaluator::new().eval_program(program, env)
}

fn error(message: String) -> Value {
    tracing::debug!(%message, "runtime error");
    Value::Error(message)
}

/// Tree-walking evaluator. Runtime failures are `Value::Error`s that
/// unwind like `return` does; nothing here panics on bad input.
pub struct Evaluator {
    config: EvalConfig,
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self { config, depth: 0 }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Value {
        let mut result = NULL;

        for statement in &program.statements {
            match self.eval_statement(statement, env) {
                Value::Return(value) => return *value,
                error @ Value::Error(_) => return error,
                value => result = value,
            }
        }

        result
    }

    /// Evaluates statements in order. A return marker or error stops the
    /// block and is passed up unchanged.
    fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Value {
        let mut result = NULL;

        for statement in &block.statements {
            result = self.eval_statement(statement, env);
            if result.is_signal() {
                return result;
            }
        }

        result
    }

    /// Blocks that declare bindings get their own scope.
    fn eval_scoped_block(&mut self, block: &BlockStatement, env: &Env) -> Value {
        if block.introduces_bindings() {
            let scope = Environment::new_enclosed(Rc::clone(env));
            self.eval_block(block, &scope)
        } else {
            self.eval_block(block, env)
        }
    }

    pub fn eval_statement(&mut self, statement: &Statement, env: &Env) -> Value {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.eval_expression(value, env);
                if value.is_signal() {
                    return value;
                }
                env.borrow_mut().set(&name.name, value);
                NULL
            }
            Statement::Return { value, .. } => {
                let value = self.eval_expression(value, env);
                if value.is_signal() {
                    return value;
                }
                Value::Return(Box::new(value))
            }
            Statement::Expression { expression, .. } => self.eval_expression(expression, env),
            Statement::Block(block) => self.eval_scoped_block(block, env),
        }
    }

    pub fn eval_expression(&mut self, expression: &Expression, env: &Env) -> Value {
        ensure_sufficient_stack(|| match expression {
            Expression::Identifier(identifier) => {
                let found = env.borrow().get(&identifier.name);
                found.unwrap_or_else(|| error(format!("identifier not found: {}", identifier.name)))
            }
            Expression::Integer { value, .. } => Value::Integer(*value),
            Expression::Boolean { value, .. } => Value::from_bool(*value),
            Expression::Prefix {
                operator, right, ..
            } => {
                let right = self.eval_expression(right, env);
                if right.is_signal() {
                    return right;
                }
                eval_prefix(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval_expression(left, env);
                if left.is_signal() {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if right.is_signal() {
                    return right;
                }
                eval_infix(*operator, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let condition = self.eval_expression(condition, env);
                if condition.is_signal() {
                    return condition;
                }

                if condition.is_truthy() {
                    self.eval_scoped_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_scoped_block(alternative, env)
                } else {
                    NULL
                }
            }
            Expression::Function {
                parameters, body, ..
            } => Value::Function(Rc::new(Function {
                parameters: parameters.clone(),
                body: Rc::clone(body),
                env: Rc::clone(env),
            })),
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                let function = self.eval_expression(function, env);
                if function.is_signal() {
                    return function;
                }

                match self.eval_arguments(arguments, env) {
                    Ok(arguments) => self.apply_function(function, arguments),
                    Err(signal) => signal,
                }
            }
        })
    }

    fn eval_arguments(&mut self, arguments: &[Expression], env: &Env) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(arguments.len());

        for argument in arguments {
            let value = self.eval_expression(argument, env);
            if value.is_signal() {
                return Err(value);
            }
            values.push(value);
        }

        Ok(values)
    }

    fn apply_function(&mut self, function: Value, arguments: Vec<Value>) -> Value {
        let function = match function {
            Value::Function(function) => function,
            other => return error(format!("not a function: {}", other.type_name())),
        };

        if arguments.len() != function.arity() {
            return error(format!(
                "wrong number of arguments: expected {}, got {}",
                function.arity(),
                arguments.len()
            ));
        }

        if self.depth >= self.config.max_call_depth {
            return error(format!(
                "maximum call depth of {} exceeded",
                self.config.max_call_depth
            ));
        }

        tracing::trace!(arity = function.arity(), depth = self.depth, "applying function");

        let scope = Environment::new_enclosed(Rc::clone(&function.env));
        {
            let mut scope = scope.borrow_mut();
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                scope.set(&parameter.name, argument);
            }
        }

        self.depth += 1;
        let result = self.eval_block(&function.body, &scope);
        self.depth -= 1;

        match result {
            Value::Return(value) => *value,
            other => other,
        }
    }
}

fn eval_prefix(operator: PrefixOp, right: Value) -> Value {
    match operator {
        PrefixOp::Not => Value::from_bool(!right.is_truthy()),
        PrefixOp::Negate => match right {
            Value::Integer(n) => match n.checked_neg() {
                Some(negated) => Value::Integer(negated),
                None => error(format!("integer overflow: -{}", n)),
            },
            other => error(format!("type mismatch: -{}", other.type_name())),
        },
    }
}

fn eval_infix(operator: InfixOp, left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(operator, l, r),
        (Value::Boolean(l), Value::Boolean(r)) => match operator {
            InfixOp::Equal => Value::from_bool(l == r),
            InfixOp::NotEqual => Value::from_bool(l != r),
            _ => error(format!("unknown operator: BOOLEAN {} BOOLEAN", operator)),
        },
        (l, r) if l.type_name() != r.type_name() => error(format!(
            "type mismatch: {} {} {}",
            l.type_name(),
            operator,
            r.type_name()
        )),
        (l, r) => error(format!(
            "unknown operator: {} {} {}",
            l.type_name(),
            operator,
            r.type_name()
        )),
    }
}

fn eval_integer_infix(operator: InfixOp, l: i64, r: i64) -> Value {
    let checked = match operator {
        InfixOp::Add => l.checked_add(r),
        InfixOp::Subtract => l.checked_sub(r),
        InfixOp::Multiply => l.checked_mul(r),
        InfixOp::Divide => {
            if r == 0 {
                return error(format!("division by zero: {} / 0", l));
            }
            l.checked_div(r)
        }
        InfixOp::Less => return Value::from_bool(l < r),
        InfixOp::Greater => return Value::from_bool(l > r),
        InfixOp::Equal => return Value::from_bool(l == r),
        InfixOp::NotEqual => return Value::from_bool(l != r),
    };

    match checked {
        Some(n) => Value::Integer(n),
        None => error(format!("integer overflow: {} {} {}", l, operator, r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::{FALSE, TRUE};
    use pretty_assertions::assert_eq;

    fn run_with(evaluator: &mut Evaluator, source: &str) -> Value {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "parser errors for {:?}: {:?}", source, errors);
        evaluator.eval_program(&program, &Environment::new())
    }

    fn run(source: &str) -> Value {
        run_with(&mut Evaluator::new(), source)
    }

    fn check(cases: &[(&str, Value)]) {
        for (source, expected) in cases {
            assert_eq!(&run(source), expected, "source: {}", source);
        }
    }

    fn error_value(message: &str) -> Value {
        Value::Error(message.to_string())
    }

    #[test]
    fn integer_arithmetic() {
        check(&[
            ("5", Value::Integer(5)),
            ("-10", Value::Integer(-10)),
            ("5 + 5 + 5 + 5 - 10", Value::Integer(10)),
            ("2 * 2 * 2 * 2 * 2", Value::Integer(32)),
            ("-50 + 100 + -50", Value::Integer(0)),
            ("5 + 2 * 10", Value::Integer(25)),
            ("20 + 2 * -10", Value::Integer(0)),
            ("50 / 2 * 2 + 10", Value::Integer(60)),
            ("3 * (3 * 3) + 10", Value::Integer(37)),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", Value::Integer(50)),
            ("7 / 2", Value::Integer(3)),
            ("-7 / 2", Value::Integer(-3)),
        ]);
    }

    #[test]
    fn boolean_expressions() {
        check(&[
            ("true", TRUE),
            ("false", FALSE),
            ("1 < 2", TRUE),
            ("1 > 2", FALSE),
            ("1 < 1", FALSE),
            ("1 == 1", TRUE),
            ("1 != 1", FALSE),
            ("1 != 2", TRUE),
            ("true == true", TRUE),
            ("false == false", TRUE),
            ("true == false", FALSE),
            ("true != false", TRUE),
            ("(1 < 2) == true", TRUE),
            ("(1 > 2) == true", FALSE),
        ]);
    }

    #[test]
    fn bang_uses_truthiness() {
        check(&[
            ("!true", FALSE),
            ("!false", TRUE),
            ("!5", FALSE),
            ("!!true", TRUE),
            ("!!5", TRUE),
            ("!0", FALSE),
            ("!if (false) { 1 }", TRUE),
        ]);
    }

    #[test]
    fn conditionals() {
        check(&[
            ("if (true) { 10 }", Value::Integer(10)),
            ("if (false) { 10 }", NULL),
            ("if (1) { 10 }", Value::Integer(10)),
            ("if (1 < 2) { 10 }", Value::Integer(10)),
            ("if (1 > 2) { 10 }", NULL),
            ("if (1 > 2) { 10 } else { 20 }", Value::Integer(20)),
            ("if (1 < 2) { 10 } else { 20 }", Value::Integer(10)),
        ]);
    }

    #[test]
    fn return_statements() {
        check(&[
            ("return 10;", Value::Integer(10)),
            ("return 10; 9;", Value::Integer(10)),
            ("9; return 2 * 5; 9;", Value::Integer(10)),
            (
                "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
                Value::Integer(10),
            ),
            (
                "let f = fn(x) { return x; x + 10; }; f(10);",
                Value::Integer(10),
            ),
            (
                "let f = fn(x) { let result = x + 10; return result; return 10; }; f(10);",
                Value::Integer(20),
            ),
            (
                "fn() { (if (true) { return 1; }) + 2 }()",
                Value::Integer(1),
            ),
            ("-(if (true) { return 3; }); 4", Value::Integer(3)),
        ]);
    }

    #[test]
    fn runtime_errors() {
        check(&[
            ("5 + true;", error_value("type mismatch: INTEGER + BOOLEAN")),
            ("5 + true; 5;", error_value("type mismatch: INTEGER + BOOLEAN")),
            ("-true", error_value("type mismatch: -BOOLEAN")),
            ("true + false;", error_value("unknown operator: BOOLEAN + BOOLEAN")),
            ("true < false", error_value("unknown operator: BOOLEAN < BOOLEAN")),
            ("5; true + false; 5", error_value("unknown operator: BOOLEAN + BOOLEAN")),
            (
                "if (10 > 1) { true + false; }",
                error_value("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                error_value("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            ("foobar", error_value("identifier not found: foobar")),
            ("5(1)", error_value("not a function: INTEGER")),
            ("missing(1)", error_value("identifier not found: missing")),
            (
                "if (1 + true) { 1 }; 5",
                error_value("type mismatch: INTEGER + BOOLEAN"),
            ),
            ("-(1 + true); 5", error_value("type mismatch: INTEGER + BOOLEAN")),
            ("!(1 + true); 5", error_value("type mismatch: INTEGER + BOOLEAN")),
            ("(1 + true) * 2; 5", error_value("type mismatch: INTEGER + BOOLEAN")),
            (
                "if (false) { 1 } == if (false) { 1 }",
                error_value("unknown operator: NULL == NULL"),
            ),
        ]);
    }

    #[test]
    fn error_stops_sibling_statements() {
        assert_eq!(
            run("5 + true; 10;"),
            error_value("type mismatch: INTEGER + BOOLEAN")
        );
        assert_eq!(
            run("let f = fn() { missing }; let y = f(); 10"),
            error_value("identifier not found: missing")
        );
    }

    #[test]
    fn arguments_are_evaluated_left_to_right() {
        assert_eq!(
            run("let f = fn(a, b) { a }; f(1 + true, missing)"),
            error_value("type mismatch: INTEGER + BOOLEAN")
        );
    }

    #[test]
    fn arity_mismatch() {
        check(&[
            (
                "fn(x) { x }(1, 2)",
                error_value("wrong number of arguments: expected 1, got 2"),
            ),
            (
                "let add = fn(a, b) { a + b }; add(1)",
                error_value("wrong number of arguments: expected 2, got 1"),
            ),
        ]);
    }

    #[test]
    fn division_by_zero_and_overflow() {
        check(&[
            ("10 / 0", error_value("division by zero: 10 / 0")),
            ("let zero = 1 - 1; 5 / zero", error_value("division by zero: 5 / 0")),
            (
                "9223372036854775807 + 1",
                error_value("integer overflow: 9223372036854775807 + 1"),
            ),
            (
                "-9223372036854775807 - 2",
                error_value("integer overflow: -9223372036854775807 - 2"),
            ),
            (
                "(-9223372036854775807 - 1) / -1",
                error_value("integer overflow: -9223372036854775808 / -1"),
            ),
            (
                "-(-9223372036854775807 - 1)",
                error_value("integer overflow: --9223372036854775808"),
            ),
        ]);
    }

    #[test]
    fn let_statements() {
        check(&[
            ("let x = 5; x", Value::Integer(5)),
            ("let a = 5 * 5; a;", Value::Integer(25)),
            ("let a = 5; let b = a; b;", Value::Integer(5)),
            ("let a = 5; let b = a; let c = a + b + 5; c;", Value::Integer(15)),
            ("let a = 5;", NULL),
        ]);
    }

    #[test]
    fn function_object() {
        match run("fn(x) { x + 2; };") {
            Value::Function(function) => {
                assert_eq!(function.arity(), 1);
                assert_eq!(function.parameters[0].name, "x");
                assert_eq!(function.body.to_string(), "(x + 2)");
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn function_application() {
        check(&[
            ("let identity = fn(x) { x; }; identity(5);", Value::Integer(5)),
            ("let identity = fn(x) { return x; }; identity(5);", Value::Integer(5)),
            ("let double = fn(x) { x * 2; }; double(5);", Value::Integer(10)),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", Value::Integer(10)),
            (
                "let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));",
                Value::Integer(20),
            ),
            ("fn(x) { x; }(5)", Value::Integer(5)),
            ("fn() { }()", NULL),
        ]);
    }

    #[test]
    fn closures() {
        check(&[
            (
                "let newAdder = fn(x) { fn(y) { x + y }; }; let addTwo = newAdder(2); addTwo(3);",
                Value::Integer(5),
            ),
            (
                "let x = 1; let f = fn() { x }; let x = 2; f()",
                Value::Integer(2),
            ),
        ]);
    }

    #[test]
    fn scopes() {
        check(&[
            (
                "let f = fn() { let inner = 1; inner }; f(); inner",
                error_value("identifier not found: inner"),
            ),
            (
                "let x = 1; let f = fn() { let x = 2; x }; f() + x",
                Value::Integer(3),
            ),
            ("let x = 1; if (true) { let x = 2; x } + x", Value::Integer(3)),
            ("let x = 1; if (true) { let x = 2; }; x", Value::Integer(1)),
            (
                "if (true) { let y = 2; }; y",
                error_value("identifier not found: y"),
            ),
        ]);
    }

    #[test]
    fn recursion() {
        check(&[
            (
                "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(15)",
                Value::Integer(610),
            ),
            (
                "let down = fn(n) { if (n == 0) { 0 } else { down(n - 1) } }; down(1000)",
                Value::Integer(0),
            ),
        ]);
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut evaluator = Evaluator::with_config(EvalConfig { max_call_depth: 64 });
        assert_eq!(
            run_with(&mut evaluator, "let f = fn(n) { f(n + 1) }; f(0)"),
            error_value("maximum call depth of 64 exceeded")
        );

        // The counter unwinds after an error, so the evaluator stays usable.
        assert_eq!(
            run_with(&mut evaluator, "let f = fn(n) { n }; f(7)"),
            Value::Integer(7)
        );

        assert_eq!(
            run("let f = fn(n) { f(n + 1) }; f(0)"),
            error_value("maximum call depth of 1024 exceeded")
        );
    }

    #[test]
    fn bindings_persist_in_a_shared_environment() {
        let env = Environment::new();
        let mut evaluator = Evaluator::new();

        for (source, expected) in [
            ("let a = 2;", NULL),
            ("let double = fn(x) { x * a };", NULL),
            ("double(21)", Value::Integer(42)),
        ] {
            let (program, errors) = parse(source);
            assert!(errors.is_empty());
            assert_eq!(evaluator.eval_program(&program, &env), expected);
        }
    }
}
