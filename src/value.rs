use crate::ast::{BlockStatement, Identifier};
use crate::environment::Env;
use std::fmt;
use std::rc::Rc;

/// Runtime values. `Error` and `Return` are signals rather than data: both
/// unwind enclosing blocks until a call boundary (for `Return`) or the top
/// level (for `Error`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    Function(Rc<Function>),
    Error(String),
    Return(Box<Value>),
}

/// The shared boolean and null values. Evaluation hands out only these,
/// so any two booleans (or nulls) of the same kind are interchangeable.
pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

impl Value {
    pub fn from_bool(value: bool) -> Value {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    /// Everything except `false` and `null` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Errors and return markers stop evaluation of the enclosing block.
    pub fn is_signal(&self) -> bool {
        matches!(self, Value::Error(_) | Value::Return(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Function(_) => "FUNCTION",
            Value::Error(_) => "ERROR",
            Value::Return(_) => "RETURN_VALUE",
        }
    }

    /// The text the read-loop prints for a value.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Function(_) => write!(f, "<function>"),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Return(value) => write!(f, "{}", value),
        }
    }
}

/// A closure: the literal's parameters and body plus the scope that was
/// live where the literal was evaluated.
pub struct Function {
    pub parameters: Vec<Identifier>,
    pub body: Rc<BlockStatement>,
    pub env: Env,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

// Closures compare by identity. Comparing captured scopes structurally
// could recurse forever through a self-referencing binding.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parameters: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        f.debug_struct("Function")
            .field("parameters", &parameters)
            .field("body", &self.body.to_string())
            .finish_non_exhaustive()
    }
}
