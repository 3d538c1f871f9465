//! Syntax tree produced by the parser.
//!
//! Every node keeps the token that introduced it. The token is provenance
//! for diagnostics and `Display`; evaluation never reads it.

use crate::error::Span;
use crate::lexer::{Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::fmt;
use std::mem;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map(Statement::token_literal)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Let {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Return {
        token: Token,
        value: Expression,
    },
    Expression {
        token: Token,
        expression: Expression,
    },
    Block(BlockStatement),
}

impl Statement {
    pub fn token(&self) -> &Token {
        match self {
            Statement::Let { token, .. } => token,
            Statement::Return { token, .. } => token,
            Statement::Expression { token, .. } => token,
            Statement::Block(block) => &block.token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

impl BlockStatement {
    /// True when the block itself declares bindings with `let`.
    pub fn introduces_bindings(&self) -> bool {
        self.statements
            .iter()
            .any(|statement| matches!(statement, Statement::Let { .. }))
    }
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Identifier(Identifier),
    Integer {
        token: Token,
        value: i64,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    Prefix {
        token: Token,
        operator: PrefixOp,
        right: Box<Expression>,
    },
    Infix {
        token: Token,
        left: Box<Expression>,
        operator: InfixOp,
        right: Box<Expression>,
    },
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Function {
        token: Token,
        parameters: Vec<Identifier>,
        body: Rc<BlockStatement>,
    },
    Call {
        token: Token,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier(identifier) => &identifier.token,
            Expression::Integer { token, .. } => token,
            Expression::Boolean { token, .. } => token,
            Expression::Prefix { token, .. } => token,
            Expression::Infix { token, .. } => token,
            Expression::If { token, .. } => token,
            Expression::Function { token, .. } => token,
            Expression::Call { token, .. } => token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }

    /// Leaf left behind when a child is moved out of its box.
    fn vacant() -> Expression {
        Expression::Boolean {
            token: Token::new(TokenKind::False, String::new(), Span::default()),
            value: false,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(_) | Expression::Integer { .. } | Expression::Boolean { .. }
        )
    }

    /// Moves every direct child node out of `self` onto the worklists.
    fn detach_children(&mut self, statements: &mut Vec<Statement>, expressions: &mut Vec<Expression>) {
        match self {
            Expression::Identifier(_) | Expression::Integer { .. } | Expression::Boolean { .. } => {}
            Expression::Prefix { right, .. } => {
                detach(right, expressions);
            }
            Expression::Infix { left, right, .. } => {
                detach(left, expressions);
                detach(right, expressions);
            }
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                detach(condition, expressions);
                statements.append(&mut consequence.statements);
                if let Some(alternative) = alternative {
                    statements.append(&mut alternative.statements);
                }
            }
            // A body still shared with a closure is torn down when the
            // closure goes away.
            Expression::Function { body, .. } => {
                if let Some(body) = Rc::get_mut(body) {
                    statements.append(&mut body.statements);
                }
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                detach(function, expressions);
                expressions.append(arguments);
            }
        }
    }
}

fn detach(child: &mut Expression, expressions: &mut Vec<Expression>) {
    if !child.is_leaf() {
        expressions.push(mem::replace(child, Expression::vacant()));
    }
}

// Dropping detaches children onto a worklist, so a deeply nested tree is
// freed without recursing once per level.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut statements = Vec::new();
        let mut expressions = Vec::new();
        self.detach_children(&mut statements, &mut expressions);

        loop {
            if let Some(statement) = statements.pop() {
                match statement {
                    Statement::Let { value, .. } | Statement::Return { value, .. } => {
                        expressions.push(value)
                    }
                    Statement::Expression { expression, .. } => expressions.push(expression),
                    Statement::Block(mut block) => statements.append(&mut block.statements),
                }
            } else if let Some(mut expression) = expressions.pop() {
                expression.detach_children(&mut statements, &mut expressions);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    Equal,
    NotEqual,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOp::Not => write!(f, "!"),
            PrefixOp::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            InfixOp::Add => "+",
            InfixOp::Subtract => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Statement::Let { token, name, value } => {
                write!(f, "{} {} = {};", token.literal, name, value)
            }
            Statement::Return { token, value } => write!(f, "{} {};", token.literal, value),
            Statement::Expression { expression, .. } => write!(f, "{}", expression),
            Statement::Block(block) => write!(f, "{}", block),
        })
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Expression::Identifier(identifier) => write!(f, "{}", identifier),
            Expression::Integer { token, .. } | Expression::Boolean { token, .. } => {
                f.write_str(&token.literal)
            }
            Expression::Prefix {
                operator, right, ..
            } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            // The condition is deliberately not rendered.
            Expression::If {
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {}", consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            Expression::Function {
                token,
                parameters,
                body,
            } => {
                let parameters: Vec<String> = parameters.iter().map(ToString::to_string).collect();
                write!(f, "{}({}) {}", token.literal, parameters.join(", "), body)
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                let arguments: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", function, arguments.join(", "))
            }
        })
    }
}
