use crate::ast::{BlockStatement, Expression, Identifier, InfixOp, PrefixOp, Program, Statement};
use crate::error::{ParseError, Span};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

/// Binding power of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Equal | TokenKind::NotEqual => Precedence::Equals,
            TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LeftParen => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

fn infix_operator(kind: TokenKind) -> Option<InfixOp> {
    match kind {
        TokenKind::Plus => Some(InfixOp::Add),
        TokenKind::Minus => Some(InfixOp::Subtract),
        TokenKind::Asterisk => Some(InfixOp::Multiply),
        TokenKind::Slash => Some(InfixOp::Divide),
        TokenKind::Less => Some(InfixOp::Less),
        TokenKind::Greater => Some(InfixOp::Greater),
        TokenKind::Equal => Some(InfixOp::Equal),
        TokenKind::NotEqual => Some(InfixOp::NotEqual),
        _ => None,
    }
}

/// Lexes and parses a whole source text, returning the program together
/// with every diagnostic recorded along the way.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

/// Recursive descent for statements, Pratt parsing for expressions.
///
/// Syntax errors never abort the parse: they are recorded and the parser
/// skips ahead, so a single input can report several problems. Callers
/// must check [`Parser::errors`] before trusting the returned program.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.current_is(TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();

        self.expect_peek(TokenKind::Identifier)?;
        let name = self.current_identifier();

        self.expect_peek(TokenKind::Assign)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Statement::Let { token, name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Statement::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let token = self.current.clone();
        let expression = self.parse_expression(Precedence::Lowest)?;

        // Semicolons are optional, notably after the last statement.
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Some(Statement::Expression { token, expression })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let token = self.current.clone();
        let mut statements = Vec::new();
        self.next_token();

        while !self.current_is(TokenKind::RightBrace) && !self.current_is(TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        if self.current_is(TokenKind::Eof) {
            self.record_error(
                self.current.span,
                format!(
                    "expected next token to be {}, got {} instead",
                    TokenKind::RightBrace,
                    TokenKind::Eof
                ),
            );
        }

        BlockStatement { token, statements }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        ensure_sufficient_stack(|| {
            let mut left = self.parse_prefix()?;

            while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
                self.next_token();
                left = self.parse_infix(left)?;
            }

            Some(left)
        })
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match self.current.kind {
            TokenKind::Identifier => Some(Expression::Identifier(self.current_identifier())),
            TokenKind::Integer => self.parse_integer_literal(),
            TokenKind::True | TokenKind::False => Some(Expression::Boolean {
                token: self.current.clone(),
                value: self.current_is(TokenKind::True),
            }),
            TokenKind::Bang => self.parse_prefix_expression(PrefixOp::Not),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOp::Negate),
            TokenKind::LeftParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            kind => {
                self.record_error(
                    self.current.span,
                    format!("no prefix parse function for {} found", kind),
                );
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        match self.current.kind {
            TokenKind::LeftParen => self.parse_call_expression(left),
            kind => {
                let operator = infix_operator(kind)?;
                self.parse_infix_expression(left, operator)
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer { token, value }),
            Err(_) => {
                self.record_error(
                    token.span,
                    format!("could not parse {} as integer", token.literal),
                );
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, operator: PrefixOp) -> Option<Expression> {
        let token = self.current.clone();
        self.next_token();

        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            token,
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression, operator: InfixOp) -> Option<Expression> {
        let token = self.current.clone();
        // Left associative: the right operand binds at the operator's own level.
        let precedence = Precedence::of(token.kind);
        self.next_token();

        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            token,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();

        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        let token = self.current.clone();

        self.expect_peek(TokenKind::LeftParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RightParen)?;

        self.expect_peek(TokenKind::LeftBrace)?;
        let consequence = self.parse_block_statement();

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        let token = self.current.clone();

        self.expect_peek(TokenKind::LeftParen)?;
        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::LeftBrace)?;
        let body = self.parse_block_statement();

        Some(Expression::Function {
            token,
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();

        if self.peek_is(TokenKind::RightParen) {
            self.next_token();
            return Some(parameters);
        }

        self.expect_peek(TokenKind::Identifier)?;
        parameters.push(self.current_identifier());

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Identifier)?;
            parameters.push(self.current_identifier());
        }

        self.expect_peek(TokenKind::RightParen)?;
        Some(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let token = self.current.clone();
        let arguments = self.parse_call_arguments()?;

        Some(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_call_arguments(&mut self) -> Option<Vec<Expression>> {
        let mut arguments = Vec::new();

        if self.peek_is(TokenKind::RightParen) {
            self.next_token();
            return Some(arguments);
        }

        self.next_token();
        arguments.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            arguments.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(TokenKind::RightParen)?;
        Some(arguments)
    }

    fn current_identifier(&self) -> Identifier {
        Identifier {
            token: self.current.clone(),
            name: self.current.literal.clone(),
        }
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.kind)
    }

    /// Advances only when the next token has the expected kind; otherwise
    /// records a diagnostic and leaves the cursor where it is.
    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek_is(kind) {
            self.next_token();
            Some(())
        } else {
            self.record_error(
                self.peek.span,
                format!(
                    "expected next token to be {}, got {} instead",
                    kind, self.peek.kind
                ),
            );
            None
        }
    }

    fn record_error(&mut self, span: Span, message: String) {
        tracing::debug!(start = span.start, end = span.end, %message, "syntax error");
        self.errors.push(ParseError::new(span, message));
    }
}
