use crate::ast::{
    BinaryOp, CompareOp, Condition, Expr, LogicalOp, PrintArg, RangeArgs, Statement, UnaryOp,
};
use crate::error::{ScriptError, Span};
use crate::lexer::{Lexer, Token, TokenType};
use crate::structurer::Line;
use crate::value::Value;

/// Parses one structured line into a statement. Lines whose shape matches
/// no statement come back as [`Statement::Unrecognized`] rather than an error.
pub fn parse_line(line: &Line) -> Result<Statement, ScriptError> {
    let tokens = Lexer::new(&line.text, line.offset).scan_tokens();
    let mut parser = Parser::new(tokens);

    match parser.statement()? {
        Some(statement) => Ok(statement),
        None => Ok(Statement::Unrecognized {
            text: line.text.clone(),
            opens_block: line.text.ends_with(':'),
            span: line.span(),
        }),
    }
}

/// Parses a complete arithmetic expression starting at byte `offset` of the program.
pub fn parse_expression(source: &str, offset: usize) -> Result<Expr, ScriptError> {
    let mut parser = Parser::new(Lexer::new(source, offset).scan_tokens());
    let expr = parser.expression()?;
    parser.expect_end("after expression")?;
    Ok(expr)
}

/// Parses a complete condition starting at byte `offset` of the program.
pub fn parse_condition(source: &str, offset: usize) -> Result<Condition, ScriptError> {
    let mut parser = Parser::new(Lexer::new(source, offset).scan_tokens());
    let condition = parser.condition()?;
    parser.expect_end("after condition")?;
    Ok(condition)
}

/// Deepest run of parentheses, unary signs and `not` one line may nest.
const MAX_NESTING: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    /// Returns `Ok(None)` when the tokens do not start any known statement.
    pub fn statement(&mut self) -> Result<Option<Statement>, ScriptError> {
        let statement = match self.peek().token_type {
            TokenType::For => {
                self.advance();
                self.for_statement()?
            }
            TokenType::While => {
                self.advance();
                let start = self.previous().span.clone();
                let condition = self.condition()?;
                self.header_end("while")?;
                Statement::While {
                    condition,
                    span: start.to(&self.previous().span),
                }
            }
            TokenType::If => {
                self.advance();
                let start = self.previous().span.clone();
                let condition = self.condition()?;
                self.header_end("if")?;
                Statement::If {
                    condition,
                    span: start.to(&self.previous().span),
                }
            }
            TokenType::Elif => {
                self.advance();
                let start = self.previous().span.clone();
                let condition = self.condition()?;
                self.header_end("elif")?;
                Statement::Elif {
                    condition,
                    span: start.to(&self.previous().span),
                }
            }
            TokenType::Else => {
                self.advance();
                let start = self.previous().span.clone();
                self.header_end("else")?;
                Statement::Else {
                    span: start.to(&self.previous().span),
                }
            }
            TokenType::Pass => {
                self.advance();
                let span = self.previous().span.clone();
                self.expect_end("after 'pass'")?;
                Statement::Pass { span }
            }
            TokenType::Identifier => {
                if self.peek().lexeme == "print" && self.check_next(&TokenType::LeftParen) {
                    self.print_statement()?
                } else if self.is_assignment_operator(self.current + 1) {
                    self.assignment()?
                } else {
                    return Ok(None);
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(statement))
    }

    fn for_statement(&mut self) -> Result<Statement, ScriptError> {
        let start = self.previous().span.clone();

        let variable = self
            .consume_with_help(
                TokenType::Identifier,
                "Expected loop variable after 'for'",
                "Loops have the form: for i in range(start, end):".to_string(),
            )?
            .lexeme
            .clone();
        self.consume_with_help(
            TokenType::In,
            "Expected 'in' after loop variable",
            "Loops have the form: for i in range(start, end):".to_string(),
        )?;

        if !(self.check(&TokenType::Identifier) && self.peek().lexeme == "range") {
            return Err(ScriptError::syntax_error_with_help(
                self.peek().span.clone(),
                "Expected 'range(...)' after 'in'".to_string(),
                "Only range loops are supported: for i in range(start, end):".to_string(),
            ));
        }
        let range_start = self.advance().span.clone();
        self.consume(TokenType::LeftParen, "Expected '(' after 'range'")?;

        let mut args = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let range_end = self
            .consume(TokenType::RightParen, "Expected ')' after range arguments")?
            .span
            .clone();
        let range_span = range_start.to(&range_end);

        let mut args = args.into_iter();
        let range = match (args.next(), args.next(), args.next(), args.next()) {
            (Some(end), None, None, None) => RangeArgs {
                start: None,
                end,
                step: None,
                span: range_span,
            },
            (Some(start), Some(end), step, None) => RangeArgs {
                start: Some(start),
                end,
                step,
                span: range_span,
            },
            _ => {
                return Err(ScriptError::syntax_error_with_help(
                    range_span,
                    "range() takes 1 to 3 arguments".to_string(),
                    "Use range(end), range(start, end) or range(start, end, step).".to_string(),
                ))
            }
        };

        self.header_end("for")?;

        Ok(Statement::For {
            variable,
            range,
            span: start.to(&self.previous().span),
        })
    }

    fn print_statement(&mut self) -> Result<Statement, ScriptError> {
        let start = self.advance().span.clone();
        self.consume(TokenType::LeftParen, "Expected '(' after 'print'")?;

        let mut args = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                let is_text = self.check(&TokenType::String)
                    && matches!(
                        self.peek_at(self.current + 1).token_type,
                        TokenType::Comma | TokenType::RightParen
                    );
                if is_text {
                    args.push(PrintArg::Text(self.advance().lexeme.clone()));
                } else {
                    args.push(PrintArg::Expr(self.expression()?));
                }
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after print arguments",
            "print takes a quoted string or an expression: print(\"total\") or print(x + 1)"
                .to_string(),
        )?;
        let span = start.to(&self.previous().span);
        self.expect_end("after print(...)")?;

        Ok(Statement::Print { args, span })
    }

    fn assignment(&mut self) -> Result<Statement, ScriptError> {
        let target_token = self.advance().clone();
        let operator = match self.advance().token_type {
            TokenType::PlusEqual => Some(BinaryOp::Add),
            TokenType::MinusEqual => Some(BinaryOp::Subtract),
            TokenType::StarEqual => Some(BinaryOp::Multiply),
            TokenType::SlashEqual => Some(BinaryOp::Divide),
            TokenType::PercentEqual => Some(BinaryOp::Modulo),
            _ => None,
        };

        if operator.is_none() && self.is_input_call() {
            let prompt = self.input_call()?;
            let span = target_token.span.to(&self.previous().span);
            self.expect_end("after input(...)")?;
            return Ok(Statement::Input {
                target: target_token.lexeme,
                prompt,
                span,
            });
        }

        if self.is_at_end() {
            return Err(ScriptError::syntax_error_with_help(
                self.previous().span.clone(),
                format!("Expected a value to assign to '{}'", target_token.lexeme),
                "Assignments have the form: name = expression".to_string(),
            ));
        }

        let value = self.expression()?;
        let span = target_token.span.to(value.span());
        self.expect_end("after assigned expression")?;

        Ok(Statement::Assignment {
            target: target_token.lexeme,
            operator,
            value,
            span,
        })
    }

    fn is_input_call(&self) -> bool {
        let is_call = |at: usize, name: &str| {
            let token = self.peek_at(at);
            token.token_type == TokenType::Identifier
                && token.lexeme == name
                && self.peek_at(at + 1).token_type == TokenType::LeftParen
        };
        is_call(self.current, "input") || (is_call(self.current, "int") && is_call(self.current + 2, "input"))
    }

    /// Consumes `input(...)` or `int(input(...))`, returning the prompt.
    fn input_call(&mut self) -> Result<Option<String>, ScriptError> {
        let wrapped = self.peek().lexeme == "int";
        if wrapped {
            self.advance();
            self.advance();
        }

        self.advance();
        self.consume(TokenType::LeftParen, "Expected '(' after 'input'")?;
        let prompt = if self.check(&TokenType::String) {
            Some(self.advance().lexeme.clone())
        } else {
            None
        };
        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after input prompt",
            "input() takes an optional quoted prompt: n = input(\"Enter:\")".to_string(),
        )?;

        if wrapped {
            self.consume(TokenType::RightParen, "Expected ')' to close int(...)")?;
        }

        Ok(prompt)
    }

    /// Consumes the `:` ending a block header and checks nothing follows it.
    fn header_end(&mut self, keyword: &str) -> Result<(), ScriptError> {
        if !self.is_at_end() && !self.check(&TokenType::Colon) {
            return Err(self.unexpected(self.peek(), &format!("in '{}' header", keyword)));
        }
        self.consume_with_help(
            TokenType::Colon,
            &format!("Expected ':' at the end of the '{}' header", keyword),
            "Block headers end with a colon and the block follows on indented lines.".to_string(),
        )?;
        self.expect_end(&format!("after '{}' header", keyword))
    }

    pub fn condition(&mut self) -> Result<Condition, ScriptError> {
        self.or()
    }

    fn or(&mut self) -> Result<Condition, ScriptError> {
        let mut condition = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            let right = self.and()?;
            let span = condition.span().to(right.span());
            condition = Condition::Logical {
                left: Box::new(condition),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }

        Ok(condition)
    }

    fn and(&mut self) -> Result<Condition, ScriptError> {
        let mut condition = self.not()?;

        while self.match_types(&[TokenType::And]) {
            let right = self.not()?;
            let span = condition.span().to(right.span());
            condition = Condition::Logical {
                left: Box::new(condition),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }

        Ok(condition)
    }

    fn not(&mut self) -> Result<Condition, ScriptError> {
        if self.match_types(&[TokenType::Not]) {
            let start = self.previous().span.clone();
            let operand = self.nested(&start, Self::not)?;
            let span = start.to(operand.span());
            return Ok(Condition::Not {
                operand: Box::new(operand),
                span,
            });
        }

        self.grouped_condition()
    }

    /// `(cond)` is a grouped condition unless the parenthesis turns out to open
    /// an arithmetic operand, as in `(a + b) < c`.
    fn grouped_condition(&mut self) -> Result<Condition, ScriptError> {
        if self.check(&TokenType::LeftParen) {
            let checkpoint = self.current;
            self.advance();

            let open = self.previous().span.clone();
            if let Ok(inner) = self.nested(&open, Self::condition) {
                if self.match_types(&[TokenType::RightParen]) && !self.continues_operand() {
                    return Ok(inner);
                }
            }

            self.current = checkpoint;
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Condition, ScriptError> {
        let left = self.expression()?;

        let Some(operator) = self.compare_operator() else {
            return Ok(Condition::Test(left));
        };
        let operator_token = self.advance().clone();

        if self.is_at_end() {
            return Err(ScriptError::syntax_error_with_help(
                operator_token.span,
                format!("Expected expression after '{}'", operator_token.lexeme),
                "Comparison operators need an expression on both sides.".to_string(),
            ));
        }
        let right = self.expression()?;

        if self.compare_operator().is_some() {
            return Err(ScriptError::syntax_error_with_help(
                self.peek().span.clone(),
                "Chained comparisons are not supported".to_string(),
                "Combine comparisons with 'and': a < b and b < c".to_string(),
            ));
        }

        let span = left.span().to(right.span());
        Ok(Condition::Compare {
            left,
            operator,
            right,
            span,
        })
    }

    fn compare_operator(&self) -> Option<CompareOp> {
        match self.peek().token_type {
            TokenType::LessEqual => Some(CompareOp::LessEqual),
            TokenType::GreaterEqual => Some(CompareOp::GreaterEqual),
            TokenType::EqualEqual => Some(CompareOp::Equal),
            TokenType::BangEqual => Some(CompareOp::NotEqual),
            TokenType::Less => Some(CompareOp::Less),
            TokenType::Greater => Some(CompareOp::Greater),
            _ => None,
        }
    }

    fn continues_operand(&self) -> bool {
        self.compare_operator().is_some()
            || matches!(
                self.peek().token_type,
                TokenType::Plus
                    | TokenType::Minus
                    | TokenType::Star
                    | TokenType::Slash
                    | TokenType::Percent
            )
    }

    pub fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.term()
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Minus => BinaryOp::Subtract,
                TokenType::Plus => BinaryOp::Add,
                _ => unreachable!(),
            };

            let right = self.operand_after(&operator_token, Self::factor)?;
            let span = expr.span().to(right.span());

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.unary()?;

        while self.match_types(&[TokenType::Slash, TokenType::Star, TokenType::Percent]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Percent => BinaryOp::Modulo,
                _ => unreachable!(),
            };

            let right = self.operand_after(&operator_token, Self::unary)?;
            let span = expr.span().to(right.span());

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Minus => UnaryOp::Negate,
                TokenType::Plus => UnaryOp::Plus,
                _ => unreachable!(),
            };

            let operand = self.nested(&operator_token.span, |parser| {
                parser.operand_after(&operator_token, Self::unary)
            })?;
            let span = operator_token.span.to(operand.span());

            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span,
            });
        }

        self.primary()
    }

    /// Parses the operand following `operator_token`, reporting a missing
    /// operand against the operator itself.
    fn operand_after(
        &mut self,
        operator_token: &Token,
        parse: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        if self.is_at_end() {
            return Err(ScriptError::syntax_error_with_help(
                operator_token.span.clone(),
                format!("Expected expression after '{}'", operator_token.lexeme),
                "Arithmetic operators need an expression on both sides.".to_string(),
            ));
        }
        parse(self)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        if self.is_at_end() {
            return Err(ScriptError::syntax_error_with_help(
                self.peek().span.clone(),
                "Unexpected end of line".to_string(),
                "Expected a number, a variable or a parenthesized expression here.".to_string(),
            ));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::True => Ok(Expr::Literal {
                value: Value::Boolean(true),
                span: token.span,
            }),
            TokenType::False => Ok(Expr::Literal {
                value: Value::Boolean(false),
                span: token.span,
            }),
            TokenType::Integer => {
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    ScriptError::invalid_literal(
                        token.span.clone(),
                        format!("Invalid integer literal '{}'", token.lexeme),
                    )
                })?;
                Ok(Expr::Literal {
                    value: Value::Integer(value),
                    span: token.span,
                })
            }
            TokenType::Identifier => Ok(Expr::Variable {
                name: token.lexeme,
                span: token.span,
            }),
            TokenType::LeftParen => {
                if self.check(&TokenType::RightParen) {
                    return Err(ScriptError::syntax_error_with_help(
                        token.span.to(&self.peek().span),
                        "Empty parentheses are not allowed".to_string(),
                        "Parentheses must contain an expression: (x + 1)".to_string(),
                    ));
                }

                let expr = self.nested(&token.span, Self::expression)?;
                let end_token = self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                        .to_string(),
                )?;
                Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    span: token.span.to(&end_token.span),
                })
            }
            TokenType::String => Err(ScriptError::invalid_literal_with_help(
                token.span,
                format!("String \"{}\" cannot be used as a number", token.lexeme),
                "Strings can only be printed directly: print(\"text\")".to_string(),
            )),
            _ => Err(self.unexpected(&token, "in expression")),
        }
    }

    /// Runs `parse` one nesting level deeper, failing once the line nests
    /// more than [`MAX_NESTING`] levels.
    fn nested<T>(
        &mut self,
        at: &Span,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::syntax_error_with_help(
                at.clone(),
                "Expression is nested too deeply".to_string(),
                format!(
                    "At most {} levels of parentheses, signs or 'not' may be nested.",
                    MAX_NESTING
                ),
            ));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Errors unless every token of the line has been consumed.
    fn expect_end(&self, context: &str) -> Result<(), ScriptError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected(self.peek(), context))
        }
    }

    fn unexpected(&self, token: &Token, context: &str) -> ScriptError {
        match token.token_type {
            TokenType::BadNumber => ScriptError::invalid_literal_with_help(
                token.span.clone(),
                format!("Invalid integer literal '{}'", token.lexeme),
                "Only whole numbers that fit in 64 bits are supported.".to_string(),
            ),
            TokenType::Unterminated => ScriptError::syntax_error_with_help(
                token.span.clone(),
                "Unterminated string".to_string(),
                "Close the string with the same quote it was opened with.".to_string(),
            ),
            TokenType::Unknown if token.lexeme == "!" => ScriptError::syntax_error_with_help(
                token.span.clone(),
                "Unexpected '!'".to_string(),
                "Use 'not' to negate a condition.".to_string(),
            ),
            TokenType::Unknown => ScriptError::syntax_error(
                token.span.clone(),
                format!("Unexpected character '{}'", token.lexeme),
            ),
            TokenType::Equal => ScriptError::syntax_error_with_help(
                token.span.clone(),
                format!("Unexpected '=' {}", context),
                "Use '==' to compare values.".to_string(),
            ),
            TokenType::Eof => {
                ScriptError::syntax_error(token.span.clone(), "Unexpected end of line".to_string())
            }
            _ => ScriptError::syntax_error(
                token.span.clone(),
                format!("Unexpected '{}' {}", token.lexeme, context),
            ),
        }
    }

    fn is_assignment_operator(&self, at: usize) -> bool {
        matches!(
            self.peek_at(at).token_type,
            TokenType::Equal
                | TokenType::PlusEqual
                | TokenType::MinusEqual
                | TokenType::StarEqual
                | TokenType::SlashEqual
                | TokenType::PercentEqual
        )
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        &self.peek_at(self.current + 1).token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        self.peek_at(self.current)
    }

    /// Token at `index`, or the trailing `Eof` when past the end.
    fn peek_at(&self, index: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, ScriptError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(ScriptError::syntax_error(
                self.error_span(),
                message.to_string(),
            ))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: String,
    ) -> Result<&Token, ScriptError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(ScriptError::syntax_error_with_help(
                self.error_span(),
                message.to_string(),
                help,
            ))
        }
    }

    fn error_span(&self) -> Span {
        if self.is_at_end() && self.current > 0 {
            // Point just past the last real token
            Span::single(self.previous().span.end)
        } else {
            self.peek().span.clone()
        }
    }
}
