use crate::error::Span;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    Comma,
    Colon,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,

    // One or two character tokens
    Equal,
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,

    // Literals
    Identifier,
    String,
    Integer,

    // Keywords
    And,
    Elif,
    Else,
    False,
    For,
    If,
    In,
    Not,
    Or,
    Pass,
    True,
    While,

    // Malformed input, turned into errors only when a statement uses them
    BadNumber,
    Unterminated,
    Unknown,

    // Special
    Eof,
}

/// A token. `lexeme` holds the source text, except for strings where it is the
/// unquoted contents.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }
}

/// Scans one logical line. Spans are absolute: `offset` is where the line's
/// text starts in the program source.
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    keywords: HashMap<&'static str, TokenType>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, offset: usize) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("and", TokenType::And);
        keywords.insert("elif", TokenType::Elif);
        keywords.insert("else", TokenType::Else);
        keywords.insert("for", TokenType::For);
        keywords.insert("if", TokenType::If);
        keywords.insert("in", TokenType::In);
        keywords.insert("not", TokenType::Not);
        keywords.insert("or", TokenType::Or);
        keywords.insert("pass", TokenType::Pass);
        keywords.insert("while", TokenType::While);

        Self {
            source,
            offset,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            keywords,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        let end = self.offset + self.current;
        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            Span::new(end, end),
        ));

        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            ',' => self.add_token(TokenType::Comma),
            ':' => self.add_token(TokenType::Colon),
            '+' => self.add_compound(TokenType::PlusEqual, TokenType::Plus),
            '-' => self.add_compound(TokenType::MinusEqual, TokenType::Minus),
            '*' => self.add_compound(TokenType::StarEqual, TokenType::Star),
            '/' => self.add_compound(TokenType::SlashEqual, TokenType::Slash),
            '%' => self.add_compound(TokenType::PercentEqual, TokenType::Percent),
            '=' => self.add_compound(TokenType::EqualEqual, TokenType::Equal),
            '<' => self.add_compound(TokenType::LessEqual, TokenType::Less),
            '>' => self.add_compound(TokenType::GreaterEqual, TokenType::Greater),
            '!' => self.add_compound(TokenType::BangEqual, TokenType::Unknown),
            ' ' | '\t' | '\r' => {}
            '"' | '\'' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => self.add_token(TokenType::Unknown),
        }
    }

    fn advance(&mut self) -> char {
        match self.source[self.current..].chars().next() {
            Some(c) => {
                self.current += c.len_utf8();
                c
            }
            None => '\0',
        }
    }

    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Adds `with_equal` when the next character is `=`, otherwise `single`.
    fn add_compound(&mut self, with_equal: TokenType, single: TokenType) {
        let token_type = if self.match_char('=') {
            with_equal
        } else {
            single
        };
        self.add_token(token_type);
    }

    fn string(&mut self, quote: char) {
        while self.peek() != quote && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            self.add_token(TokenType::Unterminated);
            return;
        }

        // Closing quote
        self.advance();

        let contents = &self.source[self.start + 1..self.current - 1];
        self.add_token_with_content(TokenType::String, contents.to_string());
    }

    /// Numbers run until the next non-word character so that `12abc` or `3.5`
    /// come out as one bad literal rather than several valid tokens.
    fn number(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' || self.peek() == '.' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        if text.parse::<i64>().is_ok() {
            self.add_token(TokenType::Integer);
        } else {
            self.add_token(TokenType::BadNumber);
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let token_type = if text.eq_ignore_ascii_case("true") {
            TokenType::True
        } else if text.eq_ignore_ascii_case("false") {
            TokenType::False
        } else {
            self.keywords
                .get(text)
                .cloned()
                .unwrap_or(TokenType::Identifier)
        };

        self.add_token(token_type);
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = &self.source[self.start..self.current];
        self.add_token_with_content(token_type, text.to_string());
    }

    fn add_token_with_content(&mut self, token_type: TokenType, lexeme: String) {
        self.tokens.push(Token::new(
            token_type,
            lexeme,
            Span::new(self.offset + self.start, self.offset + self.current),
        ));
    }
}
