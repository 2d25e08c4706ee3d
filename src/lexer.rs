// File: src/lexer.rs
//
// Lexical analyzer (tokenizer) for the Toy language.
// Converts source code text into a stream of tokens for parsing.
//
// Supports:
// - Keywords: and, else, false, fn, for, if, null, or, print, return, true, var, while, match, case
// - Identifiers, numbers (decimal, no exponent) and double-quoted strings
// - Operators: + - * / = == ! != < <= > >= =>
// - Punctuation: ( ) { } ; ,
// - Line comments starting with //
//
// The scan is fail-fast: the first unrecognized character aborts tokenization.

use crate::errors::{ToyError, ToyResult};
use colored::Colorize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character punctuation and operators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Semicolon,
    Comma,
    Minus,
    Plus,
    Slash,
    Star,

    // One or two character operators
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Arrow,

    // Literals
    Identifier,
    Number,
    String,

    // Keywords
    And,
    Else,
    False,
    Fn,
    For,
    If,
    Null,
    Or,
    Print,
    Return,
    True,
    Var,
    While,
    Match,
    Case,

    Eof,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::LeftParen => "LPAREN",
            TokenKind::RightParen => "RPAREN",
            TokenKind::LeftBrace => "LBRACE",
            TokenKind::RightBrace => "RBRACE",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Minus => "MINUS",
            TokenKind::Plus => "PLUS",
            TokenKind::Slash => "SLASH",
            TokenKind::Star => "STAR",
            TokenKind::Bang => "BANG",
            TokenKind::BangEqual => "BANG_EQUAL",
            TokenKind::Equal => "EQUAL",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Arrow => "ARROW",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::And => "AND",
            TokenKind::Else => "ELSE",
            TokenKind::False => "FALSE",
            TokenKind::Fn => "FN",
            TokenKind::For => "FOR",
            TokenKind::If => "IF",
            TokenKind::Null => "NULL",
            TokenKind::Or => "OR",
            TokenKind::Print => "PRINT",
            TokenKind::Return => "RETURN",
            TokenKind::True => "TRUE",
            TokenKind::Var => "VAR",
            TokenKind::While => "WHILE",
            TokenKind::Match => "MATCH",
            TokenKind::Case => "CASE",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::Else
                | TokenKind::False
                | TokenKind::Fn
                | TokenKind::For
                | TokenKind::If
                | TokenKind::Null
                | TokenKind::Or
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::True
                | TokenKind::Var
                | TokenKind::While
                | TokenKind::Match
                | TokenKind::Case
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reserved words, looked up after an identifier has been scanned
pub fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "and" => TokenKind::And,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "fn" => TokenKind::Fn,
        "for" => TokenKind::For,
        "if" => TokenKind::If,
        "null" => TokenKind::Null,
        "or" => TokenKind::Or,
        "print" => TokenKind::Print,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "var" => TokenKind::Var,
        "while" => TokenKind::While,
        "match" => TokenKind::Match,
        "case" => TokenKind::Case,
        _ => return None,
    };
    Some(kind)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Token { kind, lexeme: lexeme.into(), line }
    }
}

/// Tokenizes Toy source code into a vector of tokens.
///
/// The returned vector always ends with a single `Eof` token carrying the
/// final line number. Number lexemes keep their raw digit text; string
/// lexemes hold the decoded contents without quotes.
pub fn tokenize(source: &str) -> ToyResult<Vec<Token>> {
    let tokens = Lexer::new(source).scan_tokens()?;
    tracing::trace!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}

struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer { source: source.chars().collect(), tokens: Vec::new(), start: 0, current: 0, line: 1 }
    }

    fn scan_tokens(mut self) -> ToyResult<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> ToyResult<()> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ';' => self.add_token(TokenKind::Semicolon),
            ',' => self.add_token(TokenKind::Comma),
            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '*' => self.add_token(TokenKind::Star),
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '!' => {
                let kind = if self.match_char('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            }
            '>' => {
                let kind =
                    if self.match_char('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string()?,
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.identifier(),
            _ => {
                return Err(ToyError::lex_error(
                    format!("Unexpected character '{}'.", c),
                    self.line,
                ));
            }
        }

        Ok(())
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Fractional part only when a digit follows the dot
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.add_token(TokenKind::Number);
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
        self.tokens.push(Token::new(kind, text, self.line));
    }

    fn string(&mut self) -> ToyResult<()> {
        let start_line = self.line;
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return Err(ToyError::lex_error("Unterminated string.", start_line));
            }
            match self.advance() {
                '"' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(ToyError::lex_error("Unterminated string.", start_line));
                    }
                    match self.advance() {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '\n' => {
                            self.line += 1;
                            value.push('\n');
                        }
                        other => value.push(other),
                    }
                }
                '\n' => {
                    self.line += 1;
                    value.push('\n');
                }
                ch => value.push(ch),
            }
        }

        // Strings report the line they started on
        self.tokens.push(Token::new(TokenKind::String, value, start_line));
        Ok(())
    }

    fn add_token(&mut self, kind: TokenKind) {
        let text: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(kind, text, self.line));
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }
}

/// Renders tokens grouped by source line, e.g. `01 | [VAR var] [IDENTIFIER a]`.
///
/// Chips are colored by category. The end-of-input token is omitted.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut line = 0;

    for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
        if token.line != line {
            if line != 0 {
                out.push('\n');
            }
            line = token.line;
            out.push_str(&format!("{:02} | ", line));
        } else {
            out.push(' ');
        }

        let title = format!("{} {}", token.kind.name(), token.lexeme.escape_debug());
        out.push_str(&format!("{}", colorize(token.kind, &format!("[{}]", title))));
    }

    out
}

fn colorize(kind: TokenKind, text: &str) -> colored::ColoredString {
    match kind {
        k if k.is_keyword() => text.cyan(),
        TokenKind::Number | TokenKind::String => text.yellow(),
        TokenKind::Identifier => text.green(),
        TokenKind::LeftParen
        | TokenKind::RightParen
        | TokenKind::LeftBrace
        | TokenKind::RightBrace
        | TokenKind::Semicolon
        | TokenKind::Comma => text.blue(),
        TokenKind::Eof => text.normal(),
        _ => text.magenta(),
    }
}
