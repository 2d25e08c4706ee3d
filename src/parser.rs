// File: src/parser.rs
//
// Recursive descent parser for the Toy language.
// Transforms a sequence of tokens into an Abstract Syntax Tree (AST).
//
// Grammar levels, loosest to tightest:
//   declaration -> var | fn | statement
//   statement   -> print | if | while | for | block | return | expression ";"
//   expression  -> assignment -> or -> and -> equality -> comparison
//                  -> term -> factor -> unary -> call -> primary
//
// Binary levels share one left-associative loop (`binary_left`). `for` is
// desugared into a block holding the initializer and a `while` loop, so no
// for-node survives parsing. The first error aborts the parse; there is no
// resynchronization and no partial AST. Nesting deeper than
// MAX_NESTING_DEPTH is reported as a parse error.

use crate::ast::{Expr, FunctionDecl, Literal, MatchCase, Stmt};
use crate::errors::{ToyError, ToyResult};
use crate::lexer::{Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

/// Deepest allowed nesting of statements and expressions combined
pub const MAX_NESTING_DEPTH: usize = 200;

static EOF_TOKEN: Token = Token { kind: TokenKind::Eof, lexeme: String::new(), line: 0 };

type Operand<'a> = fn(&mut Parser<'a>) -> ToyResult<Expr>;
type Combine = fn(Box<Expr>, Token, Box<Expr>) -> Expr;

/// Parses a full token sequence into top-level statements
pub fn parse(tokens: &[Token]) -> ToyResult<Vec<Stmt>> {
    Parser::new(tokens).parse()
}

/// Parser maintains position in token stream and provides methods to parse statements and expressions
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser over a token slice (normally ending in `Eof`)
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0, depth: 0 }
    }

    /// Parse the entire token stream into a vector of statements
    pub fn parse(&mut self) -> ToyResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            stmts.push(self.declaration()?);
        }
        tracing::debug!(statements = stmts.len(), "parsed program");
        Ok(stmts)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn declaration(&mut self) -> ToyResult<Stmt> {
        if self.match_any(&[TokenKind::Var]).is_some() {
            return self.var_declaration();
        }
        if self.match_any(&[TokenKind::Fn]).is_some() {
            return self.function_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> ToyResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?.clone();

        let initializer = if self.match_any(&[TokenKind::Equal]).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn function_declaration(&mut self) -> ToyResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?.clone();
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?.clone());
                if self.match_any(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;

        // The body stays a bare statement list; the call frame acts as its scope
        let body = self.block_statements()?;
        Ok(Stmt::Function(Rc::new(FunctionDecl { name, params, body })))
    }

    fn statement(&mut self) -> ToyResult<Stmt> {
        self.nested("Statement", Self::statement_kind)
    }

    fn statement_kind(&mut self) -> ToyResult<Stmt> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                let value = self.expression()?;
                self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(value))
            }
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::While => {
                self.advance();
                self.while_statement()
            }
            TokenKind::For => {
                self.advance();
                self.for_statement()
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block_statements()?))
            }
            TokenKind::Return => {
                let keyword = self.advance().clone();
                let value = if !self.check(TokenKind::Semicolon) {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
                Ok(Stmt::Return { keyword, value })
            }
            _ => self.expression_statement(),
        }
    }

    fn if_statement(&mut self) -> ToyResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_any(&[TokenKind::Else]).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn while_statement(&mut self) -> ToyResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after while condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> ToyResult<Stmt> {
        let for_line = self.previous_line();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_any(&[TokenKind::Semicolon]).is_some() {
            None
        } else if self.match_any(&[TokenKind::Var]).is_some() {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(Literal::Bool(true)));
        let mut desugared = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }

        tracing::trace!(line = for_line, "desugared for loop");
        Ok(desugared)
    }

    fn block_statements(&mut self) -> ToyResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn expression_statement(&mut self) -> ToyResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> ToyResult<Expr> {
        self.nested("Expression", Self::assignment)
    }

    fn assignment(&mut self) -> ToyResult<Expr> {
        let expr = self.logic_or()?;

        if let Some(equals) = self.match_any(&[TokenKind::Equal]) {
            // Right-associative: a = b = c
            let value = self.expression()?;

            return match expr {
                Expr::Variable { name } => {
                    Ok(Expr::VariableAssignment { name, value: Box::new(value) })
                }
                _ => Err(ToyError::parse_error("Invalid assignment target.", equals.line)),
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> ToyResult<Expr> {
        self.binary_left(&[TokenKind::Or], Self::logic_and, make_logical)
    }

    fn logic_and(&mut self) -> ToyResult<Expr> {
        self.binary_left(&[TokenKind::And], Self::equality, make_logical)
    }

    fn equality(&mut self) -> ToyResult<Expr> {
        self.binary_left(
            &[TokenKind::EqualEqual, TokenKind::BangEqual],
            Self::comparison,
            make_binary,
        )
    }

    fn comparison(&mut self) -> ToyResult<Expr> {
        self.binary_left(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
            make_binary,
        )
    }

    fn term(&mut self) -> ToyResult<Expr> {
        self.binary_left(&[TokenKind::Plus, TokenKind::Minus], Self::factor, make_binary)
    }

    fn factor(&mut self) -> ToyResult<Expr> {
        self.binary_left(&[TokenKind::Star, TokenKind::Slash], Self::unary, make_binary)
    }

    fn unary(&mut self) -> ToyResult<Expr> {
        if let Some(operator) = self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = operator.clone();
            let right = self.nested("Expression", Self::unary)?;
            return Ok(Expr::Unary { operator, right: Box::new(right) });
        }
        self.call()
    }

    fn call(&mut self) -> ToyResult<Expr> {
        let mut expr = self.primary()?;

        while self.match_any(&[TokenKind::LeftParen]).is_some() {
            let mut arguments = Vec::new();
            if !self.check(TokenKind::RightParen) {
                loop {
                    arguments.push(self.expression()?);
                    if self.match_any(&[TokenKind::Comma]).is_none() {
                        break;
                    }
                }
            }
            let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?.clone();
            expr = Expr::FunctionCall { callee: Box::new(expr), paren, arguments };
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ToyResult<Expr> {
        let token = self.peek();
        let expr = match token.kind {
            TokenKind::Number => {
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    ToyError::parse_error(
                        format!("Invalid number literal '{}'.", token.lexeme),
                        token.line,
                    )
                })?;
                Expr::Literal(Literal::Number(value))
            }
            TokenKind::String => Expr::Literal(Literal::Str(token.lexeme.clone())),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Null => Expr::Literal(Literal::Null),
            TokenKind::Identifier => Expr::Variable { name: token.clone() },
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(expr);
            }
            TokenKind::Match => {
                self.advance();
                return self.match_expression(token.clone());
            }
            _ => {
                return Err(ToyError::parse_error(
                    format!("Expect expression. Found {}.", describe(token)),
                    token.line,
                ));
            }
        };

        self.advance();
        Ok(expr)
    }

    fn match_expression(&mut self, keyword: Token) -> ToyResult<Expr> {
        let subject = self.expression()?;
        self.consume(TokenKind::LeftBrace, "Expect '{' after match subject.")?;

        let mut cases = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            self.consume(TokenKind::Case, "Expect 'case' in match arm.")?;
            let pattern = self.expression()?;
            self.consume(TokenKind::Arrow, "Expect '=>' after case pattern.")?;
            let body = self.expression()?;
            cases.push(MatchCase { pattern, body });

            if self.match_any(&[TokenKind::Comma]).is_none() {
                break;
            }
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after match cases.")?;
        Ok(Expr::Match { keyword, subject: Box::new(subject), cases })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Runs one recursive grammar rule, failing once nesting gets too deep
    fn nested<T>(&mut self, what: &str, rule: fn(&mut Parser<'a>) -> ToyResult<T>) -> ToyResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ToyError::parse_error(
                format!("{} nested too deeply.", what),
                self.peek().line,
            ));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| rule(self));
        self.depth -= 1;
        result
    }

    /// Parses `operand (op operand)*` and folds it to the left
    fn binary_left(
        &mut self,
        operators: &[TokenKind],
        operand: Operand<'a>,
        combine: Combine,
    ) -> ToyResult<Expr> {
        let mut left = operand(self)?;

        while let Some(operator) = self.match_any(operators) {
            let operator = operator.clone();
            let right = operand(self)?;
            left = combine(Box::new(left), operator, Box::new(right));
        }

        Ok(left)
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> &'a Token {
        self.tokens.get(self.pos).unwrap_or(&EOF_TOKEN)
    }

    fn previous_line(&self) -> usize {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map_or(0, |t| t.line)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Consume and return the current token, then advance to the next
    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> Option<&'a Token> {
        if kinds.iter().any(|kind| self.check(*kind)) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ToyResult<&'a Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let found = self.peek();
        Err(ToyError::parse_error(format!("{} Found {}.", message, describe(found)), found.line))
    }
}

fn make_binary(left: Box<Expr>, operator: Token, right: Box<Expr>) -> Expr {
    Expr::Binary { left, operator, right }
}

fn make_logical(left: Box<Expr>, operator: Token, right: Box<Expr>) -> Expr {
    Expr::Logical { left, operator, right }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::String => format!("string {:?}", token.lexeme),
        _ => format!("'{}'", token.lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> Vec<Stmt> {
        parse(&tokenize(source).unwrap()).unwrap()
    }

    fn parse_error(source: &str) -> ToyError {
        parse(&tokenize(source).unwrap()).unwrap_err()
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    fn op(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, 1)
    }

    fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
        Expr::Binary { left: Box::new(left), operator, right: Box::new(right) }
    }

    fn expression_of(stmt: &Stmt) -> &Expr {
        match stmt {
            Stmt::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_factor_binds_tighter_than_term() {
        let program = parse_source("3 + 2 * 4;");
        assert_eq!(
            program,
            vec![Stmt::Expression(binary(
                num(3.0),
                op(TokenKind::Plus, "+"),
                binary(num(2.0), op(TokenKind::Star, "*"), num(4.0)),
            ))]
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let program = parse_source("3 - 2 - 1;");
        assert_eq!(
            expression_of(&program[0]),
            &binary(
                binary(num(3.0), op(TokenKind::Minus, "-"), num(2.0)),
                op(TokenKind::Minus, "-"),
                num(1.0),
            )
        );
    }

    #[test]
    fn test_comparison_then_equality() {
        let program = parse_source("3 > 2 == 4;");
        assert_eq!(
            expression_of(&program[0]),
            &binary(
                binary(num(3.0), op(TokenKind::Greater, ">"), num(2.0)),
                op(TokenKind::EqualEqual, "=="),
                num(4.0),
            )
        );
    }

    #[test]
    fn test_unary_is_right_recursive() {
        let program = parse_source("!!true;");
        match expression_of(&program[0]) {
            Expr::Unary { operator, right } => {
                assert_eq!(operator.kind, TokenKind::Bang);
                assert!(matches!(**right, Expr::Unary { .. }));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_precedence() {
        // and binds tighter than or
        let program = parse_source("a or b and c;");
        match expression_of(&program[0]) {
            Expr::Logical { operator, right, .. } => {
                assert_eq!(operator.kind, TokenKind::Or);
                assert!(matches!(**right, Expr::Logical { .. }));
            }
            other => panic!("expected logical, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse_source("a = b = 3;");
        match expression_of(&program[0]) {
            Expr::VariableAssignment { name, value } => {
                assert_eq!(name.lexeme, "a");
                assert!(matches!(**value, Expr::VariableAssignment { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_error("var a = 1;\n(a) + 1 = 2;");
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert_eq!(err.message, "Invalid assignment target.");
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_var_without_initializer() {
        let program = parse_source("var a;");
        assert_eq!(
            program,
            vec![Stmt::Var { name: Token::new(TokenKind::Identifier, "a", 1), initializer: None }]
        );
    }

    #[test]
    fn test_function_declaration_body_is_bare_list() {
        let program = parse_source("fn add(a, b) { return a + b; }");
        match &program[0] {
            Stmt::Function(decl) => {
                assert_eq!(decl.name.lexeme, "add");
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
                assert_eq!(params, vec!["a", "b"]);
                assert_eq!(decl.body.len(), 1);
                assert!(matches!(decl.body[0], Stmt::Return { .. }));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_for_desugars_to_block_and_while() {
        let program = parse_source("for (var i = 0; i < 5; i = i + 1) print i;");
        assert_eq!(program.len(), 1);
        let Stmt::Block(outer) = &program[0] else {
            panic!("expected block, got {:?}", program[0]);
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected block body, got {:?}", body);
        };
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::VariableAssignment { .. })));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let program = parse_source("for (;;) print 1;");
        assert_eq!(
            program,
            vec![Stmt::While {
                condition: Expr::Literal(Literal::Bool(true)),
                body: Box::new(Stmt::Print(num(1.0))),
            }]
        );
    }

    #[test]
    fn test_match_parsing() {
        let program = parse_source("match 1 { case 1 => 2, case 3 => 4 };");
        match expression_of(&program[0]) {
            Expr::Match { subject, cases, .. } => {
                assert_eq!(**subject, num(1.0));
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0], MatchCase { pattern: num(1.0), body: num(2.0) });
                assert_eq!(cases[1], MatchCase { pattern: num(3.0), body: num(4.0) });
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_calls() {
        let program = parse_source("f(1)(2, 3);");
        match expression_of(&program[0]) {
            Expr::FunctionCall { callee, arguments, .. } => {
                assert_eq!(arguments.len(), 2);
                assert!(matches!(**callee, Expr::FunctionCall { .. }));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon_reports_line() {
        let err = parse_error("print 1;\nprint 2\n");
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.message.starts_with("Expect ';' after value."));
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_error("var a = ;");
        assert_eq!(err.message, "Expect expression. Found ';'.");
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_error("{ var a = 1;");
        assert!(err.message.starts_with("Expect '}' after block."));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let tokens = tokenize("var a = 1; fn f(x) { return match x { case 1 => a }; } print f(1);")
            .unwrap();
        assert_eq!(parse(&tokens).unwrap(), parse(&tokens).unwrap());
    }

    fn parenthesized(depth: usize) -> String {
        format!("print {}1{};", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let program = parse_source(&parenthesized(150));
        assert!(matches!(program[0], Stmt::Print(Expr::Literal(Literal::Number(_)))));
    }

    #[test]
    fn test_deep_parentheses_are_a_parse_error() {
        let err = parse_error(&parenthesized(300));
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert_eq!(err.message, "Expression nested too deeply.");

        let err = parse_error(&parenthesized(100_000));
        assert_eq!(err.message, "Expression nested too deeply.");
    }

    #[test]
    fn test_deep_unary_chain_is_a_parse_error() {
        let err = parse_error(&format!("print {}1;", "-".repeat(50_000)));
        assert_eq!(err.message, "Expression nested too deeply.");
    }

    #[test]
    fn test_deep_blocks_are_a_parse_error() {
        let source = format!("{}{}", "{".repeat(1_000), "}".repeat(1_000));
        let err = parse_error(&source);
        assert_eq!(err.message, "Statement nested too deeply.");
    }

    #[test]
    fn test_depth_is_released_between_statements() {
        let source = parenthesized(150).repeat(10);
        assert_eq!(parse_source(&source).len(), 10);
    }

    #[test]
    fn test_empty_token_slice_is_empty_program() {
        assert_eq!(parse(&[]).unwrap(), Vec::<Stmt>::new());
    }
}
