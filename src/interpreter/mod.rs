// File: src/interpreter/mod.rs
//
// Tree-walking interpreter for the Toy language.
// Executes Toy programs by traversing the Abstract Syntax Tree (AST).
//
// The interpreter keeps a global frame plus a pointer to the frame currently
// in scope, evaluates expressions to produce values, and executes statements
// for their effect. It supports:
// - Variable binding, shadowing and assignment through the frame chain
// - Named functions that close over their declaring scope
// - `match` expressions selecting the first case equal to the subject
// - Short-circuiting `and` / `or`
// - Incremental execution: `interpret` can resume at a statement index so a
//   REPL can feed it an ever-growing program without replaying old input
//
// Values in Toy are numbers, strings, booleans, null and functions.

mod control_flow;
mod environment;
mod value;

pub use environment::Environment;
pub use value::{format_number, Function, OutputBuffer, Value};

use control_flow::Completion;

use crate::ast::{Expr, Literal, MatchCase, Stmt};
use crate::errors::{find_closest_match, ErrorKind, SourceLocation, ToyError, ToyResult};
use crate::lexer::{Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::io::{self, Write};
use std::rc::Rc;

/// Recursion limit used when none is configured
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Highest accepted recursion limit; larger requests are clamped to it
pub const MAX_CALL_DEPTH_LIMIT: usize = 10_000;

/// Main interpreter that executes Toy programs
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    output: Option<OutputBuffer>,
    call_stack: Vec<String>, // Track function calls for error notes
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new interpreter with an empty global frame, printing to stdout
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            output: None,
            call_stack: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.set_max_call_depth(depth);
        self
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth.min(MAX_CALL_DEPTH_LIMIT);
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Sets the output sink for print statements (used for testing)
    pub fn set_output(&mut self, output: OutputBuffer) {
        self.output = Some(output);
    }

    /// Snapshot of the global frame, sorted by name
    pub fn global_bindings(&self) -> Vec<(String, Value)> {
        self.globals.borrow().bindings()
    }

    /// Get the current call stack for error reporting
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    /// Executes `program[start_index..]` against the persistent global frame.
    ///
    /// Stops at the first runtime failure; bindings made by earlier
    /// statements stay in place.
    pub fn interpret(&mut self, program: &[Stmt], start_index: usize) -> ToyResult<()> {
        for stmt in program.iter().skip(start_index) {
            if let Completion::Return { line, .. } = self.execute(stmt)? {
                return Err(ToyError::runtime(
                    ErrorKind::InvalidReturn,
                    "Cannot return from top-level code.",
                    line,
                ));
            }
        }
        Ok(())
    }

    /// Helper to write output to either the output buffer or stdout
    fn write_output(&mut self, msg: &str) -> ToyResult<()> {
        let result = match &mut self.output {
            Some(buffer) => writeln!(buffer, "{}", msg),
            None => writeln!(io::stdout().lock(), "{}", msg),
        };
        result.map_err(|e| {
            ToyError::new(
                ErrorKind::Io,
                format!("Failed to write output: {}", e),
                SourceLocation::unknown(),
            )
        })
    }

    /// Executes a single statement
    fn execute(&mut self, stmt: &Stmt) -> ToyResult<Completion> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> ToyResult<Completion> {
        tracing::trace!(statement = stmt_name(stmt), "execute");

        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.write_output(&value.to_string())?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Null,
                };
                self.environment.borrow_mut().define(name, value)?;
            }

            Stmt::Function(declaration) => {
                // Each closure gets its own child of the declaring frame
                let closure = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(
                    &self.environment,
                ))));
                let function = Value::Function(Rc::new(Function {
                    declaration: Rc::clone(declaration),
                    closure,
                }));
                self.environment.borrow_mut().define(&declaration.name, function)?;
            }

            Stmt::Block(stmts) => {
                tracing::debug!(statements = stmts.len(), "entering block");
                let frame = Environment::new_enclosed(Rc::clone(&self.environment));
                return self.execute_block(stmts, Rc::new(RefCell::new(frame)));
            }

            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    let completion = self.execute(body)?;
                    if let Completion::Return { .. } = completion {
                        return Ok(completion);
                    }
                }
            }

            Stmt::Return { keyword, value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                return Ok(Completion::Return { value, line: keyword.line });
            }
        }

        Ok(Completion::Normal)
    }

    /// Runs `stmts` with `frame` as the current scope, restoring the previous
    /// scope afterwards whether or not execution succeeded.
    fn execute_block(
        &mut self,
        stmts: &[Stmt],
        frame: Rc<RefCell<Environment>>,
    ) -> ToyResult<Completion> {
        let previous = std::mem::replace(&mut self.environment, frame);
        let result = self.execute_all(stmts);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> ToyResult<Completion> {
        for stmt in stmts {
            let completion = self.execute(stmt)?;
            if let Completion::Return { .. } = completion {
                return Ok(completion);
            }
        }
        Ok(Completion::Normal)
    }

    /// Evaluates an expression and returns its value
    fn evaluate(&mut self, expr: &Expr) -> ToyResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> ToyResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::from(s.as_str()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            }),

            Expr::Variable { name } => {
                let result = self.environment.borrow().get(name);
                result.map_err(|err| self.suggest_name(err, name))
            }

            Expr::VariableAssignment { name, value } => {
                let value = self.evaluate(value)?;
                let result = self.environment.borrow_mut().assign(name, value);
                result.map_err(|err| self.suggest_name(err, name))
            }

            Expr::Logical { left, operator, right } => {
                let left_value = self.evaluate(left)?;

                if operator.kind == TokenKind::Or {
                    if left_value.is_truthy() {
                        return Ok(left_value);
                    }
                } else if !left_value.is_truthy() {
                    return Ok(left_value);
                }

                self.evaluate(right)
            }

            Expr::Binary { left, operator, right } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                binary_op(operator, left_value, right_value)
            }

            Expr::Unary { operator, right } => {
                let value = self.evaluate(right)?;
                match operator.kind {
                    TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
                    TokenKind::Minus => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(ToyError::runtime(
                            ErrorKind::TypeError,
                            format!("Operand of '-' must be a number, got {}.", other.type_name()),
                            operator.line,
                        )),
                    },
                    _ => Err(unknown_operator(operator)),
                }
            }

            Expr::FunctionCall { callee, paren, arguments } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_function(callee, args, paren)
            }

            Expr::Match { keyword, subject, cases } => {
                let subject_value = self.evaluate(subject)?;

                for MatchCase { pattern, body } in cases {
                    if self.evaluate(pattern)? == subject_value {
                        return self.evaluate(body);
                    }
                }

                Err(ToyError::runtime(
                    ErrorKind::NoMatch,
                    format!("No match for value: {}.", subject_value),
                    keyword.line,
                ))
            }
        }
    }

    /// Invokes a closure: checks arity and depth, binds parameters in a
    /// fresh child of the captured frame, then runs the body there.
    fn call_function(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> ToyResult<Value> {
        let function = match callee {
            Value::Function(function) => function,
            other => {
                return Err(ToyError::runtime(
                    ErrorKind::NotCallable,
                    format!("Can only call functions, got {}.", other.type_name()),
                    paren.line,
                ));
            }
        };

        if args.len() != function.arity() {
            return Err(ToyError::runtime(
                ErrorKind::ArityMismatch,
                format!("Expected {} arguments but got {}.", function.arity(), args.len()),
                paren.line,
            ));
        }

        if self.call_stack.len() >= self.max_call_depth {
            let err = ToyError::runtime(
                ErrorKind::StackOverflow,
                format!("Maximum call depth of {} exceeded.", self.max_call_depth),
                paren.line,
            );
            return Err(self.annotate_call_stack(err));
        }

        let mut frame = Environment::new_enclosed(Rc::clone(&function.closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            frame.define(param, arg)?;
        }

        self.call_stack.push(function.name().to_string());
        tracing::debug!(function = function.name(), depth = self.call_stack.len(), "call");

        let result = self
            .execute_block(&function.declaration.body, Rc::new(RefCell::new(frame)))
            .map_err(|err| self.annotate_call_stack(err));

        self.call_stack.pop();

        match result? {
            Completion::Normal => Ok(Value::Null),
            Completion::Return { value, .. } => Ok(value),
        }
    }

    /// Attaches the active call stack (innermost first) unless a deeper
    /// frame already did
    fn annotate_call_stack(&self, err: ToyError) -> ToyError {
        if err.note.is_some() || self.call_stack.is_empty() {
            return err;
        }
        let frames: Vec<&str> = self.call_stack.iter().rev().map(String::as_str).collect();
        err.with_note(format!("call stack: {}", frames.join(" <- ")))
    }

    fn suggest_name(&self, err: ToyError, name: &Token) -> ToyError {
        if err.kind != ErrorKind::UndefinedVariable {
            return err;
        }
        let names = self.environment.borrow().visible_names();
        match find_closest_match(&name.lexeme, &names) {
            Some(candidate) => err.with_suggestion(candidate),
            None => err,
        }
    }
}

fn binary_op(operator: &Token, left: Value, right: Value) -> ToyResult<Value> {
    match operator.kind {
        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),

        TokenKind::Plus => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{}{}", a, b))),
            _ => Err(operand_error(operator, "two numbers or two strings", &left, &right)),
        },

        TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
            let (a, b) = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => (*a, *b),
                _ => return Err(operand_error(operator, "numbers", &left, &right)),
            };
            match operator.kind {
                TokenKind::Minus => Ok(Value::Number(a - b)),
                TokenKind::Star => Ok(Value::Number(a * b)),
                _ if b == 0.0 => Err(ToyError::runtime(
                    ErrorKind::DivisionByZero,
                    "Division by zero.",
                    operator.line,
                )),
                _ => Ok(Value::Number(a / b)),
            }
        }

        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(operand_error(operator, "two numbers or two strings", &left, &right))
                }
            };
            // NaN compares false against everything
            let result = match ordering {
                None => false,
                Some(ordering) => match operator.kind {
                    TokenKind::Greater => ordering == Ordering::Greater,
                    TokenKind::GreaterEqual => ordering != Ordering::Less,
                    TokenKind::Less => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                },
            };
            Ok(Value::Bool(result))
        }

        _ => Err(unknown_operator(operator)),
    }
}

fn operand_error(operator: &Token, expected: &str, left: &Value, right: &Value) -> ToyError {
    ToyError::runtime(
        ErrorKind::TypeError,
        format!(
            "Operands of '{}' must be {}, got {} and {}.",
            operator.lexeme,
            expected,
            left.type_name(),
            right.type_name()
        ),
        operator.line,
    )
}

fn unknown_operator(operator: &Token) -> ToyError {
    ToyError::runtime(
        ErrorKind::TypeError,
        format!("Unknown operator '{}'.", operator.lexeme),
        operator.line,
    )
}

fn stmt_name(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Expression(_) => "expression",
        Stmt::Print(_) => "print",
        Stmt::Var { .. } => "var",
        Stmt::Function(_) => "fn",
        Stmt::Block(_) => "block",
        Stmt::If { .. } => "if",
        Stmt::While { .. } => "while",
        Stmt::Return { .. } => "return",
    }
}
