// File: src/session.rs
//
// Persistent interactive session.
//
// A session keeps the source text accepted so far and how many of its
// top-level statements have already run. Each submission is appended to
// that source, the whole text is re-tokenized and re-parsed, and only the
// statements past the executed count are handed to the interpreter, whose
// global frame carries over from one submission to the next.

use crate::ast::Stmt;
use crate::errors::{ToyError, ToyResult};
use crate::interpreter::{Interpreter, OutputBuffer, Value, DEFAULT_MAX_CALL_DEPTH};
use crate::lexer::{tokenize, Token};
use crate::parser::parse;

pub struct Session {
    interpreter: Interpreter,
    source: String,
    executed: usize,
    program: Vec<Stmt>,
    last_tokens: Vec<Token>,
    last_start: usize,
    max_call_depth: usize,
    output: Option<OutputBuffer>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_max_call_depth(DEFAULT_MAX_CALL_DEPTH)
    }

    pub fn with_max_call_depth(max_call_depth: usize) -> Self {
        Session {
            interpreter: Interpreter::new().with_max_call_depth(max_call_depth),
            source: String::new(),
            executed: 0,
            program: Vec::new(),
            last_tokens: Vec::new(),
            last_start: 0,
            max_call_depth,
            output: None,
        }
    }

    /// Capture `print` output instead of writing to stdout; survives `reset`
    pub fn set_output(&mut self, output: OutputBuffer) {
        self.interpreter.set_output(output.clone());
        self.output = Some(output);
    }

    /// Runs one chunk of input against the accumulated state.
    ///
    /// A lex or parse failure leaves the session untouched. Once the
    /// combined source parses, it is committed even if execution fails,
    /// so the failing chunk is never replayed; bindings made before the
    /// failure remain visible.
    ///
    /// Input that would merge into a statement which already ran, such as an
    /// `else` arriving after its `if`, is rejected as a parse error.
    pub fn submit(&mut self, input: &str) -> ToyResult<()> {
        let candidate = if self.source.is_empty() {
            input.to_string()
        } else {
            format!("{}\n{}", self.source, input)
        };
        let first_line = self.source.lines().count() + 1;

        let tokens = tokenize(&candidate).map_err(|e| e.with_source(&candidate))?;
        let program = parse(&tokens).map_err(|e| e.with_source(&candidate))?;

        if program.get(..self.executed) != Some(&self.program[..]) {
            return Err(ToyError::parse_error(
                "Input continues a statement that has already run.",
                first_line,
            )
            .with_source(&candidate));
        }

        let result = self
            .interpreter
            .interpret(&program, self.executed)
            .map_err(|e| e.with_source(&candidate));

        self.last_start = self.executed;
        self.executed = program.len();
        self.last_tokens = tokens.into_iter().filter(|t| t.line >= first_line).collect();
        self.program = program;
        self.source = candidate;
        tracing::debug!(executed = self.executed, ok = result.is_ok(), "session committed input");

        result
    }

    /// Discards all source, statements and bindings
    pub fn reset(&mut self) {
        let mut interpreter = Interpreter::new().with_max_call_depth(self.max_call_depth);
        if let Some(output) = &self.output {
            interpreter.set_output(output.clone());
        }
        self.interpreter = interpreter;
        self.source.clear();
        self.executed = 0;
        self.program.clear();
        self.last_tokens.clear();
        self.last_start = 0;
        tracing::debug!("session reset");
    }

    /// Committed source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of top-level statements already executed
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Every committed top-level statement
    pub fn program(&self) -> &[Stmt] {
        &self.program
    }

    /// Statements contributed by the most recent committed submission
    pub fn last_statements(&self) -> &[Stmt] {
        &self.program[self.last_start.min(self.program.len())..]
    }

    /// Tokens of the most recent committed submission, ending with `Eof`
    pub fn last_tokens(&self) -> &[Token] {
        &self.last_tokens
    }

    pub fn global_bindings(&self) -> Vec<(String, Value)> {
        self.interpreter.global_bindings()
    }
}
