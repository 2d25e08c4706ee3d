// File: src/errors.rs
//
// Error handling and reporting for the Toy language.
// Every stage (lexer, parser, interpreter) reports failures through the
// single ToyError type, tagged with an ErrorKind and the source line.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Source location information for tracking where code appears in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
}

impl SourceLocation {
    pub fn new(line: usize) -> Self {
        Self { line }
    }

    pub fn unknown() -> Self {
        Self { line: 0 }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_known() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "line ?")
        }
    }
}

/// The three failure families a driver has to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LexFailure,
    ParseFailure,
    RuntimeFailure,
}

/// Types of errors that can occur in Toy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    UndefinedVariable,
    Redefinition,
    TypeError,
    DivisionByZero,
    NotCallable,
    ArityMismatch,
    NoMatch,
    InvalidReturn,
    StackOverflow,
    Io,
}

impl ErrorKind {
    pub fn phase(&self) -> Phase {
        match self {
            ErrorKind::LexError => Phase::LexFailure,
            ErrorKind::ParseError => Phase::ParseFailure,
            _ => Phase::RuntimeFailure,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::LexError => write!(f, "Lex Error"),
            ErrorKind::ParseError => write!(f, "Parse Error"),
            ErrorKind::UndefinedVariable => write!(f, "Undefined Variable"),
            ErrorKind::Redefinition => write!(f, "Redefinition"),
            ErrorKind::TypeError => write!(f, "Type Error"),
            ErrorKind::DivisionByZero => write!(f, "Division By Zero"),
            ErrorKind::NotCallable => write!(f, "Not Callable"),
            ErrorKind::ArityMismatch => write!(f, "Arity Mismatch"),
            ErrorKind::NoMatch => write!(f, "No Match"),
            ErrorKind::InvalidReturn => write!(f, "Invalid Return"),
            ErrorKind::StackOverflow => write!(f, "Stack Overflow"),
            ErrorKind::Io => write!(f, "I/O Error"),
        }
    }
}

/// A structured error with location information
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message} [{location}]")]
pub struct ToyError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: SourceLocation,
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub note: Option<String>,
}

pub type ToyResult<T> = Result<T, ToyError>;

impl ToyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
            source_line: None,
            suggestion: None,
            note: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attaches the offending line of `source`, if the location is known
    pub fn with_source(mut self, source: &str) -> Self {
        if self.location.is_known() {
            self.source_line = source
                .lines()
                .nth(self.location.line - 1)
                .map(|line| line.to_string());
        }
        self
    }

    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    /// Create a lex error
    pub fn lex_error(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::LexError, message, SourceLocation::new(line))
    }

    /// Create a parse error
    pub fn parse_error(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::ParseError, message, SourceLocation::new(line))
    }

    /// Create a runtime error of the given kind
    pub fn runtime(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self::new(kind, message, SourceLocation::new(line))
    }

    /// Create an undefined variable error
    pub fn undefined_variable(name: &str, line: usize) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("Variable '{}' is not defined.", name),
            SourceLocation::new(line),
        )
    }

    /// Multi-line colored report for terminals
    pub fn render(&self) -> String {
        let mut out = String::new();
        let kind_str = format!("{}", self.kind);
        out.push_str(&format!("{}: {}\n", kind_str.red().bold(), self.message.bold()));
        out.push_str(&format!("{}\n", format!("  --> {}", self.location).bright_blue()));

        if let Some(ref source) = self.source_line {
            out.push_str(&format!("   {}\n", "|".bright_blue()));
            out.push_str(&format!(
                "{} {} {}\n",
                format!("{:3}", self.location.line).bright_blue(),
                "|".bright_blue(),
                source
            ));
            out.push_str(&format!("   {}\n", "|".bright_blue()));
        }

        if let Some(ref suggestion) = self.suggestion {
            out.push_str(&format!(
                "   {} {}\n",
                "=".bright_green(),
                format!("Did you mean '{}'?", suggestion).bright_green()
            ));
        }

        if let Some(ref note) = self.note {
            out.push_str(&format!(
                "   {} {}\n",
                "=".bright_cyan(),
                format!("note: {}", note).bright_cyan()
            ));
        }

        out
    }
}

/// Computes the Levenshtein distance between two strings
/// Used for "Did you mean?" suggestions
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single rolling row instead of the full matrix
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut diagonal = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let above = row[j];
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            row[j] = (row[j] + 1).min(row[j - 1] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }

    row[b.len()]
}

/// Find the closest match from a list of candidates using Levenshtein distance
/// Returns None if no good match is found (distance > 3)
pub fn find_closest_match<'a>(target: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .filter(|candidate| candidate.as_str() != target)
        .map(|candidate| (levenshtein_distance(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("count", "count"), 0);
        assert_eq!(levenshtein_distance("cnt", "count"), 2);
    }

    #[test]
    fn test_closest_match_respects_threshold() {
        let names = vec!["counter".to_string(), "total".to_string()];
        assert_eq!(find_closest_match("countr", &names), Some("counter"));
        assert_eq!(find_closest_match("zzzzzzzz", &names), None);
    }

    #[test]
    fn test_display_is_single_line() {
        let err = ToyError::parse_error("Expect ';' after expression.", 3);
        assert_eq!(err.to_string(), "Parse Error: Expect ';' after expression. [line 3]");
        assert_eq!(err.phase(), Phase::ParseFailure);
    }

    #[test]
    fn test_with_source_picks_offending_line() {
        let err = ToyError::undefined_variable("b", 2).with_source("var a = 1;\nprint b;\n");
        assert_eq!(err.source_line.as_deref(), Some("print b;"));
        assert!(err.render().contains("print b;"));
    }
}
