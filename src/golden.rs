// File: src/golden.rs
//
// Golden-file test runner behind `toy test`.
//
// Every `*.toy` script in a directory is executed with its output captured
// and compared against the sibling `*.out` file. A failure while running a
// script becomes an `error: ...` line in the captured output, so expected
// errors can be pinned down the same way as expected prints.

use anyhow::Context;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::interpreter::{Interpreter, OutputBuffer};
use crate::lexer::tokenize;
use crate::parser::parse;

pub const SCRIPT_EXTENSION: &str = "toy";
pub const EXPECTED_EXTENSION: &str = "out";

#[derive(Debug, Clone, PartialEq)]
pub enum GoldenStatus {
    Passed,
    Failed { expected: String, actual: String },
    /// No expectation existed (or `--update` was given); one was written
    Recorded,
}

#[derive(Debug, Clone)]
pub struct GoldenCase {
    pub path: PathBuf,
    pub status: GoldenStatus,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct GoldenReport {
    pub cases: Vec<GoldenCase>,
}

impl GoldenReport {
    pub fn passed(&self) -> usize {
        self.cases.len() - self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &GoldenCase> {
        self.cases.iter().filter(|c| matches!(c.status, GoldenStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Prints one line per script followed by a summary
    pub fn print(&self) {
        for case in &self.cases {
            match &case.status {
                GoldenStatus::Passed => {
                    println!("{} {} ({:.2?})", "[✓]".green(), case.path.display(), case.elapsed)
                }
                GoldenStatus::Recorded => {
                    println!("{} {} (recorded)", "[+]".cyan(), case.path.display())
                }
                GoldenStatus::Failed { expected, actual } => {
                    println!("{} {}", "[✗]".red(), case.path.display());
                    println!("Expected:\n{}\nGot:\n{}\n", expected, actual);
                }
            }
        }
        println!("\n{} Passed {}/{} tests", "[✓]".green(), self.passed(), self.cases.len());
    }
}

/// Runs a script from scratch and returns everything it printed.
/// A failure ends the run and is appended as `error: <message>`.
pub fn run_script(source: &str, max_call_depth: usize) -> String {
    let output = OutputBuffer::new();
    let mut interpreter = Interpreter::new().with_max_call_depth(max_call_depth);
    interpreter.set_output(output.clone());

    let result = tokenize(source)
        .and_then(|tokens| parse(&tokens))
        .and_then(|program| interpreter.interpret(&program, 0));

    let mut captured = output.contents();
    if let Err(err) = result {
        captured.push_str(&format!("error: {}\n", err));
    }
    captured
}

/// Runs every `*.toy` script in `dir`, sorted by file name.
///
/// With `update`, every `.out` file is rewritten from the actual output.
pub fn run_dir(dir: &Path, update: bool, max_call_depth: usize) -> anyhow::Result<GoldenReport> {
    let mut scripts: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading test directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|e| e == SCRIPT_EXTENSION).unwrap_or(false))
        .collect();
    scripts.sort();

    let mut report = GoldenReport::default();
    for path in scripts {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let expected_path = path.with_extension(EXPECTED_EXTENSION);

        let start = Instant::now();
        let actual = run_script(&content, max_call_depth).trim().to_string();
        let elapsed = start.elapsed();

        let status = if expected_path.exists() && !update {
            let expected = fs::read_to_string(&expected_path)
                .with_context(|| format!("reading {}", expected_path.display()))?
                .trim()
                .to_string();
            if actual == expected {
                GoldenStatus::Passed
            } else {
                GoldenStatus::Failed { expected, actual }
            }
        } else {
            fs::write(&expected_path, format!("{}\n", actual))
                .with_context(|| format!("writing {}", expected_path.display()))?;
            GoldenStatus::Recorded
        };

        tracing::debug!(script = %path.display(), ?elapsed, "golden script finished");
        report.cases.push(GoldenCase { path, status, elapsed });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::DEFAULT_MAX_CALL_DEPTH;

    #[test]
    fn test_run_script_captures_prints_and_errors() {
        let out = run_script("print 1;\nprint nope;\nprint 3;", DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(
            out,
            "1\nerror: Undefined Variable: Variable 'nope' is not defined. [line 2]\n"
        );
    }

    #[test]
    fn test_run_script_honors_call_depth() {
        let source = "fn f(n) { if (n == 0) return 0; return f(n - 1); }\nprint f(5);";
        assert_eq!(run_script(source, DEFAULT_MAX_CALL_DEPTH), "0\n");

        let out = run_script(source, 3);
        assert!(out.starts_with("error: Stack Overflow: Maximum call depth of 3 exceeded."), "{}", out);
    }

    #[test]
    fn test_run_dir_records_then_compares() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toy"), "print 1 + 1;").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let first = run_dir(dir.path(), false, DEFAULT_MAX_CALL_DEPTH).unwrap();
        assert_eq!(first.cases.len(), 1);
        assert_eq!(first.cases[0].status, GoldenStatus::Recorded);
        assert_eq!(fs::read_to_string(dir.path().join("a.out")).unwrap(), "2\n");

        let second = run_dir(dir.path(), false, DEFAULT_MAX_CALL_DEPTH).unwrap();
        assert_eq!(second.cases[0].status, GoldenStatus::Passed);
        assert!(second.is_success());

        fs::write(dir.path().join("a.out"), "3\n").unwrap();
        let third = run_dir(dir.path(), false, DEFAULT_MAX_CALL_DEPTH).unwrap();
        assert!(!third.is_success());
        assert_eq!(third.passed(), 0);
    }
}
