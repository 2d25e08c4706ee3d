// File: src/interpreter/control_flow.rs
//
// Completion signal for statement execution.
//
// `return` is not implemented by unwinding. Every statement reports how it
// finished, and the statements that run sub-statements (block, if, while)
// stop and hand a `Return` upward untouched until a function call or the
// top level receives it.

use super::value::Value;

/// How a statement finished executing
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Completion {
    /// Fell off the end, continue with the next statement
    Normal,
    /// A `return` statement ran; `line` is where its keyword appears
    Return { value: Value, line: usize },
}
