// File: src/interpreter/value.rs
//
// Runtime value types for the Toy language.
// Defines all value types that can be represented and manipulated at runtime,
// plus the in-memory output sink used to capture `print`.

use crate::ast::FunctionDecl;
use std::cell::RefCell;
use std::fmt;
use std::io;
use std::rc::Rc;

use super::environment::Environment;

/// A user-defined function together with the frame it closes over
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

/// Runtime values
#[derive(Clone)]
pub enum Value {
    Number(f64),
    Str(Rc<str>),
    Bool(bool),
    Null,
    Function(Rc<Function>),
}

impl Value {
    /// `null` and `false` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Function(_) => "function",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

// Structural equality; functions are equal only to themselves
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Manual Debug implementation so closures don't dump their whole frame chain
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Null => write!(f, "Null"),
            Value::Function(func) => write!(f, "Function({}/{})", func.name(), func.arity()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
        }
    }
}

/// Formats a number the way `print` shows it: `4` rather than `4.0`
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Shared in-memory sink for `print` output.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// interpreter and read the captured text through another.
#[derive(Clone, Default, Debug)]
pub struct OutputBuffer {
    inner: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }

    /// Returns the captured text and empties the buffer
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.inner.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn test_mixed_types_are_unequal() {
        assert_ne!(Value::Bool(true), Value::Number(1.0));
        assert_ne!(Value::Null, Value::Bool(false));
        assert_ne!(Value::from("1"), Value::Number(1.0));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(format_number(1e15), "1000000000000000");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_display_of_other_values() {
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_output_buffer_is_shared_between_clones() {
        let buffer = OutputBuffer::new();
        let mut writer = buffer.clone();
        writeln!(writer, "one").unwrap();
        write!(writer, "two").unwrap();
        assert_eq!(buffer.contents(), "one\ntwo");
        assert_eq!(buffer.take(), "one\ntwo");
        assert_eq!(buffer.contents(), "");
    }
}
