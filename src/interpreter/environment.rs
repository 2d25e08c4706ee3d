// File: src/interpreter/environment.rs
//
// Lexical scoping environment for variable management in the Toy interpreter.
// Frames are linked through an `enclosing` pointer; inner frames shadow outer ones.

use super::value::Value;
use crate::errors::{ErrorKind, ToyError, ToyResult};
use crate::lexer::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One frame of variable storage.
///
/// Frames are shared through `Rc<RefCell<..>>` because a frame can be
/// referenced both by the block executing in it and by any closure
/// declared inside it, and such a closure may outlive the block.
///
/// # Examples
///
/// ```ignore
/// let globals = Rc::new(RefCell::new(Environment::new()));
/// globals.borrow_mut().define(&x_token, Value::Number(10.0))?;
///
/// let mut inner = Environment::new_enclosed(Rc::clone(&globals));
/// inner.define(&x_token, Value::Number(20.0))?;   // shadows outer x
/// assert_eq!(inner.get(&x_token)?, Value::Number(20.0));
/// assert_eq!(globals.borrow().get(&x_token)?, Value::Number(10.0));
/// ```
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// Create a new root frame with no parent
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame whose lookups fall back to `enclosing`
    pub fn new_enclosed(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment { values: HashMap::new(), enclosing: Some(enclosing) }
    }

    /// Bind a new name in this frame. Fails if the name already exists
    /// in this frame; names in enclosing frames may be shadowed freely.
    pub fn define(&mut self, name: &Token, value: Value) -> ToyResult<()> {
        if self.values.contains_key(&name.lexeme) {
            return Err(ToyError::runtime(
                ErrorKind::Redefinition,
                format!("Variable '{}' is already defined in this scope.", name.lexeme),
                name.line,
            ));
        }
        self.values.insert(name.lexeme.clone(), value);
        Ok(())
    }

    /// Look a name up through the chain, innermost frame first
    pub fn get(&self, name: &Token) -> ToyResult<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(ToyError::undefined_variable(&name.lexeme, name.line)),
        }
    }

    /// Overwrite the nearest existing binding of `name` and return the
    /// assigned value. Assignment never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> ToyResult<Value> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value.clone();
            return Ok(value);
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(ToyError::undefined_variable(&name.lexeme, name.line)),
        }
    }

    /// Name-sorted snapshot of this frame only
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<(String, Value)> =
            self.values.iter().map(|(name, value)| (name.clone(), value.clone())).collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    /// Every name reachable from this frame, sorted and deduplicated
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        if let Some(enclosing) = &self.enclosing {
            names.extend(enclosing.borrow().visible_names());
        }
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, 1)
    }

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define(&ident("a"), Value::Number(1.0)).unwrap();
        assert_eq!(env.get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_redefinition_in_same_frame_fails() {
        let mut env = Environment::new();
        env.define(&ident("a"), Value::Number(1.0)).unwrap();
        let err = env.define(&ident("a"), Value::Number(2.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Redefinition);
        assert_eq!(env.get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_shadowing_in_nested_frame() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define(&ident("a"), Value::Number(1.0)).unwrap();

        let mut inner = Environment::new_enclosed(Rc::clone(&globals));
        inner.define(&ident("a"), Value::Number(2.0)).unwrap();

        assert_eq!(inner.get(&ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(globals.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_assign_walks_the_chain() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define(&ident("b"), Value::Number(2.0)).unwrap();

        let mut inner = Environment::new_enclosed(Rc::clone(&globals));
        let assigned = inner.assign(&ident("b"), Value::Number(10.0)).unwrap();

        assert_eq!(assigned, Value::Number(10.0));

        assert!(inner.bindings().is_empty());
        assert_eq!(globals.borrow().get(&ident("b")).unwrap(), Value::Number(10.0));
    }

    #[test]
    fn test_assign_to_undeclared_fails() {
        let mut env = Environment::new();
        let err = env.assign(&ident("missing"), Value::Null).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert!(env.get(&ident("missing")).is_err());
    }

    #[test]
    fn test_bindings_are_sorted_and_names_deduplicated() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define(&ident("z"), Value::Null).unwrap();
        globals.borrow_mut().define(&ident("a"), Value::Null).unwrap();

        let mut inner = Environment::new_enclosed(Rc::clone(&globals));
        inner.define(&ident("a"), Value::Bool(true)).unwrap();
        inner.define(&ident("m"), Value::Bool(true)).unwrap();

        let names: Vec<String> = globals.borrow().bindings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "z"]);
        assert_eq!(inner.visible_names(), vec!["a", "m", "z"]);
    }
}
