// File: src/lib.rs
//
// Library interface for the Toy interpreter.
// Exposes modules for integration testing and external use.

pub mod ast;
pub mod config;
pub mod errors;
pub mod golden;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod session;
pub mod stack;
