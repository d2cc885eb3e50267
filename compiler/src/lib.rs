//! dclass-compiler
//!
//! This crate implements:
//!  1) A pull-based lexer for `.dc` distributed-class files,
//!  2) A recursive-descent parser with error recovery and forward references,
//!  3) A post-parse verifier (inheritance cycles, name collisions, recursive structs),
//!  4) The text side of the field codec (`format` / `parse`),
//!  5) Diagnostics and error types (`Diagnostic`, `DcError`).

pub mod codec;
pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod token;
pub mod verifier;

pub use codec::{format, parse};
pub use compiler::{compile, compile_path, compile_schema};
pub use diagnostic::{Category, Diagnostic};
pub use error::DcError;
pub use lexer::{lex, Lexer};
pub use token::{Token, TokenKind};

/// Computes the 64-bit hash of a compiled schema.
pub fn hash(file: &dclass_schema::File) -> u64 {
    dclass_schema::hash(file)
}
