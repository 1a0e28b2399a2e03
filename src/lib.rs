//! A tree-walking interpreter for a small dynamically-typed language with
//! closures, classes, traits, getters, and class methods.
//!
//! The pipeline has four stages: [`scanner`] → [`parser`] → [`resolver`] →
//! [`interpreter`].  The first three accumulate errors and the interpreter
//! only runs on a clean program; [`run_pipeline`] wires them together.

pub mod ast;
pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod natives;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Run `source` through the full pipeline against `interpreter`.
///
/// Static errors (lexical, syntactic, resolution) are collected across all
/// three front-end stages and returned together; the interpreter never runs
/// when any exist.  A runtime failure is returned as a single-element vector.
pub fn run_pipeline<W: Write>(
    source: &str,
    interpreter: &mut Interpreter<W>,
) -> Result<(), Vec<LoxError>> {
    let (tokens, mut errors) = Scanner::new(source).scan_tokens();

    let (statements, parse_errors) = Parser::new(tokens).parse();
    errors.extend(parse_errors);

    let (locals, resolve_errors) = Resolver::new().resolve(&statements);
    errors.extend(resolve_errors);

    if !errors.is_empty() {
        info!("Skipping execution: {} static error(s)", errors.len());
        return Err(errors);
    }

    interpreter.interpret(&statements, locals).map_err(|e| vec![e])
}
