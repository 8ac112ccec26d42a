//! Core compiler pipeline for a subset of Hoon.
//!
//! The pipeline is roughly:
//!
//!   source .hoon
//!     -> lexer    (tokens)
//!     -> parser   (wide/tall rune syntax into an AST)
//!     -> reduce   (surface runes rewritten into the canonical core)
//!     -> codegen_llvm (canonical AST into an SSA module)
//!     -> ir       (LLVM-flavoured text)
//!
//! Higher-level tools (the CLI, batch drivers) should depend on this
//! crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and source positions
// ---------------------------------------------------------------------

pub mod span;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: tokens, grammar, lexing and parsing
// ---------------------------------------------------------------------

pub mod token;
pub mod grammar;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod printer;

// ---------------------------------------------------------------------
// Middle: syntax reduction
// ---------------------------------------------------------------------

pub mod reduce;

// ---------------------------------------------------------------------
// Back-end: subject, builtins, IR and code generation
// ---------------------------------------------------------------------

pub mod subject;
pub mod builtins;
pub mod ir;
pub mod codegen_llvm;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use ast::{Node, NodeKind};
pub use compiler::{
    CompilationArtifact, CompileOptions, Emit, compile, compile_file, compile_with, emit,
};
pub use error::CoreError;
pub use span::{Position, Span};
