//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and composable:
//! - `tokenizer` scans the source lazily, one token per call.
//! - `parser` owns all syntactic knowledge and returns the statement list with
//!   its expression arena.
//! - `symbols` maps variable names to storage labels.
//! - `codegen` lowers the program into x86-64 AT&T assembly.
//! - `config` and `error` are shared by the other modules.

pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod symbols;
pub mod tokenizer;

use std::io::Write;

use tracing::info;

pub use config::CompileOptions;
pub use error::{CompileError, CompileResult};

/// Compile a source string with default options, writing assembly to `out`.
pub fn compile<W: Write>(source: &str, out: &mut W) -> CompileResult<()> {
  compile_with(source, &CompileOptions::default(), out)
}

/// Compile a source string, writing assembly to `out`.
///
/// Malformed statements are skipped rather than reported, so the only failure
/// mode is the output sink refusing bytes.
pub fn compile_with<W: Write>(
  source: &str,
  options: &CompileOptions,
  out: &mut W,
) -> CompileResult<()> {
  let program = parser::parse(source);
  let mut symbols = symbols::SymbolTable::new();
  codegen::generate(&program, &mut symbols, options, out)?;
  info!(
    statements = program.stmts().len(),
    variables = symbols.len(),
    "compiled program"
  );
  Ok(())
}

/// Compile a source string into AT&T assembly held in memory.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let mut out = Vec::new();
  compile(source, &mut out)?;
  // The emitter only ever writes ASCII.
  Ok(String::from_utf8_lossy(&out).into_owned())
}
