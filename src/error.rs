//! Shared error utilities used across the compilation pipeline.
//!
//! Syntax diagnostics point at the offending byte with a caret under the
//! source line that contains it. The parser recovers from those locally, so
//! only I/O failures ever reach the caller of [`crate::compile`].

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{line}:{column}: {message}\n{source_line}\n{marker}"))]
  Syntax {
    line: usize,
    column: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("failed to read {}: {source}", path.display()))]
  ReadInput { path: PathBuf, source: io::Error },

  #[snafu(display("failed to create {}: {source}", path.display()))]
  CreateOutput { path: PathBuf, source: io::Error },

  #[snafu(display("failed to write assembly: {source}"))]
  WriteOutput { source: io::Error },

  #[snafu(display("no storage cell was declared for variable `{name}`"))]
  MissingStorage { name: String },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = floor_char_boundary(source, loc.min(source.len()));
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |nl| nl + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |nl| safe_loc + nl);
    let source_line = source[line_start..line_end].trim_end_matches('\r');
    let column = source[line_start..safe_loc].chars().count();
    let line = source[..line_start].matches('\n').count() + 1;
    Self::Syntax {
      line,
      column: column + 1,
      source_line: source_line.to_string(),
      marker: format!("{}^", " ".repeat(column)),
      message: message.into(),
    }
  }
}

fn floor_char_boundary(source: &str, mut loc: usize) -> usize {
  while !source.is_char_boundary(loc) {
    loc -= 1;
  }
  loc
}
