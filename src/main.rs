use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process;

use rclearc::error::{CreateOutputSnafu, ReadInputSnafu, WriteOutputSnafu};
use rclearc::{CompileOptions, CompileResult, compile_with};
use snafu::ResultExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RCLEARC_LOG";

fn run(input: &Path, output: &Path) -> CompileResult<()> {
  let bytes = fs::read(input).context(ReadInputSnafu { path: input })?;
  let source = String::from_utf8_lossy(&bytes);

  let options = CompileOptions::from_env();
  debug!(?options, input = %input.display(), "compiling");

  let file = File::create(output).context(CreateOutputSnafu { path: output })?;
  let mut out = BufWriter::new(file);
  compile_with(&source, &options, &mut out)?;
  out.flush().context(WriteOutputSnafu)
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let args: Vec<String> = env::args().collect();
  if args.len() != 3 {
    let program = args.first().map(String::as_str).unwrap_or("rclearc");
    eprintln!("usage: {program} <input> <output>");
    process::exit(1);
  }

  if let Err(err) = run(Path::new(&args[1]), Path::new(&args[2])) {
    eprintln!("{err}");
    process::exit(1);
  }
}
