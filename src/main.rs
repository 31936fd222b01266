use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uvm::bytecode::{assemble, hex_bytes, listing_table};
use uvm::dump::{write_dump, AddressRange};
use uvm::error::{Error, Result};
use uvm::vm::{DEFAULT_MEMORY_SIZE, DEFAULT_STEP_LIMIT};
use uvm::{Engine, Outcome, Program, VmConfig};

#[derive(Parser, Debug)]
#[command(name = "uvm")]
#[command(about = "Assembler and interpreter for a bit-packed virtual machine")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Translate a comma separated source table into a binary program
  Assemble {
    /// Source file, one instruction per line
    source: PathBuf,

    /// Where to write the binary program
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print every instruction with its encoding, and log at trace level even when `RUST_LOG` is set
    #[arg(short, long)]
    verbose: bool,
  },

  /// Run a binary program
  Execute {
    /// Binary program produced by `assemble`
    binary: PathBuf,

    /// Where to write the memory dump (JSON array)
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Inclusive address range to dump, e.g. `1000-1010`; defaults to all of memory
    #[arg(short, long)]
    range: Option<AddressRange>,

    /// Log every executed instruction, even when `RUST_LOG` is set, and print the final registers
    #[arg(long)]
    trace: bool,

    /// Words of data memory
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Maximum number of instructions to execute; 0 for no limit
    #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: u64,
  },
}

impl Command {
  fn is_verbose(&self) -> bool {
    match self {
      Command::Assemble { verbose, .. } => *verbose,
      Command::Execute  { trace, .. }   => *trace,
    }
  }
}

/// `RUST_LOG` (if set and valid) supplies the base filter; `--verbose`/`--trace` always add
/// `uvm=trace` on top of it.
fn log_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
  let filter =
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
       .unwrap_or_else(|| EnvFilter::new("uvm=info"));

  match (verbose, "uvm=trace".parse::<Directive>()) {
    (true, Ok(directive)) => filter.add_directive(directive),
    _                     => filter
  }
}

fn init_tracing(verbose: bool) {
  let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

  tracing_subscriber::registry()
    .with(log_filter(env.as_deref(), verbose))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
  fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn read_text(path: &Path) -> Result<String> {
  fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
  fs::write(path, bytes).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn run_assemble(source: &Path, output: Option<&Path>, verbose: bool) -> Result<()> {
  let assembled = assemble(&read_text(source)?)?;

  if verbose {
    listing_table(&assembled.instructions).printstd();
    println!("\nBinary ({} bytes):", assembled.bytes.len());
    for chunk in assembled.bytes.chunks(8) {
      println!("  {}", hex_bytes(chunk));
    }
  }

  if let Some(output) = output {
    write_file(output, &assembled.bytes)?;
    info!(path = %output.display(), "binary written");
  }

  info!(
    instructions = assembled.instructions.len(),
    bytes = assembled.bytes.len(),
    "assembled"
  );
  Ok(())
}

fn run_execute(
  binary: &Path,
  dump: Option<&Path>,
  range: Option<AddressRange>,
  trace: bool,
  config: VmConfig,
) -> Result<()> {
  let program = Program::new(read_file(binary)?);
  info!(path = %binary.display(), bytes = program.len(), "program loaded");

  let mut engine = Engine::new(program, config);
  let summary = engine.run()?;

  if summary.outcome == Outcome::StepLimitReached {
    info!(steps = summary.steps, "stopped at the step limit");
  }
  if trace {
    println!("{}", engine);
  }

  if let Some(dump) = dump {
    write_dump(dump, engine.memory(), range)?;
  }
  Ok(())
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.command.is_verbose());

  let result =
    match cli.command {
      Command::Assemble { source, output, verbose } => {
        run_assemble(&source, output.as_deref(), verbose)
      }
      Command::Execute { binary, dump, range, trace, memory_size, step_limit } => {
        let config = VmConfig {
          memory_size,
          step_limit: if step_limit == 0 { None } else { Some(step_limit) },
        };
        run_execute(&binary, dump.as_deref(), range, trace, config)
      }
    };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!("{}", e);
      ExitCode::FAILURE
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_filter() {
    assert_eq!(log_filter(None, false).to_string(), "uvm=info");
    assert!(log_filter(None, true).to_string().contains("uvm=trace"));
  }

  #[test]
  fn flag_adds_to_env_filter() {
    let quiet = log_filter(Some("warn"), false).to_string();
    assert!(!quiet.contains("uvm"));

    let verbose = log_filter(Some("warn"), true).to_string();
    assert!(verbose.contains("warn"));
    assert!(verbose.contains("uvm=trace"));
  }

  #[test]
  fn invalid_env_falls_back() {
    assert_eq!(log_filter(Some("uvm=loud"), false).to_string(), "uvm=info");
  }
}
