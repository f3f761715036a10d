//! `loxi`: a thin host shell around [`loxi_core::compile`].
//!
//! Reads a source file, or starts a line-at-a-time REPL when no path is
//! given, and reports compile diagnostics one per line. Never executes the
//! resulting bytecode — there is no instruction dispatch loop here — so the
//! canonical runtime-error exit code (70) is unreachable by construction;
//! everything this binary can report is either a successful compile (0), a
//! compile error (65), a bad CLI invocation (64), or an I/O failure (74).
//! CLI-invocation errors are intercepted via `Args::try_parse()` so usage
//! errors exit 64 rather than `clap`'s own default of 2.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use loxi_core::{compile, disassemble, Chunk, Vm};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "loxi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile Lox-family source to bytecode (no execution)")]
struct Args {
    /// Source file to compile. Omit to start an interactive REPL.
    path: Option<PathBuf>,

    /// Print the disassembled chunk after a successful compile.
    #[arg(long)]
    dump: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

/// Exit codes follow the convention clox's `main.c` uses: 64 for CLI
/// misuse, 65 for a compile-time error, 70 for an uncaught runtime error
/// (unreachable in this binary, see module docs), 74 for I/O failure.
/// `clap`'s own default (`Error::exit()`) reports usage errors with exit
/// code 2, not 64, so usage errors are intercepted below and re-exited
/// with `EX_USAGE` instead of letting `clap` pick its own code.
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_IOERR: u8 = 74;

/// Maps a `clap` parse failure onto an exit code: `Some(EX_USAGE)` for an
/// ordinary usage error (unknown flag, bad value, missing required arg),
/// `None` for `--help`/`--version`, which aren't errors from the user's
/// perspective and should fall through to `clap`'s own `exit()` (0, after
/// printing the help/version text to stdout).
fn classify_parse_error(err: &clap::Error) -> Option<u8> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(EX_USAGE),
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => match classify_parse_error(&err) {
            None => err.exit(),
            Some(code) => {
                eprint!("{err}");
                return ExitCode::from(code);
            }
        },
    };

    let filter = if args.verbose { "loxi=debug" } else { "loxi=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let result = match args.path {
        Some(path) => run_file(&path, args.dump),
        None => run_repl(args.dump),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EX_IOERR)
        }
    }
}

fn run_file(path: &PathBuf, dump: bool) -> Result<u8, CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.clone(), source })?;
    let mut vm = Vm::new();
    Ok(compile_and_report(&source, &mut vm, dump))
}

fn run_repl(dump: bool) -> Result<u8, CliError> {
    let mut vm = Vm::new();
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush().map_err(CliError::Io)?;
        line.clear();
        let bytes_read = stdin.lock().read_line(&mut line).map_err(CliError::Io)?;
        if bytes_read == 0 {
            println!();
            break;
        }
        compile_and_report(&line, &mut vm, dump);
    }
    Ok(0)
}

/// Compiles `source`, printing diagnostics (or a disassembly, with
/// `--dump`) to the appropriate stream, and returns the process exit code
/// this one compile contributes.
fn compile_and_report(source: &str, vm: &mut Vm, dump: bool) -> u8 {
    let mut chunk = Chunk::new();
    let (ok, diagnostics) = compile(source, &mut chunk, vm);
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    if !ok {
        tracing::debug!(count = diagnostics.len(), "compile finished with errors");
        return EX_DATAERR;
    }
    if dump {
        print!("{}", disassemble(&chunk, "script"));
    }
    0
}
