//! Command-line driver (SPEC_FULL.md §4.G): picks an execution mode,
//! wires stdin/stdout, and reports fatal errors as `bf-cli: <message>` on
//! exit code 1.

use bf_core::{compile_ir1, compile_ir2, vm, BfError, Mode, Tape};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum ExecMode {
    /// AOT specializer (reduced-IR closures, no native code generated).
    Aot,
    /// Hot-loop interpreter with runtime pattern recognition.
    Jit,
}

impl From<ExecMode> for Mode {
    fn from(mode: ExecMode) -> Self {
        match mode {
            ExecMode::Aot => Mode::Aot,
            ExecMode::Jit => Mode::Jit,
        }
    }
}

/// A Brainfuck lexer, loop optimizer, AOT specializer and hot-loop interpreter.
#[derive(Debug, Parser)]
#[command(name = "bf", version, about)]
struct Cli {
    /// Source file. Reads from stdin if omitted.
    source: Option<PathBuf>,

    /// Execution backend.
    #[arg(short, long, value_enum, default_value = "aot")]
    mode: ExecMode,

    /// Print wall-clock compile and execution time to stderr.
    #[arg(long)]
    time: bool,

    /// Print the optimized IR (IR₂) to stderr instead of running it.
    #[arg(long)]
    dump_ir: bool,

    /// Increase log verbosity. Repeatable (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("bf-cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<(), BfError> {
    let source = read_source(cli.source.as_deref())?;
    info!("read {} bytes of source", source.len());

    if cli.dump_ir {
        let compile_start = Instant::now();
        let ir2 = compile_ir2(&source);
        debug!("compiled to ir2 in {:?}", compile_start.elapsed());
        let specialized = vm::specializer::Specialized::build(&ir2)?;
        eprint!("{}", specialized.dump());
        return Ok(());
    }

    let mode: Mode = cli.mode.into();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut output = stdout.lock();

    let compile_start = Instant::now();
    let mut tape = Tape::new();
    let result = match mode {
        Mode::Aot => {
            let ir2 = compile_ir2(&source);
            let compile_elapsed = compile_start.elapsed();
            let exec_start = Instant::now();
            let outcome = vm::specializer::run_aot(&ir2, &mut tape, &mut input, &mut output);
            (compile_elapsed, exec_start.elapsed(), outcome)
        }
        Mode::Jit => {
            let ir1 = compile_ir1(&source);
            let compile_elapsed = compile_start.elapsed();
            let exec_start = Instant::now();
            let outcome = vm::interpret(&ir1, &mut tape, &mut input, &mut output);
            (compile_elapsed, exec_start.elapsed(), outcome)
        }
    };

    output.flush().map_err(|err| BfError::io("<stdout>", err))?;

    let (compile_elapsed, exec_elapsed, outcome) = result;
    if cli.time {
        eprintln!("compile: {compile_elapsed:?}  execute: {exec_elapsed:?}");
    }
    outcome
}

fn read_source(path: Option<&std::path::Path>) -> Result<Vec<u8>, BfError> {
    match path {
        Some(path) => std::fs::read(path).map_err(|err| BfError::io(path, err)),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| BfError::io("<stdin>", err))?;
            Ok(buf)
        }
    }
}
