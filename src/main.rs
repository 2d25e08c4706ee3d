// File: src/main.rs
//
// Main entry point for the Toy language interpreter.
// Handles command-line argument parsing, configuration and logging setup,
// and dispatches to the appropriate subcommand (run, repl, tokens, ast, test).

use anyhow::Context;
use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use toy::config::ToyConfig;
use toy::errors::{Phase, ToyError};
use toy::interpreter::Interpreter;
use toy::repl::Repl;
use toy::{ast, golden, lexer, parser};

/// Environment variable consulted when `--log` is not given
const LOG_ENV: &str = "TOY_LOG";

const EXIT_DATA_ERROR: u8 = 65;
const EXIT_SOFTWARE: u8 = 70;
const EXIT_IO_ERROR: u8 = 74;

#[derive(ClapParser)]
#[command(
    name = "toy",
    about = "Toy: a small scripting language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to ./toy.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `toy=debug` (overrides TOY_LOG and the config file)
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Run a Toy script file
    Run {
        /// Path to the .toy file
        file: PathBuf,
    },

    /// Launch interactive Toy REPL
    Repl,

    /// Print the token listing of a script
    Tokens {
        file: PathBuf,
    },

    /// Print the syntax tree of a script
    Ast {
        file: PathBuf,
    },

    /// Run golden test scripts and compare against their .out files
    Test {
        /// Directory containing .toy scripts
        #[arg(default_value = "tests/scripts")]
        dir: PathBuf,

        /// Regenerate all .out files based on actual output
        #[arg(long)]
        update: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ToyConfig::load(cli.config.as_deref())?;

    if cli.no_color || !config.color {
        colored::control::set_override(false);
    }
    init_tracing(cli.log.as_deref(), &config.log.filter)?;

    match cli.command {
        Commands::Run { file } => Ok(run_file(&file, config.interpreter.max_call_depth)),

        Commands::Repl => {
            let mut repl = Repl::new(config.repl, config.interpreter.max_call_depth)?;
            repl.run()?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Tokens { file } => {
            let Some(source) = read_script(&file) else {
                return Ok(ExitCode::from(EXIT_IO_ERROR));
            };
            match lexer::tokenize(&source) {
                Ok(tokens) => {
                    println!("{}", lexer::render_tokens(&tokens));
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => Ok(report(err, &source)),
            }
        }

        Commands::Ast { file } => {
            let Some(source) = read_script(&file) else {
                return Ok(ExitCode::from(EXIT_IO_ERROR));
            };
            match lexer::tokenize(&source).and_then(|tokens| parser::parse(&tokens)) {
                Ok(program) => {
                    print!("{}", ast::render_tree(&program));
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => Ok(report(err, &source)),
            }
        }

        Commands::Test { dir, update } => {
            let report = golden::run_dir(&dir, update, config.interpreter.max_call_depth)?;
            report.print();
            Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Tokenize, parse and interpret one script file
fn run_file(path: &Path, max_call_depth: usize) -> ExitCode {
    let Some(source) = read_script(path) else {
        return ExitCode::from(EXIT_IO_ERROR);
    };

    let result = lexer::tokenize(&source)
        .and_then(|tokens| parser::parse(&tokens))
        .and_then(|program| {
            let mut interpreter = Interpreter::new().with_max_call_depth(max_call_depth);
            interpreter.interpret(&program, 0)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err, &source),
    }
}

fn read_script(path: &Path) -> Option<String> {
    match fs::read_to_string(path).with_context(|| format!("reading {}", path.display())) {
        Ok(source) => Some(source),
        Err(err) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), err);
            None
        }
    }
}

/// Prints the rendered error and maps it to an exit code
fn report(err: ToyError, source: &str) -> ExitCode {
    let err = err.with_source(source);
    eprint!("{}", err.render());
    match err.phase() {
        Phase::LexFailure | Phase::ParseFailure => ExitCode::from(EXIT_DATA_ERROR),
        Phase::RuntimeFailure => ExitCode::from(EXIT_SOFTWARE),
    }
}

/// Installs the stderr log subscriber.
///
/// Filter precedence: `--log`, then `TOY_LOG`, then the config file.
fn init_tracing(flag: Option<&str>, configured: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let directive = match flag {
        Some(directive) => directive.to_string(),
        None => std::env::var(LOG_ENV).unwrap_or_else(|_| configured.to_string()),
    };
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{}'", directive))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}
