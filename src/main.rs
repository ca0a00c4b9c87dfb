// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Golem - command-line driver and REPL for the Golem programming language.
//!
//! ## Features
//!
//! - Runs a script, then its `main` function with the remaining arguments
//! - Evaluates code given with `--eval`
//! - Prints bytecode listings with `--disassemble`
//! - Interactive REPL with highlighting and history

mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use golem_core::compiler::Disassembler;
use golem_core::{AsyncEngine, Config, Engine, Error};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "golem", version, about = "Run Golem programs")]
struct Cli {
    /// Evaluate CODE and print its value
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the compiled bytecode instead of running
    #[arg(short, long)]
    disassemble: bool,

    /// Add a module search directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    /// Script to run; starts the REPL when omitted
    file: Option<PathBuf>,

    /// Arguments passed to the script's main function
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        for dir in &self.include {
            if !config.search_paths.contains(dir) {
                config.search_paths.push(dir.clone());
            }
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main entry point - uses tokio runtime for async file reads.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = Engine::with_config(cli.config());

    match (&cli.eval, &cli.file) {
        (Some(code), _) if cli.disassemble => disassemble(&engine, code, "<eval>"),
        (Some(code), _) => run_eval(&engine, code),
        (None, Some(path)) if cli.disassemble => match std::fs::read_to_string(path) {
            Ok(source) => disassemble(&engine, &source, &path.display().to_string()),
            Err(err) => report(&Error::Io(err)),
        },
        (None, Some(path)) => run_file(&engine, path.clone(), &cli.args).await,
        (None, None) => run_repl(engine),
    }
}

/// Start the interactive REPL
fn run_repl(engine: Engine) -> ExitCode {
    match repl::Repl::new(engine) {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}: Failed to initialize REPL: {:?}",
                "Error".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

/// Runs a script and its `main`, then waits for its `go` tasks.
async fn run_file(engine: &Engine, path: PathBuf, args: &[String]) -> ExitCode {
    if !path.exists() {
        eprintln!(
            "{}: file not found '{}'",
            "Error".red().bold(),
            path.display().cyan()
        );
        return ExitCode::FAILURE;
    }

    let engine = AsyncEngine::with_engine(engine.clone());
    let code = match engine.run_main(path, args.to_vec()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    };
    if let Err(e) = engine.join_tasks().await {
        return report(&e);
    }
    code
}

/// Evaluates code from the command line and prints its value.
fn run_eval(engine: &Engine, code: &str) -> ExitCode {
    let result = engine.eval(code);
    engine.join_tasks();
    match result {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn disassemble(engine: &Engine, source: &str, name: &str) -> ExitCode {
    match engine.compile(source, name) {
        Ok(module) => {
            let names = engine.runtime().builtins.names().iter().map(|n| n.to_string());
            print!("{}", Disassembler::new(&module).with_builtins(names));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

/// Prints an error to standard output and picks the exit code.
fn report(error: &Error) -> ExitCode {
    let text = error.to_string();
    match text.split_once(':') {
        Some((kind, rest)) => println!("{}:{}", kind.red().bold(), rest),
        None => println!("{}", text.red()),
    }
    ExitCode::FAILURE
}
