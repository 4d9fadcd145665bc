//! hash160-addr
//!
//! Command-line entry point: parses arguments, sets up stderr logging and
//! maps the command outcome onto stdout, stderr and the exit status.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use hash160_addr::cli::{self, Cli};

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .quiet(args.quiet)
        .verbosity(usize::from(args.verbose) + 1)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
    {
        eprintln!("warning: logger setup failed: {}", e);
    }

    let outcome = cli::run(&args, &mut io::stdin().lock());

    if let Some(stdout) = &outcome.stdout {
        println!("{}", stdout);
    }
    if let Some(error) = &outcome.error {
        eprintln!("error[{}]: {}", error.kind(), error);
    }
    ExitCode::from(outcome.exit_code())
}
