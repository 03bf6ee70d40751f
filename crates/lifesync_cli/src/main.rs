//! LifeSync command-line front end.
//!
//! # Responsibility
//! - Run engine operations against a local SQLite slot for smoke checks,
//!   backups and quick queries.
//! - Map failures to a non-zero exit code with a one-line message.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = commands::run(&cli.global, cli.command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
