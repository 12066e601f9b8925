//! hods CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, prints errors to stderr
//! and exits with non-zero on failure.

use hods::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
