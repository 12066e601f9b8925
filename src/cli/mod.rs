//! CLI module for hods
//!
//! Provides command-line interface for:
//! - check: Validate documents and verify their hashes
//! - rehash: Rewrite stale or missing hash records
//! - new: Create an empty document
//! - browse: Navigate a directory of documents interactively

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{
    browse, check, check_file, init_logging, new, new_document, rehash, rehash_file, run,
    run_command, CheckStatus, Context, RehashOutcome, SectionSelection, DEFAULT_FILENAME,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
