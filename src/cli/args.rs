//! CLI argument definitions using clap
//!
//! Commands:
//! - hods check [--recursive] [FILES]
//! - hods rehash [--sections a,b | --sections-all] [FILES]
//! - hods new [FILES]
//! - hods browse [DIRECTORY]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hods - hierarchical schema-validated documents
#[derive(Parser, Debug)]
#[command(name = "hods")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate schemas and hashes of document files
    Check {
        /// Descend into subdirectories when no files are given
        #[arg(long)]
        recursive: bool,

        /// Files to check (default: documents in the current directory)
        files: Vec<PathBuf>,
    },

    /// Update stale data hashes
    Rehash {
        /// Sections to hash (default: sections that already have hashes)
        #[arg(long, value_delimiter = ',', conflicts_with = "sections_all")]
        sections: Vec<String>,

        /// Hash every section except info
        #[arg(long)]
        sections_all: bool,

        /// Files to rehash (default: documents in the current directory)
        files: Vec<PathBuf>,
    },

    /// Create empty documents with recorded hashes
    New {
        /// Files to create
        files: Vec<PathBuf>,
    },

    /// Interactively browse a document collection
    Browse {
        /// Directory to browse (default: current directory)
        directory: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rehash_sections() {
        let cli = Cli::try_parse_from(["hods", "rehash", "--sections", "album,tracks", "a.json"]).unwrap();
        match cli.command {
            Command::Rehash { sections, sections_all, files } => {
                assert_eq!(sections, vec!["album", "tracks"]);
                assert!(!sections_all);
                assert_eq!(files, vec![PathBuf::from("a.json")]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_sections_conflict() {
        assert!(Cli::try_parse_from(["hods", "rehash", "--sections", "a", "--sections-all"]).is_err());
    }

    #[test]
    fn test_global_config() {
        let cli = Cli::try_parse_from(["hods", "browse", "--config", "hods.json", "music"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("hods.json")));
        assert!(matches!(cli.command, Command::Browse { directory: Some(_) }));
    }
}
