//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// cidr2ip - expand CIDR blocks into complete IP address lists
///
/// Every address of every block, network and broadcast addresses
/// included, is written as one CSV record to a timestamped file.
///
/// Examples:
///   cidr2ip 10.0.0.0/24
///   cidr2ip 10.0.1.0/24 172.16.16.0/20 192.168.0.0/16
///   cidr2ip -f cidrs
///   cidr2ip --best-effort -o allowlist.csv 10.0.0.0/24 10.0.0.0/33
///   cidr2ip --dry-run 10.0.0.0/8
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CIDR blocks to expand (e.g. 10.0.0.0/24)
    #[arg(value_name = "CIDR", conflicts_with = "file")]
    pub cidrs: Vec<String>,

    /// Read CIDR blocks from a file, one per line
    ///
    /// Blank lines and lines starting with '#' are ignored.
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Write the address list to this file instead of a timestamped one
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["output_dir", "prefix"])]
    pub output: Option<PathBuf>,

    /// Directory for the timestamped output file
    #[arg(short = 'd', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name prefix for the timestamped output file
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// Header record written before the addresses
    #[arg(long, value_name = "TEXT")]
    pub header: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cidr2ip.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the valid blocks when some blocks fail (exit code 2)
    ///
    /// By default a single invalid block fails the whole run and
    /// no file is written.
    #[arg(long)]
    pub best_effort: bool,

    /// Largest number of addresses one block may expand to (0 = no limit)
    #[arg(long, value_name = "COUNT")]
    pub max_block_size: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: validate the blocks and print their sizes without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .cidr2ip.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref prefix) = self.prefix {
            if prefix.is_empty() {
                return Err("Prefix must not be empty".to_string());
            }
            if prefix.contains(|c| c == '/' || c == '\\') {
                return Err(format!("Prefix must not contain path separators: {}", prefix));
            }
        }

        if let Some(ref dir) = self.output_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Output directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
