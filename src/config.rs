//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cidr2ip.toml` files.

use crate::models::{BlockLimit, ErrorPolicy};
use crate::report::{output_file_name, DEFAULT_TIMESTAMP_FORMAT};
use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".cidr2ip.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Output file settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Expansion limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// What happens to the good blocks when some blocks fail.
    #[serde(default)]
    pub error_policy: ErrorPolicy,

    /// Show a progress bar while blocks are expanded.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            error_policy: ErrorPolicy::default(),
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory generated files are written to.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// File name prefix, followed by `_<timestamp>.csv`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// chrono format string for the timestamp part of the file name.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Optional header record written before the addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            timestamp_format: default_timestamp_format(),
            header: None,
        }
    }
}

impl OutputConfig {
    /// Path of the timestamped output file for the time `now`.
    pub fn output_path(&self, now: &DateTime<Local>) -> PathBuf {
        let name = output_file_name(&self.file_prefix, &self.timestamp_format, now);
        if self.directory == Path::new(".") {
            PathBuf::from(name)
        } else {
            self.directory.join(name)
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "cidr2ip".to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

/// Expansion limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest number of addresses a single block may expand to (0 = no limit).
    #[serde(default = "default_max_block_size")]
    pub max_block_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_block_size: default_max_block_size(),
        }
    }
}

fn default_max_block_size() -> u64 {
    1 << 24 // a /8
}

impl LimitsConfig {
    pub fn block_limit(&self) -> BlockLimit {
        BlockLimit(self.max_block_size)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.cidr2ip.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only options the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.output_dir {
            self.output.directory = dir.clone();
        }
        if let Some(ref prefix) = args.prefix {
            self.output.file_prefix = prefix.clone();
        }
        if let Some(ref header) = args.header {
            self.output.header = Some(header.clone());
        }

        if let Some(max) = args.max_block_size {
            self.limits.max_block_size = max;
        }

        if args.best_effort {
            self.general.error_policy = ErrorPolicy::BestEffort;
        }
        if args.no_progress || args.quiet {
            self.general.progress = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that can only be verified after merging.
    pub fn validate(&self) -> Result<()> {
        let format = &self.output.timestamp_format;
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            bail!("Invalid timestamp format: {}", format);
        }
        if self.output.file_prefix.is_empty() {
            bail!("Output file prefix must not be empty");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.file_prefix, "cidr2ip");
        assert_eq!(config.output.timestamp_format, "%Y-%m-%d_%H-%M-%S");
        assert_eq!(config.general.error_policy, ErrorPolicy::Strict);
        assert_eq!(config.limits.block_limit(), BlockLimit(16_777_216));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
error_policy = "best-effort"

[output]
directory = "/tmp/lists"
file_prefix = "allowlist"
header = "ip"

[limits]
max_block_size = 0
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert!(config.general.progress);
        assert_eq!(config.general.error_policy, ErrorPolicy::BestEffort);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/lists"));
        assert_eq!(config.output.file_prefix, "allowlist");
        assert_eq!(config.output.timestamp_format, DEFAULT_TIMESTAMP_FORMAT);
        assert_eq!(config.output.header.as_deref(), Some("ip"));
        assert_eq!(config.limits.block_limit(), BlockLimit::UNLIMITED);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[limits]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.limits.max_block_size, 1 << 24);
    }

    #[test]
    fn test_output_path() {
        let now = Local::now();
        let mut output = OutputConfig::default();

        let path = output.output_path(&now);
        assert_eq!(path.parent(), Some(Path::new("")));
        assert!(path.to_string_lossy().starts_with("cidr2ip_"));

        output.directory = PathBuf::from("/var/lists");
        let path = output.output_path(&now);
        assert!(path.starts_with("/var/lists"));
        assert!(path.to_string_lossy().ends_with(".csv"));
    }

    #[test]
    fn test_validate_timestamp_format() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.output.timestamp_format = "%Y-%Q".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp.path()).unwrap().is_none());

        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[output]\nfile_prefix = \"lab\"\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp.path()).unwrap().unwrap();
        assert_eq!(config.output.file_prefix, "lab");

        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "[output\n").unwrap();
        assert!(Config::load_from_dir(temp.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "cidr2ip",
            "--best-effort",
            "--prefix",
            "edge",
            "--max-block-size",
            "4096",
            "-q",
            "10.0.0.0/24",
        ]);

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.general.error_policy, ErrorPolicy::BestEffort);
        assert_eq!(config.output.file_prefix, "edge");
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.limits.max_block_size, 4096);
        assert!(!config.general.progress);
    }

    #[test]
    fn test_merge_keeps_file_settings_without_flags() {
        let args = Args::parse_from(["cidr2ip", "10.0.0.0/24"]);

        let mut config: Config =
            toml::from_str("[general]\nerror_policy = \"best-effort\"\n").unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.general.error_policy, ErrorPolicy::BestEffort);
        assert!(config.general.progress);
    }
}
