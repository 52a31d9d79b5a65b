//! cidr2ip - expand CIDR blocks into complete IP address lists
//!
//! A CLI tool that enumerates every address of one or more CIDR blocks
//! in parallel and saves them as a single-column CSV file.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid CIDR, empty or unreadable input, write failure)
//!   2 - Partial output written with --best-effort after some blocks failed

mod cli;
mod config;
mod error;
mod expand;
mod input;
mod models;
mod report;

use anyhow::{bail, Context, Result};
use chrono::Local;
use cli::Args;
use config::Config;
use expand::ExpandOptions;
use input::InputSource;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(effective_log_level(&args, &config));

    info!("cidr2ip v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cidr2ip.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", config::CONFIG_FILE_NAME);
    Ok(())
}

/// A verbose config file only raises the level when -q is not given.
fn effective_log_level(args: &Args, config: &Config) -> Level {
    if config.general.verbose && !args.quiet {
        Level::DEBUG
    } else {
        args.log_level()
    }
}

/// Initialize logging on stderr; `RUST_LOG` overrides the flag-derived level.
fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        // An explicit path must load
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

/// Run the complete expansion workflow. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Collect the CIDR blocks
    let source = InputSource::select(args.file.as_deref(), &args.cidrs);
    let cidrs = input::read_cidrs(&source)?;
    info!("Expanding {} CIDR blocks", cidrs.len());
    debug!("Error policy: {}", config.general.error_policy);

    if args.dry_run {
        return handle_dry_run(&cidrs, &config);
    }

    // Step 2: Expand every block concurrently
    let options = ExpandOptions {
        limit: config.limits.block_limit(),
        show_progress: config.general.progress,
    };
    let expansion = expand::expand_all(&cidrs, &options).await;

    for line in report::summary_lines(&expansion) {
        debug!("{}", line);
    }

    // Step 3: Apply the error policy
    let expansion = expansion.resolve(config.general.error_policy)?;
    if expansion.blocks.is_empty() {
        bail!("None of the {} CIDR blocks could be expanded", cidrs.len());
    }

    let complete = expansion.is_complete();
    let failed = expansion.failures.len();
    let expanded = expansion.blocks.len();
    let addresses = expansion.into_addresses();

    // Step 4: Save the list
    let path = match args.output {
        Some(ref path) => path.clone(),
        None => config.output.output_path(&Local::now()),
    };
    let written = report::write_csv(&addresses, &path, config.output.header.as_deref())?;

    info!(
        "Saved {} addresses from {} blocks in {:.2}s",
        written,
        expanded,
        start_time.elapsed().as_secs_f64()
    );
    println!("IP list saved to {}", path.display());

    if !complete {
        warn!(
            "{} of {} CIDR blocks failed; the list is partial",
            failed,
            cidrs.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: validate and size every block, write nothing.
fn handle_dry_run(cidrs: &[String], config: &Config) -> Result<i32> {
    let plan = report::plan(cidrs, config.limits.block_limit());

    println!("Dry run: {} CIDR blocks (nothing written)\n", cidrs.len());
    for line in &plan.lines {
        println!("  {}", line);
    }
    println!("\n  Total: {} addresses", plan.total_display());

    if plan.rejected > 0 {
        eprintln!("{} of {} blocks would fail", plan.rejected, cidrs.len());
        return Ok(1);
    }

    Ok(0)
}
