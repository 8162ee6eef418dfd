//! optstore CLI
//!
//! Command-line access to an optstore options database.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use optstore_core::{Config, Options};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "optstore")]
#[command(about = "optstore - cached key-value options backed by SQLite")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an option's resolved value
    Get {
        /// Option key
        key: String,
        /// Value to print when the option is missing
        #[arg(short, long)]
        default: Option<String>,
    },
    /// Show an option's stored row
    Show {
        /// Option key
        key: String,
    },
    /// Save an option (insert or update)
    Set {
        /// Option key
        key: String,
        /// Value (JSON arrays and objects are stored as composites)
        value: String,
        /// Change the auto-load flag (true/false)
        #[arg(long)]
        auto_load: Option<bool>,
        /// Owning extension
        #[arg(short, long)]
        extension: Option<String>,
    },
    /// Create an option, failing if it already exists
    #[command(alias = "add")]
    Create {
        /// Option key
        key: String,
        /// Value (JSON arrays and objects are stored as composites)
        value: String,
        /// Include in the auto-load set
        #[arg(short, long)]
        auto_load: bool,
        /// Owning extension
        #[arg(short, long)]
        extension: Option<String>,
    },
    /// Check whether an option exists
    Has {
        /// Option key
        key: String,
    },
    /// Remove options by key and/or extension
    #[command(alias = "rm")]
    Remove {
        /// Option key
        #[arg(short, long)]
        key: Option<String>,
        /// Owning extension
        #[arg(short, long)]
        extension: Option<String>,
    },
    /// Search options by key prefix
    Search {
        /// Key prefix
        prefix: String,
        /// Keep full dotted keys instead of nesting them
        #[arg(long)]
        compact: bool,
    },
    /// List options owned by an extension
    Extension {
        /// Extension name
        name: String,
    },
    /// List the auto-load set
    #[command(alias = "ls")]
    List,
    /// Show database location and option counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, cache_ttl_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config_file.as_ref();

    // Config commands work without opening the database
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut options = Options::open_with_config(&config)?;
    info!(path = %config.sqlite_path().display(), "options database opened");

    match cli.command {
        Commands::Get { key, default } => {
            commands::option::get(&mut options, key, default, &output)
        }
        Commands::Show { key } => commands::option::show(&options, key, &output),
        Commands::Set {
            key,
            value,
            auto_load,
            extension,
        } => commands::option::set(&mut options, key, value, auto_load, extension, &output),
        Commands::Create {
            key,
            value,
            auto_load,
            extension,
        } => commands::option::create(&mut options, key, value, auto_load, extension, &output),
        Commands::Has { key } => commands::option::has(&options, key, &output),
        Commands::Remove { key, extension } => {
            commands::option::remove(&mut options, key, extension, &output)
        }
        Commands::Search { prefix, compact } => {
            commands::option::search(&options, prefix, compact, &output)
        }
        Commands::Extension { name } => commands::option::extension(&options, name, &output),
        Commands::List => commands::option::list(&mut options, &output),
        Commands::Status => commands::status::show(&mut options, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if OPTSTORE_LOG environment variable is set.
/// Logs to config.log_file when set, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("OPTSTORE_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "optstore_core={},optstore={}",
        log_level, log_level
    ));

    let Some(log_path) = &config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match File::create(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("logging initialized to {:?}", log_path);
}
