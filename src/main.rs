use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dalbit::cms::PostStatus;
use dalbit::config::Config;

// Translations for CLI output
rust_i18n::i18n!("locales", fallback = "en");

mod commands;

#[derive(Parser)]
#[command(
    name = "dalbit",
    version,
    about = "MBTI x tarot relationship blog publisher with duplicate-free topics",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides DALBIT_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML config file; environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate one unused topic, generate a post and publish it
    Run {
        /// Status to publish at when validation passes (draft, publish, future)
        #[arg(short, long)]
        status: Option<PostStatus>,

        /// Downgrade invalid content to draft instead of sanitizing it
        #[arg(long)]
        no_sanitize: bool,

        /// Seed for topic and slot selection
        #[arg(long)]
        seed: Option<u64>,

        /// Write Prometheus metrics to this file after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Publish this week's fortune for every personality type
    Weekly {
        /// Run even if today is not Monday
        #[arg(long)]
        force: bool,

        /// Write Prometheus metrics to this file after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Show ledger statistics and topic pool usage
    Stats,

    /// List the most recent ledger entries
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Check a Markdown file against the content policy
    Validate {
        /// Markdown file to check
        file: PathBuf,

        /// Print the sanitized body and revalidate it
        #[arg(long)]
        sanitize: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    dalbit::i18n::init_from_env();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    if let Err(e) = setup_tracing(&log_format, &config.logging.level, cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match dispatch(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Run {
            status,
            no_sanitize,
            seed,
            metrics_out,
        } => {
            tracing::info!(status = ?status, no_sanitize, seed = ?seed, "Starting run command");
            commands::run(
                config,
                commands::RunArgs {
                    status,
                    no_sanitize,
                    seed,
                    metrics_out,
                },
            )
            .await
        }

        Commands::Weekly { force, metrics_out } => {
            tracing::info!(force, "Starting weekly command");
            commands::weekly(config, force, metrics_out).await
        }

        Commands::Stats => commands::stats(config),

        Commands::History { limit } => commands::history(config, limit),

        Commands::Validate { file, sanitize } => commands::validate(config, &file, sanitize),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("dalbit=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("dalbit={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
