//! gatekeep CLI - probe and query APIs configured for gatekeep
//!
//! Reads the same TOML file a service would hand to `gatekeep-client`, so the
//! anonymous-path rules and health settings can be checked from a terminal.
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::debug;
use secrecy::SecretString;

use gatekeep_client::{ApiClient, EnvTokenProvider, StaticTokenProvider, TokenProvider, is_anonymous};
use gatekeep_common::GatekeepConfig;

mod display;

/// Environment variable read for the bearer token when `--token` is absent.
const TOKEN_VARIABLE: &str = "GATEKEEP_TOKEN";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a gatekeep TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Base URL of the API, overriding the configured base address
    #[arg(long)]
    base_url: Option<String>,

    /// Log request decisions at debug level
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the health endpoint and exit non-zero when unhealthy
    Health,

    /// Show whether a request would be sent without a token
    Check {
        /// HTTP method, e.g. GET
        method: String,
        /// Request path or absolute URL
        path: String,
    },

    /// Send an authenticated GET and print the JSON response
    Get {
        /// Path relative to the base URL
        path: String,

        /// Bearer token (or set GATEKEEP_TOKEN env var)
        #[arg(long)]
        token: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("gatekeep_client=warn,gatekeep=warn"),
    );
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

/// Loads the configuration file, if any, and applies command-line overrides.
fn resolve_config(args: &Args) -> Result<GatekeepConfig> {
    let mut config = match &args.config {
        Some(path) => GatekeepConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GatekeepConfig::new(String::new()),
    };

    if let Some(base_url) = &args.base_url {
        config.client.base_address.clone_from(base_url);
    }

    Ok(config)
}

fn token_provider(token: Option<String>) -> Arc<dyn TokenProvider> {
    match token {
        Some(token) => Arc::new(StaticTokenProvider::from(SecretString::new(token.into()))),
        None => Arc::new(EnvTokenProvider::new(TOKEN_VARIABLE)),
    }
}

fn connect(config: &GatekeepConfig) -> Result<ApiClient> {
    if config.client.base_address.trim().is_empty() {
        bail!("A base URL must be provided via --base-url or the configuration file");
    }
    ApiClient::from_config(config).context("Failed to create API client")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = resolve_config(&args)?;
    debug!("Resolved configuration: {config:?}");

    match args.command {
        Command::Health => {
            let client = connect(&config)?;
            let status = client.health().ensure_fresh().await;
            display::display_health(client.health().endpoint().as_str(), &status);

            Ok(if status.available {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Check { method, path } => {
            let anonymous = is_anonymous(&method, &path, &config.anonymous);
            display::display_decision(&method, &path, anonymous);
            Ok(ExitCode::SUCCESS)
        }
        Command::Get { path, token } => {
            let client = connect(&config)?.with_token_provider(token_provider(token));
            let section = client.authenticated_section(config.anonymous.clone())?;

            let body: Option<serde_json::Value> = section
                .request(section.get(&path)?)
                .await
                .with_context(|| format!("GET {path} failed"))?;
            display::display_json(body.as_ref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
