//! cloudhook CLI
//!
//! Inspects the proxy the hook would use and issues authorized requests with
//! the same configuration a deployment would load.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use cloudhook_client::{CloudAuthHook, EnvTokenProvider};
use cloudhook_common::TomlConfiguration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (defaults to ~/.config/cloudhook/config.toml)
    #[arg(long, env = "CLOUDHOOK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a proxy is enabled and which one would be used
    Proxy {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Authorize and send a GET request
    Get {
        /// Target URL
        url: String,

        /// Environment variable holding the access token
        #[arg(long)]
        token_env: Option<String>,
    },
}

/// What the hook resolved from configuration.
#[derive(Debug, Serialize)]
struct ProxyReport {
    use_proxy: bool,
    proxy_type: Option<String>,
    proxy_url: Option<String>,
    routable: bool,
}

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `CLOUDHOOK_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("CLOUDHOOK_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("cloudhook=info,cloudhook_client=info,cloudhook_common=info")
    });

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<TomlConfiguration> {
    match path {
        Some(path) => TomlConfiguration::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => TomlConfiguration::load_default().context("Failed to load default configuration"),
    }
}

fn proxy_report(hook: &CloudAuthHook) -> Result<ProxyReport> {
    let use_proxy = hook.use_proxy()?;
    let handle = hook.proxy_handle();

    Ok(ProxyReport {
        use_proxy,
        proxy_type: handle
            .as_ref()
            .and_then(|h| h.proxy_type)
            .map(|t| t.to_string()),
        proxy_url: handle.as_ref().and_then(cloudhook_client::ProxyHandle::proxy_url),
        routable: handle.as_ref().is_some_and(cloudhook_client::ProxyHandle::is_routable),
    })
}

/// Renders the proxy report as printed by `cloudhook proxy`.
fn render_proxy(hook: &CloudAuthHook, json: bool) -> Result<String> {
    let report = proxy_report(hook)?;
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    Ok(if !report.use_proxy {
        "Proxy disabled".to_string()
    } else if let Some(url) = report.proxy_url {
        format!("Proxy enabled: {url}")
    } else {
        "Proxy enabled but not usable; requests connect directly".to_string()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Proxy { json } => {
            println!("{}", render_proxy(&CloudAuthHook::new(config), json)?);
        }
        Command::Get { url, token_env } => {
            let mut hook = CloudAuthHook::new(config);
            if let Some(var) = token_env {
                let provider = EnvTokenProvider::new(var);
                info!(var = provider.var(), "Reading access token from environment");
                hook = hook.with_credentials(provider);
            }

            let client = hook.authorize().await.context("Authorization failed")?;
            match client.proxy() {
                Some(proxy) => info!(%proxy, "Using proxy"),
                None => info!("Connecting directly"),
            }

            let response = client
                .get(&url)
                .await
                .with_context(|| format!("GET {url} failed"))?;
            println!("{} {}", response.status(), url);
        }
    }

    Ok(())
}
