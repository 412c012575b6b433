//! Caching Forward Proxy
//!
//! Intercepts HTTP requests, forwards them to an origin and caches eligible
//! responses in memory.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  CACHING PROXY                   │
//!     Client Request    │  ┌────────┐   ┌───────────┐   ┌──────────────┐   │
//!     ──────────────────┼─▶│  http  │──▶│ directive │──▶│ cache::store │   │
//!                       │  │ server │   │ + target  │   └──────┬───────┘   │
//!                       │  └────────┘   └───────────┘     hit  │  miss     │
//!                       │       ▲                              │    │      │
//!                       │       │       ┌──────────────┐       │    ▼      │
//!     Client Response   │       └───────│ materializer │◀──────┘ forwarder ┼──▶ Origin
//!     ◀─────────────────┼───────────────│  + X-Cache   │◀──────────────────┼───
//!                       │               └──────────────┘                   │
//!                       │  admin (clear cache) · reaper · config · metrics │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! # Commands
//! - `start` runs the proxy (fixed origin with `--origin`, otherwise `/proxy?url=`)
//! - `clear-cache` flushes the cache of a running proxy through its admin endpoint
//! - `cache-stats` prints entry and hit/miss counts of a running proxy

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tokio::net::TcpListener;

use caching_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use caching_proxy::http::HttpServer;
use caching_proxy::lifecycle::{shutdown_signal, Shutdown};
use caching_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "caching-proxy")]
#[command(about = "Caching forward proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the caching proxy server
    Start {
        /// Port to run the server on
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1024..=65535))]
        port: Option<u16>,

        /// Origin server URL; omit to read targets from `/proxy?url=`
        #[arg(short, long)]
        origin: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Clear the proxy cache
    ClearCache {
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Show cache statistics
    CacheStats {
        #[command(flatten)]
        admin: AdminArgs,
    },
}

#[derive(clap::Args)]
struct AdminArgs {
    /// Admin endpoint of the running proxy
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    /// Admin API key, if the proxy requires one
    #[arg(short, long, env = "CACHING_PROXY_ADMIN_KEY")]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port, origin, config } => start(port, origin, config).await,
        Commands::ClearCache { admin } => {
            let res = admin_client(&admin)?
                .post(format!("{}/admin/cache/clear", admin.url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await
        }
        Commands::CacheStats { admin } => {
            let res = admin_client(&admin)?
                .get(format!("{}/admin/cache", admin.url.trim_end_matches('/')))
                .send()
                .await?;
            print_response(res).await
        }
    }
}

async fn start(
    port: Option<u16>,
    origin: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(port) = port {
        let mut addr: SocketAddr = config.listener.bind_address.parse()?;
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }
    if origin.is_some() {
        config.proxy.origin = origin;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("caching-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = ?config.proxy.origin,
        default_ttl_secs = config.cache.default_ttl_secs,
        upstream_timeout_ms = config.upstream.timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn admin_client(admin: &AdminArgs) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &admin.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .no_proxy()
        .build()?)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("admin API returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    if let Some(message) = json.get("message").and_then(Value::as_str) {
        println!("{}", message);
    } else {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
