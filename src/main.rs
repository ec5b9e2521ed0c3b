//! sigorest: OpenAI-compatible gateway for heterogeneous LLM providers.
//!
//! One process serves a plain-HTTP listener for loopback clients and a
//! TLS listener for the private network, multiplexing chat-completion
//! traffic onto the providers in the model catalogue.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tracing::{error, info};

mod api_types;
mod catalog;
mod config;
mod memory;
mod middleware;
mod observability;
mod providers;
mod routes;
mod session;
mod state;
mod tls;

#[cfg(test)]
mod tests;

use catalog::{discover_ollama_models, load_catalog, ModelRegistry};
use config::LogFormat;
use memory::load_memory;
use middleware::{ip_gate, GatePolicy};
use session::SessionStore;
use state::AppState;

/// Embedded fallback catalogue, used when no file is found on disk.
const DEFAULT_MODELS_CSV: &str = include_str!("../models.csv");

/// Embedded fallback memory block.
const DEFAULT_MEMORY_JSON: &str = include_str!("../memory.json");

#[derive(Parser, Debug)]
#[command(
    version,
    about = "OpenAI-compatible gateway for heterogeneous LLM providers",
    long_about = None
)]
struct Args {
    /// HTTP port (loopback clients only)
    #[arg(long, default_value_t = 9080)]
    http_port: u16,

    /// HTTPS port (private-network clients)
    #[arg(long, default_value_t = 9443)]
    https_port: u16,

    /// TLS certificate path
    #[arg(long, default_value = "./certs/server.crt")]
    cert: PathBuf,

    /// TLS private key path
    #[arg(long, default_value = "./certs/server.key")]
    key: PathBuf,

    /// Log level: debug|info|warn|error
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Model catalogue file
    #[arg(long, default_value = "./models.csv")]
    models: PathBuf,

    /// Memory block file
    #[arg(long, default_value = "./memory.json")]
    memory: PathBuf,

    /// Session storage directory
    #[arg(long, default_value = ".sessions")]
    sessions_dir: PathBuf,

    /// Ollama daemon probed for local models at startup
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_endpoint: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    observability::init_tracing(&args.log_level, args.log_format, args.quiet);

    info!(
        http_port = args.http_port,
        https_port = args.https_port,
        "sigorest starting"
    );

    if let Err(err) = tls::ensure_self_signed(&args.cert, &args.key) {
        error!(error = %err, "TLS bootstrap failed");
        std::process::exit(1);
    }

    let http_client = reqwest::Client::new();

    let mut entries = load_catalog(&args.models, DEFAULT_MODELS_CSV);
    entries.extend(discover_ollama_models(&http_client, &args.ollama_endpoint).await);

    let registry = ModelRegistry::from_entries(entries);
    if registry.is_empty() {
        tracing::warn!("no models configured; every chat request will fail");
    }
    let memory_block = load_memory(&args.memory, DEFAULT_MEMORY_JSON);

    info!(
        available_models = registry.len(),
        memory_cache = memory_block.cache,
        "configuration loaded"
    );

    let state = AppState::new(
        registry,
        memory_block,
        args.memory.clone(),
        SessionStore::new(&args.sessions_dir),
    )
    .with_http_client(http_client);

    let app = routes::router(state);

    let http_app = app.clone().layer(axum::middleware::from_fn_with_state(
        GatePolicy::Loopback,
        ip_gate,
    ));
    let https_app = app.layer(axum::middleware::from_fn_with_state(
        GatePolicy::PrivateNets,
        ip_gate,
    ));

    let rustls_config = match RustlsConfig::from_pem_file(&args.cert, &args.key).await {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load TLS certificate");
            std::process::exit(1);
        }
    };

    let http_addr = SocketAddr::from(([0, 0, 0, 0], args.http_port));
    let https_addr = SocketAddr::from(([0, 0, 0, 0], args.https_port));

    let http_server = tokio::spawn(async move {
        info!(addr = %http_addr, allowed = "127.0.0.0/8", "HTTP listener starting");
        let listener = tokio::net::TcpListener::bind(http_addr).await?;
        axum::serve(
            listener,
            http_app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    });

    let https_server = tokio::spawn(async move {
        info!(addr = %https_addr, allowed = "192.168.0.0/16, 10.0.0.0/8", "HTTPS listener starting");
        axum_server::bind_rustls(https_addr, rustls_config)
            .serve(https_app.into_make_service_with_connect_info::<SocketAddr>())
            .await
    });

    // Run until a signal arrives or a listener dies; a dead listener is a
    // non-zero exit.
    let (listener, result) = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            std::process::exit(0);
        }
        result = http_server => ("HTTP", result),
        result = https_server => ("HTTPS", result),
    };

    match result {
        Ok(Err(err)) => error!(listener, error = %err, "listener failed"),
        Err(err) => error!(listener, error = %err, "listener task panicked"),
        Ok(Ok(())) => error!(listener, "listener exited unexpectedly"),
    }
    std::process::exit(1);
}
