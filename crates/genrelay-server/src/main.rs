//! genrelay Server
//!
//! Streams generations from an Ollama-compatible backend to HTTP callers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use genrelay_core::config::{self, Config};
use genrelay_core::tracing_init::init_tracing;
use genrelay_server::relay::RelayOptions;
use genrelay_server::routes::{AppState, build_router};
use genrelay_server::upstream::OllamaClient;

#[derive(Parser, Debug)]
#[command(name = "genrelay")]
#[command(version, about = "genrelay server - streams backend generations as server-sent events")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "GENRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Base URL of the generation backend.
    #[arg(long)]
    upstream_url: Option<String>,

    /// Model name sent with every request.
    #[arg(long)]
    model: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Do not send a `start` event before streaming.
    #[arg(long)]
    no_start_event: bool,

    /// Do not send an `end` event on completion.
    #[arg(long)]
    no_end_event: bool,
}

impl Args {
    /// CLI flags take precedence over every config layer.
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr.to_string();
        }
        if let Some(url) = &self.upstream_url {
            config.upstream.base_url.clone_from(url);
        }
        if let Some(model) = &self.model {
            config.upstream.model.clone_from(model);
        }
        if self.no_start_event {
            config.relay.emit_start = false;
        }
        if self.no_end_event {
            config.relay.emit_end = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config::validate(&config)?;

    init_tracing(&config.server.log_level, args.log_json);

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.addr))?;

    let client = OllamaClient::new(&config.upstream)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        upstream = client.generate_url(),
        model = %config.upstream.model,
        "Starting genrelay"
    );

    let app = build_router(AppState {
        backend: Arc::new(client),
        model: config.upstream.model.clone(),
        options: RelayOptions::from(&config.relay),
        channel_capacity: config.relay.channel_capacity,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("genrelay stopped");
    Ok(())
}
