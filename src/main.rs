//! LinguaHub realtime client — connects to a LinguaHub server and tails
//! every realtime event to the terminal.
//!
//! Acts as the composition root: loads configuration, initializes
//! logging, and wires the token provider into the connection manager.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use linguahub_core::config::ClientConfig;
use linguahub_core::error::AppError;
use linguahub_core::traits::token::TokenProvider;
use linguahub_realtime::{RealtimeClient, WsConnector};

#[derive(Debug, Parser)]
#[command(
    name = "linguahub-client",
    about = "Tail realtime events from a LinguaHub server"
)]
struct Args {
    /// Configuration environment (merges config/default.toml with
    /// config/<env>.toml).
    #[arg(long, default_value = "development")]
    env: String,
    /// Override the WebSocket endpoint from configuration.
    #[arg(long)]
    endpoint: Option<String>,
    /// Bearer token; falls back to the LINGUAHUB_TOKEN environment
    /// variable when omitted.
    #[arg(long)]
    token: Option<String>,
}

/// Token accessor backed by a CLI flag or the process environment.
struct CliTokenProvider {
    explicit: Option<String>,
}

impl TokenProvider for CliTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.explicit
            .clone()
            .or_else(|| std::env::var("LINGUAHUB_TOKEN").ok())
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ClientConfig::load(&args.env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(false).init();
        }
    }
}

async fn run(config: ClientConfig, args: Args) -> Result<(), AppError> {
    let endpoint = args.endpoint.unwrap_or_else(|| config.endpoint.clone());
    let tokens = Arc::new(CliTokenProvider {
        explicit: args.token,
    });

    let client = Arc::new(RealtimeClient::new(
        &endpoint,
        config.realtime.clone(),
        Arc::new(WsConnector::new()),
        tokens,
    ));

    let _messages = client.on_message(|msg| {
        tracing::info!(
            kind = %msg.kind,
            payload = %serde_json::Value::Object(msg.data.clone()),
            "event"
        );
    });
    let _errors = client.on_error(|err| {
        tracing::warn!(error = %err, "connection error");
    });
    let _status = client.on_status_change(|connected| {
        tracing::info!(connected, "connection status changed");
    });
    let _auth = client.on_auth_error(|reason| {
        tracing::error!(reason = %reason, "authentication rejected, re-login required");
    });

    tracing::info!(endpoint = %endpoint, "connecting");
    client.connect().await?;

    // Lines typed on stdin are sent to the server as raw JSON payloads.
    let sender = Arc::clone(&client);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(payload) => sender.send(&payload),
                Err(e) => tracing::warn!(error = %e, "input is not valid JSON, ignored"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    client.disconnect();
    Ok(())
}
