// MIT License - Copyright (c) 2026 Peter Wright
// Notifier daemon

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::info;

use keybus_notify::{Config, Dispatcher, FeedSource, TcpLineTransport, WsServer};

#[derive(Parser)]
#[command(name = "keybus-notify")]
#[command(about = "Email and WebSocket notifications for a Keybus security panel")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {path}"))?;
    Config::from_toml(&text).context("Failed to parse config file")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=keybus_notify=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let config = load_config(&cli.config)?;

        info!("Connecting to bus decoder feed at {}", config.feed.addr);
        let source = FeedSource::spawn(&config.feed, config.dispatch.partitions);

        let (ws_tx, ws_rx) = mpsc::unbounded_channel();
        let server = WsServer::bind(&config.websocket.bind, ws_tx)
            .await
            .with_context(|| format!("Failed to bind WebSocket server on {}", config.websocket.bind))?;
        let server_handle = tokio::spawn(server.run());

        if config.smtp.enabled {
            info!(
                "Email notifications via {}:{} to {}",
                config.smtp.host,
                config.smtp.port,
                config.smtp.to.join(", ")
            );
        } else {
            info!("Email notifications disabled");
        }
        let transport = TcpLineTransport::new(config.smtp.timeout());
        let mut dispatcher = Dispatcher::new(&config, source, transport, ws_rx);

        info!("Notifier running. Send SIGHUP to reload, SIGINT/SIGTERM to stop.");
        let restart = dispatcher
            .run(async {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received SIGINT, shutting down...");
                        false
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down...");
                        false
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, reloading config and restarting...");
                        true
                    }
                }
            })
            .await;

        // The listener is only released once the aborted task has been dropped.
        server_handle.abort();
        let _ = server_handle.await;
        // Dropping the source stops its feed task.
        drop(dispatcher);

        if !restart {
            break;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
