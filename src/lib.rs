// MIT License - Copyright (c) 2026 Peter Wright
// Security panel notifier
//
//! # keybus-notify
//!
//! Turns a live security panel state feed into notifications: an email per
//! significant event over SMTP, and a JSON push channel over WebSocket that
//! also accepts keypad commands from its clients.
//!
//! The bus decoder itself is external. It produces a [`SecuritySnapshot`]
//! with one-shot change flags; the [`DiffEngine`] consumes those flags exactly
//! once per change and emits [`NotificationEvent`]s, which the [`Dispatcher`]
//! hands to the WebSocket adapter and the SMTP session.
//!
//! ## Quick Start
//!
//! ```no_run
//! use keybus_notify::{Config, Dispatcher, FeedSource, TcpLineTransport, WsServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_toml(&std::fs::read_to_string("config.toml")?)?;
//!
//!     let source = FeedSource::spawn(&config.feed, config.dispatch.partitions);
//!     let (ws_tx, ws_rx) = tokio::sync::mpsc::unbounded_channel();
//!     tokio::spawn(WsServer::bind(&config.websocket.bind, ws_tx).await?.run());
//!
//!     let transport = TcpLineTransport::new(config.smtp.timeout());
//!     let mut dispatcher = Dispatcher::new(&config, source, transport, ws_rx);
//!     dispatcher.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod protocol;
pub mod smtp;
pub mod source;
pub mod state;
pub mod ws;

// Re-exports for convenience
pub use config::{Config, DispatchConfig, FeedConfig, SmtpConfig, SmtpConfigBuilder, WebSocketConfig};
pub use constants::{StatusText, status_text};
pub use dispatcher::Dispatcher;
pub use engine::{DiffEngine, DispatchContext};
pub use error::{NotifyError, Result};
pub use event::{EmailMessage, NotificationEvent};
pub use protocol::PanelUpdate;
pub use smtp::{LineTransport, SmtpSession, TcpLineTransport};
pub use source::{FeedSource, PanelSource};
pub use state::{Edge, LightFlags, OneShot, SecuritySnapshot, ZoneSet};
pub use ws::{InboundAction, WsAdapter, WsEvent, WsOutbound, WsServer};
