// MIT License - Copyright (c) 2026 Peter Wright
// Configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{NotifyError, Result};
use crate::state::MAX_PARTITIONS;

/// Top-level configuration, loaded from TOML.
///
/// ```toml
/// [smtp]
/// host = "smtp.example.com"
/// username = "panel@example.com"
/// password = "secret"
/// from = "panel@example.com"
/// to = ["me@example.com"]
///
/// [feed]
/// addr = "127.0.0.1:4001"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.smtp.enabled && self.smtp.to.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "smtp.to must list at least one recipient".to_string(),
            ));
        }
        if self.smtp.enabled && self.smtp.host.is_empty() {
            return Err(NotifyError::InvalidConfig("smtp.host is empty".to_string()));
        }
        let partitions = self.dispatch.partitions;
        if partitions == 0 || partitions > MAX_PARTITIONS {
            return Err(NotifyError::InvalidConfig(format!(
                "dispatch.partitions must be 1-{MAX_PARTITIONS}, got {partitions}"
            )));
        }
        let view = self.dispatch.view_partition;
        if view == 0 || view > partitions {
            return Err(NotifyError::InvalidConfig(format!(
                "dispatch.view_partition must be 1-{partitions}, got {view}"
            )));
        }
        if self.websocket.keepalive_secs == 0 {
            return Err(NotifyError::InvalidConfig(
                "websocket.keepalive_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// SMTP account used for email notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Implicit TLS (SMTPS). Disable only for a local relay.
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Name sent in `HELO`
    #[serde(default = "default_helo")]
    pub helo: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    /// Per-reply timeout
    #[serde(default = "default_smtp_timeout")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_smtp_port() -> u16 {
    465
}
fn default_helo() -> String {
    "keybus-notify".to_string()
}
fn default_smtp_timeout() -> u64 {
    3000
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: String::new(),
            port: default_smtp_port(),
            tls: true,
            helo: default_helo(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: Vec::new(),
            timeout_ms: default_smtp_timeout(),
        }
    }
}

impl SmtpConfig {
    pub fn builder() -> SmtpConfigBuilder {
        SmtpConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builder for SmtpConfig.
#[derive(Debug, Clone, Default)]
pub struct SmtpConfigBuilder {
    config: SmtpConfig,
}

impl SmtpConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.config.tls = tls;
        self
    }

    pub fn helo(mut self, helo: impl Into<String>) -> Self {
        self.config.helo = helo.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.config.from = from.into();
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.config.to.push(to.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn build(self) -> SmtpConfig {
        self.config
    }
}

/// WebSocket push/command server.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_bind")]
    pub bind: String,
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

fn default_ws_bind() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_keepalive() -> u64 {
    300
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind: default_ws_bind(),
            keepalive_secs: default_keepalive(),
        }
    }
}

impl WebSocketConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

/// Connection to the bus decoder's state feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub addr: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Updates buffered between ticks before the feed starts dropping them
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_reconnect_delay() -> u64 {
    5000
}
fn default_queue_capacity() -> usize {
    256
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// 1-based partition shown to WebSocket clients
    #[serde(default = "default_view_partition")]
    pub view_partition: usize,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_partitions() -> usize {
    MAX_PARTITIONS
}
fn default_view_partition() -> usize {
    1
}
fn default_tick_interval() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            view_partition: default_view_partition(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}
