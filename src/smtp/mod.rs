// MIT License - Copyright (c) 2026 Peter Wright
// SMTP notification session

//! One-shot SMTP conversation per notification.
//!
//! The session walks greeting, HELO, AUTH LOGIN, MAIL FROM, RCPT TO, DATA and
//! QUIT in order. Every reply wait is cut into short slices and the panel
//! source is polled on each slice, so bus decoding keeps up while a mail is
//! in flight. A timeout closes the connection at once; a rejected command
//! gets a best-effort QUIT first.

pub mod transport;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::SmtpConfig;
use crate::error::{NotifyError, Result};
use crate::source::PanelSource;

pub use transport::{LineTransport, TcpLineTransport};

/// Longest single wait between source polls.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// Sends notification emails through a [`LineTransport`].
pub struct SmtpSession<T: LineTransport> {
    config: SmtpConfig,
    transport: T,
    sent: u64,
    failed: u64,
}

impl SmtpSession<TcpLineTransport> {
    /// Session over a real TCP (optionally TLS) connection.
    pub fn tcp(config: SmtpConfig) -> Self {
        let transport = TcpLineTransport::new(config.timeout());
        Self::new(config, transport)
    }
}

impl<T: LineTransport> SmtpSession<T> {
    pub fn new(config: SmtpConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            sent: 0,
            failed: 0,
        }
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Emails delivered since startup
    pub fn sessions_sent(&self) -> u64 {
        self.sent
    }

    /// Emails abandoned since startup
    pub fn sessions_failed(&self) -> u64 {
        self.failed
    }

    /// Run a complete SMTP conversation for one message.
    ///
    /// Returns true once the server accepted the message body. Failures are
    /// logged and counted, never propagated.
    pub async fn send_notification<S>(&mut self, subject: &str, body: &str, source: &mut S) -> bool
    where
        S: PanelSource + ?Sized,
    {
        match self.run(subject, body, source).await {
            Ok(()) => {
                self.sent += 1;
                info!("Email sent: {subject}");
                true
            }
            Err(e) => {
                self.failed += 1;
                if e.is_retryable() {
                    error!("Email \"{subject}\" failed: {e}");
                } else {
                    warn!("Email \"{subject}\" refused: {e}");
                }
                false
            }
        }
    }

    async fn run<S>(&mut self, subject: &str, body: &str, source: &mut S) -> Result<()>
    where
        S: PanelSource + ?Sized,
    {
        let (host, port, tls) = (self.config.host.clone(), self.config.port, self.config.tls);
        if let Err(e) = self.transport.connect(&host, port, tls).await {
            self.transport.close().await;
            return Err(e);
        }
        debug!("SMTP connected to {host}:{port}");

        let result = self.converse(subject, body, source).await;
        match &result {
            Ok(()) => self.quit(source).await,
            Err(NotifyError::ProtocolRejection { .. }) => self.quit(source).await,
            Err(_) => {}
        }
        self.transport.close().await;
        result
    }

    async fn converse<S>(&mut self, subject: &str, body: &str, source: &mut S) -> Result<()>
    where
        S: PanelSource + ?Sized,
    {
        self.expect_reply("greeting", source).await?;

        let helo = format!("HELO {}", self.config.helo);
        self.command(&helo, "HELO", source).await?;

        self.command("AUTH LOGIN", "AUTH LOGIN", source).await?;
        let username = STANDARD.encode(&self.config.username);
        self.secret(&username, "AUTH username", source).await?;
        let password = STANDARD.encode(&self.config.password);
        self.secret(&password, "AUTH password", source).await?;

        let mail_from = format!("MAIL FROM:<{}>", self.config.from);
        self.command(&mail_from, "MAIL FROM", source).await?;
        for recipient in self.config.to.clone() {
            self.command(&format!("RCPT TO:<{recipient}>"), "RCPT TO", source)
                .await?;
        }

        self.command("DATA", "DATA", source).await?;
        for line in compose_message(&self.config, subject, body) {
            self.transport.write_line(&line).await?;
        }
        self.command(".", "message body", source).await?;
        Ok(())
    }

    /// Best-effort QUIT; its outcome never changes the session result.
    async fn quit<S>(&mut self, source: &mut S)
    where
        S: PanelSource + ?Sized,
    {
        if let Err(e) = self.transport.write_line("QUIT").await {
            debug!("SMTP QUIT not sent: {e}");
            return;
        }
        if let Err(e) = self.expect_reply("QUIT", source).await {
            debug!("SMTP QUIT not acknowledged: {e}");
        }
    }

    async fn command<S>(&mut self, line: &str, stage: &'static str, source: &mut S) -> Result<String>
    where
        S: PanelSource + ?Sized,
    {
        debug!("SMTP > {line}");
        self.transport.write_line(line).await?;
        self.expect_reply(stage, source).await
    }

    async fn secret<S>(&mut self, line: &str, stage: &'static str, source: &mut S) -> Result<String>
    where
        S: PanelSource + ?Sized,
    {
        debug!("SMTP > <{stage}>");
        self.transport.write_line(line).await?;
        self.expect_reply(stage, source).await
    }

    /// Wait for a complete reply, reading through `NNN-` continuation lines.
    async fn expect_reply<S>(&mut self, stage: &'static str, source: &mut S) -> Result<String>
    where
        S: PanelSource + ?Sized,
    {
        let deadline = Instant::now() + self.config.timeout();
        let first = self.next_line(deadline, stage, source).await?;
        let mut last = first.clone();
        while is_continuation(&last) {
            last = self.next_line(deadline, stage, source).await?;
        }
        self.transport.discard_input();
        debug!("SMTP < {first}");

        if is_success(&first) {
            Ok(first)
        } else {
            warn!("SMTP {stage} rejected: {first}");
            Err(NotifyError::ProtocolRejection {
                stage,
                reply: first,
            })
        }
    }

    async fn next_line<S>(&mut self, deadline: Instant, stage: &'static str, source: &mut S) -> Result<String>
    where
        S: PanelSource + ?Sized,
    {
        loop {
            source.poll();
            let now = Instant::now();
            if now >= deadline {
                return Err(NotifyError::ProtocolTimeout { stage });
            }
            let wait = POLL_SLICE.min(deadline - now);
            if let Some(line) = self.transport.read_line(wait).await? {
                return Ok(line);
            }
        }
    }
}

/// 2xx and 3xx replies move the conversation forward.
fn is_success(reply: &str) -> bool {
    matches!(reply.as_bytes().first(), Some(b'2') | Some(b'3'))
}

fn is_continuation(reply: &str) -> bool {
    reply.as_bytes().get(3) == Some(&b'-')
}

/// Headers, blank separator and dot-stuffed body, without the terminating ".".
fn compose_message(config: &SmtpConfig, subject: &str, body: &str) -> Vec<String> {
    let mut lines = vec![
        format!("From: <{}>", config.from),
        format!("To: {}", config.to.join(", ")),
        format!("Subject: {subject}"),
        format!("Date: {}", chrono::Local::now().to_rfc2822()),
        String::new(),
    ];
    lines.extend(body.lines().map(|line| {
        if line.starts_with('.') {
            format!(".{line}")
        } else {
            line.to_string()
        }
    }));
    lines
}
