// MIT License - Copyright (c) 2026 Peter Wright
// Line-oriented transport for the SMTP session

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::error::{NotifyError, Result};

/// A CRLF line transport the SMTP session drives.
///
/// `read_line` waits at most `wait` and returns `None` when nothing complete
/// arrived, so the caller can interleave other work between short waits.
#[allow(async_fn_in_trait)]
pub trait LineTransport {
    async fn connect(&mut self, host: &str, port: u16, tls: bool) -> Result<()>;

    /// Send one line; the transport appends CRLF.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Next complete line without its terminator, or `None` if `wait` elapsed first.
    async fn read_line(&mut self, wait: Duration) -> Result<Option<String>>;

    /// Drop anything already received but not yet read.
    fn discard_input(&mut self);

    async fn close(&mut self);
}

trait Conn: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Conn for T {}

/// TCP transport with optional implicit TLS (SMTPS).
pub struct TcpLineTransport {
    stream: Option<BufReader<Box<dyn Conn>>>,
    partial: Vec<u8>,
    connect_timeout: Duration,
    tls_config: Option<Arc<ClientConfig>>,
}

impl TcpLineTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            partial: Vec::new(),
            connect_timeout,
            tls_config: None,
        }
    }

    fn tls_connector(&mut self) -> TlsConnector {
        let config = self
            .tls_config
            .get_or_insert_with(|| {
                let mut roots = RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                Arc::new(
                    ClientConfig::builder()
                        .with_root_certificates(roots)
                        .with_no_client_auth(),
                )
            })
            .clone();
        TlsConnector::from(config)
    }

    fn stream(&mut self) -> Result<&mut BufReader<Box<dyn Conn>>> {
        self.stream.as_mut().ok_or(NotifyError::NotConnected)
    }
}

impl LineTransport for TcpLineTransport {
    async fn connect(&mut self, host: &str, port: u16, tls: bool) -> Result<()> {
        self.close().await;
        let connect_err = |source: io::Error| NotifyError::TransportConnect {
            host: host.to_string(),
            port,
            source,
        };

        let tcp = match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(e)) => return Err(connect_err(e)),
            Err(_) => return Err(connect_err(io::ErrorKind::TimedOut.into())),
        };
        debug!("SMTP TCP connected to {host}:{port}");

        let conn: Box<dyn Conn> = if tls {
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|e| NotifyError::Tls(format!("invalid server name {host}: {e}")))?;
            let connector = self.tls_connector();
            match timeout(self.connect_timeout, connector.connect(server_name, tcp)).await {
                Ok(Ok(tls_stream)) => Box::new(tls_stream),
                Ok(Err(e)) => return Err(connect_err(e)),
                Err(_) => return Err(connect_err(io::ErrorKind::TimedOut.into())),
            }
        } else {
            Box::new(tcp)
        };

        self.stream = Some(BufReader::new(conn));
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream()?;
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, wait: Duration) -> Result<Option<String>> {
        let stream = self.stream.as_mut().ok_or(NotifyError::NotConnected)?;
        // read_until keeps partial data in `partial` if the wait expires mid-line.
        match timeout(wait, stream.read_until(b'\n', &mut self.partial)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(_)) if !self.partial.ends_with(b"\n") => Err(NotifyError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ))),
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&self.partial).trim_end().to_string();
                self.partial.clear();
                Ok(Some(line))
            }
        }
    }

    fn discard_input(&mut self) {
        self.partial.clear();
        if let Some(stream) = self.stream.as_mut() {
            let buffered = stream.buffer().len();
            Pin::new(stream).consume(buffered);
        }
    }

    async fn close(&mut self) {
        self.partial.clear();
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!("SMTP transport closed");
        }
    }
}
