// MIT License - Copyright (c) 2026 Peter Wright
// TCP state feed from the bus decoder

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::FeedConfig;
use crate::protocol::{KeyWrite, PanelUpdate};
use crate::source::PanelSource;
use crate::state::SecuritySnapshot;

/// Snapshot source fed by the bus decoder over TCP.
///
/// A background task owns the socket, parses feed lines and queues them in a
/// bounded channel. `poll` drains that channel into the snapshot. When the
/// dispatch loop falls behind and the queue fills, updates are dropped and the
/// next `poll` reports a buffer overflow.
pub struct FeedSource {
    snapshot: SecuritySnapshot,
    updates: mpsc::Receiver<PanelUpdate>,
    writes: mpsc::UnboundedSender<String>,
    overflow: Arc<AtomicBool>,
    feed_handle: Option<tokio::task::JoinHandle<()>>,
}

impl FeedSource {
    /// Start the feed task. Connection happens in the background and is
    /// retried every `reconnect_delay_ms`.
    pub fn spawn(config: &FeedConfig, partitions: usize) -> Self {
        let (update_tx, update_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let overflow = Arc::new(AtomicBool::new(false));

        let feed_handle = tokio::spawn(run_feed(
            config.addr.clone(),
            Duration::from_millis(config.reconnect_delay_ms),
            update_tx,
            write_rx,
            overflow.clone(),
        ));

        Self {
            snapshot: SecuritySnapshot::new(partitions),
            updates: update_rx,
            writes: write_tx,
            overflow,
            feed_handle: Some(feed_handle),
        }
    }
}

impl PanelSource for FeedSource {
    fn poll(&mut self) -> bool {
        let mut applied = false;
        if self.overflow.swap(false, Ordering::Relaxed) {
            self.snapshot.report_buffer_overflow();
            applied = true;
        }
        while let Ok(update) = self.updates.try_recv() {
            update.apply(&mut self.snapshot);
            applied = true;
        }
        applied
    }

    fn snapshot(&self) -> &SecuritySnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut SecuritySnapshot {
        &mut self.snapshot
    }

    fn write_keys(&mut self, partition: usize, keys: &str) {
        let line = match (KeyWrite {
            write: keys,
            partition: partition + 1,
        })
        .to_line()
        {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode keypad write: {e}");
                return;
            }
        };
        if self.writes.send(line).is_err() {
            warn!("Feed task has stopped; dropping keypad write {keys:?}");
        }
    }
}

impl Drop for FeedSource {
    fn drop(&mut self) {
        if let Some(handle) = self.feed_handle.take() {
            handle.abort();
        }
    }
}

/// Connect, read and reconnect until the receiving side goes away.
async fn run_feed(
    addr: String,
    reconnect_delay: Duration,
    updates: mpsc::Sender<PanelUpdate>,
    mut writes: mpsc::UnboundedReceiver<String>,
    overflow: Arc<AtomicBool>,
) {
    loop {
        info!("Connecting to bus decoder feed at {addr}");
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                info!("Bus decoder feed connected");
                // Keys typed while the feed was down are stale.
                while writes.try_recv().is_ok() {
                    warn!("Discarding keypad write queued while feed was disconnected");
                }
                if !serve_connection(stream, &updates, &mut writes, &overflow).await {
                    debug!("Feed consumer dropped, stopping feed task");
                    return;
                }
                warn!("Bus decoder feed disconnected");
            }
            Err(e) => {
                error!("Feed connect to {addr} failed: {e}");
            }
        }
        if updates.is_closed() {
            return;
        }
        sleep(reconnect_delay).await;
    }
}

/// Returns false once the consumer is gone, true when the connection dropped.
async fn serve_connection(
    stream: TcpStream,
    updates: &mpsc::Sender<PanelUpdate>,
    writes: &mut mpsc::UnboundedReceiver<String>,
    overflow: &AtomicBool,
) -> bool {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => return true,
                    Err(e) => {
                        error!("Feed read error: {e}");
                        return true;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let update = match PanelUpdate::parse(&line) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Skipping malformed feed line {line:?}: {e}");
                        continue;
                    }
                };
                match updates.try_send(update) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => overflow.store(true, Ordering::Relaxed),
                    Err(TrySendError::Closed(_)) => return false,
                }
            }
            write = writes.recv() => {
                let Some(line) = write else {
                    return false;
                };
                debug!("Feed write: {}", line.trim_end());
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    error!("Feed write error: {e}");
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_feed_applies_updates_and_writes_keys() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let config = FeedConfig {
            addr,
            reconnect_delay_ms: 50,
            queue_capacity: 16,
        };
        let mut source = FeedSource::spawn(&config, 2);

        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(b"{\"kind\":\"partition\",\"partition\":1,\"alarm\":true}\nnot json\n")
            .await
            .unwrap();

        let mut applied = false;
        for _ in 0..100 {
            if source.poll() {
                applied = true;
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert!(applied);
        assert!(source.snapshot().partition(0).unwrap().is_alarm());

        source.write_keys(0, "F");
        let mut lines = BufReader::new(reader).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"write":"F","partition":1}"#);
    }

    #[tokio::test]
    async fn test_overflow_reported_on_poll() {
        let (_update_tx, update_rx) = mpsc::channel(1);
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let overflow = Arc::new(AtomicBool::new(true));
        let mut source = FeedSource {
            snapshot: SecuritySnapshot::new(1),
            updates: update_rx,
            writes: write_tx,
            overflow,
            feed_handle: None,
        };
        assert!(source.poll());
        assert!(source.snapshot().buffer_overflow.is_raised());
        assert!(!source.poll());
    }
}
