// MIT License - Copyright (c) 2026 Peter Wright
// WebSocket protocol adapter

//! Client bookkeeping for the WebSocket display channel.
//!
//! The socket tasks in [`server`] report everything that happens on a
//! connection as a [`WsEvent`]; the dispatch loop feeds those events to
//! [`WsAdapter::handle_event`] and pushes rendered state changes back out
//! through each client's outbound channel. Reassembly state is kept per
//! client, so interleaved fragments from different clients never mix.

pub mod frame;
pub mod message;
pub mod server;

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::event::NotificationEvent;

pub use frame::{FrameAssembler, FrameInfo, Message, Opcode};
pub use message::{InboundCommand, parse_inbound};
pub use server::WsServer;

pub type ClientId = u64;

/// Items queued for a client's socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsOutbound {
    Text(String),
    Ping,
}

/// Everything the socket layer reports about a client.
#[derive(Debug)]
pub enum WsEvent {
    Connect {
        id: ClientId,
        sink: mpsc::UnboundedSender<WsOutbound>,
    },
    Disconnect {
        id: ClientId,
    },
    Error {
        id: ClientId,
        error: String,
    },
    Pong {
        id: ClientId,
    },
    Data {
        id: ClientId,
        info: FrameInfo,
        payload: Vec<u8>,
    },
}

/// What the dispatch loop must do in response to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// A client connected and needs the full display state
    Resync,
    /// Enter keys on the viewed partition
    WriteKeys(String),
    /// Display another partition (0-based)
    ViewPartition(usize),
}

struct Client {
    sink: mpsc::UnboundedSender<WsOutbound>,
    assembler: FrameAssembler,
}

/// Connected clients, their reassembly state and the keep-alive timer.
pub struct WsAdapter {
    clients: BTreeMap<ClientId, Client>,
    keepalive: Duration,
    next_keepalive: Option<Instant>,
}

impl WsAdapter {
    pub fn new(keepalive: Duration) -> Self {
        Self {
            clients: BTreeMap::new(),
            keepalive,
            next_keepalive: None,
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn keepalive_running(&self) -> bool {
        self.next_keepalive.is_some()
    }

    pub fn handle_event(&mut self, event: WsEvent, view_partition: usize) -> Option<InboundAction> {
        match event {
            WsEvent::Connect { id, sink } => self.on_connect(id, sink, view_partition),
            WsEvent::Disconnect { id } => {
                self.on_disconnect(id);
                None
            }
            WsEvent::Error { id, error } => {
                self.on_error(id, &error);
                None
            }
            WsEvent::Pong { id } => {
                debug!("WebSocket client {id} pong");
                None
            }
            WsEvent::Data { id, info, payload } => self.on_data(id, &info, &payload),
        }
    }

    fn on_connect(
        &mut self,
        id: ClientId,
        sink: mpsc::UnboundedSender<WsOutbound>,
        view_partition: usize,
    ) -> Option<InboundAction> {
        info!("WebSocket client {id} connected");
        let hello = message::connected(id, view_partition).to_string();
        if sink.send(WsOutbound::Text(hello)).is_err() || sink.send(WsOutbound::Ping).is_err() {
            debug!("WebSocket client {id} closed before greeting");
            return None;
        }
        self.clients.insert(
            id,
            Client {
                sink,
                assembler: FrameAssembler::new(),
            },
        );
        if self.next_keepalive.is_none() {
            self.next_keepalive = Some(Instant::now() + self.keepalive);
        }
        Some(InboundAction::Resync)
    }

    fn on_disconnect(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            info!("WebSocket client {id} disconnected");
        }
        if self.clients.is_empty() {
            self.next_keepalive = None;
        }
    }

    fn on_error(&mut self, id: ClientId, error: &str) {
        warn!("WebSocket client {id} error: {error}");
        if let Some(client) = self.clients.get_mut(&id) {
            client.assembler.reset();
        }
    }

    fn on_data(&mut self, id: ClientId, info: &FrameInfo, payload: &[u8]) -> Option<InboundAction> {
        let client = self.clients.get_mut(&id)?;
        let message = client.assembler.push(info, payload)?;
        if !message.is_text() {
            debug!("Ignoring binary message from WebSocket client {id}");
            return None;
        }
        match parse_inbound(&message.payload) {
            Ok(InboundCommand::Keypad { keys }) => {
                debug!("WebSocket client {id} keypad: {keys}");
                Some(InboundAction::WriteKeys(keys))
            }
            Ok(InboundCommand::ViewPartition(partition)) => {
                debug!("WebSocket client {id} views partition {}", partition + 1);
                Some(InboundAction::ViewPartition(partition))
            }
            Err(e) => {
                debug!("Dropping message from WebSocket client {id}: {e}");
                None
            }
        }
    }

    /// Push an event's display payloads to every client.
    pub fn broadcast(&mut self, event: &NotificationEvent) {
        if self.clients.is_empty() {
            return;
        }
        for payload in message::render(event) {
            self.send_all(&payload);
        }
    }

    fn send_all(&mut self, payload: &Value) {
        let text = payload.to_string();
        debug!("WebSocket push: {text}");
        self.clients.retain(|id, client| {
            let alive = client.sink.send(WsOutbound::Text(text.clone())).is_ok();
            if !alive {
                debug!("Dropping closed WebSocket client {id}");
            }
            alive
        });
        if self.clients.is_empty() {
            self.next_keepalive = None;
        }
    }

    /// Ping every client if the keep-alive interval has elapsed. Returns true if pinged.
    pub fn poll_keepalive(&mut self, now: Instant) -> bool {
        match self.next_keepalive {
            Some(due) if now >= due => {
                debug!("WebSocket keep-alive ping to {} clients", self.clients.len());
                self.clients
                    .retain(|_, client| client.sink.send(WsOutbound::Ping).is_ok());
                self.next_keepalive = if self.clients.is_empty() {
                    None
                } else {
                    Some(now + self.keepalive)
                };
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ZoneSet;

    fn connect(adapter: &mut WsAdapter, id: ClientId) -> mpsc::UnboundedReceiver<WsOutbound> {
        let (sink, rx) = mpsc::unbounded_channel();
        let action = adapter.handle_event(WsEvent::Connect { id, sink }, 0);
        assert_eq!(action, Some(InboundAction::Resync));
        rx
    }

    fn text(rx: &mut mpsc::UnboundedReceiver<WsOutbound>) -> Value {
        match rx.try_recv() {
            Ok(WsOutbound::Text(t)) => serde_json::from_str(&t).unwrap(),
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn data(id: ClientId, payload: &[u8]) -> WsEvent {
        WsEvent::Data {
            id,
            info: FrameInfo::whole(Opcode::Text, payload.len()),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_greets_and_pings() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let mut rx = connect(&mut adapter, 7);

        let hello = text(&mut rx);
        assert_eq!(hello["connected_id"], 7);
        assert_eq!(rx.try_recv().unwrap(), WsOutbound::Ping);
        assert_eq!(adapter.client_count(), 1);
        assert!(adapter.keepalive_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_command() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let _rx = connect(&mut adapter, 1);
        let action = adapter.handle_event(data(1, br#"{"btn_single_click":"fire_F"}"#), 0);
        assert_eq!(action, Some(InboundAction::WriteKeys("F".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragmented_command() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let _rx = connect(&mut adapter, 1);
        let payload = br#"{"btn_single_click":"arm_s"}"#;
        let split = 10;
        let first = WsEvent::Data {
            id: 1,
            info: FrameInfo {
                is_final: false,
                opcode: Opcode::Text,
                offset: 0,
                message_len: payload.len(),
            },
            payload: payload[..split].to_vec(),
        };
        let second = WsEvent::Data {
            id: 1,
            info: FrameInfo {
                is_final: true,
                opcode: Opcode::Continuation,
                offset: split,
                message_len: payload.len(),
            },
            payload: payload[split..].to_vec(),
        };
        assert_eq!(adapter.handle_event(first, 0), None);
        assert_eq!(
            adapter.handle_event(second, 0),
            Some(InboundAction::WriteKeys("s".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_and_unknown_ignored() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let mut rx = connect(&mut adapter, 1);
        let _ = text(&mut rx);
        let _ = rx.try_recv();

        assert_eq!(adapter.handle_event(data(1, b"{oops"), 0), None);
        assert_eq!(adapter.handle_event(data(1, br#"{"reboot":true}"#), 0), None);
        assert_eq!(adapter.handle_event(data(99, br#"{"btn_single_click":"a_b"}"#), 0), None);
        // Nothing is sent back to the client
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let mut a = connect(&mut adapter, 1);
        let mut b = connect(&mut adapter, 2);
        for rx in [&mut a, &mut b] {
            let _ = text(rx);
            let _ = rx.try_recv();
        }

        adapter.broadcast(&NotificationEvent::StatusTextChanged {
            partition: 0,
            code: 0x01,
        });
        assert_eq!(text(&mut a)["lcd_lower"], "Ready");
        assert_eq!(text(&mut b)["status_packet"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_client_dropped() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let rx = connect(&mut adapter, 1);
        drop(rx);
        adapter.broadcast(&NotificationEvent::ZoneOpenDelta {
            changed: ZoneSet::empty(),
            current: ZoneSet::empty(),
        });
        assert_eq!(adapter.client_count(), 0);
        assert!(!adapter.keepalive_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_lifecycle() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        assert!(!adapter.poll_keepalive(Instant::now()));

        let mut rx = connect(&mut adapter, 1);
        let _ = text(&mut rx);
        let _ = rx.try_recv();

        assert!(!adapter.poll_keepalive(Instant::now() + Duration::from_secs(299)));
        assert!(adapter.poll_keepalive(Instant::now() + Duration::from_secs(300)));
        assert_eq!(rx.try_recv().unwrap(), WsOutbound::Ping);

        adapter.handle_event(WsEvent::Disconnect { id: 1 }, 0);
        assert!(!adapter.keepalive_running());
        assert!(!adapter.poll_keepalive(Instant::now() + Duration::from_secs(10_000)));

        // Restarted by the next connect
        let _rx = connect(&mut adapter, 2);
        assert!(adapter.keepalive_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_partition_command() {
        let mut adapter = WsAdapter::new(Duration::from_secs(300));
        let _rx = connect(&mut adapter, 1);
        assert_eq!(
            adapter.handle_event(data(1, br#"{"view_partition":3}"#), 0),
            Some(InboundAction::ViewPartition(2))
        );
    }
}
