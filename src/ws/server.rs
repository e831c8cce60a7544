// MIT License - Copyright (c) 2026 Peter Wright
// WebSocket listener and per-client socket tasks

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WireMessage;
use tracing::{debug, error, info};

use super::{ClientId, FrameInfo, Opcode, WsEvent, WsOutbound};
use crate::error::Result;

/// Accepts WebSocket clients and relays their traffic as [`WsEvent`]s.
///
/// The socket tasks own no display state. They forward what they receive to
/// the dispatch loop and write whatever the loop queues on the client's
/// outbound channel.
pub struct WsServer {
    listener: TcpListener,
    events: mpsc::UnboundedSender<WsEvent>,
    next_id: ClientId,
}

impl WsServer {
    pub async fn bind(addr: &str, events: mpsc::UnboundedSender<WsEvent>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("WebSocket server listening on ws://{}", listener.local_addr()?);
        Ok(Self {
            listener,
            events,
            next_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until the event receiver goes away.
    pub async fn run(mut self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    if self.events.is_closed() {
                        break;
                    }
                    let id = self.next_id;
                    self.next_id += 1;
                    tokio::spawn(handle_client(id, stream, peer, self.events.clone()));
                }
                Err(e) => error!("Failed to accept WebSocket connection: {e}"),
            }
        }
        info!("WebSocket server stopped");
    }
}

async fn handle_client(
    id: ClientId,
    stream: TcpStream,
    peer: SocketAddr,
    events: mpsc::UnboundedSender<WsEvent>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake with {peer} failed: {e}");
            return;
        }
    };
    debug!("WebSocket client {id} at {peer}");

    let (mut sender, mut receiver) = ws.split();
    let (sink, mut outbound) = mpsc::unbounded_channel();
    if events.send(WsEvent::Connect { id, sink }).is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let event = match incoming {
                    Some(Ok(WireMessage::Text(text))) => data_event(id, Opcode::Text, text.into_bytes()),
                    Some(Ok(WireMessage::Binary(bytes))) => data_event(id, Opcode::Binary, bytes),
                    Some(Ok(WireMessage::Pong(_))) => WsEvent::Pong { id },
                    Some(Ok(WireMessage::Ping(_))) | Some(Ok(WireMessage::Frame(_))) => continue,
                    Some(Ok(WireMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        let _ = events.send(WsEvent::Error { id, error: e.to_string() });
                        break;
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            queued = outbound.recv() => {
                let wire = match queued {
                    Some(WsOutbound::Text(text)) => WireMessage::Text(text),
                    Some(WsOutbound::Ping) => WireMessage::Ping(Vec::new()),
                    None => break,
                };
                if let Err(e) = sender.send(wire).await {
                    let _ = events.send(WsEvent::Error { id, error: e.to_string() });
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
    let _ = events.send(WsEvent::Disconnect { id });
}

/// tungstenite hands over whole messages, so each one is a single final chunk.
fn data_event(id: ClientId, opcode: Opcode, payload: Vec<u8>) -> WsEvent {
    WsEvent::Data {
        id,
        info: FrameInfo::whole(opcode, payload.len()),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    #[tokio::test]
    async fn test_client_roundtrip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let server = WsServer::bind("127.0.0.1:0", tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        let (mut client, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        let Some(WsEvent::Connect { id, sink }) = rx.recv().await else {
            panic!("expected connect");
        };
        sink.send(WsOutbound::Text(r#"{"connected_id":1}"#.into()))
            .unwrap();
        let received = client.next().await.unwrap().unwrap();
        assert_eq!(received, WireMessage::Text(r#"{"connected_id":1}"#.into()));

        client
            .send(WireMessage::Text(r#"{"btn_single_click":"fire_F"}"#.into()))
            .await
            .unwrap();
        match rx.recv().await {
            Some(WsEvent::Data { id: from, info, payload }) => {
                assert_eq!(from, id);
                assert!(info.is_final);
                assert_eq!(info.message_len, payload.len());
                assert_eq!(payload, br#"{"btn_single_click":"fire_F"}"#);
            }
            other => panic!("expected data, got {other:?}"),
        }

        client.close(None).await.unwrap();
        loop {
            match rx.recv().await {
                Some(WsEvent::Disconnect { id: gone }) => {
                    assert_eq!(gone, id);
                    break;
                }
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }
    }

    #[tokio::test]
    async fn test_rebind_after_aborted_run() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let server = WsServer::bind("127.0.0.1:0", tx).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.run());
        tokio::task::yield_now().await;

        handle.abort();
        let _ = handle.await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let rebound = WsServer::bind(&addr.to_string(), tx).await;
        assert!(rebound.is_ok(), "rebind failed: {:?}", rebound.err());
    }
}
