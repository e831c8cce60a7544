// MIT License - Copyright (c) 2026 Peter Wright
// Inbound WebSocket message reassembly

use tracing::debug;

/// Largest inbound message accepted. Commands are a few dozen bytes.
pub const MAX_MESSAGE_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Text,
    Binary,
    Continuation,
}

/// Describes one chunk of an inbound message as delivered by the socket layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Chunk belongs to the final frame of the message
    pub is_final: bool,
    pub opcode: Opcode,
    /// Byte offset of this chunk within the message
    pub offset: usize,
    /// Total announced message length
    pub message_len: usize,
}

impl FrameInfo {
    /// A message delivered in a single chunk.
    pub fn whole(opcode: Opcode, len: usize) -> Self {
        Self {
            is_final: true,
            opcode,
            offset: 0,
            message_len: len,
        }
    }
}

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn is_text(&self) -> bool {
        self.opcode == Opcode::Text
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Accumulating {
        opcode: Opcode,
        expected: usize,
        buf: Vec<u8>,
    },
}

/// Reassembles chunks for a single client.
///
/// A message is handed out only once a final chunk brings the received byte
/// count up to the announced length. Chunks that do not continue exactly where
/// the previous one ended abandon the partial message.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    state: State,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Bytes accumulated for the message in progress.
    pub fn received(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Accumulating { buf, .. } => buf.len(),
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Feed one chunk. Returns the message once it is complete.
    pub fn push(&mut self, info: &FrameInfo, chunk: &[u8]) -> Option<Message> {
        if info.message_len > MAX_MESSAGE_LEN {
            debug!("Discarding oversized WebSocket message ({} bytes)", info.message_len);
            self.reset();
            return None;
        }

        let in_sequence = match &self.state {
            State::Idle => info.offset == 0,
            State::Accumulating { expected, buf, .. } => {
                info.offset == buf.len() && info.message_len == *expected
            }
        };
        if !in_sequence {
            debug!(
                "Out-of-order WebSocket chunk at offset {} ({} bytes held)",
                info.offset,
                self.received()
            );
            self.reset();
            if info.offset != 0 {
                return None;
            }
        }

        if self.is_idle() {
            if info.opcode == Opcode::Continuation {
                debug!("WebSocket continuation without a message start");
                return None;
            }
            self.state = State::Accumulating {
                opcode: info.opcode,
                expected: info.message_len,
                buf: Vec::with_capacity(info.message_len),
            };
        }

        let State::Accumulating {
            opcode,
            expected,
            buf,
        } = &mut self.state
        else {
            return None;
        };
        buf.extend_from_slice(chunk);
        if buf.len() > *expected {
            debug!("WebSocket chunk overran announced length {expected}");
            self.reset();
            return None;
        }
        if !(info.is_final && buf.len() == *expected) {
            return None;
        }

        let message = Message {
            opcode: *opcode,
            payload: std::mem::take(buf),
        };
        self.reset();
        Some(message)
    }
}
