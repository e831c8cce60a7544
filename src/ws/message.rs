// MIT License - Copyright (c) 2026 Peter Wright
// WebSocket JSON wire format

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::constants::StatusText;
use crate::error::{NotifyError, Result};
use crate::event::NotificationEvent;
use crate::state::{ZONE_GROUPS, ZoneSet};

/// Commands a client may send. Exactly one key per message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClientMessage {
    /// `"<label>_<keys>"`; the label only identifies the button in the UI.
    BtnSingleClick(String),
    /// 1-based partition to display
    ViewPartition(usize),
}

/// A validated client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Keys to enter on the viewed partition's keypad
    Keypad { keys: String },
    /// Switch the viewed partition (0-based)
    ViewPartition(usize),
}

/// Parse one reassembled text message.
pub fn parse_inbound(payload: &[u8]) -> Result<InboundCommand> {
    let message: ClientMessage =
        serde_json::from_slice(payload).map_err(|e| NotifyError::MalformedInboundMessage {
            reason: e.to_string(),
        })?;

    match message {
        ClientMessage::BtnSingleClick(button) => match button.split_once('_') {
            Some((_, keys)) if !keys.is_empty() => Ok(InboundCommand::Keypad {
                keys: keys.to_string(),
            }),
            _ => Err(NotifyError::MalformedInboundMessage {
                reason: format!("button id {button:?} has no command"),
            }),
        },
        ClientMessage::ViewPartition(0) => Err(NotifyError::MalformedInboundMessage {
            reason: "partitions are numbered from 1".to_string(),
        }),
        ClientMessage::ViewPartition(n) => Ok(InboundCommand::ViewPartition(n - 1)),
    }
}

/// Identification payload sent to a new client.
pub fn connected(id: u64, view_partition: usize) -> Value {
    json!({ "connected_id": id, "partition": view_partition + 1 })
}

fn zone_groups(prefix: &str, zones: ZoneSet) -> Value {
    let fields: Map<String, Value> = (0..ZONE_GROUPS)
        .map(|group| (format!("{prefix}_{group}"), Value::from(zones.byte(group))))
        .collect();
    Value::Object(fields)
}

/// Push payloads for an event. Events with no display counterpart render nothing.
pub fn render(event: &NotificationEvent) -> Vec<Value> {
    match event {
        NotificationEvent::LightsChanged { lights, .. } => {
            vec![json!({ "lights": lights.bits() })]
        }
        NotificationEvent::StatusTextChanged { code, .. } => {
            vec![json!({ "status_packet": code, "lcd_lower": StatusText::for_code(*code) })]
        }
        NotificationEvent::ZoneOpenDelta { current, .. } => vec![zone_groups("open_zone", *current)],
        NotificationEvent::ZoneAlarmDelta { current, .. } => {
            vec![zone_groups("alarm_zone", *current)]
        }
        NotificationEvent::PowerChanged { trouble } => {
            let text = if *trouble { "AC power trouble" } else { "AC power restored" };
            vec![json!({ "lcd_lower": text })]
        }
        NotificationEvent::BatteryChanged { trouble } => {
            let text = if *trouble { "Battery trouble" } else { "Battery restored" };
            vec![json!({ "lcd_lower": text })]
        }
        _ => Vec::new(),
    }
}
