// Schema validation tests for the WebSocket wire format
//
// Hand-written JSON values pin the format independently of the Rust code;
// the rendered_* tests check that what the library produces conforms too.

use keybus_notify::NotificationEvent;
use keybus_notify::state::{LightFlags, ZoneSet};
use keybus_notify::ws::message::{connected, parse_inbound, render};
use serde_json::json;

fn load_schema(name: &str) -> serde_json::Value {
    let path = format!("{}/schemas/ws/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::options()
        .with_retriever(LocalRetriever)
        .build(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &serde_json::Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

// Resolves relative $refs against schemas/ws/
struct LocalRetriever;

impl jsonschema::Retrieve for LocalRetriever {
    fn retrieve(
        &self,
        uri: &jsonschema::Uri<String>,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        let filename = uri_str.strip_prefix("json-schema:///").unwrap_or(uri_str);
        let path = format!("{}/schemas/ws/{filename}", env!("CARGO_MANIFEST_DIR"));
        if std::path::Path::new(&path).exists() {
            let text = std::fs::read_to_string(&path)?;
            return Ok(serde_json::from_str(&text)?);
        }
        Err(format!("Cannot retrieve schema: {uri_str}").into())
    }
}

// =========================================================================
// Server to client
// =========================================================================

#[test]
fn connected_valid() {
    validate("connected.schema.json", &json!({ "connected_id": 4, "partition": 1 }));
    validate("connected.schema.json", &json!({ "connected_id": 0 }));
}

#[test]
fn connected_rejects_partition_zero() {
    validate_fails("connected.schema.json", &json!({ "connected_id": 4, "partition": 0 }));
}

#[test]
fn status_valid_text_and_code() {
    validate(
        "status.schema.json",
        &json!({ "status_packet": 5, "lcd_lower": "Armed away" }),
    );
    validate(
        "status.schema.json",
        &json!({ "status_packet": 255, "lcd_lower": 255 }),
    );
}

#[test]
fn status_requires_display_text() {
    validate_fails("status.schema.json", &json!({ "status_packet": 5 }));
    validate_fails(
        "status.schema.json",
        &json!({ "status_packet": 256, "lcd_lower": "Ready" }),
    );
}

#[test]
fn zones_valid() {
    validate(
        "open_zones.schema.json",
        &json!({
            "open_zone_0": 1, "open_zone_1": 0, "open_zone_2": 128, "open_zone_3": 0,
            "open_zone_4": 0, "open_zone_5": 0, "open_zone_6": 0, "open_zone_7": 255
        }),
    );
}

#[test]
fn zones_reject_partial_and_mixed() {
    validate_fails("open_zones.schema.json", &json!({ "open_zone_0": 1 }));
    validate_fails(
        "alarm_zones.schema.json",
        &json!({
            "alarm_zone_0": 0, "alarm_zone_1": 0, "alarm_zone_2": 0, "alarm_zone_3": 0,
            "alarm_zone_4": 0, "alarm_zone_5": 0, "alarm_zone_6": 0, "open_zone_7": 0
        }),
    );
}

#[test]
fn trouble_text_valid() {
    validate("trouble.schema.json", &json!({ "lcd_lower": "AC power trouble" }));
    validate_fails("trouble.schema.json", &json!({ "lcd_lower": "Ready" }));
}

#[test]
fn push_accepts_every_kind() {
    for instance in [
        json!({ "connected_id": 1, "partition": 2 }),
        json!({ "lights": 129 }),
        json!({ "status_packet": 1, "lcd_lower": "Ready" }),
        json!({ "lcd_lower": "Battery restored" }),
    ] {
        validate("push.schema.json", &instance);
    }
    validate_fails("push.schema.json", &json!({ "lights": 1, "extra": true }));
}

#[test]
fn rendered_payloads_conform() {
    let zones = ZoneSet::from_bytes([0x03, 0, 0, 0, 0, 0, 0, 0x80]);
    let events = [
        NotificationEvent::LightsChanged {
            partition: 0,
            lights: LightFlags::READY | LightFlags::BACKLIGHT,
        },
        NotificationEvent::StatusTextChanged { partition: 0, code: 0x05 },
        NotificationEvent::StatusTextChanged { partition: 0, code: 0xFF },
        NotificationEvent::ZoneOpenDelta { changed: zones, current: zones },
        NotificationEvent::ZoneAlarmDelta {
            changed: ZoneSet::empty(),
            current: zones,
        },
        NotificationEvent::PowerChanged { trouble: false },
        NotificationEvent::BatteryChanged { trouble: true },
    ];
    for event in &events {
        for payload in render(event) {
            validate("push.schema.json", &payload);
        }
    }
    validate("push.schema.json", &connected(12, 7));
}

// =========================================================================
// Client to server
// =========================================================================

#[test]
fn command_valid() {
    validate("command.schema.json", &json!({ "btn_single_click": "fire_F" }));
    validate("command.schema.json", &json!({ "btn_single_click": "arm_*1" }));
    validate("command.schema.json", &json!({ "view_partition": 2 }));
}

#[test]
fn command_invalid() {
    validate_fails("command.schema.json", &json!({ "btn_single_click": "fire" }));
    validate_fails("command.schema.json", &json!({ "btn_single_click": "fire_" }));
    validate_fails("command.schema.json", &json!({ "view_partition": 0 }));
    validate_fails("command.schema.json", &json!({ "reboot": true }));
}

#[test]
fn schema_and_parser_agree() {
    for (text, accepted) in [
        (r#"{"btn_single_click":"fire_F"}"#, true),
        (r#"{"btn_single_click":"stay_s"}"#, true),
        (r#"{"view_partition":3}"#, true),
        (r#"{"btn_single_click":"fire"}"#, false),
        (r#"{"view_partition":0}"#, false),
        (r#"{"unknown":1}"#, false),
    ] {
        let value: serde_json::Value = serde_json::from_str(text).unwrap();
        let validator = build_validator("command.schema.json");
        assert_eq!(validator.is_valid(&value), accepted, "schema: {text}");
        assert_eq!(parse_inbound(text.as_bytes()).is_ok(), accepted, "parser: {text}");
    }
}
