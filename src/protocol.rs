// MIT License - Copyright (c) 2026 Peter Wright
// Bus decoder feed protocol

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{KeypadButton, LightFlags, SecuritySnapshot, ZoneSet, ZONE_GROUPS};

/// One line of the bus decoder's state feed.
///
/// The feed is newline-delimited JSON. Each line carries a partial update;
/// absent fields leave the snapshot untouched. Partition numbers are 1-based.
///
/// ```text
/// {"kind":"partition","partition":1,"status":5,"lights":2,"armed":true}
/// {"kind":"zones","open":[1,0,0,0,0,0,0,0]}
/// {"kind":"power","trouble":true}
/// {"kind":"battery","trouble":false}
/// {"kind":"keypad","button":"panic"}
/// {"kind":"overflow"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelUpdate {
    Partition {
        partition: usize,
        #[serde(default)]
        status: Option<u8>,
        #[serde(default)]
        lights: Option<u8>,
        #[serde(default)]
        armed: Option<bool>,
        #[serde(default)]
        stay: Option<bool>,
        #[serde(default)]
        alarm: Option<bool>,
        #[serde(default)]
        fire: Option<bool>,
    },
    Zones {
        #[serde(default)]
        open: Option<[u8; ZONE_GROUPS]>,
        #[serde(default)]
        alarm: Option<[u8; ZONE_GROUPS]>,
    },
    Power {
        trouble: bool,
    },
    Battery {
        trouble: bool,
    },
    Keypad {
        button: KeypadButton,
    },
    /// The decoder itself dropped bus data.
    Overflow,
}

impl PanelUpdate {
    /// Parse a single feed line.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Apply the update through the snapshot's producer-side mutators.
    pub fn apply(&self, snap: &mut SecuritySnapshot) {
        match self {
            PanelUpdate::Partition {
                partition,
                status,
                lights,
                armed,
                stay,
                alarm,
                fire,
            } => {
                let Some(index) = partition.checked_sub(1) else {
                    tracing::warn!("Ignoring update for partition 0 (partitions are 1-based)");
                    return;
                };
                if let Some(status) = status {
                    snap.set_partition_status(index, *status);
                }
                if let Some(lights) = lights {
                    snap.set_partition_lights(index, LightFlags::from_bits_retain(*lights));
                }
                if let Some(armed) = armed {
                    snap.set_partition_armed(index, *armed, stay.unwrap_or(false));
                }
                if let Some(alarm) = alarm {
                    snap.set_partition_alarm(index, *alarm);
                }
                if let Some(fire) = fire {
                    snap.set_partition_fire(index, *fire);
                }
            }
            PanelUpdate::Zones { open, alarm } => {
                if let Some(bytes) = open {
                    snap.set_open_zones(ZoneSet::from_bytes(*bytes));
                }
                if let Some(bytes) = alarm {
                    snap.set_alarm_zones(ZoneSet::from_bytes(*bytes));
                }
            }
            PanelUpdate::Power { trouble } => {
                snap.set_power_trouble(*trouble);
            }
            PanelUpdate::Battery { trouble } => {
                snap.set_battery_trouble(*trouble);
            }
            PanelUpdate::Keypad { button } => snap.press(*button),
            PanelUpdate::Overflow => snap.report_buffer_overflow(),
        }
    }
}

/// Keys to be written to the panel, sent back over the feed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyWrite<'a> {
    pub write: &'a str,
    /// 1-based partition the keys are entered on
    pub partition: usize,
}

impl KeyWrite<'_> {
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partition_update() {
        let update =
            PanelUpdate::parse(r#"{"kind":"partition","partition":2,"status":5,"alarm":true}"#)
                .unwrap();
        assert_eq!(
            update,
            PanelUpdate::Partition {
                partition: 2,
                status: Some(5),
                lights: None,
                armed: None,
                stay: None,
                alarm: Some(true),
                fire: None,
            }
        );
    }

    #[test]
    fn test_apply_partition_update() {
        let mut snap = SecuritySnapshot::new(2);
        PanelUpdate::parse(r#"{"kind":"partition","partition":2,"status":5,"lights":3,"alarm":true}"#)
            .unwrap()
            .apply(&mut snap);
        let part = snap.partition(1).unwrap();
        assert_eq!(part.status, 5);
        assert_eq!(part.lights, LightFlags::READY | LightFlags::ARMED);
        assert!(part.is_alarm());
        assert!(snap.status_changed.is_raised());
    }

    #[test]
    fn test_apply_partition_zero_is_ignored() {
        let mut snap = SecuritySnapshot::new(2);
        PanelUpdate::parse(r#"{"kind":"partition","partition":0,"alarm":true}"#)
            .unwrap()
            .apply(&mut snap);
        assert!(!snap.has_pending());
    }

    #[test]
    fn test_apply_zones_and_keypad() {
        let mut snap = SecuritySnapshot::new(1);
        PanelUpdate::parse(r#"{"kind":"zones","open":[3,0,0,0,0,0,0,0],"alarm":[0,1,0,0,0,0,0,0]}"#)
            .unwrap()
            .apply(&mut snap);
        assert!(snap.open_zones.current().is_open(0));
        assert!(snap.open_zones.current().is_open(1));
        assert!(snap.alarm_zones.current().contains(8));

        PanelUpdate::parse(r#"{"kind":"keypad","button":"fire"}"#)
            .unwrap()
            .apply(&mut snap);
        assert!(snap.keypad.fire.is_raised());
    }

    #[test]
    fn test_parse_errors() {
        assert!(PanelUpdate::parse("not json").is_err());
        assert!(PanelUpdate::parse(r#"{"kind":"unknown"}"#).is_err());
        assert!(PanelUpdate::parse(r#"{"kind":"zones","open":[1,2]}"#).is_err());
    }

    #[test]
    fn test_key_write_line() {
        let line = KeyWrite {
            write: "F",
            partition: 1,
        }
        .to_line()
        .unwrap();
        assert_eq!(line, "{\"write\":\"F\",\"partition\":1}\n");
    }
}
