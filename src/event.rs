// MIT License - Copyright (c) 2026 Peter Wright
// Notification events

use crate::state::{LightFlags, ZoneSet};

/// A state transition worth telling someone about.
///
/// Produced by the diff engine, rendered immediately by each outbound channel,
/// then dropped. Partition and zone indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// The dispatcher has started
    Startup,
    /// Keypad fire button pressed
    FireButton,
    /// Keypad auxiliary button pressed
    AuxButton,
    /// Keypad panic button pressed
    PanicButton,
    /// AC power trouble raised or cleared
    PowerChanged { trouble: bool },
    /// Backup battery trouble raised or cleared
    BatteryChanged { trouble: bool },
    /// Partition entered or left alarm
    PartitionAlarm { partition: usize, alarm: bool },
    /// Partition fire alarm raised or restored
    PartitionFire { partition: usize, fire: bool },
    /// Partition armed or disarmed; `stay` when armed in stay mode
    PartitionArmed {
        partition: usize,
        armed: bool,
        stay: bool,
    },
    /// Open zones changed; `changed` is empty on a forced resync
    ZoneOpenDelta { changed: ZoneSet, current: ZoneSet },
    /// Alarm zones changed; `changed` is empty on a forced resync
    ZoneAlarmDelta { changed: ZoneSet, current: ZoneSet },
    /// Status lights of the viewed partition
    LightsChanged { partition: usize, lights: LightFlags },
    /// Status code of the viewed partition
    StatusTextChanged { partition: usize, code: u8 },
}

/// Subject and body of a notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    fn new(subject: &str, body: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            body: body.into(),
        }
    }
}

fn partition_body(partition: usize) -> String {
    format!("Partition {}", partition + 1)
}

impl NotificationEvent {
    /// Render the event as an email, if it warrants one.
    pub fn email(&self) -> Option<EmailMessage> {
        let msg = match self {
            Self::Startup => EmailMessage::new("Security system initialized", ""),
            Self::FireButton => EmailMessage::new("Security system fire alarm button pressed", ""),
            Self::AuxButton => EmailMessage::new("Security system aux alarm button pressed", ""),
            Self::PanicButton => EmailMessage::new("Security system panic alarm button pressed", ""),
            Self::PowerChanged { trouble: true } => {
                EmailMessage::new("Security system AC power trouble", "")
            }
            Self::PowerChanged { trouble: false } => {
                EmailMessage::new("Security system AC power restored", "")
            }
            Self::BatteryChanged { trouble: true } => {
                EmailMessage::new("Security system battery trouble", "")
            }
            Self::BatteryChanged { trouble: false } => {
                EmailMessage::new("Security system battery restored", "")
            }
            Self::PartitionAlarm { partition, alarm } => EmailMessage::new(
                if *alarm {
                    "Security system in alarm"
                } else {
                    "Security system disarmed after alarm"
                },
                partition_body(*partition),
            ),
            Self::PartitionFire { partition, fire } => EmailMessage::new(
                if *fire {
                    "Security system fire alarm"
                } else {
                    "Security system fire alarm restored"
                },
                partition_body(*partition),
            ),
            Self::PartitionArmed {
                partition,
                armed,
                stay,
            } => EmailMessage::new(
                if *armed && *stay {
                    "Security system armed stay"
                } else if *armed {
                    "Security system armed"
                } else {
                    "Security system disarmed"
                },
                partition_body(*partition),
            ),
            Self::ZoneAlarmDelta { changed, current } => {
                if changed.is_empty() {
                    return None;
                }
                let lines: Vec<String> = changed
                    .iter()
                    .map(|zone| {
                        if current.contains(zone) {
                            format!("Zone {} alarm", zone + 1)
                        } else {
                            format!("Zone {} alarm restored", zone + 1)
                        }
                    })
                    .collect();
                let subject = if (*changed & *current).is_empty() {
                    "Security system zone alarm restored"
                } else {
                    "Security system zone alarm"
                };
                EmailMessage::new(subject, lines.join("\n"))
            }
            Self::ZoneOpenDelta { .. }
            | Self::LightsChanged { .. }
            | Self::StatusTextChanged { .. } => return None,
        };
        Some(msg)
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::FireButton => "fire_button",
            Self::AuxButton => "aux_button",
            Self::PanicButton => "panic_button",
            Self::PowerChanged { .. } => "power",
            Self::BatteryChanged { .. } => "battery",
            Self::PartitionAlarm { .. } => "partition_alarm",
            Self::PartitionFire { .. } => "partition_fire",
            Self::PartitionArmed { .. } => "partition_armed",
            Self::ZoneOpenDelta { .. } => "zone_open",
            Self::ZoneAlarmDelta { .. } => "zone_alarm",
            Self::LightsChanged { .. } => "lights",
            Self::StatusTextChanged { .. } => "status",
        }
    }
}
