// MIT License - Copyright (c) 2026 Peter Wright
// Diff & dispatch engine

use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::event::NotificationEvent;
use crate::state::{Change, LightFlags, SecuritySnapshot};

/// Values to report for a boolean transition. A value that bounced back to
/// where it was reports both edges, in the order they happened.
fn edges(change: Change<bool>) -> impl Iterator<Item = bool> {
    let bounced = change.previous == change.current;
    bounced
        .then_some(!change.current)
        .into_iter()
        .chain(std::iter::once(change.current))
}

/// Dispatcher-owned state that is not part of the panel snapshot.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Partition whose lights and status feed the display channel (0-based)
    view_partition: usize,
    partition_count: usize,
    /// Redeliver the viewed partition's display state on the next pass
    pub force_resync: bool,
    startup_pending: bool,
    last_lights: Option<LightFlags>,
    last_status: Option<u8>,
}

impl DispatchContext {
    /// `view_partition` is 0-based and clamped to the partition range.
    pub fn new(partition_count: usize, view_partition: usize) -> Self {
        let partition_count = partition_count.max(1);
        Self {
            view_partition: view_partition.min(partition_count - 1),
            partition_count,
            force_resync: false,
            startup_pending: true,
            last_lights: None,
            last_status: None,
        }
    }

    pub fn view_partition(&self) -> usize {
        self.view_partition
    }

    /// Switch the viewed partition. Returns false if `index` is out of range.
    /// An accepted switch forces a resync so clients see the new partition.
    pub fn set_view_partition(&mut self, index: usize) -> bool {
        if index >= self.partition_count {
            return false;
        }
        if index != self.view_partition {
            self.view_partition = index;
            self.request_resync();
        }
        true
    }

    pub fn request_resync(&mut self) {
        self.force_resync = true;
    }
}

/// Converts pending snapshot change flags into notification events.
#[derive(Debug, Default)]
pub struct DiffEngine {
    buffer_overflows: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffer overflows reported by the snapshot source so far.
    pub fn buffer_overflows(&self) -> u64 {
        self.buffer_overflows
    }

    /// Run one dispatch pass.
    ///
    /// Every change flag read as pending is acknowledged before this returns.
    /// Events come out in a fixed order: keypad buttons, power, per-partition
    /// alarm/fire/armed, viewed partition lights and status, open zones, alarm
    /// zones, battery.
    pub fn dispatch(
        &mut self,
        snap: &mut SecuritySnapshot,
        ctx: &mut DispatchContext,
    ) -> Vec<NotificationEvent> {
        let mut events = Vec::new();

        if std::mem::take(&mut ctx.startup_pending) {
            events.push(NotificationEvent::Startup);
        }

        let status_changed = snap.status_changed.take();
        let resync = std::mem::take(&mut ctx.force_resync);
        if !status_changed && !resync {
            return events;
        }

        if snap.buffer_overflow.take() {
            self.buffer_overflows += 1;
            warn!(
                "{} (total {})",
                NotifyError::BufferOverflow,
                self.buffer_overflows
            );
        }

        if snap.keypad.fire.take() {
            events.push(NotificationEvent::FireButton);
        }
        if snap.keypad.aux.take() {
            events.push(NotificationEvent::AuxButton);
        }
        if snap.keypad.panic.take() {
            events.push(NotificationEvent::PanicButton);
        }

        if let Some(change) = snap.system.power_trouble.take_if_changed() {
            events.extend(edges(change).map(|trouble| NotificationEvent::PowerChanged { trouble }));
        }

        for (partition, part) in snap.partitions.iter_mut().enumerate() {
            if let Some(change) = part.alarm.take_if_changed() {
                events.extend(
                    edges(change)
                        .map(|alarm| NotificationEvent::PartitionAlarm { partition, alarm }),
                );
            }
            if let Some(change) = part.fire.take_if_changed() {
                events.extend(
                    edges(change).map(|fire| NotificationEvent::PartitionFire { partition, fire }),
                );
            }
            if let Some(change) = part.armed.take_if_changed() {
                let stay = part.armed_stay;
                events.extend(edges(change).map(|armed| NotificationEvent::PartitionArmed {
                    partition,
                    armed,
                    stay: armed && stay,
                }));
            }
        }

        let view = ctx.view_partition;
        if let Some(part) = snap.partition(view) {
            if resync || ctx.last_lights != Some(part.lights) {
                ctx.last_lights = Some(part.lights);
                events.push(NotificationEvent::LightsChanged {
                    partition: view,
                    lights: part.lights,
                });
            }
            if resync || ctx.last_status != Some(part.status) {
                ctx.last_status = Some(part.status);
                events.push(NotificationEvent::StatusTextChanged {
                    partition: view,
                    code: part.status,
                });
            }
        }

        match snap.open_zones.take_if_changed() {
            Some(change) => events.push(NotificationEvent::ZoneOpenDelta {
                changed: change.previous ^ change.current,
                current: change.current,
            }),
            None if resync => events.push(NotificationEvent::ZoneOpenDelta {
                changed: Default::default(),
                current: snap.open_zones.current(),
            }),
            None => {}
        }

        match snap.alarm_zones.take_if_changed() {
            Some(change) => events.push(NotificationEvent::ZoneAlarmDelta {
                changed: change.previous ^ change.current,
                current: change.current,
            }),
            None if resync => events.push(NotificationEvent::ZoneAlarmDelta {
                changed: Default::default(),
                current: snap.alarm_zones.current(),
            }),
            None => {}
        }

        if let Some(change) = snap.system.battery_trouble.take_if_changed() {
            events.extend(edges(change).map(|trouble| NotificationEvent::BatteryChanged { trouble }));
        }

        debug!(
            "Dispatch pass produced {} event(s){}",
            events.len(),
            if resync { " (resync)" } else { "" }
        );
        events
    }
}
