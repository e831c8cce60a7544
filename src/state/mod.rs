// MIT License - Copyright (c) 2026 Peter Wright
// Security system snapshot

pub mod edge;
pub mod partition;
pub mod system;
pub mod zone;

use tracing::warn;

pub use edge::{Change, Edge, OneShot};
pub use partition::{LightFlags, PartitionState};
pub use system::{KeypadAlarms, KeypadButton, SystemState};
pub use zone::{ZoneSet, MAX_ZONES, ZONE_GROUPS};

/// Maximum number of partitions a panel exposes.
pub const MAX_PARTITIONS: usize = 8;

/// The consumer-side view of the panel.
///
/// Written by the snapshot source through the `set_*` / `press_*` / `report_*`
/// mutators, which raise the per-field change flag and the master
/// `status_changed` latch whenever a value actually changes. Read by the diff
/// engine, which acknowledges every flag it acts on in the same pass.
///
/// Partition indices are 0-based here; user-facing text adds one.
#[derive(Debug, Clone)]
pub struct SecuritySnapshot {
    pub partitions: Vec<PartitionState>,
    pub open_zones: Edge<ZoneSet>,
    pub alarm_zones: Edge<ZoneSet>,
    pub system: SystemState,
    pub keypad: KeypadAlarms,
    pub buffer_overflow: OneShot,
    pub status_changed: OneShot,
}

impl SecuritySnapshot {
    /// Create a snapshot with `partitions` partitions (clamped to 1..=8).
    pub fn new(partitions: usize) -> Self {
        let count = partitions.clamp(1, MAX_PARTITIONS);
        Self {
            partitions: (0..count).map(|_| PartitionState::new()).collect(),
            open_zones: Edge::default(),
            alarm_zones: Edge::default(),
            system: SystemState::default(),
            keypad: KeypadAlarms::default(),
            buffer_overflow: OneShot::default(),
            status_changed: OneShot::default(),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition(&self, index: usize) -> Option<&PartitionState> {
        self.partitions.get(index)
    }

    fn partition_mut(&mut self, index: usize) -> Option<&mut PartitionState> {
        let count = self.partitions.len();
        let part = self.partitions.get_mut(index);
        if part.is_none() {
            warn!("Ignoring update for partition index {index} (panel has {count})");
        }
        part
    }

    fn mark(&mut self, changed: bool) -> bool {
        if changed {
            self.status_changed.raise();
        }
        changed
    }

    pub fn set_partition_status(&mut self, index: usize, status: u8) -> bool {
        let changed = match self.partition_mut(index) {
            Some(p) if p.status != status => {
                p.status = status;
                true
            }
            _ => false,
        };
        self.mark(changed)
    }

    pub fn set_partition_lights(&mut self, index: usize, lights: LightFlags) -> bool {
        let changed = match self.partition_mut(index) {
            Some(p) if p.lights != lights => {
                p.lights = lights;
                true
            }
            _ => false,
        };
        self.mark(changed)
    }

    pub fn set_partition_armed(&mut self, index: usize, armed: bool, stay: bool) -> bool {
        let changed = match self.partition_mut(index) {
            Some(p) => {
                p.armed_stay = armed && stay;
                p.armed.set(armed)
            }
            None => false,
        };
        self.mark(changed)
    }

    pub fn set_partition_alarm(&mut self, index: usize, alarm: bool) -> bool {
        let changed = self.partition_mut(index).is_some_and(|p| p.alarm.set(alarm));
        self.mark(changed)
    }

    pub fn set_partition_fire(&mut self, index: usize, fire: bool) -> bool {
        let changed = self.partition_mut(index).is_some_and(|p| p.fire.set(fire));
        self.mark(changed)
    }

    pub fn set_zone_open(&mut self, zone: usize, open: bool) -> bool {
        let mut zones = self.open_zones.current();
        zones.set_open(zone, open);
        self.set_open_zones(zones)
    }

    pub fn set_open_zones(&mut self, zones: ZoneSet) -> bool {
        let changed = self.open_zones.set(zones);
        self.mark(changed)
    }

    pub fn set_zone_alarm(&mut self, zone: usize, alarm: bool) -> bool {
        let mut zones = self.alarm_zones.current();
        zones.set(zone, alarm);
        self.set_alarm_zones(zones)
    }

    pub fn set_alarm_zones(&mut self, zones: ZoneSet) -> bool {
        let changed = self.alarm_zones.set(zones);
        self.mark(changed)
    }

    pub fn set_power_trouble(&mut self, trouble: bool) -> bool {
        let changed = self.system.power_trouble.set(trouble);
        self.mark(changed)
    }

    pub fn set_battery_trouble(&mut self, trouble: bool) -> bool {
        let changed = self.system.battery_trouble.set(trouble);
        self.mark(changed)
    }

    pub fn press(&mut self, button: KeypadButton) {
        self.keypad.press(button);
        self.status_changed.raise();
    }

    pub fn press_fire(&mut self) {
        self.press(KeypadButton::Fire)
    }

    pub fn press_aux(&mut self) {
        self.press(KeypadButton::Aux)
    }

    pub fn press_panic(&mut self) {
        self.press(KeypadButton::Panic)
    }

    /// Record that the producer dropped data.
    pub fn report_buffer_overflow(&mut self) {
        self.buffer_overflow.raise();
        self.status_changed.raise();
    }

    /// Whether any change flag is waiting for the consumer.
    pub fn has_pending(&self) -> bool {
        self.status_changed.is_raised()
            || self.buffer_overflow.is_raised()
            || self.keypad.any_raised()
            || self.open_zones.is_pending()
            || self.alarm_zones.is_pending()
            || self.system.power_trouble.is_pending()
            || self.system.battery_trouble.is_pending()
            || self.partitions.iter().any(PartitionState::has_pending)
    }
}

impl Default for SecuritySnapshot {
    fn default() -> Self {
        Self::new(MAX_PARTITIONS)
    }
}
