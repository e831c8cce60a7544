// MIT License - Copyright (c) 2026 Peter Wright
// Partition state

use bitflags::bitflags;

use crate::state::edge::Edge;

bitflags! {
    /// Keypad status lights for a partition, as a single byte.
    ///
    /// Bit positions: `Ready Armed Memory Bypass Trouble Program Fire Backlight`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LightFlags: u8 {
        const READY     = 1 << 0;
        const ARMED     = 1 << 1;
        const MEMORY    = 1 << 2;
        const BYPASS    = 1 << 3;
        const TROUBLE   = 1 << 4;
        const PROGRAM   = 1 << 5;
        const FIRE      = 1 << 6;
        const BACKLIGHT = 1 << 7;
    }
}

impl LightFlags {
    /// Names of the lit lights, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::READY) { names.push("Ready"); }
        if self.contains(Self::ARMED) { names.push("Armed"); }
        if self.contains(Self::MEMORY) { names.push("Memory"); }
        if self.contains(Self::BYPASS) { names.push("Bypass"); }
        if self.contains(Self::TROUBLE) { names.push("Trouble"); }
        if self.contains(Self::PROGRAM) { names.push("Program"); }
        if self.contains(Self::FIRE) { names.push("Fire"); }
        if self.contains(Self::BACKLIGHT) { names.push("Backlight"); }
        names
    }
}

/// A single partition as seen by the dispatcher.
///
/// `status` and `lights` are level values compared against what was last rendered;
/// `armed`, `alarm` and `fire` are edge-tracked and dispatched on transition.
#[derive(Debug, Clone, Default)]
pub struct PartitionState {
    pub status: u8,
    pub lights: LightFlags,
    pub armed: Edge<bool>,
    pub armed_stay: bool,
    pub alarm: Edge<bool>,
    pub fire: Edge<bool>,
}

impl PartitionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool { self.armed.current() }
    pub fn is_alarm(&self) -> bool { self.alarm.current() }
    pub fn is_fire(&self) -> bool { self.fire.current() }

    /// Whether any edge-tracked field has an unacknowledged transition.
    pub fn has_pending(&self) -> bool {
        self.armed.is_pending() || self.alarm.is_pending() || self.fire.is_pending()
    }
}
