// MIT License - Copyright (c) 2026 Peter Wright
// Zone bit-vectors

use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Maximum number of zones tracked by the panel.
pub const MAX_ZONES: usize = 64;

/// Number of zone groups (bytes) on the wire.
pub const ZONE_GROUPS: usize = MAX_ZONES / 8;

/// A set of zones, one bit per zone, eight zones per byte.
///
/// Zone indices are 0-based: zone 1 in user-facing text is index 0, stored
/// in bit 0 of byte 0; zone 9 is bit 0 of byte 1. The byte layout is what the
/// WebSocket clients receive as `open_zone_N` / `alarm_zone_N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ZoneSet(u64);

impl ZoneSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_bytes(bytes: [u8; ZONE_GROUPS]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    pub fn bytes(&self) -> [u8; ZONE_GROUPS] {
        self.0.to_le_bytes()
    }

    /// The byte holding zones `group * 8 .. group * 8 + 8`.
    pub fn byte(&self, group: usize) -> u8 {
        self.bytes().get(group).copied().unwrap_or(0)
    }

    pub fn contains(&self, zone: usize) -> bool {
        zone < MAX_ZONES && self.0 & (1 << zone) != 0
    }

    /// Set or clear a zone. Indices beyond [`MAX_ZONES`] are ignored.
    pub fn set(&mut self, zone: usize, value: bool) {
        if zone >= MAX_ZONES {
            return;
        }
        if value {
            self.0 |= 1 << zone;
        } else {
            self.0 &= !(1 << zone);
        }
    }

    pub fn is_open(&self, zone: usize) -> bool {
        self.contains(zone)
    }

    pub fn set_open(&mut self, zone: usize, open: bool) {
        self.set(zone, open)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Indices of the zones in the set, ascending.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_ZONES).filter(move |z| self.contains(*z))
    }
}

impl BitXor for ZoneSet {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl BitAnd for ZoneSet {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for ZoneSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Not for ZoneSet {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl FromIterator<usize> for ZoneSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::empty();
        for zone in iter {
            set.set(zone, true);
        }
        set
    }
}
