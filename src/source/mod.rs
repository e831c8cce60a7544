// MIT License - Copyright (c) 2026 Peter Wright
// Snapshot source boundary

pub mod feed;

use crate::state::SecuritySnapshot;

pub use feed::FeedSource;

/// The producer side of the snapshot: whatever decodes the panel bus.
///
/// `poll` must never block; it is called once per dispatch tick and on every
/// slice of an SMTP reply wait so decoding is not starved while a mail is in
/// flight.
pub trait PanelSource {
    /// Process pending bus data into the snapshot. Returns true if anything was applied.
    fn poll(&mut self) -> bool;

    fn snapshot(&self) -> &SecuritySnapshot;

    fn snapshot_mut(&mut self) -> &mut SecuritySnapshot;

    /// Enter keys on the given partition's keypad (0-based partition).
    fn write_keys(&mut self, partition: usize, keys: &str);
}
