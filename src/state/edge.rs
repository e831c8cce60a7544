// MIT License - Copyright (c) 2026 Peter Wright
// Edge-triggered change tracking

/// A value transition returned by [`Edge::take_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<T> {
    pub previous: T,
    pub current: T,
}

/// Pairs the producer's current value with the value the consumer last acknowledged.
///
/// The producer calls [`set`](Self::set); the consumer calls
/// [`take_if_changed`](Self::take_if_changed), which reports a transition exactly once
/// and then marks the current value as acknowledged. Every real transition latches,
/// so a value that flips and flips back before the consumer looks is still
/// reported once, with `previous == current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edge<T> {
    current: T,
    acknowledged: T,
    changed: bool,
}

impl<T: Copy + PartialEq> Edge<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            acknowledged: value,
            changed: false,
        }
    }

    /// Update the current value. Returns true if it differs from the previous current value.
    pub fn set(&mut self, value: T) -> bool {
        let changed = self.current != value;
        self.current = value;
        self.changed |= changed;
        changed
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn acknowledged(&self) -> T {
        self.acknowledged
    }

    /// Whether a transition has happened since the last acknowledgement.
    pub fn is_pending(&self) -> bool {
        self.changed
    }

    /// Return the unacknowledged transition, if any, and acknowledge it.
    pub fn take_if_changed(&mut self) -> Option<Change<T>> {
        if !self.is_pending() {
            return None;
        }
        let change = Change {
            previous: self.acknowledged,
            current: self.current,
        };
        self.acknowledge();
        Some(change)
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = self.current;
        self.changed = false;
    }
}

/// A momentary latch: raised by the producer, consumed once by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OneShot {
    raised: bool,
}

impl OneShot {
    pub fn raise(&mut self) {
        self.raised = true;
    }

    pub fn is_raised(&self) -> bool {
        self.raised
    }

    /// Returns true once per raise.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.raised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_reports_once() {
        let mut e = Edge::new(false);
        assert!(e.take_if_changed().is_none());

        assert!(e.set(true));
        assert!(e.is_pending());
        assert_eq!(
            e.take_if_changed(),
            Some(Change {
                previous: false,
                current: true
            })
        );
        assert!(!e.is_pending());
        assert!(e.take_if_changed().is_none());
    }

    #[test]
    fn test_edge_flip_back_is_reported_once() {
        let mut e = Edge::new(0u8);
        e.set(5);
        e.set(0);
        assert!(e.is_pending());
        assert_eq!(
            e.take_if_changed(),
            Some(Change {
                previous: 0,
                current: 0
            })
        );
        assert!(e.take_if_changed().is_none());
    }

    #[test]
    fn test_edge_same_value_does_not_latch() {
        let mut e = Edge::new(true);
        assert!(!e.set(true));
        assert!(!e.is_pending());
    }

    #[test]
    fn test_edge_retrigger_after_ack() {
        let mut e = Edge::new(false);
        e.set(true);
        assert!(e.take_if_changed().is_some());
        e.set(false);
        let change = e.take_if_changed().unwrap();
        assert!(change.previous);
        assert!(!change.current);
    }

    #[test]
    fn test_oneshot_take() {
        let mut flag = OneShot::default();
        assert!(!flag.take());
        flag.raise();
        flag.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }
}
