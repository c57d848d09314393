//! Bounded memory of already-alerted events.
//!
//! The alert monitor re-reads the whole feed every cycle, so a quake stays
//! inside the recency window for several cycles. This ring remembers which
//! event ids have alerted and evicts the oldest once full, keeping memory
//! bounded for a monitor that runs indefinitely.

use std::collections::{HashSet, VecDeque};

/// Default number of alerted ids to remember.
///
/// Far more than can fall inside a ten minute window.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Outcome of checking an event id against the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCheck {
    /// Never alerted on (or evicted); now recorded
    First,
    /// Already alerted on in an earlier cycle
    Repeat,
}

impl AlertCheck {
    #[must_use]
    pub fn should_alert(self) -> bool {
        matches!(self, Self::First)
    }
}

/// Fixed-capacity FIFO set of alerted event ids.
#[derive(Debug)]
pub struct AlertDedup {
    /// Insertion order, oldest at front
    order: VecDeque<String>,
    /// Membership index over `order`
    index: HashSet<String>,
    capacity: usize,
}

impl AlertDedup {
    /// Create a ring remembering at most `capacity` ids. A zero capacity is
    /// raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `event_id`, reporting whether it had alerted before.
    pub fn check_and_mark(&mut self, event_id: &str) -> AlertCheck {
        if self.index.contains(event_id) {
            return AlertCheck::Repeat;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.index.remove(&oldest);
            }
        }

        self.order.push_back(event_id.to_string());
        self.index.insert(event_id.to_string());
        debug_assert!(self.order.len() <= self.capacity);
        debug_assert_eq!(self.order.len(), self.index.len());

        AlertCheck::First
    }

    /// Whether `event_id` has alerted, without recording it.
    #[must_use]
    pub fn contains(&self, event_id: &str) -> bool {
        self.index.contains(event_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }
}

impl Default for AlertDedup {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_then_repeat() {
        let mut ring = AlertDedup::new(10);

        assert_eq!(ring.check_and_mark("E1"), AlertCheck::First);
        assert_eq!(ring.check_and_mark("E2"), AlertCheck::First);
        assert_eq!(ring.check_and_mark("E1"), AlertCheck::Repeat);
        assert_eq!(ring.check_and_mark("E1"), AlertCheck::Repeat);

        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_bounded_capacity() {
        let mut ring = AlertDedup::new(3);

        for id in ["E1", "E2", "E3", "E4"] {
            ring.check_and_mark(id);
        }
        assert_eq!(ring.len(), 3);

        // E1 was evicted, E4 is still remembered
        assert!(!ring.contains("E1"));
        assert!(ring.contains("E4"));
        assert_eq!(ring.check_and_mark("E4"), AlertCheck::Repeat);
        assert_eq!(ring.check_and_mark("E1"), AlertCheck::First);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut ring = AlertDedup::new(0);
        assert_eq!(ring.len(), 0);
        assert!(ring.check_and_mark("E1").should_alert());
        assert!(!ring.check_and_mark("E1").should_alert());
    }
}
