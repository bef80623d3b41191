//! Plain round-robin over all priority levels.

use super::trait_def::{coerce_priority_count, PriorityPattern};

/// Visits every priority level once per cycle, in ascending order.
///
/// No weighting at all: each level gets the same share of turns.
#[derive(Debug, Clone)]
pub struct SimplePriorityPattern {
    priority_count: u8,
    current_priority: u8,
}

impl PriorityPattern for SimplePriorityPattern {
    fn new(priority_count: u8) -> Self {
        Self {
            priority_count: coerce_priority_count(priority_count),
            current_priority: 0,
        }
    }

    fn next_priority(&mut self) -> u8 {
        let priority = self.current_priority;
        self.current_priority = ((priority as usize + 1) % self.priority_count as usize) as u8;
        priority
    }

    fn reset(&mut self) {
        self.current_priority = 0;
    }

    fn priority_count(&self) -> u8 {
        self.priority_count
    }

    fn cycle_len(&self) -> usize {
        self.priority_count as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_round_robin_order() {
        let mut pattern = SimplePriorityPattern::new(3);
        let seq: Vec<u8> = (0..7).map(|_| pattern.next_priority()).collect();
        assert_eq!(seq, [0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_zero_levels_coerced() {
        let mut pattern = SimplePriorityPattern::new(0);
        assert_eq!(pattern.priority_count(), 1);
        assert_eq!(pattern.max_priority(), 0);
        assert_eq!(pattern.next_priority(), 0);
        assert_eq!(pattern.next_priority(), 0);
    }

    #[test]
    fn test_full_range_does_not_overflow() {
        let mut pattern = SimplePriorityPattern::new(255);
        for expected in 0..255u8 {
            assert_eq!(pattern.next_priority(), expected);
        }
        assert_eq!(pattern.next_priority(), 0);
    }

    #[test]
    fn test_reset() {
        let mut pattern = SimplePriorityPattern::new(4);
        pattern.next_priority();
        pattern.next_priority();
        pattern.reset();
        assert_eq!(pattern.next_priority(), 0);
        assert_eq!(pattern.min_priority(), 0);
    }
}
