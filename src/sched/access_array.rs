//! Precomputed weighted round-robin.

use super::trait_def::{coerce_priority_count, priority, PriorityPattern};

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

/// Weighted round-robin driven by a precomputed access array.
///
/// Priority `p` appears `p` times in the array. The array is built by
/// scanning the levels circularly, starting at the highest one, so equal
/// priorities are spread out instead of clustered. Priority 0 has no weight
/// of its own and instead owns one extra slot at the end of every cycle,
/// which keeps the idle level from starving.
///
/// For four levels the array is `[3, 1, 2, 3, 2, 3]` and the full cycle
/// is `3, 1, 2, 3, 2, 3, 0`.
#[derive(Debug, Clone)]
pub struct AccessArrayPriorityPattern {
    priority_count: u8,
    access_array: Vec<u8>,
    current_index: usize,
}

impl AccessArrayPriorityPattern {
    /// The precomputed visiting order, without the reserved priority-0 slot.
    pub fn access_array(&self) -> &[u8] {
        &self.access_array
    }

    fn build(priority_count: u8) -> Vec<u8> {
        let count = priority_count as usize;
        let len = count * (count - 1) / 2;
        let mut weight: Vec<usize> = (0..count).collect();
        let mut access_array = vec![0u8; len];

        let mut scan = count - 1;
        for slot in access_array.iter_mut() {
            while weight[scan] == 0 {
                scan = (scan + 1) % count;
            }
            *slot = scan as u8;
            weight[scan] -= 1;
            scan = (scan + 1) % count;
        }

        access_array
    }
}

impl PriorityPattern for AccessArrayPriorityPattern {
    fn new(priority_count: u8) -> Self {
        let priority_count = coerce_priority_count(priority_count);
        Self {
            priority_count,
            access_array: Self::build(priority_count),
            current_index: 0,
        }
    }

    fn next_priority(&mut self) -> u8 {
        let index = self.current_index;
        self.current_index = (index + 1) % self.cycle_len();

        // The slot past the array is reserved for the idle level.
        self.access_array.get(index).copied().unwrap_or(priority::IDLE)
    }

    fn reset(&mut self) {
        self.current_index = 0;
    }

    fn priority_count(&self) -> u8 {
        self.priority_count
    }

    fn cycle_len(&self) -> usize {
        self.access_array.len() + 1
    }
}
