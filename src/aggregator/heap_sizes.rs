//! Select the stack traces that allocated the most heap.
//!
//! A bounded min-heap keeps the current top N while the per-serial sizes
//! stream past, which is O(n log N) instead of a full sort.

use crate::utils::config::DEFAULT_TOP_STACKS;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Bytes allocated under one stack trace serial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSize {
    pub serial: u32,
    pub size: u64,
}

impl Ord for SerialSize {
    /// Larger sizes rank higher; on equal sizes the lower serial ranks higher
    fn cmp(&self, other: &Self) -> Ordering {
        self.size
            .cmp(&other.size)
            .then_with(|| other.serial.cmp(&self.serial))
    }
}

impl PartialOrd for SerialSize {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `n` largest entries of `sizes`, descending by size
///
/// **Public** - main entry point for top-N selection
pub fn top_trace_sizes(sizes: &HashMap<u32, u64>, n: usize) -> Vec<SerialSize> {
    if n == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<SerialSize>> = BinaryHeap::with_capacity(n);
    for (&serial, &size) in sizes {
        let entry = SerialSize { serial, size };
        if heap.len() < n {
            heap.push(Reverse(entry));
            continue;
        }
        if let Some(mut smallest) = heap.peek_mut() {
            if entry > smallest.0 {
                *smallest = Reverse(entry);
            }
        }
    }

    // Ascending order of Reverse<_> is descending order of sizes
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(entry)| entry)
        .collect()
}

/// The ten largest stack traces
pub fn top10(sizes: &HashMap<u32, u64>) -> Vec<SerialSize> {
    top_trace_sizes(sizes, DEFAULT_TOP_STACKS)
}
