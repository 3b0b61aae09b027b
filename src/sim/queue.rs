use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::circuit::Wire;

/// A pulse scheduled on a wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Arrival time
    pub time: f64,
    /// Wire carrying the pulse
    pub wire: Wire,
}

/// Heap entry; ties are broken by insertion order so that runs are reproducible
#[derive(Debug, Clone, Copy)]
struct Entry {
    time: f64,
    seq: u64,
    wire: Wire,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Time-ordered queue of pending pulses
#[derive(Debug, Clone, Default)]
pub struct PulseQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    seq: u64,
}

impl PulseQueue {
    /// Create an empty queue
    pub fn new() -> PulseQueue {
        PulseQueue::default()
    }

    /// Number of pending pulses
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Return whether no pulse is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every pending pulse
    pub fn clear(&mut self) {
        self.heap.clear();
        self.seq = 0;
    }

    /// Schedule a pulse
    pub fn push(&mut self, p: Pulse) {
        self.heap.push(Reverse(Entry {
            time: p.time,
            seq: self.seq,
            wire: p.wire,
        }));
        self.seq += 1;
    }

    /// Time of the earliest pending pulse
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Remove the earliest pending pulse
    pub fn pop(&mut self) -> Option<Pulse> {
        self.heap.pop().map(|Reverse(e)| Pulse {
            time: e.time,
            wire: e.wire,
        })
    }

    /// Remove every pulse sharing the earliest time; return that time and their wires in scheduling order
    pub fn pop_instant(&mut self) -> Option<(f64, Vec<Wire>)> {
        let first = self.pop()?;
        let mut wires = vec![first.wire];
        while self.peek_time() == Some(first.time) {
            if let Some(p) = self.pop() {
                wires.push(p.wire);
            }
        }
        Some((first.time, wires))
    }

    /// Pending pulses, in delivery order
    pub fn pending(&self) -> Vec<Pulse> {
        let mut entries: Vec<Entry> = self.heap.iter().map(|Reverse(e)| *e).collect();
        entries.sort();
        entries
            .into_iter()
            .map(|e| Pulse {
                time: e.time,
                wire: e.wire,
            })
            .collect()
    }
}
