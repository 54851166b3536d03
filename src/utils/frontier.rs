//! Priority frontier with deterministic FIFO tie-breaking

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

/// Scalar priority used by the A* family
pub type FloatKey = OrderedFloat<f64>;

/// Two-part priority `(k1, k2)` used by incremental search
pub type PairKey = (OrderedFloat<f64>, OrderedFloat<f64>);

/// Min-ordered open list over cell indices
///
/// Every entry carries a sequence number taken from a monotonically
/// increasing counter, compared only after the key, so among equal keys the
/// first inserted entry is popped first. Entries are never removed eagerly:
/// callers push a fresh entry on improvement and skip stale ones on pop.
#[derive(Debug, Clone)]
pub struct OpenList<K: Ord> {
    heap: BinaryHeap<Reverse<(K, u64, usize)>>,
    next_seq: u64,
}

impl<K: Ord> OpenList<K> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), next_seq: 0 }
    }

    pub fn push(&mut self, key: K, cell: usize) {
        self.heap.push(Reverse((key, self.next_seq, cell)));
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<(K, usize)> {
        self.heap.pop().map(|Reverse((key, _, cell))| (key, cell))
    }

    pub fn peek_key(&self) -> Option<&K> {
        self.heap.peek().map(|Reverse((key, _, _))| key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<K: Ord> Default for OpenList<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn float_key(value: f64) -> FloatKey {
    OrderedFloat(value)
}

pub fn pair_key(k1: f64, k2: f64) -> PairKey {
    (OrderedFloat(k1), OrderedFloat(k2))
}
