//! Fixed-capacity batching of emitted points.

use nalgebra::Vector2;

/// Index-aligned parallel sequences: `positions[i]` has `ranks[i]` and was
/// emitted by an instance at recursion depth `depths[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointBatch {
    pub positions: Vec<Vector2<f64>>,
    pub ranks: Vec<u64>,
    pub depths: Vec<u32>,
}

impl PointBatch {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(n),
            ranks: Vec::with_capacity(n),
            depths: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    #[inline]
    pub fn push(&mut self, pos: Vector2<f64>, rank: u64, depth: u32) {
        self.positions.push(pos);
        self.ranks.push(rank);
        self.depths.push(depth);
    }

    /// `(position, rank)` pairs in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (Vector2<f64>, u64)> + '_ {
        self.positions.iter().copied().zip(self.ranks.iter().copied())
    }
}

/// Accumulates points and hands out a batch each time `capacity` is reached.
#[derive(Debug)]
pub struct BatchEmitter {
    capacity: usize,
    current: PointBatch,
}

impl BatchEmitter {
    /// `capacity` is clamped to at least 1. Storage is reserved on first push.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            current: PointBatch::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points buffered but not yet handed out.
    #[inline]
    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Append a point; returns the batch if it just became full.
    #[inline]
    pub fn push(&mut self, pos: Vector2<f64>, rank: u64, depth: u32) -> Option<PointBatch> {
        if self.current.ranks.capacity() == 0 {
            self.current = PointBatch::with_capacity(self.capacity);
        }
        self.current.push(pos, rank, depth);
        if self.current.len() >= self.capacity {
            Some(std::mem::take(&mut self.current))
        } else {
            None
        }
    }

    /// Final partial batch, if any point is pending.
    pub fn finish(&mut self) -> Option<PointBatch> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}
