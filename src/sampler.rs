//! Random identifier sampling without replacement.
//!
//! The id pool is never materialized. Drawn positions are remembered in a sparse
//! swap map (a lazy Fisher-Yates shuffle), so sampling from `[1, 999999]` only
//! costs memory proportional to the number of draws.

use fxhash::FxHashMap;
use rand::Rng;

#[derive(Debug)]
pub struct IdSampler {
    start: u64,
    /// `[0, u64::MAX]` holds one more id than a `u64` can count
    remaining: u128,
    /// position -> offset from `start`, for positions that no longer hold
    /// their own offset
    swapped: FxHashMap<u64, u64>,
}

impl IdSampler {
    /// Pool over the inclusive range `[start, end]`. `start > end` gives an
    /// already exhausted pool.
    pub fn new(start: u64, end: u64) -> Self {
        let remaining = if start > end {
            0
        } else {
            (end - start) as u128 + 1
        };
        Self {
            start,
            remaining,
            swapped: FxHashMap::default(),
        }
    }

    pub fn remaining(&self) -> u128 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Removes and returns a uniformly chosen id, or `None` once every id in
    /// the range has been drawn.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        let last = (self.remaining - 1) as u64;
        let index = rng.gen_range(0..self.remaining) as u64;

        let picked = self.offset_at(index);
        if index != last {
            let tail = self.offset_at(last);
            self.swapped.insert(index, tail);
        }
        self.swapped.remove(&last);
        self.remaining -= 1;

        Some(self.start + picked)
    }

    #[inline]
    fn offset_at(&self, position: u64) -> u64 {
        self.swapped.get(&position).copied().unwrap_or(position)
    }
}
