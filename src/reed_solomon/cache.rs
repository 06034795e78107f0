//! Inverse-matrix cache for the accelerated reconstruction path
//!
//! Keyed by the set of surviving shard positions. Only `C(d+p, d)` distinct
//! keys exist, and the factory enables the cache only below a configured
//! `(d, p)` size, so the map stays bounded even though it never shrinks.
//!
//! The lock guards the map only; the per-byte path never touches it. Two
//! callers missing on the same key may both compute the inverse; the second
//! insert overwrites with an identical matrix.

use super::matrix::Matrix;
use log::trace;
use rustc_hash::FxHashMap as HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Bit-set of shard positions; 256 bits cover every valid `d + p`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurvivorSet([u64; 4]);

impl SurvivorSet {
    pub fn from_positions(positions: &[usize]) -> Self {
        let mut set = Self::default();
        for &pos in positions {
            set.insert(pos);
        }
        set
    }

    #[inline]
    pub fn insert(&mut self, pos: usize) {
        self.0[(pos / 64) % 4] |= 1u64 << (pos % 64);
    }

    #[inline]
    pub fn contains(&self, pos: usize) -> bool {
        pos < 256 && self.0[pos / 64] & (1u64 << (pos % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }
}

/// Instance-scoped map from surviving set to the inverse of its submatrix
#[derive(Debug, Default)]
pub struct InverseCache {
    map: RwLock<HashMap<SurvivorSet, Arc<Matrix>>>,
}

impl InverseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SurvivorSet) -> Option<Arc<Matrix>> {
        // Cached matrices are immutable, so a poisoned lock still holds valid data
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        let hit = map.get(key).cloned();
        trace!("inverse cache {}", if hit.is_some() { "hit" } else { "miss" });
        hit
    }

    pub fn insert(&self, key: SurvivorSet, inverse: Arc<Matrix>) {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, inverse);
        trace!("inverse cache insert, {} entries", map.len());
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
