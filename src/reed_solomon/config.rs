//! Configuration for encoder construction

use super::matrix::Construction;

/// Bytes processed per window before moving to the next one
pub const UNIT_SIZE: usize = 16 * 1024;

/// Configuration for encoder construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Generator matrix construction
    pub construction: Construction,
    /// Whether the accelerated path may cache inverse matrices at all
    pub cache_enabled: bool,
    /// Largest data shard count that still caches inverses
    pub cache_max_data_shards: usize,
    /// Largest parity shard count that still caches inverses
    pub cache_max_parity_shards: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            construction: Construction::Vandermonde,
            cache_enabled: true,
            cache_max_data_shards: 14,
            cache_max_parity_shards: 7,
        }
    }
}

impl EncoderConfig {
    pub fn new(construction: Construction) -> Self {
        Self {
            construction,
            ..Self::default()
        }
    }

    /// Whether an encoder of this shape should carry an inverse cache
    pub fn caches(&self, data_shards: usize, parity_shards: usize) -> bool {
        self.cache_enabled
            && data_shards <= self.cache_max_data_shards
            && parity_shards <= self.cache_max_parity_shards
    }
}
