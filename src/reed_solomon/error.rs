//! Error types for Reed-Solomon encode and reconstruct operations

use thiserror::Error;

/// Result type for Reed-Solomon operations
pub type Result<T> = std::result::Result<T, RsError>;

/// Coarse classification of an [`RsError`], for callers mapping codec
/// failures onto retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shard counts rejected at construction time
    Configuration,
    /// Wrong shard count, bad index, or inconsistent buffer lengths
    ShapeMismatch,
    /// The surviving set does not span the data space
    SingularMatrix,
    /// More shards lost than parity can cover
    InsufficientShards,
}

/// Errors that can occur during Reed-Solomon operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsError {
    /// Data or parity shard count is zero
    #[error("Invalid shard counts: {data} data, {parity} parity (both must be positive)")]
    InvalidShardCount { data: usize, parity: usize },

    /// data + parity does not fit in GF(2^8)
    #[error("Too many shards: {total} total, must be below 256")]
    TooManyShards { total: usize },

    /// Call supplied the wrong number of shards
    #[error("Expected {expected} shards, got {actual}")]
    WrongShardCount { expected: usize, actual: usize },

    /// A shard that must carry data is empty
    #[error("Shard {index} is empty")]
    EmptyShard { index: usize },

    /// Shard lengths disagree
    #[error("Shard {index} has {actual} bytes, expected {expected}")]
    ShardSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// A caller-supplied position list is out of range or in the wrong class
    #[error("Invalid shard index {index}: {reason}")]
    InvalidIndex { index: usize, reason: &'static str },

    /// Matrix dimensions do not suit the operation
    #[error("Matrix shape {rows}x{cols}: {reason}")]
    MatrixShape {
        rows: usize,
        cols: usize,
        reason: &'static str,
    },

    /// Matrix has no inverse over GF(2^8)
    #[error("Matrix is singular")]
    SingularMatrix,

    /// Losses exceed what the parity shards can recover
    #[error("Cannot reconstruct: {lost} shards lost but only {parity} parity shards")]
    InsufficientShards { lost: usize, parity: usize },
}

impl RsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RsError::InvalidShardCount { .. } | RsError::TooManyShards { .. } => {
                ErrorKind::Configuration
            }
            RsError::WrongShardCount { .. }
            | RsError::EmptyShard { .. }
            | RsError::ShardSizeMismatch { .. }
            | RsError::InvalidIndex { .. }
            | RsError::MatrixShape { .. } => ErrorKind::ShapeMismatch,
            RsError::SingularMatrix => ErrorKind::SingularMatrix,
            RsError::InsufficientShards { .. } => ErrorKind::InsufficientShards,
        }
    }
}
