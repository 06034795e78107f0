//! File to shard-set striping
//!
//! A file is cut into `d` contiguous, zero-padded data shards of
//! `shard_len` bytes. Each shard is then viewed as stripes of at most
//! `stripe_size` bytes; stripe `k` of every shard forms one independent
//! codec call. Stripes run in parallel, each call single-threaded.

use crate::reed_solomon::{Encoder, Result, RsError};
use rayon::prelude::*;
use smallvec::SmallVec;

/// Bytes per shard handled by one codec call
pub const DEFAULT_STRIPE_SIZE: usize = 1024 * 1024;

type StripeMut<'a> = SmallVec<[&'a mut [u8]; 32]>;
type StripeRef<'a> = SmallVec<[&'a [u8]; 32]>;

/// Shard length needed to hold `original_len` bytes in `data_shards` shards
///
/// Never zero, so empty files still produce codable shards.
pub fn shard_len_for(original_len: usize, data_shards: usize) -> usize {
    original_len.div_ceil(data_shards.max(1)).max(1)
}

/// `d` zero-padded data shards followed by `p` zeroed parity shards
pub fn split(data: &[u8], data_shards: usize, parity_shards: usize) -> Vec<Vec<u8>> {
    let shard_len = shard_len_for(data.len(), data_shards);
    let mut shards: Vec<Vec<u8>> = Vec::with_capacity(data_shards + parity_shards);

    for index in 0..data_shards {
        let start = (index * shard_len).min(data.len());
        let end = (start + shard_len).min(data.len());
        let mut shard = data[start..end].to_vec();
        shard.resize(shard_len, 0);
        shards.push(shard);
    }
    shards.resize(data_shards + parity_shards, vec![0u8; shard_len]);
    shards
}

/// Concatenate the data shards and drop the padding
pub fn join<S: AsRef<[u8]>>(shards: &[S], data_shards: usize, original_len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = shards
        .iter()
        .take(data_shards)
        .flat_map(|s| s.as_ref().iter().copied())
        .collect();
    data.truncate(original_len);
    data
}

fn stripe_count(shard_len: usize, stripe_size: usize) -> usize {
    shard_len.div_ceil(stripe_size)
}

fn stripes_mut(shards: &mut [Vec<u8>], stripe_size: usize) -> Vec<StripeMut<'_>> {
    let count = stripe_count(shards.first().map_or(0, Vec::len), stripe_size);
    let mut chunks: Vec<_> = shards.iter_mut().map(|s| s.chunks_mut(stripe_size)).collect();
    (0..count)
        .map(|_| chunks.iter_mut().filter_map(Iterator::next).collect())
        .collect()
}

fn stripes_ref(shards: &[Vec<u8>], stripe_size: usize) -> Vec<StripeRef<'_>> {
    let count = stripe_count(shards.first().map_or(0, Vec::len), stripe_size);
    let mut chunks: Vec<_> = shards.iter().map(|s| s.chunks(stripe_size)).collect();
    (0..count)
        .map(|_| chunks.iter_mut().filter_map(Iterator::next).collect())
        .collect()
}

/// Encode every stripe of `shards` in parallel
pub fn encode_stripes(encoder: &Encoder, shards: &mut [Vec<u8>], stripe_size: usize) -> Result<()> {
    let mut stripes = stripes_mut(shards, stripe_size.max(1));
    stripes
        .par_iter_mut()
        .try_for_each(|stripe| encoder.encode(&mut stripe[..]))
}

/// Rebuild every absent shard, stripe by stripe in parallel
///
/// Survivors and losses are classified once for the whole file; each stripe
/// then recovers the same positions.
pub fn reconstruct_stripes(
    encoder: &Encoder,
    shards: &mut [Option<Vec<u8>>],
    stripe_size: usize,
) -> Result<()> {
    let data_shards = encoder.data_shards();
    if shards.len() != encoder.total_shards() {
        return Err(RsError::WrongShardCount {
            expected: encoder.total_shards(),
            actual: shards.len(),
        });
    }

    let mut surviving = Vec::new();
    let mut lost_data = Vec::new();
    let mut lost_parity = Vec::new();
    for (index, shard) in shards.iter().enumerate() {
        match shard {
            Some(s) if !s.is_empty() => surviving.push(index),
            _ if index < data_shards => lost_data.push(index),
            _ => lost_parity.push(index),
        }
    }
    if lost_data.is_empty() && lost_parity.is_empty() {
        return Ok(());
    }

    let lost = lost_data.len() + lost_parity.len();
    if lost > encoder.parity_shards() {
        return Err(RsError::InsufficientShards {
            lost,
            parity: encoder.parity_shards(),
        });
    }

    let shard_len = surviving
        .first()
        .and_then(|&i| shards[i].as_ref())
        .map_or(0, Vec::len);
    let mut full: Vec<Vec<u8>> = shards
        .iter_mut()
        .map(|s| s.take().unwrap_or_else(|| vec![0u8; shard_len]))
        .map(|mut s| {
            if s.is_empty() {
                s.resize(shard_len, 0);
            }
            s
        })
        .collect();

    let result = {
        let mut stripes = stripes_mut(&mut full, stripe_size.max(1));
        stripes.par_iter_mut().try_for_each(|stripe| {
            encoder.reconstruct_with_pos(&mut stripe[..], &surviving, &lost_data, &lost_parity)
        })
    };

    for (slot, shard) in shards.iter_mut().zip(full) {
        *slot = Some(shard);
    }
    result
}

/// Whether every stripe's parity matches its data
pub fn verify_stripes(encoder: &Encoder, shards: &[Vec<u8>], stripe_size: usize) -> Result<bool> {
    let stripes = stripes_ref(shards, stripe_size.max(1));
    let results: Vec<bool> = stripes
        .par_iter()
        .map(|stripe| encoder.verify(&stripe[..]))
        .collect::<Result<_>>()?;
    Ok(results.into_iter().all(|ok| ok))
}
