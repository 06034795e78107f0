//! Encode / reconstruct algorithm, written once over a [`Kernel`]
//!
//! ## Window processing
//!
//! Every output row is a GF(2^8) dot product of generator coefficients with
//! the input shards, computed independently per byte position. Work proceeds
//! in windows of [`UNIT_SIZE`] bytes; inside a window each output row is
//! produced by one direct multiply followed by multiply-adds, so a window can
//! be recomputed at any time with identical results.
//!
//! The final window may be shorter than a unit:
//! - shorter than the kernel width: per-byte scalar multiply
//! - otherwise: vector kernel over the aligned body, then one more vector
//!   window ending exactly at the shard end. That window overlaps bytes
//!   already produced and rewrites them with the same values.

use super::cache::{InverseCache, SurvivorSet};
use super::config::UNIT_SIZE;
use super::error::{Result, RsError};
use super::kernel::{Kernel, WriteOp};
use super::matrix::Matrix;
use super::simd::SimdLevel;
use log::debug;
use smallvec::SmallVec;
use std::sync::Arc;

type Inputs<'a> = SmallVec<[&'a [u8]; 32]>;
type Outputs<'a> = SmallVec<[&'a mut [u8]; 16]>;

/// Reed-Solomon codec over one generator matrix and one kernel
#[derive(Debug)]
pub struct Codec<K: Kernel> {
    data_shards: usize,
    parity_shards: usize,
    matrix: Matrix,
    kernel: K,
    /// Tables for the parity rows of `matrix`, `parity_shards × data_shards`
    parity_tables: Vec<K::Table>,
    cache: Option<InverseCache>,
}

impl<K: Kernel> Codec<K> {
    /// `matrix` must be a systematic `(d+p) × d` generator
    pub fn new(
        data_shards: usize,
        parity_shards: usize,
        matrix: Matrix,
        kernel: K,
        cache: Option<InverseCache>,
    ) -> Self {
        let parity_tables = (data_shards..data_shards + parity_shards)
            .flat_map(|row| matrix.row(row).to_vec())
            .map(|c| kernel.table(c))
            .collect();

        Self {
            data_shards,
            parity_shards,
            matrix,
            kernel,
            parity_tables,
            cache,
        }
    }

    #[inline]
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    #[inline]
    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    #[inline]
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn simd_level(&self) -> SimdLevel {
        self.kernel.level()
    }

    /// Number of cached inverses; zero when caching is off
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, InverseCache::len)
    }

    pub fn caches_inverses(&self) -> bool {
        self.cache.is_some()
    }

    /// Write parity for the first `data_shards` shards into the rest
    pub fn encode<S: AsRef<[u8]> + AsMut<[u8]>>(&self, shards: &mut [S]) -> Result<()> {
        self.check_shard_count(shards.len())?;
        let len = check_lengths(shards.iter().map(|s| s.as_ref().len()).enumerate())?;

        let (data, parity) = shards.split_at_mut(self.data_shards);
        let inputs: Inputs = data.iter().map(|s| s.as_ref()).collect();
        let mut outputs: Outputs = parity.iter_mut().map(|s| s.as_mut()).collect();
        let rows: SmallVec<[&[K::Table]; 16]> =
            self.parity_tables.chunks(self.data_shards).collect();

        self.matrix_mul(&rows, &inputs, &mut outputs, len);
        Ok(())
    }

    /// Recompute parity and compare it with the parity shards supplied
    pub fn verify<S: AsRef<[u8]>>(&self, shards: &[S]) -> Result<bool> {
        self.check_shard_count(shards.len())?;
        let len = check_lengths(shards.iter().map(|s| s.as_ref().len()).enumerate())?;

        let inputs: Inputs = shards[..self.data_shards]
            .iter()
            .map(|s| s.as_ref())
            .collect();
        let mut scratch = vec![vec![0u8; len]; self.parity_shards];
        {
            let mut outputs: Outputs = scratch.iter_mut().map(|s| s.as_mut_slice()).collect();
            let rows: SmallVec<[&[K::Table]; 16]> =
                self.parity_tables.chunks(self.data_shards).collect();
            self.matrix_mul(&rows, &inputs, &mut outputs, len);
        }

        Ok(scratch
            .iter()
            .zip(&shards[self.data_shards..])
            .all(|(computed, given)| computed.as_slice() == given.as_ref()))
    }

    /// Fill absent (`None` or empty) shards in place
    ///
    /// With `data_only`, lost parity shards are left absent.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], data_only: bool) -> Result<()> {
        self.check_shard_count(shards.len())?;

        let mut present: SmallVec<[usize; 32]> = SmallVec::new();
        let mut lost_data: SmallVec<[usize; 16]> = SmallVec::new();
        let mut lost_parity: SmallVec<[usize; 16]> = SmallVec::new();
        for (index, shard) in shards.iter().enumerate() {
            match shard {
                Some(s) if !s.is_empty() => present.push(index),
                _ if index < self.data_shards => lost_data.push(index),
                _ => lost_parity.push(index),
            }
        }

        debug!(
            "reconstruct: {} present, {} data lost, {} parity lost",
            present.len(),
            lost_data.len(),
            lost_parity.len()
        );

        let lost = lost_data.len() + lost_parity.len();
        if lost > self.parity_shards {
            return Err(RsError::InsufficientShards {
                lost,
                parity: self.parity_shards,
            });
        }

        let len = check_lengths(
            present
                .iter()
                .map(|&i| (i, shards[i].as_ref().map_or(0, Vec::len))),
        )?;

        if data_only {
            lost_parity.clear();
        }
        if lost_data.is_empty() && lost_parity.is_empty() {
            return Ok(());
        }

        for &index in lost_data.iter().chain(lost_parity.iter()) {
            let shard = shards[index].get_or_insert_with(Vec::new);
            shard.clear();
            shard.resize(len, 0);
        }

        present.truncate(self.data_shards);
        let mut views: SmallVec<[&mut [u8]; 48]> = shards
            .iter_mut()
            .map(|s| s.as_deref_mut().unwrap_or_default())
            .collect();

        self.reconstruct_with_pos(&mut views[..], &present, &lost_data, &lost_parity, data_only)
    }

    /// Recover exactly the listed positions, trusting the caller's health map
    ///
    /// `surviving` must name at least `data_shards` intact shards when data is
    /// lost (only the first `data_shards` entries are used), otherwise the
    /// call fails with [`RsError::SingularMatrix`]. Lost slots must already
    /// be sized like the survivors. With `data_only`, `lost_parity`
    /// is ignored.
    pub fn reconstruct_with_pos<S: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        shards: &mut [S],
        surviving: &[usize],
        lost_data: &[usize],
        lost_parity: &[usize],
        data_only: bool,
    ) -> Result<()> {
        self.check_shard_count(shards.len())?;
        let lost_parity = if data_only { &[][..] } else { lost_parity };
        self.check_positions(surviving, lost_data, lost_parity)?;

        let lost = lost_data.len() + lost_parity.len();
        if lost > self.parity_shards {
            return Err(RsError::InsufficientShards {
                lost,
                parity: self.parity_shards,
            });
        }

        if !lost_data.is_empty() {
            // Too few survivors cannot span the data space
            if surviving.len() < self.data_shards {
                return Err(RsError::SingularMatrix);
            }

            // Canonical order, so the cached inverse lines up with its inputs
            let mut survivors: SmallVec<[usize; 32]> =
                SmallVec::from_slice(&surviving[..self.data_shards]);
            survivors.sort_unstable();

            let len = check_lengths(
                survivors
                    .iter()
                    .chain(lost_data)
                    .map(|&i| (i, shards[i].as_ref().len())),
            )?;

            let generator = self.recovery_generator(&survivors, lost_data)?;
            let rows: SmallVec<[&[K::Table]; 16]> =
                generator.chunks(self.data_shards).collect();

            let (inputs, mut outputs) = split_io(shards, &survivors, lost_data)?;
            self.matrix_mul(&rows, &inputs, &mut outputs, len);
        }

        if !lost_parity.is_empty() {
            let data: SmallVec<[usize; 32]> = (0..self.data_shards).collect();
            let len = check_lengths(
                data.iter()
                    .chain(lost_parity)
                    .map(|&i| (i, shards[i].as_ref().len())),
            )?;

            let rows: SmallVec<[&[K::Table]; 16]> = lost_parity
                .iter()
                .map(|&p| {
                    let row = p - self.data_shards;
                    &self.parity_tables[row * self.data_shards..(row + 1) * self.data_shards]
                })
                .collect();

            let (inputs, mut outputs) = split_io(shards, &data, lost_parity)?;
            self.matrix_mul(&rows, &inputs, &mut outputs, len);
        }

        Ok(())
    }

    fn check_shard_count(&self, actual: usize) -> Result<()> {
        if actual != self.total_shards() {
            return Err(RsError::WrongShardCount {
                expected: self.total_shards(),
                actual,
            });
        }
        Ok(())
    }

    fn check_positions(
        &self,
        surviving: &[usize],
        lost_data: &[usize],
        lost_parity: &[usize],
    ) -> Result<()> {
        let total = self.total_shards();
        let mut lost = SurvivorSet::default();

        for &index in lost_data {
            if index >= self.data_shards {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "lost data position is not a data shard",
                });
            }
            if lost.contains(index) {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "position listed as lost twice",
                });
            }
            lost.insert(index);
        }
        for &index in lost_parity {
            if index < self.data_shards || index >= total {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "lost parity position is not a parity shard",
                });
            }
            if lost.contains(index) {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "position listed as lost twice",
                });
            }
            lost.insert(index);
        }
        for &index in surviving {
            if index >= total {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "surviving position out of range",
                });
            }
            if lost.contains(index) {
                return Err(RsError::InvalidIndex {
                    index,
                    reason: "position listed as both surviving and lost",
                });
            }
        }
        Ok(())
    }

    /// Tables for the inverse rows that rebuild `lost_data` from `survivors`
    fn recovery_generator(
        &self,
        survivors: &[usize],
        lost_data: &[usize],
    ) -> Result<Vec<K::Table>> {
        let inverse = self.survivor_inverse(survivors)?;
        let mut tables = Vec::with_capacity(lost_data.len() * self.data_shards);
        for &index in lost_data {
            tables.extend(inverse.row(index).iter().map(|&c| self.kernel.table(c)));
        }
        Ok(tables)
    }

    fn survivor_inverse(&self, survivors: &[usize]) -> Result<Arc<Matrix>> {
        let key = SurvivorSet::from_positions(survivors);
        let cache = self
            .cache
            .as_ref()
            .filter(|_| key.len() == self.data_shards);

        if let Some(inverse) = cache.and_then(|c| c.get(&key)) {
            return Ok(inverse);
        }

        let inverse = Arc::new(self.matrix.sub_matrix_rows(survivors)?.invert()?);
        if let Some(cache) = cache {
            cache.insert(key, Arc::clone(&inverse));
        }
        Ok(inverse)
    }

    /// `outputs[r] = sum_c rows[r][c] * inputs[c]` over the first `len` bytes
    fn matrix_mul(
        &self,
        rows: &[&[K::Table]],
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        len: usize,
    ) {
        let width = K::WIDTH;
        let mut start = 0;

        while start < len {
            let end = (start + UNIT_SIZE).min(len);
            let span = end - start;
            let body = span - span % width;

            if span < width {
                self.mul_window(rows, inputs, outputs, start, end, true);
            } else {
                self.mul_window(rows, inputs, outputs, start, start + body, false);
                if body < span {
                    self.mul_window(rows, inputs, outputs, end - width, end, false);
                }
            }

            start = end;
        }
    }

    #[inline]
    fn mul_window(
        &self,
        rows: &[&[K::Table]],
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        start: usize,
        end: usize,
        scalar: bool,
    ) {
        for (row, output) in rows.iter().zip(outputs.iter_mut()) {
            let out = &mut output[start..end];
            for (col, (table, input)) in row.iter().zip(inputs).enumerate() {
                let op = if col == 0 { WriteOp::Direct } else { WriteOp::Add };
                let input = &input[start..end];
                if scalar {
                    self.kernel.mul_scalar(table, input, out, op);
                } else {
                    self.kernel.mul(table, input, out, op);
                }
            }
        }
    }
}

/// Common positive length of the given `(index, len)` pairs
fn check_lengths(mut lens: impl Iterator<Item = (usize, usize)>) -> Result<usize> {
    let (first_index, expected) = lens.next().ok_or(RsError::EmptyShard { index: 0 })?;
    if expected == 0 {
        return Err(RsError::EmptyShard { index: first_index });
    }
    for (index, actual) in lens {
        if actual != expected {
            return Err(RsError::ShardSizeMismatch {
                index,
                expected,
                actual,
            });
        }
    }
    Ok(expected)
}

/// Borrow `inputs` immutably and `outputs` mutably out of one shard slice
fn split_io<'a, S: AsRef<[u8]> + AsMut<[u8]>>(
    shards: &'a mut [S],
    inputs: &[usize],
    outputs: &[usize],
) -> Result<(Inputs<'a>, Outputs<'a>)> {
    let mut slots: SmallVec<[Option<&'a mut S>; 48]> = shards.iter_mut().map(Some).collect();

    let mut outs = Outputs::new();
    for &index in outputs {
        let shard = slots[index].take().ok_or(RsError::InvalidIndex {
            index,
            reason: "position listed as lost twice",
        })?;
        outs.push(shard.as_mut());
    }

    let shared: SmallVec<[Option<&'a S>; 48]> = slots
        .into_iter()
        .map(|slot| slot.map(|s| s as &S))
        .collect();

    let mut ins = Inputs::new();
    for &index in inputs {
        let shard = shared[index].ok_or(RsError::InvalidIndex {
            index,
            reason: "position listed as both surviving and lost",
        })?;
        ins.push(shard.as_ref());
    }

    Ok((ins, outs))
}
