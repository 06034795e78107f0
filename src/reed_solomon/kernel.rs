//! Multiply / multiply-accumulate strategy consumed by the codec
//!
//! The encode and reconstruct algorithm in [`codec`](super::codec) is written
//! once against this trait. The scalar kernel backs the generic encoder; the
//! SIMD kernels in [`simd`](super::simd) back the accelerated ones.

use super::simd::SimdLevel;

/// Specifies how to combine the multiplication result with the output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    /// Direct write: output = coefficient * input (replaces contents)
    Direct,
    /// Accumulate: output = output XOR (coefficient * input)
    Add,
}

/// Byte-vector multiply by a field constant
///
/// Implementations process `min(input.len(), output.len())` bytes. The
/// vector path is only fed windows whose length is a multiple of
/// `Self::WIDTH`; the codec's window driver guarantees that and routes
/// shorter remainders to [`mul_scalar`](Kernel::mul_scalar).
pub trait Kernel: Send + Sync + std::fmt::Debug {
    /// Per-coefficient lookup table
    type Table: Send + Sync + std::fmt::Debug;

    /// Native vector width in bytes
    const WIDTH: usize;

    fn level(&self) -> SimdLevel;

    /// Build the lookup table for one coefficient
    fn table(&self, coefficient: u8) -> Self::Table;

    /// Vector multiply over a `WIDTH`-aligned window
    fn mul(&self, table: &Self::Table, input: &[u8], output: &mut [u8], op: WriteOp);

    /// Per-byte multiply for remainders shorter than `WIDTH`
    fn mul_scalar(&self, table: &Self::Table, input: &[u8], output: &mut [u8], op: WriteOp);
}
