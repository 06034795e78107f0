//! Scalar GF(2^8) kernel backing the generic encoder
//!
//! One product-table row per coefficient; every byte is a single lookup.
//! This is the reference the SIMD kernels are checked against.

use super::galois::mul_table_row;
use super::kernel::{Kernel, WriteOp};
use super::simd::SimdLevel;

/// Table-driven per-byte kernel, always available
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

/// Scalar multiply through a 256-entry product row
///
/// The simple loop lets the compiler auto-unroll for the target CPU.
#[inline]
pub fn process_slice_multiply(row: &[u8; 256], input: &[u8], output: &mut [u8], op: WriteOp) {
    match op {
        WriteOp::Direct => {
            for (out, &x) in output.iter_mut().zip(input) {
                *out = row[x as usize];
            }
        }
        WriteOp::Add => {
            for (out, &x) in output.iter_mut().zip(input) {
                *out ^= row[x as usize];
            }
        }
    }
}

impl Kernel for ScalarKernel {
    type Table = &'static [u8; 256];

    const WIDTH: usize = 1;

    fn level(&self) -> SimdLevel {
        SimdLevel::None
    }

    #[inline]
    fn table(&self, coefficient: u8) -> Self::Table {
        mul_table_row(coefficient)
    }

    #[inline]
    fn mul(&self, table: &Self::Table, input: &[u8], output: &mut [u8], op: WriteOp) {
        process_slice_multiply(table, input, output, op);
    }

    #[inline]
    fn mul_scalar(&self, table: &Self::Table, input: &[u8], output: &mut [u8], op: WriteOp) {
        process_slice_multiply(table, input, output, op);
    }
}
