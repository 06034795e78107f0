//! Common SIMD utilities shared across all implementations
//!
//! The per-coefficient [`NibbleTable`] is the core data structure for PSHUFB
//! and NEON `vqtbl1q_u8` lookups. The scalar routine here consumes the same
//! table and handles remainders shorter than one vector.

use crate::reed_solomon::galois::NibbleTable;
use crate::reed_solomon::kernel::WriteOp;

/// Scalar GF(2^8) multiply through a nibble table
///
/// Used for remainders shorter than the kernel's native width, so that no
/// vector load ever reads past the end of a shard.
#[inline]
pub fn process_slice_multiply_nibble(
    table: &NibbleTable,
    input: &[u8],
    output: &mut [u8],
    op: WriteOp,
) {
    match op {
        WriteOp::Direct => {
            for (out, &x) in output.iter_mut().zip(input) {
                *out = table.mul_byte(x);
            }
        }
        WriteOp::Add => {
            for (out, &x) in output.iter_mut().zip(input) {
                *out ^= table.mul_byte(x);
            }
        }
    }
}
