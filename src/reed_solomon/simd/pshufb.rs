//! PSHUFB-based GF(2^8) multiplication kernels (AVX2 and SSSE3)
//!
//! ## PSHUFB Technique
//!
//! This implements the "Screaming Fast Galois Field Arithmetic" technique from
//! James Plank's paper: "Screaming Fast Galois Field Arithmetic Using Intel SIMD Instructions"
//! (http://web.eecs.utk.edu/~plank/plank/papers/FAST-2013-GF.html)
//!
//! **Key insight**: PSHUFB performs sixteen parallel 4-bit table lookups.
//! A GF(2^8) product `c * x` splits into `c * (x & 0x0F) ^ c * (x & 0xF0)`,
//! so one 16-byte table per nibble covers all 256 inputs:
//!
//! 1. Mask the low nibbles, shift and mask the high nibbles
//! 2. PSHUFB each nibble vector against its table
//! 3. XOR the two partial products (and the output, for multiply-add)
//!
//! AVX2 broadcasts the 16-byte tables into both 128-bit lanes and processes
//! 32 bytes per iteration; SSSE3 processes 16.

use super::common::process_slice_multiply_nibble;
use super::{CapabilitySet, SimdLevel};
use crate::reed_solomon::galois::NibbleTable;
use crate::reed_solomon::kernel::{Kernel, WriteOp};
use std::arch::x86_64::*;

/// AVX2 kernel. Only constructible when the CPU reports AVX2 and SSSE3.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel {
    _verified: (),
}

impl Avx2Kernel {
    /// `None` unless `caps` allows AVX2 and the running CPU has it
    pub fn new(caps: &CapabilitySet) -> Option<Self> {
        // CapabilitySet fields are public, so confirm against the hardware too
        let usable = caps.avx2
            && caps.ssse3
            && is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("ssse3");
        usable.then_some(Self { _verified: () })
    }
}

/// SSSE3 kernel. Only constructible when the CPU reports SSSE3.
#[derive(Debug, Clone, Copy)]
pub struct Ssse3Kernel {
    _verified: (),
}

impl Ssse3Kernel {
    pub fn new(caps: &CapabilitySet) -> Option<Self> {
        (caps.ssse3 && is_x86_feature_detected!("ssse3")).then_some(Self { _verified: () })
    }
}

/// PSHUFB-accelerated GF(2^8) multiply using AVX2
///
/// Processes 32 bytes per iteration and returns the number of bytes handled
/// (`len` rounded down to a multiple of 32).
///
/// # Safety
/// - Requires AVX2 and SSSE3 CPU support. Caller must ensure CPU has these features before calling.
/// - Only the first `min(input.len(), output.len())` bytes are considered.
/// - Uses unaligned loads/stores, so alignment is not required.
#[target_feature(enable = "avx2", enable = "ssse3")]
pub unsafe fn process_slice_multiply_avx2(
    table: &NibbleTable,
    input: &[u8],
    output: &mut [u8],
    op: WriteOp,
) -> usize {
    let len = input.len().min(output.len());
    let avx_end = len - len % 32;

    let tbl_lo = _mm256_broadcastsi128_si256(_mm_loadu_si128(table.low.as_ptr() as *const __m128i));
    let tbl_hi =
        _mm256_broadcastsi128_si256(_mm_loadu_si128(table.high.as_ptr() as *const __m128i));
    let mask_0x0f = _mm256_set1_epi8(0x0F);

    let in_ptr = input.as_ptr();
    let out_ptr = output.as_mut_ptr();
    let mut pos = 0;

    while pos < avx_end {
        let in_vec = _mm256_loadu_si256(in_ptr.add(pos) as *const __m256i);

        let lo_nib = _mm256_and_si256(in_vec, mask_0x0f);
        let hi_nib = _mm256_and_si256(_mm256_srli_epi64(in_vec, 4), mask_0x0f);

        let product = _mm256_xor_si256(
            _mm256_shuffle_epi8(tbl_lo, lo_nib),
            _mm256_shuffle_epi8(tbl_hi, hi_nib),
        );

        let result = match op {
            WriteOp::Direct => product,
            WriteOp::Add => {
                let out_vec = _mm256_loadu_si256(out_ptr.add(pos) as *const __m256i);
                _mm256_xor_si256(out_vec, product)
            }
        };

        _mm256_storeu_si256(out_ptr.add(pos) as *mut __m256i, result);
        pos += 32;
    }

    avx_end
}

/// PSHUFB-accelerated GF(2^8) multiply using SSSE3
///
/// Processes 16 bytes per iteration and returns the number of bytes handled.
///
/// # Safety
/// - Requires SSSE3 CPU support. Caller must ensure CPU has this feature before calling.
/// - Only the first `min(input.len(), output.len())` bytes are considered.
#[target_feature(enable = "ssse3")]
pub unsafe fn process_slice_multiply_ssse3(
    table: &NibbleTable,
    input: &[u8],
    output: &mut [u8],
    op: WriteOp,
) -> usize {
    let len = input.len().min(output.len());
    let sse_end = len - len % 16;

    let tbl_lo = _mm_loadu_si128(table.low.as_ptr() as *const __m128i);
    let tbl_hi = _mm_loadu_si128(table.high.as_ptr() as *const __m128i);
    let mask_0x0f = _mm_set1_epi8(0x0F);

    let in_ptr = input.as_ptr();
    let out_ptr = output.as_mut_ptr();
    let mut pos = 0;

    while pos < sse_end {
        let in_vec = _mm_loadu_si128(in_ptr.add(pos) as *const __m128i);

        let lo_nib = _mm_and_si128(in_vec, mask_0x0f);
        let hi_nib = _mm_and_si128(_mm_srli_epi64(in_vec, 4), mask_0x0f);

        let product = _mm_xor_si128(
            _mm_shuffle_epi8(tbl_lo, lo_nib),
            _mm_shuffle_epi8(tbl_hi, hi_nib),
        );

        let result = match op {
            WriteOp::Direct => product,
            WriteOp::Add => {
                let out_vec = _mm_loadu_si128(out_ptr.add(pos) as *const __m128i);
                _mm_xor_si128(out_vec, product)
            }
        };

        _mm_storeu_si128(out_ptr.add(pos) as *mut __m128i, result);
        pos += 16;
    }

    sse_end
}

impl Kernel for Avx2Kernel {
    type Table = NibbleTable;

    const WIDTH: usize = 32;

    fn level(&self) -> SimdLevel {
        SimdLevel::Avx2
    }

    #[inline]
    fn table(&self, coefficient: u8) -> NibbleTable {
        NibbleTable::new(coefficient)
    }

    #[inline]
    fn mul(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        let len = input.len().min(output.len());
        // SAFETY: an Avx2Kernel only exists once AVX2 and SSSE3 were detected
        let done = unsafe { process_slice_multiply_avx2(table, input, output, op) };
        if done < len {
            process_slice_multiply_nibble(table, &input[done..len], &mut output[done..len], op);
        }
    }

    #[inline]
    fn mul_scalar(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        process_slice_multiply_nibble(table, input, output, op);
    }
}

impl Kernel for Ssse3Kernel {
    type Table = NibbleTable;

    const WIDTH: usize = 16;

    fn level(&self) -> SimdLevel {
        SimdLevel::Ssse3
    }

    #[inline]
    fn table(&self, coefficient: u8) -> NibbleTable {
        NibbleTable::new(coefficient)
    }

    #[inline]
    fn mul(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        let len = input.len().min(output.len());
        // SAFETY: an Ssse3Kernel only exists once SSSE3 was detected
        let done = unsafe { process_slice_multiply_ssse3(table, input, output, op) };
        if done < len {
            process_slice_multiply_nibble(table, &input[done..len], &mut output[done..len], op);
        }
    }

    #[inline]
    fn mul_scalar(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        process_slice_multiply_nibble(table, input, output, op);
    }
}
