//! ARM NEON SIMD kernel for GF(2^8) multiplication
//!
//! Uses ARM NEON table lookup instructions (vqtbl1q_u8) for 16 parallel
//! nibble lookups. Same technique as x86 PSHUFB but using ARM intrinsics.

use super::common::process_slice_multiply_nibble;
use super::{CapabilitySet, SimdLevel};
use crate::reed_solomon::galois::NibbleTable;
use crate::reed_solomon::kernel::{Kernel, WriteOp};
use std::arch::aarch64::*;

/// NEON kernel. Only constructible when the CPU reports NEON.
#[derive(Debug, Clone, Copy)]
pub struct NeonKernel {
    _verified: (),
}

impl NeonKernel {
    pub fn new(caps: &CapabilitySet) -> Option<Self> {
        (caps.neon && std::arch::is_aarch64_feature_detected!("neon"))
            .then_some(Self { _verified: () })
    }
}

/// ARM NEON implementation of GF(2^8) multiply
///
/// Processes 16 bytes at a time and returns the number of bytes handled.
///
/// # Safety
/// - Requires ARM NEON support (all ARM64 CPUs have this)
/// - `input` and `output` slices must not alias
#[target_feature(enable = "neon")]
pub unsafe fn process_slice_multiply_neon(
    table: &NibbleTable,
    input: &[u8],
    output: &mut [u8],
    op: WriteOp,
) -> usize {
    let len = input.len().min(output.len());
    let simd_end = len - len % 16;

    let tbl_lo = vld1q_u8(table.low.as_ptr());
    let tbl_hi = vld1q_u8(table.high.as_ptr());
    let mask = vdupq_n_u8(0x0F);

    let in_ptr = input.as_ptr();
    let out_ptr = output.as_mut_ptr();
    let mut idx = 0;

    while idx < simd_end {
        let in_vec = vld1q_u8(in_ptr.add(idx));

        let lo_nibbles = vandq_u8(in_vec, mask);
        let hi_nibbles = vshrq_n_u8(in_vec, 4);

        let product = veorq_u8(vqtbl1q_u8(tbl_lo, lo_nibbles), vqtbl1q_u8(tbl_hi, hi_nibbles));

        let result = match op {
            WriteOp::Direct => product,
            WriteOp::Add => veorq_u8(vld1q_u8(out_ptr.add(idx)), product),
        };

        vst1q_u8(out_ptr.add(idx), result);
        idx += 16;
    }

    simd_end
}

impl Kernel for NeonKernel {
    type Table = NibbleTable;

    const WIDTH: usize = 16;

    fn level(&self) -> SimdLevel {
        SimdLevel::Neon
    }

    #[inline]
    fn table(&self, coefficient: u8) -> NibbleTable {
        NibbleTable::new(coefficient)
    }

    #[inline]
    fn mul(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        let len = input.len().min(output.len());
        // SAFETY: a NeonKernel only exists once NEON was detected
        let done = unsafe { process_slice_multiply_neon(table, input, output, op) };
        if done < len {
            process_slice_multiply_nibble(table, &input[done..len], &mut output[done..len], op);
        }
    }

    #[inline]
    fn mul_scalar(&self, table: &NibbleTable, input: &[u8], output: &mut [u8], op: WriteOp) {
        process_slice_multiply_nibble(table, input, output, op);
    }
}
