//! Galois Field GF(2^8) arithmetic for Reed-Solomon erasure coding
//!
//! ## Field Polynomial
//!
//! All arithmetic uses the primitive polynomial **0x11D** (x⁸ + x⁴ + x³ + x² + 1)
//! with generator 2. Addition is XOR; multiplication goes through log/antilog
//! tables or the precomputed 256×256 product table.
//!
//! ## Tables
//!
//! - `log` / `antilog`: O(1) multiply via `antilog[(log[a] + log[b]) % 255]`
//! - `mul`: full 64KB product table for the scalar path
//! - `inverse`: `inverse[a] = antilog[255 - log[a]]` for non-zero `a`
//! - [`NibbleTable`]: per-coefficient 32-byte split table consumed by the
//!   PSHUFB / NEON kernels
//!
//! Tables are built once per process on first use.

use std::sync::OnceLock;

/// GF(2^8) primitive polynomial: 0x11D (x⁸ + x⁴ + x³ + x² + 1)
pub const GF8_POLYNOMIAL: u16 = 0x11D;

/// Number of non-zero field elements (order of the multiplicative group)
const LIMIT: usize = 255;

/// Precomputed GF(2^8) lookup tables
pub struct GaloisTable {
    pub log: [u8; 256],
    pub antilog: [u8; 256],
    pub inverse: [u8; 256],
    pub mul: Box<[[u8; 256]]>,
}

impl Default for GaloisTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GaloisTable {
    pub fn new() -> Self {
        let mut log = [0u8; 256];
        let mut antilog = [0u8; 256];

        let mut b = 1u16;
        for l in 0..LIMIT {
            log[b as usize] = l as u8;
            antilog[l] = b as u8;

            b <<= 1;
            if b & 0x100 != 0 {
                b ^= GF8_POLYNOMIAL;
            }
        }
        // alpha^255 == alpha^0, lets (log a + log b) skip one modulo
        antilog[LIMIT] = antilog[0];

        let mut inverse = [0u8; 256];
        for a in 1..256 {
            inverse[a] = antilog[(LIMIT - log[a] as usize) % LIMIT];
        }

        let mut mul = vec![[0u8; 256]; 256].into_boxed_slice();
        for a in 1..256 {
            let log_a = log[a] as usize;
            for b in 1..256 {
                mul[a][b] = antilog[(log_a + log[b] as usize) % LIMIT];
            }
        }

        GaloisTable {
            log,
            antilog,
            inverse,
            mul,
        }
    }
}

/// Process-wide GF(2^8) tables, derived from the fixed polynomial on first use
#[inline]
pub fn tables() -> &'static GaloisTable {
    static TABLE: OnceLock<GaloisTable> = OnceLock::new();
    TABLE.get_or_init(GaloisTable::new)
}

/// Field multiplication
#[inline]
pub fn gf_mul(a: u8, b: u8) -> u8 {
    tables().mul[a as usize][b as usize]
}

/// Multiplicative inverse; zero has none
#[inline]
pub fn gf_inv(a: u8) -> Option<u8> {
    if a == 0 {
        None
    } else {
        Some(tables().inverse[a as usize])
    }
}

/// `base` raised to the `n`-th power. `0^0` is 1, as the Vandermonde
/// construction requires.
pub fn gf_exp(base: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if base == 0 {
        return 0;
    }
    let table = tables();
    let log_b = table.log[base as usize] as usize;
    table.antilog[(log_b * n) % LIMIT]
}

/// Row of the product table: `mul_table_row(c)[x] == c * x`
#[inline]
pub fn mul_table_row(coefficient: u8) -> &'static [u8; 256] {
    &tables().mul[coefficient as usize]
}

/// Split multiplication table for one coefficient
///
/// `low` maps a low nibble `n` to `c * n`; `high` maps a high nibble `n` to
/// `c * (n << 4)`. Since multiplication distributes over XOR,
/// `c * x == low[x & 0x0F] ^ high[x >> 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct NibbleTable {
    pub low: [u8; 16],
    pub high: [u8; 16],
}

impl NibbleTable {
    pub fn new(coefficient: u8) -> Self {
        let row = mul_table_row(coefficient);
        let mut low = [0u8; 16];
        let mut high = [0u8; 16];
        for nib in 0..16 {
            low[nib] = row[nib];
            high[nib] = row[nib << 4];
        }
        NibbleTable { low, high }
    }

    /// Scalar product through the split table
    #[inline]
    pub fn mul_byte(&self, x: u8) -> u8 {
        self.low[(x & 0x0F) as usize] ^ self.high[(x >> 4) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_antilog_roundtrip() {
        let table = tables();
        for a in 1..=255u8 {
            assert_eq!(table.antilog[table.log[a as usize] as usize], a);
        }
    }

    #[test]
    fn test_known_products() {
        // x * x^7 wraps through the polynomial: 0x80 << 1 = 0x100 ^ 0x11D
        assert_eq!(gf_mul(2, 0x80), 0x1D);
        assert_eq!(gf_mul(4, 6), 24);
        assert_eq!(gf_mul(2, 12), 24);
        assert_eq!(gf_mul(0, 77), 0);
        assert_eq!(gf_mul(1, 77), 77);
    }

    #[test]
    fn test_inverse_table() {
        assert_eq!(gf_inv(0), None);
        assert_eq!(gf_inv(1), Some(1));
        for a in 1..=255u8 {
            let inv = gf_inv(a).unwrap();
            assert_eq!(gf_mul(a, inv), 1, "inverse of {a} is wrong");
        }
    }

    #[test]
    fn test_exp() {
        assert_eq!(gf_exp(0, 0), 1);
        assert_eq!(gf_exp(0, 3), 0);
        assert_eq!(gf_exp(7, 1), 7);
        assert_eq!(gf_exp(3, 2), gf_mul(3, 3));
        assert_eq!(gf_exp(2, 8), 0x1D);
    }

    #[test]
    fn test_nibble_table_matches_product_table() {
        for c in [0u8, 1, 2, 0x1D, 0x8E, 0xFF] {
            let nib = NibbleTable::new(c);
            for x in 0..=255u8 {
                assert_eq!(nib.mul_byte(x), gf_mul(c, x));
            }
        }
    }

    #[test]
    fn test_nibble_table_layout() {
        let nib = NibbleTable::new(1);
        assert_eq!(nib.low[0x0F], 0x0F);
        assert_eq!(nib.high[0x01], 0x10);
        assert_eq!(nib.high[0x0F], 0xF0);
    }
}
