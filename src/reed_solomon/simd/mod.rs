//! SIMD-accelerated GF(2^8) multiplication for Reed-Solomon operations
//!
//! Provides platform-specific kernels selected by an explicit capability probe:
//! - x86_64: PSHUFB (AVX2 32-byte, SSSE3 16-byte) → scalar
//! - ARM64: NEON `vqtbl1q_u8` (16-byte) → scalar
//! - Other: scalar
//!
//! Based on the "Screaming Fast Galois Field Arithmetic" paper: each byte is
//! split into two nibbles and both partial products come from 16-entry
//! shuffle lookups, recombined by XOR.
//!
//! [`detect_capabilities`] is a pure probe. The composition root calls it
//! once and hands the result to the encoder factory; nothing here caches it.

pub mod common;
#[cfg(target_arch = "aarch64")]
pub mod neon;
#[cfg(target_arch = "x86_64")]
pub mod pshufb;

pub use common::process_slice_multiply_nibble;

#[cfg(target_arch = "aarch64")]
pub use neon::NeonKernel;
#[cfg(target_arch = "x86_64")]
pub use pshufb::{Avx2Kernel, Ssse3Kernel};

/// SIMD implementation to use for the current platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdLevel {
    /// No SIMD available, use scalar kernel
    None,
    /// x86_64 SSSE3 (128-bit PSHUFB)
    Ssse3,
    /// x86_64 AVX2 (256-bit PSHUFB)
    Avx2,
    /// ARM64 NEON (128-bit TBL)
    Neon,
}

impl SimdLevel {
    /// Native vector width in bytes
    pub const fn width(self) -> usize {
        match self {
            SimdLevel::None => 1,
            SimdLevel::Ssse3 | SimdLevel::Neon => 16,
            SimdLevel::Avx2 => 32,
        }
    }
}

/// CPU features relevant to the GF(2^8) kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    pub avx2: bool,
    pub ssse3: bool,
    pub neon: bool,
}

impl CapabilitySet {
    /// No vector capability; forces the generic encoder
    pub const fn scalar_only() -> Self {
        Self {
            avx2: false,
            ssse3: false,
            neon: false,
        }
    }

    /// Best kernel this capability set allows
    pub fn best_level(&self) -> SimdLevel {
        if self.avx2 && self.ssse3 {
            SimdLevel::Avx2
        } else if self.ssse3 {
            SimdLevel::Ssse3
        } else if self.neon {
            SimdLevel::Neon
        } else {
            SimdLevel::None
        }
    }

    /// Same set, narrowed so `best_level` is at most `level`
    pub fn limited_to(&self, level: SimdLevel) -> Self {
        match level {
            SimdLevel::None => Self::scalar_only(),
            SimdLevel::Ssse3 => Self {
                avx2: false,
                neon: false,
                ..*self
            },
            SimdLevel::Avx2 => Self {
                neon: false,
                ..*self
            },
            SimdLevel::Neon => Self {
                avx2: false,
                ssse3: false,
                ..*self
            },
        }
    }
}

/// Probe the CPU for the GF(2^8) kernel features
///
/// # Platform-specific behavior:
/// - **x86_64**: AVX2 and SSSE3 via `is_x86_feature_detected!`
/// - **ARM64**: NEON via `is_aarch64_feature_detected!`
/// - **Other**: nothing
pub fn detect_capabilities() -> CapabilitySet {
    #[allow(unused_mut)]
    let mut caps = CapabilitySet::scalar_only();

    #[cfg(target_arch = "x86_64")]
    {
        caps.avx2 = is_x86_feature_detected!("avx2");
        caps.ssse3 = is_x86_feature_detected!("ssse3");
    }

    #[cfg(target_arch = "aarch64")]
    {
        caps.neon = std::arch::is_aarch64_feature_detected!("neon");
    }

    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_capabilities_returns_valid_level() {
        let level = detect_capabilities().best_level();

        #[cfg(target_arch = "x86_64")]
        {
            // On x86_64, should NEVER return Neon
            assert_ne!(level, SimdLevel::Neon);
            println!("x86_64 SIMD level: {:?}", level);
        }

        #[cfg(target_arch = "aarch64")]
        {
            assert_eq!(level, SimdLevel::Neon);
            println!("ARM64 SIMD level: {:?}", level);
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        assert_eq!(level, SimdLevel::None);
    }

    #[test]
    fn best_level_prefers_widest() {
        let all = CapabilitySet {
            avx2: true,
            ssse3: true,
            neon: false,
        };
        assert_eq!(all.best_level(), SimdLevel::Avx2);
        assert_eq!(all.limited_to(SimdLevel::Ssse3).best_level(), SimdLevel::Ssse3);
        assert_eq!(all.limited_to(SimdLevel::None).best_level(), SimdLevel::None);

        // AVX2 without SSSE3 is not a usable PSHUFB target
        let odd = CapabilitySet {
            avx2: true,
            ssse3: false,
            neon: false,
        };
        assert_eq!(odd.best_level(), SimdLevel::None);
    }

    #[test]
    fn simd_level_widths() {
        assert_eq!(SimdLevel::None.width(), 1);
        assert_eq!(SimdLevel::Ssse3.width(), 16);
        assert_eq!(SimdLevel::Neon.width(), 16);
        assert_eq!(SimdLevel::Avx2.width(), 32);
    }

    #[test]
    fn scalar_only_has_no_features() {
        assert_eq!(CapabilitySet::scalar_only().best_level(), SimdLevel::None);
        assert_eq!(CapabilitySet::default(), CapabilitySet::scalar_only());
    }
}
