//! Reed-Solomon erasure coding over GF(2^8)
//!
//! Systematic `(d + p)` codes: the first `d` shards carry the data unchanged
//! and any `d` of the `d + p` shards are enough to rebuild the rest.
//!
//! One algorithm ([`codec`]) runs over an injected multiply kernel
//! ([`kernel`]): the scalar kernel backs the generic encoder, the SIMD kernels
//! back the accelerated ones. [`new_encoder`] and [`EncoderBuilder`] pick the
//! kernel from a [`CapabilitySet`].

pub mod builder;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod galois;
pub mod kernel;
pub mod matrix;
pub mod scalar;
pub mod simd;

pub use builder::{new_encoder, Encoder, EncoderBuilder};
pub use cache::{InverseCache, SurvivorSet};
pub use codec::Codec;
pub use config::{EncoderConfig, UNIT_SIZE};
pub use error::{ErrorKind, Result, RsError};
pub use galois::{gf_exp, gf_inv, gf_mul, mul_table_row, NibbleTable, GF8_POLYNOMIAL};
pub use kernel::{Kernel, WriteOp};
pub use matrix::{
    gen_enc_matrix, gen_enc_matrix_cauchy, gen_enc_matrix_vandermonde, Construction, Matrix,
};
pub use scalar::ScalarKernel;
pub use simd::{detect_capabilities, CapabilitySet, SimdLevel};
