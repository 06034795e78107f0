//! Reed-Solomon erasure coding over GF(2^8)
//!
//! The codec lives in [`reed_solomon`]; [`stripe`] and [`shard_file`] back the
//! `rsfec` command-line tool.

pub mod args;
pub mod reed_solomon;
pub mod shard_file;
pub mod stripe;

pub use args::parse_args;
pub use reed_solomon::{
    detect_capabilities, new_encoder, CapabilitySet, Construction, Encoder, EncoderBuilder,
    EncoderConfig, ErrorKind, RsError, SimdLevel,
};
