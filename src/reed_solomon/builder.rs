//! Encoder factory and the dispatch enum over kernel-specialised codecs

use super::cache::InverseCache;
use super::codec::Codec;
use super::config::EncoderConfig;
use super::error::{Result, RsError};
use super::matrix::{gen_enc_matrix, Construction, Matrix};
use super::scalar::ScalarKernel;
use super::simd::{detect_capabilities, CapabilitySet, SimdLevel};
use log::debug;

#[cfg(target_arch = "aarch64")]
use super::simd::NeonKernel;
#[cfg(target_arch = "x86_64")]
use super::simd::{Avx2Kernel, Ssse3Kernel};

/// A Reed-Solomon encoder for one `(data, parity, construction)` shape
///
/// Shareable across threads; each call works on caller-owned buffers and the
/// only shared mutable state is the inverse cache of accelerated variants.
#[derive(Debug)]
pub enum Encoder {
    /// Scalar reference path, always available
    Generic(Codec<ScalarKernel>),
    #[cfg(target_arch = "x86_64")]
    Avx2(Codec<Avx2Kernel>),
    #[cfg(target_arch = "x86_64")]
    Ssse3(Codec<Ssse3Kernel>),
    #[cfg(target_arch = "aarch64")]
    Neon(Codec<NeonKernel>),
}

macro_rules! dispatch {
    ($encoder:expr, $codec:ident => $body:expr) => {
        match $encoder {
            Encoder::Generic($codec) => $body,
            #[cfg(target_arch = "x86_64")]
            Encoder::Avx2($codec) => $body,
            #[cfg(target_arch = "x86_64")]
            Encoder::Ssse3($codec) => $body,
            #[cfg(target_arch = "aarch64")]
            Encoder::Neon($codec) => $body,
        }
    };
}

impl Encoder {
    /// Compute parity: the first `data_shards` entries are read, the rest
    /// must already have the same length and are overwritten
    ///
    /// Nothing is written when validation fails.
    pub fn encode<S: AsRef<[u8]> + AsMut<[u8]>>(&self, shards: &mut [S]) -> Result<()> {
        dispatch!(self, codec => codec.encode(shards))
    }

    /// Fill every absent (`None` or empty) shard in place
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        dispatch!(self, codec => codec.reconstruct(shards, false))
    }

    /// Fill absent data shards only; absent parity stays absent
    pub fn reconstruct_data(&self, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
        dispatch!(self, codec => codec.reconstruct(shards, true))
    }

    /// Recover exactly `lost_data` and `lost_parity` from `surviving`
    ///
    /// All buffers, including the lost slots, must be sized alike. Only the
    /// first `data_shards` survivors are read.
    pub fn reconstruct_with_pos<S: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        shards: &mut [S],
        surviving: &[usize],
        lost_data: &[usize],
        lost_parity: &[usize],
    ) -> Result<()> {
        dispatch!(self, codec => {
            codec.reconstruct_with_pos(shards, surviving, lost_data, lost_parity, false)
        })
    }

    /// Data-only counterpart of [`reconstruct_with_pos`](Self::reconstruct_with_pos)
    pub fn reconstruct_data_with_pos<S: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        shards: &mut [S],
        surviving: &[usize],
        lost_data: &[usize],
    ) -> Result<()> {
        dispatch!(self, codec => {
            codec.reconstruct_with_pos(shards, surviving, lost_data, &[], true)
        })
    }

    /// Whether the parity shards match the data shards
    pub fn verify<S: AsRef<[u8]>>(&self, shards: &[S]) -> Result<bool> {
        dispatch!(self, codec => codec.verify(shards))
    }

    pub fn data_shards(&self) -> usize {
        dispatch!(self, codec => codec.data_shards())
    }

    pub fn parity_shards(&self) -> usize {
        dispatch!(self, codec => codec.parity_shards())
    }

    pub fn total_shards(&self) -> usize {
        dispatch!(self, codec => codec.total_shards())
    }

    pub fn simd_level(&self) -> SimdLevel {
        dispatch!(self, codec => codec.simd_level())
    }

    /// The systematic `(d+p) × d` generator matrix
    pub fn encode_matrix(&self) -> &Matrix {
        dispatch!(self, codec => codec.matrix())
    }

    /// Inverses currently cached (always zero on the generic path)
    pub fn cache_len(&self) -> usize {
        dispatch!(self, codec => codec.cache_len())
    }

    pub fn caches_inverses(&self) -> bool {
        dispatch!(self, codec => codec.caches_inverses())
    }
}

/// Build an encoder for this CPU
///
/// ```
/// use rsfec::reed_solomon::{new_encoder, Construction};
///
/// let encoder = new_encoder(4, 2, Construction::Vandermonde).unwrap();
/// let mut shards = vec![vec![1u8, 2, 3]; 6];
/// encoder.encode(&mut shards).unwrap();
/// assert!(encoder.verify(&shards).unwrap());
/// ```
pub fn new_encoder(
    data_shards: usize,
    parity_shards: usize,
    construction: Construction,
) -> Result<Encoder> {
    EncoderBuilder::new(data_shards, parity_shards)
        .construction(construction)
        .build()
}

/// Builder for [`Encoder`] with explicit capabilities and configuration
///
/// # Example
///
/// ```
/// use rsfec::reed_solomon::{CapabilitySet, Construction, EncoderBuilder, SimdLevel};
///
/// let encoder = EncoderBuilder::new(10, 4)
///     .construction(Construction::Cauchy)
///     .capabilities(CapabilitySet::scalar_only())
///     .build()
///     .unwrap();
/// assert_eq!(encoder.simd_level(), SimdLevel::None);
/// ```
#[derive(Debug, Clone)]
pub struct EncoderBuilder {
    data_shards: usize,
    parity_shards: usize,
    capabilities: Option<CapabilitySet>,
    config: EncoderConfig,
}

impl EncoderBuilder {
    pub fn new(data_shards: usize, parity_shards: usize) -> Self {
        Self {
            data_shards,
            parity_shards,
            capabilities: None,
            config: EncoderConfig::default(),
        }
    }

    /// Set the generator matrix construction
    pub fn construction(mut self, construction: Construction) -> Self {
        self.config.construction = construction;
        self
    }

    /// Use an already probed capability set instead of probing in `build`
    pub fn capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Replace the whole configuration, construction included
    pub fn config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the encoder
    ///
    /// # Errors
    ///
    /// - [`RsError::InvalidShardCount`] if either count is zero
    /// - [`RsError::TooManyShards`] if `data + parity >= 256`
    pub fn build(self) -> Result<Encoder> {
        let (d, p) = (self.data_shards, self.parity_shards);
        if d == 0 || p == 0 {
            return Err(RsError::InvalidShardCount {
                data: d,
                parity: p,
            });
        }
        if d + p >= 256 {
            return Err(RsError::TooManyShards { total: d + p });
        }

        let matrix = gen_enc_matrix(d, p, self.config.construction)?;
        let caps = self.capabilities.unwrap_or_else(detect_capabilities);
        let cache = || self.config.caches(d, p).then(InverseCache::new);

        debug!(
            "Reed-Solomon encoder: {} data + {} parity, {:?} matrix, capabilities {:?}",
            d, p, self.config.construction, caps
        );

        #[cfg(target_arch = "x86_64")]
        if let Some(kernel) = Avx2Kernel::new(&caps) {
            debug!("Using AVX2 kernel, inverse cache {}", self.config.caches(d, p));
            return Ok(Encoder::Avx2(Codec::new(d, p, matrix, kernel, cache())));
        }

        #[cfg(target_arch = "x86_64")]
        if let Some(kernel) = Ssse3Kernel::new(&caps) {
            debug!("Using SSSE3 kernel, inverse cache {}", self.config.caches(d, p));
            return Ok(Encoder::Ssse3(Codec::new(d, p, matrix, kernel, cache())));
        }

        #[cfg(target_arch = "aarch64")]
        if let Some(kernel) = NeonKernel::new(&caps) {
            debug!("Using NEON kernel, inverse cache {}", self.config.caches(d, p));
            return Ok(Encoder::Neon(Codec::new(d, p, matrix, kernel, cache())));
        }

        debug!("Using scalar kernel");
        Ok(Encoder::Generic(Codec::new(d, p, matrix, ScalarKernel, None)))
    }
}
