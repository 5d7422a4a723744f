//! Deterministic RNG wrapper using PCG32.
//!
//! The only randomness in the engine is the normal filter's angular
//! noise; it must be reproducible for identical inputs, so all of it
//! flows through this wrapper.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Wrapper around PCG32 for deterministic random number generation.
#[derive(Clone)]
pub struct DeterministicRng {
    inner: Pcg32,
}

impl DeterministicRng {
    /// Create a new RNG from a 32-bit seed, expanded to 64 bits by
    /// duplicating the bits.
    pub fn new(seed: u32) -> Self {
        let seed64 = (seed as u64) | ((seed as u64) << 32);
        Self {
            inner: Pcg32::seed_from_u64(seed64),
        }
    }

    /// Derive a seed for a named variant using BLAKE3.
    pub fn derive_variant_seed(base_seed: u32, variant_id: &str) -> u32 {
        let mut input = Vec::with_capacity(4 + variant_id.len());
        input.extend_from_slice(&base_seed.to_le_bytes());
        input.extend_from_slice(variant_id.as_bytes());
        let hash = blake3::hash(&input);
        let bytes: [u8; 4] = hash.as_bytes()[0..4].try_into().unwrap();
        u32::from_le_bytes(bytes)
    }

    /// Generate a random f32 in the range [0.0, 1.0).
    #[inline]
    pub fn gen_f32(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Generate a random f32 in the range [-1.0, 1.0).
    #[inline]
    pub fn gen_signed_f32(&mut self) -> f32 {
        self.gen_f32() * 2.0 - 1.0
    }
}
