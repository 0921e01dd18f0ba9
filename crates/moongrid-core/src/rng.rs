//! Deterministic random sources
//!
//! Every draw in a run flows from one [`UniformSource`]. Features, the three
//! base grids and therefore every still and animation frame are reproducible
//! from the seed of that source alone.
//!
//! ```text
//! UniformSource (ChaCha8 / sfc32 / any RngCore)
//!        │
//!        ▼
//!   LatentRng ── sample() ──▶ [0, 1)
//!             └─ gaussian() ─▶ Box-Muller N(mean, std)
//! ```

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

use crate::error::{CoreError, Result};

/// Smallest `u1` fed into `ln` by the Box-Muller transform
pub const MIN_UNIFORM: f64 = f64::MIN_POSITIVE;

/// Base58 alphabet used by token hashes
pub const HASH_ALPHABET: &str = "123456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

/// A seedable source of uniform values in `[0, 1)`
pub trait UniformSource {
    /// Next uniform value in `[0, 1)`
    fn next_uniform(&mut self) -> f64;
}

impl<S: UniformSource + ?Sized> UniformSource for Box<S> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

impl<S: UniformSource + ?Sized> UniformSource for &mut S {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// ChaCha8 stream seeded from a `u64`
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: ChaCha8Rng,
}

impl SeededSource {
    /// Create a source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl UniformSource for SeededSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Adapter for any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: RngCore> UniformSource for RngSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Small fast counter generator (sfc32) as used by generative token platforms.
///
/// Seeded from a base58 token hash so that a run can be replayed from the
/// hash a collector sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sfc32Source {
    a: u32,
    b: u32,
    c: u32,
    d: u32,
}

impl Sfc32Source {
    /// Create a generator from raw state words
    pub fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    /// Create a generator from a token hash such as `oo7Xf...`.
    ///
    /// The two-character prefix is dropped, the remainder is cut into chunks
    /// of `len / 4` characters and the first four chunks are base58 decoded
    /// with 32-bit wrapping arithmetic. Missing chunks seed as zero.
    pub fn from_hash(hash: &str) -> Result<Self> {
        let chars: Vec<char> = hash.chars().collect();
        let chunk = chars.len() / 4;
        if chars.len() < 2 || chunk == 0 {
            return Err(CoreError::InvalidHash(hash.to_string()));
        }

        let mut state = [0u32; 4];
        for (slot, part) in state.iter_mut().zip(chars[2..].chunks_exact(chunk)) {
            *slot = decode_base58(part).ok_or_else(|| CoreError::InvalidHash(hash.to_string()))?;
        }

        Ok(Self::new(state[0], state[1], state[2], state[3]))
    }

    /// Next raw 32-bit output
    pub fn next_u32(&mut self) -> u32 {
        let t = self.a.wrapping_add(self.b).wrapping_add(self.d);
        self.d = self.d.wrapping_add(1);
        self.a = self.b ^ (self.b >> 9);
        self.b = self.c.wrapping_add(self.c << 3);
        self.c = self.c.rotate_left(21).wrapping_add(t);
        t
    }
}

impl UniformSource for Sfc32Source {
    fn next_uniform(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }
}

fn decode_base58(chars: &[char]) -> Option<u32> {
    chars
        .iter()
        .try_fold(0i32, |acc, c| {
            let digit = HASH_ALPHABET.find(*c)? as i32;
            Some(acc.wrapping_mul(58).wrapping_add(digit))
        })
        .map(|v| v as u32)
}

/// Gaussian sampling on top of a uniform source
#[derive(Debug, Clone)]
pub struct LatentRng<S> {
    source: S,
}

impl<S: UniformSource> LatentRng<S> {
    /// Wrap a uniform source
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Uniform value in `[0, 1)`
    pub fn sample(&mut self) -> f64 {
        self.source.next_uniform()
    }

    /// Normally distributed value via the Box-Muller transform.
    ///
    /// Consumes exactly two uniform draws. A zero `u1` is clamped to
    /// [`MIN_UNIFORM`] so the result is always finite.
    pub fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        let u1 = self.source.next_uniform().max(MIN_UNIFORM);
        let u2 = self.source.next_uniform();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        z0 * std + mean
    }

    /// `n` independent normal draws
    pub fn gaussian_n(&mut self, n: usize, mean: f64, std: f64) -> Vec<f64> {
        (0..n).map(|_| self.gaussian(mean, std)).collect()
    }

    /// Borrow the underlying source
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the underlying source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl LatentRng<SeededSource> {
    /// Gaussian sampler over a ChaCha8 stream
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededSource::new(seed))
    }
}
