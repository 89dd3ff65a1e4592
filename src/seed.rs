//! A 128-bit [`Seed`] type for the per-party PRGs.
use std::fmt;

use aes::cipher::{self, array::sizes};
use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};

/// Length of a [`Seed`] in bytes.
pub const SEED_LEN: usize = 16;

/// The secret seed of one simulated party in one repetition.
///
/// A seed keys the party's [`Prg`](crate::prg::Prg), from which its key share
/// and random AND masks are expanded. Comparison runs in constant time.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Create a new seed from bytes.
    #[inline]
    pub const fn new(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Bytes of the seed.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Seed {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Seed {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

// Seeds are secret, so we don't print them.
impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

impl ConstantTimeEq for Seed {
    #[inline]
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Seed {}

impl Distribution<Seed> for StandardUniform {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Seed {
        let mut bytes = [0; SEED_LEN];
        rng.fill_bytes(&mut bytes);
        Seed::new(bytes)
    }
}

impl From<Seed> for cipher::Array<u8, sizes::U16> {
    #[inline]
    fn from(value: Seed) -> Self {
        Self(value.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn test_random_seeds_differ() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let a: Seed = rng.random();
        let b: Seed = rng.random();
        assert_ne!(a, b);
        assert_ne!(a, Seed::new([0; SEED_LEN]));
    }

    #[test]
    fn test_debug_hides_bytes() {
        let seed = Seed::new([0xab; 16]);
        assert_eq!(format!("{seed:?}"), "Seed(..)");
    }
}
