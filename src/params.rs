//! Public parameters of a LowMC instance.
//!
//! An instance is described by its S-box count `m`, block size `n`, round
//! count `r` and key size `k`, together with the randomly sampled linear layer
//! matrices, round constants and key matrices. Instances are sampled once and
//! then shared read-only between all repetitions of a proof.
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, debug, instrument};

use crate::gf2::{BitMatrix, BitVec};

/// Invalid LowMC parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The S-boxes don't fit into the block.
    #[error("3 * {sboxes} S-box bits exceed the block size {block_size}")]
    TooManySboxes {
        /// The requested number of S-boxes.
        sboxes: usize,
        /// The requested block size.
        block_size: usize,
    },
    /// One of block size, key size, S-box count or round count is zero.
    #[error("LowMC dimensions must be non-zero")]
    ZeroDimension,
    /// The sampled matrices or constants don't match the declared dimensions.
    #[error("{0} has the wrong dimensions")]
    DimensionMismatch(&'static str),
    /// The parameters could not be (de-)serialized.
    #[error("could not (de-)serialize LowMC parameters: {0}")]
    Serde(String),
}

/// The bit-plane masks used by the bitsliced S-box layer.
///
/// The nonlinear region is bits `0..3m`. S-box `j` operates on bits `3j`,
/// `3j + 1` and `3j + 2`, which are selected by `x0`, `x1` and `x2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SboxMasks {
    /// Bits outside of the nonlinear region, which the S-box layer passes through.
    pub linear: BitVec,
    /// The first input bit of every S-box.
    pub x0: BitVec,
    /// The second input bit of every S-box.
    pub x1: BitVec,
    /// The third input bit of every S-box.
    pub x2: BitVec,
}

impl SboxMasks {
    /// Computes the masks for `m` S-boxes in an `n`-bit block.
    pub fn new(m: usize, n: usize) -> Self {
        let mut x0 = BitVec::zero(n);
        let mut x1 = BitVec::zero(n);
        let mut x2 = BitVec::zero(n);
        for j in 0..m {
            x0.set(3 * j, true);
            x1.set(3 * j + 1, true);
            x2.set(3 * j + 2, true);
        }
        SboxMasks {
            linear: BitVec::ones(n, 3 * m..n),
            x0,
            x1,
            x2,
        }
    }
}

/// A public LowMC instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowmcParams {
    m: usize,
    n: usize,
    r: usize,
    k: usize,
    linear: Vec<BitMatrix>,
    constants: Vec<BitVec>,
    key_matrices: Vec<BitMatrix>,
    masks: SboxMasks,
}

/// Checks that `m` S-boxes fit into an `n`-bit block and no dimension is zero.
pub fn validate_dimensions(m: usize, n: usize, r: usize, k: usize) -> Result<(), Error> {
    if m == 0 || n == 0 || r == 0 || k == 0 {
        return Err(Error::ZeroDimension);
    }
    if 3 * m > n {
        return Err(Error::TooManySboxes {
            sboxes: m,
            block_size: n,
        });
    }
    Ok(())
}

impl LowmcParams {
    /// Samples a fresh instance: `r` invertible `n × n` linear layers, `r` round
    /// constants and `r + 1` full-rank `n × k` key matrices.
    #[instrument(level = Level::DEBUG, skip(rng), err)]
    pub fn generate<R: Rng + ?Sized>(
        m: usize,
        n: usize,
        r: usize,
        k: usize,
        rng: &mut R,
    ) -> Result<Self, Error> {
        validate_dimensions(m, n, r, k)?;
        let linear = (0..r).map(|_| sample_full_rank(n, n, rng)).collect();
        let constants = (0..r).map(|_| BitVec::random(n, rng)).collect();
        let key_matrices = (0..=r).map(|_| sample_full_rank(n, k, rng)).collect();
        debug!("sampled LowMC instance");
        Ok(LowmcParams {
            m,
            n,
            r,
            k,
            linear,
            constants,
            key_matrices,
            masks: SboxMasks::new(m, n),
        })
    }

    /// Builds an instance from explicitly given matrices and constants.
    pub fn from_parts(
        m: usize,
        n: usize,
        k: usize,
        linear: Vec<BitMatrix>,
        constants: Vec<BitVec>,
        key_matrices: Vec<BitMatrix>,
    ) -> Result<Self, Error> {
        let r = linear.len();
        validate_dimensions(m, n, r, k)?;
        if linear.iter().any(|l| l.nrows() != n || l.ncols() != n) {
            return Err(Error::DimensionMismatch("linear layer"));
        }
        if constants.len() != r || constants.iter().any(|c| c.len() != n) {
            return Err(Error::DimensionMismatch("round constants"));
        }
        if key_matrices.len() != r + 1
            || key_matrices.iter().any(|km| km.nrows() != n || km.ncols() != k)
        {
            return Err(Error::DimensionMismatch("key matrices"));
        }
        Ok(LowmcParams {
            m,
            n,
            r,
            k,
            linear,
            constants,
            key_matrices,
            masks: SboxMasks::new(m, n),
        })
    }

    /// Serializes the instance with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(|e| Error::Serde(e.to_string()))
    }

    /// Deserializes an instance produced by [`LowmcParams::to_bytes`] and checks
    /// its dimensions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let params: LowmcParams =
            bincode::deserialize(bytes).map_err(|e| Error::Serde(e.to_string()))?;
        let LowmcParams {
            m,
            n,
            k,
            linear,
            constants,
            key_matrices,
            masks,
            ..
        } = params;
        let params = Self::from_parts(m, n, k, linear, constants, key_matrices)?;
        if params.masks != masks {
            return Err(Error::DimensionMismatch("S-box masks"));
        }
        Ok(params)
    }

    /// Number of S-boxes per round.
    pub fn sboxes(&self) -> usize {
        self.m
    }

    /// Block size in bits.
    pub fn block_size(&self) -> usize {
        self.n
    }

    /// Number of rounds.
    pub fn rounds(&self) -> usize {
        self.r
    }

    /// Key size in bits.
    pub fn key_size(&self) -> usize {
        self.k
    }

    /// Linear layer matrix of round `i`.
    pub fn linear(&self, i: usize) -> &BitMatrix {
        &self.linear[i]
    }

    /// Round constant of round `i`.
    pub fn constant(&self, i: usize) -> &BitVec {
        &self.constants[i]
    }

    /// Key matrix `i`, for `i` in `0..=r`.
    pub fn key_matrix(&self, i: usize) -> &BitMatrix {
        &self.key_matrices[i]
    }

    /// The S-box bit-plane masks.
    pub fn masks(&self) -> &SboxMasks {
        &self.masks
    }
}

fn sample_full_rank<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> BitMatrix {
    let target = rows.min(cols);
    loop {
        let m = BitMatrix::random(rows, cols, rng);
        if m.rank() == target {
            return m;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn test_validate_dimensions() {
        assert_eq!(validate_dimensions(10, 30, 1, 1), Ok(()));
        assert_eq!(
            validate_dimensions(11, 32, 1, 1),
            Err(Error::TooManySboxes {
                sboxes: 11,
                block_size: 32
            })
        );
        assert_eq!(validate_dimensions(0, 32, 1, 1), Err(Error::ZeroDimension));
    }

    #[test]
    fn test_generate_dimensions() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let p = LowmcParams::generate(5, 64, 3, 40, &mut rng).unwrap();
        assert_eq!(p.rounds(), 3);
        for i in 0..3 {
            assert_eq!(p.linear(i).rank(), 64);
            assert_eq!(p.constant(i).len(), 64);
        }
        for i in 0..=3 {
            assert_eq!(p.key_matrix(i).nrows(), 64);
            assert_eq!(p.key_matrix(i).ncols(), 40);
            assert_eq!(p.key_matrix(i).rank(), 40);
        }
    }

    #[test]
    fn test_masks_partition_block() {
        let masks = SboxMasks::new(10, 64);
        assert_eq!(masks.x0.count_ones(), 10);
        assert_eq!(masks.x1.count_ones(), 10);
        assert_eq!(masks.x2.count_ones(), 10);
        assert_eq!(masks.linear.count_ones(), 34);
        let all = masks.linear.xor(&masks.x0).xor(&masks.x1).xor(&masks.x2);
        assert_eq!(all.count_ones(), 64);
        assert!(masks.x0.get(0) && masks.x1.get(1) && masks.x2.get(2));
        assert!(masks.linear.get(30) && !masks.linear.get(29));
    }

    #[test]
    fn test_bincode_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let p = LowmcParams::generate(2, 16, 2, 8, &mut rng).unwrap();
        let bytes = p.to_bytes().unwrap();
        assert_eq!(LowmcParams::from_bytes(&bytes).unwrap(), p);
        assert!(LowmcParams::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
