//! PRG based on AES in CTR mode, used to expand the per-party seeds.
//!
//! The implementation follows the AES-CTR RNG of the
//! [scuttlebutt](https://github.com/GaloisInc/swanky/blob/4455754abadee07f168079ac45ef33535b0df27d/scuttlebutt/src/rand_aes.rs)
//! crate, using the [aes](`aes`) crate for the block cipher. The output stream
//! is `AES_seed(0) ‖ AES_seed(1) ‖ …` with the counter encoded as a little
//! endian `u128`. Prover and verifier must expand seeds identically, so the
//! stream must never depend on the target architecture.
use std::mem;

use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};
use rand::rand_core::block::{BlockRng, BlockRngCore, CryptoBlockRng};
use rand::{CryptoRng, RngCore, SeedableRng};

use crate::{
    gf2::{BitVec, words_for},
    seed::Seed,
};

/// A seed-expandable PRG: AES-128 keyed with a [`Seed`], run in counter mode.
#[derive(Clone, Debug)]
pub struct Prg(BlockRng<PrgCore>);

impl RngCore for Prg {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let block_size = mem::size_of::<aes::Block>();
        // Full blocks are only encrypted in place if nothing is buffered, otherwise
        // the byte stream would skip the buffered remainder.
        if self.0.index() < AES_PAR_BLOCKS * 4 {
            return self.0.fill_bytes(dest);
        }
        let block_len = dest.len() / block_size * block_size;
        let (block_bytes, rest_bytes) = dest.split_at_mut(block_len);
        let blocks = bytemuck::cast_slice_mut::<_, aes::Block>(block_bytes);
        for chunk in blocks.chunks_mut(AES_PAR_BLOCKS) {
            for block in chunk.iter_mut() {
                *block = aes::cipher::Array(self.0.core.counter.to_le_bytes());
                self.0.core.counter += 1;
            }
            self.0.core.aes.encrypt_blocks(chunk);
        }
        self.0.fill_bytes(rest_bytes)
    }
}

impl SeedableRng for Prg {
    type Seed = Seed;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        Prg(BlockRng::<PrgCore>::from_seed(seed))
    }
}

impl CryptoRng for Prg {}

impl Prg {
    /// Draws the next `len` bits of the stream as a vector.
    ///
    /// Always consumes whole 64-bit words, so consecutive vectors are read
    /// from consecutive parts of the stream.
    pub fn next_bitvec(&mut self, len: usize) -> BitVec {
        let mut bytes = vec![0_u8; words_for(len) * 8];
        self.fill_bytes(&mut bytes);
        BitVec::from_le_bytes(len, &bytes)
    }
}

/// The core of [`Prg`], used with [`BlockRng`].
#[derive(Clone)]
pub struct PrgCore {
    aes: Aes128,
    counter: u128,
}

impl std::fmt::Debug for PrgCore {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PrgCore {{}}")
    }
}

impl BlockRngCore for PrgCore {
    type Item = u32;
    // This is equivalent to `[aes::Block; AES_PAR_BLOCKS]`
    type Results = hidden::ParBlockWrapper;

    // Compute `E(counter)` for AES_PAR_BLOCKS consecutive counters.
    #[inline]
    fn generate(&mut self, results: &mut Self::Results) {
        let blocks = bytemuck::cast_slice_mut::<_, aes::Block>(results.as_mut());
        blocks.iter_mut().for_each(|blk| {
            // aes::Block is a type alias to Array, but type aliases can't be used as
            // constructors
            *blk = aes::cipher::Array(self.counter.to_le_bytes());
            self.counter += 1;
        });
        self.aes.encrypt_blocks(blocks);
    }
}

mod hidden {
    use crate::prg::AES_PAR_BLOCKS;

    /// Equivalent to [aes::Block; AES_PAR_BLOCKS]. Since large arrays don't impl Default we write a
    /// wrapper.
    #[derive(Copy, Clone)]
    pub struct ParBlockWrapper([u32; AES_PAR_BLOCKS * 4]);

    impl Default for ParBlockWrapper {
        fn default() -> Self {
            Self([0; AES_PAR_BLOCKS * 4])
        }
    }

    impl AsMut<[u32]> for ParBlockWrapper {
        fn as_mut(&mut self) -> &mut [u32] {
            &mut self.0
        }
    }

    impl AsRef<[u32]> for ParBlockWrapper {
        fn as_ref(&self) -> &[u32] {
            &self.0
        }
    }
}

impl SeedableRng for PrgCore {
    type Seed = Seed;

    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        let aes = Aes128::new(&seed.into());
        PrgCore {
            aes,
            counter: Default::default(),
        }
    }
}

impl CryptoBlockRng for PrgCore {}

/// The AND masks one party derives from its seed in one repetition.
#[derive(Debug, Clone)]
pub struct RandomTape {
    /// One AND mask vector per cipher round.
    pub masks: Vec<BitVec>,
}

impl RandomTape {
    /// Expands `seed` into `rounds` mask vectors of `block_bits` bits each.
    pub fn expand(seed: Seed, block_bits: usize, rounds: usize) -> RandomTape {
        Self::from_prg(&mut Prg::from_seed(seed), block_bits, rounds)
    }

    /// Expands `seed` into a `key_bits`-bit key share followed by the masks
    /// of [`RandomTape::expand`].
    pub fn expand_with_key(
        seed: Seed,
        key_bits: usize,
        block_bits: usize,
        rounds: usize,
    ) -> (BitVec, RandomTape) {
        let mut prg = Prg::from_seed(seed);
        let key_share = prg.next_bitvec(key_bits);
        (key_share, Self::from_prg(&mut prg, block_bits, rounds))
    }

    fn from_prg(prg: &mut Prg, block_bits: usize, rounds: usize) -> RandomTape {
        let masks = (0..rounds).map(|_| prg.next_bitvec(block_bits)).collect();
        RandomTape { masks }
    }
}

/// Number of Blocks for which hardware accelerated AES can make use of ILP.
///
/// This corresponds to `ParBlocksSize` in [`aes::cipher::ParBlocksSizeUser`]
/// for the SIMD backend on the target architecture.
/// Its value must not influence the output stream, only performance.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const AES_PAR_BLOCKS: usize = 9;
/// Number of Blocks for which hardware accelerated AES can make use of ILP.
#[cfg(target_arch = "aarch64")]
pub const AES_PAR_BLOCKS: usize = 21;
/// Number of Blocks for which hardware accelerated AES can make use of ILP.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
pub const AES_PAR_BLOCKS: usize = 4;
