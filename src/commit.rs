//! Commitments to party views and the Fiat-Shamir challenge.
//!
//! All hashing uses SHA-256. Bit vectors are hashed as their little endian
//! 64-bit words, so a vector of `len` bits always contributes
//! `8 * ceil(len / 64)` bytes.
use std::fmt;

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

use crate::{gf2::BitVec, seed::Seed};

/// Length of a [`Commitment`] in bytes.
pub const COMMITMENT_LEN: usize = 32;
/// Length of the [`CommitRand`] blinding a commitment, in bytes.
pub const COMMITMENT_RAND_LEN: usize = 4;

/// A SHA-256 commitment to one party's seed and view.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment([u8; COMMITMENT_LEN]);

impl Commitment {
    /// Wraps a digest.
    pub const fn new(bytes: [u8; COMMITMENT_LEN]) -> Self {
        Commitment(bytes)
    }

    /// The digest bytes.
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment(")?;
        for b in &self.0[..4] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Commitment randomness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRand([u8; COMMITMENT_RAND_LEN]);

impl CommitRand {
    /// Wraps randomness bytes.
    pub const fn new(bytes: [u8; COMMITMENT_RAND_LEN]) -> Self {
        CommitRand(bytes)
    }

    /// The randomness bytes.
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_RAND_LEN] {
        &self.0
    }
}

impl Distribution<CommitRand> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> CommitRand {
        CommitRand(rng.random())
    }
}

fn update_bits(hasher: &mut Sha256, v: &BitVec) {
    for w in v.words() {
        hasher.update(w.to_le_bytes());
    }
}

/// Commits to a party: `H(seed ‖ y_0 ‖ y_1 ‖ y_2 ‖ view ‖ rand)`.
///
/// `outputs` are the output shares of all three parties in party order, `view`
/// yields the party's view slots in order.
pub fn commit<'a>(
    seed: &Seed,
    outputs: [&BitVec; 3],
    view: impl IntoIterator<Item = &'a BitVec>,
    rand: &CommitRand,
) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    for y in outputs {
        update_bits(&mut hasher, y);
    }
    for slot in view {
        update_bits(&mut hasher, slot);
    }
    hasher.update(rand.as_bytes());
    Commitment(hasher.finalize().into())
}

/// A challenge trit is not in `{0, 1, 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid challenge trit for repetition {0}")]
pub struct InvalidTrit(pub usize);

/// A Fiat-Shamir challenge: one trit per repetition, naming the first of the
/// two opened parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    trits: Vec<u8>,
}

impl Challenge {
    /// Builds a challenge from trits, failing on the first trit above 2.
    pub fn from_trits(trits: Vec<u8>) -> Result<Self, InvalidTrit> {
        if let Some(i) = trits.iter().position(|&t| t > 2) {
            return Err(InvalidTrit(i));
        }
        Ok(Challenge { trits })
    }

    /// Number of repetitions the challenge covers.
    pub fn len(&self) -> usize {
        self.trits.len()
    }

    /// Whether the challenge covers no repetitions.
    pub fn is_empty(&self) -> bool {
        self.trits.is_empty()
    }

    /// The trit of repetition `i`.
    pub fn trit(&self, i: usize) -> u8 {
        self.trits[i]
    }

    /// All trits in repetition order.
    pub fn trits(&self) -> &[u8] {
        &self.trits
    }

    /// Packs four trits per byte, trit `i` at bits `2 * (i % 4)` of byte `i / 4`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0_u8; self.trits.len().div_ceil(4)];
        for (i, &t) in self.trits.iter().enumerate() {
            bytes[i / 4] |= t << (2 * (i % 4));
        }
        bytes
    }
}

impl ConstantTimeEq for Challenge {
    fn ct_eq(&self, other: &Self) -> Choice {
        if self.trits.len() != other.trits.len() {
            return Choice::from(0);
        }
        self.to_bytes().ct_eq(&other.to_bytes())
    }
}

/// Derives the challenge for `commitments[rep][party]` and `message`.
///
/// Trits are read as consecutive bit pairs of `h = H(commitments ‖ message)`,
/// least significant bits first, skipping the value 3. Once all 256 bits of
/// `h` are used up, `h` is replaced by `H(h)`.
pub fn derive_challenge(commitments: &[[Commitment; 3]], message: &[u8]) -> Challenge {
    let mut hasher = Sha256::new();
    for rep in commitments {
        for c in rep {
            hasher.update(c.as_bytes());
        }
    }
    hasher.update(message);
    let mut h: [u8; 32] = hasher.finalize().into();

    let mut trits = Vec::with_capacity(commitments.len());
    let mut t = 0;
    while trits.len() < commitments.len() {
        if t == 8 * h.len() {
            h = Sha256::digest(h).into();
            t = 0;
        }
        let trit = (h[t / 8] >> (t % 8)) & 3;
        t += 2;
        if trit < 3 {
            trits.push(trit);
        }
    }
    Challenge { trits }
}

/// Recomputes the challenge from the verifier's side.
///
/// `opened[rep]` are the recomputed commitments of the opened parties `e` and
/// `e + 1`, `closed[rep]` is the transmitted commitment of party `e + 2`, where
/// `e` is the trit of `challenge` for that repetition.
pub fn recompute_challenge(
    opened: &[[Commitment; 2]],
    closed: &[Commitment],
    challenge: &Challenge,
    message: &[u8],
) -> Challenge {
    let commitments: Vec<[Commitment; 3]> = opened
        .iter()
        .zip(closed)
        .zip(challenge.trits())
        .map(|((&[a, b], &c), &e)| match e {
            0 => [a, b, c],
            1 => [c, a, b],
            _ => [b, c, a],
        })
        .collect();
    derive_challenge(&commitments, message)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    /// Reads trits from the bit stream `h ‖ H(h) ‖ H(H(h)) ‖ …`.
    fn reference_trits(commitments: &[[Commitment; 3]], message: &[u8]) -> Vec<u8> {
        let mut data = vec![];
        for c in commitments.iter().flatten() {
            data.extend_from_slice(c.as_bytes());
        }
        data.extend_from_slice(message);
        let mut block: Vec<u8> = Sha256::digest(&data).to_vec();
        let mut bits = vec![];
        for _ in 0..64 {
            for byte in &block {
                for i in 0..8 {
                    bits.push((byte >> i) & 1);
                }
            }
            block = Sha256::digest(&block).to_vec();
        }
        bits.chunks(2)
            .map(|pair| pair[0] | (pair[1] << 1))
            .filter(|&t| t < 3)
            .take(commitments.len())
            .collect()
    }

    fn random_commitments(n: usize, rng: &mut ChaCha20Rng) -> Vec<[Commitment; 3]> {
        (0..n)
            .map(|_| std::array::from_fn(|_| Commitment::new(rng.random())))
            .collect()
    }

    #[test]
    fn test_challenge_matches_reference() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        // more than 128 trits force at least one rehash
        for reps in [1, 5, 128, 219, 400] {
            let commitments = random_commitments(reps, &mut rng);
            let challenge = derive_challenge(&commitments, b"message");
            assert_eq!(challenge.trits(), reference_trits(&commitments, b"message"));
        }
    }

    #[test]
    fn test_challenge_depends_on_message() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let commitments = random_commitments(64, &mut rng);
        let a = derive_challenge(&commitments, b"a");
        let b = derive_challenge(&commitments, b"b");
        assert_eq!(a, derive_challenge(&commitments, b"a"));
        assert_ne!(a, b);
        assert!(!bool::from(a.ct_eq(&b)));
    }

    #[test]
    fn test_recompute_challenge() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let commitments = random_commitments(50, &mut rng);
        let challenge = derive_challenge(&commitments, b"msg");
        let mut opened = vec![];
        let mut closed = vec![];
        for (rep, &e) in commitments.iter().zip(challenge.trits()) {
            let e = e as usize;
            opened.push([rep[e], rep[(e + 1) % 3]]);
            closed.push(rep[(e + 2) % 3]);
        }
        let recomputed = recompute_challenge(&opened, &closed, &challenge, b"msg");
        assert!(bool::from(recomputed.ct_eq(&challenge)));

        closed[7] = Commitment::default();
        let recomputed = recompute_challenge(&opened, &closed, &challenge, b"msg");
        assert!(!bool::from(recomputed.ct_eq(&challenge)));
    }

    #[test]
    fn test_packing() {
        let challenge = Challenge::from_trits(vec![1, 2, 0, 2, 1]).unwrap();
        assert_eq!(challenge.to_bytes(), vec![0b10_00_10_01, 0b01]);
    }

    #[test]
    fn test_from_trits_rejects_out_of_range() {
        assert_eq!(Challenge::from_trits(vec![0, 1, 3]), Err(InvalidTrit(2)));
        assert_eq!(Challenge::from_trits(vec![2, 7, 9]), Err(InvalidTrit(1)));
        assert!(Challenge::from_trits(vec![]).is_ok_and(|c| c.is_empty()));
    }

    #[test]
    fn test_commitment_binds_inputs() {
        let seed = Seed::new([3; 16]);
        let y = [BitVec::zero(64), BitVec::zero(64), BitVec::zero(64)];
        let view = vec![BitVec::zero(16), BitVec::zero(64)];
        let rand = CommitRand::new([1, 2, 3, 4]);
        let c = commit(&seed, [&y[0], &y[1], &y[2]], &view, &rand);
        assert_eq!(c, commit(&seed, [&y[0], &y[1], &y[2]], &view, &rand));

        let other_rand = CommitRand::new([1, 2, 3, 5]);
        assert_ne!(c, commit(&seed, [&y[0], &y[1], &y[2]], &view, &other_rand));

        let mut flipped = view.clone();
        flipped[1].set(63, true);
        assert_ne!(c, commit(&seed, [&y[0], &y[1], &y[2]], &flipped, &rand));

        let other_seed = Seed::new([4; 16]);
        assert_ne!(c, commit(&other_seed, [&y[0], &y[1], &y[2]], &view, &rand));
    }
}
