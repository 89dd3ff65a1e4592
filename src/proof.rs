//! Signatures and their byte encoding.
//!
//! ```text
//! challenge        ceil(T / 4) bytes, 4 trits per byte
//! per repetition:
//!   seed_a, seed_b          2 × 16 bytes
//!   rand_a, rand_b          2 × 4 bytes
//!   closed commitment       32 bytes
//! per repetition:
//!   bits, least significant first, zero padded to a byte:
//!     input share   k bits
//!     round views   r × 3m bits
//!     output share  n bits
//! ```
//!
//! Decoding only accepts canonical encodings: unused challenge bits and
//! padding bits must be zero and no trit may be 3.
use std::collections::TryReserveError;

use thiserror::Error;
use tracing::{Level, instrument};

use crate::{
    commit::{
        COMMITMENT_LEN, COMMITMENT_RAND_LEN, Challenge, CommitRand, Commitment, InvalidTrit,
    },
    gf2::BitVec,
    seed::{SEED_LEN, Seed},
    signature::Instance,
};

/// Errors while encoding or decoding a [`Proof`].
#[derive(Debug, Error)]
pub enum Error {
    /// The encoding has the wrong number of bytes for the instance.
    #[error("expected a proof of {expected} bytes, found {actual}")]
    WrongLength {
        /// The size of a proof for the instance.
        expected: usize,
        /// The size of the given bytes.
        actual: usize,
    },
    /// A challenge trit has the value 3.
    #[error(transparent)]
    InvalidTrit(#[from] InvalidTrit),
    /// Bits that must be zero are set.
    #[error("non-canonical encoding: {0} has bits set")]
    NonCanonical(&'static str),
    /// The proof does not match the shape of the instance.
    #[error("proof does not match the instance: {0}")]
    Shape(&'static str),
    /// The output buffer could not be allocated.
    #[error("could not allocate proof buffer: {0}")]
    Allocation(#[from] TryReserveError),
}

/// The opened data of one repetition.
///
/// Party `a` is the challenge trit `e`, party `b` is `e + 1 (mod 3)` and
/// party `c = e + 2 (mod 3)` stays closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundProof {
    /// Seeds of parties `a` and `b`.
    pub seeds: [Seed; 2],
    /// Commitment randomness of parties `a` and `b`.
    pub rands: [CommitRand; 2],
    /// The commitment of the closed party `c`.
    pub closed: Commitment,
    /// The key share of party 2 if it is opened, zero otherwise.
    pub input_share: BitVec,
    /// The recorded AND gate outputs of party `b`, one `n`-bit vector per round
    /// with only the low `3m` bits set.
    pub views: Vec<BitVec>,
    /// The output share of party `b`.
    pub output_share: BitVec,
}

/// A signature: the challenge and one [`RoundProof`] per repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// The Fiat-Shamir challenge.
    pub challenge: Challenge,
    /// Opened data for every repetition.
    pub rounds: Vec<RoundProof>,
}

/// Number of bytes of a serialized proof.
pub fn signature_size(m: usize, n: usize, r: usize, k: usize, repetitions: usize) -> usize {
    let fixed = 2 * SEED_LEN + 2 * COMMITMENT_RAND_LEN + COMMITMENT_LEN;
    repetitions.div_ceil(4) + repetitions * (fixed + view_bits(m, n, r, k).div_ceil(8))
}

fn view_bits(m: usize, n: usize, r: usize, k: usize) -> usize {
    k + 3 * m * r + n
}

/// Appends bit ranges to a packed vector.
struct BitWriter {
    bits: BitVec,
    pos: usize,
}

impl BitWriter {
    fn new(len: usize) -> Self {
        BitWriter {
            bits: BitVec::zero(len),
            pos: 0,
        }
    }

    /// Appends the first `count` bits of `v`.
    fn push(&mut self, v: &BitVec, count: usize) {
        for bit in v.bits().take(count) {
            self.bits.set(self.pos, bit);
            self.pos += 1;
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.bits.to_le_bytes();
        bytes.truncate(self.bits.len().div_ceil(8));
        bytes
    }
}

/// Reads consecutive bit ranges from a packed vector.
struct BitReader {
    bits: BitVec,
    pos: usize,
}

impl BitReader {
    /// Reads `count` bits into a vector of `len >= count` bits.
    fn take(&mut self, count: usize, len: usize) -> BitVec {
        let mut v = BitVec::zero(len);
        for i in 0..count {
            v.set(i, self.bits.get(self.pos + i));
        }
        self.pos += count;
        v
    }
}

impl Proof {
    pub(crate) fn check_shape(&self, instance: &Instance) -> Result<(), Error> {
        let params = instance.params();
        if self.rounds.len() != instance.repetitions()
            || self.challenge.len() != instance.repetitions()
        {
            return Err(Error::Shape("number of repetitions"));
        }
        for round in &self.rounds {
            if round.input_share.len() != params.key_size() {
                return Err(Error::Shape("input share"));
            }
            if round.output_share.len() != params.block_size() {
                return Err(Error::Shape("output share"));
            }
            if round.views.len() != params.rounds()
                || round.views.iter().any(|v| v.len() != params.block_size())
            {
                return Err(Error::Shape("round views"));
            }
        }
        Ok(())
    }

    /// Encodes the proof for `instance`.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub fn to_bytes(&self, instance: &Instance) -> Result<Vec<u8>, Error> {
        self.check_shape(instance)?;
        let params = instance.params();
        let (m, n, r, k) = (
            params.sboxes(),
            params.block_size(),
            params.rounds(),
            params.key_size(),
        );
        let mut out = Vec::new();
        out.try_reserve_exact(signature_size(m, n, r, k, instance.repetitions()))?;

        out.extend_from_slice(&self.challenge.to_bytes());
        for round in &self.rounds {
            for seed in &round.seeds {
                out.extend_from_slice(seed.as_bytes());
            }
            for rand in &round.rands {
                out.extend_from_slice(rand.as_bytes());
            }
            out.extend_from_slice(round.closed.as_bytes());
        }
        for round in &self.rounds {
            let mut writer = BitWriter::new(view_bits(m, n, r, k));
            writer.push(&round.input_share, k);
            for view in &round.views {
                writer.push(view, 3 * m);
            }
            writer.push(&round.output_share, n);
            out.extend_from_slice(&writer.into_bytes());
        }
        Ok(out)
    }

    /// Decodes a proof for `instance`, rejecting non-canonical encodings.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub fn from_bytes(instance: &Instance, bytes: &[u8]) -> Result<Proof, Error> {
        let params = instance.params();
        let (m, n, r, k) = (
            params.sboxes(),
            params.block_size(),
            params.rounds(),
            params.key_size(),
        );
        let reps = instance.repetitions();
        let expected = signature_size(m, n, r, k, reps);
        if bytes.len() != expected {
            return Err(Error::WrongLength {
                expected,
                actual: bytes.len(),
            });
        }

        let (challenge_bytes, mut rest) = bytes.split_at(reps.div_ceil(4));
        let challenge = parse_challenge(challenge_bytes, reps)?;

        let mut fixed = Vec::new();
        fixed.try_reserve_exact(reps)?;
        for _ in 0..reps {
            let seed_a = take::<SEED_LEN>(&mut rest);
            let seed_b = take::<SEED_LEN>(&mut rest);
            let rand_a = take::<COMMITMENT_RAND_LEN>(&mut rest);
            let rand_b = take::<COMMITMENT_RAND_LEN>(&mut rest);
            let closed = take::<COMMITMENT_LEN>(&mut rest);
            fixed.push((
                [Seed::new(seed_a), Seed::new(seed_b)],
                [CommitRand::new(rand_a), CommitRand::new(rand_b)],
                Commitment::new(closed),
            ));
        }

        let total_bits = view_bits(m, n, r, k);
        let chunk_len = total_bits.div_ceil(8);
        let mut rounds = Vec::new();
        rounds.try_reserve_exact(reps)?;
        for ((seeds, rands, closed), chunk) in fixed.into_iter().zip(rest.chunks_exact(chunk_len))
        {
            if total_bits % 8 != 0 && chunk[chunk_len - 1] >> (total_bits % 8) != 0 {
                return Err(Error::NonCanonical("view padding"));
            }
            let mut reader = BitReader {
                bits: BitVec::from_le_bytes(total_bits, chunk),
                pos: 0,
            };
            let input_share = reader.take(k, k);
            let views = (0..r).map(|_| reader.take(3 * m, n)).collect();
            let output_share = reader.take(n, n);
            rounds.push(RoundProof {
                seeds,
                rands,
                closed,
                input_share,
                views,
                output_share,
            });
        }
        Ok(Proof { challenge, rounds })
    }
}

/// Splits the first `N` bytes off `bytes`.
///
/// Callers check the total length up front.
fn take<const N: usize>(bytes: &mut &[u8]) -> [u8; N] {
    let (head, tail) = bytes.split_at(N);
    *bytes = tail;
    let mut out = [0; N];
    out.copy_from_slice(head);
    out
}

fn parse_challenge(bytes: &[u8], repetitions: usize) -> Result<Challenge, Error> {
    let mut trits = Vec::new();
    trits.try_reserve_exact(repetitions)?;
    for i in 0..4 * bytes.len() {
        let trit = (bytes[i / 4] >> (2 * (i % 4))) & 3;
        if i >= repetitions {
            if trit != 0 {
                return Err(Error::NonCanonical("challenge padding"));
            }
        } else {
            trits.push(trit);
        }
    }
    Ok(Challenge::from_trits(trits)?)
}
