//! Key generation, signing and verification.
//!
//! A signature proves knowledge of a LowMC key `k` with `pk = E_k(0)`. For each
//! repetition the signer simulates the 3-party evaluation of LowMC on a sharing
//! of `k`, commits to all three views and, once the Fiat-Shamir challenge is
//! known, opens the views of two parties.
//!
//! Repetitions are independent and run in parallel on the rayon thread pool.
//! Every repetition owns its buffers; the instance is shared read-only.
use std::{
    collections::TryReserveError,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{CryptoRng, Rng};
use rayon::prelude::*;
use subtle::ConstantTimeEq;
use tracing::{Level, debug, instrument};

use crate::{
    commit::{CommitRand, Commitment, commit, derive_challenge, recompute_challenge},
    gf2::BitVec,
    lowmc,
    metrics::{Metrics, timed},
    mpc::{
        self, AndStrategy, SharedVec, View,
        lowmc::{evaluate_prove, evaluate_verify},
    },
    params::{self, LowmcParams},
    prg::RandomTape,
    proof::{self, Proof, RoundProof},
    seed::Seed,
};

/// Number of repetitions used if nothing else is configured.
pub const DEFAULT_REPETITIONS: usize = 219;

/// Errors of key generation, signing and verification.
///
/// A signature that does not verify is not an error, see [`verify`].
#[derive(Debug)]
pub enum Error {
    /// The LowMC parameters are invalid.
    ParamsError(params::Error),
    /// The shares, masks or views don't fit together.
    MpcError(mpc::Error),
    /// A proof could not be encoded or decoded.
    ProofError(proof::Error),
    /// Buffers for the repetitions could not be allocated.
    Allocation(TryReserveError),
    /// An instance needs at least one repetition.
    ZeroRepetitions,
    /// A key does not match the key or block size of the instance.
    WrongKeySize {
        /// The number of bits the instance expects.
        expected: usize,
        /// The number of bits of the key.
        actual: usize,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParamsError(e) => write!(f, "Parameter error: {e}"),
            Error::MpcError(e) => write!(f, "MPC error: {e}"),
            Error::ProofError(e) => write!(f, "Proof error: {e}"),
            Error::Allocation(e) => write!(f, "Allocation failed: {e}"),
            Error::ZeroRepetitions => f.write_str("The number of repetitions must be non-zero"),
            Error::WrongKeySize { expected, actual } => {
                write!(f, "Wrong key size, expected {expected} bits, found {actual}")
            }
        }
    }
}

impl From<params::Error> for Error {
    fn from(e: params::Error) -> Self {
        Self::ParamsError(e)
    }
}

impl From<mpc::Error> for Error {
    fn from(e: mpc::Error) -> Self {
        Self::MpcError(e)
    }
}

impl From<proof::Error> for Error {
    fn from(e: proof::Error) -> Self {
        Self::ProofError(e)
    }
}

impl From<TryReserveError> for Error {
    fn from(e: TryReserveError) -> Self {
        Self::Allocation(e)
    }
}

/// A LowMC instance together with the signature configuration.
#[derive(Debug, Clone)]
pub struct Instance {
    params: Arc<LowmcParams>,
    repetitions: usize,
    strategy: AndStrategy,
}

impl Instance {
    /// Wraps `params`, using the fastest [`AndStrategy`] the CPU supports.
    pub fn new(params: LowmcParams, repetitions: usize) -> Result<Self, Error> {
        if repetitions == 0 {
            return Err(Error::ZeroRepetitions);
        }
        Ok(Instance {
            params: Arc::new(params),
            repetitions,
            strategy: AndStrategy::detect(),
        })
    }

    /// Samples fresh LowMC parameters, see [`LowmcParams::generate`].
    pub fn generate<R: Rng + ?Sized>(
        m: usize,
        n: usize,
        r: usize,
        k: usize,
        repetitions: usize,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let params = LowmcParams::generate(m, n, r, k, rng)?;
        Self::new(params, repetitions)
    }

    /// Uses `strategy` for the AND gates instead of the detected one.
    pub fn with_strategy(mut self, strategy: AndStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The LowMC parameters.
    pub fn params(&self) -> &LowmcParams {
        &self.params
    }

    /// The number of repetitions.
    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// The AND gate strategy.
    pub fn strategy(&self) -> AndStrategy {
        self.strategy
    }

    /// Size of a serialized signature in bytes.
    pub fn signature_size(&self) -> usize {
        let p = &self.params;
        proof::signature_size(
            p.sboxes(),
            p.block_size(),
            p.rounds(),
            p.key_size(),
            self.repetitions,
        )
    }
}

/// A LowMC key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    key: BitVec,
}

impl PrivateKey {
    /// Wraps a key, checking its size.
    pub fn new(instance: &Instance, key: BitVec) -> Result<Self, Error> {
        check_size(instance.params().key_size(), key.len())?;
        Ok(PrivateKey { key })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({} bits)", self.key.len())
    }
}

/// The encryption of the all-zero block under the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    ciphertext: BitVec,
}

impl PublicKey {
    /// Wraps a ciphertext, checking its size.
    pub fn new(instance: &Instance, ciphertext: BitVec) -> Result<Self, Error> {
        check_size(instance.params().block_size(), ciphertext.len())?;
        Ok(PublicKey { ciphertext })
    }

    /// The ciphertext `E_k(0)`.
    pub fn ciphertext(&self) -> &BitVec {
        &self.ciphertext
    }
}

fn check_size(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::WrongKeySize { expected, actual })
    }
}

/// Samples a private key and computes its public key.
pub fn keygen<R: Rng + CryptoRng + ?Sized>(
    instance: &Instance,
    rng: &mut R,
) -> Result<(PrivateKey, PublicKey), Error> {
    keygen_with_metrics(instance, rng, &mut Metrics::default())
}

/// [`keygen`], recording its duration.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub fn keygen_with_metrics<R: Rng + CryptoRng + ?Sized>(
    instance: &Instance,
    rng: &mut R,
    metrics: &mut Metrics,
) -> Result<(PrivateKey, PublicKey), Error> {
    let params = instance.params();
    let (key, ciphertext) = timed(&mut metrics.keygen, || {
        let key = lowmc::random_key(params, rng);
        let ciphertext = lowmc::encrypt(params, &key, &BitVec::zero(params.block_size()));
        (key, ciphertext)
    });
    Ok((PrivateKey { key }, PublicKey { ciphertext }))
}

/// Per-party randomness of one repetition, sampled up front.
struct Coins {
    seeds: [Seed; 3],
    rands: [CommitRand; 3],
}

/// Durations of the phases of one repetition.
#[derive(Default)]
struct Timings {
    sharing: Duration,
    mpc: Duration,
    hashing: Duration,
}

/// Everything one repetition of the prover produces.
struct Transcript {
    coins: Coins,
    commitments: [Commitment; 3],
    outputs: SharedVec,
    view: View,
    timings: Timings,
}

fn prove_repetition(instance: &Instance, key: &BitVec, coins: Coins) -> Result<Transcript, Error> {
    let params = instance.params();
    let (n, r, k) = (params.block_size(), params.rounds(), params.key_size());
    let mut timings = Timings::default();

    let (tapes, shared_key) = timed(&mut timings.sharing, || {
        let (s0, t0) = RandomTape::expand_with_key(coins.seeds[0], k, n, r);
        let (s1, t1) = RandomTape::expand_with_key(coins.seeds[1], k, n, r);
        let t2 = RandomTape::expand(coins.seeds[2], n, r);
        SharedVec::share_with(key, s0, s1).map(|shared| ([t0, t1, t2], shared))
    })?;

    let plaintext = BitVec::zero(n);
    let (outputs, view) = timed(&mut timings.mpc, || {
        evaluate_prove(params, instance.strategy(), &shared_key, &plaintext, &tapes)
    })?;

    let commitments = timed(&mut timings.hashing, || {
        let ys = [outputs.share(0), outputs.share(1), outputs.share(2)];
        std::array::from_fn(|p| commit(&coins.seeds[p], ys, view.party(p), &coins.rands[p]))
    });

    Ok(Transcript {
        coins,
        commitments,
        outputs,
        view,
        timings,
    })
}

fn open(instance: &Instance, transcript: Transcript, e: usize) -> RoundProof {
    let params = instance.params();
    let (a, b, c) = (e, (e + 1) % 3, (e + 2) % 3);
    let input_share = if e == 0 {
        BitVec::zero(params.key_size())
    } else {
        transcript.view.key().share(2).clone()
    };
    RoundProof {
        seeds: [transcript.coins.seeds[a], transcript.coins.seeds[b]],
        rands: [transcript.coins.rands[a], transcript.coins.rands[b]],
        closed: transcript.commitments[c],
        input_share,
        views: (0..params.rounds())
            .map(|i| transcript.view.round(i).share(b).clone())
            .collect(),
        output_share: transcript.outputs.share(b).clone(),
    }
}

/// Signs `message` with `key`.
///
/// All seeds and commitment randomness are drawn from `rng` before the
/// repetitions run, so the signature only depends on the output of `rng`.
pub fn sign<R: Rng + CryptoRng + ?Sized>(
    instance: &Instance,
    key: &PrivateKey,
    message: &[u8],
    rng: &mut R,
) -> Result<Proof, Error> {
    sign_with_metrics(instance, key, message, rng, &mut Metrics::default())
}

/// [`sign`], recording the duration of each phase.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub fn sign_with_metrics<R: Rng + CryptoRng + ?Sized>(
    instance: &Instance,
    key: &PrivateKey,
    message: &[u8],
    rng: &mut R,
    metrics: &mut Metrics,
) -> Result<Proof, Error> {
    check_size(instance.params().key_size(), key.key.len())?;
    let reps = instance.repetitions();

    let start = Instant::now();
    let mut coins = Vec::new();
    coins.try_reserve_exact(reps)?;
    for _ in 0..reps {
        coins.push(Coins {
            seeds: std::array::from_fn(|_| rng.random()),
            rands: std::array::from_fn(|_| rng.random()),
        });
    }
    metrics.randomness += start.elapsed();

    debug!(repetitions = reps, "proving repetitions");
    let transcripts: Vec<Transcript> = coins
        .into_par_iter()
        .map(|coins| prove_repetition(instance, &key.key, coins))
        .collect::<Result<_, _>>()?;
    debug!("collected transcripts");

    for t in &transcripts {
        metrics.sharing += t.timings.sharing;
        metrics.mpc += t.timings.mpc;
        metrics.hashing += t.timings.hashing;
    }

    let challenge = timed(&mut metrics.challenge, || {
        let commitments: Vec<[Commitment; 3]> =
            transcripts.iter().map(|t| t.commitments).collect();
        derive_challenge(&commitments, message)
    });

    let rounds = transcripts
        .into_iter()
        .zip(challenge.trits())
        .map(|(t, &e)| open(instance, t, e as usize))
        .collect();
    Ok(Proof { challenge, rounds })
}

/// Checks `proof` for `message` under `key`.
///
/// Returns `Ok(false)` if the signature is invalid. Errors are only returned
/// for proofs that don't fit the instance or if buffers can't be allocated.
pub fn verify(
    instance: &Instance,
    key: &PublicKey,
    message: &[u8],
    proof: &Proof,
) -> Result<bool, Error> {
    verify_with_metrics(instance, key, message, proof, &mut Metrics::default())
}

/// [`verify`], recording its duration.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub fn verify_with_metrics(
    instance: &Instance,
    key: &PublicKey,
    message: &[u8],
    proof: &Proof,
    metrics: &mut Metrics,
) -> Result<bool, Error> {
    check_size(instance.params().block_size(), key.ciphertext.len())?;
    proof.check_shape(instance)?;
    let start = Instant::now();

    debug!(repetitions = instance.repetitions(), "verifying repetitions");
    let opened: Vec<Option<[Commitment; 2]>> = (0..instance.repetitions())
        .into_par_iter()
        .map(|i| {
            let e = proof.challenge.trit(i) as usize;
            verify_repetition(instance, key, &proof.rounds[i], e)
        })
        .collect::<Result<_, Error>>()?;
    debug!("collected repetitions");

    let Some(opened) = opened.into_iter().collect::<Option<Vec<_>>>() else {
        metrics.verify += start.elapsed();
        return Ok(false);
    };
    let closed: Vec<Commitment> = proof.rounds.iter().map(|round| round.closed).collect();
    let recomputed = recompute_challenge(&opened, &closed, &proof.challenge, message);
    let valid = bool::from(recomputed.ct_eq(&proof.challenge));
    metrics.verify += start.elapsed();
    Ok(valid)
}

/// Re-runs parties `e` and `e + 1` of one repetition and recomputes their
/// commitments. Returns `None` if the transmitted data is inconsistent.
fn verify_repetition(
    instance: &Instance,
    key: &PublicKey,
    round: &RoundProof,
    e: usize,
) -> Result<Option<[Commitment; 2]>, Error> {
    let params = instance.params();
    let (n, r, k) = (params.block_size(), params.rounds(), params.key_size());
    let (a, b, c) = (e, (e + 1) % 3, (e + 2) % 3);
    if e == 0 && !round.input_share.is_zero() {
        return Ok(None);
    }

    // parties 0 and 1 derive their key share from the seed, party 2 gets it
    // from the proof
    let expand = |seed, party: usize| {
        if party < 2 {
            RandomTape::expand_with_key(seed, k, n, r)
        } else {
            (round.input_share.clone(), RandomTape::expand(seed, n, r))
        }
    };
    let (key_a, tape_a) = expand(round.seeds[0], a);
    let (key_b, tape_b) = expand(round.seeds[1], b);
    let tapes = [tape_a, tape_b];

    let mut view = View::new(params, mpc::VERIFY_PARTIES)?;
    view.slot_mut(0)
        .copy_from(&SharedVec::from_shares(vec![key_a, key_b])?)?;
    for (i, recorded) in round.views.iter().enumerate() {
        view.slot_mut(i + 1).share_mut(1).copy_from(recorded);
    }
    view.slot_mut(r + 1)
        .share_mut(1)
        .copy_from(&round.output_share);

    let plaintext = BitVec::zero(n);
    let outputs = evaluate_verify(params, instance.strategy(), &plaintext, &tapes, &mut view, e)?;
    if outputs.share(1) != &round.output_share {
        return Ok(None);
    }

    let mut y_c = key.ciphertext.xor(outputs.share(0));
    y_c ^= outputs.share(1);
    let mut ys = [outputs.share(0); 3];
    ys[b] = outputs.share(1);
    ys[c] = &y_c;

    let commitment_a = commit(&round.seeds[0], ys, view.party(0), &round.rands[0]);
    let commitment_b = commit(&round.seeds[1], ys, view.party(1), &round.rands[1]);
    Ok(Some([commitment_a, commitment_b]))
}

/// Signs and serializes in one step, for callers that only need bytes.
pub fn sign_to_bytes<R: Rng + CryptoRng + ?Sized>(
    instance: &Instance,
    key: &PrivateKey,
    message: &[u8],
    rng: &mut R,
    metrics: &mut Metrics,
) -> Result<Vec<u8>, Error> {
    let proof = sign_with_metrics(instance, key, message, rng, metrics)?;
    let bytes = proof.to_bytes(instance)?;
    metrics.size = bytes.len();
    Ok(bytes)
}

/// Parses and verifies a serialized signature.
pub fn verify_bytes(
    instance: &Instance,
    key: &PublicKey,
    message: &[u8],
    bytes: &[u8],
    metrics: &mut Metrics,
) -> Result<bool, Error> {
    let proof = Proof::from_bytes(instance, bytes)?;
    verify_with_metrics(instance, key, message, &proof, metrics)
}
