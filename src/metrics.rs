//! Timings and sizes of the signature operations.
use std::{
    fmt,
    ops::AddAssign,
    time::{Duration, Instant},
};

/// Time spent in each phase of key generation, signing and verification.
///
/// Operations add to the fields, so one value can accumulate several runs.
/// Phases that run per repetition in parallel report the sum over all
/// repetitions, not the wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Sampling the LowMC instance.
    pub setup: Duration,
    /// Sampling the private key and computing the public key.
    pub keygen: Duration,
    /// Sampling seeds and commitment randomness.
    pub randomness: Duration,
    /// Expanding seeds and sharing the key.
    pub sharing: Duration,
    /// Evaluating LowMC on the shares.
    pub mpc: Duration,
    /// Committing to the views.
    pub hashing: Duration,
    /// Deriving the Fiat-Shamir challenge.
    pub challenge: Duration,
    /// Verifying a signature, end to end.
    pub verify: Duration,
    /// Size of the last serialized signature in bytes.
    pub size: usize,
}

impl Metrics {
    /// Total signing time.
    pub fn sign_total(&self) -> Duration {
        self.randomness + self.sharing + self.mpc + self.hashing + self.challenge
    }

    /// Divides every duration by `n`, e.g. to average over `n` runs.
    pub fn average(&self, n: u32) -> Metrics {
        if n == 0 {
            return *self;
        }
        Metrics {
            setup: self.setup / n,
            keygen: self.keygen / n,
            randomness: self.randomness / n,
            sharing: self.sharing / n,
            mpc: self.mpc / n,
            hashing: self.hashing / n,
            challenge: self.challenge / n,
            verify: self.verify / n,
            size: self.size,
        }
    }

    /// Column names matching [`Metrics::csv_row`].
    pub fn csv_header() -> &'static str {
        "setup_us,keygen_us,randomness_us,sharing_us,mpc_us,hashing_us,challenge_us,verify_us,size"
    }

    /// The metrics as one comma separated row, durations in microseconds.
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.setup.as_micros(),
            self.keygen.as_micros(),
            self.randomness.as_micros(),
            self.sharing.as_micros(),
            self.mpc.as_micros(),
            self.hashing.as_micros(),
            self.challenge.as_micros(),
            self.verify.as_micros(),
            self.size
        )
    }
}

impl AddAssign<&Metrics> for Metrics {
    fn add_assign(&mut self, rhs: &Metrics) {
        self.setup += rhs.setup;
        self.keygen += rhs.keygen;
        self.randomness += rhs.randomness;
        self.sharing += rhs.sharing;
        self.mpc += rhs.mpc;
        self.hashing += rhs.hashing;
        self.challenge += rhs.challenge;
        self.verify += rhs.verify;
        self.size = rhs.size;
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LowMC setup          {:>10?}", self.setup)?;
        writeln!(f, "key generation       {:>10?}", self.keygen)?;
        writeln!(f, "randomness           {:>10?}", self.randomness)?;
        writeln!(f, "secret sharing       {:>10?}", self.sharing)?;
        writeln!(f, "MPC evaluation       {:>10?}", self.mpc)?;
        writeln!(f, "view commitments     {:>10?}", self.hashing)?;
        writeln!(f, "challenge            {:>10?}", self.challenge)?;
        writeln!(f, "signing total        {:>10?}", self.sign_total())?;
        writeln!(f, "verification         {:>10?}", self.verify)?;
        write!(f, "signature size       {:>10} bytes", self.size)
    }
}

/// Runs `f` and adds its duration to `slot`.
pub(crate) fn timed<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *slot += start.elapsed();
    out
}
