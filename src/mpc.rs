//! Simulation of a 3-party computation of LowMC "in the head" of the prover.
//!
//! The prover runs all three parties on an XOR sharing of the key and records
//! every party's view. The verifier re-runs two of the parties, using the
//! recorded messages of the second one wherever the missing third party would
//! have contributed.
//!
//! * [`shares`]: XOR sharings of bit vectors and the linear operations on them.
//! * [`view`]: the recorded transcripts of the simulated parties.
//! * [`and`]: the multiparty AND gate, the only operation that needs interaction.
//! * [`sbox`]: the S-box layer, bitsliced and per triple.
//! * [`lowmc`]: the LowMC evaluator for proving and verifying.
use std::collections::TryReserveError;

use thiserror::Error;

pub mod and;
pub mod lowmc;
pub mod sbox;
pub mod shares;
pub mod view;

pub use and::AndStrategy;
pub use shares::SharedVec;
pub use view::View;

/// Number of simulated parties when proving.
pub const PROVE_PARTIES: usize = 3;
/// Number of parties the verifier re-runs.
pub const VERIFY_PARTIES: usize = 2;

/// Structural failures of the MPC simulation.
///
/// These only occur if shares, masks or views are malformed, never because of
/// the values they hold.
#[derive(Debug, Error)]
pub enum Error {
    /// A sharing has an unexpected number of shares.
    #[error("expected {expected} shares, found {actual}")]
    ShareCount {
        /// The number of shares the operation needs.
        expected: usize,
        /// The number of shares that were provided.
        actual: usize,
    },
    /// A vector has an unexpected number of bits.
    #[error("expected a vector of {expected} bits, found {actual}")]
    LengthMismatch {
        /// The number of bits the operation needs.
        expected: usize,
        /// The number of bits that were provided.
        actual: usize,
    },
    /// A random tape does not provide a mask for every round.
    #[error("random tape has {actual} masks, expected {expected}")]
    MissingMasks {
        /// The number of rounds.
        expected: usize,
        /// The number of masks on the tape.
        actual: usize,
    },
    /// The view buffers could not be allocated.
    #[error("could not allocate views: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Checks that `actual` bits match the `expected` bits.
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, actual })
    }
}

/// Checks that `actual` shares match the `expected` shares.
pub(crate) fn check_count(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShareCount { expected, actual })
    }
}
