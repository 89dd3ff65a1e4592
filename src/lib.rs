//! Fish signatures: non-interactive zero-knowledge proofs of knowledge of a
//! [LowMC](https://eprint.iacr.org/2016/687) key, built with MPC-in-the-head.
//!
//! The signer proves that it knows a key `k` with `pk = E_k(0)` by simulating a
//! 3-party computation of LowMC on an XOR sharing of `k`. For every repetition
//! it commits to the views of all three parties, derives a Fiat-Shamir challenge
//! from the commitments and the message, and opens two of the three views. A
//! verifier re-runs the two opened parties and checks that their recomputed
//! commitments reproduce the challenge.
//!
//! ## Main Components
//!
//! * [`signature`]: [`keygen`], [`sign`] and [`verify`], together with the
//!   [`Instance`] they operate on.
//! * [`proof`]: the [`Proof`] object and its byte encoding.
//! * [`mpc`]: the simulated 3-party evaluation of LowMC.
//! * [`commit`]: view commitments and the Fiat-Shamir challenge.
//! * [`params`] and [`lowmc`]: LowMC instances and plain encryption.
//! * [`gf2`]: bit vectors and matrices over GF(2).
//!
//! ## Example
//!
//! ```
//! use fishsig::{Instance, keygen, sign, verify};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! # fn main() -> Result<(), fishsig::Error> {
//! let mut rng = ChaCha20Rng::seed_from_u64(0);
//! // 10 S-boxes, 64-bit blocks, 4 rounds, 32-bit keys, 8 repetitions
//! let instance = Instance::generate(10, 64, 4, 32, 8, &mut rng)?;
//! let (sk, pk) = keygen(&instance, &mut rng)?;
//! let proof = sign(&instance, &sk, b"message", &mut rng)?;
//! assert!(verify(&instance, &pk, b"message", &proof)?);
//!
//! let bytes = proof.to_bytes(&instance)?;
//! assert_eq!(bytes.len(), instance.signature_size());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Properties
//!
//! Instance parameters are sampled, not chosen for a security level, and the
//! number of repetitions determines the soundness error of `(2/3)^T`. Seeds and
//! keys are never logged.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod commit;
pub mod gf2;
pub mod lowmc;
pub mod metrics;
pub mod mpc;
pub mod params;
pub mod prg;
pub mod proof;
pub mod seed;
pub mod signature;

pub use metrics::Metrics;
pub use params::LowmcParams;
pub use proof::{Proof, signature_size};
pub use signature::{
    DEFAULT_REPETITIONS, Error, Instance, PrivateKey, PublicKey, keygen, keygen_with_metrics,
    sign, sign_with_metrics, verify, verify_with_metrics,
};
