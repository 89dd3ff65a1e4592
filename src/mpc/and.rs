//! The multiparty AND gate.
//!
//! For XOR shared `a` and `b` and per-party random masks `r`, party `m` and its
//! successor `j = m + 1 (mod 3)` compute
//!
//! ```text
//! z_m = (a_m & b_m) ^ (a_j & b_m) ^ (a_m & b_j) ^ r_m ^ r_j
//! ```
//!
//! The three `z_m` form a sharing of `a & b`. Every `z_m` is a message party
//! `m` would send, so it is recorded in the party's view. A verifier who only
//! knows the shares of two parties recomputes `z` of the first one and takes
//! `z` of the second one from its recorded view.
use wide::u64x4;

use crate::{
    gf2::BitVec,
    mpc::{Error, PROVE_PARTIES, SharedVec, VERIFY_PARTIES, check_count, check_len},
};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
cpufeatures::new!(target_feature_avx2, "avx2");

/// How the word-wise AND gate kernel is computed.
///
/// Both strategies produce bit-identical results; they only differ in speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AndStrategy {
    /// One 64-bit word at a time.
    #[default]
    Portable,
    /// Four words at a time using 256-bit vectors.
    Wide,
}

impl AndStrategy {
    /// Picks [`AndStrategy::Wide`] if the CPU supports AVX2, otherwise
    /// [`AndStrategy::Portable`].
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if target_feature_avx2::get() {
            return AndStrategy::Wide;
        }
        AndStrategy::Portable
    }

    /// Computes `out = (a_m & b_m) ^ (a_j & b_m) ^ (a_m & b_j) ^ r_m ^ r_j`.
    fn product(
        self,
        out: &mut BitVec,
        (a_m, b_m, r_m): (&BitVec, &BitVec, &BitVec),
        (a_j, b_j, r_j): (&BitVec, &BitVec, &BitVec),
    ) {
        let (a_m, b_m, r_m) = (a_m.words(), b_m.words(), r_m.words());
        let (a_j, b_j, r_j) = (a_j.words(), b_j.words(), r_j.words());
        let out = out.words_mut();
        let mut start = 0;
        if self == AndStrategy::Wide {
            let at = |w: &[u64], i: usize| u64x4::new(w.as_chunks::<4>().0[i]);
            let (lanes, _) = out.as_chunks_mut::<4>();
            for (i, dst) in lanes.iter_mut().enumerate() {
                let (am, bm, aj) = (at(a_m, i), at(b_m, i), at(a_j, i));
                let z = (am & bm) ^ (aj & bm) ^ (am & at(b_j, i)) ^ at(r_m, i) ^ at(r_j, i);
                *dst = z.to_array();
            }
            start = lanes.len() * 4;
        }
        for i in start..out.len() {
            out[i] = (a_m[i] & b_m[i]) ^ (a_j[i] & b_m[i]) ^ (a_m[i] & b_j[i]) ^ r_m[i] ^ r_j[i];
        }
    }
}

fn check_inputs(
    parties: usize,
    a: &SharedVec,
    b: &SharedVec,
    r: &SharedVec,
    view: &SharedVec,
) -> Result<(), Error> {
    check_count(parties, a.count())?;
    a.check_shape(b)?;
    a.check_shape(r)?;
    a.check_shape(view)
}

/// Computes a sharing of `a & b` for all three parties and XORs every party's
/// output, shifted right by `view_shift`, into its view slot.
pub fn and_prove(
    strategy: AndStrategy,
    a: &SharedVec,
    b: &SharedVec,
    r: &SharedVec,
    view: &mut SharedVec,
    view_shift: usize,
) -> Result<SharedVec, Error> {
    check_inputs(PROVE_PARTIES, a, b, r, view)?;
    let mut out = SharedVec::zero(a.len(), PROVE_PARTIES);
    for m in 0..PROVE_PARTIES {
        let j = (m + 1) % PROVE_PARTIES;
        strategy.product(
            out.share_mut(m),
            (a.share(m), b.share(m), r.share(m)),
            (a.share(j), b.share(j), r.share(j)),
        );
        *view.share_mut(m) ^= &out.share(m).shr(view_shift);
    }
    Ok(out)
}

/// Verifier side of [`and_prove`] for the two opened parties.
///
/// The output of the first party is recomputed and XORed into its view slot.
/// The output of the second party is read back from its recorded view, shifted
/// left by `view_shift` and restricted to `mask`.
pub fn and_verify(
    strategy: AndStrategy,
    a: &SharedVec,
    b: &SharedVec,
    r: &SharedVec,
    view: &mut SharedVec,
    mask: &BitVec,
    view_shift: usize,
) -> Result<SharedVec, Error> {
    check_inputs(VERIFY_PARTIES, a, b, r, view)?;
    check_len(a.len(), mask.len())?;
    let mut out = SharedVec::zero(a.len(), VERIFY_PARTIES);
    strategy.product(
        out.share_mut(0),
        (a.share(0), b.share(0), r.share(0)),
        (a.share(1), b.share(1), r.share(1)),
    );
    let mut second = view.share(1).shl(view_shift);
    second &= mask;
    out.share_mut(1).copy_from(&second);
    *view.share_mut(0) ^= &out.share(0).shr(view_shift);
    Ok(out)
}

/// Single-bit AND gate for three parties, returning the output shares.
pub fn and_bit(a: [bool; 3], b: [bool; 3], r: [bool; 3]) -> [bool; 3] {
    std::array::from_fn(|m| {
        let j = (m + 1) % 3;
        (a[m] & b[m]) ^ (a[j] & b[m]) ^ (a[m] & b[j]) ^ r[m] ^ r[j]
    })
}

/// Single-bit verifier AND gate: recomputes the first party's output and takes
/// the second party's output from its recorded view bit.
pub fn and_bit_verify(a: [bool; 2], b: [bool; 2], r: [bool; 2], recorded: bool) -> [bool; 2] {
    let first = (a[0] & b[0]) ^ (a[1] & b[0]) ^ (a[0] & b[1]) ^ r[0] ^ r[1];
    [first, recorded]
}
