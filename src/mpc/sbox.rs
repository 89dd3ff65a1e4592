//! The shared S-box layer.
//!
//! [`sbox_layer`] evaluates all S-boxes of a round at once on bit planes,
//! [`sbox_layer_per_triple`] evaluates them one triple at a time with
//! single-bit AND gates. Both compute the same output shares and record the
//! same views.
//!
//! S-box `j` reads `a`, `b`, `c` from bits `3j`, `3j + 1`, `3j + 2` and calls
//! three AND gates. The products are recorded at the position of the output
//! bit they contribute to: `bc` at `3j`, `ac` at `3j + 1`, `ab` at `3j + 2`.
use crate::{
    gf2::BitVec,
    mpc::{
        AndStrategy, Error, PROVE_PARTIES, SharedVec, VERIFY_PARTIES,
        and::{and_bit, and_bit_verify, and_prove, and_verify},
        check_count,
    },
    params::LowmcParams,
};

/// Whether AND gates are evaluated by the prover (all three parties) or by
/// the verifier (two opened parties).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Simulate all parties and record their views.
    Prove(AndStrategy),
    /// Re-run the first opened party, reading the second one from its view.
    Verify(AndStrategy),
}

impl Gate {
    /// Number of shares the gate operates on.
    pub fn parties(self) -> usize {
        match self {
            Gate::Prove(_) => PROVE_PARTIES,
            Gate::Verify(_) => VERIFY_PARTIES,
        }
    }

    fn and(
        self,
        a: &SharedVec,
        b: &SharedVec,
        r: &SharedVec,
        view: &mut SharedVec,
        mask: &BitVec,
        view_shift: usize,
    ) -> Result<SharedVec, Error> {
        match self {
            Gate::Prove(strategy) => and_prove(strategy, a, b, r, view, view_shift),
            Gate::Verify(strategy) => and_verify(strategy, a, b, r, view, mask, view_shift),
        }
    }

    /// Single-bit AND of `a[pa]` and `b[pb]` with mask bit `r[pr]`, recorded
    /// at bit `pv` of the view.
    fn and_bit(
        self,
        (a, pa): (&SharedVec, usize),
        (b, pb): (&SharedVec, usize),
        (r, pr): (&SharedVec, usize),
        view: &mut SharedVec,
        pv: usize,
    ) -> Vec<bool> {
        match self {
            Gate::Prove(_) => {
                let z = and_bit(bits(a, pa), bits(b, pb), bits(r, pr));
                for (m, z_m) in z.iter().enumerate() {
                    let recorded = view.share(m).get(pv);
                    view.share_mut(m).set(pv, recorded ^ z_m);
                }
                z.to_vec()
            }
            Gate::Verify(_) => {
                let recorded = view.share(1).get(pv);
                let z = and_bit_verify(bits(a, pa), bits(b, pb), bits(r, pr), recorded);
                let own = view.share(0).get(pv);
                view.share_mut(0).set(pv, own ^ z[0]);
                z.to_vec()
            }
        }
    }
}

fn bits<const N: usize>(s: &SharedVec, pos: usize) -> [bool; N] {
    std::array::from_fn(|i| s.share(i).get(pos))
}

fn check_inputs(
    gate: Gate,
    x: &SharedVec,
    r: &SharedVec,
    view: &SharedVec,
) -> Result<(), Error> {
    check_count(gate.parties(), x.count())?;
    x.check_shape(r)?;
    x.check_shape(view)
}

/// Bitsliced S-box layer on shared state `x` with round masks `r`.
///
/// The AND gate outputs are XORed into `view`, which must be the round's view
/// slot.
pub fn sbox_layer(
    params: &LowmcParams,
    gate: Gate,
    x: &SharedVec,
    r: &SharedVec,
    view: &mut SharedVec,
) -> Result<SharedVec, Error> {
    check_inputs(gate, x, r, view)?;
    let masks = params.masks();

    // align the planes at the position of the third S-box bit
    let a = x.and_const(&masks.x0)?.shl(2);
    let b = x.and_const(&masks.x1)?.shl(1);
    let c = x.and_const(&masks.x2)?;
    let r_a = r.and_const(&masks.x0)?.shl(2);
    let r_b = r.and_const(&masks.x1)?.shl(1);
    let r_c = r.and_const(&masks.x2)?;

    let ab = gate.and(&a, &b, &r_c, view, &masks.x2, 0)?;
    let bc = gate.and(&b, &c, &r_a, view, &masks.x2, 2)?;
    let ac = gate.and(&a, &c, &r_b, view, &masks.x2, 1)?;

    let mut out = x.and_const(&masks.linear)?;
    let mut third = ab;
    third.xor_assign(&a)?;
    third.xor_assign(&b)?;
    third.xor_assign(&c)?;
    out.xor_assign(&third)?;

    let mut second = ac;
    second.xor_assign(&a)?;
    second.xor_assign(&b)?;
    out.xor_assign(&second.shr(1))?;

    let mut first = bc;
    first.xor_assign(&a)?;
    out.xor_assign(&first.shr(2))?;
    Ok(out)
}

/// S-box layer evaluated one S-box at a time with single-bit AND gates.
pub fn sbox_layer_per_triple(
    params: &LowmcParams,
    gate: Gate,
    x: &SharedVec,
    r: &SharedVec,
    view: &mut SharedVec,
) -> Result<SharedVec, Error> {
    check_inputs(gate, x, r, view)?;
    let mut out = x.clone();
    for j in 0..params.sboxes() {
        let (p0, p1, p2) = (3 * j, 3 * j + 1, 3 * j + 2);
        let bc = gate.and_bit((x, p1), (x, p2), (r, p0), view, p0);
        let ac = gate.and_bit((x, p0), (x, p2), (r, p1), view, p1);
        let ab = gate.and_bit((x, p0), (x, p1), (r, p2), view, p2);
        for s in 0..x.count() {
            let share = x.share(s);
            let (a, b, c) = (share.get(p0), share.get(p1), share.get(p2));
            let dst = out.share_mut(s);
            dst.set(p0, a ^ bc[s]);
            dst.set(p1, a ^ b ^ ac[s]);
            dst.set(p2, a ^ b ^ c ^ ab[s]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::lowmc;

    fn open(s: &SharedVec, e: usize) -> SharedVec {
        SharedVec::from_shares(vec![s.share(e).clone(), s.share((e + 1) % 3).clone()]).unwrap()
    }

    #[test]
    fn test_shared_layer_matches_plain_layer() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let params = LowmcParams::generate(10, 64, 1, 16, &mut rng).unwrap();
        let value = BitVec::random(64, &mut rng);
        let x = SharedVec::share_random(&value, &mut rng);
        let r = SharedVec::share_random(&BitVec::random(64, &mut rng), &mut rng);
        let mut view = SharedVec::zero(64, 3);
        let out = sbox_layer(&params, Gate::Prove(AndStrategy::Portable), &x, &r, &mut view)
            .unwrap();
        assert_eq!(out.reconstruct(), lowmc::sbox_layer(&params, &value));

        // the view holds shares of bc, ac, ab
        let recorded = view.reconstruct();
        for j in 0..10 {
            let (a, b, c) = (value.get(3 * j), value.get(3 * j + 1), value.get(3 * j + 2));
            assert_eq!(recorded.get(3 * j), b & c);
            assert_eq!(recorded.get(3 * j + 1), a & c);
            assert_eq!(recorded.get(3 * j + 2), a & b);
        }
        assert!(recorded.shr(30).is_zero());
    }

    proptest! {
        #[test]
        fn prop_bitsliced_matches_per_triple(
            seed: u64,
            m in 1_usize..30,
            extra in 0_usize..80,
            strategy in prop_oneof![Just(AndStrategy::Portable), Just(AndStrategy::Wide)],
        ) {
            let n = 3 * m + extra;
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let params = LowmcParams::generate(m, n, 1, 8, &mut rng).unwrap();
            let x = SharedVec::share_random(&BitVec::random(n, &mut rng), &mut rng);
            let r = SharedVec::share_random(&BitVec::random(n, &mut rng), &mut rng);

            let mut view_sliced = SharedVec::zero(n, 3);
            let mut view_triple = SharedVec::zero(n, 3);
            let gate = Gate::Prove(strategy);
            let sliced = sbox_layer(&params, gate, &x, &r, &mut view_sliced).unwrap();
            let triple = sbox_layer_per_triple(&params, gate, &x, &r, &mut view_triple).unwrap();
            prop_assert_eq!(&sliced, &triple);
            prop_assert_eq!(&view_sliced, &view_triple);

            for e in 0..3 {
                let gate = Gate::Verify(strategy);
                let mut opened_sliced = open(&view_sliced, e);
                opened_sliced.share_mut(0).clear();
                let mut opened_triple = opened_sliced.clone();
                let (xo, ro) = (open(&x, e), open(&r, e));
                let v_sliced =
                    sbox_layer(&params, gate, &xo, &ro, &mut opened_sliced).unwrap();
                let v_triple =
                    sbox_layer_per_triple(&params, gate, &xo, &ro, &mut opened_triple).unwrap();
                prop_assert_eq!(&v_sliced, &v_triple);
                prop_assert_eq!(&v_sliced, &open(&sliced, e));
                prop_assert_eq!(&opened_sliced, &open(&view_sliced, e));
                prop_assert_eq!(&opened_triple, &opened_sliced);
            }
        }
    }
}
