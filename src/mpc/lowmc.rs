//! LowMC evaluated on shared keys.
//!
//! The state starts as `K_0·key ⊕ p`. Round `i` applies the shared S-box layer,
//! recording its AND gates in view slot `i + 1`, and then computes
//! `L_i·y ⊕ C_i ⊕ K_{i+1}·key`. Public constants are added according to
//! [`SharedVec::add_const`].
use tracing::trace;

use crate::{
    gf2::BitVec,
    mpc::{
        AndStrategy, Error, PROVE_PARTIES, SharedVec, VERIFY_PARTIES, View, check_count,
        check_len,
        sbox::{Gate, sbox_layer},
    },
    params::LowmcParams,
    prg::RandomTape,
};

/// Checks that every tape holds one `n`-bit mask per round.
fn check_tapes(params: &LowmcParams, tapes: &[RandomTape], parties: usize) -> Result<(), Error> {
    check_count(parties, tapes.len())?;
    for tape in tapes {
        if tape.masks.len() != params.rounds() {
            return Err(Error::MissingMasks {
                expected: params.rounds(),
                actual: tape.masks.len(),
            });
        }
        for mask in &tape.masks {
            check_len(params.block_size(), mask.len())?;
        }
    }
    Ok(())
}

fn round_masks(tapes: &[RandomTape], round: usize) -> Result<SharedVec, Error> {
    SharedVec::from_shares(tapes.iter().map(|t| t.masks[round].clone()).collect())
}

fn evaluate(
    params: &LowmcParams,
    gate: Gate,
    key: &SharedVec,
    plaintext: &BitVec,
    tapes: &[RandomTape],
    view: &mut View,
    ch: usize,
) -> Result<SharedVec, Error> {
    let mut x = key.mat_mul(params.key_matrix(0))?;
    x.add_const(plaintext, ch)?;
    for i in 0..params.rounds() {
        let masks = round_masks(tapes, i)?;
        let y = sbox_layer(params, gate, &x, &masks, view.slot_mut(i + 1))?;
        let mut next = y.mat_mul(params.linear(i))?;
        next.add_const(params.constant(i), ch)?;
        next.xor_assign(&key.mat_mul(params.key_matrix(i + 1))?)?;
        x = next;
    }
    trace!(rounds = params.rounds(), "evaluated shared LowMC");
    Ok(x)
}

/// Runs all three parties on the key sharing `key` and returns their output
/// shares together with the complete views.
///
/// The views hold the key shares in the first slot and the output shares in
/// the last one.
pub fn evaluate_prove(
    params: &LowmcParams,
    strategy: AndStrategy,
    key: &SharedVec,
    plaintext: &BitVec,
    tapes: &[RandomTape],
) -> Result<(SharedVec, View), Error> {
    check_count(PROVE_PARTIES, key.count())?;
    check_len(params.key_size(), key.len())?;
    check_len(params.block_size(), plaintext.len())?;
    check_tapes(params, tapes, PROVE_PARTIES)?;

    let mut view = View::new(params, PROVE_PARTIES)?;
    view.slot_mut(0).copy_from(key)?;
    let out = evaluate(
        params,
        Gate::Prove(strategy),
        key,
        plaintext,
        tapes,
        &mut view,
        0,
    )?;
    view.slot_mut(params.rounds() + 1).copy_from(&out)?;
    Ok((out, view))
}

/// Re-runs the two opened parties `ch` and `ch + 1 (mod 3)`.
///
/// `view` must hold both key shares in its first slot and the recorded views
/// of the second party. The round slots of the first party are recomputed, and
/// its output share is written to the last slot. Returns the recomputed output
/// shares; the second one is derived from the second party's recorded view and
/// must be compared with its transmitted output share by the caller.
pub fn evaluate_verify(
    params: &LowmcParams,
    strategy: AndStrategy,
    plaintext: &BitVec,
    tapes: &[RandomTape],
    view: &mut View,
    ch: usize,
) -> Result<SharedVec, Error> {
    check_count(VERIFY_PARTIES, view.parties())?;
    check_len(params.block_size(), plaintext.len())?;
    check_tapes(params, tapes, VERIFY_PARTIES)?;

    view.clear_rounds(0);
    let key = view.key().clone();
    let out = evaluate(
        params,
        Gate::Verify(strategy),
        &key,
        plaintext,
        tapes,
        view,
        ch,
    )?;
    view.slot_mut(params.rounds() + 1)
        .share_mut(0)
        .copy_from(out.share(0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{lowmc, seed::Seed};

    struct Run {
        params: LowmcParams,
        key: BitVec,
        plaintext: BitVec,
        tapes: Vec<RandomTape>,
        out: SharedVec,
        view: View,
    }

    fn run(m: usize, n: usize, r: usize, k: usize, strategy: AndStrategy, seed: u64) -> Run {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let params = LowmcParams::generate(m, n, r, k, &mut rng).unwrap();
        let key = lowmc::random_key(&params, &mut rng);
        let plaintext = BitVec::random(n, &mut rng);
        let tapes: Vec<_> = (0..3)
            .map(|_| RandomTape::expand(rng.random::<Seed>(), n, r))
            .collect();
        let shared_key = SharedVec::share_random(&key, &mut rng);
        let (out, view) = evaluate_prove(&params, strategy, &shared_key, &plaintext, &tapes)
            .unwrap();
        Run {
            params,
            key,
            plaintext,
            tapes,
            out,
            view,
        }
    }

    fn open_view(params: &LowmcParams, view: &View, e: usize) -> View {
        let slots = (0..view.len())
            .map(|i| {
                let slot = view.slot(i);
                SharedVec::from_shares(vec![
                    slot.share(e).clone(),
                    slot.share((e + 1) % 3).clone(),
                ])
                .unwrap()
            })
            .collect();
        View::from_slots(params, slots).unwrap()
    }

    #[test]
    fn test_prove_computes_lowmc() {
        let run = run(10, 128, 6, 80, AndStrategy::Portable, 31);
        let expected = lowmc::encrypt(&run.params, &run.key, &run.plaintext);
        assert_eq!(run.out.reconstruct(), expected);
        assert_eq!(run.view.output().reconstruct(), expected);
        assert_eq!(run.view.key().reconstruct(), run.key);
    }

    #[test]
    fn test_views_share_and_outputs() {
        let run = run(7, 64, 3, 32, AndStrategy::Portable, 32);
        let params = &run.params;
        let mut x = params.key_matrix(0).mul_vec(&run.key);
        x ^= &run.plaintext;
        for i in 0..params.rounds() {
            let recorded = run.view.round(i).reconstruct();
            for j in 0..params.sboxes() {
                let (a, b, c) = (x.get(3 * j), x.get(3 * j + 1), x.get(3 * j + 2));
                assert_eq!(recorded.get(3 * j), b & c);
                assert_eq!(recorded.get(3 * j + 1), a & c);
                assert_eq!(recorded.get(3 * j + 2), a & b);
            }
            let y = lowmc::sbox_layer(params, &x);
            x = params.linear(i).mul_vec(&y);
            x ^= params.constant(i);
            x ^= &params.key_matrix(i + 1).mul_vec(&run.key);
        }
    }

    #[test]
    fn test_verify_reproduces_opened_views() {
        let run = run(10, 64, 5, 40, AndStrategy::Portable, 33);
        for e in 0..3 {
            let expected = open_view(&run.params, &run.view, e);
            let mut opened = expected.clone();
            let tapes = [
                run.tapes[e].clone(),
                run.tapes[(e + 1) % 3].clone(),
            ];
            let out = evaluate_verify(
                &run.params,
                AndStrategy::Portable,
                &run.plaintext,
                &tapes,
                &mut opened,
                e,
            )
            .unwrap();
            assert_eq!(opened, expected, "challenge {e}");
            assert_eq!(out, *expected.output());
        }
    }

    #[test]
    fn test_verify_detects_tampered_view() {
        let run = run(10, 64, 5, 40, AndStrategy::Portable, 34);
        let e = 1;
        let mut opened = open_view(&run.params, &run.view, e);
        let flipped = !opened.round(2).share(1).get(4);
        opened.slot_mut(3).share_mut(1).set(4, flipped);
        let tapes = [run.tapes[1].clone(), run.tapes[2].clone()];
        let out = evaluate_verify(
            &run.params,
            AndStrategy::Portable,
            &run.plaintext,
            &tapes,
            &mut opened,
            e,
        )
        .unwrap();
        assert_ne!(out.share(1), run.out.share(2));
    }

    #[test]
    fn test_strategies_agree() {
        let portable = run(20, 300, 4, 128, AndStrategy::Portable, 35);
        let wide = run(20, 300, 4, 128, AndStrategy::Wide, 35);
        assert_eq!(portable.out, wide.out);
        assert_eq!(portable.view, wide.view);
        assert_eq!(AndStrategy::detect(), AndStrategy::detect());
    }

    #[test]
    fn test_rejects_malformed_tapes() {
        let run = run(2, 16, 2, 8, AndStrategy::Portable, 36);
        let key = SharedVec::share_random(&run.key, &mut ChaCha20Rng::seed_from_u64(0));
        let mut short = run.tapes.clone();
        short[1].masks.pop();
        assert!(matches!(
            evaluate_prove(&run.params, AndStrategy::Portable, &key, &run.plaintext, &short),
            Err(Error::MissingMasks {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            evaluate_prove(
                &run.params,
                AndStrategy::Portable,
                &key,
                &run.plaintext,
                &run.tapes[..2]
            ),
            Err(Error::ShareCount { .. })
        ));
    }
}
