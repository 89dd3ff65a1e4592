use fishsig::{
    Error, Instance, Metrics, Proof, keygen, mpc::AndStrategy, sign, sign_with_metrics,
    signature_size, verify, verify_with_metrics,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn standard_instance(seed: u64) -> Result<Instance, Error> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    Instance::generate(10, 256, 20, 128, 16, &mut rng)
}

#[test]
fn sign_verify_standard_parameters() -> Result<(), Error> {
    let instance = standard_instance(1)?;
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let (sk, pk) = keygen(&instance, &mut rng)?;
    let mut metrics = Metrics::default();
    let proof = sign_with_metrics(&instance, &sk, b"fish", &mut rng, &mut metrics)?;
    assert!(verify_with_metrics(
        &instance,
        &pk,
        b"fish",
        &proof,
        &mut metrics
    )?);
    assert!(metrics.mpc > std::time::Duration::ZERO);

    let bytes = proof.to_bytes(&instance)?;
    assert_eq!(bytes.len(), signature_size(10, 256, 20, 128, 16));
    let parsed = Proof::from_bytes(&instance, &bytes)?;
    assert_eq!(parsed, proof);
    assert!(verify(&instance, &pk, b"fish", &parsed)?);
    Ok(())
}

#[test]
fn signing_is_deterministic_for_seeded_rng() -> Result<(), Error> {
    let instance = standard_instance(3)?;
    let (sk, _) = keygen(&instance, &mut ChaCha20Rng::seed_from_u64(4))?;
    let a = sign(&instance, &sk, b"msg", &mut ChaCha20Rng::seed_from_u64(5))?;
    let b = sign(&instance, &sk, b"msg", &mut ChaCha20Rng::seed_from_u64(5))?;
    assert_eq!(a.to_bytes(&instance)?, b.to_bytes(&instance)?);
    let c = sign(&instance, &sk, b"msg", &mut ChaCha20Rng::seed_from_u64(6))?;
    assert_ne!(a.challenge, c.challenge);
    Ok(())
}

#[test]
fn strategies_produce_identical_signatures() -> Result<(), Error> {
    let instance = standard_instance(7)?;
    let portable = instance.clone().with_strategy(AndStrategy::Portable);
    let wide = instance.with_strategy(AndStrategy::Wide);
    let (sk, pk) = keygen(&portable, &mut ChaCha20Rng::seed_from_u64(8))?;
    let a = sign(&portable, &sk, b"msg", &mut ChaCha20Rng::seed_from_u64(9))?;
    let b = sign(&wide, &sk, b"msg", &mut ChaCha20Rng::seed_from_u64(9))?;
    assert_eq!(a, b);
    assert!(verify(&wide, &pk, b"msg", &a)?);
    assert!(verify(&portable, &pk, b"msg", &b)?);
    Ok(())
}

#[test]
fn corrupted_closed_commitment_is_rejected() -> Result<(), Error> {
    let instance = standard_instance(10)?;
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let (sk, pk) = keygen(&instance, &mut rng)?;
    let proof = sign(&instance, &sk, b"msg", &mut rng)?;
    for rep in [0, 7, 15] {
        let mut corrupted = proof.clone();
        corrupted.rounds[rep].closed = fishsig::commit::Commitment::new([0xAB; 32]);
        assert!(!verify(&instance, &pk, b"msg", &corrupted)?);
    }
    Ok(())
}

#[test]
fn flipped_bits_are_rejected() -> Result<(), Error> {
    let instance = standard_instance(12)?;
    let mut rng = ChaCha20Rng::seed_from_u64(13);
    let (sk, pk) = keygen(&instance, &mut rng)?;
    let proof = sign(&instance, &sk, b"msg", &mut rng)?;
    let bytes = proof.to_bytes(&instance)?;
    let challenge_len = 16_usize.div_ceil(4);
    let fixed_len = 16 * (2 * 16 + 2 * 4 + 32);

    // first seed of the first repetition, first commitment randomness, and
    // view bits of the first and last repetition
    let positions = [
        challenge_len,
        challenge_len + 32,
        challenge_len + fixed_len + 20,
        bytes.len() - 40,
        bytes.len() - 1,
    ];
    for pos in positions {
        let mut flipped = bytes.clone();
        flipped[pos] ^= 0x01;
        let proof = Proof::from_bytes(&instance, &flipped)?;
        assert!(!verify(&instance, &pk, b"msg", &proof)?, "byte {pos}");
    }
    Ok(())
}

#[test]
fn flipped_challenge_is_rejected() -> Result<(), Error> {
    let instance = standard_instance(14)?;
    let mut rng = ChaCha20Rng::seed_from_u64(15);
    let (sk, pk) = keygen(&instance, &mut rng)?;
    let proof = sign(&instance, &sk, b"msg", &mut rng)?;
    let mut trits = proof.challenge.trits().to_vec();
    trits[0] = (trits[0] + 1) % 3;
    let mut tampered = proof.clone();
    tampered.challenge = fishsig::commit::Challenge::from_trits(trits).unwrap();
    assert!(!verify(&instance, &pk, b"msg", &tampered)?);
    Ok(())
}

#[test]
fn malformed_encoding_is_an_error() -> Result<(), Error> {
    let instance = standard_instance(16)?;
    let mut rng = ChaCha20Rng::seed_from_u64(17);
    let (sk, _) = keygen(&instance, &mut rng)?;
    let bytes = sign(&instance, &sk, b"msg", &mut rng)?.to_bytes(&instance)?;
    assert!(matches!(
        Proof::from_bytes(&instance, &bytes[..bytes.len() - 1]),
        Err(fishsig::proof::Error::WrongLength { .. })
    ));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn completeness(
        seed: u64,
        m in 1_usize..12,
        extra in 0_usize..40,
        r in 1_usize..6,
        k in 1_usize..80,
        reps in 1_usize..10,
        message in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let n = 3 * m + extra;
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let instance = Instance::generate(m, n, r, k, reps, &mut rng).unwrap();
        let (sk, pk) = keygen(&instance, &mut rng).unwrap();
        let proof = sign(&instance, &sk, &message, &mut rng).unwrap();
        prop_assert!(verify(&instance, &pk, &message, &proof).unwrap());

        let bytes = proof.to_bytes(&instance).unwrap();
        prop_assert_eq!(bytes.len(), signature_size(m, n, r, k, reps));
        let parsed = Proof::from_bytes(&instance, &bytes).unwrap();
        prop_assert!(verify(&instance, &pk, &message, &parsed).unwrap());
    }
}
