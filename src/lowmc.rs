//! Plain (non-MPC) LowMC encryption, used to compute public keys.
use rand::Rng;

use crate::{gf2::BitVec, params::LowmcParams};

/// The LowMC S-box `(a, b, c) ↦ (a ⊕ bc, a ⊕ b ⊕ ac, a ⊕ b ⊕ c ⊕ ab)`.
#[inline]
pub fn sbox(a: bool, b: bool, c: bool) -> (bool, bool, bool) {
    (a ^ (b & c), a ^ b ^ (a & c), a ^ b ^ c ^ (a & b))
}

/// Applies the S-box to every triple of the nonlinear region `0..3m`.
pub fn sbox_layer(params: &LowmcParams, x: &BitVec) -> BitVec {
    let mut out = x.clone();
    for j in 0..params.sboxes() {
        let (a, b, c) = sbox(x.get(3 * j), x.get(3 * j + 1), x.get(3 * j + 2));
        out.set(3 * j, a);
        out.set(3 * j + 1, b);
        out.set(3 * j + 2, c);
    }
    out
}

/// Encrypts `plaintext` under `key`.
///
/// # Panics
/// If the key or plaintext length doesn't match the instance.
pub fn encrypt(params: &LowmcParams, key: &BitVec, plaintext: &BitVec) -> BitVec {
    assert_eq!(key.len(), params.key_size(), "wrong key size");
    assert_eq!(plaintext.len(), params.block_size(), "wrong block size");
    let mut x = params.key_matrix(0).mul_vec(key);
    x ^= plaintext;
    for i in 0..params.rounds() {
        let y = sbox_layer(params, &x);
        x = params.linear(i).mul_vec(&y);
        x ^= params.constant(i);
        x ^= &params.key_matrix(i + 1).mul_vec(key);
    }
    x
}

/// Samples a uniformly random key for the instance.
pub fn random_key<R: Rng + ?Sized>(params: &LowmcParams, rng: &mut R) -> BitVec {
    BitVec::random(params.key_size(), rng)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn test_sbox_is_permutation() {
        let mut images = HashSet::new();
        for x in 0..8_u8 {
            let (a, b, c) = sbox(x & 1 == 1, x & 2 == 2, x & 4 == 4);
            images.insert((a, b, c));
        }
        assert_eq!(images.len(), 8);
    }

    #[test]
    fn test_sbox_layer_leaves_linear_part() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let params = LowmcParams::generate(4, 32, 1, 16, &mut rng).unwrap();
        let x = BitVec::random(32, &mut rng);
        let y = sbox_layer(&params, &x);
        for i in 12..32 {
            assert_eq!(x.get(i), y.get(i));
        }
    }

    #[test]
    fn test_encrypt_depends_on_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let params = LowmcParams::generate(10, 64, 4, 32, &mut rng).unwrap();
        let zero = BitVec::zero(64);
        let k1 = random_key(&params, &mut rng);
        let mut k2 = k1.clone();
        k2.set(0, !k2.get(0));
        assert_eq!(encrypt(&params, &k1, &zero), encrypt(&params, &k1, &zero));
        assert_ne!(encrypt(&params, &k1, &zero), encrypt(&params, &k2, &zero));
    }
}
