//! XOR sharings of bit vectors.
//!
//! A [`SharedVec`] holds 2 or 3 shares of equal length. All operations are
//! applied share-wise; public constants are added to exactly one share.
use rand::Rng;

use crate::{
    gf2::{BitMatrix, BitVec},
    mpc::{Error, PROVE_PARTIES, VERIFY_PARTIES, check_count, check_len},
};

/// An additive (XOR) sharing of a vector over GF(2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedVec {
    shares: Vec<BitVec>,
}

impl SharedVec {
    /// A sharing of the zero vector with `count` all-zero shares.
    pub fn zero(len: usize, count: usize) -> Self {
        SharedVec {
            shares: vec![BitVec::zero(len); count],
        }
    }

    /// Wraps existing shares.
    ///
    /// Fails unless there are 2 or 3 shares of equal length.
    pub fn from_shares(shares: Vec<BitVec>) -> Result<Self, Error> {
        if shares.len() != PROVE_PARTIES && shares.len() != VERIFY_PARTIES {
            return Err(Error::ShareCount {
                expected: PROVE_PARTIES,
                actual: shares.len(),
            });
        }
        let len = shares[0].len();
        for share in &shares[1..] {
            check_len(len, share.len())?;
        }
        Ok(SharedVec { shares })
    }

    /// Shares `value` into three parts using `s0` and `s1` as the first two
    /// shares; the third one is `value ⊕ s0 ⊕ s1`.
    pub fn share_with(value: &BitVec, s0: BitVec, s1: BitVec) -> Result<Self, Error> {
        check_len(value.len(), s0.len())?;
        check_len(value.len(), s1.len())?;
        let mut s2 = value.xor(&s0);
        s2 ^= &s1;
        Ok(SharedVec {
            shares: vec![s0, s1, s2],
        })
    }

    /// Shares `value` into three parts with uniformly random first shares.
    pub fn share_random<R: Rng + ?Sized>(value: &BitVec, rng: &mut R) -> Self {
        let s0 = BitVec::random(value.len(), rng);
        let s1 = BitVec::random(value.len(), rng);
        let mut s2 = value.xor(&s0);
        s2 ^= &s1;
        SharedVec {
            shares: vec![s0, s1, s2],
        }
    }

    /// XORs all shares together.
    pub fn reconstruct(&self) -> BitVec {
        let mut value = self.shares[0].clone();
        for share in &self.shares[1..] {
            value ^= share;
        }
        value
    }

    /// Number of shares.
    #[inline]
    pub fn count(&self) -> usize {
        self.shares.len()
    }

    /// Length of each share in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.shares[0].len()
    }

    /// Whether the shared vector has zero bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share `i`.
    #[inline]
    pub fn share(&self, i: usize) -> &BitVec {
        &self.shares[i]
    }

    /// Share `i`, mutably.
    #[inline]
    pub fn share_mut(&mut self, i: usize) -> &mut BitVec {
        &mut self.shares[i]
    }

    /// All shares.
    #[inline]
    pub fn shares(&self) -> &[BitVec] {
        &self.shares
    }

    /// Checks that `other` has the same shape as `self`.
    pub(crate) fn check_shape(&self, other: &SharedVec) -> Result<(), Error> {
        check_count(self.count(), other.count())?;
        check_len(self.len(), other.len())
    }

    /// Share-wise `self ^= other`.
    pub fn xor_assign(&mut self, other: &SharedVec) -> Result<(), Error> {
        self.check_shape(other)?;
        for (a, b) in self.shares.iter_mut().zip(&other.shares) {
            *a ^= b;
        }
        Ok(())
    }

    /// Share-wise AND with a public mask.
    pub fn and_const(&self, mask: &BitVec) -> Result<SharedVec, Error> {
        check_len(self.len(), mask.len())?;
        Ok(SharedVec {
            shares: self.shares.iter().map(|s| s.and(mask)).collect(),
        })
    }

    /// Share-wise product `M·x` with a public matrix.
    pub fn mat_mul(&self, matrix: &BitMatrix) -> Result<SharedVec, Error> {
        check_len(matrix.ncols(), self.len())?;
        Ok(SharedVec {
            shares: self.shares.iter().map(|s| matrix.mul_vec(s)).collect(),
        })
    }

    /// Adds a public constant.
    ///
    /// The constant must be added by exactly one of the three original parties,
    /// party 0. `ch` identifies which parties the shares belong to: the shares
    /// of a prover are parties `0, 1, 2` (`ch = 0`), the shares of a verifier
    /// are parties `ch, ch + 1 (mod 3)`. So the constant goes to share 0 if
    /// `ch == 0`, to the last share if `ch` equals the share count (the
    /// verifier's pair `2, 0`), and nowhere otherwise.
    pub fn add_const(&mut self, constant: &BitVec, ch: usize) -> Result<(), Error> {
        check_len(self.len(), constant.len())?;
        if ch == 0 {
            self.shares[0] ^= constant;
        } else if ch == self.count() {
            let last = self.count() - 1;
            self.shares[last] ^= constant;
        }
        Ok(())
    }

    /// Share-wise left shift (towards higher bit indices).
    pub fn shl(&self, shift: usize) -> SharedVec {
        SharedVec {
            shares: self.shares.iter().map(|s| s.shl(shift)).collect(),
        }
    }

    /// Share-wise right shift (towards lower bit indices).
    pub fn shr(&self, shift: usize) -> SharedVec {
        SharedVec {
            shares: self.shares.iter().map(|s| s.shr(shift)).collect(),
        }
    }

    /// Overwrites `self` with `other`.
    pub fn copy_from(&mut self, other: &SharedVec) -> Result<(), Error> {
        self.check_shape(other)?;
        for (a, b) in self.shares.iter_mut().zip(&other.shares) {
            a.copy_from(b);
        }
        Ok(())
    }
}
