//! Vectors and matrices over GF(2).
//!
//! Bits are packed into `u64` words: bit `i` of a [`BitVec`] lives in bit
//! `i % 64` of word `i / 64`. Bits beyond the length of a vector are always
//! zero, so words can be hashed and compared directly.
//!
//! Operations on mismatched dimensions are programming errors and panic; the
//! MPC layer checks the dimensions of its inputs before calling into here.
use std::{
    fmt,
    ops::{BitAndAssign, BitXorAssign},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Number of `u64` words needed to store `bits` bits.
#[inline]
pub(crate) fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// A row vector over GF(2).
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBitVec")]
pub struct BitVec {
    len: usize,
    words: Vec<u64>,
}

#[derive(Deserialize)]
struct RawBitVec {
    len: usize,
    words: Vec<u64>,
}

impl TryFrom<RawBitVec> for BitVec {
    type Error = &'static str;

    fn try_from(raw: RawBitVec) -> Result<Self, Self::Error> {
        if raw.words.len() != words_for(raw.len) {
            return Err("wrong number of words for bit vector");
        }
        let v = BitVec::from_words(raw.len, raw.words.clone());
        if v.words != raw.words {
            return Err("bits set beyond the vector length");
        }
        Ok(v)
    }
}

impl BitVec {
    /// The all-zero vector of `len` bits.
    pub fn zero(len: usize) -> Self {
        Self {
            len,
            words: vec![0; words_for(len)],
        }
    }

    /// A vector of `len` bits with exactly the bits in `range` set.
    pub fn ones(len: usize, range: std::ops::Range<usize>) -> Self {
        let mut v = Self::zero(len);
        for i in range {
            v.set(i, true);
        }
        v
    }

    /// Builds a vector from packed words, clearing bits beyond `len`.
    ///
    /// # Panics
    /// If `words.len()` does not match the number of words needed for `len` bits.
    pub fn from_words(len: usize, words: Vec<u64>) -> Self {
        assert_eq!(words.len(), words_for(len), "wrong number of words");
        let mut v = Self { len, words };
        v.mask_tail();
        v
    }

    /// Samples a uniformly random vector of `len` bits.
    ///
    /// The bits are taken from `ceil(len / 8)` bytes of `rng` output in little
    /// endian order, so the result only depends on the byte stream of `rng`.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut bytes = vec![0_u8; len.div_ceil(8)];
        rng.fill_bytes(&mut bytes);
        Self::from_le_bytes(len, &bytes)
    }

    /// Reads `len` bits from little endian bytes. Missing bytes count as zero.
    pub fn from_le_bytes(len: usize, bytes: &[u8]) -> Self {
        let mut words = vec![0_u64; words_for(len)];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
            let mut buf = [0_u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        Self::from_words(len, words)
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector has zero bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed words.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// The packed words, mutably. Callers must keep bits beyond `len` zero.
    #[inline]
    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// Returns bit `i`.
    ///
    /// # Panics
    /// If `i >= self.len()`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of range");
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Sets bit `i` to `bit`.
    ///
    /// # Panics
    /// If `i >= self.len()`.
    #[inline]
    pub fn set(&mut self, i: usize, bit: bool) {
        assert!(i < self.len, "bit index {i} out of range");
        let mask = 1_u64 << (i % WORD_BITS);
        if bit {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    /// Sets all bits to zero.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Overwrites `self` with `other`.
    ///
    /// # Panics
    /// If the lengths differ.
    pub fn copy_from(&mut self, other: &BitVec) {
        assert_eq!(self.len, other.len, "length mismatch");
        self.words.copy_from_slice(&other.words);
    }

    /// Whether all bits are zero.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `self << shift`, i.e. bit `i` moves to bit `i + shift`. Bits
    /// moved beyond the length are dropped.
    pub fn shl(&self, shift: usize) -> BitVec {
        let mut out = BitVec::zero(self.len);
        let word_shift = shift / WORD_BITS;
        let bit_shift = shift % WORD_BITS;
        for i in word_shift..self.words.len() {
            let src = i - word_shift;
            let mut w = self.words[src] << bit_shift;
            if bit_shift > 0 && src > 0 {
                w |= self.words[src - 1] >> (WORD_BITS - bit_shift);
            }
            out.words[i] = w;
        }
        out.mask_tail();
        out
    }

    /// Returns `self >> shift`, i.e. bit `i` moves to bit `i - shift`. Bits
    /// moved below zero are dropped.
    pub fn shr(&self, shift: usize) -> BitVec {
        let mut out = BitVec::zero(self.len);
        let word_shift = shift / WORD_BITS;
        let bit_shift = shift % WORD_BITS;
        let n = self.words.len();
        for i in 0..n.saturating_sub(word_shift) {
            let src = i + word_shift;
            let mut w = self.words[src] >> bit_shift;
            if bit_shift > 0 && src + 1 < n {
                w |= self.words[src + 1] << (WORD_BITS - bit_shift);
            }
            out.words[i] = w;
        }
        out
    }

    /// Returns `self & other`.
    pub fn and(&self, other: &BitVec) -> BitVec {
        let mut out = self.clone();
        out &= other;
        out
    }

    /// Returns `self ^ other`.
    pub fn xor(&self, other: &BitVec) -> BitVec {
        let mut out = self.clone();
        out ^= other;
        out
    }

    /// Little endian bytes of the packed words, as absorbed by the commitment hash.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Iterator over the bits, starting at bit 0.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    fn mask_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1_u64 << rem) - 1;
            }
        }
    }
}

fn xor_words(dst: &mut [u64], src: &[u64]) {
    dst.iter_mut().zip(src).for_each(|(a, b)| *a ^= b);
}

impl BitXorAssign<&BitVec> for BitVec {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &BitVec) {
        assert_eq!(self.len, rhs.len, "length mismatch");
        xor_words(&mut self.words, &rhs.words);
    }
}

impl BitAndAssign<&BitVec> for BitVec {
    #[inline]
    fn bitand_assign(&mut self, rhs: &BitVec) {
        assert_eq!(self.len, rhs.len, "length mismatch");
        self.words.iter_mut().zip(&rhs.words).for_each(|(a, b)| *a &= b);
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec[{}](", self.len)?;
        for bit in self.bits() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        f.write_str(")")
    }
}

/// A matrix over GF(2), stored as packed rows.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBitMatrix")]
pub struct BitMatrix {
    cols: usize,
    rows: Vec<BitVec>,
}

#[derive(Deserialize)]
struct RawBitMatrix {
    cols: usize,
    rows: Vec<BitVec>,
}

impl TryFrom<RawBitMatrix> for BitMatrix {
    type Error = &'static str;

    fn try_from(raw: RawBitMatrix) -> Result<Self, Self::Error> {
        if raw.rows.iter().any(|r| r.len() != raw.cols) {
            return Err("ragged matrix");
        }
        Ok(BitMatrix {
            cols: raw.cols,
            rows: raw.rows,
        })
    }
}

impl BitMatrix {
    /// The all-zero `rows × cols` matrix.
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows: vec![BitVec::zero(cols); rows],
        }
    }

    /// The `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zero(n, n);
        for (i, row) in m.rows.iter_mut().enumerate() {
            row.set(i, true);
        }
        m
    }

    /// A uniformly random `rows × cols` matrix.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self {
            cols,
            rows: (0..rows).map(|_| BitVec::random(cols, rng)).collect(),
        }
    }

    /// Builds a matrix from its rows.
    ///
    /// # Panics
    /// If the rows don't all have `cols` bits.
    pub fn from_rows(cols: usize, rows: Vec<BitVec>) -> Self {
        assert!(rows.iter().all(|r| r.len() == cols), "ragged matrix");
        Self { cols, rows }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &BitVec {
        &self.rows[i]
    }

    /// Computes `M·v`: output bit `i` is the parity of `row_i & v`.
    ///
    /// # Panics
    /// If `v.len() != self.ncols()`.
    pub fn mul_vec(&self, v: &BitVec) -> BitVec {
        let mut out = BitVec::zero(self.nrows());
        self.mul_vec_into(v, &mut out);
        out
    }

    /// Computes `M·v` into `out`, overwriting it.
    ///
    /// # Panics
    /// If `v.len() != self.ncols()` or `out.len() != self.nrows()`.
    pub fn mul_vec_into(&self, v: &BitVec, out: &mut BitVec) {
        assert_eq!(v.len(), self.cols, "vector does not match matrix columns");
        assert_eq!(out.len(), self.nrows(), "output does not match matrix rows");
        out.clear();
        for (i, row) in self.rows.iter().enumerate() {
            let parity = row
                .words()
                .iter()
                .zip(v.words())
                .fold(0_u32, |acc, (r, x)| acc ^ (r & x).count_ones())
                & 1;
            if parity == 1 {
                out.words_mut()[i / WORD_BITS] |= 1 << (i % WORD_BITS);
            }
        }
    }

    /// The rank of the matrix, computed by Gaussian elimination on a copy.
    pub fn rank(&self) -> usize {
        let mut rows: Vec<Vec<u64>> = self.rows.iter().map(|r| r.words().to_vec()).collect();
        let mut rank = 0;
        for col in 0..self.cols {
            let (w, b) = (col / WORD_BITS, col % WORD_BITS);
            let Some(pivot) = (rank..rows.len()).find(|&r| (rows[r][w] >> b) & 1 == 1) else {
                continue;
            };
            rows.swap(rank, pivot);
            let pivot_row = rows[rank].clone();
            for (r, row) in rows.iter_mut().enumerate() {
                if r != rank && (row[w] >> b) & 1 == 1 {
                    xor_words(row, &pivot_row);
                }
            }
            rank += 1;
            if rank == rows.len() {
                break;
            }
        }
        rank
    }
}

impl fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitMatrix[{}x{}]", self.nrows(), self.cols)
    }
}
