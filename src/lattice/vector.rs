//! Vectors over Z_Q packed into ring elements
//!
//! An [`IntVec`] of logical length n is backed by ⌈n/d⌉ polynomials of the
//! ring: element i lives at polynomial i/d, coefficient i mod d, on every
//! modulus level. Storage is one flat residue vector per level, so polynomial
//! j of level l is `levels[l][j·d..(j+1)·d]`.
//!
//! Coefficients past n (the padding of the last polynomial) are always zero.
//! Dot products and matrix kernels rely on this and run over the padded
//! length.

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use rand::Rng;

use super::modular::{add_mod, mul_mod, neg_mod, reduce_signed, sub_mod};
use super::ring::{Poly, RingContext};
use crate::error::{LatticeError, LatticeResult};

// ============================================================================
// IntVec
// ============================================================================

/// A vector in Z_Q^n, stored in RNS form.
#[derive(Clone)]
pub struct IntVec {
    ring: Arc<RingContext>,
    len: usize,
    /// levels[l] has length ⌈len/d⌉·d
    levels: Vec<Vec<u64>>,
}

impl fmt::Debug for IntVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntVec {{ len: {}, degree: {}, levels: {}, coeffs: [...] }}",
            self.len,
            self.ring.degree(),
            self.ring.levels()
        )
    }
}

impl PartialEq for IntVec {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && *self.ring == *other.ring && self.levels == other.levels
    }
}

impl Eq for IntVec {}

fn padded_len(len: usize, d: usize) -> usize {
    len.div_ceil(d) * d
}

impl IntVec {
    /// Zero vector of length `len`.
    pub fn zeros(ring: &Arc<RingContext>, len: usize) -> Self {
        let padded = padded_len(len, ring.degree());
        Self {
            ring: Arc::clone(ring),
            len,
            levels: vec![vec![0; padded]; ring.levels()],
        }
    }

    /// Vector from signed integers (reduced on every level).
    pub fn from_i64s(ring: &Arc<RingContext>, values: &[i64]) -> Self {
        let mut v = Self::zeros(ring, values.len());
        for (level, &q) in v.levels.iter_mut().zip(ring.moduli()) {
            for (slot, &x) in level.iter_mut().zip(values) {
                *slot = reduce_signed(x, q);
            }
        }
        v
    }

    /// Vector from per-level residue vectors of length `len` each.
    pub fn from_levels(ring: &Arc<RingContext>, len: usize, levels: Vec<Vec<u64>>) -> LatticeResult<Self> {
        if levels.len() != ring.levels() {
            return Err(LatticeError::DimensionMismatch {
                context: "IntVec levels",
                expected: ring.levels(),
                got: levels.len(),
            });
        }
        let padded = padded_len(len, ring.degree());
        let mut out = Vec::with_capacity(levels.len());
        for (mut level, &q) in levels.into_iter().zip(ring.moduli()) {
            if level.len() != len {
                return Err(LatticeError::DimensionMismatch {
                    context: "IntVec level length",
                    expected: len,
                    got: level.len(),
                });
            }
            level.iter_mut().for_each(|x| *x %= q);
            level.resize(padded, 0);
            out.push(level);
        }
        Ok(Self {
            ring: Arc::clone(ring),
            len,
            levels: out,
        })
    }

    /// Vector whose backing polynomials are `polys`. Coefficients of the last
    /// polynomial past `len` must be zero.
    pub fn from_polys(ring: &Arc<RingContext>, len: usize, polys: &[Poly]) -> LatticeResult<Self> {
        let d = ring.degree();
        if polys.len() != len.div_ceil(d) {
            return Err(LatticeError::DimensionMismatch {
                context: "IntVec polynomials",
                expected: len.div_ceil(d),
                got: polys.len(),
            });
        }
        let mut v = Self::zeros(ring, len);
        for (j, p) in polys.iter().enumerate() {
            v.set_poly(j, p);
        }
        Ok(v)
    }

    /// Uniform vector over Z_Q.
    pub fn random_uniform<R: Rng>(ring: &Arc<RingContext>, len: usize, rng: &mut R) -> Self {
        let mut v = Self::zeros(ring, len);
        for (level, &q) in v.levels.iter_mut().zip(ring.moduli()) {
            for slot in level.iter_mut().take(len) {
                *slot = rng.gen_range(0..q);
            }
        }
        v
    }

    /// Witness-style vector with digits in {0, 1, 2}.
    pub fn random_ternary<R: Rng>(ring: &Arc<RingContext>, len: usize, rng: &mut R) -> Self {
        let digits: Vec<i64> = (0..len).map(|_| rng.gen_range(0..3)).collect();
        Self::from_i64s(ring, &digits)
    }

    /// Entries uniform in [-bound, bound].
    pub fn random_bounded<R: Rng>(ring: &Arc<RingContext>, len: usize, bound: u64, rng: &mut R) -> Self {
        let bound = bound.min(i64::MAX as u64) as i64;
        let values: Vec<i64> = (0..len).map(|_| rng.gen_range(-bound..=bound)).collect();
        Self::from_i64s(ring, &values)
    }

    pub fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of backing polynomials ⌈n/d⌉.
    pub fn num_polys(&self) -> usize {
        self.len.div_ceil(self.ring.degree())
    }

    /// Padded residues of one level (length ⌈n/d⌉·d).
    pub fn level(&self, level: usize) -> &[u64] {
        &self.levels[level]
    }

    pub fn is_zero(&self) -> bool {
        self.levels.iter().flatten().all(|&x| x == 0)
    }
}

// ============================================================================
// Element and Polynomial Access
// ============================================================================

impl IntVec {
    /// Residues of element i on every level.
    pub fn get(&self, i: usize) -> Vec<u64> {
        debug_assert!(i < self.len);
        self.levels.iter().map(|level| level[i]).collect()
    }

    pub fn get_level(&self, i: usize, level: usize) -> u64 {
        self.levels[level][i]
    }

    /// Set element i from its per-level residues.
    pub fn set(&mut self, i: usize, residues: &[u64]) {
        debug_assert!(i < self.len);
        for (level, &r) in self.levels.iter_mut().zip(residues) {
            level[i] = r;
        }
    }

    pub fn set_i64(&mut self, i: usize, value: i64) {
        debug_assert!(i < self.len);
        for (level, &q) in self.levels.iter_mut().zip(self.ring.moduli()) {
            level[i] = reduce_signed(value, q);
        }
    }

    /// Centred value of element i.
    pub fn lift_at(&self, i: usize) -> BigInt {
        self.ring.lift_residues(&self.get(i))
    }

    /// Centred values of all elements.
    pub fn lift(&self) -> Vec<BigInt> {
        (0..self.len).map(|i| self.lift_at(i)).collect()
    }

    /// Backing polynomial j.
    pub fn poly(&self, j: usize) -> Poly {
        let d = self.ring.degree();
        Poly {
            coeffs: self
                .levels
                .iter()
                .map(|level| level[j * d..(j + 1) * d].to_vec())
                .collect(),
        }
    }

    pub fn polys(&self) -> Vec<Poly> {
        (0..self.num_polys()).map(|j| self.poly(j)).collect()
    }

    /// Overwrite backing polynomial j; coefficients past the logical length
    /// are dropped to keep the padding zero.
    pub fn set_poly(&mut self, j: usize, p: &Poly) {
        let d = self.ring.degree();
        let end = ((j + 1) * d).min(self.len);
        for (level, src) in self.levels.iter_mut().zip(&p.coeffs) {
            level[j * d..end].copy_from_slice(&src[..end - j * d]);
        }
    }
}

// ============================================================================
// Structural Operations
// ============================================================================

impl IntVec {
    /// Append `other` after the last logical element.
    pub fn append(&mut self, other: &IntVec) {
        debug_assert_eq!(*self.ring, *other.ring);
        let new_len = self.len + other.len;
        let padded = padded_len(new_len, self.ring.degree());
        for (level, src) in self.levels.iter_mut().zip(&other.levels) {
            level.truncate(self.len);
            level.extend_from_slice(&src[..other.len]);
            level.resize(padded, 0);
        }
        self.len = new_len;
    }

    /// Concatenation of several vectors.
    pub fn concat<'a>(ring: &Arc<RingContext>, parts: impl IntoIterator<Item = &'a IntVec>) -> Self {
        parts.into_iter().fold(Self::zeros(ring, 0), |mut acc, part| {
            acc.append(part);
            acc
        })
    }

    /// Elements [start, end); boundaries need not be polynomial-aligned.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= self.len);
        let len = end - start;
        let padded = padded_len(len, self.ring.degree());
        let levels = self
            .levels
            .iter()
            .map(|level| {
                let mut out = level[start..end].to_vec();
                out.resize(padded, 0);
                out
            })
            .collect();
        Self {
            ring: Arc::clone(&self.ring),
            len,
            levels,
        }
    }

    /// Same flat coefficients over a ring of smaller degree.
    ///
    /// Legal when the old degree is a multiple of the new one and both rings
    /// share the modulus chain; each old polynomial splits into old_d/new_d new
    /// ones, so no coefficient is discarded.
    pub fn rebase_lossless(&self, new_ring: &Arc<RingContext>) -> LatticeResult<Self> {
        let (from, to) = (self.ring.degree(), new_ring.degree());
        if from % to != 0 || !self.ring.same_chain(new_ring) {
            return Err(LatticeError::IncompatibleRebase { from, to });
        }
        let padded = padded_len(self.len, to);
        let levels = self
            .levels
            .iter()
            .map(|level| level[..padded].to_vec())
            .collect();
        Ok(Self {
            ring: Arc::clone(new_ring),
            len: self.len,
            levels,
        })
    }
}

// ============================================================================
// Arithmetic Operations
// ============================================================================

impl IntVec {
    fn zip_map(&self, other: &Self, f: impl Fn(u64, u64, u64) -> u64) -> Self {
        debug_assert_eq!(self.len, other.len);
        let levels = self
            .levels
            .iter()
            .zip(&other.levels)
            .zip(self.ring.moduli())
            .map(|((a, b), &q)| a.iter().zip(b).map(|(&x, &y)| f(x, y, q)).collect())
            .collect();
        Self {
            ring: Arc::clone(&self.ring),
            len: self.len,
            levels,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.zip_map(other, add_mod)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.zip_map(other, sub_mod)
    }

    /// Entry-wise product.
    pub fn hadamard(&self, other: &Self) -> Self {
        self.zip_map(other, mul_mod)
    }

    pub fn add_assign(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len);
        for ((a, b), &q) in self.levels.iter_mut().zip(&other.levels).zip(self.ring.moduli()) {
            for (x, &y) in a.iter_mut().zip(b) {
                *x = add_mod(*x, y, q);
            }
        }
    }

    pub fn neg(&self) -> Self {
        let mut out = self.clone();
        for (level, &q) in out.levels.iter_mut().zip(self.ring.moduli()) {
            level.iter_mut().for_each(|x| *x = neg_mod(*x, q));
        }
        out
    }

    /// Multiply every entry by an integer scalar.
    pub fn scale(&self, c: i64) -> Self {
        let residues: Vec<u64> = self.ring.moduli().iter().map(|&q| reduce_signed(c, q)).collect();
        self.scale_residues(&residues)
    }

    /// Multiply every entry by the element with the given per-level residues.
    pub fn scale_residues(&self, c: &[u64]) -> Self {
        let mut out = self.clone();
        for ((level, &q), &c) in out.levels.iter_mut().zip(self.ring.moduli()).zip(c) {
            level.iter_mut().for_each(|x| *x = mul_mod(*x, c, q));
        }
        out
    }

    /// ⟨self, other⟩ per level via Montgomery multiply-accumulate.
    pub fn dot(&self, other: &Self) -> Vec<u64> {
        debug_assert_eq!(self.len, other.len);
        self.levels
            .iter()
            .zip(&other.levels)
            .enumerate()
            .map(|(l, (a, b))| self.ring.montgomery(l).dot(a, b))
            .collect()
    }

    /// ⟨self, other⟩ per level with plain u128 reduction.
    pub fn dot_reference(&self, other: &Self) -> Vec<u64> {
        debug_assert_eq!(self.len, other.len);
        self.levels
            .iter()
            .zip(&other.levels)
            .zip(self.ring.moduli())
            .map(|((a, b), &q)| {
                let q128 = q as u128;
                a.iter()
                    .zip(b)
                    .fold(0u128, |acc, (&x, &y)| (acc + x as u128 * y as u128) % q128)
                    as u64
            })
            .collect()
    }

    /// ℓ∞ norm of the centred representation.
    pub fn inf_norm(&self) -> u64 {
        (0..self.len)
            .map(|i| self.ring.coeff_norm(&self.get(i)))
            .max()
            .unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::TEST_CHAIN;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn test_ring(d: usize) -> Arc<RingContext> {
        RingContext::from_chain(d, &TEST_CHAIN).expect("valid chain")
    }

    #[test]
    fn test_packing_layout() {
        let ring = test_ring(8);
        let values: Vec<i64> = (0..11).collect();
        let v = IntVec::from_i64s(&ring, &values);

        assert_eq!(v.num_polys(), 2);
        assert_eq!(v.level(0).len(), 16);
        // element 9 is coefficient 1 of polynomial 1
        assert_eq!(v.poly(1).coeffs[0][1], 9);
        assert!(v.level(1)[11..].iter().all(|&x| x == 0));

        let rebuilt = IntVec::from_polys(&ring, 11, &v.polys()).expect("shape");
        assert_eq!(rebuilt, v);
    }

    #[test]
    fn test_append_and_slice_unaligned() {
        let ring = test_ring(8);
        let a = IntVec::from_i64s(&ring, &[1, 2, 3]);
        let b = IntVec::from_i64s(&ring, &(10..20).collect::<Vec<_>>());

        let mut c = a.clone();
        c.append(&b);
        assert_eq!(c.len(), 13);
        assert_eq!(c.slice(0, 3), a);
        assert_eq!(c.slice(3, 13), b);
        assert_eq!(c.slice(5, 6), IntVec::from_i64s(&ring, &[12]));
        assert_eq!(IntVec::concat(&ring, [&a, &b]), c);
    }

    #[test]
    fn test_set_poly_keeps_padding_zero() {
        let ring = test_ring(8);
        let mut v = IntVec::zeros(&ring, 5);
        v.set_poly(0, &ring.from_signed(&[1, 1, 1, 1, 1, 1, 1, 1]));
        assert_eq!(v, IntVec::from_i64s(&ring, &[1, 1, 1, 1, 1]));
    }

    #[test]
    fn test_dot_matches_reference() {
        let ring = test_ring(16);
        let mut rng = test_rng();
        for len in [0usize, 1, 15, 16, 17, 100] {
            let a = IntVec::random_uniform(&ring, len, &mut rng);
            let b = IntVec::random_uniform(&ring, len, &mut rng);
            assert_eq!(a.dot(&b), a.dot_reference(&b), "len = {len}");
        }

        let a = IntVec::from_i64s(&ring, &[1, -2, 3]);
        let b = IntVec::from_i64s(&ring, &[4, 5, -6]);
        assert_eq!(ring.lift_residues(&a.dot(&b)), BigInt::from(4 - 10 - 18));
    }

    #[test]
    fn test_arithmetic_and_norm() {
        let ring = test_ring(8);
        let a = IntVec::from_i64s(&ring, &[1, -2, 3]);
        let b = IntVec::from_i64s(&ring, &[4, 5, -6]);

        assert_eq!(a.add(&b), IntVec::from_i64s(&ring, &[5, 3, -3]));
        assert_eq!(a.sub(&b), IntVec::from_i64s(&ring, &[-3, -7, 9]));
        assert_eq!(a.hadamard(&b), IntVec::from_i64s(&ring, &[4, -10, -18]));
        assert_eq!(a.scale(-3), IntVec::from_i64s(&ring, &[-3, 6, -9]));
        assert_eq!(a.neg().inf_norm(), 3);
        assert_eq!(b.inf_norm(), 6);
    }

    #[test]
    fn test_rebase_roundtrip() {
        let big = test_ring(64);
        let small = test_ring(16);
        let mut rng = test_rng();

        let v = IntVec::random_uniform(&big, 70, &mut rng);
        let r = v.rebase_lossless(&small).expect("16 divides 64");
        assert_eq!(r.num_polys(), 5);
        assert_eq!(r.lift(), v.lift());
        assert_eq!(r.rebase_lossless(&big), Err(LatticeError::IncompatibleRebase { from: 16, to: 64 }));

        let other_chain = RingContext::new(16, &[1_072_496_641]).expect("valid");
        assert!(v.rebase_lossless(&other_chain).is_err());
    }

    #[test]
    fn test_random_ternary_digits() {
        let ring = test_ring(32);
        let v = IntVec::random_ternary(&ring, 200, &mut test_rng());
        assert!(v.lift().iter().all(|x| *x >= 0.into() && *x <= 2.into()));
    }
}
