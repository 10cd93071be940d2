//! Sparse ternary challenge polynomials
//!
//! The verifier's challenge c has exactly ω non-zero coefficients in {-1, 1}.
//! Short challenges keep σ^i(c)·r short in the masked opening, and the
//! challenge space has C(d, ω)·2^ω elements.
//!
//! Reference: Lyubashevsky, Seiler, "Short, invertible elements in partially
//! splitting cyclotomic rings" (ePrint 2017/523).

use rand::Rng;
use std::collections::HashSet;

use super::ring::{Poly, RingContext};

// ============================================================================
// Challenge Element
// ============================================================================

/// A sparse challenge element
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Challenge {
    /// Sparse representation: (index, coefficient) pairs, sorted by index
    pub sparse_coeffs: Vec<(usize, i64)>,
    /// Ring dimension
    pub n: usize,
}

impl Challenge {
    /// Create a new challenge from sparse coefficients
    pub fn new(sparse_coeffs: Vec<(usize, i64)>, n: usize) -> Self {
        let mut coeffs = sparse_coeffs;
        coeffs.sort_by_key(|(idx, _)| *idx);
        coeffs.retain(|(_, c)| *c != 0);
        Self {
            sparse_coeffs: coeffs,
            n,
        }
    }

    /// Convert to dense coefficient representation
    pub fn to_dense(&self) -> Vec<i64> {
        let mut coeffs = vec![0i64; self.n];
        for &(idx, coeff) in &self.sparse_coeffs {
            coeffs[idx] = coeff;
        }
        coeffs
    }

    /// Embed into R_Q
    pub fn to_poly(&self, ring: &RingContext) -> Poly {
        debug_assert_eq!(ring.degree(), self.n);
        ring.from_signed(&self.to_dense())
    }

    /// Hamming weight (number of non-zero coefficients)
    pub fn weight(&self) -> usize {
        self.sparse_coeffs.len()
    }
}

// ============================================================================
// Challenge Sampling
// ============================================================================

/// Sample a challenge with ω coefficients in {-1, 1} and the rest zero
pub fn sample_ternary_challenge<R: Rng>(rng: &mut R, n: usize, omega: usize) -> Challenge {
    let positions = sample_distinct_positions(rng, n, omega);
    let sparse_coeffs = positions
        .into_iter()
        .map(|pos| (pos, if rng.gen::<bool>() { 1 } else { -1 }))
        .collect();
    Challenge::new(sparse_coeffs, n)
}

/// log₂ of the ternary challenge space C(n, ω)·2^ω, floored
pub fn challenge_space_bits(n: usize, omega: usize) -> u64 {
    let binomial = binomial_coefficient(n, omega);
    if binomial == 0 {
        0
    } else {
        binomial.ilog2() as u64 + omega as u64
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Sample k distinct positions from [0, n)
fn sample_distinct_positions<R: Rng>(rng: &mut R, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);

    if k > n / 2 {
        // Fisher-Yates for large k
        let mut positions: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = rng.gen_range(i..n);
            positions.swap(i, j);
        }
        positions.truncate(k);
        positions
    } else {
        // Rejection sampling for small k
        let mut positions = HashSet::with_capacity(k);
        while positions.len() < k {
            positions.insert(rng.gen_range(0..n));
        }
        positions.into_iter().collect()
    }
}

/// Compute binomial coefficient C(n, k), saturating
fn binomial_coefficient(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1u128, |acc, i| {
        acc.saturating_mul((n - i) as u128) / (i + 1) as u128
    })
}

// ============================================================================
// Tests
// ============================================================================
