//! Automorphism σ: X ↦ X^g of order k and its trace
//!
//! For g = 2d/k + 1 with k² | 2d, the powers of g modulo 2d are
//! g^v ≡ 1 + v·2d/k, so σ^v(X^i) = ζ^{iv}·X^i with ζ = X^{2d/k} a primitive
//! k-th root of unity. Consequently
//!
//!   Tr(f) = Σ_{v<k} σ^v(f) = k·Σ_{k | i} f_i X^i
//!
//! and k^{-1}·Tr(f) keeps exactly the coefficients at multiples of k. The
//! proof protocol uses this to move k independent relations into the slots
//! X^0..X^{k-1} of one polynomial (the "repetition rate" k).
//!
//! The tower form Tr(x) = (1 + σ^{k/2})…(1 + σ²)(1 + σ)(x) needs log₂ k
//! automorphisms instead of k.

use super::modular::pow_mod;
use super::ring::{Poly, RingContext};
use crate::error::{LatticeError, LatticeResult};

// ============================================================================
// Automorphism
// ============================================================================

/// σ: X ↦ X^g with g = 2d/k + 1, σ^k = id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Automorphism {
    generator: usize,
    degree: usize,
    k: usize,
}

impl Automorphism {
    /// Requires k a power of two, k | d and k² | 2d.
    pub fn new(degree: usize, k: usize) -> LatticeResult<Self> {
        let valid = degree.is_power_of_two()
            && k.is_power_of_two()
            && degree % k == 0
            && (2 * degree) % (k * k) == 0;
        if !valid {
            return Err(LatticeError::InvalidAutomorphism { degree, k });
        }
        Ok(Self {
            generator: 2 * degree / k + 1,
            degree,
            k,
        })
    }

    pub fn generator(&self) -> usize {
        self.generator
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Order k of σ.
    pub fn order(&self) -> usize {
        self.k
    }

    /// g^(exp mod d) mod 2d. Negative exponents address σ^{-1}.
    pub fn galois_element(&self, exp: i64) -> usize {
        let e = exp.rem_euclid(self.degree as i64) as u64;
        pow_mod(self.generator as u64, e, 2 * self.degree as u64) as usize
    }

    /// σ^exp(p)
    pub fn permute(&self, ring: &RingContext, p: &Poly, exp: i64) -> Poly {
        debug_assert_eq!(ring.degree(), self.degree);
        match self.galois_element(exp) {
            1 => p.clone(),
            g => ring.permute(p, g),
        }
    }
}

// ============================================================================
// Trace Computation
// ============================================================================

/// Σ_{v<k} σ^v(f(v))
///
/// Time: O(k·d)
pub fn trace(ring: &RingContext, sigma: &Automorphism, f: impl Fn(usize) -> Poly) -> Poly {
    (0..sigma.order()).fold(ring.zero(), |mut acc, v| {
        ring.add_assign(&mut acc, &sigma.permute(ring, &f(v), v as i64));
        acc
    })
}

/// Tr(x) = (1 + σ^{k/2})…(1 + σ²)(1 + σ)(x)
///
/// Time: O(log k · d)
pub fn trace_tower(ring: &RingContext, sigma: &Automorphism, x: &Poly) -> Poly {
    let steps = sigma.order().trailing_zeros();
    (0..steps).fold(x.clone(), |acc, s| {
        let shifted = sigma.permute(ring, &acc, 1i64 << s);
        ring.add(&acc, &shifted)
    })
}

/// k^{-1}·Tr(x): the coefficients of x at multiples of k, all others zeroed.
pub fn normalized_trace(ring: &RingContext, sigma: &Automorphism, x: &Poly) -> Poly {
    ring.div_scalar(&trace_tower(ring, sigma, x), sigma.order() as u64)
}

// ============================================================================
// Tests
// ============================================================================
