//! RNS ring context for R_Q = Z_Q[X]/(X^d + 1)
//!
//! The modulus Q = q_0·…·q_L is kept in residue number system form: a [`Poly`]
//! stores one coefficient vector of length d per prime q_i. Every level has its
//! own negacyclic NTT tables and Montgomery context.
//!
//! # Design Notes
//!
//! Operations live on the shared [`RingContext`] rather than on the
//! polynomial, so containers (`IntVec`, matrices) only carry an
//! `Arc<RingContext>` and raw residues. Centred values are recovered through
//! the CRT; a cheap single-level check short-cuts the common small case.
//!
//! | Operation | Cost per level |
//! |-----------|----------------|
//! | add / sub / scale | O(d) |
//! | `mul_coeffs` | O(d) |
//! | `mul` | O(d log d) via NTT |
//! | `permute` | O(d) |

use std::fmt;
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use super::modular::{
    add_mod, center, mod_inv, mul_mod, neg_mod, reduce_signed, sub_mod, Montgomery,
};
use super::ntt::NegacyclicNtt;
use super::params::{find_primitive_2d_root, is_prime, ModulusChain};
use super::ring_mul::{NttBackend, RingMulBackend};
use crate::error::{LatticeError, LatticeResult};

// ============================================================================
// Polynomial
// ============================================================================

/// Element of R_Q in RNS form: `coeffs[level][i]` is the i-th coefficient
/// reduced modulo the level's prime.
#[derive(Clone, PartialEq, Eq)]
pub struct Poly {
    pub coeffs: Vec<Vec<u64>>,
}

impl fmt::Debug for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Poly {{ levels: {}, degree: {}, coeffs: [...] }}",
            self.levels(),
            self.degree()
        )
    }
}

impl Poly {
    pub fn levels(&self) -> usize {
        self.coeffs.len()
    }

    pub fn degree(&self) -> usize {
        self.coeffs.first().map_or(0, Vec::len)
    }

    pub fn level(&self, level: usize) -> &[u64] {
        &self.coeffs[level]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().flatten().all(|&c| c == 0)
    }

    /// Residues of coefficient `i` across all levels.
    pub fn residues(&self, i: usize) -> Vec<u64> {
        self.coeffs.iter().map(|level| level[i]).collect()
    }
}

// ============================================================================
// Ring Context
// ============================================================================

/// Degree-d negacyclic ring over an RNS modulus chain.
pub struct RingContext {
    degree: usize,
    moduli: Vec<u64>,
    backends: Vec<NttBackend>,
    mont: Vec<Montgomery>,
    /// Q = Π q_i
    modulus: BigUint,
    /// CRT basis: (Q/q_i)·((Q/q_i)^{-1} mod q_i)
    crt_basis: Vec<BigUint>,
}

impl fmt::Debug for RingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RingContext {{ degree: {}, moduli: {:?} }}",
            self.degree, self.moduli
        )
    }
}

impl PartialEq for RingContext {
    fn eq(&self, other: &Self) -> bool {
        self.degree == other.degree && self.moduli == other.moduli
    }
}

impl Eq for RingContext {}

impl RingContext {
    /// Build the context for degree `degree` over `moduli`.
    ///
    /// Every modulus must be a prime below 2^62 with q ≡ 1 (mod 2d).
    pub fn new(degree: usize, moduli: &[u64]) -> LatticeResult<Arc<Self>> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(LatticeError::DegreeNotPowerOfTwo(degree));
        }
        if moduli.is_empty() {
            return Err(LatticeError::InvalidModulusChain("no moduli given"));
        }
        if moduli.iter().enumerate().any(|(i, q)| moduli[..i].contains(q)) {
            return Err(LatticeError::InvalidModulusChain("moduli must be distinct"));
        }

        let mut backends = Vec::with_capacity(moduli.len());
        for &q in moduli {
            if q >= 1 << 62 {
                return Err(LatticeError::InvalidModulusChain("moduli must be below 2^62"));
            }
            let psi = find_primitive_2d_root(q, degree)
                .filter(|_| is_prime(q))
                .ok_or(LatticeError::NotNttFriendly { q, degree })?;
            backends.push(NttBackend::new(NegacyclicNtt::new(degree, q, psi)));
        }

        let modulus: BigUint = moduli.iter().map(|&q| BigUint::from(q)).product();
        let crt_basis = moduli
            .iter()
            .map(|&q| {
                let cofactor = &modulus / q;
                let residue = (&cofactor % q).to_u64().unwrap_or(0);
                cofactor * mod_inv(residue, q)
            })
            .collect();

        debug!(degree, levels = moduli.len(), "ring context constructed");

        Ok(Arc::new(Self {
            degree,
            moduli: moduli.to_vec(),
            backends,
            mont: moduli.iter().map(|&q| Montgomery::new(q)).collect(),
            modulus,
            crt_basis,
        }))
    }

    /// Build the context from a named preset chain.
    pub fn from_chain(degree: usize, chain: &ModulusChain) -> LatticeResult<Arc<Self>> {
        Self::new(degree, chain.moduli)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    pub fn levels(&self) -> usize {
        self.moduli.len()
    }

    /// Q = Π q_i
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn montgomery(&self, level: usize) -> &Montgomery {
        &self.mont[level]
    }

    pub fn ntt_backend(&self, level: usize) -> &NttBackend {
        &self.backends[level]
    }

    /// Two rings share a modulus chain (degree may differ).
    pub fn same_chain(&self, other: &Self) -> bool {
        self.moduli == other.moduli
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn zero(&self) -> Poly {
        Poly {
            coeffs: vec![vec![0; self.degree]; self.levels()],
        }
    }

    /// Constant polynomial c.
    pub fn constant(&self, c: i64) -> Poly {
        let mut p = self.zero();
        for (level, &q) in p.coeffs.iter_mut().zip(&self.moduli) {
            level[0] = reduce_signed(c, q);
        }
        p
    }

    /// X^exp, with X^d = -1 applied for exp in [d, 2d).
    pub fn monomial(&self, exp: usize) -> Poly {
        self.mul_monomial(&self.constant(1), exp)
    }

    /// Polynomial with the given signed coefficients (zero-padded to d).
    pub fn from_signed(&self, coeffs: &[i64]) -> Poly {
        debug_assert!(coeffs.len() <= self.degree);
        let mut p = self.zero();
        for (level, &q) in p.coeffs.iter_mut().zip(&self.moduli) {
            for (slot, &c) in level.iter_mut().zip(coeffs) {
                *slot = reduce_signed(c, q);
            }
        }
        p
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    fn zip_map(&self, a: &Poly, b: &Poly, f: impl Fn(u64, u64, u64) -> u64) -> Poly {
        let coeffs = a
            .coeffs
            .iter()
            .zip(&b.coeffs)
            .zip(&self.moduli)
            .map(|((x, y), &q)| x.iter().zip(y).map(|(&u, &v)| f(u, v, q)).collect())
            .collect();
        Poly { coeffs }
    }

    fn zip_assign(&self, acc: &mut Poly, b: &Poly, f: impl Fn(u64, u64, u64) -> u64) {
        for ((x, y), &q) in acc.coeffs.iter_mut().zip(&b.coeffs).zip(&self.moduli) {
            for (u, &v) in x.iter_mut().zip(y) {
                *u = f(*u, v, q);
            }
        }
    }

    pub fn add(&self, a: &Poly, b: &Poly) -> Poly {
        self.zip_map(a, b, add_mod)
    }

    pub fn sub(&self, a: &Poly, b: &Poly) -> Poly {
        self.zip_map(a, b, sub_mod)
    }

    pub fn add_assign(&self, acc: &mut Poly, b: &Poly) {
        self.zip_assign(acc, b, add_mod);
    }

    pub fn sub_assign(&self, acc: &mut Poly, b: &Poly) {
        self.zip_assign(acc, b, sub_mod);
    }

    pub fn neg(&self, a: &Poly) -> Poly {
        let coeffs = a
            .coeffs
            .iter()
            .zip(&self.moduli)
            .map(|(x, &q)| x.iter().map(|&u| neg_mod(u, q)).collect())
            .collect();
        Poly { coeffs }
    }

    /// Multiply by an integer scalar.
    pub fn scale(&self, a: &Poly, c: i64) -> Poly {
        let coeffs = a
            .coeffs
            .iter()
            .zip(&self.moduli)
            .map(|(x, &q)| {
                let c = reduce_signed(c, q);
                x.iter().map(|&u| mul_mod(u, c, q)).collect()
            })
            .collect();
        Poly { coeffs }
    }

    /// Multiply by n^{-1} mod Q. n must be coprime to every modulus.
    pub fn div_scalar(&self, a: &Poly, n: u64) -> Poly {
        let coeffs = a
            .coeffs
            .iter()
            .zip(&self.moduli)
            .map(|(x, &q)| {
                let inv = mod_inv(n % q, q);
                x.iter().map(|&u| mul_mod(u, inv, q)).collect()
            })
            .collect();
        Poly { coeffs }
    }

    /// Coefficient-wise product.
    pub fn mul_coeffs(&self, a: &Poly, b: &Poly) -> Poly {
        self.zip_map(a, b, mul_mod)
    }

    /// acc += a ⊙ b (coefficient-wise)
    pub fn mul_coeffs_and_add(&self, acc: &mut Poly, a: &Poly, b: &Poly) {
        for (((z, x), y), &q) in acc
            .coeffs
            .iter_mut()
            .zip(&a.coeffs)
            .zip(&b.coeffs)
            .zip(&self.moduli)
        {
            for ((w, &u), &v) in z.iter_mut().zip(x).zip(y) {
                *w = add_mod(*w, mul_mod(u, v, q), q);
            }
        }
    }

    /// Ring product in Z_Q[X]/(X^d + 1).
    pub fn mul(&self, a: &Poly, b: &Poly) -> Poly {
        let coeffs = a
            .coeffs
            .iter()
            .zip(&b.coeffs)
            .zip(&self.backends)
            .map(|((x, y), backend)| backend.ring_mul(x, y))
            .collect();
        Poly { coeffs }
    }

    /// acc += a·b (ring product)
    pub fn mul_and_add(&self, acc: &mut Poly, a: &Poly, b: &Poly) {
        let prod = self.mul(a, b);
        self.add_assign(acc, &prod);
    }

    /// Forward NTT on every level: coefficients to slots.
    pub fn ntt(&self, a: &Poly) -> Poly {
        let mut out = a.clone();
        for (level, backend) in out.coeffs.iter_mut().zip(&self.backends) {
            backend.tables.forward(level);
        }
        out
    }

    /// Inverse NTT on every level: slots to coefficients.
    pub fn inv_ntt(&self, a: &Poly) -> Poly {
        let mut out = a.clone();
        for (level, backend) in out.coeffs.iter_mut().zip(&self.backends) {
            backend.tables.inverse(level);
        }
        out
    }

    /// Apply X ↦ X^galois for an odd galois element of Z_{2d}.
    pub fn permute(&self, a: &Poly, galois: usize) -> Poly {
        let d = self.degree;
        let two_d = 2 * d;
        debug_assert!(galois % 2 == 1, "galois element must be odd");

        let mut out = self.zero();
        for ((dst, src), &q) in out.coeffs.iter_mut().zip(&a.coeffs).zip(&self.moduli) {
            for (i, &c) in src.iter().enumerate() {
                let exp = (i * galois) % two_d;
                if exp < d {
                    dst[exp] = c;
                } else {
                    dst[exp - d] = neg_mod(c, q);
                }
            }
        }
        out
    }

    /// Multiply by X^exp (exp taken mod 2d).
    pub fn mul_monomial(&self, a: &Poly, exp: usize) -> Poly {
        let d = self.degree;
        let shift = exp % (2 * d);

        let mut out = self.zero();
        for ((dst, src), &q) in out.coeffs.iter_mut().zip(&a.coeffs).zip(&self.moduli) {
            for (i, &c) in src.iter().enumerate() {
                let j = (i + shift) % (2 * d);
                if j < d {
                    dst[j] = c;
                } else {
                    dst[j - d] = neg_mod(c, q);
                }
            }
        }
        out
    }

    // ========================================================================
    // Centred representation
    // ========================================================================

    /// Centred lift of one coefficient given its residues, in (-Q/2, Q/2].
    pub fn lift_residues(&self, residues: &[u64]) -> BigInt {
        if let Some(v) = self.small_lift(residues) {
            return BigInt::from(v);
        }

        let sum: BigUint = residues
            .iter()
            .zip(&self.crt_basis)
            .map(|(&r, basis)| basis * r)
            .sum();
        let x = sum % &self.modulus;
        let half = &self.modulus >> 1usize;
        if x > half {
            BigInt::from(x) - BigInt::from(self.modulus.clone())
        } else {
            BigInt::from(x)
        }
    }

    /// Residues of an arbitrary integer on every level.
    pub fn reduce_bigint(&self, x: &BigInt) -> Vec<u64> {
        self.moduli
            .iter()
            .map(|&q| {
                let r = x % BigInt::from(q);
                let r = if r.is_negative() { r + BigInt::from(q) } else { r };
                r.to_u64().unwrap_or(0)
            })
            .collect()
    }

    /// Centred value when it is already determined by the first level.
    fn small_lift(&self, residues: &[u64]) -> Option<i64> {
        let v = center(residues[0], self.moduli[0]);
        residues[1..]
            .iter()
            .zip(&self.moduli[1..])
            .all(|(&r, &q)| reduce_signed(v, q) == r)
            .then_some(v)
    }

    /// |centred coefficient|, saturating at u64::MAX.
    pub fn coeff_norm(&self, residues: &[u64]) -> u64 {
        match self.small_lift(residues) {
            Some(v) => v.unsigned_abs(),
            None => self.lift_residues(residues).abs().to_u64().unwrap_or(u64::MAX),
        }
    }

    /// ℓ∞ norm of the centred representation.
    pub fn inf_norm(&self, a: &Poly) -> u64 {
        (0..self.degree)
            .map(|i| self.coeff_norm(&a.residues(i)))
            .max()
            .unwrap_or(0)
    }

    /// Centred coefficients as big integers.
    pub fn lift(&self, a: &Poly) -> Vec<BigInt> {
        (0..self.degree)
            .map(|i| self.lift_residues(&a.residues(i)))
            .collect()
    }

    /// ⌊√(Q / n)⌋ as u64 (saturating); used for ABP thresholds.
    pub fn sqrt_modulus_over(&self, n: u64) -> u64 {
        let quotient = &self.modulus / BigUint::from(n.max(1));
        quotient.sqrt().to_u64().unwrap_or(u64::MAX)
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Uniform element of R_Q (independent uniform residues per level).
    pub fn sample_uniform<R: Rng>(&self, rng: &mut R) -> Poly {
        Poly {
            coeffs: self
                .moduli
                .iter()
                .map(|&q| (0..self.degree).map(|_| rng.gen_range(0..q)).collect())
                .collect(),
        }
    }

    /// Coefficients uniform in {-1, 0, 1}.
    pub fn sample_ternary<R: Rng>(&self, rng: &mut R) -> Poly {
        self.sample_bounded(rng, 1)
    }

    /// Coefficients uniform in [-bound, bound].
    pub fn sample_bounded<R: Rng>(&self, rng: &mut R, bound: u64) -> Poly {
        let bound = bound.min(i64::MAX as u64) as i64;
        let coeffs: Vec<i64> = (0..self.degree)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        self.from_signed(&coeffs)
    }

    /// Rounded continuous Gaussian: each coefficient is round(x) for
    /// x ~ N(0, sigma²).
    pub fn sample_gaussian<R: Rng>(&self, rng: &mut R, sigma: f64) -> Poly {
        let coeffs: Vec<i64> = (0..self.degree)
            .map(|_| (rng.sample::<f64, _>(StandardNormal) * sigma).round() as i64)
            .collect();
        self.from_signed(&coeffs)
    }
}

// ============================================================================
// Tests
// ============================================================================
