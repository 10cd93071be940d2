//! Ring multiplication backends for one level of R_q = Z_q[X]/(X^d + 1)
//!
//! The ring context keeps one backend per modulus of its chain:
//!
//! - [`SchoolbookBackend`]: O(d²), no constraints on q
//! - [`NttBackend`]: O(d log d), requires NTT-friendly q ≡ 1 (mod 2d)
//!
//! Every modulus admitted by [`RingContext`](super::ring::RingContext) is
//! NTT-friendly, so the schoolbook backend serves as the reference path in
//! tests and benchmarks.

use itertools::iproduct;

use super::modular::{add_mod, mul_mod, sub_mod};
use super::ntt::NegacyclicNtt;

// ============================================================================
// Ring Multiplication Trait
// ============================================================================

/// Backend for ring multiplication on a single residue level.
pub trait RingMulBackend: Send + Sync {
    /// Multiply two coefficient vectors of length d in Z_q[X]/(X^d + 1).
    fn ring_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64>;

    /// Modulus of this level.
    fn modulus(&self) -> u64;
}

/// Negacyclic schoolbook product: X^d = -1 folds the upper half back negated.
pub fn mul_schoolbook(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
    debug_assert_eq!(a.len(), b.len());
    let d = a.len();
    let mut out = vec![0u64; d];

    for (i, j) in iproduct!(0..d, 0..d) {
        let prod = mul_mod(a[i], b[j], q);
        let k = i + j;
        if k < d {
            out[k] = add_mod(out[k], prod, q);
        } else {
            out[k - d] = sub_mod(out[k - d], prod, q);
        }
    }
    out
}

// ============================================================================
// Schoolbook Backend
// ============================================================================

/// Schoolbook O(d²) multiplication.
#[derive(Clone, Copy, Debug)]
pub struct SchoolbookBackend {
    pub q: u64,
}

impl RingMulBackend for SchoolbookBackend {
    fn ring_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        mul_schoolbook(a, b, self.q)
    }

    fn modulus(&self) -> u64 {
        self.q
    }
}

// ============================================================================
// NTT Backend
// ============================================================================

/// NTT-based O(d log d) multiplication.
#[derive(Clone, Debug)]
pub struct NttBackend {
    /// Precomputed NTT tables for (d, q, ψ)
    pub tables: NegacyclicNtt,
}

impl NttBackend {
    pub fn new(tables: NegacyclicNtt) -> Self {
        Self { tables }
    }
}

impl RingMulBackend for NttBackend {
    fn ring_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        self.tables.ring_mul(a, b)
    }

    fn modulus(&self) -> u64 {
        self.tables.q
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::find_primitive_2d_root;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn schoolbook_wraps_negacyclically() {
        let q = 17;
        // X^3 · X = X^4 = -1 in Z_17[X]/(X^4 + 1)
        let x3 = [0, 0, 0, 1];
        let x = [0, 1, 0, 0];
        assert_eq!(SchoolbookBackend { q }.ring_mul(&x3, &x), vec![16, 0, 0, 0]);
    }

    #[test]
    fn ntt_vs_schoolbook_agree() {
        let mut rng = test_rng();
        for &(d, q) in &[(64usize, 1_073_479_681u64), (128, 2_147_352_577)] {
            let psi = find_primitive_2d_root(q, d).expect("NTT-friendly");
            let a: Vec<u64> = (0..d).map(|_| rng.gen_range(0..q)).collect();
            let b: Vec<u64> = (0..d).map(|_| rng.gen_range(0..q)).collect();

            let schoolbook = SchoolbookBackend { q };
            let ntt = NttBackend::new(NegacyclicNtt::new(d, q, psi));

            assert_eq!(schoolbook.ring_mul(&a, &b), ntt.ring_mul(&a, &b), "d={d}");
            assert_eq!(ntt.modulus(), q);
        }
    }
}
