//! Negacyclic NTT for one modulus level
//!
//! Maps Z_q[X]/(X^d + 1), d a power of two and q ≡ 1 (mod 2d), between
//! coefficients and evaluations at the d primitive 2d-th roots ψ^{2j+1}.
//!
//! The ψ twist is merged into the butterflies, so the forward transform
//! leaves slots in bit-reversed order and the inverse expects them there.
//! Nothing downstream depends on the slot order: products are slot-wise and
//! the slot sum of p is d·p_0 for any ordering.

use super::modular::{add_mod, mod_inv, mul_mod, pow_mod, sub_mod};

/// Twiddle tables for a single (d, q, ψ).
#[derive(Clone, Debug)]
pub struct NegacyclicNtt {
    pub d: usize,
    pub q: u64,
    /// ψ^{brv(i)} for i < d
    roots: Vec<u64>,
    /// ψ^{-brv(i)} for i < d
    inv_roots: Vec<u64>,
    /// d^{-1} mod q
    scale: u64,
}

impl NegacyclicNtt {
    /// `psi` must be a primitive 2d-th root of unity mod q.
    pub fn new(d: usize, q: u64, psi: u64) -> Self {
        debug_assert!(d.is_power_of_two());
        debug_assert_eq!(pow_mod(psi, d as u64, q), q - 1, "ψ^d must be -1");

        let bits = d.trailing_zeros();
        let table = |base: u64| -> Vec<u64> {
            let powers: Vec<u64> = std::iter::successors(Some(1u64), |&p| Some(mul_mod(p, base, q)))
                .take(d)
                .collect();
            (0..d).map(|i| powers[reverse_bits(i, bits)]).collect()
        };

        Self {
            d,
            q,
            roots: table(psi),
            inv_roots: table(mod_inv(psi, q)),
            scale: mod_inv(d as u64 % q, q),
        }
    }

    /// Coefficients to slots (bit-reversed), in place.
    pub fn forward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.d);
        let q = self.q;

        let mut groups = 1;
        let mut half = self.d / 2;
        while groups < self.d {
            for (i, block) in a.chunks_mut(2 * half).enumerate() {
                let w = self.roots[groups + i];
                let (lo, hi) = block.split_at_mut(half);
                for (x, y) in lo.iter_mut().zip(hi.iter_mut()) {
                    let t = mul_mod(*y, w, q);
                    (*x, *y) = (add_mod(*x, t, q), sub_mod(*x, t, q));
                }
            }
            groups *= 2;
            half /= 2;
        }
    }

    /// Slots (bit-reversed) to coefficients, in place.
    pub fn inverse(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.d);
        let q = self.q;

        let mut groups = self.d / 2;
        let mut half = 1;
        while groups >= 1 {
            for (i, block) in a.chunks_mut(2 * half).enumerate() {
                let w = self.inv_roots[groups + i];
                let (lo, hi) = block.split_at_mut(half);
                for (x, y) in lo.iter_mut().zip(hi.iter_mut()) {
                    let diff = sub_mod(*x, *y, q);
                    *x = add_mod(*x, *y, q);
                    *y = mul_mod(diff, w, q);
                }
            }
            groups /= 2;
            half *= 2;
        }

        for x in a.iter_mut() {
            *x = mul_mod(*x, self.scale, q);
        }
    }

    /// Slot-wise product.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        debug_assert_eq!((a.len(), b.len()), (self.d, self.d));
        a.iter().zip(b).map(|(&x, &y)| mul_mod(x, y, self.q)).collect()
    }

    /// Negacyclic product of two coefficient vectors.
    pub fn ring_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let (mut fa, mut fb) = (a.to_vec(), b.to_vec());
        self.forward(&mut fa);
        self.forward(&mut fb);
        let mut c = self.pointwise_mul(&fa, &fb);
        self.inverse(&mut c);
        c
    }
}

fn reverse_bits(i: usize, bits: u32) -> usize {
    if bits == 0 {
        0
    } else {
        i.reverse_bits() >> (usize::BITS - bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::{find_primitive_2d_root, TEST_CHAIN};
    use crate::lattice::ring_mul::mul_schoolbook;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn tables(d: usize, q: u64) -> NegacyclicNtt {
        let psi = find_primitive_2d_root(q, d).expect("NTT-friendly");
        NegacyclicNtt::new(d, q, psi)
    }

    fn random_coeffs(rng: &mut ChaCha8Rng, d: usize, q: u64) -> Vec<u64> {
        (0..d).map(|_| rng.gen_range(0..q)).collect()
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(1, 3), 4);
        assert_eq!(reverse_bits(6, 3), 3);
        assert_eq!(reverse_bits(0, 0), 0);
    }

    #[test]
    fn test_round_trip_on_chain_primes() {
        let mut rng = ChaCha8Rng::seed_from_u64(12345);
        for &q in TEST_CHAIN.moduli {
            for d in [2usize, 16, 256] {
                let ntt = tables(d, q);
                let a = random_coeffs(&mut rng, d, q);
                let mut b = a.clone();
                ntt.forward(&mut b);
                ntt.inverse(&mut b);
                assert_eq!(a, b, "q={q} d={d}");
            }
        }
    }

    #[test]
    fn test_product_matches_schoolbook() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for &q in TEST_CHAIN.moduli {
            let ntt = tables(128, q);
            let a = random_coeffs(&mut rng, 128, q);
            let b = random_coeffs(&mut rng, 128, q);
            assert_eq!(ntt.ring_mul(&a, &b), mul_schoolbook(&a, &b, q), "q={q}");
        }
    }

    #[test]
    fn test_constant_fills_every_slot() {
        let q = TEST_CHAIN.moduli[0];
        let ntt = tables(32, q);
        let mut a = vec![0u64; 32];
        a[0] = 5;
        ntt.forward(&mut a);
        assert!(a.iter().all(|&x| x == 5));
    }

    #[test]
    fn test_slot_sum_is_scaled_constant_term() {
        let (d, q) = (64, TEST_CHAIN.moduli[0]);
        let ntt = tables(d, q);
        let a = random_coeffs(&mut ChaCha8Rng::seed_from_u64(1), d, q);

        let mut slots = a.clone();
        ntt.forward(&mut slots);
        let sum = slots.iter().fold(0, |acc, &x| add_mod(acc, x, q));
        assert_eq!(sum, mul_mod(a[0], d as u64, q));
    }
}
