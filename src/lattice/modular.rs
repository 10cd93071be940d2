//! Modular arithmetic operations for Z_q
//!
//! Scalar primitives used by every modulus level of the ring context, plus a
//! Montgomery context used by the multiply-accumulate kernels behind
//! `mul_vec`.

/// Add two values modulo q
///
/// Assumes a, b < q. Returns (a + b) mod q.
#[inline(always)]
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let sum = a + b;
    if sum >= q {
        sum - q
    } else {
        sum
    }
}

/// Subtract two values modulo q
///
/// Assumes a, b < q. Returns (a - b) mod q.
#[inline(always)]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        q - b + a
    }
}

/// Multiply two values modulo q
///
/// Uses 128-bit intermediate to avoid overflow.
#[inline(always)]
pub fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

/// Negate a value modulo q
///
/// Returns -a mod q = q - a (or 0 if a == 0).
#[inline(always)]
pub fn neg_mod(a: u64, q: u64) -> u64 {
    if a == 0 {
        0
    } else {
        q - a
    }
}

/// Compute modular inverse using extended Euclidean algorithm
///
/// Returns a^{-1} mod q such that a * a^{-1} ≡ 1 (mod q).
/// The result is meaningless if gcd(a, q) ≠ 1.
pub fn mod_inv(a: u64, q: u64) -> u64 {
    let (mut old_r, mut r) = (a as i128, q as i128);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }

    debug_assert_eq!(old_r, 1, "gcd(a, q) must be 1 for inverse to exist");
    old_s.rem_euclid(q as i128) as u64
}

/// Compute base^exp mod modulus using binary exponentiation
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut result = 1u64;
    base %= modulus;
    while exp > 0 {
        if exp % 2 == 1 {
            result = mul_mod(result, base, modulus);
        }
        exp /= 2;
        base = mul_mod(base, base, modulus);
    }
    result
}

/// Reduce a signed value to [0, q)
#[inline(always)]
pub fn reduce_signed(a: i64, q: u64) -> u64 {
    (a as i128).rem_euclid(q as i128) as u64
}

/// Center a residue to (-q/2, q/2]
#[inline]
pub fn center(a: u64, q: u64) -> i64 {
    if a > q / 2 {
        -((q - a) as i64)
    } else {
        a as i64
    }
}

// ============================================================================
// Montgomery arithmetic
// ============================================================================

/// Montgomery context for an odd modulus q < 2^63 with R = 2^64.
///
/// `mul(a, b)` returns a·b·R^{-1} mod q. A dot product accumulates Montgomery
/// products and corrects the stray R^{-1} with a single final multiplication
/// by R² mod q, so the operands never need converting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Montgomery {
    pub q: u64,
    /// -q^{-1} mod 2^64
    q_inv_neg: u64,
    /// R² mod q
    r2: u64,
}

impl Montgomery {
    pub fn new(q: u64) -> Self {
        debug_assert!(q % 2 == 1 && q < (1 << 63), "Montgomery needs an odd q < 2^63");

        // Newton iteration doubles the number of correct low bits each step
        let mut inv = q;
        for _ in 0..6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(q.wrapping_mul(inv)));
        }
        let r = ((1u128 << 64) % q as u128) as u64;

        Self {
            q,
            q_inv_neg: inv.wrapping_neg(),
            r2: mul_mod(r, r, q),
        }
    }

    /// REDC: t·R^{-1} mod q for t < q·2^64
    #[inline(always)]
    pub fn reduce(&self, t: u128) -> u64 {
        let m = (t as u64).wrapping_mul(self.q_inv_neg);
        let u = ((t + m as u128 * self.q as u128) >> 64) as u64;
        if u >= self.q {
            u - self.q
        } else {
            u
        }
    }

    /// a·b·R^{-1} mod q
    #[inline(always)]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce(a as u128 * b as u128)
    }

    pub fn to_montgomery(&self, a: u64) -> u64 {
        self.mul(a, self.r2)
    }

    pub fn from_montgomery(&self, a: u64) -> u64 {
        self.reduce(a as u128)
    }

    /// Σ a_i·b_i mod q, processed in blocks of eight.
    pub fn dot(&self, a: &[u64], b: &[u64]) -> u64 {
        debug_assert_eq!(a.len(), b.len());
        let q = self.q as u128;

        let mut acc = 0u128;
        let (a_chunks, b_chunks) = (a.chunks_exact(8), b.chunks_exact(8));
        let (a_rest, b_rest) = (a_chunks.remainder(), b_chunks.remainder());

        for (x, y) in a_chunks.zip(b_chunks) {
            let block = self.mul(x[0], y[0]) as u128
                + self.mul(x[1], y[1]) as u128
                + self.mul(x[2], y[2]) as u128
                + self.mul(x[3], y[3]) as u128
                + self.mul(x[4], y[4]) as u128
                + self.mul(x[5], y[5]) as u128
                + self.mul(x[6], y[6]) as u128
                + self.mul(x[7], y[7]) as u128;
            acc = (acc + block) % q;
        }
        for (&x, &y) in a_rest.iter().zip(b_rest) {
            acc += self.mul(x, y) as u128;
        }

        self.mul((acc % q) as u64, self.r2)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_add_sub_mod() {
        let q = 17u64;
        assert_eq!(add_mod(10, 10, q), 3);
        assert_eq!(add_mod(16, 1, q), 0);
        assert_eq!(sub_mod(5, 10, q), 12);
        assert_eq!(sub_mod(0, 1, q), 16);
        assert_eq!(neg_mod(5, q), 12);
        assert_eq!(neg_mod(0, q), 0);
    }

    #[test]
    fn test_mod_inv() {
        let q = 17u64;
        for a in 1..q {
            assert_eq!(mul_mod(a, mod_inv(a, q), q), 1, "Failed for a={a}");
        }
    }

    #[test]
    fn test_pow_mod() {
        let q = 17u64;
        assert_eq!(pow_mod(3, 0, q), 1);
        assert_eq!(pow_mod(3, 4, q), 13);
        assert_eq!(pow_mod(3, 16, q), 1);
        assert_eq!(pow_mod(1753, 512, 8_380_417), 1);
    }

    #[test]
    fn test_reduce_and_center() {
        assert_eq!(reduce_signed(-5, 17), 12);
        assert_eq!(reduce_signed(-17, 17), 0);
        assert_eq!(center(12, 17), -5);
        assert_eq!(center(8, 17), 8);
        assert_eq!(center(9, 17), -8);
    }

    #[test]
    fn test_montgomery_mul() {
        let q = 1_073_479_681u64;
        let mont = Montgomery::new(q);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..1000 {
            let (a, b) = (rng.gen_range(0..q), rng.gen_range(0..q));
            let am = mont.to_montgomery(a);
            let bm = mont.to_montgomery(b);
            assert_eq!(mont.from_montgomery(mont.mul(am, bm)), mul_mod(a, b, q));
        }
    }

    #[test]
    fn test_montgomery_dot_matches_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for &q in &[12289u64, 2_147_352_577, 1_125_899_904_679_937] {
            let mont = Montgomery::new(q);
            for len in [0usize, 1, 7, 8, 9, 64, 131] {
                let a: Vec<u64> = (0..len).map(|_| rng.gen_range(0..q)).collect();
                let b: Vec<u64> = (0..len).map(|_| rng.gen_range(0..q)).collect();
                let expected = a
                    .iter()
                    .zip(&b)
                    .fold(0, |acc, (&x, &y)| add_mod(acc, mul_mod(x, y, q), q));
                assert_eq!(mont.dot(&a, &b), expected, "q={q}, len={len}");
            }
        }
    }
}
