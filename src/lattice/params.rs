//! Modulus chains for the RNS ring context
//!
//! The proof ring is R_Q = Z_Q[X]/(X^d + 1) with Q = q_0·…·q_L. Every q_i is a
//! prime with q_i ≡ 1 (mod 2d) so that each residue level admits a direct
//! negacyclic NTT. The presets below satisfy q_i ≡ 1 (mod 2^16), which covers
//! every degree up to 2^15.
//!
//! | Name | Moduli | log₂ Q |
//! |------|--------|--------|
//! | `TEST_CHAIN` | 1073479681, 2147352577 | ~61 |
//! | `WIDE_CHAIN` | 1072496641, 2146959361, 1099510054913 | ~101 |
//! | `SINGLE_50` | 1125899904679937 | ~50 |

use super::modular::pow_mod;

// ============================================================================
// Modulus Chain Structure
// ============================================================================

/// Named RNS modulus chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulusChain {
    pub moduli: &'static [u64],
    /// Human-readable name
    pub name: &'static str,
}

impl ModulusChain {
    /// Check that every level supports a direct negacyclic NTT of degree d.
    ///
    /// For R_q = Z_q[X]/(X^d + 1), direct NTT requires q ≡ 1 (mod 2d),
    /// which ensures primitive 2d-th roots of unity exist in Z_q.
    pub fn supports_degree(&self, d: usize) -> bool {
        self.moduli
            .iter()
            .all(|&q| find_primitive_2d_root(q, d).is_some())
    }

    /// log₂ of the product of all moduli.
    pub fn log_modulus(&self) -> f64 {
        self.moduli.iter().map(|&q| (q as f64).log2()).sum()
    }
}

/// Find a primitive 2d-th root of unity mod q.
///
/// Requires q ≡ 1 (mod 2d). Returns ψ such that ψ^{2d} = 1 and ψ^d = -1 (mod q).
pub fn find_primitive_2d_root(q: u64, d: usize) -> Option<u64> {
    let two_d = 2 * d as u64;
    if q < 3 || q % two_d != 1 {
        return None;
    }

    // ψ = g^{(q-1)/(2d)} has order exactly 2d iff ψ^d = -1
    let exp = (q - 1) / two_d;

    // Small candidates are enough for prime q; composite q fails fast
    (2..q.min(1 << 16))
        .map(|g| pow_mod(g, exp, q))
        .find(|&psi| pow_mod(psi, two_d, q) == 1 && pow_mod(psi, d as u64, q) == q - 1)
}

/// Miller-Rabin with the deterministic witness set for 64-bit integers.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for &a in &WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = super::modular::mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// ============================================================================
// Presets
// ============================================================================

/// Two ~30/31-bit primes. Default chain for tests.
pub const TEST_CHAIN: ModulusChain = ModulusChain {
    moduli: &[1_073_479_681, 2_147_352_577],
    name: "Test",
};

/// Three primes, Q ≈ 2^101.
pub const WIDE_CHAIN: ModulusChain = ModulusChain {
    moduli: &[1_072_496_641, 2_146_959_361, 1_099_510_054_913],
    name: "Wide",
};

/// A single 50-bit prime.
pub const SINGLE_50: ModulusChain = ModulusChain {
    moduli: &[1_125_899_904_679_937],
    name: "Single50",
};

/// All presets for benchmarking
pub const ALL_CHAINS: &[&ModulusChain] = &[&TEST_CHAIN, &WIDE_CHAIN, &SINGLE_50];

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_prime_and_ntt_friendly() {
        for chain in ALL_CHAINS {
            for &q in chain.moduli {
                assert!(is_prime(q), "{}: {q} should be prime", chain.name);
                assert_eq!(q % (1 << 16), 1, "{}: {q} should be 1 mod 2^16", chain.name);
            }
            assert!(chain.supports_degree(1024), "{}", chain.name);
        }
    }

    #[test]
    fn test_find_primitive_root() {
        assert_eq!(find_primitive_2d_root(8_380_417, 256).map(|p| pow_mod(p, 256, 8_380_417)), Some(8_380_416));
        // 4294967197 ≢ 1 (mod 2048)
        assert!(find_primitive_2d_root(4_294_967_197, 1024).is_none());

        let psi = find_primitive_2d_root(12289, 512).expect("Falcon prime");
        assert_eq!(pow_mod(psi, 1024, 12289), 1);
        assert_eq!(pow_mod(psi, 512, 12289), 12288);
    }

    #[test]
    fn test_is_prime() {
        assert!(is_prime(2));
        assert!(is_prime(12289));
        assert!(!is_prime(1));
        assert!(!is_prime(12289 * 17));
        assert!(!is_prime(65537 * 65537));
    }

    #[test]
    fn test_log_modulus() {
        assert!((TEST_CHAIN.log_modulus() - 61.0).abs() < 0.1);
    }
}
