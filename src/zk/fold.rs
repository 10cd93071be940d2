//! Folds shared by prover and verifier
//!
//! Witness splits live in the NTT domain: split j of S is the slot vector ŝ_j
//! and the committed message is s_j = InvNTT(ŝ_j). Ring products of the s_j
//! are slot-wise products of the ŝ_j, and the slot sum of any x equals
//! d·x_0. Two consequences drive the folds below:
//!
//! - the cubic s(s−1)(s−2) vanishes iff every slot of s is in {0, 1, 2}, and
//!   automorphisms only permute slots;
//! - ⟨U, γ_µ⟩ = ⟨Aᵀγ_µ, S⟩ = d·(Σ_j ψ_{µ,j}·s_j)_0 with ψ_{µ,j} the inverse NTT
//!   of split j of Aᵀγ_µ, so f_µ = Σ_j ψ_{µ,j}·s_j − d^{-1}⟨U, γ_µ⟩ has a
//!   zero constant coefficient for an honest witness.

use rayon::prelude::*;

use crate::error::ProofError;
use crate::lattice::matrix::{IntMatrix, Matrix};
use crate::lattice::ring::{Poly, RingContext};
use crate::lattice::trace::{normalized_trace, trace, Automorphism};
use crate::relation::LinearStatement;

/// ψ_{µ,j} and τ_µ = d^{-1}⟨U, γ_µ⟩ for every row µ of γ.
#[derive(Clone, Debug)]
pub(crate) struct LinearProjection {
    pub psi: Vec<Vec<Poly>>,
    pub tau: Vec<Poly>,
}

pub(crate) fn project_linear(
    ring: &RingContext,
    statement: &LinearStatement,
    gamma: &IntMatrix,
    num_splits: usize,
) -> Result<LinearProjection, ProofError> {
    if statement.witness_len().div_ceil(ring.degree()) != num_splits {
        return Err(ProofError::WitnessShape {
            expected: num_splits,
            got: statement.witness_len().div_ceil(ring.degree()),
        });
    }
    let at = statement.a().transposed();
    let d = ring.degree() as u64;

    let rows = gamma
        .row_vecs()
        .par_iter()
        .map(|g| -> Result<(Vec<Poly>, Poly), ProofError> {
            let projected = at.mul_vec(g)?;
            let psi = (0..num_splits).map(|j| ring.inv_ntt(&projected.poly(j))).collect();

            let mut tau = ring.zero();
            for (level, r) in tau.coeffs.iter_mut().zip(statement.u().dot(g)) {
                level[0] = r;
            }
            Ok((psi, ring.div_scalar(&tau, d)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (psi, tau) = rows.into_iter().unzip();
    Ok(LinearProjection { psi, tau })
}

/// Σ_j a_j·b_j
pub(crate) fn inner(ring: &RingContext, a: &[Poly], b: &[Poly]) -> Poly {
    a.iter().zip(b).fold(ring.zero(), |mut acc, (x, y)| {
        ring.mul_and_add(&mut acc, x, y);
        acc
    })
}

/// Σ_µ X^µ·k^{-1}·Σ_ν σ^ν(Σ_j ψ_{µ,j}·table[(k−ν) mod k][j])
pub(crate) fn fold_linear(
    ring: &RingContext,
    sigma: &Automorphism,
    psi: &[Vec<Poly>],
    table: &[Vec<Poly>],
) -> Poly {
    let k = sigma.order();
    psi.iter().enumerate().fold(ring.zero(), |mut acc, (mu, psi_mu)| {
        let traced = trace(ring, sigma, |nu| inner(ring, psi_mu, &table[(k - nu) % k]));
        let folded = ring.div_scalar(&traced, k as u64);
        ring.add_assign(&mut acc, &ring.mul_monomial(&folded, mu));
        acc
    })
}

/// gMask = Σ_µ X^µ·k^{-1}·Tr(Σ_j ψ_{µ,j}·s_j − τ_µ)
pub(crate) fn linear_mask(
    ring: &RingContext,
    sigma: &Automorphism,
    projection: &LinearProjection,
    splits: &[Poly],
) -> Poly {
    projection
        .psi
        .iter()
        .zip(&projection.tau)
        .enumerate()
        .fold(ring.zero(), |mut acc, (mu, (psi_mu, tau_mu))| {
            let f = ring.sub(&inner(ring, psi_mu, splits), tau_mu);
            ring.add_assign(&mut acc, &ring.mul_monomial(&normalized_trace(ring, sigma, &f), mu));
            acc
        })
}

/// tao = Σ_µ X^µ·τ_µ
pub(crate) fn tau_poly(ring: &RingContext, projection: &LinearProjection) -> Poly {
    projection.tau.iter().enumerate().fold(ring.zero(), |mut acc, (mu, t)| {
        ring.add_assign(&mut acc, &ring.mul_monomial(t, mu));
        acc
    })
}

/// Coefficients of E(c) = a0 + a1·c + a2·c² for an honest witness.
#[derive(Clone, Debug)]
pub(crate) struct CubicFold {
    pub a0: Poly,
    pub a1: Poly,
    pub a2: Poly,
}

/// With Y' = σ^{-i}(masked[i][j]) and u' = σ^{-i}(s_j):
///
/// ```text
/// a0 = Σ α_ij·Y'³
/// a1 = Σ α_ij·(−Y'²·(3u' − 3))
/// a2 = Σ α_ij·Y'·(3u'² − 6u' + 2)
/// ```
pub(crate) fn cubic_fold(
    ring: &RingContext,
    sigma: &Automorphism,
    alpha: &[Poly],
    masked: &[Vec<Poly>],
    splits: &[Poly],
) -> CubicFold {
    let m_t = alpha.len() / sigma.order().max(1);
    let mut fold = CubicFold {
        a0: ring.zero(),
        a1: ring.zero(),
        a2: ring.zero(),
    };
    for (i, row) in masked.iter().enumerate() {
        let back = -(i as i64);
        for (j, s_j) in splits.iter().take(m_t).enumerate() {
            let a = &alpha[i * m_t + j];
            let y = sigma.permute(ring, &row[j], back);
            let u = sigma.permute(ring, s_j, back);
            let y2 = ring.mul(&y, &y);
            let u2 = ring.mul(&u, &u);

            ring.mul_and_add(&mut fold.a0, a, &ring.mul(&y2, &y));

            let lin = ring.sub(&ring.scale(&u, 3), &ring.constant(3));
            ring.mul_and_add(&mut fold.a1, a, &ring.neg(&ring.mul(&y2, &lin)));

            let quad = ring.add(
                &ring.sub(&ring.scale(&u2, 3), &ring.scale(&u, 6)),
                &ring.constant(2),
            );
            ring.mul_and_add(&mut fold.a2, a, &ring.mul(&y, &quad));
        }
    }
    fold
}

/// E = Σ α_ij·σ^{-i}(f_ij·(f_ij + σ^i(c))·(f_ij + 2σ^i(c)))
pub(crate) fn cubic_eval(
    ring: &RingContext,
    sigma: &Automorphism,
    alpha: &[Poly],
    f: &[Vec<Poly>],
    c: &Poly,
) -> Poly {
    let m_t = alpha.len() / sigma.order().max(1);
    let mut e = ring.zero();
    for (i, row) in f.iter().enumerate() {
        let ci = sigma.permute(ring, c, i as i64);
        let ci2 = ring.scale(&ci, 2);
        for (j, fij) in row.iter().take(m_t).enumerate() {
            let product = ring.mul(&ring.mul(fij, &ring.add(fij, &ci)), &ring.add(fij, &ci2));
            ring.mul_and_add(&mut e, &alpha[i * m_t + j], &sigma.permute(ring, &product, -(i as i64)));
        }
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::TEST_CHAIN;
    use crate::lattice::vector::IntVec;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn setup() -> (Arc<RingContext>, Automorphism, ChaCha8Rng) {
        let ring = RingContext::from_chain(32, &TEST_CHAIN).expect("valid chain");
        let sigma = Automorphism::new(32, 4).expect("valid");
        (ring, sigma, ChaCha8Rng::seed_from_u64(3))
    }

    #[test]
    fn test_cubic_fold_matches_direct_evaluation() {
        let (ring, sigma, mut rng) = setup();
        let k = sigma.order();
        let m_t = 2;

        let splits: Vec<Poly> = (0..m_t)
            .map(|_| ring.inv_ntt(&IntVec::random_ternary(&ring, 32, &mut rng).poly(0)))
            .collect();
        let alpha: Vec<Poly> = (0..k * m_t).map(|_| ring.sample_uniform(&mut rng)).collect();
        let masked: Vec<Vec<Poly>> = (0..k)
            .map(|_| (0..m_t).map(|_| ring.sample_bounded(&mut rng, 100)).collect())
            .collect();
        let c = ring.sample_ternary(&mut rng);

        // f_ij = Y_ij − σ^i(c)·s_j
        let f: Vec<Vec<Poly>> = masked
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let ci = sigma.permute(&ring, &c, i as i64);
                row.iter().zip(&splits).map(|(y, s)| ring.sub(y, &ring.mul(&ci, s))).collect()
            })
            .collect();

        let fold = cubic_fold(&ring, &sigma, &alpha, &masked, &splits);
        let mut expected = fold.a0.clone();
        ring.mul_and_add(&mut expected, &fold.a1, &c);
        ring.mul_and_add(&mut expected, &fold.a2, &ring.mul(&c, &c));

        assert_eq!(cubic_eval(&ring, &sigma, &alpha, &f, &c), expected);
    }

    #[test]
    fn test_linear_mask_has_zero_prefix() {
        let (ring, sigma, mut rng) = setup();
        let s = IntVec::random_ternary(&ring, 50, &mut rng);
        let a = IntMatrix::random_uniform(&ring, 7, 50, &mut rng);
        let u = a.mul_vec(&s).expect("dims");

        let mut eqn = crate::relation::LinearEquation::new(u);
        eqn.append_term(Arc::new(a), s.clone()).expect("shape");
        let mut builder = crate::relation::LinearRelationBuilder::new();
        builder.append(eqn);
        let relation = builder.build(&ring).expect("valid");

        let gamma = IntMatrix::random_uniform(&ring, sigma.order(), 7, &mut rng);
        let projection = project_linear(&ring, relation.statement(), &gamma, 2).expect("shape");
        let splits: Vec<Poly> = s.polys().iter().map(|p| ring.inv_ntt(p)).collect();

        let mask = linear_mask(&ring, &sigma, &projection, &splits);
        for level in &mask.coeffs {
            assert!(level[..sigma.order()].iter().all(|&x| x == 0));
        }

        // The split count has to match the statement.
        assert!(matches!(
            project_linear(&ring, relation.statement(), &gamma, 3),
            Err(ProofError::WitnessShape { expected: 3, got: 2 })
        ));
    }
}
