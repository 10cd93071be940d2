//! Protocol messages
//!
//! ```text
//! P → V   CommitmentMessage   (t0, t, w)
//! V → P   AbpChallenge        Ω               (bound proof only)
//! P → V   AbpResponse         z_abp           (bound proof only)
//! V → P   Masks               (α, γ)
//! P → V   RelationCommitment  (t_x, t_w, h, v, vp)
//! V → P   Challenge           c
//! P → V   MaskedOpening       z
//! ```
//!
//! Shapes are checked on receipt against the public parameters; byte
//! encodings are left to the transport.

use crate::error::ProofError;
use crate::lattice::matrix::{IntMatrix, Matrix};
use crate::lattice::challenge::Challenge;
use crate::lattice::ring::{Poly, RingContext};
use crate::lattice::vector::IntVec;

use super::settings::PublicParams;

/// Every poly must carry one residue vector of length d per level.
fn check_polys<'p>(
    ring: &RingContext,
    polys: impl IntoIterator<Item = &'p Poly>,
    what: &'static str,
) -> Result<(), ProofError> {
    let fits = |p: &Poly| p.levels() == ring.levels() && p.coeffs.iter().all(|l| l.len() == ring.degree());
    if polys.into_iter().all(fits) {
        Ok(())
    } else {
        Err(ProofError::MalformedMessage(what))
    }
}

/// Commitment to the witness splits and to the masks y_i.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentMessage {
    /// B0·r
    pub t0: Vec<Poly>,
    /// t_j = ⟨b_j, r⟩ + s_j for j < m, then t_m = ⟨b_m, r⟩ + g.
    pub t: Vec<Poly>,
    /// w_i = B0·y_i for i < k.
    pub w: Vec<Vec<Poly>>,
}

impl CommitmentMessage {
    pub fn check_shape(&self, params: &PublicParams) -> Result<(), ProofError> {
        let s = params.settings();
        if self.t0.len() != s.b0_rows {
            return Err(ProofError::MalformedMessage("t0 length differs from B0 rows"));
        }
        if self.t.len() != params.num_splits() + 1 {
            return Err(ProofError::MalformedMessage("t must hold one entry per split plus g"));
        }
        if self.w.len() != s.k || self.w.iter().any(|w| w.len() != s.b0_rows) {
            return Err(ProofError::MalformedMessage("w must be k vectors of B0 rows"));
        }
        let ring = params.ring();
        check_polys(ring, &self.t0, "t0 entries must be ring elements")?;
        check_polys(ring, &self.t, "t entries must be ring elements")?;
        check_polys(ring, self.w.iter().flatten(), "w entries must be ring elements")
    }
}

/// Verifier randomness folding the digit proof (α) and the linear
/// relation (γ).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Masks {
    /// α_{i,j} at index i·m_t + j, for round i < k and ternary split j < m_t.
    pub alpha: Vec<Poly>,
    /// k × |U| over Z_Q.
    pub gamma: IntMatrix,
}

impl Masks {
    pub fn check_shape(&self, params: &PublicParams, image_len: usize) -> Result<(), ProofError> {
        let k = params.settings().k;
        if self.alpha.len() != k * params.ternary_splits() {
            return Err(ProofError::MalformedMessage("alpha must have k·m_t entries"));
        }
        if self.gamma.rows() != k || self.gamma.cols() != image_len {
            return Err(ProofError::MalformedMessage("gamma must be k × |U|"));
        }
        check_polys(params.ring(), &self.alpha, "alpha entries must be ring elements")
    }
}

/// Commitments to the folded digit and linear-relation proofs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationCommitment {
    /// ⟨b_{m+1}, r⟩ + (c² coefficient of the cubic fold)
    pub t_x: Poly,
    /// ⟨b_{m+2}, r⟩ + (c coefficient of the cubic fold) + ⟨b_{m+1}, y_0⟩
    pub t_w: Poly,
    /// g + gMask; its first k coefficients are zero.
    pub h: Poly,
    pub v: Poly,
    pub vp: Poly,
}

impl RelationCommitment {
    pub fn check_shape(&self, params: &PublicParams) -> Result<(), ProofError> {
        check_polys(
            params.ring(),
            [&self.t_x, &self.t_w, &self.h, &self.v, &self.vp],
            "relation commitment entries must be ring elements",
        )
    }
}

/// z_i = y_i + σ^i(c)·r for i < k.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskedOpening {
    pub z: Vec<Vec<Poly>>,
}

impl MaskedOpening {
    pub fn check_shape(&self, params: &PublicParams) -> Result<(), ProofError> {
        let s = params.settings();
        if self.z.len() != s.k || self.z.iter().any(|z| z.len() != s.kappa) {
            return Err(ProofError::MalformedMessage("z must be k vectors of length kappa"));
        }
        check_polys(params.ring(), self.z.iter().flatten(), "z entries must be ring elements")
    }
}

/// The challenge must live in the ring of `params`.
pub fn check_challenge(challenge: &Challenge, params: &PublicParams) -> Result<(), ProofError> {
    let d = params.ring().degree();
    if challenge.n != d || challenge.sparse_coeffs.iter().any(|&(idx, _)| idx >= d) {
        return Err(ProofError::MalformedMessage("challenge support must lie below d"));
    }
    Ok(())
}

/// Ternary projection Ω (τ × |slice|) of the bound proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbpChallenge {
    pub omega: IntMatrix,
}

/// z_abp = Ω·s_slice + y_abp
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbpResponse {
    pub z: IntVec,
}
