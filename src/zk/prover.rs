//! Prover session
//!
//! One [`Prover`] runs one session and moves through
//! `Init → MessageCommitted → RelationCommitted → Opened`. Each step checks the
//! phase; a rejected masked opening ends the session and the caller starts a
//! new one.

use rand::Rng;
use tracing::{debug, warn};

use super::fold::{cubic_fold, fold_linear, linear_mask, project_linear};
use super::messages::{check_challenge, CommitmentMessage, Masks, MaskedOpening, RelationCommitment};
use super::settings::PublicParams;
use crate::error::ProofError;
use crate::lattice::challenge::Challenge;
use crate::lattice::ring::Poly;
use crate::relation::ImmutLinearRelation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    MessageCommitted,
    RelationCommitted,
    Opened,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::MessageCommitted => "message-committed",
            Phase::RelationCommitted => "relation-committed",
            Phase::Opened => "opened",
        }
    }
}

/// Secrets fixed by `commit_to_message`.
#[derive(Clone)]
struct Committed {
    /// s_j = InvNTT(ŝ_j)
    splits: Vec<Poly>,
    g: Poly,
    r: Vec<Poly>,
    /// y_i, i < k
    y: Vec<Vec<Poly>>,
}

pub struct Prover<'a> {
    params: &'a PublicParams,
    relation: ImmutLinearRelation,
    phase: Phase,
    committed: Option<Committed>,
}

impl<'a> Prover<'a> {
    pub fn new(params: &'a PublicParams, relation: ImmutLinearRelation) -> Result<Self, ProofError> {
        let got = relation.s().len().div_ceil(params.ring().degree());
        if got != params.num_splits() || relation.ring().degree() != params.ring().degree() {
            return Err(ProofError::WitnessShape {
                expected: params.num_splits(),
                got,
            });
        }
        Ok(Self {
            params,
            relation,
            phase: Phase::Init,
            committed: None,
        })
    }

    pub fn relation(&self) -> &ImmutLinearRelation {
        &self.relation
    }

    fn expect_phase(&self, phase: Phase, step: &'static str) -> Result<(), ProofError> {
        if self.phase != phase {
            return Err(ProofError::OutOfOrder {
                step,
                phase: self.phase.name(),
            });
        }
        Ok(())
    }

    fn committed(&self, step: &'static str) -> Result<&Committed, ProofError> {
        self.committed.as_ref().ok_or(ProofError::OutOfOrder {
            step,
            phase: self.phase.name(),
        })
    }

    /// Commit to the witness splits and sample the masks y_i.
    pub fn commit_to_message<R: Rng>(&mut self, rng: &mut R) -> Result<CommitmentMessage, ProofError> {
        self.expect_phase(Phase::Init, "commit_to_message")?;
        let ring = self.params.ring();
        let settings = self.params.settings();
        let key = self.params.key();
        let k = settings.k;

        let splits: Vec<Poly> = self.relation.s().polys().iter().map(|p| ring.inv_ntt(p)).collect();

        // g uniform with its first k coefficients zero
        let mut g = ring.sample_uniform(rng);
        for level in &mut g.coeffs {
            level[..k].iter_mut().for_each(|c| *c = 0);
        }

        let r: Vec<Poly> = (0..settings.kappa).map(|_| ring.sample_ternary(&mut *rng)).collect();
        let mut messages = splits.clone();
        messages.push(g.clone());
        let commitment = key.commit(&r, &messages)?;

        let y: Vec<Vec<Poly>> = (0..k)
            .map(|_| {
                (0..settings.kappa)
                    .map(|_| ring.sample_gaussian(&mut *rng, settings.sigma))
                    .collect()
            })
            .collect();
        let w = y.iter().map(|yi| key.commit_b0(yi)).collect::<Result<Vec<_>, _>>()?;

        debug!(splits = splits.len(), k, kappa = settings.kappa, "prover committed to message");
        self.committed = Some(Committed { splits, g, r, y });
        self.phase = Phase::MessageCommitted;
        Ok(CommitmentMessage {
            t0: commitment.t0,
            t: commitment.t,
            w,
        })
    }

    /// Continue on an augmented relation over the same witness (after the
    /// bound-proof exchange).
    pub fn resume_with(&mut self, relation: ImmutLinearRelation) -> Result<(), ProofError> {
        self.expect_phase(Phase::MessageCommitted, "resume_with")?;
        if relation.s() != self.relation.s() {
            return Err(ProofError::MalformedMessage(
                "augmented relation must keep the committed witness",
            ));
        }
        debug!(rows = relation.u().len(), "prover resumed on augmented relation");
        self.relation = relation;
        Ok(())
    }

    /// Fold the digit proof with α and the linear relation with γ.
    pub fn commit_to_relation(&mut self, masks: &Masks) -> Result<RelationCommitment, ProofError> {
        self.expect_phase(Phase::MessageCommitted, "commit_to_relation")?;
        masks.check_shape(self.params, self.relation.u().len())?;
        let ring = self.params.ring();
        let sigma = self.params.automorphism();
        let key = self.params.key();
        let m = self.params.num_splits();
        let state = self.committed("commit_to_relation")?;

        // ⟨b_j, y_i⟩ for every round and split
        let masked = state
            .y
            .iter()
            .map(|yi| (0..m).map(|j| key.inner(j, yi)).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        let cubic = cubic_fold(ring, sigma, &masks.alpha, &masked, &state.splits);
        let y0 = &state.y[0];
        let t_x = ring.add(&key.inner(m + 1, &state.r)?, &cubic.a2);
        let mut t_w = ring.add(&key.inner(m + 2, &state.r)?, &cubic.a1);
        ring.add_assign(&mut t_w, &key.inner(m + 1, y0)?);
        let v = ring.add(&cubic.a0, &key.inner(m + 2, y0)?);

        let projection = project_linear(ring, self.relation.statement(), &masks.gamma, m)?;
        let h = ring.add(&state.g, &linear_mask(ring, sigma, &projection, &state.splits));
        let mut vp = fold_linear(ring, sigma, &projection.psi, &masked);
        ring.add_assign(&mut vp, &key.inner(m, y0)?);

        debug!(rows = self.relation.u().len(), "prover committed to relation");
        self.phase = Phase::RelationCommitted;
        Ok(RelationCommitment { t_x, t_w, h, v, vp })
    }

    /// z_i = y_i + σ^i(c)·r, refused when some ‖z_i‖∞ reaches the bound.
    pub fn masked_opening(&mut self, challenge: &Challenge) -> Result<MaskedOpening, ProofError> {
        self.expect_phase(Phase::RelationCommitted, "masked_opening")?;
        check_challenge(challenge, self.params)?;
        let ring = self.params.ring();
        let sigma = self.params.automorphism();
        let bound = self.params.settings().bound;
        let state = self.committed("masked_opening")?;
        let c = challenge.to_poly(ring);

        let mut z = Vec::with_capacity(state.y.len());
        for (i, yi) in state.y.iter().enumerate() {
            let ci = sigma.permute(ring, &c, i as i64);
            let zi: Vec<Poly> = yi
                .iter()
                .zip(&state.r)
                .map(|(y, r)| ring.add(y, &ring.mul(&ci, r)))
                .collect();
            let norm = zi.iter().map(|p| ring.inf_norm(p)).max().unwrap_or(0);
            if norm >= bound {
                warn!(round = i, norm, bound, "masked opening rejected");
                self.phase = Phase::Opened;
                return Err(ProofError::BoundExceeded { round: i, norm, bound });
            }
            z.push(zi);
        }

        self.phase = Phase::Opened;
        Ok(MaskedOpening { z })
    }
}
