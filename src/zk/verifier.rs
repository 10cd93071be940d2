//! Verifier session
//!
//! The verifier holds only the public [`LinearStatement`]. It samples the
//! masks and the challenge and runs the four checks of `verify`:
//!
//! 1. every z_i is short and B0·z_i = w_i + σ^i(c)·t0;
//! 2. h has its first k coefficients zero;
//! 3. the cubic digit fold reconstructed from z equals v;
//! 4. the linear fold reconstructed from z, ψ and (h, tao) equals vp.

use rand::Rng;
use tracing::{debug, info, warn};

use super::fold::{cubic_eval, fold_linear, project_linear, tau_poly};
use super::messages::{CommitmentMessage, Masks, MaskedOpening, RelationCommitment};
use super::settings::PublicParams;
use crate::error::ProofError;
use crate::lattice::challenge::{sample_ternary_challenge, Challenge};
use crate::lattice::matrix::IntMatrix;
use crate::lattice::ring::Poly;
use crate::relation::LinearStatement;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    AwaitingMessage,
    MessageReceived,
    MasksSent,
    ChallengeSent,
    Done,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::AwaitingMessage => "awaiting-message",
            Phase::MessageReceived => "message-received",
            Phase::MasksSent => "masks-sent",
            Phase::ChallengeSent => "challenge-sent",
            Phase::Done => "done",
        }
    }
}

pub struct Verifier<'a> {
    params: &'a PublicParams,
    statement: LinearStatement,
    phase: Phase,
    message: Option<CommitmentMessage>,
    masks: Option<Masks>,
    commitment: Option<RelationCommitment>,
    challenge: Option<Challenge>,
}

impl<'a> Verifier<'a> {
    pub fn new(params: &'a PublicParams, statement: LinearStatement) -> Result<Self, ProofError> {
        let got = statement.witness_len().div_ceil(params.ring().degree());
        if got != params.num_splits() {
            return Err(ProofError::WitnessShape {
                expected: params.num_splits(),
                got,
            });
        }
        Ok(Self {
            params,
            statement,
            phase: Phase::AwaitingMessage,
            message: None,
            masks: None,
            commitment: None,
            challenge: None,
        })
    }

    pub fn statement(&self) -> &LinearStatement {
        &self.statement
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

    fn out_of_order(&self, step: &'static str) -> ProofError {
        ProofError::OutOfOrder {
            step,
            phase: self.phase.name(),
        }
    }

    pub fn receive_message(&mut self, message: CommitmentMessage) -> Result<(), ProofError> {
        self.expect_phase(Phase::AwaitingMessage, "receive_message")?;
        message.check_shape(self.params)?;
        self.message = Some(message);
        self.phase = Phase::MessageReceived;
        Ok(())
    }

    /// Continue on a statement augmented by the bound-proof exchange.
    pub fn resume_with(&mut self, statement: LinearStatement) -> Result<(), ProofError> {
        self.expect_phase(Phase::MessageReceived, "resume_with")?;
        if statement.witness_len() != self.statement.witness_len() {
            return Err(ProofError::MalformedMessage(
                "augmented statement must keep the committed witness length",
            ));
        }
        debug!(rows = statement.u().len(), "verifier resumed on augmented statement");
        self.statement = statement;
        Ok(())
    }

    /// α uniform over R_Q^{k·m_t}, γ uniform over Z_Q^{k×|U|}.
    pub fn create_masks<R: Rng>(&mut self, rng: &mut R) -> Result<Masks, ProofError> {
        self.expect_phase(Phase::MessageReceived, "create_masks")?;
        let ring = self.params.ring();
        let k = self.params.settings().k;

        let alpha = (0..k * self.params.ternary_splits())
            .map(|_| ring.sample_uniform(&mut *rng))
            .collect();
        let gamma = IntMatrix::random_uniform(ring, k, self.statement.u().len(), rng);
        let masks = Masks { alpha, gamma };

        self.masks = Some(masks.clone());
        self.phase = Phase::MasksSent;
        Ok(masks)
    }

    /// Store the relation commitment and answer with a sparse challenge.
    pub fn create_challenge<R: Rng>(
        &mut self,
        commitment: RelationCommitment,
        rng: &mut R,
    ) -> Result<Challenge, ProofError> {
        self.expect_phase(Phase::MasksSent, "create_challenge")?;
        commitment.check_shape(self.params)?;
        let challenge = sample_ternary_challenge(rng, self.params.ring().degree(), self.params.settings().omega);
        self.commitment = Some(commitment);
        self.challenge = Some(challenge.clone());
        self.phase = Phase::ChallengeSent;
        Ok(challenge)
    }

    /// Run all four checks. A failed check is `Ok(false)`.
    pub fn verify(&mut self, opening: &MaskedOpening) -> Result<bool, ProofError> {
        self.expect_phase(Phase::ChallengeSent, "verify")?;
        opening.check_shape(self.params)?;
        self.phase = Phase::Done;

        let (message, masks, commitment, challenge) =
            match (&self.message, &self.masks, &self.commitment, &self.challenge) {
                (Some(m), Some(a), Some(c), Some(ch)) => (m, a, c, ch),
                _ => return Err(self.out_of_order("verify")),
            };

        let ring = self.params.ring();
        let sigma = self.params.automorphism();
        let key = self.params.key();
        let settings = self.params.settings();
        let m = self.params.num_splits();
        let k = settings.k;
        let c = challenge.to_poly(ring);
        let rotated: Vec<Poly> = (0..k).map(|i| sigma.permute(ring, &c, i as i64)).collect();

        // 1. B0·z_i = w_i + σ^i(c)·t0 with short z_i
        for (i, zi) in opening.z.iter().enumerate() {
            let norm = zi.iter().map(|p| ring.inf_norm(p)).max().unwrap_or(0);
            if norm >= settings.bound {
                warn!(round = i, norm, bound = settings.bound, "opening norm check failed");
                return Ok(false);
            }
            let lhs = key.commit_b0(zi)?;
            let consistent = lhs
                .iter()
                .zip(&message.w[i])
                .zip(&message.t0)
                .all(|((l, w), t)| *l == ring.add(w, &ring.mul(&rotated[i], t)));
            if !consistent {
                warn!(round = i, "opening consistency check failed");
                return Ok(false);
            }
        }

        // 2. zero prefix of h
        if commitment.h.coeffs.iter().any(|level| level[..k].iter().any(|&x| x != 0)) {
            warn!("h zero-coefficient check failed");
            return Ok(false);
        }

        // f_ij = ⟨b_j, z_i⟩ − σ^i(c)·t_j
        let f = opening
            .z
            .iter()
            .zip(&rotated)
            .map(|(zi, ci)| {
                (0..m)
                    .map(|j| Ok(ring.sub(&key.inner(j, zi)?, &ring.mul(ci, &message.t[j]))))
                    .collect::<Result<Vec<_>, ProofError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let z0 = &opening.z[0];

        // 3. E + c·(⟨b_{m+1}, z_0⟩ − c·t_x) + (⟨b_{m+2}, z_0⟩ − c·t_w) = v
        let mut v_test = cubic_eval(ring, sigma, &masks.alpha, &f, &c);
        let x = ring.sub(&key.inner(m + 1, z0)?, &ring.mul(&c, &commitment.t_x));
        ring.mul_and_add(&mut v_test, &c, &x);
        ring.add_assign(&mut v_test, &key.inner(m + 2, z0)?);
        ring.sub_assign(&mut v_test, &ring.mul(&c, &commitment.t_w));
        if v_test != commitment.v {
            warn!("cubic relation check failed");
            return Ok(false);
        }

        // 4. linear fold + ⟨b_m, z_0⟩ − c·t_m + c·(h + tao) = vp
        let projection = project_linear(ring, &self.statement, &masks.gamma, m)?;
        let mut vp_test = fold_linear(ring, sigma, &projection.psi, &f);
        ring.add_assign(&mut vp_test, &key.inner(m, z0)?);
        ring.sub_assign(&mut vp_test, &ring.mul(&c, &message.t[m]));
        let shifted = ring.add(&commitment.h, &tau_poly(ring, &projection));
        ring.mul_and_add(&mut vp_test, &c, &shifted);
        if vp_test != commitment.vp {
            warn!("linear relation check failed");
            return Ok(false);
        }

        info!(rows = self.statement.u().len(), splits = m, "proof accepted");
        Ok(true)
    }
}
