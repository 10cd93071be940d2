//! Approximate bound proof
//!
//! Shows that a slice of the witness is short without proving every digit.
//! The prover extends the witness with a mask y (uniform in [−B/2, B/2])
//! before committing; the verifier then sends a ternary Ω and receives
//! z = Ω·s_slice + y. The row block Ω·s_slice + I·y = z joins the relation as
//! a dependent equation, so the main protocol also proves z was computed
//! honestly, and the verifier accepts only if ‖z‖∞ < B.
//!
//! Witness layout after [`AbpProver::prepare`]:
//!
//! ```text
//! | original S (n) | zero padding to a multiple of d | y (tau) |
//! ```
//!
//! The digit proof covers the splits of the original S only.

use std::ops::Range;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use super::messages::{AbpChallenge, AbpResponse};
use super::settings::{PublicParams, Settings};
use crate::error::ProofError;
use crate::lattice::matrix::{IdentityMatrix, IntMatrix, Matrix};
use crate::lattice::ring::RingContext;
use crate::lattice::vector::IntVec;
use crate::relation::{ImmutLinearRelation, LinearEquation, LinearStatement};

/// Which part of the witness is bounded and how many projections are used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbpConfig {
    pub slice: Range<usize>,
    /// Rows of Ω.
    pub tau: usize,
}

impl AbpConfig {
    pub fn new(slice: Range<usize>, tau: usize) -> Self {
        Self { slice, tau }
    }

    fn validate(&self, witness_len: usize) -> Result<(), ProofError> {
        if self.tau == 0 {
            return Err(ProofError::InvalidSettings("bound proof needs tau > 0"));
        }
        if self.slice.is_empty() || self.slice.end > witness_len {
            return Err(ProofError::InvalidSettings(
                "bound proof slice must be non-empty and inside the witness",
            ));
        }
        Ok(())
    }
}

/// B = √(Q / (2·|U|)) / 2
pub fn abp_threshold(ring: &RingContext, image_len: usize) -> u64 {
    ring.sqrt_modulus_over(2 * image_len as u64) / 2
}

/// Split counts of a witness of `witness_len` entries after the bound-proof
/// extension: (all splits, splits under the digit proof).
pub fn abp_split_counts(degree: usize, witness_len: usize, tau: usize) -> (usize, usize) {
    let ternary = witness_len.div_ceil(degree);
    (ternary + tau.div_ceil(degree), ternary)
}

/// Public parameters sized for `relation` once extended for `config`.
pub fn abp_public_parameters(
    relation: &ImmutLinearRelation,
    config: &AbpConfig,
    settings: Settings,
    seed: &[u8],
) -> Result<PublicParams, ProofError> {
    config.validate(relation.s().len())?;
    let (num_splits, ternary_splits) =
        abp_split_counts(relation.ring().degree(), relation.s().len(), config.tau);
    PublicParams::generate(relation.ring(), settings, num_splits, ternary_splits, seed)
}

/// Position of the mask block and the threshold, identical on both sides.
#[derive(Clone, Debug)]
struct Layout {
    y_block: usize,
    threshold: u64,
}

/// Zero padding that aligns the mask block to a split boundary.
fn extension(degree: usize, witness_len: usize) -> usize {
    witness_len.div_ceil(degree) * degree - witness_len
}

/// Ω·s_slice + I·y = z as a fully dependent equation over `statement`.
fn abp_equation(
    statement: &LinearStatement,
    config: &AbpConfig,
    y_block: usize,
    challenge: &AbpChallenge,
    response: &AbpResponse,
) -> Result<LinearEquation, ProofError> {
    let ring = statement.ring();
    let mut eqn = LinearEquation::new(response.z.clone());
    for (col, piece) in statement.split_over_blocks(&challenge.omega, config.slice.start)? {
        eqn.append_dependent_term(piece, col)?;
    }
    eqn.append_dependent_term(Arc::new(IdentityMatrix::new(ring, config.tau)), y_block)?;
    Ok(eqn)
}

fn check_challenge(config: &AbpConfig, challenge: &AbpChallenge) -> Result<(), ProofError> {
    if challenge.omega.rows() != config.tau || challenge.omega.cols() != config.slice.len() {
        return Err(ProofError::MalformedMessage("omega must be tau × |slice|"));
    }
    Ok(())
}

fn check_response(config: &AbpConfig, response: &AbpResponse) -> Result<(), ProofError> {
    if response.z.len() != config.tau {
        return Err(ProofError::MalformedMessage("bound-proof response must have tau entries"));
    }
    Ok(())
}

/// Prover half of the bound proof.
#[derive(Clone, Debug)]
pub struct AbpProver {
    config: AbpConfig,
    layout: Layout,
    s_slice: IntVec,
    y: IntVec,
}

impl AbpProver {
    /// Sample y and extend `relation` with the padding and mask blocks.
    ///
    /// The returned relation is the one to commit to.
    pub fn prepare<R: Rng>(
        relation: &ImmutLinearRelation,
        config: AbpConfig,
        rng: &mut R,
    ) -> Result<(Self, ImmutLinearRelation), ProofError> {
        config.validate(relation.s().len())?;
        let ring = Arc::clone(relation.ring());
        let threshold = abp_threshold(&ring, relation.u().len());
        let s_slice = relation.s().slice(config.slice.start, config.slice.end);

        let mut extended = relation.clone();
        let padding = extension(ring.degree(), relation.s().len());
        if padding > 0 {
            extended = extended.append_independent(IntVec::zeros(&ring, padding)).0;
        }
        let y = IntVec::random_bounded(&ring, config.tau, threshold / 2, rng);
        let (extended, y_block) = extended.append_independent(y.clone());

        debug!(
            slice = ?config.slice,
            tau = config.tau,
            threshold,
            padding,
            "prepared bound proof"
        );
        Ok((
            Self {
                config,
                layout: Layout { y_block, threshold },
                s_slice,
                y,
            },
            extended,
        ))
    }

    pub fn config(&self) -> &AbpConfig {
        &self.config
    }

    pub fn threshold(&self) -> u64 {
        self.layout.threshold
    }

    /// z = Ω·s_slice + y
    pub fn respond(&self, challenge: &AbpChallenge) -> Result<AbpResponse, ProofError> {
        check_challenge(&self.config, challenge)?;
        let projected = challenge.omega.mul_vec(&self.s_slice)?;
        Ok(AbpResponse {
            z: projected.add(&self.y),
        })
    }

    /// Append the bound-proof row block to the committed relation.
    pub fn update_protocol(
        &self,
        relation: &ImmutLinearRelation,
        challenge: &AbpChallenge,
        response: &AbpResponse,
    ) -> Result<ImmutLinearRelation, ProofError> {
        check_response(&self.config, response)?;
        let eqn = abp_equation(relation.statement(), &self.config, self.layout.y_block, challenge, response)?;
        Ok(relation.append_dependent(&eqn)?)
    }
}

/// Verifier half of the bound proof.
#[derive(Clone, Debug)]
pub struct AbpVerifier {
    config: AbpConfig,
    layout: Layout,
    challenge: Option<AbpChallenge>,
}

impl AbpVerifier {
    /// Mirror the prover's extension on the public statement.
    pub fn prepare(statement: &LinearStatement, config: AbpConfig) -> Result<(Self, LinearStatement), ProofError> {
        config.validate(statement.witness_len())?;
        let ring = statement.ring();
        let threshold = abp_threshold(ring, statement.u().len());

        let mut extended = statement.clone();
        let padding = extension(ring.degree(), statement.witness_len());
        if padding > 0 {
            extended = extended.append_columns(padding).0;
        }
        let (extended, y_block) = extended.append_columns(config.tau);

        Ok((
            Self {
                config,
                layout: Layout { y_block, threshold },
                challenge: None,
            },
            extended,
        ))
    }

    pub fn threshold(&self) -> u64 {
        self.layout.threshold
    }

    /// Ternary Ω of shape tau × |slice|.
    pub fn create_challenge<R: Rng>(&mut self, ring: &Arc<RingContext>, rng: &mut R) -> AbpChallenge {
        let omega = IntMatrix::random_bounded(ring, self.config.tau, self.config.slice.len(), 1, rng);
        let challenge = AbpChallenge { omega };
        self.challenge = Some(challenge.clone());
        challenge
    }

    /// ‖z‖∞ < B. A long response is `Ok(false)`.
    pub fn check_response(&self, response: &AbpResponse) -> Result<bool, ProofError> {
        check_response(&self.config, response)?;
        let norm = response.z.inf_norm();
        if norm >= self.layout.threshold {
            warn!(norm, threshold = self.layout.threshold, "bound proof response too long");
            return Ok(false);
        }
        Ok(true)
    }

    /// Append the bound-proof row block to the public statement.
    pub fn update_protocol(
        &self,
        statement: &LinearStatement,
        response: &AbpResponse,
    ) -> Result<LinearStatement, ProofError> {
        let challenge = self.challenge.as_ref().ok_or(ProofError::OutOfOrder {
            step: "update_protocol",
            phase: "no-bound-challenge",
        })?;
        check_response(&self.config, response)?;
        let eqn = abp_equation(statement, &self.config, self.layout.y_block, challenge, response)?;
        Ok(statement.append_dependent(&eqn)?)
    }
}
