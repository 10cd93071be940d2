//! Session drivers
//!
//! Run prover and verifier against each other in protocol order. A masked
//! opening refused by rejection sampling throws the whole session away and
//! starts a fresh one, at most `Settings::max_attempts` times.

use rand::Rng;
use tracing::{debug, info, warn};

use super::abp::{AbpConfig, AbpProver, AbpVerifier};
use super::prover::Prover;
use super::settings::PublicParams;
use super::verifier::Verifier;
use crate::error::ProofError;
use crate::relation::ImmutLinearRelation;

/// Prove and verify `relation` under `params`.
pub fn execute<R: Rng>(
    params: &PublicParams,
    relation: &ImmutLinearRelation,
    rng: &mut R,
) -> Result<bool, ProofError> {
    with_retries(params, rng, |rng| run_session(params, relation, None, rng))
}

/// [`execute`] with an approximate bound proof on `config.slice`.
///
/// `params` must be sized for the extended witness, see
/// [`abp_public_parameters`](super::abp::abp_public_parameters).
pub fn execute_with_bound_proof<R: Rng>(
    params: &PublicParams,
    relation: &ImmutLinearRelation,
    config: &AbpConfig,
    rng: &mut R,
) -> Result<bool, ProofError> {
    with_retries(params, rng, |rng| run_session(params, relation, Some(config), rng))
}

fn with_retries<R, F>(params: &PublicParams, rng: &mut R, mut session: F) -> Result<bool, ProofError>
where
    R: Rng,
    F: FnMut(&mut R) -> Result<bool, ProofError>,
{
    let attempts = params.settings().max_attempts;
    for attempt in 1..=attempts {
        match session(rng) {
            Err(e) if e.is_retryable() => {
                warn!(attempt, attempts, error = %e, "session restarted");
            }
            Ok(accepted) => {
                info!(attempt, accepted, "session finished");
                return Ok(accepted);
            }
            Err(e) => return Err(e),
        }
    }
    Err(ProofError::BoundNotAchieved { attempts })
}

fn run_session<R: Rng>(
    params: &PublicParams,
    relation: &ImmutLinearRelation,
    bound_proof: Option<&AbpConfig>,
    rng: &mut R,
) -> Result<bool, ProofError> {
    let (mut prover, mut verifier, mut abp) = match bound_proof {
        None => (
            Prover::new(params, relation.clone())?,
            Verifier::new(params, relation.statement().clone())?,
            None,
        ),
        Some(config) => {
            let (abp_prover, extended) = AbpProver::prepare(relation, config.clone(), rng)?;
            let (abp_verifier, statement) = AbpVerifier::prepare(relation.statement(), config.clone())?;
            (
                Prover::new(params, extended)?,
                Verifier::new(params, statement)?,
                Some((abp_prover, abp_verifier)),
            )
        }
    };
    debug!(
        witness = relation.s().len(),
        rows = relation.u().len(),
        bound_proof = abp.is_some(),
        "session started"
    );

    let message = prover.commit_to_message(rng)?;
    verifier.receive_message(message)?;

    if let Some((abp_prover, abp_verifier)) = abp.as_mut() {
        let challenge = abp_verifier.create_challenge(params.ring(), rng);
        let response = abp_prover.respond(&challenge)?;
        if !abp_verifier.check_response(&response)? {
            return Ok(false);
        }
        let extended = abp_prover.update_protocol(prover.relation(), &challenge, &response)?;
        prover.resume_with(extended)?;
        let statement = abp_verifier.update_protocol(verifier.statement(), &response)?;
        verifier.resume_with(statement)?;
    }

    let masks = verifier.create_masks(rng)?;
    let commitment = prover.commit_to_relation(&masks)?;
    let challenge = verifier.create_challenge(commitment, rng)?;
    let opening = prover.masked_opening(&challenge)?;
    verifier.verify(&opening)
}
