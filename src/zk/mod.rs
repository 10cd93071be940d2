//! ENS20 proof of knowledge for linear relations
//!
//! A prover convinces a verifier that it knows a witness S with digits in
//! {0, 1, 2} such that A·S = U, committing to S with an Ajtai commitment and
//! amplifying soundness with an automorphism σ of order k. An optional
//! approximate bound proof additionally bounds a slice of S.
//!
//! # Session
//!
//! ```text
//! Prover::commit_to_message      → Verifier::receive_message
//! [AbpVerifier::create_challenge → AbpProver::respond → update_protocol → resume_with]
//! Verifier::create_masks         → Prover::commit_to_relation
//! Verifier::create_challenge     → Prover::masked_opening
//! Verifier::verify
//! ```
//!
//! [`execute`] and [`execute_with_bound_proof`] drive this order and retry
//! sessions whose masked opening is refused.

pub mod abp;
pub mod execute;
mod fold;
pub mod messages;
pub mod prover;
pub mod settings;
pub mod verifier;

pub use abp::{abp_public_parameters, abp_threshold, AbpConfig, AbpProver, AbpVerifier};
pub use execute::{execute, execute_with_bound_proof};
pub use messages::{AbpChallenge, AbpResponse, CommitmentMessage, MaskedOpening, Masks, RelationCommitment};
pub use prover::Prover;
pub use settings::{generate_public_parameters, PublicParams, Settings};
pub use verifier::Verifier;
