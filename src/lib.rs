//! # lattice-zkp
//!
//! Lattice-based zero-knowledge proofs of knowledge for linear relations
//! A·S = U over Z_Q with short witnesses:
//!
//! - **Ring arithmetic**: R_Q = Z_Q[X]/(X^d + 1) in RNS form, NTT backends,
//!   automorphisms and traces
//! - **Algebraic containers**: vectors packed into ring elements, dense,
//!   identity and partitioned (block) matrices
//! - **Linear relations**: equations with independent and dependent terms,
//!   assembled into one partitioned system
//! - **Proofs**: the ENS20 protocol with automorphism amplification and an
//!   approximate bound proof
//!
//! ## Modules
//!
//! - [`lattice`]: ring context, vectors and matrices
//! - [`relation`]: equation builder and resolved relations
//! - [`commit`]: Ajtai commitments (SIS-based)
//! - [`zk`]: protocol settings, prover, verifier and session drivers
//! - [`persist`]: on-disk cache for public matrices

pub mod commit;
pub mod error;
pub mod lattice;
pub mod persist;
pub mod relation;
pub mod zk;

// Re-export commonly used types
pub use error::{LatticeError, PersistError, ProofError, RelationError};
pub use lattice::{IdentityMatrix, IntMatrix, IntVec, Matrix, PartitionedIntMatrix, RingContext};
pub use relation::{ImmutLinearRelation, LinearEquation, LinearRelationBuilder, LinearStatement};
pub use zk::{
    abp_public_parameters, execute, execute_with_bound_proof, generate_public_parameters, AbpConfig,
    PublicParams, Settings,
};
