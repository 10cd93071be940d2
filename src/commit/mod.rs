//! Lattice-based commitments
//!
//! [`AjtaiKey`] holds the public matrices (B0, b_0..b_{n-1}) over R_Q. The
//! proof protocol commits to the witness splits, the garbage polynomial g and
//! the two cubic-proof garbage terms under one shared randomness r:
//!
//! ```text
//! t0 = B0 · r,   t_j = ⟨b_j, r⟩ + m_j
//! ```
//!
//! # Security
//!
//! Binding relies on Module-SIS: finding short r₁ ≠ r₂ with B0·r₁ = B0·r₂
//! requires solving SIS in R_Q^{ρ × κ}.

pub mod ajtai;

pub use ajtai::{AjtaiCommitment, AjtaiKey};
