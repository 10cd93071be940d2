//! Ring arithmetic and algebraic containers
//!
//! Layering, bottom-up:
//!
//! - [`modular`], [`ntt`], [`ring_mul`], [`params`]: per-level arithmetic
//! - [`ring`]: the RNS ring context `RingContext` and its `Poly`
//! - [`vector`], [`matrix`], [`partitioned`]: `IntVec` and the `Matrix` flavours
//! - [`trace`], [`challenge`]: automorphisms, traces and sparse challenges

pub mod challenge;
pub mod matrix;
pub mod modular;
pub mod ntt;
pub mod params;
pub mod partitioned;
pub mod ring;
pub mod ring_mul;
pub mod trace;
pub mod vector;

pub use challenge::{sample_ternary_challenge, Challenge};
pub use matrix::{CachedIntMatrix, IdentityMatrix, IntMatrix, Matrix};
pub use params::{find_primitive_2d_root, ModulusChain, ALL_CHAINS, SINGLE_50, TEST_CHAIN, WIDE_CHAIN};
pub use partitioned::PartitionedIntMatrix;
pub use ring::{Poly, RingContext};
pub use ring_mul::{NttBackend, RingMulBackend, SchoolbookBackend};
pub use trace::{trace, trace_tower, Automorphism};
pub use vector::IntVec;
