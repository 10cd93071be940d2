//! Linear relations over Z_Q
//!
//! Equations are collected in a [`LinearRelationBuilder`], which numbers the
//! independent terms, checks every dependent reference and assembles one
//! [`ImmutLinearRelation`] A·S = U over a [`PartitionedIntMatrix`].
//!
//! [`PartitionedIntMatrix`]: crate::lattice::PartitionedIntMatrix

pub mod builder;
pub mod equation;
#[allow(clippy::module_inception)]
pub mod relation;

pub use builder::LinearRelationBuilder;
pub use equation::{LinearEquation, Term, TermBinding};
pub use relation::{ImmutLinearRelation, LinearStatement};
