//! Accumulates equations and resolves them into one block system

use std::sync::Arc;

use tracing::debug;

use super::equation::{LinearEquation, TermBinding};
use super::relation::ImmutLinearRelation;
use crate::error::RelationError;
use crate::lattice::partitioned::PartitionedIntMatrix;
use crate::lattice::ring::RingContext;
use crate::lattice::vector::IntVec;

/// Equations in append order; `build_fast` turns them into a relation
/// A·S = U with one block row per equation and one block column per
/// independent term.
#[derive(Clone, Debug, Default)]
pub struct LinearRelationBuilder {
    equations: Vec<LinearEquation>,
}

impl LinearRelationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, eqn: LinearEquation) -> &mut Self {
        self.equations.push(eqn);
        self
    }

    pub fn equations(&self) -> &[LinearEquation] {
        &self.equations
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// Resolve without checking A·S = U.
    ///
    /// Independent terms are numbered in append order across all equations.
    /// A dependent term must name the block of an independent term of a
    /// strictly earlier equation.
    pub fn build_fast(&self, ring: &Arc<RingContext>) -> Result<ImmutLinearRelation, RelationError> {
        // Phase 1: owner[block] = equation that introduced it.
        let mut owner = Vec::new();
        let mut col_sizes = Vec::new();
        for (e, eqn) in self.equations.iter().enumerate() {
            for term in eqn.terms() {
                if let TermBinding::Independent(b) = term.binding() {
                    owner.push(e);
                    col_sizes.push(b.len());
                }
            }
        }

        // Phase 2
        for (e, eqn) in self.equations.iter().enumerate() {
            for (t, term) in eqn.terms().iter().enumerate() {
                if let TermBinding::Dependent(index) = *term.binding() {
                    match owner.get(index) {
                        Some(&o) if o < e => {}
                        _ => {
                            return Err(RelationError::UnresolvedDependency {
                                equation: e,
                                term: t,
                                index,
                            })
                        }
                    }
                }
            }
        }

        let row_sizes = self.equations.iter().map(LinearEquation::rows).collect();
        let mut a = PartitionedIntMatrix::with_sizes(ring, row_sizes, col_sizes);
        let mut s = IntVec::zeros(ring, 0);
        let mut next = 0;
        for (e, eqn) in self.equations.iter().enumerate() {
            for term in eqn.terms() {
                let col = match term.binding() {
                    TermBinding::Independent(b) => {
                        s.append(b);
                        next += 1;
                        next - 1
                    }
                    TermBinding::Dependent(index) => *index,
                };
                a.emplace(e, col, Arc::clone(term.matrix()))?;
            }
        }
        let u = IntVec::concat(ring, self.equations.iter().map(LinearEquation::lhs));

        debug!(
            equations = self.equations.len(),
            column_blocks = next,
            rows = u.len(),
            cols = s.len(),
            "resolved linear relation"
        );
        Ok(ImmutLinearRelation::from_parts(a, s, u))
    }

    /// `build_fast` followed by the A·S = U self-check.
    pub fn build(&self, ring: &Arc<RingContext>) -> Result<ImmutLinearRelation, RelationError> {
        let relation = self.build_fast(ring)?;
        if !relation.is_valid() {
            return Err(RelationError::InvalidRelation);
        }
        Ok(relation)
    }
}
