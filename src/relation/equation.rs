//! Linear equations lhs = Σ A_i·b_i
//!
//! A [`Term`] either owns its vector b_i (independent) or names a column
//! block of the global system (dependent). Dependent indices are the
//! append-order numbering of independent terms across the whole builder, so
//! they only become meaningful when the builder resolves.

use std::sync::Arc;

use crate::error::RelationError;
use crate::lattice::matrix::{IdentityMatrix, Matrix};
use crate::lattice::ring::RingContext;
use crate::lattice::vector::IntVec;

/// What a term multiplies its matrix with.
#[derive(Clone, Debug)]
pub enum TermBinding {
    /// The term owns its vector; it becomes a new column block.
    Independent(IntVec),
    /// The term binds to an existing column block of the global system.
    Dependent(usize),
}

/// One summand A_i·b_i.
#[derive(Clone, Debug)]
pub struct Term {
    matrix: Arc<dyn Matrix>,
    binding: TermBinding,
}

impl Term {
    pub fn matrix(&self) -> &Arc<dyn Matrix> {
        &self.matrix
    }

    pub fn binding(&self) -> &TermBinding {
        &self.binding
    }

    pub fn is_dependent(&self) -> bool {
        matches!(self.binding, TermBinding::Dependent(_))
    }
}

/// lhs (size m) = Σ A_i·b_i with every A_i of height m.
#[derive(Clone, Debug)]
pub struct LinearEquation {
    lhs: IntVec,
    terms: Vec<Term>,
}

impl LinearEquation {
    pub fn new(lhs: IntVec) -> Self {
        Self {
            lhs,
            terms: Vec::new(),
        }
    }

    /// Equation with a zero left-hand side of size m.
    pub fn zero_lhs(ring: &Arc<RingContext>, m: usize) -> Self {
        Self::new(IntVec::zeros(ring, m))
    }

    pub fn rows(&self) -> usize {
        self.lhs.len()
    }

    pub fn lhs(&self) -> &IntVec {
        &self.lhs
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Any term refers to an external column block.
    pub fn is_dependent(&self) -> bool {
        self.terms.iter().any(Term::is_dependent)
    }

    fn check_rows(&self, matrix: &dyn Matrix) -> Result<(), RelationError> {
        if matrix.rows() != self.rows() {
            return Err(RelationError::TermRows {
                expected: self.rows(),
                got: matrix.rows(),
            });
        }
        Ok(())
    }

    /// Append the independent term A·b.
    pub fn append_term(&mut self, matrix: Arc<dyn Matrix>, b: IntVec) -> Result<&mut Self, RelationError> {
        self.check_rows(matrix.as_ref())?;
        if b.len() != matrix.cols() {
            return Err(RelationError::TermCols {
                expected: matrix.cols(),
                got: b.len(),
            });
        }
        self.terms.push(Term {
            matrix,
            binding: TermBinding::Independent(b),
        });
        Ok(self)
    }

    /// Append I·b.
    pub fn append_vec_term(&mut self, b: IntVec) -> Result<&mut Self, RelationError> {
        let identity = IdentityMatrix::new(b.ring(), b.len());
        self.append_term(Arc::new(identity), b)
    }

    /// Append A·S_index where S_index is column block `index` of the system.
    pub fn append_dependent_term(&mut self, matrix: Arc<dyn Matrix>, index: usize) -> Result<&mut Self, RelationError> {
        self.check_rows(matrix.as_ref())?;
        self.terms.push(Term {
            matrix,
            binding: TermBinding::Dependent(index),
        });
        Ok(self)
    }

    /// Turn term `term_idx` into a dependent term bound to column block
    /// `index`, discarding its local vector.
    pub fn add_dependency(&mut self, term_idx: usize, index: usize) -> Result<&mut Self, RelationError> {
        let len = self.terms.len();
        let term = self
            .terms
            .get_mut(term_idx)
            .ok_or(RelationError::NoSuchTerm { index: term_idx, len })?;
        term.binding = TermBinding::Dependent(index);
        Ok(self)
    }

    /// lhs = Σ A_i·b_i over the (independent) terms.
    pub fn update_lhs(&mut self) -> Result<(), RelationError> {
        let mut lhs = IntVec::zeros(self.lhs.ring(), self.rows());
        for term in &self.terms {
            match &term.binding {
                TermBinding::Independent(b) => lhs.add_assign(&term.matrix.mul_vec(b)?),
                TermBinding::Dependent(_) => return Err(RelationError::DependentLhs),
            }
        }
        self.lhs = lhs;
        Ok(())
    }
}
