//! Resolved linear relations A·S = U
//!
//! An [`ImmutLinearRelation`] is never mutated in place: every extension
//! returns a new relation. Column blocks of A correspond one-to-one to the
//! independent vectors concatenated in S; row blocks correspond to equations.
//!
//! The verifier only ever holds the public [`LinearStatement`] (A, U). It can
//! follow extensions that introduce no new witness blocks.

use std::sync::Arc;

use tracing::debug;

use super::equation::{LinearEquation, TermBinding};
use crate::error::RelationError;
use crate::lattice::matrix::{IdentityMatrix, IntMatrix, Matrix};
use crate::lattice::modular::{pow_mod, reduce_signed};
use crate::lattice::partitioned::PartitionedIntMatrix;
use crate::lattice::ring::RingContext;
use crate::lattice::vector::IntVec;

/// The public half of a relation: A and U = A·S.
#[derive(Clone, Debug)]
pub struct LinearStatement {
    a: PartitionedIntMatrix,
    u: IntVec,
}

impl LinearStatement {
    pub fn ring(&self) -> &Arc<RingContext> {
        self.a.ring()
    }

    pub fn a(&self) -> &PartitionedIntMatrix {
        &self.a
    }

    pub fn u(&self) -> &IntVec {
        &self.u
    }

    pub fn column_block_sizes(&self) -> &[usize] {
        self.a.col_block_sizes()
    }

    /// Length of the witness the statement is about.
    pub fn witness_len(&self) -> usize {
        self.a.cols()
    }

    /// Add an unused column block of the given width.
    pub fn append_columns(&self, width: usize) -> (Self, usize) {
        let mut a = self.a.clone();
        let index = a.push_col_block(width);
        (
            Self {
                a,
                u: self.u.clone(),
            },
            index,
        )
    }

    /// Append a fully dependent equation as a new block row.
    pub fn append_dependent(&self, eqn: &LinearEquation) -> Result<Self, RelationError> {
        let mut next = self.clone();
        push_equation(&mut next, eqn, None)?;
        Ok(next)
    }

    /// Cut `matrix`, which acts on S[start..start + matrix.cols()), into one
    /// zero-padded piece per overlapping column block.
    ///
    /// Returns (column block, piece) pairs ready for
    /// [`LinearEquation::append_dependent_term`].
    pub fn split_over_blocks(
        &self,
        matrix: &IntMatrix,
        start: usize,
    ) -> Result<Vec<(usize, Arc<dyn Matrix>)>, RelationError> {
        let end = start + matrix.cols();
        if end > self.witness_len() {
            return Err(RelationError::PrefixTooLong {
                prefix: end,
                size: self.witness_len(),
            });
        }

        let ring = self.ring();
        let mut pieces = Vec::new();
        for (c, (&offset, &width)) in self
            .a
            .col_offsets()
            .iter()
            .zip(self.a.col_block_sizes())
            .enumerate()
        {
            let lo = offset.max(start);
            let hi = (offset + width).min(end);
            if lo >= hi {
                continue;
            }
            let mut piece = IntMatrix::zeros(ring, matrix.rows(), width);
            for i in 0..matrix.rows() {
                for col in lo..hi {
                    piece.set(i, col - offset, &matrix.get(i, col - start));
                }
            }
            pieces.push((c, Arc::new(piece) as Arc<dyn Matrix>));
        }
        Ok(pieces)
    }

    fn rebased(&self, ring: &Arc<RingContext>) -> Result<Self, RelationError> {
        Ok(Self {
            a: self.a.rebased_partitioned(ring)?,
            u: self.u.rebase_lossless(ring)?,
        })
    }
}

/// New block row for `eqn`. Independent terms need a witness to extend.
fn push_equation(
    statement: &mut LinearStatement,
    eqn: &LinearEquation,
    mut witness: Option<&mut IntVec>,
) -> Result<(), RelationError> {
    let existing = statement.a.num_col_blocks();
    let row = statement.a.push_row_block(eqn.rows());

    for (t, term) in eqn.terms().iter().enumerate() {
        let col = match term.binding() {
            TermBinding::Dependent(index) if *index < existing => *index,
            TermBinding::Dependent(index) => {
                return Err(RelationError::UnresolvedDependency {
                    equation: row,
                    term: t,
                    index: *index,
                })
            }
            TermBinding::Independent(b) => match witness.as_deref_mut() {
                Some(s) => {
                    s.append(b);
                    statement.a.push_col_block(b.len())
                }
                None => return Err(RelationError::WitnessRequired { term: t }),
            },
        };
        statement.a.emplace(row, col, Arc::clone(term.matrix()))?;
    }
    statement.u.append(eqn.lhs());
    Ok(())
}

/// A statement together with its witness S.
#[derive(Clone, Debug)]
pub struct ImmutLinearRelation {
    statement: LinearStatement,
    s: IntVec,
}

impl ImmutLinearRelation {
    pub(crate) fn from_parts(a: PartitionedIntMatrix, s: IntVec, u: IntVec) -> Self {
        Self {
            statement: LinearStatement { a, u },
            s,
        }
    }

    pub fn ring(&self) -> &Arc<RingContext> {
        self.statement.ring()
    }

    pub fn statement(&self) -> &LinearStatement {
        &self.statement
    }

    pub fn a(&self) -> &PartitionedIntMatrix {
        &self.statement.a
    }

    /// Witness S.
    pub fn s(&self) -> &IntVec {
        &self.s
    }

    /// Image U = A·S.
    pub fn u(&self) -> &IntVec {
        &self.statement.u
    }

    pub fn column_block_sizes(&self) -> &[usize] {
        self.statement.column_block_sizes()
    }

    /// A·S == U
    pub fn is_valid(&self) -> bool {
        match self.a().mul_vec(&self.s) {
            Ok(image) => image == *self.u(),
            Err(_) => false,
        }
    }

    /// The same relation over a ring of smaller degree; see
    /// [`IntVec::rebase_lossless`].
    pub fn rebased(&self, ring: &Arc<RingContext>) -> Result<Self, RelationError> {
        Ok(Self {
            statement: self.statement.rebased(ring)?,
            s: self.s.rebase_lossless(ring)?,
        })
    }

    /// Append `v` to S as a new column block that no equation uses yet.
    /// Returns the relation and the index of the new block.
    pub fn append_independent(&self, v: IntVec) -> (Self, usize) {
        let (statement, index) = self.statement.append_columns(v.len());
        let mut s = self.s.clone();
        s.append(&v);
        (Self { statement, s }, index)
    }

    /// Append `eqn` as a new block row. Dependent terms bind to existing
    /// column blocks; independent terms become new column blocks.
    pub fn append_dependent(&self, eqn: &LinearEquation) -> Result<Self, RelationError> {
        let mut next = self.clone();
        push_equation(&mut next.statement, eqn, Some(&mut next.s))?;
        Ok(next)
    }

    /// See [`LinearStatement::split_over_blocks`].
    pub fn split_over_blocks(
        &self,
        matrix: &IntMatrix,
        start: usize,
    ) -> Result<Vec<(usize, Arc<dyn Matrix>)>, RelationError> {
        self.statement.split_over_blocks(matrix, start)
    }

    /// Treat S[0..prefix) as the coefficients of P(X) and append, for every
    /// point a, the equation ⟨(1, a, …, a^{prefix-1}), S[0..prefix)⟩ − e_a = 0
    /// with e_a = P(a) as a new column block.
    pub fn extend_with_poly_eval(&self, prefix: usize, points: &[i64]) -> Result<Self, RelationError> {
        if prefix > self.s.len() {
            return Err(RelationError::PrefixTooLong {
                prefix,
                size: self.s.len(),
            });
        }
        let ring = Arc::clone(self.ring());
        let coeffs = self.s.slice(0, prefix);

        let mut relation = self.clone();
        for &point in points {
            let powers = powers_of(&ring, point, prefix);
            let mut eval = IntVec::zeros(&ring, 1);
            eval.set(0, &powers.dot(&coeffs));

            let row = IntMatrix::from_rows(&ring, prefix, vec![powers])?;
            let mut eqn = LinearEquation::zero_lhs(&ring, 1);
            for (col, piece) in relation.split_over_blocks(&row, 0)? {
                eqn.append_dependent_term(piece, col)?;
            }
            eqn.append_term(Arc::new(IdentityMatrix::scaled(&ring, 1, -1)), eval)?;
            relation = relation.append_dependent(&eqn)?;
        }

        debug!(prefix, points = points.len(), "extended relation with polynomial evaluations");
        Ok(relation)
    }
}

/// (1, a, a², …, a^{n-1}) on every level.
fn powers_of(ring: &Arc<RingContext>, a: i64, n: usize) -> IntVec {
    let mut v = IntVec::zeros(ring, n);
    for i in 0..n {
        let residues: Vec<u64> = ring
            .moduli()
            .iter()
            .map(|&q| pow_mod(reduce_signed(a, q), i as u64, q))
            .collect();
        v.set(i, &residues);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::TEST_CHAIN;
    use crate::relation::LinearRelationBuilder;
    use num_bigint::BigInt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_ring(d: usize) -> Arc<RingContext> {
        RingContext::from_chain(d, &TEST_CHAIN).expect("valid chain")
    }

    /// Two independent blocks: I·x (size 5) and A·w (size 7).
    fn two_block_relation(ring: &Arc<RingContext>) -> ImmutLinearRelation {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let x = IntVec::random_ternary(ring, 5, &mut rng);
        let w = IntVec::random_ternary(ring, 7, &mut rng);
        let a = IntMatrix::random_uniform(ring, 3, 7, &mut rng);

        let mut first = LinearEquation::zero_lhs(ring, 5);
        first.append_vec_term(x).expect("shape");
        first.update_lhs().expect("independent");
        let mut second = LinearEquation::zero_lhs(ring, 3);
        second.append_term(Arc::new(a), w).expect("shape");
        second.update_lhs().expect("independent");

        let mut builder = LinearRelationBuilder::new();
        builder.append(first).append(second);
        builder.build(ring).expect("valid")
    }

    #[test]
    fn test_append_independent_keeps_validity() {
        let ring = test_ring(8);
        let relation = two_block_relation(&ring);
        let (extended, index) = relation.append_independent(IntVec::from_i64s(&ring, &[4, 5, 6]));

        assert_eq!(index, 2);
        assert_eq!(extended.column_block_sizes(), &[5, 7, 3]);
        assert_eq!(extended.s().len(), 15);
        assert!(extended.is_valid());
    }

    #[test]
    fn test_append_dependent_across_blocks() {
        let ring = test_ring(8);
        let relation = two_block_relation(&ring);

        // Sum of S[3..9), which straddles both blocks.
        let ones = IntMatrix::from_i64s(&ring, 6, &[vec![1; 6]]).expect("shape");
        let total: i64 = relation
            .s()
            .slice(3, 9)
            .lift()
            .iter()
            .map(|x| i64::try_from(x).expect("ternary"))
            .sum();

        let mut eqn = LinearEquation::new(IntVec::from_i64s(&ring, &[total]));
        let pieces = relation.split_over_blocks(&ones, 3).expect("in range");
        assert_eq!(pieces.iter().map(|(c, _)| *c).collect::<Vec<_>>(), vec![0, 1]);
        for (col, piece) in pieces {
            eqn.append_dependent_term(piece, col).expect("rows");
        }

        let extended = relation.append_dependent(&eqn).expect("resolvable");
        assert!(extended.is_valid());
        assert_eq!(extended.u().len(), 9);

        let mut dangling = LinearEquation::zero_lhs(&ring, 1);
        dangling
            .append_dependent_term(Arc::new(IntMatrix::zeros(&ring, 1, 3)), 5)
            .expect("rows");
        assert_eq!(
            relation.append_dependent(&dangling).err(),
            Some(RelationError::UnresolvedDependency { equation: 2, term: 0, index: 5 })
        );
    }

    #[test]
    fn test_statement_follows_dependent_extension() {
        let ring = test_ring(8);
        let relation = two_block_relation(&ring);
        let (relation, extra) = relation.append_independent(IntVec::from_i64s(&ring, &[9, -9]));
        let (statement, same) = two_block_relation(&ring).statement().append_columns(2);
        assert_eq!(extra, same);

        // 2·v = (18, -18) through two terms on the same block.
        let mut eqn = LinearEquation::new(IntVec::from_i64s(&ring, &[18, -18]));
        eqn.append_dependent_term(Arc::new(IdentityMatrix::new(&ring, 2)), extra)
            .and_then(|e| e.append_dependent_term(Arc::new(IdentityMatrix::new(&ring, 2)), extra))
            .expect("rows");

        let proven = relation.append_dependent(&eqn).expect("resolvable");
        let public = statement.append_dependent(&eqn).expect("resolvable");
        assert!(proven.is_valid());
        assert_eq!(proven.a().as_dense(), public.a().as_dense());
        assert_eq!(proven.u(), public.u());

        let mut fresh = LinearEquation::zero_lhs(&ring, 1);
        fresh.append_vec_term(IntVec::zeros(&ring, 1)).expect("shape");
        assert_eq!(
            statement.append_dependent(&fresh).err(),
            Some(RelationError::WitnessRequired { term: 0 })
        );
    }

    #[test]
    fn test_poly_eval() {
        let ring = test_ring(8);
        let relation = two_block_relation(&ring);
        let coeffs: Vec<BigInt> = relation.s().slice(0, 9).lift();
        let points = [2i64, -3];

        let extended = relation.extend_with_poly_eval(9, &points).expect("prefix fits");
        assert!(extended.is_valid());
        assert_eq!(extended.column_block_sizes(), &[5, 7, 1, 1]);

        for (i, &a) in points.iter().enumerate() {
            let expected = coeffs
                .iter()
                .rev()
                .fold(BigInt::from(0), |acc, c| acc * a + c);
            assert_eq!(extended.s().lift_at(12 + i), expected);
        }

        assert_eq!(
            relation.extend_with_poly_eval(13, &points).err(),
            Some(RelationError::PrefixTooLong { prefix: 13, size: 12 })
        );
    }

    #[test]
    fn test_rebased_relation_stays_valid() {
        let big = test_ring(32);
        let small = test_ring(8);
        let relation = two_block_relation(&big);

        let rebased = relation.rebased(&small).expect("8 divides 32");
        assert!(rebased.is_valid());
        assert_eq!(rebased.s().lift(), relation.s().lift());

        assert!(rebased.rebased(&test_ring(4)).is_ok());
        assert!(rebased.rebased(&test_ring(16)).is_err());
    }
}
