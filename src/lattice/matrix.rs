//! Matrices over Z_Q
//!
//! Every flavour implements [`Matrix`], the polymorphic interface the relation
//! layer and the proof protocol work against:
//!
//! | Type | Storage | `transposed()` |
//! |------|---------|----------------|
//! | [`IntMatrix`] | dense rows of [`IntVec`] | lazily computed, cached until mutation |
//! | [`CachedIntMatrix`] | dense matrix plus its transpose | O(1), kept in sync on mutation |
//! | [`IdentityMatrix`] | implicit c·I_n | itself |
//! | [`PartitionedIntMatrix`](super::partitioned::PartitionedIntMatrix) | grid of optional blocks | grid and blocks transposed |
//!
//! Matrix–vector products run rows in parallel; each row is a per-level
//! Montgomery multiply-accumulate over the padded residues.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rand::Rng;
use rayon::prelude::*;

use super::ring::RingContext;
use super::vector::IntVec;
use crate::error::{LatticeError, LatticeResult};

// ============================================================================
// Matrix Trait
// ============================================================================

/// Linear map Z_Q^cols → Z_Q^rows.
pub trait Matrix: Send + Sync + fmt::Debug {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    fn ring(&self) -> &Arc<RingContext>;

    /// A·v. Fails when `v.len() != self.cols()`.
    fn mul_vec(&self, v: &IntVec) -> LatticeResult<IntVec>;

    fn transposed(&self) -> Arc<dyn Matrix>;

    /// Dense materialisation.
    fn as_dense(&self) -> Arc<IntMatrix>;

    /// Same entries over a ring of smaller degree (see [`IntVec::rebase_lossless`]).
    fn rebased(&self, ring: &Arc<RingContext>) -> LatticeResult<Arc<dyn Matrix>>;

    /// Entry-wise product.
    fn hadamard(&self, other: &dyn Matrix) -> LatticeResult<IntMatrix> {
        check_same_shape(self.rows(), self.cols(), other)?;
        let (a, b) = (self.as_dense(), other.as_dense());
        let rows = a.data.iter().zip(&b.data).map(|(x, y)| x.hadamard(y)).collect();
        IntMatrix::from_rows(self.ring(), self.cols(), rows)
    }

    /// Entry-wise equality, independent of representation.
    fn eq_matrix(&self, other: &dyn Matrix) -> bool {
        self.rows() == other.rows()
            && self.cols() == other.cols()
            && self.as_dense().data == other.as_dense().data
    }
}

fn check_same_shape(rows: usize, cols: usize, other: &dyn Matrix) -> LatticeResult<()> {
    if other.rows() != rows {
        return Err(LatticeError::DimensionMismatch {
            context: "matrix rows",
            expected: rows,
            got: other.rows(),
        });
    }
    if other.cols() != cols {
        return Err(LatticeError::DimensionMismatch {
            context: "matrix columns",
            expected: cols,
            got: other.cols(),
        });
    }
    Ok(())
}

pub(crate) fn check_mul_vec(cols: usize, v: &IntVec) -> LatticeResult<()> {
    if v.len() != cols {
        return Err(LatticeError::DimensionMismatch {
            context: "mul_vec",
            expected: cols,
            got: v.len(),
        });
    }
    Ok(())
}

// ============================================================================
// IntMatrix
// ============================================================================

/// Dense matrix stored as rows.
#[derive(Clone)]
pub struct IntMatrix {
    ring: Arc<RingContext>,
    cols: usize,
    data: Vec<IntVec>,
    transpose: OnceLock<Arc<IntMatrix>>,
}

impl fmt::Debug for IntMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntMatrix {{ rows: {}, cols: {}, degree: {}, data: [...] }}",
            self.data.len(),
            self.cols,
            self.ring.degree()
        )
    }
}

impl PartialEq for IntMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.cols == other.cols && self.data == other.data
    }
}

impl Eq for IntMatrix {}

impl IntMatrix {
    pub fn zeros(ring: &Arc<RingContext>, rows: usize, cols: usize) -> Self {
        Self {
            ring: Arc::clone(ring),
            cols,
            data: vec![IntVec::zeros(ring, cols); rows],
            transpose: OnceLock::new(),
        }
    }

    /// Matrix from rows of length `cols`.
    pub fn from_rows(ring: &Arc<RingContext>, cols: usize, rows: Vec<IntVec>) -> LatticeResult<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(LatticeError::DimensionMismatch {
                context: "IntMatrix row length",
                expected: cols,
                got: bad.len(),
            });
        }
        Ok(Self {
            ring: Arc::clone(ring),
            cols,
            data: rows,
            transpose: OnceLock::new(),
        })
    }

    /// Rows already known to be `cols` wide.
    pub(crate) fn from_rows_unchecked(ring: &Arc<RingContext>, cols: usize, rows: Vec<IntVec>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == cols), "row width differs from {cols}");
        Self {
            ring: Arc::clone(ring),
            cols,
            data: rows,
            transpose: OnceLock::new(),
        }
    }

    /// Matrix from signed rows; all rows must have length `cols`.
    pub fn from_i64s(ring: &Arc<RingContext>, cols: usize, rows: &[Vec<i64>]) -> LatticeResult<Self> {
        let rows = rows.iter().map(|r| IntVec::from_i64s(ring, r)).collect();
        Self::from_rows(ring, cols, rows)
    }

    pub fn random_uniform<R: Rng>(ring: &Arc<RingContext>, rows: usize, cols: usize, rng: &mut R) -> Self {
        let data = (0..rows).map(|_| IntVec::random_uniform(ring, cols, rng)).collect();
        Self {
            ring: Arc::clone(ring),
            cols,
            data,
            transpose: OnceLock::new(),
        }
    }

    /// Entries uniform in [-bound, bound].
    pub fn random_bounded<R: Rng>(
        ring: &Arc<RingContext>,
        rows: usize,
        cols: usize,
        bound: u64,
        rng: &mut R,
    ) -> Self {
        let data = (0..rows).map(|_| IntVec::random_bounded(ring, cols, bound, rng)).collect();
        Self {
            ring: Arc::clone(ring),
            cols,
            data,
            transpose: OnceLock::new(),
        }
    }

    pub fn row(&self, i: usize) -> &IntVec {
        &self.data[i]
    }

    pub fn row_vecs(&self) -> &[IntVec] {
        &self.data
    }

    /// Residues of entry (i, j).
    pub fn get(&self, i: usize, j: usize) -> Vec<u64> {
        self.data[i].get(j)
    }

    pub fn set(&mut self, i: usize, j: usize, residues: &[u64]) {
        self.transpose = OnceLock::new();
        self.data[i].set(j, residues);
    }

    pub fn set_row(&mut self, i: usize, row: IntVec) -> LatticeResult<()> {
        check_mul_vec(self.cols, &row)?;
        self.transpose = OnceLock::new();
        self.data[i] = row;
        Ok(())
    }

    /// Append the rows of `other` below.
    pub fn extend_rows(&mut self, other: &IntMatrix) -> LatticeResult<()> {
        if other.cols != self.cols {
            return Err(LatticeError::DimensionMismatch {
                context: "extend_rows",
                expected: self.cols,
                got: other.cols,
            });
        }
        self.transpose = OnceLock::new();
        self.data.extend(other.data.iter().cloned());
        Ok(())
    }

    /// Append the columns of `other` on the right.
    pub fn extend_cols(&mut self, other: &IntMatrix) -> LatticeResult<()> {
        if other.data.len() != self.data.len() {
            return Err(LatticeError::DimensionMismatch {
                context: "extend_cols",
                expected: self.data.len(),
                got: other.data.len(),
            });
        }
        self.transpose = OnceLock::new();
        for (row, extra) in self.data.iter_mut().zip(&other.data) {
            row.append(extra);
        }
        self.cols += other.cols;
        Ok(())
    }

    pub fn scale(&mut self, c: i64) {
        self.transpose = OnceLock::new();
        for row in &mut self.data {
            *row = row.scale(c);
        }
    }

    /// Reference product: sequential rows, plain u128 reduction.
    pub fn mul_vec_reference(&self, v: &IntVec) -> LatticeResult<IntVec> {
        check_mul_vec(self.cols, v)?;
        let per_row: Vec<Vec<u64>> = self.data.iter().map(|row| row.dot_reference(v)).collect();
        Ok(pack_rows(&self.ring, &per_row))
    }

    fn compute_transpose(&self) -> IntMatrix {
        let rows = self.data.len();
        let data = (0..self.cols)
            .into_par_iter()
            .map(|j| {
                let mut col = IntVec::zeros(&self.ring, rows);
                for (i, row) in self.data.iter().enumerate() {
                    col.set(i, &row.get(j));
                }
                col
            })
            .collect();
        IntMatrix {
            ring: Arc::clone(&self.ring),
            cols: rows,
            data,
            transpose: OnceLock::new(),
        }
    }

    /// Cached transpose as a concrete matrix.
    pub fn transpose_dense(&self) -> Arc<IntMatrix> {
        Arc::clone(self.transpose.get_or_init(|| Arc::new(self.compute_transpose())))
    }

    pub fn rebased_dense(&self, ring: &Arc<RingContext>) -> LatticeResult<IntMatrix> {
        let data = self
            .data
            .iter()
            .map(|row| row.rebase_lossless(ring))
            .collect::<LatticeResult<Vec<_>>>()?;
        Ok(IntMatrix {
            ring: Arc::clone(ring),
            cols: self.cols,
            data,
            transpose: OnceLock::new(),
        })
    }
}

/// Per-row residues (row i → residues on every level) into an IntVec.
fn pack_rows(ring: &Arc<RingContext>, per_row: &[Vec<u64>]) -> IntVec {
    let mut out = IntVec::zeros(ring, per_row.len());
    for (i, residues) in per_row.iter().enumerate() {
        out.set(i, residues);
    }
    out
}

impl Matrix for IntMatrix {
    fn rows(&self) -> usize {
        self.data.len()
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    fn mul_vec(&self, v: &IntVec) -> LatticeResult<IntVec> {
        check_mul_vec(self.cols, v)?;
        let per_row: Vec<Vec<u64>> = self.data.par_iter().map(|row| row.dot(v)).collect();
        Ok(pack_rows(&self.ring, &per_row))
    }

    fn transposed(&self) -> Arc<dyn Matrix> {
        self.transpose_dense()
    }

    fn as_dense(&self) -> Arc<IntMatrix> {
        let mut copy = self.clone();
        copy.transpose = OnceLock::new();
        Arc::new(copy)
    }

    fn rebased(&self, ring: &Arc<RingContext>) -> LatticeResult<Arc<dyn Matrix>> {
        Ok(Arc::new(self.rebased_dense(ring)?))
    }
}

// ============================================================================
// CachedIntMatrix
// ============================================================================

/// Dense matrix with an eagerly synchronised transpose.
#[derive(Clone, Debug)]
pub struct CachedIntMatrix {
    matrix: Arc<IntMatrix>,
    transpose: Arc<IntMatrix>,
}

impl CachedIntMatrix {
    pub fn new(matrix: IntMatrix) -> Self {
        let transpose = Arc::new(matrix.compute_transpose());
        Self {
            matrix: Arc::new(matrix),
            transpose,
        }
    }

    pub fn matrix(&self) -> &IntMatrix {
        &self.matrix
    }

    pub fn set(&mut self, i: usize, j: usize, residues: &[u64]) {
        Arc::make_mut(&mut self.matrix).set(i, j, residues);
        Arc::make_mut(&mut self.transpose).set(j, i, residues);
    }

    pub fn set_row(&mut self, i: usize, row: IntVec) -> LatticeResult<()> {
        check_mul_vec(self.matrix.cols(), &row)?;
        let transpose = Arc::make_mut(&mut self.transpose);
        for j in 0..row.len() {
            transpose.set(j, i, &row.get(j));
        }
        Arc::make_mut(&mut self.matrix).set_row(i, row)
    }

    pub fn extend_rows(&mut self, other: &IntMatrix) -> LatticeResult<()> {
        Arc::make_mut(&mut self.matrix).extend_rows(other)?;
        Arc::make_mut(&mut self.transpose).extend_cols(&other.compute_transpose())
    }

    pub fn extend_cols(&mut self, other: &IntMatrix) -> LatticeResult<()> {
        Arc::make_mut(&mut self.matrix).extend_cols(other)?;
        Arc::make_mut(&mut self.transpose).extend_rows(&other.compute_transpose())
    }

    pub fn scale(&mut self, c: i64) {
        Arc::make_mut(&mut self.matrix).scale(c);
        Arc::make_mut(&mut self.transpose).scale(c);
    }
}

impl Matrix for CachedIntMatrix {
    fn rows(&self) -> usize {
        self.matrix.rows()
    }

    fn cols(&self) -> usize {
        self.matrix.cols()
    }

    fn ring(&self) -> &Arc<RingContext> {
        self.matrix.ring()
    }

    fn mul_vec(&self, v: &IntVec) -> LatticeResult<IntVec> {
        self.matrix.mul_vec(v)
    }

    fn transposed(&self) -> Arc<dyn Matrix> {
        Arc::new(CachedIntMatrix {
            matrix: Arc::clone(&self.transpose),
            transpose: Arc::clone(&self.matrix),
        })
    }

    fn as_dense(&self) -> Arc<IntMatrix> {
        Arc::clone(&self.matrix)
    }

    fn rebased(&self, ring: &Arc<RingContext>) -> LatticeResult<Arc<dyn Matrix>> {
        Ok(Arc::new(CachedIntMatrix {
            matrix: Arc::new(self.matrix.rebased_dense(ring)?),
            transpose: Arc::new(self.transpose.rebased_dense(ring)?),
        }))
    }
}

// ============================================================================
// IdentityMatrix
// ============================================================================

/// Implicit c·I_n.
#[derive(Clone, Debug)]
pub struct IdentityMatrix {
    ring: Arc<RingContext>,
    size: usize,
    scale: i64,
}

impl IdentityMatrix {
    pub fn new(ring: &Arc<RingContext>, size: usize) -> Self {
        Self::scaled(ring, size, 1)
    }

    pub fn scaled(ring: &Arc<RingContext>, size: usize, scale: i64) -> Self {
        Self {
            ring: Arc::clone(ring),
            size,
            scale,
        }
    }

    pub fn scale_factor(&self) -> i64 {
        self.scale
    }
}

impl Matrix for IdentityMatrix {
    fn rows(&self) -> usize {
        self.size
    }

    fn cols(&self) -> usize {
        self.size
    }

    fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    fn mul_vec(&self, v: &IntVec) -> LatticeResult<IntVec> {
        check_mul_vec(self.size, v)?;
        Ok(match self.scale {
            1 => v.clone(),
            c => v.scale(c),
        })
    }

    fn transposed(&self) -> Arc<dyn Matrix> {
        Arc::new(self.clone())
    }

    fn as_dense(&self) -> Arc<IntMatrix> {
        let mut dense = IntMatrix::zeros(&self.ring, self.size, self.size);
        for (i, row) in dense.data.iter_mut().enumerate() {
            row.set_i64(i, self.scale);
        }
        Arc::new(dense)
    }

    fn rebased(&self, ring: &Arc<RingContext>) -> LatticeResult<Arc<dyn Matrix>> {
        let (from, to) = (self.ring.degree(), ring.degree());
        if from % to != 0 || !self.ring.same_chain(ring) {
            return Err(LatticeError::IncompatibleRebase { from, to });
        }
        Ok(Arc::new(Self::scaled(ring, self.size, self.scale)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::TEST_CHAIN;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn test_ring(d: usize) -> Arc<RingContext> {
        RingContext::from_chain(d, &TEST_CHAIN).expect("valid chain")
    }

    #[test]
    fn test_small_product() {
        let ring = test_ring(4);
        let a = IntMatrix::from_i64s(&ring, 3, &[vec![1, 2, 3], vec![-1, 0, 4]]).expect("shape");
        let v = IntVec::from_i64s(&ring, &[2, -1, 5]);

        let out = a.mul_vec(&v).expect("dims");
        assert_eq!(out, IntVec::from_i64s(&ring, &[15, 18]));
        assert_eq!(a.mul_vec_reference(&v).expect("dims"), out);
    }

    #[test]
    fn test_dimension_mismatch() {
        let ring = test_ring(4);
        let a = IntMatrix::zeros(&ring, 2, 3);
        let v = IntVec::zeros(&ring, 4);
        assert_eq!(
            a.mul_vec(&v),
            Err(LatticeError::DimensionMismatch { context: "mul_vec", expected: 3, got: 4 })
        );
    }

    #[test]
    fn test_fast_matches_reference() {
        let ring = test_ring(16);
        let mut rng = test_rng();
        for &(rows, cols) in &[(1usize, 1usize), (7, 33), (20, 64), (3, 100)] {
            let a = IntMatrix::random_uniform(&ring, rows, cols, &mut rng);
            let v = IntVec::random_uniform(&ring, cols, &mut rng);
            assert_eq!(a.mul_vec(&v), a.mul_vec_reference(&v), "{rows}x{cols}");
        }
    }

    #[test]
    fn test_transpose_cache_invalidation() {
        let ring = test_ring(8);
        let mut rng = test_rng();
        let mut a = IntMatrix::random_uniform(&ring, 5, 9, &mut rng);

        let t = a.transposed();
        assert_eq!((t.rows(), t.cols()), (9, 5));
        assert!(t.transposed().eq_matrix(&a));

        a.set(2, 7, &[1, 1]);
        assert_eq!(a.transposed().as_dense().get(7, 2), vec![1, 1]);
    }

    #[test]
    fn test_cached_matrix_stays_in_sync() {
        let ring = test_ring(8);
        let mut rng = test_rng();
        let base = IntMatrix::random_uniform(&ring, 4, 6, &mut rng);
        let mut cached = CachedIntMatrix::new(base);

        cached.set(1, 2, &[5, 5]);
        cached.set_row(3, IntVec::from_i64s(&ring, &[1, 2, 3, 4, 5, 6])).expect("shape");
        cached.extend_rows(&IntMatrix::random_uniform(&ring, 2, 6, &mut rng)).expect("shape");
        cached.extend_cols(&IntMatrix::random_uniform(&ring, 6, 3, &mut rng)).expect("shape");
        cached.scale(-2);

        let fresh = cached.matrix().compute_transpose();
        assert_eq!(*cached.transposed().as_dense(), fresh);
        assert_eq!((cached.rows(), cached.cols()), (6, 9));
    }

    #[test]
    fn test_identity() {
        let ring = test_ring(8);
        let v = IntVec::from_i64s(&ring, &[1, -2, 3]);
        let id = IdentityMatrix::scaled(&ring, 3, -1);

        assert_eq!(id.mul_vec(&v).expect("dims"), v.neg());
        assert!(id.transposed().eq_matrix(&id));
        assert_eq!(id.as_dense().mul_vec(&v).expect("dims"), v.neg());
    }

    #[test]
    fn test_hadamard_and_rebase() {
        let big = test_ring(32);
        let small = test_ring(8);
        let mut rng = test_rng();
        let a = IntMatrix::random_uniform(&big, 3, 40, &mut rng);
        let b = IntMatrix::random_uniform(&big, 3, 40, &mut rng);
        let v = IntVec::random_uniform(&big, 40, &mut rng);

        let h = a.hadamard(&b).expect("shape");
        assert_eq!(h.get(1, 5), big_mul(&big, &a.get(1, 5), &b.get(1, 5)));

        let ra = a.rebased(&small).expect("8 divides 32");
        let rv = v.rebase_lossless(&small).expect("8 divides 32");
        assert_eq!(ra.mul_vec(&rv).expect("dims").lift(), a.mul_vec(&v).expect("dims").lift());
    }

    fn big_mul(ring: &RingContext, x: &[u64], y: &[u64]) -> Vec<u64> {
        x.iter()
            .zip(y)
            .zip(ring.moduli())
            .map(|((&a, &b), &q)| crate::lattice::modular::mul_mod(a, b, q))
            .collect()
    }
}
