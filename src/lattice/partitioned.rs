//! Block-partitioned matrices
//!
//! A [`PartitionedIntMatrix`] is a grid of optional blocks. A `None` block is
//! an implicit zero of the shape fixed by its block row and block column; any
//! [`Matrix`] can be a block, including another partitioned matrix. Row-block
//! heights and column-block widths are fixed when the block row or column is
//! created.
//!
//! Products never materialise the grid: `v` is cut at the column-block
//! boundaries and each block row accumulates its non-empty blocks. The dense
//! form is built on demand and cached until the grid changes.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

use super::matrix::{check_mul_vec, IntMatrix, Matrix};
use super::ring::RingContext;
use super::vector::IntVec;
use crate::error::{LatticeError, LatticeResult};

/// Grid of optional blocks with fixed row/column partition sizes.
#[derive(Clone)]
pub struct PartitionedIntMatrix {
    ring: Arc<RingContext>,
    row_sizes: Vec<usize>,
    col_sizes: Vec<usize>,
    /// blocks[r][c]
    blocks: Vec<Vec<Option<Arc<dyn Matrix>>>>,
    dense: OnceLock<Arc<IntMatrix>>,
}

impl fmt::Debug for PartitionedIntMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PartitionedIntMatrix {{ row_sizes: {:?}, col_sizes: {:?}, blocks: [...] }}",
            self.row_sizes, self.col_sizes
        )
    }
}

impl PartitionedIntMatrix {
    /// Empty 0×0 grid.
    pub fn new(ring: &Arc<RingContext>) -> Self {
        Self::with_sizes(ring, Vec::new(), Vec::new())
    }

    /// Grid of `None` blocks with the given partition.
    pub fn with_sizes(ring: &Arc<RingContext>, row_sizes: Vec<usize>, col_sizes: Vec<usize>) -> Self {
        let blocks = vec![vec![None; col_sizes.len()]; row_sizes.len()];
        Self {
            ring: Arc::clone(ring),
            row_sizes,
            col_sizes,
            blocks,
            dense: OnceLock::new(),
        }
    }

    pub fn row_block_sizes(&self) -> &[usize] {
        &self.row_sizes
    }

    pub fn col_block_sizes(&self) -> &[usize] {
        &self.col_sizes
    }

    pub fn num_row_blocks(&self) -> usize {
        self.row_sizes.len()
    }

    pub fn num_col_blocks(&self) -> usize {
        self.col_sizes.len()
    }

    /// First column index of every column block.
    pub fn col_offsets(&self) -> Vec<usize> {
        offsets(&self.col_sizes)
    }

    pub fn row_offsets(&self) -> Vec<usize> {
        offsets(&self.row_sizes)
    }

    /// Add an empty block row of the given height; returns its index.
    pub fn push_row_block(&mut self, size: usize) -> usize {
        self.dense = OnceLock::new();
        self.row_sizes.push(size);
        self.blocks.push(vec![None; self.col_sizes.len()]);
        self.row_sizes.len() - 1
    }

    /// Add an empty block column of the given width; returns its index.
    pub fn push_col_block(&mut self, size: usize) -> usize {
        self.dense = OnceLock::new();
        self.col_sizes.push(size);
        for row in &mut self.blocks {
            row.push(None);
        }
        self.col_sizes.len() - 1
    }

    pub fn block(&self, row: usize, col: usize) -> Option<&Arc<dyn Matrix>> {
        self.blocks.get(row)?.get(col)?.as_ref()
    }

    /// Place `block` at (row, col). An occupied cell receives the sum of
    /// both blocks.
    pub fn emplace(&mut self, row: usize, col: usize, block: Arc<dyn Matrix>) -> LatticeResult<()> {
        let (rows, cols) = (self.row_sizes.len(), self.col_sizes.len());
        if row >= rows || col >= cols {
            return Err(LatticeError::BlockOutOfRange { row, col, rows, cols });
        }
        let expected = (self.row_sizes[row], self.col_sizes[col]);
        let got = (block.rows(), block.cols());
        if expected != got {
            return Err(LatticeError::BlockShape { row, col, expected, got });
        }

        let merged = match &self.blocks[row][col] {
            None => block,
            Some(existing) => Arc::new(sum_dense(&existing.as_dense(), &block.as_dense())?),
        };
        self.blocks[row][col] = Some(merged);
        self.dense = OnceLock::new();
        Ok(())
    }

    /// Dense form, cached.
    pub fn as_int_matrix(&self) -> Arc<IntMatrix> {
        Arc::clone(self.dense.get_or_init(|| Arc::new(self.materialise())))
    }

    fn materialise(&self) -> IntMatrix {
        let cols = self.col_sizes.iter().sum();
        let mut rows = Vec::with_capacity(self.row_sizes.iter().sum());

        for (r, &height) in self.row_sizes.iter().enumerate() {
            let dense: Vec<Option<Arc<IntMatrix>>> = self.blocks[r]
                .iter()
                .map(|b| b.as_ref().map(|m| m.as_dense()))
                .collect();
            for i in 0..height {
                let mut row = IntVec::zeros(&self.ring, 0);
                for (block, &width) in dense.iter().zip(&self.col_sizes) {
                    match block {
                        Some(m) => row.append(m.row(i)),
                        None => row.append(&IntVec::zeros(&self.ring, width)),
                    }
                }
                rows.push(row);
            }
        }

        // emplace keeps every block in its cell's shape, so rows are `cols` wide
        IntMatrix::from_rows_unchecked(&self.ring, cols, rows)
    }
}

fn offsets(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .scan(0, |acc, &s| {
            let start = *acc;
            *acc += s;
            Some(start)
        })
        .collect()
}

fn sum_dense(a: &IntMatrix, b: &IntMatrix) -> LatticeResult<IntMatrix> {
    let rows = a
        .row_vecs()
        .iter()
        .zip(b.row_vecs())
        .map(|(x, y)| x.add(y))
        .collect();
    IntMatrix::from_rows(a.ring(), a.cols(), rows)
}

impl Matrix for PartitionedIntMatrix {
    fn rows(&self) -> usize {
        self.row_sizes.iter().sum()
    }

    fn cols(&self) -> usize {
        self.col_sizes.iter().sum()
    }

    fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    fn mul_vec(&self, v: &IntVec) -> LatticeResult<IntVec> {
        check_mul_vec(self.cols(), v)?;
        let parts: Vec<IntVec> = self
            .col_offsets()
            .iter()
            .zip(&self.col_sizes)
            .map(|(&start, &size)| v.slice(start, start + size))
            .collect();

        let outputs = self
            .blocks
            .par_iter()
            .zip(self.row_sizes.par_iter())
            .map(|(row, &height)| -> LatticeResult<IntVec> {
                let mut acc = IntVec::zeros(&self.ring, height);
                for (block, part) in row.iter().zip(&parts) {
                    if let Some(m) = block {
                        acc.add_assign(&m.mul_vec(part)?);
                    }
                }
                Ok(acc)
            })
            .collect::<LatticeResult<Vec<_>>>()?;

        Ok(IntVec::concat(&self.ring, &outputs))
    }

    fn transposed(&self) -> Arc<dyn Matrix> {
        let blocks = (0..self.col_sizes.len())
            .map(|c| {
                self.blocks
                    .iter()
                    .map(|row| row[c].as_ref().map(|m| m.transposed()))
                    .collect()
            })
            .collect();
        Arc::new(Self {
            ring: Arc::clone(&self.ring),
            row_sizes: self.col_sizes.clone(),
            col_sizes: self.row_sizes.clone(),
            blocks,
            dense: OnceLock::new(),
        })
    }

    fn as_dense(&self) -> Arc<IntMatrix> {
        self.as_int_matrix()
    }

    fn rebased(&self, ring: &Arc<RingContext>) -> LatticeResult<Arc<dyn Matrix>> {
        Ok(Arc::new(self.rebased_partitioned(ring)?))
    }
}

impl PartitionedIntMatrix {
    /// Every block rebased; the partition is unchanged.
    pub fn rebased_partitioned(&self, ring: &Arc<RingContext>) -> LatticeResult<Self> {
        let (from, to) = (self.ring.degree(), ring.degree());
        if from % to != 0 || !self.ring.same_chain(ring) {
            return Err(LatticeError::IncompatibleRebase { from, to });
        }
        let blocks = self
            .blocks
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| b.as_ref().map(|m| m.rebased(ring)).transpose())
                    .collect::<LatticeResult<Vec<_>>>()
            })
            .collect::<LatticeResult<Vec<_>>>()?;
        Ok(Self {
            ring: Arc::clone(ring),
            row_sizes: self.row_sizes.clone(),
            col_sizes: self.col_sizes.clone(),
            blocks,
            dense: OnceLock::new(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::matrix::IdentityMatrix;
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
    fn test_block_product_matches_dense() {
        let ring = test_ring(8);
        let mut rng = test_rng();

        let mut p = PartitionedIntMatrix::with_sizes(&ring, vec![3, 5], vec![4, 2, 7]);
        p.emplace(0, 0, Arc::new(IntMatrix::random_uniform(&ring, 3, 4, &mut rng))).expect("shape");
        p.emplace(1, 2, Arc::new(IntMatrix::random_uniform(&ring, 5, 7, &mut rng))).expect("shape");
        p.emplace(0, 1, Arc::new(IntMatrix::random_uniform(&ring, 3, 2, &mut rng))).expect("shape");

        let v = IntVec::random_uniform(&ring, 13, &mut rng);
        assert_eq!(p.mul_vec(&v), p.as_dense().mul_vec(&v));
        assert_eq!((p.rows(), p.cols()), (8, 13));
    }

    #[test]
    fn test_emplace_errors_and_sum() {
        let ring = test_ring(8);
        let mut p = PartitionedIntMatrix::with_sizes(&ring, vec![2], vec![2]);

        assert_eq!(
            p.emplace(0, 1, Arc::new(IdentityMatrix::new(&ring, 2))),
            Err(LatticeError::BlockOutOfRange { row: 0, col: 1, rows: 1, cols: 1 })
        );
        assert_eq!(
            p.emplace(0, 0, Arc::new(IdentityMatrix::new(&ring, 3))),
            Err(LatticeError::BlockShape { row: 0, col: 0, expected: (2, 2), got: (3, 3) })
        );

        p.emplace(0, 0, Arc::new(IdentityMatrix::new(&ring, 2))).expect("shape");
        p.emplace(0, 0, Arc::new(IdentityMatrix::scaled(&ring, 2, 4))).expect("shape");
        let v = IntVec::from_i64s(&ring, &[1, -1]);
        assert_eq!(p.mul_vec(&v).expect("dims"), v.scale(5));
    }

    #[test]
    fn test_rejected_emplace_keeps_block() {
        let ring = test_ring(8);
        let mut p = PartitionedIntMatrix::with_sizes(&ring, vec![2], vec![2]);
        p.emplace(0, 0, Arc::new(IdentityMatrix::scaled(&ring, 2, 3))).expect("shape");
        let before = p.as_int_matrix();

        assert!(p.emplace(0, 0, Arc::new(IdentityMatrix::new(&ring, 3))).is_err());
        assert_eq!(p.as_int_matrix(), before);
        let v = IntVec::from_i64s(&ring, &[2, 7]);
        assert_eq!(p.mul_vec(&v).expect("dims"), v.scale(3));
    }

    #[test]
    fn test_dense_form_zero_fills_empty_cells() {
        let ring = test_ring(4);
        let mut p = PartitionedIntMatrix::with_sizes(&ring, vec![1, 2], vec![3, 2]);
        p.emplace(1, 1, Arc::new(IdentityMatrix::new(&ring, 2))).expect("shape");

        let dense = p.as_int_matrix();
        assert_eq!((dense.rows(), dense.cols()), (3, 5));
        assert_eq!(dense.row(0).lift(), IntVec::zeros(&ring, 5).lift());
        assert_eq!(dense.row(2).lift(), IntVec::from_i64s(&ring, &[0, 0, 0, 0, 1]).lift());
    }

    #[test]
    fn test_push_blocks_invalidates_cache() {
        let ring = test_ring(4);
        let mut p = PartitionedIntMatrix::with_sizes(&ring, vec![2], vec![2]);
        p.emplace(0, 0, Arc::new(IdentityMatrix::new(&ring, 2))).expect("shape");
        assert_eq!(p.as_int_matrix().cols(), 2);

        let c = p.push_col_block(3);
        let r = p.push_row_block(1);
        assert_eq!((c, r), (1, 1));
        assert_eq!((p.as_int_matrix().rows(), p.as_int_matrix().cols()), (3, 5));
        assert_eq!(p.col_offsets(), vec![0, 2]);
    }

    #[test]
    fn test_transpose_involution_nested() {
        let ring = test_ring(8);
        let mut rng = test_rng();

        let mut inner = PartitionedIntMatrix::with_sizes(&ring, vec![2, 3], vec![3, 2]);
        inner.emplace(1, 0, Arc::new(IntMatrix::random_uniform(&ring, 3, 3, &mut rng))).expect("shape");
        let mut outer = PartitionedIntMatrix::with_sizes(&ring, vec![5, 1], vec![5, 4]);
        outer.emplace(0, 0, Arc::new(inner)).expect("shape");
        outer.emplace(1, 1, Arc::new(IntMatrix::random_uniform(&ring, 1, 4, &mut rng))).expect("shape");

        let t = outer.transposed();
        assert_eq!((t.rows(), t.cols()), (9, 6));
        assert!(t.transposed().eq_matrix(&outer));
        assert_eq!(*t.as_dense(), *outer.as_dense().transposed().as_dense());
    }

    #[test]
    fn test_rebase_keeps_products() {
        let big = test_ring(32);
        let small = test_ring(8);
        let mut rng = test_rng();

        let mut p = PartitionedIntMatrix::with_sizes(&big, vec![4, 3], vec![40, 3]);
        p.emplace(0, 0, Arc::new(IntMatrix::random_uniform(&big, 4, 40, &mut rng))).expect("shape");
        p.emplace(1, 1, Arc::new(IdentityMatrix::scaled(&big, 3, -1))).expect("shape");
        let v = IntVec::random_uniform(&big, 43, &mut rng);

        let r = p.rebased_partitioned(&small).expect("8 divides 32");
        let rv = v.rebase_lossless(&small).expect("8 divides 32");
        assert_eq!(r.mul_vec(&rv).expect("dims").lift(), p.mul_vec(&v).expect("dims").lift());
    }
}
