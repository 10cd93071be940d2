//! On-disk cache for public random matrices
//!
//! Text format, one matrix row (or the single vector) per line:
//!
//! ```text
//! r0_l0;r0_l1,r1_l0;r1_l1,...
//! ```
//!
//! Entries are separated by `,` and the residues of one entry, one per
//! modulus level, by `;`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PersistError;
use crate::lattice::matrix::{IntMatrix, Matrix};
use crate::lattice::ring::RingContext;
use crate::lattice::vector::IntVec;

fn write_row<W: Write>(out: &mut W, v: &IntVec) -> Result<(), PersistError> {
    let line = (0..v.len())
        .map(|i| {
            v.get(i)
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{line}")?;
    Ok(())
}

fn parse_row(ring: &Arc<RingContext>, line: &str, lineno: usize) -> Result<IntVec, PersistError> {
    let parse_err = |reason: String| PersistError::Parse { line: lineno, reason };
    if line.trim().is_empty() {
        return Ok(IntVec::zeros(ring, 0));
    }

    let entries: Vec<&str> = line.trim().split(',').collect();
    let mut v = IntVec::zeros(ring, entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let residues = entry
            .split(';')
            .map(|r| r.trim().parse::<u64>().map_err(|e| parse_err(format!("entry {i}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        if residues.len() != ring.levels() {
            return Err(PersistError::Mismatch(format!(
                "line {lineno}: entry {i} has {} levels, ring has {}",
                residues.len(),
                ring.levels()
            )));
        }
        if let Some((&r, &q)) = residues.iter().zip(ring.moduli()).find(|(r, q)| **r >= **q) {
            return Err(PersistError::Mismatch(format!(
                "line {lineno}: residue {r} not reduced modulo {q}"
            )));
        }
        v.set(i, &residues);
    }
    Ok(v)
}

pub fn save_matrix(path: &Path, matrix: &IntMatrix) -> Result<(), PersistError> {
    let mut out = BufWriter::new(File::create(path)?);
    for row in matrix.row_vecs() {
        write_row(&mut out, row)?;
    }
    out.flush()?;
    Ok(())
}

/// Load a matrix written by [`save_matrix`]. Every row must have the same
/// width and one residue per level of `ring`.
pub fn load_matrix(path: &Path, ring: &Arc<RingContext>) -> Result<IntMatrix, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        rows.push(parse_row(ring, &line?, lineno + 1)?);
    }

    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(PersistError::Mismatch(format!(
            "row {i} has {} entries, expected {cols}",
            row.len()
        )));
    }
    IntMatrix::from_rows(ring, cols, rows).map_err(|e| PersistError::Mismatch(e.to_string()))
}

pub fn save_vec(path: &Path, v: &IntVec) -> Result<(), PersistError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_row(&mut out, v)?;
    out.flush()?;
    Ok(())
}

pub fn load_vec(path: &Path, ring: &Arc<RingContext>) -> Result<IntVec, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    match reader.lines().next() {
        Some(line) => parse_row(ring, &line?, 1),
        None => Ok(IntVec::zeros(ring, 0)),
    }
}

fn try_load(path: &Path, ring: &Arc<RingContext>) -> Option<IntMatrix> {
    match load_matrix(path, ring) {
        Ok(matrix) => {
            debug!(path = %path.display(), rows = matrix.rows(), cols = matrix.cols(), "loaded cached matrix");
            Some(matrix)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "matrix cache unusable, regenerating");
            None
        }
    }
}

/// A public matrix cached at a fixed path.
#[derive(Clone, Debug)]
pub struct PersistentIntMatrix {
    path: PathBuf,
    matrix: IntMatrix,
    loaded: bool,
}

impl PersistentIntMatrix {
    /// Load the matrix at `path`, or generate it and try to cache it there.
    ///
    /// A missing or unreadable cache is regenerated. Failing to write the
    /// cache is not an error.
    pub fn load_or_generate<F>(path: impl AsRef<Path>, ring: &Arc<RingContext>, generate: F) -> Self
    where
        F: FnOnce(&Arc<RingContext>) -> IntMatrix,
    {
        let path = path.as_ref().to_path_buf();
        match try_load(&path, ring) {
            Some(matrix) => Self {
                path,
                matrix,
                loaded: true,
            },
            None => Self::generate_and_store(path, ring, generate),
        }
    }

    /// Like [`load_or_generate`](Self::load_or_generate), but a cached matrix
    /// that is not `rows × cols` is regenerated as well.
    pub fn load_or_generate_shaped<F>(
        path: impl AsRef<Path>,
        ring: &Arc<RingContext>,
        rows: usize,
        cols: usize,
        generate: F,
    ) -> Self
    where
        F: FnOnce(&Arc<RingContext>) -> IntMatrix,
    {
        let path = path.as_ref().to_path_buf();
        match try_load(&path, ring) {
            Some(matrix) if matrix.rows() == rows && matrix.cols() == cols => Self {
                path,
                matrix,
                loaded: true,
            },
            Some(matrix) => {
                warn!(
                    path = %path.display(),
                    expected = ?(rows, cols),
                    got = ?(matrix.rows(), matrix.cols()),
                    "cached matrix has the wrong shape, regenerating"
                );
                Self::generate_and_store(path, ring, generate)
            }
            None => Self::generate_and_store(path, ring, generate),
        }
    }

    fn generate_and_store<F>(path: PathBuf, ring: &Arc<RingContext>, generate: F) -> Self
    where
        F: FnOnce(&Arc<RingContext>) -> IntMatrix,
    {
        let matrix = generate(ring);
        if let Err(e) = save_matrix(&path, &matrix) {
            warn!(path = %path.display(), error = %e, "failed to write matrix cache");
        }
        Self {
            path,
            matrix,
            loaded: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn matrix(&self) -> &IntMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> IntMatrix {
        self.matrix
    }

    /// Whether the matrix came from the cache.
    pub fn was_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::params::TEST_CHAIN;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_matrix_file_round_trip() {
        let ring = RingContext::from_chain(16, &TEST_CHAIN).expect("valid chain");
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.mat");

        let a = IntMatrix::random_uniform(&ring, 3, 21, &mut rng);
        save_matrix(&path, &a).expect("save");
        assert_eq!(load_matrix(&path, &ring).expect("load"), a);

        let v = IntVec::random_bounded(&ring, 5, 7, &mut rng);
        let vpath = dir.path().join("v.vec");
        save_vec(&vpath, &v).expect("save");
        assert_eq!(load_vec(&vpath, &ring).expect("load"), v);
    }

    #[test]
    fn test_load_or_generate() {
        let ring = RingContext::from_chain(16, &TEST_CHAIN).expect("valid chain");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("b0.mat");
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let fresh = IntMatrix::random_uniform(&ring, 2, 9, &mut rng);

        let first = PersistentIntMatrix::load_or_generate(&path, &ring, |_| fresh.clone());
        assert!(!first.was_loaded());
        let second = PersistentIntMatrix::load_or_generate(&path, &ring, |_| unreachable!("cached"));
        assert!(second.was_loaded());
        assert_eq!(second.matrix(), first.matrix());

        let reshaped = PersistentIntMatrix::load_or_generate_shaped(&path, &ring, 3, 9, |r| IntMatrix::zeros(r, 3, 9));
        assert!(!reshaped.was_loaded());
        assert_eq!(reshaped.matrix().rows(), 3);

        // unwritable location: still returns the generated matrix
        let nowhere = dir.path().join("missing-dir").join("c.mat");
        let generated = PersistentIntMatrix::load_or_generate(&nowhere, &ring, |_| fresh.clone());
        assert_eq!(generated.into_matrix(), fresh);
    }

    #[test]
    fn test_rejects_malformed() {
        let ring = RingContext::from_chain(16, &TEST_CHAIN).expect("valid chain");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.mat");

        std::fs::write(&path, "1;2,3;4\n5;6\n").expect("write");
        assert!(matches!(load_matrix(&path, &ring), Err(PersistError::Mismatch(_))));

        std::fs::write(&path, "1;x\n").expect("write");
        assert!(matches!(load_matrix(&path, &ring), Err(PersistError::Parse { line: 1, .. })));

        // single level on a two-level ring
        std::fs::write(&path, "1,2\n").expect("write");
        assert!(matches!(load_matrix(&path, &ring), Err(PersistError::Mismatch(_))));

        let q = ring.moduli()[0];
        std::fs::write(&path, format!("{q};0\n")).expect("write");
        assert!(matches!(load_matrix(&path, &ring), Err(PersistError::Mismatch(_))));

        assert!(matches!(
            load_matrix(&dir.path().join("missing.mat"), &ring),
            Err(PersistError::Io(_))
        ));
    }
}
