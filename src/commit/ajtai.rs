//! Ajtai/SIS-based commitment key
//!
//! The key is a pair (B0, b_0..b_{n-1}) over R_Q with B0 ∈ R_Q^{ρ × κ} and
//! b_j ∈ R_Q^κ. The commitment to messages m_0..m_{n-1} under randomness
//! r ∈ R_Q^κ is
//!
//! ```text
//! t0  = B0 · r
//! t_j = ⟨b_j, r⟩ + m_j
//! ```
//!
//! # Security
//!
//! Binding relies on Module-SIS for B0; hiding relies on Module-LWE for the
//! rows b_j when r is short.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::error::{LatticeError, LatticeResult};
use crate::lattice::ring::{Poly, RingContext};

// ============================================================================
// Ajtai Commitment Key
// ============================================================================

/// Commitment key (B0, b_0..b_{n-1}).
#[derive(Clone, Debug)]
pub struct AjtaiKey {
    ring: Arc<RingContext>,
    kappa: usize,
    /// B0: b0_rows × κ
    b0: Vec<Vec<Poly>>,
    /// b_j ∈ R_Q^κ, one per message slot
    b: Vec<Vec<Poly>>,
}

impl AjtaiKey {
    /// Uniform key with `num_messages` message slots.
    pub fn random<R: Rng>(
        ring: &Arc<RingContext>,
        b0_rows: usize,
        kappa: usize,
        num_messages: usize,
        rng: &mut R,
    ) -> Self {
        let b0 = sample_rows(ring, b0_rows, kappa, rng);
        let b = sample_rows(ring, num_messages, kappa, rng);

        Self {
            ring: Arc::clone(ring),
            kappa,
            b0,
            b,
        }
    }

    /// Deterministic key: SHA-256 of the seed keys a ChaCha20 stream.
    pub fn from_seed(
        ring: &Arc<RingContext>,
        b0_rows: usize,
        kappa: usize,
        num_messages: usize,
        seed: &[u8],
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"ajtai-key");
        hasher.update(seed);
        let mut rng = ChaCha20Rng::from_seed(hasher.finalize().into());
        Self::random(ring, b0_rows, kappa, num_messages, &mut rng)
    }

    pub fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    /// Randomness length κ.
    pub fn kappa(&self) -> usize {
        self.kappa
    }

    pub fn b0_rows(&self) -> usize {
        self.b0.len()
    }

    pub fn num_messages(&self) -> usize {
        self.b.len()
    }

    fn check_randomness(&self, r: &[Poly]) -> LatticeResult<()> {
        if r.len() != self.kappa {
            return Err(LatticeError::DimensionMismatch {
                context: "Ajtai randomness",
                expected: self.kappa,
                got: r.len(),
            });
        }
        Ok(())
    }

    fn row_product(&self, row: &[Poly], r: &[Poly]) -> Poly {
        row.iter().zip(r).fold(self.ring.zero(), |mut acc, (a, x)| {
            self.ring.mul_and_add(&mut acc, a, x);
            acc
        })
    }

    /// B0 · r
    pub fn commit_b0(&self, r: &[Poly]) -> LatticeResult<Vec<Poly>> {
        self.check_randomness(r)?;
        Ok(self.b0.iter().map(|row| self.row_product(row, r)).collect())
    }

    /// ⟨b_j, r⟩
    pub fn inner(&self, j: usize, r: &[Poly]) -> LatticeResult<Poly> {
        self.check_randomness(r)?;
        let row = self.b.get(j).ok_or(LatticeError::DimensionMismatch {
            context: "Ajtai message slot",
            expected: self.b.len(),
            got: j,
        })?;
        Ok(self.row_product(row, r))
    }

    /// Commit to the first `messages.len()` slots.
    pub fn commit(&self, r: &[Poly], messages: &[Poly]) -> LatticeResult<AjtaiCommitment> {
        if messages.len() > self.b.len() {
            return Err(LatticeError::DimensionMismatch {
                context: "Ajtai messages",
                expected: self.b.len(),
                got: messages.len(),
            });
        }
        let t0 = self.commit_b0(r)?;
        let t = messages
            .iter()
            .enumerate()
            .map(|(j, m)| Ok(self.ring.add(&self.inner(j, r)?, m)))
            .collect::<LatticeResult<Vec<_>>>()?;
        Ok(AjtaiCommitment { t0, t })
    }
}

fn sample_rows<R: Rng>(ring: &RingContext, rows: usize, cols: usize, rng: &mut R) -> Vec<Vec<Poly>> {
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        let row = (0..cols).map(|_| ring.sample_uniform(&mut *rng)).collect();
        out.push(row);
    }
    out
}

// ============================================================================
// Ajtai Commitment
// ============================================================================

/// Commitment output (t0, t_0..t_{n-1}).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AjtaiCommitment {
    /// t0 = B0 · r
    pub t0: Vec<Poly>,
    /// t_j = ⟨b_j, r⟩ + m_j
    pub t: Vec<Poly>,
}

// ============================================================================
// Tests
// ============================================================================
