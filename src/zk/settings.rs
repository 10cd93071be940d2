//! Protocol settings and public parameters
//!
//! [`Settings`] fixes the dimensions and distributions of one proof system.
//! [`PublicParams`] binds them to a ring and to the shape of one witness and
//! carries the commitment key both parties share.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commit::AjtaiKey;
use crate::error::ProofError;
use crate::lattice::challenge::challenge_space_bits;
use crate::lattice::ring::RingContext;
use crate::lattice::trace::Automorphism;
use crate::relation::ImmutLinearRelation;

/// Smallest accepted log₂ of the challenge space C(d, ω)·2^ω.
pub const MIN_CHALLENGE_BITS: u64 = 24;

/// Dimensions and distributions of the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Repetition rate: order of the automorphism σ and number of masks y_i.
    pub k: usize,
    /// Rows of B0.
    pub b0_rows: usize,
    /// Length κ of the commitment randomness r.
    pub kappa: usize,
    /// Non-zero coefficients of a challenge.
    pub omega: usize,
    /// Width of the Gaussian masks y_i.
    pub sigma: f64,
    /// Exclusive ℓ∞ bound on every z_i.
    pub bound: u64,
    /// Sessions tried before giving up on rejection sampling.
    pub max_attempts: usize,
}

impl Settings {
    /// Small parameters for tests and examples; not secure.
    pub const TOY: Settings = Settings {
        k: 4,
        b0_rows: 2,
        kappa: 6,
        omega: 8,
        sigma: 4096.0,
        bound: 32768,
        max_attempts: 8,
    };

    pub const STANDARD: Settings = Settings {
        k: 4,
        b0_rows: 8,
        kappa: 20,
        omega: 32,
        sigma: 131072.0,
        bound: 1 << 20,
        max_attempts: 32,
    };

    /// Check the settings against a ring degree.
    pub fn validate(&self, degree: usize) -> Result<(), ProofError> {
        if Automorphism::new(degree, self.k).is_err() {
            return Err(ProofError::InvalidSettings(
                "k must be a power of two with k | d and k² | 2d",
            ));
        }
        if self.b0_rows == 0 {
            return Err(ProofError::InvalidSettings("b0_rows must be > 0"));
        }
        if self.kappa == 0 {
            return Err(ProofError::InvalidSettings("kappa must be > 0"));
        }
        if self.omega == 0 || self.omega > degree {
            return Err(ProofError::InvalidSettings("omega must be in [1, d]"));
        }
        if challenge_space_bits(degree, self.omega) < MIN_CHALLENGE_BITS {
            return Err(ProofError::InvalidSettings("challenge space too small for d and omega"));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(ProofError::InvalidSettings("sigma must be positive"));
        }
        // ‖σ^i(c)·r‖∞ ≤ ω, so honest openings need room above that.
        if self.bound <= self.omega as u64 {
            return Err(ProofError::InvalidSettings("bound must exceed omega"));
        }
        if self.max_attempts == 0 {
            return Err(ProofError::InvalidSettings("max_attempts must be > 0"));
        }
        Ok(())
    }
}

/// Everything both parties agree on before a session starts.
#[derive(Clone, Debug)]
pub struct PublicParams {
    ring: Arc<RingContext>,
    settings: Settings,
    automorphism: Automorphism,
    num_splits: usize,
    ternary_splits: usize,
    key: AjtaiKey,
}

impl PublicParams {
    /// Parameters for witnesses of `num_splits` ring elements, the first
    /// `ternary_splits` of which are proven to have digits in {0, 1, 2}.
    ///
    /// The commitment key is derived from `seed`.
    pub fn generate(
        ring: &Arc<RingContext>,
        settings: Settings,
        num_splits: usize,
        ternary_splits: usize,
        seed: &[u8],
    ) -> Result<Self, ProofError> {
        settings.validate(ring.degree())?;
        if num_splits == 0 {
            return Err(ProofError::InvalidSettings("witness must have at least one split"));
        }
        if ternary_splits > num_splits {
            return Err(ProofError::InvalidSettings("ternary_splits exceeds num_splits"));
        }
        let automorphism = Automorphism::new(ring.degree(), settings.k)?;
        // b_0..b_{m-1} for the splits, b_m for g, b_{m+1} and b_{m+2} for the
        // cubic garbage terms.
        let key = AjtaiKey::from_seed(ring, settings.b0_rows, settings.kappa, num_splits + 3, seed);

        debug!(
            degree = ring.degree(),
            num_splits,
            ternary_splits,
            k = settings.k,
            kappa = settings.kappa,
            "generated public parameters"
        );
        Ok(Self {
            ring: Arc::clone(ring),
            settings,
            automorphism,
            num_splits,
            ternary_splits,
            key,
        })
    }

    /// Parameters sized for `relation`, with the first `ternary_splits`
    /// splits under the digit proof.
    pub fn for_relation(
        relation: &ImmutLinearRelation,
        settings: Settings,
        ternary_splits: usize,
        seed: &[u8],
    ) -> Result<Self, ProofError> {
        let ring = relation.ring();
        let num_splits = relation.s().len().div_ceil(ring.degree());
        Self::generate(ring, settings, num_splits, ternary_splits, seed)
    }

    pub fn ring(&self) -> &Arc<RingContext> {
        &self.ring
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn automorphism(&self) -> &Automorphism {
        &self.automorphism
    }

    /// Ring elements m the witness is cut into.
    pub fn num_splits(&self) -> usize {
        self.num_splits
    }

    pub fn ternary_splits(&self) -> usize {
        self.ternary_splits
    }

    pub fn key(&self) -> &AjtaiKey {
        &self.key
    }
}

/// Parameters sized for `relation` with every split under the digit proof.
pub fn generate_public_parameters(
    relation: &ImmutLinearRelation,
    settings: Settings,
    seed: &[u8],
) -> Result<PublicParams, ProofError> {
    let num_splits = relation.s().len().div_ceil(relation.ring().degree());
    PublicParams::for_relation(relation, settings, num_splits, seed)
}
