//! Error types for ring arithmetic, relation assembly and the proof protocol

use thiserror::Error;

/// Errors raised by the ring context and the algebraic containers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatticeError {
    /// Ring degree must be a power of two.
    #[error("ring degree must be a power of two, got {0}")]
    DegreeNotPowerOfTwo(usize),

    /// A modulus of the chain does not admit a negacyclic NTT of this degree.
    #[error("modulus {q} is not NTT-friendly for degree {degree} (need q ≡ 1 mod 2d, q prime)")]
    NotNttFriendly { q: u64, degree: usize },

    /// Empty or otherwise unusable modulus chain.
    #[error("invalid modulus chain: {0}")]
    InvalidModulusChain(&'static str),

    /// Operand shapes disagree.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Rebasing is only lossless towards a divisor degree over the same chain.
    #[error("cannot rebase from degree {from} to degree {to}")]
    IncompatibleRebase { from: usize, to: usize },

    /// A block does not fit the row/column sizes of its partition cell.
    #[error("block at ({row}, {col}) has shape {got:?}, partition expects {expected:?}")]
    BlockShape {
        row: usize,
        col: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Block index outside the partition grid.
    #[error("block index ({row}, {col}) outside a {rows}×{cols} partition")]
    BlockOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// The automorphism group parameters are not usable for this degree.
    #[error("invalid automorphism parameters: degree {degree}, repetition rate {k}")]
    InvalidAutomorphism { degree: usize, k: usize },
}

/// Errors raised while assembling linear relations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelationError {
    /// A term's matrix height does not match the equation height.
    #[error("term matrix has {got} rows, equation has {expected}")]
    TermRows { expected: usize, got: usize },

    /// A term's vector does not match its matrix width.
    #[error("term vector has size {got}, matrix has {expected} columns")]
    TermCols { expected: usize, got: usize },

    /// Term index outside the equation.
    #[error("term {index} does not exist (equation has {len} terms)")]
    NoSuchTerm { index: usize, len: usize },

    /// A dependent term points at a column block that was never produced.
    #[error("equation {equation}, term {term}: dependency on column block {index} cannot be resolved")]
    UnresolvedDependency {
        equation: usize,
        term: usize,
        index: usize,
    },

    /// A dependent equation cannot compute its own left-hand side.
    #[error("equation depends on external vectors; its lhs cannot be recomputed before resolution")]
    DependentLhs,

    /// The assembled system does not satisfy A·S = U.
    #[error("relation does not hold: A·S != U")]
    InvalidRelation,

    /// A statement without witness was asked to absorb an independent term.
    #[error("term {term} introduces a witness block; a bare statement only accepts dependent terms")]
    WitnessRequired { term: usize },

    /// Polynomial evaluation prefix exceeds the witness.
    #[error("evaluation prefix {prefix} exceeds witness size {size}")]
    PrefixTooLong { prefix: usize, size: usize },

    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

/// Errors raised by the proof protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// Protocol settings violate a constraint.
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),

    /// A protocol step was invoked out of order.
    #[error("protocol step {step} invoked in phase {phase}")]
    OutOfOrder {
        step: &'static str,
        phase: &'static str,
    },

    /// Message dimensions do not match the public parameters.
    #[error("malformed message: {0}")]
    MalformedMessage(&'static str),

    /// The witness does not fit the public parameters.
    #[error("witness has {got} splits, public parameters allow {expected}")]
    WitnessShape { expected: usize, got: usize },

    /// Rejection sampling refused the masked opening; retry with fresh masks.
    #[error("masked opening in round {round} exceeds bound ({norm} >= {bound})")]
    BoundExceeded { round: usize, norm: u64, bound: u64 },

    /// Retry budget exhausted without an accepted opening.
    #[error("no acceptable masked opening after {attempts} attempts")]
    BoundNotAchieved { attempts: usize },

    #[error(transparent)]
    Lattice(#[from] LatticeError),

    #[error(transparent)]
    Relation(#[from] RelationError),
}

impl ProofError {
    /// Whether the session may be restarted with fresh randomness.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProofError::BoundExceeded { .. })
    }
}

/// Errors of the matrix persistence format.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a persisted matrix.
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Persisted data does not match the requested ring or shape.
    #[error("persisted data mismatch: {0}")]
    Mismatch(String),
}

/// Result alias for lattice operations.
pub type LatticeResult<T> = Result<T, LatticeError>;
