//! Error types for state construction, gate application, measurement, and
//! circuit execution.
//!
//! Structural problems (bad dimensions, bad indices, malformed operations) are
//! always detected before any amplitude is touched, so an `Err` never comes
//! with a half-updated state.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// All errors produced by the simulator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimError {
    /// A size or shape is inconsistent with the register it belongs to.
    #[error("invalid dimension: {0}")]
    InvalidDimension(#[from] DimensionError),

    /// A target, control, or measured qubit index lies outside the register.
    #[error("qubit index {index} out of range for a {num_qubits}-qubit register")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Size of the register.
        num_qubits: usize,
    },

    /// A qubit appears more than once among an operation's targets and
    /// controls.
    #[error("qubit {0} appears more than once in a single operation")]
    DuplicateQubit(usize),

    /// The number of targets and controls cannot be matched to the gate's
    /// arity.
    #[error(
        "gate {gate} (arity {arity}) cannot act on {targets} target(s) \
        with {controls} control(s)"
    )]
    UnsupportedOperationShape {
        gate: String,
        arity: usize,
        targets: usize,
        controls: usize,
    },

    /// A measurement outcome with (numerically) zero probability was
    /// selected, so the collapsed state cannot be renormalized.
    #[error("outcome {outcome} on qubit {qubit} has vanishing probability {prob:e}")]
    DegenerateCollapse {
        qubit: usize,
        outcome: u8,
        prob: f64,
    },

    /// A gate matrix failed the unitarity check.
    #[error("matrix for gate {name} is not unitary (max deviation {deviation:e})")]
    NonUnitary {
        name: String,
        deviation: f64,
    },

    /// A state's squared norm drifted away from 1.
    #[error("state is not normalized: squared norm {0}")]
    NotNormalized(f64),

    /// No catalog entry matches the requested name or symbol.
    #[error("unknown gate {0:?}")]
    UnknownGate(String),

    /// A catalog gate was requested with the wrong number of parameters.
    #[error("gate {gate} expects {expected} parameter(s), got {got}")]
    InvalidParameters {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Execution was cancelled between two gate applications.
    #[error("cancelled after {completed} of {total} operations")]
    Cancelled {
        completed: usize,
        total: usize,
    },

    /// The configured time limit ran out between two gate applications.
    #[error("timed out after {completed} of {total} operations")]
    TimedOut {
        completed: usize,
        total: usize,
    },
}

/// Details for [`SimError::InvalidDimension`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DimensionError {
    /// Qubit count is zero or too large to allocate.
    #[error("qubit count {got} not in 1..={max}")]
    QubitCount { got: usize, max: usize },

    /// An amplitude buffer does not have the length implied by the qubit
    /// count.
    #[error("buffer length {got} does not match expected length {expected}")]
    BufferLength { expected: usize, got: usize },

    /// A gate matrix is not square with a power-of-two side.
    #[error("gate matrix of shape {rows} × {cols} is not 2^k × 2^k")]
    MatrixShape { rows: usize, cols: usize },

    /// A classical bit index lies beyond the widest supported register.
    #[error("classical bit {index} out of range for a register of at most {max} bits")]
    ClassicalBit { index: usize, max: usize },

    /// Two measurement assignments write the same classical bit.
    #[error("classical bit {0} is assigned more than once")]
    DuplicateClassicalBit(usize),

    /// A basis index lies outside the state space.
    #[error("basis index {index} out of range for dimension {dim}")]
    BasisIndex { index: usize, dim: usize },
}
