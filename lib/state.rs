//! Dense state vectors for a register of qubits.
//!
//! An *n*-qubit state is stored as 2<sup>*n*</sup> complex amplitudes indexed
//! by the integer encoding of a computational basis state, where bit *i* of the
//! index is the value of qubit *i*. Memory therefore grows as
//! 2<sup>*n*</sup> × 16 bytes, which caps practical register sizes at
//! [`MAX_QUBITS`].
//!
//! States are treated as values: gate application and measurement (see
//! [`apply`][crate::apply] and [`measure`][crate::measure]) take a `&State` and
//! return a new one. Each state lazily caches its per-basis probabilities so
//! that repeated measurements of the same amplitudes don't recompute them.
//!
//! # Example
//! ```
//! use statevec_sim::{ apply::{ apply_gate, Operation }, gate, state::State };
//!
//! // initialize a new state to ∣00⟩
//! let state = State::new(2).unwrap();
//!
//! // generate a Bell state
//! let state = apply_gate(&state, &Operation::new(gate::HADAMARD.clone(), [0])).unwrap();
//! let state = apply_gate(&state, &Operation::new(gate::CNOT.clone(), [0, 1])).unwrap();
//!
//! assert_eq!(state.to_kets(), "0.7071∣00⟩ + 0.7071∣11⟩");
//! ```

use std::fmt;
use once_cell::sync::OnceCell;
use crate::{
    complex::{ self, Amplitude, C64, ONE, ZERO },
    error::{ DimensionError, Result, SimError },
};

/// Largest supported register size.
pub const MAX_QUBITS: usize = 30;

/// Tolerance on |1 − Σ|*a*|²| for a state to count as normalized.
pub const NORM_TOL: f64 = 1e-9;

/// Amplitudes with magnitude below this are left out of [`State::to_kets`].
pub const KET_EPS: f64 = 1e-10;

/// A pure state of `num_qubits` qubits.
#[derive(Clone, Debug)]
pub struct State {
    num_qubits: usize,
    amps: Vec<C64>,
    probs: OnceCell<Vec<f64>>,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.num_qubits == other.num_qubits && self.amps == other.amps
    }
}

fn check_num_qubits(n: usize) -> Result<()> {
    if n == 0 || n > MAX_QUBITS {
        Err(DimensionError::QubitCount { got: n, max: MAX_QUBITS }.into())
    } else {
        Ok(())
    }
}

impl State {
    /// Create a new state initialized to ∣0...0⟩.
    pub fn new(num_qubits: usize) -> Result<Self> { Self::basis(num_qubits, 0) }

    /// Create a new state initialized to the computational basis state with
    /// integer encoding `index`.
    pub fn basis(num_qubits: usize, index: usize) -> Result<Self> {
        check_num_qubits(num_qubits)?;
        let dim = 1_usize << num_qubits;
        if index >= dim {
            return Err(DimensionError::BasisIndex { index, dim }.into());
        }
        let mut amps: Vec<C64> = vec![ZERO; dim];
        amps[index] = ONE;
        Ok(Self::from_raw(num_qubits, amps))
    }

    /// Create a state from a full amplitude vector.
    ///
    /// Fails if `amps.len() != 2^num_qubits` or if the vector is not
    /// normalized to within [`NORM_TOL`].
    pub fn from_amplitudes(num_qubits: usize, amps: Vec<C64>) -> Result<Self> {
        check_num_qubits(num_qubits)?;
        let expected = 1_usize << num_qubits;
        if amps.len() != expected {
            return Err(DimensionError::BufferLength {
                expected,
                got: amps.len(),
            }.into());
        }
        let state = Self::from_raw(num_qubits, amps);
        let norm = state.norm_sqr();
        if (norm - 1.0).abs() > NORM_TOL {
            return Err(SimError::NotNormalized(norm));
        }
        Ok(state)
    }

    /// Create a state from an interleaved `[re0, im0, re1, im1, ...]` buffer
    /// of length `2 * 2^num_qubits`.
    pub fn from_interleaved(num_qubits: usize, buf: &[f64]) -> Result<Self> {
        check_num_qubits(num_qubits)?;
        let expected = 2 << num_qubits;
        if buf.len() != expected {
            return Err(DimensionError::BufferLength {
                expected,
                got: buf.len(),
            }.into());
        }
        Self::from_amplitudes(num_qubits, complex::from_interleaved(buf)?)
    }

    // no validation; callers guarantee the length
    pub(crate) fn from_raw(num_qubits: usize, amps: Vec<C64>) -> Self {
        Self { num_qubits, amps, probs: OnceCell::new() }
    }

    /// Return a new state with the same register size and the given
    /// amplitudes, with a fresh probability cache.
    pub(crate) fn with_amplitudes(&self, amps: Vec<C64>) -> Self {
        debug_assert_eq!(amps.len(), self.amps.len());
        Self::from_raw(self.num_qubits, amps)
    }

    /// Return the number of qubits.
    pub fn num_qubits(&self) -> usize { self.num_qubits }

    /// Return the number of basis states, 2<sup>`num_qubits`</sup>.
    pub fn dim(&self) -> usize { self.amps.len() }

    /// Return all amplitudes.
    pub fn amplitudes(&self) -> &[C64] { &self.amps }

    /// Return the amplitude of a single basis state.
    pub fn amplitude(&self, index: usize) -> Option<C64> {
        self.amps.get(index).copied()
    }

    /// Return the amplitudes as an interleaved `[re, im, ...]` buffer.
    pub fn to_interleaved(&self) -> Vec<f64> { complex::to_interleaved(&self.amps) }

    /// Return the per-basis-state probabilities |*a*<sub>*i*</sub>|².
    ///
    /// Computed once per state and cached.
    pub fn probabilities(&self) -> &[f64] {
        self.probs.get_or_init(|| self.amps.iter().map(|a| a.norm_sqr()).collect())
    }

    /// Return `true` if the probability cache has been filled.
    pub fn has_cached_probabilities(&self) -> bool { self.probs.get().is_some() }

    /// Return Σ|*a*<sub>*i*</sub>|².
    pub fn norm_sqr(&self) -> f64 { self.amps.iter().map(|a| a.norm_sqr()).sum() }

    /// Return `true` if Σ|*a*<sub>*i*</sub>|² is within `tol` of 1.
    pub fn is_normalized(&self, tol: f64) -> bool {
        (self.norm_sqr() - 1.0).abs() <= tol
    }

    /// Return |⟨`self`∣`other`⟩|².
    ///
    /// Fails if the two states have different sizes.
    pub fn fidelity(&self, other: &Self) -> Result<f64> {
        if self.num_qubits != other.num_qubits {
            return Err(DimensionError::BufferLength {
                expected: self.dim(),
                got: other.dim(),
            }.into());
        }
        let overlap: C64
            = self.amps.iter().zip(&other.amps)
            .map(|(a, b)| a.conj() * b)
            .sum();
        Ok(overlap.norm_sqr())
    }

    /// Return the label of a basis index as a bit-string, with qubit
    /// `num_qubits - 1` leftmost.
    pub fn label(&self, index: usize) -> String { basis_label(index, self.num_qubits) }

    /// Render the state in ket notation, e.g. `0.7071∣00⟩ + 0.7071∣11⟩`.
    ///
    /// Terms whose amplitude has magnitude below [`KET_EPS`] are omitted;
    /// complex amplitudes with both components nonzero are parenthesized.
    pub fn to_kets(&self) -> String { format!("{}", self) }
}

/// Format a basis index as a bit-string of width `n`, with bit `n - 1`
/// leftmost.
pub fn basis_label(index: usize, n: usize) -> String {
    format!("{:0width$b}", index, width = n)
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, a) in self.amps.iter().enumerate() {
            if a.norm() < KET_EPS { continue; }
            let amp = Amplitude(*a);
            let both = a.re.abs() >= 5e-5 && a.im.abs() >= 5e-5;
            let term
                = if both { format!("({})", amp) } else { amp.to_string() };
            let (sep, body): (&str, &str)
                = if first {
                    ("", term.as_str())
                } else if let Some(rest) = term.strip_prefix('-') {
                    (" - ", rest)
                } else {
                    (" + ", term.as_str())
                };
            write!(f, "{}{}∣{}⟩", sep, body, self.label(k))?;
            first = false;
        }
        if first { write!(f, "0")?; }
        Ok(())
    }
}
