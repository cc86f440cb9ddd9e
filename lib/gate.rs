//! Unitary gates acting on one or more qubits.
//!
//! A [`Gate`] carries its full 2<sup>*k*</sup> × 2<sup>*k*</sup> matrix for
//! arity *k*. For multi-qubit gates, rows and columns are indexed by a *k*-bit
//! pattern in which the **first** listed qubit is the most significant bit, so
//! that e.g. [`CNOT`] acting on `[control, target]` has the usual textbook
//! matrix
//! ```text
//! 1 0 0 0
//! 0 1 0 0
//! 0 0 0 1
//! 0 0 1 0
//! ```
//!
//! Fixed gates are process-wide statics initialized on first use; parametrized
//! gates are built on demand by [`rx`], [`ry`], [`rz`], [`phase`], and [`u`].
//!
//! See also: <https://en.wikipedia.org/wiki/List_of_quantum_logic_gates>

use std::fmt;
use nalgebra as na;
use once_cell::sync::Lazy;
use crate::{
    complex::{ C64, I, ONE, ZERO, polar },
    error::{ DimensionError, Result, SimError },
};

/// Largest number of qubits a single gate matrix may act on.
pub const MAX_GATE_ARITY: usize = 3;

/// Tolerance on the entries of *U*<sup>†</sup>*U* − *I* for a matrix to be
/// accepted as unitary.
pub const UNITARY_TOL: f64 = 1e-9;

/// A named unitary operator on `arity` qubits.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    name: String,
    arity: usize,
    matrix: na::DMatrix<C64>,
    symbol: String,
    description: String,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Gate {
    /// Create a new gate from its matrix, inferring the arity from the matrix
    /// size.
    ///
    /// Fails if the matrix is not 2<sup>*k*</sup> × 2<sup>*k*</sup> for some
    /// 1 ≤ *k* ≤ [`MAX_GATE_ARITY`], or if it is not unitary to within
    /// [`UNITARY_TOL`].
    pub fn new<N, S, D>(name: N, symbol: S, description: D, matrix: na::DMatrix<C64>)
        -> Result<Self>
    where
        N: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        let (rows, cols) = matrix.shape();
        let arity = rows.trailing_zeros() as usize;
        if rows != cols
            || !rows.is_power_of_two()
            || !(1..=MAX_GATE_ARITY).contains(&arity)
        {
            return Err(DimensionError::MatrixShape { rows, cols }.into());
        }
        let gate = Self::new_unchecked(name, symbol, description, matrix);
        let deviation = gate.unitarity_deviation();
        if deviation > UNITARY_TOL {
            return Err(SimError::NonUnitary { name: gate.name, deviation });
        }
        Ok(gate)
    }

    // for matrices that are unitary by construction
    pub(crate) fn new_unchecked<N, S, D>(
        name: N,
        symbol: S,
        description: D,
        matrix: na::DMatrix<C64>,
    ) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        let arity = matrix.nrows().trailing_zeros() as usize;
        Self {
            name: name.into(),
            arity,
            matrix,
            symbol: symbol.into(),
            description: description.into(),
        }
    }

    fn from_rows(
        name: &str,
        symbol: &str,
        description: &str,
        entries: &[C64],
    ) -> Self
    {
        let dim = (entries.len() as f64).sqrt() as usize;
        Self::new_unchecked(
            name,
            symbol,
            description,
            na::DMatrix::from_row_slice(dim, dim, entries),
        )
    }

    /// Return the gate's name, e.g. `"CNOT"` or `"RX(1.571)"`.
    pub fn name(&self) -> &str { &self.name }

    /// Return the short display symbol.
    pub fn symbol(&self) -> &str { &self.symbol }

    /// Return the human-readable description.
    pub fn description(&self) -> &str { &self.description }

    /// Return the number of qubits the gate acts on.
    pub fn arity(&self) -> usize { self.arity }

    /// Return the side length of the matrix, 2<sup>`arity`</sup>.
    pub fn dim(&self) -> usize { 1 << self.arity }

    /// Return a reference to the gate matrix.
    pub fn matrix(&self) -> &na::DMatrix<C64> { &self.matrix }

    /// Return the matrix element ⟨`row`∣*U*∣`col`⟩.
    pub fn entry(&self, row: usize, col: usize) -> C64 { self.matrix[(row, col)] }

    /// Return the largest entry-wise deviation of *U*<sup>†</sup>*U* from the
    /// identity.
    pub fn unitarity_deviation(&self) -> f64 {
        let dim = self.matrix.nrows();
        let prod = self.matrix.adjoint() * &self.matrix;
        let eye: na::DMatrix<C64> = na::DMatrix::identity(dim, dim);
        (prod - eye).iter()
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }

    /// Return the Hermitian adjoint of `self`, named with a trailing `†`.
    pub fn dagger(&self) -> Self {
        Self::new_unchecked(
            format!("{}†", self.name),
            format!("{}†", self.symbol),
            format!("Adjoint of {}", self.name),
            self.matrix.adjoint(),
        )
    }
}

/// Identity.
pub static ID: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("I", "I", "Identity", &[ONE, ZERO, ZERO, ONE])
});

/// π rotation about X.
pub static PAULI_X: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("X", "X", "Pauli X (bit flip)", &[ZERO, ONE, ONE, ZERO])
});

/// π rotation about Y.
pub static PAULI_Y: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("Y", "Y", "Pauli Y", &[ZERO, -I, I, ZERO])
});

/// π rotation about Z.
pub static PAULI_Z: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("Z", "Z", "Pauli Z (phase flip)", &[ONE, ZERO, ZERO, -ONE])
});

/// Hadamard.
pub static HADAMARD: Lazy<Gate> = Lazy::new(|| {
    use std::f64::consts::FRAC_1_SQRT_2;
    let h = C64::from(FRAC_1_SQRT_2);
    Gate::from_rows(
        "H",
        "H",
        "Hadamard: maps ∣0⟩ and ∣1⟩ to equal superpositions",
        &[h, h, h, -h],
    )
});

/// π/2 rotation about Z.
pub static S: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("S", "S", "Phase gate, Z(π/2)", &[ONE, ZERO, ZERO, I])
});

/// −π/2 rotation about Z.
pub static SDG: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows("SDG", "S†", "Inverse phase gate, Z(−π/2)", &[ONE, ZERO, ZERO, -I])
});

/// π/4 rotation about Z.
pub static T: Lazy<Gate> = Lazy::new(|| {
    use std::f64::consts::FRAC_PI_4;
    Gate::from_rows(
        "T", "T", "π/8 gate, Z(π/4)", &[ONE, ZERO, ZERO, polar(1.0, FRAC_PI_4)])
});

/// −π/4 rotation about Z.
pub static TDG: Lazy<Gate> = Lazy::new(|| {
    use std::f64::consts::FRAC_PI_4;
    Gate::from_rows(
        "TDG", "T†", "Inverse π/8 gate, Z(−π/4)",
        &[ONE, ZERO, ZERO, polar(1.0, -FRAC_PI_4)],
    )
});

/// Z-controlled π rotation about X.
///
/// The first qubit is the control.
pub static CNOT: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows(
        "CNOT",
        "CX",
        "Controlled NOT: flips the target when the control is ∣1⟩",
        &[
            ONE,  ZERO, ZERO, ZERO,
            ZERO, ONE,  ZERO, ZERO,
            ZERO, ZERO, ZERO, ONE,
            ZERO, ZERO, ONE,  ZERO,
        ],
    )
});

/// Z-controlled π rotation about Z.
pub static CZ: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows(
        "CZ",
        "CZ",
        "Controlled Z: flips the phase of ∣11⟩",
        &[
            ONE,  ZERO, ZERO, ZERO,
            ZERO, ONE,  ZERO, ZERO,
            ZERO, ZERO, ONE,  ZERO,
            ZERO, ZERO, ZERO, -ONE,
        ],
    )
});

/// Swap.
pub static SWAP: Lazy<Gate> = Lazy::new(|| {
    Gate::from_rows(
        "SWAP",
        "×",
        "Exchanges the states of two qubits",
        &[
            ONE,  ZERO, ZERO, ZERO,
            ZERO, ZERO, ONE,  ZERO,
            ZERO, ONE,  ZERO, ZERO,
            ZERO, ZERO, ZERO, ONE,
        ],
    )
});

/// Doubly controlled NOT.
///
/// The first two qubits are the controls.
pub static TOFFOLI: Lazy<Gate> = Lazy::new(|| {
    let mut m: na::DMatrix<C64> = na::DMatrix::identity(8, 8);
    m[(6, 6)] = ZERO;
    m[(7, 7)] = ZERO;
    m[(6, 7)] = ONE;
    m[(7, 6)] = ONE;
    Gate::new_unchecked(
        "TOFFOLI",
        "CCX",
        "Toffoli: flips the target when both controls are ∣1⟩",
        m,
    )
});

/// Rotation by `theta` about X.
pub fn rx(theta: f64) -> Gate {
    let (s, c) = (theta / 2.0).sin_cos();
    let c = C64::from(c);
    let mis = C64::new(0.0, -s);
    Gate::from_rows(
        &format!("RX({:.3})", theta),
        "RX",
        "Rotation about the X axis",
        &[c, mis, mis, c],
    )
}

/// Rotation by `theta` about Y.
pub fn ry(theta: f64) -> Gate {
    let (s, c) = (theta / 2.0).sin_cos();
    Gate::from_rows(
        &format!("RY({:.3})", theta),
        "RY",
        "Rotation about the Y axis",
        &[c.into(), (-s).into(), s.into(), c.into()],
    )
}

/// Rotation by `theta` about Z.
pub fn rz(theta: f64) -> Gate {
    Gate::from_rows(
        &format!("RZ({:.3})", theta),
        "RZ",
        "Rotation about the Z axis",
        &[polar(1.0, -theta / 2.0), ZERO, ZERO, polar(1.0, theta / 2.0)],
    )
}

/// Relative phase `lambda` on ∣1⟩.
pub fn phase(lambda: f64) -> Gate {
    Gate::from_rows(
        &format!("P({:.3})", lambda),
        "P",
        "Phase shift on ∣1⟩",
        &[ONE, ZERO, ZERO, polar(1.0, lambda)],
    )
}

/// Generic single-qubit unitary
/// ```text
/// U(θ, φ, λ) = [ cos(θ/2)          −e^{iλ} sin(θ/2)     ]
///              [ e^{iφ} sin(θ/2)    e^{i(φ+λ)} cos(θ/2) ]
/// ```
pub fn u(theta: f64, phi: f64, lambda: f64) -> Gate {
    let (s, c) = (theta / 2.0).sin_cos();
    Gate::from_rows(
        &format!("U({:.3},{:.3},{:.3})", theta, phi, lambda),
        "U",
        "Generic single-qubit unitary",
        &[
            c.into(),              -polar(s, lambda),
            polar(s, phi),          polar(c, phi + lambda),
        ],
    )
}
