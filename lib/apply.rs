//! Application of gates to dense state vectors.
//!
//! An [`Operation`] pairs a [`Gate`] with the qubits it acts on. Each
//! application validates the operation against the register, then dispatches on
//! the operation's shape:
//!
//! 1. one target, no controls, single-qubit gate: pairwise update of the
//!    amplitudes that differ only in the target bit
//! 1. two targets, no controls, two-qubit gate: 4 × 4 block update
//! 1. the standard `CNOT` with one control and one target: permutation of
//!    amplitudes
//! 1. anything else (controlled gates, three-qubit gates, multiple controls):
//!    2<sup>*k*</sup> × 2<sup>*k*</sup> block update over the acting qubits,
//!    restricted to basis states whose control bits are all set
//!
//! All paths write into a new buffer and leave the input state untouched.
//!
//! Operations may name their controls in one of two ways. If the number of
//! targets equals the gate's arity, the gate acts on the targets and the
//! controls condition it, so that e.g. `X` with controls `[0, 1]` and target
//! `[2]` is a Toffoli gate. Otherwise, if the targets and controls together
//! match the arity, the gate is taken to act on the controls followed by the
//! targets, so that `CNOT` with control `[0]` and target `[1]` is the same as
//! `CNOT` on targets `[0, 1]`.

use itertools::Itertools;
use nalgebra as na;
use rayon::prelude::*;
use crate::{
    catalog::catalog,
    complex::{ C64, ZERO },
    error::{ Result, SimError },
    gate::{ Gate, CNOT },
    state::State,
};

// state vectors at least this long are updated in parallel blocks
const PAR_MIN_DIM: usize = 1 << 14;

/// A gate together with the qubits it acts on.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// The gate.
    pub gate: Gate,
    /// Qubits acted on, in the order of the gate's matrix pattern bits (first
    /// is most significant).
    pub targets: Vec<usize>,
    /// Qubits that must all be ∣1⟩ for the gate to act.
    pub controls: Vec<usize>,
    /// Numeric parameters the gate was built from, if any.
    pub params: Vec<f64>,
}

/// How an [`Operation`] is carried out, as determined by [`Operation::shape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Single-qubit gate on one target.
    Single(usize),
    /// Two-qubit gate on two targets; the first is the high pattern bit.
    Two(usize, usize),
    /// Bit flip on `target` when `control` is set.
    Cnot { control: usize, target: usize },
    /// General gate on `acting`, conditioned on `controls`.
    General { acting: Vec<usize>, controls: Vec<usize> },
}

impl Operation {
    /// Create a new uncontrolled operation.
    pub fn new<T>(gate: Gate, targets: T) -> Self
    where T: IntoIterator<Item = usize>
    {
        Self {
            gate,
            targets: targets.into_iter().collect(),
            controls: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add control qubits.
    pub fn with_controls<C>(mut self, controls: C) -> Self
    where C: IntoIterator<Item = usize>
    {
        self.controls.extend(controls);
        self
    }

    /// Build an operation from a [catalog][crate::catalog] entry, resolving
    /// parametrized gates from `params`.
    pub fn from_catalog<T, C>(key: &str, targets: T, controls: C, params: &[f64])
        -> Result<Self>
    where
        T: IntoIterator<Item = usize>,
        C: IntoIterator<Item = usize>,
    {
        let gate = catalog().resolve(key, params)?;
        let mut op = Self::new(gate, targets).with_controls(controls);
        op.params = params.to_vec();
        Ok(op)
    }

    /// Iterate over all qubits involved, controls first.
    pub fn qubits(&self) -> impl Iterator<Item = usize> + '_ {
        self.controls.iter().chain(self.targets.iter()).copied()
    }

    // the permutation path is only valid for the exact CNOT matrix
    fn is_standard_cnot(&self) -> bool {
        self.gate.name() == "CNOT" && self.gate.matrix() == CNOT.matrix()
    }

    /// Validate `self` against a register of `num_qubits` qubits and determine
    /// how it is to be applied.
    pub fn shape(&self, num_qubits: usize) -> Result<Shape> {
        if let Some(index) = self.qubits().find(|&q| q >= num_qubits) {
            return Err(SimError::IndexOutOfRange { index, num_qubits });
        }
        if let Some(q) = self.qubits().duplicates().next() {
            return Err(SimError::DuplicateQubit(q));
        }

        let arity = self.gate.arity();
        let ntarg = self.targets.len();
        let nctrl = self.controls.len();
        let unsupported = || SimError::UnsupportedOperationShape {
            gate: self.gate.name().to_string(),
            arity,
            targets: ntarg,
            controls: nctrl,
        };
        if ntarg == 0 { return Err(unsupported()); }

        let shape
            = match (arity, ntarg, nctrl) {
                (1, 1, 0) => Shape::Single(self.targets[0]),
                (2, 2, 0) => Shape::Two(self.targets[0], self.targets[1]),
                (2, 1, 1) if self.is_standard_cnot() => Shape::Cnot {
                    control: self.controls[0],
                    target: self.targets[0],
                },
                (a, t, _) if a == t => Shape::General {
                    acting: self.targets.clone(),
                    controls: self.controls.clone(),
                },
                (a, t, c) if a == t + c => Shape::General {
                    acting: self.qubits().collect(),
                    controls: Vec::new(),
                },
                _ => { return Err(unsupported()); },
            };
        Ok(shape)
    }
}

/// Apply a single operation, returning the new state.
///
/// The operation is fully validated before any amplitude is computed.
pub fn apply_gate(state: &State, op: &Operation) -> Result<State> {
    let shape = op.shape(state.num_qubits())?;
    Ok(apply_shaped(state, &op.gate, &shape))
}

/// Apply a series of operations in order, returning the final state.
///
/// Every operation is validated before the first one is applied.
pub fn apply_all<'a, I>(state: &State, ops: I) -> Result<State>
where I: IntoIterator<Item = &'a Operation>
{
    let shaped: Vec<(&Operation, Shape)>
        = ops.into_iter()
        .map(|op| op.shape(state.num_qubits()).map(|sh| (op, sh)))
        .collect::<Result<_>>()?;
    let mut acc = state.clone();
    for (op, shape) in shaped.iter() {
        acc = apply_shaped(&acc, &op.gate, shape);
    }
    Ok(acc)
}

// `shape` must come from validating an operation on `gate` against `state`
pub(crate) fn apply_shaped(state: &State, gate: &Gate, shape: &Shape) -> State {
    let amps = state.amplitudes();
    let new
        = match shape {
            Shape::Single(t) => apply_single(amps, gate.matrix(), *t),
            Shape::Two(a, b) => apply_two(amps, gate.matrix(), *a, *b),
            Shape::Cnot { control, target } => apply_cnot(amps, *control, *target),
            Shape::General { acting, controls } => {
                apply_general(amps, gate.matrix(), acting, controls)
            },
        };
    state.with_amplitudes(new)
}

// basis states pair up across blocks of length 2 * mask: within a block, index
// j has the target bit clear and j + mask has it set
fn single_block(m: &[C64; 4], mask: usize, inb: &[C64], outb: &mut [C64]) {
    let (in0, in1) = inb.split_at(mask);
    let (out0, out1) = outb.split_at_mut(mask);
    for (((a0, a1), o0), o1) in
        in0.iter().zip(in1).zip(out0.iter_mut()).zip(out1.iter_mut())
    {
        *o0 = m[0] * a0 + m[1] * a1;
        *o1 = m[2] * a0 + m[3] * a1;
    }
}

fn apply_single(amps: &[C64], mat: &na::DMatrix<C64>, target: usize) -> Vec<C64> {
    let m: [C64; 4] = [mat[(0, 0)], mat[(0, 1)], mat[(1, 0)], mat[(1, 1)]];
    let mask: usize = 1 << target;
    let mut out: Vec<C64> = vec![ZERO; amps.len()];
    if amps.len() >= PAR_MIN_DIM {
        out.par_chunks_mut(2 * mask)
            .zip(amps.par_chunks(2 * mask))
            .for_each(|(outb, inb)| single_block(&m, mask, inb, outb));
    } else {
        out.chunks_mut(2 * mask)
            .zip(amps.chunks(2 * mask))
            .for_each(|(outb, inb)| single_block(&m, mask, inb, outb));
    }
    out
}

fn apply_two(amps: &[C64], mat: &na::DMatrix<C64>, a: usize, b: usize) -> Vec<C64> {
    let mut m: [[C64; 4]; 4] = [[ZERO; 4]; 4];
    for (q, row) in m.iter_mut().enumerate() {
        for (p, mqp) in row.iter_mut().enumerate() { *mqp = mat[(q, p)]; }
    }
    let ma: usize = 1 << a;
    let mb: usize = 1 << b;
    let mut out: Vec<C64> = vec![ZERO; amps.len()];
    for (i, amp) in amps.iter().enumerate() {
        if *amp == ZERO { continue; }
        let p: usize
            = (usize::from(i & ma != 0) << 1) | usize::from(i & mb != 0);
        for (q, row) in m.iter().enumerate() {
            let diff = p ^ q;
            let mut dest = i;
            if diff & 0b10 != 0 { dest ^= ma; }
            if diff & 0b01 != 0 { dest ^= mb; }
            out[dest] += row[p] * amp;
        }
    }
    out
}

fn apply_cnot(amps: &[C64], control: usize, target: usize) -> Vec<C64> {
    let mc: usize = 1 << control;
    let mt: usize = 1 << target;
    let mut out: Vec<C64> = amps.to_vec();
    for i in 0..out.len() {
        if i & mc != 0 && i & mt == 0 { out.swap(i, i | mt); }
    }
    out
}

fn apply_general(
    amps: &[C64],
    mat: &na::DMatrix<C64>,
    acting: &[usize],
    controls: &[usize],
) -> Vec<C64>
{
    let k = acting.len();
    let dim = 1_usize << k;
    let cmask: usize = controls.iter().fold(0, |acc, c| acc | (1_usize << c));
    // offsets[q] sets the acting bits of the state index to pattern q
    let offsets: Vec<usize>
        = (0..dim)
        .map(|q| {
            acting.iter().enumerate()
                .filter(|(j, _)| q & (1_usize << (k - 1 - j)) != 0)
                .fold(0, |acc, (_, t)| acc | (1_usize << t))
        })
        .collect();
    let amask: usize = offsets[dim - 1];
    let mut out: Vec<C64> = vec![ZERO; amps.len()];
    for (i, amp) in amps.iter().enumerate() {
        if i & cmask != cmask {
            out[i] = *amp;
            continue;
        }
        if *amp == ZERO { continue; }
        let p: usize
            = acting.iter()
            .fold(0, |acc, t| (acc << 1) | usize::from(i & (1_usize << t) != 0));
        let base = i & !amask;
        for (q, offs) in offsets.iter().enumerate() {
            out[base | offs] += mat[(q, p)] * amp;
        }
    }
    out
}
