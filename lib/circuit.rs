//! Circuit descriptions and their execution.
//!
//! A [`Circuit`] is an ordered list of [`Operation`]s on a fixed number of
//! qubits, together with an ordered list of assignments from qubits to
//! classical bits. Running a circuit starts from ∣0...0⟩, applies every
//! operation in order, and then, depending on the number of shots requested,
//! measures nothing (0), measures each assigned qubit once in sequence (1), or
//! samples the final state repeatedly (>1).
//!
//! ```
//! use statevec_sim::circuit::{ run_circuit_with, Circuit, SimConfig };
//!
//! let mut circuit = Circuit::new("bell", 2);
//! circuit.h(0).cnot(0, 1);
//! let config = SimConfig { seed: Some(10546), ..SimConfig::default() };
//! let res = run_circuit_with(&circuit, 1000, &config).unwrap();
//! assert_eq!(res.measurements.len(), 2);
//! assert!(res.measurements.contains_key("00"));
//! assert!(res.measurements.contains_key("11"));
//! ```
//!
//! Independent circuits can be run in parallel with [`run_batch`].

use std::{
    sync::atomic::{ AtomicBool, Ordering },
    time::{ Duration, Instant },
};
use itertools::Itertools;
use rand::{ rngs::StdRng, Rng, SeedableRng };
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{ debug, trace };
use crate::{
    apply::{ apply_shaped, Operation, Shape },
    error::{ DimensionError, Result, SimError },
    gate::{ self, Gate },
    measure::{ self, Counts, MeasurementRecord },
    state::{ State, MAX_QUBITS, NORM_TOL },
};

/// Largest supported classical register width.
pub const MAX_CBITS: usize = usize::BITS as usize;

/// Record the outcome of measuring `qubit` in classical bit `cbit`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeasurementAssignment {
    pub qubit: usize,
    pub cbit: usize,
}

/// A quantum circuit on a fixed register.
#[derive(Clone, Debug, PartialEq)]
pub struct Circuit {
    /// Identifier carried through to the [`SimulationResult`].
    pub id: String,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Operations, in application order.
    pub ops: Vec<Operation>,
    /// Measurement assignments, in measurement order. If empty, every qubit
    /// `k` is measured into classical bit `k`.
    pub measurements: Vec<MeasurementAssignment>,
}

impl Circuit {
    /// Create a new, empty circuit.
    pub fn new<S>(id: S, num_qubits: usize) -> Self
    where S: Into<String>
    {
        Self {
            id: id.into(),
            num_qubits,
            ops: Vec::new(),
            measurements: Vec::new(),
        }
    }

    /// Append an operation.
    pub fn push(&mut self, op: Operation) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Append an uncontrolled gate.
    pub fn gate<T>(&mut self, gate: Gate, targets: T) -> &mut Self
    where T: IntoIterator<Item = usize>
    {
        self.push(Operation::new(gate, targets))
    }

    /// Append a controlled gate.
    pub fn controlled<C, T>(&mut self, gate: Gate, controls: C, targets: T)
        -> &mut Self
    where
        C: IntoIterator<Item = usize>,
        T: IntoIterator<Item = usize>,
    {
        self.push(Operation::new(gate, targets).with_controls(controls))
    }

    /// Append a gate looked up in the [catalog][crate::catalog].
    pub fn named<T, C>(&mut self, key: &str, targets: T, controls: C, params: &[f64])
        -> Result<&mut Self>
    where
        T: IntoIterator<Item = usize>,
        C: IntoIterator<Item = usize>,
    {
        let op = Operation::from_catalog(key, targets, controls, params)?;
        Ok(self.push(op))
    }

    pub fn h(&mut self, k: usize) -> &mut Self { self.gate(gate::HADAMARD.clone(), [k]) }

    pub fn x(&mut self, k: usize) -> &mut Self { self.gate(gate::PAULI_X.clone(), [k]) }

    pub fn z(&mut self, k: usize) -> &mut Self { self.gate(gate::PAULI_Z.clone(), [k]) }

    pub fn cnot(&mut self, c: usize, t: usize) -> &mut Self {
        self.controlled(gate::CNOT.clone(), [c], [t])
    }

    pub fn toffoli(&mut self, c0: usize, c1: usize, t: usize) -> &mut Self {
        self.controlled(gate::PAULI_X.clone(), [c0, c1], [t])
    }

    /// Assign the outcome of measuring `qubit` to classical bit `cbit`.
    pub fn measure(&mut self, qubit: usize, cbit: usize) -> &mut Self {
        self.measurements.push(MeasurementAssignment { qubit, cbit });
        self
    }

    /// Return the effective measurement assignments: the explicit ones if
    /// there are any, otherwise qubit `k` to classical bit `k` for every
    /// qubit.
    pub fn assignments(&self) -> Vec<MeasurementAssignment> {
        if self.measurements.is_empty() {
            (0..self.num_qubits)
                .map(|k| MeasurementAssignment { qubit: k, cbit: k })
                .collect()
        } else {
            self.measurements.clone()
        }
    }

    /// Return the width of the classical register.
    pub fn num_cbits(&self) -> usize {
        self.assignments().iter().map(|m| m.cbit.saturating_add(1)).max().unwrap_or(0)
    }

    /// Check the whole circuit against its register, returning how each
    /// operation is to be applied.
    pub fn validate(&self) -> Result<Vec<Shape>> {
        if self.num_qubits == 0 || self.num_qubits > MAX_QUBITS {
            return Err(DimensionError::QubitCount {
                got: self.num_qubits,
                max: MAX_QUBITS,
            }.into());
        }
        let shapes: Vec<Shape>
            = self.ops.iter()
            .map(|op| op.shape(self.num_qubits))
            .collect::<Result<_>>()?;
        if let Some(m) = self.measurements.iter().find(|m| m.qubit >= self.num_qubits) {
            return Err(SimError::IndexOutOfRange {
                index: m.qubit,
                num_qubits: self.num_qubits,
            });
        }
        if let Some(m) = self.measurements.iter().find(|m| m.cbit >= MAX_CBITS) {
            return Err(DimensionError::ClassicalBit {
                index: m.cbit,
                max: MAX_CBITS,
            }.into());
        }
        if let Some(cbit) = self.measurements.iter().map(|m| m.cbit).duplicates().next() {
            return Err(DimensionError::DuplicateClassicalBit(cbit).into());
        }
        Ok(shapes)
    }
}

/// Run-time options.
#[derive(Clone, Debug, Default)]
pub struct SimConfig {
    /// Seed for the random number generator; drawn from system entropy if
    /// `None`.
    pub seed: Option<u64>,
    /// Abort with [`SimError::TimedOut`] if this much time has passed when the
    /// next operation is due.
    pub timeout: Option<Duration>,
    /// Check the norm of the state after every operation.
    pub check_normalization: bool,
}

impl SimConfig {
    /// Create a new random number generator according to `self.seed`.
    pub fn rng(&self) -> StdRng {
        self.seed.map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy)
    }
}

/// Output of a circuit run.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    pub circuit_id: String,
    /// Final state. This is the collapsed state for single-shot runs and the
    /// unmeasured state otherwise.
    pub state: State,
    /// Measurement records keyed by classical register string.
    pub measurements: Counts,
    pub shots: usize,
    /// Wall-clock time of the run, validation included.
    pub elapsed: Duration,
}

impl SimulationResult {
    /// Render the final state in ket notation.
    pub fn to_kets(&self) -> String { self.state.to_kets() }

    /// Return the Born probabilities of the final state.
    pub fn probabilities(&self) -> &[f64] { self.state.probabilities() }

    /// Return the measurement records sorted by bit-string.
    pub fn sorted_measurements(&self) -> Vec<&MeasurementRecord> {
        self.measurements.values()
            .sorted_by(|l, r| l.bits.cmp(&r.bits))
            .collect()
    }
}

// integer value of the classical register after reading out basis state
// `index`
fn register_value(index: usize, assignments: &[MeasurementAssignment]) -> usize {
    assignments.iter()
        .filter(|m| index & (1 << m.qubit) != 0)
        .fold(0, |acc, m| acc | (1 << m.cbit))
}

// classical bit 0 rightmost
fn register_string(value: usize, width: usize) -> String {
    (0..width).rev()
        .map(|b| if value & (1 << b) != 0 { '1' } else { '0' })
        .collect()
}

/// Run a circuit with default configuration.
pub fn run_circuit(circuit: &Circuit, shots: usize) -> Result<SimulationResult> {
    run_circuit_with(circuit, shots, &SimConfig::default())
}

/// Run a circuit with a particular configuration.
pub fn run_circuit_with(circuit: &Circuit, shots: usize, config: &SimConfig)
    -> Result<SimulationResult>
{
    let mut rng = config.rng();
    run_circuit_rng(circuit, shots, config, &mut rng, None)
}

/// Run a circuit with an external random number generator and an optional
/// cancellation flag.
///
/// The circuit is validated in full before any state is created. The flag and
/// `config.timeout` are only checked between operations.
pub fn run_circuit_rng<R>(
    circuit: &Circuit,
    shots: usize,
    config: &SimConfig,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationResult>
where R: Rng + ?Sized
{
    let start = Instant::now();
    let shapes = circuit.validate()?;
    let total = circuit.ops.len();
    debug!(
        circuit = %circuit.id,
        num_qubits = circuit.num_qubits,
        ops = total,
        shots,
        "running circuit"
    );

    let mut state = State::new(circuit.num_qubits)?;
    for (k, (op, shape)) in circuit.ops.iter().zip(shapes.iter()).enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!(circuit = %circuit.id, completed = k, "cancelled");
            return Err(SimError::Cancelled { completed: k, total });
        }
        if config.timeout.is_some_and(|t| start.elapsed() >= t) {
            debug!(circuit = %circuit.id, completed = k, "timed out");
            return Err(SimError::TimedOut { completed: k, total });
        }
        trace!(step = k, gate = op.gate.name(), ?shape, "apply");
        state = apply_shaped(&state, &op.gate, shape);
        if config.check_normalization {
            let norm = state.norm_sqr();
            if (norm - 1.0).abs() > NORM_TOL {
                return Err(SimError::NotNormalized(norm));
            }
        }
    }

    let assignments = circuit.assignments();
    let width = circuit.num_cbits();
    let measurements: Counts
        = match shots {
            0 => Counts::default(),
            1 => {
                let mut value: usize = 0;
                for m in assignments.iter() {
                    let (post, outcome) = measure::measure(&state, m.qubit, rng)?;
                    trace!(qubit = m.qubit, cbit = m.cbit, outcome, "measure");
                    if outcome == 1 { value |= 1 << m.cbit; }
                    state = post;
                }
                let bits = register_string(value, width);
                let rec = MeasurementRecord {
                    bits: bits.clone(),
                    probability: 1.0,
                    count: 1,
                    frequency: 1.0,
                };
                [(bits, rec)].into_iter().collect()
            },
            _ => sample_register(&state, shots, &assignments, width, rng),
        };

    let elapsed = start.elapsed();
    debug!(circuit = %circuit.id, ?elapsed, outcomes = measurements.len(), "done");
    Ok(SimulationResult {
        circuit_id: circuit.id.clone(),
        state,
        measurements,
        shots,
        elapsed,
    })
}

// sample the full register, then read out each shot into the classical
// register; probabilities are marginals over all basis states giving the same
// register value
fn sample_register<R>(
    state: &State,
    shots: usize,
    assignments: &[MeasurementAssignment],
    width: usize,
    rng: &mut R,
) -> Counts
where R: Rng + ?Sized
{
    let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
    for (index, count) in measure::sample_counts(state, shots, rng) {
        *counts.entry(register_value(index, assignments)).or_default() += count;
    }
    let mut marginals: FxHashMap<usize, f64> = FxHashMap::default();
    for (index, p) in state.probabilities().iter().enumerate() {
        let value = register_value(index, assignments);
        if counts.contains_key(&value) {
            *marginals.entry(value).or_default() += p;
        }
    }
    counts.into_iter()
        .map(|(value, count)| {
            let bits = register_string(value, width);
            let rec = MeasurementRecord {
                bits: bits.clone(),
                probability: marginals.get(&value).copied().unwrap_or(0.0),
                count,
                frequency: count as f64 / shots as f64,
            };
            (bits, rec)
        })
        .collect()
}

/// Run a series of independent circuits in parallel.
///
/// Each circuit gets its own random number generator; if `config.seed` is
/// `Some(s)`, circuit `k` is seeded with `s + k`.
pub fn run_batch(circuits: &[Circuit], shots: usize, config: &SimConfig)
    -> Vec<Result<SimulationResult>>
{
    debug!(circuits = circuits.len(), shots, "running batch");
    circuits.par_iter()
        .enumerate()
        .map(|(k, circuit)| {
            let mut rng
                = config.seed
                .map(|s| StdRng::seed_from_u64(s.wrapping_add(k as u64)))
                .unwrap_or_else(StdRng::from_entropy);
            run_circuit_rng(circuit, shots, config, &mut rng, None)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;
    use crate::complex::C64;

    fn seeded(seed: u64) -> SimConfig {
        SimConfig { seed: Some(seed), ..SimConfig::default() }
    }

    fn bell() -> Circuit {
        let mut circuit = Circuit::new("bell", 2);
        circuit.h(0).cnot(0, 1);
        circuit
    }

    #[test]
    fn hadamard_amplitudes() {
        let mut circuit = Circuit::new("h", 1);
        circuit.h(0);
        let res = run_circuit(&circuit, 0).unwrap();
        assert_eq!(res.circuit_id, "h");
        assert!(res.measurements.is_empty());
        let r = FRAC_1_SQRT_2;
        let buf = res.state.to_interleaved();
        assert!(buf.iter().zip([r, 0.0, r, 0.0]).all(|(x, y)| (x - y).abs() < 1e-12));
        assert!(res.probabilities().iter().all(|p| (p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn bell_probabilities() {
        let res = run_circuit(&bell(), 0).unwrap();
        let expected = [0.5, 0.0, 0.0, 0.5];
        assert!(res.probabilities().iter().zip(expected).all(|(p, e)| (p - e).abs() < 1e-12));
        assert_eq!(res.to_kets(), "0.7071∣00⟩ + 0.7071∣11⟩");
    }

    #[test]
    fn bell_single_shot() {
        let mut rng = StdRng::seed_from_u64(10546);
        let config = SimConfig::default();
        let mut n11: usize = 0;
        let trials: usize = 400;
        for _ in 0..trials {
            let res = run_circuit_rng(&bell(), 1, &config, &mut rng, None).unwrap();
            assert_eq!(res.measurements.len(), 1);
            let rec = res.measurements.values().next().unwrap();
            assert!(rec.bits == "00" || rec.bits == "11");
            assert_eq!(rec.probability, 1.0);
            assert_eq!(rec.count, 1);
            assert_eq!(rec.frequency, 1.0);
            let index = usize::from_str_radix(&rec.bits, 2).unwrap();
            assert!((res.probabilities()[index] - 1.0).abs() < 1e-12);
            if rec.bits == "11" { n11 += 1; }
        }
        let f11 = n11 as f64 / trials as f64;
        assert!((0.4..=0.6).contains(&f11), "f11 = {}", f11);
    }

    #[test]
    fn partial_single_shot() {
        // measuring one half of a Bell pair collapses the other
        let mut circuit = bell();
        circuit.measure(0, 0);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let res = run_circuit_rng(&circuit, 1, &SimConfig::default(), &mut rng, None)
                .unwrap();
            let rec = res.measurements.values().next().unwrap();
            let index = if rec.bits == "1" { 0b11 } else { 0b00 };
            assert_eq!(rec.bits.len(), 1);
            assert!((res.probabilities()[index] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn pauli_x() {
        let mut circuit = Circuit::new("x", 1);
        circuit.x(0);
        let res = run_circuit(&circuit, 0).unwrap();
        assert_eq!(res.state.amplitudes(), &[C64::new(0.0, 0.0), C64::new(1.0, 0.0)]);
    }

    #[test]
    fn multi_shot() {
        let mut circuit = Circuit::new("h", 1);
        circuit.h(0);
        let res = run_circuit_with(&circuit, 1024, &seeded(1)).unwrap();
        assert_eq!(res.shots, 1024);
        assert_eq!(
            res.sorted_measurements().iter().map(|rec| rec.bits.as_str()).collect::<Vec<_>>(),
            vec!["0", "1"],
        );
        let total: f64 = res.measurements.values().map(|rec| rec.frequency).sum();
        assert!((total - 1.0).abs() < 1e-9);
        for rec in res.measurements.values() {
            assert!((rec.frequency - 0.5).abs() < 0.1);
            assert!((rec.probability - 0.5).abs() < 1e-12);
        }
        // the sampled state itself is left unmeasured
        assert!(res.probabilities().iter().all(|p| (p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn classical_register_order() {
        // qubit 0 -> cbit 2, qubit 2 -> cbit 0; cbit 1 unassigned
        let mut circuit = Circuit::new("order", 3);
        circuit.x(0).measure(0, 2).measure(2, 0);
        assert_eq!(circuit.num_cbits(), 3);
        let res = run_circuit_with(&circuit, 1, &seeded(0)).unwrap();
        assert!(res.measurements.contains_key("100"));
        let res = run_circuit_with(&circuit, 50, &seeded(0)).unwrap();
        assert_eq!(res.measurements.len(), 1);
        assert_eq!(res.measurements["100"].count, 50);
        assert_eq!(res.measurements["100"].probability, 1.0);
    }

    #[test]
    fn multi_shot_marginals() {
        let mut circuit = bell();
        circuit.h(0).measure(1, 0);
        // state is now (∣00⟩ + ∣01⟩ + ∣10⟩ - ∣11⟩) / 2; qubit 1 alone is read
        let res = run_circuit_with(&circuit, 2000, &seeded(8)).unwrap();
        assert_eq!(res.measurements.len(), 2);
        let count: usize = res.measurements.values().map(|rec| rec.count).sum();
        assert_eq!(count, 2000);
        for rec in res.measurements.values() {
            assert_eq!(rec.bits.len(), 1);
            assert!((rec.probability - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn toffoli() {
        let mut circuit = Circuit::new("toffoli", 3);
        circuit.x(0).x(1).toffoli(0, 1, 2);
        let res = run_circuit_with(&circuit, 1, &seeded(0)).unwrap();
        assert!(res.measurements.contains_key("111"));
        let mut circuit = Circuit::new("toffoli", 3);
        circuit.x(0).toffoli(0, 1, 2);
        let res = run_circuit_with(&circuit, 1, &seeded(0)).unwrap();
        assert!(res.measurements.contains_key("001"));
    }

    #[test]
    fn named_gates() {
        let mut circuit = Circuit::new("named", 2);
        circuit
            .named("ry", [0], [], &[std::f64::consts::PI]).unwrap()
            .named("cx", [0, 1], [], &[]).unwrap();
        let res = run_circuit_with(&circuit, 10, &seeded(0)).unwrap();
        assert_eq!(res.measurements["11"].count, 10);
        assert!(circuit.named("nope", [0], [], &[]).is_err());
    }

    #[test]
    fn invalid_circuits() {
        assert_eq!(
            run_circuit(&Circuit::new("empty", 0), 0).unwrap_err(),
            SimError::InvalidDimension(DimensionError::QubitCount { got: 0, max: MAX_QUBITS }),
        );
        let mut circuit = bell();
        circuit.measure(0, 0).measure(1, 0);
        assert_eq!(
            run_circuit(&circuit, 1).unwrap_err(),
            SimError::InvalidDimension(DimensionError::DuplicateClassicalBit(0)),
        );
        for cbit in [MAX_CBITS, usize::MAX] {
            let mut circuit = Circuit::new("wide", 1);
            circuit.x(0).measure(0, cbit);
            for shots in [0, 1, 10] {
                assert_eq!(
                    run_circuit(&circuit, shots).unwrap_err(),
                    SimError::InvalidDimension(
                        DimensionError::ClassicalBit { index: cbit, max: MAX_CBITS }),
                );
            }
            assert_eq!(circuit.num_cbits(), cbit.saturating_add(1));
        }
        // the widest register is still read out correctly
        let mut circuit = Circuit::new("widest", 2);
        circuit.x(0).measure(0, MAX_CBITS - 1).measure(1, 0);
        let res = run_circuit_with(&circuit, 10, &seeded(0)).unwrap();
        let expected = format!("1{}", "0".repeat(MAX_CBITS - 1));
        assert_eq!(res.measurements[&expected].count, 10);
        let res = run_circuit_with(&circuit, 1, &seeded(0)).unwrap();
        assert!(res.measurements.contains_key(&expected));
        let mut circuit = bell();
        circuit.measure(2, 0);
        assert_eq!(
            run_circuit(&circuit, 1).unwrap_err(),
            SimError::IndexOutOfRange { index: 2, num_qubits: 2 },
        );
        let mut circuit = bell();
        circuit.gate(gate::HADAMARD.clone(), [0, 1]);
        assert!(matches!(
            run_circuit(&circuit, 0),
            Err(SimError::UnsupportedOperationShape { .. }),
        ));
    }

    #[test]
    fn cancellation() {
        let flag = AtomicBool::new(true);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            run_circuit_rng(&bell(), 0, &SimConfig::default(), &mut rng, Some(&flag))
                .unwrap_err(),
            SimError::Cancelled { completed: 0, total: 2 },
        );
        flag.store(false, Ordering::Relaxed);
        assert!(
            run_circuit_rng(&bell(), 0, &SimConfig::default(), &mut rng, Some(&flag))
                .is_ok()
        );
        let config = SimConfig { timeout: Some(Duration::ZERO), ..SimConfig::default() };
        assert_eq!(
            run_circuit_with(&bell(), 0, &config).unwrap_err(),
            SimError::TimedOut { completed: 0, total: 2 },
        );
    }

    #[test]
    fn normalization_check() {
        let config = SimConfig { check_normalization: true, ..seeded(3) };
        let mut circuit = Circuit::new("checked", 4);
        circuit.h(0).h(1).cnot(0, 2).toffoli(0, 1, 3).z(3);
        circuit.named("u", [2], [], &[0.1, 0.2, 0.3]).unwrap();
        assert!(run_circuit_with(&circuit, 100, &config).is_ok());
    }

    #[test]
    fn seeded_runs_repeat() {
        let a = run_circuit_with(&bell(), 500, &seeded(42)).unwrap();
        let b = run_circuit_with(&bell(), 500, &seeded(42)).unwrap();
        assert_eq!(a.measurements, b.measurements);
    }

    #[test]
    fn batch() {
        let circuits: Vec<Circuit>
            = (1..=4)
            .map(|n| {
                let mut circuit = Circuit::new(format!("ghz{}", n), n);
                circuit.h(0);
                (1..n).for_each(|k| { circuit.cnot(k - 1, k); });
                circuit
            })
            .collect();
        let config = seeded(100);
        let results = run_batch(&circuits, 200, &config);
        assert_eq!(results.len(), 4);
        for (k, (circuit, res)) in circuits.iter().zip(results).enumerate() {
            let res = res.unwrap();
            assert_eq!(res.circuit_id, circuit.id);
            let mut rng = StdRng::seed_from_u64(100 + k as u64);
            let single = run_circuit_rng(circuit, 200, &config, &mut rng, None).unwrap();
            assert_eq!(res.measurements, single.measurements);
            assert_eq!(res.measurements.len(), 2);
        }
    }
}
