//! Dense state-vector simulation of registers of qubits.
//!
//! A state of *n* qubits is held as the full vector of 2<sup>*n*</sup> complex
//! amplitudes, so any unitary gate can be applied exactly, at the cost of
//! memory and time exponential in *n*. Circuits are run from ∣0...0⟩ and can
//! be read out by single-shot projective measurement or by repeated sampling.
//!
//! States are plain values and every operation on them is a function returning
//! a new state, so independent circuits can be run concurrently without any
//! synchronization (see [`circuit::run_batch`]).

pub mod error;
pub mod complex;
pub mod gate;
pub mod catalog;
pub mod state;
pub mod apply;
pub mod measure;
pub mod circuit;

pub use error::{ Result, SimError };
pub use state::State;
pub use apply::{ apply_gate, Operation };
pub use circuit::{ run_batch, run_circuit, Circuit, SimConfig, SimulationResult };
