//! Projective measurement and multi-shot sampling.
//!
//! Single-qubit measurements collapse the state; sampling draws from the
//! state's Born distribution without changing it.
//!
//! Sampling builds the cumulative distribution over all 2<sup>*n*</sup> basis
//! states once and then locates each shot by binary search, so a run of *S*
//! shots costs *O*(2<sup>*n*</sup> + *S n*).

use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::warn;
use crate::{
    complex::{ C64, ZERO },
    error::{ Result, SimError },
    state::{ basis_label, State },
};

/// Retained probability mass at or below which a collapse is refused.
pub const COLLAPSE_EPS: f64 = 1e-12;

fn check_qubit(state: &State, qubit: usize) -> Result<()> {
    if qubit >= state.num_qubits() {
        Err(SimError::IndexOutOfRange { index: qubit, num_qubits: state.num_qubits() })
    } else {
        Ok(())
    }
}

/// Return the probability that measuring `qubit` gives 1.
pub fn probability_of_one(state: &State, qubit: usize) -> Result<f64> {
    check_qubit(state, qubit)?;
    let mask: usize = 1 << qubit;
    let p1: f64
        = state.probabilities().iter().enumerate()
        .filter(|(i, _)| i & mask != 0)
        .map(|(_, p)| *p)
        .sum();
    Ok(p1)
}

// zero every amplitude inconsistent with `outcome` and renormalize the rest
fn project(state: &State, qubit: usize, outcome: u8) -> Result<State> {
    let mask: usize = 1 << qubit;
    let keep_set = outcome != 0;
    let mass: f64
        = state.probabilities().iter().enumerate()
        .filter(|(i, _)| (i & mask != 0) == keep_set)
        .map(|(_, p)| *p)
        .sum();
    if mass <= COLLAPSE_EPS {
        warn!(qubit, outcome, prob = mass, "refusing collapse onto a zero-probability outcome");
        return Err(SimError::DegenerateCollapse { qubit, outcome, prob: mass });
    }
    let renorm = mass.sqrt().recip();
    let amps: Vec<C64>
        = state.amplitudes().iter().enumerate()
        .map(|(i, a)| {
            if (i & mask != 0) == keep_set { a.scale(renorm) } else { ZERO }
        })
        .collect();
    Ok(state.with_amplitudes(amps))
}

/// Perform a projective measurement on a single qubit, returning the
/// post-measurement state and the outcome.
///
/// A uniform `r` in [0, 1) is drawn from `rng` and the outcome is 1 if and
/// only if `r` is less than the probability of 1.
pub fn measure<R>(state: &State, qubit: usize, rng: &mut R) -> Result<(State, u8)>
where R: Rng + ?Sized
{
    let p1 = probability_of_one(state, qubit)?;
    let r: f64 = rng.gen();
    let outcome = u8::from(r < p1);
    let post = project(state, qubit, outcome)?;
    Ok((post, outcome))
}

/// Perform a projective measurement on a single qubit, post-selected to a
/// particular outcome.
///
/// Fails with [`SimError::DegenerateCollapse`] if the outcome has (numerically)
/// zero probability.
pub fn measure_postsel(state: &State, qubit: usize, outcome: bool) -> Result<State> {
    check_qubit(state, qubit)?;
    project(state, qubit, u8::from(outcome))
}

/// Measure every qubit at once, returning the collapsed state and the integer
/// encoding of the observed basis state.
///
/// The phase of the surviving amplitude is kept.
pub fn measure_all<R>(state: &State, rng: &mut R) -> Result<(State, usize)>
where R: Rng + ?Sized
{
    let cdf = cumulative(state.probabilities());
    let index = draw(&cdf, rng);
    let amp = state.amplitudes()[index];
    let norm = amp.norm();
    if norm * norm <= COLLAPSE_EPS {
        warn!(index, "sampled a zero-probability basis state");
        return Err(SimError::DegenerateCollapse {
            qubit: state.num_qubits(),
            outcome: 0,
            prob: norm * norm,
        });
    }
    let mut amps: Vec<C64> = vec![ZERO; state.dim()];
    amps[index] = amp / norm;
    Ok((state.with_amplitudes(amps), index))
}

fn cumulative(probs: &[f64]) -> Vec<f64> {
    probs.iter()
        .scan(0.0, |acc, p| { *acc += p; Some(*acc) })
        .collect()
}

// smallest index whose prefix sum exceeds r
fn draw<R>(cdf: &[f64], rng: &mut R) -> usize
where R: Rng + ?Sized
{
    let total = cdf.last().copied().unwrap_or(0.0);
    let r: f64 = rng.gen::<f64>() * total;
    cdf.partition_point(|&c| c <= r).min(cdf.len().saturating_sub(1))
}

/// Draw `shots` basis states from the Born distribution of `state`, returning
/// the number of times each basis index was observed.
///
/// Only observed indices are present in the returned map.
pub fn sample_counts<R>(state: &State, shots: usize, rng: &mut R)
    -> FxHashMap<usize, usize>
where R: Rng + ?Sized
{
    let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
    if shots == 0 { return counts; }
    let cdf = cumulative(state.probabilities());
    for _ in 0..shots {
        *counts.entry(draw(&cdf, rng)).or_default() += 1;
    }
    counts
}

/// Statistics for a single classical outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementRecord {
    /// Outcome bit-string, highest bit leftmost.
    pub bits: String,
    /// Born probability of the outcome in the sampled state.
    pub probability: f64,
    /// Number of shots giving the outcome.
    pub count: usize,
    /// `count` divided by the total number of shots.
    pub frequency: f64,
}

/// Measurement records keyed by bit-string.
pub type Counts = FxHashMap<String, MeasurementRecord>;

/// Sample `state` `shots` times, measuring every qubit.
///
/// Bit-strings are [basis labels][basis_label], with qubit 0 rightmost. No
/// shots produce an empty map.
pub fn sample_measurements<R>(state: &State, shots: usize, rng: &mut R) -> Counts
where R: Rng + ?Sized
{
    let probs = state.probabilities();
    sample_counts(state, shots, rng)
        .into_iter()
        .map(|(index, count)| {
            let bits = basis_label(index, state.num_qubits());
            let rec = MeasurementRecord {
                bits: bits.clone(),
                probability: probs[index],
                count,
                frequency: count as f64 / shots as f64,
            };
            (bits, rec)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;
    use rand::{ rngs::StdRng, SeedableRng };
    use crate::{
        apply::{ apply_all, apply_gate, Operation },
        complex::approx_eq,
        gate::{ CNOT, HADAMARD },
        state::NORM_TOL,
    };

    fn plus() -> State {
        apply_gate(&State::new(1).unwrap(), &Operation::new(HADAMARD.clone(), [0]))
            .unwrap()
    }

    fn bell() -> State {
        apply_all(
            &State::new(2).unwrap(),
            &[
                Operation::new(HADAMARD.clone(), [0]),
                Operation::new(CNOT.clone(), [0, 1]),
            ],
        ).unwrap()
    }

    fn random_state<R>(n: usize, rng: &mut R) -> State
    where R: Rng + ?Sized
    {
        let amps: Vec<C64>
            = (0..1 << n)
            .map(|_| C64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
            .collect();
        let norm = amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        State::from_amplitudes(n, amps.into_iter().map(|a| a / norm).collect())
            .unwrap()
    }

    fn states_approx_eq(a: &State, b: &State) -> bool {
        a.num_qubits() == b.num_qubits()
            && a.amplitudes().iter().zip(b.amplitudes())
                .all(|(x, y)| approx_eq(*x, *y, 1e-12))
    }

    #[test]
    fn probability() {
        assert!((probability_of_one(&plus(), 0).unwrap() - 0.5).abs() < 1e-12);
        let q = State::basis(3, 0b100).unwrap();
        assert_eq!(probability_of_one(&q, 2).unwrap(), 1.0);
        assert_eq!(probability_of_one(&q, 0).unwrap(), 0.0);
        assert_eq!(
            probability_of_one(&q, 3),
            Err(SimError::IndexOutOfRange { index: 3, num_qubits: 3 }),
        );
    }

    #[test]
    fn deterministic_basis() {
        let mut rng = StdRng::seed_from_u64(10546);
        let q = State::basis(3, 0b101).unwrap();
        for _ in 0..1000 {
            for (k, expected) in [(0, 1), (1, 0), (2, 1)] {
                let (post, outcome) = measure(&q, k, &mut rng).unwrap();
                assert_eq!(outcome, expected);
                assert_eq!(post, q);
            }
        }
    }

    #[test]
    fn collapse() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let (post, m0) = measure(&bell(), 0, &mut rng).unwrap();
            let expected = State::basis(2, if m0 == 1 { 0b11 } else { 0b00 }).unwrap();
            assert!(states_approx_eq(&post, &expected));
            let (post, m1) = measure(&post, 1, &mut rng).unwrap();
            assert_eq!(m0, m1);
            assert!(states_approx_eq(&post, &expected));
        }
    }

    #[test]
    fn renormalization() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=6 {
            let q = random_state(n, &mut rng);
            for k in 0..n {
                let (post, _) = measure(&q, k, &mut rng).unwrap();
                assert!(post.is_normalized(NORM_TOL));
            }
        }
    }

    #[test]
    fn postselection() {
        let q = measure_postsel(&plus(), 0, true).unwrap();
        assert!(states_approx_eq(&q, &State::basis(1, 1).unwrap()));
        let q = measure_postsel(&plus(), 0, false).unwrap();
        assert!(states_approx_eq(&q, &State::basis(1, 0).unwrap()));
        assert!(matches!(
            measure_postsel(&State::new(2).unwrap(), 1, true),
            Err(SimError::DegenerateCollapse { qubit: 1, outcome: 1, .. }),
        ));
    }

    #[test]
    fn measure_all_collapses() {
        let mut rng = StdRng::seed_from_u64(3);
        let (post, index) = measure_all(&State::basis(4, 9).unwrap(), &mut rng).unwrap();
        assert_eq!(index, 9);
        assert_eq!(post, State::basis(4, 9).unwrap());
        for _ in 0..50 {
            let (post, index) = measure_all(&bell(), &mut rng).unwrap();
            assert!(index == 0b00 || index == 0b11);
            assert!(approx_eq(post.amplitude(index).unwrap(), C64::from(1.0), 1e-12));
        }
        // phase is kept
        let q = State::from_amplitudes(1, vec![ZERO, C64::new(0.0, -1.0)]).unwrap();
        let (post, _) = measure_all(&q, &mut rng).unwrap();
        assert_eq!(post.amplitude(1), Some(C64::new(0.0, -1.0)));
    }

    #[test]
    fn sampling_convergence() {
        let mut rng = StdRng::seed_from_u64(10546);
        let counts = sample_measurements(&plus(), 10_000, &mut rng);
        assert_eq!(counts.len(), 2);
        let f0 = counts["0"].frequency;
        assert!((0.47..=0.53).contains(&f0), "f0 = {}", f0);
        assert!((counts["0"].probability - 0.5).abs() < 1e-12);
        assert_eq!(counts["0"].count + counts["1"].count, 10_000);
    }

    #[test]
    fn frequency_mass() {
        let mut rng = StdRng::seed_from_u64(11);
        for (n, shots) in [(1, 1), (3, 7), (5, 1000), (8, 333)] {
            let q = random_state(n, &mut rng);
            let counts = sample_measurements(&q, shots, &mut rng);
            let total: f64 = counts.values().map(|rec| rec.frequency).sum();
            assert!((total - 1.0).abs() < 1e-9);
            for (bits, rec) in counts.iter() {
                assert_eq!(bits, &rec.bits);
                assert_eq!(bits.len(), n);
                let index = usize::from_str_radix(bits, 2).unwrap();
                assert_eq!(rec.probability, q.probabilities()[index]);
            }
        }
    }

    #[test]
    fn sampling_support() {
        // zero-probability states are never drawn
        let mut rng = StdRng::seed_from_u64(12);
        let counts = sample_counts(&bell(), 5000, &mut rng);
        assert!(counts.keys().all(|&k| k == 0b00 || k == 0b11));
        let r = FRAC_1_SQRT_2;
        let q = State::from_amplitudes(3, vec![
            ZERO, ZERO, ZERO, C64::from(r), ZERO, ZERO, ZERO, C64::new(0.0, r),
        ]).unwrap();
        let counts = sample_counts(&q, 5000, &mut rng);
        assert!(counts.keys().all(|&k| k == 3 || k == 7));
    }

    #[test]
    fn no_shots() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_measurements(&plus(), 0, &mut rng).is_empty());
    }
}
