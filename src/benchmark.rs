use std::{ f64::consts::TAU, time::Instant };
use rand::{ rngs::StdRng, Rng, SeedableRng };
use statevec_sim::{
    circuit::{ run_batch, run_circuit_with, Circuit, SimConfig },
    gate,
    Result,
};
use tracing::info;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

const MAX_QUBITS: usize = 20;
const DEPTH: usize = 10;
const SHOTS: usize = 1000;
const BATCH: usize = 16;
const SEED: u64 = 10546;

// layers of random Y rotations followed by a CNOT ladder, closed by a Toffoli
fn layered_circuit<R>(n: usize, depth: usize, rng: &mut R) -> Circuit
where R: Rng + ?Sized
{
    let mut circuit = Circuit::new(format!("layered-{}", n), n);
    for _ in 0..depth {
        for k in 0..n {
            circuit.gate(gate::ry(TAU * rng.gen::<f64>()), [k]);
        }
        for k in 1..n {
            circuit.cnot(k - 1, k);
        }
    }
    if n >= 3 { circuit.toffoli(0, 1, 2); }
    circuit
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benchmark=info,statevec_sim=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut rng = StdRng::seed_from_u64(SEED);
    let config = SimConfig { seed: Some(SEED), ..SimConfig::default() };

    println!("{:>6}  {:>6}  {:>12}  {:>12}", "qubits", "ops", "evolve (s)", "sample (s)");
    for n in 1..=MAX_QUBITS {
        let circuit = layered_circuit(n, DEPTH, &mut rng);
        let evolve = run_circuit_with(&circuit, 0, &config)?;
        let sample = run_circuit_with(&circuit, SHOTS, &config)?;
        println!(
            "{:>6}  {:>6}  {:>12.6}  {:>12.6}",
            n,
            circuit.ops.len(),
            evolve.elapsed.as_secs_f64(),
            sample.elapsed.as_secs_f64(),
        );
    }

    let n = MAX_QUBITS / 2;
    let circuits: Vec<Circuit>
        = (0..BATCH)
        .map(|_| layered_circuit(n, DEPTH, &mut rng))
        .collect();
    let t0 = Instant::now();
    let results = run_batch(&circuits, SHOTS, &config);
    let wall = t0.elapsed();
    let failed = results.iter().filter(|res| res.is_err()).count();
    info!(circuits = BATCH, qubits = n, ?wall, failed, "batch finished");
    println!("batch of {} {}-qubit circuits: {:.6} s", BATCH, n, wall.as_secs_f64());
    Ok(())
}
