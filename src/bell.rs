use statevec_sim::{
    circuit::{ run_circuit_rng, run_circuit_with, Circuit, SimConfig },
    Result,
};
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

const SEED: u64 = 10546;
const TRIALS: usize = 8;
const SHOTS: usize = 1024;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statevec_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut circuit = Circuit::new("bell", 2);
    circuit.h(0).cnot(0, 1);
    let config = SimConfig { seed: Some(SEED), ..SimConfig::default() };

    let res = run_circuit_with(&circuit, 0, &config)?;
    println!("state: {}", res.to_kets());
    for (k, p) in res.probabilities().iter().enumerate() {
        println!("  P({}) = {:.4}", res.state.label(k), p);
    }

    println!("single shots:");
    let mut rng = config.rng();
    for _ in 0..TRIALS {
        let res = run_circuit_rng(&circuit, 1, &config, &mut rng, None)?;
        for rec in res.sorted_measurements() {
            println!("  {} -> {}", rec.bits, res.to_kets());
        }
    }

    let res = run_circuit_with(&circuit, SHOTS, &config)?;
    println!("{} shots ({:?}):", SHOTS, res.elapsed);
    for rec in res.sorted_measurements() {
        println!(
            "  {}: count = {:>4}, frequency = {:.4}, probability = {:.4}",
            rec.bits, rec.count, rec.frequency, rec.probability,
        );
    }
    Ok(())
}
