use statevec_sim::{
    apply::{ apply_gate, Operation },
    gate,
    measure::sample_measurements,
    state::State,
    Result,
};
use rand::thread_rng;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

const SHOTS: [usize; 6] = [10, 100, 1_000, 10_000, 100_000, 1_000_000];
const MC: usize = 100; // repetitions per shot count

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statevec_sim=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut rng = thread_rng();
    let plus = apply_gate(&State::new(1)?, &Operation::new(gate::HADAMARD.clone(), [0]))?;
    let p0 = plus.probabilities()[0];

    println!("{:>9}  {:>8}  {:>8}  {:>8}", "shots", "mean", "std", "sigma");
    for &shots in SHOTS.iter() {
        let freqs: Vec<f64>
            = (0..MC)
            .map(|_| {
                sample_measurements(&plus, shots, &mut rng)
                    .get("0")
                    .map(|rec| rec.frequency)
                    .unwrap_or(0.0)
            })
            .collect();
        let mean: f64 = freqs.iter().sum::<f64>() / MC as f64;
        let std: f64
            = (freqs.iter()
                .map(|f| (f - mean).powi(2))
                .sum::<f64>() / MC as f64)
            .sqrt();
        // binomial standard deviation of the frequency
        let sigma: f64 = (p0 * (1.0 - p0) / shots as f64).sqrt();
        println!("{:>9}  {:>8.5}  {:>8.5}  {:>8.5}", shots, mean, std, sigma);
    }
    Ok(())
}
