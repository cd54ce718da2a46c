//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing_subscriber::EnvFilter;

/// Generate a random printable payload of the specified size.
pub fn random_payload(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

/// Generate a batch of payloads with the specified size.
pub fn generate_payloads(count: usize, size: usize) -> Vec<String> {
    (0..count).map(|_| random_payload(size)).collect()
}

/// Installs a log subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
