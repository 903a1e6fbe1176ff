use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Index of this party in the config's address list
    pub party_id: usize,
    /// Path of the shared party config file
    pub config: PathBuf,
    /// Label for the network the cluster runs on (lan or wan)
    #[arg(default_value = "lan")]
    pub network_mode: String,
    /// Timed exchanges per payload size
    #[arg(long, default_value_t = sharenet::bench::DEFAULT_ITERATIONS)]
    pub iterations: usize,
    /// First port of the per-pair port range
    #[arg(long, default_value_t = sharenet::bench::DEFAULT_BASE_PORT)]
    pub base_port: u16,
    /// Directory the result files are written into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Summary CSV path: `benchmark_results_p{N}_id{party}_{mode}.csv`.
pub fn summary_path(dir: &Path, num_parties: usize, party_id: usize, mode: &str) -> PathBuf {
    dir.join(format!(
        "benchmark_results_p{num_parties}_id{party_id}_{mode}.csv"
    ))
}

/// Detailed CSV path: `benchmark_details_p{N}_id{party}_{mode}.csv`.
pub fn details_path(dir: &Path, num_parties: usize, party_id: usize, mode: &str) -> PathBuf {
    dir.join(format!(
        "benchmark_details_p{num_parties}_id{party_id}_{mode}.csv"
    ))
}
