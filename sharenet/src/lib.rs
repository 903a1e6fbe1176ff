//! Share-exchange latency benchmark for clusters of MPC-style parties.
//!
//! `N` party processes (one id each, `N` a power of two) connect pairwise
//! over blocking TCP and measure how long a recursive-doubling all-gather of
//! a configurable payload takes. See `benchmarks/` for the process entry
//! point.

use std::fmt;
use std::io;
use std::time::Instant;

use log::{info, warn};
use rand::thread_rng;

pub mod bench;
pub mod buffer;
pub mod config;
pub mod exchange;
pub mod net;
pub mod report;
pub mod topology;

#[cfg(test)]
pub(crate) mod testchan;

pub use bench::{BenchOptions, PhaseResult, RunResult};
pub use config::Config;
pub use topology::Topology;

/// Everything here is fatal to the run; nothing is retried or recovered
/// once setup has finished.
#[derive(Debug)]
pub enum Error {
    /// Malformed config resource, party count that is not a power of two,
    /// an out-of-range party id, or a derived port outside the 16-bit
    /// range. Raised before any network activity.
    InvalidConfiguration(String),
    /// A caller-supplied value that cannot be benchmarked, like a zero
    /// payload size or a zero iteration count.
    InvalidArgument(String),
    /// A buffer size that does not fit in the address space.
    CapacityOverflow(String),
    /// Bind, accept, connect, or post-setup synchronization failure.
    TopologySetupFailure(io::Error),
    /// Send or receive failure in the middle of an exchange.
    TransportFailure(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::CapacityOverflow(msg) => write!(f, "capacity overflow: {msg}"),
            Error::TopologySetupFailure(err) => write!(f, "connection setup failed: {err}"),
            Error::TransportFailure(err) => write!(f, "transport failed mid-exchange: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TopologySetupFailure(err) | Error::TransportFailure(err) => Some(err),
            _ => None,
        }
    }
}

/// Network modes the deployment tooling is known to pass. Anything else is
/// accepted with a warning since the mode is only a label on the output.
const KNOWN_NETWORK_MODES: &[&str] = &["lan", "wan"];

/// Run the whole benchmark as party `party_id` with default options.
pub fn run(party_id: usize, config: &Config, network_mode: &str) -> Result<RunResult> {
    run_with(party_id, config, network_mode, &BenchOptions::default())
}

/// Run the whole benchmark: establish one link per hypercube round, verify
/// the wiring, then benchmark each configured payload size over the same
/// links.
pub fn run_with(
    party_id: usize,
    config: &Config,
    network_mode: &str,
    options: &BenchOptions,
) -> Result<RunResult> {
    if !KNOWN_NETWORK_MODES.contains(&network_mode) {
        warn!("unrecognized network mode {network_mode:?}, continuing");
    }
    if options.iterations == 0 {
        return Err(Error::InvalidArgument(
            "iteration count must be positive".to_string(),
        ));
    }
    let topology = Topology::new(party_id, config.num_parties)?;
    let payload_sizes = config.payload_sizes_bytes()?;

    let setup_started = Instant::now();
    let mut links = net::establish(&topology, &config.addresses, options.base_port)?;
    net::synchronize(&topology, &mut links)?;
    let setup_time = setup_started.elapsed();
    info!(
        "party {party_id}: {} links up in {:.3} ms",
        links.len(),
        setup_time.as_secs_f64() * 1e3,
    );

    let mut rng = thread_rng();
    let mut phases = Vec::with_capacity(payload_sizes.len());
    for payload_size in payload_sizes {
        phases.push(bench::run_phase(
            &topology,
            &mut links,
            payload_size,
            options.iterations,
            &mut rng,
        )?);
    }

    Ok(RunResult {
        party_id,
        num_parties: config.num_parties,
        network_mode: network_mode.to_string(),
        setup_time,
        phases,
    })
}
