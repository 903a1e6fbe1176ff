//! Benchmark harness: drives the exchange engine over each payload size.
//!
//! Modeled on the warm-up-then-measure loop of the OSU microbenchmarks.

use std::io::{Read, Write};
use std::time::Duration;

use log::info;
use rand::RngCore;
use serde::Deserialize;

use crate::buffer::ShareBuffer;
use crate::exchange::{self, ExchangeTiming};
use crate::net::PeerLink;
use crate::topology::Topology;
use crate::Result;

/// Timed exchanges per payload size; the warm-up comes on top.
pub const DEFAULT_ITERATIONS: usize = 5;

/// First port of the deterministic per-pair port range.
pub const DEFAULT_BASE_PORT: u16 = 8080;

/// Tunables that stay fixed for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchOptions {
    pub iterations: usize,
    pub base_port: u16,
}

impl Default for BenchOptions {
    fn default() -> BenchOptions {
        BenchOptions {
            iterations: DEFAULT_ITERATIONS,
            base_port: DEFAULT_BASE_PORT,
        }
    }
}

/// Timing samples for one benchmarked payload size.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    /// Payload size in bytes.
    pub payload_size: usize,
    /// Arithmetic mean of the timed whole-exchange durations, in ms.
    pub mean_ms: f64,
    /// One entry per timed iteration, in order; the warm-up is not recorded.
    pub iterations: Vec<ExchangeTiming>,
}

/// Composite result of a whole run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub party_id: usize,
    pub num_parties: usize,
    pub network_mode: String,
    /// One-time link establishment and synchronization duration.
    pub setup_time: Duration,
    /// One entry per configured payload size, in configured order.
    pub phases: Vec<PhaseResult>,
}

/// Benchmark one payload size over already established links: allocate and
/// seed the share buffer, run one discarded warm-up exchange, reseed, then
/// run `iterations` timed ones.
pub fn run_phase<C, R>(
    topology: &Topology,
    links: &mut [PeerLink<C>],
    payload_size: usize,
    iterations: usize,
    rng: &mut R,
) -> Result<PhaseResult>
where
    C: Read + Write,
    R: RngCore,
{
    let mut buffer = ShareBuffer::new(topology.num_parties(), payload_size)?;
    buffer.fill_slot(topology.id(), rng);

    // Warm-up absorbs first-use costs; its timing is discarded.
    exchange::all_gather(topology, links, &mut buffer)?;

    buffer.fill_slot(topology.id(), rng);
    let mut timings = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        timings.push(exchange::all_gather(topology, links, &mut buffer)?);
    }

    let mean_ms = mean_millis(&timings);
    info!(
        "party {}: {payload_size} byte payload averaged {mean_ms:.3} ms over {iterations} iterations",
        topology.id(),
    );
    Ok(PhaseResult {
        payload_size,
        mean_ms,
        iterations: timings,
    })
}

fn mean_millis(timings: &[ExchangeTiming]) -> f64 {
    if timings.is_empty() {
        return 0.0;
    }
    let total: Duration = timings.iter().map(|t| t.total).sum();
    total.as_secs_f64() * 1e3 / timings.len() as f64
}
