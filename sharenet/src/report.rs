//! CSV rendering of the benchmark results.
//!
//! The column layout is fixed by downstream analysis tooling. Durations are
//! milliseconds with three decimal places; the `Round` column is the
//! 1-based payload-size phase, not an exchange round.

use std::io::{self, Write};
use std::time::Duration;

use crate::bench::RunResult;

const KB: usize = 1024;

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

/// Write the summary shape: one row per payload-size phase with the mean
/// exchange latency.
pub fn write_summary<W: Write>(mut out: W, result: &RunResult) -> io::Result<()> {
    writeln!(out, "Round,DataSize_KB,DataSize_Bytes,Time_ms,PartyID,NumParties")?;
    for (index, phase) in result.phases.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{:.3},{},{}",
            index + 1,
            phase.payload_size / KB,
            phase.payload_size,
            phase.mean_ms,
            result.party_id,
            result.num_parties,
        )?;
    }
    Ok(())
}

/// Write the detailed shape: one row per (phase, iteration) with the whole
/// exchange duration and the send/receive durations of every round.
pub fn write_details<W: Write>(mut out: W, result: &RunResult) -> io::Result<()> {
    let rounds = result.phases.first().map_or(0, |phase| {
        phase.iterations.first().map_or(0, |timing| timing.rounds.len())
    });

    write!(out, "Round,Iteration,DataSize_KB,DataSize_Bytes,TotalTime_ms")?;
    for round in 0..rounds {
        write!(out, ",SendToPeer{round}_ms,RecvFromPeer{round}_ms")?;
    }
    writeln!(out, ",PartyID,NumParties")?;

    for (index, phase) in result.phases.iter().enumerate() {
        for (iteration, timing) in phase.iterations.iter().enumerate() {
            write!(
                out,
                "{},{},{},{},{:.3}",
                index + 1,
                iteration + 1,
                phase.payload_size / KB,
                phase.payload_size,
                ms(timing.total),
            )?;
            for link in &timing.rounds {
                write!(out, ",{:.3},{:.3}", ms(link.send), ms(link.recv))?;
            }
            writeln!(out, ",{},{}", result.party_id, result.num_parties)?;
        }
    }
    Ok(())
}
