//! Recursive-doubling all-gather over established peer links.
//!
//! Each round exchanges the party's owned contiguous block with the round's
//! peer and doubles the block, so `log2(N)` rounds fill the whole buffer.
//! Within a pair the lower id sends before it receives and the higher id
//! receives before it sends, which keeps fully blocking links free of
//! deadlock. Follows the recursive-doubling scheme used for MPI allgather.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use log::debug;

use crate::buffer::ShareBuffer;
use crate::net::PeerLink;
use crate::topology::Topology;
use crate::{Error, Result};

/// Durations of the two transfers over one link during one exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkTiming {
    pub send: Duration,
    pub recv: Duration,
}

/// Timing of one full all-gather: the whole exchange plus one entry per
/// round, in round order.
#[derive(Debug, Clone)]
pub struct ExchangeTiming {
    pub total: Duration,
    pub rounds: Vec<LinkTiming>,
}

/// Run one full all-gather.
///
/// On entry slot `id` holds this party's payload and every other slot is
/// arbitrary; on return slot `j` holds party `j`'s payload, for every `j`.
/// Running it again with the buffer left in place reproduces the same final
/// contents.
pub fn all_gather<C: Read + Write>(
    topology: &Topology,
    links: &mut [PeerLink<C>],
    buffer: &mut ShareBuffer,
) -> Result<ExchangeTiming> {
    assert_eq!(links.len(), topology.rounds(), "one link per round");
    assert_eq!(
        buffer.num_slots(),
        topology.num_parties(),
        "one slot per party"
    );

    let id = topology.id();
    let payload_size = buffer.slot_size();
    let mut offset = id * payload_size;
    let mut block_size = payload_size;
    let mut rounds = Vec::with_capacity(links.len());
    let started = Instant::now();

    for link in links.iter_mut() {
        debug_assert_eq!(link.peer(), topology.peer(link.round()));
        let timing = if id < link.peer() {
            // Ship our block, then grow upward with the peer's. The owned
            // block keeps its start.
            let send_started = Instant::now();
            link.send_block(buffer.block(offset, block_size))
                .map_err(Error::TransportFailure)?;
            let send = send_started.elapsed();

            let recv_started = Instant::now();
            link.recv_block(buffer.block_mut(offset + block_size, block_size))
                .map_err(Error::TransportFailure)?;
            LinkTiming {
                send,
                recv: recv_started.elapsed(),
            }
        } else {
            // Take the peer's block just below ours, then ship; the owned
            // block now starts one block earlier.
            let recv_started = Instant::now();
            link.recv_block(buffer.block_mut(offset - block_size, block_size))
                .map_err(Error::TransportFailure)?;
            let recv = recv_started.elapsed();

            let send_started = Instant::now();
            link.send_block(buffer.block(offset, block_size))
                .map_err(Error::TransportFailure)?;
            offset -= block_size;
            LinkTiming {
                send: send_started.elapsed(),
                recv,
            }
        };
        debug!(
            "party {id}: round {} with party {} done ({block_size} bytes each way)",
            link.round(),
            link.peer(),
        );
        rounds.push(timing);
        block_size *= 2;
    }

    debug_assert_eq!(offset, 0);
    debug_assert_eq!(block_size, buffer.len());
    Ok(ExchangeTiming {
        total: started.elapsed(),
        rounds,
    })
}
