//! Peer link establishment over blocking TCP.
//!
//! Roles and ports come from the topology, so no endpoint negotiates
//! anything. Listener sockets for every listen-role round are bound before
//! the first connect attempt, then links are resolved strictly in round
//! order on both sides.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::topology::{LinkSpec, Role, Topology};
use crate::{Error, Result};

/// Byte exchanged over every link right after setup to verify the wiring.
const SYNC_TOKEN: u8 = b'S';

/// Delay between connect attempts while the peer's listener comes up.
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One established channel to the peer of one exchange round.
#[derive(Debug)]
pub struct PeerLink<C> {
    spec: LinkSpec,
    channel: C,
}

impl<C> PeerLink<C> {
    pub fn new(spec: LinkSpec, channel: C) -> PeerLink<C> {
        PeerLink { spec, channel }
    }

    pub fn round(&self) -> usize {
        self.spec.round
    }

    pub fn peer(&self) -> usize {
        self.spec.peer
    }
}

impl<C: Read + Write> PeerLink<C> {
    /// Send a whole block and flush it out.
    pub fn send_block(&mut self, block: &[u8]) -> io::Result<()> {
        self.channel.write_all(block)?;
        self.channel.flush()
    }

    /// Receive exactly `block.len()` bytes.
    pub fn recv_block(&mut self, block: &mut [u8]) -> io::Result<()> {
        self.channel.read_exact(block)
    }
}

/// Establish one TCP link per round, in round order.
pub fn establish(
    topology: &Topology,
    addresses: &[String],
    base_port: u16,
) -> Result<Vec<PeerLink<TcpStream>>> {
    if addresses.len() != topology.num_parties() {
        return Err(Error::InvalidConfiguration(format!(
            "{} addresses for {} parties",
            addresses.len(),
            topology.num_parties(),
        )));
    }
    let specs = topology.links(base_port)?;
    let id = topology.id();

    // Bind every listener up front so a faster peer can reach us while we
    // are still resolving earlier rounds.
    let mut listeners: Vec<Option<TcpListener>> = Vec::with_capacity(specs.len());
    for spec in &specs {
        match spec.role {
            Role::Listen => {
                let listener = TcpListener::bind(("0.0.0.0", spec.port))
                    .map_err(Error::TopologySetupFailure)?;
                debug!(
                    "party {id}: round {} listening on port {} for party {}",
                    spec.round, spec.port, spec.peer,
                );
                listeners.push(Some(listener));
            }
            Role::Connect => listeners.push(None),
        }
    }

    let mut links = Vec::with_capacity(specs.len());
    for (spec, listener) in specs.iter().zip(listeners) {
        let stream = match listener {
            Some(listener) => {
                let (stream, from) = listener.accept().map_err(Error::TopologySetupFailure)?;
                debug!(
                    "party {id}: round {} accepted party {} from {from}",
                    spec.round, spec.peer,
                );
                stream
            }
            None => connect_retrying(&addresses[spec.peer], spec, id)?,
        };
        stream
            .set_nodelay(true)
            .map_err(Error::TopologySetupFailure)?;
        links.push(PeerLink::new(*spec, stream));
    }
    debug!("party {id}: all {} links established", links.len());
    Ok(links)
}

/// Connect to a peer that may not be listening yet. Refused connections are
/// retried until the peer comes up; any other failure ends the setup. A peer
/// that never starts leaves us retrying, which is the documented behavior
/// for a liveness-free setup.
fn connect_retrying(address: &str, spec: &LinkSpec, id: usize) -> Result<TcpStream> {
    let target = format!("{address}:{}", spec.port);
    let mut attempts = 0u32;
    loop {
        match TcpStream::connect(&target) {
            Ok(stream) => {
                debug!(
                    "party {id}: round {} connected to party {} at {target}",
                    spec.round, spec.peer,
                );
                return Ok(stream);
            }
            Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                attempts += 1;
                if attempts % 50 == 0 {
                    debug!("party {id}: still waiting for party {} at {target}", spec.peer);
                }
                thread::sleep(CONNECT_RETRY_DELAY);
            }
            Err(err) => return Err(Error::TopologySetupFailure(err)),
        }
    }
}

/// Exchange one token over every link, in round order, under the same
/// lower-id-sends-first rule the exchange itself uses. A wrong byte means
/// the port plan connected the wrong processes.
pub fn synchronize<C: Read + Write>(topology: &Topology, links: &mut [PeerLink<C>]) -> Result<()> {
    for link in links.iter_mut() {
        let mut token = [0u8; 1];
        let handshake = if topology.id() < link.peer() {
            link.send_block(&[SYNC_TOKEN])
                .and_then(|()| link.recv_block(&mut token))
        } else {
            link.recv_block(&mut token)
                .and_then(|()| link.send_block(&[SYNC_TOKEN]))
        };
        handshake.map_err(Error::TopologySetupFailure)?;
        if token[0] != SYNC_TOKEN {
            return Err(Error::TopologySetupFailure(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "bad sync token {:#04x} from party {} on round {}",
                    token[0],
                    link.peer(),
                    link.round(),
                ),
            )));
        }
    }
    debug!("party {}: synchronized with all peers", topology.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::testchan;
    use crate::topology::Topology;

    #[test]
    fn sync_exchanges_the_token_both_ways() {
        let (chan0, chan1) = testchan::pair();
        let handles = [(0usize, chan0), (1usize, chan1)].map(|(id, chan)| {
            thread::spawn(move || {
                let topo = Topology::new(id, 2).unwrap();
                let mut links = vec![PeerLink::new(topo.link(0, 9000).unwrap(), chan)];
                synchronize(&topo, &mut links)
            })
        });
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    }

    #[test]
    fn sync_rejects_a_wrong_token() {
        let (chan0, mut chan1) = testchan::pair();
        let topo = Topology::new(0, 2).unwrap();
        let mut links = vec![PeerLink::new(topo.link(0, 9000).unwrap(), chan0)];
        // impostor: answers the handshake with the wrong byte
        let peer = thread::spawn(move || {
            let mut token = [0u8; 1];
            chan1.read(&mut token).unwrap();
            chan1.write_all(b"A").unwrap();
        });
        match synchronize(&topo, &mut links) {
            Err(Error::TopologySetupFailure(err)) => {
                assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected TopologySetupFailure, got {other:?}"),
        }
        peer.join().unwrap();
    }

    #[test]
    fn sync_reports_a_dead_peer() {
        let (chan0, chan1) = testchan::pair();
        drop(chan1);
        let topo = Topology::new(0, 2).unwrap();
        let mut links = vec![PeerLink::new(topo.link(0, 9000).unwrap(), chan0)];
        match synchronize(&topo, &mut links) {
            Err(Error::TopologySetupFailure(_)) => {}
            other => panic!("expected TopologySetupFailure, got {other:?}"),
        }
    }
}
