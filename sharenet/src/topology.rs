//! Hypercube topology: who talks to whom, in which round, over which port.
//!
//! All of it is derived from `(id, num_parties)` alone, so every party
//! computes the same answers without negotiating.

use crate::{Error, Result};

/// Connection role for one link. The smaller id of a pair always listens,
/// the larger one connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Listen,
    Connect,
}

/// Everything needed to establish the link used in one exchange round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSpec {
    pub round: usize,
    pub peer: usize,
    pub role: Role,
    pub port: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Topology {
    id: usize,
    num_parties: usize,
    log_n: u32,
}

impl Topology {
    /// Validate `(id, num_parties)` and derive the round count.
    pub fn new(id: usize, num_parties: usize) -> Result<Topology> {
        if num_parties < 2 || !num_parties.is_power_of_two() {
            return Err(Error::InvalidConfiguration(format!(
                "party count must be a power of two >= 2, got {num_parties}"
            )));
        }
        if id >= num_parties {
            return Err(Error::InvalidConfiguration(format!(
                "party id {id} out of range for {num_parties} parties"
            )));
        }
        Ok(Topology {
            id,
            num_parties,
            log_n: num_parties.trailing_zeros(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn num_parties(&self) -> usize {
        self.num_parties
    }

    /// Number of exchange rounds, `log2(num_parties)`.
    pub fn rounds(&self) -> usize {
        self.log_n as usize
    }

    /// The peer exchanged with in `round`: the party whose id differs from
    /// ours in exactly bit `round`.
    pub fn peer(&self, round: usize) -> usize {
        debug_assert!(round < self.rounds());
        self.id ^ (1 << round)
    }

    pub fn role(&self, round: usize) -> Role {
        if self.id > self.peer(round) {
            Role::Connect
        } else {
            Role::Listen
        }
    }

    /// Port both endpoints of a pair derive independently:
    /// `base_port + max(id, peer) * num_parties + min(id, peer)`.
    pub fn port(&self, round: usize, base_port: u16) -> Result<u16> {
        let peer = self.peer(round);
        let hi = self.id.max(peer);
        let lo = self.id.min(peer);
        let port = hi
            .checked_mul(self.num_parties)
            .and_then(|p| p.checked_add(lo))
            .and_then(|p| p.checked_add(base_port as usize))
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "derived port for pair ({lo}, {hi}) overflows"
                ))
            })?;
        u16::try_from(port).map_err(|_| {
            Error::InvalidConfiguration(format!(
                "derived port {port} for pair ({lo}, {hi}) exceeds the 16-bit port range"
            ))
        })
    }

    pub fn link(&self, round: usize, base_port: u16) -> Result<LinkSpec> {
        Ok(LinkSpec {
            round,
            peer: self.peer(round),
            role: self.role(round),
            port: self.port(round, base_port)?,
        })
    }

    /// One `LinkSpec` per round, in round order.
    pub fn links(&self, base_port: u16) -> Result<Vec<LinkSpec>> {
        (0..self.rounds()).map(|r| self.link(r, base_port)).collect()
    }
}
