//! In-process duplex byte channels standing in for sockets in tests.

use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender};

#[derive(Debug)]
enum Tx {
    Buffered(Sender<Vec<u8>>),
    Rendezvous(SyncSender<Vec<u8>>),
}

impl Tx {
    fn send(&self, chunk: Vec<u8>) -> io::Result<()> {
        let sent = match self {
            Tx::Buffered(tx) => tx.send(chunk).is_ok(),
            Tx::Rendezvous(tx) => tx.send(chunk).is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer dropped"))
        }
    }
}

/// One end of an in-process duplex byte stream. Reads block until the peer
/// writes, like a blocking socket; a dropped peer reads as EOF.
#[derive(Debug)]
pub(crate) struct Loopback {
    tx: Tx,
    rx: Receiver<Vec<u8>>,
    carry: Vec<u8>,
}

/// A connected pair of ends with unbounded buffering, the friendliest
/// possible kernel.
pub(crate) fn pair() -> (Loopback, Loopback) {
    let (tx_a, rx_b) = channel();
    let (tx_b, rx_a) = channel();
    (
        Loopback {
            tx: Tx::Buffered(tx_a),
            rx: rx_a,
            carry: Vec::new(),
        },
        Loopback {
            tx: Tx::Buffered(tx_b),
            rx: rx_b,
            carry: Vec::new(),
        },
    )
}

/// A connected pair where every write blocks until the peer reads it, the
/// most adversarial schedule a blocking transport can produce.
pub(crate) fn rendezvous_pair() -> (Loopback, Loopback) {
    let (tx_a, rx_b) = sync_channel(0);
    let (tx_b, rx_a) = sync_channel(0);
    (
        Loopback {
            tx: Tx::Rendezvous(tx_a),
            rx: rx_a,
            carry: Vec::new(),
        },
        Loopback {
            tx: Tx::Rendezvous(tx_b),
            rx: rx_b,
            carry: Vec::new(),
        },
    )
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.carry.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.carry = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = self.carry.len().min(buf.len());
        buf[..n].copy_from_slice(&self.carry[..n]);
        self.carry.drain(..n);
        Ok(n)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx.send(buf.to_vec())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn bytes_cross_in_both_directions() {
        let (mut a, mut b) = pair();
        a.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        b.write_all(b"pong").unwrap();
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn short_reads_drain_a_large_write() {
        let (mut a, mut b) = pair();
        a.write_all(&[7u8; 32]).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 5];
        for _ in 0..7 {
            let n = b.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, vec![7u8; 32]);
    }

    #[test]
    fn dropped_peer_reads_as_eof() {
        let (a, mut b) = pair();
        drop(a);
        let mut buf = [0u8; 1];
        assert_eq!(b.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn rendezvous_write_blocks_until_the_peer_reads() {
        let (mut a, mut b) = rendezvous_pair();
        let writer = thread::spawn(move || {
            a.write_all(b"x").unwrap();
        });
        let mut buf = [0u8; 1];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
        writer.join().unwrap();
    }
}
