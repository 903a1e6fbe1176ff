//! Party configuration resource.
//!
//! Line-based text, shared verbatim by every party of a run: the party
//! count, one address per party (index is the party id), then a single line
//! holding the two benchmarked payload sizes in KB.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{Error, Result};

/// Number of payload sizes every run benchmarks.
pub const PAYLOAD_SIZES_PER_RUN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of parties. Must be a power of two; validated when the
    /// topology is derived, not here.
    pub num_parties: usize,
    /// One address per party, index is the party id.
    pub addresses: Vec<String>,
    /// The two benchmarked payload sizes, in KB.
    pub payload_sizes_kb: [u64; PAYLOAD_SIZES_PER_RUN],
}

impl Config {
    /// Read and parse the config resource from a file.
    pub fn load(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| {
            Error::InvalidConfiguration(format!("cannot open {}: {err}", path.display()))
        })?;
        Config::parse(BufReader::new(file))
    }

    /// Parse the config resource. Blank and whitespace-only lines are
    /// skipped; every remaining line must follow the documented layout, with
    /// nothing extra before or after.
    pub fn parse<R: BufRead>(reader: R) -> Result<Config> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line
                .map_err(|err| Error::InvalidConfiguration(format!("cannot read config: {err}")))?;
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        let first = lines
            .first()
            .ok_or_else(|| Error::InvalidConfiguration("config is empty".to_string()))?;
        let num_parties: usize = first.parse().map_err(|_| {
            Error::InvalidConfiguration(format!("party count is not an integer: {first:?}"))
        })?;

        let expected = num_parties.checked_add(2).ok_or_else(|| {
            Error::InvalidConfiguration(format!("party count {num_parties} is out of range"))
        })?;
        if lines.len() != expected {
            return Err(Error::InvalidConfiguration(format!(
                "expected {expected} lines for {num_parties} parties, found {}",
                lines.len(),
            )));
        }

        let addresses = lines[1..1 + num_parties].to_vec();
        let size_line = &lines[1 + num_parties];
        let mut sizes = Vec::with_capacity(PAYLOAD_SIZES_PER_RUN);
        for token in size_line.split_whitespace() {
            let kb: u64 = token.parse().map_err(|_| {
                Error::InvalidConfiguration(format!("payload size is not an integer: {token:?}"))
            })?;
            sizes.push(kb);
        }
        if sizes.len() != PAYLOAD_SIZES_PER_RUN {
            return Err(Error::InvalidConfiguration(format!(
                "expected {PAYLOAD_SIZES_PER_RUN} payload sizes, found {}",
                sizes.len(),
            )));
        }

        Ok(Config {
            num_parties,
            addresses,
            payload_sizes_kb: [sizes[0], sizes[1]],
        })
    }

    /// The configured payload sizes converted to bytes, overflow checked.
    pub fn payload_sizes_bytes(&self) -> Result<[usize; PAYLOAD_SIZES_PER_RUN]> {
        let mut out = [0usize; PAYLOAD_SIZES_PER_RUN];
        for (bytes, &kb) in out.iter_mut().zip(&self.payload_sizes_kb) {
            let scaled = kb.checked_mul(1024).ok_or_else(|| {
                Error::CapacityOverflow(format!("{kb} KB payload does not fit in memory"))
            })?;
            *bytes = usize::try_from(scaled).map_err(|_| {
                Error::CapacityOverflow(format!("{kb} KB payload does not fit in memory"))
            })?;
        }
        Ok(out)
    }
}
