//! Share buffer: one contiguous region with one slot per party.

use rand::RngCore;

use crate::{Error, Result};

/// `num_slots * slot_size` bytes of exchange state. Slot `j` holds party
/// `j`'s payload once an all-gather completes; before that, only this
/// party's own slot holds meaningful bytes.
#[derive(Debug, Clone)]
pub struct ShareBuffer {
    data: Vec<u8>,
    slot_size: usize,
    num_slots: usize,
}

impl ShareBuffer {
    /// Allocate a zeroed buffer. A zero `slot_size` cannot be benchmarked
    /// and a total size past the address space cannot be allocated; both
    /// are rejected up front.
    pub fn new(num_slots: usize, slot_size: usize) -> Result<ShareBuffer> {
        if slot_size == 0 {
            return Err(Error::InvalidArgument(
                "payload size must be positive".to_string(),
            ));
        }
        let total = num_slots.checked_mul(slot_size).ok_or_else(|| {
            Error::CapacityOverflow(format!(
                "{num_slots} slots of {slot_size} bytes overflow the address space"
            ))
        })?;
        Ok(ShareBuffer {
            data: vec![0; total],
            slot_size,
            num_slots,
        })
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Total length in bytes, `num_slots * slot_size`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Slot `index`, the region `[index * slot_size, (index + 1) * slot_size)`.
    pub fn slot(&self, index: usize) -> &[u8] {
        assert!(index < self.num_slots, "slot {index} out of range");
        &self.data[index * self.slot_size..(index + 1) * self.slot_size]
    }

    /// Overwrite slot `index` with fresh pseudorandom filler.
    pub fn fill_slot<R: RngCore>(&mut self, index: usize, rng: &mut R) {
        assert!(index < self.num_slots, "slot {index} out of range");
        let slot_size = self.slot_size;
        rng.fill_bytes(&mut self.data[index * slot_size..(index + 1) * slot_size]);
    }

    /// The block `[offset, offset + len)`.
    pub fn block(&self, offset: usize, len: usize) -> &[u8] {
        self.check_block(offset, len);
        &self.data[offset..offset + len]
    }

    /// The block `[offset, offset + len)`, writable.
    pub fn block_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        self.check_block(offset, len);
        &mut self.data[offset..offset + len]
    }

    /// The whole region.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn check_block(&self, offset: usize, len: usize) {
        assert!(
            offset
                .checked_add(len)
                .map_or(false, |end| end <= self.data.len()),
            "block [{offset}, {offset} + {len}) out of range for {} bytes",
            self.data.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;

    #[test]
    fn allocates_one_slot_per_party() {
        let buffer = ShareBuffer::new(4, 16).unwrap();
        assert_eq!(buffer.len(), 64);
        assert_eq!(buffer.num_slots(), 4);
        assert_eq!(buffer.slot_size(), 16);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_zero_slot_size() {
        match ShareBuffer::new(4, 0) {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn rejects_total_size_past_the_address_space() {
        match ShareBuffer::new(4, usize::MAX / 2) {
            Err(Error::CapacityOverflow(_)) => {}
            other => panic!("expected CapacityOverflow, got {other:?}"),
        }
    }

    #[test]
    fn slots_tile_the_buffer() {
        let mut buffer = ShareBuffer::new(3, 4).unwrap();
        buffer.block_mut(0, 12).copy_from_slice(&[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
        assert_eq!(buffer.slot(0), &[1, 1, 1, 1]);
        assert_eq!(buffer.slot(1), &[2, 2, 2, 2]);
        assert_eq!(buffer.slot(2), &[3, 3, 3, 3]);
    }

    #[test]
    fn fill_slot_leaves_other_slots_alone() {
        let mut buffer = ShareBuffer::new(3, 4).unwrap();
        let mut rng = StepRng::new(0x0101_0101_0101_0101, 0);
        buffer.fill_slot(1, &mut rng);
        assert_eq!(buffer.slot(0), &[0, 0, 0, 0]);
        assert_eq!(buffer.slot(1), &[1, 1, 1, 1]);
        assert_eq!(buffer.slot(2), &[0, 0, 0, 0]);
    }

    #[test]
    fn blocks_can_straddle_slots() {
        let mut buffer = ShareBuffer::new(4, 4).unwrap();
        buffer.block_mut(2, 4).copy_from_slice(&[9, 9, 9, 9]);
        assert_eq!(buffer.block(0, 8), &[0, 0, 9, 9, 9, 9, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn block_access_is_bounds_checked() {
        let buffer = ShareBuffer::new(2, 4).unwrap();
        buffer.block(4, 8);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn block_bounds_check_survives_offset_overflow() {
        let buffer = ShareBuffer::new(2, 4).unwrap();
        buffer.block(usize::MAX, 2);
    }

    #[test]
    #[should_panic(expected = "slot 2 out of range")]
    fn slot_access_is_bounds_checked() {
        let buffer = ShareBuffer::new(2, 4).unwrap();
        buffer.slot(2);
    }
}
