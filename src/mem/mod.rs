//! Physical memory as seen by the loader.
//!
//! There is no virtual memory: every address a user program names is
//! a physical address, and the loader writes segments straight into it.

/// Byte-addressable physical memory.
pub trait PhysicalMemory {
    /// Borrow `len` bytes starting at physical address `addr`, or `None`
    /// if any part of the range is not available memory.
    fn region_mut(&mut self, addr: u64, len: u64) -> Option<&mut [u8]>;
}

/// Identity-mapped DRAM between `start` and `end`.
#[derive(Debug)]
pub struct IdentityMemory {
    start: u64,
    end: u64,
}
impl IdentityMemory {
    /// The range must be RAM that nothing else in the kernel uses.
    pub const unsafe fn new(start: u64, end: u64) -> IdentityMemory {
        IdentityMemory { start, end }
    }
    pub fn contains(&self, addr: u64, len: u64) -> bool {
        match addr.checked_add(len) {
            Some(top) => addr >= self.start && top <= self.end,
            None => false,
        }
    }
}
impl PhysicalMemory for IdentityMemory {
    fn region_mut(&mut self, addr: u64, len: u64) -> Option<&mut [u8]> {
        if !self.contains(addr, len) {
            return None;
        }
        let len = usize::try_from(len).ok()?;
        Some(unsafe { core::slice::from_raw_parts_mut(addr as usize as *mut u8, len) })
    }
}

/// A block of host memory standing in for DRAM at `base`.
#[cfg(test)]
pub struct SimMemory {
    pub base: u64,
    pub bytes: Vec<u8>,
}
#[cfg(test)]
impl SimMemory {
    /// `len` bytes of 0xAA, so untouched memory is easy to spot.
    pub fn new(base: u64, len: usize) -> SimMemory {
        SimMemory {
            base,
            bytes: vec![0xAA; len],
        }
    }
    pub fn slice(&self, addr: u64, len: usize) -> &[u8] {
        let offset = (addr - self.base) as usize;
        &self.bytes[offset..offset + len]
    }
}
#[cfg(test)]
impl PhysicalMemory for SimMemory {
    fn region_mut(&mut self, addr: u64, len: u64) -> Option<&mut [u8]> {
        let offset = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let top = offset.checked_add(usize::try_from(len).ok()?)?;
        self.bytes.get_mut(offset..top)
    }
}
