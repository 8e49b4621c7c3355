//! Flattened device tree scanning.
//!
//! Firmware hands machine mode a device tree blob in a1. The kernel
//! only needs three facts from it: how much memory there is, whether
//! the host-target interface is present, and where the host put the
//! program image (the initrd).

use arrayvec::ArrayVec;
use core::fmt;

pub const FDT_MAGIC: u32 = 0xd00d_feed;
/// Newest layout this scanner reads.
pub const FDT_VERSION: u32 = 17;

const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_NOP: u32 = 4;
const FDT_END: u32 = 9;

const HEADER_SIZE: usize = 40;
/// Deepest node nesting the scanner follows.
pub const MAX_DEPTH: usize = 16;
pub const MAX_MEMORY_REGIONS: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DtbError {
    BadMagic(u32),
    UnsupportedVersion { version: u32, last_compatible: u32 },
    /// A header size, offset, or structure token runs past the blob.
    Truncated,
    BadToken(u32),
    TooDeep,
}
impl fmt::Display for DtbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtbError::BadMagic(magic) => write!(f, "bad device tree magic {:#x}", magic),
            DtbError::UnsupportedVersion {
                version,
                last_compatible,
            } => write!(
                f,
                "unsupported device tree version {} (compatible with {})",
                version, last_compatible
            ),
            DtbError::Truncated => write!(f, "truncated device tree"),
            DtbError::BadToken(token) => write!(f, "bad device tree token {:#x}", token),
            DtbError::TooDeep => write!(f, "device tree nested deeper than {}", MAX_DEPTH),
        }
    }
}

fn be32(bytes: &[u8], at: usize) -> Result<u32, DtbError> {
    let word = bytes.get(at..at + 4).ok_or(DtbError::Truncated)?;
    Ok(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

/// A big-endian number made of `cells` 32-bit cells.
fn read_cells(bytes: &[u8], cells: u32) -> Option<u64> {
    if cells == 0 || cells > 2 || bytes.len() < cells as usize * 4 {
        return None;
    }
    let mut value = 0u64;
    for i in 0..cells as usize {
        value = (value << 32) | u64::from(be32(bytes, i * 4).ok()?);
    }
    Some(value)
}

/// The bytes up to (not including) the first NUL.
fn cstr(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// A validated device tree blob.
#[derive(Copy, Clone, Debug)]
pub struct Fdt<'a> {
    pub version: u32,
    structs: &'a [u8],
    strings: &'a [u8],
}
impl<'a> Fdt<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Fdt<'a>, DtbError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DtbError::Truncated);
        }
        let magic = be32(bytes, 0)?;
        if magic != FDT_MAGIC {
            return Err(DtbError::BadMagic(magic));
        }
        let totalsize = be32(bytes, 4)? as usize;
        let off_dt_struct = be32(bytes, 8)? as usize;
        let off_dt_strings = be32(bytes, 12)? as usize;
        let version = be32(bytes, 20)?;
        let last_compatible = be32(bytes, 24)?;
        let size_dt_strings = be32(bytes, 32)? as usize;
        let size_dt_struct = be32(bytes, 36)? as usize;

        // Version 17 is the first to record the structure block size.
        if version < FDT_VERSION || last_compatible > FDT_VERSION {
            return Err(DtbError::UnsupportedVersion {
                version,
                last_compatible,
            });
        }

        let blob = bytes.get(..totalsize).ok_or(DtbError::Truncated)?;
        let structs = blob
            .get(off_dt_struct..off_dt_struct.saturating_add(size_dt_struct))
            .ok_or(DtbError::Truncated)?;
        let strings = blob
            .get(off_dt_strings..off_dt_strings.saturating_add(size_dt_strings))
            .ok_or(DtbError::Truncated)?;
        Ok(Fdt {
            version,
            structs,
            strings,
        })
    }
    /// Validate the blob at `ptr`, trusting its header for the length.
    pub unsafe fn from_ptr(ptr: *const u8) -> Result<Fdt<'static>, DtbError> {
        let header = core::slice::from_raw_parts(ptr, 8);
        let magic = be32(header, 0)?;
        if magic != FDT_MAGIC {
            return Err(DtbError::BadMagic(magic));
        }
        let totalsize = be32(header, 4)? as usize;
        Fdt::new(core::slice::from_raw_parts(ptr, totalsize))
    }
    fn string(&self, offset: u32) -> Result<&'a [u8], DtbError> {
        let bytes = self.strings.get(offset as usize..).ok_or(DtbError::Truncated)?;
        Ok(cstr(bytes))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
}

/// What the kernel learns from the device tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub memory: ArrayVec<MemoryRegion, MAX_MEMORY_REGIONS>,
    /// A node is compatible with "ucb,htif0".
    pub htif: bool,
    /// Start and end of the initrd, from /chosen.
    pub initrd: Option<(u64, u64)>,
}

struct Node<'a> {
    name: &'a [u8],
    /// Cell counts for this node's children.
    address_cells: u32,
    size_cells: u32,
    is_memory: bool,
    reg: Option<&'a [u8]>,
    initrd_start: Option<u64>,
    initrd_end: Option<u64>,
}
impl<'a> Node<'a> {
    fn new(name: &'a [u8]) -> Node<'a> {
        Node {
            name,
            address_cells: 2,
            size_cells: 1,
            is_memory: false,
            reg: None,
            initrd_start: None,
            initrd_end: None,
        }
    }
}

impl DeviceInfo {
    pub fn scan(fdt: &Fdt<'_>) -> Result<DeviceInfo, DtbError> {
        let mut info = DeviceInfo::default();
        let mut stack: ArrayVec<Node<'_>, MAX_DEPTH> = ArrayVec::new();
        let structs = fdt.structs;
        let mut pos = 0;

        loop {
            let token = be32(structs, pos)?;
            pos += 4;
            match token {
                FDT_BEGIN_NODE => {
                    let rest = structs.get(pos..).ok_or(DtbError::Truncated)?;
                    let name = cstr(rest);
                    if name.len() == rest.len() {
                        return Err(DtbError::Truncated);
                    }
                    pos += align4(name.len() + 1);
                    stack.try_push(Node::new(name)).map_err(|_| DtbError::TooDeep)?;
                }
                FDT_END_NODE => {
                    let node = stack.pop().ok_or(DtbError::BadToken(token))?;
                    let (address_cells, size_cells) = match stack.last() {
                        Some(parent) => (parent.address_cells, parent.size_cells),
                        None => (2, 1),
                    };
                    if node.is_memory {
                        if let Some(reg) = node.reg {
                            info.add_memory(reg, address_cells, size_cells);
                        }
                    }
                    if let (Some(start), Some(end)) = (node.initrd_start, node.initrd_end) {
                        info.initrd = Some((start, end));
                    }
                }
                FDT_PROP => {
                    let len = be32(structs, pos)? as usize;
                    let name = fdt.string(be32(structs, pos + 4)?)?;
                    pos += 8;
                    let value = structs.get(pos..pos + len).ok_or(DtbError::Truncated)?;
                    pos += align4(len);

                    let depth = stack.len();
                    let node = stack.last_mut().ok_or(DtbError::BadToken(token))?;
                    match name {
                        b"#address-cells" => node.address_cells = be32(value, 0)?,
                        b"#size-cells" => node.size_cells = be32(value, 0)?,
                        b"device_type" => node.is_memory = cstr(value) == b"memory",
                        b"reg" => node.reg = Some(value),
                        b"compatible" => {
                            if value.split(|&b| b == 0).any(|c| c == b"ucb,htif0") {
                                info.htif = true;
                            }
                        }
                        b"linux,initrd-start" if depth == 2 && node.name == b"chosen" => {
                            node.initrd_start = read_cells(value, value.len() as u32 / 4);
                        }
                        b"linux,initrd-end" if depth == 2 && node.name == b"chosen" => {
                            node.initrd_end = read_cells(value, value.len() as u32 / 4);
                        }
                        _ => {}
                    }
                }
                FDT_NOP => {}
                FDT_END => break,
                _ => return Err(DtbError::BadToken(token)),
            }
        }

        Ok(info)
    }
    fn add_memory(&mut self, reg: &[u8], address_cells: u32, size_cells: u32) {
        // Addresses and sizes wider than 64 bits can't be represented.
        if !(1..=2).contains(&address_cells) || !(1..=2).contains(&size_cells) {
            return;
        }
        let address_bytes = address_cells as usize * 4;
        let entry = address_bytes + size_cells as usize * 4;
        for chunk in reg.chunks_exact(entry) {
            let (base, size) = chunk.split_at(address_bytes);
            let (Some(base), Some(size)) =
                (read_cells(base, address_cells), read_cells(size, size_cells))
            else {
                continue;
            };
            if self.memory.try_push(MemoryRegion { base, size }).is_err() {
                return;
            }
        }
    }
    /// Total bytes of memory across all regions.
    pub fn memory_size(&self) -> u64 {
        self.memory.iter().fold(0, |total, r| total.saturating_add(r.size))
    }
    /// One past the last byte of the memory region containing `addr`.
    pub fn memory_end(&self, addr: u64) -> Option<u64> {
        self.memory
            .iter()
            .find(|r| addr >= r.base && addr - r.base < r.size)
            .map(|r| r.base.saturating_add(r.size))
    }
}
