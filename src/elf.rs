//! Loading a statically linked ELF64 executable into physical memory.

use crate::{arch::riscv::USER_STACK, mem::PhysicalMemory, println, proc::process::Process};
use core::{fmt, mem::size_of};
use goblin::elf::{
    header::{ELFMAG, SELFMAG},
    program_header::PT_LOAD,
};
use goblin::elf64::{
    header::{Header as ElfHeader, SIZEOF_EHDR},
    program_header::{ProgramHeader, SIZEOF_PHDR},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ElfError {
    /// The backing store failed, or returned fewer bytes than asked for.
    Io,
    /// A segment's destination is not available memory.
    OutOfMemory,
    NotElf,
    /// The image is an ELF file, but its headers make no sense.
    Malformed,
}
impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::Io => write!(f, "I/O error while reading the image"),
            ElfError::OutOfMemory => write!(f, "no memory for a loadable segment"),
            ElfError::NotElf => write!(f, "not an ELF executable"),
            ElfError::Malformed => write!(f, "malformed ELF headers"),
        }
    }
}

/// Something the raw executable can be read from.
pub trait BackingStore {
    /// Read up to `buf.len()` bytes at `offset`, returning how many were read.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, ElfError>;
}

/// An executable already sitting in memory, such as an initrd.
#[derive(Copy, Clone, Debug)]
pub struct RamImage<'a> {
    bytes: &'a [u8],
}
impl<'a> RamImage<'a> {
    pub fn new(bytes: &'a [u8]) -> RamImage<'a> {
        RamImage { bytes }
    }
    /// `start..end` must be readable memory that stays untouched
    /// for as long as the image is used.
    pub unsafe fn from_raw(start: u64, end: u64) -> RamImage<'a> {
        let len = end.saturating_sub(start) as usize;
        RamImage::new(core::slice::from_raw_parts(start as usize as *const u8, len))
    }
}
impl BackingStore for RamImage<'_> {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, ElfError> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        let Some(available) = self.bytes.get(offset..) else {
            return Ok(0);
        };
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

/// An ELF structure that can be filled straight from the image's bytes.
///
/// Only for goblin's `#[repr(C)]` ELF64 structures: integer fields, no
/// padding, any bit pattern valid. Images are little endian, like the hart.
unsafe trait RawElf: Copy + Default {
    const SIZE: usize;
}
unsafe impl RawElf for ElfHeader {
    const SIZE: usize = SIZEOF_EHDR;
}
unsafe impl RawElf for ProgramHeader {
    const SIZE: usize = SIZEOF_PHDR;
}
const _: () = assert!(size_of::<ElfHeader>() == SIZEOF_EHDR);
const _: () = assert!(size_of::<ProgramHeader>() == SIZEOF_PHDR);

fn read_raw<T: RawElf, S: BackingStore>(source: &mut S, offset: u64) -> Result<T, ElfError> {
    let mut value = T::default();
    let bytes = unsafe { core::slice::from_raw_parts_mut(&mut value as *mut T as *mut u8, T::SIZE) };
    read_exact(source, bytes, offset)?;
    Ok(value)
}

/// What a successful load put in memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    pub entry: u64,
    /// Number of loadable segments copied.
    pub segments: usize,
}

fn read_exact<S: BackingStore>(source: &mut S, buf: &mut [u8], offset: u64) -> Result<(), ElfError> {
    if source.read_at(buf, offset)? != buf.len() {
        return Err(ElfError::Io);
    }
    Ok(())
}

/// A validated image, ready to be loaded.
pub struct ElfLoader<'s, S: BackingStore> {
    source: &'s mut S,
    header: ElfHeader,
}
impl<'s, S: BackingStore> ElfLoader<'s, S> {
    /// Read and check the file header. Touches no memory.
    pub fn init(source: &'s mut S) -> Result<ElfLoader<'s, S>, ElfError> {
        let header: ElfHeader = read_raw(source, 0)?;
        if &header.e_ident[..SELFMAG] != ELFMAG {
            return Err(ElfError::NotElf);
        }
        Ok(ElfLoader { source, header })
    }
    /// Copy every loadable segment to its virtual address, which is also
    /// its physical address, and zero the rest of its memory size.
    ///
    /// Segments are loaded in file order. A failure part way through
    /// leaves the segments before it in place.
    pub fn load<M: PhysicalMemory>(&mut self, memory: &mut M) -> Result<LoadedImage, ElfError> {
        let header = self.header;
        if header.e_phnum > 0 && usize::from(header.e_phentsize) < SIZEOF_PHDR {
            return Err(ElfError::Malformed);
        }

        let mut segments = 0;
        for i in 0..u64::from(header.e_phnum) {
            let offset = header
                .e_phoff
                .checked_add(i * u64::from(header.e_phentsize))
                .ok_or(ElfError::Malformed)?;
            let ph: ProgramHeader = read_raw(self.source, offset)?;

            if ph.p_type != PT_LOAD {
                continue;
            }
            if ph.p_memsz < ph.p_filesz || ph.p_vaddr.checked_add(ph.p_memsz).is_none() {
                return Err(ElfError::Malformed);
            }

            let dest = memory
                .region_mut(ph.p_vaddr, ph.p_memsz)
                .ok_or(ElfError::OutOfMemory)?;
            let filesz = usize::try_from(ph.p_filesz).map_err(|_| ElfError::Malformed)?;
            let (file, zeroed) = dest.split_at_mut(filesz);
            read_exact(self.source, file, ph.p_offset)?;
            zeroed.fill(0);
            segments += 1;
        }

        Ok(LoadedImage {
            entry: header.e_entry,
            segments,
        })
    }
}

/// Load the host-provided executable into memory and point the
/// process's trapframe at its entry.
pub fn load_bincode_from_host_elf<S: BackingStore, M: PhysicalMemory>(
    proc: &mut Process,
    source: &mut S,
    memory: &mut M,
) -> Result<LoadedImage, ElfError> {
    let mut loader = ElfLoader::init(source)?;
    let image = loader.load(memory)?;

    let trapframe = proc.trapframe_mut();
    trapframe.epc = image.entry;
    trapframe.regs.sp = USER_STACK;

    println!(
        "Application program entry point (virtual address): {:#x}",
        image.entry
    );
    Ok(image)
}

/// Builds ELF images for tests.
#[cfg(test)]
pub mod build {
    use super::*;

    pub struct Segment {
        pub kind: u32,
        pub vaddr: u64,
        pub data: Vec<u8>,
        pub memsz: u64,
    }
    impl Segment {
        pub fn load(vaddr: u64, data: &[u8], memsz: u64) -> Segment {
            Segment {
                kind: PT_LOAD,
                vaddr,
                data: data.to_vec(),
                memsz,
            }
        }
    }

    pub fn header(entry: u64, phoff: u64, phentsize: u16, phnum: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIZEOF_EHDR);
        out.extend_from_slice(ELFMAG);
        out.extend_from_slice(&[2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&goblin::elf::header::EM_RISCV.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&entry.to_le_bytes());
        out.extend_from_slice(&phoff.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(SIZEOF_EHDR as u16).to_le_bytes());
        out.extend_from_slice(&phentsize.to_le_bytes());
        out.extend_from_slice(&phnum.to_le_bytes());
        out.extend_from_slice(&[0; 6]);
        out
    }

    fn program_header(kind: u32, off: u64, vaddr: u64, filesz: u64, memsz: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIZEOF_PHDR);
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&5u32.to_le_bytes());
        out.extend_from_slice(&off.to_le_bytes());
        out.extend_from_slice(&vaddr.to_le_bytes());
        out.extend_from_slice(&vaddr.to_le_bytes());
        out.extend_from_slice(&filesz.to_le_bytes());
        out.extend_from_slice(&memsz.to_le_bytes());
        out.extend_from_slice(&0x1000u64.to_le_bytes());
        out
    }

    /// Header, then the program header table, then each segment's bytes
    /// with a little padding in between so offsets are irregular.
    pub fn image(entry: u64, segments: &[Segment]) -> Vec<u8> {
        let phoff = SIZEOF_EHDR as u64;
        let mut out = header(entry, phoff, SIZEOF_PHDR as u16, segments.len() as u16);
        let mut data_off = phoff + (segments.len() * SIZEOF_PHDR) as u64;
        let mut data = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            data_off += i as u64 + 1;
            data.extend(std::iter::repeat(0xEE).take(i + 1));
            out.extend(program_header(
                segment.kind,
                data_off,
                segment.vaddr,
                segment.data.len() as u64,
                segment.memsz,
            ));
            data_off += segment.data.len() as u64;
            data.extend_from_slice(&segment.data);
        }
        out.extend(data);
        out
    }
}
