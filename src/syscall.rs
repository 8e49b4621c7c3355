//! System calls.
//!
//! A user program puts the syscall number in a0 and its arguments in
//! a1 through a7, then executes ecall. The result comes back in a0.

use crate::{arch::power::shutdown, mem::PhysicalMemory, println};

/// Numbers below this are reserved for the kernel.
pub const SYS_USER_BASE: u64 = 64;
pub const SYS_USER_PRINT: u64 = SYS_USER_BASE;
pub const SYS_USER_EXIT: u64 = SYS_USER_BASE + 1;

/// Longest string the print syscall will read.
pub const MAX_PRINT_LEN: usize = 4096;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Syscall {
    /// Print the NUL-terminated string at `addr`.
    Print { addr: u64 },
    Exit { code: i64 },
}
impl Syscall {
    pub fn decode(args: &[u64; 8]) -> Option<Syscall> {
        match args[0] {
            SYS_USER_PRINT => Some(Syscall::Print { addr: args[1] }),
            SYS_USER_EXIT => Some(Syscall::Exit {
                code: args[1] as i64,
            }),
            _ => None,
        }
    }
}

/// Services the syscalls a trapped process asks for.
pub trait SyscallHandler {
    /// `args` holds a0 through a7. The return value goes back in a0.
    fn handle(&mut self, args: [u64; 8]) -> i64;
}

/// The syscalls this kernel offers, reading user strings out of `memory`.
pub struct KernelSyscalls<M: PhysicalMemory> {
    memory: M,
}
impl<M: PhysicalMemory> KernelSyscalls<M> {
    pub fn new(memory: M) -> KernelSyscalls<M> {
        KernelSyscalls { memory }
    }
    fn sys_user_print(&mut self, addr: u64) -> i64 {
        match user_str(&mut self.memory, addr) {
            Some(s) => {
                crate::print!("{}", s);
                0
            }
            None => -1,
        }
    }
    fn sys_user_exit(&mut self, code: i64) -> i64 {
        println!("User exit with code:{}.", code);
        shutdown(code)
    }
}
impl<M: PhysicalMemory> SyscallHandler for KernelSyscalls<M> {
    fn handle(&mut self, args: [u64; 8]) -> i64 {
        match Syscall::decode(&args) {
            Some(Syscall::Print { addr }) => self.sys_user_print(addr),
            Some(Syscall::Exit { code }) => self.sys_user_exit(code),
            None => {
                println!("unknown syscall {}", args[0]);
                -1
            }
        }
    }
}

/// The NUL-terminated UTF-8 string at `addr`, cut off at `MAX_PRINT_LEN`
/// bytes. `None` if it leaves memory or isn't UTF-8.
pub fn user_str<M: PhysicalMemory>(memory: &mut M, addr: u64) -> Option<&str> {
    let mut len = 0;
    while len < MAX_PRINT_LEN {
        let b = memory.region_mut(addr.checked_add(len as u64)?, 1)?[0];
        if b == 0 {
            break;
        }
        len += 1;
    }
    let bytes = memory.region_mut(addr, len as u64)?;
    core::str::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::SimMemory;

    fn memory_with(addr: u64, bytes: &[u8]) -> SimMemory {
        let mut memory = SimMemory::new(0x1000, 0x2000);
        memory
            .region_mut(addr, bytes.len() as u64)
            .unwrap()
            .copy_from_slice(bytes);
        memory
    }

    #[test]
    fn decode() {
        let mut args = [0u64; 8];
        args[0] = SYS_USER_PRINT;
        args[1] = 0x8100_0000;
        assert_eq!(Syscall::decode(&args), Some(Syscall::Print { addr: 0x8100_0000 }));
        args[0] = SYS_USER_EXIT;
        args[1] = -2i64 as u64;
        assert_eq!(Syscall::decode(&args), Some(Syscall::Exit { code: -2 }));
        args[0] = 1;
        assert_eq!(Syscall::decode(&args), None);
    }

    #[test]
    fn reads_user_strings() {
        let mut memory = memory_with(0x1100, b"Hello world!\n\0trailing");
        assert_eq!(user_str(&mut memory, 0x1100), Some("Hello world!\n"));
        assert_eq!(user_str(&mut memory, 0x1106), Some("world!\n"));
    }

    #[test]
    fn long_strings_are_cut_off() {
        let mut memory = memory_with(0x1000, &[b'a'; MAX_PRINT_LEN + 16]);
        assert_eq!(user_str(&mut memory, 0x1000).map(str::len), Some(MAX_PRINT_LEN));
    }

    #[test]
    fn bad_strings_are_rejected() {
        let mut memory = memory_with(0x2ffc, b"abcd");
        // Runs off the end of memory before a NUL.
        assert_eq!(user_str(&mut memory, 0x2ffc), None);
        assert_eq!(user_str(&mut memory, 0x10), None);
        let mut memory = memory_with(0x1000, &[0xff, 0xfe, 0]);
        assert_eq!(user_str(&mut memory, 0x1000), None);
    }

    #[test]
    fn print_returns_zero_or_an_error() {
        let mut syscalls = KernelSyscalls::new(memory_with(0x1100, b"hi\n\0"));
        assert_eq!(syscalls.handle([SYS_USER_PRINT, 0x1100, 0, 0, 0, 0, 0, 0]), 0);
        assert_eq!(syscalls.handle([SYS_USER_PRINT, 0x10, 0, 0, 0, 0, 0, 0]), -1);
    }

    #[test]
    fn unknown_syscalls_return_minus_one() {
        let mut syscalls = KernelSyscalls::new(SimMemory::new(0x1000, 0x10));
        for number in [0, 1, 63, 66, u64::MAX] {
            assert_eq!(syscalls.handle([number, 0, 0, 0, 0, 0, 0, 0]), -1);
        }
    }

    #[test]
    #[should_panic(expected = "shutdown requested with exit code 3")]
    fn exit_powers_off() {
        let mut syscalls = KernelSyscalls::new(SimMemory::new(0x1000, 0x10));
        syscalls.handle([SYS_USER_EXIT, 3, 0, 0, 0, 0, 0, 0]);
    }
}
