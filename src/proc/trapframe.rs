use core::mem::offset_of;

/// The general-purpose register bank, x1 through x31.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub ra: u64,
    pub sp: u64,
    pub gp: u64,
    pub tp: u64,
    pub t0: u64,
    pub t1: u64,
    pub t2: u64,
    pub s0: u64,
    pub s1: u64,
    pub a0: u64,
    pub a1: u64,
    pub a2: u64,
    pub a3: u64,
    pub a4: u64,
    pub a5: u64,
    pub a6: u64,
    pub a7: u64,
    pub s2: u64,
    pub s3: u64,
    pub s4: u64,
    pub s5: u64,
    pub s6: u64,
    pub s7: u64,
    pub s8: u64,
    pub s9: u64,
    pub s10: u64,
    pub s11: u64,
    pub t3: u64,
    pub t4: u64,
    pub t5: u64,
    pub t6: u64,
}
impl Registers {
    pub const fn new() -> Registers {
        Registers {
            ra: 0u64,
            sp: 0u64,
            gp: 0u64,
            tp: 0u64,
            t0: 0u64,
            t1: 0u64,
            t2: 0u64,
            s0: 0u64,
            s1: 0u64,
            a0: 0u64,
            a1: 0u64,
            a2: 0u64,
            a3: 0u64,
            a4: 0u64,
            a5: 0u64,
            a6: 0u64,
            a7: 0u64,
            s2: 0u64,
            s3: 0u64,
            s4: 0u64,
            s5: 0u64,
            s6: 0u64,
            s7: 0u64,
            s8: 0u64,
            s9: 0u64,
            s10: 0u64,
            s11: 0u64,
            t3: 0u64,
            t4: 0u64,
            t5: 0u64,
            t6: 0u64,
        }
    }
    /// The syscall argument registers, a0 through a7.
    pub fn syscall_args(&self) -> [u64; 8] {
        [
            self.a0, self.a1, self.a2, self.a3, self.a4, self.a5, self.a6, self.a7,
        ]
    }
}

/// Per-process data for the trap handling code in the trampoline.
///
/// smode_trap_vector saves user registers in `regs`,
/// then loads `kernel_sp` and jumps to `kernel_trap`.
/// activate() sets up the kernel_* fields, and return_to_user
/// restores user registers from `regs` and enters user space.
/// The offsets of every field are fixed; the trampoline depends on them.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Trapframe {
    /// Saved user registers.
    pub regs: Registers,
    /// Top of process's kernel stack.
    pub kernel_sp: u64,
    /// smode_trap_handler()
    pub kernel_trap: u64,
    /// Saved user program counter.
    pub epc: u64,
}
impl Trapframe {
    pub const fn new() -> Trapframe {
        Trapframe {
            regs: Registers::new(),
            kernel_sp: 0u64,
            kernel_trap: 0u64,
            epc: 0u64,
        }
    }
}

const _: () = assert!(offset_of!(Registers, a0) == 72);
const _: () = assert!(offset_of!(Registers, t6) == 240);
const _: () = assert!(offset_of!(Trapframe, kernel_sp) == 248);
const _: () = assert!(offset_of!(Trapframe, kernel_trap) == 256);
const _: () = assert!(offset_of!(Trapframe, epc) == 264);
