use super::{cpu::Cpu, trapframe::Trapframe};
use crate::{
    arch::{
        riscv::{SSTATUS_SPIE, SSTATUS_SPP, USER_KSTACK, USER_STACK},
        Csr, Hart,
    },
    elf::{self, BackingStore, ElfError, LoadedImage},
    mem::PhysicalMemory,
    NPROC,
};
use core::ptr::{addr_of_mut, null_mut};

/// Processes live in fixed slots; there is no allocator.
pub static mut PROCESSES: [Process; NPROC] = [const { Process::new() }; NPROC];

/// Per-process state.
#[derive(Debug)]
pub struct Process {
    /// Top of the stack the kernel switches to when this process traps.
    pub kstack: u64,
    /// Saved user state. Points at the process's fixed trapframe slot.
    pub trapframe: *mut Trapframe,
}
impl Process {
    pub const fn new() -> Process {
        Process {
            kstack: 0,
            trapframe: null_mut(),
        }
    }
    /// The user application's slot.
    pub fn user_app() -> &'static mut Process {
        unsafe { &mut *addr_of_mut!(PROCESSES[0]) }
    }
    pub fn trapframe(&self) -> &Trapframe {
        assert!(!self.trapframe.is_null(), "process has no trapframe");
        unsafe { &*self.trapframe }
    }
    pub fn trapframe_mut(&mut self) -> &mut Trapframe {
        assert!(!self.trapframe.is_null(), "process has no trapframe");
        unsafe { &mut *self.trapframe }
    }
    /// Take ownership of the trapframe at `trapframe` and give the process
    /// a fresh activation record: zeroed registers and the user stack.
    ///
    /// `trapframe` must be valid for writes and used by nothing else.
    pub unsafe fn init(&mut self, trapframe: *mut Trapframe, kstack: u64) {
        trapframe.write(Trapframe::new());
        self.trapframe = trapframe;
        self.kstack = kstack;
        self.trapframe_mut().regs.sp = USER_STACK;
    }
}
impl Default for Process {
    fn default() -> Process {
        Process::new()
    }
}

/// Construct the user "process": its trapframe, its stacks, and its program image.
pub unsafe fn load_user_program<S: BackingStore, M: PhysicalMemory>(
    proc: &mut Process,
    trapframe: *mut Trapframe,
    source: &mut S,
    memory: &mut M,
) -> Result<LoadedImage, ElfError> {
    proc.init(trapframe, USER_KSTACK);
    elf::load_bincode_from_host_elf(proc, source, memory)
}

/// Make `proc` current and set up the hart so that the next `sret`
/// resumes it in user mode at its saved pc.
///
/// Returns the trapframe return_to_user() should restore.
pub fn prepare_activation<H: Hart>(hart: &mut H, cpu: &mut Cpu, proc: *mut Process) -> *mut Trapframe {
    assert!(!proc.is_null(), "activate: no process");
    cpu.set_process(proc);
    let proc = unsafe { &mut *proc };

    // Send syscalls, interrupts, and exceptions to smode_trap_vector.
    let vector = hart.user_trap_vector();
    hart.write_csr(Csr::Stvec, vector);

    // Set up trapframe values that smode_trap_vector will need when
    // the process next re-enters the kernel.
    let kernel_trap = hart.user_trap_handler();
    let kstack = proc.kstack;
    let trapframe = proc.trapframe_mut();
    trapframe.kernel_sp = kstack;
    trapframe.kernel_trap = kernel_trap;

    // Set S Previous Privilege mode to User.
    let mut x = hart.read_csr(Csr::Sstatus);
    // Clear SPP to 0 for user mode.
    x &= !SSTATUS_SPP;
    // Enable interrupts in user mode.
    x |= SSTATUS_SPIE;
    hart.write_csr(Csr::Sstatus, x);

    // Set S Exception Program Counter to the saved user pc.
    hart.write_csr(Csr::Sepc, trapframe.epc);

    proc.trapframe
}

/// Switch to `proc` in user mode.
///
/// The only way back into the kernel is a trap, which lands in
/// smode_trap_handler() on the process's kernel stack.
pub unsafe fn activate<H: Hart>(hart: &mut H, cpu: &mut Cpu, proc: *mut Process) -> ! {
    let trapframe = prepare_activation(hart, cpu, proc);
    hart.return_to_user(trapframe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv::{
        mock::{MockHart, MOCK_TRAP_HANDLER, MOCK_TRAP_VECTOR},
        SSTATUS_SIE,
    };

    fn leaked_process(kstack: u64) -> *mut Process {
        let trapframe = Box::leak(Box::new(Trapframe::new()));
        let proc = Box::leak(Box::new(Process::new()));
        unsafe { proc.init(trapframe, kstack) };
        proc
    }

    #[test]
    fn init_gives_a_fresh_activation_record() {
        let trapframe = Box::leak(Box::new(Trapframe::new()));
        trapframe.regs.a3 = 7;
        trapframe.epc = 0xdead;

        let mut proc = Process::new();
        unsafe { proc.init(trapframe, USER_KSTACK) };

        assert_eq!(proc.kstack, USER_KSTACK);
        assert_eq!(proc.trapframe().regs.sp, USER_STACK);
        assert_eq!(proc.trapframe().regs.a3, 0);
        assert_eq!(proc.trapframe().epc, 0);
    }

    #[test]
    fn activation_sets_current_and_trap_entry() {
        let mut hart = MockHart::new();
        let mut cpu = Cpu::new();
        let proc = leaked_process(USER_KSTACK);
        unsafe { (*proc).trapframe_mut().epc = 0x8100_0000 };

        let trapframe = prepare_activation(&mut hart, &mut cpu, proc);

        assert_eq!(cpu.current_process_ptr(), proc);
        assert_eq!(trapframe, unsafe { (*proc).trapframe });
        let tf = unsafe { &*trapframe };
        assert_eq!(tf.kernel_sp, USER_KSTACK);
        assert_eq!(tf.kernel_trap, MOCK_TRAP_HANDLER);
        assert_eq!(hart.get(Csr::Stvec), MOCK_TRAP_VECTOR);
        assert_eq!(hart.get(Csr::Sepc), 0x8100_0000);
        assert_eq!(hart.get(Csr::Sstatus) & SSTATUS_SPP, 0);
        assert_eq!(hart.get(Csr::Sstatus) & SSTATUS_SPIE, SSTATUS_SPIE);
    }

    #[test]
    fn activation_ignores_prior_state() {
        let proc = leaked_process(0x8120_0000);

        let mut clean = MockHart::new();
        let mut clean_cpu = Cpu::new();
        prepare_activation(&mut clean, &mut clean_cpu, proc);
        let expected = unsafe { *(*proc).trapframe };

        // Garbage everywhere: a trap was in progress, another process was current.
        let mut dirty = MockHart::new();
        dirty.set(Csr::Stvec, 0x1234);
        dirty.set(Csr::Sstatus, SSTATUS_SPP | SSTATUS_SIE);
        let mut dirty_cpu = Cpu::new();
        let other = leaked_process(0x9000_0000);
        prepare_activation(&mut dirty, &mut dirty_cpu, other);
        unsafe {
            (*proc).trapframe_mut().kernel_sp = 1;
            (*proc).trapframe_mut().kernel_trap = 2;
        }
        prepare_activation(&mut dirty, &mut dirty_cpu, proc);

        assert_eq!(dirty_cpu.current_process_ptr(), proc);
        assert_eq!(unsafe { *(*proc).trapframe }, expected);
        assert_eq!(dirty.get(Csr::Stvec), clean.get(Csr::Stvec));
        assert_eq!(dirty.get(Csr::Sepc), clean.get(Csr::Sepc));
        assert_eq!(dirty.get(Csr::Sstatus) & SSTATUS_SPP, 0);
        // Unrelated bits are left alone.
        assert_eq!(dirty.get(Csr::Sstatus) & SSTATUS_SIE, SSTATUS_SIE);
    }

    #[test]
    #[should_panic(expected = "activate: no process")]
    fn activating_nothing_is_fatal() {
        let mut hart = MockHart::new();
        let mut cpu = Cpu::new();
        prepare_activation(&mut hart, &mut cpu, null_mut());
    }

    #[test]
    #[should_panic(expected = "sret")]
    fn activate_ends_in_sret() {
        let mut hart = MockHart::new();
        let mut cpu = Cpu::new();
        let proc = leaked_process(USER_KSTACK);
        unsafe { activate(&mut hart, &mut cpu, proc) };
    }
}
