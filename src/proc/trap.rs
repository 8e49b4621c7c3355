use super::{cpu::Cpu, process::activate, trapframe::Trapframe};
use crate::{
    arch::{
        riscv::{Scause, INSTRUCTION_SIZE, SSTATUS_SPP},
        Csr, Hart,
    },
    println,
    syscall::SyscallHandler,
};
use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrapError {
    /// The trap vector was reached with SPP set.
    NotFromUserMode { sstatus: u64 },
    NoCurrentProcess,
    /// Only user ecalls are handled; everything else is fatal.
    UnexpectedCause { scause: u64, sepc: u64, stval: u64 },
}
impl fmt::Display for TrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapError::NotFromUserMode { sstatus } => {
                write!(f, "usertrap: not from user mode (sstatus={:#x})", sstatus)
            }
            TrapError::NoCurrentProcess => write!(f, "usertrap: no current process"),
            TrapError::UnexpectedCause {
                scause,
                sepc,
                stval,
            } => write!(
                f,
                "unexpected scause {:#x} ({})\n            sepc={:#x} stval={:#x}",
                scause,
                Scause(*scause).description(),
                sepc,
                stval
            ),
        }
    }
}

/// Handle a trap taken from user space.
///
/// Saves the user pc into the current process's trapframe and services
/// syscalls. On success the process is ready to be resumed.
pub fn handle_user_trap<H: Hart, S: SyscallHandler>(
    hart: &mut H,
    cpu: &mut Cpu,
    syscalls: &mut S,
) -> Result<(), TrapError> {
    let sstatus = hart.read_csr(Csr::Sstatus);
    if sstatus & SSTATUS_SPP != 0 {
        return Err(TrapError::NotFromUserMode { sstatus });
    }

    let proc = cpu.current_process().ok_or(TrapError::NoCurrentProcess)?;
    let trapframe = proc.trapframe_mut();

    // Save user program counter.
    trapframe.epc = hart.read_csr(Csr::Sepc);

    let scause = Scause(hart.read_csr(Csr::Scause));
    if scause.is_user_ecall() {
        handle_syscall(trapframe, syscalls);
        Ok(())
    } else {
        Err(TrapError::UnexpectedCause {
            scause: scause.0,
            sepc: trapframe.epc,
            stval: hart.read_csr(Csr::Stval),
        })
    }
}

fn handle_syscall<S: SyscallHandler>(trapframe: &mut Trapframe, syscalls: &mut S) {
    // sepc points to the ecall instruction, but
    // we want to return to the next instruction.
    trapframe.epc = trapframe.epc.wrapping_add(INSTRUCTION_SIZE);
    trapframe.regs.a0 = syscalls.handle(trapframe.regs.syscall_args()) as u64;
}

/// Handle the trap and resume the current process, or report the
/// trap and halt the kernel.
pub unsafe fn dispatch<H: Hart, S: SyscallHandler>(
    hart: &mut H,
    cpu: &mut Cpu,
    syscalls: &mut S,
) -> ! {
    if let Err(err) = handle_user_trap(hart, cpu, syscalls) {
        println!("smode_trap_handler(): {}", err);
        panic!("unexpected exception happened");
    }
    let proc = cpu.current_process_ptr();
    activate(hart, cpu, proc)
}

/// Called by smode_trap_vector on the process's kernel stack.
#[cfg(target_arch = "riscv64")]
#[no_mangle]
pub unsafe extern "C" fn smode_trap_handler() -> ! {
    use crate::{
        arch::{riscv::DRAM_BASE, RiscvHart},
        mem::IdentityMemory,
        syscall::KernelSyscalls,
    };

    let memory = IdentityMemory::new(DRAM_BASE, crate::ram_end());
    dispatch(&mut RiscvHart, Cpu::current(), &mut KernelSyscalls::new(memory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::riscv::{mock::MockHart, CAUSE_ILLEGAL_INSTRUCTION, CAUSE_LOAD_PAGE_FAULT, CAUSE_USER_ECALL},
        proc::{
            process::{prepare_activation, Process},
            trapframe::Trapframe,
        },
    };
    use std::{
        any::Any,
        panic::{catch_unwind, AssertUnwindSafe},
    };

    /// Records every syscall it sees and answers with a fixed value.
    struct Recorder {
        calls: Vec<[u64; 8]>,
        ret: i64,
    }
    impl SyscallHandler for Recorder {
        fn handle(&mut self, args: [u64; 8]) -> i64 {
            self.calls.push(args);
            self.ret
        }
    }
    fn recorder(ret: i64) -> Recorder {
        Recorder {
            calls: Vec::new(),
            ret,
        }
    }

    /// A hart and cpu with a freshly activated user process.
    fn running() -> (MockHart, Cpu, *mut Process) {
        let mut hart = MockHart::new();
        let mut cpu = Cpu::new();
        let trapframe = Box::leak(Box::new(Trapframe::new()));
        let proc = Box::leak(Box::new(Process::new()));
        unsafe { proc.init(trapframe, 0x8120_0000) };
        let proc: *mut Process = proc;
        prepare_activation(&mut hart, &mut cpu, proc);
        (hart, cpu, proc)
    }
    fn trapframe(proc: *mut Process) -> &'static mut Trapframe {
        unsafe { &mut *(*proc).trapframe }
    }
    fn message(payload: Box<dyn Any + Send>) -> String {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::new()
        }
    }

    #[test]
    fn ecall_resumes_after_the_instruction() {
        for sepc in [0x1000, 0x8100_0000, 0x8000_0ffc, u64::MAX - 3] {
            let (mut hart, mut cpu, proc) = running();
            hart.raise(CAUSE_USER_ECALL, sepc, 0, 0);
            handle_user_trap(&mut hart, &mut cpu, &mut recorder(0)).unwrap();
            assert_eq!(trapframe(proc).epc, sepc.wrapping_add(4));
        }
    }

    #[test]
    fn syscall_return_value_lands_in_a0() {
        let (mut hart, mut cpu, proc) = running();
        {
            let regs = &mut trapframe(proc).regs;
            regs.a0 = 64;
            regs.a1 = 0x8100_0100;
            regs.a7 = 9;
        }
        hart.raise(CAUSE_USER_ECALL, 0x1000, 0, 0);
        let mut syscalls = recorder(-1);

        handle_user_trap(&mut hart, &mut cpu, &mut syscalls).unwrap();

        assert_eq!(syscalls.calls, vec![[64, 0x8100_0100, 0, 0, 0, 0, 0, 9]]);
        assert_eq!(trapframe(proc).regs.a0, -1i64 as u64);
        assert_eq!(trapframe(proc).regs.a1, 0x8100_0100);
    }

    #[test]
    fn other_causes_are_reported() {
        let (mut hart, mut cpu, proc) = running();
        hart.raise(CAUSE_LOAD_PAGE_FAULT, 0x1010, 0xbad, 0);
        let mut syscalls = recorder(0);

        let err = handle_user_trap(&mut hart, &mut cpu, &mut syscalls).unwrap_err();

        assert_eq!(
            err,
            TrapError::UnexpectedCause {
                scause: CAUSE_LOAD_PAGE_FAULT,
                sepc: 0x1010,
                stval: 0xbad
            }
        );
        assert!(syscalls.calls.is_empty());
        assert_eq!(trapframe(proc).epc, 0x1010);
    }

    #[test]
    fn interrupts_are_not_syscalls() {
        let (mut hart, mut cpu, _) = running();
        hart.raise((1 << 63) | CAUSE_USER_ECALL, 0x1000, 0, 0);
        let mut syscalls = recorder(0);
        assert!(handle_user_trap(&mut hart, &mut cpu, &mut syscalls).is_err());
        assert!(syscalls.calls.is_empty());
    }

    #[test]
    fn traps_from_supervisor_mode_are_rejected() {
        let (mut hart, mut cpu, proc) = running();
        hart.raise(CAUSE_USER_ECALL, 0x1000, 0, SSTATUS_SPP);
        let err = handle_user_trap(&mut hart, &mut cpu, &mut recorder(0)).unwrap_err();
        assert_eq!(err, TrapError::NotFromUserMode { sstatus: SSTATUS_SPP });
        assert_eq!(trapframe(proc).epc, 0);
    }

    #[test]
    fn trap_without_a_process_is_rejected() {
        let mut hart = MockHart::new();
        let mut cpu = Cpu::new();
        hart.raise(CAUSE_USER_ECALL, 0x1000, 0, 0);
        let err = handle_user_trap(&mut hart, &mut cpu, &mut recorder(0)).unwrap_err();
        assert_eq!(err, TrapError::NoCurrentProcess);
    }

    #[test]
    fn dispatch_resumes_the_process_after_a_syscall() {
        let (mut hart, mut cpu, proc) = running();
        hart.raise(CAUSE_USER_ECALL, 0x1000, 0, 0);

        let payload = catch_unwind(AssertUnwindSafe(|| unsafe {
            dispatch(&mut hart, &mut cpu, &mut recorder(0))
        }))
        .unwrap_err();

        assert_eq!(message(payload), "sret");
        assert_eq!(hart.user_returns, 1);
        assert_eq!(hart.get(Csr::Sepc), 0x1004);
        assert_eq!(cpu.current_process_ptr(), proc);
    }

    #[test]
    fn dispatch_never_resumes_after_a_fault() {
        let (mut hart, mut cpu, _) = running();
        hart.raise(CAUSE_ILLEGAL_INSTRUCTION, 0x1000, 0, 0);

        let payload = catch_unwind(AssertUnwindSafe(|| unsafe {
            dispatch(&mut hart, &mut cpu, &mut recorder(0))
        }))
        .unwrap_err();

        assert_eq!(message(payload), "unexpected exception happened");
        assert_eq!(hart.user_returns, 0);
    }

    #[test]
    fn unexpected_cause_message_names_the_registers() {
        let err = TrapError::UnexpectedCause {
            scause: 2,
            sepc: 0x1000,
            stval: 0x13,
        };
        let text = err.to_string();
        assert!(text.starts_with("unexpected scause 0x2"));
        assert!(text.contains("sepc=0x1000 stval=0x13"));
    }
}
