//! Machine-mode startup: hand traps to supervisor mode and drop privilege.

use super::{
    hart::{Csr, Hart},
    misa_has_extension, CAUSE_BREAKPOINT, CAUSE_FETCH_PAGE_FAULT, CAUSE_LOAD_PAGE_FAULT,
    CAUSE_MISALIGNED_FETCH, CAUSE_STORE_PAGE_FAULT, CAUSE_USER_ECALL, MIP_SEIP, MIP_SSIP,
    MIP_STIP, MSTATUS_MPP_MASK, MSTATUS_MPP_S,
};
use core::fmt;

/// Which interrupts (mideleg) and exceptions (medeleg)
/// are handled in supervisor mode instead of machine mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub interrupts: u64,
    pub exceptions: u64,
}
impl Delegation {
    /// Supervisor software, timer, and external interrupts, plus the exceptions
    /// a user program can cause that the supervisor is expected to see.
    pub const SUPERVISOR: Delegation = Delegation {
        interrupts: MIP_SSIP | MIP_STIP | MIP_SEIP,
        exceptions: (1 << CAUSE_MISALIGNED_FETCH)
            | (1 << CAUSE_FETCH_PAGE_FAULT)
            | (1 << CAUSE_BREAKPOINT)
            | (1 << CAUSE_LOAD_PAGE_FAULT)
            | (1 << CAUSE_STORE_PAGE_FAULT)
            | (1 << CAUSE_USER_ECALL),
    };

    pub fn delegates_interrupt(&self, code: u64) -> bool {
        code < 64 && self.interrupts & (1 << code) != 0
    }
    pub fn delegates_exception(&self, code: u64) -> bool {
        code < 64 && self.exceptions & (1 << code) != 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BootError {
    /// misa doesn't advertise the S extension.
    SupervisorUnsupported,
    /// A delegation register didn't keep the value written to it.
    DelegationMismatch {
        register: Csr,
        expected: u64,
        actual: u64,
    },
}
impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::SupervisorUnsupported => write!(f, "S mode is not supported"),
            BootError::DelegationMismatch {
                register,
                expected,
                actual,
            } => write!(
                f,
                "{} holds {:#x} after writing {:#x}",
                register.name(),
                actual,
                expected
            ),
        }
    }
}

/// Write the delegation registers and read them back.
pub fn delegate_traps<H: Hart>(hart: &mut H, delegation: &Delegation) -> Result<(), BootError> {
    // Without supervisor mode there is nobody to delegate to.
    if !misa_has_extension(hart.read_csr(Csr::Misa), 'S') {
        return Err(BootError::SupervisorUnsupported);
    }

    hart.write_csr(Csr::Mideleg, delegation.interrupts);
    hart.write_csr(Csr::Medeleg, delegation.exceptions);

    for (register, expected) in [
        (Csr::Mideleg, delegation.interrupts),
        (Csr::Medeleg, delegation.exceptions),
    ] {
        let actual = hart.read_csr(register);
        if actual != expected {
            return Err(BootError::DelegationMismatch {
                register,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Set up the registers `mret` uses to land in supervisor mode at `entry`.
pub fn prepare_supervisor_entry<H: Hart>(hart: &mut H, entry: u64) {
    // Set M Previous Privilege mode to Supervisor, for mret.
    let mstatus = (hart.read_csr(Csr::Mstatus) & !MSTATUS_MPP_MASK) | MSTATUS_MPP_S;
    hart.write_csr(Csr::Mstatus, mstatus);

    // Set M Exception Program Counter to the supervisor entry, for mret.
    hart.write_csr(Csr::Mepc, entry);

    // Configure Physical Memory Protection to give
    // supervisor and user mode access to all of physical memory.
    hart.write_csr(Csr::Pmpaddr0, 0x3f_ffff_ffff_ffff);
    hart.write_csr(Csr::Pmpcfg0, 0xf);
}

/// Point mtvec at `vector` before running `scan`, so that a fault
/// while reading firmware-provided data is reported by `vector`.
pub fn with_machine_trap_vector<H: Hart, R>(
    hart: &mut H,
    vector: u64,
    scan: impl FnOnce(&H) -> R,
) -> R {
    hart.write_csr(Csr::Mtvec, vector);
    scan(hart)
}

/// Delegate traps and switch to supervisor mode at `entry`. Never comes back.
pub unsafe fn enter_supervisor<H: Hart>(
    hart: &mut H,
    delegation: &Delegation,
    entry: u64,
) -> Result<core::convert::Infallible, BootError> {
    prepare_supervisor_entry(hart, entry);
    delegate_traps(hart, delegation)?;
    hart.machine_return()
}

#[cfg(target_arch = "riscv64")]
pub use machine::*;

#[cfg(target_arch = "riscv64")]
mod machine {
    use super::{enter_supervisor, with_machine_trap_vector, Delegation};
    use crate::{
        arch::riscv::{asm, hart::RiscvHart, Scause},
        console,
        dtb::{DeviceInfo, Fdt},
        println, BOOT_INFO, NCPU,
    };
    use core::{arch::global_asm, ptr::addr_of};

    pub const STACK_SIZE: usize = 4096;

    #[repr(C, align(16))]
    pub struct Stack(pub [u8; STACK_SIZE * NCPU]);

    /// The machine-mode stack; _entry points sp at its top.
    /// Supervisor code keeps using it until the first switch to user mode.
    #[no_mangle]
    #[allow(non_upper_case_globals)]
    pub static mut stack0: Stack = Stack([0u8; STACK_SIZE * NCPU]);

    global_asm!(
        r#"
        .section .text
        .globl mtrap_vector
        .balign 4
    mtrap_vector:
        la sp, stack0
        li t0, {stack_size}
        add sp, sp, t0
        j {handler}
    "#,
        stack_size = const STACK_SIZE,
        handler = sym machine_trap,
    );

    extern "C" {
        static mtrap_vector: [u8; 0];
    }

    /// Anything that wasn't delegated ends up here.
    unsafe extern "C" fn machine_trap() -> ! {
        let mcause = Scause(asm::r_mcause());
        println!(
            "machine trap: mcause {:#x} ({})\n            mepc={:#018x} mtval={:#018x}",
            mcause.0,
            mcause.description(),
            asm::r_mepc(),
            asm::r_mtval()
        );
        panic!("unexpected machine-mode trap");
    }

    /// Scan the device tree for the memory size and host interface.
    unsafe fn init_dtb(dtb: usize) {
        let info = match Fdt::from_ptr(dtb as *const u8) {
            Ok(fdt) => DeviceInfo::scan(&fdt),
            Err(err) => Err(err),
        };

        match info {
            Ok(info) => {
                if info.htif {
                    println!("HTIF is available!");
                }
                println!("(Emulated) memory size: {} MB", info.memory_size() >> 20);
                *BOOT_INFO.lock() = Some(info);
            }
            Err(err) => println!("could not read the device tree at {:#x}: {}", dtb, err),
        }
    }

    // _entry jumps here in machine mode on stack0.
    #[no_mangle]
    pub unsafe extern "C" fn m_start(hartid: usize, dtb: usize) -> ! {
        console::consoleinit();
        println!("In m_start, hartid:{}", hartid);

        let mut hart = RiscvHart;

        // Anything left in machine mode is fatal, including a
        // fault while reading the device tree.
        with_machine_trap_vector(&mut hart, addr_of!(mtrap_vector) as usize as u64, |_| {
            init_dtb(dtb)
        });
        // Keep the hartid in tp.
        asm::w_tp(hartid as u64);

        match enter_supervisor(&mut hart, &Delegation::SUPERVISOR, crate::s_start as usize as u64) {
            Ok(never) => match never {},
            Err(err) => panic!("{}", err),
        }
    }
}
