//! Access to the privileged state of the hardware thread.
//!
//! Everything that reads or writes a CSR, or leaves the current
//! privilege level, goes through [`Hart`], so the boot and trap code
//! can run against a simulated hart.

use crate::proc::trapframe::Trapframe;

/// The control and status registers this kernel uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Csr {
    Misa,
    Mstatus,
    Mepc,
    Medeleg,
    Mideleg,
    Mtvec,
    Pmpcfg0,
    Pmpaddr0,
    Sstatus,
    Sepc,
    Scause,
    Stval,
    Stvec,
    Satp,
}
impl Csr {
    pub const COUNT: usize = Csr::Satp as usize + 1;

    pub fn index(&self) -> usize {
        *self as usize
    }
    pub fn name(&self) -> &'static str {
        match self {
            Csr::Misa => "misa",
            Csr::Mstatus => "mstatus",
            Csr::Mepc => "mepc",
            Csr::Medeleg => "medeleg",
            Csr::Mideleg => "mideleg",
            Csr::Mtvec => "mtvec",
            Csr::Pmpcfg0 => "pmpcfg0",
            Csr::Pmpaddr0 => "pmpaddr0",
            Csr::Sstatus => "sstatus",
            Csr::Sepc => "sepc",
            Csr::Scause => "scause",
            Csr::Stval => "stval",
            Csr::Stvec => "stvec",
            Csr::Satp => "satp",
        }
    }
}

pub trait Hart {
    fn read_csr(&self, csr: Csr) -> u64;
    fn write_csr(&mut self, csr: Csr, value: u64);

    /// Address of the stub that saves user registers into the trapframe.
    /// Installed in stvec before entering user mode.
    fn user_trap_vector(&self) -> u64;
    /// Address of the trap dispatcher the stub jumps to.
    fn user_trap_handler(&self) -> u64;

    /// Execute `mret`, leaving machine mode for the mode in mstatus.MPP at mepc.
    unsafe fn machine_return(&mut self) -> !;
    /// Restore every general-purpose register from `trapframe`
    /// and `sret` to the privilege level in sstatus.SPP at sepc.
    unsafe fn return_to_user(&mut self, trapframe: *mut Trapframe) -> !;
}

/// The hart this code is running on.
#[cfg(target_arch = "riscv64")]
#[derive(Copy, Clone, Debug, Default)]
pub struct RiscvHart;

#[cfg(target_arch = "riscv64")]
impl Hart for RiscvHart {
    fn read_csr(&self, csr: Csr) -> u64 {
        use super::asm::*;
        unsafe {
            match csr {
                Csr::Misa => r_misa(),
                Csr::Mstatus => r_mstatus(),
                Csr::Mepc => r_mepc(),
                Csr::Medeleg => r_medeleg(),
                Csr::Mideleg => r_mideleg(),
                Csr::Mtvec => r_mtvec(),
                Csr::Pmpcfg0 => r_pmpcfg0(),
                Csr::Pmpaddr0 => r_pmpaddr0(),
                Csr::Sstatus => r_sstatus(),
                Csr::Sepc => r_sepc(),
                Csr::Scause => r_scause(),
                Csr::Stval => r_stval(),
                Csr::Stvec => r_stvec(),
                Csr::Satp => r_satp(),
            }
        }
    }
    fn write_csr(&mut self, csr: Csr, value: u64) {
        use super::asm::*;
        unsafe {
            match csr {
                Csr::Misa => panic!("{} is read-only", csr.name()),
                Csr::Mstatus => w_mstatus(value),
                Csr::Mepc => w_mepc(value),
                Csr::Medeleg => w_medeleg(value),
                Csr::Mideleg => w_mideleg(value),
                Csr::Mtvec => w_mtvec(value),
                Csr::Pmpcfg0 => w_pmpcfg0(value),
                Csr::Pmpaddr0 => w_pmpaddr0(value),
                Csr::Sstatus => w_sstatus(value),
                Csr::Sepc => w_sepc(value),
                Csr::Scause => w_scause(value),
                Csr::Stval => w_stval(value),
                Csr::Stvec => w_stvec(value),
                Csr::Satp => w_satp(value),
            }
        }
    }
    fn user_trap_vector(&self) -> u64 {
        super::trampoline::smode_trap_vector_address()
    }
    fn user_trap_handler(&self) -> u64 {
        crate::proc::trap::smode_trap_handler as usize as u64
    }
    unsafe fn machine_return(&mut self) -> ! {
        core::arch::asm!("mret", options(noreturn));
    }
    unsafe fn return_to_user(&mut self, trapframe: *mut Trapframe) -> ! {
        super::trampoline::return_to_user(trapframe)
    }
}
