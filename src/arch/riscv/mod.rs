#[cfg(target_arch = "riscv64")]
pub mod asm;
pub mod hart;
pub mod memlayout;
#[cfg(test)]
pub mod mock;
pub mod start;
#[cfg(target_arch = "riscv64")]
pub mod trampoline;

pub use memlayout::*;

/// Previous mode
pub const MSTATUS_MPP_MASK: u64 = 3 << 11;
pub const MSTATUS_MPP_M: u64 = 3 << 11;
pub const MSTATUS_MPP_S: u64 = 1 << 11;
pub const MSTATUS_MPP_U: u64 = 0 << 11;
/// Machine-mode interrupt enable.
pub const MSTATUS_MIE: u64 = 1 << 3;

/// Previous mode: 1 = Supervisor, 0 = User
pub const SSTATUS_SPP: u64 = 1 << 8;
/// Supervisor Previous Interrupt Enable
pub const SSTATUS_SPIE: u64 = 1 << 5;
/// Supervisor Interrupt Enable
pub const SSTATUS_SIE: u64 = 1 << 1;

/// Supervisor Software Interrupt Pending
pub const MIP_SSIP: u64 = 1 << 1;
/// Supervisor Timer Interrupt Pending
pub const MIP_STIP: u64 = 1 << 5;
/// Supervisor External Interrupt Pending
pub const MIP_SEIP: u64 = 1 << 9;

// Exception codes, as reported in mcause/scause.
pub const CAUSE_MISALIGNED_FETCH: u64 = 0;
pub const CAUSE_FETCH_ACCESS: u64 = 1;
pub const CAUSE_ILLEGAL_INSTRUCTION: u64 = 2;
pub const CAUSE_BREAKPOINT: u64 = 3;
pub const CAUSE_MISALIGNED_LOAD: u64 = 4;
pub const CAUSE_LOAD_ACCESS: u64 = 5;
pub const CAUSE_MISALIGNED_STORE: u64 = 6;
pub const CAUSE_STORE_ACCESS: u64 = 7;
pub const CAUSE_USER_ECALL: u64 = 8;
pub const CAUSE_SUPERVISOR_ECALL: u64 = 9;
pub const CAUSE_MACHINE_ECALL: u64 = 11;
pub const CAUSE_FETCH_PAGE_FAULT: u64 = 12;
pub const CAUSE_LOAD_PAGE_FAULT: u64 = 13;
pub const CAUSE_STORE_PAGE_FAULT: u64 = 15;

/// Every RV64G instruction is exactly 4 bytes wide.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Does `misa` advertise the given single-letter extension?
pub fn misa_has_extension(misa: u64, extension: char) -> bool {
    let bit = (extension as u8).wrapping_sub(b'A');
    bit < 26 && misa & (1 << bit) != 0
}

/// A decoded trap cause register (mcause/scause).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Scause(pub u64);
impl Scause {
    const INTERRUPT: u64 = 1 << 63;

    pub fn is_interrupt(&self) -> bool {
        self.0 & Scause::INTERRUPT != 0
    }
    pub fn code(&self) -> u64 {
        self.0 & !Scause::INTERRUPT
    }
    pub fn is_user_ecall(&self) -> bool {
        !self.is_interrupt() && self.code() == CAUSE_USER_ECALL
    }
    pub fn description(&self) -> &'static str {
        if self.is_interrupt() {
            match self.code() {
                1 => "Supervisor software interrupt",
                5 => "Supervisor timer interrupt",
                9 => "Supervisor external interrupt",
                _ => "Unknown interrupt",
            }
        } else {
            match self.code() {
                CAUSE_MISALIGNED_FETCH => "Instruction address misaligned",
                CAUSE_FETCH_ACCESS => "Instruction access fault",
                CAUSE_ILLEGAL_INSTRUCTION => "Illegal instruction",
                CAUSE_BREAKPOINT => "Breakpoint",
                CAUSE_MISALIGNED_LOAD => "Load address misaligned",
                CAUSE_LOAD_ACCESS => "Load access fault",
                CAUSE_MISALIGNED_STORE => "Store address misaligned",
                CAUSE_STORE_ACCESS => "Store access fault",
                CAUSE_USER_ECALL => "Environment call from U-mode",
                CAUSE_SUPERVISOR_ECALL => "Environment call from S-mode",
                CAUSE_MACHINE_ECALL => "Environment call from M-mode",
                CAUSE_FETCH_PAGE_FAULT => "Instruction page fault",
                CAUSE_LOAD_PAGE_FAULT => "Load page fault",
                CAUSE_STORE_PAGE_FAULT => "Store page fault",
                _ => "Unknown exception",
            }
        }
    }
}
