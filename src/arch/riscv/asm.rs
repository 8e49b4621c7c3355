use core::arch::asm;

// Machine ISA Register, misa
// One bit per supported single-letter extension.
#[inline(always)]
pub unsafe fn r_misa() -> u64 {
    let x: u64;
    asm!("csrr {}, misa", out(reg) x);
    x
}

// Machine Status Register, mstatus
#[inline(always)]
pub unsafe fn r_mstatus() -> u64 {
    let x: u64;
    asm!("csrr {}, mstatus", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_mstatus(x: u64) {
    asm!("csrw mstatus, {}", in(reg) x);
}

// Machine Exception Program Counter
// MEPC holds the instruction address to which a return from exception will go.
#[inline(always)]
pub unsafe fn r_mepc() -> u64 {
    let x: u64;
    asm!("csrr {}, mepc", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_mepc(x: u64) {
    asm!("csrw mepc, {}", in(reg) x);
}

// Machine Trap Cause and Value
#[inline(always)]
pub unsafe fn r_mcause() -> u64 {
    let x: u64;
    asm!("csrr {}, mcause", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn r_mtval() -> u64 {
    let x: u64;
    asm!("csrr {}, mtval", out(reg) x);
    x
}

// Machine Exception Delegation
#[inline(always)]
pub unsafe fn r_medeleg() -> u64 {
    let x: u64;
    asm!("csrr {}, medeleg", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_medeleg(x: u64) {
    asm!("csrw medeleg, {}", in(reg) x);
}

// Machine Interrupt Delegation
#[inline(always)]
pub unsafe fn r_mideleg() -> u64 {
    let x: u64;
    asm!("csrr {}, mideleg", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_mideleg(x: u64) {
    asm!("csrw mideleg, {}", in(reg) x);
}

// Machine-mode Interrupt Vector
#[inline(always)]
pub unsafe fn r_mtvec() -> u64 {
    let x: u64;
    asm!("csrr {}, mtvec", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_mtvec(x: u64) {
    asm!("csrw mtvec, {}", in(reg) x);
}

// Physical Memory Protection
#[inline(always)]
pub unsafe fn r_pmpcfg0() -> u64 {
    let x: u64;
    asm!("csrr {}, pmpcfg0", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_pmpcfg0(x: u64) {
    asm!("csrw pmpcfg0, {}", in(reg) x);
}
#[inline(always)]
pub unsafe fn r_pmpaddr0() -> u64 {
    let x: u64;
    asm!("csrr {}, pmpaddr0", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_pmpaddr0(x: u64) {
    asm!("csrw pmpaddr0, {}", in(reg) x);
}

// Supervisor Status Register, sstatus
#[inline(always)]
pub unsafe fn r_sstatus() -> u64 {
    let x: u64;
    asm!("csrr {}, sstatus", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_sstatus(x: u64) {
    asm!("csrw sstatus, {}", in(reg) x);
}

// Supervisor Exception Program Counter
// SEPC holds the instruction address to which a return from exception will go.
#[inline(always)]
pub unsafe fn r_sepc() -> u64 {
    let x: u64;
    asm!("csrr {}, sepc", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_sepc(x: u64) {
    asm!("csrw sepc, {}", in(reg) x);
}

// Supervisor Trap-Vector Base Address
#[inline(always)]
pub unsafe fn r_stvec() -> u64 {
    let x: u64;
    asm!("csrr {}, stvec", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_stvec(x: u64) {
    asm!("csrw stvec, {}", in(reg) x);
}

// Supervisor Address Translation and Protection
// SATP holds the address of the page table; 0 means bare mode.
#[inline(always)]
pub unsafe fn r_satp() -> u64 {
    let x: u64;
    asm!("csrr {}, satp", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_satp(x: u64) {
    asm!("csrw satp, {}", in(reg) x);
}

// Supervisor Trap Cause
#[inline(always)]
pub unsafe fn r_scause() -> u64 {
    let x: u64;
    asm!("csrr {}, scause", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_scause(x: u64) {
    asm!("csrw scause, {}", in(reg) x);
}

// Supervisor Trap Value
#[inline(always)]
pub unsafe fn r_stval() -> u64 {
    let x: u64;
    asm!("csrr {}, stval", out(reg) x);
    x
}
#[inline(always)]
pub unsafe fn w_stval(x: u64) {
    asm!("csrw stval, {}", in(reg) x);
}

// Write TP (thread pointer), which holds this core's hartid.
#[inline(always)]
pub unsafe fn w_tp(x: u64) {
    asm!("mv tp, {}", in(reg) x);
}
