//! Low-level code that crosses between user and supervisor mode.
//!
//! While the process runs, sscratch holds the address of its trapframe.
//! `smode_trap_vector` swaps it into a0, saves the 31 general-purpose
//! registers at their trapframe offsets, loads `kernel_sp` and jumps to
//! `kernel_trap`. `return_to_user` does the reverse and finishes with
//! `sret`. The offsets here must match `Trapframe`.

use crate::proc::trapframe::Trapframe;
use core::{arch::global_asm, ptr::addr_of};

global_asm!(
    r#"
    .section .text
    .globl smode_trap_vector
    .balign 4
smode_trap_vector:
    csrrw a0, sscratch, a0

    sd ra, 0(a0)
    sd sp, 8(a0)
    sd gp, 16(a0)
    sd tp, 24(a0)
    sd t0, 32(a0)
    sd t1, 40(a0)
    sd t2, 48(a0)
    sd s0, 56(a0)
    sd s1, 64(a0)
    sd a1, 80(a0)
    sd a2, 88(a0)
    sd a3, 96(a0)
    sd a4, 104(a0)
    sd a5, 112(a0)
    sd a6, 120(a0)
    sd a7, 128(a0)
    sd s2, 136(a0)
    sd s3, 144(a0)
    sd s4, 152(a0)
    sd s5, 160(a0)
    sd s6, 168(a0)
    sd s7, 176(a0)
    sd s8, 184(a0)
    sd s9, 192(a0)
    sd s10, 200(a0)
    sd s11, 208(a0)
    sd t3, 216(a0)
    sd t4, 224(a0)
    sd t5, 232(a0)
    sd t6, 240(a0)

    # The user's a0 is parked in sscratch.
    csrr t0, sscratch
    sd t0, 72(a0)
    csrw sscratch, a0

    # kernel_sp, then kernel_trap.
    ld sp, 248(a0)
    ld t0, 256(a0)
    jr t0

    .globl return_to_user
    .balign 4
return_to_user:
    csrw sscratch, a0

    ld ra, 0(a0)
    ld sp, 8(a0)
    ld gp, 16(a0)
    ld tp, 24(a0)
    ld t0, 32(a0)
    ld t1, 40(a0)
    ld t2, 48(a0)
    ld s0, 56(a0)
    ld s1, 64(a0)
    ld a1, 80(a0)
    ld a2, 88(a0)
    ld a3, 96(a0)
    ld a4, 104(a0)
    ld a5, 112(a0)
    ld a6, 120(a0)
    ld a7, 128(a0)
    ld s2, 136(a0)
    ld s3, 144(a0)
    ld s4, 152(a0)
    ld s5, 160(a0)
    ld s6, 168(a0)
    ld s7, 176(a0)
    ld s8, 184(a0)
    ld s9, 192(a0)
    ld s10, 200(a0)
    ld s11, 208(a0)
    ld t3, 216(a0)
    ld t4, 224(a0)
    ld t5, 232(a0)
    ld t6, 240(a0)
    ld a0, 72(a0)

    sret
"#
);

extern "C" {
    static smode_trap_vector: [u8; 0];
    #[link_name = "return_to_user"]
    fn return_to_user_asm(trapframe: *mut Trapframe) -> !;
}

pub fn smode_trap_vector_address() -> u64 {
    unsafe { addr_of!(smode_trap_vector) as usize as u64 }
}

pub unsafe fn return_to_user(trapframe: *mut Trapframe) -> ! {
    return_to_user_asm(trapframe)
}
