//! The bootable kernel image.
//!
//! QEMU jumps to `_entry` in machine mode with the hart id in a0 and
//! the device tree address in a1.

#![no_std]
#![no_main]

use core::arch::global_asm;
use pkernel::arch::riscv::start::{m_start, STACK_SIZE};

global_asm!(
    r#"
    .section .text.entry
    .globl _entry
_entry:
    # Only hart 0 boots; the rest wait forever.
    csrr t0, mhartid
    bnez t0, 2f

    # Set up a stack for Rust: sp = stack0 + {stack_size}.
    la sp, stack0
    li t0, {stack_size}
    add sp, sp, t0

    # a0 and a1 still hold the hart id and device tree.
    call {m_start}
2:
    wfi
    j 2b
"#,
    stack_size = const STACK_SIZE,
    m_start = sym m_start,
);
