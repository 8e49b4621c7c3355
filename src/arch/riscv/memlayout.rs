// Physical memory layout

// QEMU -machine virt is setup like this,
// based on QEMU's hw/riscv/virt.c
//
// 00001000 - boot ROM, provided by qemu
// 00100000 - test device (power off)
// 10000000 - uart0
// 80000000 - boot ROM jumps here in machine mode (kernel loads the kernel here)

// The kernel uses physical memory as so:
// 80000000 - _entry, then kernel text and data
// end      - start of memory handed to the user program
// 81100000 - top of the user stack
// 81200000 - kernel stack used while handling a trap
// 81300000 - the trapframe
// PHYSICAL_END - end of RAM, unless the device tree says otherwise

// Paging is disabled (satp = 0), so every address below is
// both the virtual and the physical address.

/// RAM starts here.
pub const DRAM_BASE: u64 = 0x8000_0000;
/// The end of physical memory when the device tree doesn't report any.
pub const PHYSICAL_END: u64 = DRAM_BASE + 128 * 1024 * 1024;
/// Top of the user program's stack.
pub const USER_STACK: u64 = 0x8110_0000;
/// Top of the stack the kernel runs on after a trap from user mode.
pub const USER_KSTACK: u64 = 0x8120_0000;
/// Where the (only) process's trapframe lives.
pub const USER_TRAP_FRAME: u64 = 0x8130_0000;
