#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]

pub mod arch;
pub mod console;
pub mod dtb;
pub mod elf;
pub mod hardware;
pub mod mem;
pub mod proc;
pub mod sync;
pub mod syscall;

use crate::{
    arch::{
        riscv::{DRAM_BASE, PHYSICAL_END},
        Csr, Hart,
    },
    dtb::DeviceInfo,
    elf::{BackingStore, ElfError},
    mem::PhysicalMemory,
    proc::{
        cpu::Cpu,
        process::{load_user_program, prepare_activation, Process},
        trapframe::Trapframe,
    },
    sync::spinmutex::SpinMutex,
};

#[allow(unused_imports)]
pub(crate) use crate::console::printf::{print, println, uprint, uprintln};

/// Maximum number of CPUs
pub const NCPU: usize = 1;
/// Maximum number of processes
pub const NPROC: usize = 1;

/// What machine mode learned from the device tree, if it could read it.
pub static BOOT_INFO: SpinMutex<Option<DeviceInfo>> = SpinMutex::new(None);

/// One past the end of the RAM the kernel was loaded into.
pub fn ram_end() -> u64 {
    BOOT_INFO
        .lock()
        .as_ref()
        .and_then(|info| info.memory_end(DRAM_BASE))
        .unwrap_or(PHYSICAL_END)
}

/// Turn off paging, build the user process from `image`, and set up
/// the hart to enter it. Returns the trapframe to resume from.
pub unsafe fn prepare_user_app<H: Hart, S: BackingStore, M: PhysicalMemory>(
    hart: &mut H,
    cpu: &mut Cpu,
    proc: *mut Process,
    trapframe: *mut Trapframe,
    image: &mut S,
    memory: &mut M,
) -> Result<*mut Trapframe, ElfError> {
    // Bare mode: virtual addresses are physical addresses.
    hart.write_csr(Csr::Satp, 0);

    load_user_program(&mut *proc, trapframe, image, memory)?;

    println!("Switch to user mode...");
    Ok(prepare_activation(hart, cpu, proc))
}

#[cfg(target_arch = "riscv64")]
extern "C" {
    /// First address after the kernel image, from kernel.ld.
    static end: [u8; 0];
}

/// m_start mrets here in supervisor mode.
#[cfg(target_arch = "riscv64")]
#[no_mangle]
pub unsafe extern "C" fn s_start() -> ! {
    use crate::{
        arch::{riscv::{USER_STACK, USER_TRAP_FRAME}, RiscvHart},
        elf::RamImage,
        mem::IdentityMemory,
    };
    use core::ptr::addr_of;

    println!("Enter supervisor mode...");

    let initrd = BOOT_INFO.lock().as_ref().and_then(|info| info.initrd);
    let Some((start, stop)) = initrd else {
        panic!("no user program: the device tree has no initrd");
    };
    let mut image = RamImage::from_raw(start, stop);

    // The program gets everything between the kernel and its stack top;
    // the kernel stack and trapframe sit above that.
    let mut memory = IdentityMemory::new(addr_of!(end) as usize as u64, USER_STACK);

    let mut hart = RiscvHart;
    let proc: *mut Process = Process::user_app();
    match prepare_user_app(
        &mut hart,
        Cpu::current(),
        proc,
        USER_TRAP_FRAME as usize as *mut Trapframe,
        &mut image,
        &mut memory,
    ) {
        Ok(trapframe) => hart.return_to_user(trapframe),
        Err(err) => panic!("failed to load the user program: {}", err),
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic_wrapper(panic_info: &core::panic::PanicInfo) -> ! {
    if let Some(location) = panic_info.location() {
        uprint!("kernel panic ({}:{}): ", location.file(), location.line());
    } else {
        uprint!("kernel panic: ");
    }
    uprintln!("{}", panic_info.message());

    // Quit QEMU for convenience.
    arch::power::shutdown(-1)
}
