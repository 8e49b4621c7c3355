use crate::hardware::uart::Uart;

pub const UART0_BASE: usize = 0x1000_0000;
pub static UART0: Uart = Uart::new(UART0_BASE);

/// QEMU test interface. Used for power off.
pub const QEMU_POWER: usize = 0x100000;

const FINISHER_PASS: u32 = 0x5555;
const FINISHER_FAIL: u32 = 0x3333;

/// The value that makes QEMU exit with `code`.
pub fn finisher_value(code: i64) -> u32 {
    if code == 0 {
        FINISHER_PASS
    } else {
        ((code as u32) << 16) | FINISHER_FAIL
    }
}

/// Power off the machine.
pub fn shutdown(code: i64) -> ! {
    let qemu_power = QEMU_POWER as *mut u32;
    unsafe { qemu_power.write_volatile(finisher_value(code)) };
    loop {
        core::hint::spin_loop();
    }
}
