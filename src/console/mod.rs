//! Console output, to the uart.
//!
//! Input is never read: the only console user is the print syscall.

pub mod printf;

use core::fmt;

/// Writes straight to the console device.
pub struct Console;
impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(target_arch = "riscv64")]
fn write_bytes(bytes: &[u8]) {
    crate::hardware::platform::UART0.write_slice(bytes);
}
#[cfg(all(test, not(target_arch = "riscv64")))]
fn write_bytes(bytes: &[u8]) {
    std::print!("{}", String::from_utf8_lossy(bytes));
}
#[cfg(not(any(test, target_arch = "riscv64")))]
fn write_bytes(_bytes: &[u8]) {}

/// Must run before the first print.
pub unsafe fn consoleinit() {
    #[cfg(target_arch = "riscv64")]
    crate::hardware::platform::UART0.initialize();
}
