//! Architecture-agnostic power handling.

#[cfg(target_arch = "riscv64")]
pub use crate::hardware::platform::shutdown;

/// There is no machine to power off when running on a host.
#[cfg(not(target_arch = "riscv64"))]
pub fn shutdown(code: i64) -> ! {
    panic!("shutdown requested with exit code {}", code);
}
