#[cfg(feature = "qemu-riscv64")]
mod qemu_riscv64;
#[cfg(feature = "qemu-riscv64")]
pub use qemu_riscv64::*;

#[cfg(not(feature = "qemu-riscv64"))]
compile_error!("a platform must be selected");
