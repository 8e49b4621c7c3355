pub mod riscv;

pub mod power;

pub use riscv::hart::{Csr, Hart};
#[cfg(target_arch = "riscv64")]
pub use riscv::hart::RiscvHart;
