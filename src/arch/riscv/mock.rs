//! A simulated hart for exercising boot and trap code on the host.

use super::hart::{Csr, Hart};
use crate::proc::trapframe::Trapframe;

pub const MOCK_TRAP_VECTOR: u64 = 0x8000_1000;
pub const MOCK_TRAP_HANDLER: u64 = 0x8000_2000;

pub struct MockHart {
    csrs: [u64; Csr::COUNT],
    /// Bits of each register that accept writes; models WARL fields.
    writable: [u64; Csr::COUNT],
    pub machine_returns: usize,
    pub user_returns: usize,
    pub writes: usize,
}
impl MockHart {
    /// An RV64 hart with the S and U extensions and fully writable registers.
    pub fn new() -> MockHart {
        let mut hart = MockHart {
            csrs: [0; Csr::COUNT],
            writable: [u64::MAX; Csr::COUNT],
            machine_returns: 0,
            user_returns: 0,
            writes: 0,
        };
        hart.set(Csr::Misa, (2 << 62) | (1 << (b'S' - b'A')) | (1 << (b'U' - b'A')));
        hart
    }
    /// Force a register's value without going through `write_csr`.
    pub fn set(&mut self, csr: Csr, value: u64) {
        self.csrs[csr.index()] = value;
    }
    pub fn get(&self, csr: Csr) -> u64 {
        self.csrs[csr.index()]
    }
    pub fn restrict(&mut self, csr: Csr, writable: u64) {
        self.writable[csr.index()] = writable;
    }
    /// Pretend the hardware just took a trap.
    pub fn raise(&mut self, scause: u64, sepc: u64, stval: u64, sstatus: u64) {
        self.set(Csr::Scause, scause);
        self.set(Csr::Sepc, sepc);
        self.set(Csr::Stval, stval);
        self.set(Csr::Sstatus, sstatus);
    }
}
impl Default for MockHart {
    fn default() -> MockHart {
        MockHart::new()
    }
}
impl Hart for MockHart {
    fn read_csr(&self, csr: Csr) -> u64 {
        self.get(csr)
    }
    fn write_csr(&mut self, csr: Csr, value: u64) {
        let mask = self.writable[csr.index()];
        let old = self.csrs[csr.index()];
        self.csrs[csr.index()] = (old & !mask) | (value & mask);
        self.writes += 1;
    }
    fn user_trap_vector(&self) -> u64 {
        MOCK_TRAP_VECTOR
    }
    fn user_trap_handler(&self) -> u64 {
        MOCK_TRAP_HANDLER
    }
    unsafe fn machine_return(&mut self) -> ! {
        self.machine_returns += 1;
        panic!("mret");
    }
    unsafe fn return_to_user(&mut self, _trapframe: *mut Trapframe) -> ! {
        self.user_returns += 1;
        panic!("sret");
    }
}
