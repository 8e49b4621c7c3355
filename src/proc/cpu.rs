use super::process::Process;
use core::ptr::{addr_of_mut, null_mut};

pub static mut CPUS: [Cpu; crate::NCPU] = [Cpu::new(); crate::NCPU];

/// Per-CPU state.
#[derive(Copy, Clone, Debug)]
pub struct Cpu {
    /// The process running on this cpu, or null before the first activate().
    proc: *mut Process,
}
impl Cpu {
    pub const fn new() -> Cpu {
        Cpu { proc: null_mut() }
    }
    /// There is exactly one hart.
    pub fn current_id() -> usize {
        0
    }
    /// Return this CPU's cpu struct.
    pub fn current() -> &'static mut Cpu {
        unsafe { &mut *addr_of_mut!(CPUS[Cpu::current_id()]) }
    }
    pub fn current_process(&mut self) -> Option<&mut Process> {
        unsafe { self.proc.as_mut() }
    }
    pub fn current_process_ptr(&self) -> *mut Process {
        self.proc
    }
    /// Only activate() may change which process is current.
    pub(super) fn set_process(&mut self, proc: *mut Process) {
        self.proc = proc;
    }
}
impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}
