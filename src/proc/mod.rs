pub mod cpu;
pub mod process;
pub mod trap;
pub mod trapframe;
