//! Polled driver for the 16550a UART.

// The UART control registers.
// Some have different meanings for read vs write.
// See http://byterunner.com/16550.html

const FCR_FIFO_ENABLE: u8 = 1 << 0;
/// Clear the content of the two FIFOs.
const FCR_FIFO_CLEAR: u8 = 3 << 1;
const LCR_EIGHT_BITS: u8 = 3;
/// Special mode to set baud rate
const LCR_BAUD_LATCH: u8 = 1 << 7;
/// THR can accept another character to send
const LSR_TX_IDLE: u8 = 1 << 5;

enum Register {
    TransmitHolding,
    DivisorLow,
    DivisorHigh,
    InterruptEnable,
    FIFOControl,
    LineControl,
    LineStatus,
}
impl Register {
    pub fn as_offset(&self) -> usize {
        match self {
            Register::TransmitHolding => 0,
            Register::DivisorLow => 0,
            Register::DivisorHigh => 1,
            Register::InterruptEnable => 1,
            Register::FIFOControl => 2,
            Register::LineControl => 3,
            Register::LineStatus => 5,
        }
    }
    pub fn as_ptr(&self, base_address: usize) -> *mut u8 {
        (base_address + self.as_offset()) as *mut u8
    }
    pub fn read(&self, base_address: usize) -> u8 {
        unsafe { self.as_ptr(base_address).read_volatile() }
    }
    pub fn write(&self, base_address: usize, value: u8) {
        unsafe { self.as_ptr(base_address).write_volatile(value) }
    }
}

pub struct Uart {
    pub base_address: usize,
}
impl Uart {
    pub const fn new(base_address: usize) -> Uart {
        Uart { base_address }
    }
    /// Initialize the UART for polled output.
    pub unsafe fn initialize(&self) {
        // Disable interrupts.
        Register::InterruptEnable.write(self.base_address, 0x00);
        // Special mode to set baud rate.
        Register::LineControl.write(self.base_address, LCR_BAUD_LATCH);
        // LSB for baud rate of 38.4K.
        Register::DivisorLow.write(self.base_address, 0x03);
        // MSB for baud rate of 38.4K.
        Register::DivisorHigh.write(self.base_address, 0x00);
        // Leave set-baud mode and set
        // word length to 8 bits, no parity.
        Register::LineControl.write(self.base_address, LCR_EIGHT_BITS);
        // Reset and enable FIFOs.
        Register::FIFOControl.write(self.base_address, FCR_FIFO_ENABLE | FCR_FIFO_CLEAR);
    }
    /// Write a byte to the UART, spinning until it has room.
    pub fn write_byte(&self, b: u8) {
        // Wait for Transmit Holding Empty to be set in LSR.
        while Register::LineStatus.read(self.base_address) & LSR_TX_IDLE == 0 {
            core::hint::spin_loop();
        }
        Register::TransmitHolding.write(self.base_address, b);
    }
    pub fn write_slice(&self, bytes: &[u8]) {
        for b in bytes {
            self.write_byte(*b);
        }
    }
}
