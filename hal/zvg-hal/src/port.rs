//! I/O port abstractions
//!
//! The parallel port and the ISA DMA controller are both driven through
//! byte-wide port reads and writes.

/// Byte-wide I/O port access
///
/// Implementations perform the actual port instructions (or forward to a
/// simulated device). Reads may have side effects on the device.
pub trait PortIo {
    /// Read one byte from the port at `addr`
    fn read8(&mut self, addr: u16) -> u8;

    /// Write one byte to the port at `addr`
    fn write8(&mut self, addr: u16, value: u8);

    /// Read-modify-write helper
    fn modify8<F>(&mut self, addr: u16, f: F) -> u8
    where
        F: FnOnce(u8) -> u8,
    {
        let value = f(self.read8(addr));
        self.write8(addr, value);
        value
    }
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn read8(&mut self, addr: u16) -> u8 {
        (**self).read8(addr)
    }

    fn write8(&mut self, addr: u16, value: u8) {
        (**self).write8(addr, value)
    }
}
