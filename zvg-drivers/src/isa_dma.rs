//! ISA 8237 DMA block-transfer driver
//!
//! Programs one of the four 8-bit channels of the first DMA controller to
//! feed the parallel port FIFO from staged memory. The port raises its
//! service interrupt bit on terminal count; this driver only starts and
//! masks the channel.

use log::trace;
use zvg_core::config::{ConfigError, DmaConfig, DmaMode};
use zvg_core::{Error, Result};
use zvg_hal::{BlockTransfer, DmaMemory, PortIo};

/// Controller registers
pub mod reg {
    /// Single channel mask
    pub const MASK: u16 = 0x0A;
    /// Mode
    pub const MODE: u16 = 0x0B;
    /// Clear byte pointer flip-flop
    pub const CLEAR_FF: u16 = 0x0C;
}

/// Mode and mask register values (OR in the channel)
pub mod mode {
    /// Demand transfer, memory to device
    pub const DEMAND: u8 = 0x08;
    /// Single transfer, memory to device
    pub const SINGLE: u8 = 0x48;
    /// Set the channel's mask bit
    pub const MASK_SET: u8 = 0x04;
}

/// Largest transfer one channel can do
pub const MAX_TRANSFER: usize = 0x1_0000;

#[derive(Debug, Clone, Copy)]
struct ChannelPorts {
    page: u16,
    address: u16,
    count: u16,
}

const CHANNEL_PORTS: [ChannelPorts; 4] = [
    ChannelPorts { page: 0x87, address: 0x00, count: 0x01 },
    ChannelPorts { page: 0x83, address: 0x02, count: 0x03 },
    ChannelPorts { page: 0x81, address: 0x04, count: 0x05 },
    ChannelPorts { page: 0x82, address: 0x06, count: 0x07 },
];

/// One channel of the 8237
pub struct Dma8237<P, M> {
    port: P,
    memory: M,
    channel: u8,
    mode: u8,
}

impl<P: PortIo, M: DmaMemory> Dma8237<P, M> {
    /// Driver for the channel and mode in `config`
    pub fn new(port: P, memory: M, config: DmaConfig) -> Result<Self> {
        if usize::from(config.channel) >= CHANNEL_PORTS.len() {
            return Err(ConfigError::InvalidDma.into());
        }
        let mode = match config.mode {
            DmaMode::Demand => mode::DEMAND,
            DmaMode::Single => mode::SINGLE,
            DmaMode::Disabled => return Err(ConfigError::InvalidDmaMode.into()),
        };
        Ok(Self {
            port,
            memory,
            channel: config.channel,
            mode,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn into_parts(self) -> (P, M) {
        (self.port, self.memory)
    }

    fn mask(&mut self) {
        self.port.write8(reg::MASK, mode::MASK_SET | self.channel);
    }
}

impl<P: PortIo, M: DmaMemory> BlockTransfer for Dma8237<P, M> {
    type Error = Error;

    fn start(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if data.len() > MAX_TRANSFER {
            return Err(Error::OutOfMemory);
        }

        let at = self.memory.stage(data).map_err(|_| Error::OutOfMemory)?;
        // A transfer must stay within one 64 KiB page
        if usize::from(at.offset) + data.len() > MAX_TRANSFER {
            return Err(Error::OutOfMemory);
        }

        let ports = CHANNEL_PORTS[usize::from(self.channel)];
        let [addr_lo, addr_hi] = at.offset.to_le_bytes();
        let [count_lo, count_hi] = ((data.len() - 1) as u16).to_le_bytes();

        self.mask();
        self.port.write8(reg::MODE, self.mode | self.channel);
        self.port.write8(reg::CLEAR_FF, 0);
        self.port.write8(ports.page, at.page);
        self.port.write8(ports.address, addr_lo);
        self.port.write8(ports.address, addr_hi);
        self.port.write8(ports.count, count_lo);
        self.port.write8(ports.count, count_hi);
        self.port.write8(reg::MASK, self.channel);

        trace!(
            "DMA{} started: {} bytes at {:02x}:{:04x}",
            self.channel,
            data.len(),
            at.page,
            at.offset
        );
        Ok(())
    }

    fn abort(&mut self) {
        self.mask();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FixedMemory, RecordingPort};

    fn channel(channel: u8, mode: DmaMode) -> DmaConfig {
        DmaConfig { channel, mode }
    }

    #[test]
    fn test_program_channel_3() {
        let mut dma = Dma8237::new(
            RecordingPort::default(),
            FixedMemory::at(0x02, 0x1000),
            channel(3, DmaMode::Demand),
        )
        .unwrap();

        dma.start(&[0xE0; 300]).unwrap();
        let (port, memory) = dma.into_parts();
        assert_eq!(memory.staged.len(), 300);
        assert_eq!(
            port.writes,
            vec![
                (0x0A, 0x07),
                (0x0B, 0x0B),
                (0x0C, 0x00),
                (0x82, 0x02),
                (0x06, 0x00),
                (0x06, 0x10),
                // 299 = 0x012B
                (0x07, 0x2B),
                (0x07, 0x01),
                (0x0A, 0x03),
            ]
        );
    }

    #[test]
    fn test_single_mode_channel_1() {
        let mut dma = Dma8237::new(
            RecordingPort::default(),
            FixedMemory::at(0, 0),
            channel(1, DmaMode::Single),
        )
        .unwrap();
        dma.start(&[1]).unwrap();
        dma.abort();

        let (port, _) = dma.into_parts();
        assert_eq!(port.writes[1], (0x0B, 0x49));
        assert_eq!(port.writes[3], (0x83, 0x00));
        // Count of a one-byte transfer is zero
        assert_eq!(port.writes[6], (0x03, 0x00));
        assert_eq!(port.writes.last(), Some(&(0x0A, 0x05)));
    }

    #[test]
    fn test_page_crossing_rejected() {
        let mut dma = Dma8237::new(
            RecordingPort::default(),
            FixedMemory::at(1, 0xFF00),
            channel(3, DmaMode::Demand),
        )
        .unwrap();
        assert_eq!(dma.start(&[0; 0x200]), Err(Error::OutOfMemory));
        let (port, _) = dma.into_parts();
        assert!(port.writes.is_empty());
    }

    #[test]
    fn test_staging_failure() {
        let mut memory = FixedMemory::at(0, 0);
        memory.fail = true;
        let mut dma =
            Dma8237::new(RecordingPort::default(), memory, channel(0, DmaMode::Demand)).unwrap();
        assert_eq!(dma.start(&[1, 2]), Err(Error::OutOfMemory));
        assert_eq!(dma.start(&[]), Ok(()));
    }

    #[test]
    fn test_invalid_config() {
        let bad_channel = Dma8237::new(
            RecordingPort::default(),
            FixedMemory::at(0, 0),
            channel(4, DmaMode::Demand),
        );
        assert_eq!(
            bad_channel.err(),
            Some(Error::Config(ConfigError::InvalidDma))
        );

        let disabled = Dma8237::new(
            RecordingPort::default(),
            FixedMemory::at(0, 0),
            channel(1, DmaMode::Disabled),
        );
        assert_eq!(
            disabled.err(),
            Some(Error::Config(ConfigError::InvalidDmaMode))
        );
    }
}
