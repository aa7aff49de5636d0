//! Block-transfer abstractions
//!
//! A block transfer moves a staged command buffer to the parallel port's
//! FIFO without CPU involvement. The port side (enabling DMA in the ECP
//! control register, watching for terminal count) belongs to the transport;
//! the engine side (programming and masking the DMA controller) is behind
//! [`BlockTransfer`].

/// Physical location of staged transfer memory
///
/// ISA DMA addresses memory as a 64 KiB page plus a 16-bit offset, and a
/// single transfer must not cross a page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalAddress {
    /// 64 KiB page number
    pub page: u8,
    /// Offset within the page
    pub offset: u16,
}

/// Memory the DMA engine can read from
pub trait DmaMemory {
    /// Error type for staging operations
    type Error;

    /// Copy `data` into transfer-safe memory and return its physical address
    fn stage(&mut self, data: &[u8]) -> Result<PhysicalAddress, Self::Error>;
}

/// Block-transfer engine
///
/// Completion is not reported here: the parallel port raises its service
/// interrupt bit on terminal count, which the transport polls.
pub trait BlockTransfer {
    /// Error type for transfer operations
    type Error;

    /// Program the engine for `data` and unmask it
    ///
    /// Returns once the transfer has been started.
    fn start(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Mask the engine, stopping any transfer in progress
    fn abort(&mut self);
}
