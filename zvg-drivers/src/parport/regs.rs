//! ECP parallel port register map
//!
//! DSR and DCR constants are *logical* values: the hardware inverts some
//! lines, and the transport undoes that with [`DSR_INVERT`] and
//! [`DCR_INVERT`] so that a set bit always means "line asserted high".

/// Register offsets from the port base address
pub mod reg {
    /// SPP data / ECP address FIFO
    pub const DATA: u16 = 0x000;
    /// Device status register
    pub const DSR: u16 = 0x001;
    /// Device control register
    pub const DCR: u16 = 0x002;
    /// ECP data FIFO (ECP mode) / configuration A (configuration mode)
    pub const FIFO: u16 = 0x400;
    pub const CNFG_A: u16 = 0x400;
    /// Configuration B (configuration mode)
    pub const CNFG_B: u16 = 0x401;
    /// Extended control register
    pub const ECR: u16 = 0x402;
}

/// Extended control register
pub mod ecr {
    /// Mode field
    pub const MODE_MASK: u8 = 0xE0;
    pub const MODE_SPP: u8 = 0x00;
    pub const MODE_PS2: u8 = 0x20;
    pub const MODE_ECP: u8 = 0x60;
    pub const MODE_CONFIG: u8 = 0xE0;

    /// Disable error interrupts (active low enable)
    pub const N_ERR_INTR_EN: u8 = 0x10;
    /// DMA enable
    pub const DMA_EN: u8 = 0x08;
    /// Service interrupt; set by hardware on DMA terminal count
    pub const SERVICE_INTR: u8 = 0x04;
    /// FIFO full
    pub const FULL: u8 = 0x02;
    /// FIFO empty
    pub const EMPTY: u8 = 0x01;

    /// Idle SPP setting
    pub const SPP_IDLE: u8 = MODE_SPP | N_ERR_INTR_EN | SERVICE_INTR;
    /// Idle ECP setting
    pub const ECP_IDLE: u8 = MODE_ECP | N_ERR_INTR_EN | SERVICE_INTR;
    /// Configuration register access
    pub const CONFIG: u8 = MODE_CONFIG | N_ERR_INTR_EN | SERVICE_INTR;

    /// Written during detection; an ECP port reads it back with EMPTY set
    pub const PROBE: u8 = MODE_PS2 | N_ERR_INTR_EN | SERVICE_INTR;
}

/// Device status register (logical)
pub mod dsr {
    /// Nibble mode: no reverse data. ECP: nPeriphRequest
    pub const N_DATA_AVAIL: u8 = 0x08;
    pub const XFLAG: u8 = 0x10;
    /// Nibble mode: AckDataReq. ECP: nAckReverse
    pub const ACK_DATA_REQ: u8 = 0x20;
    /// Nibble mode: PtrClk. ECP: PeriphClk
    pub const PTR_CLK: u8 = 0x40;
    /// Compatibility: Busy. ECP: PeriphAck
    pub const BUSY: u8 = 0x80;
}

/// Device control register (logical)
pub mod dcr {
    /// nStrobe
    pub const HOST_CLK: u8 = 0x01;
    /// nAutoFeed; HostAck in ECP mode
    pub const HOST_BUSY: u8 = 0x02;
    pub const HOST_ACK: u8 = HOST_BUSY;
    /// nInit; nReverseRequest in ECP mode
    pub const N_INIT: u8 = 0x04;
    /// nSelectIn
    pub const ACTIVE_1284: u8 = 0x08;
    /// Data direction (set = input)
    pub const DIRECTION: u8 = 0x20;
}

/// Lines inverted between DSR register and connector
pub const DSR_INVERT: u8 = 0x80;

/// Lines inverted between DCR register and connector
pub const DCR_INVERT: u8 = 0x0B;

/// Configuration A: PWord (implementation word size) field
pub const CNFG_A_PWORD_MASK: u8 = 0x70;
/// Configuration A: 8-bit PWord
pub const CNFG_A_PWORD_8BIT: u8 = 0x10;
/// Configuration B: RLE compression enable
pub const CNFG_B_COMPRESS: u8 = 0x80;

/// IRQ numbers indexed by configuration B bits 5:3
pub const IRQ_LOOKUP: [u8; 8] = [0, 7, 9, 10, 11, 14, 15, 5];
