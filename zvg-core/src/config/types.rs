//! Configuration type definitions

use bitflags::bitflags;

use crate::buffer::COMMAND_BUFFER_SIZE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default per-phase handshake timeout
pub const HANDSHAKE_TIMEOUT_MS: u32 = 100;

/// Default timeout for transfers and peripheral data waits
pub const TRANSFER_TIMEOUT_MS: u32 = 1000;

/// Highest 8-bit ISA DMA channel
pub const MAX_DMA_CHANNEL: u32 = 3;

bitflags! {
    /// Monitor type flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct MonitorFlags: u8 {
        /// Mirror the X axis
        const FLIP_X = 0x01;
        /// Mirror the Y axis
        const FLIP_Y = 0x02;
        /// Draw spot-killer dots when a frame does not deflect far enough
        const SPOT_KILL = 0x04;
        /// Mix colors down to the green gun
        const MONOCHROME = 0x08;
        /// Clip to the visible area instead of the overscan area
        const NO_OVERSCAN = 0x10;
    }
}

impl Default for MonitorFlags {
    fn default() -> Self {
        MonitorFlags::SPOT_KILL
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MonitorFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "MonitorFlags({=u8:#x})", self.bits())
    }
}

/// Block-transfer handshake mode of the DMA controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DmaMode {
    /// Byte-polled ECP only
    Disabled,
    /// Demand-mode DMA (most chipsets)
    #[default]
    Demand,
    /// Single-cycle DMA (some early chipsets)
    Single,
}

impl DmaMode {
    /// Parse the numeric configuration value
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(DmaMode::Disabled),
            1 => Some(DmaMode::Demand),
            2 => Some(DmaMode::Single),
            _ => None,
        }
    }
}

/// Bounded wait budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeouts {
    /// Per handshake phase
    pub handshake_ms: u32,
    /// Per transfer, FIFO drain or peripheral data wait
    pub transfer_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake_ms: HANDSHAKE_TIMEOUT_MS,
            transfer_ms: TRANSFER_TIMEOUT_MS,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `P` value is not a hexadecimal port address
    BadPort,
    /// `D` value is not a number
    BadDma,
    /// DMA mode after `D<n>,` is not a number
    BadDmaMode,
    /// `I` value is not a number
    BadIrq,
    /// `M` value is not a number
    BadMonitor,
    /// No port address given
    MissingPort,
    /// DMA channel outside 0..=3
    InvalidDma,
    /// DMA mode outside 0..=2
    InvalidDmaMode,
}

/// Values read from the port chipset's configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipsetInfo {
    /// DMA channel, 0 if the chipset does not report one
    pub dma: u8,
    /// IRQ line, 0 if the chipset does not report one
    pub irq: u8,
}

/// Parsed, unresolved port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    pub port: Option<u16>,
    pub dma: Option<u32>,
    pub dma_mode: Option<u32>,
    pub irq: Option<u32>,
    pub monitor: Option<MonitorFlags>,
}

/// Why block transfer was turned off during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaFallback {
    /// Disabled by configuration
    Disabled,
    /// No channel configured and the chipset reports none
    NoChannel,
    /// Chipset reports a channel that is not an 8-bit ISA channel
    ChannelOutOfRange(u8),
    /// No IRQ configured and the chipset reports none
    NoIrq,
}

/// Block-transfer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmaConfig {
    /// ISA DMA channel (0..=3)
    pub channel: u8,
    /// Demand or single
    pub mode: DmaMode,
}

/// Resolved session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    /// Parallel port base address
    pub port: u16,
    /// Block transfer, or `None` for polled ECP
    pub dma: Option<DmaConfig>,
    /// Set when block transfer was wanted but could not be used
    pub dma_fallback: Option<DmaFallback>,
    pub irq: Option<u8>,
    pub monitor: MonitorFlags,
    /// Bytes each command buffer accepts
    pub buffer_limit: usize,
    pub timeouts: Timeouts,
}

impl SessionConfig {
    /// Polled configuration for `port` with default monitor flags
    pub fn polled(port: u16) -> Self {
        Self {
            port,
            dma: None,
            dma_fallback: Some(DmaFallback::Disabled),
            irq: None,
            monitor: MonitorFlags::default(),
            buffer_limit: COMMAND_BUFFER_SIZE,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: MonitorFlags) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_dma(mut self, channel: u8, mode: DmaMode) -> Self {
        self.dma = Some(DmaConfig { channel, mode });
        self.dma_fallback = None;
        self
    }

    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = limit.min(COMMAND_BUFFER_SIZE);
        self
    }
}

impl PortConfig {
    /// Resolve against the values the chipset reports
    ///
    /// Missing or unusable DMA settings fall back to polled transfer and
    /// are reported through [`SessionConfig::dma_fallback`]; only explicitly
    /// configured out-of-range values are errors.
    pub fn resolve(&self, chipset: ChipsetInfo) -> Result<SessionConfig, ConfigError> {
        let port = self.port.ok_or(ConfigError::MissingPort)?;
        let mut config = SessionConfig::polled(port);
        config.monitor = self.monitor.unwrap_or_default();

        let channel = match self.dma {
            Some(dma) if dma > MAX_DMA_CHANNEL => return Err(ConfigError::InvalidDma),
            Some(dma) => Ok(dma as u8),
            None if chipset.dma == 0 => Err(DmaFallback::NoChannel),
            None if u32::from(chipset.dma) > MAX_DMA_CHANNEL => {
                Err(DmaFallback::ChannelOutOfRange(chipset.dma))
            }
            None => Ok(chipset.dma),
        };

        let mode = match self.dma_mode {
            Some(value) => DmaMode::from_value(value).ok_or(ConfigError::InvalidDmaMode)?,
            None => DmaMode::Demand,
        };

        config.irq = match self.irq {
            Some(irq) => Some(irq as u8),
            None if chipset.irq != 0 => Some(chipset.irq),
            None => None,
        };

        let dma = match channel {
            Err(fallback) => Err(fallback),
            Ok(_) if mode == DmaMode::Disabled => Err(DmaFallback::Disabled),
            Ok(_) if config.irq.is_none() => Err(DmaFallback::NoIrq),
            Ok(channel) => Ok(DmaConfig { channel, mode }),
        };

        match dma {
            Ok(dma) => {
                config.dma = Some(dma);
                config.dma_fallback = None;
            }
            Err(fallback) => {
                config.dma = None;
                config.dma_fallback = Some(fallback);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chipset(dma: u8, irq: u8) -> ChipsetInfo {
        ChipsetInfo { dma, irq }
    }

    fn port_only() -> PortConfig {
        PortConfig {
            port: Some(0x378),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_port() {
        assert_eq!(
            PortConfig::default().resolve(chipset(3, 7)),
            Err(ConfigError::MissingPort)
        );
    }

    #[test]
    fn test_chipset_values_used() {
        let config = port_only().resolve(chipset(3, 7)).unwrap();
        assert_eq!(
            config.dma,
            Some(DmaConfig {
                channel: 3,
                mode: DmaMode::Demand
            })
        );
        assert_eq!(config.irq, Some(7));
        assert_eq!(config.monitor, MonitorFlags::SPOT_KILL);
        assert_eq!(config.dma_fallback, None);
    }

    #[test]
    fn test_no_chipset_dma_falls_back() {
        let config = port_only().resolve(chipset(0, 7)).unwrap();
        assert_eq!(config.dma, None);
        assert_eq!(config.dma_fallback, Some(DmaFallback::NoChannel));

        let config = port_only().resolve(chipset(5, 7)).unwrap();
        assert_eq!(config.dma_fallback, Some(DmaFallback::ChannelOutOfRange(5)));
    }

    #[test]
    fn test_no_irq_falls_back() {
        let config = port_only().resolve(chipset(3, 0)).unwrap();
        assert_eq!(config.dma, None);
        assert_eq!(config.dma_fallback, Some(DmaFallback::NoIrq));
    }

    #[test]
    fn test_configured_values_override() {
        let parsed = PortConfig {
            port: Some(0x278),
            dma: Some(1),
            dma_mode: Some(2),
            irq: Some(5),
            monitor: Some(MonitorFlags::FLIP_X | MonitorFlags::MONOCHROME),
        };
        let config = parsed.resolve(chipset(3, 7)).unwrap();
        assert_eq!(config.port, 0x278);
        assert_eq!(
            config.dma,
            Some(DmaConfig {
                channel: 1,
                mode: DmaMode::Single
            })
        );
        assert_eq!(config.irq, Some(5));
        assert!(config.monitor.contains(MonitorFlags::FLIP_X));
        assert!(!config.monitor.contains(MonitorFlags::SPOT_KILL));
    }

    #[test]
    fn test_invalid_configured_dma() {
        let parsed = PortConfig {
            dma: Some(5),
            ..port_only()
        };
        assert_eq!(parsed.resolve(chipset(3, 7)), Err(ConfigError::InvalidDma));

        let parsed = PortConfig {
            dma_mode: Some(3),
            ..port_only()
        };
        assert_eq!(
            parsed.resolve(chipset(3, 7)),
            Err(ConfigError::InvalidDmaMode)
        );
    }

    #[test]
    fn test_dma_disabled_by_mode() {
        let parsed = PortConfig {
            dma_mode: Some(0),
            ..port_only()
        };
        let config = parsed.resolve(chipset(3, 7)).unwrap();
        assert_eq!(config.dma, None);
        assert_eq!(config.dma_fallback, Some(DmaFallback::Disabled));
    }
}
