//! Port configuration string parser
//!
//! Parses the `ZVGPORT` syntax: whitespace-separated, case-insensitive
//! attributes, each a letter followed by a number.
//!
//! Supported attributes:
//! - `P<hex>` port base address (required)
//! - `D<dec>[,<dec>]` DMA channel, optionally followed by the DMA mode
//!   (0 = disabled, 1 = demand, 2 = single)
//! - `I<dec>` IRQ line
//! - `M<dec>` monitor flags (see [`MonitorFlags`])
//!
//! Unknown attribute letters are skipped. A missing port is reported when
//! the configuration is resolved, not here.
//!
//! Example: `P378 D3,1 I7 M4`

use super::types::{ConfigError, MonitorFlags, PortConfig};

/// Parse a port configuration string
pub fn parse_port_config(input: &str) -> Result<PortConfig, ConfigError> {
    let mut config = PortConfig::default();
    let mut rest = input.as_bytes();

    loop {
        skip_blanks(&mut rest);
        let Some((&attr, tail)) = rest.split_first() else {
            break;
        };
        rest = tail;
        skip_blanks(&mut rest);

        match attr.to_ascii_uppercase() {
            b'P' => {
                let port = number(&mut rest, 16).ok_or(ConfigError::BadPort)?;
                config.port = Some(u16::try_from(port).map_err(|_| ConfigError::BadPort)?);
            }
            b'D' => {
                config.dma = Some(number(&mut rest, 10).ok_or(ConfigError::BadDma)?);
                skip_blanks(&mut rest);
                if let Some(tail) = rest.strip_prefix(b",") {
                    rest = tail;
                    skip_blanks(&mut rest);
                    config.dma_mode = Some(number(&mut rest, 10).ok_or(ConfigError::BadDmaMode)?);
                }
            }
            b'I' => {
                config.irq = Some(number(&mut rest, 10).ok_or(ConfigError::BadIrq)?);
            }
            b'M' => {
                let bits = number(&mut rest, 10).ok_or(ConfigError::BadMonitor)?;
                let bits = u8::try_from(bits).map_err(|_| ConfigError::BadMonitor)?;
                config.monitor = Some(MonitorFlags::from_bits_truncate(bits));
            }
            _ => {}
        }
    }

    Ok(config)
}

fn skip_blanks(rest: &mut &[u8]) {
    while let Some((&b' ' | &b'\t', tail)) = rest.split_first() {
        *rest = tail;
    }
}

/// Read an unsigned number; it must start with a decimal digit
fn number(rest: &mut &[u8], radix: u32) -> Option<u32> {
    if !rest.first()?.is_ascii_digit() {
        return None;
    }
    let mut value: u32 = 0;
    while let Some(digit) = rest.first().and_then(|&b| (b as char).to_digit(radix)) {
        value = value.checked_mul(radix)?.checked_add(digit)?;
        *rest = &rest[1..];
    }
    Some(value)
}
