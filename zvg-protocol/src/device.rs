//! Device read-back payloads
//!
//! The board answers three queries over the reverse (nibble) channel:
//!
//! - the IEEE-1284 device ID, an ASCII record of `;\r\n` terminated fields
//!   `MFG:`, `CMD:`, `MDL:`, `VER:ffff,bbbb,vvvv`, `SWS:ss`, `ESB:ffff,vvvv`
//! - the monitor calibration block (11 bytes)
//! - the speed table (4 bytes, one per speed jumper setting)

use heapless::String;

use crate::command::CalibrationParam;

/// Longest text field kept from the device ID record
pub const MAX_ID_FIELD: usize = 16;

/// Size of the packed monitor calibration block
pub const MONITOR_INFO_SIZE: usize = 11;

/// Size of the speed table
pub const SPEED_TABLE_SIZE: usize = 4;

/// Payload parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Device ID record does not match the expected layout
    UnknownId,
    /// Binary payload has the wrong size
    BadLength { expected: usize, actual: usize },
}

/// Parsed device identification record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId {
    /// Manufacturer
    pub mfg: String<MAX_ID_FIELD>,
    /// Command set
    pub cmd: String<MAX_ID_FIELD>,
    /// Model
    pub mdl: String<MAX_ID_FIELD>,
    /// Firmware version
    pub firmware_version: u16,
    /// Boot loader version
    pub bootloader_version: u16,
    /// Vector timing generator version
    pub vtg_version: u16,
    /// Switch settings
    pub switches: u8,
    /// Firmware error status bits
    pub firmware_esb: u16,
    /// VTG error status bits
    pub vtg_esb: u16,
}

impl DeviceId {
    /// Parse the ASCII device ID record (without its length prefix)
    pub fn parse(bytes: &[u8]) -> Result<Self, PayloadError> {
        let mut r = IdReader { rest: bytes };

        r.tag(b"MFG:")?;
        let mfg = r.text()?;
        r.tag(b"CMD:")?;
        let cmd = r.text()?;
        r.tag(b"MDL:")?;
        let mdl = r.text()?;

        r.tag(b"VER:")?;
        let firmware_version = r.hex(4)? as u16;
        r.expect(b',')?;
        let bootloader_version = r.hex(4)? as u16;
        r.expect(b',')?;
        let vtg_version = r.hex(4)? as u16;
        r.end_field()?;

        r.tag(b"SWS:")?;
        let switches = r.hex(2)? as u8;
        r.end_field()?;

        r.tag(b"ESB:")?;
        let firmware_esb = r.hex(4)? as u16;
        r.expect(b',')?;
        let vtg_esb = r.hex(4)? as u16;
        r.expect(b';')?;

        Ok(Self {
            mfg,
            cmd,
            mdl,
            firmware_version,
            bootloader_version,
            vtg_version,
            switches,
            firmware_esb,
            vtg_esb,
        })
    }
}

struct IdReader<'a> {
    rest: &'a [u8],
}

impl<'a> IdReader<'a> {
    fn tag(&mut self, tag: &[u8]) -> Result<(), PayloadError> {
        self.rest = self
            .rest
            .strip_prefix(tag)
            .ok_or(PayloadError::UnknownId)?;
        Ok(())
    }

    fn expect(&mut self, byte: u8) -> Result<(), PayloadError> {
        self.tag(&[byte])
    }

    /// Skip `;` and the CR/LF pair after it
    fn end_field(&mut self) -> Result<(), PayloadError> {
        self.expect(b';')?;
        let skip = self.rest.len().min(2);
        self.rest = &self.rest[skip..];
        Ok(())
    }

    fn text(&mut self) -> Result<String<MAX_ID_FIELD>, PayloadError> {
        let end = self
            .rest
            .iter()
            .position(|&b| b == b';')
            .ok_or(PayloadError::UnknownId)?;
        let field = core::str::from_utf8(&self.rest[..end]).map_err(|_| PayloadError::UnknownId)?;
        let mut out = String::new();
        out.push_str(field).map_err(|_| PayloadError::UnknownId)?;
        self.rest = &self.rest[end..];
        self.end_field()?;
        Ok(out)
    }

    fn hex(&mut self, digits: usize) -> Result<u32, PayloadError> {
        let field = self.rest.get(..digits).ok_or(PayloadError::UnknownId)?;
        let mut value = 0u32;
        for &b in field {
            let nibble = (b as char).to_digit(16).ok_or(PayloadError::UnknownId)?;
            value = (value << 4) | nibble;
        }
        self.rest = &self.rest[digits..];
        Ok(value)
    }
}

/// Monitor calibration block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitorInfo {
    pub point_intensity: u8,
    pub z_shift: u8,
    pub overshoot: u8,
    pub jump_factor: u8,
    pub settle: u8,
    pub min_intensity: u8,
    pub max_intensity: u8,
    pub scale: u8,
    /// Status flags
    pub flags: u8,
    /// Check digits over the block, computed by the firmware
    pub checksum: u16,
}

impl MonitorInfo {
    /// Parse the packed 11-byte block
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let b: &[u8; MONITOR_INFO_SIZE] =
            bytes.try_into().map_err(|_| PayloadError::BadLength {
                expected: MONITOR_INFO_SIZE,
                actual: bytes.len(),
            })?;

        Ok(Self {
            point_intensity: b[0],
            z_shift: b[1],
            overshoot: b[2],
            jump_factor: b[3],
            settle: b[4],
            min_intensity: b[5],
            max_intensity: b[6],
            scale: b[7],
            flags: b[8],
            // Word data is sent low byte first
            checksum: u16::from(b[9]) | (u16::from(b[10]) << 8),
        })
    }

    /// Current value of a calibration parameter
    pub fn get(&self, param: CalibrationParam) -> u8 {
        match param {
            CalibrationParam::ZShift => self.z_shift,
            CalibrationParam::Overshoot => self.overshoot,
            CalibrationParam::JumpFactor => self.jump_factor,
            CalibrationParam::Settle => self.settle,
            CalibrationParam::PointIntensity => self.point_intensity,
            CalibrationParam::MinIntensity => self.min_intensity,
            CalibrationParam::MaxIntensity => self.max_intensity,
            CalibrationParam::Scale => self.scale,
        }
    }

    /// Update a calibration parameter
    pub fn set(&mut self, param: CalibrationParam, value: u8) {
        match param {
            CalibrationParam::ZShift => self.z_shift = value,
            CalibrationParam::Overshoot => self.overshoot = value,
            CalibrationParam::JumpFactor => self.jump_factor = value,
            CalibrationParam::Settle => self.settle = value,
            CalibrationParam::PointIntensity => self.point_intensity = value,
            CalibrationParam::MinIntensity => self.min_intensity = value,
            CalibrationParam::MaxIntensity => self.max_intensity = value,
            CalibrationParam::Scale => self.scale = value,
        }
    }
}

/// Drawing speed per speed-jumper setting, fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedTable(pub [u8; SPEED_TABLE_SIZE]);

impl SpeedTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let table: [u8; SPEED_TABLE_SIZE] =
            bytes.try_into().map_err(|_| PayloadError::BadLength {
                expected: SPEED_TABLE_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(table))
    }

    /// Speed for jumper setting `index` (0..4)
    pub fn speed(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }
}
