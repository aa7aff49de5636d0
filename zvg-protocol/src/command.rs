//! Command byte layout and extended commands

/// Color the firmware uses after power-on and after [`ExtendedCommand::Center`]
pub const DEFAULT_COLOR: u16 = 0x7BEF;

/// Largest encoded instruction: command, color (2), position (3), ratio/length (3)
pub const MAX_COMMAND_SIZE: usize = 9;

/// No-ops appended after the final center so the last real commands execute
pub const FLUSH_NOPS: usize = MAX_COMMAND_SIZE - 1;

/// Command byte bits
pub mod bits {
    /// Horizontal or vertical line (without [`RATIO`])
    pub const HZVT: u8 = 0x04;
    /// The [`HZVT`] line is vertical
    pub const VERT: u8 = 0x02;
    /// Y is the major axis (with [`RATIO`])
    pub const YLEN: u8 = 0x04;
    /// A Q16 minor/major ratio follows the length
    pub const RATIO: u8 = 0x08;
    /// Draw a vector rather than a point
    pub const VECTOR: u8 = 0x10;
    /// 8-bit length (and 8-bit ratio) instead of 12-bit
    pub const SHORT: u8 = 0x20;
    /// A color word follows the command byte
    pub const COLOR: u8 = 0x40;
    /// A packed absolute start position follows
    pub const ABS: u8 = 0x80;

    /// X moves right to left (diagonal and ratio forms)
    pub const X_NEG: u8 = 0x02;
    /// Y moves downward (diagonal and ratio forms)
    pub const Y_NEG: u8 = 0x01;
    /// Sign bit of an [`HZVT`] line
    pub const HV_NEG: u8 = 0x01;

    /// Mask and pattern identifying the extended command space
    pub const EXTENDED_MASK: u8 = 0xB0;
    pub const EXTENDED_PATTERN: u8 = 0xA0;
}

/// Returns true if `byte` falls in the extended command space
///
/// Only `0xE0..=0xEF` is assigned; `0xA0..=0xAF` is reserved.
pub fn is_extended(byte: u8) -> bool {
    byte & bits::EXTENDED_MASK == bits::EXTENDED_PATTERN
}

/// Monitor calibration parameters settable over the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationParam {
    ZShift,
    Overshoot,
    JumpFactor,
    Settle,
    PointIntensity,
    MinIntensity,
    MaxIntensity,
    Scale,
}

impl CalibrationParam {
    /// All parameters in command order
    pub const ALL: [CalibrationParam; 8] = [
        CalibrationParam::ZShift,
        CalibrationParam::Overshoot,
        CalibrationParam::JumpFactor,
        CalibrationParam::Settle,
        CalibrationParam::PointIntensity,
        CalibrationParam::MinIntensity,
        CalibrationParam::MaxIntensity,
        CalibrationParam::Scale,
    ];

    /// The extended command that sets this parameter
    pub fn command(self) -> ExtendedCommand {
        match self {
            CalibrationParam::ZShift => ExtendedCommand::ZShift,
            CalibrationParam::Overshoot => ExtendedCommand::Overshoot,
            CalibrationParam::JumpFactor => ExtendedCommand::Jump,
            CalibrationParam::Settle => ExtendedCommand::Settle,
            CalibrationParam::PointIntensity => ExtendedCommand::PointIntensity,
            CalibrationParam::MinIntensity => ExtendedCommand::MinIntensity,
            CalibrationParam::MaxIntensity => ExtendedCommand::MaxIntensity,
            CalibrationParam::Scale => ExtendedCommand::Scale,
        }
    }
}

/// Extended (non-drawing) commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtendedCommand {
    /// Do nothing
    Nop,
    /// Blink the board LED
    Blink,
    ZShift,
    Overshoot,
    Jump,
    Settle,
    PointIntensity,
    MinIntensity,
    MaxIntensity,
    Scale,
    /// Save current calibration to EEPROM
    SaveEeprom,
    /// Restore calibration from EEPROM
    LoadEeprom,
    /// Send the monitor calibration block to the host
    ReadMonitor,
    /// Reset calibration to factory defaults
    ResetMonitor,
    /// Send the speed table to the host
    ReadSpeed,
    /// Center the beam and restore the default color
    Center,
}

// Wire format values
const EXT_NOP: u8 = 0xE0;
const EXT_BLINK: u8 = 0xE1;
const EXT_ZSHIFT: u8 = 0xE2;
const EXT_OSHOOT: u8 = 0xE3;
const EXT_JUMP: u8 = 0xE4;
const EXT_SETTLE: u8 = 0xE5;
const EXT_POINT_I: u8 = 0xE6;
const EXT_MIN_I: u8 = 0xE7;
const EXT_MAX_I: u8 = 0xE8;
const EXT_SCALE: u8 = 0xE9;
const EXT_SAVE_EE: u8 = 0xEA;
const EXT_LOAD_EE: u8 = 0xEB;
const EXT_READ_MON: u8 = 0xEC;
const EXT_RESET_MON: u8 = 0xED;
const EXT_READ_SPD: u8 = 0xEE;
const EXT_CENTER: u8 = 0xEF;

impl ExtendedCommand {
    /// Parse an extended command from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            EXT_NOP => Some(ExtendedCommand::Nop),
            EXT_BLINK => Some(ExtendedCommand::Blink),
            EXT_ZSHIFT => Some(ExtendedCommand::ZShift),
            EXT_OSHOOT => Some(ExtendedCommand::Overshoot),
            EXT_JUMP => Some(ExtendedCommand::Jump),
            EXT_SETTLE => Some(ExtendedCommand::Settle),
            EXT_POINT_I => Some(ExtendedCommand::PointIntensity),
            EXT_MIN_I => Some(ExtendedCommand::MinIntensity),
            EXT_MAX_I => Some(ExtendedCommand::MaxIntensity),
            EXT_SCALE => Some(ExtendedCommand::Scale),
            EXT_SAVE_EE => Some(ExtendedCommand::SaveEeprom),
            EXT_LOAD_EE => Some(ExtendedCommand::LoadEeprom),
            EXT_READ_MON => Some(ExtendedCommand::ReadMonitor),
            EXT_RESET_MON => Some(ExtendedCommand::ResetMonitor),
            EXT_READ_SPD => Some(ExtendedCommand::ReadSpeed),
            EXT_CENTER => Some(ExtendedCommand::Center),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            ExtendedCommand::Nop => EXT_NOP,
            ExtendedCommand::Blink => EXT_BLINK,
            ExtendedCommand::ZShift => EXT_ZSHIFT,
            ExtendedCommand::Overshoot => EXT_OSHOOT,
            ExtendedCommand::Jump => EXT_JUMP,
            ExtendedCommand::Settle => EXT_SETTLE,
            ExtendedCommand::PointIntensity => EXT_POINT_I,
            ExtendedCommand::MinIntensity => EXT_MIN_I,
            ExtendedCommand::MaxIntensity => EXT_MAX_I,
            ExtendedCommand::Scale => EXT_SCALE,
            ExtendedCommand::SaveEeprom => EXT_SAVE_EE,
            ExtendedCommand::LoadEeprom => EXT_LOAD_EE,
            ExtendedCommand::ReadMonitor => EXT_READ_MON,
            ExtendedCommand::ResetMonitor => EXT_RESET_MON,
            ExtendedCommand::ReadSpeed => EXT_READ_SPD,
            ExtendedCommand::Center => EXT_CENTER,
        }
    }

    /// Calibration parameter set by this command, if any
    pub fn calibration_param(self) -> Option<CalibrationParam> {
        CalibrationParam::ALL
            .iter()
            .copied()
            .find(|param| param.command() == self)
    }

    /// Number of argument bytes following the command byte
    pub fn arg_len(self) -> usize {
        if self.calibration_param().is_some() {
            1
        } else {
            0
        }
    }
}
