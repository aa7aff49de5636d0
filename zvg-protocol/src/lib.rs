//! ZVG Vector Command Protocol
//!
//! This crate defines the byte stream the ZVG board executes. Every
//! instruction starts with one command byte whose bits select what follows:
//!
//! ```text
//! ┌─────┬───────┬───────┬────────┬───────┬──────────────────────┐
//! │ ABS │ COLOR │ SHORT │ VECTOR │ RATIO │ HZVT/YLEN │ dir bits │
//! │ 0x80│ 0x40  │ 0x20  │ 0x10   │ 0x08  │ 0x04      │ 0x03     │
//! └─────┴───────┴───────┴────────┴───────┴──────────────────────┘
//! ```
//!
//! followed, in order, by an optional big-endian color word, an optional
//! packed 12-bit X/Y position, and a length (8 or 12 bits) with an optional
//! Q16 ratio. Command bytes in the `0xE0..=0xEF` range are extended
//! commands (no-op, center beam, calibration setters and read-backs).
//!
//! The board does not execute anything until [`MAX_COMMAND_SIZE`] bytes
//! are queued, so a frame always ends with [`FLUSH_NOPS`] no-ops.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod decode;
pub mod device;
pub mod wire;

pub use command::{CalibrationParam, ExtendedCommand, DEFAULT_COLOR, FLUSH_NOPS, MAX_COMMAND_SIZE};
pub use decode::{DecodeError, Decoder, Instruction};
pub use device::{DeviceId, MonitorInfo, PayloadError, SpeedTable};
pub use wire::Point;
