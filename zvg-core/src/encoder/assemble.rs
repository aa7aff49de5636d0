//! Instruction assembly
//!
//! Builds one complete instruction at a time so it can be appended to the
//! command buffer whole.

use heapless::Vec;
use zvg_protocol::command::bits;
use zvg_protocol::wire::{pack_color, pack_len12, pack_ratio_len12, pack_ratio_len8, pack_xy, ratio};
use zvg_protocol::MAX_COMMAND_SIZE;

use crate::buffer::BufferFull;
use crate::color::Color;
use crate::geometry::Point;

/// One encoded instruction
pub(crate) type Instruction = Vec<u8, MAX_COMMAND_SIZE>;

/// Direction, length and ratio of a relative move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Move {
    /// Command bits contributed by the move
    pub bits: u8,
    field: [u8; 3],
    field_len: usize,
}

impl Move {
    /// Classify a move of `dx`, `dy` (magnitudes) in the given directions
    ///
    /// 45 degree moves (including zero length) are checked first, then
    /// horizontal, vertical and finally ratio moves.
    pub fn classify(dx: u32, dy: u32, x_neg: bool, y_neg: bool) -> Self {
        let dir = (u8::from(x_neg) << 1) | u8::from(y_neg);

        if dx == dy {
            Self::length(dir, dx)
        } else if dy == 0 {
            Self::length(bits::HZVT | u8::from(x_neg), dx)
        } else if dx == 0 {
            Self::length(bits::HZVT | bits::VERT | u8::from(y_neg), dy)
        } else if dx > dy {
            Self::ratio(bits::RATIO | dir, dy, dx)
        } else {
            Self::ratio(bits::RATIO | bits::YLEN | dir, dx, dy)
        }
    }

    /// Length-only move: 8-bit below 256, else 12-bit
    fn length(dir_bits: u8, len: u32) -> Self {
        if len < 256 {
            Self {
                bits: dir_bits | bits::SHORT,
                field: [len as u8, 0, 0],
                field_len: 1,
            }
        } else {
            let [hi, lo] = pack_len12(len);
            Self {
                bits: dir_bits,
                field: [hi, lo, 0],
                field_len: 2,
            }
        }
    }

    /// Ratio move: 8-bit forms below 128, else 12-bit
    fn ratio(dir_bits: u8, minor: u32, major: u32) -> Self {
        let r = ratio(minor, major);
        if major < 128 {
            let [a, b] = pack_ratio_len8(r, major);
            Self {
                bits: dir_bits | bits::SHORT,
                field: [a, b, 0],
                field_len: 2,
            }
        } else {
            Self {
                bits: dir_bits,
                field: pack_ratio_len12(r, major),
                field_len: 3,
            }
        }
    }

    pub fn field(&self) -> &[u8] {
        &self.field[..self.field_len]
    }
}

/// Assemble `cmd`, then the optional color word, position and move field
pub(crate) fn assemble(
    cmd: u8,
    color: Option<Color>,
    position: Option<Point>,
    field: &[u8],
) -> Result<Instruction, BufferFull> {
    let mut out = Instruction::new();
    out.push(cmd).map_err(|_| BufferFull)?;
    if let Some(color) = color {
        out.extend_from_slice(&pack_color(color.raw()))
            .map_err(|_| BufferFull)?;
    }
    if let Some(position) = position {
        out.extend_from_slice(&pack_xy(position))
            .map_err(|_| BufferFull)?;
    }
    out.extend_from_slice(field).map_err(|_| BufferFull)?;
    Ok(out)
}
