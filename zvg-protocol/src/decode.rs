//! Command stream disassembler
//!
//! [`Decoder`] walks an encoded stream one instruction at a time while
//! mirroring the beam position and resident color the firmware would hold,
//! so relative instructions come back as absolute endpoints.
//!
//! Minor-axis lengths of ratio instructions are rebuilt exactly as the
//! firmware does: `(len * ratio + 0x8000) >> 16`.

use crate::command::{bits, is_extended, CalibrationParam, ExtendedCommand, DEFAULT_COLOR};
use crate::wire::{
    minor_len, unpack_color, unpack_len12, unpack_ratio_len12, unpack_ratio_len8, unpack_xy, Point,
};

/// Decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Input ended inside an instruction
    Truncated,
    /// Command byte in the reserved space
    Reserved(u8),
}

/// One decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    /// Line from `start` to `end`
    Vector { start: Point, end: Point, color: u16 },
    /// Single point
    Point { at: Point, color: u16 },
    /// Beam centered, color reset to default
    Center,
    Nop,
    /// Calibration parameter write
    Calibration { param: CalibrationParam, value: u8 },
    /// Any other extended command
    Control(ExtendedCommand),
}

impl Instruction {
    /// Returns true if this instruction lights the beam
    pub fn is_drawing(&self) -> bool {
        matches!(self, Instruction::Vector { .. } | Instruction::Point { .. })
    }
}

/// Byte cursor over the input
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let chunk = self.bytes.get(self.pos..end).ok_or(DecodeError::Truncated)?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        self.pos = end;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        let [b] = self.take::<1>()?;
        Ok(b)
    }
}

/// Stateful disassembler
#[derive(Debug, Clone)]
pub struct Decoder {
    position: Point,
    color: u16,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder in the power-on state (centered, default color)
    pub fn new() -> Self {
        Self {
            position: Point::ORIGIN,
            color: DEFAULT_COLOR,
        }
    }

    /// Current beam position
    pub fn position(&self) -> Point {
        self.position
    }

    /// Current resident color
    pub fn color(&self) -> u16 {
        self.color
    }

    /// Decode the instruction at the start of `input`
    ///
    /// Returns the instruction and the number of bytes it occupied. On
    /// error the mirrored beam state is left untouched.
    pub fn decode(&mut self, input: &[u8]) -> Result<(Instruction, usize), DecodeError> {
        let mut cursor = Cursor::new(input);
        let cmd = cursor.byte()?;

        if is_extended(cmd) {
            let instruction = self.decode_extended(cmd, &mut cursor)?;
            return Ok((instruction, cursor.pos));
        }

        let color = if cmd & bits::COLOR != 0 {
            unpack_color(cursor.take()?)
        } else {
            self.color
        };

        // Absolute point: position only, no length
        if cmd & (bits::VECTOR | bits::ABS) == bits::ABS {
            if cmd & 0x0F != 0 {
                return Err(DecodeError::Reserved(cmd));
            }
            let at = unpack_xy(cursor.take()?);
            self.position = at;
            self.color = color;
            return Ok((Instruction::Point { at, color }, cursor.pos));
        }

        let start = if cmd & bits::ABS != 0 {
            unpack_xy(cursor.take()?)
        } else {
            self.position
        };
        let (dx, dy) = displacement(cmd, &mut cursor)?;
        let end = Point::new(start.x + dx, start.y + dy);

        self.position = end;
        self.color = color;

        let instruction = if cmd & bits::VECTOR != 0 {
            Instruction::Vector { start, end, color }
        } else {
            Instruction::Point { at: end, color }
        };
        Ok((instruction, cursor.pos))
    }

    fn decode_extended(
        &mut self,
        cmd: u8,
        cursor: &mut Cursor<'_>,
    ) -> Result<Instruction, DecodeError> {
        let ext = ExtendedCommand::from_byte(cmd).ok_or(DecodeError::Reserved(cmd))?;
        let instruction = match ext {
            ExtendedCommand::Nop => Instruction::Nop,
            ExtendedCommand::Center => {
                self.position = Point::ORIGIN;
                self.color = DEFAULT_COLOR;
                Instruction::Center
            }
            other => match other.calibration_param() {
                Some(param) => Instruction::Calibration {
                    param,
                    value: cursor.byte()?,
                },
                None => Instruction::Control(other),
            },
        };
        Ok(instruction)
    }

    /// Iterate over every instruction in `input`
    ///
    /// The iterator stops after the first error.
    pub fn instructions<'a>(&'a mut self, input: &'a [u8]) -> Instructions<'a> {
        Instructions {
            decoder: self,
            input,
        }
    }
}

/// Signed (dx, dy) of a relative vector or point
fn displacement(cmd: u8, cursor: &mut Cursor<'_>) -> Result<(i32, i32), DecodeError> {
    let short = cmd & bits::SHORT != 0;

    if cmd & bits::RATIO != 0 {
        let (ratio, major) = if short {
            unpack_ratio_len8(cursor.take()?)
        } else {
            unpack_ratio_len12(cursor.take()?)
        };
        let minor = minor_len(major, ratio) as i32;
        let major = major as i32;
        let (x, y) = if cmd & bits::YLEN != 0 {
            (minor, major)
        } else {
            (major, minor)
        };
        return Ok((
            signed(x, cmd & bits::X_NEG != 0),
            signed(y, cmd & bits::Y_NEG != 0),
        ));
    }

    let len = if short {
        u32::from(cursor.byte()?)
    } else {
        unpack_len12(cursor.take()?)
    } as i32;

    if cmd & bits::HZVT != 0 {
        let d = signed(len, cmd & bits::HV_NEG != 0);
        if cmd & bits::VERT != 0 {
            Ok((0, d))
        } else {
            Ok((d, 0))
        }
    } else {
        Ok((
            signed(len, cmd & bits::X_NEG != 0),
            signed(len, cmd & bits::Y_NEG != 0),
        ))
    }
}

fn signed(len: i32, negative: bool) -> i32 {
    if negative {
        -len
    } else {
        len
    }
}

/// Iterator returned by [`Decoder::instructions`]
pub struct Instructions<'a> {
    decoder: &'a mut Decoder,
    input: &'a [u8],
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.input.is_empty() {
            return None;
        }
        match self.decoder.decode(self.input) {
            Ok((instruction, used)) => {
                self.input = &self.input[used..];
                Some(Ok(instruction))
            }
            Err(e) => {
                self.input = &[];
                Some(Err(e))
            }
        }
    }
}
