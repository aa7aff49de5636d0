//! Bit-packed field helpers
//!
//! Positions, lengths and ratios are packed into nibble-interleaved byte
//! groups. Every field is built and taken apart with explicit shifts and
//! masks so the layout is identical on every target.
//!
//! ```text
//! position:   [ X[7:0] ] [ X[11:8] Y[11:8] ] [ Y[7:0] ]
//! len12:      [ 0000 L[11:8] ] [ L[7:0] ]
//! ratio+len8: [ R[15:8] ] [ L[7:0] ]
//! ratio+len12:[ R[15:8] ] [ R[7:4] L[11:8] ] [ L[7:0] ]
//! ```

/// A position in device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Beam center
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Largest value a 12-bit length field can carry
pub const MAX_LEN12: u32 = 0x0FFF;

/// Pack a color word, high byte first
pub fn pack_color(color: u16) -> [u8; 2] {
    [(color >> 8) as u8, color as u8]
}

pub fn unpack_color(bytes: [u8; 2]) -> u16 {
    u16::from(bytes[0]) << 8 | u16::from(bytes[1])
}

/// Pack an absolute position; only the low 12 bits of each axis are kept
pub fn pack_xy(point: Point) -> [u8; 3] {
    let (x, y) = (point.x, point.y);
    [
        x as u8,
        (((x >> 4) & 0xF0) | ((y >> 8) & 0x0F)) as u8,
        y as u8,
    ]
}

/// Unpack an absolute position, sign-extending each 12-bit axis
pub fn unpack_xy(bytes: [u8; 3]) -> Point {
    let x = u16::from(bytes[0]) | ((u16::from(bytes[1]) << 4) & 0x0F00);
    let y = ((u16::from(bytes[1]) << 8) & 0x0F00) | u16::from(bytes[2]);
    Point::new(sign_extend12(x), sign_extend12(y))
}

fn sign_extend12(value: u16) -> i32 {
    i32::from(((value << 4) as i16) >> 4)
}

/// Pack a 12-bit length
pub fn pack_len12(len: u32) -> [u8; 2] {
    [((len >> 8) & 0x0F) as u8, len as u8]
}

pub fn unpack_len12(bytes: [u8; 2]) -> u32 {
    (u32::from(bytes[0] & 0x0F) << 8) | u32::from(bytes[1])
}

/// Pack a ratio with an 8-bit length (top 8 ratio bits kept)
pub fn pack_ratio_len8(ratio: u16, len: u32) -> [u8; 2] {
    [(ratio >> 8) as u8, len as u8]
}

pub fn unpack_ratio_len8(bytes: [u8; 2]) -> (u16, u32) {
    (u16::from(bytes[0]) << 8, u32::from(bytes[1]))
}

/// Pack a ratio with a 12-bit length (top 12 ratio bits kept)
pub fn pack_ratio_len12(ratio: u16, len: u32) -> [u8; 3] {
    [
        (ratio >> 8) as u8,
        ((ratio as u8) & 0xF0) | ((len >> 8) & 0x0F) as u8,
        len as u8,
    ]
}

pub fn unpack_ratio_len12(bytes: [u8; 3]) -> (u16, u32) {
    let ratio = (u16::from(bytes[0]) << 8) | u16::from(bytes[1] & 0xF0);
    let len = (u32::from(bytes[1] & 0x0F) << 8) | u32::from(bytes[2]);
    (ratio, len)
}

/// Q16 ratio of `minor` to `major` (`minor < major`)
pub fn ratio(minor: u32, major: u32) -> u16 {
    ((minor << 16) / major) as u16
}

/// Minor-axis length the firmware reconstructs from a major length and ratio
pub fn minor_len(major: u32, ratio: u16) -> u32 {
    (major * u32::from(ratio) + 0x8000) >> 16
}
