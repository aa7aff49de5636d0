//! Hardware-independent core logic for the ZVG vector display driver
//!
//! This crate contains everything that does not touch the parallel port:
//!
//! - Geometry clipping (Liang-Barsky, Q16 fixed point)
//! - Color conversion to the device's 5/6/5 color word
//! - The vector command encoder and its spot-kill bookkeeping
//! - Link and session state machines
//! - Configuration types and the port configuration string parser
//! - The driver error taxonomy

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod color;
pub mod config;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod safety;
pub mod state;

pub use buffer::{BufferFull, CommandBuffer, COMMAND_BUFFER_SIZE};
pub use color::Color;
pub use encoder::Encoder;
pub use error::{Error, ErrorKind, Result};
pub use geometry::{Point, Segment, Window};
