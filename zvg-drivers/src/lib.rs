//! Hardware-facing drivers for the ZVG vector generator
//!
//! Everything here talks to hardware only through the `zvg-hal` traits:
//!
//! - [`parport`] - IEEE-1284 ECP/nibble/SPP transport and port detection
//! - [`isa_dma`] - ISA 8237 block-transfer engine
//! - [`ring`] - double-buffered frame submission
//! - [`session`] - open/draw/send/close lifecycle for one board
//! - [`worker`] - buffer handoff for running the transmitter on its own task
//!
//! Diagnostics go through the `log` facade; nothing is printed unless the
//! application installs a logger.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod isa_dma;
pub mod parport;
pub mod ring;
pub mod session;
pub mod worker;

#[cfg(test)]
mod sim;

pub use isa_dma::Dma8237;
pub use parport::{EcpTransport, NoEngine, ParallelLink};
pub use ring::{BufferId, DmaBufferRing, Transmit};
pub use session::DeviceSession;
pub use worker::{run_transmitter, FrameHandoff, FrameSubmitter};
