//! ZVG Hardware Abstraction Layer
//!
//! This crate defines the narrow hardware capabilities the ZVG driver
//! consumes. The transport and session logic only ever touch hardware
//! through these traits, so the same code runs against a real parallel
//! port or against a simulated device in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  zvg-drivers (transport, ring, session) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  zvg-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ platform port │       │   simulated   │
//! │   I/O + DMA   │       │    device     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`port::PortIo`] - Byte-wide I/O port access
//! - [`dma::BlockTransfer`] - Block-transfer engine start/abort
//! - [`dma::DmaMemory`] - Transfer-safe staging memory
//! - [`clock::Clock`] - Monotonic millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod dma;
pub mod port;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use dma::{BlockTransfer, DmaMemory, PhysicalAddress};
pub use port::PortIo;
