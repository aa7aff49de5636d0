//! Parallel port link to the ZVG
//!
//! [`EcpTransport`] speaks IEEE-1284 on the port registers. [`ParallelLink`]
//! pairs it with an optional block-transfer engine and picks block or
//! polled transfer for each send.

pub mod regs;
pub mod transport;

pub use transport::EcpTransport;

use log::debug;
use zvg_core::{Error, Result};
use zvg_hal::{BlockTransfer, Clock, PortIo};

use crate::ring::Transmit;

/// Engine type for links that always send polled
#[derive(Debug)]
pub enum NoEngine {}

impl BlockTransfer for NoEngine {
    type Error = Error;

    fn start(&mut self, _data: &[u8]) -> Result<()> {
        match *self {}
    }

    fn abort(&mut self) {
        match *self {}
    }
}

/// ECP transport plus optional block-transfer engine
pub struct ParallelLink<P, C, B> {
    pub transport: EcpTransport<P, C>,
    engine: Option<B>,
}

impl<P, C, B> ParallelLink<P, C, B>
where
    P: PortIo,
    C: Clock,
    B: BlockTransfer,
    Error: From<B::Error>,
{
    pub fn new(transport: EcpTransport<P, C>, engine: Option<B>) -> Self {
        if engine.is_none() {
            debug!("no block-transfer engine, sending polled");
        }
        Self { transport, engine }
    }

    pub fn uses_block_transfer(&self) -> bool {
        self.engine.is_some()
    }

    /// Returns true while a block transfer is running
    pub fn transfer_active(&mut self) -> bool {
        match self.engine.as_mut() {
            Some(engine) => self.transport.block_busy(engine),
            None => false,
        }
    }

    /// Wait for the running block transfer, if any
    pub fn wait_transfer_complete(&mut self) -> Result<()> {
        match self.engine.as_mut() {
            Some(engine) => self.transport.wait_block(engine),
            None => Ok(()),
        }
    }

    /// Stop the block-transfer engine
    pub fn abort(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            self.transport.abort_block(engine);
        }
    }

    pub fn into_parts(self) -> (EcpTransport<P, C>, Option<B>) {
        (self.transport, self.engine)
    }
}

impl<P, C, B> Transmit for ParallelLink<P, C, B>
where
    P: PortIo,
    C: Clock,
    B: BlockTransfer,
    Error: From<B::Error>,
{
    /// Start a block transfer, or send every byte polled without an engine
    fn transmit(&mut self, data: &[u8]) -> Result<()> {
        match self.engine.as_mut() {
            Some(engine) => self.transport.start_block(engine, data),
            None => self.transport.send_polled(data),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.wait_transfer_complete()
    }
}
