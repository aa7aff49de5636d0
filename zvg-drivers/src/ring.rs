//! Double-buffered frame submission
//!
//! One buffer is filled by the encoder while the other is (or was last)
//! on the wire. Sending swaps the two, so the previous frame stays
//! available for a resend until the next swap.

use log::trace;
use zvg_core::{BufferFull, CommandBuffer, Result};

/// Something that can put a command block on the wire
pub trait Transmit {
    /// Send `data`
    ///
    /// Returns once every byte is accepted, or once a block transfer of
    /// `data` has been started.
    fn transmit(&mut self, data: &[u8]) -> Result<()>;

    /// Wait until nothing is in flight
    fn flush(&mut self) -> Result<()>;
}

/// Identifies one buffer of a [`DmaBufferRing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferId(u8);

impl BufferId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    fn other(self) -> Self {
        Self(self.0 ^ 1)
    }
}

/// Pair of command buffers with a current (filling) side
pub struct DmaBufferRing {
    buffers: [CommandBuffer; 2],
    current: BufferId,
}

impl DmaBufferRing {
    /// Create a ring whose buffers accept `limit` bytes each
    pub fn new(limit: usize) -> Self {
        Self {
            buffers: [
                CommandBuffer::with_limit(limit),
                CommandBuffer::with_limit(limit),
            ],
            current: BufferId(0),
        }
    }

    pub fn current_id(&self) -> BufferId {
        self.current
    }

    /// Buffer being filled
    pub fn current(&self) -> &CommandBuffer {
        &self.buffers[self.current.index()]
    }

    pub fn current_mut(&mut self) -> &mut CommandBuffer {
        &mut self.buffers[self.current.index()]
    }

    /// Buffer sent last
    pub fn previous(&self) -> &CommandBuffer {
        &self.buffers[self.current.other().index()]
    }

    /// Empty both buffers
    pub fn clear(&mut self) {
        self.buffers.iter_mut().for_each(CommandBuffer::clear);
    }

    /// Make the other buffer current and empty it, without sending
    pub fn swap(&mut self) {
        self.current = self.current.other();
        self.current_mut().clear();
    }

    /// Stage one raw byte in the current buffer
    pub fn put_byte(&mut self, byte: u8) -> core::result::Result<(), BufferFull> {
        self.current_mut().push(byte)
    }

    /// Stage as much of `data` as fits, returning the number of bytes taken
    ///
    /// Fails only if the buffer is already full.
    pub fn put_slice(&mut self, data: &[u8]) -> core::result::Result<usize, BufferFull> {
        let buf = self.current_mut();
        if buf.remaining() == 0 && !data.is_empty() {
            return Err(BufferFull);
        }
        Ok(buf.push_truncated(data))
    }

    /// Send the current buffer without swapping
    pub fn send_current<T: Transmit>(&mut self, link: &mut T) -> Result<()> {
        link.transmit(self.current().as_slice())
    }

    /// Resend the buffer sent by the last swap
    ///
    /// Does nothing before the first swap.
    pub fn send_previous<T: Transmit>(&mut self, link: &mut T) -> Result<()> {
        let previous = self.previous();
        if previous.is_empty() {
            return Ok(());
        }
        trace!("resending {} bytes", previous.len());
        link.transmit(previous.as_slice())
    }

    /// Send the current buffer and make the other one current
    ///
    /// On success returns the id of the buffer sent, which stays available
    /// to [`send_previous`](Self::send_previous). The new current buffer
    /// starts empty. On failure nothing changes and the unsent frame stays
    /// current, ready to be sent again.
    pub fn swap_and_send<T: Transmit>(&mut self, link: &mut T) -> Result<BufferId> {
        let sent = self.current;
        link.transmit(self.current().as_slice())?;
        trace!("sent {} bytes from buffer {}", self.current().len(), sent.index());
        self.current = sent.other();
        self.current_mut().clear();
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingLink;
    use zvg_core::Error;

    #[test]
    fn test_swap_and_send() {
        let mut ring = DmaBufferRing::new(64);
        let mut link = RecordingLink::default();

        ring.put_slice(&[1, 2, 3]).unwrap();
        let sent = ring.swap_and_send(&mut link).unwrap();
        assert_eq!(sent.index(), 0);
        assert_eq!(ring.current_id().index(), 1);
        assert!(ring.current().is_empty());
        assert_eq!(ring.previous().as_slice(), &[1, 2, 3]);
        assert_eq!(link.sent, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_resend_previous() {
        let mut ring = DmaBufferRing::new(64);
        let mut link = RecordingLink::default();

        // Nothing sent yet
        ring.send_previous(&mut link).unwrap();
        assert!(link.sent.is_empty());

        ring.put_byte(7).unwrap();
        ring.swap_and_send(&mut link).unwrap();
        ring.put_byte(8).unwrap();
        ring.send_previous(&mut link).unwrap();
        assert_eq!(link.sent, vec![vec![7], vec![7]]);

        // The next swap replaces what can be resent
        ring.swap_and_send(&mut link).unwrap();
        ring.send_previous(&mut link).unwrap();
        assert_eq!(link.sent.last().unwrap(), &vec![8]);
    }

    #[test]
    fn test_failed_send_keeps_frame() {
        let mut ring = DmaBufferRing::new(64);
        let mut link = RecordingLink {
            fail_with: Some(Error::Timeout),
            ..Default::default()
        };

        ring.put_slice(&[1, 2]).unwrap();
        assert_eq!(ring.swap_and_send(&mut link), Err(Error::Timeout));
        assert_eq!(ring.current_id().index(), 0);
        assert_eq!(ring.current().as_slice(), &[1, 2]);

        // Retry sends the same frame
        link.fail_with = None;
        assert_eq!(ring.swap_and_send(&mut link).unwrap().index(), 0);
        assert_eq!(link.sent, vec![vec![1, 2]]);
        assert!(ring.current().is_empty());
        assert_eq!(ring.previous().as_slice(), &[1, 2]);
    }

    #[test]
    fn test_put_slice_truncates() {
        let mut ring = DmaBufferRing::new(4);
        assert_eq!(ring.put_slice(&[0xE0; 6]), Ok(4));
        assert_eq!(ring.put_slice(&[0xE0]), Err(BufferFull));
        assert_eq!(ring.put_slice(&[]), Ok(0));
        assert_eq!(ring.put_byte(0xE0), Err(BufferFull));
    }

    #[test]
    fn test_send_current_and_swap() {
        let mut ring = DmaBufferRing::new(16);
        let mut link = RecordingLink::default();

        ring.put_byte(1).unwrap();
        ring.send_current(&mut link).unwrap();
        assert_eq!(ring.current().as_slice(), &[1]);

        ring.swap();
        assert_eq!(ring.current_id().index(), 1);
        ring.put_byte(2).unwrap();
        ring.swap();
        // Swapping back empties the buffer that becomes current
        assert!(ring.current().is_empty());
        assert_eq!(ring.previous().as_slice(), &[2]);

        ring.clear();
        assert!(ring.previous().is_empty());
    }
}
