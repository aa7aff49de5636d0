//! Threaded frame submission
//!
//! Runs the transmit side on its own task. The two command buffers are
//! passed back and forth through channels, so exactly one side owns each
//! buffer at any time:
//!
//! ```text
//!   encoder task                       transmit task
//!   ┌──────────────┐    filled     ┌────────────────────┐
//!   │FrameSubmitter│──────────────►│ run_transmitter    │
//!   │              │◄──────────────│ (transmit, clear)  │
//!   └──────────────┘    empty      └────────────────────┘
//! ```

use core::mem;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use log::warn;
use zvg_core::{CommandBuffer, Result};

use crate::ring::Transmit;

/// Buffer exchange between the encoder and transmit tasks
pub struct FrameHandoff<M: RawMutex> {
    filled: Channel<M, CommandBuffer, 1>,
    empty: Channel<M, CommandBuffer, 2>,
}

impl<M: RawMutex> Default for FrameHandoff<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> FrameHandoff<M> {
    pub const fn new() -> Self {
        Self {
            filled: Channel::new(),
            empty: Channel::new(),
        }
    }

    /// Encoder-side handle starting with `first` current and `spare`
    /// waiting to be swapped in
    pub async fn submitter(
        &self,
        first: CommandBuffer,
        spare: CommandBuffer,
    ) -> FrameSubmitter<'_, M> {
        self.empty.send(spare).await;
        FrameSubmitter {
            handoff: self,
            current: first,
        }
    }

    /// Transmit the next submitted frame and hand its buffer back
    ///
    /// The buffer is returned even when transmission fails.
    pub async fn transmit_next<T: Transmit>(&self, link: &mut T) -> Result<usize> {
        let mut buf = self.filled.receive().await;
        let len = buf.len();
        let result = link.transmit(buf.as_slice()).and_then(|()| link.flush());
        buf.clear();
        self.empty.send(buf).await;
        result.map(|()| len)
    }
}

/// Transmit task body: send every submitted frame, forever
pub async fn run_transmitter<M: RawMutex, T: Transmit>(handoff: &FrameHandoff<M>, link: &mut T) {
    loop {
        if let Err(e) = handoff.transmit_next(link).await {
            warn!("frame transmit failed: {:?}", e);
        }
    }
}

/// Encoder-side owner of the buffer being filled
pub struct FrameSubmitter<'a, M: RawMutex> {
    handoff: &'a FrameHandoff<M>,
    current: CommandBuffer,
}

impl<M: RawMutex> FrameSubmitter<'_, M> {
    pub fn current(&self) -> &CommandBuffer {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut CommandBuffer {
        &mut self.current
    }

    /// Hand the filled buffer to the transmit task
    ///
    /// Waits until an emptied buffer is available to fill next.
    pub async fn submit(&mut self) {
        let spare = self.handoff.empty.receive().await;
        let filled = mem::replace(&mut self.current, spare);
        self.handoff.filled.send(filled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingLink;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use zvg_core::{Color, Encoder, Error, Point};
    use zvg_core::config::MonitorFlags;

    #[test]
    fn test_frames_transmitted_in_order() {
        let handoff = FrameHandoff::<NoopRawMutex>::new();
        let mut link = RecordingLink::default();

        block_on(async {
            let mut submitter = handoff
                .submitter(CommandBuffer::new(), CommandBuffer::new())
                .await;
            let encode = async {
                for frame in 0..3u8 {
                    submitter.current_mut().push_command(&[frame; 4]).unwrap();
                    submitter.submit().await;
                    // Always handed a cleared buffer
                    assert!(submitter.current().is_empty());
                }
            };
            let transmit = async {
                for _ in 0..3 {
                    assert_eq!(handoff.transmit_next(&mut link).await, Ok(4));
                }
            };
            join(encode, transmit).await;
        });

        assert_eq!(link.sent, vec![vec![0; 4], vec![1; 4], vec![2; 4]]);
        assert_eq!(link.flushes, 3);
    }

    #[test]
    fn test_buffer_returned_after_error() {
        let handoff = FrameHandoff::<NoopRawMutex>::new();
        let mut link = RecordingLink {
            fail_with: Some(Error::LinkLost),
            ..Default::default()
        };

        block_on(async {
            let mut submitter = handoff
                .submitter(CommandBuffer::new(), CommandBuffer::new())
                .await;
            let encode = async {
                for _ in 0..3 {
                    submitter.current_mut().push(0xE0).unwrap();
                    submitter.submit().await;
                }
            };
            let transmit = async {
                for _ in 0..3 {
                    assert_eq!(
                        handoff.transmit_next(&mut link).await,
                        Err(Error::LinkLost)
                    );
                }
            };
            join(encode, transmit).await;
        });
    }

    #[test]
    fn test_encoder_fills_submitted_buffers() {
        let handoff = FrameHandoff::<NoopRawMutex>::new();
        let mut link = RecordingLink::default();
        let mut encoder = Encoder::new(MonitorFlags::empty());

        block_on(async {
            let mut submitter = handoff
                .submitter(CommandBuffer::new(), CommandBuffer::new())
                .await;
            let encode = async {
                let buf = submitter.current_mut();
                encoder
                    .encode_vector(buf, Point::new(0, 0), Point::new(10, 0), Color::DEFAULT)
                    .unwrap();
                encoder.end_frame(buf).unwrap();
                submitter.submit().await;
            };
            let transmit = async {
                handoff.transmit_next(&mut link).await.unwrap();
            };
            join(encode, transmit).await;
        });

        assert_eq!(link.sent.len(), 1);
        // Relative horizontal from the origin, then center and flush
        assert_eq!(&link.sent[0][..2], &[0x34, 10]);
        assert_eq!(link.sent[0].len(), 2 + 9);
    }
}
