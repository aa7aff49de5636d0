//! Frame command buffer

use heapless::Vec;

/// Capacity of one command buffer
pub const COMMAND_BUFFER_SIZE: usize = 8192;

/// Buffer capacity exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

/// Append-only byte buffer holding one frame of encoded commands
///
/// Commands are appended whole: a command that does not fit leaves the
/// buffer unchanged.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    bytes: Vec<u8, COMMAND_BUFFER_SIZE>,
    limit: usize,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    /// Create an empty buffer with the full capacity
    pub fn new() -> Self {
        Self::with_limit(COMMAND_BUFFER_SIZE)
    }

    /// Create an empty buffer that accepts at most `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit: limit.min(COMMAND_BUFFER_SIZE),
        }
    }

    /// Append a complete command
    pub fn push_command(&mut self, command: &[u8]) -> Result<(), BufferFull> {
        if command.len() > self.remaining() {
            return Err(BufferFull);
        }
        self.bytes.extend_from_slice(command).map_err(|_| BufferFull)
    }

    /// Append one byte
    pub fn push(&mut self, byte: u8) -> Result<(), BufferFull> {
        self.push_command(&[byte])
    }

    /// Append as much of `data` as fits, returning the number of bytes taken
    pub fn push_truncated(&mut self, data: &[u8]) -> usize {
        let mut taken = 0;
        for &byte in data {
            if self.push(byte).is_err() {
                break;
            }
            taken += 1;
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.bytes.len()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_command_atomic() {
        let mut buf = CommandBuffer::with_limit(4);
        buf.push_command(&[1, 2, 3]).unwrap();
        assert_eq!(buf.push_command(&[4, 5]), Err(BufferFull));
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
        buf.push(4).unwrap();
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_push_truncated() {
        let mut buf = CommandBuffer::with_limit(3);
        assert_eq!(buf.push_truncated(&[9, 8, 7, 6]), 3);
        assert_eq!(buf.as_slice(), &[9, 8, 7]);
        assert_eq!(buf.push_truncated(&[1]), 0);
    }

    #[test]
    fn test_limit_capped() {
        let buf = CommandBuffer::with_limit(usize::MAX);
        assert_eq!(buf.capacity(), COMMAND_BUFFER_SIZE);
    }

    #[test]
    fn test_clear() {
        let mut buf = CommandBuffer::new();
        buf.push_command(&[0xE0; 9]).unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.remaining(), COMMAND_BUFFER_SIZE);
    }
}
