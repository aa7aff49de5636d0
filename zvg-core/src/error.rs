//! Driver error taxonomy
//!
//! [`Error`] keeps the specific failure the link or device reported;
//! [`ErrorKind`] groups those into the categories callers act on.

use zvg_protocol::PayloadError;

use crate::buffer::BufferFull;
use crate::config::ConfigError;

/// Result type used throughout the driver
pub type Result<T> = core::result::Result<T, Error>;

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// Bad or missing configuration
    ConfigInvalid,
    /// No matching controller at the configured address
    DeviceNotFound,
    /// A bounded wait expired
    LinkTimeout,
    /// Protocol breach; the link was forced back to compatibility mode
    LinkLost,
    /// Command buffer capacity exceeded
    BufferFull,
    /// Malformed identification or calibration payload
    BadDeviceData,
    /// Transfer memory could not be allocated
    OutOfMemory,
}

impl ErrorKind {
    /// Returns true if this kind aborts session start
    pub fn is_fatal_to_open(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigInvalid | ErrorKind::DeviceNotFound | ErrorKind::OutOfMemory
        )
    }

    /// Returns true if the caller may retry without reopening the session
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::LinkTimeout | ErrorKind::LinkLost | ErrorKind::BadDeviceData
        )
    }
}

/// Driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration string or values rejected
    Config(ConfigError),
    /// Port does not report ECP capability
    NotEcp,
    /// Port refused 8-bit PWord configuration
    EcpConfigWord,
    /// Link flood test after detection failed, with the kind of the
    /// underlying link error
    SelfTestFailed(ErrorKind),
    /// Peripheral did not follow the negotiation handshake
    NegotiationFailed,
    /// Handshake or transfer wait expired
    Timeout,
    /// Peripheral held BUSY in compatibility mode
    PeripheralBusy,
    /// Peripheral has no reverse data to send
    NoData,
    /// Peripheral dropped out mid-transfer
    LinkLost,
    /// Operation not valid in the current link mode
    BadMode,
    /// Command buffer full
    BufferFull,
    /// Read-back payload has the wrong size
    BadData,
    /// Device ID record not recognized
    UnknownId,
    /// Transfer memory unavailable
    OutOfMemory,
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::ConfigInvalid,
            Error::NotEcp | Error::EcpConfigWord | Error::SelfTestFailed(_) => {
                ErrorKind::DeviceNotFound
            }
            Error::NegotiationFailed
            | Error::Timeout
            | Error::PeripheralBusy
            | Error::NoData => ErrorKind::LinkTimeout,
            Error::LinkLost | Error::BadMode => ErrorKind::LinkLost,
            Error::BufferFull => ErrorKind::BufferFull,
            Error::BadData | Error::UnknownId => ErrorKind::BadDeviceData,
            Error::OutOfMemory => ErrorKind::OutOfMemory,
        }
    }

    /// Category of the failure this error wraps, if any
    ///
    /// Tells a self-test that timed out (dead cable, board off) apart from
    /// one that lost the link mid-transfer.
    pub fn cause(&self) -> Option<ErrorKind> {
        match self {
            Error::SelfTestFailed(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<BufferFull> for Error {
    fn from(_: BufferFull) -> Self {
        Error::BufferFull
    }
}

impl From<PayloadError> for Error {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::UnknownId => Error::UnknownId,
            PayloadError::BadLength { .. } => Error::BadData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::NegotiationFailed.kind(), ErrorKind::LinkTimeout);
        assert_eq!(Error::LinkLost.kind(), ErrorKind::LinkLost);
        assert_eq!(Error::NotEcp.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(Error::UnknownId.kind(), ErrorKind::BadDeviceData);
        assert_eq!(
            Error::Config(ConfigError::MissingPort).kind(),
            ErrorKind::ConfigInvalid
        );
    }

    #[test]
    fn test_self_test_cause() {
        let err = Error::SelfTestFailed(Error::Timeout.kind());
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(err.cause(), Some(ErrorKind::LinkTimeout));
        assert_eq!(Error::SelfTestFailed(ErrorKind::LinkLost).cause(), Some(ErrorKind::LinkLost));
        assert_eq!(Error::LinkLost.cause(), None);
    }

    #[test]
    fn test_open_policy() {
        assert!(ErrorKind::ConfigInvalid.is_fatal_to_open());
        assert!(ErrorKind::DeviceNotFound.is_fatal_to_open());
        assert!(ErrorKind::OutOfMemory.is_fatal_to_open());
        assert!(!ErrorKind::LinkTimeout.is_fatal_to_open());
    }

    #[test]
    fn test_recoverable() {
        assert!(ErrorKind::LinkTimeout.is_recoverable());
        assert!(ErrorKind::LinkLost.is_recoverable());
        assert!(ErrorKind::BadDeviceData.is_recoverable());
        assert!(!ErrorKind::BufferFull.is_recoverable());
        assert!(!ErrorKind::OutOfMemory.is_recoverable());
    }

    #[test]
    fn test_payload_conversion() {
        assert_eq!(Error::from(PayloadError::UnknownId), Error::UnknownId);
        let short = PayloadError::BadLength {
            expected: 11,
            actual: 3,
        };
        assert_eq!(Error::from(short), Error::BadData);
    }
}
