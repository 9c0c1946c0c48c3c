//! # Mercury Error Handling
//!
//! This module defines the MercuryError enum, which represents the different
//! error types that can occur while talking to a meter, and the ErrorKind
//! classification used at the per-device boundary.

use thiserror::Error;

/// Represents the different error types that can occur in the Mercury crate.
#[derive(Debug, Error)]
pub enum MercuryError {
    /// The bridge socket could not be opened, or the device did not confirm
    /// its presence on the bus.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A request was sent but no response arrived within the exchange timeout.
    #[error("Timeout while read data from socket")]
    Timeout,

    /// A response was received but failed validation.
    #[error("Wrong data: {0}")]
    MalformedData(String),

    /// Indicates a CRC mismatch in a received frame.
    #[error("Invalid checksum: expected {expected:#06X}, calculated {calculated:#06X}")]
    InvalidChecksum { expected: u16, calculated: u16 },

    /// The device refused the open-channel request (Mercury 236 only).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A catch-all error, confined to the offending device.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Error classification used by the polling orchestrator and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Timeout,
    MalformedData,
    Authentication,
    Unexpected,
}

impl MercuryError {
    /// Classifies the error. Checksum mismatches count as malformed data.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MercuryError::Connection(_) => ErrorKind::Connection,
            MercuryError::Timeout => ErrorKind::Timeout,
            MercuryError::MalformedData(_) => ErrorKind::MalformedData,
            MercuryError::InvalidChecksum { .. } => ErrorKind::MalformedData,
            MercuryError::Authentication(_) => ErrorKind::Authentication,
            MercuryError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}
