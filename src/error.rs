//! Error types for the Prologix library
//!
//! This module defines the error types used throughout the library
//! for handling transport, framing and protocol errors.

use std::time::Duration;

use thiserror::Error;

use crate::frame::ReadTermination;

/// Result type alias for Prologix operations
pub type Result<T> = std::result::Result<T, PrologixError>;

/// Error types for Prologix operations
#[derive(Error, Debug)]
pub enum PrologixError {
    /// I/O error from the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error from the serialport library
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Controller command text failed validation
    #[error("Invalid controller command: {reason}")]
    InvalidCommand { reason: String },

    /// A zero read timeout was requested
    #[error("Read timeout must be greater than zero")]
    InvalidTimeout,

    /// The byte channel is closed or was never opened
    #[error("Byte channel unavailable")]
    ChannelUnavailable,

    /// No complete frame arrived before the deadline
    #[error("Read timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// A terminator sequence was started but not completed
    #[error("Malformed frame for {termination:?} termination: unexpected byte 0x{byte:02X}")]
    MalformedFrame {
        termination: ReadTermination,
        byte: u8,
    },

    /// GPIB bus address out of range
    #[error("Invalid bus address: {reason}")]
    InvalidAddress { reason: String },

    /// Response text could not be parsed
    #[error("Invalid response from controller: {0}")]
    InvalidResponse(String),
}

impl PrologixError {
    /// Check if this error is a timeout error
    pub fn is_timeout(&self) -> bool {
        match self {
            PrologixError::Timeout { .. } => true,
            PrologixError::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
            }
            PrologixError::Serial(e) => {
                matches!(
                    e.kind(),
                    serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut)
                )
            }
            _ => false,
        }
    }

    /// Check if this error indicates a dead or unusable transport
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            PrologixError::ChannelUnavailable | PrologixError::Io(_) | PrologixError::Serial(_)
        )
    }
}
