//! Transport errors

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Read timeout after {0:?}")]
    ReadTimeout(Duration),

    #[error("No ACK within {0:?}")]
    AckTimeout(Duration),

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Frame refused with NAK {attempts} times")]
    Nak { attempts: usize },

    #[error("Expected ACK or NAK, got 0x{0:02X}")]
    UnexpectedControl(u8),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] zvt_core::Error),
}

impl Error {
    /// Check if the peer simply did not answer in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout(_) | Self::AckTimeout(_))
    }
}
