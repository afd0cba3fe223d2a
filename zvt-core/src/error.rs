//! Error types for zvt-core

use bytes::Bytes;

/// Result type alias for zvt-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing was received where a frame was expected
    #[error("No header: empty frame")]
    NoHeader,

    /// Frame does not start with `DLE STX`
    #[error("Header error: expected 10 02, got {}", hex::encode(.found))]
    BadHeader {
        found: Bytes,
    },

    /// Input ended before `DLE ETX` and both checksum bytes
    #[error("Truncated frame: {len} bytes without complete trailer")]
    TruncatedFrame {
        len: usize,
    },

    /// `DLE` followed by something other than `DLE` or `ETX`
    #[error("DLE without sense at offset {offset}: followed by 0x{byte:02X}")]
    StrayDle {
        offset: usize,
        byte: u8,
    },

    /// Frame checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// APDU is too short to carry its header
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// APDU length field disagrees with the data that follows it
    #[error("Length mismatch: header announces {declared} bytes, {actual} bytes follow")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Payload does not fit the extended length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Hex dump could not be parsed
    #[error("Invalid hex dump: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl Error {
    /// Check if error concerns the frame envelope
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::NoHeader
                | Self::BadHeader { .. }
                | Self::TruncatedFrame { .. }
                | Self::ChecksumMismatch { .. }
        )
    }

    /// Check if the peer broke the protocol (never retried)
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::StrayDle { .. } | Self::LengthMismatch { .. }
        )
    }

    /// Check if more input could complete the frame
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::TruncatedFrame { .. })
    }
}
