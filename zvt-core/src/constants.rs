//! Protocol constants

use std::time::Duration;

/// Data link escape. Starts every control sequence inside a frame.
pub const DLE: u8 = 0x10;

/// Start of text (frame header is `DLE STX`)
pub const STX: u8 = 0x02;

/// End of text (frame trailer is `DLE ETX`)
pub const ETX: u8 = 0x03;

/// Positive link-level acknowledgement
pub const ACK: u8 = 0x06;

/// Negative link-level acknowledgement
pub const NAK: u8 = 0x15;

/// Length byte announcing a two byte little-endian extended length
pub const EXTENDED_LENGTH: u8 = 0xFF;

/// Time the sender waits for `ACK`/`NAK` after a frame (T3)
pub const TIMEOUT_T3: Duration = Duration::from_secs(5);

/// Default time the ECR waits for the terminal while slave (T4)
pub const TIMEOUT_T4_DEFAULT: Duration = Duration::from_secs(20);

/// Maximum send attempts of one frame before giving up on `NAK`
pub const MAX_RETRIES: usize = 3;

/// Default number of times the abort cycle consults a response handler
pub const ABORT_TURN_LIMIT: usize = 3;
