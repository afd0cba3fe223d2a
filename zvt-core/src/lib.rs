//! # zvt-core
//!
//! Core protocol implementation for the ZVT cash register / payment terminal
//! protocol.
//!
//! This crate provides the low-level protocol primitives:
//! - APDU structure and encoding/decoding
//! - Serial wire framing (DLE/STX/ETX, byte stuffing, ACK/NAK)
//! - Checksum calculation
//! - Control code definitions
//! - Protocol constants

pub mod constants;
pub mod control_code;
pub mod crc;
pub mod error;
pub mod frame;
pub mod packet;
pub mod represent;

pub use control_code::ControlCode;
pub use error::{Error, Result};
pub use frame::{Frame, Incoming};
pub use packet::Packet;

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "13.09";
