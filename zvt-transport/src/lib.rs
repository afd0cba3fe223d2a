//! Transport layer for the ZVT protocol
//!
//! A transport moves APDUs between cash register and terminal. Link-level
//! details (framing, ACK/NAK, retries) stay behind the trait so the
//! transmission engine only ever sees APDU bytes.

pub mod error;
pub mod framed;
pub mod scripted;

pub use error::{Error, Result};
pub use framed::FramedTransport;
pub use scripted::{Scripted, ScriptedTransport};

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to terminal
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from terminal
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one APDU
    ///
    /// Returns the terminal's immediate reply APDU, or empty bytes when
    /// `no_wait` is set.
    async fn send(&mut self, apdu: &[u8], no_wait: bool) -> Result<Bytes>;

    /// Receive one APDU, failing with a timeout error after `timeout`
    async fn receive(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Drop buffered input and return the link to its idle state
    async fn reset(&mut self) -> Result<()>;

    /// Check if received data is already waiting to be read
    fn has_pending(&self) -> bool {
        false
    }

    /// Get remote address
    fn remote_addr(&self) -> String;
}
