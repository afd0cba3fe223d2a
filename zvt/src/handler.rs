//! Response handler contract
//!
//! Every packet the cash register sends decides for itself which terminal
//! replies hand the master turn back. The engine only ever talks to packets
//! through [`ResponseHandler`].

use std::any::Any;
use std::fmt::Debug;

use bytes::Bytes;

use zvt_core::Packet;

/// Per-reply context handed to [`ResponseHandler::handle_response`]
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    is_master: bool,
    acknowledge: bool,
}

impl ResponseContext {
    pub fn new(is_master: bool) -> Self {
        Self {
            is_master,
            acknowledge: false,
        }
    }

    /// Ask the engine to answer this reply with "packet received" (`80 00 00`)
    pub fn acknowledge(&mut self) {
        self.acknowledge = true;
    }

    /// Check if an acknowledgement was requested
    pub fn acknowledge_requested(&self) -> bool {
        self.acknowledge
    }

    /// Check if the cash register held master when the reply arrived
    pub fn is_master(&self) -> bool {
        self.is_master
    }
}

/// A packet kind the engine can transmit
pub trait ResponseHandler: Send + Debug + 'static {
    /// The APDU to send
    fn apdu(&self) -> Packet;

    /// Wire bytes handed to the transport
    ///
    /// Fails if the payload does not fit the APDU length field.
    fn serialize(&self) -> zvt_core::Result<Bytes> {
        Ok(self.apdu().try_encode()?.freeze())
    }

    /// Build the packet back from APDU bytes
    fn parse(data: &[u8]) -> zvt_core::Result<Self>
    where
        Self: Sized;

    /// Judge a terminal reply
    ///
    /// Returns `true` if the cash register keeps or regains master.
    fn handle_response(&mut self, response: &Packet, ctx: &mut ResponseContext) -> bool;

    /// Downcast support for [`crate::Transmission::last_as`]
    fn as_any(&self) -> &dyn Any;
}

impl ResponseHandler for Packet {
    fn apdu(&self) -> Packet {
        self.clone()
    }

    fn parse(data: &[u8]) -> zvt_core::Result<Self> {
        Packet::parse(data)
    }

    /// A bare packet gives up master on anything but a positive acknowledgement
    fn handle_response(&mut self, response: &Packet, _ctx: &mut ResponseContext) -> bool {
        response.is_positive_ack()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
