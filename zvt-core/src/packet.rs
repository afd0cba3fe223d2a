//! ZVT application protocol data unit (APDU)

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    constants::EXTENDED_LENGTH,
    control_code::ControlCode,
    error::{Error, Result},
};

/// ZVT APDU
///
/// # Packet Structure
///
/// ```text
/// ┌─────────┬─────────┬─────────────────────────┬─────────────┐
/// │  CLASS  │  INSTR  │         Length          │    Data     │
/// │ 1 byte  │ 1 byte  │ 1 byte, or FF + LE u16  │   N bytes   │
/// └─────────┴─────────┴─────────────────────────┴─────────────┘
/// ```
///
/// Lengths below 0xFF use the single length byte. Larger payloads set it to
/// 0xFF and follow with a little-endian u16.
///
/// # Examples
///
/// ```
/// use zvt_core::{ControlCode, Packet};
///
/// let packet = Packet::with_payload(ControlCode::REGISTRATION, vec![0x12u8, 0x34, 0x56, 0xBA]);
/// let encoded = packet.encode();
///
/// let decoded = Packet::decode(encoded.freeze()).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Control code (class, instruction)
    pub control_code: ControlCode,

    /// APDU data
    pub payload: Bytes,
}

impl Packet {
    /// Header size with a short length byte
    pub const HEADER_SIZE: usize = 3;

    /// Header size with an extended length field
    pub const EXTENDED_HEADER_SIZE: usize = 5;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Create a new packet with empty payload
    pub fn new(control_code: ControlCode) -> Self {
        Self {
            control_code,
            payload: Bytes::new(),
        }
    }

    /// Create a packet with payload
    pub fn with_payload(control_code: ControlCode, payload: impl Into<Bytes>) -> Self {
        Self {
            control_code,
            payload: payload.into(),
        }
    }

    /// "Packet received" acknowledgement the ECR returns for terminal messages
    ///
    /// # Examples
    ///
    /// ```
    /// use zvt_core::Packet;
    ///
    /// assert_eq!(&Packet::packet_received().encode()[..], &[0x80, 0x00, 0x00]);
    /// ```
    pub fn packet_received() -> Self {
        Self::new(ControlCode::PACKET_RECEIVED)
    }

    /// Encode packet to bytes
    ///
    /// Payloads larger than [`Packet::MAX_PAYLOAD_SIZE`] are truncated by the
    /// length field; use [`Packet::try_encode`] to reject them instead.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&self.control_code.to_bytes());

        let len = self.payload.len();
        if len < EXTENDED_LENGTH as usize {
            buf.put_u8(len as u8);
        } else {
            buf.put_u8(EXTENDED_LENGTH);
            buf.put_u16_le(len as u16);
        }

        buf.put_slice(&self.payload);

        buf
    }

    /// Encode packet, rejecting payloads the length field cannot describe
    pub fn try_encode(&self) -> Result<BytesMut> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }
        Ok(self.encode())
    }

    /// Decode packet from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header
    /// - The length field disagrees with the remaining data
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let class = buf.get_u8();
        let instr = buf.get_u8();
        let short_len = buf.get_u8();

        let declared = if short_len == EXTENDED_LENGTH {
            if buf.remaining() < 2 {
                return Err(Error::PacketTooShort {
                    expected: Self::EXTENDED_HEADER_SIZE,
                    actual: Self::HEADER_SIZE + buf.remaining(),
                });
            }
            buf.get_u16_le() as usize
        } else {
            short_len as usize
        };

        if buf.len() != declared {
            return Err(Error::LengthMismatch {
                declared,
                actual: buf.len(),
            });
        }

        Ok(Self {
            control_code: ControlCode::new(class, instr),
            payload: buf,
        })
    }

    /// Parse an APDU received from the transport
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(Bytes::copy_from_slice(data))
    }

    /// Check if the terminal acknowledges with this packet
    pub fn is_positive_ack(&self) -> bool {
        self.control_code.is_positive_ack()
    }

    /// Check if the terminal rejects with this packet
    pub fn is_negative_ack(&self) -> bool {
        self.control_code.is_negative_ack()
    }

    /// Error code carried by a negative acknowledgement
    pub fn error_code(&self) -> Option<u8> {
        self.is_negative_ack().then_some(self.control_code.instr)
    }

    /// Get total encoded size
    pub fn size(&self) -> usize {
        let header = if self.payload.len() < EXTENDED_LENGTH as usize {
            Self::HEADER_SIZE
        } else {
            Self::EXTENDED_HEADER_SIZE
        };
        header + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("control_code", &self.control_code)
            .field("name", &self.control_code.name())
            .field("payload", &hex::encode(&self.payload))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{}](len={})", self.control_code, self.payload.len())
    }
}
