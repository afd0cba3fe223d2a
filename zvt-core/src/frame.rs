//! Serial wire frame codec
//!
//! On the serial link every APDU travels inside a frame:
//!
//! ```text
//! ┌──────────┬──────────────────────────┬──────────┬────────────┐
//! │ DLE  STX │  APDU, each DLE doubled  │ DLE  ETX │ CRC lo  hi │
//! └──────────┴──────────────────────────┴──────────┴────────────┘
//! ```
//!
//! Single `ACK`/`NAK` bytes travel unframed and acknowledge a frame.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{
    constants::{ACK, DLE, ETX, NAK, STX},
    crc,
    error::{Error, Result},
};

/// Frame header
pub const HEADER: [u8; 2] = [DLE, STX];

/// Frame trailer
pub const TRAILER: [u8; 2] = [DLE, ETX];

/// A de-stuffed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// APDU bytes with escaping removed
    pub body: Bytes,

    /// Checksum bytes as received (low byte first)
    pub checksum: [u8; 2],
}

impl Frame {
    /// Received checksum value
    pub fn received_checksum(&self) -> u16 {
        crc::from_wire(self.checksum)
    }

    /// Check the received checksum against the body
    pub fn verify(&self) -> Result<()> {
        let expected = crc::calculate(&self.body);
        let received = self.received_checksum();
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }
        Ok(())
    }
}

/// What a chunk of link-level input turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Single `ACK` byte
    Ack,

    /// Single `NAK` byte
    Nak,

    /// A complete frame
    Frame(Frame),
}

/// Classify link-level input
///
/// Exactly one byte equal to `ACK` or `NAK` is an acknowledgement marker;
/// everything else must be a frame.
///
/// # Examples
///
/// ```
/// use zvt_core::frame::{self, Incoming};
///
/// assert_eq!(frame::classify(&[0x06]).unwrap(), Incoming::Ack);
/// assert_eq!(frame::classify(&[0x15]).unwrap(), Incoming::Nak);
/// ```
pub fn classify(raw: &[u8]) -> Result<Incoming> {
    match raw {
        [ACK] => Ok(Incoming::Ack),
        [NAK] => Ok(Incoming::Nak),
        _ => decode(raw).map(Incoming::Frame),
    }
}

/// Decode a frame, ignoring anything after the checksum
///
/// The checksum is extracted but not verified; see [`Frame::verify`].
///
/// # Errors
///
/// - [`Error::NoHeader`] for empty input
/// - [`Error::BadHeader`] when the input does not start with `DLE STX`
/// - [`Error::StrayDle`] for a `DLE` followed by neither `DLE` nor `ETX`
/// - [`Error::TruncatedFrame`] when the trailer or checksum is missing
///
/// # Examples
///
/// ```
/// use zvt_core::frame;
///
/// let raw = [0x10, 0x02, 0x01, 0x02, 0x10, 0x10, 0x03, 0x10, 0x03, 0xAA, 0xBB];
/// let decoded = frame::decode(&raw).unwrap();
///
/// assert_eq!(&decoded.body[..], &[0x01, 0x02, 0x10, 0x03]);
/// assert_eq!(decoded.checksum, [0xAA, 0xBB]);
/// ```
pub fn decode(raw: &[u8]) -> Result<Frame> {
    decode_prefix(raw).map(|(frame, _)| frame)
}

/// Decode the frame at the start of `raw`
///
/// Returns the frame and the number of bytes it occupied, so stream readers
/// can keep whatever follows.
pub fn decode_prefix(raw: &[u8]) -> Result<(Frame, usize)> {
    if raw.is_empty() {
        return Err(Error::NoHeader);
    }
    if raw.len() < HEADER.len() || raw[..2] != HEADER {
        return Err(Error::BadHeader {
            found: Bytes::copy_from_slice(&raw[..raw.len().min(2)]),
        });
    }

    let mut body = BytesMut::with_capacity(raw.len());
    let mut escape = false;

    for (offset, &byte) in raw.iter().enumerate().skip(HEADER.len()) {
        if escape {
            match byte {
                ETX => {
                    let end = offset + 3;
                    if raw.len() < end {
                        return Err(Error::TruncatedFrame { len: raw.len() });
                    }
                    let checksum = [raw[offset + 1], raw[offset + 2]];

                    trace!(
                        frame_len = end,
                        body_len = body.len(),
                        "Decoded frame"
                    );

                    return Ok((
                        Frame {
                            body: body.freeze(),
                            checksum,
                        },
                        end,
                    ));
                }
                DLE => {
                    body.put_u8(DLE);
                    escape = false;
                }
                _ => return Err(Error::StrayDle { offset, byte }),
            }
        } else if byte == DLE {
            escape = true;
        } else {
            body.put_u8(byte);
        }
    }

    Err(Error::TruncatedFrame { len: raw.len() })
}

/// Frame an APDU for the serial link
///
/// # Examples
///
/// ```
/// use zvt_core::frame;
///
/// let raw = frame::encode(&[0x80, 0x00, 0x00]);
/// assert_eq!(&raw[..2], &[0x10, 0x02]);
/// assert_eq!(&raw[5..7], &[0x10, 0x03]);
///
/// let decoded = frame::decode(&raw).unwrap();
/// assert!(decoded.verify().is_ok());
/// ```
pub fn encode(body: &[u8]) -> BytesMut {
    let escapes = body.iter().filter(|&&b| b == DLE).count();
    let mut buf = BytesMut::with_capacity(body.len() + escapes + 6);

    buf.put_slice(&HEADER);
    for &byte in body {
        if byte == DLE {
            buf.put_u8(DLE);
        }
        buf.put_u8(byte);
    }
    buf.put_slice(&TRAILER);
    buf.put_slice(&crc::to_wire(body));

    trace!("Framed {} byte APDU into {} bytes", body.len(), buf.len());

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_decode_unescapes_doubled_dle() {
        let raw = [DLE, STX, 0x01, 0x02, DLE, DLE, 0x03, DLE, ETX, 0xC1, 0xC2];
        let frame = decode(&raw).unwrap();

        assert_eq!(&frame.body[..], &[0x01, 0x02, 0x10, 0x03]);
        assert_eq!(frame.checksum, [0xC1, 0xC2]);
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(decode(&[]), Err(Error::NoHeader)));
    }

    #[test]
    fn test_decode_missing_header() {
        let raw = [0x06, 0x0F, 0x00, DLE, ETX, 0x00, 0x00];
        let err = decode(&raw).unwrap_err();

        assert!(err.is_framing());
        assert!(matches!(err, Error::BadHeader { ref found } if found[..] == [0x06, 0x0F]));
    }

    #[test]
    fn test_decode_single_byte_is_bad_header() {
        assert!(matches!(decode(&[DLE]), Err(Error::BadHeader { .. })));
    }

    #[test]
    fn test_decode_stray_dle() {
        let raw = [DLE, STX, 0x01, DLE, 0x05, DLE, ETX, 0x00, 0x00];
        let err = decode(&raw).unwrap_err();

        assert!(err.is_protocol_violation());
        assert!(matches!(err, Error::StrayDle { offset: 4, byte: 0x05 }));
    }

    #[test]
    fn test_decode_truncated() {
        // No trailer at all
        assert!(decode(&[DLE, STX, 0x80, 0x00, 0x00]).unwrap_err().is_truncated());

        // Trailer present, checksum incomplete
        assert!(decode(&[DLE, STX, 0x80, 0x00, 0x00, DLE, ETX, 0x12]).unwrap_err().is_truncated());

        // Escape pending at end of input
        assert!(decode(&[DLE, STX, 0x80, DLE]).unwrap_err().is_truncated());
    }

    #[test]
    fn test_decode_prefix_reports_consumed_length() {
        let mut raw = encode(&[0x06, 0x0F, 0x00]).to_vec();
        let frame_len = raw.len();
        raw.push(ACK);

        let (frame, consumed) = decode_prefix(&raw).unwrap();
        assert_eq!(consumed, frame_len);
        assert_eq!(&frame.body[..], &[0x06, 0x0F, 0x00]);
    }

    #[test]
    fn test_encode_doubles_dle() {
        let raw = encode(&[0x10, 0x20]);
        assert_eq!(&raw[..6], &[DLE, STX, DLE, 0x10, 0x20, DLE]);
        assert_eq!(raw[6], ETX);
        assert_eq!(raw.len(), 9);
    }

    #[test]
    fn test_encoded_checksum_verifies() {
        let frame = decode(&encode(&[0x06, 0x01, 0x02, 0x10, 0x10])).unwrap();
        assert!(frame.verify().is_ok());

        let corrupted = Frame {
            checksum: [frame.checksum[0] ^ 0xFF, frame.checksum[1]],
            ..frame
        };
        assert!(matches!(corrupted.verify(), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&[ACK]).unwrap(), Incoming::Ack);
        assert_eq!(classify(&[NAK]).unwrap(), Incoming::Nak);

        // ACK followed by more data is not an acknowledgement marker
        assert!(classify(&[ACK, 0x0F, 0x00]).is_err());

        let framed = encode(&[0x80, 0x00, 0x00]);
        match classify(&framed).unwrap() {
            Incoming::Frame(frame) => assert_eq!(&frame.body[..], &[0x80, 0x00, 0x00]),
            other => panic!("Expected frame, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_encode_decode_roundtrip(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let raw = encode(&body);
            let (frame, consumed) = decode_prefix(&raw).unwrap();

            prop_assert_eq!(&frame.body[..], &body[..]);
            prop_assert_eq!(consumed, raw.len());
            prop_assert!(frame.verify().is_ok());
        }

        #[test]
        fn prop_encode_never_leaves_single_dle(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            let raw = encode(&body);
            let region = &raw[2..raw.len() - 4];

            // Inside the framed region DLEs only ever come in pairs
            let mut i = 0;
            while i < region.len() {
                if region[i] == DLE {
                    prop_assert_eq!(region.get(i + 1), Some(&DLE));
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }
}
