//! Parse hex dumps of captured traffic
//!
//! Handy when reading terminal logs: paste `10 02 06 0F 00 10 03 ..` or
//! `80 00 00` and get the packet back.

use bytes::Bytes;

use crate::{
    constants::{ACK, DLE, NAK},
    error::Result,
    frame,
    packet::Packet,
};

/// A parsed hex dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Represented {
    /// Link-level `ACK`
    Ack,

    /// Link-level `NAK`
    Nak,

    /// An APDU, de-framed if the dump was a serial frame
    Packet(Packet),
}

/// Parse a whitespace separated hex dump
///
/// Dumps starting with `DLE` are treated as serial frames and de-framed
/// first; the checksum is not enforced since captures are often partial.
///
/// # Examples
///
/// ```
/// use zvt_core::represent::{parse_represented, Represented};
/// use zvt_core::ControlCode;
///
/// match parse_represented("06 0F 00").unwrap() {
///     Represented::Packet(packet) => assert_eq!(packet.control_code, ControlCode::COMPLETION),
///     other => panic!("unexpected {:?}", other),
/// }
/// assert_eq!(parse_represented("06").unwrap(), Represented::Ack);
/// ```
pub fn parse_represented(input: &str) -> Result<Represented> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let data = hex::decode(compact)?;

    match data.as_slice() {
        [ACK] => Ok(Represented::Ack),
        [NAK] => Ok(Represented::Nak),
        [DLE, ..] => {
            let frame = frame::decode(&data)?;
            Ok(Represented::Packet(Packet::decode(frame.body)?))
        }
        _ => Ok(Represented::Packet(Packet::decode(Bytes::from(data))?)),
    }
}
