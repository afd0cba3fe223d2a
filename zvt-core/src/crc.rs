//! ZVT frame checksum
//!
//! The serial link protects each frame with the CCITT CRC in its reflected
//! form (also catalogued as CRC-16/KERMIT):
//! 1. Polynomial 0x1021, processed LSB first (0x8408)
//! 2. Initial value 0x0000, no final XOR
//! 3. Computed over the de-stuffed APDU followed by `ETX`
//! 4. Transmitted low byte first

use tracing::trace;

use crate::constants::ETX;

/// Reflected CCITT polynomial
const POLY: u16 = 0x8408;

/// Run the reflected CCITT CRC over `data`, continuing from `crc`
fn update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Plain CRC-16/KERMIT over `data`
///
/// # Examples
///
/// ```
/// use zvt_core::crc;
///
/// assert_eq!(crc::crc16(b"123456789"), 0x2189);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    update(0, data)
}

/// Calculate the checksum of a frame carrying `body`
///
/// The trailing `ETX` is part of the protected region.
///
/// # Examples
///
/// ```
/// use zvt_core::crc;
///
/// let checksum = crc::calculate(&[0x80, 0x00, 0x00]);
/// println!("Checksum: 0x{:04X}", checksum);
/// ```
pub fn calculate(body: &[u8]) -> u16 {
    let checksum = update(update(0, body), &[ETX]);

    trace!(
        body_len = body.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated frame checksum"
    );

    checksum
}

/// Checksum of `body` as it appears on the wire
pub fn to_wire(body: &[u8]) -> [u8; 2] {
    calculate(body).to_le_bytes()
}

/// Read a checksum in wire order
pub fn from_wire(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Verify a received checksum
pub fn verify(body: &[u8], received: [u8; 2]) -> bool {
    calculate(body) == from_wire(received)
}
