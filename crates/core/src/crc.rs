//! CRC16 calculation for section payload validation
//!
//! Section payloads are protected by CRC-16/MODBUS (initial value 0xFFFF,
//! reflected polynomial 0xA001), the checksum the device SDK has always
//! written into section headers.

use crc::{Crc, CRC_16_MODBUS};

/// CRC16 algorithm used for section payloads
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Calculate CRC16 checksum of data
///
/// # Example
///
/// ```
/// use devstore_core::crc::calculate_crc16;
///
/// assert_eq!(calculate_crc16(b"123456789"), 0x4B37);
/// ```
pub fn calculate_crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Compute both header checksums for a section payload
///
/// Both copies hold the same value. A header whose copies disagree has been
/// damaged and its payload is not trusted.
pub fn section_crcs(payload: &[u8]) -> (u16, u16) {
    let crc = calculate_crc16(payload);
    (crc, crc)
}

/// Validate a payload against both stored header checksums
pub fn validate_section_crcs(payload: &[u8], crc1: u16, crc2: u16) -> bool {
    let (expected1, expected2) = section_crcs(payload);
    expected1 == crc1 && expected2 == crc2
}
