//! CRC16-CCITT as used by the payment QR checksum field.

const POLY: u16 = 0x1021;
const INIT: u16 = 0xFFFF;

/// CRC-CCITT over `bytes`: polynomial `0x1021`, initial value `0xFFFF`,
/// MSB first, no reflection, no final XOR.
pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INIT, |mut crc, &byte| {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Checksum of `s` rendered as four uppercase hex digits.
pub fn checksum_hex(s: &str) -> String {
    format!("{:04X}", crc16_ccitt(s.as_bytes()))
}
