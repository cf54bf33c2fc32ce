//! CRC-8 with polynomial 0x07, initial value 0x00, no reflection, no final XOR.

const POLY: u8 = 0x07;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC-8 of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |crc, &byte| TABLE[(crc ^ byte) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-at-a-time reference form.
    fn crc8_bitwise(data: &[u8]) -> u8 {
        let mut crc = 0u8;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ POLY
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn check_value() {
        // Standard check value for CRC-8 (poly 0x07, init 0x00).
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn table_matches_bitwise() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(crc8(&data), crc8_bitwise(&data));
        assert_eq!(crc8(&[0x80]), crc8_bitwise(&[0x80]));
        assert_eq!(crc8(&[0xFF, 0x00, 0x42]), crc8_bitwise(&[0xFF, 0x00, 0x42]));
    }

    #[test]
    fn single_bit_flip_detected() {
        let data = [0x12u8, 0x34, 0x56, 0x78];
        let mut flipped = data;
        flipped[2] ^= 0x01;
        assert_ne!(crc8(&data), crc8(&flipped));
    }
}
