//! Hamming(7,4) protection of the transmitted CRC.
//!
//! Each of the four CRC nibbles travels in its own byte, most
//! significant nibble first. Bit 7 of each byte is unused.

/// Nibble to 7-bit code word.
pub const ENCODE_TABLE: [u8; 16] = [
    0x00, 0x71, 0x62, 0x13, 0x54, 0x25, 0x36, 0x47, 0x38, 0x49, 0x5a, 0x2b, 0x6c, 0x1d, 0x0e, 0x7f,
];

// Nearest code word for every 7-bit value.
const DECODE_7BIT: [u8; 128] = [
    0x0, 0x0, 0x0, 0x3, 0x0, 0x5, 0xe, 0x7, 0x0, 0x9, 0xe, 0xb, 0xe, 0xd, 0xe, 0xe, //
    0x0, 0x3, 0x3, 0x3, 0x4, 0xd, 0x6, 0x3, 0x8, 0xd, 0xa, 0x3, 0xd, 0xd, 0xe, 0xd, //
    0x0, 0x5, 0x2, 0xb, 0x5, 0x5, 0x6, 0x5, 0x8, 0xb, 0xb, 0xb, 0xc, 0x5, 0xe, 0xb, //
    0x8, 0x1, 0x6, 0x3, 0x6, 0x5, 0x6, 0x6, 0x8, 0x8, 0x8, 0xb, 0x8, 0xd, 0x6, 0xf, //
    0x0, 0x9, 0x2, 0x7, 0x4, 0x7, 0x7, 0x7, 0x9, 0x9, 0xa, 0x9, 0xc, 0x9, 0xe, 0x7, //
    0x4, 0x1, 0xa, 0x3, 0x4, 0x4, 0x4, 0x7, 0xa, 0x9, 0xa, 0xa, 0x4, 0xd, 0xa, 0xf, //
    0x2, 0x1, 0x2, 0x2, 0xc, 0x5, 0x2, 0x7, 0xc, 0x9, 0x2, 0xb, 0xc, 0xc, 0xc, 0xf, //
    0x1, 0x1, 0x2, 0x1, 0x4, 0x1, 0x6, 0xf, 0x8, 0x1, 0xa, 0xf, 0xc, 0xf, 0xf, 0xf, //
];

const fn build_decode_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        // a flipped bit 7 carries no information
        table[i] = DECODE_7BIT[i & 0x7f];
        i += 1;
    }
    table
}

/// Most likely nibble for every received byte.
pub static DECODE_TABLE: [u8; 256] = build_decode_table();

/// Protect a CRC for transmission.
pub fn encode_checksum(crc: u16) -> [u8; 4] {
    [12, 8, 4, 0].map(|shift| ENCODE_TABLE[((crc >> shift) & 0xf) as usize])
}

/// Recover the transmitted CRC. This cannot fail; a badly damaged
/// checksum simply comes back wrong and fails the CRC comparison.
pub fn recover_checksum(encoded: [u8; 4]) -> u16 {
    encoded
        .iter()
        .fold(0, |acc, &b| (acc << 4) | DECODE_TABLE[b as usize] as u16)
}
