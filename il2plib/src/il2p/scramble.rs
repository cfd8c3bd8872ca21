//! IL2P self-synchronizing scrambler.
//!
//! Header and payload are each scrambled as independent blocks: the
//! register is reset at the start of every block, never carried over.
//! Bits are processed most significant first.

/// Initial transmit register.
pub const INIT_TX_STATE: u16 = 0x00f;

/// Initial receive register.
pub const INIT_RX_STATE: u16 = 0x1f0;

/// The transmitter's output lags its input by this many bits.
const TX_DELAY: usize = 5;

/// Receive-side register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Descrambler {
    state: u16,
}

impl Default for Descrambler {
    fn default() -> Self {
        Self::new()
    }
}

impl Descrambler {
    pub fn new() -> Self {
        Self::with_state(INIT_RX_STATE)
    }

    pub fn with_state(state: u16) -> Self {
        Self {
            state: state & 0x1ff,
        }
    }

    pub fn state(&self) -> u16 {
        self.state
    }

    /// Descramble one bit (0 or 1).
    pub fn bit(&mut self, b: u8) -> u8 {
        let b = (b & 1) as u16;
        let out = (b ^ self.state) & 1;
        self.state = ((self.state >> 1) | (b << 8)) ^ (b << 3);
        out as u8
    }

    /// Descramble one byte, MSB first.
    pub fn byte(&mut self, b: u8) -> u8 {
        (0..8).rev().fold(0, |acc, i| (acc << 1) | self.bit(b >> i))
    }

    pub fn apply(&mut self, block: &[u8]) -> Vec<u8> {
        block.iter().map(|&b| self.byte(b)).collect()
    }
}

/// Transmit-side register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scrambler {
    state: u16,
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrambler {
    pub fn new() -> Self {
        Self {
            state: INIT_TX_STATE,
        }
    }

    /// Scramble one bit (0 or 1).
    pub fn bit(&mut self, b: u8) -> u8 {
        let s = self.state;
        let out = ((s >> 4) ^ s) & 1;
        self.state = (((((b as u16) ^ s) & 1) << 9) | (s ^ ((s & 1) << 4))) >> 1;
        out as u8
    }
}

/// Descramble a block with a freshly reset register.
pub fn descramble(block: &[u8]) -> Vec<u8> {
    Descrambler::new().apply(block)
}

/// Scramble a block with a freshly reset register.
///
/// The first [TX_DELAY] output bits are dropped and the register is
/// flushed with zeros at the end, so the output is the same length as
/// the input and lines up with what [descramble] expects.
pub fn scramble(block: &[u8]) -> Vec<u8> {
    if block.is_empty() {
        return Vec::new();
    }

    let mut scrambler = Scrambler::new();
    let mut out = BitWriter::with_capacity(block.len());
    for &b in block {
        for i in (0..8).rev() {
            out.push(scrambler.bit((b >> i) & 1));
        }
    }

    out.drop_front(TX_DELAY);
    for _ in 0..TX_DELAY {
        out.push(scrambler.bit(0));
    }
    out.into_bytes()
}

/// Packs bits MSB first.
#[derive(Debug, Clone, Default)]
struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    fn with_capacity(bytes: usize) -> Self {
        Self {
            bits: Vec::with_capacity(bytes * 8),
        }
    }

    fn push(&mut self, bit: u8) {
        self.bits.push(bit & 1);
    }

    fn drop_front(&mut self, n: usize) {
        self.bits.drain(..n.min(self.bits.len()));
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|c| c.iter().enumerate().fold(0, |acc, (i, b)| acc | (b << (7 - i))))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck_macros::quickcheck;

    const RAW_HEADER: [u8; 13] = [
        0x63, 0xf1, 0x40, 0x40, 0x40, 0x00, 0x6b, 0x2b, 0x54, 0x28, 0x25, 0x2a, 0x0f,
    ];
    const SCRAMBLED_HEADER: [u8; 13] = [
        0x6a, 0xea, 0x9c, 0xc2, 0x01, 0x11, 0xfc, 0x14, 0x1f, 0xda, 0x6e, 0xf2, 0x53,
    ];

    #[test]
    fn scramble_reference() {
        assert_eq!(scramble(&RAW_HEADER), SCRAMBLED_HEADER);
    }

    #[test]
    fn descramble_reference() {
        assert_eq!(descramble(&SCRAMBLED_HEADER), RAW_HEADER);
    }

    #[test]
    fn descramble_is_not_an_involution() {
        let twice = descramble(&descramble(&RAW_HEADER));
        assert_ne!(twice, RAW_HEADER);
    }

    #[test]
    fn blocks_are_independent() {
        // descrambling header and payload as one stream gives a different
        // payload than resetting the register between them
        let payload = scramble(b"payload bytes");
        let mut joined = SCRAMBLED_HEADER.to_vec();
        joined.extend(&payload);

        let continuous = descramble(&joined);
        assert_eq!(&continuous[..13], &RAW_HEADER[..]);
        assert_ne!(&continuous[13..], b"payload bytes");
        assert_eq!(descramble(&payload), b"payload bytes");
    }

    #[test]
    fn empty_block() {
        assert!(scramble(&[]).is_empty());
        assert!(descramble(&[]).is_empty());
    }

    #[test]
    fn register_stays_nine_bits() {
        let mut d = Descrambler::with_state(0xffff);
        assert_eq!(d.state(), 0x1ff);
        for b in SCRAMBLED_HEADER {
            d.byte(b);
            assert!(d.state() <= 0x1ff);
        }
    }

    #[quickcheck]
    fn roundtrip(data: Vec<u8>) -> bool {
        descramble(&scramble(&data)) == data
    }

    #[quickcheck]
    fn same_length(data: Vec<u8>) -> bool {
        scramble(&data).len() == data.len() && descramble(&data).len() == data.len()
    }
}
