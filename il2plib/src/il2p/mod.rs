//! IL2P link layer: frames found in a raw capture by a sync marker,
//! with Reed-Solomon protected header and payload and a CRC trailer.
//!
//! A frame following the marker is laid out as
//!
//! ```text
//! header (13) | header parity (2) | payload | payload parity (16) | checksum (4) | trailer (1)
//! ```
//!
//! Header and payload are each scrambled independently before their
//! parity is computed.

pub mod checksum;
pub mod crc;
pub mod encode;
pub mod header;
pub mod locate;
pub mod packet;
pub mod rs;
pub mod scramble;

pub use encode::{EncodeError, Il2pEncoder};
pub use header::{HeaderError, Il2pHeader};
pub use packet::{
    BlockStatus, CaptureReport, DecodedPacket, DropReason, DroppedFrame, ErrorFlags,
    Il2pDecoder, Summary,
};

/// Sync marker preceding each frame in a capture.
pub const MARKER: [u8; 4] = [0xaa, 0xf1, 0x5e, 0x48];

pub const HEADER_LEN: usize = 13;
pub const HEADER_PARITY_LEN: usize = 2;
pub const PAYLOAD_PARITY_LEN: usize = 16;
pub const CHECKSUM_LEN: usize = 4;
pub const TRAILER_LEN: usize = 1;

/// Everything in a frame except the payload.
pub const OVERHEAD_LEN: usize =
    HEADER_LEN + HEADER_PARITY_LEN + PAYLOAD_PARITY_LEN + CHECKSUM_LEN + TRAILER_LEN;

/// Smallest frame that can be taken apart, one with an empty payload.
pub const MIN_FRAME_LEN: usize = OVERHEAD_LEN;

/// Longest payload that fits in a single Reed-Solomon block.
pub const MAX_PAYLOAD_LEN: usize = rs::MAX_BLOCK_LEN - PAYLOAD_PARITY_LEN;

/// Link addressing bytes the payload CRC is computed over, ahead of the
/// payload itself. These are the AX.25 address and control fields the
/// header stands in for.
pub const LINK_PREFIX: [u8; 16] = [
    0x96, 0x86, 0x66, 0xac, 0xac, 0xae, 0xe2, 0x96, 0x86, 0x66, 0xac, 0xac, 0xae, 0x61, 0x03,
    0xf0,
];

/// Trailing byte written after the checksum.
pub const TRAILER: u8 = 0x00;

/// Per-link settings shared by encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Il2pConfig<C = crc::CrcCcitt> {
    pub marker: Vec<u8>,
    pub link_prefix: Vec<u8>,
    pub trailer: u8,
    pub crc: C,
}

impl Default for Il2pConfig<crc::CrcCcitt> {
    fn default() -> Self {
        Self::with_crc(crc::CrcCcitt::new())
    }
}

impl<C> Il2pConfig<C> {
    /// Default marker and prefix, with the given CRC style.
    pub fn with_crc(crc: C) -> Self {
        Self {
            marker: MARKER.to_vec(),
            link_prefix: LINK_PREFIX.to_vec(),
            trailer: TRAILER,
            crc,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(MIN_FRAME_LEN, 36);
        assert_eq!(MAX_PAYLOAD_LEN, 239);
    }
}
