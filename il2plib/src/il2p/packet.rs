//! Taking captured frames apart into decoded packet records.

use bitflags::bitflags;

use super::checksum::recover_checksum;
use super::crc::{CrcCcitt, CrcStyle};
use super::header::{HeaderError, Il2pHeader};
use super::locate::{frame_spans, locate_markers, FrameSpan};
use super::rs::{FecError, ReedSolomon, IL2P_FEC};
use super::scramble::descramble;
use super::{
    Il2pConfig, CHECKSUM_LEN, HEADER_LEN, HEADER_PARITY_LEN, MIN_FRAME_LEN, OVERHEAD_LEN,
    PAYLOAD_PARITY_LEN,
};

bitflags! {
    /// What went wrong with a decoded packet.
    #[derive(Default)]
    pub struct ErrorFlags: u8 {
        const BAD_HEADER = 1 << 0;
        const BAD_PAYLOAD = 1 << 1;
        const BAD_CRC = 1 << 2;
    }
}

impl std::fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "ok");
        }
        let names = [
            (Self::BAD_HEADER, "BAD HEADER"),
            (Self::BAD_PAYLOAD, "BAD PAYLOAD"),
            (Self::BAD_CRC, "BAD CRC"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Result of running one block through the FEC decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockStatus {
    /// Decoded, after fixing this many symbols.
    Corrected(usize),
    Uncorrectable,
}

impl BlockStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Corrected(_))
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Corrected(0) => write!(f, "clean"),
            Self::Corrected(n) => write!(f, "corrected {}", n),
            Self::Uncorrectable => write!(f, "uncorrectable"),
        }
    }
}

/// One frame from a capture, after error correction.
///
/// Header and payload are descrambled when their block decoded, and
/// left exactly as received otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodedPacket {
    index: usize,
    offset: usize,
    header: [u8; HEADER_LEN],
    header_parity: [u8; HEADER_PARITY_LEN],
    header_status: BlockStatus,
    payload: Vec<u8>,
    payload_parity: [u8; PAYLOAD_PARITY_LEN],
    payload_status: BlockStatus,
    encoded_checksum: [u8; CHECKSUM_LEN],
    checksum: u16,
    computed_checksum: u16,
    checksum_verified: bool,
    flags: ErrorFlags,
}

impl DecodedPacket {
    /// Frame number within the capture, counting dropped frames.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset of the frame's marker in the capture.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn header(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    pub fn header_parity(&self) -> &[u8; HEADER_PARITY_LEN] {
        &self.header_parity
    }

    pub fn header_status(&self) -> BlockStatus {
        self.header_status
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_parity(&self) -> &[u8; PAYLOAD_PARITY_LEN] {
        &self.payload_parity
    }

    pub fn payload_status(&self) -> BlockStatus {
        self.payload_status
    }

    pub fn encoded_checksum(&self) -> &[u8; CHECKSUM_LEN] {
        &self.encoded_checksum
    }

    /// The transmitted checksum, after nibble correction.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// The checksum of the payload as recovered.
    pub fn computed_checksum(&self) -> u16 {
        self.computed_checksum
    }

    pub fn checksum_verified(&self) -> bool {
        self.checksum_verified
    }

    pub fn flags(&self) -> ErrorFlags {
        self.flags
    }

    /// No flags raised.
    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
    }

    /// Interpret the header fields. Meaningless when the header was
    /// uncorrectable.
    pub fn header_fields(&self) -> Result<Il2pHeader, HeaderError> {
        Il2pHeader::parse(&self.header)
    }
}

/// Why a frame produced no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    /// Not enough bytes for the fixed fields.
    FrameTooShort(usize),
    /// A block the FEC decoder cannot even attempt.
    Fec(FecError),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::FrameTooShort(n) => write!(
                f,
                "frame of {} bytes is shorter than the {} byte minimum",
                n, MIN_FRAME_LEN
            ),
            Self::Fec(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DroppedFrame {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
    pub reason: DropReason,
}

/// Counts over a whole capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Summary {
    pub clean: usize,
    pub degraded: usize,
    pub dropped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.clean + self.degraded + self.dropped
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} frames: {} clean, {} degraded, {} dropped",
            self.total(),
            self.clean,
            self.degraded,
            self.dropped
        )
    }
}

/// Everything recovered from one capture, in capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CaptureReport {
    pub packets: Vec<DecodedPacket>,
    pub dropped: Vec<DroppedFrame>,
}

impl CaptureReport {
    pub fn summary(&self) -> Summary {
        let clean = self.packets.iter().filter(|p| p.is_clean()).count();
        Summary {
            clean,
            degraded: self.packets.len() - clean,
            dropped: self.dropped.len(),
        }
    }
}

/// Decodes IL2P captures.
#[derive(Debug, Clone)]
pub struct Il2pDecoder<C = CrcCcitt> {
    config: Il2pConfig<C>,
    header_fec: ReedSolomon,
    payload_fec: ReedSolomon,
}

impl Default for Il2pDecoder<CrcCcitt> {
    fn default() -> Self {
        Self::new(Il2pConfig::default())
    }
}

impl<C> Il2pDecoder<C>
where
    C: CrcStyle,
{
    pub fn new(config: Il2pConfig<C>) -> Self {
        Self {
            config,
            header_fec: ReedSolomon::new(IL2P_FEC, HEADER_PARITY_LEN),
            payload_fec: ReedSolomon::new(IL2P_FEC, PAYLOAD_PARITY_LEN),
        }
    }

    pub fn config(&self) -> &Il2pConfig<C> {
        &self.config
    }

    /// Find and decode every frame in a capture. Frames that cannot be
    /// taken apart are reported as dropped; the rest of the capture is
    /// still decoded.
    pub fn decode_capture(&self, capture: &[u8]) -> CaptureReport {
        let boundaries = locate_markers(capture, &self.config.marker);
        let mut report = CaptureReport::default();

        for span in frame_spans(&boundaries, self.config.marker.len(), capture.len()) {
            match self.decode_frame(span, span.slice(capture)) {
                Ok(packet) => report.packets.push(packet),
                Err(reason) => {
                    log::warn!("dropping frame {} at {}: {}", span.index, span.offset, reason);
                    report.dropped.push(DroppedFrame {
                        index: span.index,
                        offset: span.offset,
                        len: span.len(),
                        reason,
                    });
                }
            }
        }

        log::debug!("{}", report.summary());
        report
    }

    /// Decode the bytes following one marker.
    pub fn decode_frame(&self, span: FrameSpan, frame: &[u8]) -> Result<DecodedPacket, DropReason> {
        if frame.len() < MIN_FRAME_LEN {
            return Err(DropReason::FrameTooShort(frame.len()));
        }
        let payload_len = frame.len() - OVERHEAD_LEN;

        let (header_block, rest) = frame.split_at(HEADER_LEN + HEADER_PARITY_LEN);
        let (payload_block, rest) = rest.split_at(payload_len + PAYLOAD_PARITY_LEN);

        let mut flags = ErrorFlags::empty();

        let (header, header_status) =
            recover_block(&self.header_fec, header_block).map_err(DropReason::Fec)?;
        if !header_status.is_ok() {
            flags |= ErrorFlags::BAD_HEADER;
        }
        let (payload, payload_status) =
            recover_block(&self.payload_fec, payload_block).map_err(DropReason::Fec)?;
        if !payload_status.is_ok() {
            flags |= ErrorFlags::BAD_PAYLOAD;
        }

        let mut encoded_checksum = [0; CHECKSUM_LEN];
        encoded_checksum.copy_from_slice(&rest[..CHECKSUM_LEN]);
        let checksum = recover_checksum(encoded_checksum);
        let computed_checksum = self
            .config
            .crc
            .checksum(&[self.config.link_prefix.as_slice(), payload.as_slice()]);
        let checksum_verified = self.config.crc.validate(computed_checksum, checksum);
        if !checksum_verified {
            flags |= ErrorFlags::BAD_CRC;
        }

        log::debug!(
            "frame {} at {}: header {}, payload {} ({} bytes), crc {:04x}/{:04x}: {}",
            span.index,
            span.offset,
            header_status,
            payload_status,
            payload_len,
            checksum,
            computed_checksum,
            flags,
        );

        let mut header_out = [0; HEADER_LEN];
        header_out.copy_from_slice(&header);
        let mut header_parity = [0; HEADER_PARITY_LEN];
        header_parity.copy_from_slice(&header_block[HEADER_LEN..]);
        let mut payload_parity = [0; PAYLOAD_PARITY_LEN];
        payload_parity.copy_from_slice(&payload_block[payload_len..]);

        Ok(DecodedPacket {
            index: span.index,
            offset: span.offset,
            header: header_out,
            header_parity,
            header_status,
            payload,
            payload_parity,
            payload_status,
            encoded_checksum,
            checksum,
            computed_checksum,
            checksum_verified,
            flags,
        })
    }
}

/// Correct and descramble one block. An uncorrectable block comes back
/// raw, minus its parity; only a block the code cannot hold is an error.
fn recover_block(fec: &ReedSolomon, block: &[u8]) -> Result<(Vec<u8>, BlockStatus), FecError> {
    match fec.decode(block) {
        Ok((message, fixed)) => Ok((descramble(&message), BlockStatus::Corrected(fixed))),
        Err(FecError::Uncorrectable) => {
            let raw = block[..block.len() - fec.nsym()].to_vec();
            Ok((raw, BlockStatus::Uncorrectable))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::il2p::crc::CrcConstant;
    use crate::il2p::{Il2pEncoder, MARKER};

    fn decoder() -> Il2pDecoder {
        Il2pDecoder::default()
    }

    fn header() -> Il2pHeader {
        Il2pHeader::ui("CQ", "KK4HEJ", 0)
    }

    fn capture(payloads: &[&[u8]]) -> Vec<u8> {
        let encoder: Il2pEncoder = Il2pEncoder::default();
        encoder
            .encode_capture(&header(), payloads.iter().copied())
            .unwrap()
    }

    #[test]
    fn three_clean_frames() {
        let payloads: [&[u8]; 3] = [b"one", b"", b"the third payload"];
        let report = decoder().decode_capture(&capture(&payloads));

        assert!(report.dropped.is_empty());
        assert_eq!(report.packets.len(), 3);
        for (packet, payload) in report.packets.iter().zip(payloads) {
            assert!(packet.is_clean());
            assert_eq!(packet.payload(), payload);
            assert_eq!(packet.header_status(), BlockStatus::Corrected(0));
            assert_eq!(packet.payload_status(), BlockStatus::Corrected(0));
            assert!(packet.checksum_verified());
            let fields = packet.header_fields().unwrap();
            assert_eq!(fields.source, "KK4HEJ");
            assert_eq!(fields.count as usize, payload.len());
        }
        assert_eq!(report.packets[2].index(), 2);
        assert_eq!(
            report.summary(),
            Summary {
                clean: 3,
                degraded: 0,
                dropped: 0
            }
        );
    }

    #[test]
    fn payload_bit_flip_is_corrected() {
        let mut capture = capture(&[b"hello world".as_slice()]);
        capture[MARKER.len() + HEADER_LEN + HEADER_PARITY_LEN + 3] ^= 0x10;

        let report = decoder().decode_capture(&capture);
        let packet = &report.packets[0];
        assert_eq!(packet.payload(), b"hello world");
        assert_eq!(packet.payload_status(), BlockStatus::Corrected(1));
        assert!(packet.checksum_verified());
        assert!(packet.flags().is_empty());
    }

    #[test]
    fn header_bit_flip_is_corrected() {
        let mut capture = capture(&[b"hello world".as_slice()]);
        capture[MARKER.len() + 5] ^= 0x80;

        let report = decoder().decode_capture(&capture);
        let packet = &report.packets[0];
        assert_eq!(packet.header_status(), BlockStatus::Corrected(1));
        assert_eq!(packet.header_fields().unwrap().destination, "CQ");
        assert!(packet.is_clean());
    }

    #[test]
    fn short_frame_dropped() {
        let mut capture = MARKER.to_vec();
        capture.extend([0x55; 10]);
        capture.extend(self::capture(&[b"after".as_slice()]));

        let report = decoder().decode_capture(&capture);
        assert_eq!(
            report.dropped,
            [DroppedFrame {
                index: 0,
                offset: 0,
                len: 10,
                reason: DropReason::FrameTooShort(10),
            }]
        );
        assert_eq!(report.packets.len(), 1);
        assert_eq!(report.packets[0].index(), 1);
        assert_eq!(report.packets[0].offset(), 14);
        assert_eq!(report.summary().dropped, 1);
        assert_eq!(report.summary().clean, 1);
    }

    #[test]
    fn oversized_frame_dropped() {
        let mut capture = MARKER.to_vec();
        capture.extend([0x00; 300]);

        let report = decoder().decode_capture(&capture);
        assert!(report.packets.is_empty());
        assert_eq!(
            report.dropped[0].reason,
            DropReason::Fec(FecError::BlockTooLong(300 - OVERHEAD_LEN + PAYLOAD_PARITY_LEN))
        );
    }

    #[test]
    fn bad_crc() {
        let encoder = Il2pEncoder::new(Il2pConfig::with_crc(CrcConstant(0x1234)));
        let capture = encoder.encode_capture(&header(), [b"hello".as_slice()]).unwrap();

        let report = decoder().decode_capture(&capture);
        let packet = &report.packets[0];
        assert_eq!(packet.payload(), b"hello");
        assert_eq!(packet.checksum(), 0x1234);
        assert_eq!(packet.computed_checksum(), 0x32ad);
        assert!(!packet.checksum_verified());
        assert_eq!(packet.flags(), ErrorFlags::BAD_CRC);
        assert_eq!(report.summary().degraded, 1);
    }

    #[test]
    fn bad_header() {
        let clean = capture(&[b"payload".as_slice()]);
        let fec = ReedSolomon::new(IL2P_FEC, HEADER_PARITY_LEN);
        let block = MARKER.len()..MARKER.len() + HEADER_LEN + HEADER_PARITY_LEN;

        // two damaged symbols are usually past locating, pick a pattern
        // that is
        let damaged = (1..=255u8)
            .map(|x| {
                let mut c = clean.clone();
                c[block.start] ^= x;
                c[block.start + 7] ^= 0x5a;
                c
            })
            .find(|c| !fec.check(&c[block.clone()]))
            .unwrap();

        let report = decoder().decode_capture(&damaged);
        let packet = &report.packets[0];
        assert_eq!(packet.flags(), ErrorFlags::BAD_HEADER);
        assert_eq!(packet.header_status(), BlockStatus::Uncorrectable);
        assert_eq!(&packet.header()[..], &damaged[block.start..block.start + HEADER_LEN]);
        assert_eq!(packet.payload(), b"payload");
    }

    #[test]
    fn bad_payload_left_raw() {
        let mut capture = capture(&[b"some payload bytes".as_slice()]);
        let start = MARKER.len() + HEADER_LEN + HEADER_PARITY_LEN;
        // far past what 16 parity symbols can locate
        for b in &mut capture[start..start + 18] {
            *b ^= 0xff;
        }

        let report = decoder().decode_capture(&capture);
        let packet = &report.packets[0];
        assert!(packet.flags().contains(ErrorFlags::BAD_PAYLOAD));
        assert!(packet.flags().contains(ErrorFlags::BAD_CRC));
        assert_eq!(packet.payload(), &capture[start..start + 18]);
    }

    #[test]
    fn ignored_crc() {
        use crate::il2p::crc::{CrcConstantIgnore, CrcEither};

        let encoder = Il2pEncoder::new(Il2pConfig::with_crc(CrcConstant(0x1234)));
        let capture = encoder.encode_capture(&header(), [b"hello".as_slice()]).unwrap();

        let lax: CrcEither<CrcCcitt, _> = CrcEither::Right(CrcConstantIgnore(0));
        let report = Il2pDecoder::new(Il2pConfig::with_crc(lax)).decode_capture(&capture);
        assert!(report.packets[0].is_clean());
    }

    #[test]
    fn flags_display() {
        assert_eq!(ErrorFlags::empty().to_string(), "ok");
        assert_eq!(
            (ErrorFlags::BAD_HEADER | ErrorFlags::BAD_CRC).to_string(),
            "BAD HEADER, BAD CRC"
        );
    }
}
