//! Building IL2P frames, for transmit and for synthetic captures.

use super::checksum::encode_checksum;
use super::crc::{CrcCcitt, CrcStyle};
use super::header::{HeaderError, Il2pHeader};
use super::rs::{FecError, ReedSolomon, IL2P_FEC};
use super::scramble::scramble;
use super::{Il2pConfig, HEADER_PARITY_LEN, MAX_PAYLOAD_LEN, OVERHEAD_LEN, PAYLOAD_PARITY_LEN};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    PayloadTooLong(usize),
    Header(HeaderError),
    Fec(FecError),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PayloadTooLong(n) => write!(
                f,
                "payload of {} bytes exceeds the {} byte maximum",
                n, MAX_PAYLOAD_LEN
            ),
            Self::Header(e) => write!(f, "bad header: {}", e),
            Self::Fec(e) => write!(f, "parity: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Header(e) => Some(e),
            Self::Fec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeaderError> for EncodeError {
    fn from(value: HeaderError) -> Self {
        Self::Header(value)
    }
}

impl From<FecError> for EncodeError {
    fn from(value: FecError) -> Self {
        Self::Fec(value)
    }
}

/// Builds IL2P frames.
#[derive(Debug, Clone)]
pub struct Il2pEncoder<C = CrcCcitt> {
    config: Il2pConfig<C>,
    header_fec: ReedSolomon,
    payload_fec: ReedSolomon,
}

impl Default for Il2pEncoder<CrcCcitt> {
    fn default() -> Self {
        Self::new(Il2pConfig::default())
    }
}

impl<C> Il2pEncoder<C>
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

    /// Build one frame, without the marker. The header's byte count is
    /// taken from the payload.
    pub fn encode_frame(&self, header: &Il2pHeader, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLong(payload.len()));
        }
        let header = Il2pHeader {
            count: payload.len() as u16,
            ..header.clone()
        };

        let mut out = Vec::with_capacity(OVERHEAD_LEN + payload.len());

        let scrambled = scramble(&header.to_bytes()?);
        out.extend(&scrambled);
        out.extend(self.header_fec.encode(&scrambled)?);

        let scrambled = scramble(payload);
        out.extend(&scrambled);
        out.extend(self.payload_fec.encode(&scrambled)?);

        let crc = self
            .config
            .crc
            .checksum(&[self.config.link_prefix.as_slice(), payload]);
        out.extend(encode_checksum(crc));
        out.push(self.config.trailer);

        Ok(out)
    }

    /// Build a capture: each payload as a frame behind a marker.
    pub fn encode_capture<'a, I>(&self, header: &Il2pHeader, payloads: I) -> Result<Vec<u8>, EncodeError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut out = Vec::new();
        for payload in payloads {
            out.extend(&self.config.marker);
            out.extend(self.encode_frame(header, payload)?);
        }
        Ok(out)
    }
}
