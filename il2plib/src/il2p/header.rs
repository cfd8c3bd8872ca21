//! IL2P type-1 header fields.
//!
//! The 13 header bytes pack two callsigns as six-bit characters in bits
//! 0-5 of bytes 0-11. The remaining bits 6 and 7 of those bytes carry
//! the flag fields, and byte 12 holds both SSIDs.

use super::HEADER_LEN;

/// Longest callsign that fits in a header.
pub const CALLSIGN_LEN: usize = 6;

/// Largest payload byte count the header can describe.
pub const MAX_COUNT: u16 = 0x3ff;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    WrongLength(usize),
    CallsignTooLong(usize),
    InvalidCallsignChar(char),
    SsidOutOfRange(u8),
    PidOutOfRange(u8),
    ControlOutOfRange(u8),
    CountOutOfRange(u16),
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::WrongLength(n) => write!(f, "header is {} bytes, expected {}", n, HEADER_LEN),
            Self::CallsignTooLong(n) => {
                write!(f, "callsign has {} characters, max {}", n, CALLSIGN_LEN)
            }
            Self::InvalidCallsignChar(c) => write!(f, "cannot encode {:?} in a callsign", c),
            Self::SsidOutOfRange(s) => write!(f, "SSID {} out of range", s),
            Self::PidOutOfRange(p) => write!(f, "PID 0x{:x} out of range", p),
            Self::ControlOutOfRange(c) => write!(f, "control 0x{:x} out of range", c),
            Self::CountOutOfRange(n) => write!(f, "payload count {} out of range", n),
        }
    }
}

impl std::error::Error for HeaderError {}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Il2pHeader {
    pub destination: String,
    pub destination_ssid: u8,
    pub source: String,
    pub source_ssid: u8,
    pub ui: bool,
    /// 4 bits.
    pub pid: u8,
    /// 7 bits.
    pub control: u8,
    pub max_fec: bool,
    /// Header type bit: 1 for translated AX.25 headers.
    pub header_type: u8,
    /// Payload byte count, 10 bits.
    pub count: u16,
}

impl Il2pHeader {
    /// A UI frame header, as used for beacons and telemetry.
    pub fn ui(destination: &str, source: &str, count: u16) -> Self {
        Self {
            destination: destination.to_owned(),
            destination_ssid: 0,
            source: source.to_owned(),
            source_ssid: 0,
            ui: true,
            pid: 0xf,
            control: 0,
            max_fec: false,
            header_type: 1,
            count,
        }
    }

    /// Read fields from a descrambled header. Every bit pattern is a
    /// valid header, so only the length can be wrong.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        let bytes: &[u8; HEADER_LEN] = bytes
            .try_into()
            .map_err(|_| HeaderError::WrongLength(bytes.len()))?;

        let bit = |i: usize, b: u8| (bytes[i] >> b) & 1;
        let gather = |range: std::ops::Range<usize>, b: u8| {
            range.fold(0u16, |acc, i| (acc << 1) | bit(i, b) as u16)
        };

        Ok(Self {
            destination: decode_callsign(&bytes[0..6]),
            destination_ssid: bytes[12] >> 4,
            source: decode_callsign(&bytes[6..12]),
            source_ssid: bytes[12] & 0xf,
            ui: bit(0, 6) != 0,
            pid: gather(1..5, 6) as u8,
            control: gather(5..12, 6) as u8,
            max_fec: bit(0, 7) != 0,
            header_type: bit(1, 7),
            count: gather(2..12, 7),
        })
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN], HeaderError> {
        if self.destination_ssid > 0xf {
            return Err(HeaderError::SsidOutOfRange(self.destination_ssid));
        }
        if self.source_ssid > 0xf {
            return Err(HeaderError::SsidOutOfRange(self.source_ssid));
        }
        if self.pid > 0xf {
            return Err(HeaderError::PidOutOfRange(self.pid));
        }
        if self.control > 0x7f {
            return Err(HeaderError::ControlOutOfRange(self.control));
        }
        if self.count > MAX_COUNT {
            return Err(HeaderError::CountOutOfRange(self.count));
        }

        let mut out = [0u8; HEADER_LEN];
        out[0..6].copy_from_slice(&encode_callsign(&self.destination)?);
        out[6..12].copy_from_slice(&encode_callsign(&self.source)?);
        out[12] = (self.destination_ssid << 4) | self.source_ssid;

        let mut scatter = |range: std::ops::Range<usize>, b: u8, value: u16| {
            let width = range.len();
            for (k, i) in range.enumerate() {
                out[i] |= (((value >> (width - 1 - k)) & 1) as u8) << b;
            }
        };
        scatter(0..1, 6, self.ui as u16);
        scatter(1..5, 6, self.pid as u16);
        scatter(5..12, 6, self.control as u16);
        scatter(0..1, 7, self.max_fec as u16);
        scatter(1..2, 7, (self.header_type & 1) as u16);
        scatter(2..12, 7, self.count);

        Ok(out)
    }
}

impl std::fmt::Display for Il2pHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}-{} > {}-{} ui={} pid=0x{:x} ctl=0x{:02x} count={}",
            self.source,
            self.source_ssid,
            self.destination,
            self.destination_ssid,
            self.ui as u8,
            self.pid,
            self.control,
            self.count,
        )
    }
}

fn decode_callsign(bytes: &[u8]) -> String {
    let s: String = bytes
        .iter()
        .map(|b| ((b & 0x3f) + 0x20) as char)
        .collect();
    s.trim_end_matches(' ').to_owned()
}

fn encode_callsign(call: &str) -> Result<[u8; CALLSIGN_LEN], HeaderError> {
    let n = call.chars().count();
    if n > CALLSIGN_LEN {
        return Err(HeaderError::CallsignTooLong(n));
    }

    let mut out = [0u8; CALLSIGN_LEN];
    for (o, c) in out.iter_mut().zip(call.chars().chain(std::iter::repeat(' '))) {
        let c = c.to_ascii_uppercase();
        if !(' '..='_').contains(&c) {
            return Err(HeaderError::InvalidCallsignChar(c));
        }
        *o = c as u8 - 0x20;
    }
    Ok(out)
}
