//! KISS byte-stuffing frame codec.
//!
//! Every frame on the serial link is `FEND address payload FEND`, with
//! `FEND` and `FESC` inside the payload escaped as two-byte sequences.
//! The address byte is sent as-is.

/// Frame delimiter.
pub const FEND: u8 = 0xc0;
/// Escape byte.
pub const FESC: u8 = 0xdb;
/// Escaped `FEND`, after `FESC`.
pub const TFEND: u8 = 0xdc;
/// Escaped `FESC`, after `FESC`.
pub const TFESC: u8 = 0xdd;

/// Largest unescaped payload [KissDecoder] will accumulate.
pub const MAX_FRAME_LEN: usize = 0x400;

/// Re-export to allow using [KissReader] with [std::io] streams.
pub use embedded_io_adapters::std::FromStd;

/// A KISS protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KissError {
    /// Input ended, or the frame closed, right after `FESC`.
    IncompleteEscape,
    /// `FESC` followed by something other than `TFEND` or `TFESC`.
    InvalidEscape(u8),
    /// A bare `FEND` inside escaped data.
    UnexpectedFrameEnd,
    /// The frame grew past [MAX_FRAME_LEN].
    FrameTooLong,
}

impl std::error::Error for KissError {}

impl core::fmt::Display for KissError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::IncompleteEscape => write!(f, "frame ended in the middle of an escape"),
            Self::InvalidEscape(b) => write!(f, "invalid escape sequence {:02x} {:02x}", FESC, b),
            Self::UnexpectedFrameEnd => write!(f, "unescaped frame delimiter inside data"),
            Self::FrameTooLong => write!(f, "frame longer than {} bytes", MAX_FRAME_LEN),
        }
    }
}

/// Escape a payload. The result never contains a bare `FEND` or `FESC`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8 + 2);
    encode_into(data, &mut out);
    out
}

fn encode_into(data: &[u8], out: &mut Vec<u8>) {
    for &b in data {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            _ => out.push(b),
        }
    }
}

/// Undo [encode].
pub fn decode(data: &[u8]) -> Result<Vec<u8>, KissError> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            FESC => out.push(unescape(bytes.next().ok_or(KissError::IncompleteEscape)?)?),
            FEND => return Err(KissError::UnexpectedFrameEnd),
            _ => out.push(b),
        }
    }
    Ok(out)
}

fn unescape(b: u8) -> Result<u8, KissError> {
    match b {
        TFEND => Ok(FEND),
        TFESC => Ok(FESC),
        FEND => Err(KissError::IncompleteEscape),
        other => Err(KissError::InvalidEscape(other)),
    }
}

/// Build a complete frame: `FEND address escaped-payload FEND`.
pub fn frame(address: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 8 + 3);
    out.push(FEND);
    out.push(address);
    encode_into(payload, &mut out);
    out.push(FEND);
    out
}

/// One received frame.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KissFrame {
    /// The byte after the opening `FEND`.
    pub address: u8,
    /// The unescaped payload.
    pub payload: Vec<u8>,
}

impl KissFrame {
    /// Serialize this frame back onto the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.address, &self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum State {
    /// Waiting for a `FEND`. Everything else is line noise.
    Hunt,
    /// Saw `FEND`, next byte is the address.
    Address,
    /// Inside the payload.
    Data,
    /// Inside the payload, just saw `FESC`.
    Escape,
}

/// Incremental frame decoder, fed one byte at a time in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KissDecoder {
    state: State,
    address: u8,
    payload: Vec<u8>,
}

impl Default for KissDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KissDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Hunt,
            address: 0,
            payload: Vec::new(),
        }
    }

    /// Returns [true] if a frame has been opened but not yet closed.
    pub fn in_frame(&self) -> bool {
        matches!(self.state, State::Data | State::Escape)
    }

    /// Drop any partial frame and wait for the next `FEND`.
    pub fn reset(&mut self) {
        self.state = State::Hunt;
        self.payload.clear();
    }

    /// Feed one byte. Returns a frame when this byte closes one.
    ///
    /// On error the partial frame is gone and the decoder has already
    /// resynchronized, so the caller may keep feeding bytes.
    pub fn feed(&mut self, b: u8) -> Result<Option<KissFrame>, KissError> {
        match self.state {
            State::Hunt => {
                if b == FEND {
                    self.state = State::Address;
                }
            }
            State::Address => {
                // repeated FENDs are just idle fill
                if b != FEND {
                    self.address = b;
                    self.payload.clear();
                    self.state = State::Data;
                }
            }
            State::Data => match b {
                FEND => {
                    // the closing FEND may also open the next frame
                    self.state = State::Address;
                    return Ok(Some(KissFrame {
                        address: self.address,
                        payload: core::mem::take(&mut self.payload),
                    }));
                }
                FESC => self.state = State::Escape,
                _ => return self.push(b),
            },
            State::Escape => match unescape(b) {
                Ok(v) => {
                    self.state = State::Data;
                    return self.push(v);
                }
                Err(e) => {
                    self.payload.clear();
                    // a FEND here still marks a frame boundary
                    self.state = if b == FEND {
                        State::Address
                    } else {
                        State::Hunt
                    };
                    return Err(e);
                }
            },
        }
        Ok(None)
    }

    fn push(&mut self, b: u8) -> Result<Option<KissFrame>, KissError> {
        if self.payload.len() >= MAX_FRAME_LEN {
            self.reset();
            return Err(KissError::FrameTooLong);
        }
        self.payload.push(b);
        Ok(None)
    }
}

/// An error type for [KissReader].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReaderError<E> {
    /// The stream contained a malformed frame, which was skipped.
    Kiss(KissError),
    /// IO error in underlying stream.
    Io(E),
}

impl<E> std::error::Error for ReaderError<E> where E: core::fmt::Debug {}

impl<E> core::fmt::Display for ReaderError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Kiss(e) => write!(f, "kiss error: {}", e),
            Self::Io(e) => write!(f, "io error: {:?}", e),
        }
    }
}

impl<E> From<KissError> for ReaderError<E> {
    fn from(other: KissError) -> Self {
        Self::Kiss(other)
    }
}

/// Pulls frames out of a blocking byte stream.
#[derive(Debug)]
pub struct KissReader<R> {
    port: R,
    decoder: KissDecoder,
    buffer: [u8; 256],
    pos: usize,
    len: usize,
}

impl<R> KissReader<FromStd<R>>
where
    R: std::io::Read,
{
    /// Create a reader over an [std::io::Read] stream.
    pub fn new_std(port: R) -> Self {
        Self::new(FromStd::new(port))
    }
}

impl<R> KissReader<R> {
    pub fn new(port: R) -> Self {
        Self {
            port,
            decoder: KissDecoder::new(),
            buffer: [0; 256],
            pos: 0,
            len: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.port
    }
}

impl<R> KissReader<R>
where
    R: embedded_io::Read,
{
    /// Block until a frame arrives. Returns `Ok(None)` at end of stream,
    /// discarding any unterminated frame.
    ///
    /// A [ReaderError::Kiss] is not fatal: call again to continue with
    /// the next frame.
    pub fn read_frame(&mut self) -> Result<Option<KissFrame>, ReaderError<R::Error>> {
        loop {
            if self.pos >= self.len {
                self.pos = 0;
                self.len = self.port.read(&mut self.buffer).map_err(ReaderError::Io)?;
                if self.len == 0 {
                    if self.decoder.in_frame() {
                        log::debug!("stream ended inside a frame, dropping it");
                    }
                    self.decoder.reset();
                    return Ok(None);
                }
            }

            let b = self.buffer[self.pos];
            self.pos += 1;
            match self.decoder.feed(b) {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("discarding malformed frame: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
}
