/// Generic CRC style, for checking recovered payloads.
pub trait CrcStyle {
    type Digest<'a>: CrcDigest
    where
        Self: 'a;

    fn digest<'a>(&'a self) -> Self::Digest<'a>;

    fn validate(&self, calculated: u16, provided: u16) -> bool {
        calculated == provided
    }

    /// Run a digest over several slices, as if concatenated.
    fn checksum(&self, parts: &[&[u8]]) -> u16 {
        let mut digest = self.digest();
        for part in parts {
            digest.update(part);
        }
        digest.finalize()
    }
}

/// Interface for a CRC digest.
pub trait CrcDigest {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self) -> u16;
}

impl<C> CrcStyle for &C
where
    C: CrcStyle,
{
    type Digest<'a> = C::Digest<'a> where Self: 'a;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        (*self).digest()
    }

    fn validate(&self, calculated: u16, provided: u16) -> bool {
        (*self).validate(calculated, provided)
    }
}

/// A CRC that is one of two possible implementations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CrcEither<A, B> {
    Left(A),
    Right(B),
}

impl<A, B> CrcStyle for CrcEither<A, B>
where
    A: CrcStyle,
    B: CrcStyle,
{
    type Digest<'a> = CrcEither<A::Digest<'a>, B::Digest<'a>> where Self: 'a;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        match self {
            Self::Left(a) => Self::Digest::Left(a.digest()),
            Self::Right(b) => Self::Digest::Right(b.digest()),
        }
    }

    fn validate(&self, calculated: u16, provided: u16) -> bool {
        match self {
            Self::Left(a) => a.validate(calculated, provided),
            Self::Right(b) => b.validate(calculated, provided),
        }
    }
}

impl<A, B> CrcDigest for CrcEither<A, B>
where
    A: CrcDigest,
    B: CrcDigest,
{
    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Left(a) => a.update(bytes),
            Self::Right(b) => b.update(bytes),
        }
    }

    fn finalize(self) -> u16 {
        match self {
            Self::Left(a) => a.finalize(),
            Self::Right(b) => b.finalize(),
        }
    }
}

/// A CRC that is always a specific given value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrcConstant(pub u16);

impl CrcStyle for CrcConstant {
    type Digest<'a> = CrcConstant;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcConstant(self.0)
    }
}

impl CrcDigest for CrcConstant {
    fn update(&mut self, _bytes: &[u8]) {}

    fn finalize(self) -> u16 {
        self.0
    }
}

/// A CRC that is always a specific given value, and always validates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrcConstantIgnore(pub u16);

impl CrcStyle for CrcConstantIgnore {
    type Digest<'a> = CrcConstant;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcConstant(self.0)
    }

    fn validate(&self, _calculated: u16, _provided: u16) -> bool {
        true
    }
}

/// The CRC-16/CCITT variant IL2P uses: polynomial 0x1021, initial
/// register 0xffff, no reflection, no final xor.
pub static CCITT: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);

/// A 16-bit CCITT CRC, used over link prefix and payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CrcCcitt;

/// A 16-bit CCITT CRC digest struct.
#[derive(Clone)]
pub struct CrcCcittDigest<'a>(crc::Digest<'a, u16, crc::Table<1>>);

impl CrcCcitt {
    pub fn new() -> Self {
        Self
    }
}

impl CrcStyle for CrcCcitt {
    type Digest<'a> = CrcCcittDigest<'a>;

    fn digest<'a>(&'a self) -> Self::Digest<'a> {
        CrcCcittDigest(CCITT.digest())
    }
}

impl<'a> CrcDigest for CrcCcittDigest<'a> {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes)
    }

    fn finalize(self) -> u16 {
        self.0.finalize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ccitt_check_value() {
        assert_eq!(CrcCcitt::new().checksum(&[b"123456789".as_slice()]), 0x29b1);
    }

    #[test]
    fn parts_concatenate() {
        let crc = CrcCcitt::new();
        assert_eq!(
            crc.checksum(&[b"1234".as_slice(), b"".as_slice(), b"56789".as_slice()]),
            crc.checksum(&[b"123456789".as_slice()])
        );
    }

    #[test]
    fn either_and_ignore() {
        let strict: CrcEither<CrcCcitt, CrcConstantIgnore> = CrcEither::Left(CrcCcitt::new());
        let lax: CrcEither<CrcCcitt, CrcConstantIgnore> =
            CrcEither::Right(CrcConstantIgnore(0xffff));

        assert_eq!(strict.checksum(&[b"123456789".as_slice()]), 0x29b1);
        assert!(!strict.validate(0x29b1, 0x29b2));
        assert_eq!(lax.checksum(&[b"123456789".as_slice()]), 0xffff);
        assert!(lax.validate(0x29b1, 0x29b2));
        assert!((&lax).validate(0, 1));
    }

    #[test]
    fn constant() {
        assert_eq!(CrcConstant(0xcafe).checksum(&[b"anything".as_slice()]), 0xcafe);
    }
}
