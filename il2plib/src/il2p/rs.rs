//! Systematic Reed-Solomon block code over GF(2^8).
//!
//! Codewords are `message | parity`, with `message[0]` the highest
//! degree coefficient. Codes are shortened: any codeword length up to
//! 255 symbols works with the same generator polynomial.
//!
//! A received block with more than `nsym / 2` symbol errors is usually
//! reported as [FecError::Uncorrectable], but some such patterns land
//! within the radius of a *different* codeword and decode "successfully"
//! to the wrong data. Nothing at this layer can detect that; the IL2P
//! CRC is what catches it.

/// Field size minus one, the longest possible codeword.
pub const MAX_BLOCK_LEN: usize = 255;

/// Parameters that must match between encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FecParams {
    /// Field generator polynomial, including the x^8 term.
    pub prim_poly: u16,
    /// First consecutive root of the generator polynomial, in index form.
    pub fcr: u8,
    /// Primitive element the roots are powers of.
    pub generator: u8,
}

/// GF(2^8)/0x11D, fcr 0, roots powers of alpha = 2.
pub const IL2P_FEC: FecParams = FecParams {
    prim_poly: 0x11d,
    fcr: 0,
    generator: 2,
};

/// A failed decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FecError {
    /// More symbol errors than the code can locate.
    Uncorrectable,
    /// Block is longer than [MAX_BLOCK_LEN].
    BlockTooLong(usize),
    /// Block does not even hold the parity symbols.
    BlockTooShort(usize),
}

impl std::error::Error for FecError {}

impl core::fmt::Display for FecError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Uncorrectable => write!(f, "too many symbol errors to correct"),
            Self::BlockTooLong(n) => write!(
                f,
                "block of {} symbols exceeds the {} symbol maximum",
                n, MAX_BLOCK_LEN
            ),
            Self::BlockTooShort(n) => write!(f, "block of {} symbols is shorter than its parity", n),
        }
    }
}

/// Log/antilog tables for GF(2^8).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GaloisField {
    // doubled so products of two logs index directly
    exp: [u8; 512],
    log: [u8; 256],
}

impl core::fmt::Debug for GaloisField {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("GaloisField").finish_non_exhaustive()
    }
}

impl GaloisField {
    /// Build tables for the field generated by `prim_poly`, which must
    /// be primitive with alpha = 2.
    pub const fn new(prim_poly: u16) -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];

        let mut x: u16 = 1;
        let mut i = 0;
        while i < 255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= prim_poly;
            }
            i += 1;
        }
        while i < 512 {
            exp[i] = exp[i - 255];
            i += 1;
        }

        Self { exp, log }
    }

    /// alpha^`power`, for any non-negative power.
    pub fn exp(&self, power: usize) -> u8 {
        self.exp[power % 255]
    }

    /// Discrete log of a non-zero element.
    pub fn log(&self, a: u8) -> usize {
        debug_assert!(a != 0, "log of zero");
        self.log[a as usize] as usize
    }

    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log(a) + self.log(b)]
    }

    pub fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "division by zero");
        if a == 0 {
            return 0;
        }
        self.exp[self.log(a) + 255 - self.log(b)]
    }

    pub fn inv(&self, a: u8) -> u8 {
        self.exp[255 - self.log(a)]
    }

    /// Evaluate a polynomial stored highest degree first.
    fn eval_high_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }

    /// Evaluate a polynomial stored lowest degree first.
    fn eval_low_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}

/// Field tables for [IL2P_FEC], built at compile time.
pub static IL2P_FIELD: GaloisField = GaloisField::new(IL2P_FEC.prim_poly);

/// Error positions found in a received block.
struct Located {
    syndromes: Vec<u8>,
    /// Error locator, lowest degree first.
    locator: Vec<u8>,
    /// Byte indices into the block.
    positions: Vec<usize>,
}

/// A Reed-Solomon code with a fixed number of parity symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReedSolomon {
    field: GaloisField,
    params: FecParams,
    /// log of the generator element
    gen_log: usize,
    /// Generator polynomial, highest degree first.
    genpoly: Vec<u8>,
}

impl ReedSolomon {
    /// Create a code with `nsym` parity symbols.
    pub fn new(params: FecParams, nsym: usize) -> Self {
        assert!(
            nsym > 0 && nsym < MAX_BLOCK_LEN,
            "invalid parity length {}",
            nsym
        );
        let field = if params.prim_poly == IL2P_FEC.prim_poly {
            IL2P_FIELD.clone()
        } else {
            GaloisField::new(params.prim_poly)
        };
        let gen_log = field.log(params.generator);

        // g(x) = prod (x - root_i)
        let mut genpoly = vec![1u8];
        for i in 0..nsym {
            let root = field.exp(gen_log * (params.fcr as usize + i));
            let mut next = vec![0u8; genpoly.len() + 1];
            for (j, &c) in genpoly.iter().enumerate() {
                next[j] ^= c;
                next[j + 1] ^= field.mul(c, root);
            }
            genpoly = next;
        }

        Self {
            field,
            params,
            gen_log,
            genpoly,
        }
    }

    /// Number of parity symbols.
    pub fn nsym(&self) -> usize {
        self.genpoly.len() - 1
    }

    /// Most symbol errors guaranteed to be corrected.
    pub fn max_corrections(&self) -> usize {
        self.nsym() / 2
    }

    pub fn params(&self) -> FecParams {
        self.params
    }

    fn root(&self, i: usize) -> u8 {
        self.field.exp(self.gen_log * (self.params.fcr as usize + i))
    }

    /// Compute the parity symbols for `message`.
    pub fn encode(&self, message: &[u8]) -> Result<Vec<u8>, FecError> {
        let nsym = self.nsym();
        if message.len() + nsym > MAX_BLOCK_LEN {
            return Err(FecError::BlockTooLong(message.len() + nsym));
        }

        // remainder of message * x^nsym divided by g(x)
        let mut remainder = vec![0u8; nsym];
        for &b in message {
            let feedback = b ^ remainder[0];
            remainder.rotate_left(1);
            remainder[nsym - 1] = 0;
            if feedback != 0 {
                for (r, &g) in remainder.iter_mut().zip(&self.genpoly[1..]) {
                    *r ^= self.field.mul(feedback, g);
                }
            }
        }
        Ok(remainder)
    }

    fn validate_len(&self, received: &[u8]) -> Result<(), FecError> {
        if received.len() > MAX_BLOCK_LEN {
            return Err(FecError::BlockTooLong(received.len()));
        }
        if received.len() < self.nsym() {
            return Err(FecError::BlockTooShort(received.len()));
        }
        Ok(())
    }

    fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        (0..self.nsym())
            .map(|i| self.field.eval_high_first(received, self.root(i)))
            .collect()
    }

    /// Berlekamp-Massey. Returns the error locator, lowest degree first.
    fn berlekamp_massey(&self, syndromes: &[u8]) -> Vec<u8> {
        let n = syndromes.len();
        let mut c = vec![0u8; n + 1];
        let mut b = vec![0u8; n + 1];
        c[0] = 1;
        b[0] = 1;

        let mut l = 0;
        let mut m = 1;
        let mut last = 1u8;

        for k in 0..n {
            let mut d = syndromes[k];
            for i in 1..=l {
                d ^= self.field.mul(c[i], syndromes[k - i]);
            }

            if d == 0 {
                m += 1;
                continue;
            }

            let coeff = self.field.div(d, last);
            let prev = c.clone();
            for i in 0..=n - m {
                c[i + m] ^= self.field.mul(coeff, b[i]);
            }

            if 2 * l <= k {
                l = k + 1 - l;
                b = prev;
                last = d;
                m = 1;
            } else {
                m += 1;
            }
        }

        c.truncate(l + 1);
        c
    }

    fn locate(&self, received: &[u8]) -> Result<Located, FecError> {
        self.validate_len(received)?;

        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(Located {
                syndromes,
                locator: vec![1],
                positions: Vec::new(),
            });
        }

        let locator = self.berlekamp_massey(&syndromes);
        let errors = locator.len() - 1;
        if errors > self.max_corrections() {
            return Err(FecError::Uncorrectable);
        }

        // Chien search, only over positions that exist in a shortened block
        let n = received.len();
        let positions = (0..n)
            .filter(|&j| {
                let x = self.field.exp(self.gen_log * (n - 1 - j));
                self.field.eval_low_first(&locator, self.field.inv(x)) == 0
            })
            .collect::<Vec<_>>();

        if positions.len() != errors {
            return Err(FecError::Uncorrectable);
        }

        Ok(Located {
            syndromes,
            locator,
            positions,
        })
    }

    /// Returns [true] if `received` (message then parity) has no errors,
    /// or few enough that [ReedSolomon::decode] can correct them.
    pub fn check(&self, received: &[u8]) -> bool {
        self.locate(received).is_ok()
    }

    /// Correct `received` (message then parity). Returns the corrected
    /// message and the number of symbols that were fixed, including any
    /// in the parity.
    pub fn decode(&self, received: &[u8]) -> Result<(Vec<u8>, usize), FecError> {
        let Located {
            syndromes,
            locator,
            positions,
        } = self.locate(received)?;

        let message_len = received.len() - self.nsym();
        let mut block = received.to_vec();
        if positions.is_empty() {
            block.truncate(message_len);
            return Ok((block, 0));
        }

        // Forney: omega(x) = S(x) * lambda(x) mod x^nsym
        let nsym = self.nsym();
        let mut omega = vec![0u8; nsym];
        for (i, o) in omega.iter_mut().enumerate() {
            for (j, &l) in locator.iter().enumerate().take(i + 1) {
                *o ^= self.field.mul(l, syndromes[i - j]);
            }
        }

        // formal derivative keeps the odd terms
        let derivative = locator
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| if i % 2 == 1 { c } else { 0 })
            .collect::<Vec<_>>();

        let n = block.len();
        let fcr = self.params.fcr as usize;
        for &pos in positions.iter() {
            let power = self.gen_log * (n - 1 - pos);
            let x_inv = self.field.inv(self.field.exp(power));
            let denom = self.field.eval_low_first(&derivative, x_inv);
            if denom == 0 {
                return Err(FecError::Uncorrectable);
            }
            let num = self.field.eval_low_first(&omega, x_inv);
            // X^(1 - fcr), kept non-negative
            let scale = self.field.exp(power * (255 + 1 - fcr % 255));
            block[pos] ^= self.field.mul(scale, self.field.div(num, denom));
        }

        if self.syndromes(&block).iter().any(|&s| s != 0) {
            return Err(FecError::Uncorrectable);
        }

        log::trace!("corrected symbols at {:?}", positions);
        block.truncate(message_len);
        Ok((block, positions.len()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::rngs::StdRng;
    use rand::seq::index::sample;
    use rand::{Rng, SeedableRng};

    /// A message plus a set of corruptions to apply to its codeword.
    #[derive(Debug, Clone)]
    struct Damaged {
        message: Vec<u8>,
        errors: Vec<(usize, u8)>,
        nsym: usize,
    }

    impl Arbitrary for Damaged {
        fn arbitrary(g: &mut Gen) -> Self {
            let nsym = *g.choose(&[2, 16]).unwrap();
            let mut message = Vec::<u8>::arbitrary(g);
            message.truncate(MAX_BLOCK_LEN - nsym);
            let n = message.len() + nsym;

            let count = usize::arbitrary(g) % (nsym / 2 + 1);
            let mut errors: Vec<(usize, u8)> = Vec::new();
            while errors.len() < count.min(n) {
                let pos = usize::arbitrary(g) % n;
                let mag = u8::arbitrary(g).max(1);
                if errors.iter().all(|(p, _)| *p != pos) {
                    errors.push((pos, mag));
                }
            }
            Self {
                message,
                errors,
                nsym,
            }
        }
    }

    fn codeword(rs: &ReedSolomon, message: &[u8]) -> Vec<u8> {
        let mut block = message.to_vec();
        block.extend(rs.encode(message).unwrap());
        block
    }

    #[test]
    fn field_tables() {
        let gf = &IL2P_FIELD;
        assert_eq!(gf.exp(0), 1);
        assert_eq!(gf.exp(8), 0x1d);
        assert_eq!(gf.exp(255), 1);
        for a in 1..=255u8 {
            assert_eq!(gf.mul(a, gf.inv(a)), 1);
            assert_eq!(gf.div(gf.mul(a, 0x53), 0x53), a);
        }
    }

    #[test]
    fn generator_polynomial() {
        // (x + 1)(x + 2)
        let rs = ReedSolomon::new(IL2P_FEC, 2);
        assert_eq!(rs.genpoly, vec![1, 3, 2]);
    }

    #[test]
    fn header_parity_reference() {
        let scrambled = [
            0x6a, 0xea, 0x9c, 0xc2, 0x01, 0x11, 0xfc, 0x14, 0x1f, 0xda, 0x6e, 0xf2, 0x53,
        ];
        let rs = ReedSolomon::new(IL2P_FEC, 2);
        assert_eq!(rs.encode(&scrambled).unwrap(), vec![0x91, 0xbd]);
    }

    #[test]
    fn clean_block() {
        let rs = ReedSolomon::new(IL2P_FEC, 16);
        let block = codeword(&rs, b"a perfectly ordinary payload");
        assert!(rs.check(&block));
        assert_eq!(
            rs.decode(&block),
            Ok((b"a perfectly ordinary payload".to_vec(), 0))
        );
    }

    #[test]
    fn empty_message() {
        let rs = ReedSolomon::new(IL2P_FEC, 16);
        let mut block = codeword(&rs, &[]);
        assert_eq!(block, vec![0; 16]);
        block[3] = 0x44;
        assert_eq!(rs.decode(&block), Ok((vec![], 1)));
    }

    #[quickcheck]
    fn corrects_within_radius(d: Damaged) -> bool {
        let rs = ReedSolomon::new(IL2P_FEC, d.nsym);
        let mut block = codeword(&rs, &d.message);
        for &(pos, mag) in d.errors.iter() {
            block[pos] ^= mag;
        }
        rs.check(&block) && rs.decode(&block) == Ok((d.message.clone(), d.errors.len()))
    }

    #[test]
    fn beyond_radius_is_usually_detected() {
        let mut rng = StdRng::seed_from_u64(0x11d);
        for nsym in [2, 16] {
            let rs = ReedSolomon::new(IL2P_FEC, nsym);
            let mut uncorrectable = 0;
            for _ in 0..100 {
                let len = rng.gen_range(10..200);
                let message = (0..len).map(|_| rng.gen()).collect::<Vec<u8>>();
                let mut block = codeword(&rs, &message);
                for pos in sample(&mut rng, block.len(), nsym / 2 + 1) {
                    block[pos] ^= rng.gen_range(1..=255u8);
                }
                match rs.decode(&block) {
                    Err(FecError::Uncorrectable) => {
                        uncorrectable += 1;
                        assert!(!rs.check(&block));
                    }
                    // a miscorrection onto another codeword, never the original
                    Ok((decoded, _)) => assert_ne!(decoded, message),
                    Err(e) => panic!("unexpected {:?}", e),
                }
            }
            assert!(uncorrectable > 0, "nsym {} never detected", nsym);
        }
    }

    #[test]
    fn length_limits() {
        let rs = ReedSolomon::new(IL2P_FEC, 16);
        assert_eq!(rs.encode(&[0; 240]), Err(FecError::BlockTooLong(256)));
        assert_eq!(rs.decode(&[0; 256]), Err(FecError::BlockTooLong(256)));
        assert_eq!(rs.decode(&[0; 15]), Err(FecError::BlockTooShort(15)));
        assert!(!rs.check(&[0; 256]));
    }
}
