use il2plib::il2p::crc::{CrcCcitt, CrcConstantIgnore, CrcEither};
use il2plib::il2p::{Il2pConfig, LINK_PREFIX, MARKER, TRAILER};

/// CRC style selected on the command line.
pub type ToolCrc = CrcEither<CrcCcitt, CrcConstantIgnore>;

#[derive(clap::Args, Debug, Clone)]
pub struct LogArgs {
    /// More logging, repeat for more. Ignored if RUST_LOG is set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,
}

impl LogArgs {
    pub fn init(&self) {
        let level = match self.debug {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        let mut builder = env_logger::Builder::new();
        builder.filter_level(level);
        builder.parse_env("RUST_LOG");
        builder.init();
    }
}

/// Bytes given on the command line as hex, spaces allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl std::str::FromStr for HexBytes {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .trim_start_matches("0x")
            .bytes()
            .filter(|b| !b.is_ascii_whitespace() && *b != b':')
            .collect();
        anyhow::ensure!(digits.len() % 2 == 0, "odd number of hex digits");

        let bytes = digits
            .chunks(2)
            .map(|pair| {
                let pair = std::str::from_utf8(pair)?;
                Ok(u8::from_str_radix(pair, 16)?)
            })
            .collect::<anyhow::Result<Vec<u8>>>()?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for HexBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Parse a byte as decimal, or hex with a 0x prefix.
pub fn parse_byte(s: &str) -> anyhow::Result<u8> {
    if let Some(hex) = s.strip_prefix("0x") {
        Ok(u8::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse()?)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct LinkArgs {
    /// Frame sync marker, in hex.
    #[arg(long, default_value_t = HexBytes(MARKER.to_vec()))]
    marker: HexBytes,
    /// Bytes the CRC covers ahead of the payload, in hex.
    #[arg(long, default_value_t = HexBytes(LINK_PREFIX.to_vec()))]
    link_prefix: HexBytes,
    /// Byte written after the encoded checksum.
    #[arg(long, value_parser = parse_byte, default_value_t = TRAILER)]
    trailer: u8,
    /// Accept every CRC.
    #[arg(long)]
    ignore_crc: bool,
}

impl LinkArgs {
    pub fn config(&self) -> anyhow::Result<Il2pConfig<ToolCrc>> {
        anyhow::ensure!(!self.marker.0.is_empty(), "marker cannot be empty");

        let crc = if self.ignore_crc {
            CrcEither::Right(CrcConstantIgnore(0xffff))
        } else {
            CrcEither::Left(CrcCcitt::new())
        };
        Ok(Il2pConfig {
            marker: self.marker.0.clone(),
            link_prefix: self.link_prefix.0.clone(),
            trailer: self.trailer,
            crc,
        })
    }
}

/// Write to a file, or stdout for "-".
pub fn write_output(path: &str, data: &[u8]) -> anyhow::Result<()> {
    if path == "-" {
        use std::io::Write;
        std::io::stdout().lock().write_all(data)?;
    } else {
        std::fs::write(path, data)?;
    }
    Ok(())
}
