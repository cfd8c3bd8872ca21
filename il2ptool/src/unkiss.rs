use il2plib::kiss::{KissReader, ReaderError};

use crate::hexdump::hexdump_prefix;

#[derive(clap::Args, Debug)]
pub struct UnkissOpts {
    /// KISS stream, or "-" for stdin.
    input: String,

    /// Write the payloads here, concatenated.
    #[arg(short, long)]
    output: Option<String>,

    /// Only keep frames with this address.
    #[arg(short, long, value_parser = crate::common::parse_byte)]
    address: Option<u8>,

    /// Dump every frame.
    #[arg(long)]
    hexdump: bool,
}

impl crate::ToolRun for UnkissOpts {
    fn run(&self) -> anyhow::Result<()> {
        if self.input == "-" {
            self.read_stream(std::io::stdin().lock())
        } else {
            self.read_stream(std::io::BufReader::new(std::fs::File::open(&self.input)?))
        }
    }
}

impl UnkissOpts {
    fn read_stream<F>(&self, port: F) -> anyhow::Result<()>
    where
        F: std::io::Read,
    {
        let mut reader = KissReader::new_std(port);
        let mut payloads = Vec::new();
        let mut frames = 0;
        let mut skipped = 0;
        let mut malformed = 0;

        loop {
            match reader.read_frame() {
                Ok(Some(frame)) => {
                    if self.address.map_or(false, |a| a != frame.address) {
                        skipped += 1;
                        continue;
                    }
                    if self.hexdump {
                        println!(
                            "frame {}, address 0x{:02x}, {} bytes",
                            frames,
                            frame.address,
                            frame.payload.len()
                        );
                        hexdump_prefix("  ", &frame.payload);
                        println!();
                    }
                    payloads.extend(&frame.payload);
                    frames += 1;
                }
                Ok(None) => break,
                Err(ReaderError::Kiss(_)) => malformed += 1,
                Err(ReaderError::Io(e)) => anyhow::bail!("read failed: {:?}", e),
            }
        }

        println!(
            "{} frames, {} payload bytes, {} skipped, {} malformed",
            frames,
            payloads.len(),
            skipped,
            malformed
        );

        if let Some(ref path) = self.output {
            crate::common::write_output(path, &payloads)?;
        }
        Ok(())
    }
}
