use rand::{Rng, SeedableRng};

use il2plib::il2p::{Il2pEncoder, Il2pHeader, MAX_PAYLOAD_LEN};

#[derive(clap::Args, Debug)]
pub struct EncodeOpts {
    input: String,
    /// Capture file to write, or "-" for stdout.
    output: String,

    #[command(flatten)]
    link: crate::common::LinkArgs,

    /// Payload bytes per frame.
    #[arg(short, long, default_value_t = 195)]
    chunk: usize,

    #[arg(long, default_value = "CQ")]
    destination: String,
    #[arg(long, default_value = "N0CALL")]
    source: String,

    /// Flip this many random bits in each frame, after the marker.
    #[arg(long, default_value_t = 0)]
    flips: usize,
    /// Seed for the bit flips.
    #[arg(long)]
    seed: Option<u64>,
}

impl crate::ToolRun for EncodeOpts {
    fn run(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.chunk > 0 && self.chunk <= MAX_PAYLOAD_LEN,
            "chunk size must be between 1 and {}",
            MAX_PAYLOAD_LEN
        );

        let config = self.link.config()?;
        let marker = config.marker.clone();
        let encoder = Il2pEncoder::new(config);
        let header = Il2pHeader::ui(&self.destination, &self.source, 0);

        let mut rng = match self.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };

        let input = std::fs::read(&self.input)?;
        let mut capture = Vec::new();
        let mut frames = 0;
        for chunk in input.chunks(self.chunk) {
            let mut frame = encoder.encode_frame(&header, chunk)?;
            for _ in 0..self.flips {
                let bit = rng.gen_range(0..frame.len() * 8);
                frame[bit / 8] ^= 0x80 >> (bit % 8);
            }
            capture.extend(&marker);
            capture.extend(frame);
            frames += 1;
        }

        log::info!(
            "{} frames, {} bytes, {} bit flips per frame",
            frames,
            capture.len(),
            self.flips
        );
        crate::common::write_output(&self.output, &capture)
    }
}
