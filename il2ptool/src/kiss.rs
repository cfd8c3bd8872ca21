#[derive(clap::Args, Debug)]
pub struct KissOpts {
    input: String,
    /// KISS stream to write, or "-" for stdout.
    output: String,

    /// Payload bytes per frame.
    #[arg(short, long, default_value_t = 195)]
    chunk: usize,

    /// Address byte sent after the opening FEND.
    #[arg(short, long, value_parser = crate::common::parse_byte, default_value_t = 0)]
    address: u8,
}

impl crate::ToolRun for KissOpts {
    fn run(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunk > 0, "chunk size must be positive");

        let input = std::fs::read(&self.input)?;
        let stream: Vec<u8> = input
            .chunks(self.chunk)
            .flat_map(|chunk| il2plib::kiss::frame(self.address, chunk))
            .collect();

        log::info!(
            "{} bytes in {} frames, {} bytes framed",
            input.len(),
            input.len().div_ceil(self.chunk),
            stream.len()
        );
        crate::common::write_output(&self.output, &stream)
    }
}
