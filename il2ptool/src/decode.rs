use il2plib::il2p::{DecodedPacket, Il2pDecoder};

use crate::hexdump::hexdump_prefix;

#[derive(clap::Args, Debug)]
pub struct DecodeOpts {
    /// Raw capture, as received from the modem.
    capture: String,

    #[command(flatten)]
    link: crate::common::LinkArgs,

    /// Dump every block of each frame.
    #[arg(long)]
    hexdump: bool,

    /// Write the payloads of clean packets here, concatenated.
    #[arg(short, long)]
    output: Option<String>,

    /// Also write payloads of degraded packets.
    #[arg(long, requires = "output")]
    keep_degraded: bool,

    /// Exit with an error if any frame was not clean.
    #[arg(long)]
    strict: bool,
}

impl crate::ToolRun for DecodeOpts {
    fn run(&self) -> anyhow::Result<()> {
        let capture = std::fs::read(&self.capture)?;
        let decoder = Il2pDecoder::new(self.link.config()?);
        let report = decoder.decode_capture(&capture);

        for packet in report.packets.iter() {
            self.print_packet(packet);
        }
        for dropped in report.dropped.iter() {
            println!(
                "frame {} at 0x{:x}: dropped, {}",
                dropped.index, dropped.offset, dropped.reason
            );
        }

        let summary = report.summary();
        println!("{}", summary);

        if let Some(ref path) = self.output {
            let payloads: Vec<u8> = report
                .packets
                .iter()
                .filter(|p| p.is_clean() || self.keep_degraded)
                .flat_map(|p| p.payload().iter().copied())
                .collect();
            crate::common::write_output(path, &payloads)?;
        }

        if self.strict {
            anyhow::ensure!(
                summary.degraded == 0 && summary.dropped == 0,
                "capture was not clean"
            );
        }
        Ok(())
    }
}

impl DecodeOpts {
    fn print_packet(&self, packet: &DecodedPacket) {
        println!(
            "frame {} at 0x{:x}: {}",
            packet.index(),
            packet.offset(),
            packet.flags()
        );

        match packet.header_fields() {
            Ok(h) if packet.header_status().is_ok() => println!("  header: {}", h),
            _ => println!("  header: unrecoverable"),
        }
        println!(
            "  header fec: {}, payload fec: {}, {} bytes",
            packet.header_status(),
            packet.payload_status(),
            packet.payload().len()
        );
        println!(
            "  crc: received {:04x}, computed {:04x}",
            packet.checksum(),
            packet.computed_checksum()
        );

        if self.hexdump {
            println!("  header:");
            hexdump_prefix("    ", packet.header());
            println!("  header parity:");
            hexdump_prefix("    ", packet.header_parity());
            println!("  payload:");
            hexdump_prefix("    ", packet.payload());
            println!("  payload parity:");
            hexdump_prefix("    ", packet.payload_parity());
            println!("  encoded checksum:");
            hexdump_prefix("    ", packet.encoded_checksum());
        }
        println!();
    }
}
