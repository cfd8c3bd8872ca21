mod common;
mod decode;
mod encode;
mod hexdump;
mod kiss;
mod unkiss;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()>;
}

/// Offline tools for IL2P captures and KISS streams.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct ToolOptions {
    #[command(flatten)]
    log: common::LogArgs,

    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(clap::Subcommand, Debug)]
enum ToolCommand {
    /// Recover packets from a raw IL2P capture.
    Decode(decode::DecodeOpts),
    /// Build a synthetic IL2P capture from a file.
    Encode(encode::EncodeOpts),
    /// Split a file into KISS frames.
    Kiss(kiss::KissOpts),
    /// Extract payloads from a KISS stream.
    Unkiss(unkiss::UnkissOpts),
}

impl ToolRun for ToolCommand {
    fn run(&self) -> anyhow::Result<()> {
        use ToolCommand::*;
        match self {
            Decode(o) => o.run(),
            Encode(o) => o.run(),
            Kiss(o) => o.run(),
            Unkiss(o) => o.run(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opts = <ToolOptions as clap::Parser>::parse();
    opts.log.init();
    opts.command.run()
}
