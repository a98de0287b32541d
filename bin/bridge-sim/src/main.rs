use clap::Parser;
use opts::{BridgeSimCli, BridgeSimSubcommand};

mod cmd;
mod opts;

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = BridgeSimCli::parse();

    match args.cmd {
        BridgeSimSubcommand::Validate(cmd) => cmd.run(),
        BridgeSimSubcommand::Tranche(cmd) => cmd.run(),
        BridgeSimSubcommand::Swap(cmd) => cmd.run(),
        BridgeSimSubcommand::Lend(cmd) => cmd.run(),
    }
}
