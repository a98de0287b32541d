use crate::cmd::{lend::LendArgs, swap::SwapArgs, tranche::TrancheArgs, validate::ValidateArgs};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bridge-sim")]
#[command(version, about = "Run rollup DeFi bridge interactions against a simulated deployment", long_about = None)]
pub(crate) struct BridgeSimCli {
    #[command(subcommand)]
    pub(crate) cmd: BridgeSimSubcommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum BridgeSimSubcommand {
    /// Load and validate a deployment config
    Validate(ValidateArgs),

    /// Deposit into a tranche pool, wait for maturity and finalise
    Tranche(TrancheArgs),

    /// Swap one asset for another through the AMM bridge
    Swap(SwapArgs),

    /// Deposit into the lending bridge in exchange for zkATokens
    Lend(LendArgs),
}
