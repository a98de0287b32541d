use clap::Parser;
use eyre::Result;
use rollup_bridges::Deployment;
use serde_json::json;

use super::DeploymentArgs;

#[derive(Parser, Debug)]
pub(crate) struct ValidateArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,

    /// Print the normalised config as TOML
    #[arg(long)]
    dump: bool,
}

impl ValidateArgs {
    pub(crate) fn run(self) -> Result<()> {
        let config = self.deployment.load_config()?;
        if self.dump {
            print!("{}", config.to_toml()?);
            return Ok(());
        }

        // building the deployment also checks venue seeding and bridge addresses
        let deployment = Deployment::from_config(config.clone())?;

        let report = json!({
            "chain_id": config.chain_id,
            "assets": config.assets.iter().map(|a| &a.symbol).collect::<Vec<_>>(),
            "amm_pools": config.amm.pools.len(),
            "lending_reserves": config.lending.reserves.len(),
            "tranche_pools": config.tranche.pools.iter().map(|p| &p.name).collect::<Vec<_>>(),
            "bridges": deployment.processor.bridges().map(|b| b.name()).collect::<Vec<_>>(),
        });
        if self.deployment.print_json(&report)? {
            return Ok(());
        }

        println!("Deployment Config");
        println!("=================");
        println!();
        println!("  Chain id:        {}", config.chain_id);
        println!("  Genesis time:    {}", config.genesis_timestamp);
        println!("  Processor:       {}", config.processor);
        println!();
        println!("Assets:");
        for asset in &config.assets {
            println!("  {:<6} {} ({} decimals)", asset.symbol, asset.address, asset.decimals);
        }
        println!();
        println!("Tranche pools:");
        for pool in &config.tranche.pools {
            println!("  {:<14} {} expires {}", pool.name, pool.pool, pool.expiry);
        }
        println!();
        println!("Bridges:");
        println!("  element:         {}", config.bridges.element);
        println!("  curve:           {}", config.bridges.curve);
        println!("  aave:            {}", config.bridges.aave);
        println!();
        println!("Config is valid.");

        Ok(())
    }
}
