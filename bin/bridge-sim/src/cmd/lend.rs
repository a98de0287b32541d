use clap::Parser;
use eyre::{Result, eyre};
use rollup_bridges::ConversionRequest;
use serde_json::json;

use super::{DeploymentArgs, SUBMITTER, format_units, parse_units};

#[derive(Parser, Debug)]
pub(crate) struct LendArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,

    /// Symbol of the asset to lend
    #[arg(long, default_value = "DAI")]
    asset: String,

    /// Amount to deposit, in whole units
    #[arg(short, long, default_value = "1000")]
    amount: String,

    /// Interaction nonce
    #[arg(short, long, default_value_t = 1)]
    nonce: u64,
}

impl LendArgs {
    pub(crate) fn run(self) -> Result<()> {
        let mut deployment = self.deployment.deployment()?;
        let bridge = deployment.config().bridges.aave;
        let token = deployment.config().token(&self.asset)?;
        let decimals = deployment.config().decimals_of(token);
        let amount = parse_units(&self.amount, decimals)?;

        let zk_atoken = deployment.enable_lending(&self.asset)?;
        let zk_address = zk_atoken
            .address()
            .ok_or_else(|| eyre!("zkAToken for {} has no address", self.asset))?;

        deployment.prefund(token, amount)?;
        let request =
            ConversionRequest::new(deployment.asset(&self.asset)?, zk_atoken, amount, self.nonce);
        let result = deployment.convert(SUBMITTER, bridge, request)?;

        let report = json!({
            "asset": self.asset,
            "zk_atoken": zk_address,
            "deposited": amount.to_string(),
            "result": result,
        });
        if self.deployment.print_json(&report)? {
            return Ok(());
        }

        println!("Lending Deposit");
        println!("===============");
        println!();
        println!("  Asset:     {} ({token})", self.asset);
        println!("  zkAToken:  {zk_address}");
        println!("  Deposited: {} {}", format_units(amount, decimals), self.asset);
        println!("  Minted:    {} zk{}", format_units(result.output_value_a, decimals), self.asset);

        Ok(())
    }
}
