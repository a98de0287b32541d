use clap::Parser;
use eyre::Result;
use rollup_bridges::ConversionRequest;
use serde_json::json;

use super::{DeploymentArgs, SUBMITTER, format_units, parse_units};

#[derive(Parser, Debug)]
pub(crate) struct SwapArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,

    /// Symbol of the asset to sell
    #[arg(long, default_value = "CVX")]
    from: String,

    /// Symbol of the asset to buy
    #[arg(long, default_value = "ETH")]
    to: String,

    /// Amount to sell, in whole units
    #[arg(short, long, default_value = "10")]
    amount: String,

    /// Interaction nonce
    #[arg(short, long, default_value_t = 1)]
    nonce: u64,
}

impl SwapArgs {
    pub(crate) fn run(self) -> Result<()> {
        let mut deployment = self.deployment.deployment()?;
        let bridge = deployment.config().bridges.curve;
        let token_in = deployment.config().token(&self.from)?;
        let token_out = deployment.config().token(&self.to)?;
        let (decimals_in, decimals_out) = (
            deployment.config().decimals_of(token_in),
            deployment.config().decimals_of(token_out),
        );
        let amount = parse_units(&self.amount, decimals_in)?;

        deployment.prefund(token_in, amount)?;
        let request = ConversionRequest::new(
            deployment.asset(&self.from)?,
            deployment.asset(&self.to)?,
            amount,
            self.nonce,
        );
        let result = deployment.convert(SUBMITTER, bridge, request)?;

        let report = json!({
            "from": self.from,
            "to": self.to,
            "amount_in": amount.to_string(),
            "result": result,
        });
        if self.deployment.print_json(&report)? {
            return Ok(());
        }

        println!("Swap");
        println!("====");
        println!();
        println!("  Sold:     {} {}", format_units(amount, decimals_in), self.from);
        println!("  Bought:   {} {}", format_units(result.output_value_a, decimals_out), self.to);
        println!("  Async:    {}", result.is_async);

        Ok(())
    }
}
