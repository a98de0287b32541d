use clap::Parser;
use eyre::{Result, ensure};
use rollup_bridges::ConversionRequest;
use serde_json::json;

use super::{DeploymentArgs, SUBMITTER, format_units, parse_units};

#[derive(Parser, Debug)]
pub(crate) struct TrancheArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,

    /// Tranche pool name from the config
    #[arg(short, long, default_value = "dai-apr-2022")]
    pool: String,

    /// Amount of the pool's underlying to deposit, in whole units
    #[arg(short, long, default_value = "1000")]
    amount: String,

    /// Interaction nonce
    #[arg(short, long, default_value_t = 1)]
    nonce: u64,
}

impl TrancheArgs {
    pub(crate) fn run(self) -> Result<()> {
        let mut deployment = self.deployment.deployment()?;
        let pool = deployment.config().tranche_pool(&self.pool)?.clone();
        let bridge = deployment.config().bridges.element;
        let processor = deployment.processor.address();
        let token = deployment.config().token(&pool.asset)?;
        let decimals = deployment.config().decimals_of(token);
        let asset = deployment.asset(&pool.asset)?;
        let amount = parse_units(&self.amount, decimals)?;

        deployment.register_tranche_pool(&self.pool)?;
        deployment.prefund(token, amount)?;

        let request = ConversionRequest::new(asset, asset, amount, self.nonce).with_aux_data(pool.expiry);
        let converted = deployment.convert(SUBMITTER, bridge, request)?;
        let principal = deployment.balance_of(pool.tranche, bridge);
        let ready_before = deployment.can_finalise(self.nonce)?;

        deployment.warp_to(pool.expiry);
        ensure!(
            deployment.can_finalise(self.nonce)?,
            "interaction {} not ready at expiry {}",
            self.nonce,
            pool.expiry
        );
        let settled = deployment.process_async_defi_interaction(SUBMITTER, self.nonce)?;
        let balance = deployment.balance_of(token, processor);

        let report = json!({
            "pool": pool.name,
            "nonce": self.nonce,
            "expiry": pool.expiry,
            "deposited": amount.to_string(),
            "principal_tokens": principal.to_string(),
            "ready_before_expiry": ready_before,
            "convert": converted,
            "finalise": settled,
            "processor_balance": balance.to_string(),
        });
        if self.deployment.print_json(&report)? {
            return Ok(());
        }

        println!("Tranche Deposit");
        println!("===============");
        println!();
        println!("  Pool:             {} ({})", pool.name, pool.pool);
        println!("  Nonce:            {}", self.nonce);
        println!("  Deposited:        {} {}", format_units(amount, decimals), pool.asset);
        println!("  Principal tokens: {}", format_units(principal, decimals));
        println!("  Async:            {}", converted.is_async);
        println!("  Ready early:      {ready_before}");
        println!();
        println!("Finalised at {}:", pool.expiry);
        println!("  Redeemed:         {} {}", format_units(settled.output_value_a, decimals), pool.asset);
        println!("  Processor holds:  {} {}", format_units(balance, decimals), pool.asset);

        Ok(())
    }
}
