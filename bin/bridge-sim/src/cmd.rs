pub(crate) mod lend;
pub(crate) mod swap;
pub(crate) mod tranche;
pub(crate) mod validate;

use std::path::PathBuf;

use alloy_primitives::{Address, U256, address};
use clap::Args;
use eyre::{Result, bail, eyre};
use rollup_bridges::{Deployment, DeploymentConfig};
use serde::Serialize;

/// Account submitting the rollup transactions.
pub(crate) const SUBMITTER: Address = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

#[derive(Args, Debug)]
pub(crate) struct DeploymentArgs {
    /// Path to deployment config file (defaults to the built-in test deployment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl DeploymentArgs {
    pub(crate) fn load_config(&self) -> Result<DeploymentConfig> {
        Ok(match &self.config {
            Some(path) => DeploymentConfig::load(path)?,
            None => DeploymentConfig::default_test_config(),
        })
    }

    pub(crate) fn deployment(&self) -> Result<Deployment> {
        Ok(Deployment::from_config(self.load_config()?)?)
    }

    /// Prints `report` as JSON when `--json` was given. Returns whether it did.
    pub(crate) fn print_json(&self, report: &impl Serialize) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        Ok(self.json)
    }
}

/// Parses a decimal amount such as `1000` or `12.5` into base units.
pub(crate) fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if fraction.len() > decimals as usize {
        bail!("{amount} has more than {decimals} decimal places");
    }

    let digits = format!("{whole}{fraction:0<width$}", width = decimals as usize);
    let value = U256::from_str_radix(&digits, 10).map_err(|err| eyre!("invalid amount {amount}: {err}"))?;
    if value.is_zero() {
        bail!("amount must be non-zero");
    }
    Ok(value)
}

/// Formats base units as a decimal string, trimming trailing zeros.
pub(crate) fn format_units(value: U256, decimals: u8) -> String {
    let scale = U256::from(10).pow(U256::from(decimals));
    let (whole, fraction) = (value / scale, value % scale);
    if fraction.is_zero() {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
