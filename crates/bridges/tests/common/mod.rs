//! Shared fixtures for the bridge scenarios.

#![allow(dead_code, unreachable_pub)]

use alloy_primitives::{Address, U256, address};
use rollup_bridges::{
    ConversionRequest, ConversionResult, Deployment,
    config::{DeploymentConfig, TranchePoolConfig},
};

/// First default anvil account; submits every rollup transaction.
pub const SIGNER: Address = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");

pub const APR_2022: &str = "dai-apr-2022";
pub const JAN_2022: &str = "dai-jan-2022";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn deployment() -> eyre::Result<Deployment> {
    init_tracing();
    Ok(Deployment::test_deployment()?)
}

/// `n * 10^decimals`.
pub fn units(n: u64, decimals: u8) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(decimals))
}

pub fn tranche(config: &DeploymentConfig, name: &str) -> eyre::Result<TranchePoolConfig> {
    Ok(config.tranche_pool(name)?.clone())
}

pub fn token(deployment: &Deployment, symbol: &str) -> eyre::Result<Address> {
    Ok(deployment.config().token(symbol)?)
}

/// Funds the processor and deposits `amount` of DAI into the tranche `name`.
pub fn deposit_dai(
    deployment: &mut Deployment,
    name: &str,
    amount: U256,
    nonce: u64,
) -> eyre::Result<ConversionResult> {
    let pool = tranche(deployment.config(), name)?;
    let dai = deployment.asset("DAI")?;
    let bridge = deployment.config().bridges.element;

    deployment.prefund(token(deployment, "DAI")?, amount)?;
    Ok(deployment.convert(
        SIGNER,
        bridge,
        ConversionRequest::new(dai, dai, amount, nonce).with_aux_data(pool.expiry),
    )?)
}
