//! Lending bridge scenarios against the DAI reserve.

mod common;

use alloy_primitives::{U256, uint};
use common::{SIGNER, deployment, token, units};
use rollup_bridges::{
    BridgeError, ConversionRequest, ConversionResult, StateProvider, ValidationError,
    venue::{LendingVenue, RAY},
};

#[test]
fn test_zk_atoken_set_once() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let dai = token(&deployment, "DAI")?;

    assert_eq!(deployment.aave()?.underlying_to_zk_atoken(dai), None);
    let zk = deployment.enable_lending("DAI")?;
    assert_eq!(deployment.aave()?.underlying_to_zk_atoken(dai), zk.address());

    let err = deployment.aave_mut()?.set_underlying_to_zk_atoken(dai).unwrap_err();
    assert_eq!(err, BridgeError::from(ValidationError::ZkTokenAlreadySet(dai)));
    assert_eq!(deployment.aave()?.underlying_to_zk_atoken(dai), zk.address());
    Ok(())
}

#[test]
fn test_reserve_must_exist() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let cvx = token(&deployment, "CVX")?;

    let err = deployment.aave_mut()?.set_underlying_to_zk_atoken(cvx).unwrap_err();
    assert_eq!(err, BridgeError::from(ValidationError::UnsupportedReserve(cvx)));
    Ok(())
}

#[test]
fn test_deposit_mints_scaled_zk_atokens() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.aave;
    let processor = deployment.processor.address();
    let a_token = deployment.config().lending.reserves[0].a_token;
    let dai = token(&deployment, "DAI")?;
    let zk = deployment.enable_lending("DAI")?;
    let zk_token = zk.address().ok_or_else(|| eyre::eyre!("zkAToken has no address"))?;
    let amount = units(1_000, 18);

    deployment.prefund(dai, amount)?;
    let request = ConversionRequest::new(deployment.asset("DAI")?, zk, amount, 1);
    let result = deployment.convert(SIGNER, bridge, request)?;

    let scaled = uint!(940034212570988344321_U256);
    assert_eq!(result, ConversionResult::sync(scaled));
    assert_eq!(deployment.balance_of(zk_token, processor), scaled);
    assert_eq!(deployment.balance_of(dai, processor), U256::ZERO);
    // the bridge holds the scaled aTokens backing the zkATokens
    assert_eq!(deployment.balance_of(a_token, bridge), scaled);

    let underlying = deployment
        .aave()?
        .venue()
        .downcast_ref::<LendingVenue>()
        .ok_or_else(|| eyre::eyre!("aave bridge is not backed by a lending venue"))?
        .underlying_balance_of(&deployment.state, a_token, bridge)?;
    assert_eq!(underlying, amount);
    Ok(())
}

#[test]
fn test_exit_collects_accrued_interest() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.aave;
    let processor = deployment.processor.address();
    let dai = token(&deployment, "DAI")?;
    let dai_asset = deployment.asset("DAI")?;
    let zk = deployment.enable_lending("DAI")?;
    let zk_token = zk.address().ok_or_else(|| eyre::eyre!("zkAToken has no address"))?;
    let amount = units(1_000, 18);

    deployment.prefund(dai, amount)?;
    let minted = deployment
        .convert(SIGNER, bridge, ConversionRequest::new(dai_asset, zk, amount, 1))?
        .output_value_a;

    // index moves from ~1.0638 to 1.1
    let venue = deployment
        .aave_mut()?
        .venue_mut()
        .downcast_mut::<LendingVenue>()
        .ok_or_else(|| eyre::eyre!("aave bridge is not backed by a lending venue"))?;
    venue.set_liquidity_index(dai, RAY * U256::from(11) / U256::from(10))?;

    let result =
        deployment.convert(SIGNER, bridge, ConversionRequest::new(zk, dai_asset, minted, 2))?;
    assert!(!result.is_async);
    assert!(result.output_value_a > amount);
    assert_eq!(deployment.balance_of(dai, processor), result.output_value_a);
    assert_eq!(deployment.balance_of(dai, bridge), U256::ZERO);
    assert_eq!(deployment.state.total_supply(zk_token), U256::ZERO);
    Ok(())
}

#[test]
fn test_rejects_unrelated_output() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.aave;
    let processor = deployment.processor.address();
    let dai = token(&deployment, "DAI")?;
    deployment.enable_lending("DAI")?;

    deployment.prefund(dai, units(1, 18))?;
    let request =
        ConversionRequest::new(deployment.asset("DAI")?, deployment.asset("USDC")?, units(1, 18), 1);
    let err = deployment.convert(SIGNER, bridge, request).unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Validation(ValidationError::AssetMismatch { .. })
    ));
    assert_eq!(deployment.balance_of(dai, processor), units(1, 18));
    Ok(())
}
