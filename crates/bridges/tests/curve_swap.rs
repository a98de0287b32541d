//! Synchronous swaps through the AMM bridge.

mod common;

use alloy_primitives::U256;
use common::{SIGNER, deployment, token, units};
use rollup_bridges::{
    AssetDescriptor, AssetKind, BridgeError, ConversionRequest, ETH, ValidationError,
    venue::AmmVenue,
};

#[test]
fn test_cvx_to_eth() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let processor = deployment.processor.address();
    let cvx = token(&deployment, "CVX")?;
    let amount = units(10, 18);

    deployment.prefund(cvx, amount)?;
    let expected = deployment
        .curve()?
        .venue()
        .downcast_ref::<AmmVenue>()
        .ok_or_else(|| eyre::eyre!("curve bridge is not backed by an AMM"))?
        .quote(&deployment.state, cvx, ETH, amount)?;

    let cvx_before = deployment.balance_of(cvx, processor);
    let eth_before = deployment.balance_of(ETH, processor);

    let request = ConversionRequest::new(deployment.asset("CVX")?, AssetDescriptor::eth(), amount, 1);
    let result = deployment.convert(SIGNER, bridge, request)?;

    assert!(!result.is_async);
    assert_eq!(result.output_value_b, U256::ZERO);
    assert_eq!(result.output_value_a, expected);
    assert!(result.output_value_a > U256::ZERO);

    assert_eq!(cvx_before - deployment.balance_of(cvx, processor), amount);
    assert_eq!(deployment.balance_of(ETH, processor) - eth_before, expected);
    // the bridge keeps nothing
    assert_eq!(deployment.balance_of(cvx, bridge), U256::ZERO);
    assert_eq!(deployment.balance_of(ETH, bridge), U256::ZERO);
    assert_eq!(deployment.processor.pending_interactions().count(), 0);
    Ok(())
}

#[test]
fn test_eth_to_cvx() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let processor = deployment.processor.address();
    let cvx = token(&deployment, "CVX")?;

    deployment.prefund(ETH, units(1, 18))?;
    let request =
        ConversionRequest::new(AssetDescriptor::eth(), deployment.asset("CVX")?, units(1, 18), 1);
    let result = deployment.convert(SIGNER, bridge, request)?;

    assert!(!result.is_async);
    assert_eq!(deployment.balance_of(cvx, processor), result.output_value_a);
    assert_eq!(deployment.balance_of(ETH, processor), U256::ZERO);
    Ok(())
}

#[test]
fn test_stablecoin_swap() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let processor = deployment.processor.address();
    let dai = token(&deployment, "DAI")?;
    let usdc = token(&deployment, "USDC")?;

    deployment.prefund(usdc, units(1_000, 6))?;
    let request = ConversionRequest::new(
        deployment.asset("USDC")?,
        deployment.asset("DAI")?,
        units(1_000, 6),
        7,
    );
    let result = deployment.convert(SIGNER, bridge, request)?;

    // 1bp fee against deep reserves: a little under 1000 DAI
    assert!(result.output_value_a < units(1_000, 18));
    assert!(result.output_value_a > units(999, 18));
    assert_eq!(deployment.balance_of(dai, processor), result.output_value_a);
    assert_eq!(deployment.balance_of(usdc, processor), U256::ZERO);
    Ok(())
}

#[test]
fn test_rejects_virtual_assets() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let cvx = deployment.asset("CVX")?;
    let cvx_token = token(&deployment, "CVX")?;

    deployment.prefund(cvx_token, U256::from(1))?;
    let err = deployment
        .convert(
            SIGNER,
            bridge,
            ConversionRequest::new(cvx, AssetDescriptor::virtual_asset(12), U256::from(1), 1),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::from(ValidationError::InvalidAssetType {
            slot: "output_asset_a",
            actual: AssetKind::Virtual,
        })
    );
    Ok(())
}

#[test]
fn test_rejects_unsupported_pair() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let processor = deployment.processor.address();
    let usdc = token(&deployment, "USDC")?;

    deployment.prefund(usdc, units(5, 6))?;
    let request =
        ConversionRequest::new(deployment.asset("USDC")?, deployment.asset("CVX")?, units(5, 6), 1);
    let err = deployment.convert(SIGNER, bridge, request).unwrap_err();

    assert!(matches!(err, BridgeError::Venue(_)));
    assert_eq!(deployment.balance_of(usdc, processor), units(5, 6));
    Ok(())
}

#[test]
fn test_rejects_reused_nonce() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    let bridge = deployment.config().bridges.curve;
    let processor = deployment.processor.address();
    let cvx = token(&deployment, "CVX")?;
    let amount = units(10, 18);

    deployment.prefund(cvx, amount * U256::from(2))?;
    let request = ConversionRequest::new(deployment.asset("CVX")?, AssetDescriptor::eth(), amount, 1);
    let first = deployment.convert(SIGNER, bridge, request)?;
    let eth_after_first = deployment.balance_of(ETH, processor);
    assert_eq!(eth_after_first, first.output_value_a);

    let err = deployment.convert(SIGNER, bridge, request).unwrap_err();
    assert_eq!(err, BridgeError::InteractionAlreadyExists(1));
    assert_eq!(deployment.balance_of(cvx, processor), amount);
    assert_eq!(deployment.balance_of(ETH, processor), eth_after_first);

    // a fresh nonce goes through
    let request = ConversionRequest::new(deployment.asset("CVX")?, AssetDescriptor::eth(), amount, 2);
    deployment.convert(SIGNER, bridge, request)?;
    assert_eq!(deployment.balance_of(cvx, processor), U256::ZERO);
    Ok(())
}
