//! Synchronous lending bridge.
//!
//! Deposits are forwarded to the lending venue and the bridge issues a
//! zkAToken per reserve, minted one-for-one with the scaled position it
//! holds. Redeeming zkATokens burns them and withdraws the matching scaled
//! amount, so interest accrued by the venue's liquidity index goes to the
//! holder.

use std::collections::HashMap;

use alloy_primitives::{Address, U256, keccak256};
use tracing::info;

use super::{ConversionRequest, ConversionResult, DefiBridge, ensure_processor};
use crate::{
    asset::{AssetDescriptor, AssetKind},
    error::{Result, ValidationError},
    metrics::BridgeMetrics,
    storage::StateProvider,
    venue::LiquidityVenue,
};

pub struct AaveLendingBridge {
    address: Address,
    processor: Address,
    venue: Box<dyn LiquidityVenue>,
    zk_atokens: HashMap<Address, Address>,
    underlying_of: HashMap<Address, Address>,
    metrics: BridgeMetrics,
}

impl AaveLendingBridge {
    pub fn new(address: Address, processor: Address, venue: Box<dyn LiquidityVenue>) -> Self {
        Self {
            address,
            processor,
            venue,
            zk_atokens: HashMap::new(),
            underlying_of: HashMap::new(),
            metrics: BridgeMetrics::new("aave"),
        }
    }

    /// Creates the zkAToken for `underlying`. Each underlying can be set once.
    pub fn set_underlying_to_zk_atoken(&mut self, underlying: Address) -> Result<Address> {
        if self.zk_atokens.contains_key(&underlying) {
            return Err(ValidationError::ZkTokenAlreadySet(underlying).into());
        }
        if self.venue.position_token(underlying).is_none() {
            return Err(ValidationError::UnsupportedReserve(underlying).into());
        }

        let zk_atoken = self.derive_zk_atoken(underlying);
        self.zk_atokens.insert(underlying, zk_atoken);
        self.underlying_of.insert(zk_atoken, underlying);

        info!(%underlying, %zk_atoken, "zkAToken created");
        Ok(zk_atoken)
    }

    pub fn underlying_to_zk_atoken(&self, underlying: Address) -> Option<Address> {
        self.zk_atokens.get(&underlying).copied()
    }

    pub fn venue(&self) -> &(dyn LiquidityVenue + 'static) {
        self.venue.as_ref()
    }

    pub fn venue_mut(&mut self) -> &mut (dyn LiquidityVenue + 'static) {
        self.venue.as_mut()
    }

    fn derive_zk_atoken(&self, underlying: Address) -> Address {
        let mut preimage = Vec::with_capacity(48);
        preimage.extend_from_slice(b"zkAToken");
        preimage.extend_from_slice(self.address.as_slice());
        preimage.extend_from_slice(underlying.as_slice());
        Address::from_word(keccak256(preimage))
    }

    fn erc20(asset: &AssetDescriptor, slot: &'static str) -> Result<Address> {
        match (asset.kind(), asset.address()) {
            (AssetKind::Erc20, Some(address)) => Ok(address),
            (actual, _) => Err(ValidationError::InvalidAssetType { slot, actual }.into()),
        }
    }

    fn enter(
        &mut self,
        state: &mut dyn StateProvider,
        underlying: Address,
        zk_atoken: Address,
        amount: U256,
    ) -> Result<U256> {
        let scaled = self
            .venue
            .deposit(state, self.address, underlying, amount)
            .inspect_err(|_| self.metrics.record_venue_error())?;
        state.mint(zk_atoken, self.address, scaled)?;
        Ok(scaled)
    }

    fn exit(
        &mut self,
        state: &mut dyn StateProvider,
        underlying: Address,
        zk_atoken: Address,
        amount: U256,
    ) -> Result<U256> {
        let a_token = self
            .venue
            .position_token(underlying)
            .ok_or(ValidationError::UnsupportedReserve(underlying))?;

        state.burn(zk_atoken, self.address, amount)?;
        let out = self
            .venue
            .withdraw(state, self.address, a_token, amount)
            .inspect_err(|_| self.metrics.record_venue_error())?;
        Ok(out)
    }
}

impl DefiBridge for AaveLendingBridge {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "aave"
    }

    fn convert(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        request: &ConversionRequest,
    ) -> Result<ConversionResult> {
        ensure_processor(self.processor, caller)?;
        request.ensure_single_pair()?;

        let input = Self::erc20(&request.input_asset_a, "input_asset_a")?;
        let output = Self::erc20(&request.output_asset_a, "output_asset_a")?;
        let amount = request.total_input_value;
        if amount.is_zero() {
            return Err(ValidationError::ZeroAmount.into());
        }

        let out = if self.underlying_to_zk_atoken(input) == Some(output) {
            self.enter(state, input, output, amount)?
        } else if self.underlying_of.get(&input) == Some(&output) {
            self.exit(state, output, input, amount)?
        } else {
            return Err(ValidationError::AssetMismatch { input, output }.into());
        };
        self.metrics.record_convert();

        info!(nonce = request.interaction_nonce, %input, %output, %amount, %out, "lending conversion");
        Ok(ConversionResult::sync(out))
    }
}
