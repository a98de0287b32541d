//! Synchronous swap bridge over an AMM venue.

use alloy_primitives::Address;
use tracing::info;

use super::{ConversionRequest, ConversionResult, DefiBridge, ensure_processor};
use crate::{
    asset::{AssetDescriptor, AssetKind},
    error::{Result, ValidationError},
    metrics::BridgeMetrics,
    storage::StateProvider,
    venue::LiquidityVenue,
};

pub struct CurveSwapBridge {
    address: Address,
    processor: Address,
    venue: Box<dyn LiquidityVenue>,
    metrics: BridgeMetrics,
}

impl CurveSwapBridge {
    pub fn new(address: Address, processor: Address, venue: Box<dyn LiquidityVenue>) -> Self {
        Self {
            address,
            processor,
            venue,
            metrics: BridgeMetrics::new("curve"),
        }
    }

    pub fn venue(&self) -> &(dyn LiquidityVenue + 'static) {
        self.venue.as_ref()
    }

    pub fn venue_mut(&mut self) -> &mut (dyn LiquidityVenue + 'static) {
        self.venue.as_mut()
    }

    fn token(asset: &AssetDescriptor, slot: &'static str) -> Result<Address> {
        match (asset.kind(), asset.token()) {
            (AssetKind::Erc20 | AssetKind::Eth, Some(token)) => Ok(token),
            (actual, _) => Err(ValidationError::InvalidAssetType { slot, actual }.into()),
        }
    }
}

impl DefiBridge for CurveSwapBridge {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "curve"
    }

    fn convert(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        request: &ConversionRequest,
    ) -> Result<ConversionResult> {
        ensure_processor(self.processor, caller)?;
        request.ensure_single_pair()?;

        let token_in = Self::token(&request.input_asset_a, "input_asset_a")?;
        let token_out = Self::token(&request.output_asset_a, "output_asset_a")?;
        if token_in == token_out {
            return Err(ValidationError::IdenticalAssets(token_in).into());
        }

        let amount_in = request.total_input_value;
        if amount_in.is_zero() {
            return Err(ValidationError::ZeroAmount.into());
        }

        let amount_out = self
            .venue
            .swap(state, self.address, token_in, token_out, amount_in)
            .inspect_err(|_| self.metrics.record_venue_error())?;
        self.metrics.record_convert();

        info!(
            nonce = request.interaction_nonce,
            %token_in, %token_out, %amount_in, %amount_out,
            "swapped"
        );
        Ok(ConversionResult::sync(amount_out))
    }
}
