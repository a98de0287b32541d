//! Rollup processor: the only caller of the deployed bridges.
//!
//! The processor holds user funds, pushes the input of an interaction to the
//! bridge before calling it and pulls the outputs back once the bridge has
//! settled. Every call runs inside a ledger checkpoint, so a failure anywhere
//! leaves balances exactly as they were.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    asset::{AssetDescriptor, AssetKind, AssetRegistry},
    bridge::{ConversionRequest, ConversionResult, DefiBridge},
    error::{BridgeError, Result, ValidationError},
    metrics::ProcessorMetrics,
    storage::{ETH, StateProvider, atomically},
};

/// An asynchronous interaction awaiting finalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingInteraction {
    pub nonce: u64,
    pub bridge: Address,
    pub caller: Address,
    pub input_asset: AssetDescriptor,
    pub output_asset_a: AssetDescriptor,
    pub output_asset_b: AssetDescriptor,
    pub total_input_value: U256,
}

pub struct RollupProcessor {
    address: Address,
    assets: AssetRegistry,
    bridges: HashMap<Address, Box<dyn DefiBridge>>,
    pending: BTreeMap<u64, PendingInteraction>,
    /// Nonces of every successful conversion, settled or not.
    used_nonces: BTreeSet<u64>,
    metrics: ProcessorMetrics,
}

impl RollupProcessor {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            assets: AssetRegistry::new(),
            bridges: HashMap::new(),
            pending: BTreeMap::new(),
            used_nonces: BTreeSet::new(),
            metrics: ProcessorMetrics::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn register_asset(&mut self, token: Address) -> Result<AssetDescriptor> {
        Ok(self.assets.register_erc20(token)?)
    }

    /// Registry descriptor for `token`; [`ETH`] maps to asset 0.
    pub fn asset_for(&self, token: Address) -> Option<AssetDescriptor> {
        if token == ETH {
            return Some(AssetDescriptor::eth());
        }
        self.assets.by_address(token).copied()
    }

    pub fn deploy_bridge(&mut self, bridge: Box<dyn DefiBridge>) -> Result<Address> {
        let address = bridge.address();
        if self.bridges.contains_key(&address) {
            return Err(BridgeError::BridgeAlreadyDeployed(address));
        }
        info!(%address, name = bridge.name(), "deployed bridge");
        self.bridges.insert(address, bridge);
        Ok(address)
    }

    pub fn bridge<T: DefiBridge>(&self, address: Address) -> Option<&T> {
        let bridge: &(dyn DefiBridge + 'static) = self.bridges.get(&address)?.as_ref();
        bridge.downcast_ref()
    }

    pub fn bridge_mut<T: DefiBridge>(&mut self, address: Address) -> Option<&mut T> {
        let bridge: &mut (dyn DefiBridge + 'static) = self.bridges.get_mut(&address)?.as_mut();
        bridge.downcast_mut()
    }

    pub fn bridges(&self) -> impl Iterator<Item = &dyn DefiBridge> {
        self.bridges.values().map(|bridge| bridge.as_ref())
    }

    /// Credits the processor with `amount` of `token`.
    pub fn prefund_with_token(
        &self,
        state: &mut dyn StateProvider,
        token: Address,
        amount: U256,
    ) -> Result<()> {
        state.mint(token, self.address, amount)?;
        Ok(())
    }

    pub fn pending_interactions(&self) -> impl Iterator<Item = &PendingInteraction> {
        self.pending.values()
    }

    pub fn pending_interaction(&self, nonce: u64) -> Option<&PendingInteraction> {
        self.pending.get(&nonce)
    }

    /// Whether a conversion with `nonce` has already been accepted.
    pub fn is_nonce_used(&self, nonce: u64) -> bool {
        self.used_nonces.contains(&nonce)
    }

    /// Runs an interaction through `bridge`.
    ///
    /// Every nonce is accepted once. A rejected conversion does not consume
    /// its nonce.
    ///
    /// Synchronous results are collected from the bridge before returning;
    /// asynchronous ones are recorded until
    /// [`process_async_defi_interaction`](Self::process_async_defi_interaction).
    pub fn convert(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        bridge: Address,
        request: ConversionRequest,
    ) -> Result<ConversionResult> {
        let nonce = request.interaction_nonce;
        let result = self.try_convert(state, bridge, &request);

        match &result {
            Ok(outcome) => {
                self.used_nonces.insert(nonce);
                if outcome.is_async {
                    self.pending.insert(
                        nonce,
                        PendingInteraction {
                            nonce,
                            bridge,
                            caller,
                            input_asset: request.input_asset_a,
                            output_asset_a: request.output_asset_a,
                            output_asset_b: request.output_asset_b,
                            total_input_value: request.total_input_value,
                        },
                    );
                    self.metrics.set_pending(self.pending.len());
                }
                self.metrics
                    .record_conversion(approximate(request.total_input_value));
                info!(
                    nonce,
                    %bridge,
                    %caller,
                    output_a = %outcome.output_value_a,
                    is_async = outcome.is_async,
                    "conversion processed"
                );
            }
            Err(err) => {
                self.metrics.record_rejection();
                warn!(nonce, %bridge, %caller, %err, "conversion rejected");
            }
        }
        result
    }

    fn try_convert(
        &mut self,
        state: &mut dyn StateProvider,
        bridge: Address,
        request: &ConversionRequest,
    ) -> Result<ConversionResult> {
        if !request.input_asset_a.is_used() {
            return Err(ValidationError::InvalidAssetType {
                slot: "input_asset_a",
                actual: AssetKind::NotUsed,
            }
            .into());
        }
        for asset in [
            &request.input_asset_a,
            &request.input_asset_b,
            &request.output_asset_a,
            &request.output_asset_b,
        ] {
            self.assets.validate(asset)?;
        }

        let nonce = request.interaction_nonce;
        if self.used_nonces.contains(&nonce) || self.pending.contains_key(&nonce) {
            return Err(BridgeError::InteractionAlreadyExists(nonce));
        }

        let processor = self.address;
        let target = self
            .bridges
            .get_mut(&bridge)
            .ok_or(BridgeError::UnknownBridge(bridge))?;

        atomically(state, |state| -> Result<ConversionResult> {
            let amount = request.total_input_value;
            for input in [&request.input_asset_a, &request.input_asset_b] {
                if let Some(token) = input.token() {
                    state.transfer(token, processor, bridge, amount)?;
                }
            }

            let result = target.convert(state, processor, request)?;
            if !result.is_async {
                collect_outputs(
                    state,
                    processor,
                    bridge,
                    &request.output_asset_a,
                    &request.output_asset_b,
                    &result,
                )?;
            }
            Ok(result)
        })
    }

    /// Whether the pending interaction `nonce` can be finalised now.
    pub fn can_finalise(&self, state: &dyn StateProvider, nonce: u64) -> Result<bool> {
        let pending = self
            .pending
            .get(&nonce)
            .ok_or(BridgeError::UnknownNonce(nonce))?;
        let bridge = self
            .bridges
            .get(&pending.bridge)
            .ok_or(BridgeError::UnknownBridge(pending.bridge))?;
        bridge.can_finalise(state, nonce)
    }

    /// Finalises a pending asynchronous interaction and collects its output.
    ///
    /// On failure the interaction stays pending, both here and in the bridge.
    pub fn process_async_defi_interaction(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        nonce: u64,
    ) -> Result<ConversionResult> {
        let pending = self
            .pending
            .get(&nonce)
            .cloned()
            .ok_or(BridgeError::UnknownNonce(nonce))?;

        let processor = self.address;
        let bridge = self
            .bridges
            .get_mut(&pending.bridge)
            .ok_or(BridgeError::UnknownBridge(pending.bridge))?;

        let mut settled = false;
        let result = atomically(state, |state| -> Result<ConversionResult> {
            let result = bridge.finalise(state, processor, nonce)?;
            settled = true;
            collect_outputs(
                state,
                processor,
                pending.bridge,
                &pending.output_asset_a,
                &pending.output_asset_b,
                &result,
            )?;
            Ok(result)
        });

        match result {
            Ok(result) => {
                self.pending.remove(&nonce);
                self.metrics.set_pending(self.pending.len());
                self.metrics.record_finalised();
                info!(nonce, %caller, output_a = %result.output_value_a, "interaction settled");
                Ok(result)
            }
            Err(err) => {
                if settled {
                    if let Err(revert) = bridge.revert_finalise(nonce) {
                        warn!(nonce, %revert, "bridge could not revert finalisation");
                    }
                }
                warn!(nonce, %caller, %err, "finalisation rejected");
                Err(err)
            }
        }
    }
}

fn approximate(value: U256) -> f64 {
    u128::try_from(value).map_or(f64::MAX, |v| v as f64)
}

/// Moves the outputs of a settled interaction from the bridge to the processor.
fn collect_outputs(
    state: &mut dyn StateProvider,
    processor: Address,
    bridge: Address,
    output_a: &AssetDescriptor,
    output_b: &AssetDescriptor,
    result: &ConversionResult,
) -> Result<()> {
    for (asset, value) in [
        (output_a, result.output_value_a),
        (output_b, result.output_value_b),
    ] {
        if value.is_zero() {
            continue;
        }
        if !asset.is_used() {
            return Err(ValidationError::UnexpectedOutput { value }.into());
        }
        if let Some(token) = asset.token() {
            state.transfer(token, bridge, processor, value)?;
        }
    }
    Ok(())
}
