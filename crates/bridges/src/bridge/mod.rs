//! DeFi bridge interface and the bridges built on it.
//!
//! A bridge receives the input of an interaction from the rollup processor and
//! either settles it immediately (`is_async = false`, output held by the
//! bridge for the processor to collect) or records it and settles it later
//! through [`DefiBridge::finalise`].

pub mod aave;
pub mod curve;
pub mod element;

pub use aave::AaveLendingBridge;
pub use curve::CurveSwapBridge;
pub use element::ElementBridge;

use std::any::Any;

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::{
    asset::AssetDescriptor,
    error::{BridgeError, Result, ValidationError},
    storage::StateProvider,
};

/// Arguments of a single `convert` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input_asset_a: AssetDescriptor,
    pub input_asset_b: AssetDescriptor,
    pub output_asset_a: AssetDescriptor,
    pub output_asset_b: AssetDescriptor,
    pub total_input_value: U256,
    pub interaction_nonce: u64,
    pub aux_data: u64,
}

impl ConversionRequest {
    /// Single-input, single-output request with both secondary slots unused.
    pub fn new(
        input: AssetDescriptor,
        output: AssetDescriptor,
        total_input_value: U256,
        interaction_nonce: u64,
    ) -> Self {
        Self {
            input_asset_a: input,
            input_asset_b: AssetDescriptor::NOT_USED,
            output_asset_a: output,
            output_asset_b: AssetDescriptor::NOT_USED,
            total_input_value,
            interaction_nonce,
            aux_data: 0,
        }
    }

    pub fn with_aux_data(mut self, aux_data: u64) -> Self {
        self.aux_data = aux_data;
        self
    }

    pub fn with_input_b(mut self, asset: AssetDescriptor) -> Self {
        self.input_asset_b = asset;
        self
    }

    pub fn with_output_b(mut self, asset: AssetDescriptor) -> Self {
        self.output_asset_b = asset;
        self
    }

    /// Rejects requests that use either secondary slot.
    pub(crate) fn ensure_single_pair(&self) -> Result<(), ValidationError> {
        if self.input_asset_b.is_used() {
            return Err(ValidationError::InvalidAssetType {
                slot: "input_asset_b",
                actual: self.input_asset_b.kind(),
            });
        }
        if self.output_asset_b.is_used() {
            return Err(ValidationError::InvalidAssetType {
                slot: "output_asset_b",
                actual: self.output_asset_b.kind(),
            });
        }
        Ok(())
    }
}

/// Outcome of `convert` or `finalise`.
///
/// `output_value_b` is reserved for dual-output bridges; none of the bridges
/// here produce a second output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub output_value_a: U256,
    pub output_value_b: U256,
    pub is_async: bool,
}

impl ConversionResult {
    pub const fn pending() -> Self {
        Self {
            output_value_a: U256::ZERO,
            output_value_b: U256::ZERO,
            is_async: true,
        }
    }

    pub const fn sync(output_value_a: U256) -> Self {
        Self {
            output_value_a,
            output_value_b: U256::ZERO,
            is_async: false,
        }
    }
}

/// A bridge deployed behind the rollup processor.
pub trait DefiBridge: Any + Send {
    fn address(&self) -> Address;

    fn name(&self) -> &'static str;

    /// Converts the input already transferred to [`Self::address`].
    fn convert(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        request: &ConversionRequest,
    ) -> Result<ConversionResult>;

    /// Whether the interaction `nonce` can be finalised now.
    fn can_finalise(&self, _state: &dyn StateProvider, nonce: u64) -> Result<bool> {
        Err(BridgeError::UnknownNonce(nonce))
    }

    /// Settles an asynchronous interaction, leaving the output with the bridge.
    fn finalise(
        &mut self,
        _state: &mut dyn StateProvider,
        _caller: Address,
        nonce: u64,
    ) -> Result<ConversionResult> {
        Err(BridgeError::UnknownNonce(nonce))
    }

    /// Undoes the bookkeeping of a [`finalise`](Self::finalise) whose output
    /// the processor could not collect. Balances are restored by the caller.
    fn revert_finalise(&mut self, _nonce: u64) -> Result<()> {
        Ok(())
    }
}

impl dyn DefiBridge {
    pub fn downcast_ref<T: DefiBridge>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }

    pub fn downcast_mut<T: DefiBridge>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut()
    }
}

/// Bridges only accept calls from the processor they were deployed for.
pub(crate) fn ensure_processor(processor: Address, caller: Address) -> Result<()> {
    if caller != processor {
        return Err(ValidationError::InvalidCaller(caller).into());
    }
    Ok(())
}
