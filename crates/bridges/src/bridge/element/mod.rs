//! Asynchronous tranching bridge.
//!
//! `convert` buys principal tokens of the pool whose expiry is given in the
//! aux data and parks them with the bridge. Once the pool expires the
//! interaction can be finalised, which redeems the principal tokens back into
//! the underlying for the processor to collect.

pub mod registry;

pub use registry::{PoolConfig, PoolRegistry};

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use super::{ConversionRequest, ConversionResult, DefiBridge, ensure_processor};
use crate::{
    asset::{AssetDescriptor, AssetKind},
    error::{BridgeError, Result, ValidationError},
    interaction::{Interaction, InteractionLedger, InteractionState},
    metrics::BridgeMetrics,
    storage::StateProvider,
    venue::LiquidityVenue,
};

pub struct ElementBridge {
    address: Address,
    processor: Address,
    venue: Box<dyn LiquidityVenue>,
    pools: PoolRegistry,
    interactions: InteractionLedger,
    metrics: BridgeMetrics,
}

impl ElementBridge {
    pub fn new(address: Address, processor: Address, venue: Box<dyn LiquidityVenue>) -> Self {
        Self {
            address,
            processor,
            venue,
            pools: PoolRegistry::new(),
            interactions: InteractionLedger::new(),
            metrics: BridgeMetrics::new("element"),
        }
    }

    /// Registers a tranche pool for use by `convert`.
    ///
    /// Identical re-registration is a no-op.
    pub fn register_convergent_pool_address(
        &mut self,
        pool: Address,
        wrapped_position: Address,
        expiry: u64,
    ) -> Result<()> {
        match self
            .pools
            .register(self.venue.as_ref(), pool, wrapped_position, expiry)
        {
            Ok(true) => {
                self.metrics.record_pool_registered();
                info!(%pool, %wrapped_position, expiry, "registered tranche pool");
                Ok(())
            }
            Ok(false) => {
                debug!(%pool, expiry, "tranche pool already registered");
                Ok(())
            }
            Err(err) => {
                warn!(%pool, expiry, %err, "rejected tranche pool registration");
                Err(err)
            }
        }
    }

    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn interactions(&self) -> &InteractionLedger {
        &self.interactions
    }

    pub fn interaction(&self, nonce: u64) -> Option<&Interaction> {
        self.interactions.get(nonce)
    }

    pub fn venue(&self) -> &(dyn LiquidityVenue + 'static) {
        self.venue.as_ref()
    }

    pub fn venue_mut(&mut self) -> &mut (dyn LiquidityVenue + 'static) {
        self.venue.as_mut()
    }

    fn erc20(asset: &AssetDescriptor, slot: &'static str) -> Result<Address> {
        match (asset.kind(), asset.address()) {
            (AssetKind::Erc20, Some(address)) => Ok(address),
            (actual, _) => Err(ValidationError::InvalidAssetType { slot, actual }.into()),
        }
    }
}

impl DefiBridge for ElementBridge {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "element"
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
        if input != output {
            return Err(ValidationError::AssetMismatch { input, output }.into());
        }

        let nonce = request.interaction_nonce;
        if self.interactions.contains(nonce) {
            return Err(BridgeError::InteractionAlreadyExists(nonce));
        }

        let expiry = request.aux_data;
        let pool = *self
            .pools
            .pool_for(input, expiry)
            .ok_or(ValidationError::PoolNotFound {
                asset: input,
                expiry,
            })?;

        let now = state.timestamp();
        if now >= pool.expiry {
            return Err(ValidationError::TrancheExpired {
                expiry: pool.expiry,
                now,
            }
            .into());
        }

        let amount = request.total_input_value;
        if amount.is_zero() {
            return Err(ValidationError::ZeroAmount.into());
        }

        let position_amount = self
            .venue
            .swap(state, self.address, input, pool.tranche, amount)
            .inspect_err(|_| self.metrics.record_venue_error())?;

        self.interactions.insert(Interaction {
            nonce,
            input_asset: input,
            output_asset: output,
            amount_in: amount,
            position_amount,
            pool: pool.pool,
            maturity: Some(pool.expiry),
            state: InteractionState::Pending,
        })?;
        self.metrics.record_convert();

        info!(nonce, pool = %pool.pool, %amount, %position_amount, "interaction pending");
        Ok(ConversionResult::pending())
    }

    fn can_finalise(&self, state: &dyn StateProvider, nonce: u64) -> Result<bool> {
        let interaction = self
            .interactions
            .get(nonce)
            .ok_or(BridgeError::UnknownNonce(nonce))?;

        Ok(interaction.state_at(state.timestamp()) == InteractionState::Ready)
    }

    fn finalise(
        &mut self,
        state: &mut dyn StateProvider,
        caller: Address,
        nonce: u64,
    ) -> Result<ConversionResult> {
        ensure_processor(self.processor, caller)?;

        let now = state.timestamp();
        if self.interactions.poll(nonce, now)? != InteractionState::Ready {
            let maturity = self
                .interactions
                .get(nonce)
                .and_then(|i| i.maturity)
                .unwrap_or_default();
            return Err(BridgeError::BridgeNotReady { nonce, maturity });
        }

        let (pool, position_amount) = match self.interactions.get(nonce) {
            Some(interaction) => (interaction.pool, interaction.position_amount),
            None => return Err(BridgeError::UnknownNonce(nonce)),
        };
        let tranche = self
            .pools
            .get(pool)
            .map(|config| config.tranche)
            .ok_or(ValidationError::InvalidPool(pool))?;

        let proceeds = if position_amount.is_zero() {
            U256::ZERO
        } else {
            self.venue
                .withdraw(state, self.address, tranche, position_amount)
                .inspect_err(|_| self.metrics.record_venue_error())?
        };

        self.interactions.mark_finalised(nonce)?;
        self.metrics.record_finalisation();

        info!(nonce, %pool, %proceeds, "interaction finalised");
        Ok(ConversionResult::sync(proceeds))
    }

    fn revert_finalise(&mut self, nonce: u64) -> Result<()> {
        self.interactions.reopen(nonce)?;
        debug!(nonce, "finalisation reverted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        storage::{atomically, hashmap::HashMapStateProvider},
        venue::{TranchePool, TrancheVenue, WAD},
    };

    const DAI: Address = Address::repeat_byte(0xda);
    const PROCESSOR: Address = Address::repeat_byte(0xee);
    const BRIDGE: Address = Address::repeat_byte(0xeb);
    const EXPIRY: u64 = 1_651_275_535;

    fn pool() -> TranchePool {
        TranchePool {
            pool: Address::repeat_byte(0x10),
            tranche: Address::repeat_byte(0x11),
            underlying: DAI,
            wrapped_position: Address::repeat_byte(0x12),
            expiry: EXPIRY,
            price: WAD,
        }
    }

    fn setup() -> eyre::Result<(HashMapStateProvider, ElementBridge)> {
        let venue = TrancheVenue::new(Address::repeat_byte(0xba)).with_pool(pool());
        let mut state = HashMapStateProvider::new(1).with_timestamp(EXPIRY - 100);
        state.mint(pool().tranche, venue.address(), U256::from(1_000))?;
        state.mint(DAI, pool().tranche, U256::from(1_000))?;

        let mut bridge = ElementBridge::new(BRIDGE, PROCESSOR, Box::new(venue));
        bridge.register_convergent_pool_address(pool().pool, pool().wrapped_position, EXPIRY)?;
        Ok((state, bridge))
    }

    fn request(nonce: u64, amount: u64) -> ConversionRequest {
        let dai = AssetDescriptor::erc20(1, DAI).unwrap();
        ConversionRequest::new(dai, dai, U256::from(amount), nonce).with_aux_data(EXPIRY)
    }

    #[test]
    fn test_rejects_foreign_caller() -> eyre::Result<()> {
        let (mut state, mut bridge) = setup()?;
        let caller = Address::repeat_byte(0x01);
        assert_eq!(
            bridge.convert(&mut state, caller, &request(1, 10)),
            Err(BridgeError::from(ValidationError::InvalidCaller(caller)))
        );
        Ok(())
    }

    #[test]
    fn test_convert_then_finalise() -> eyre::Result<()> {
        let (mut state, mut bridge) = setup()?;
        state.mint(DAI, BRIDGE, U256::from(100))?;

        let result = bridge.convert(&mut state, PROCESSOR, &request(1, 100))?;
        assert_eq!(result, ConversionResult::pending());
        assert_eq!(state.balance_of(pool().tranche, BRIDGE), U256::from(100));
        assert!(!bridge.can_finalise(&state, 1)?);

        state.set_timestamp(EXPIRY);
        assert!(bridge.can_finalise(&state, 1)?);
        let result = bridge.finalise(&mut state, PROCESSOR, 1)?;
        assert_eq!(result, ConversionResult::sync(U256::from(100)));
        assert_eq!(state.balance_of(pool().tranche, BRIDGE), U256::ZERO);
        assert_eq!(state.balance_of(DAI, BRIDGE), U256::from(100));

        assert!(!bridge.can_finalise(&state, 1)?);
        assert_eq!(
            bridge.finalise(&mut state, PROCESSOR, 1),
            Err(BridgeError::UnknownNonce(1))
        );
        Ok(())
    }

    #[test]
    fn test_reverted_finalisation_can_be_retried() -> eyre::Result<()> {
        let (mut state, mut bridge) = setup()?;
        state.mint(DAI, BRIDGE, U256::from(100))?;
        bridge.convert(&mut state, PROCESSOR, &request(1, 100))?;
        state.set_timestamp(EXPIRY);

        let outcome = atomically(&mut state, |state| -> Result<()> {
            bridge.finalise(state, PROCESSOR, 1)?;
            Err(BridgeError::UnknownBridge(Address::ZERO))
        });
        assert!(outcome.is_err());
        bridge.revert_finalise(1)?;

        assert_eq!(state.balance_of(pool().tranche, BRIDGE), U256::from(100));
        assert!(bridge.can_finalise(&state, 1)?);
        let result = bridge.finalise(&mut state, PROCESSOR, 1)?;
        assert_eq!(result, ConversionResult::sync(U256::from(100)));
        Ok(())
    }

    #[test]
    fn test_unknown_expiry() -> eyre::Result<()> {
        let (mut state, mut bridge) = setup()?;
        state.mint(DAI, BRIDGE, U256::from(10))?;
        let req = request(1, 10).with_aux_data(EXPIRY + 1);
        assert_eq!(
            bridge.convert(&mut state, PROCESSOR, &req),
            Err(BridgeError::from(ValidationError::PoolNotFound {
                asset: DAI,
                expiry: EXPIRY + 1
            }))
        );
        Ok(())
    }

    #[test]
    fn test_zero_amount() -> eyre::Result<()> {
        let (mut state, mut bridge) = setup()?;
        assert_eq!(
            bridge.convert(&mut state, PROCESSOR, &request(1, 0)),
            Err(BridgeError::from(ValidationError::ZeroAmount))
        );
        assert!(bridge.interactions().is_empty());
        Ok(())
    }
}
