//! A simulated chain assembled from a [`DeploymentConfig`].

use std::{path::Path, sync::Arc};

use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use tracing::info;

use crate::{
    asset::AssetDescriptor,
    bridge::{AaveLendingBridge, ConversionRequest, ConversionResult, CurveSwapBridge, ElementBridge},
    config::DeploymentConfig,
    error::{BridgeError, ConfigError, Result},
    processor::RollupProcessor,
    storage::{StateProvider, hashmap::HashMapStateProvider},
    venue::{AmmPool, AmmVenue, LendingVenue, Reserve, TranchePool, TrancheVenue},
};

/// Deployment shared between threads. Every operation takes the lock, which
/// serialises access to the processor and its bridges.
pub type SharedDeployment = Arc<Mutex<Deployment>>;

pub struct Deployment {
    pub state: HashMapStateProvider,
    pub processor: RollupProcessor,
    config: DeploymentConfig,
}

impl Deployment {
    /// Seeds venue liquidity, registers assets and deploys the three bridges.
    pub fn from_config(config: DeploymentConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut state =
            HashMapStateProvider::new(config.chain_id).with_timestamp(config.genesis_timestamp);
        let mut processor = RollupProcessor::new(config.processor);
        for asset in &config.assets {
            processor.register_asset(asset.address)?;
        }

        let mut amm = AmmVenue::new(config.amm.address);
        for pool in &config.amm.pools {
            let token_a = config.token(&pool.token_a)?;
            let token_b = config.token(&pool.token_b)?;
            state.mint(token_a, pool.address, pool.reserve_a)?;
            state.mint(token_b, pool.address, pool.reserve_b)?;
            amm.add_pool(AmmPool {
                address: pool.address,
                token_a,
                token_b,
                fee_bps: pool.fee_bps,
            });
        }

        let mut lending = LendingVenue::new(config.lending.address);
        for reserve in &config.lending.reserves {
            let underlying = config.token(&reserve.asset)?;
            state.mint(underlying, config.lending.address, reserve.liquidity)?;
            lending.add_reserve(
                Reserve::new(underlying, reserve.a_token)
                    .with_liquidity_index(reserve.liquidity_index),
            );
        }

        let mut tranche = TrancheVenue::new(config.tranche.vault);
        for pool in &config.tranche.pools {
            let underlying = config.token(&pool.asset)?;
            state.mint(pool.tranche, config.tranche.vault, pool.liquidity)?;
            state.mint(underlying, pool.tranche, pool.liquidity)?;
            tranche.add_pool(TranchePool {
                pool: pool.pool,
                tranche: pool.tranche,
                underlying,
                wrapped_position: pool.wrapped_position,
                expiry: pool.expiry,
                price: pool.price,
            });
        }

        let bridges = &config.bridges;
        processor.deploy_bridge(Box::new(ElementBridge::new(
            bridges.element,
            config.processor,
            Box::new(tranche),
        )))?;
        processor.deploy_bridge(Box::new(CurveSwapBridge::new(
            bridges.curve,
            config.processor,
            Box::new(amm),
        )))?;
        processor.deploy_bridge(Box::new(AaveLendingBridge::new(
            bridges.aave,
            config.processor,
            Box::new(lending),
        )))?;

        info!(
            chain_id = config.chain_id,
            assets = processor.assets().len(),
            timestamp = config.genesis_timestamp,
            "deployment ready"
        );
        Ok(Self {
            state,
            processor,
            config,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_config(DeploymentConfig::load(path)?)
    }

    /// Deployment built from [`DeploymentConfig::default_test_config`].
    pub fn test_deployment() -> Result<Self, ConfigError> {
        Self::from_config(DeploymentConfig::default_test_config())
    }

    pub fn into_shared(self) -> SharedDeployment {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn element(&self) -> Result<&ElementBridge> {
        let address = self.config.bridges.element;
        self.processor
            .bridge(address)
            .ok_or(BridgeError::UnknownBridge(address))
    }

    pub fn element_mut(&mut self) -> Result<&mut ElementBridge> {
        let address = self.config.bridges.element;
        self.processor
            .bridge_mut(address)
            .ok_or(BridgeError::UnknownBridge(address))
    }

    pub fn curve(&self) -> Result<&CurveSwapBridge> {
        let address = self.config.bridges.curve;
        self.processor
            .bridge(address)
            .ok_or(BridgeError::UnknownBridge(address))
    }

    pub fn aave(&self) -> Result<&AaveLendingBridge> {
        let address = self.config.bridges.aave;
        self.processor
            .bridge(address)
            .ok_or(BridgeError::UnknownBridge(address))
    }

    pub fn aave_mut(&mut self) -> Result<&mut AaveLendingBridge> {
        let address = self.config.bridges.aave;
        self.processor
            .bridge_mut(address)
            .ok_or(BridgeError::UnknownBridge(address))
    }

    /// Processor asset descriptor for a configured symbol.
    pub fn asset(&self, symbol: &str) -> Result<AssetDescriptor, ConfigError> {
        let token = self.config.token(symbol)?;
        self.processor
            .asset_for(token)
            .ok_or_else(|| ConfigError::UnknownAsset(symbol.to_string()))
    }

    /// Registers the tranche pool `name` with the Element bridge.
    pub fn register_tranche_pool(&mut self, name: &str) -> Result<(), ConfigError> {
        let pool = self.config.tranche_pool(name)?.clone();
        self.element_mut()?.register_convergent_pool_address(
            pool.pool,
            pool.wrapped_position,
            pool.expiry,
        )?;
        Ok(())
    }

    /// Creates the zkAToken for `symbol` and registers it with the processor.
    pub fn enable_lending(&mut self, symbol: &str) -> Result<AssetDescriptor, ConfigError> {
        let underlying = self.config.token(symbol)?;
        let zk_atoken = self.aave_mut()?.set_underlying_to_zk_atoken(underlying)?;
        Ok(self.processor.register_asset(zk_atoken)?)
    }

    pub fn prefund(&mut self, token: Address, amount: U256) -> Result<()> {
        self.processor
            .prefund_with_token(&mut self.state, token, amount)
    }

    pub fn convert(
        &mut self,
        caller: Address,
        bridge: Address,
        request: ConversionRequest,
    ) -> Result<ConversionResult> {
        self.processor
            .convert(&mut self.state, caller, bridge, request)
    }

    pub fn can_finalise(&self, nonce: u64) -> Result<bool> {
        self.processor.can_finalise(&self.state, nonce)
    }

    pub fn process_async_defi_interaction(
        &mut self,
        caller: Address,
        nonce: u64,
    ) -> Result<ConversionResult> {
        self.processor
            .process_async_defi_interaction(&mut self.state, caller, nonce)
    }

    pub fn now(&self) -> u64 {
        self.state.timestamp()
    }

    pub fn warp_to(&mut self, timestamp: u64) {
        self.state.set_timestamp(timestamp);
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.state.balance_of(token, holder)
    }
}
