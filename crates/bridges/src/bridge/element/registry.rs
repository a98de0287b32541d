use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Address;
use serde::Serialize;

use crate::{
    error::{BridgeError, Result, ValidationError},
    venue::LiquidityVenue,
};

/// A validated tranche pool registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolConfig {
    pub pool: Address,
    pub underlying: Address,
    pub wrapped_position: Address,
    pub tranche: Address,
    pub expiry: u64,
}

/// Tranche pools registered with a bridge, keyed by pool address.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: BTreeMap<Address, PoolConfig>,
    by_expiry: HashMap<(Address, u64), Address>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pool` after checking the supplied parameters against what
    /// the venue reports for it.
    ///
    /// Returns `true` if the pool was newly added; re-registering identical
    /// parameters returns `false` and changes nothing.
    pub fn register(
        &mut self,
        venue: &dyn LiquidityVenue,
        pool: Address,
        wrapped_position: Address,
        expiry: u64,
    ) -> Result<bool> {
        let info = venue
            .pool_info(pool)
            .ok_or(ValidationError::InvalidPool(pool))?;

        if info.expiry != expiry {
            return Err(BridgeError::PoolExpiryMismatch {
                pool,
                actual: info.expiry,
                supplied: expiry,
            });
        }
        if info.wrapped_position != wrapped_position {
            return Err(ValidationError::InvalidWrappedPosition {
                pool,
                supplied: wrapped_position,
            }
            .into());
        }

        let config = PoolConfig {
            pool,
            underlying: info.underlying,
            wrapped_position,
            tranche: info.position_token,
            expiry,
        };
        if self.pools.get(&pool) == Some(&config) {
            return Ok(false);
        }

        self.by_expiry.insert((config.underlying, expiry), pool);
        self.pools.insert(pool, config);
        Ok(true)
    }

    pub fn get(&self, pool: Address) -> Option<&PoolConfig> {
        self.pools.get(&pool)
    }

    /// Pool trading `underlying` that expires at `expiry`.
    pub fn pool_for(&self, underlying: Address, expiry: u64) -> Option<&PoolConfig> {
        self.by_expiry
            .get(&(underlying, expiry))
            .and_then(|pool| self.pools.get(pool))
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolConfig> {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
