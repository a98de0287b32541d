//! Fixed-term tranche venue.
//!
//! Each pool trades an underlying token for a principal token that redeems
//! one-for-one against the underlying once the tranche has expired. Principal
//! tokens are sold out of the vault's own balance; redemption is paid from the
//! tranche contract's backing.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LiquidityVenue, PoolInfo, VenueResult, mul_div, pay_out};
use crate::{error::VenueError, storage::StateProvider};

/// 1e18.
pub const WAD: U256 = U256::from_limbs([0x0de0_b6b3_a764_0000, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranchePool {
    pub pool: Address,
    /// Principal token, also the redemption contract.
    pub tranche: Address,
    pub underlying: Address,
    pub wrapped_position: Address,
    pub expiry: u64,
    /// Underlying paid per principal token, in WAD.
    pub price: U256,
}

impl TranchePool {
    fn info(&self) -> PoolInfo {
        PoolInfo {
            pool: self.pool,
            underlying: self.underlying,
            wrapped_position: self.wrapped_position,
            position_token: self.tranche,
            expiry: self.expiry,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrancheVenue {
    vault: Address,
    pools: HashMap<Address, TranchePool>,
    by_tranche: HashMap<Address, Address>,
}

impl TrancheVenue {
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            pools: HashMap::new(),
            by_tranche: HashMap::new(),
        }
    }

    pub fn with_pool(mut self, pool: TranchePool) -> Self {
        self.add_pool(pool);
        self
    }

    pub fn add_pool(&mut self, pool: TranchePool) {
        self.by_tranche.insert(pool.tranche, pool.pool);
        self.pools.insert(pool.pool, pool);
    }

    pub fn pool(&self, pool: Address) -> Option<&TranchePool> {
        self.pools.get(&pool)
    }

    pub fn pools(&self) -> impl Iterator<Item = &TranchePool> {
        self.pools.values()
    }

    fn pool_for_tranche(&self, tranche: Address) -> VenueResult<&TranchePool> {
        self.by_tranche
            .get(&tranche)
            .and_then(|pool| self.pools.get(pool))
            .ok_or(VenueError::UnknownPosition(tranche))
    }
}

impl LiquidityVenue for TrancheVenue {
    fn address(&self) -> Address {
        self.vault
    }

    fn name(&self) -> &'static str {
        "tranche"
    }

    fn pool_info(&self, pool: Address) -> Option<PoolInfo> {
        self.pool(pool).map(TranchePool::info)
    }

    /// Buys principal tokens of the tranche `token_out` with `token_in`.
    fn swap(
        &mut self,
        state: &mut dyn StateProvider,
        owner: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> VenueResult<U256> {
        let pool = *self.pool_for_tranche(token_out)?;
        if pool.underlying != token_in {
            return Err(VenueError::NoPool {
                token_in,
                token_out,
            });
        }

        let now = state.timestamp();
        if now >= pool.expiry {
            return Err(VenueError::Expired {
                position: pool.tranche,
                expiry: pool.expiry,
            });
        }

        let principal = mul_div(amount_in, WAD, pool.price)?;
        if principal.is_zero() {
            return Err(VenueError::ZeroOutput);
        }

        state.transfer(token_in, owner, self.vault, amount_in)?;
        pay_out(state, pool.tranche, self.vault, owner, principal)?;

        debug!(pool = %pool.pool, %amount_in, %principal, "bought principal tokens");
        Ok(principal)
    }

    /// Redeems matured principal tokens one-for-one for the underlying.
    fn withdraw(
        &mut self,
        state: &mut dyn StateProvider,
        owner: Address,
        position: Address,
        amount: U256,
    ) -> VenueResult<U256> {
        let pool = *self.pool_for_tranche(position)?;

        let now = state.timestamp();
        if now < pool.expiry {
            return Err(VenueError::NotMatured {
                position,
                maturity: pool.expiry,
                now,
            });
        }

        state.burn(position, owner, amount)?;
        pay_out(state, pool.underlying, pool.tranche, owner, amount)?;

        debug!(pool = %pool.pool, %amount, "redeemed principal tokens");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hashmap::HashMapStateProvider;

    const DAI: Address = Address::repeat_byte(0xda);
    const EXPIRY: u64 = 1_651_275_535;

    fn pool() -> TranchePool {
        TranchePool {
            pool: Address::repeat_byte(0x10),
            tranche: Address::repeat_byte(0x11),
            underlying: DAI,
            wrapped_position: Address::repeat_byte(0x12),
            expiry: EXPIRY,
            // 0.8 DAI per principal token
            price: WAD * U256::from(4) / U256::from(5),
        }
    }

    fn setup() -> eyre::Result<(HashMapStateProvider, TrancheVenue)> {
        let pool = pool();
        let venue = TrancheVenue::new(Address::repeat_byte(0xba)).with_pool(pool);
        let mut state = HashMapStateProvider::new(1).with_timestamp(EXPIRY - 1000);
        state.mint(pool.tranche, venue.address(), U256::from(1_000_000))?;
        state.mint(DAI, pool.tranche, U256::from(1_000_000))?;
        Ok((state, venue))
    }

    #[test]
    fn test_pool_info() {
        let venue = TrancheVenue::new(Address::ZERO).with_pool(pool());
        let info = venue.pool_info(pool().pool).unwrap();
        assert_eq!(info.expiry, EXPIRY);
        assert_eq!(info.position_token, pool().tranche);
        assert_eq!(venue.pool_info(Address::repeat_byte(0x99)), None);
    }

    #[test]
    fn test_buy_then_redeem() -> eyre::Result<()> {
        let (mut state, mut venue) = setup()?;
        let tranche = pool().tranche;
        let owner = Address::repeat_byte(0x01);
        state.mint(DAI, owner, U256::from(800))?;

        let principal = venue.swap(&mut state, owner, DAI, tranche, U256::from(800))?;
        assert_eq!(principal, U256::from(1000));
        assert_eq!(state.balance_of(DAI, venue.address()), U256::from(800));
        assert_eq!(state.balance_of(tranche, owner), U256::from(1000));

        let err = venue
            .withdraw(&mut state, owner, tranche, principal)
            .unwrap_err();
        assert!(matches!(err, VenueError::NotMatured { maturity: EXPIRY, .. }));

        state.set_timestamp(EXPIRY);
        let out = venue.withdraw(&mut state, owner, tranche, principal)?;
        assert_eq!(out, U256::from(1000));
        assert_eq!(state.balance_of(DAI, owner), U256::from(1000));
        assert_eq!(state.balance_of(tranche, owner), U256::ZERO);
        Ok(())
    }

    #[test]
    fn test_swap_after_expiry() -> eyre::Result<()> {
        let (mut state, mut venue) = setup()?;
        let owner = Address::repeat_byte(0x01);
        state.mint(DAI, owner, U256::from(10))?;
        state.set_timestamp(EXPIRY);

        let err = venue
            .swap(&mut state, owner, DAI, pool().tranche, U256::from(10))
            .unwrap_err();
        assert!(matches!(err, VenueError::Expired { .. }));
        assert_eq!(state.balance_of(DAI, owner), U256::from(10));
        Ok(())
    }

    #[test]
    fn test_swap_wrong_underlying() -> eyre::Result<()> {
        let (mut state, mut venue) = setup()?;
        let other = Address::repeat_byte(0x99);
        let err = venue
            .swap(&mut state, Address::ZERO, other, pool().tranche, U256::from(10))
            .unwrap_err();
        assert!(matches!(err, VenueError::NoPool { .. }));
        Ok(())
    }
}
