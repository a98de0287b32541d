//! Constant-product swap venue.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LiquidityVenue, VenueResult, mul_div, pay_out};
use crate::{error::VenueError, storage::StateProvider};

const BPS: u64 = 10_000;

/// A two-token pool. Reserves are the ledger balances held at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmPool {
    pub address: Address,
    pub token_a: Address,
    pub token_b: Address,
    pub fee_bps: u16,
}

impl AmmPool {
    fn trades(&self, token_in: Address, token_out: Address) -> bool {
        (self.token_a == token_in && self.token_b == token_out)
            || (self.token_b == token_in && self.token_a == token_out)
    }
}

/// Pair-lookup swap router over a set of [`AmmPool`]s.
#[derive(Debug, Clone)]
pub struct AmmVenue {
    address: Address,
    pools: Vec<AmmPool>,
}

impl AmmVenue {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pools: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: AmmPool) -> Self {
        self.add_pool(pool);
        self
    }

    pub fn add_pool(&mut self, pool: AmmPool) {
        self.pools.push(pool);
    }

    pub fn pools(&self) -> &[AmmPool] {
        &self.pools
    }

    /// First pool trading the pair, in insertion order.
    pub fn find_pool(&self, token_in: Address, token_out: Address) -> Option<&AmmPool> {
        self.pools.iter().find(|pool| pool.trades(token_in, token_out))
    }

    /// Output amount for a swap against current reserves.
    pub fn quote(
        &self,
        state: &dyn StateProvider,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> VenueResult<U256> {
        let pool = self
            .find_pool(token_in, token_out)
            .ok_or(VenueError::NoPool { token_in, token_out })?;

        let reserve_in = state.balance_of(token_in, pool.address);
        let reserve_out = state.balance_of(token_out, pool.address);

        let fee_factor = U256::from(BPS - u64::from(pool.fee_bps.min(BPS as u16)));
        let amount_in_with_fee = amount_in.checked_mul(fee_factor).ok_or(VenueError::Overflow)?;
        let denominator = reserve_in
            .checked_mul(U256::from(BPS))
            .and_then(|r| r.checked_add(amount_in_with_fee))
            .ok_or(VenueError::Overflow)?;

        mul_div(amount_in_with_fee, reserve_out, denominator)
    }
}

impl LiquidityVenue for AmmVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "amm"
    }

    fn swap(
        &mut self,
        state: &mut dyn StateProvider,
        owner: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> VenueResult<U256> {
        let amount_out = self.quote(state, token_in, token_out, amount_in)?;
        if amount_out.is_zero() {
            return Err(VenueError::ZeroOutput);
        }

        let pool = self
            .find_pool(token_in, token_out)
            .ok_or(VenueError::NoPool { token_in, token_out })?
            .address;

        state.transfer(token_in, owner, pool, amount_in)?;
        pay_out(state, token_out, pool, owner, amount_out)?;

        debug!(%pool, %token_in, %token_out, %amount_in, %amount_out, "amm swap");
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ETH, hashmap::HashMapStateProvider};

    const CVX: Address = Address::repeat_byte(0xc0);

    fn setup() -> (HashMapStateProvider, AmmVenue, AmmPool) {
        let pool = AmmPool {
            address: Address::repeat_byte(0x50),
            token_a: CVX,
            token_b: ETH,
            fee_bps: 30,
        };
        let mut state = HashMapStateProvider::new(1);
        state.mint(CVX, pool.address, U256::from(1_000_000)).unwrap();
        state.mint(ETH, pool.address, U256::from(500_000)).unwrap();
        (state, AmmVenue::new(Address::repeat_byte(0x51)).with_pool(pool), pool)
    }

    #[test]
    fn test_swap_moves_reserves() -> eyre::Result<()> {
        let (mut state, mut venue, pool) = setup();
        let trader = Address::repeat_byte(0x01);
        state.mint(CVX, trader, U256::from(10_000))?;

        let quoted = venue.quote(&state, CVX, ETH, U256::from(10_000))?;
        let out = venue.swap(&mut state, trader, CVX, ETH, U256::from(10_000))?;

        // 10_000 * 9970 * 500_000 / (1_000_000 * 10_000 + 10_000 * 9970)
        assert_eq!(out, U256::from(4935));
        assert_eq!(out, quoted);
        assert_eq!(state.balance_of(CVX, trader), U256::ZERO);
        assert_eq!(state.balance_of(ETH, trader), out);
        assert_eq!(state.balance_of(CVX, pool.address), U256::from(1_010_000));
        Ok(())
    }

    #[test]
    fn test_swap_is_symmetric_in_pair_lookup() {
        let (_, venue, pool) = setup();
        assert_eq!(venue.find_pool(ETH, CVX), Some(&pool));
        assert_eq!(venue.find_pool(CVX, Address::repeat_byte(0x99)), None);
    }

    #[test]
    fn test_swap_without_pool() {
        let (mut state, mut venue, _) = setup();
        let other = Address::repeat_byte(0x99);
        let err = venue
            .swap(&mut state, Address::repeat_byte(1), other, ETH, U256::from(1))
            .unwrap_err();
        assert_eq!(err, VenueError::NoPool { token_in: other, token_out: ETH });
    }

    #[test]
    fn test_dust_swap_rejected() {
        let (mut state, mut venue, _) = setup();
        let trader = Address::repeat_byte(0x01);
        state.mint(CVX, trader, U256::from(1)).unwrap();

        let err = venue.swap(&mut state, trader, CVX, ETH, U256::from(1)).unwrap_err();
        assert_eq!(err, VenueError::ZeroOutput);
        assert_eq!(state.balance_of(CVX, trader), U256::from(1));
    }

    #[test]
    fn test_deposit_unsupported() {
        let (mut state, mut venue, _) = setup();
        let err = venue
            .deposit(&mut state, Address::repeat_byte(1), CVX, U256::from(1))
            .unwrap_err();
        assert!(matches!(err, VenueError::Unsupported { operation: "deposit", .. }));
    }
}
