//! Interest-bearing lending pool with scaled position balances.
//!
//! Deposits mint position tokens in *scaled* units: `amount / liquidity_index`.
//! The underlying value of a scaled balance grows as the index grows, which is
//! how accrued interest is modelled. Index arithmetic uses half-up rounding in
//! ray precision (27 decimals).

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LiquidityVenue, VenueResult, pay_out};
use crate::{error::VenueError, storage::StateProvider};

/// 1e27.
pub const RAY: U256 = U256::from_limbs([0x9fd0_803c_e800_0000, 0x033b_2e3c, 0, 0]);

/// A single lending reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub underlying: Address,
    pub a_token: Address,
    pub liquidity_index: U256,
}

impl Reserve {
    pub fn new(underlying: Address, a_token: Address) -> Self {
        Self {
            underlying,
            a_token,
            liquidity_index: RAY,
        }
    }

    pub fn with_liquidity_index(mut self, index: U256) -> Self {
        self.liquidity_index = index;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LendingVenue {
    address: Address,
    reserves: HashMap<Address, Reserve>,
    by_a_token: HashMap<Address, Address>,
}

impl LendingVenue {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            reserves: HashMap::new(),
            by_a_token: HashMap::new(),
        }
    }

    pub fn with_reserve(mut self, reserve: Reserve) -> Self {
        self.add_reserve(reserve);
        self
    }

    pub fn add_reserve(&mut self, reserve: Reserve) {
        self.by_a_token.insert(reserve.a_token, reserve.underlying);
        self.reserves.insert(reserve.underlying, reserve);
    }

    pub fn reserve(&self, underlying: Address) -> Option<&Reserve> {
        self.reserves.get(&underlying)
    }

    pub fn liquidity_index(&self, underlying: Address) -> Option<U256> {
        self.reserve(underlying).map(|r| r.liquidity_index)
    }

    /// Updates the index of a reserve, e.g. to simulate accrued interest.
    pub fn set_liquidity_index(&mut self, underlying: Address, index: U256) -> VenueResult<()> {
        let reserve = self
            .reserves
            .get_mut(&underlying)
            .ok_or(VenueError::UnknownReserve(underlying))?;
        reserve.liquidity_index = index;
        Ok(())
    }

    /// Underlying value of `holder`'s position in the reserve behind `a_token`.
    pub fn underlying_balance_of(
        &self,
        state: &dyn StateProvider,
        a_token: Address,
        holder: Address,
    ) -> VenueResult<U256> {
        let reserve = self.reserve_for_position(a_token)?;
        ray_mul(state.balance_of(a_token, holder), reserve.liquidity_index)
    }

    fn reserve_for_position(&self, a_token: Address) -> VenueResult<&Reserve> {
        self.by_a_token
            .get(&a_token)
            .and_then(|underlying| self.reserves.get(underlying))
            .ok_or(VenueError::UnknownPosition(a_token))
    }
}

impl LiquidityVenue for LendingVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &'static str {
        "lending"
    }

    fn position_token(&self, asset: Address) -> Option<Address> {
        self.reserve(asset).map(|r| r.a_token)
    }

    fn deposit(
        &mut self,
        state: &mut dyn StateProvider,
        owner: Address,
        asset: Address,
        amount: U256,
    ) -> VenueResult<U256> {
        let reserve = *self
            .reserve(asset)
            .ok_or(VenueError::UnknownReserve(asset))?;
        let scaled = ray_div(amount, reserve.liquidity_index)?;
        if scaled.is_zero() {
            return Err(VenueError::ZeroOutput);
        }

        state.transfer(asset, owner, self.address, amount)?;
        state.mint(reserve.a_token, owner, scaled)?;

        debug!(%asset, %owner, %amount, %scaled, "lending deposit");
        Ok(scaled)
    }

    /// `amount` is in scaled units.
    fn withdraw(
        &mut self,
        state: &mut dyn StateProvider,
        owner: Address,
        position: Address,
        amount: U256,
    ) -> VenueResult<U256> {
        let reserve = *self.reserve_for_position(position)?;
        let underlying = ray_mul(amount, reserve.liquidity_index)?;

        state.burn(position, owner, amount)?;
        pay_out(state, reserve.underlying, self.address, owner, underlying)?;

        debug!(%position, %owner, %amount, %underlying, "lending withdraw");
        Ok(underlying)
    }
}

/// `a * b / RAY`, rounding half up.
pub fn ray_mul(a: U256, b: U256) -> VenueResult<U256> {
    a.checked_mul(b)
        .and_then(|p| p.checked_add(RAY >> 1))
        .map(|p| p / RAY)
        .ok_or(VenueError::Overflow)
}

/// `a * RAY / b`, rounding half up.
pub fn ray_div(a: U256, b: U256) -> VenueResult<U256> {
    if b.is_zero() {
        return Err(VenueError::Overflow);
    }
    a.checked_mul(RAY)
        .and_then(|p| p.checked_add(b >> 1))
        .map(|p| p / b)
        .ok_or(VenueError::Overflow)
}
