//! External liquidity venues the bridges settle against.
//!
//! A venue keeps its reserves as ordinary ledger balances under its own (or
//! its pools') addresses, so every trade is visible through
//! [`StateProvider::balance_of`].

pub mod amm;
pub mod lending;
pub mod tranche;

pub use amm::{AmmPool, AmmVenue};
pub use lending::{LendingVenue, RAY, Reserve};
pub use tranche::{TranchePool, TrancheVenue, WAD};

use std::any::Any;

use alloy_primitives::{Address, U256};

use crate::{error::VenueError, storage::StateProvider};

pub type VenueResult<T> = Result<T, VenueError>;

/// Pool metadata a venue exposes for registration checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    pub pool: Address,
    pub underlying: Address,
    pub wrapped_position: Address,
    /// Token received when entering the pool.
    pub position_token: Address,
    pub expiry: u64,
}

/// Swap, deposit and withdraw primitives used by the bridges.
///
/// `owner` is the account whose balances are debited and credited.
pub trait LiquidityVenue: Any + Send {
    fn address(&self) -> Address;

    fn name(&self) -> &'static str;

    /// Resolves a pool address to its configuration.
    fn pool_info(&self, _pool: Address) -> Option<PoolInfo> {
        None
    }

    /// Position token minted for deposits of `asset`.
    fn position_token(&self, _asset: Address) -> Option<Address> {
        None
    }

    /// Exchanges `amount_in` of `token_in` for `token_out`, returning the amount received.
    fn swap(
        &mut self,
        _state: &mut dyn StateProvider,
        _owner: Address,
        _token_in: Address,
        _token_out: Address,
        _amount_in: U256,
    ) -> VenueResult<U256> {
        Err(self.unsupported("swap"))
    }

    /// Deposits `amount` of `asset`, returning the position amount received.
    fn deposit(
        &mut self,
        _state: &mut dyn StateProvider,
        _owner: Address,
        _asset: Address,
        _amount: U256,
    ) -> VenueResult<U256> {
        Err(self.unsupported("deposit"))
    }

    /// Redeems `amount` of the `position` token, returning the underlying paid out.
    fn withdraw(
        &mut self,
        _state: &mut dyn StateProvider,
        _owner: Address,
        _position: Address,
        _amount: U256,
    ) -> VenueResult<U256> {
        Err(self.unsupported("withdraw"))
    }

    fn unsupported(&self, operation: &'static str) -> VenueError {
        VenueError::Unsupported {
            venue: self.name(),
            operation,
        }
    }
}

impl dyn LiquidityVenue {
    pub fn downcast_ref<T: LiquidityVenue>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }

    pub fn downcast_mut<T: LiquidityVenue>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut()
    }
}

/// Pays `amount` of `token` out of `reserve`, checking liquidity first.
pub(crate) fn pay_out(
    state: &mut dyn StateProvider,
    token: Address,
    reserve: Address,
    to: Address,
    amount: U256,
) -> VenueResult<()> {
    let available = state.balance_of(token, reserve);
    if available < amount {
        return Err(VenueError::InsufficientLiquidity {
            token,
            available,
            required: amount,
        });
    }
    state.transfer(token, reserve, to, amount)?;
    Ok(())
}

/// `a * b / denominator`, rounding down.
pub(crate) fn mul_div(a: U256, b: U256, denominator: U256) -> VenueResult<U256> {
    if denominator.is_zero() {
        return Err(VenueError::Overflow);
    }
    a.checked_mul(b)
        .map(|product| product / denominator)
        .ok_or(VenueError::Overflow)
}
