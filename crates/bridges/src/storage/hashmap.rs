use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::{
    error::StorageError,
    storage::{Checkpoint, StateProvider},
};

#[derive(Debug, Clone, Default)]
struct Balances {
    accounts: HashMap<(Address, Address), U256>,
    supplies: HashMap<Address, U256>,
}

/// In-memory [`StateProvider`] backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct HashMapStateProvider {
    chain_id: u64,
    timestamp: u64,
    balances: Balances,
    journal: Vec<Balances>,
}

impl HashMapStateProvider {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Moves the clock forward, returning the new timestamp.
    pub fn advance_time(&mut self, seconds: u64) -> u64 {
        self.timestamp = self.timestamp.saturating_add(seconds);
        self.timestamp
    }

    /// Number of open checkpoints.
    pub fn depth(&self) -> usize {
        self.journal.len()
    }
}

impl StateProvider for HashMapStateProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .accounts
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    fn total_supply(&self, token: Address) -> U256 {
        self.balances
            .supplies
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), StorageError> {
        let available = self.balance_of(token, from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(StorageError::InsufficientBalance {
                token,
                holder: from,
                available,
                required: amount,
            })?;

        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(StorageError::Overflow { token, holder: to })?;

        // `from == to` must leave the balance unchanged.
        self.balances.accounts.insert((token, from), remaining);
        let credited = if from == to { available } else { credited };
        self.balances.accounts.insert((token, to), credited);
        Ok(())
    }

    fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), StorageError> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(StorageError::Overflow { token, holder: to })?;
        let balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(StorageError::Overflow { token, holder: to })?;

        self.balances.supplies.insert(token, supply);
        self.balances.accounts.insert((token, to), balance);
        Ok(())
    }

    fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), StorageError> {
        let available = self.balance_of(token, from);
        let balance = available
            .checked_sub(amount)
            .ok_or(StorageError::InsufficientBalance {
                token,
                holder: from,
                available,
                required: amount,
            })?;
        let supply = self.total_supply(token).saturating_sub(amount);

        self.balances.supplies.insert(token, supply);
        self.balances.accounts.insert((token, from), balance);
        Ok(())
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.journal.push(self.balances.clone());
        Checkpoint(self.journal.len() - 1)
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.journal.len() {
            return;
        }
        self.journal.truncate(checkpoint.0 + 1);
        if let Some(snapshot) = self.journal.pop() {
            self.balances = snapshot;
        }
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.0);
    }
}
