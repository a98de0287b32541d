pub mod hashmap;

use alloy_primitives::{Address, U256};

use crate::error::StorageError;

/// Ledger token used for native ETH balances.
pub const ETH: Address = Address::ZERO;

/// Handle to a journal entry created by [`StateProvider::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub(crate) usize);

/// Token ledger and chain clock shared by the processor, bridges and venues.
///
/// Implementations must support nested checkpoints: `revert_to` restores the
/// balances recorded at the checkpoint and `commit` keeps the current ones.
pub trait StateProvider {
    fn chain_id(&self) -> u64;
    fn timestamp(&self) -> u64;
    fn balance_of(&self, token: Address, holder: Address) -> U256;
    fn total_supply(&self, token: Address) -> U256;
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), StorageError>;
    fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), StorageError>;
    fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), StorageError>;
    fn checkpoint(&mut self) -> Checkpoint;
    fn revert_to(&mut self, checkpoint: Checkpoint);
    fn commit(&mut self, checkpoint: Checkpoint);
}

/// Runs `f` inside a checkpoint, reverting every ledger change if it fails.
pub fn atomically<T, E>(
    state: &mut dyn StateProvider,
    f: impl FnOnce(&mut dyn StateProvider) -> Result<T, E>,
) -> Result<T, E> {
    let checkpoint = state.checkpoint();
    match f(state) {
        Ok(value) => {
            state.commit(checkpoint);
            Ok(value)
        }
        Err(err) => {
            state.revert_to(checkpoint);
            Err(err)
        }
    }
}
