//! Per-bridge ledger of asynchronous interactions keyed by nonce.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Lifecycle of an asynchronous interaction.
///
/// `Pending -> Ready -> Finalised`; nothing leaves `Finalised`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum InteractionState {
    Pending,
    Ready,
    Finalised,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interaction {
    pub nonce: u64,
    pub input_asset: Address,
    pub output_asset: Address,
    pub amount_in: U256,
    /// Amount of the intermediate position held for this interaction.
    pub position_amount: U256,
    pub pool: Address,
    pub maturity: Option<u64>,
    pub state: InteractionState,
}

impl Interaction {
    pub fn is_mature(&self, now: u64) -> bool {
        self.maturity.is_none_or(|maturity| now >= maturity)
    }

    /// State as observed at `now`, without mutating the record.
    pub fn state_at(&self, now: u64) -> InteractionState {
        match self.state {
            InteractionState::Pending if self.is_mature(now) => InteractionState::Ready,
            state => state,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionLedger {
    interactions: BTreeMap<u64, Interaction>,
}

impl InteractionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new interaction. Nonces are unique for the lifetime of the
    /// ledger, finalised ones included.
    pub fn insert(&mut self, interaction: Interaction) -> Result<()> {
        let nonce = interaction.nonce;
        if self.interactions.contains_key(&nonce) {
            return Err(BridgeError::InteractionAlreadyExists(nonce));
        }
        self.interactions.insert(nonce, interaction);
        Ok(())
    }

    pub fn get(&self, nonce: u64) -> Option<&Interaction> {
        self.interactions.get(&nonce)
    }

    pub fn contains(&self, nonce: u64) -> bool {
        self.interactions.contains_key(&nonce)
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Advances a pending interaction to `Ready` if it has matured, returning
    /// the resulting state. Finalised interactions are reported as unknown.
    pub fn poll(&mut self, nonce: u64, now: u64) -> Result<InteractionState> {
        let interaction = self
            .interactions
            .get_mut(&nonce)
            .filter(|i| i.state != InteractionState::Finalised)
            .ok_or(BridgeError::UnknownNonce(nonce))?;

        interaction.state = interaction.state_at(now);
        Ok(interaction.state)
    }

    /// Moves a `Ready` interaction to `Finalised`.
    pub fn mark_finalised(&mut self, nonce: u64) -> Result<&Interaction> {
        let interaction = self
            .interactions
            .get_mut(&nonce)
            .ok_or(BridgeError::UnknownNonce(nonce))?;

        match interaction.state {
            InteractionState::Ready => {
                interaction.state = InteractionState::Finalised;
                Ok(interaction)
            }
            InteractionState::Pending => Err(BridgeError::BridgeNotReady {
                nonce,
                maturity: interaction.maturity.unwrap_or_default(),
            }),
            InteractionState::Finalised => Err(BridgeError::UnknownNonce(nonce)),
        }
    }

    /// Moves a `Finalised` interaction back to `Ready`.
    pub fn reopen(&mut self, nonce: u64) -> Result<()> {
        match self.interactions.get_mut(&nonce) {
            Some(interaction) if interaction.state == InteractionState::Finalised => {
                interaction.state = InteractionState::Ready;
                Ok(())
            }
            _ => Err(BridgeError::UnknownNonce(nonce)),
        }
    }

    /// Interactions not yet finalised, ordered by nonce.
    pub fn outstanding(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions
            .values()
            .filter(|i| i.state != InteractionState::Finalised)
    }

    /// Total position still held for unfinalised interactions in `pool`.
    pub fn outstanding_position(&self, pool: Address) -> U256 {
        self.outstanding()
            .filter(|i| i.pool == pool)
            .fold(U256::ZERO, |acc, i| acc.saturating_add(i.position_amount))
    }
}
