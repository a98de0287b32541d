//! Asset descriptors and the processor-side asset registry.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, storage::ETH};

/// Type tag carried by every asset slot of an interaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    #[default]
    #[display("NOT_USED")]
    NotUsed = 0,
    #[display("ETH")]
    Eth = 1,
    #[display("ERC20")]
    Erc20 = 2,
    #[display("VIRTUAL")]
    Virtual = 3,
}

/// An asset as seen by the rollup processor.
///
/// Only ERC20 assets carry a token address; constructing any other kind drops
/// the supplied address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawAssetDescriptor")]
pub struct AssetDescriptor {
    id: u32,
    kind: AssetKind,
    address: Option<Address>,
}

/// Unchecked wire form, validated through [`AssetDescriptor::new`].
#[derive(Deserialize)]
struct RawAssetDescriptor {
    id: u32,
    kind: AssetKind,
    address: Option<Address>,
}

impl TryFrom<RawAssetDescriptor> for AssetDescriptor {
    type Error = ValidationError;

    fn try_from(raw: RawAssetDescriptor) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.kind, raw.address)
    }
}

impl AssetDescriptor {
    /// Placeholder for an unused asset slot.
    pub const NOT_USED: Self = Self {
        id: 0,
        kind: AssetKind::NotUsed,
        address: None,
    };

    pub fn new(id: u32, kind: AssetKind, address: Option<Address>) -> Result<Self, ValidationError> {
        match kind {
            AssetKind::Erc20 => match address {
                Some(address) if !address.is_zero() => Ok(Self {
                    id,
                    kind,
                    address: Some(address),
                }),
                _ => Err(ValidationError::MissingTokenAddress { id }),
            },
            _ => Ok(Self {
                id,
                kind,
                address: None,
            }),
        }
    }

    pub fn erc20(id: u32, address: Address) -> Result<Self, ValidationError> {
        Self::new(id, AssetKind::Erc20, Some(address))
    }

    /// Native ETH always has asset id 0.
    pub const fn eth() -> Self {
        Self {
            id: 0,
            kind: AssetKind::Eth,
            address: None,
        }
    }

    pub const fn virtual_asset(id: u32) -> Self {
        Self {
            id,
            kind: AssetKind::Virtual,
            address: None,
        }
    }

    pub const fn id(&self) -> u32 {
        self.id
    }

    pub const fn kind(&self) -> AssetKind {
        self.kind
    }

    pub const fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn is_used(&self) -> bool {
        self.kind != AssetKind::NotUsed
    }

    /// Ledger token backing this asset, if any. ETH maps to [`ETH`].
    pub fn token(&self) -> Option<Address> {
        match self.kind {
            AssetKind::Erc20 => self.address,
            AssetKind::Eth => Some(ETH),
            AssetKind::Virtual | AssetKind::NotUsed => None,
        }
    }
}

/// Maps token addresses to processor asset ids.
///
/// Id 0 is reserved for ETH; ERC20 tokens receive sequential ids on first
/// registration.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: Vec<AssetDescriptor>,
    by_address: HashMap<Address, u32>,
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            assets: vec![AssetDescriptor::eth()],
            by_address: HashMap::new(),
        }
    }

    /// Registers an ERC20 token, returning the existing descriptor if the
    /// token is already known.
    pub fn register_erc20(&mut self, token: Address) -> Result<AssetDescriptor, ValidationError> {
        if let Some(existing) = self.by_address(token) {
            return Ok(*existing);
        }

        let id = self.assets.len() as u32;
        let descriptor = AssetDescriptor::erc20(id, token)?;
        self.assets.push(descriptor);
        self.by_address.insert(token, id);

        tracing::debug!(id, %token, "registered asset");
        Ok(descriptor)
    }

    pub fn get(&self, id: u32) -> Option<&AssetDescriptor> {
        self.assets.get(id as usize)
    }

    pub fn by_address(&self, token: Address) -> Option<&AssetDescriptor> {
        self.by_address
            .get(&token)
            .and_then(|id| self.assets.get(*id as usize))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.assets.iter()
    }

    /// Checks that a descriptor agrees with the registry.
    ///
    /// Virtual and unused slots carry no registry entry and always pass.
    pub fn validate(&self, asset: &AssetDescriptor) -> Result<(), ValidationError> {
        let known = match asset.kind() {
            AssetKind::NotUsed | AssetKind::Virtual => true,
            AssetKind::Eth => asset.id() == 0,
            AssetKind::Erc20 => self.get(asset.id()) == Some(asset),
        };

        if known {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedAsset {
                id: asset.id(),
                kind: asset.kind(),
            })
        }
    }
}
