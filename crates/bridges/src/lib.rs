//! Rollup processor and DeFi bridge interaction protocol.
//!
//! Interactions follow `register -> convert -> wait for readiness -> finalise`.
//! Token balances, swap pricing, lending accounting and tranche redemption run
//! against in-process collaborators, so the protocol can be exercised end to
//! end without a node.

pub mod asset;
pub mod bridge;
pub mod config;
pub mod deployment;
pub mod error;
pub mod interaction;
pub mod metrics;
pub mod processor;
pub mod storage;
pub mod venue;

pub use asset::{AssetDescriptor, AssetKind, AssetRegistry};
pub use bridge::{
    AaveLendingBridge, ConversionRequest, ConversionResult, CurveSwapBridge, DefiBridge,
    ElementBridge,
};
pub use config::DeploymentConfig;
pub use deployment::{Deployment, SharedDeployment};
pub use error::{BridgeError, ConfigError, Result, StorageError, ValidationError, VenueError};
pub use interaction::{Interaction, InteractionLedger, InteractionState};
pub use processor::{PendingInteraction, RollupProcessor};
pub use storage::{ETH, StateProvider, hashmap::HashMapStateProvider};
pub use venue::LiquidityVenue;
