use alloy_primitives::{Address, U256};

use crate::asset::AssetKind;

/// Result type used by the processor and the bridges.
pub type Result<T, E = BridgeError> = core::result::Result<T, E>;

/// Errors surfaced by the rollup processor and by bridge implementations.
///
/// Every failing call leaves both the bridge and the token ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("pool {pool} expires at {actual}, registration supplied {supplied}")]
    PoolExpiryMismatch {
        pool: Address,
        actual: u64,
        supplied: u64,
    },

    #[error("interaction already exists for nonce {0}")]
    InteractionAlreadyExists(u64),

    #[error("unknown nonce {0}")]
    UnknownNonce(u64),

    #[error("bridge not ready: interaction {nonce} matures at {maturity}")]
    BridgeNotReady { nonce: u64, maturity: u64 },

    #[error("no bridge deployed at {0}")]
    UnknownBridge(Address),

    #[error("a bridge is already deployed at {0}")]
    BridgeAlreadyDeployed(Address),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("asset type {actual} not accepted for {slot}")]
    InvalidAssetType {
        slot: &'static str,
        actual: AssetKind,
    },

    #[error("ERC20 asset {id} has no token address")]
    MissingTokenAddress { id: u32 },

    #[error("input asset {input} does not match output asset {output}")]
    AssetMismatch { input: Address, output: Address },

    #[error("input and output both reference {0}")]
    IdenticalAssets(Address),

    #[error("asset {id} ({kind}) is not supported by the processor")]
    UnsupportedAsset { id: u32, kind: AssetKind },

    #[error("pool {0} cannot be resolved")]
    InvalidPool(Address),

    #[error("wrapped position {supplied} does not belong to pool {pool}")]
    InvalidWrappedPosition { pool: Address, supplied: Address },

    #[error("no pool registered for asset {asset} with expiry {expiry}")]
    PoolNotFound { asset: Address, expiry: u64 },

    #[error("tranche expired at {expiry}, now {now}")]
    TrancheExpired { expiry: u64, now: u64 },

    #[error("zero input amount")]
    ZeroAmount,

    #[error("caller {0} is not the rollup processor")]
    InvalidCaller(Address),

    #[error("zkAToken already set for {0}")]
    ZkTokenAlreadySet(Address),

    #[error("lending venue has no reserve for {0}")]
    UnsupportedReserve(Address),

    #[error("bridge returned {value} for an unused output slot")]
    UnexpectedOutput { value: U256 },
}

/// Failures raised by a [`LiquidityVenue`](crate::venue::LiquidityVenue).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    #[error("{venue} does not support {operation}")]
    Unsupported {
        venue: &'static str,
        operation: &'static str,
    },

    #[error("no pool for {token_in} -> {token_out}")]
    NoPool { token_in: Address, token_out: Address },

    #[error("no reserve for {0}")]
    UnknownReserve(Address),

    #[error("unknown position token {0}")]
    UnknownPosition(Address),

    #[error("position {position} matures at {maturity}, now {now}")]
    NotMatured {
        position: Address,
        maturity: u64,
        now: u64,
    },

    #[error("pool for {position} expired at {expiry}")]
    Expired { position: Address, expiry: u64 },

    #[error("insufficient liquidity of {token}: available {available}, required {required}")]
    InsufficientLiquidity {
        token: Address,
        available: U256,
        required: U256,
    },

    #[error("trade produces no output")]
    ZeroOutput,

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Token ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("insufficient balance of {token} for {holder}: available {available}, required {required}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        available: U256,
        required: U256,
    },

    #[error("balance overflow of {token} for {holder}")]
    Overflow { token: Address, holder: Address },
}

/// Deployment configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("unknown asset symbol {0}")]
    UnknownAsset(String),

    #[error("unknown tranche pool {0}")]
    UnknownPool(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        Self::Bridge(err.into())
    }
}

impl From<VenueError> for ConfigError {
    fn from(err: VenueError) -> Self {
        Self::Bridge(err.into())
    }
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::Bridge(err.into())
    }
}
