//! Deployment configuration.
//!
//! Describes the tokens, venues, pools and bridge addresses of a simulated
//! chain. Token amounts are written as decimal (or `0x`-prefixed hex)
//! strings since they routinely exceed the TOML integer range.

use std::{collections::HashSet, fs, path::Path};

use alloy_primitives::{Address, U256, address, uint};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, storage::ETH};

/// Symbol reserved for native ETH.
pub const ETH_SYMBOL: &str = "ETH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub chain_id: u64,
    /// Chain clock at deployment, in seconds.
    pub genesis_timestamp: u64,
    pub processor: Address,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    pub amm: AmmConfig,
    pub lending: LendingConfig,
    pub tranche: TrancheConfig,
    pub bridges: BridgeAddresses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    pub address: Address,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmConfig {
    pub address: Address,
    #[serde(default)]
    pub pools: Vec<AmmPoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmPoolConfig {
    pub address: Address,
    pub token_a: String,
    pub token_b: String,
    pub fee_bps: u16,
    #[serde(with = "amount")]
    pub reserve_a: U256,
    #[serde(with = "amount")]
    pub reserve_b: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    pub address: Address,
    #[serde(default)]
    pub reserves: Vec<ReserveConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveConfig {
    pub asset: String,
    pub a_token: Address,
    /// Ray-denominated index; 1e27 means no interest accrued.
    #[serde(with = "amount")]
    pub liquidity_index: U256,
    /// Underlying available for withdrawals.
    #[serde(with = "amount")]
    pub liquidity: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrancheConfig {
    pub vault: Address,
    #[serde(default)]
    pub pools: Vec<TranchePoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranchePoolConfig {
    pub name: String,
    pub asset: String,
    pub pool: Address,
    pub tranche: Address,
    pub wrapped_position: Address,
    pub expiry: u64,
    /// Underlying per principal token, WAD-denominated.
    #[serde(with = "amount")]
    pub price: U256,
    /// Principal tokens held by the vault and underlying backing held by the
    /// tranche.
    #[serde(with = "amount")]
    pub liquidity: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeAddresses {
    pub element: Address,
    pub curve: Address,
    pub aave: Address,
}

const fn default_decimals() -> u8 {
    18
}

impl DeploymentConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), assets = config.assets.len(), "loaded deployment config");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks internal consistency: unique symbols and names, known symbol
    /// references and sane venue parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut symbols = HashSet::from([ETH_SYMBOL]);
        let mut addresses = HashSet::new();
        for asset in &self.assets {
            if !symbols.insert(asset.symbol.as_str()) {
                return Err(invalid(format!("assets.{}", asset.symbol), "duplicate symbol"));
            }
            if asset.address == ETH || !addresses.insert(asset.address) {
                return Err(invalid(
                    format!("assets.{}.address", asset.symbol),
                    "address must be unique and non-zero",
                ));
            }
        }

        for (i, pool) in self.amm.pools.iter().enumerate() {
            let (a, b) = (self.token(&pool.token_a)?, self.token(&pool.token_b)?);
            if a == b {
                return Err(invalid(format!("amm.pools[{i}]"), "pool trades a token against itself"));
            }
            if pool.fee_bps >= 10_000 {
                return Err(invalid(format!("amm.pools[{i}].fee_bps"), "must be below 10000"));
            }
        }

        for reserve in &self.lending.reserves {
            let token = self.token(&reserve.asset)?;
            if token == ETH {
                return Err(invalid(format!("lending.{}", reserve.asset), "ETH reserves are not supported"));
            }
            if reserve.liquidity_index.is_zero() {
                return Err(invalid(format!("lending.{}.liquidity_index", reserve.asset), "must be non-zero"));
            }
        }

        let mut names = HashSet::new();
        for pool in &self.tranche.pools {
            if !names.insert(pool.name.as_str()) {
                return Err(invalid(format!("tranche.{}", pool.name), "duplicate pool name"));
            }
            self.token(&pool.asset)?;
            if pool.price.is_zero() {
                return Err(invalid(format!("tranche.{}.price", pool.name), "must be non-zero"));
            }
            if pool.expiry <= self.genesis_timestamp {
                return Err(invalid(
                    format!("tranche.{}.expiry", pool.name),
                    "must be after the genesis timestamp",
                ));
            }
        }

        let bridges = [self.bridges.element, self.bridges.curve, self.bridges.aave];
        if bridges.iter().collect::<HashSet<_>>().len() != bridges.len() {
            return Err(invalid("bridges", "bridge addresses must be distinct"));
        }
        Ok(())
    }

    /// Token address for `symbol`; `ETH` resolves to [`ETH`].
    pub fn token(&self, symbol: &str) -> Result<Address, ConfigError> {
        if symbol.eq_ignore_ascii_case(ETH_SYMBOL) {
            return Ok(ETH);
        }
        self.asset(symbol)
            .map(|asset| asset.address)
            .ok_or_else(|| ConfigError::UnknownAsset(symbol.to_string()))
    }

    pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
        self.assets
            .iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn symbol_of(&self, token: Address) -> Option<&str> {
        if token == ETH {
            return Some(ETH_SYMBOL);
        }
        self.assets
            .iter()
            .find(|asset| asset.address == token)
            .map(|asset| asset.symbol.as_str())
    }

    pub fn decimals_of(&self, token: Address) -> u8 {
        self.assets
            .iter()
            .find(|asset| asset.address == token)
            .map_or(18, |asset| asset.decimals)
    }

    pub fn tranche_pool(&self, name: &str) -> Result<&TranchePoolConfig, ConfigError> {
        self.tranche
            .pools
            .iter()
            .find(|pool| pool.name == name)
            .ok_or_else(|| ConfigError::UnknownPool(name.to_string()))
    }

    /// Mainnet-like deployment used by tests and the CLI when no config file
    /// is given.
    pub fn default_test_config() -> Self {
        let ether = U256::from(10).pow(U256::from(18));
        let units = |n: u64, decimals: u64| U256::from(n) * U256::from(10).pow(U256::from(decimals));

        Self {
            chain_id: 1,
            // 2022-01-01T00:00:00Z
            genesis_timestamp: 1_640_995_200,
            processor: address!("0x737901bea3eeb88459df9ef1be8ff3ae1b42a2ba"),
            assets: vec![
                AssetConfig {
                    symbol: "DAI".to_string(),
                    address: address!("0x6b175474e89094c44da98b954eedeac495271d0f"),
                    decimals: 18,
                },
                AssetConfig {
                    symbol: "USDC".to_string(),
                    address: address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
                    decimals: 6,
                },
                AssetConfig {
                    symbol: "CVX".to_string(),
                    address: address!("0x4e3fbd56cd56c3e72c1403e103b45db9da5b9d2b"),
                    decimals: 18,
                },
            ],
            amm: AmmConfig {
                address: address!("0x0000000022d53366457f9d5e68ec105046fc4383"),
                pools: vec![
                    AmmPoolConfig {
                        address: address!("0xb576491f1e6e5e62f1d8f26062ee822b40b0e0d4"),
                        token_a: "CVX".to_string(),
                        token_b: ETH_SYMBOL.to_string(),
                        fee_bps: 26,
                        reserve_a: units(5_000_000, 18),
                        reserve_b: units(50_000, 18),
                    },
                    AmmPoolConfig {
                        address: address!("0xbebc44782c7db0a1a60cb6fe97d0b483032ff1c7"),
                        token_a: "DAI".to_string(),
                        token_b: "USDC".to_string(),
                        fee_bps: 1,
                        reserve_a: units(100_000_000, 18),
                        reserve_b: units(100_000_000, 6),
                    },
                ],
            },
            lending: LendingConfig {
                address: address!("0x7d2768de32b0b80b7a3454c06bdac94a69ddc7a9"),
                reserves: vec![ReserveConfig {
                    asset: "DAI".to_string(),
                    a_token: address!("0xfc1e690f61efd961294b3e1ce3313fbd8aa4f85d"),
                    // 1.0637..., accrued since the reserve opened
                    liquidity_index: uint!(1_063_791_069_119_713_803_288_542_592_U256),
                    liquidity: units(10_000_000, 18),
                }],
            },
            tranche: TrancheConfig {
                vault: address!("0xba12222222228d8ba445958a75a0704d566bf2c8"),
                pools: vec![
                    TranchePoolConfig {
                        name: "dai-apr-2022".to_string(),
                        asset: "DAI".to_string(),
                        pool: address!("0xedf085f65b4f6c155e13155502ef925c9a756003"),
                        tranche: address!("0x2c72692e94e757679289ac85d3556b2c0f717e0e"),
                        wrapped_position: address!("0x21bbc083362022ab8d7e42c18c47d484cc95c193"),
                        expiry: 1_651_275_535,
                        price: ether * U256::from(98) / U256::from(100),
                        liquidity: units(1_000_000, 18),
                    },
                    TranchePoolConfig {
                        name: "dai-jan-2022".to_string(),
                        asset: "DAI".to_string(),
                        pool: address!("0xa47d1251cf21ad42685cc6b8b3a186a73dbd06cf"),
                        tranche: address!("0x449d7c2e096e9f867339078535b15440d42f78e8"),
                        wrapped_position: address!("0x21bbc083362022ab8d7e42c18c47d484cc95c193"),
                        expiry: 1_643_382_446,
                        price: ether * U256::from(995) / U256::from(1000),
                        liquidity: units(1_000_000, 18),
                    },
                ],
            },
            bridges: BridgeAddresses {
                element: address!("0xe1e0000000000000000000000000000000000001"),
                curve: address!("0xc0e0000000000000000000000000000000000002"),
                aave: address!("0xaae0000000000000000000000000000000000003"),
            },
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self::default_test_config()
    }
}

fn invalid(key: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        reason: reason.into(),
    }
}

/// Serde adapter writing [`U256`] as a decimal string.
mod amount {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.replace('_', "").parse().map_err(D::Error::custom)
    }
}
