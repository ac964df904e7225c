//! Configuration for the mempool / validator registry core.
//!
//! This mirrors the layering the teacher uses for `BlockchainConfig`:
//! hardcoded defaults, overridable by environment variables (optionally via
//! a `.env` file), exposed through a process-wide `OnceLock`.
//!
//! Configuration priority (highest to lowest):
//! 1. Environment variables
//! 2. .env file
//! 3. Hardcoded defaults

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

static CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Complete core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub pool: PoolConfig,
    pub registry: RegistryConfig,
}

/// Mempool / reservation controller parameters (§6 system inputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Target size, in bytes, that `min_fee_estimate` fills a block to.
    pub block_size: usize,

    /// Minimal fee a Normal transaction must pay to be admitted.
    pub minimal_fee: u64,

    /// Capacity of the bounded ingest channel feeding the admission worker.
    pub ingest_channel_capacity: usize,

    /// Maximum number of diagnostic double-spend entries kept in
    /// `villainous` before the oldest is evicted.
    pub villainous_pool_cap: usize,
}

/// Validator slot registry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Upper bound on the number of occupied validator slots.
    pub validator_registry_limit: u64,

    /// Fixed reward paid out per block, split evenly across occupied slots.
    pub block_reward: u64,

    /// Amount of the smallest denomination a single stake deposit locks up.
    pub stake_unit: u64,

    /// Ideal wall-clock time between blocks; informs slot scheduling in the
    /// excluded consensus layer but is still owned by this config.
    pub slot_time: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: 1_000_000,
            minimal_fee: 1,
            ingest_channel_capacity: 500,
            villainous_pool_cap: 10_000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            validator_registry_limit: 64,
            block_reward: 100,
            stake_unit: 1_000,
            slot_time: Duration::from_secs(10),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load configuration with the following priority:
    /// 1. Environment variables (highest priority)
    /// 2. .env file
    /// 3. Hardcoded defaults (lowest priority)
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Self {
            pool: PoolConfig::from_env(),
            registry: RegistryConfig::from_env(),
        }
    }

    /// Get or initialize the global configuration.
    pub fn global() -> &'static CoreConfig {
        CONFIG.get_or_init(CoreConfig::load)
    }
}

impl PoolConfig {
    fn from_env() -> Self {
        let defaults = PoolConfig::default();
        Self {
            block_size: parse_env("BLOCK_SIZE").unwrap_or(defaults.block_size),
            minimal_fee: parse_env("MINIMAL_FEE").unwrap_or(defaults.minimal_fee),
            ingest_channel_capacity: parse_env("INGEST_CHANNEL_CAPACITY")
                .unwrap_or(defaults.ingest_channel_capacity),
            villainous_pool_cap: parse_env("VILLAINOUS_POOL_CAP")
                .unwrap_or(defaults.villainous_pool_cap),
        }
    }
}

impl RegistryConfig {
    fn from_env() -> Self {
        let defaults = RegistryConfig::default();
        let slot_time_secs: u64 = parse_env("SLOT_TIME_SECS")
            .unwrap_or_else(|| defaults.slot_time.as_secs());
        Self {
            validator_registry_limit: parse_env("VALIDATOR_REGISTRY_LIMIT")
                .unwrap_or(defaults.validator_registry_limit),
            block_reward: parse_env("BLOCK_REWARD").unwrap_or(defaults.block_reward),
            stake_unit: parse_env("STAKE_UNIT").unwrap_or(defaults.stake_unit),
            slot_time: Duration::from_secs(slot_time_secs),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key)?.parse().ok()
}
