//! Configuration management for the multibuy operator
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Asset being bought
    pub target: TargetConfig,
    /// Randomized sizing and timing
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Swap execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Route discovery settings
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Wallet key material (env fallback when no vault is present)
    #[serde(default)]
    pub wallets: WalletsConfig,
    /// Session lifecycle
    #[serde(default)]
    pub session: SessionConfig,
}

/// RPC endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,
    /// Commitment level used for balances and confirmations
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_ms: u64,
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_rpc_timeout() -> u64 {
    30_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_ms: default_rpc_timeout(),
        }
    }
}

impl RpcConfig {
    /// Endpoint URL with the provider API key appended as a query parameter
    pub fn endpoint(&self, api_key: Option<&str>) -> String {
        match api_key {
            Some(key) if !key.is_empty() && !self.url.contains("api-key=") => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}api-key={}", self.url, separator, key)
            }
            _ => self.url.clone(),
        }
    }
}

/// Target asset configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Mint address of the token to buy
    pub mint: String,
    /// Decimal precision of the token
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Whether the mint is owned by the Token-2022 program
    #[serde(default)]
    pub token_2022: bool,
}

fn default_decimals() -> u8 {
    6
}

/// Randomized buy schedule
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Minimum buy size in SOL
    #[serde(default = "default_min_buy")]
    pub min_buy_sol: f64,
    /// Maximum buy size in SOL
    #[serde(default = "default_max_buy")]
    pub max_buy_sol: f64,
    /// Minimum delay before a wallet's swap fires
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Maximum delay before a wallet's swap fires
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_min_buy() -> f64 {
    0.1
}

fn default_max_buy() -> f64 {
    0.5
}

fn default_min_delay() -> u64 {
    5_000
}

fn default_max_delay() -> u64 {
    60_000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_buy_sol: default_min_buy(),
            max_buy_sol: default_max_buy(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Swap execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// SOL kept back in every wallet for fees and rent
    #[serde(default = "default_fee_buffer")]
    pub fee_buffer_sol: f64,
    /// Slippage tolerance in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    /// Compute units requested for a transaction before any hop
    #[serde(default = "default_base_compute_units")]
    pub base_compute_units: u32,
    /// Additional compute units requested per swap hop
    #[serde(default = "default_compute_units_per_hop")]
    pub compute_units_per_hop: u32,
    /// Priority fee in micro-lamports per compute unit
    #[serde(default = "default_priority_fee")]
    pub priority_fee_micro_lamports: u64,
    /// Upper bound on swap hops packed into one transaction
    #[serde(default = "default_max_hops_per_tx")]
    pub max_hops_per_transaction: usize,
}

fn default_fee_buffer() -> f64 {
    0.005
}

fn default_slippage_bps() -> u16 {
    100
}

fn default_base_compute_units() -> u32 {
    60_000
}

fn default_compute_units_per_hop() -> u32 {
    150_000
}

fn default_priority_fee() -> u64 {
    25_000
}

fn default_max_hops_per_tx() -> usize {
    2
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fee_buffer_sol: default_fee_buffer(),
            slippage_bps: default_slippage_bps(),
            base_compute_units: default_base_compute_units(),
            compute_units_per_hop: default_compute_units_per_hop(),
            priority_fee_micro_lamports: default_priority_fee(),
            max_hops_per_transaction: default_max_hops_per_tx(),
        }
    }
}

/// Route discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Pool registry location: a local JSON file or an http(s) URL
    #[serde(default = "default_registry_source")]
    pub registry_source: String,
    /// Maximum hops in a route
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Number of token pairs whose structural paths are cached
    #[serde(default = "default_topology_cache_capacity")]
    pub topology_cache_capacity: usize,
}

fn default_registry_source() -> String {
    "config/pools.json".to_string()
}

fn default_max_hops() -> usize {
    3
}

fn default_topology_cache_capacity() -> usize {
    64
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            registry_source: default_registry_source(),
            max_hops: default_max_hops(),
            topology_cache_capacity: default_topology_cache_capacity(),
        }
    }
}

/// Wallet key material supplied through configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletsConfig {
    /// Private keys (hex or base58 encoded 64-byte keypairs)
    #[serde(default)]
    pub private_keys: Vec<String>,
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Wait for every scheduled swap before taking the closing snapshot
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wait_for_completion: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (MULTIBUY_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("rpc.url", default_rpc_url())?
            .set_default("rpc.commitment", default_commitment())?
            .set_default("schedule.min_delay_ms", default_min_delay() as i64)?
            .set_default("schedule.max_delay_ms", default_max_delay() as i64)?
            .set_default("execution.slippage_bps", default_slippage_bps() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false))
            // MULTIBUY_TARGET__MINT=<mint> -> target.mint
            // MULTIBUY_WALLETS__PRIVATE_KEYS=k1,k2 -> wallets.private_keys
            .add_source(
                Environment::with_prefix("MULTIBUY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("wallets.private_keys"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.url.is_empty() {
            return Err(ConfigError::Message("RPC URL must be set".to_string()));
        }

        if Pubkey::from_str(&self.target.mint).is_err() {
            return Err(ConfigError::Message(format!(
                "Target mint is not a valid address: '{}'",
                self.target.mint
            )));
        }

        let schedule = &self.schedule;
        if !(schedule.min_buy_sol > 0.0) {
            return Err(ConfigError::Message(
                "schedule.min_buy_sol must be positive".to_string(),
            ));
        }
        if schedule.min_buy_sol > schedule.max_buy_sol {
            return Err(ConfigError::Message(
                "schedule.min_buy_sol must not exceed schedule.max_buy_sol".to_string(),
            ));
        }
        if schedule.min_delay_ms > schedule.max_delay_ms {
            return Err(ConfigError::Message(
                "schedule.min_delay_ms must not exceed schedule.max_delay_ms".to_string(),
            ));
        }

        if self.execution.fee_buffer_sol < 0.0 {
            return Err(ConfigError::Message(
                "execution.fee_buffer_sol must not be negative".to_string(),
            ));
        }
        if self.execution.slippage_bps >= 10_000 {
            return Err(ConfigError::Message(
                "execution.slippage_bps must be below 10000".to_string(),
            ));
        }
        if self.execution.max_hops_per_transaction == 0 {
            return Err(ConfigError::Message(
                "execution.max_hops_per_transaction must be at least 1".to_string(),
            ));
        }

        if self.routing.max_hops == 0 {
            return Err(ConfigError::Message(
                "routing.max_hops must be at least 1".to_string(),
            ));
        }
        if self.routing.registry_source.is_empty() {
            return Err(ConfigError::Message(
                "routing.registry_source must be set".to_string(),
            ));
        }

        Ok(())
    }
}
