//! Pool registry liquidity source
//!
//! Pool topology comes from a JSON registry (local file or http(s) URL).
//! Live state and swap accounts are read from the chain:
//! - constant-product pools: SPL token balances of the two vaults
//! - concentrated pools: the Whirlpool account itself
//! - Token-2022 transfer fees: the mint's TransferFeeConfig extension,
//!   unless the registry pins one

use super::LiquiditySource;
use crate::constants::programs;
use crate::error::{AppError, AppResult};
use crate::models::{
    AmmPoolHandle, AssetReference, PoolDescriptor, PoolHandle, PoolKind, PoolState, TransferFee,
    TransferFeeConfig, WhirlpoolHandle,
};
use async_trait::async_trait;
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Accounts per getMultipleAccounts request
const MAX_ACCOUNTS_PER_REQUEST: usize = 100;

/// Default Raydium AMM v4 trade fee
const DEFAULT_AMM_FEE_BPS: u16 = 25;

/// Raydium AMM v4 authority PDA seed
const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";

// ---------------------------------------------------------------------------
// Registry file format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    pools: Vec<RegistryEntry>,
    #[serde(default)]
    transfer_fees: Vec<TransferFeeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct AssetEntry {
    mint: String,
    decimals: u8,
    #[serde(default)]
    token_2022: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RegistryEntry {
    ConstantProduct(AmmEntry),
    Concentrated(WhirlpoolEntry),
}

#[derive(Debug, Deserialize)]
struct AmmEntry {
    address: String,
    #[serde(default)]
    program_id: Option<String>,
    asset_a: AssetEntry,
    asset_b: AssetEntry,
    #[serde(default)]
    fee_bps: Option<u16>,
    #[serde(default)]
    authority: Option<String>,
    open_orders: String,
    vault_a: String,
    vault_b: String,
    market_program: String,
    market: String,
    market_bids: String,
    market_asks: String,
    market_event_queue: String,
    market_base_vault: String,
    market_quote_vault: String,
    market_vault_signer: String,
}

#[derive(Debug, Deserialize)]
struct WhirlpoolEntry {
    address: String,
    #[serde(default)]
    program_id: Option<String>,
    asset_a: AssetEntry,
    asset_b: AssetEntry,
}

#[derive(Debug, Deserialize)]
struct TransferFeeEntry {
    mint: String,
    older_basis_points: u16,
    older_maximum_fee: u64,
    newer_basis_points: u16,
    newer_maximum_fee: u64,
    newer_epoch: u64,
}

// ---------------------------------------------------------------------------
// Parsed registry
// ---------------------------------------------------------------------------

/// A pool known to the registry
#[derive(Debug, Clone)]
pub enum RegisteredPool {
    /// Constant-product pool with every account needed to swap through it
    ConstantProduct {
        descriptor: PoolDescriptor,
        handle: AmmPoolHandle,
        fee_bps: u16,
    },
    /// Concentrated pool; accounts are read from the pool itself
    Concentrated { descriptor: PoolDescriptor },
}

impl RegisteredPool {
    pub fn descriptor(&self) -> &PoolDescriptor {
        match self {
            RegisteredPool::ConstantProduct { descriptor, .. } => descriptor,
            RegisteredPool::Concentrated { descriptor } => descriptor,
        }
    }
}

/// Parsed pool registry
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Vec<RegisteredPool>,
    index: HashMap<Pubkey, usize>,
    transfer_fees: HashMap<Pubkey, TransferFeeConfig>,
}

impl PoolRegistry {
    /// Parse a registry document
    pub fn from_json(json: &str) -> AppResult<Self> {
        let file: RegistryFile = serde_json::from_str(json)
            .map_err(|e| AppError::Registry(format!("Invalid registry JSON: {}", e)))?;

        let mut registry = PoolRegistry::default();
        for entry in file.pools {
            let pool = parse_entry(entry)?;
            let address = pool.descriptor().address;
            if registry.index.contains_key(&address) {
                tracing::warn!(pool = %address, "Duplicate pool in registry, keeping first entry");
                continue;
            }
            registry.index.insert(address, registry.pools.len());
            registry.pools.push(pool);
        }

        for entry in file.transfer_fees {
            let mint = parse_pubkey(&entry.mint, "transfer_fees.mint")?;
            registry.transfer_fees.insert(
                mint,
                TransferFeeConfig {
                    older: TransferFee {
                        basis_points: entry.older_basis_points,
                        maximum_fee: entry.older_maximum_fee,
                    },
                    newer: TransferFee {
                        basis_points: entry.newer_basis_points,
                        maximum_fee: entry.newer_maximum_fee,
                    },
                    newer_epoch: entry.newer_epoch,
                },
            );
        }

        Ok(registry)
    }

    /// Load a registry from a file path or http(s) URL
    pub async fn load(source: &str) -> AppResult<Self> {
        let json = if source.starts_with("http://") || source.starts_with("https://") {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| AppError::Registry(format!("Failed to build HTTP client: {}", e)))?;

            let response = client
                .get(source)
                .send()
                .await
                .map_err(|e| AppError::Registry(format!("Registry request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(AppError::Registry(format!(
                    "Registry endpoint returned {}",
                    response.status()
                )));
            }

            response
                .text()
                .await
                .map_err(|e| AppError::Registry(format!("Failed to read registry body: {}", e)))?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| AppError::Registry(format!("Failed to read {}: {}", source, e)))?
        };

        let registry = Self::from_json(&json)?;
        tracing::info!(
            source = %source,
            pools = registry.pools.len(),
            pinned_transfer_fees = registry.transfer_fees.len(),
            "Pool registry loaded"
        );
        Ok(registry)
    }

    /// Every registered pool descriptor
    pub fn descriptors(&self) -> Vec<PoolDescriptor> {
        self.pools.iter().map(|p| p.descriptor().clone()).collect()
    }

    /// Registered pool by address
    pub fn get(&self, address: &Pubkey) -> Option<&RegisteredPool> {
        self.index.get(address).and_then(|i| self.pools.get(*i))
    }

    /// Transfer fee schedule pinned by the registry
    pub fn pinned_transfer_fee(&self, mint: &Pubkey) -> Option<&TransferFeeConfig> {
        self.transfer_fees.get(mint)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

fn parse_pubkey(value: &str, field: &str) -> AppResult<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| AppError::Registry(format!("Invalid {} '{}': {}", field, value, e)))
}

fn parse_asset(entry: &AssetEntry, field: &str) -> AppResult<AssetReference> {
    Ok(AssetReference::new(
        parse_pubkey(&entry.mint, field)?,
        entry.decimals,
        entry.token_2022,
    ))
}

fn parse_program(value: Option<&str>, default: &str) -> AppResult<Pubkey> {
    parse_pubkey(value.unwrap_or(default), "program_id")
}

fn parse_entry(entry: RegistryEntry) -> AppResult<RegisteredPool> {
    match entry {
        RegistryEntry::ConstantProduct(e) => {
            let program_id = parse_program(e.program_id.as_deref(), programs::RAYDIUM_AMM_V4)?;
            let amm = parse_pubkey(&e.address, "address")?;
            let authority = match e.authority.as_deref() {
                Some(value) => parse_pubkey(value, "authority")?,
                None => Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], &program_id).0,
            };

            let descriptor = PoolDescriptor {
                address: amm,
                kind: PoolKind::ConstantProduct,
                program_id,
                asset_a: parse_asset(&e.asset_a, "asset_a.mint")?,
                asset_b: parse_asset(&e.asset_b, "asset_b.mint")?,
            };
            let handle = AmmPoolHandle {
                program_id,
                amm,
                authority,
                open_orders: parse_pubkey(&e.open_orders, "open_orders")?,
                vault_a: parse_pubkey(&e.vault_a, "vault_a")?,
                vault_b: parse_pubkey(&e.vault_b, "vault_b")?,
                market_program: parse_pubkey(&e.market_program, "market_program")?,
                market: parse_pubkey(&e.market, "market")?,
                market_bids: parse_pubkey(&e.market_bids, "market_bids")?,
                market_asks: parse_pubkey(&e.market_asks, "market_asks")?,
                market_event_queue: parse_pubkey(&e.market_event_queue, "market_event_queue")?,
                market_base_vault: parse_pubkey(&e.market_base_vault, "market_base_vault")?,
                market_quote_vault: parse_pubkey(&e.market_quote_vault, "market_quote_vault")?,
                market_vault_signer: parse_pubkey(&e.market_vault_signer, "market_vault_signer")?,
            };

            Ok(RegisteredPool::ConstantProduct {
                descriptor,
                handle,
                fee_bps: e.fee_bps.unwrap_or(DEFAULT_AMM_FEE_BPS),
            })
        }
        RegistryEntry::Concentrated(e) => Ok(RegisteredPool::Concentrated {
            descriptor: PoolDescriptor {
                address: parse_pubkey(&e.address, "address")?,
                kind: PoolKind::Concentrated,
                program_id: parse_program(e.program_id.as_deref(), programs::ORCA_WHIRLPOOL)?,
                asset_a: parse_asset(&e.asset_a, "asset_a.mint")?,
                asset_b: parse_asset(&e.asset_b, "asset_b.mint")?,
            },
        }),
    }
}

// ---------------------------------------------------------------------------
// Account decoding
// ---------------------------------------------------------------------------

/// Amount held by an SPL token (or Token-2022) account
pub fn decode_token_amount(data: &[u8]) -> Option<u64> {
    read_u64(data, 64)
}

/// Fields of an Orca Whirlpool account used for pricing and swapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhirlpoolAccount {
    pub tick_spacing: u16,
    pub fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub mint_a: Pubkey,
    pub vault_a: Pubkey,
    pub mint_b: Pubkey,
    pub vault_b: Pubkey,
}

/// Decode a Whirlpool account (8-byte Anchor discriminator included)
pub fn decode_whirlpool(data: &[u8]) -> Option<WhirlpoolAccount> {
    Some(WhirlpoolAccount {
        tick_spacing: read_u16(data, 41)?,
        fee_rate: read_u16(data, 45)?,
        liquidity: read_u128(data, 49)?,
        sqrt_price: read_u128(data, 65)?,
        tick_current_index: read_i32(data, 81)?,
        mint_a: read_pubkey(data, 101)?,
        vault_a: read_pubkey(data, 133)?,
        mint_b: read_pubkey(data, 181)?,
        vault_b: read_pubkey(data, 213)?,
    })
}

/// Token-2022 account type marker offset (after the padded base mint)
const TOKEN_2022_ACCOUNT_TYPE_OFFSET: usize = 165;
/// Token-2022 extension type of TransferFeeConfig
const TRANSFER_FEE_CONFIG_EXTENSION: u16 = 1;

/// Decode the TransferFeeConfig extension of a Token-2022 mint account.
///
/// `None` when the mint has no extensions or no transfer fee.
pub fn decode_transfer_fee_config(data: &[u8]) -> Option<TransferFeeConfig> {
    let mut offset = TOKEN_2022_ACCOUNT_TYPE_OFFSET + 1;

    while offset + 4 <= data.len() {
        let extension = read_u16(data, offset)?;
        let length = read_u16(data, offset + 2)? as usize;
        let body = offset + 4;

        if extension == TRANSFER_FEE_CONFIG_EXTENSION {
            // authority (32) + withdraw authority (32) + withheld amount (8)
            let older = body + 72;
            let newer = older + 18;
            return Some(TransferFeeConfig {
                older: TransferFee {
                    maximum_fee: read_u64(data, older + 8)?,
                    basis_points: read_u16(data, older + 16)?,
                },
                newer: TransferFee {
                    maximum_fee: read_u64(data, newer + 8)?,
                    basis_points: read_u16(data, newer + 16)?,
                },
                newer_epoch: read_u64(data, newer)?,
            });
        }
        if extension == 0 && length == 0 {
            break;
        }
        offset = body + length;
    }

    None
}

fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset + N)?.try_into().ok()
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    read_bytes(data, offset).map(u16::from_le_bytes)
}

fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    read_bytes(data, offset).map(i32::from_le_bytes)
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    read_bytes(data, offset).map(u64::from_le_bytes)
}

fn read_u128(data: &[u8], offset: usize) -> Option<u128> {
    read_bytes(data, offset).map(u128::from_le_bytes)
}

fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    read_bytes::<32>(data, offset).map(Pubkey::new_from_array)
}

// ---------------------------------------------------------------------------
// Liquidity source
// ---------------------------------------------------------------------------

/// [`LiquiditySource`] over a pool registry and RPC account reads
pub struct RegistryLiquiditySource {
    rpc_client: Arc<RpcClient>,
    registry: PoolRegistry,
}

impl RegistryLiquiditySource {
    pub fn new(rpc_client: Arc<RpcClient>, registry: PoolRegistry) -> Self {
        Self {
            rpc_client,
            registry,
        }
    }

    /// Load the registry from `source` and wrap it
    pub async fn load(rpc_client: Arc<RpcClient>, source: &str) -> AppResult<Self> {
        Ok(Self::new(rpc_client, PoolRegistry::load(source).await?))
    }

    async fn fetch_accounts(&self, keys: &[Pubkey]) -> AppResult<HashMap<Pubkey, Vec<u8>>> {
        let mut accounts = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(MAX_ACCOUNTS_PER_REQUEST) {
            let fetched = self.rpc_client.get_multiple_accounts(chunk).await?;
            for (key, account) in chunk.iter().zip(fetched) {
                if let Some(account) = account {
                    accounts.insert(*key, account.data);
                }
            }
        }
        Ok(accounts)
    }

    fn registered(&self, pool: &PoolDescriptor) -> AppResult<&RegisteredPool> {
        self.registry
            .get(&pool.address)
            .ok_or_else(|| AppError::Registry(format!("Pool {} is not registered", pool.address)))
    }
}

#[async_trait]
impl LiquiditySource for RegistryLiquiditySource {
    async fn pool_topology(&self) -> AppResult<Vec<PoolDescriptor>> {
        Ok(self.registry.descriptors())
    }

    async fn pool_states(&self, pools: &[PoolDescriptor]) -> AppResult<HashMap<Pubkey, PoolState>> {
        let mut keys = Vec::new();
        for pool in pools {
            match self.registry.get(&pool.address) {
                Some(RegisteredPool::ConstantProduct { handle, .. }) => {
                    keys.push(handle.vault_a);
                    keys.push(handle.vault_b);
                }
                Some(RegisteredPool::Concentrated { descriptor }) => keys.push(descriptor.address),
                None => tracing::debug!(pool = %pool.address, "Pool not in registry"),
            }
        }

        let accounts = self.fetch_accounts(&keys).await?;
        let mut states = HashMap::with_capacity(pools.len());

        for pool in pools {
            let state = match self.registry.get(&pool.address) {
                Some(RegisteredPool::ConstantProduct {
                    handle, fee_bps, ..
                }) => {
                    let reserve_a = accounts.get(&handle.vault_a).and_then(|d| decode_token_amount(d));
                    let reserve_b = accounts.get(&handle.vault_b).and_then(|d| decode_token_amount(d));
                    match (reserve_a, reserve_b) {
                        (Some(reserve_a), Some(reserve_b)) => Some(PoolState::ConstantProduct {
                            reserve_a,
                            reserve_b,
                            fee_bps: *fee_bps,
                        }),
                        _ => None,
                    }
                }
                Some(RegisteredPool::Concentrated { descriptor }) => accounts
                    .get(&descriptor.address)
                    .and_then(|d| decode_whirlpool(d))
                    .map(|w| PoolState::Concentrated {
                        sqrt_price_x64: w.sqrt_price,
                        liquidity: w.liquidity,
                        fee_rate: w.fee_rate as u32,
                        tick_current_index: w.tick_current_index,
                        tick_spacing: w.tick_spacing,
                    }),
                None => None,
            };

            match state {
                Some(state) => {
                    states.insert(pool.address, state);
                }
                None => tracing::debug!(pool = %pool.address, "Pool state could not be decoded"),
            }
        }

        Ok(states)
    }

    async fn pool_handle(&self, pool: &PoolDescriptor) -> AppResult<PoolHandle> {
        match self.registered(pool)? {
            RegisteredPool::ConstantProduct { handle, .. } => {
                Ok(PoolHandle::ConstantProduct(handle.clone()))
            }
            RegisteredPool::Concentrated { descriptor } => {
                let data = self.rpc_client.get_account_data(&descriptor.address).await?;
                let account = decode_whirlpool(&data).ok_or_else(|| {
                    AppError::Registry(format!("Malformed Whirlpool account {}", descriptor.address))
                })?;

                Ok(PoolHandle::Concentrated(WhirlpoolHandle {
                    program_id: descriptor.program_id,
                    whirlpool: descriptor.address,
                    mint_a: account.mint_a,
                    mint_b: account.mint_b,
                    vault_a: account.vault_a,
                    vault_b: account.vault_b,
                    tick_spacing: account.tick_spacing,
                    tick_current_index: account.tick_current_index,
                }))
            }
        }
    }

    async fn transfer_fee(&self, asset: &AssetReference) -> AppResult<Option<TransferFeeConfig>> {
        if !asset.token_2022 {
            return Ok(None);
        }
        if let Some(pinned) = self.registry.pinned_transfer_fee(&asset.mint) {
            return Ok(Some(*pinned));
        }

        let data = self.rpc_client.get_account_data(&asset.mint).await?;
        Ok(decode_transfer_fee_config(&data))
    }
}
