//! Shared test doubles
//!
//! In-memory ledger and liquidity source so the whole buy pipeline runs
//! without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use multibuy_operator::engine::{BuildSettings, SwapExecutor, TransactionBuilder};
use multibuy_operator::error::{AppError, AppResult, SwapStage};
use multibuy_operator::ledger::Ledger;
use multibuy_operator::models::{
    AmmPoolHandle, AssetReference, PoolDescriptor, PoolHandle, PoolKind, PoolState,
    TransferFeeConfig, WalletIdentity,
};
use multibuy_operator::routing::{LiquiditySource, RouteResolver};
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// One submission attempt seen by [`FakeLedger`]
#[derive(Debug, Clone)]
pub struct Submission {
    pub payer: Pubkey,
    pub signature: Signature,
    pub at: Instant,
    pub accepted: bool,
}

/// In-memory ledger with scriptable failures
#[derive(Default)]
pub struct FakeLedger {
    balances: Mutex<HashMap<Pubkey, u64>>,
    unreachable_wallets: Mutex<HashSet<Pubkey>>,
    epoch: AtomicU64,
    submissions: Mutex<Vec<Submission>>,
    /// Payer -> zero-based index of the submission to reject
    reject_submission: Mutex<HashMap<Pubkey, usize>>,
    unconfirmed_payers: Mutex<HashSet<Pubkey>>,
    signature_payers: Mutex<HashMap<Signature, Pubkey>>,
    offline: AtomicBool,
    balance_reads: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_balance(&self, wallet: Pubkey, lamports: u64) {
        self.balances.lock().insert(wallet, lamports);
    }

    pub fn set_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    /// Balance reads for `wallet` fail with a connectivity error
    pub fn make_unreachable(&self, wallet: Pubkey) {
        self.unreachable_wallets.lock().insert(wallet);
    }

    /// Every call fails with a connectivity error
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Reject `payer`'s submission number `index` (zero-based)
    pub fn reject_submission(&self, payer: Pubkey, index: usize) {
        self.reject_submission.lock().insert(payer, index);
    }

    /// Transactions from `payer` are accepted but never confirm
    pub fn never_confirm(&self, payer: Pubkey) {
        self.unconfirmed_payers.lock().insert(payer);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    pub fn submissions_for(&self, payer: &Pubkey) -> Vec<Submission> {
        self.submissions
            .lock()
            .iter()
            .filter(|s| s.payer == *payer)
            .cloned()
            .collect()
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Connectivity("ledger offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn get_balance(&self, address: &Pubkey) -> AppResult<u64> {
        self.check_online()?;
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        if self.unreachable_wallets.lock().contains(address) {
            return Err(AppError::Connectivity(format!("balance of {} unavailable", address)));
        }
        Ok(self.balances.lock().get(address).copied().unwrap_or(0))
    }

    async fn current_epoch(&self) -> AppResult<u64> {
        self.check_online()?;
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    async fn latest_blockhash(&self) -> AppResult<Hash> {
        self.check_online()?;
        Ok(Hash::new_unique())
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> AppResult<Signature> {
        self.check_online()?;
        let payer = transaction.message.account_keys[0];
        let signature = transaction.signatures[0];

        let mut submissions = self.submissions.lock();
        let index = submissions.iter().filter(|s| s.payer == payer).count();
        let accepted = self.reject_submission.lock().get(&payer) != Some(&index);
        submissions.push(Submission {
            payer,
            signature,
            at: Instant::now(),
            accepted,
        });
        drop(submissions);

        if !accepted {
            return Err(AppError::swap(
                SwapStage::Submit,
                format!("transaction {} rejected", index),
            ));
        }

        self.signature_payers.lock().insert(signature, payer);
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> AppResult<bool> {
        self.check_online()?;
        let payer = self.signature_payers.lock().get(signature).copied();
        Ok(match payer {
            Some(payer) => !self.unconfirmed_payers.lock().contains(&payer),
            None => false,
        })
    }
}

/// In-memory pool registry
#[derive(Default)]
pub struct FakeLiquiditySource {
    pools: Mutex<Vec<PoolDescriptor>>,
    states: Mutex<HashMap<Pubkey, PoolState>>,
    transfer_fees: Mutex<HashMap<Pubkey, TransferFeeConfig>>,
    unreadable_fees: Mutex<HashSet<Pubkey>>,
    missing_handles: Mutex<HashSet<Pubkey>>,
    topology_calls: AtomicUsize,
    state_calls: AtomicUsize,
}

impl FakeLiquiditySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a constant-product pool and return its descriptor
    pub fn add_pool(
        &self,
        asset_a: AssetReference,
        asset_b: AssetReference,
        reserve_a: u64,
        reserve_b: u64,
        fee_bps: u16,
    ) -> PoolDescriptor {
        let descriptor = PoolDescriptor {
            address: Pubkey::new_unique(),
            kind: PoolKind::ConstantProduct,
            program_id: Pubkey::new_unique(),
            asset_a,
            asset_b,
        };
        self.pools.lock().push(descriptor.clone());
        self.states.lock().insert(
            descriptor.address,
            PoolState::ConstantProduct {
                reserve_a,
                reserve_b,
                fee_bps,
            },
        );
        descriptor
    }

    pub fn set_state(&self, pool: &Pubkey, state: PoolState) {
        self.states.lock().insert(*pool, state);
    }

    /// Pool stays in the topology but its state is unreadable
    pub fn drop_state(&self, pool: &Pubkey) {
        self.states.lock().remove(pool);
    }

    pub fn set_transfer_fee(&self, mint: Pubkey, config: TransferFeeConfig) {
        self.transfer_fees.lock().insert(mint, config);
    }

    /// Transfer fee lookups for `mint` fail with a connectivity error
    pub fn fail_transfer_fee(&self, mint: Pubkey) {
        self.unreadable_fees.lock().insert(mint);
    }

    /// Handle resolution for `pool` fails
    pub fn remove_handle(&self, pool: Pubkey) {
        self.missing_handles.lock().insert(pool);
    }

    pub fn topology_calls(&self) -> usize {
        self.topology_calls.load(Ordering::SeqCst)
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiquiditySource for FakeLiquiditySource {
    async fn pool_topology(&self) -> AppResult<Vec<PoolDescriptor>> {
        self.topology_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pools.lock().clone())
    }

    async fn pool_states(&self, pools: &[PoolDescriptor]) -> AppResult<HashMap<Pubkey, PoolState>> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let states = self.states.lock();
        Ok(pools
            .iter()
            .filter_map(|p| states.get(&p.address).map(|s| (p.address, s.clone())))
            .collect())
    }

    async fn pool_handle(&self, pool: &PoolDescriptor) -> AppResult<PoolHandle> {
        if self.missing_handles.lock().contains(&pool.address) {
            return Err(AppError::Registry(format!("no handle for {}", pool.address)));
        }
        Ok(PoolHandle::ConstantProduct(AmmPoolHandle {
            program_id: pool.program_id,
            amm: pool.address,
            authority: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            vault_a: Pubkey::new_unique(),
            vault_b: Pubkey::new_unique(),
            market_program: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            market_bids: Pubkey::new_unique(),
            market_asks: Pubkey::new_unique(),
            market_event_queue: Pubkey::new_unique(),
            market_base_vault: Pubkey::new_unique(),
            market_quote_vault: Pubkey::new_unique(),
            market_vault_signer: Pubkey::new_unique(),
        }))
    }

    async fn transfer_fee(&self, asset: &AssetReference) -> AppResult<Option<TransferFeeConfig>> {
        if self.unreadable_fees.lock().contains(&asset.mint) {
            return Err(AppError::Connectivity(format!("mint {} unavailable", asset.mint)));
        }
        Ok(self.transfer_fees.lock().get(&asset.mint).copied())
    }
}

/// A fresh SPL asset
pub fn token(decimals: u8) -> AssetReference {
    AssetReference::new(Pubkey::new_unique(), decimals, false)
}

/// A fresh Token-2022 asset
pub fn token_2022(decimals: u8) -> AssetReference {
    AssetReference::new(Pubkey::new_unique(), decimals, true)
}

pub fn wallet() -> Arc<WalletIdentity> {
    Arc::new(WalletIdentity::new(Keypair::new()))
}

pub fn resolver(source: Arc<FakeLiquiditySource>, ledger: Arc<FakeLedger>) -> Arc<RouteResolver> {
    Arc::new(RouteResolver::new(source, ledger, 3, 16))
}

/// One swap hop per transaction so multi-hop routes split
pub fn one_hop_per_transaction() -> BuildSettings {
    BuildSettings {
        base_compute_units: 60_000,
        compute_units_per_hop: 150_000,
        priority_fee_micro_lamports: 10_000,
        max_hops_per_transaction: 1,
    }
}

pub fn executor(
    source: Arc<FakeLiquiditySource>,
    ledger: Arc<FakeLedger>,
    settings: BuildSettings,
    slippage_bps: u16,
) -> Arc<SwapExecutor> {
    let resolver = resolver(source, Arc::clone(&ledger));
    Arc::new(SwapExecutor::new(
        resolver,
        ledger,
        TransactionBuilder::new(settings),
        slippage_bps,
    ))
}
