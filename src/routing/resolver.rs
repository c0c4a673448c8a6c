//! Route resolver
//!
//! Finds every viable path between two assets and ranks them by simulated
//! output. Topology is loaded once per process and structural paths are kept
//! in an LRU keyed by (input, output) mint; pool states and the epoch are
//! fetched fresh on every call.

use super::graph::{build_pool_graph, find_paths, pools_on_paths, PoolGraph, StructuralPath};
use super::simulate::{rank_candidates, simulate_path, SimulationContext};
use super::LiquiditySource;
use crate::error::{AppError, AppResult};
use crate::ledger::Ledger;
use crate::models::{AssetReference, RouteCandidate, TransferFeeConfig};
use lru::LruCache;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::OnceCell;

const DEFAULT_PATH_CACHE_CAPACITY: usize = 64;

/// Resolves ranked route candidates between two assets
pub struct RouteResolver {
    source: Arc<dyn LiquiditySource>,
    ledger: Arc<dyn Ledger>,
    max_hops: usize,
    graph: OnceCell<PoolGraph>,
    path_cache: Mutex<LruCache<(Pubkey, Pubkey), Arc<Vec<StructuralPath>>>>,
}

impl RouteResolver {
    /// Create a resolver
    ///
    /// # Arguments
    /// * `max_hops` - Longest route considered
    /// * `cache_capacity` - Number of asset pairs whose paths are kept
    pub fn new(
        source: Arc<dyn LiquiditySource>,
        ledger: Arc<dyn Ledger>,
        max_hops: usize,
        cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity)
            .or(NonZeroUsize::new(DEFAULT_PATH_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            source,
            ledger,
            max_hops: max_hops.max(1),
            graph: OnceCell::new(),
            path_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Liquidity source backing this resolver
    pub fn source(&self) -> &Arc<dyn LiquiditySource> {
        &self.source
    }

    /// Ranked candidates for swapping `amount` of `input` into `output`.
    ///
    /// The list is never empty: no viable candidate is `AppError::NoRouteFound`.
    pub async fn resolve_best_route(
        &self,
        input: &AssetReference,
        output: &AssetReference,
        amount: u64,
        slippage_bps: u16,
    ) -> AppResult<Vec<RouteCandidate>> {
        if amount == 0 {
            return Err(AppError::Validation(
                "Swap amount must be greater than zero".to_string(),
            ));
        }
        if input.mint == output.mint {
            return Err(AppError::Validation(format!(
                "Input and output asset are the same: {}",
                input.mint
            )));
        }

        let paths = self.structural_paths(input, output).await?;
        if paths.is_empty() {
            tracing::debug!(input = %input, output = %output, "No structural path between assets");
            return Err(no_route(input, output));
        }

        let pools = pools_on_paths(&paths);
        let epoch = self.ledger.current_epoch().await?;
        let states = self.source.pool_states(&pools).await?;

        for pool in &pools {
            if !states.contains_key(&pool.address) {
                tracing::debug!(pool = %pool.address, kind = %pool.kind, "Pool state unavailable, excluded");
            }
        }

        let (transfer_fees, unusable_mints) = self.transfer_fees(&paths).await;
        let ctx = SimulationContext {
            states: &states,
            transfer_fees: &transfer_fees,
            unusable_mints: &unusable_mints,
            epoch,
            slippage_bps,
        };

        let mut candidates: Vec<RouteCandidate> = paths
            .iter()
            .filter_map(|path| simulate_path(path, amount, &ctx))
            .collect();
        rank_candidates(&mut candidates);

        tracing::debug!(
            input = %input,
            output = %output,
            amount,
            epoch,
            structural_paths = paths.len(),
            candidates = candidates.len(),
            "Routes simulated"
        );

        if candidates.is_empty() {
            return Err(no_route(input, output));
        }

        Ok(candidates)
    }

    async fn graph(&self) -> AppResult<&PoolGraph> {
        self.graph
            .get_or_try_init(|| async {
                let pools = self.source.pool_topology().await?;
                let graph = build_pool_graph(&pools);
                tracing::info!(
                    pools = graph.pool_count,
                    assets = graph.asset_count(),
                    "Pool graph built"
                );
                Ok::<_, AppError>(graph)
            })
            .await
    }

    async fn structural_paths(
        &self,
        input: &AssetReference,
        output: &AssetReference,
    ) -> AppResult<Arc<Vec<StructuralPath>>> {
        let key = (input.mint, output.mint);
        let cached = self.path_cache.lock().get(&key).cloned();
        if let Some(paths) = cached {
            return Ok(paths);
        }

        let graph = self.graph().await?;
        let paths = Arc::new(find_paths(graph, &input.mint, &output.mint, self.max_hops));
        self.path_cache.lock().put(key, Arc::clone(&paths));
        Ok(paths)
    }

    /// Fee schedules for every Token-2022 mint on `paths`, plus the mints
    /// whose schedule could not be read. Paths through those are dropped.
    async fn transfer_fees(
        &self,
        paths: &[StructuralPath],
    ) -> (HashMap<Pubkey, TransferFeeConfig>, HashSet<Pubkey>) {
        let mut fees = HashMap::new();
        let mut unusable = HashSet::new();
        let mut checked = HashSet::new();

        for edge in paths.iter().flatten() {
            for asset in [edge.input, edge.output] {
                if !asset.token_2022 || !checked.insert(asset.mint) {
                    continue;
                }
                match self.source.transfer_fee(&asset).await {
                    Ok(Some(config)) => {
                        fees.insert(asset.mint, config);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            mint = %asset.mint,
                            error = %e,
                            "Transfer fee unavailable, routes through mint excluded"
                        );
                        unusable.insert(asset.mint);
                    }
                }
            }
        }

        (fees, unusable)
    }
}

fn no_route(input: &AssetReference, output: &AssetReference) -> AppError {
    AppError::NoRouteFound {
        input: input.mint.to_string(),
        output: output.mint.to_string(),
    }
}
