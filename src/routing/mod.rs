//! Route discovery
//!
//! Two phases: a cached, amount-independent topology phase (pool graph and
//! structural paths) and a fresh, amount-dependent simulation phase.

pub mod graph;
pub mod registry;
pub mod resolver;
pub mod simulate;

pub use graph::{build_pool_graph, find_paths, PoolEdge, PoolGraph, StructuralPath};
pub use registry::RegistryLiquiditySource;
pub use resolver::RouteResolver;

use crate::error::AppResult;
use crate::models::{AssetReference, PoolDescriptor, PoolHandle, PoolState, TransferFeeConfig};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

/// Where pools, their live state and their execution accounts come from
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    /// Every pool known to the source
    async fn pool_topology(&self) -> AppResult<Vec<PoolDescriptor>>;

    /// Current state of `pools`, keyed by pool address.
    ///
    /// Pools whose state could not be read or decoded are left out of the map.
    async fn pool_states(&self, pools: &[PoolDescriptor]) -> AppResult<HashMap<Pubkey, PoolState>>;

    /// Accounts needed to build a swap instruction against `pool`
    async fn pool_handle(&self, pool: &PoolDescriptor) -> AppResult<PoolHandle>;

    /// Transfer fee schedule of a Token-2022 asset, `None` if it has none
    async fn transfer_fee(&self, asset: &AssetReference) -> AppResult<Option<TransferFeeConfig>>;
}
