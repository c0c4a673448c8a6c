//! Executable swap plans

use super::{PoolHandle, RouteCandidate};
use crate::constants::limits::MAX_COMPUTE_UNITS;

/// Compute budget attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    /// Compute unit limit
    pub units: u32,
    /// Priority fee per compute unit
    pub priority_fee_micro_lamports: u64,
}

impl ComputeBudget {
    /// Budget for `hops` swap instructions: `base + per_hop * hops`, capped at the runtime maximum
    pub fn for_hops(base_units: u32, per_hop_units: u32, hops: usize, priority_fee: u64) -> Self {
        let units = (base_units as u64)
            .saturating_add((per_hop_units as u64).saturating_mul(hops as u64))
            .min(MAX_COMPUTE_UNITS as u64) as u32;
        Self {
            units,
            priority_fee_micro_lamports: priority_fee,
        }
    }
}

/// Chosen route plus everything needed to build its transactions
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub route: RouteCandidate,
    /// One handle per hop, in hop order
    pub pool_handles: Vec<PoolHandle>,
    /// Budget covering the whole route
    pub compute_budget: ComputeBudget,
}
