//! Swap output simulation
//!
//! Pure functions over fetched pool state. Nothing here touches the network.

use super::graph::{PoolEdge, StructuralPath};
use crate::constants::{limits::BPS_DENOMINATOR, whirlpool::FEE_RATE_DENOMINATOR};
use crate::models::{
    route::apply_slippage, PoolState, RouteCandidate, RouteHop, RouteKind, TransferFeeConfig,
};
use solana_sdk::pubkey::Pubkey;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Q64.64 scaling factor
const Q64: f64 = 18_446_744_073_709_551_616.0;

/// Output of a constant-product pool for `amount_in`, fee in basis points.
///
/// `out = in_after_fee * reserve_out / (reserve_in + in_after_fee)`, floored.
pub fn constant_product_out(amount_in: u64, reserve_in: u64, reserve_out: u64, fee_bps: u16) -> u64 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }
    let fee_keep = BPS_DENOMINATOR.saturating_sub(fee_bps as u64) as u128;
    let in_after_fee = amount_in as u128 * fee_keep / BPS_DENOMINATOR as u128;
    let denominator = reserve_in as u128 + in_after_fee;
    if denominator == 0 {
        return 0;
    }
    (in_after_fee * reserve_out as u128 / denominator) as u64
}

/// Output of a concentrated-liquidity pool for `amount_in`, assuming the
/// swap stays inside the active range.
///
/// `fee_rate` is in hundredths of a basis point. `a_to_b` sells asset A
/// (price moves down), otherwise asset B is sold (price moves up).
pub fn concentrated_out(
    amount_in: u64,
    sqrt_price_x64: u128,
    liquidity: u128,
    fee_rate: u32,
    a_to_b: bool,
) -> u64 {
    if amount_in == 0 || sqrt_price_x64 == 0 || liquidity == 0 {
        return 0;
    }
    let fee_keep = FEE_RATE_DENOMINATOR.saturating_sub(fee_rate as u64) as u128;
    let in_after_fee = (amount_in as u128 * fee_keep / FEE_RATE_DENOMINATOR as u128) as f64;

    let price = sqrt_price_x64 as f64 / Q64;
    let liquidity = liquidity as f64;

    let out = if a_to_b {
        let next = liquidity * price / (liquidity + in_after_fee * price);
        liquidity * (price - next)
    } else {
        let next = price + in_after_fee / liquidity;
        liquidity * (next - price) / (price * next)
    };

    if out.is_finite() && out > 0.0 {
        out.floor().min(u64::MAX as f64) as u64
    } else {
        0
    }
}

/// Simulate one pool traversal
pub fn simulate_hop(edge: &PoolEdge, state: &PoolState, amount_in: u64) -> u64 {
    let a_to_b = edge.pool.is_a_to_b(&edge.input.mint);
    match state {
        PoolState::ConstantProduct {
            reserve_a,
            reserve_b,
            fee_bps,
        } => {
            let (reserve_in, reserve_out) = if a_to_b {
                (*reserve_a, *reserve_b)
            } else {
                (*reserve_b, *reserve_a)
            };
            constant_product_out(amount_in, reserve_in, reserve_out, *fee_bps)
        }
        PoolState::Concentrated {
            sqrt_price_x64,
            liquidity,
            fee_rate,
            ..
        } => concentrated_out(amount_in, *sqrt_price_x64, *liquidity, *fee_rate, a_to_b),
    }
}

/// Live inputs for simulating structural paths
pub struct SimulationContext<'a> {
    /// Fresh state per pool address; pools without an entry are unusable
    pub states: &'a HashMap<Pubkey, PoolState>,
    /// Transfer fee schedules per Token-2022 mint
    pub transfer_fees: &'a HashMap<Pubkey, TransferFeeConfig>,
    /// Token-2022 mints whose fee schedule could not be read
    pub unusable_mints: &'a HashSet<Pubkey>,
    /// Epoch the fee schedules are evaluated at
    pub epoch: u64,
    pub slippage_bps: u16,
}

impl SimulationContext<'_> {
    fn net_of_transfer_fee(&self, mint: &Pubkey, amount: u64) -> u64 {
        match self.transfer_fees.get(mint) {
            Some(config) => config.net_amount(amount, self.epoch),
            None => amount,
        }
    }
}

/// Simulate a structural path by chaining hop outputs.
///
/// Token-2022 transfer fees are deducted both when an asset enters a pool
/// and when it leaves one. Returns `None` if a pool has no usable state, an
/// asset's fee schedule is unknown, a hop yields nothing, or the
/// slippage-adjusted minimum rounds to zero.
pub fn simulate_path(
    path: &StructuralPath,
    amount_in: u64,
    ctx: &SimulationContext<'_>,
) -> Option<RouteCandidate> {
    if path.is_empty() || amount_in == 0 {
        return None;
    }

    let mut hops = Vec::with_capacity(path.len());
    let mut amount = amount_in;

    for edge in path {
        if ctx.unusable_mints.contains(&edge.input.mint)
            || ctx.unusable_mints.contains(&edge.output.mint)
        {
            return None;
        }
        let state = ctx.states.get(&edge.pool.address)?;
        if !state.is_tradable() {
            return None;
        }

        let received_by_pool = ctx.net_of_transfer_fee(&edge.input.mint, amount);
        let gross_out = simulate_hop(edge, state, received_by_pool);
        let amount_out = ctx.net_of_transfer_fee(&edge.output.mint, gross_out);
        if amount_out == 0 {
            return None;
        }

        hops.push(RouteHop {
            pool: edge.pool.clone(),
            input: edge.input,
            output: edge.output,
            amount_in: amount,
            amount_out,
        });
        amount = amount_out;
    }

    let min_output_amount = apply_slippage(amount, ctx.slippage_bps);
    if min_output_amount == 0 {
        return None;
    }

    Some(RouteCandidate {
        kind: RouteKind::for_hops(hops.len()),
        hops,
        input_amount: amount_in,
        output_amount: amount,
        min_output_amount,
        slippage_bps: ctx.slippage_bps,
    })
}

/// Best first: highest output, then fewest hops
pub fn compare_candidates(a: &RouteCandidate, b: &RouteCandidate) -> Ordering {
    b.output_amount
        .cmp(&a.output_amount)
        .then_with(|| a.hop_count().cmp(&b.hop_count()))
}

/// Sort candidates best first
pub fn rank_candidates(candidates: &mut [RouteCandidate]) {
    candidates.sort_by(compare_candidates);
}
