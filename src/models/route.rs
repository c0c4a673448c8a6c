//! Route candidates produced by the resolver

use super::{AssetReference, PoolDescriptor};
use crate::constants::limits::BPS_DENOMINATOR;

/// Shape of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Single pool
    Direct,
    /// Chained through intermediate assets
    MultiHop,
}

impl RouteKind {
    /// Classify a route by hop count
    pub fn for_hops(hops: usize) -> Self {
        if hops <= 1 {
            RouteKind::Direct
        } else {
            RouteKind::MultiHop
        }
    }
}

/// One simulated swap step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    /// Pool traded through
    pub pool: PoolDescriptor,
    /// Asset sent into the pool
    pub input: AssetReference,
    /// Asset received from the pool
    pub output: AssetReference,
    /// Simulated input amount
    pub amount_in: u64,
    /// Simulated output amount
    pub amount_out: u64,
}

/// Exact input and minimum acceptable output for one hop instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopLimit {
    pub amount_in: u64,
    pub min_amount_out: u64,
}

/// A fully simulated path from input to output asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub hops: Vec<RouteHop>,
    pub input_amount: u64,
    /// Simulated final output
    pub output_amount: u64,
    /// Slippage-adjusted minimum final output
    pub min_output_amount: u64,
    /// Tolerance used for `min_output_amount`
    pub slippage_bps: u16,
    pub kind: RouteKind,
}

impl RouteCandidate {
    /// Number of hops
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Input asset of the route
    pub fn input(&self) -> Option<&AssetReference> {
        self.hops.first().map(|h| &h.input)
    }

    /// Output asset of the route
    pub fn output(&self) -> Option<&AssetReference> {
        self.hops.last().map(|h| &h.output)
    }

    /// Per-hop execution limits.
    ///
    /// The last hop is held to `min_output_amount`, so the executed floor on
    /// the final output matches the candidate's tolerance. Intermediate hops
    /// split the tolerance evenly (`slippage_bps / hops` each) and hop `i > 0`
    /// spends exactly hop `i - 1`'s minimum, so a worse but tolerated fill
    /// upstream cannot starve the next instruction.
    pub fn hop_limits(&self) -> Vec<HopLimit> {
        let hop_count = self.hops.len();
        let mut limits = Vec::with_capacity(hop_count);
        if hop_count == 0 {
            return limits;
        }

        let hop_tolerance_ppm = self.slippage_bps as u64 * PPM_PER_BPS / hop_count as u64;
        let mut amount_in = self.input_amount;

        for (index, hop) in self.hops.iter().enumerate() {
            let min_amount_out = if index + 1 == hop_count {
                self.min_output_amount
            } else {
                let expected_out = if hop.amount_in == 0 {
                    0
                } else {
                    ((hop.amount_out as u128 * amount_in as u128) / hop.amount_in as u128) as u64
                };
                let keep = PPM_DENOMINATOR.saturating_sub(hop_tolerance_ppm);
                ((expected_out as u128 * keep as u128) / PPM_DENOMINATOR as u128) as u64
            };
            limits.push(HopLimit {
                amount_in,
                min_amount_out,
            });
            amount_in = min_amount_out;
        }

        limits
    }
}

const PPM_DENOMINATOR: u64 = 1_000_000;
const PPM_PER_BPS: u64 = PPM_DENOMINATOR / BPS_DENOMINATOR;

/// `amount * (10_000 - slippage_bps) / 10_000`, rounded down
pub fn apply_slippage(amount: u64, slippage_bps: u16) -> u64 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps as u64);
    ((amount as u128 * keep as u128) / BPS_DENOMINATOR as u128) as u64
}
