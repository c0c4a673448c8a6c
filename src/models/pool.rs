//! Liquidity pool descriptions, live state and execution handles

use super::AssetReference;
use crate::constants::limits::BPS_DENOMINATOR;
use solana_sdk::pubkey::Pubkey;

/// Pricing model of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// x * y = k AMM (Raydium AMM v4 layout)
    ConstantProduct,
    /// Concentrated liquidity (Orca Whirlpool layout)
    Concentrated,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::ConstantProduct => write!(f, "constant_product"),
            PoolKind::Concentrated => write!(f, "concentrated"),
        }
    }
}

/// Topology entry for a pool: which assets it connects.
///
/// Amount-independent, safe to cache for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    /// Pool account address
    pub address: Pubkey,
    /// Pricing model
    pub kind: PoolKind,
    /// Owning program
    pub program_id: Pubkey,
    /// First asset (coin / token A)
    pub asset_a: AssetReference,
    /// Second asset (pc / token B)
    pub asset_b: AssetReference,
}

impl PoolDescriptor {
    /// The asset on the other side of `mint`, if the pool holds `mint`
    pub fn counterpart(&self, mint: &Pubkey) -> Option<&AssetReference> {
        if self.asset_a.mint == *mint {
            Some(&self.asset_b)
        } else if self.asset_b.mint == *mint {
            Some(&self.asset_a)
        } else {
            None
        }
    }

    /// Whether swapping `input_mint` in moves from asset A to asset B
    pub fn is_a_to_b(&self, input_mint: &Pubkey) -> bool {
        self.asset_a.mint == *input_mint
    }
}

/// Live pool state needed to simulate a swap.
///
/// Time-sensitive: fetched right before simulation and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolState {
    /// Vault reserves and fee of a constant-product pool
    ConstantProduct {
        reserve_a: u64,
        reserve_b: u64,
        /// Trade fee in basis points
        fee_bps: u16,
    },
    /// Active-range state of a concentrated-liquidity pool
    Concentrated {
        /// sqrt(price of A in B) as Q64.64
        sqrt_price_x64: u128,
        /// Liquidity of the active range
        liquidity: u128,
        /// Trade fee in hundredths of a basis point
        fee_rate: u32,
        tick_current_index: i32,
        tick_spacing: u16,
    },
}

impl PoolState {
    /// Whether the state can price a swap at all
    pub fn is_tradable(&self) -> bool {
        match self {
            PoolState::ConstantProduct {
                reserve_a,
                reserve_b,
                ..
            } => *reserve_a > 0 && *reserve_b > 0,
            PoolState::Concentrated {
                sqrt_price_x64,
                liquidity,
                ..
            } => *sqrt_price_x64 > 0 && *liquidity > 0,
        }
    }
}

/// One side of a Token-2022 transfer fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFee {
    /// Fee in basis points of the transferred amount
    pub basis_points: u16,
    /// Upper bound on the fee in raw token units
    pub maximum_fee: u64,
}

impl TransferFee {
    /// Fee charged on transferring `amount`, rounded up as the token program does
    pub fn fee_for(&self, amount: u64) -> u64 {
        if self.basis_points == 0 || amount == 0 {
            return 0;
        }
        let raw = (amount as u128 * self.basis_points as u128).div_ceil(BPS_DENOMINATOR as u128);
        (raw.min(self.maximum_fee as u128)) as u64
    }
}

/// Token-2022 transfer fee configuration with its epoch switchover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFeeConfig {
    /// Fee in force before `newer_epoch`
    pub older: TransferFee,
    /// Fee in force from `newer_epoch` on
    pub newer: TransferFee,
    /// Epoch at which `newer` takes effect
    pub newer_epoch: u64,
}

impl TransferFeeConfig {
    /// Fee schedule in force at `epoch`
    pub fn at_epoch(&self, epoch: u64) -> &TransferFee {
        if epoch >= self.newer_epoch {
            &self.newer
        } else {
            &self.older
        }
    }

    /// Amount received after the fee for a transfer of `amount` at `epoch`
    pub fn net_amount(&self, amount: u64, epoch: u64) -> u64 {
        amount.saturating_sub(self.at_epoch(epoch).fee_for(amount))
    }
}

/// Accounts needed to swap through a Raydium AMM v4 pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmPoolHandle {
    pub program_id: Pubkey,
    pub amm: Pubkey,
    pub authority: Pubkey,
    pub open_orders: Pubkey,
    /// Vault holding asset A (coin)
    pub vault_a: Pubkey,
    /// Vault holding asset B (pc)
    pub vault_b: Pubkey,
    pub market_program: Pubkey,
    pub market: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_vault_signer: Pubkey,
}

/// Accounts needed to swap through an Orca Whirlpool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhirlpoolHandle {
    pub program_id: Pubkey,
    pub whirlpool: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    /// Used with `tick_current_index` to derive tick array addresses
    pub tick_spacing: u16,
    pub tick_current_index: i32,
}

/// Resolved on-chain accounts for a pool, short-lived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolHandle {
    ConstantProduct(AmmPoolHandle),
    Concentrated(WhirlpoolHandle),
}

impl PoolHandle {
    /// Owning program
    pub fn program_id(&self) -> Pubkey {
        match self {
            PoolHandle::ConstantProduct(h) => h.program_id,
            PoolHandle::Concentrated(h) => h.program_id,
        }
    }

    /// Pool account address
    pub fn pool_address(&self) -> Pubkey {
        match self {
            PoolHandle::ConstantProduct(h) => h.amm,
            PoolHandle::Concentrated(h) => h.whirlpool,
        }
    }

    /// Pricing model matching this handle
    pub fn kind(&self) -> PoolKind {
        match self {
            PoolHandle::ConstantProduct(_) => PoolKind::ConstantProduct,
            PoolHandle::Concentrated(_) => PoolKind::Concentrated,
        }
    }
}
