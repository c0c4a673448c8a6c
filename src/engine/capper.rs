//! Amount capper
//!
//! Bounds a desired buy by what the wallet can actually spend after keeping
//! a fee buffer back.

use super::balance::BalanceOracle;
use crate::error::AppResult;
use crate::models::WalletIdentity;

/// Cap `desired` by `balance - fee_buffer`.
///
/// Returns 0 (skip) when the spendable amount is below `min_allowed`.
/// The result never exceeds `desired`.
pub fn cap_amount(balance: u64, desired: u64, min_allowed: u64, fee_buffer: u64) -> u64 {
    let available = balance.saturating_sub(fee_buffer);
    if available < min_allowed {
        return 0;
    }
    desired.min(available)
}

/// Caps buy amounts against live balances
#[derive(Clone)]
pub struct AmountCapper {
    oracle: BalanceOracle,
}

impl AmountCapper {
    pub fn new(oracle: BalanceOracle) -> Self {
        Self { oracle }
    }

    /// Capped amount for `wallet`, fetching its balance fresh
    pub async fn cap(
        &self,
        wallet: &WalletIdentity,
        desired: u64,
        min_allowed: u64,
        fee_buffer: u64,
    ) -> AppResult<u64> {
        let balance = self.oracle.get_balance(wallet).await?;
        let capped = cap_amount(balance, desired, min_allowed, fee_buffer);

        if capped < desired {
            tracing::debug!(
                wallet = %wallet.address(),
                balance,
                desired,
                capped,
                fee_buffer,
                "Buy amount capped by balance"
            );
        }

        Ok(capped)
    }
}
