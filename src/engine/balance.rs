//! Balance oracle
//!
//! Reads a wallet's spendable native balance. Never cached: every call asks
//! the ledger.

use crate::error::AppResult;
use crate::ledger::Ledger;
use crate::models::WalletIdentity;
use std::sync::Arc;

/// Reports wallet balances in lamports
#[derive(Clone)]
pub struct BalanceOracle {
    ledger: Arc<dyn Ledger>,
}

impl BalanceOracle {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Current native balance of `wallet`.
    ///
    /// Fails with `AppError::Connectivity` if the ledger is unreachable.
    pub async fn get_balance(&self, wallet: &WalletIdentity) -> AppResult<u64> {
        let balance = self.ledger.get_balance(&wallet.address()).await?;
        tracing::trace!(wallet = %wallet.address(), lamports = balance, "Balance fetched");
        Ok(balance)
    }
}
