//! Session reporter
//!
//! Snapshots wallet balances before and after a session and summarizes
//! buy outcomes. An unreadable balance before the session is fatal; after
//! the session it is reported as unavailable.

use crate::engine::BalanceOracle;
use crate::error::AppResult;
use crate::models::{BuyOutcome, OutcomeStatus, WalletIdentity};
use crate::utils::{lamports_to_sol, short_address};
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;

/// Balances of every wallet at one point in time
#[derive(Debug, Clone)]
pub struct BalanceSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Lamports per wallet, `None` if the balance could not be read
    pub balances: Vec<(Pubkey, Option<u64>)>,
}

impl BalanceSnapshot {
    /// Sum of every readable balance
    pub fn total(&self) -> u64 {
        self.balances
            .iter()
            .filter_map(|(_, b)| *b)
            .fold(0u64, |acc, b| acc.saturating_add(b))
    }

    /// Balance of `wallet`, if read
    pub fn balance_of(&self, wallet: &Pubkey) -> Option<u64> {
        self.balances
            .iter()
            .find(|(w, _)| w == wallet)
            .and_then(|(_, b)| *b)
    }
}

/// Change of one wallet's balance across a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub wallet: Pubkey,
    pub before: u64,
    pub after: u64,
}

impl BalanceDelta {
    /// Lamports spent (positive) or gained (negative)
    pub fn spent(&self) -> i128 {
        self.before as i128 - self.after as i128
    }
}

/// Aggregate of a session's outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub confirmed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Lamports committed by confirmed buys
    pub total_spent: u64,
    /// Failures by error kind
    pub failures_by_kind: HashMap<String, usize>,
    pub transactions: usize,
}

/// Reports balances and outcomes for a session
pub struct SessionReporter {
    oracle: BalanceOracle,
}

impl SessionReporter {
    pub fn new(oracle: BalanceOracle) -> Self {
        Self { oracle }
    }

    /// Read every wallet's balance before a session.
    ///
    /// Any unreadable balance fails the snapshot.
    pub async fn opening_snapshot(
        &self,
        wallets: &[Arc<WalletIdentity>],
    ) -> AppResult<BalanceSnapshot> {
        let mut balances = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            let balance = self.oracle.get_balance(wallet).await.map_err(|e| {
                tracing::error!(
                    wallet = %wallet.address(),
                    error = %e,
                    "Opening balance unavailable"
                );
                e
            })?;
            balances.push((wallet.address(), Some(balance)));
        }

        Ok(BalanceSnapshot {
            taken_at: Utc::now(),
            balances,
        })
    }

    /// Read every wallet's balance after a session; unreadable ones are `None`
    pub async fn closing_snapshot(&self, wallets: &[Arc<WalletIdentity>]) -> BalanceSnapshot {
        let mut balances = Vec::with_capacity(wallets.len());
        for wallet in wallets {
            let balance = match self.oracle.get_balance(wallet).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!(
                        wallet = %wallet.address(),
                        error = %e,
                        "Balance unavailable for closing snapshot"
                    );
                    None
                }
            };
            balances.push((wallet.address(), balance));
        }

        BalanceSnapshot {
            taken_at: Utc::now(),
            balances,
        }
    }

    /// Log every balance in `snapshot` under `label`
    pub fn report_balances(&self, label: &str, snapshot: &BalanceSnapshot) {
        for (wallet, balance) in &snapshot.balances {
            match balance {
                Some(lamports) => tracing::info!(
                    snapshot = label,
                    wallet = %wallet,
                    short = %short_address(&wallet.to_string()),
                    balance_sol = lamports_to_sol(*lamports),
                    "Wallet balance"
                ),
                None => tracing::warn!(
                    snapshot = label,
                    wallet = %wallet,
                    "Wallet balance unavailable"
                ),
            }
        }

        tracing::info!(
            snapshot = label,
            wallets = snapshot.balances.len(),
            total_sol = lamports_to_sol(snapshot.total()),
            taken_at = %snapshot.taken_at.to_rfc3339(),
            "Balance snapshot"
        );
    }

    /// Per-wallet change between two snapshots; wallets unreadable in either are left out
    pub fn compare(before: &BalanceSnapshot, after: &BalanceSnapshot) -> Vec<BalanceDelta> {
        before
            .balances
            .iter()
            .filter_map(|(wallet, b)| {
                let before = (*b)?;
                let after = after.balance_of(wallet)?;
                Some(BalanceDelta {
                    wallet: *wallet,
                    before,
                    after,
                })
            })
            .collect()
    }

    /// Aggregate outcomes and log the result
    pub fn summarize(&self, outcomes: &[BuyOutcome]) -> SessionSummary {
        let summary = summarize_outcomes(outcomes);

        for outcome in outcomes {
            match &outcome.status {
                OutcomeStatus::Confirmed { signatures } => tracing::info!(
                    wallet = %outcome.wallet,
                    amount_sol = lamports_to_sol(outcome.capped_amount),
                    transactions = signatures.len(),
                    last_signature = %signatures.last().map(|s| s.to_string()).unwrap_or_default(),
                    "Buy confirmed"
                ),
                OutcomeStatus::Failed { kind, reason } => tracing::warn!(
                    wallet = %outcome.wallet,
                    kind = %kind,
                    reason = %reason,
                    "Buy failed"
                ),
                OutcomeStatus::Skipped { reason } => tracing::info!(
                    wallet = %outcome.wallet,
                    reason = %reason,
                    "Buy skipped"
                ),
            }
        }

        tracing::info!(
            confirmed = summary.confirmed,
            failed = summary.failed,
            skipped = summary.skipped,
            transactions = summary.transactions,
            total_spent_sol = lamports_to_sol(summary.total_spent),
            "Session summary"
        );

        summary
    }
}

/// Pure aggregation of outcomes
pub fn summarize_outcomes(outcomes: &[BuyOutcome]) -> SessionSummary {
    let mut summary = SessionSummary::default();
    for outcome in outcomes {
        match &outcome.status {
            OutcomeStatus::Confirmed { signatures } => {
                summary.confirmed += 1;
                summary.transactions += signatures.len();
                summary.total_spent = summary.total_spent.saturating_add(outcome.capped_amount);
            }
            OutcomeStatus::Failed { kind, .. } => {
                summary.failed += 1;
                *summary.failures_by_kind.entry(kind.clone()).or_insert(0) += 1;
            }
            OutcomeStatus::Skipped { .. } => summary.skipped += 1,
        }
    }
    summary
}
