//! Scheduled buy tasks and their outcomes

use super::WalletIdentity;
use chrono::{DateTime, Utc};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use uuid::Uuid;

/// One scheduled purchase for one wallet
#[derive(Debug, Clone)]
pub struct BuyTask {
    /// Unique task ID
    pub id: Uuid,
    /// Wallet that pays and signs
    pub wallet: Arc<WalletIdentity>,
    /// Randomly drawn amount (lamports)
    pub desired_amount: u64,
    /// Amount after balance capping (lamports), never above `desired_amount`
    pub capped_amount: u64,
    /// Delay before execution starts
    pub delay_ms: u64,
}

impl BuyTask {
    /// Create a task with a fresh ID
    pub fn new(
        wallet: Arc<WalletIdentity>,
        desired_amount: u64,
        capped_amount: u64,
        delay_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet,
            desired_amount,
            capped_amount: capped_amount.min(desired_amount),
            delay_ms,
        }
    }

    /// Build the outcome for this task
    pub fn outcome(&self, status: OutcomeStatus) -> BuyOutcome {
        BuyOutcome {
            task_id: self.id,
            wallet: self.wallet.address(),
            desired_amount: self.desired_amount,
            capped_amount: self.capped_amount,
            delay_ms: self.delay_ms,
            status,
            finished_at: Utc::now(),
        }
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Never scheduled
    Skipped { reason: String },
    /// Every transaction confirmed
    Confirmed { signatures: Vec<Signature> },
    /// Stopped by an error
    Failed { kind: String, reason: String },
}

impl OutcomeStatus {
    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Skipped { .. } => "skipped",
            OutcomeStatus::Confirmed { .. } => "confirmed",
            OutcomeStatus::Failed { .. } => "failed",
        }
    }
}

/// Terminal record of a task
#[derive(Debug, Clone)]
pub struct BuyOutcome {
    pub task_id: Uuid,
    pub wallet: Pubkey,
    pub desired_amount: u64,
    pub capped_amount: u64,
    pub delay_ms: u64,
    pub status: OutcomeStatus,
    pub finished_at: DateTime<Utc>,
}

impl BuyOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Confirmed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}
