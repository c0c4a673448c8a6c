//! Ledger access
//!
//! Everything the operator reads from or submits to the chain goes through
//! the [`Ledger`] trait so the pipeline can run against an in-memory ledger
//! in tests.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Chain access used by the balance oracle, resolver and executor
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Native balance in lamports
    async fn get_balance(&self, address: &Pubkey) -> AppResult<u64>;

    /// Current epoch, the chain time reference for fee schedules
    async fn current_epoch(&self) -> AppResult<u64>;

    /// Recent blockhash for a new transaction
    async fn latest_blockhash(&self) -> AppResult<Hash>;

    /// Submit a signed transaction
    async fn submit_transaction(&self, transaction: &Transaction) -> AppResult<Signature>;

    /// Wait for a submitted transaction; `false` if it failed or never landed
    async fn confirm_transaction(&self, signature: &Signature) -> AppResult<bool>;
}

/// [`Ledger`] backed by a Solana JSON-RPC endpoint
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    /// Create a ledger for `url` with the given commitment level name
    pub fn new(url: String, commitment: &str, timeout_ms: u64) -> AppResult<Self> {
        let commitment = CommitmentConfig::from_str(commitment)
            .map_err(|e| AppError::Validation(format!("Invalid commitment '{}': {}", commitment, e)))?;
        let client = RpcClient::new_with_timeout_and_commitment(
            url,
            Duration::from_millis(timeout_ms),
            commitment,
        );

        Ok(Self {
            client: Arc::new(client),
            commitment,
        })
    }

    /// Shared RPC client, for account reads outside the trait
    pub fn client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    /// Check that the endpoint answers
    pub async fn health_check(&self) -> AppResult<()> {
        let version = self.client.get_version().await?;
        tracing::info!(
            rpc_url = %self.client.url(),
            solana_core = %version.solana_core,
            "RPC endpoint reachable"
        );
        Ok(())
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_balance(&self, address: &Pubkey) -> AppResult<u64> {
        let response = self
            .client
            .get_balance_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value)
    }

    async fn current_epoch(&self) -> AppResult<u64> {
        let info = self.client.get_epoch_info().await?;
        Ok(info.epoch)
    }

    async fn latest_blockhash(&self) -> AppResult<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn submit_transaction(&self, transaction: &Transaction) -> AppResult<Signature> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| AppError::swap(crate::error::SwapStage::Submit, e.to_string()))
    }

    async fn confirm_transaction(&self, signature: &Signature) -> AppResult<bool> {
        if let Err(e) = self
            .client
            .poll_for_signature_with_commitment(signature, self.commitment)
            .await
        {
            tracing::warn!(
                signature = %signature,
                error = %e,
                "Transaction did not reach commitment"
            );
            return Ok(false);
        }

        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await?;

        match status {
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => {
                tracing::warn!(signature = %signature, error = %e, "Transaction failed on chain");
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
