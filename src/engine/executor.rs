//! Swap executor
//!
//! Resolves the best route for a swap, builds its transactions and submits
//! them one at a time, waiting for each to confirm before sending the next.
//! The first rejected or unconfirmed transaction ends the attempt.

use super::transaction_builder::{TransactionBuilder, TransactionDraft};
use crate::error::{AppError, AppResult, SwapStage};
use crate::ledger::Ledger;
use crate::metrics::SessionMetrics;
use crate::models::{AssetReference, ComputeBudget, RouteCandidate, SwapPlan, WalletIdentity};
use crate::routing::RouteResolver;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Instant;

/// Executes routed swaps for a wallet
pub struct SwapExecutor {
    resolver: Arc<RouteResolver>,
    ledger: Arc<dyn Ledger>,
    builder: TransactionBuilder,
    /// Slippage tolerance in basis points
    slippage_bps: u16,
    metrics: Option<SessionMetrics>,
}

impl SwapExecutor {
    pub fn new(
        resolver: Arc<RouteResolver>,
        ledger: Arc<dyn Ledger>,
        builder: TransactionBuilder,
        slippage_bps: u16,
    ) -> Self {
        Self {
            resolver,
            ledger,
            builder,
            slippage_bps,
            metrics: None,
        }
    }

    /// Count submitted transactions and swap latency in `metrics`
    pub fn with_metrics(mut self, metrics: SessionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Swap `amount` of `input` into `output` for `wallet`.
    ///
    /// Returns the signatures of every confirmed transaction, in order.
    pub async fn execute(
        &self,
        wallet: &WalletIdentity,
        input: &AssetReference,
        output: &AssetReference,
        amount: u64,
    ) -> AppResult<Vec<Signature>> {
        let started = Instant::now();
        let result = self.route_and_submit(wallet, input, output, amount).await;

        if let Some(metrics) = &self.metrics {
            let outcome = if result.is_ok() { "confirmed" } else { "failed" };
            metrics.observe_swap_latency(outcome, started.elapsed().as_millis() as f64);
        }

        result
    }

    async fn route_and_submit(
        &self,
        wallet: &WalletIdentity,
        input: &AssetReference,
        output: &AssetReference,
        amount: u64,
    ) -> AppResult<Vec<Signature>> {
        let candidates = self
            .resolver
            .resolve_best_route(input, output, amount, self.slippage_bps)
            .await?;
        let route = candidates.into_iter().next().ok_or_else(|| AppError::NoRouteFound {
            input: input.mint.to_string(),
            output: output.mint.to_string(),
        })?;

        tracing::info!(
            wallet = %wallet.address(),
            hops = route.hop_count(),
            kind = ?route.kind,
            amount_in = route.input_amount,
            expected_out = route.output_amount,
            min_out = route.min_output_amount,
            "Route selected"
        );

        let plan = self.plan(route).await?;
        let drafts = self.builder.build(&wallet.address(), &plan)?;
        self.submit_sequentially(wallet, &drafts).await
    }

    /// Resolve pool handles and the route-wide compute budget
    async fn plan(&self, route: RouteCandidate) -> AppResult<SwapPlan> {
        let mut pool_handles = Vec::with_capacity(route.hops.len());
        for hop in &route.hops {
            let handle = self
                .resolver
                .source()
                .pool_handle(&hop.pool)
                .await
                .map_err(|e| {
                    AppError::swap(
                        SwapStage::PoolResolution,
                        format!("Pool {}: {}", hop.pool.address, e),
                    )
                })?;
            pool_handles.push(handle);
        }

        let settings = self.builder.settings();
        let compute_budget = ComputeBudget::for_hops(
            settings.base_compute_units,
            settings.compute_units_per_hop,
            route.hop_count(),
            settings.priority_fee_micro_lamports,
        );

        Ok(SwapPlan {
            route,
            pool_handles,
            compute_budget,
        })
    }

    async fn submit_sequentially(
        &self,
        wallet: &WalletIdentity,
        drafts: &[TransactionDraft],
    ) -> AppResult<Vec<Signature>> {
        let mut signatures = Vec::with_capacity(drafts.len());

        for (index, draft) in drafts.iter().enumerate() {
            let blockhash = self.ledger.latest_blockhash().await.map_err(|e| {
                stage_error(SwapStage::Build, e, &signatures)
            })?;
            let transaction = draft.sign(wallet.signer(), blockhash)?;

            let signature = self
                .ledger
                .submit_transaction(&transaction)
                .await
                .map_err(|e| stage_error(SwapStage::Submit, e, &signatures))?;
            if let Some(metrics) = &self.metrics {
                metrics.transactions_submitted.inc();
            }

            tracing::debug!(
                wallet = %wallet.address(),
                signature = %signature,
                index,
                total = drafts.len(),
                hops = draft.hop_count,
                compute_units = draft.compute_budget.units,
                "Transaction submitted"
            );

            let confirmed = self
                .ledger
                .confirm_transaction(&signature)
                .await
                .map_err(|e| stage_error(SwapStage::Confirm, e, &signatures))?;
            if !confirmed {
                return Err(stage_error(
                    SwapStage::Confirm,
                    AppError::Internal(format!("Transaction {} was not confirmed", signature)),
                    &signatures,
                ));
            }

            signatures.push(signature);
        }

        Ok(signatures)
    }
}

/// Attach the stage and any already-confirmed signatures to an error
fn stage_error(stage: SwapStage, error: AppError, confirmed: &[Signature]) -> AppError {
    let reason = match error {
        AppError::SwapExecution { reason, .. } => reason,
        AppError::Internal(reason) => reason,
        other => other.to_string(),
    };

    if confirmed.is_empty() {
        return AppError::swap(stage, reason);
    }

    let confirmed: Vec<String> = confirmed.iter().map(|s| s.to_string()).collect();
    AppError::swap(
        stage,
        format!("{} (already confirmed: {})", reason, confirmed.join(", ")),
    )
}
