//! Buy orchestrator
//!
//! Fans a session out across wallets. For each wallet, in a single pass:
//! 1. Draw a desired amount uniformly from the configured range
//! 2. Cap it against the wallet's balance
//! 3. Skip the wallet if the capped amount is below the minimum
//! 4. Otherwise draw a delay and spawn a task that sleeps, then swaps
//!
//! No wallet waits on another wallet's delay. The returned
//! [`ScheduledSession`] owns the spawned tasks; awaiting it is optional.

use super::capper::AmountCapper;
use super::executor::SwapExecutor;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::events::{BuyEvent, EventSink, LogSink};
use crate::metrics::SessionMetrics;
use crate::models::{AssetReference, BuyOutcome, BuyTask, OutcomeStatus, WalletIdentity};
use crate::utils::sol_to_lamports;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Randomization bounds for one session, in lamports and milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleParams {
    pub min_amount: u64,
    pub max_amount: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Lamports every wallet keeps back for fees
    pub fee_buffer: u64,
}

impl ScheduleParams {
    /// Bounds from the schedule and execution config sections
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_amount: sol_to_lamports(config.schedule.min_buy_sol),
            max_amount: sol_to_lamports(config.schedule.max_buy_sol),
            min_delay_ms: config.schedule.min_delay_ms,
            max_delay_ms: config.schedule.max_delay_ms,
            fee_buffer: sol_to_lamports(config.execution.fee_buffer_sol),
        }
    }

    /// Reject empty or inverted ranges
    pub fn validate(&self) -> AppResult<()> {
        if self.min_amount == 0 {
            return Err(AppError::Validation(
                "Minimum buy amount must be greater than zero".to_string(),
            ));
        }
        if self.min_amount > self.max_amount {
            return Err(AppError::Validation(format!(
                "Minimum buy amount {} exceeds maximum {}",
                self.min_amount, self.max_amount
            )));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(AppError::Validation(format!(
                "Minimum delay {}ms exceeds maximum {}ms",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Schedules randomized buys across wallets
pub struct BuyOrchestrator {
    capper: AmountCapper,
    executor: Arc<SwapExecutor>,
    /// Asset spent
    input: AssetReference,
    /// Asset bought
    output: AssetReference,
    rng: Mutex<StdRng>,
    events: Arc<dyn EventSink>,
    metrics: Option<SessionMetrics>,
}

impl BuyOrchestrator {
    /// Create an orchestrator seeded from OS entropy
    pub fn new(
        capper: AmountCapper,
        executor: Arc<SwapExecutor>,
        input: AssetReference,
        output: AssetReference,
    ) -> Self {
        Self {
            capper,
            executor,
            input,
            output,
            rng: Mutex::new(StdRng::from_entropy()),
            events: Arc::new(LogSink),
            metrics: None,
        }
    }

    /// Use a deterministic random sequence
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Publish session events to `events` instead of the log
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Count scheduling and swap outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: SessionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Evaluate every wallet and spawn its buy task.
    ///
    /// Returns as soon as every wallet has been evaluated. Per-wallet
    /// failures (balance unavailable, amount too small) become outcomes and
    /// never abort the pass.
    pub async fn run(
        &self,
        wallets: &[Arc<WalletIdentity>],
        params: ScheduleParams,
    ) -> AppResult<ScheduledSession> {
        params.validate()?;
        self.events.emit(&BuyEvent::SessionStarted {
            wallets: wallets.len(),
        });

        let mut session = ScheduledSession {
            settled: Vec::new(),
            pending: Vec::with_capacity(wallets.len()),
            events: Arc::clone(&self.events),
        };

        for wallet in wallets {
            let desired = self.draw_amount(&params);

            let capped = match self
                .capper
                .cap(wallet, desired, params.min_amount, params.fee_buffer)
                .await
            {
                Ok(capped) => capped,
                Err(e) => {
                    let task = BuyTask::new(Arc::clone(wallet), desired, 0, 0);
                    self.fail(&task, &e);
                    session.settled.push(task.outcome(OutcomeStatus::Failed {
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    }));
                    continue;
                }
            };

            if capped < params.min_amount {
                let reason = "spendable balance below minimum buy".to_string();
                self.events.emit(&BuyEvent::WalletSkipped {
                    wallet: wallet.address(),
                    desired,
                    capped,
                    reason: reason.clone(),
                });
                if let Some(metrics) = &self.metrics {
                    metrics.wallets_skipped.inc();
                }
                let task = BuyTask::new(Arc::clone(wallet), desired, capped, 0);
                session.settled.push(task.outcome(OutcomeStatus::Skipped { reason }));
                continue;
            }

            let delay_ms = self.draw_delay(&params);
            let task = BuyTask::new(Arc::clone(wallet), desired, capped, delay_ms);
            self.events.emit(&BuyEvent::BuyScheduled {
                task_id: task.id,
                wallet: wallet.address(),
                amount: capped,
                delay_ms,
            });
            if let Some(metrics) = &self.metrics {
                metrics.wallets_scheduled.inc();
            }

            let handle = self.spawn(task.clone());
            session.pending.push((task, handle));
        }

        Ok(session)
    }

    fn draw_amount(&self, params: &ScheduleParams) -> u64 {
        self.rng
            .lock()
            .gen_range(params.min_amount..=params.max_amount)
    }

    fn draw_delay(&self, params: &ScheduleParams) -> u64 {
        self.rng
            .lock()
            .gen_range(params.min_delay_ms..=params.max_delay_ms)
    }

    fn fail(&self, task: &BuyTask, error: &AppError) {
        self.events.emit(&BuyEvent::BuyFailed {
            task_id: task.id,
            wallet: task.wallet.address(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        });
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(error.kind());
        }
    }

    fn spawn(&self, task: BuyTask) -> JoinHandle<BuyOutcome> {
        let executor = Arc::clone(&self.executor);
        let events = Arc::clone(&self.events);
        let metrics = self.metrics.clone();
        let (input, output) = (self.input, self.output);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(task.delay_ms)).await;

            events.emit(&BuyEvent::BuyStarted {
                task_id: task.id,
                wallet: task.wallet.address(),
                amount: task.capped_amount,
            });

            let result = executor
                .execute(&task.wallet, &input, &output, task.capped_amount)
                .await;

            match result {
                Ok(signatures) => {
                    events.emit(&BuyEvent::BuyConfirmed {
                        task_id: task.id,
                        wallet: task.wallet.address(),
                        signatures: signatures.clone(),
                    });
                    if let Some(metrics) = &metrics {
                        metrics.swaps_confirmed.inc();
                    }
                    task.outcome(OutcomeStatus::Confirmed { signatures })
                }
                Err(e) => {
                    events.emit(&BuyEvent::BuyFailed {
                        task_id: task.id,
                        wallet: task.wallet.address(),
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    });
                    if let Some(metrics) = &metrics {
                        metrics.record_failure(e.kind());
                    }
                    task.outcome(OutcomeStatus::Failed {
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        })
    }
}

/// Handles to every task a scheduling pass produced
pub struct ScheduledSession {
    /// Outcomes decided during scheduling (skips, balance failures)
    settled: Vec<BuyOutcome>,
    /// Spawned tasks still running or finished but not collected
    pending: Vec<(BuyTask, JoinHandle<BuyOutcome>)>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ScheduledSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledSession")
            .field("settled", &self.settled)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ScheduledSession {
    /// Tasks spawned
    pub fn scheduled(&self) -> Vec<&BuyTask> {
        self.pending.iter().map(|(task, _)| task).collect()
    }

    /// Outcomes decided without spawning a task
    pub fn settled(&self) -> &[BuyOutcome] {
        &self.settled
    }

    /// Wait for every spawned task and return all outcomes.
    ///
    /// Settled outcomes come first, followed by spawned tasks in scheduling order.
    pub async fn wait(self) -> Vec<BuyOutcome> {
        let mut outcomes = self.settled;

        for (task, handle) in self.pending {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        wallet = %task.wallet.address(),
                        task_id = %task.id,
                        error = %e,
                        "Buy task panicked or was cancelled"
                    );
                    task.outcome(OutcomeStatus::Failed {
                        kind: "internal_error".to_string(),
                        reason: e.to_string(),
                    })
                }
            };
            outcomes.push(outcome);
        }

        self.events.emit(&BuyEvent::SessionFinished {
            confirmed: outcomes.iter().filter(|o| o.is_confirmed()).count(),
            failed: outcomes.iter().filter(|o| o.is_failed()).count(),
            skipped: outcomes.iter().filter(|o| o.is_skipped()).count(),
        });

        outcomes
    }
}
