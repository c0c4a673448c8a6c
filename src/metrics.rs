//! Prometheus metrics for a buy session
//!
//! Collected in a private registry and rendered as text at session end:
//! - Wallets scheduled / skipped
//! - Swaps confirmed / failed (by error kind)
//! - Transactions submitted
//! - Swap execution latency histogram

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Session metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Prometheus registry
    registry: Registry,
    /// Wallets with a spawned buy task
    pub wallets_scheduled: IntCounter,
    /// Wallets skipped during scheduling
    pub wallets_skipped: IntCounter,
    /// Swaps whose every transaction confirmed
    pub swaps_confirmed: IntCounter,
    /// Swaps stopped by an error, labelled by error kind
    pub swaps_failed: IntCounterVec,
    /// Transactions submitted to the ledger
    pub transactions_submitted: IntCounter,
    /// Swap execution latency in milliseconds, labelled by outcome
    pub swap_latency_ms: HistogramVec,
}

impl SessionMetrics {
    /// Create metrics registered in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let wallets_scheduled = IntCounter::with_opts(Opts::new(
            "multibuy_wallets_scheduled_total",
            "Wallets with a scheduled buy",
        ))?;
        registry.register(Box::new(wallets_scheduled.clone()))?;

        let wallets_skipped = IntCounter::with_opts(Opts::new(
            "multibuy_wallets_skipped_total",
            "Wallets skipped because their capped amount was below the minimum",
        ))?;
        registry.register(Box::new(wallets_skipped.clone()))?;

        let swaps_confirmed = IntCounter::with_opts(Opts::new(
            "multibuy_swaps_confirmed_total",
            "Swaps with every transaction confirmed",
        ))?;
        registry.register(Box::new(swaps_confirmed.clone()))?;

        let swaps_failed = IntCounterVec::new(
            Opts::new("multibuy_swaps_failed_total", "Swaps stopped by an error"),
            &["kind"],
        )?;
        registry.register(Box::new(swaps_failed.clone()))?;

        let transactions_submitted = IntCounter::with_opts(Opts::new(
            "multibuy_transactions_submitted_total",
            "Transactions submitted to the ledger",
        ))?;
        registry.register(Box::new(transactions_submitted.clone()))?;

        let swap_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "multibuy_swap_latency_ms",
                "Swap execution latency in milliseconds, from route resolution to the last confirmation or the failure",
            )
            .buckets(vec![
                250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 30_000.0, 60_000.0,
            ]),
            &["outcome"],
        )?;
        registry.register(Box::new(swap_latency_ms.clone()))?;

        Ok(Self {
            registry,
            wallets_scheduled,
            wallets_skipped,
            swaps_confirmed,
            swaps_failed,
            transactions_submitted,
            swap_latency_ms,
        })
    }

    /// Record a failed swap
    pub fn record_failure(&self, kind: &str) {
        self.swaps_failed.with_label_values(&[kind]).inc();
    }

    /// Record how long a swap attempt took; `outcome` is `confirmed` or `failed`
    pub fn observe_swap_latency(&self, outcome: &str, millis: f64) {
        self.swap_latency_ms.with_label_values(&[outcome]).observe(millis);
    }

    /// Render every metric in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
