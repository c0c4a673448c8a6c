//! Structured buy session events
//!
//! Every decision the orchestrator makes is published as a [`BuyEvent`]:
//! - Session started / finished
//! - Wallet skipped or scheduled
//! - Buy started, confirmed or failed
//!
//! Sinks decide what to do with them: [`LogSink`] writes tracing records,
//! [`ChannelSink`] forwards them over a tokio channel.

use crate::utils::{lamports_to_sol, short_address};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    /// Expected progress
    Info,
    /// A wallet did not buy
    Warning,
    /// A buy attempt failed
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLevel::Info => write!(f, "INFO"),
            EventLevel::Warning => write!(f, "WARNING"),
            EventLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Session event
#[derive(Debug, Clone, PartialEq)]
pub enum BuyEvent {
    /// Scheduling pass started
    SessionStarted { wallets: usize },
    /// Wallet left out of the session
    WalletSkipped {
        wallet: Pubkey,
        desired: u64,
        capped: u64,
        reason: String,
    },
    /// Buy task spawned
    BuyScheduled {
        task_id: Uuid,
        wallet: Pubkey,
        amount: u64,
        delay_ms: u64,
    },
    /// Delay elapsed, execution starting
    BuyStarted {
        task_id: Uuid,
        wallet: Pubkey,
        amount: u64,
    },
    /// Every transaction confirmed
    BuyConfirmed {
        task_id: Uuid,
        wallet: Pubkey,
        signatures: Vec<Signature>,
    },
    /// Execution stopped by an error
    BuyFailed {
        task_id: Uuid,
        wallet: Pubkey,
        kind: String,
        reason: String,
    },
    /// Every task reached a terminal state
    SessionFinished {
        confirmed: usize,
        failed: usize,
        skipped: usize,
    },
}

impl BuyEvent {
    /// Severity of this event
    pub fn level(&self) -> EventLevel {
        match self {
            BuyEvent::SessionStarted { .. } => EventLevel::Info,
            BuyEvent::WalletSkipped { .. } => EventLevel::Warning,
            BuyEvent::BuyScheduled { .. } => EventLevel::Info,
            BuyEvent::BuyStarted { .. } => EventLevel::Info,
            BuyEvent::BuyConfirmed { .. } => EventLevel::Info,
            BuyEvent::BuyFailed { .. } => EventLevel::Error,
            BuyEvent::SessionFinished { .. } => EventLevel::Info,
        }
    }

    /// Wallet the event concerns, if any
    pub fn wallet(&self) -> Option<&Pubkey> {
        match self {
            BuyEvent::WalletSkipped { wallet, .. }
            | BuyEvent::BuyScheduled { wallet, .. }
            | BuyEvent::BuyStarted { wallet, .. }
            | BuyEvent::BuyConfirmed { wallet, .. }
            | BuyEvent::BuyFailed { wallet, .. } => Some(wallet),
            BuyEvent::SessionStarted { .. } | BuyEvent::SessionFinished { .. } => None,
        }
    }

    /// One-line human readable description
    pub fn format_message(&self) -> String {
        match self {
            BuyEvent::SessionStarted { wallets } => {
                format!("Scheduling buys for {} wallets", wallets)
            }
            BuyEvent::WalletSkipped {
                wallet,
                desired,
                capped,
                reason,
            } => format!(
                "Skipped {}: {} (wanted {:.4} SOL, can spend {:.4} SOL)",
                short_address(&wallet.to_string()),
                reason,
                lamports_to_sol(*desired),
                lamports_to_sol(*capped)
            ),
            BuyEvent::BuyScheduled {
                wallet,
                amount,
                delay_ms,
                ..
            } => format!(
                "Scheduled {:.4} SOL buy for {} in {:.1}s",
                lamports_to_sol(*amount),
                short_address(&wallet.to_string()),
                *delay_ms as f64 / 1_000.0
            ),
            BuyEvent::BuyStarted { wallet, amount, .. } => format!(
                "Buying with {:.4} SOL from {}",
                lamports_to_sol(*amount),
                short_address(&wallet.to_string())
            ),
            BuyEvent::BuyConfirmed {
                wallet, signatures, ..
            } => format!(
                "Buy confirmed for {} ({} transactions)",
                short_address(&wallet.to_string()),
                signatures.len()
            ),
            BuyEvent::BuyFailed {
                wallet,
                kind,
                reason,
                ..
            } => format!(
                "Buy failed for {} [{}]: {}",
                short_address(&wallet.to_string()),
                kind,
                reason
            ),
            BuyEvent::SessionFinished {
                confirmed,
                failed,
                skipped,
            } => format!(
                "Session finished: {} confirmed, {} failed, {} skipped",
                confirmed, failed, skipped
            ),
        }
    }
}

/// Receives session events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BuyEvent);
}

/// Writes events as tracing records
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &BuyEvent) {
        let wallet = event.wallet().map(|w| w.to_string()).unwrap_or_default();
        let message = event.format_message();
        match event.level() {
            EventLevel::Info => tracing::info!(wallet = %wallet, event = %message, "Buy event"),
            EventLevel::Warning => tracing::warn!(wallet = %wallet, event = %message, "Buy event"),
            EventLevel::Error => tracing::error!(wallet = %wallet, event = %message, "Buy event"),
        }
    }
}

/// Forwards events over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BuyEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BuyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &BuyEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}

/// Fans events out to several sinks
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink
    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for CompositeSink {
    fn emit(&self, event: &BuyEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
