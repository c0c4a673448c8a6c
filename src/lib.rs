//! Multibuy Operator Library
//!
//! Randomized multi-wallet token buyer for Solana.
//! This library exposes core modules for the binaries and tests.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod reporter;
pub mod routing;
pub mod utils;
pub mod vault;
pub mod wallets;

// Re-export commonly used types for tests
pub use config::AppConfig;
pub use engine::{
    AmountCapper, BalanceOracle, BuyOrchestrator, ScheduleParams, ScheduledSession, SwapExecutor,
    TransactionBuilder,
};
pub use error::{AppError, AppResult, SwapStage};
pub use events::{BuyEvent, ChannelSink, CompositeSink, EventSink, LogSink};
pub use ledger::{Ledger, RpcLedger};
pub use metrics::SessionMetrics;
pub use models::{AssetReference, BuyOutcome, OutcomeStatus, RouteCandidate, WalletIdentity};
pub use reporter::{BalanceSnapshot, SessionReporter, SessionSummary};
pub use routing::{LiquiditySource, RegistryLiquiditySource, RouteResolver};
