//! Buy engine for the multibuy operator
//!
//! Balance checks, amount capping, swap execution and the multi-wallet
//! scheduler that drives them.

pub mod balance;
pub mod capper;
pub mod executor;
pub mod orchestrator;
pub mod transaction_builder;

pub use balance::BalanceOracle;
pub use capper::{cap_amount, AmountCapper};
pub use executor::SwapExecutor;
pub use orchestrator::{BuyOrchestrator, ScheduleParams, ScheduledSession};
pub use transaction_builder::{BuildSettings, TransactionBuilder, TransactionDraft};
