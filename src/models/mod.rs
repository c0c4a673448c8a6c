//! Domain models shared by routing, execution and scheduling

pub mod asset;
pub mod plan;
pub mod pool;
pub mod route;
pub mod task;
pub mod wallet;

pub use asset::AssetReference;
pub use plan::{ComputeBudget, SwapPlan};
pub use pool::{
    AmmPoolHandle, PoolDescriptor, PoolHandle, PoolKind, PoolState, TransferFee,
    TransferFeeConfig, WhirlpoolHandle,
};
pub use route::{HopLimit, RouteCandidate, RouteHop, RouteKind};
pub use task::{BuyOutcome, BuyTask, OutcomeStatus};
pub use wallet::WalletIdentity;
