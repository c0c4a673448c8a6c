//! Error types for the multibuy operator

use crate::vault::VaultError;
use thiserror::Error;

/// Stage of a swap attempt at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    /// Resolving pool handles for the selected route
    PoolResolution,
    /// Building or signing transactions
    Build,
    /// Submitting a transaction to the ledger
    Submit,
    /// Waiting for a submitted transaction to confirm
    Confirm,
}

impl std::fmt::Display for SwapStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapStage::PoolResolution => write!(f, "pool_resolution"),
            SwapStage::Build => write!(f, "build"),
            SwapStage::Submit => write!(f, "submit"),
            SwapStage::Confirm => write!(f, "confirm"),
        }
    }
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Validation error (malformed settings, bad parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ledger/RPC unreachable or returned a transport error
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Route simulation produced no viable candidate
    #[error("No route found from {input} to {output}")]
    NoRouteFound { input: String, output: String },

    /// Swap could not be built, submitted or confirmed
    #[error("Swap execution failed at {stage}: {reason}")]
    SwapExecution { stage: SwapStage, reason: String },

    /// Secrets vault error
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Pool registry could not be loaded or parsed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a swap execution failure
    pub fn swap(stage: SwapStage, reason: impl Into<String>) -> Self {
        AppError::SwapExecution {
            stage,
            reason: reason.into(),
        }
    }

    /// Short machine-readable label used in logs and outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration_error",
            AppError::Validation(_) => "validation_error",
            AppError::Connectivity(_) => "connectivity_error",
            AppError::NoRouteFound { .. } => "no_route_found",
            AppError::SwapExecution { .. } => "swap_execution_error",
            AppError::Vault(_) => "vault_error",
            AppError::Registry(_) => "registry_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether this error aborts the process when raised during startup.
    ///
    /// Errors raised inside a scheduled wallet attempt are never fatal,
    /// regardless of this classification.
    pub fn is_fatal_at_startup(&self) -> bool {
        !matches!(
            self,
            AppError::NoRouteFound { .. } | AppError::SwapExecution { .. }
        )
    }
}

impl From<solana_client::client_error::ClientError> for AppError {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        AppError::Connectivity(e.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
