//! Wallet key loading
//!
//! Keys come out of the vault (or configuration) as strings in one of three
//! encodings:
//! - 128 hex characters
//! - JSON byte array, as written by `solana-keygen`
//! - base58, as exported by browser wallets

use crate::error::{AppError, AppResult};
use crate::models::WalletIdentity;
use crate::vault::VaultSecrets;
use solana_sdk::signature::Keypair;
use std::collections::HashSet;
use std::sync::Arc;
use zeroize::Zeroize;

const KEYPAIR_LENGTH: usize = 64;

/// Parse one encoded keypair
pub fn parse_wallet_key(encoded: &str) -> AppResult<Keypair> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Wallet key is empty".to_string()));
    }

    let mut bytes = decode_key_bytes(trimmed)?;
    if bytes.len() != KEYPAIR_LENGTH {
        let len = bytes.len();
        bytes.zeroize();
        return Err(AppError::Validation(format!(
            "Wallet key must decode to {} bytes, got {}",
            KEYPAIR_LENGTH, len
        )));
    }

    let keypair = Keypair::from_bytes(&bytes)
        .map_err(|e| AppError::Validation(format!("Invalid wallet keypair: {}", e)));
    bytes.zeroize();
    keypair
}

fn decode_key_bytes(trimmed: &str) -> AppResult<Vec<u8>> {
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<u8>>(trimmed)
            .map_err(|e| AppError::Validation(format!("Invalid JSON wallet key: {}", e)));
    }

    if trimmed.len() == KEYPAIR_LENGTH * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(trimmed)
            .map_err(|e| AppError::Validation(format!("Invalid hex wallet key: {}", e)));
    }

    bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| AppError::Validation(format!("Invalid base58 wallet key: {}", e)))
}

/// Every wallet identity in `secrets`, in vault order.
///
/// Duplicate keys are loaded once. An empty wallet list is an error.
pub fn load_wallets(secrets: &VaultSecrets) -> AppResult<Vec<Arc<WalletIdentity>>> {
    let mut seen = HashSet::new();
    let mut wallets = Vec::with_capacity(secrets.wallet_private_keys.len());

    for (index, encoded) in secrets.wallet_private_keys.iter().enumerate() {
        let keypair = parse_wallet_key(encoded).map_err(|e| {
            AppError::Validation(format!("Wallet key #{} rejected: {}", index + 1, e))
        })?;
        let wallet = WalletIdentity::new(keypair);

        if !seen.insert(wallet.address()) {
            tracing::warn!(wallet = %wallet.address(), "Duplicate wallet key ignored");
            continue;
        }
        wallets.push(Arc::new(wallet));
    }

    if wallets.is_empty() {
        return Err(AppError::Validation(
            "No wallet keys configured".to_string(),
        ));
    }

    tracing::info!(wallets = wallets.len(), "Wallets loaded");
    Ok(wallets)
}
