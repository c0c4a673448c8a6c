//! Encrypted wallet vault using AES-256-GCM
//!
//! Holds the signing keys of every wallet taking part in a session,
//! plus an optional RPC API key.
//!
//! File format: Base64 encoded (nonce || ciphertext || tag)

use crate::config::WalletsConfig;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable holding the hex vault key
pub const VAULT_KEY_ENV: &str = "MULTIBUY_VAULT_KEY";
/// Environment variable overriding the vault file location
pub const VAULT_PATH_ENV: &str = "MULTIBUY_VAULT_PATH";
/// Default vault file location
pub const DEFAULT_VAULT_PATH: &str = "config/wallets.enc";

/// Secrets stored in the encrypted vault
#[derive(Debug, Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct VaultSecrets {
    /// Wallet private keys (hex, base58 or JSON byte-array encoded)
    #[serde(default)]
    pub wallet_private_keys: Vec<String>,
    /// RPC API key
    #[serde(default)]
    pub rpc_api_key: Option<String>,
}

/// Vault for encrypted secrets
pub struct Vault {
    /// Encryption key (32 bytes for AES-256)
    key: [u8; 32],
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Vault errors
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Invalid encryption key
    #[error("Invalid vault key: {0}")]
    InvalidKey(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// File I/O error
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Base64 decode error: {0}")]
    Base64Error(String),
}

impl Vault {
    /// Create a new vault with the given key
    ///
    /// # Arguments
    /// * `key_hex` - 64-character hex string (32 bytes)
    pub fn new(key_hex: &str) -> Result<Self, VaultError> {
        let mut key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| VaultError::InvalidKey(format!("Invalid hex key: {}", e)))?;

        if key_bytes.len() != 32 {
            let len = key_bytes.len();
            key_bytes.zeroize();
            return Err(VaultError::InvalidKey(format!(
                "Key must be 32 bytes (64 hex chars), got {} bytes",
                len
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();

        Ok(Self { key })
    }

    /// Create a vault from the MULTIBUY_VAULT_KEY environment variable
    pub fn from_env() -> Result<Self, VaultError> {
        let key_hex = std::env::var(VAULT_KEY_ENV).map_err(|_| {
            VaultError::InvalidKey(format!("{} environment variable not set", VAULT_KEY_ENV))
        })?;

        Self::new(&key_hex)
    }

    /// Load and decrypt secrets from a file
    pub fn load_secrets(&self, path: impl AsRef<Path>) -> Result<VaultSecrets, VaultError> {
        let encrypted_data = std::fs::read_to_string(path)?;
        self.decrypt_secrets(&encrypted_data)
    }

    /// Decrypt secrets from a base64-encoded string
    pub fn decrypt_secrets(&self, encrypted_base64: &str) -> Result<VaultSecrets, VaultError> {
        let encrypted_bytes = BASE64
            .decode(encrypted_base64.trim())
            .map_err(|e| VaultError::Base64Error(format!("Failed to decode base64: {}", e)))?;

        // nonce (12 bytes) || ciphertext || tag (16 bytes)
        if encrypted_bytes.len() < 12 + 16 {
            return Err(VaultError::DecryptionFailed(
                "Encrypted data too short".to_string(),
            ));
        }

        let nonce = Nonce::from_slice(&encrypted_bytes[..12]);
        let ciphertext = &encrypted_bytes[12..];

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        let mut plaintext = cipher.decrypt(nonce, ciphertext).map_err(|e| {
            VaultError::DecryptionFailed(format!("AES-GCM decryption failed: {}", e))
        })?;

        let parsed = serde_json::from_slice::<VaultSecrets>(&plaintext);
        plaintext.zeroize();

        Ok(parsed?)
    }

    /// Encrypt and save secrets to a file
    pub fn save_secrets(
        &self,
        secrets: &VaultSecrets,
        path: impl AsRef<Path>,
    ) -> Result<(), VaultError> {
        let encrypted = self.encrypt_secrets(secrets)?;
        std::fs::write(path, encrypted)?;
        Ok(())
    }

    /// Encrypt secrets to a base64-encoded string
    pub fn encrypt_secrets(&self, secrets: &VaultSecrets) -> Result<String, VaultError> {
        let mut plaintext = serde_json::to_vec(secrets)?;

        let nonce_bytes: [u8; 12] = rand_bytes()?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| VaultError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        let encrypted = cipher.encrypt(nonce, plaintext.as_slice());
        plaintext.zeroize();
        let ciphertext = encrypted.map_err(|e| {
            VaultError::EncryptionFailed(format!("AES-GCM encryption failed: {}", e))
        })?;

        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    /// Generate a new random vault key (for setup)
    pub fn generate_key() -> Result<String, VaultError> {
        let key_bytes: [u8; 32] = rand_bytes()?;
        Ok(hex::encode(key_bytes))
    }
}

/// Generate random bytes using getrandom (cryptographically secure)
fn rand_bytes<const N: usize>() -> Result<[u8; N], VaultError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| VaultError::EncryptionFailed(format!("Entropy source failed: {}", e)))?;
    Ok(bytes)
}

/// Resolve the vault file path from the environment
pub fn vault_path() -> String {
    std::env::var(VAULT_PATH_ENV).unwrap_or_else(|_| DEFAULT_VAULT_PATH.to_string())
}

/// Try to load secrets from the vault file, falling back to configuration
///
/// A vault that exists but cannot be decrypted is an error: silently
/// falling back would run the session with a different wallet set.
pub fn load_secrets_with_fallback(wallets: &WalletsConfig) -> Result<VaultSecrets, VaultError> {
    let path = vault_path();

    if Path::new(&path).exists() {
        let vault = Vault::from_env()?;
        let secrets = vault.load_secrets(&path)?;
        tracing::info!(
            wallets = secrets.wallet_private_keys.len(),
            "Loaded wallets from encrypted vault"
        );
        return Ok(secrets);
    }

    tracing::info!(
        vault_path = %path,
        wallets = wallets.private_keys.len(),
        "No vault file found, using wallet keys from configuration"
    );

    Ok(VaultSecrets {
        wallet_private_keys: wallets.private_keys.clone(),
        rpc_api_key: std::env::var("MULTIBUY_RPC__API_KEY").ok(),
    })
}
