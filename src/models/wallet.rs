//! Wallet identities taking part in a session

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

/// A wallet's public address together with its signing credential.
///
/// Loaded once at startup and shared by `Arc`; never mutated.
pub struct WalletIdentity {
    address: Pubkey,
    signer: Keypair,
}

impl WalletIdentity {
    /// Wrap a keypair
    pub fn new(signer: Keypair) -> Self {
        Self {
            address: signer.pubkey(),
            signer,
        }
    }

    /// Public address
    pub fn address(&self) -> Pubkey {
        self.address
    }

    /// Signing credential
    pub fn signer(&self) -> &Keypair {
        &self.signer
    }
}

impl std::fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
