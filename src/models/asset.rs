//! Fungible asset references

use crate::constants::{mints, programs};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Identifies a fungible asset by mint address and precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetReference {
    /// Mint address
    pub mint: Pubkey,
    /// Decimal precision
    pub decimals: u8,
    /// Owned by the Token-2022 program (extensions such as transfer fees apply)
    pub token_2022: bool,
}

impl AssetReference {
    /// Create a new asset reference
    pub fn new(mint: Pubkey, decimals: u8, token_2022: bool) -> Self {
        Self {
            mint,
            decimals,
            token_2022,
        }
    }

    /// Wrapped SOL
    pub fn native() -> Self {
        Self {
            mint: native_mint(),
            decimals: 9,
            token_2022: false,
        }
    }

    /// Whether this is wrapped SOL
    pub fn is_native(&self) -> bool {
        self.mint == native_mint()
    }

    /// Program owning this asset's token accounts
    pub fn token_program_id(&self) -> Pubkey {
        if self.token_2022 {
            Pubkey::from_str(programs::TOKEN_2022).unwrap_or_default()
        } else {
            Pubkey::from_str(programs::TOKEN).unwrap_or_default()
        }
    }
}

impl std::fmt::Display for AssetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mint)
    }
}

/// Wrapped SOL mint
pub fn native_mint() -> Pubkey {
    Pubkey::from_str(mints::SOL).unwrap_or_default()
}
