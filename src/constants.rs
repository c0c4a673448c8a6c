/// Solana token mint addresses
pub mod mints {
    /// Wrapped SOL (native SOL wrapped as SPL token)
    pub const SOL: &str = "So11111111111111111111111111111111111111112";
    /// USDC (Circle USD Coin)
    pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
}

/// Program IDs
pub mod programs {
    /// SPL Token program
    pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    /// SPL Token-2022 (extensions) program
    pub const TOKEN_2022: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
    /// Raydium AMM v4 (constant product)
    pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
    /// Orca Whirlpool (concentrated liquidity)
    pub const ORCA_WHIRLPOOL: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";
    /// SPL Memo v2 (required by Whirlpool swap_v2)
    pub const MEMO: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
}

/// Ledger limits
pub mod limits {
    /// Maximum compute units a single transaction may request
    pub const MAX_COMPUTE_UNITS: u32 = 1_400_000;
    /// Maximum serialized transaction size in bytes
    pub const MAX_TRANSACTION_BYTES: usize = 1232;
    /// Basis point denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;
}

/// Orca Whirlpool layout constants
pub mod whirlpool {
    /// Ticks covered by one tick array account
    pub const TICK_ARRAY_SIZE: i32 = 88;
    /// Fee rate denominator (hundredths of a basis point)
    pub const FEE_RATE_DENOMINATOR: u64 = 1_000_000;
    /// Lowest sqrt price accepted by the program (Q64.64)
    pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;
    /// Highest sqrt price accepted by the program (Q64.64)
    pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;
}
