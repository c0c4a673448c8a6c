//! Transaction builder for routed swaps
//!
//! Turns a [`SwapPlan`] into one or more unsigned transaction drafts:
//! setup (token accounts, SOL wrapping), one swap instruction per hop and
//! teardown (wSOL unwrapping), packed greedily under the per-transaction hop
//! limit and the packet size limit. Every draft carries its own compute
//! budget instructions sized to the hops it contains.

use crate::config::ExecutionConfig;
use crate::constants::{
    limits::MAX_TRANSACTION_BYTES,
    programs,
    whirlpool::{MAX_SQRT_PRICE, MIN_SQRT_PRICE, TICK_ARRAY_SIZE},
};
use crate::error::{AppError, AppResult, SwapStage};
use crate::models::{
    AmmPoolHandle, AssetReference, ComputeBudget, HopLimit, PoolHandle, RouteHop, SwapPlan,
    WhirlpoolHandle,
};
use sha2::{Digest, Sha256};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use std::str::FromStr;

/// Raydium AMM v4 `swap_base_in` instruction tag
const RAYDIUM_SWAP_BASE_IN: u8 = 9;

/// Settings that shape built transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSettings {
    pub base_compute_units: u32,
    pub compute_units_per_hop: u32,
    pub priority_fee_micro_lamports: u64,
    pub max_hops_per_transaction: usize,
}

impl From<&ExecutionConfig> for BuildSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            base_compute_units: config.base_compute_units,
            compute_units_per_hop: config.compute_units_per_hop,
            priority_fee_micro_lamports: config.priority_fee_micro_lamports,
            max_hops_per_transaction: config.max_hops_per_transaction.max(1),
        }
    }
}

impl BuildSettings {
    /// Compute budget for a transaction containing `hops` swap instructions
    pub fn budget_for(&self, hops: usize) -> ComputeBudget {
        ComputeBudget::for_hops(
            self.base_compute_units,
            self.compute_units_per_hop,
            hops,
            self.priority_fee_micro_lamports,
        )
    }
}

/// An unsigned transaction: payload instructions plus its compute budget
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// Setup, swap and teardown instructions (compute budget excluded)
    pub instructions: Vec<Instruction>,
    /// Swap instructions contained
    pub hop_count: usize,
    pub compute_budget: ComputeBudget,
}

impl TransactionDraft {
    /// Every instruction in submission order, compute budget first
    pub fn full_instructions(&self) -> Vec<Instruction> {
        let mut instructions = compute_budget_instructions(&self.compute_budget);
        instructions.extend(self.instructions.iter().cloned());
        instructions
    }

    /// Sign with `payer` against `blockhash`
    pub fn sign(&self, payer: &Keypair, blockhash: Hash) -> AppResult<Transaction> {
        let mut transaction =
            Transaction::new_with_payer(&self.full_instructions(), Some(&payer.pubkey()));
        transaction
            .try_sign(&[payer], blockhash)
            .map_err(|e| AppError::swap(SwapStage::Build, format!("Signing failed: {}", e)))?;
        Ok(transaction)
    }
}

/// Instruction group that must land in a single transaction
struct Group {
    instructions: Vec<Instruction>,
    hops: usize,
}

/// Builds transaction drafts for swap plans
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    settings: BuildSettings,
}

impl TransactionBuilder {
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Build every draft needed to execute `plan` for `payer`, in order
    pub fn build(&self, payer: &Pubkey, plan: &SwapPlan) -> AppResult<Vec<TransactionDraft>> {
        let route = &plan.route;
        if route.hops.is_empty() {
            return Err(AppError::swap(SwapStage::Build, "Route has no hops"));
        }
        if plan.pool_handles.len() != route.hops.len() {
            return Err(AppError::swap(
                SwapStage::Build,
                format!(
                    "Expected {} pool handles, got {}",
                    route.hops.len(),
                    plan.pool_handles.len()
                ),
            ));
        }

        let mut groups = Vec::with_capacity(route.hops.len() + 2);

        let setup = setup_instructions(payer, plan)?;
        if !setup.is_empty() {
            groups.push(Group {
                instructions: setup,
                hops: 0,
            });
        }

        let limits = route.hop_limits();
        for ((hop, handle), limit) in route.hops.iter().zip(&plan.pool_handles).zip(&limits) {
            groups.push(Group {
                instructions: vec![swap_instruction(payer, hop, handle, limit)?],
                hops: 1,
            });
        }

        // Teardown rides with the final swap
        let teardown = teardown_instructions(payer, plan)?;
        if let Some(last_swap) = groups.last_mut() {
            last_swap.instructions.extend(teardown);
        }

        let drafts = self.pack(payer, groups)?;
        tracing::debug!(
            payer = %payer,
            hops = route.hop_count(),
            transactions = drafts.len(),
            "Swap transactions built"
        );
        Ok(drafts)
    }

    /// Greedy packing: keep adding groups while the hop limit and packet size allow
    fn pack(&self, payer: &Pubkey, groups: Vec<Group>) -> AppResult<Vec<TransactionDraft>> {
        let mut drafts = Vec::new();
        let mut current: Vec<Instruction> = Vec::new();
        let mut current_hops = 0usize;

        for group in groups {
            let hops = current_hops + group.hops;
            let mut candidate = current.clone();
            candidate.extend(group.instructions.iter().cloned());

            let fits = hops <= self.settings.max_hops_per_transaction
                && self.fits_in_packet(payer, &candidate, hops)?;

            if fits {
                current = candidate;
                current_hops = hops;
                continue;
            }

            if current.is_empty() {
                return Err(AppError::swap(
                    SwapStage::Build,
                    "Instruction group does not fit in a single transaction",
                ));
            }

            drafts.push(self.draft(std::mem::take(&mut current), current_hops));

            if !self.fits_in_packet(payer, &group.instructions, group.hops)? {
                return Err(AppError::swap(
                    SwapStage::Build,
                    "Instruction group does not fit in a single transaction",
                ));
            }
            current = group.instructions;
            current_hops = group.hops;
        }

        if !current.is_empty() {
            drafts.push(self.draft(current, current_hops));
        }

        Ok(drafts)
    }

    fn draft(&self, instructions: Vec<Instruction>, hop_count: usize) -> TransactionDraft {
        TransactionDraft {
            instructions,
            hop_count,
            compute_budget: self.settings.budget_for(hop_count),
        }
    }

    fn fits_in_packet(&self, payer: &Pubkey, instructions: &[Instruction], hops: usize) -> AppResult<bool> {
        let draft = self.draft(instructions.to_vec(), hops);
        Ok(serialized_size(payer, &draft)? <= MAX_TRANSACTION_BYTES)
    }
}

/// Wire size of a draft once signed
pub fn serialized_size(payer: &Pubkey, draft: &TransactionDraft) -> AppResult<usize> {
    // Unsigned transactions carry placeholder signatures of the right count
    let transaction = Transaction::new_with_payer(&draft.full_instructions(), Some(payer));
    bincode1::serialized_size(&transaction)
        .map(|size| size as usize)
        .map_err(|e| AppError::swap(SwapStage::Build, format!("Failed to size transaction: {}", e)))
}

fn compute_budget_instructions(budget: &ComputeBudget) -> Vec<Instruction> {
    vec![
        ComputeBudgetInstruction::set_compute_unit_limit(budget.units),
        ComputeBudgetInstruction::set_compute_unit_price(budget.priority_fee_micro_lamports),
    ]
}

fn token_account(owner: &Pubkey, asset: &AssetReference) -> Pubkey {
    get_associated_token_address_with_program_id(owner, &asset.mint, &asset.token_program_id())
}

fn build_error(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::swap(SwapStage::Build, format!("{}: {}", context, e))
}

/// Token accounts for every received asset, plus SOL wrapping when the input is native
fn setup_instructions(payer: &Pubkey, plan: &SwapPlan) -> AppResult<Vec<Instruction>> {
    let route = &plan.route;
    let mut instructions = Vec::new();
    let mut created = std::collections::HashSet::new();

    let input = route
        .input()
        .ok_or_else(|| AppError::swap(SwapStage::Build, "Route has no input asset"))?;

    if input.is_native() {
        let wsol = token_account(payer, input);
        created.insert(input.mint);
        instructions.push(create_associated_token_account_idempotent(
            payer,
            payer,
            &input.mint,
            &input.token_program_id(),
        ));
        instructions.push(solana_system_interface::instruction::transfer(
            payer,
            &wsol,
            route.input_amount,
        ));
        instructions.push(
            spl_token::instruction::sync_native(&spl_token::id(), &wsol)
                .map_err(|e| build_error("sync_native", e))?,
        );
    }

    for hop in &route.hops {
        if hop.output.mint == input.mint || !created.insert(hop.output.mint) {
            continue;
        }
        instructions.push(create_associated_token_account_idempotent(
            payer,
            payer,
            &hop.output.mint,
            &hop.output.token_program_id(),
        ));
    }

    Ok(instructions)
}

/// Close the wSOL account when the route spent or produced native SOL
fn teardown_instructions(payer: &Pubkey, plan: &SwapPlan) -> AppResult<Vec<Instruction>> {
    let touches_native = plan
        .route
        .hops
        .iter()
        .any(|hop| hop.input.is_native() || hop.output.is_native());
    if !touches_native {
        return Ok(Vec::new());
    }

    let native = AssetReference::native();
    let wsol = token_account(payer, &native);
    let close = spl_token::instruction::close_account(&spl_token::id(), &wsol, payer, payer, &[])
        .map_err(|e| build_error("close_account", e))?;
    Ok(vec![close])
}

/// Swap instruction for one hop
pub fn swap_instruction(
    payer: &Pubkey,
    hop: &RouteHop,
    handle: &PoolHandle,
    limit: &HopLimit,
) -> AppResult<Instruction> {
    if handle.pool_address() != hop.pool.address {
        return Err(AppError::swap(
            SwapStage::Build,
            format!(
                "Pool handle {} does not match hop pool {}",
                handle.pool_address(),
                hop.pool.address
            ),
        ));
    }

    match handle {
        PoolHandle::ConstantProduct(amm) => raydium_swap_base_in(payer, hop, amm, limit),
        PoolHandle::Concentrated(whirlpool) => whirlpool_swap(payer, hop, whirlpool, limit),
    }
}

/// Raydium AMM v4 `swap_base_in` (17 accounts, no target orders)
fn raydium_swap_base_in(
    payer: &Pubkey,
    hop: &RouteHop,
    amm: &AmmPoolHandle,
    limit: &HopLimit,
) -> AppResult<Instruction> {
    if hop.input.token_2022 || hop.output.token_2022 {
        return Err(AppError::swap(
            SwapStage::Build,
            "Raydium AMM v4 pools do not support Token-2022 assets",
        ));
    }

    let mut data = Vec::with_capacity(17);
    data.push(RAYDIUM_SWAP_BASE_IN);
    data.extend_from_slice(&limit.amount_in.to_le_bytes());
    data.extend_from_slice(&limit.min_amount_out.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(amm.amm, false),
        AccountMeta::new_readonly(amm.authority, false),
        AccountMeta::new(amm.open_orders, false),
        AccountMeta::new(amm.vault_a, false),
        AccountMeta::new(amm.vault_b, false),
        AccountMeta::new_readonly(amm.market_program, false),
        AccountMeta::new(amm.market, false),
        AccountMeta::new(amm.market_bids, false),
        AccountMeta::new(amm.market_asks, false),
        AccountMeta::new(amm.market_event_queue, false),
        AccountMeta::new(amm.market_base_vault, false),
        AccountMeta::new(amm.market_quote_vault, false),
        AccountMeta::new_readonly(amm.market_vault_signer, false),
        AccountMeta::new(token_account(payer, &hop.input), false),
        AccountMeta::new(token_account(payer, &hop.output), false),
        AccountMeta::new_readonly(*payer, true),
    ];

    Ok(Instruction {
        program_id: amm.program_id,
        accounts,
        data,
    })
}

/// First 8 bytes of `sha256("global:<name>")`
pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

/// Start index of the tick array containing `tick`
pub fn tick_array_start_index(tick: i32, tick_spacing: u16) -> i32 {
    let ticks_per_array = TICK_ARRAY_SIZE * tick_spacing.max(1) as i32;
    tick.div_euclid(ticks_per_array) * ticks_per_array
}

/// The three tick arrays a swap may cross, in swap direction
pub fn tick_array_addresses(handle: &WhirlpoolHandle, a_to_b: bool) -> [Pubkey; 3] {
    let span = TICK_ARRAY_SIZE * handle.tick_spacing.max(1) as i32;
    let start = tick_array_start_index(handle.tick_current_index, handle.tick_spacing);
    let step = if a_to_b { -span } else { span };

    [0, 1, 2].map(|i| {
        let index = start + step * i;
        Pubkey::find_program_address(
            &[
                b"tick_array",
                handle.whirlpool.as_ref(),
                index.to_string().as_bytes(),
            ],
            &handle.program_id,
        )
        .0
    })
}

/// Oracle PDA of a whirlpool
pub fn oracle_address(handle: &WhirlpoolHandle) -> Pubkey {
    Pubkey::find_program_address(&[b"oracle", handle.whirlpool.as_ref()], &handle.program_id).0
}

/// Orca Whirlpool exact-input swap; `swap_v2` when either side is Token-2022
fn whirlpool_swap(
    payer: &Pubkey,
    hop: &RouteHop,
    handle: &WhirlpoolHandle,
    limit: &HopLimit,
) -> AppResult<Instruction> {
    let a_to_b = if hop.input.mint == handle.mint_a && hop.output.mint == handle.mint_b {
        true
    } else if hop.input.mint == handle.mint_b && hop.output.mint == handle.mint_a {
        false
    } else {
        return Err(AppError::swap(
            SwapStage::Build,
            format!("Whirlpool {} does not trade {} for {}", handle.whirlpool, hop.input, hop.output),
        ));
    };

    let (asset_a, asset_b) = if a_to_b {
        (hop.input, hop.output)
    } else {
        (hop.output, hop.input)
    };
    let owner_a = token_account(payer, &asset_a);
    let owner_b = token_account(payer, &asset_b);
    let tick_arrays = tick_array_addresses(handle, a_to_b);
    let oracle = oracle_address(handle);
    let use_v2 = asset_a.token_2022 || asset_b.token_2022;

    let sqrt_price_limit = if a_to_b { MIN_SQRT_PRICE } else { MAX_SQRT_PRICE };
    let mut data = Vec::with_capacity(43);
    data.extend_from_slice(&anchor_discriminator(if use_v2 { "swap_v2" } else { "swap" }));
    data.extend_from_slice(&limit.amount_in.to_le_bytes());
    data.extend_from_slice(&limit.min_amount_out.to_le_bytes());
    data.extend_from_slice(&sqrt_price_limit.to_le_bytes());
    data.push(1); // amount_specified_is_input
    data.push(a_to_b as u8);

    let accounts = if use_v2 {
        // remaining_accounts_info: None
        data.push(0);
        let memo = Pubkey::from_str(programs::MEMO).map_err(|e| build_error("memo program", e))?;
        vec![
            AccountMeta::new_readonly(asset_a.token_program_id(), false),
            AccountMeta::new_readonly(asset_b.token_program_id(), false),
            AccountMeta::new_readonly(memo, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(handle.whirlpool, false),
            AccountMeta::new_readonly(handle.mint_a, false),
            AccountMeta::new_readonly(handle.mint_b, false),
            AccountMeta::new(owner_a, false),
            AccountMeta::new(handle.vault_a, false),
            AccountMeta::new(owner_b, false),
            AccountMeta::new(handle.vault_b, false),
            AccountMeta::new(tick_arrays[0], false),
            AccountMeta::new(tick_arrays[1], false),
            AccountMeta::new(tick_arrays[2], false),
            AccountMeta::new(oracle, false),
        ]
    } else {
        vec![
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(handle.whirlpool, false),
            AccountMeta::new(owner_a, false),
            AccountMeta::new(handle.vault_a, false),
            AccountMeta::new(owner_b, false),
            AccountMeta::new(handle.vault_b, false),
            AccountMeta::new(tick_arrays[0], false),
            AccountMeta::new(tick_arrays[1], false),
            AccountMeta::new(tick_arrays[2], false),
            AccountMeta::new_readonly(oracle, false),
        ]
    };

    Ok(Instruction {
        program_id: handle.program_id,
        accounts,
        data,
    })
}
