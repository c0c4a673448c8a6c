//! Transaction Builder Unit Tests
//!
//! Tests how swap plans become transaction drafts:
//! - Packing under the per-transaction hop limit
//! - Compute budget sized per draft
//! - SOL wrapping and unwrapping around native routes
//! - Hop limits encoded into swap instructions

use crate::support::{one_hop_per_transaction, token, token_2022};
use multibuy_operator::constants::limits::MAX_TRANSACTION_BYTES;
use multibuy_operator::engine::transaction_builder::serialized_size;
use multibuy_operator::engine::{BuildSettings, TransactionBuilder};
use multibuy_operator::error::{AppError, SwapStage};
use multibuy_operator::models::{
    AmmPoolHandle, AssetReference, ComputeBudget, PoolDescriptor, PoolHandle, PoolKind,
    RouteCandidate, RouteHop, RouteKind, SwapPlan,
};
use solana_sdk::pubkey::Pubkey;

fn hop(input: AssetReference, output: AssetReference, amount_in: u64, amount_out: u64) -> RouteHop {
    RouteHop {
        pool: PoolDescriptor {
            address: Pubkey::new_unique(),
            kind: PoolKind::ConstantProduct,
            program_id: Pubkey::new_unique(),
            asset_a: input,
            asset_b: output,
        },
        input,
        output,
        amount_in,
        amount_out,
    }
}

fn amm_handle(pool: &PoolDescriptor) -> PoolHandle {
    PoolHandle::ConstantProduct(AmmPoolHandle {
        program_id: pool.program_id,
        amm: pool.address,
        authority: Pubkey::new_unique(),
        open_orders: Pubkey::new_unique(),
        vault_a: Pubkey::new_unique(),
        vault_b: Pubkey::new_unique(),
        market_program: Pubkey::new_unique(),
        market: Pubkey::new_unique(),
        market_bids: Pubkey::new_unique(),
        market_asks: Pubkey::new_unique(),
        market_event_queue: Pubkey::new_unique(),
        market_base_vault: Pubkey::new_unique(),
        market_quote_vault: Pubkey::new_unique(),
        market_vault_signer: Pubkey::new_unique(),
    })
}

fn plan(hops: Vec<RouteHop>) -> SwapPlan {
    let input_amount = hops[0].amount_in;
    let output_amount = hops.last().map(|h| h.amount_out).unwrap_or(0);
    let pool_handles = hops.iter().map(|h| amm_handle(&h.pool)).collect();
    SwapPlan {
        route: RouteCandidate {
            kind: RouteKind::for_hops(hops.len()),
            hops,
            input_amount,
            output_amount,
            min_output_amount: output_amount * 99 / 100,
            slippage_bps: 100,
        },
        pool_handles,
        compute_budget: ComputeBudget::for_hops(60_000, 150_000, 1, 10_000),
    }
}

fn two_hops_per_transaction() -> BuildSettings {
    BuildSettings {
        max_hops_per_transaction: 2,
        ..one_hop_per_transaction()
    }
}

#[test]
fn test_direct_native_route_fits_one_transaction() {
    let payer = Pubkey::new_unique();
    let sol = AssetReference::native();
    let plan = plan(vec![hop(sol, token(6), 100_000_000, 5_000_000)]);

    let drafts = TransactionBuilder::new(two_hops_per_transaction())
        .build(&payer, &plan)
        .unwrap();

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].hop_count, 1);
    assert_eq!(drafts[0].compute_budget.units, 210_000);
    assert!(serialized_size(&payer, &drafts[0]).unwrap() <= MAX_TRANSACTION_BYTES);

    // Compute budget first, wSOL account closed last
    let instructions = drafts[0].full_instructions();
    assert_eq!(
        instructions[0].program_id,
        solana_sdk::compute_budget::id()
    );
    let last = instructions.last().unwrap();
    assert_eq!(last.program_id, spl_token::id());
}

#[test]
fn test_multi_hop_route_splits_under_hop_limit() {
    let payer = Pubkey::new_unique();
    let (sol, mid, out) = (AssetReference::native(), token(6), token(6));
    let plan = plan(vec![
        hop(sol, mid, 100_000_000, 20_000_000),
        hop(mid, out, 20_000_000, 7_000_000),
    ]);

    let drafts = TransactionBuilder::new(one_hop_per_transaction())
        .build(&payer, &plan)
        .unwrap();

    assert_eq!(drafts.len(), 2);
    for draft in &drafts {
        assert_eq!(draft.hop_count, 1);
        assert_eq!(draft.compute_budget.units, 210_000);
        assert!(serialized_size(&payer, draft).unwrap() <= MAX_TRANSACTION_BYTES);
    }
}

#[test]
fn test_wsol_closed_in_final_swap_transaction() {
    let payer = Pubkey::new_unique();
    let (sol, mid, out) = (AssetReference::native(), token(6), token(6));
    let plan = plan(vec![
        hop(sol, mid, 100_000_000, 20_000_000),
        hop(mid, out, 20_000_000, 7_000_000),
    ]);
    let final_pool = plan.route.hops[1].pool.program_id;

    let drafts = TransactionBuilder::new(one_hop_per_transaction())
        .build(&payer, &plan)
        .unwrap();

    let is_close = |ix: &solana_sdk::instruction::Instruction| {
        ix.program_id == spl_token::id() && ix.data.first() == Some(&9)
    };
    assert!(!drafts[0].instructions.iter().any(is_close));

    let last = &drafts[drafts.len() - 1].instructions;
    let swap_at = last.iter().position(|ix| ix.program_id == final_pool).unwrap();
    let close_at = last.iter().position(is_close).unwrap();
    assert!(close_at > swap_at);
}

#[test]
fn test_hop_limits_encoded_in_swap_data() {
    let payer = Pubkey::new_unique();
    let (a, mid, out) = (token(9), token(6), token(6));
    let plan = plan(vec![
        hop(a, mid, 100_000, 200_000),
        hop(mid, out, 200_000, 50_000),
    ]);
    let limits = plan.route.hop_limits();

    let drafts = TransactionBuilder::new(one_hop_per_transaction())
        .build(&payer, &plan)
        .unwrap();

    for (draft, (hop, limit)) in drafts.iter().zip(plan.route.hops.iter().zip(&limits)) {
        let swap = draft
            .instructions
            .iter()
            .find(|ix| ix.program_id == hop.pool.program_id)
            .unwrap();
        assert_eq!(swap.data[0], 9);
        assert_eq!(&swap.data[1..9], &limit.amount_in.to_le_bytes()[..]);
        assert_eq!(&swap.data[9..17], &limit.min_amount_out.to_le_bytes()[..]);
    }

    // Second hop spends exactly what the first hop guarantees
    assert_eq!(limits[1].amount_in, limits[0].min_amount_out);
    // Final instruction floor is the route minimum, not a compounded one
    assert_eq!(limits[1].min_amount_out, plan.route.min_output_amount);
    assert_eq!(limits[0].min_amount_out, 199_000);
}

#[test]
fn test_mismatched_handle_rejected() {
    let payer = Pubkey::new_unique();
    let mut plan = plan(vec![hop(token(9), token(6), 1_000, 900)]);
    let stranger = hop(token(9), token(6), 1_000, 900);
    plan.pool_handles = vec![amm_handle(&stranger.pool)];

    let err = TransactionBuilder::new(one_hop_per_transaction())
        .build(&payer, &plan)
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::SwapExecution {
            stage: SwapStage::Build,
            ..
        }
    ));
}

#[test]
fn test_constant_product_rejects_token_2022() {
    let payer = Pubkey::new_unique();
    let plan = plan(vec![hop(AssetReference::native(), token_2022(6), 1_000, 900)]);

    assert!(TransactionBuilder::new(one_hop_per_transaction())
        .build(&payer, &plan)
        .is_err());
}
