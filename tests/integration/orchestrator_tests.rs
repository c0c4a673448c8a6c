//! Buy Orchestrator Integration Tests
//!
//! Full scheduling passes on a paused clock:
//! - Every wallet is evaluated before any delay elapses
//! - Delays and amounts stay within their ranges
//! - Skips and failures stay isolated to their wallet

use crate::support::{executor, token, wallet, FakeLedger, FakeLiquiditySource};
use multibuy_operator::engine::{
    AmountCapper, BalanceOracle, BuildSettings, BuyOrchestrator, ScheduleParams,
    ScheduledSession,
};
use multibuy_operator::error::AppError;
use multibuy_operator::events::{BuyEvent, ChannelSink};
use multibuy_operator::models::{AssetReference, OutcomeStatus, WalletIdentity};
use multibuy_operator::utils::sol_to_lamports;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

const RESERVE: u64 = 10_000_000_000_000;

fn params() -> ScheduleParams {
    ScheduleParams {
        min_amount: sol_to_lamports(0.1),
        max_amount: sol_to_lamports(0.5),
        min_delay_ms: 1_000,
        max_delay_ms: 5_000,
        fee_buffer: sol_to_lamports(0.005),
    }
}

fn settings() -> BuildSettings {
    BuildSettings {
        base_compute_units: 60_000,
        compute_units_per_hop: 150_000,
        priority_fee_micro_lamports: 10_000,
        max_hops_per_transaction: 2,
    }
}

struct Harness {
    ledger: Arc<FakeLedger>,
    orchestrator: BuyOrchestrator,
    wallets: Vec<Arc<WalletIdentity>>,
}

/// `balances` in SOL, one wallet each, trading SOL for a fresh token
fn harness(balances: &[f64], seed: u64) -> Harness {
    let source = FakeLiquiditySource::new();
    let ledger = FakeLedger::new();
    let sol = AssetReference::native();
    let target = token(6);
    source.add_pool(sol, target, RESERVE, RESERVE, 25);

    let wallets: Vec<_> = balances
        .iter()
        .map(|sol_balance| {
            let w = wallet();
            ledger.set_balance(w.address(), sol_to_lamports(*sol_balance));
            w
        })
        .collect();

    let orchestrator = BuyOrchestrator::new(
        AmountCapper::new(BalanceOracle::new(ledger.clone())),
        executor(source, ledger.clone(), settings(), 100),
        sol,
        target,
    )
    .with_seed(seed);

    Harness {
        ledger,
        orchestrator,
        wallets,
    }
}

#[tokio::test(start_paused = true)]
async fn test_all_wallets_scheduled_before_any_delay() {
    let h = harness(&[1.0, 1.0, 1.0, 1.0, 1.0], 7);
    let start = Instant::now();

    let session = h.orchestrator.run(&h.wallets, params()).await.unwrap();

    // No virtual time passed while scheduling
    assert_eq!(Instant::now(), start);
    assert!(h.ledger.submissions().is_empty());

    let delays: Vec<(solana_sdk::pubkey::Pubkey, u64)> = session
        .scheduled()
        .iter()
        .map(|task| (task.wallet.address(), task.delay_ms))
        .collect();
    assert_eq!(delays.len(), 5);
    for (_, delay) in &delays {
        assert!((1_000..=5_000).contains(delay));
    }

    let outcomes = session.wait().await;
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.is_confirmed()));

    // Nothing fired before its own delay
    for (address, delay) in delays {
        let first = &h.ledger.submissions_for(&address)[0];
        assert!(first.at.duration_since(start) >= Duration::from_millis(delay));
    }
}

#[tokio::test(start_paused = true)]
async fn test_amounts_within_range_and_capped() {
    let h = harness(&[1.0, 0.3, 0.2, 5.0], 11);
    let p = params();

    let session = h.orchestrator.run(&h.wallets, p).await.unwrap();
    let outcomes = session.wait().await;

    for outcome in &outcomes {
        assert!((p.min_amount..=p.max_amount).contains(&outcome.desired_amount));
        assert!(outcome.capped_amount <= outcome.desired_amount);
        assert!(outcome.capped_amount >= p.min_amount);
    }
    // 0.2 SOL wallet can spend at most 0.195
    let poorest = outcomes
        .iter()
        .find(|o| o.wallet == h.wallets[2].address())
        .unwrap();
    assert!(poorest.capped_amount <= sol_to_lamports(0.195));
}

#[tokio::test(start_paused = true)]
async fn test_underfunded_wallet_skipped() {
    let h = harness(&[1.0, 0.05, 1.0], 3);
    let (sink, mut events) = ChannelSink::new();
    let orchestrator = h.orchestrator.with_events(Arc::new(sink));
    let poor = h.wallets[1].address();

    let session = orchestrator.run(&h.wallets, params()).await.unwrap();
    assert_eq!(session.scheduled().len(), 2);
    assert_eq!(session.settled().len(), 1);

    let outcomes = session.wait().await;
    let skipped = outcomes.iter().find(|o| o.wallet == poor).unwrap();
    assert!(skipped.is_skipped());
    assert_eq!(skipped.capped_amount, 0);
    assert!(h.ledger.submissions_for(&poor).is_empty());
    assert_eq!(outcomes.iter().filter(|o| o.is_confirmed()).count(), 2);

    let mut saw_skip = false;
    let mut last = None;
    while let Ok(event) = events.try_recv() {
        if matches!(&event, BuyEvent::WalletSkipped { wallet, .. } if *wallet == poor) {
            saw_skip = true;
        }
        last = Some(event);
    }
    assert!(saw_skip);
    assert_eq!(
        last,
        Some(BuyEvent::SessionFinished {
            confirmed: 2,
            failed: 0,
            skipped: 1
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_balance_failure_does_not_stop_pass() {
    let h = harness(&[1.0, 1.0, 1.0], 5);
    let broken = h.wallets[0].address();
    h.ledger.make_unreachable(broken);

    let session = h.orchestrator.run(&h.wallets, params()).await.unwrap();
    assert_eq!(session.scheduled().len(), 2);

    let outcomes = session.wait().await;
    let failed = outcomes.iter().find(|o| o.wallet == broken).unwrap();
    match &failed.status {
        OutcomeStatus::Failed { kind, .. } => assert_eq!(kind, "connectivity_error"),
        other => panic!("unexpected status: {:?}", other),
    }
    assert_eq!(outcomes.iter().filter(|o| o.is_confirmed()).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_swap_leaves_siblings_alone() {
    let h = harness(&[1.0, 1.0, 1.0], 9);
    let unlucky = h.wallets[1].address();
    h.ledger.reject_submission(unlucky, 0);

    let session = h.orchestrator.run(&h.wallets, params()).await.unwrap();
    let outcomes = session.wait().await;

    for outcome in &outcomes {
        if outcome.wallet == unlucky {
            assert!(outcome.is_failed());
        } else {
            assert!(outcome.is_confirmed());
        }
    }
    assert_eq!(h.ledger.submissions_for(&unlucky).len(), 1);
}

fn draws(session: &ScheduledSession) -> Vec<(u64, u64)> {
    session
        .scheduled()
        .iter()
        .map(|t| (t.desired_amount, t.delay_ms))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_seed_makes_schedule_reproducible() {
    let first = harness(&[1.0, 1.0, 1.0], 42);
    let second = BuyOrchestrator::new(
        AmountCapper::new(BalanceOracle::new(first.ledger.clone())),
        executor(FakeLiquiditySource::new(), first.ledger.clone(), settings(), 100),
        AssetReference::native(),
        token(6),
    )
    .with_seed(42);

    let a = first.orchestrator.run(&first.wallets, params()).await.unwrap();
    let b = second.run(&first.wallets, params()).await.unwrap();

    assert_eq!(draws(&a), draws(&b));

    a.wait().await;
    b.wait().await;
}

#[tokio::test]
async fn test_invalid_params_rejected_before_balances() {
    let h = harness(&[1.0], 1);
    let mut p = params();
    p.min_delay_ms = 10_000;

    let err = h.orchestrator.run(&h.wallets, p).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.ledger.balance_reads(), 0);
}
