//! Swap Executor Integration Tests
//!
//! Runs resolve -> plan -> build -> submit against the in-memory ledger:
//! - k transactions means exactly k submissions, in order
//! - A rejected submission stops the attempt
//! - Failures carry the stage they happened at
//! - Latency is recorded for failed attempts too

use crate::support::{
    executor, one_hop_per_transaction, resolver, token, wallet, FakeLedger, FakeLiquiditySource,
};
use multibuy_operator::engine::{SwapExecutor, TransactionBuilder};
use multibuy_operator::error::{AppError, SwapStage};
use multibuy_operator::metrics::SessionMetrics;
use multibuy_operator::models::AssetReference;
use std::sync::Arc;

const RESERVE: u64 = 1_000_000_000_000;
const AMOUNT: u64 = 100_000_000;

/// SOL -> m1 -> m2 -> target, the only path
fn three_hop_market() -> (Arc<FakeLiquiditySource>, AssetReference, AssetReference) {
    let source = FakeLiquiditySource::new();
    let sol = AssetReference::native();
    let (m1, m2, target) = (token(6), token(6), token(6));
    source.add_pool(sol, m1, RESERVE, RESERVE, 25);
    source.add_pool(m1, m2, RESERVE, RESERVE, 25);
    source.add_pool(m2, target, RESERVE, RESERVE, 25);
    (source, sol, target)
}

#[tokio::test]
async fn test_each_transaction_submitted_once_in_order() {
    let (source, sol, target) = three_hop_market();
    let ledger = FakeLedger::new();
    let w = wallet();
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let signatures = executor.execute(&w, &sol, &target, AMOUNT).await.unwrap();

    let submissions = ledger.submissions_for(&w.address());
    assert!(signatures.len() >= 3);
    assert_eq!(submissions.len(), signatures.len());
    for (submission, signature) in submissions.iter().zip(&signatures) {
        assert!(submission.accepted);
        assert_eq!(submission.signature, *signature);
    }
}

#[tokio::test]
async fn test_second_submission_rejected_stops_attempt() {
    let (source, sol, target) = three_hop_market();
    let ledger = FakeLedger::new();
    let w = wallet();
    ledger.reject_submission(w.address(), 1);
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let err = executor.execute(&w, &sol, &target, AMOUNT).await.unwrap_err();

    match &err {
        AppError::SwapExecution { stage, reason } => {
            assert_eq!(*stage, SwapStage::Submit);
            assert!(reason.contains("already confirmed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // No third transaction attempted
    let submissions = ledger.submissions_for(&w.address());
    assert_eq!(submissions.len(), 2);
    assert!(submissions[0].accepted);
    assert!(!submissions[1].accepted);
}

#[tokio::test]
async fn test_unconfirmed_transaction_fails_at_confirm() {
    let (source, sol, target) = three_hop_market();
    let ledger = FakeLedger::new();
    let w = wallet();
    ledger.never_confirm(w.address());
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let err = executor.execute(&w, &sol, &target, AMOUNT).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::SwapExecution {
            stage: SwapStage::Confirm,
            ..
        }
    ));
    assert_eq!(ledger.submissions_for(&w.address()).len(), 1);
}

#[tokio::test]
async fn test_missing_pool_handle_fails_before_submission() {
    let source = FakeLiquiditySource::new();
    let sol = AssetReference::native();
    let target = token(6);
    let pool = source.add_pool(sol, target, RESERVE, RESERVE, 25);
    source.remove_handle(pool.address);
    let ledger = FakeLedger::new();
    let w = wallet();
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let err = executor.execute(&w, &sol, &target, AMOUNT).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::SwapExecution {
            stage: SwapStage::PoolResolution,
            ..
        }
    ));
    assert!(ledger.submissions().is_empty());
}

#[tokio::test]
async fn test_no_route_submits_nothing() {
    let source = FakeLiquiditySource::new();
    let sol = AssetReference::native();
    source.add_pool(sol, token(6), RESERVE, RESERVE, 25);
    let ledger = FakeLedger::new();
    let w = wallet();
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let err = executor.execute(&w, &sol, &token(6), AMOUNT).await.unwrap_err();

    assert!(matches!(err, AppError::NoRouteFound { .. }));
    assert!(ledger.submissions().is_empty());
}

#[tokio::test]
async fn test_unreachable_ledger_during_attempt() {
    let (source, sol, target) = three_hop_market();
    let ledger = FakeLedger::new();
    ledger.go_offline();
    let executor = executor(source, ledger.clone(), one_hop_per_transaction(), 100);

    let err = executor.execute(&wallet(), &sol, &target, AMOUNT).await.unwrap_err();
    assert!(matches!(err, AppError::Connectivity(_)));
}

#[tokio::test]
async fn test_latency_recorded_for_both_outcomes() {
    let (source, sol, target) = three_hop_market();
    let ledger = FakeLedger::new();
    let (ok, rejected) = (wallet(), wallet());
    ledger.reject_submission(rejected.address(), 1);
    let metrics = SessionMetrics::new().unwrap();
    let executor = SwapExecutor::new(
        resolver(source, ledger.clone()),
        ledger.clone(),
        TransactionBuilder::new(one_hop_per_transaction()),
        100,
    )
    .with_metrics(metrics.clone());

    executor.execute(&ok, &sol, &target, AMOUNT).await.unwrap();
    executor.execute(&rejected, &sol, &target, AMOUNT).await.unwrap_err();

    for outcome in ["confirmed", "failed"] {
        let count = metrics
            .swap_latency_ms
            .with_label_values(&[outcome])
            .get_sample_count();
        assert_eq!(count, 1, "{} attempts", outcome);
    }
}
