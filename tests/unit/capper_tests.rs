//! Amount Capper Unit Tests
//!
//! Tests the capping rules against live balances:
//! - Capped amount never exceeds the desired amount
//! - Wallets that cannot afford the floor are capped to zero
//! - Balances are read fresh on every call

use crate::support::{wallet, FakeLedger};
use multibuy_operator::engine::{cap_amount, AmountCapper, BalanceOracle};
use multibuy_operator::error::AppError;
use multibuy_operator::utils::sol_to_lamports;
use std::sync::Arc;

fn capper(ledger: &Arc<FakeLedger>) -> AmountCapper {
    AmountCapper::new(BalanceOracle::new(ledger.clone()))
}

#[test]
fn test_capped_never_exceeds_desired() {
    let fee_buffer = 5_000;
    let min_allowed = 100_000;

    for balance in (0..2_000_000u64).step_by(37_013) {
        for desired in (min_allowed..1_500_000).step_by(91_117) {
            let capped = cap_amount(balance, desired, min_allowed, fee_buffer);
            assert!(capped <= desired, "balance {} desired {}", balance, desired);
            if capped != 0 {
                assert!(capped >= min_allowed);
                assert!(capped <= balance - fee_buffer);
            }
        }
    }
}

#[test]
fn test_zero_when_floor_unaffordable() {
    assert_eq!(cap_amount(104_999, 200_000, 100_000, 5_000), 0);
    assert_eq!(cap_amount(0, 200_000, 100_000, 5_000), 0);
    // Balance below the buffer itself
    assert_eq!(cap_amount(1_000, 200_000, 100_000, 5_000), 0);
}

#[test]
fn test_desired_untouched_when_affordable() {
    assert_eq!(cap_amount(1_000_000, 300_000, 100_000, 5_000), 300_000);
    assert_eq!(cap_amount(305_000, 300_000, 100_000, 5_000), 300_000);
    // Exactly the floor is still affordable
    assert_eq!(cap_amount(105_000, 300_000, 100_000, 5_000), 100_000);
}

#[tokio::test]
async fn test_scenario_full_wallet_stays_within_bounds() {
    let ledger = FakeLedger::new();
    let w = wallet();
    ledger.set_balance(w.address(), sol_to_lamports(1.0));
    let capper = capper(&ledger);

    let min = sol_to_lamports(0.1);
    let buffer = sol_to_lamports(0.005);
    for desired in [min, sol_to_lamports(0.5), sol_to_lamports(0.995), sol_to_lamports(2.0)] {
        let capped = capper.cap(&w, desired, min, buffer).await.unwrap();
        assert!(capped >= min);
        assert!(capped <= sol_to_lamports(0.995));
    }
}

#[tokio::test]
async fn test_scenario_poor_wallet_is_skipped() {
    let ledger = FakeLedger::new();
    let w = wallet();
    ledger.set_balance(w.address(), sol_to_lamports(0.05));

    let capped = capper(&ledger)
        .cap(&w, sol_to_lamports(0.3), sol_to_lamports(0.1), sol_to_lamports(0.005))
        .await
        .unwrap();
    assert_eq!(capped, 0);
}

#[tokio::test]
async fn test_balance_fetched_on_every_call() {
    let ledger = FakeLedger::new();
    let w = wallet();
    let capper = capper(&ledger);

    ledger.set_balance(w.address(), 1_000_000);
    assert_eq!(capper.cap(&w, 500_000, 100_000, 0).await.unwrap(), 500_000);

    ledger.set_balance(w.address(), 200_000);
    assert_eq!(capper.cap(&w, 500_000, 100_000, 0).await.unwrap(), 200_000);

    assert_eq!(ledger.balance_reads(), 2);
}

#[tokio::test]
async fn test_unreachable_ledger_is_connectivity_error() {
    let ledger = FakeLedger::new();
    let w = wallet();
    ledger.make_unreachable(w.address());

    let err = capper(&ledger).cap(&w, 500_000, 100_000, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Connectivity(_)));
}
