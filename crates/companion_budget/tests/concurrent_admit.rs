//! Integration test exercising `BudgetGovernor::admit` as a public API,
//! confirming the single-connection pool keeps concurrent admissions
//! atomic even when driven from outside the crate.

use companion_budget::{Admission, BudgetGovernor, SharedStore};
use companion_core::config::BudgetConfig;
use companion_core::model::Component;
use std::sync::Arc;

#[tokio::test]
async fn concurrent_admits_never_overspend_the_ceiling() {
    let store = SharedStore::in_memory().await.unwrap();
    let governor = Arc::new(BudgetGovernor::new(store, BudgetConfig::default()));
    let ceiling = 2.0;
    let cost = 0.2;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            governor
                .admit("acme", ceiling, Component::Dialogue, cost, false)
                .await
                .unwrap()
        }));
    }

    let mut allowed = 0u32;
    for handle in handles {
        if handle.await.unwrap() == Admission::Allow {
            allowed += 1;
        }
    }

    // floor(ceiling / cost) == 10, regardless of how the 50 callers interleave.
    assert_eq!(allowed, 10);

    let bucket = governor.snapshot("acme").await.unwrap();
    assert!(bucket.spent_usd <= ceiling + 1e-9);
    assert_eq!(bucket.denied_count, 40);
}

#[tokio::test]
async fn distinct_tenants_do_not_share_a_ceiling() {
    let store = SharedStore::in_memory().await.unwrap();
    let governor = BudgetGovernor::new(store, BudgetConfig::default());

    let first = governor
        .admit("tenant-a", 1.0, Component::Dialogue, 0.9, false)
        .await
        .unwrap();
    let second = governor
        .admit("tenant-b", 1.0, Component::Dialogue, 0.9, false)
        .await
        .unwrap();

    assert_eq!(first, Admission::Allow);
    assert_eq!(second, Admission::Allow);
}
