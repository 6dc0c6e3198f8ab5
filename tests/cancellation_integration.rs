//! Integration tests for cancellation and runtime dispatch.
//!
//! These tests drive effects across real tokio runtimes and verify that
//! cancellation requested through the environment reaches running work.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use undertow::aff::iterate::iter_parallel;
use undertow::{assert_fail, assert_succ, Aff, EnvIO, HasCancel, Schedule};

fn thread_name() -> String {
    std::thread::current().name().unwrap_or("unnamed").to_string()
}

// ============================================================================
// Posting onto the captured runtime
// ============================================================================

#[test]
fn post_runs_on_the_captured_runtime() {
    let captured = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("captured-rt")
        .enable_all()
        .build()
        .unwrap();
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let env = EnvIO::detached().with_handle(captured.handle().clone());
    let where_ran = Aff::<String>::effect(|| async { thread_name() }).post();

    let name = caller.block_on(where_ran.run(&env));
    assert_eq!(name, Ok("captured-rt".to_string()));
}

#[test]
fn unposted_effect_runs_on_the_polling_runtime() {
    let captured = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("captured-rt")
        .enable_all()
        .build()
        .unwrap();
    let caller = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let env = EnvIO::detached().with_handle(captured.handle().clone());
    let where_ran = Aff::<String>::effect(|| async { thread_name() });

    let name = caller.block_on(where_ran.run(&env)).unwrap();
    assert_ne!(name, "captured-rt");
}

// ============================================================================
// Cancellation reaching running work
// ============================================================================

#[tokio::test]
async fn cancel_stops_a_posted_schedule() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = ticks.clone();
    let ticking = Aff::<()>::effect(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
    .repeat(Schedule::spaced(Duration::from_millis(5)))
    .post();

    let env = EnvIO::new();
    let cancel = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        cancel.cancel();
    });

    let result = ticking.run(&env).await;
    assert!(result.unwrap_err().is_cancelled());
    assert!(ticks.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn fire_and_forget_work_observes_cancellation() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = ticks.clone();
    let background = Aff::<()>::effect(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
    .repeat(Schedule::spaced(Duration::from_millis(5)))
    .fire_and_forget();

    let env = EnvIO::new();
    assert_succ!(background.run(&env).await);

    tokio::time::sleep(Duration::from_millis(30)).await;
    env.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let after_cancel = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(after_cancel >= 1);
    assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
}

#[tokio::test]
async fn local_scope_cancellation_stays_local() {
    let env = EnvIO::new();
    let scope = env.local_cancel();

    let slow = Aff::<()>::effect(|| tokio::time::sleep(Duration::from_secs(5)));
    let canceller = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    assert_fail!(slow.run(&scope).await);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!env.is_cancelled());

    let fresh = Aff::<u8>::success(1);
    assert_succ!(fresh.run(&env).await, 1);
}

#[tokio::test]
async fn parallel_failure_does_not_cancel_the_caller() {
    let all = iter_parallel(
        Aff::<Vec<u32>>::success(vec![1, 2, 3, 4]),
        |n| {
            if n == 1 {
                Aff::<()>::fail(undertow::Error::new("first element"))
            } else {
                Aff::<()>::effect(|| tokio::time::sleep(Duration::from_secs(5)))
            }
        },
        2,
    );

    let env = EnvIO::new();
    let start = Instant::now();
    assert_fail!(all.run(&env).await);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!env.is_cancelled());
}
