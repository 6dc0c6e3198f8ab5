use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::env::EnvIO;
use crate::error::{Error, Fin};
use crate::{Aff, Eff};

use super::Schedule;

fn counting_eff<F>(f: F) -> (Eff<u32>, Arc<AtomicU32>)
where
    F: Fn(u32) -> Fin<u32> + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    let eff = Eff::effect_maybe(move || f(counter.fetch_add(1, Ordering::SeqCst) + 1));
    (eff, runs)
}

fn counting_aff<F>(f: F) -> (Aff<u32>, Arc<AtomicU32>)
where
    F: Fn(u32) -> Fin<u32> + Send + Sync + 'static,
{
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    let f = Arc::new(f);
    let aff = Aff::effect_maybe(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let f = f.clone();
        async move { f(n) }
    });
    (aff, runs)
}

#[test]
fn test_repeat_runs_once_plus_repeats() {
    let (eff, runs) = counting_eff(Ok);
    assert_eq!(eff.repeat(Schedule::recurs(3)).run_standalone(), Ok(4));
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[test]
fn test_repeat_stops_at_first_failure() {
    let (eff, runs) = counting_eff(|n| if n == 2 { Err(Error::new("boom")) } else { Ok(n) });
    let result = eff.repeat(Schedule::recurs(5)).run_standalone();
    assert_eq!(result, Err(Error::new("boom")));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_never_runs_exactly_once() {
    let (eff, runs) = counting_eff(|_| Err(Error::new("down")));
    assert!(eff.retry(Schedule::never()).run_standalone().is_err());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_retry_forever_until_success() {
    let (eff, runs) = counting_eff(|n| if n < 3 { Err(Error::new("busy")) } else { Ok(n) });
    assert_eq!(eff.retry(Schedule::forever()).run_standalone(), Ok(3));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_retry_while_with_exponential_backoff() {
    let (eff, runs) = counting_eff(|_| Err(Error::coded(5, "busy")));
    let schedule = Schedule::exponential(Duration::from_millis(10)).with_repeats(2);

    let start = Instant::now();
    let result = eff.retry_while(schedule, |e| e.has_code(5)).run_standalone();

    assert_eq!(result.unwrap_err().code(), Some(5));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_retry_while_stops_on_other_errors() {
    let (eff, runs) = counting_eff(|n| Err(Error::coded(n as i32, "varying")));
    let result = eff
        .retry_while(Schedule::forever(), |e| e.has_code(1))
        .run_standalone();
    assert_eq!(result.unwrap_err().code(), Some(2));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_retry_until_predicate_matches() {
    let (eff, runs) = counting_eff(|n| Err(Error::coded(n as i32, "varying")));
    let result = eff
        .retry_until(Schedule::forever(), |e| e.has_code(4))
        .run_standalone();
    assert_eq!(result.unwrap_err().code(), Some(4));
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[test]
fn test_repeat_while_and_until() {
    let (eff, _) = counting_eff(Ok);
    assert_eq!(
        eff.repeat_while(Schedule::forever(), |n| *n < 5).run_standalone(),
        Ok(5)
    );

    let (eff, _) = counting_eff(Ok);
    assert_eq!(
        eff.repeat_until(Schedule::forever(), |n| *n == 3).run_standalone(),
        Ok(3)
    );
}

#[test]
fn test_repeat_bounded_by_schedule_before_predicate() {
    let (eff, runs) = counting_eff(Ok);
    assert_eq!(
        eff.repeat_while(Schedule::recurs(2), |_| true).run_standalone(),
        Ok(3)
    );
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_fold_accumulates_every_value() {
    let (eff, _) = counting_eff(Ok);
    let sum = eff.fold(Schedule::recurs(3), 0, |acc, n| acc + n);
    assert_eq!(sum.run_standalone(), Ok(1 + 2 + 3 + 4));
}

#[test]
fn test_fold_while_folds_stopping_value() {
    let (eff, _) = counting_eff(Ok);
    let seen = eff.fold_while(
        Schedule::forever(),
        Vec::new(),
        |mut acc, n| {
            acc.push(n);
            acc
        },
        |n| *n < 3,
    );
    assert_eq!(seen.run_standalone(), Ok(vec![1, 2, 3]));
}

#[test]
fn test_fold_until() {
    let (eff, _) = counting_eff(Ok);
    let sum = eff.fold_until(Schedule::forever(), 0, |acc, n| acc + n, |n| *n == 4);
    assert_eq!(sum.run_standalone(), Ok(10));
}

#[test]
fn test_fold_failure_discards_state() {
    let (eff, _) = counting_eff(|n| if n == 3 { Err(Error::new("gone")) } else { Ok(n) });
    let sum = eff.fold(Schedule::forever(), 0, |acc, n| acc + n);
    assert_eq!(sum.run_standalone(), Err(Error::new("gone")));
}

#[test]
fn test_retry_never_continues_after_cancel() {
    let env = EnvIO::detached();
    let cancel = env.clone();
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    let eff = Eff::<u32>::effect_maybe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        cancel.cancel();
        Err(Error::new("flaky"))
    });

    let result = eff.retry(Schedule::forever()).run(&env);
    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_eff_cancel_interrupts_wait() {
    let (eff, runs) = counting_eff(Ok);
    let repeating = eff.repeat(Schedule::spaced(Duration::from_secs(5)));
    let env = EnvIO::detached();
    let cancel = env.clone();

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        cancel.cancel();
    });

    let start = Instant::now();
    let result = repeating.run(&env);
    canceller.join().unwrap();

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_scheduled_effect_is_memoized() {
    let (eff, runs) = counting_eff(Ok);
    let repeated = eff.repeat(Schedule::recurs(1));
    let env = EnvIO::detached();
    assert_eq!(repeated.run(&env), Ok(2));
    assert_eq!(repeated.run(&env), Ok(2));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_aff_retry_while_with_exponential_backoff() {
    let (aff, runs) = counting_aff(|_| Err(Error::coded(5, "busy")));
    let schedule = Schedule::exponential(Duration::from_millis(10)).with_repeats(2);

    let start = Instant::now();
    let result = aff.retry_while(schedule, |e| e.has_code(5)).run_standalone().await;

    assert_eq!(result.unwrap_err().code(), Some(5));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_aff_repeat_and_fold() {
    let (aff, _) = counting_aff(Ok);
    assert_eq!(aff.repeat(Schedule::recurs(2)).run_standalone().await, Ok(3));

    let (aff, _) = counting_aff(Ok);
    let sum = aff.fold_until(Schedule::forever(), 0, |acc, n| acc + n, |n| *n == 3);
    assert_eq!(sum.run_standalone().await, Ok(6));
}

#[tokio::test]
async fn test_aff_cancel_interrupts_wait() {
    let (aff, runs) = counting_aff(Ok);
    let repeating = aff.repeat(Schedule::spaced(Duration::from_secs(5)));
    let env = EnvIO::new();
    let cancel = env.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let start = Instant::now();
    let result = repeating.run(&env).await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_nan_jitter_factor_means_no_spread() {
    let schedule = Schedule::spaced(Duration::from_millis(10))
        .with_jitter(f64::NAN)
        .with_repeats(3);

    assert!(matches!(schedule.jitter(), super::Jitter::Proportional(f) if *f == 0.0));
    assert!(schedule.validate().is_ok());
    let waits: Vec<_> = schedule.start().collect();
    assert_eq!(waits, vec![Duration::from_millis(10); 3]);
}
