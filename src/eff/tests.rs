use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::env::{EnvIO, HasCancel};
use crate::error::{codes, Error};
use crate::testing::TestEnv;

use super::iterate::{fold_while, iter};
use super::{Eff, EffCatch};

fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
    let runs = Arc::new(AtomicU32::new(0));
    (runs.clone(), runs)
}

#[test]
fn test_construction_does_not_run() {
    let (runs, seen) = counter();
    let _eff = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_run_memoizes_until_clear() {
    let (runs, seen) = counter();
    let mut eff = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst) + 1);
    let env = EnvIO::detached();

    assert_eq!(eff.run(&env), Ok(1));
    assert_eq!(eff.run(&env), Ok(1));
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    eff.clear();
    assert_eq!(eff.run(&env), Ok(2));
    assert_eq!(eff.rerun(&env), Ok(3));
}

#[test]
fn test_clone_has_its_own_memo() {
    let (runs, _) = counter();
    let eff = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst) + 1);
    let env = EnvIO::detached();

    assert_eq!(eff.run(&env), Ok(1));
    let copy = eff.clone();
    assert_eq!(copy.run(&env), Ok(2));
    assert_eq!(eff.run(&env), Ok(1));
}

#[test]
fn test_bind_short_circuits() {
    let (runs, seen) = counter();
    let chained = Eff::<i32>::fail(Error::new("first")).bind(move |n| {
        runs.fetch_add(1, Ordering::SeqCst);
        Eff::success(n + 1)
    });

    assert_eq!(chained.run_standalone(), Err(Error::new("first")));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_composition_reruns_sources() {
    let (runs, seen) = counter();
    let source = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst));
    let env = EnvIO::detached();

    source.run(&env).unwrap();
    let mapped = source.map(|n| n * 10);
    mapped.run(&env).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_bimap_and_map_fail() {
    let ok = Eff::<i32>::success(2).bimap(|n| n.to_string(), |e| e);
    assert_eq!(ok.run_standalone(), Ok("2".to_string()));

    let failed = Eff::<i32>::fail(Error::new("low")).map_fail(|e| e.with_code(9));
    assert_eq!(failed.run_standalone().unwrap_err().code(), Some(9));
}

#[test]
fn test_match_with_and_if_fail() {
    let matched = Eff::<i32>::fail(Error::new("x")).match_with(|n| n * 2, |_| -1);
    assert_eq!(matched.run_standalone(), Ok(-1));

    let recovered = Eff::<i32>::fail(Error::new("x")).if_fail(|_| 7);
    assert_eq!(recovered.run_standalone(), Ok(7));

    let recovered = Eff::<i32>::fail(Error::new("x")).if_fail_eff(|e| Eff::fail(e.with_code(3)));
    assert_eq!(recovered.run_standalone().unwrap_err().code(), Some(3));
}

#[test]
fn test_match_eff_runs_selected_branch() {
    let on_ok = Eff::<i32>::success(4).match_eff(|n| Eff::success(n + 1), |_| Eff::success(0));
    assert_eq!(on_ok.run_standalone(), Ok(5));
}

#[test]
fn test_catch_only_matching_errors() {
    let handler = EffCatch::code(404, |_| Eff::success("fallback"));

    let missing = Eff::<&str>::fail(Error::coded(404, "missing")).catch(handler.clone());
    assert_eq!(missing.run_standalone(), Ok("fallback"));

    let broken = Eff::<&str>::fail(Error::coded(500, "broken")).catch(handler);
    assert_eq!(broken.run_standalone().unwrap_err().code(), Some(500));
}

#[test]
fn test_catch_first_matching_handler_wins() {
    let handler = EffCatch::when(|e: &Error| e.has_code(1), |_| Eff::success(1))
        .or(EffCatch::all(|_| Eff::success(2)));

    let coded = Eff::<i32>::fail(Error::coded(1, "one")).catch(handler.clone());
    assert_eq!(coded.run_standalone(), Ok(1));

    let other = Eff::<i32>::fail(Error::new("other")).catch(handler);
    assert_eq!(other.run_standalone(), Ok(2));
}

#[test]
fn test_catch_exception_by_type() {
    let read = Eff::<String>::attempt(|| std::fs::read_to_string("/no/such/path/at/all"))
        .catch(EffCatch::exception::<std::io::Error, _>(|_| Eff::success(String::new())));
    assert_eq!(read.run_standalone(), Ok(String::new()));
}

#[test]
fn test_filter() {
    let kept = Eff::<i32>::success(4).filter(|n| n % 2 == 0);
    assert_eq!(kept.run_standalone(), Ok(4));

    let rejected = Eff::<i32>::success(3).filter(|n| n % 2 == 0);
    let err = rejected.run_standalone().unwrap_err();
    assert!(err.is_filtered());
    assert_eq!(err.code(), Some(codes::FILTERED));
}

#[test]
fn test_or_else_first_success_wins() {
    let (runs, seen) = counter();
    let second = Eff::<i32>::effect(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        2
    });

    assert_eq!(Eff::success(1).or_else(second.clone()).run_standalone(), Ok(1));
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    let both = Eff::<i32>::fail(Error::new("a")).or_else(Eff::fail(Error::new("b")));
    assert_eq!(both.run_standalone(), Err(Error::new("b")));
}

#[test]
fn test_tap_keeps_value_and_propagates_failure() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let tapped = Eff::<i32>::success(5).tap(move |n| {
        log.lock().unwrap().push(*n);
        Eff::success(())
    });
    assert_eq!(tapped.run_standalone(), Ok(5));
    assert_eq!(*seen.lock().unwrap(), vec![5]);

    let failing = Eff::<i32>::success(5).tap(|_| Eff::<()>::fail(Error::new("audit")));
    assert_eq!(failing.run_standalone(), Err(Error::new("audit")));
}

#[test]
fn test_iter_combinator_discards_value() {
    let (runs, seen) = counter();
    let walked = Eff::<u32>::success(3).iter(move |n| {
        runs.fetch_add(n, Ordering::SeqCst);
        Eff::success("ignored")
    });
    assert_eq!(walked.run_standalone(), Ok(()));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_iter_stops_at_first_failure() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let log = visited.clone();
    let walked = iter(Eff::<Vec<i32>>::success(vec![1, 2, 3]), move |n| {
        log.lock().unwrap().push(n);
        if n == 2 {
            Eff::<()>::fail(Error::new("two"))
        } else {
            Eff::success(())
        }
    });

    assert_eq!(walked.run_standalone(), Err(Error::new("two")));
    assert_eq!(*visited.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_fold_while_false_predicate_never_runs_source() {
    let (runs, seen) = counter();
    let source = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst));
    let folded = fold_while(source, 10u32, |s, n| Eff::success(s + n), |_| Eff::success(false));

    assert_eq!(folded.run_standalone(), Ok(10));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fold_while_propagates_failure() {
    let source = Eff::<u32>::fail(Error::new("dry"));
    let folded = fold_while(source, 0u32, |s, n| Eff::success(s + n), |_| Eff::success(true));
    assert_eq!(folded.run_standalone(), Err(Error::new("dry")));
}

#[test]
fn test_cancelled_env_skips_evaluation() {
    let (runs, seen) = counter();
    let eff = Eff::<u32>::effect(move || runs.fetch_add(1, Ordering::SeqCst));
    let env = EnvIO::detached();
    env.cancel();

    assert!(eff.run(&env).unwrap_err().is_cancelled());
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_local_cancel_scopes_to_child() {
    let env = EnvIO::detached();
    let probe = Eff::<bool>::effect_env(|env: &EnvIO| {
        let scope = env.clone();
        scope.cancel();
        scope.is_cancelled()
    })
    .local_cancel();

    assert_eq!(probe.run(&env), Ok(true));
    assert!(!env.is_cancelled());
}

#[test]
fn test_panic_becomes_failure() {
    let eff = Eff::<i32>::effect(|| panic!("kaboom"));
    let err = eff.run_standalone().unwrap_err();
    assert!(err.is_exceptional());
    assert_eq!(err.code(), Some(codes::PANICKED));
    assert!(err.message().contains("kaboom"));
}

#[test]
fn test_lazy_builds_on_each_run() {
    let (runs, seen) = counter();
    let mut eff = Eff::<u32>::lazy(move || Eff::success(runs.fetch_add(1, Ordering::SeqCst)));
    let env = EnvIO::detached();
    assert_eq!(eff.run(&env), Ok(0));
    assert_eq!(eff.rerun(&env), Ok(1));
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_with_env_reads_payload_env() {
    let widened = Eff::<i32>::success(1).with_env::<TestEnv<u32>>();
    let reads = Eff::<u32, TestEnv<u32>>::effect_env(|env| *env.payload());
    let sum = widened.bind(move |n| reads.clone().map(move |p| n as u32 + p));

    let env = TestEnv::new(41);
    assert_eq!(sum.run(&env), Ok(42));
    assert!(!env.is_cancelled());
}
