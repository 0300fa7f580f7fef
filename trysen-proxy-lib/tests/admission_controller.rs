use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use trysen_proxy_lib::admission::{adaptive_limit, AdmissionController, Decision};

const WINDOW: Duration = Duration::from_secs(60);

fn controller(ceiling: u64, base_limit: u64) -> AdmissionController {
    AdmissionController::with_limits(ceiling, base_limit, WINDOW, 8192)
}

#[test]
fn test_client_budget_exhaustion() {
    let admission = controller(240, 8);
    let now = Instant::now();

    for i in 0..8 {
        assert_eq!(
            admission.check_at("10.0.0.1", now),
            Decision::Accept,
            "request {i} should be accepted"
        );
    }
    assert_eq!(admission.check_at("10.0.0.1", now), Decision::RejectRateLimited);
    assert_eq!(admission.check_at("10.0.0.1", now), Decision::RejectRateLimited);

    let snapshot = admission.snapshot();
    assert_eq!(snapshot.count_accepted, 8);
    assert_eq!(snapshot.count_dropped, 2);
    assert_eq!(snapshot.current_limit, 8);
    assert!(!admission.is_busted());
}

#[test]
fn test_clients_have_independent_budgets() {
    let admission = controller(240, 2);
    let now = Instant::now();

    assert!(admission.check_at("10.0.0.1", now).is_accept());
    assert!(admission.check_at("10.0.0.1", now).is_accept());
    assert_eq!(admission.check_at("10.0.0.1", now), Decision::RejectRateLimited);

    assert!(admission.check_at("10.0.0.2", now).is_accept());
    assert_eq!(admission.tracked_clients(), 2);
}

#[test]
fn test_ceiling_rejects_everyone() {
    let admission = controller(240, 8);
    let now = Instant::now();

    // 30 clients x 8 = 240 accepted
    for client in 0..30 {
        let addr = format!("10.0.0.{client}");
        for _ in 0..8 {
            assert_eq!(admission.check_at(&addr, now), Decision::Accept);
        }
    }
    assert!(admission.is_busted());

    // A new client with a full budget is still turned away
    assert_eq!(admission.check_at("10.0.1.1", now), Decision::RejectBusted);

    let snapshot = admission.snapshot();
    assert_eq!(snapshot.count_accepted, 240);
    assert_eq!(snapshot.count_dropped, 1);
    assert!(snapshot.bust_after_ms.is_some());
}

#[test]
fn test_busted_interval_ignores_remaining_budget() {
    let admission = controller(3, 8);
    let now = Instant::now();

    assert!(admission.check_at("10.0.0.1", now).is_accept());
    assert!(admission.check_at("10.0.0.2", now).is_accept());
    assert!(admission.check_at("10.0.0.3", now).is_accept());

    // 10.0.0.1 has seven permits left
    assert_eq!(admission.check_at("10.0.0.1", now), Decision::RejectBusted);
}

#[test]
fn test_adaptive_limit_after_early_bust() {
    let start = Instant::now();
    let admission = controller(4, 8);

    // Bust roughly a quarter into the interval
    let bust = start + Duration::from_secs(15);
    for client in ["a", "b", "c", "d"] {
        assert!(admission.check_at(client, bust).is_accept());
    }
    assert!(admission.is_busted());

    let snapshot = admission.rollover_at(start + WINDOW);
    assert_eq!(snapshot.count_accepted, 4);
    assert_eq!(snapshot.current_limit, 8);
    let bust_after = snapshot.bust_after_ms.unwrap_or_default();
    assert!(bust_after > 14_000 && bust_after <= 15_000, "bust_after_ms = {bust_after}");

    // ceil(8 * 15 / 60) = 2
    assert_eq!(admission.current_limit(), 2);
    assert!(!admission.is_busted());

    let next = start + WINDOW + Duration::from_secs(1);
    assert!(admission.check_at("fresh", next).is_accept());
    assert!(admission.check_at("fresh", next).is_accept());
    assert_eq!(admission.check_at("fresh", next), Decision::RejectRateLimited);
}

#[test]
fn test_limit_returns_to_base_after_quiet_interval() {
    let start = Instant::now();
    let admission = controller(2, 8);

    admission.check_at("a", start + Duration::from_secs(30));
    admission.check_at("b", start + Duration::from_secs(30));
    admission.rollover_at(start + WINDOW);
    assert_eq!(admission.current_limit(), 4);

    let snapshot = admission.rollover_at(start + WINDOW * 2);
    assert_eq!(snapshot.count_accepted, 0);
    assert_eq!(snapshot.bust_after_ms, None);
    assert_eq!(admission.current_limit(), 8);
}

#[test]
fn test_rollover_keeps_client_entries() {
    let start = Instant::now();
    let admission = controller(240, 2);

    admission.check_at("a", start);
    admission.check_at("a", start);
    assert_eq!(admission.check_at("a", start), Decision::RejectRateLimited);

    admission.rollover_at(start + Duration::from_secs(30));
    assert_eq!(
        admission.check_at("a", start + Duration::from_secs(31)),
        Decision::RejectRateLimited
    );
}

#[test]
fn test_accepted_requests_slide_the_window() {
    let start = Instant::now();
    let admission = controller(240, 8);

    // One accepted request every 30s keeps the entry alive past several windows
    for i in 0..8u32 {
        assert!(admission
            .check_at("a", start + Duration::from_secs(30) * i)
            .is_accept());
    }
    let last_accept = start + Duration::from_secs(30) * 7;
    assert_eq!(
        admission.check_at("a", last_accept + Duration::from_secs(59)),
        Decision::RejectRateLimited
    );

    // Rejections do not extend the entry: a full window after the last accept it is gone
    assert!(admission.check_at("a", last_accept + WINDOW).is_accept());
}

#[test]
fn test_expired_entry_uses_current_limit() {
    let start = Instant::now();
    let admission = controller(4, 8);

    let bust = start + Duration::from_secs(15);
    for _ in 0..4 {
        admission.check_at("a", bust);
    }
    admission.rollover_at(start + WINDOW);
    assert_eq!(admission.current_limit(), 2);

    // "a" still has 4 permits until its entry expires at bust + 60s
    let later = bust + WINDOW;
    assert!(admission.check_at("a", later).is_accept());
    assert!(admission.check_at("a", later).is_accept());
    assert_eq!(admission.check_at("a", later), Decision::RejectRateLimited);
}

#[test]
fn test_restart_interval_moves_start_only() {
    let admission = controller(2, 8);
    let created = Instant::now();
    let started = created + Duration::from_secs(45);

    assert!(admission.check_at("10.0.0.1", created).is_accept());
    admission.restart_interval_at(started);
    assert!(admission.check_at("10.0.0.2", started + Duration::from_secs(30)).is_accept());

    let snapshot = admission.rollover_at(started + WINDOW);
    assert_eq!(snapshot.count_accepted, 2);
    assert_eq!(snapshot.elapsed_ms, 60_000);
    assert_eq!(snapshot.bust_after_ms, Some(30_000));
    assert_eq!(admission.current_limit(), 4);
}

#[test]
fn test_cache_capacity_bounds_tracked_clients() {
    let admission = AdmissionController::with_limits(10_000, 8, WINDOW, 16);
    let now = Instant::now();

    for i in 0..100 {
        assert!(admission.check_at(&format!("10.0.0.{i}"), now).is_accept());
        assert!(admission.cache_weight() <= 16);
    }
    assert_eq!(admission.tracked_clients(), 16);
}

#[test]
fn test_concurrent_checks_never_overshoot_ceiling() {
    let admission = Arc::new(controller(240, 8));

    let accepted: u64 = std::thread::scope(|s| {
        let workers: Vec<_> = (0..16)
            .map(|t| {
                let admission = admission.clone();
                s.spawn(move || {
                    let mut accepted = 0u64;
                    for i in 0..100 {
                        if admission.check(&format!("10.{t}.0.{i}")).is_accept() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap_or_default())
            .sum()
    });

    assert_eq!(accepted, 240);
    let snapshot = admission.snapshot();
    assert_eq!(snapshot.count_accepted, 240);
    assert_eq!(snapshot.count_dropped, 1600 - 240);
}

#[test]
fn test_adaptive_limit_values() {
    let period = Duration::from_secs(60);
    assert_eq!(adaptive_limit(8, None, period), 8);
    assert_eq!(adaptive_limit(8, Some(Duration::from_secs(30)), period), 4);
    assert_eq!(adaptive_limit(8, Some(Duration::from_secs(59)), period), 8);
    assert_eq!(adaptive_limit(240, Some(Duration::from_secs(1)), period), 4);
}
