//! Integration tests for admission control through the governor façade.

use market_governor::{
    AdmissionDecision, GovernError, Governor, GovernorBuilder, LimitScope, MockClock,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn governor(builder: GovernorBuilder) -> (Arc<Governor<String>>, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(Instant::now()));
    let governor = builder.with_clock(clock.clone()).build().unwrap();
    (Arc::new(governor), clock)
}

#[tokio::test]
async fn limit_plus_one_within_a_minute_is_rejected() {
    let (governor, _clock) = governor(GovernorBuilder::default().with_requests_per_minute(5));

    for _ in 0..5 {
        governor
            .serve("client", "technology", || async {
                Ok("report".to_string())
            })
            .await
            .unwrap();
    }

    let err = governor
        .serve("client", "technology", || async {
            panic!("rejected request must not compute")
        })
        .await
        .unwrap_err();
    match err {
        GovernError::RateLimited { scope, .. } => assert_eq!(scope, LimitScope::PerMinute),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_two_per_minute_with_retry_hint() {
    let (governor, clock) = governor(GovernorBuilder::default().with_requests_per_minute(2));

    for _ in 0..2 {
        assert!(governor.allow_request("A").is_admitted());
    }

    clock.advance(Duration::from_secs(10));
    match governor.allow_request("A") {
        AdmissionDecision::Rejected { scope, retry_after } => {
            assert_eq!(scope, LimitScope::PerMinute);
            assert_eq!(retry_after, Duration::from_secs(50));
        }
        AdmissionDecision::Admitted => panic!("third request at t=10s must be rejected"),
    }

    // At t=61s the original pair has left the minute window.
    clock.advance(Duration::from_secs(51));
    assert!(governor.allow_request("A").is_admitted());
}

#[tokio::test]
async fn hourly_window_rejects_and_recovers() {
    let (governor, clock) = governor(
        GovernorBuilder::default()
            .with_requests_per_minute(10)
            .with_requests_per_hour(20),
    );

    for _ in 0..4 {
        for _ in 0..5 {
            assert!(governor.allow_request("heavy").is_admitted());
        }
        clock.advance(Duration::from_secs(60));
    }

    match governor.allow_request("heavy") {
        AdmissionDecision::Rejected { scope, .. } => assert_eq!(scope, LimitScope::PerHour),
        AdmissionDecision::Admitted => panic!("21st request within the hour must be rejected"),
    }

    // Requests older than an hour never count toward either window.
    clock.advance(Duration::from_secs(3600));
    assert!(governor.allow_request("heavy").is_admitted());
}

#[tokio::test]
async fn no_client_starves_another() {
    let (governor, _clock) = governor(GovernorBuilder::default().with_requests_per_minute(1));

    assert!(governor.allow_request("greedy").is_admitted());
    assert!(!governor.allow_request("greedy").is_admitted());

    // The greedy client exhausting its window leaves others untouched.
    assert!(governor.allow_request("polite").is_admitted());
}

#[tokio::test]
async fn rejected_requests_do_not_extend_the_window() {
    let (governor, clock) = governor(GovernorBuilder::default().with_requests_per_minute(1));

    assert!(governor.allow_request("client").is_admitted());
    for _ in 0..20 {
        assert!(!governor.allow_request("client").is_admitted());
    }

    // Only the single admitted request occupies the window; one minute
    // after it the client is admitted again, hammering notwithstanding.
    clock.advance(Duration::from_secs(60));
    assert!(governor.allow_request("client").is_admitted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_admit_exactly_the_limit() {
    let (governor, _clock) = governor(GovernorBuilder::default().with_requests_per_minute(5));

    let mut handles = vec![];
    for _ in 0..20 {
        let governor = Arc::clone(&governor);
        handles.push(tokio::spawn(async move {
            governor.allow_request("shared").is_admitted()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5, "exactly the per-minute limit must be admitted");
}
