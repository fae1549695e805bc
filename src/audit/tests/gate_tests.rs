//! Unit tests for the shared dispatch gate.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::services::DispatchGate;
use rstest::rstest;
use tokio::time::Instant;

#[rstest]
#[tokio::test(start_paused = true)]
async fn first_dispatch_is_immediate() {
    let gate = DispatchGate::new(Duration::from_secs(5));
    let began = Instant::now();
    gate.acquire().await;
    assert_eq!(began.elapsed(), Duration::ZERO);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn gap_is_shared_across_callers() {
    let gate = Arc::new(DispatchGate::new(Duration::from_millis(500)));
    let began = Instant::now();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&gate);
            tokio::spawn(async move {
                shared.acquire().await;
                Instant::now()
            })
        })
        .collect();
    let mut dispatched = Vec::new();
    for handle in handles {
        dispatched.push(handle.await.expect("dispatch task should finish"));
    }
    dispatched.sort();

    assert!(began.elapsed() >= Duration::from_millis(1_500));
    for pair in dispatched.windows(2) {
        if let [earlier, later] = pair {
            assert!(later.duration_since(*earlier) >= Duration::from_millis(500));
        }
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn elapsed_gap_does_not_wait_again() {
    let gate = DispatchGate::new(Duration::from_millis(200));
    gate.acquire().await;
    tokio::time::advance(Duration::from_millis(300)).await;

    let before = Instant::now();
    gate.acquire().await;
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn zero_gap_never_sleeps() {
    let gate = DispatchGate::new(Duration::ZERO);
    let began = Instant::now();
    for _ in 0..10 {
        gate.acquire().await;
    }
    assert_eq!(began.elapsed(), Duration::ZERO);
}
