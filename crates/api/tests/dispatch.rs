//! Tests for the dispatch loop, driven directly through `CampaignDispatcher`
//! with a scripted relay.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use common::{campaign, wait_for, FakeRelay};
use mailcast_api::engine::CampaignDispatcher;
use mailcast_core::campaign::{CampaignSnapshot, CampaignStatus, LogKind, MSG_MISSING_EMAIL};
use mailcast_delivery::RelayError;
use tokio::time::Instant;

fn dispatcher(relay: &Arc<FakeRelay>) -> CampaignDispatcher {
    CampaignDispatcher::new(Arc::clone(relay) as Arc<dyn mailcast_delivery::Relay>)
}

fn decode(message: Message) -> CampaignSnapshot {
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a snapshot frame, got {other:?}"),
    }
}

/// Recipient-level log entries, oldest first.
fn recipient_outcomes(snapshot: &CampaignSnapshot) -> Vec<(LogKind, Option<String>)> {
    snapshot
        .logs
        .iter()
        .rev()
        .map(|e| (e.kind, e.email.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Test: every recipient is sent in order and the campaign completes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_in_input_order_and_completes() {
    let relay = Arc::new(FakeRelay::new());
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Completed);
    assert_eq!(snapshot.sent, 3);
    assert_eq!(snapshot.failed, 0);
    assert!(snapshot.started_at.is_some());
    assert!(snapshot.completed_at.is_some());
    assert_eq!(relay.attempted(), vec!["a@x.com", "b@x.com", "c@x.com"]);
    assert_eq!(
        recipient_outcomes(&snapshot),
        vec![
            (LogKind::Success, Some("a@x.com".into())),
            (LogKind::Success, Some("b@x.com".into())),
            (LogKind::Success, Some("c@x.com".into())),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: each recipient gets its own personalized body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn personalizes_each_message() {
    let relay = Arc::new(FakeRelay::new());
    let job = campaign(&["a@x.com", "b@x.com"], 0);

    dispatcher(&relay).spawn(job).unwrap().await.unwrap();

    let bodies: Vec<_> = relay.emails().into_iter().map(|e| e.html).collect();
    assert_eq!(bodies, vec!["<p>Hi Person 0</p>", "<p>Hi Person 1</p>"]);
}

// ---------------------------------------------------------------------------
// Test: a rejected recipient does not stop the campaign
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_recipient_is_isolated() {
    let relay = Arc::new(
        FakeRelay::new().failing_for("b@x.com", RelayError::Rejected("550 mailbox unavailable".into())),
    );
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Completed);
    assert_eq!(snapshot.sent, 2);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(relay.attempted().len(), 3);

    let failure = snapshot
        .logs
        .iter()
        .find(|e| e.kind == LogKind::Error)
        .unwrap();
    assert_eq!(failure.email.as_deref(), Some("b@x.com"));
    assert_eq!(failure.message.as_deref(), Some("550 mailbox unavailable"));
}

// ---------------------------------------------------------------------------
// Test: rows without an address fail without a send attempt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_address_is_a_recipient_failure() {
    let relay = Arc::new(FakeRelay::new());
    let job = campaign(&["a@x.com", "", "b@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Completed);
    assert_eq!((snapshot.sent, snapshot.failed), (2, 1));
    assert_eq!(relay.attempted(), vec!["a@x.com", "b@x.com"]);

    let skipped = &snapshot.logs[1];
    assert_eq!(skipped.kind, LogKind::Error);
    assert_eq!(skipped.email, None);
    assert_eq!(skipped.message.as_deref(), Some(MSG_MISSING_EMAIL));
}

// ---------------------------------------------------------------------------
// Test: the delay follows attempted sends only, never the last recipient
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn delay_applies_after_attempted_sends_only() {
    let relay = Arc::new(FakeRelay::new());
    let job = campaign(&["a@x.com", "", "", "b@x.com"], 1000);

    let started = Instant::now();
    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert_eq!(job.snapshot().await.status, CampaignStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn delay_separates_consecutive_sends() {
    let relay = Arc::new(FakeRelay::new());
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com"], 250);

    let started = Instant::now();
    dispatcher(&relay).spawn(job).unwrap().await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(500));
}

// ---------------------------------------------------------------------------
// Test: verification failure fails the campaign before any send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verification_failure_processes_no_recipient() {
    let relay = Arc::new(
        FakeRelay::new().failing_verify(RelayError::Unavailable("connection refused".into())),
    );
    let job = campaign(&["a@x.com", "b@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Failed);
    assert_eq!(snapshot.sent, 0);
    assert_eq!(snapshot.failed, 2);
    assert!(snapshot.started_at.is_none());
    assert!(snapshot.completed_at.is_some());
    assert_eq!(snapshot.logs.len(), 1);
    assert_eq!(snapshot.logs[0].email, None);
    assert_eq!(
        snapshot.logs[0].message.as_deref(),
        Some("SMTP verification failed: connection refused")
    );
    assert!(relay.attempted().is_empty());
}

// ---------------------------------------------------------------------------
// Test: an unavailable relay mid-run aborts the remaining recipients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unavailable_relay_aborts_campaign() {
    let relay = Arc::new(
        FakeRelay::new().failing_for("b@x.com", RelayError::Unavailable("connection reset".into())),
    );
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com", "d@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Failed);
    assert_eq!(snapshot.sent, 1);
    assert_eq!(snapshot.failed, 3);
    assert_eq!(snapshot.processed(), snapshot.total);
    assert_eq!(relay.attempted(), vec!["a@x.com", "b@x.com"]);
    assert_eq!(snapshot.logs[0].email, None);
    assert_eq!(
        snapshot.logs[0].message.as_deref(),
        Some("Relay became unavailable: connection reset")
    );
}

// ---------------------------------------------------------------------------
// Test: a panicking dispatch still ends in a terminal state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panic_during_dispatch_fails_campaign() {
    let relay = Arc::new(FakeRelay::new().panicking_for("b@x.com"));
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com"], 0);

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let snapshot = job.snapshot().await;
    assert_eq!(snapshot.status, CampaignStatus::Failed);
    assert_eq!((snapshot.sent, snapshot.failed), (1, 2));
    let message = snapshot.logs[0].message.as_deref().unwrap();
    assert!(message.starts_with("Dispatch aborted"), "{message}");
}

// ---------------------------------------------------------------------------
// Test: a campaign is dispatched at most once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_spawn_is_refused() {
    let relay = Arc::new(FakeRelay::new());
    let dispatcher = dispatcher(&relay);
    let job = campaign(&["a@x.com"], 0);

    let first = dispatcher.spawn(Arc::clone(&job));
    let second = dispatcher.spawn(Arc::clone(&job));

    assert!(second.is_none());
    first.unwrap().await.unwrap();
    assert_eq!(relay.attempted(), vec!["a@x.com"]);
}

// ---------------------------------------------------------------------------
// Test: a late observer sees current progress, then the rest in order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_observer_catches_up_then_follows() {
    let (relay, gate) = FakeRelay::new().gated();
    let relay = Arc::new(relay);
    let job = campaign(&["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com"], 0);

    let handle = dispatcher(&relay).spawn(Arc::clone(&job)).unwrap();

    gate.add_permits(3);
    wait_for(&job, |s| s.processed() == 3).await;

    let mut rx = job.attach("late".into()).await.unwrap();
    let first = decode(rx.recv().await.unwrap());
    assert_eq!(first.processed(), 3);
    assert_eq!(first.status, CampaignStatus::Running);

    gate.add_permits(2);
    handle.await.unwrap();

    let fourth = decode(rx.recv().await.unwrap());
    let fifth = decode(rx.recv().await.unwrap());
    let done = decode(rx.recv().await.unwrap());
    assert_eq!(fourth.processed(), 4);
    assert_eq!(fourth.logs[0].email.as_deref(), Some("d@x.com"));
    assert_eq!(fifth.processed(), 5);
    assert_eq!(fifth.logs[0].email.as_deref(), Some("e@x.com"));
    assert_eq!(done.status, CampaignStatus::Completed);
}

// ---------------------------------------------------------------------------
// Test: observed counters never decrease and never exceed the total
// ---------------------------------------------------------------------------

#[tokio::test]
async fn observed_counters_are_monotonic() {
    let relay = Arc::new(
        FakeRelay::new().failing_for("b@x.com", RelayError::Rejected("bad mailbox".into())),
    );
    let job = campaign(&["a@x.com", "b@x.com", "", "c@x.com"], 0);
    let mut rx = job.attach("watcher".into()).await.unwrap();

    dispatcher(&relay).spawn(Arc::clone(&job)).unwrap().await.unwrap();

    let mut frames = Vec::new();
    while let Ok(message) = rx.try_recv() {
        frames.push(decode(message));
    }

    // queued, running, four outcomes, completed
    assert_eq!(frames.len(), 7);
    for pair in frames.windows(2) {
        assert!(pair[1].sent >= pair[0].sent);
        assert!(pair[1].failed >= pair[0].failed);
    }
    for frame in &frames {
        assert!(frame.processed() <= frame.total);
    }
    let last = frames.last().unwrap();
    assert_eq!(last.status, CampaignStatus::Completed);
    assert_eq!(last.processed(), last.total);
}
