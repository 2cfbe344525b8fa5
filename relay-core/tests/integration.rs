//! Integration Tests for the Relay Primitives
//!
//! These tests verify that the broadcast channels and the shared state
//! cells work together correctly.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use relay_core::observe::{MemoryObserver, NotifyOutcome, Observer, TimedNotifier};
use relay_core::state::{GlobalState, HistoryStore, SenderState};

/// Test exactly-once delivery across an interleaving of subscribe,
/// unsubscribe, and notify.
#[test]
fn interleaved_subscriptions_see_exactly_the_values_published_while_registered() {
    let channel = Observer::new();

    let seen_a = Arc::new(Mutex::new(Vec::new()));
    let seen_a_clone = seen_a.clone();
    let sub_a = channel.subscribe(move |value: i32| seen_a_clone.lock().push(value));

    channel.notify(1);

    let seen_b = Arc::new(Mutex::new(Vec::new()));
    let seen_b_clone = seen_b.clone();
    let sub_b = channel.subscribe(move |value: i32| seen_b_clone.lock().push(value));

    channel.notify(2);

    sub_a.unsubscribe();
    channel.notify(3);

    drop(sub_b);
    channel.notify(4);

    assert_eq!(*seen_a.lock(), vec![1, 2]);
    assert_eq!(*seen_b.lock(), vec![2, 3]);
}

/// Test that a panicking subscriber is invisible to the producer and to
/// the other subscribers.
#[test]
fn broadcast_survives_a_panicking_subscriber_in_the_middle() {
    let channel = Observer::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let order_first = order.clone();
    let _first = channel.subscribe(move |_: i32| order_first.lock().push("first"));

    let _failing = channel.subscribe(|_: i32| panic!("broken consumer"));

    let order_last = order.clone();
    let _last = channel.subscribe(move |_: i32| order_last.lock().push("last"));

    channel.notify(0);
    channel.notify(0);

    assert_eq!(*order.lock(), vec!["first", "last", "first", "last"]);
}

/// Test the replay-then-follow contract of the memory channel.
#[test]
fn memory_channel_brings_a_late_consumer_up_to_date() {
    let channel = MemoryObserver::new();
    channel.notify("ready");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = channel.subscribe(move |value: &str| seen_clone.lock().push(value));

    channel.notify("updated");

    assert_eq!(*seen.lock(), vec!["ready", "updated"]);
}

/// Test the counter scenario: three reducer updates observed by two mounts.
#[test]
fn counter_converges_across_independent_mounts() {
    let counter = GlobalState::new(0);

    let handle_a = counter.mount();
    let handle_b = counter.mount();

    assert_eq!(handle_a.value(), 0);
    assert_eq!(handle_b.value(), 0);

    counter.update(|n| n + 1);
    counter.update(|n| n + 1);
    counter.update(|n| n + 1);

    assert_eq!(counter.get(), 3);
    assert_eq!(handle_a.value(), 3);
    assert_eq!(handle_b.value(), 3);
}

/// Test that the cell is usable imperatively with no mounts at all.
#[test]
fn imperative_access_needs_no_mounted_consumer() {
    let state = GlobalState::new_with(|| vec![1, 2, 3]);

    state.update(|items| {
        let mut items = items.clone();
        items.push(4);
        items
    });

    assert_eq!(state.get(), vec![1, 2, 3, 4]);
    assert_eq!(state.subscriber_count(), 0);
}

/// Test sender-aware suppression end to end: the originator's listener
/// stays quiet while every other consumer reacts.
#[test]
fn sender_aware_cell_suppresses_only_the_originator() {
    let state = SenderState::new(String::from("initial"));

    let reactions_a = Arc::new(AtomicI32::new(0));
    let reactions_a_clone = reactions_a.clone();
    let handle_a = state.mount_with(move |_| {
        reactions_a_clone.fetch_add(1, Ordering::SeqCst);
    });

    let reactions_b = Arc::new(AtomicI32::new(0));
    let reactions_b_clone = reactions_b.clone();
    let handle_b = state.mount_with(move |_| {
        reactions_b_clone.fetch_add(1, Ordering::SeqCst);
    });

    handle_a.set(String::from("from a"));
    assert_eq!(reactions_a.load(Ordering::SeqCst), 0);
    assert_eq!(reactions_b.load(Ordering::SeqCst), 1);

    handle_b.set(String::from("from b"));
    assert_eq!(reactions_a.load(Ordering::SeqCst), 1);
    assert_eq!(reactions_b.load(Ordering::SeqCst), 1);

    state.set(String::from("external"));
    assert_eq!(reactions_a.load(Ordering::SeqCst), 2);
    assert_eq!(reactions_b.load(Ordering::SeqCst), 2);

    assert_eq!(handle_a.value(), "external");
    assert_eq!(handle_b.value(), "external");
}

/// Test a browser-like navigation session against the shared history.
#[test]
fn history_session_with_navigation_and_branching() {
    let store = HistoryStore::new(|a: &String, b: &String| a == b);
    let history = store.mount();
    let mirror = store.mount();

    history.push("home".to_string());
    history.push("settings".to_string());
    history.push("profile".to_string());

    // Go back to settings and confirm the navigation.
    history.go_to(&"settings".to_string()).unwrap();
    history.push("settings".to_string());

    assert_eq!(mirror.current(), Some("settings".to_string()));
    assert_eq!(mirror.previous(), Some("home".to_string()));
    assert_eq!(mirror.next(), Some("profile".to_string()));

    // Branching off discards the forward entries.
    history.push("about".to_string());
    assert_eq!(
        mirror.history(),
        vec![
            "home".to_string(),
            "settings".to_string(),
            "about".to_string()
        ]
    );

    // Navigating to a discarded entry is a reported error.
    assert!(history.go_to(&"profile".to_string()).is_err());
}

/// Test the acknowledged broadcast settling on each of its three branches.
#[tokio::test(start_paused = true)]
async fn timed_notifier_settles_on_the_earliest_branch() {
    let notifier = TimedNotifier::new(Duration::from_millis(50)).unwrap();

    // Branch 1: everyone acknowledges quickly.
    let fast = notifier.subscribe(|_: i32, ack| ack.resolve());
    assert_eq!(notifier.notify(1).await, NotifyOutcome::Acknowledged);
    fast.unsubscribe();

    // Branch 2: a subscriber rejects.
    let rejecting = notifier.subscribe(|_: i32, ack| ack.reject("veto"));
    assert_eq!(
        notifier.notify(2).await,
        NotifyOutcome::Rejected("veto".to_string())
    );
    rejecting.unsubscribe();

    // Branch 3: a subscriber parks its acknowledger and never responds.
    let parked = Arc::new(Mutex::new(Vec::new()));
    let parked_clone = parked.clone();
    let _silent = notifier.subscribe(move |_: i32, ack| {
        parked_clone.lock().push(ack);
    });
    assert_eq!(notifier.notify(3).await, NotifyOutcome::TimedOut);
}

/// Test that a state cell can feed a plain channel collaborator, the
/// "imperative trigger" pattern from the public contract.
#[test]
fn cell_commits_drive_an_external_collaborator() {
    let state = GlobalState::new(0);
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_clone = log.clone();
    let _sub = state.subscribe(move |value| log_clone.lock().push(value));

    let handle = state.mount();
    handle.set(1);
    state.set(2);
    handle.update(|n| n * 10);

    assert_eq!(*log.lock(), vec![1, 2, 20]);
    assert_eq!(handle.value(), 20);
}
