//! Tests for the session cancellation registry

use kodegen_agent_runtime::{SessionId, SessionLock};

#[test]
fn test_acquire_abort_release() {
    let lock = SessionLock::new();
    let session = SessionId::new("ses_a");

    let run = lock.acquire(&session).unwrap();
    assert!(lock.is_registered(&session));
    assert!(!lock.is_aborted(&session));

    assert!(lock.abort(&session));
    assert!(run.is_aborted());
    assert!(run.token().is_cancelled());
    assert!(lock.is_aborted(&session));

    drop(run);
    assert!(!lock.is_registered(&session));
    assert!(lock.is_empty());
}

#[test]
fn test_abort_is_idempotent_and_tolerates_unknown() {
    let lock = SessionLock::new();
    let session = SessionId::new("ses_a");
    let _run = lock.acquire(&session).unwrap();

    assert!(lock.abort(&session));
    assert!(!lock.abort(&session));
    assert!(!lock.abort(&SessionId::new("ses_missing")));
}

#[test]
fn test_second_live_acquire_is_refused() {
    let lock = SessionLock::new();
    let session = SessionId::new("ses_a");
    let _run = lock.acquire(&session).unwrap();
    assert!(lock.acquire(&session).is_err());
}

#[test]
fn test_aborted_registration_can_be_replaced() {
    let lock = SessionLock::new();
    let session = SessionId::new("ses_a");

    let old = lock.acquire(&session).unwrap();
    lock.abort(&session);
    let new = lock.acquire(&session).unwrap();
    assert!(!new.is_aborted());

    // The stale guard must not remove the newer registration
    drop(old);
    assert!(lock.is_registered(&session));
    assert!(!lock.is_aborted(&session));
    drop(new);
    assert!(!lock.is_registered(&session));
}

#[test]
fn test_abort_all_counts_live_sessions() {
    let lock = SessionLock::new();
    let a = lock.acquire(&SessionId::new("ses_a")).unwrap();
    let b = lock.acquire(&SessionId::new("ses_b")).unwrap();
    let _c = lock.acquire(&SessionId::new("ses_c")).unwrap();
    lock.abort(&SessionId::new("ses_c"));

    assert_eq!(lock.abort_all(), 2);
    assert!(a.is_aborted());
    assert!(b.is_aborted());
    assert_eq!(lock.len(), 3);
}

#[tokio::test]
async fn test_token_wakes_waiters() {
    let lock = SessionLock::new();
    let session = SessionId::new("ses_a");
    let run = lock.acquire(&session).unwrap();
    let token = lock.token(&session).unwrap();

    let waiter = tokio::spawn(async move { token.cancelled().await });
    lock.abort(&session);
    tokio_test::assert_ok!(waiter.await);
    assert!(run.is_aborted());
}
