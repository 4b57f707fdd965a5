//! Tests for `PermissionGate`
//!
//! Each test parks an `ask` on a spawned task, finds the request through
//! `permission.requested`, and resolves it with `respond`.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use kodegen_agent_runtime::bus::{Event, EventBus, EventEnvelope, EventKind};
use kodegen_agent_runtime::types::{AscendingIds, PermissionLevel, PermissionRequest, ResponseKind};
use kodegen_agent_runtime::{
    AskInput, PermissionGate, PinValidator, Reply, Response, Result, RuntimeError, SessionId,
};

struct FixedPin(&'static str);

impl PinValidator for FixedPin {
    fn verify(&self, _session_id: &SessionId, pin: &str) -> bool {
        pin == self.0
    }
}

fn gate() -> (Arc<PermissionGate>, EventBus) {
    let bus = EventBus::new();
    let gate = PermissionGate::new(bus.clone(), Arc::new(AscendingIds::new()));
    (Arc::new(gate), bus)
}

fn spawn_ask(
    gate: &Arc<PermissionGate>,
    input: AskInput,
    cancel: CancellationToken,
) -> JoinHandle<Result<Response>> {
    let gate = gate.clone();
    tokio::spawn(async move { gate.ask(input, &cancel).await })
}

async fn next_request(rx: &mut broadcast::Receiver<EventEnvelope>) -> PermissionRequest {
    loop {
        let envelope = rx.recv().await.unwrap();
        if let Event::PermissionRequested { request } = envelope.event {
            return request;
        }
    }
}

fn bash(session: &str, command: &str) -> AskInput {
    AskInput::new(session, "bash", json!({ "command": command }))
}

#[tokio::test]
async fn test_once_approves_single_invocation() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    assert_eq!(request.session_id.as_str(), "ses_a");
    assert_eq!(gate.pending(None).len(), 1);

    tokio_test::assert_ok!(gate.respond(Reply::new("ses_a", request.id.clone(), Response::once())));
    let response = ask.await.unwrap().unwrap();
    assert_eq!(response.kind(), ResponseKind::Once);
    assert!(gate.pending(None).is_empty());

    // Not remembered: the same call asks again
    let _again = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    let second = next_request(&mut rx).await;
    assert_ne!(second.id, request.id);
}

#[tokio::test]
async fn test_always_is_remembered_per_session() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "cargo build"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::always()))
        .unwrap();
    assert_eq!(ask.await.unwrap().unwrap().kind(), ResponseKind::Always);

    let cached = gate
        .ask(bash("ses_a", "cargo build"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cached.kind(), ResponseKind::Always);

    // Different session is not covered
    let _other = spawn_ask(&gate, bash("ses_b", "cargo build"), CancellationToken::new());
    let other = next_request(&mut rx).await;
    assert_eq!(other.session_id.as_str(), "ses_b");
}

#[tokio::test]
async fn test_always_resolves_matching_siblings() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let first = spawn_ask(
        &gate,
        bash("ses_a", "npm test").call_id("call_1"),
        CancellationToken::new(),
    );
    let request = next_request(&mut rx).await;
    let second = spawn_ask(
        &gate,
        bash("ses_a", "npm test").call_id("call_2"),
        CancellationToken::new(),
    );
    next_request(&mut rx).await;
    assert_eq!(gate.pending(Some(&SessionId::new("ses_a"))).len(), 2);

    gate.respond(Reply::new("ses_a", request.id, Response::always()))
        .unwrap();
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert!(gate.pending(None).is_empty());
}

#[tokio::test]
async fn test_reject_carries_message() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "rm -rf target"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new(
        "ses_a",
        request.id,
        Response::reject_with("use cargo clean instead"),
    ))
    .unwrap();

    match ask.await.unwrap() {
        Err(RuntimeError::PermissionRejected { message }) => {
            assert_eq!(message, "use cargo clean instead");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bare_reject_uses_default_message() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "shutdown"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::reject()))
        .unwrap();

    let err = ask.await.unwrap().unwrap_err();
    assert!(matches!(err, RuntimeError::PermissionRejected { .. }));
    assert!(err.to_string().contains("rejected permission"));
}

#[tokio::test]
async fn test_second_respond_is_not_found() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id.clone(), Response::once()))
        .unwrap();
    ask.await.unwrap().unwrap();

    let err = gate
        .respond(Reply::new("ses_a", request.id, Response::reject()))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PermissionNotFound(_)));
}

#[tokio::test]
async fn test_unknown_id_and_wrong_session_are_not_found() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    tokio_test::assert_err!(gate.respond(Reply::new("ses_a", "per_missing", Response::once())));

    let ask = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    let err = gate
        .respond(Reply::new("ses_b", request.id.clone(), Response::once()))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PermissionNotFound(_)));

    // Still pending for its own session
    gate.respond(Reply::new("ses_a", request.id, Response::once()))
        .unwrap();
    assert!(ask.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_replied_event_carries_effective_response() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id.clone(), Response::once()))
        .unwrap();
    ask.await.unwrap().unwrap();

    loop {
        let envelope = rx.recv().await.unwrap();
        if let Event::PermissionReplied {
            request_id,
            response,
            ..
        } = envelope.event
        {
            assert_eq!(request_id, request.id);
            assert_eq!(response, Response::once());
            break;
        }
    }
}

#[tokio::test]
async fn test_pin_level_requires_valid_pin() {
    let bus = EventBus::new();
    let gate = Arc::new(
        PermissionGate::new(bus.clone(), Arc::new(AscendingIds::new()))
            .with_pin_validator(Arc::new(FixedPin("4321"))),
    );
    let mut rx = bus.watch();

    let pinned = || bash("ses_a", "git push --force").level(PermissionLevel::Pin);

    let ask = spawn_ask(&gate, pinned(), CancellationToken::new());
    let request = next_request(&mut rx).await;
    assert_eq!(request.level, PermissionLevel::Pin);
    gate.respond(Reply::new("ses_a", request.id, Response::once()).with_pin("0000"))
        .unwrap();
    match ask.await.unwrap() {
        Err(RuntimeError::PermissionRejected { message }) => {
            assert_eq!(message, "PIN validation failed");
        }
        other => panic!("expected PIN rejection, got {other:?}"),
    }

    let ask = spawn_ask(&gate, pinned(), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::once()).with_pin("4321"))
        .unwrap();
    assert!(ask.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_pin_level_without_validator_rejects() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(
        &gate,
        bash("ses_a", "deploy").level(PermissionLevel::Pin),
        CancellationToken::new(),
    );
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::always()).with_pin("1234"))
        .unwrap();
    assert!(ask.await.unwrap().is_err());
}

fn pin_gate() -> (Arc<PermissionGate>, EventBus) {
    let bus = EventBus::new();
    let gate = PermissionGate::new(bus.clone(), Arc::new(AscendingIds::new()))
        .with_pin_validator(Arc::new(FixedPin("4321")));
    (Arc::new(gate), bus)
}

#[tokio::test]
async fn test_plain_always_does_not_cover_pin_level() {
    let (gate, bus) = pin_gate();
    let mut rx = bus.watch();

    let ask = spawn_ask(&gate, bash("ses_a", "git push --force"), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::always()))
        .unwrap();
    assert!(ask.await.unwrap().is_ok());

    // Same tool and signature at pin level still has to be answered
    let pinned = spawn_ask(
        &gate,
        bash("ses_a", "git push --force").level(PermissionLevel::Pin),
        CancellationToken::new(),
    );
    let request = next_request(&mut rx).await;
    assert_eq!(request.level, PermissionLevel::Pin);
    gate.respond(Reply::new("ses_a", request.id, Response::always()))
        .unwrap();
    assert!(matches!(
        pinned.await.unwrap(),
        Err(RuntimeError::PermissionRejected { .. })
    ));
}

#[tokio::test]
async fn test_pin_validated_always_covers_both_levels() {
    let (gate, bus) = pin_gate();
    let mut rx = bus.watch();
    let pinned = || bash("ses_a", "git push --force").level(PermissionLevel::Pin);

    let ask = spawn_ask(&gate, pinned(), CancellationToken::new());
    let request = next_request(&mut rx).await;
    gate.respond(Reply::new("ses_a", request.id, Response::always()).with_pin("4321"))
        .unwrap();
    assert!(ask.await.unwrap().is_ok());

    let again = gate.ask(pinned(), &CancellationToken::new()).await.unwrap();
    assert_eq!(again.kind(), ResponseKind::Always);
    let plain = gate
        .ask(bash("ses_a", "git push --force"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(plain.kind(), ResponseKind::Always);
}

#[tokio::test]
async fn test_plain_always_leaves_pin_sibling_pending() {
    let (gate, bus) = pin_gate();
    let mut rx = bus.watch();

    let plain = spawn_ask(
        &gate,
        bash("ses_a", "rm -rf build").call_id("call_1"),
        CancellationToken::new(),
    );
    let plain_request = next_request(&mut rx).await;
    let pinned = spawn_ask(
        &gate,
        bash("ses_a", "rm -rf build")
            .call_id("call_2")
            .level(PermissionLevel::Pin),
        CancellationToken::new(),
    );
    let pinned_request = next_request(&mut rx).await;

    gate.respond(Reply::new("ses_a", plain_request.id, Response::always()))
        .unwrap();
    assert!(plain.await.unwrap().is_ok());

    let still_pending = gate.pending(Some(&SessionId::new("ses_a")));
    assert_eq!(still_pending.len(), 1);
    assert_eq!(still_pending[0].id, pinned_request.id);
    assert!(!pinned.is_finished());

    gate.respond(Reply::new("ses_a", pinned_request.id, Response::once()).with_pin("4321"))
        .unwrap();
    assert!(pinned.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_cancellation_abandons_request() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();
    let cancel = CancellationToken::new();

    let ask = spawn_ask(&gate, bash("ses_a", "sleep 100"), cancel.clone());
    let request = next_request(&mut rx).await;
    cancel.cancel();

    let err = ask.await.unwrap().unwrap_err();
    assert!(err.is_aborted());
    assert!(gate.pending(None).is_empty());
    tokio_test::assert_err!(gate.respond(Reply::new("ses_a", request.id, Response::once())));

    // Already-cancelled tokens fail before anything is published
    let err = gate.ask(bash("ses_a", "ls"), &cancel).await.unwrap_err();
    assert!(err.is_aborted());
}

#[tokio::test]
async fn test_duplicate_call_id_is_refused() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let _first = spawn_ask(
        &gate,
        bash("ses_a", "ls").call_id("call_7"),
        CancellationToken::new(),
    );
    next_request(&mut rx).await;

    let err = gate
        .ask(bash("ses_a", "ls -la").call_id("call_7"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PermissionPending { .. }));
    assert_eq!(gate.pending(None).len(), 1);
}

#[tokio::test]
async fn test_bidi_command_is_refused_before_publishing() {
    let (gate, bus) = gate();
    let requested = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = requested.clone();
    let _sub = bus.subscribe(EventKind::PermissionRequested, move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    });

    let err = gate
        .ask(bash("ses_a", "echo \u{202E}hello"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::SecurityViolation { .. }));
    assert!(err.to_string().contains("U+202E"));
    assert_eq!(requested.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(gate.pending(None).is_empty());
}

#[tokio::test]
async fn test_homoglyph_command_carries_warning() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let _ask = spawn_ask(
        &gate,
        bash("ses_a", "curl https://p\u{0430}ypal.com"),
        CancellationToken::new(),
    );
    let request = next_request(&mut rx).await;
    assert!(request.warning.unwrap().contains("homoglyph"));
}

#[tokio::test]
async fn test_clear_session_and_teardown_reject_pending() {
    let (gate, bus) = gate();
    let mut rx = bus.watch();

    let a = spawn_ask(&gate, bash("ses_a", "ls"), CancellationToken::new());
    next_request(&mut rx).await;
    let b = spawn_ask(&gate, bash("ses_b", "ls"), CancellationToken::new());
    next_request(&mut rx).await;

    assert_eq!(gate.clear_session(&SessionId::new("ses_a")), 1);
    assert!(matches!(
        a.await.unwrap(),
        Err(RuntimeError::PermissionRejected { .. })
    ));
    assert_eq!(gate.pending(None).len(), 1);

    gate.teardown();
    assert!(b.await.unwrap().is_err());
    assert!(gate.pending(None).is_empty());
}
