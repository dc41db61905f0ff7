//! End-to-end session tests over the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use super::*;

use crate::device::{DeviceDescriptor, Vendor};
use crate::error::Error;
use crate::protocol::{Key, RemoteCommand};
use crate::remote::SessionOptions;
use crate::transport::{Frame, GOING_AWAY, MemoryConnector, MemoryPeer};

// ============================================================================
// Helpers
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

/// Routes `tracing` output to the test harness; `RUST_LOG` picks the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn lg_session(connector: &MemoryConnector, options: SessionOptions) -> Session {
    init_tracing();
    let tv = DeviceDescriptor::new(Vendor::Lg, "Bedroom", "10.0.0.2");
    Session::new(tv, options.with_connector(Arc::new(connector.clone()))).expect("session")
}

fn samsung_session(connector: &MemoryConnector) -> Session {
    init_tracing();
    let tv = DeviceDescriptor::new(Vendor::Samsung, "Living Room", "192.168.1.20");
    Session::new(
        tv,
        SessionOptions::new().with_connector(Arc::new(connector.clone())),
    )
    .expect("session")
}

/// Receives events until one matches.
async fn wait_for<F>(events: &mut UnboundedReceiver<SessionEvent>, mut matches: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            match events.recv().await {
                Some(event) if matches(&event) => return event,
                Some(_) => {}
                None => panic!("event stream ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Id of the `index`-th JSON frame written to `peer`.
fn sent_id(peer: &MemoryPeer, index: usize) -> String {
    let text = &peer.sent_texts()[index];
    let value: Value = serde_json::from_str(text).expect("json frame");
    value["id"].as_str().expect("id").to_string()
}

async fn wait_sent(peer: &MemoryPeer, count: usize) {
    timeout(WAIT, peer.wait_for_sent(count))
        .await
        .expect("timed out waiting for writes");
}

/// Connects an LG session and completes registration with key `abc`.
async fn paired_lg(
    connector: &MemoryConnector,
    options: SessionOptions,
) -> (Session, MemoryPeer, UnboundedReceiver<SessionEvent>, Subscription) {
    let session = lg_session(connector, options);
    let (sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    wait_sent(&peer, 1).await;
    peer.push_text(r#"{"type":"registered","id":"register_0","payload":{"client-key":"abc"}}"#);
    wait_for(&mut events, |e| matches!(e, SessionEvent::Paired { .. })).await;

    (session, peer, events, sub)
}

/// Connects a Samsung session and completes pairing.
async fn paired_samsung(
    connector: &MemoryConnector,
) -> (Session, MemoryPeer, UnboundedReceiver<SessionEvent>, Subscription) {
    let session = samsung_session(connector);
    let (sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    peer.push_text(r#"{"event":"ms.channel.connect","data":{"token":"12345"}}"#);
    wait_for(&mut events, |e| matches!(e, SessionEvent::Paired { .. })).await;

    (session, peer, events, sub)
}

// ============================================================================
// LG
// ============================================================================

#[tokio::test]
async fn test_lg_registration_authorizes_and_surfaces_token() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, _events, _sub) = paired_lg(&connector, options).await;

    assert_eq!(session.state(), SessionState::Authorized);
    assert_eq!(session.authorization(), AuthorizationState::Authorized);
    assert_eq!(session.pairing_token().as_deref(), Some("abc"));

    let register: Value = serde_json::from_str(&peer.sent_texts()[0]).expect("json");
    assert_eq!(register["type"], "register");
    assert_eq!(register["id"], "register_0");
    assert_eq!(register["payload"]["pairingType"], "PROMPT");
}

#[tokio::test]
async fn test_lg_sends_stored_key_on_register() {
    let connector = MemoryConnector::new();
    let session = lg_session(&connector, SessionOptions::new().with_pairing_key("stored"));

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    wait_sent(&peer, 1).await;

    let register: Value = serde_json::from_str(&peer.sent_texts()[0]).expect("json");
    assert_eq!(register["payload"]["client-key"], "stored");
    assert_eq!(session.state(), SessionState::Authorizing);
}

#[tokio::test]
async fn test_lg_pin_prompt_and_set_pin() {
    let connector = MemoryConnector::new();
    let session = lg_session(
        &connector,
        SessionOptions::new().with_pairing_type(crate::protocol::lg::PairingType::Pin),
    );
    let (_sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    wait_sent(&peer, 1).await;
    peer.push_text(r#"{"type":"response","id":"register_0","payload":{"pairingType":"PIN"}}"#);

    let event = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::PairingRequested { .. })
    })
    .await;
    assert_eq!(event, SessionEvent::PairingRequested { pin_required: true });

    let pairing = {
        let session = session.clone();
        tokio::spawn(async move { session.pair_with_pin("1234").await })
    };
    wait_sent(&peer, 2).await;
    let set_pin: Value = serde_json::from_str(&peer.sent_texts()[1]).expect("json");
    assert_eq!(set_pin["uri"], "ssap://pairing/setPin");
    assert_eq!(set_pin["payload"]["pin"], "1234");

    peer.push_text(format!(
        r#"{{"type":"response","id":"{}","payload":{{"returnValue":true}}}}"#,
        set_pin["id"].as_str().expect("id")
    ));
    pairing.await.expect("join").expect("pin accepted");
}

#[tokio::test]
async fn test_lg_error_frame_denies_and_rejects_submit() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, mut events, _sub) = paired_lg(&connector, options).await;

    peer.push_text(r#"{"type":"error"}"#);
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::AuthorizationDenied { .. })
    })
    .await;
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;

    assert_eq!(session.state(), SessionState::Denied);
    assert_eq!(session.authorization(), AuthorizationState::Denied);
    assert!(matches!(
        session.submit(RemoteCommand::VolumeUp).await,
        Err(Error::NotAuthorized {
            state: SessionState::Denied
        })
    ));
    assert_eq!(peer.close_code(), Some(GOING_AWAY));
}

#[tokio::test]
async fn test_lg_correlated_error_fails_only_that_request() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, _events, _sub) = paired_lg(&connector, options).await;

    // register + pointer socket request
    wait_sent(&peer, 2).await;
    let reply = session.dispatch(RemoteCommand::PowerOff).expect("dispatched");
    wait_sent(&peer, 3).await;
    let id = sent_id(&peer, 2);

    peer.push_text(format!(r#"{{"type":"error","id":"{id}","error":"401 insufficient permissions"}}"#));
    assert!(matches!(reply.await, Err(Error::Peer { .. })));
    assert_eq!(session.state(), SessionState::Authorized);
}

#[tokio::test]
async fn test_lg_query_resolves_with_payload() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, _events, _sub) = paired_lg(&connector, options).await;

    wait_sent(&peer, 2).await;
    let reply = session.dispatch(RemoteCommand::GetVolume).expect("dispatched");
    wait_sent(&peer, 3).await;
    let id = sent_id(&peer, 2);

    peer.push_text(format!(
        r#"{{"type":"response","id":"{id}","payload":{{"returnValue":true,"volumeStatus":{{"muteStatus":false,"volume":12}}}}}}"#
    ));
    let payload = reply
        .await
        .expect("reply")
        .into_reply()
        .expect("payload");
    assert_eq!(payload.volume_level(), Some(12));
    assert_eq!(payload.mute_status(), Some(false));
}

#[tokio::test]
async fn test_lg_negotiation_opens_exactly_one_secondary() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, mut events, _sub) = paired_lg(&connector, options).await;

    wait_sent(&peer, 2).await;
    let pointer_request: Value = serde_json::from_str(&peer.sent_texts()[1]).expect("json");
    assert_eq!(
        pointer_request["uri"],
        "ssap://com.webos.service.networkinput/getPointerInputSocket"
    );
    let id = sent_id(&peer, 1);

    peer.push_text(format!(
        r#"{{"type":"response","id":"{id}","payload":{{"socketPath":"wss://10.0.0.2:3001/resources/abc/netinput.pointer.sock"}}}}"#
    ));
    let secondary = timeout(WAIT, connector.wait_for_peer(1)).await.expect("secondary");
    assert_eq!(secondary.url().path(), "/resources/abc/netinput.pointer.sock");

    // A second path, under another id, must be ignored.
    peer.push_text(
        r#"{"type":"response","id":"other","payload":{"socketPath":"wss://10.0.0.2:3001/resources/zzz/netinput.pointer.sock"}}"#,
    );
    peer.push_text("not json");
    wait_for(&mut events, |e| matches!(e, SessionEvent::MalformedFrame { .. })).await;
    assert_eq!(connector.peer_count(), 2);

    assert!(matches!(
        session.submit(RemoteCommand::Key(Key::Home)).await,
        Err(Error::SecondaryChannelUnavailable)
    ));

    secondary.open();
    wait_for(&mut events, |e| matches!(e, SessionEvent::SecondaryChannelReady)).await;

    session.submit(RemoteCommand::Key(Key::Home)).await.expect("home");
    assert_eq!(
        secondary.sent(),
        [Frame::Binary(b"type:button\nname:HOME\n\n".to_vec())]
    );

    session.disconnect().await;
    assert_eq!(secondary.close_code(), Some(GOING_AWAY));
    assert_eq!(peer.close_code(), Some(GOING_AWAY));
}

#[tokio::test]
async fn test_lg_auto_subscription_pushes_events() {
    let connector = MemoryConnector::new();
    let (_session, peer, mut events, _sub) = paired_lg(&connector, SessionOptions::new()).await;

    // register, pointer socket, listApps, volume subscription
    wait_sent(&peer, 4).await;
    assert_eq!(sent_id(&peer, 2), "listAppsRequest");
    assert_eq!(sent_id(&peer, 3), "volumeSubscription");

    peer.push_text(
        r#"{"type":"response","id":"listAppsRequest","payload":{"apps":[{"id":"netflix","title":"Netflix"}]}}"#,
    );
    let SessionEvent::AppsChanged { apps } =
        wait_for(&mut events, |e| matches!(e, SessionEvent::AppsChanged { .. })).await
    else {
        unreachable!();
    };
    assert_eq!(apps[0].id.as_deref(), Some("netflix"));

    peer.push_text(
        r#"{"type":"response","id":"volumeSubscription","payload":{"volumeStatus":{"muteStatus":true,"volume":7}}}"#,
    );
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::MuteChanged { .. })).await,
        SessionEvent::MuteChanged { muted: true }
    );
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, SessionEvent::VolumeChanged { .. })).await,
        SessionEvent::VolumeChanged { volume: 7 }
    );
}

#[tokio::test]
async fn test_lg_push_without_mute_field_raises_no_mute_event() {
    let connector = MemoryConnector::new();
    let (_session, peer, mut events, _sub) = paired_lg(&connector, SessionOptions::new()).await;
    wait_sent(&peer, 4).await;

    peer.push_text(r#"{"type":"response","id":"volumeSubscription","payload":{"volume":3}}"#);
    let event = wait_for(&mut events, |e| {
        matches!(
            e,
            SessionEvent::MuteChanged { .. } | SessionEvent::VolumeChanged { .. }
        )
    })
    .await;
    assert_eq!(event, SessionEvent::VolumeChanged { volume: 3 });
}

#[tokio::test]
async fn test_lg_volume_subscription_is_shared_and_fully_cancelled() {
    let connector = MemoryConnector::new();
    let (session, peer, mut events, _sub) = paired_lg(&connector, SessionOptions::new()).await;
    wait_sent(&peer, 4).await;

    // The automatic subscription is already live; no second one is opened.
    session
        .submit(RemoteCommand::SubscribeVolume)
        .await
        .expect("subscribe");
    assert_eq!(peer.sent_count(), 4);

    session
        .submit(RemoteCommand::UnsubscribeVolume)
        .await
        .expect("unsubscribe");
    assert_eq!(peer.sent_count(), 5);
    let unsubscribe: Value = serde_json::from_str(&peer.sent_texts()[4]).expect("json");
    assert_eq!(unsubscribe["type"], "unsubscribe");
    assert_eq!(unsubscribe["id"], "volumeSubscription");

    // Late pushes under the cancelled id raise nothing.
    peer.push_text(
        r#"{"type":"response","id":"volumeSubscription","payload":{"volumeStatus":{"muteStatus":false,"volume":9}}}"#,
    );
    peer.push_text("not json");
    let mut seen = Vec::new();
    wait_for(&mut events, |e| {
        seen.push(e.clone());
        matches!(e, SessionEvent::MalformedFrame { .. })
    })
    .await;
    assert!(
        !seen.iter().any(|e| matches!(
            e,
            SessionEvent::VolumeChanged { .. } | SessionEvent::MuteChanged { .. }
        )),
        "events after unsubscribe: {seen:?}"
    );

    // Nothing left to cancel.
    session
        .submit(RemoteCommand::UnsubscribeVolume)
        .await
        .expect("unsubscribe again");
    assert_eq!(peer.sent_count(), 5);
}

#[tokio::test]
async fn test_lg_resubscribe_after_cancel_uses_new_id() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, _events, _sub) = paired_lg(&connector, options).await;
    wait_sent(&peer, 2).await;

    let reply = session
        .dispatch(RemoteCommand::SubscribeVolume)
        .expect("dispatched");
    wait_sent(&peer, 3).await;
    let id = sent_id(&peer, 2);
    peer.push_text(format!(
        r#"{{"type":"response","id":"{id}","payload":{{"returnValue":true,"volume":4}}}}"#
    ));
    reply.await.expect("subscribed");

    session
        .submit(RemoteCommand::UnsubscribeVolume)
        .await
        .expect("unsubscribe");
    assert_eq!(sent_id(&peer, 3), id);

    let _resubscribe = session
        .dispatch(RemoteCommand::SubscribeVolume)
        .expect("dispatched");
    wait_sent(&peer, 5).await;
    assert_ne!(sent_id(&peer, 4), id);
}

#[tokio::test]
async fn test_lg_primary_close_closes_secondary() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, mut events, _sub) = paired_lg(&connector, options).await;

    wait_sent(&peer, 2).await;
    let id = sent_id(&peer, 1);
    peer.push_text(format!(
        r#"{{"type":"response","id":"{id}","payload":{{"socketPath":"wss://10.0.0.2:3001/resources/abc/netinput.pointer.sock"}}}}"#
    ));
    let secondary = timeout(WAIT, connector.wait_for_peer(1)).await.expect("secondary");
    secondary.open();
    wait_for(&mut events, |e| matches!(e, SessionEvent::SecondaryChannelReady)).await;

    peer.push_close(1006, "abnormal");
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;

    assert_eq!(secondary.close_code(), Some(GOING_AWAY));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.authorization(), AuthorizationState::Unauthenticated);
}

#[tokio::test]
async fn test_lg_denial_fails_pending_pin() {
    let connector = MemoryConnector::new();
    let session = lg_session(
        &connector,
        SessionOptions::new().with_pairing_type(crate::protocol::lg::PairingType::Pin),
    );
    let (_sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    wait_sent(&peer, 1).await;
    peer.push_text(r#"{"type":"response","id":"register_0","payload":{"pairingType":"PIN"}}"#);
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::PairingRequested { .. })
    })
    .await;

    let pairing = {
        let session = session.clone();
        tokio::spawn(async move { session.pair_with_pin("0000").await })
    };
    wait_sent(&peer, 2).await;

    peer.push_text(r#"{"type":"error","error":"403 user rejected pairing"}"#);
    assert!(matches!(
        pairing.await.expect("join"),
        Err(Error::AuthorizationDenied { .. })
    ));
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert_eq!(session.authorization(), AuthorizationState::Denied);
}

#[tokio::test]
async fn test_lg_return_value_false_fails_request() {
    let connector = MemoryConnector::new();
    let options = SessionOptions::new().with_auto_subscribe(false);
    let (session, peer, _events, _sub) = paired_lg(&connector, options).await;

    wait_sent(&peer, 2).await;
    let reply = session
        .dispatch(RemoteCommand::LaunchApp {
            app_id: "missing.app".into(),
            content_id: None,
            params: None,
        })
        .expect("dispatched");
    wait_sent(&peer, 3).await;
    let id = sent_id(&peer, 2);

    peer.push_text(format!(
        r#"{{"type":"response","id":"{id}","payload":{{"returnValue":false,"errorText":"app not found"}}}}"#
    ));
    match reply.await {
        Err(Error::Peer { message, .. }) => assert_eq!(message, "app not found"),
        other => panic!("expected peer error, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Authorized);
}

// ============================================================================
// Samsung
// ============================================================================

#[tokio::test]
async fn test_samsung_strict_order_one_in_flight() {
    let connector = MemoryConnector::manual();
    let (session, peer, _events, _sub) = paired_samsung(&connector).await;
    assert_eq!(session.pairing_token().as_deref(), Some("12345"));

    let first = session.dispatch(RemoteCommand::VolumeUp).expect("1");
    let second = session.dispatch(RemoteCommand::VolumeDown).expect("2");
    let third = session.dispatch(RemoteCommand::SetMute(true)).expect("3");
    session.sync().await;

    assert_eq!(peer.sent_count(), 1);
    assert!(peer.sent_texts()[0].contains("KEY_VOLUP"));

    assert!(peer.complete_next());
    first.await.expect("first written");
    wait_sent(&peer, 2).await;
    session.sync().await;
    assert_eq!(peer.sent_count(), 2);
    assert!(peer.sent_texts()[1].contains("KEY_VOLDOWN"));

    assert!(peer.complete_next());
    second.await.expect("second written");
    wait_sent(&peer, 3).await;
    assert!(peer.sent_texts()[2].contains("KEY_MUTE"));

    assert!(peer.complete_next());
    assert_eq!(third.await.expect("third written"), Outcome::Accepted);
}

#[tokio::test]
async fn test_samsung_disconnect_fails_queued_commands() {
    let connector = MemoryConnector::manual();
    let (session, peer, mut events, _sub) = paired_samsung(&connector).await;

    let first = session.dispatch(RemoteCommand::VolumeUp).expect("1");
    let second = session.dispatch(RemoteCommand::VolumeDown).expect("2");
    session.sync().await;

    session.disconnect().await;
    assert!(first.await.is_err());
    assert!(matches!(second.await, Err(Error::SessionClosed)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(peer.sent_count(), 1);
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
}

#[tokio::test]
async fn test_samsung_unauthorized_denies() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);
    let (_sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::PairingRequested { pin_required: false })
    })
    .await;

    peer.push_text(r#"{"event":"ms.channel.unauthorized"}"#);
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert_eq!(session.state(), SessionState::Denied);

    // A denied session may try again.
    session.connect().await.expect("reconnect");
    assert_eq!(connector.peer_count(), 2);
}

#[tokio::test]
async fn test_samsung_connect_without_token_is_protocol_error() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);
    let (_sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    peer.push_text(r#"{"event":"ms.channel.connect","data":{}}"#);

    wait_for(&mut events, |e| matches!(e, SessionEvent::Error { .. })).await;
    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert_eq!(session.state(), SessionState::Error);
    assert_eq!(session.pairing_token(), None);
}

#[tokio::test]
async fn test_samsung_reconnect_reuses_token() {
    let connector = MemoryConnector::new();
    let (session, _peer, _events, _sub) = paired_samsung(&connector).await;

    session.disconnect().await;
    session.connect().await.expect("reconnect");
    let second = connector.wait_for_peer(1).await;
    assert!(second.url().query().unwrap_or_default().contains("token=12345"));
}

#[tokio::test]
async fn test_samsung_rejects_pin_pairing() {
    let connector = MemoryConnector::new();
    let (session, _peer, _events, _sub) = paired_samsung(&connector).await;
    assert!(matches!(
        session.pair_with_pin("1234").await,
        Err(Error::Unsupported { .. })
    ));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_submit_before_authorization_sends_nothing() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);

    assert!(matches!(
        session.submit(RemoteCommand::VolumeUp).await,
        Err(Error::NotAuthorized {
            state: SessionState::Idle
        })
    ));

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    assert!(matches!(
        session.dispatch(RemoteCommand::VolumeUp),
        Err(Error::NotAuthorized { .. })
    ));
    session.sync().await;
    assert_eq!(peer.sent_count(), 0);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);

    session.connect().await.expect("connect");
    assert!(matches!(
        session.connect().await,
        Err(Error::AlreadyConnected)
    ));
}

#[tokio::test]
async fn test_invalid_address_fails_fast() {
    let connector = MemoryConnector::new();
    let tv = DeviceDescriptor::new(Vendor::Samsung, "tv", "not-an-ip");
    let session = Session::new(
        tv,
        SessionOptions::new().with_connector(Arc::new(connector.clone())),
    )
    .expect("session");

    assert!(matches!(
        session.connect().await,
        Err(Error::InvalidAddress { .. })
    ));
    assert_eq!(connector.peer_count(), 0);
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_disconnect_twice_is_noop() {
    let connector = MemoryConnector::new();
    let (session, _peer, mut events, _sub) = paired_samsung(&connector).await;

    session.disconnect().await;
    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);

    wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_before_connect_is_noop() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);
    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_transport_close_moves_to_disconnected() {
    let connector = MemoryConnector::new();
    let (session, peer, mut events, _sub) = paired_samsung(&connector).await;

    peer.push_close(1006, "abnormal");
    let event = wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await;
    assert_eq!(
        event,
        SessionEvent::Disconnected {
            code: Some(1006),
            reason: "abnormal".into()
        }
    );
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_malformed_frame_does_not_block_later_frames() {
    let connector = MemoryConnector::new();
    let session = samsung_session(&connector);
    let (_sub, mut events) = session.events();

    session.connect().await.expect("connect");
    let peer = connector.wait_for_peer(0).await;
    peer.open();
    peer.push_text("{");
    peer.push_text(r#"{"data":{}}"#);
    peer.push_text(r#"{"event":"ms.channel.connect","data":{"token":"t"}}"#);

    wait_for(&mut events, |e| matches!(e, SessionEvent::MalformedFrame { .. })).await;
    wait_for(&mut events, |e| matches!(e, SessionEvent::Paired { .. })).await;
    assert_eq!(session.state(), SessionState::Authorized);
}

#[test]
fn test_http_vendors_have_no_socket_session() {
    let tv = DeviceDescriptor::new(Vendor::Roku, "Den", "10.0.0.3");
    assert!(matches!(
        Session::new(tv, SessionOptions::new()),
        Err(Error::Config { .. })
    ));
}

// ============================================================================
// Properties
// ============================================================================

fn command_for(n: u8) -> RemoteCommand {
    RemoteCommand::Key(Key::Digit(n % 10))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_wire_order_equals_submission_order(digits in proptest::collection::vec(0u8..10, 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let sent = runtime.block_on(async {
            let connector = MemoryConnector::manual();
            let (session, peer, _events, _sub) = paired_samsung(&connector).await;

            let replies: Vec<_> = digits
                .iter()
                .map(|d| session.dispatch(command_for(*d)).expect("dispatch"))
                .collect();

            for (index, reply) in replies.into_iter().enumerate() {
                wait_sent(&peer, index + 1).await;
                assert_eq!(peer.sent_count(), index + 1);
                peer.complete_next();
                reply.await.expect("written");
            }
            peer.sent_texts()
        });

        let expected: Vec<String> = digits.iter().map(|d| format!("KEY_{d}")).collect();
        let observed: Vec<String> = sent
            .iter()
            .map(|text| {
                let value: Value = serde_json::from_str(text).expect("json");
                value["params"]["DataOfCmd"].as_str().expect("key").to_string()
            })
            .collect();
        prop_assert_eq!(observed, expected);
    }
}
