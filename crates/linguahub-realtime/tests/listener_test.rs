//! Integration tests for listener fan-out and frame handling faults.

mod support;

use std::sync::Arc;

use parking_lot::Mutex;

use linguahub_core::error::ErrorKind;
use linguahub_realtime::MessageKind;

use support::{client_over, settle, FakeConnector, Step};

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_does_not_block_the_rest() {
    let (connector, mut handles) = FakeConnector::new([Step::Accept]);
    let client = client_over(connector);

    let _bad = client.on_message(|_| panic!("listener bug"));
    let received = Arc::new(Mutex::new(Vec::new()));
    let _good = {
        let received = Arc::clone(&received);
        client.on_message(move |msg| received.lock().push(msg.kind))
    };

    client.connect().await.unwrap();
    let handle = handles.recv().await.unwrap();

    handle.push_frame(r#"{"type":"system_message","content":"maintenance at 22:00"}"#);
    settle().await;
    assert_eq!(*received.lock(), vec![MessageKind::SystemMessage]);

    // The panic did not take the connection down.
    assert!(client.is_connected());
    handle.push_frame(r#"{"type":"typing","room_id":"r1"}"#);
    settle().await;
    assert_eq!(
        *received.lock(),
        vec![MessageKind::SystemMessage, MessageKind::Typing]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_subscription_stops_receiving() {
    let (connector, mut handles) = FakeConnector::new([Step::Accept]);
    let client = client_over(connector);

    let received = Arc::new(Mutex::new(0u32));
    let subscription = {
        let received = Arc::clone(&received);
        client.on_message(move |_| *received.lock() += 1)
    };

    client.connect().await.unwrap();
    let handle = handles.recv().await.unwrap();

    handle.push_frame(r#"{"type":"connected"}"#);
    settle().await;
    assert_eq!(*received.lock(), 1);

    subscription.cancel();
    handle.push_frame(r#"{"type":"connected"}"#);
    settle().await;
    assert_eq!(*received.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_reported_and_dropped() {
    let (connector, mut handles) = FakeConnector::new([Step::Accept]);
    let client = client_over(connector);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let _errs = {
        let errors = Arc::clone(&errors);
        client.on_error(move |err| errors.lock().push(err.kind))
    };
    let received = Arc::new(Mutex::new(Vec::new()));
    let _msgs = {
        let received = Arc::clone(&received);
        client.on_message(move |msg| received.lock().push(msg.kind))
    };

    client.connect().await.unwrap();
    let handle = handles.recv().await.unwrap();

    handle.push_frame("{oops");
    settle().await;

    assert_eq!(*errors.lock(), vec![ErrorKind::Serialization]);
    assert!(received.lock().is_empty());

    // The connection survives and keeps delivering.
    assert!(client.is_connected());
    handle.push_frame(r#"{"type":"pong"}"#);
    settle().await;
    assert_eq!(*received.lock(), vec![MessageKind::Pong]);
}
