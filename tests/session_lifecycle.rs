//! Integration tests for session start/end through the host and controller

mod common;

use std::time::Duration;

use common::{init_tracing, wait_for, ScriptedTransport};
use rtc_session_core::{
    ConnectionState, EstablishOutcome, SessionConfig, SessionController, SessionError,
    SessionHost, VideoMode,
};

fn config_in(dir: &tempfile::TempDir) -> SessionConfig {
    SessionConfig::new(dir.path().join("session.json"))
}

#[tokio::test]
async fn start_call_reaches_connected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::gated(vec![]);
    let host = SessionHost::new(config_in(&dir), transport.clone()).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();

    // Before any command the stream replays the initial Disconnected state.
    let first = states.next().await.unwrap();
    assert_eq!(first.connection, ConnectionState::Disconnected);
    assert!(!first.active);

    let acked = controller.start_call(VideoMode::Webcam, "offer").await.unwrap();
    assert_eq!(acked.connection, ConnectionState::Connecting);
    assert!(acked.active);

    // The interim Connecting snapshot is observable while establish runs.
    let connecting = wait_for(&mut states, |s| s.connection == ConnectionState::Connecting).await;
    assert_eq!(connecting.video_mode, VideoMode::Webcam);

    transport.release();
    let connected = wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;
    assert!(connected.active);
    assert!(connected.last_error.is_none());
}

#[tokio::test]
async fn start_is_idempotent_and_never_establishes_twice() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::acking();
    let host = SessionHost::new(config_in(&dir), transport.clone()).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();

    controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;

    // Second start while connected: current state back, no new session.
    let again = controller.start_call(VideoMode::Webcam, "other").await.unwrap();
    assert_eq!(again.connection, ConnectionState::Connected);
    assert_eq!(again.video_mode, VideoMode::AudioOnly);
    assert_eq!(transport.establish_count(), 1);
    assert_eq!(host.stats().sessions_started, 1);
}

#[tokio::test]
async fn end_call_tears_down_before_disconnected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::acking();
    let host = SessionHost::new(config_in(&dir), transport.clone()).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();

    controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;

    let ended = controller.end_call().await.unwrap();
    assert_eq!(ended.connection, ConnectionState::Disconnected);
    assert!(!ended.active);
    // end() replies only after the transport was instructed to tear down.
    assert_eq!(transport.teardown_count(), 1);

    let observed = wait_for(&mut states, |s| s.connection == ConnectionState::Disconnected).await;
    assert!(observed.session_params.is_none());
}

#[tokio::test]
async fn late_ack_after_end_never_resurrects_session() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::gated(vec![]);
    let host = SessionHost::new(config_in(&dir), transport.clone()).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());

    let started = controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    assert_eq!(started.connection, ConnectionState::Connecting);

    // End while the establish is still pending behind the gate.
    let ended = controller.end_call().await.unwrap();
    assert_eq!(ended.connection, ConnectionState::Disconnected);

    // Now let the stale ack through; it must be discarded.
    transport.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = controller.current_state().unwrap();
    assert_eq!(state.connection, ConnectionState::Disconnected);
    assert!(!state.active);
}

#[tokio::test]
async fn connect_failure_surfaces_on_state_not_as_an_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport =
        ScriptedTransport::with_outcomes(vec![EstablishOutcome::failure("server refused")]);
    let host = SessionHost::new(config_in(&dir), transport).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();

    // The command itself succeeds; failure is delivered via state.
    let started = controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    assert_eq!(started.connection, ConnectionState::Connecting);

    let failed = wait_for(&mut states, |s| s.connection == ConnectionState::Failed).await;
    assert_eq!(
        failed.last_error.as_ref().map(|e| e.reason.as_str()),
        Some("server refused")
    );
    assert!(failed.active);

    // Re-issuing start from Failed recovers.
    let restarted = controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    assert_eq!(restarted.connection, ConnectionState::Connecting);
    assert!(restarted.last_error.is_none());
    wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;
}

#[tokio::test]
async fn late_subscriber_immediately_sees_connected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::acking();
    let host = SessionHost::new(config_in(&dir), transport).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();

    controller.start_call(VideoMode::Webcam, "offer").await.unwrap();
    wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;

    // A stream created after the fact replays Connected as its first value.
    let mut late = controller.state_stream().unwrap();
    let first = late.next().await.unwrap();
    assert_eq!(first.connection, ConnectionState::Connected);
    assert!(first.active);
}

#[tokio::test]
async fn commands_while_unbound_are_rejected_immediately() {
    init_tracing();
    let controller = SessionController::new();

    let err = controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap_err();
    assert!(matches!(err, SessionError::NotBound));
    assert!(matches!(controller.end_call().await.unwrap_err(), SessionError::NotBound));
    assert!(matches!(controller.current_state().unwrap_err(), SessionError::NotBound));
    assert!(matches!(controller.state_stream().unwrap_err(), SessionError::NotBound));
}

#[tokio::test]
async fn unbind_never_terminates_an_active_session() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::acking();
    let host = SessionHost::new(config_in(&dir), transport.clone()).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut states = controller.state_stream().unwrap();
    controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    wait_for(&mut states, |s| s.connection == ConnectionState::Connected).await;

    controller.unbind();
    assert!(!controller.is_bound());
    // Redundant unbind is safe.
    controller.unbind();

    assert_eq!(host.current_state().connection, ConnectionState::Connected);
    assert_eq!(transport.teardown_count(), 0);

    // Rebinding picks the live session straight back up.
    controller.bind(host.clone());
    assert_eq!(
        controller.current_state().unwrap().connection,
        ConnectionState::Connected
    );
}

#[tokio::test]
async fn two_subscribers_see_the_same_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::acking();
    let host = SessionHost::new(config_in(&dir), transport).unwrap();

    let mut controller = SessionController::new();
    controller.bind(host.clone());
    let mut a = controller.state_stream().unwrap();
    let mut b = controller.state_stream().unwrap();

    controller.start_call(VideoMode::AudioOnly, "offer").await.unwrap();
    let a_connected = wait_for(&mut a, |s| s.connection == ConnectionState::Connected).await;
    let b_connected = wait_for(&mut b, |s| s.connection == ConnectionState::Connected).await;

    // Same authoritative snapshot, not merely similar ones.
    assert_eq!(a_connected, b_connected);
}
