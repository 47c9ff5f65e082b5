use std::sync::Arc;
use std::time::Duration;

use reaper_core::clock::FakeClock;
use reaper_core::model::Permissions;
use reaper_core::test_support::music_job_spec;
use reaper_engine::{Broadcaster, ScytheManager, Scheduler, StateManager, UserManager};
use reaper_storage::Store;
use reaper_wire::{read_message, write_message, Request, Response};
use tempfile::tempdir;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::*;

async fn test_ctx() -> Arc<AppContext<FakeClock>> {
    let store = Store::connect_in_memory().await.expect("connect");
    let state = StateManager::new(store.clone(), FakeClock::new());
    let scheduler = Scheduler::new(store.clone(), state.clone(), "UTC");
    let scythes = Arc::new(ScytheManager::new(store.clone(), state.clone(), scheduler));
    let users = Arc::new(UserManager::new(store));
    let (events, _rx) = broadcast::channel(16);
    Arc::new(AppContext { state, scythes, users, events })
}

#[tokio::test]
async fn enqueue_then_snapshot_round_trips_through_handle() {
    let ctx = test_ctx().await;

    let job = match handle(Request::Enqueue { spec: music_job_spec("https://example.com/a", "music") }, &ctx)
        .await
        .unwrap()
    {
        Response::Job { job } => job,
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(job.url, "https://example.com/a");

    match handle(Request::Snapshot, &ctx).await.unwrap() {
        Response::Snapshot { snapshot } => assert_eq!(snapshot.queue.len(), 1),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn user_add_then_get_round_trips() {
    let ctx = test_ctx().await;

    let response = handle(
        Request::UserAdd { username: "alice".to_string(), password: Some("hunter2".to_string()), permissions: Permissions::default() },
        &ctx,
    )
    .await
    .unwrap();
    assert!(matches!(response, Response::Ok));

    match handle(Request::UserGet { username: "alice".to_string() }, &ctx).await.unwrap() {
        Response::User { user: Some(user) } => assert_eq!(user.username, "alice"),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn a_validation_failure_becomes_an_error_response_not_a_panic() {
    let ctx = test_ctx().await;

    let response = dispatch(Request::Enqueue { spec: music_job_spec("", "music") }, &ctx).await;

    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn run_serves_one_request_per_connection_over_a_real_socket() {
    let ctx = test_ctx().await;
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("reaperd.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let shutdown = CancellationToken::new();

    let shutdown_for_task = shutdown.clone();
    let handle = tokio::spawn(run(listener, ctx, shutdown_for_task));

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);

    write_message(&mut write_half, &Request::HistorySummary).await.unwrap();
    let response: Response = read_message(&mut reader).await.unwrap();
    assert!(matches!(response, Response::HistorySummary { entries } if entries.is_empty()));

    shutdown.cancel();
    handle.abort();
}

#[tokio::test]
async fn a_connected_client_receives_a_pushed_event_after_a_version_counter_moves() {
    let ctx = test_ctx().await;
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("reaperd.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let shutdown = CancellationToken::new();

    let broadcaster = Broadcaster::with_interval(ctx.state.clone(), Duration::from_millis(20));
    let broadcaster_events = ctx.events.clone();
    let broadcaster_shutdown = shutdown.clone();
    let broadcaster_handle = tokio::spawn(async move {
        broadcaster
            .run(broadcaster_shutdown, |snapshot| {
                let events = broadcaster_events.clone();
                async move {
                    let _ = events.send(snapshot.into());
                }
            })
            .await;
    });

    let listener_shutdown = shutdown.clone();
    let listener_handle = tokio::spawn(run(listener, Arc::clone(&ctx), listener_shutdown));

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);

    // First request/response round trip still works over the long-lived connection.
    write_message(&mut write_half, &Request::HistorySummary).await.unwrap();
    let first: Response = read_message(&mut reader).await.unwrap();
    assert!(matches!(first, Response::HistorySummary { entries } if entries.is_empty()));

    ctx.state.enqueue_job(music_job_spec("https://example.com/a", "music")).await.unwrap();

    let pushed: Response = tokio::time::timeout(Duration::from_secs(2), read_message(&mut reader))
        .await
        .expect("event was not pushed before the timeout")
        .unwrap();
    match pushed {
        Response::Event { snapshot } => assert_eq!(snapshot.queue.len(), 1),
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    listener_handle.abort();
    broadcaster_handle.abort();
}
