// SPDX-License-Identifier: MIT

//! Entry point: acquires a single-instance lock, loads config, recovers
//! crash-interrupted state, then spawns the Worker, Scheduler, Broadcaster,
//! and Monitor tasks alongside the Unix socket listener.

mod config;
mod convert;
mod error;
mod listener;

use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use reaper_core::SystemClock;
use reaper_engine::monitor::Heartbeat;
use reaper_engine::{Broadcaster, Monitor, ScytheManager, Scheduler, StateManager, UserManager, Worker, WorkerConfig};
use reaper_storage::Store;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

use crate::error::{DaemonError, DaemonResult};
use crate::listener::AppContext;

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let data_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data"));
    tokio::fs::create_dir_all(&data_dir).await?;

    let config = config::load(&data_dir).await?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    let lock_path = data_dir.join("reaperd.lock");
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| DaemonError::AlreadyRunning(lock_path.clone()))?;

    let logs_dir = data_dir.join("logs");
    tokio::fs::create_dir_all(&logs_dir).await?;
    tokio::fs::create_dir_all(&config.temp_dir).await?;
    tokio::fs::create_dir_all(&config.download_dir).await?;

    let store = Store::connect(&format!("sqlite://{}?mode=rwc", data_dir.join("reaper.db").display())).await?;
    let state = StateManager::new(store.clone(), SystemClock);
    state.load_from_store().await?;
    reaper_engine::recover(&store, &state, &config.temp_dir, &logs_dir).await?;

    let cookie_file = data_dir.join("cookies.txt");
    let worker_config = WorkerConfig {
        download_dir: config.download_dir.clone(),
        temp_dir: config.temp_dir.clone(),
        logs_dir: logs_dir.clone(),
        cookie_file: tokio::fs::try_exists(&cookie_file).await.unwrap_or(false).then_some(cookie_file),
        ..WorkerConfig::default()
    };
    let worker = Arc::new(Worker::new(state.clone(), worker_config));

    let scheduler = Scheduler::new(store.clone(), state.clone(), &config.user_timezone);
    let scythes = Arc::new(ScytheManager::new(store.clone(), state.clone(), scheduler.clone()));
    let users = Arc::new(UserManager::new(store));

    let worker_heartbeat = Heartbeat::new();
    let scheduler_heartbeat = Heartbeat::new();
    let monitor = Monitor::new(SystemClock, worker_heartbeat.clone(), scheduler_heartbeat.clone());

    let socket_path = data_dir.join("reaperd.sock");
    if tokio::fs::try_exists(&socket_path).await.unwrap_or(false) {
        tokio::fs::remove_file(&socket_path).await?;
    }
    let listener = UnixListener::bind(&socket_path)?;

    let shutdown = CancellationToken::new();
    let (event_tx, _event_rx) = tokio::sync::broadcast::channel::<reaper_wire::StateSnapshot>(16);
    let ctx = Arc::new(AppContext { state: state.clone(), scythes, users, events: event_tx.clone() });

    let broadcast_state = state.clone();
    let broadcaster = Broadcaster::new(broadcast_state);

    let worker_shutdown = shutdown.clone();
    let scheduler_shutdown = shutdown.clone();
    let monitor_shutdown = shutdown.clone();
    let broadcaster_shutdown = shutdown.clone();
    let listener_shutdown = shutdown.clone();

    let worker_handle = tokio::spawn(worker.run(worker_shutdown, worker_heartbeat));
    let scheduler_handle = tokio::spawn(scheduler.run(scheduler_shutdown, scheduler_heartbeat));
    let monitor_handle = tokio::spawn(monitor.run(monitor_shutdown));
    let broadcaster_handle = tokio::spawn(async move {
        broadcaster
            .run(broadcaster_shutdown, |snapshot| {
                let event_tx = event_tx.clone();
                async move {
                    let _ = event_tx.send(snapshot.into());
                }
            })
            .await;
    });
    let listener_handle = tokio::spawn(listener::run(listener, ctx, listener_shutdown));

    tracing::info!(data_dir = %data_dir.display(), "reaperd: started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("reaperd: shutting down");
    shutdown.cancel();

    let _ = tokio::join!(worker_handle, scheduler_handle, monitor_handle, broadcaster_handle, listener_handle);

    let _ = tokio::fs::remove_file(&socket_path).await;
    drop(lock_file);
    let _ = std::fs::remove_file(&lock_path);

    Ok(())
}
