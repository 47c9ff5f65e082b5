// SPDX-License-Identifier: MIT

//! Accepts connections on the Unix socket and dispatches [`Request`]s on
//! them. A connection answers its first request like a one-shot client
//! (matching `reap`), then stays open: each further line is either another
//! request or the client simply disconnecting, interleaved with whatever
//! [`Response::Event`] pushes the Broadcaster sends while the connection
//! lives, so a client that wants live updates just keeps reading.

use std::sync::Arc;

use reaper_core::Clock;
use reaper_engine::user_manager::UserUpdate as EngineUserUpdate;
use reaper_engine::{ScytheManager, StateManager, UserManager};
use reaper_storage::HistoryUpdate as StoreHistoryUpdate;
use reaper_wire::{read_message, read_request, write_response, ProtocolError, Request, Response, StateSnapshot, DEFAULT_TIMEOUT};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonResult;

pub struct AppContext<C: Clock = reaper_core::SystemClock> {
    pub state: Arc<StateManager<C>>,
    pub scythes: Arc<ScytheManager<C>>,
    pub users: Arc<UserManager>,
    /// Source of the unsolicited `Event` push. Each connection subscribes
    /// its own receiver so a slow client only lags its own queue.
    pub events: broadcast::Sender<StateSnapshot>,
}

/// Accept connections until `shutdown` fires. Each connection is handled on
/// its own task so a slow or stuck client never blocks another.
pub async fn run<C: Clock + 'static>(
    listener: UnixListener,
    ctx: Arc<AppContext<C>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, &ctx).await {
                                tracing::debug!(error = %err, "daemon: connection ended with an error");
                            }
                        });
                    }
                    Err(err) => tracing::error!(error = %err, "daemon: accept failed"),
                }
            }
            _ = shutdown.cancelled() => return,
        }
    }
}

async fn handle_connection<C: Clock>(stream: UnixStream, ctx: &AppContext<C>) -> DaemonResult<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);
    let mut events = ctx.events.subscribe();

    let request = match read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(request) => request,
        Err(err) => return Err(err.into()),
    };
    let response = dispatch(request, ctx).await;
    write_response(&mut write_half, &response, DEFAULT_TIMEOUT).await?;

    // The client may now disconnect (the common `reap` one-shot case) or
    // keep the connection open to both send further requests and receive
    // pushed `Event`s; either is served by the same loop.
    loop {
        tokio::select! {
            request = read_message::<_, Request>(&mut reader) => {
                match request {
                    Ok(request) => {
                        let response = dispatch(request, ctx).await;
                        write_response(&mut write_half, &response, DEFAULT_TIMEOUT).await?;
                    }
                    Err(ProtocolError::ConnectionClosed) => return Ok(()),
                    Err(err) => return Err(err.into()),
                }
            }
            event = events.recv() => {
                match event {
                    Ok(snapshot) => write_response(&mut write_half, &Response::Event { snapshot }, DEFAULT_TIMEOUT).await?,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

async fn dispatch<C: Clock>(request: Request, ctx: &AppContext<C>) -> Response {
    match handle(request, ctx).await {
        Ok(response) => response,
        Err(err) => Response::error(err.to_string()),
    }
}

async fn handle<C: Clock>(request: Request, ctx: &AppContext<C>) -> DaemonResult<Response> {
    let state = &ctx.state;
    let scythes = &ctx.scythes;
    let users = &ctx.users;

    Ok(match request {
        Request::Enqueue { spec } => Response::Job { job: state.enqueue_job(spec).await? },
        Request::EnqueueMany { specs } => Response::Jobs { jobs: state.enqueue_many(specs).await? },
        Request::ClearQueue => {
            state.clear_queue().await?;
            Response::Ok
        }
        Request::DeleteFromQueue { id } => Response::Deleted { removed: state.delete_from_queue(id).await? },
        Request::ReorderQueue { ids } => {
            state.reorder_queue(&ids).await?;
            Response::Ok
        }

        Request::Pause => {
            state.pause().await;
            Response::Ok
        }
        Request::Resume => {
            state.resume().await;
            Response::Ok
        }
        Request::RequestStop { mode } => {
            state.request_stop(mode);
            Response::Ok
        }

        Request::AddToHistory { entry } => Response::HistoryLogId { log_id: state.add_to_history(entry).await? },
        Request::UpdateHistoryItem { log_id, update } => {
            state.update_history_item(log_id, into_store_history_update(update)).await?;
            Response::Ok
        }
        Request::GetHistoryItem { log_id } => Response::HistoryItem { entry: state.get_history_item(log_id).await? },
        Request::HistorySummary => Response::HistorySummary { entries: state.history_summary().await? },
        Request::ClearHistory => Response::HistoryCleared { log_paths: state.clear_history().await? },
        Request::DeleteFromHistory { log_id } => {
            Response::HistoryLogPath { log_path: state.delete_from_history(log_id).await? }
        }
        Request::AddNotification { text } => Response::HistoryLogId { log_id: state.add_notification(text).await? },

        Request::Snapshot => Response::Snapshot {
            snapshot: reaper_wire::StateSnapshot {
                versions: state.versions().await.into(),
                queue: state.queue_snapshot().await,
                current: state.current_snapshot().await,
                history: state.history_summary().await?,
            },
        },
        Request::Versions => Response::Versions { versions: state.versions().await.into() },

        Request::ScytheList => Response::Scythes { scythes: scythes.list().await? },
        Request::ScytheGet { id } => Response::Scythe { scythe: scythes.get(id).await? },
        Request::ScytheAdd { scythe } => Response::ScytheId { id: scythes.add(scythe).await? },
        Request::ScytheUpdate { scythe } => Response::ScytheId { id: scythes.update(scythe).await? },
        Request::ScytheDelete { id } => Response::Deleted { removed: scythes.delete(id).await? },

        Request::UserGet { username } => Response::User { user: users.get(&username).await? },
        Request::UserList => Response::Users { users: users.list().await? },
        Request::UserAdd { username, password, permissions } => {
            users.add(&username, password.as_deref(), permissions).await?;
            Response::Ok
        }
        Request::UserUpdate { username, update } => {
            users.update(&username, into_engine_user_update(update)).await?;
            Response::Ok
        }
        Request::UserDelete { username } => Response::Deleted { removed: users.delete(&username).await? },
    })
}

fn into_store_history_update(update: reaper_wire::HistoryUpdate) -> StoreHistoryUpdate {
    StoreHistoryUpdate {
        status: update.status,
        filenames: update.filenames,
        error_summary: update.error_summary,
        log_path: update.log_path,
        title: update.title,
        folder: update.folder,
    }
}

fn into_engine_user_update(update: reaper_wire::UserUpdate) -> EngineUserUpdate {
    EngineUserUpdate { password: update.password, permissions: update.permissions }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
