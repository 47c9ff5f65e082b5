// SPDX-License-Identifier: MIT

//! Runs once at startup, before the worker loop begins: reconciles whatever
//! the filesystem and the store say about a possibly crash-interrupted run.

use std::path::Path;
use std::sync::Arc;

use reaper_core::model::HistoryEntry;
use reaper_core::Clock;
use reaper_storage::Store;
use tokio::fs;

use crate::error::EngineResult;
use crate::state::StateManager;

/// Must run after [`StateManager::load_from_store`] (it needs the loaded
/// queue to know which scratch directories are still legitimately owned)
/// and before the worker's first iteration.
pub async fn recover<C: Clock>(
    store: &Store,
    state: &Arc<StateManager<C>>,
    temp_dir: &Path,
    logs_dir: &Path,
) -> EngineResult<()> {
    reap_abandoned_job(store, state).await?;
    remove_stale_active_logs(logs_dir).await;
    remove_orphaned_scratch_dirs(temp_dir, state).await;
    Ok(())
}

/// If the store still has a `current_job` marker, the previous run crashed
/// between popping that job and finalizing it. Record it as ABANDONED and
/// clear the marker so a second restart doesn't double-report it.
async fn reap_abandoned_job<C: Clock>(store: &Store, state: &Arc<StateManager<C>>) -> EngineResult<()> {
    let Some(job) = store.get_current_job().await? else {
        return Ok(());
    };

    let folder = job.effective_folder().to_string();
    let entry = HistoryEntry {
        log_id: 0,
        url: job.url.clone(),
        title: Some(folder.clone()),
        folder: Some(folder),
        filenames: Vec::new(),
        job_data: Some(job),
        status: reaper_core::model::HistoryStatus::Abandoned,
        log_path: None,
        error_summary: Some("job was interrupted by a restart".to_string()),
        timestamp: 0,
    };
    state.add_to_history(entry).await?;
    store.clear_current_job().await?;
    Ok(())
}

/// `logs/job_active_*.log` is always a leftover from a run that never
/// reached finalize (a clean finalize renames it away). Delete it outright —
/// the abandoned history row's `error_summary` carries the interruption note
/// instead of a salvaged log tail.
async fn remove_stale_active_logs(logs_dir: &Path) {
    let Ok(mut entries) = fs::read_dir(logs_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("job_active_") && name.ends_with(".log") {
            if let Err(err) = fs::remove_file(entry.path()).await {
                tracing::warn!(error = %err, file = %name, "recovery: failed to remove stale active log");
            }
        }
    }
}

/// Remove any `temp_dir/job_<id>` scratch directory that doesn't correspond
/// to a job still sitting in the loaded queue — that includes the just-
/// abandoned job's scratch, which will never be resumed.
async fn remove_orphaned_scratch_dirs<C: Clock>(temp_dir: &Path, state: &Arc<StateManager<C>>) {
    let known: std::collections::HashSet<i64> =
        state.queue_snapshot().await.iter().map(|job| job.id).collect();

    let Ok(mut entries) = fs::read_dir(temp_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(id_str) = name.strip_prefix("job_") else { continue };
        let owned = id_str.parse::<i64>().is_ok_and(|id| known.contains(&id));
        if owned {
            continue;
        }
        if let Err(err) = fs::remove_dir_all(entry.path()).await {
            tracing::warn!(error = %err, dir = %name, "recovery: failed to remove orphaned scratch directory");
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
