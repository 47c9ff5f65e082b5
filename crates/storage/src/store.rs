// SPDX-License-Identifier: MIT

//! Embedded SQLite persistence for the tables in the persistence contract:
//! `users`, `scythes`, `history`, `queue`, and the single-row `current_job`
//! marker used by crash recovery.

use reaper_core::model::{HistoryEntry, HistoryStatus, Job, JobSpec, Permissions, Schedule, Scythe, User};
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct QueueRow {
    job_id: i64,
    job_data: String,
}

#[derive(FromRow)]
struct HistoryRow {
    log_id: i64,
    url: String,
    title: Option<String>,
    folder: Option<String>,
    filenames: String,
    job_data: Option<String>,
    status: String,
    log_path: Option<String>,
    error_summary: Option<String>,
    timestamp: i64,
}

#[derive(FromRow)]
struct ScytheRow {
    id: i64,
    name: String,
    job_data: String,
    schedule: Option<String>,
}

#[derive(FromRow)]
struct UserRow {
    username: String,
    password_hash: Option<String>,
    permissions: String,
}

/// Partial update applied to an existing history row; `None` fields are left
/// untouched.
#[derive(Debug, Default, Clone)]
pub struct HistoryUpdate {
    pub status: Option<HistoryStatus>,
    pub filenames: Option<Vec<String>>,
    pub error_summary: Option<String>,
    pub log_path: Option<String>,
    pub title: Option<String>,
    pub folder: Option<String>,
}

impl Store {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn connect_in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    // ── queue ────────────────────────────────────────────────────────────

    /// Replace the entire queue table with `jobs`, preserving order. Runs in
    /// a single transaction: either all rows land or none do.
    pub async fn persist_queue(&self, jobs: &[Job]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM queue").execute(&mut *tx).await?;
        for (order, job) in jobs.iter().enumerate() {
            let job_data = serde_json::to_string(&job.spec)?;
            sqlx::query("INSERT INTO queue (job_id, job_data, queue_order) VALUES (?, ?, ?)")
                .bind(job.id)
                .bind(job_data)
                .bind(order as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_queue(&self) -> StoreResult<Vec<Job>> {
        let rows: Vec<QueueRow> =
            sqlx::query_as("SELECT job_id, job_data FROM queue ORDER BY queue_order ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| {
                let spec: JobSpec = serde_json::from_str(&row.job_data)?;
                Ok(Job::new(row.job_id, spec))
            })
            .collect()
    }

    /// Record the job the worker just popped, before it starts running.
    /// Cleared by [`Store::clear_current_job`] once the job finalizes;
    /// a row still present at startup means the previous run crashed mid-job.
    pub async fn set_current_job(&self, job: &Job) -> StoreResult<()> {
        let job_data = serde_json::to_string(job)?;
        sqlx::query("INSERT INTO current_job (id, job_data) VALUES (0, ?) ON CONFLICT(id) DO UPDATE SET job_data = excluded.job_data")
            .bind(job_data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_current_job(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM current_job WHERE id = 0").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_current_job(&self) -> StoreResult<Option<Job>> {
        let row: Option<String> = sqlx::query_scalar("SELECT job_data FROM current_job WHERE id = 0")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|data| Ok(serde_json::from_str(&data)?)).transpose()
    }

    // ── history ──────────────────────────────────────────────────────────

    pub async fn insert_history(&self, entry: &HistoryEntry) -> StoreResult<i64> {
        let job_data = entry.job_data.as_ref().map(serde_json::to_string).transpose()?;
        let filenames = serde_json::to_string(&entry.filenames)?;
        let status = status_to_text(entry.status)?;

        let result = sqlx::query(
            "INSERT INTO history (url, title, folder, filenames, job_data, status, log_path, error_summary, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(&entry.folder)
        .bind(filenames)
        .bind(job_data)
        .bind(status)
        .bind(&entry.log_path)
        .bind(&entry.error_summary)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_history(&self, log_id: i64, update: HistoryUpdate) -> StoreResult<()> {
        let Some(mut entry) = self.get_history(log_id).await? else {
            return Err(StoreError::Validation(format!(
                "history row {log_id} does not exist"
            )));
        };

        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(filenames) = update.filenames {
            entry.filenames = filenames;
        }
        if update.error_summary.is_some() {
            entry.error_summary = update.error_summary;
        }
        if update.log_path.is_some() {
            entry.log_path = update.log_path;
        }
        if update.title.is_some() {
            entry.title = update.title;
        }
        if update.folder.is_some() {
            entry.folder = update.folder;
        }

        let job_data = entry.job_data.as_ref().map(serde_json::to_string).transpose()?;
        let filenames = serde_json::to_string(&entry.filenames)?;
        let status = status_to_text(entry.status)?;

        sqlx::query(
            "UPDATE history SET title = ?, folder = ?, filenames = ?, job_data = ?, status = ?, log_path = ?, error_summary = ? WHERE log_id = ?",
        )
        .bind(&entry.title)
        .bind(&entry.folder)
        .bind(filenames)
        .bind(job_data)
        .bind(status)
        .bind(&entry.log_path)
        .bind(&entry.error_summary)
        .bind(log_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_history(&self, log_id: i64) -> StoreResult<Option<String>> {
        let log_path: Option<String> = sqlx::query_scalar("SELECT log_path FROM history WHERE log_id = ?")
            .bind(log_id)
            .fetch_optional(&self.pool)
            .await?
            .flatten();

        sqlx::query("DELETE FROM history WHERE log_id = ?")
            .bind(log_id)
            .execute(&self.pool)
            .await?;

        Ok(log_path)
    }

    /// Delete every history row, returning the log paths so the caller can
    /// remove the underlying log files.
    pub async fn clear_history(&self) -> StoreResult<Vec<String>> {
        let paths: Vec<Option<String>> = sqlx::query_scalar("SELECT log_path FROM history")
            .fetch_all(&self.pool)
            .await?;
        sqlx::query("DELETE FROM history").execute(&self.pool).await?;
        Ok(paths.into_iter().flatten().collect())
    }

    pub async fn list_history(&self) -> StoreResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> =
            sqlx::query_as("SELECT * FROM history ORDER BY log_id DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(history_row_to_entry).collect()
    }

    pub async fn get_history(&self, log_id: i64) -> StoreResult<Option<HistoryEntry>> {
        let row: Option<HistoryRow> = sqlx::query_as("SELECT * FROM history WHERE log_id = ?")
            .bind(log_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(history_row_to_entry).transpose()
    }

    // ── scythes ──────────────────────────────────────────────────────────

    /// Insert a new scythe (when `scythe.id == 0`) or overwrite an existing
    /// one, returning the persisted id.
    pub async fn upsert_scythe(&self, scythe: &Scythe) -> StoreResult<i64> {
        let job_data = serde_json::to_string(&scythe.job_data)?;
        let schedule = scythe.schedule.as_ref().map(serde_json::to_string).transpose()?;

        if scythe.id == 0 {
            let result = sqlx::query(
                "INSERT INTO scythes (name, job_data, schedule) VALUES (?, ?, ?)",
            )
            .bind(&scythe.name)
            .bind(job_data)
            .bind(schedule)
            .execute(&self.pool)
            .await?;
            Ok(result.last_insert_rowid())
        } else {
            sqlx::query("UPDATE scythes SET name = ?, job_data = ?, schedule = ? WHERE id = ?")
                .bind(&scythe.name)
                .bind(job_data)
                .bind(schedule)
                .bind(scythe.id)
                .execute(&self.pool)
                .await?;
            Ok(scythe.id)
        }
    }

    pub async fn delete_scythe(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM scythes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_scythes(&self) -> StoreResult<Vec<Scythe>> {
        let rows: Vec<ScytheRow> = sqlx::query_as("SELECT * FROM scythes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(scythe_row_to_scythe).collect()
    }

    pub async fn get_scythe(&self, id: i64) -> StoreResult<Option<Scythe>> {
        let row: Option<ScytheRow> = sqlx::query_as("SELECT * FROM scythes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(scythe_row_to_scythe).transpose()
    }

    // ── users ────────────────────────────────────────────────────────────

    pub async fn create_user(&self, user: &User) -> StoreResult<()> {
        let permissions = serde_json::to_string(&user.permissions)?;
        sqlx::query("INSERT INTO users (username, password_hash, permissions) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(permissions)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(user_row_to_user).transpose()
    }

    pub async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY username ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(user_row_to_user).collect()
    }

    pub async fn update_user(&self, user: &User) -> StoreResult<()> {
        let permissions = serde_json::to_string(&user.permissions)?;
        sqlx::query("UPDATE users SET password_hash = ?, permissions = ? WHERE username = ?")
            .bind(&user.password_hash)
            .bind(permissions)
            .bind(&user.username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The `admin` account can never be deleted; callers should check this
    /// in `UserManager` before reaching the store, but the store enforces it
    /// too so there is exactly one place the invariant can be violated.
    pub async fn delete_user(&self, username: &str) -> StoreResult<bool> {
        if username == "admin" {
            return Err(StoreError::Validation(
                "the admin account cannot be deleted".to_string(),
            ));
        }
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn status_to_text(status: HistoryStatus) -> StoreResult<String> {
    match serde_json::to_value(status)? {
        Value::String(s) => Ok(s),
        other => Err(StoreError::Validation(format!(
            "history status serialized to non-string value: {other}"
        ))),
    }
}

fn status_from_text(s: &str) -> StoreResult<HistoryStatus> {
    Ok(serde_json::from_value(Value::String(s.to_string()))?)
}

fn history_row_to_entry(row: HistoryRow) -> StoreResult<HistoryEntry> {
    Ok(HistoryEntry {
        log_id: row.log_id,
        url: row.url,
        title: row.title,
        folder: row.folder,
        filenames: serde_json::from_str(&row.filenames)?,
        job_data: row.job_data.as_deref().map(serde_json::from_str).transpose()?,
        status: status_from_text(&row.status)?,
        log_path: row.log_path,
        error_summary: row.error_summary,
        timestamp: row.timestamp,
    })
}

fn scythe_row_to_scythe(row: ScytheRow) -> StoreResult<Scythe> {
    Ok(Scythe {
        id: row.id,
        name: row.name,
        job_data: serde_json::from_str(&row.job_data)?,
        schedule: row
            .schedule
            .as_deref()
            .map(serde_json::from_str::<Schedule>)
            .transpose()?,
    })
}

fn user_row_to_user(row: UserRow) -> StoreResult<User> {
    Ok(User {
        username: row.username,
        password_hash: row.password_hash,
        permissions: serde_json::from_str::<Permissions>(&row.permissions)?,
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
