// SPDX-License-Identifier: MIT

//! `reap` - thin client for `reaperd`.
//!
//! Builds one [`reaper_wire::Request`] from the parsed subcommand, sends it
//! down the Unix socket, and pretty-prints whatever [`reaper_wire::Response`]
//! comes back. No daemon auto-start, no local state of its own.

mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reaper_core::model::{
    ClipFormat, JobMode, Permissions, Schedule, ScheduleInterval, Scythe, StopMode, VideoCodec,
};
use reaper_wire::{read_message, write_message, Request, Response};
use tokio::net::UnixStream;

use crate::error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "reap", version, about = "Talk to the reaperd daemon")]
struct Cli {
    /// Path to the daemon's Unix socket. Falls back to `$REAPER_SOCKET`, then
    /// `data/reaperd.sock`, when not given explicitly.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue a single job
    Enqueue {
        url: String,
        #[arg(long, default_value = "")]
        folder: String,
        #[arg(long, value_enum, default_value = "music")]
        mode: Mode,
        #[arg(long, default_value = "mp3")]
        format: String,
        #[arg(long, default_value = "0")]
        quality: String,
        #[arg(long)]
        embed_subs: bool,
        #[arg(long, value_enum, default_value = "compatibility")]
        codec: CliVideoCodec,
        #[arg(long, value_enum, default_value = "audio")]
        clip_format: CliClipFormat,
        #[arg(long)]
        custom_args: Option<String>,
        #[arg(long)]
        archive: bool,
        #[arg(long)]
        playlist_start: Option<u32>,
        #[arg(long)]
        playlist_end: Option<u32>,
        #[arg(long)]
        proxy: Option<String>,
        #[arg(long)]
        rate_limit: Option<String>,
    },
    /// Remove every queued job
    ClearQueue,
    /// Remove one queued job by id
    DeleteFromQueue { id: i64 },
    /// Reorder the queue to the given id sequence
    ReorderQueue { ids: Vec<i64> },

    /// Pause the worker after its current job
    Pause,
    /// Resume a paused worker
    Resume,
    /// Stop the in-flight job, keeping finished files
    StopSave,
    /// Stop the in-flight job, discarding finished files
    StopCancel,

    /// Print the most recent history rows
    HistorySummary,
    /// Print one history row by id
    HistoryItem { log_id: i64 },
    /// Delete one history row, printing its log path (if any)
    DeleteFromHistory { log_id: i64 },
    /// Delete every history row, printing the log paths removed
    ClearHistory,
    /// Write a scheduler-style notification row
    Notify { text: String },

    /// Print the full state snapshot
    Snapshot,
    /// Print the current version counters
    Versions,

    /// List saved scythes
    ScytheList,
    /// Print one scythe by id
    ScytheGet { id: i64 },
    /// Add a scythe that fires `url` daily at `time` (HH:MM, user timezone)
    ScytheAdd {
        name: String,
        url: String,
        #[arg(long, default_value = "")]
        folder: String,
        #[arg(long)]
        time: String,
    },
    /// Delete a saved scythe by id
    ScytheDelete { id: i64 },

    /// Print one user by name
    UserGet { username: String },
    /// List every user
    UserList,
    /// Add a user
    UserAdd {
        username: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        custom_mode: bool,
    },
    /// Delete a user by name
    UserDelete { username: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Mode {
    Music,
    Video,
    Clip,
    Custom,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliVideoCodec {
    Compatibility,
    Quality,
}

impl From<CliVideoCodec> for VideoCodec {
    fn from(codec: CliVideoCodec) -> Self {
        match codec {
            CliVideoCodec::Compatibility => VideoCodec::Compatibility,
            CliVideoCodec::Quality => VideoCodec::Quality,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliClipFormat {
    Audio,
    Video,
}

impl From<CliClipFormat> for ClipFormat {
    fn from(format: CliClipFormat) -> Self {
        match format {
            CliClipFormat::Audio => ClipFormat::Audio,
            CliClipFormat::Video => ClipFormat::Video,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("reap: {err}");
        std::process::exit(1);
    }
}

fn socket_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os("REAPER_SOCKET").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data/reaperd.sock"))
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let socket = socket_path(cli.socket);
    let request = build_request(cli.command)?;
    let response = send(&socket, &request).await?;
    print_response(&response);
    if let Response::Error { message } = response {
        return Err(CliError::Rejected(message));
    }
    Ok(())
}

fn build_request(command: Command) -> CliResult<Request> {
    Ok(match command {
        Command::Enqueue {
            url,
            folder,
            mode,
            format,
            quality,
            embed_subs,
            codec,
            clip_format,
            custom_args,
            archive,
            playlist_start,
            playlist_end,
            proxy,
            rate_limit,
        } => {
            let mode = match mode {
                Mode::Music => JobMode::Music { format, quality },
                Mode::Video => JobMode::Video { quality, format, embed_subs, codec: codec.into() },
                Mode::Clip => JobMode::Clip { format: clip_format.into() },
                Mode::Custom => JobMode::Custom {
                    custom_args: custom_args.ok_or(CliError::MissingArg("--custom-args"))?,
                },
            };
            Request::Enqueue {
                spec: reaper_core::model::JobSpec {
                    url,
                    folder,
                    resolved_folder: None,
                    archive,
                    playlist_start,
                    playlist_end,
                    proxy,
                    rate_limit,
                    mode,
                },
            }
        }
        Command::ClearQueue => Request::ClearQueue,
        Command::DeleteFromQueue { id } => Request::DeleteFromQueue { id },
        Command::ReorderQueue { ids } => Request::ReorderQueue { ids },

        Command::Pause => Request::Pause,
        Command::Resume => Request::Resume,
        Command::StopSave => Request::RequestStop { mode: StopMode::Save },
        Command::StopCancel => Request::RequestStop { mode: StopMode::Cancel },

        Command::HistorySummary => Request::HistorySummary,
        Command::HistoryItem { log_id } => Request::GetHistoryItem { log_id },
        Command::DeleteFromHistory { log_id } => Request::DeleteFromHistory { log_id },
        Command::ClearHistory => Request::ClearHistory,
        Command::Notify { text } => Request::AddNotification { text },

        Command::Snapshot => Request::Snapshot,
        Command::Versions => Request::Versions,

        Command::ScytheList => Request::ScytheList,
        Command::ScytheGet { id } => Request::ScytheGet { id },
        Command::ScytheAdd { name, url, folder, time } => Request::ScytheAdd {
            scythe: Scythe {
                id: 0,
                name,
                job_data: reaper_core::model::JobSpec {
                    url,
                    folder,
                    resolved_folder: None,
                    archive: false,
                    playlist_start: None,
                    playlist_end: None,
                    proxy: None,
                    rate_limit: None,
                    mode: JobMode::Music { format: "mp3".to_string(), quality: "0".to_string() },
                },
                schedule: Some(Schedule { enabled: true, interval: ScheduleInterval::Daily, time, weekdays: Vec::new() }),
            },
        },
        Command::ScytheDelete { id } => Request::ScytheDelete { id },

        Command::UserGet { username } => Request::UserGet { username },
        Command::UserList => Request::UserList,
        Command::UserAdd { username, password, custom_mode } => Request::UserAdd {
            username,
            password,
            permissions: Permissions { custom_mode, extra: Default::default() },
        },
        Command::UserDelete { username } => Request::UserDelete { username },
    })
}

async fn send(socket: &PathBuf, request: &Request) -> CliResult<Response> {
    let stream = UnixStream::connect(socket).await.map_err(|err| CliError::Connect(socket.clone(), err))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = tokio::io::BufReader::new(read_half);

    write_message(&mut write_half, request).await?;
    let response = read_message(&mut reader).await?;
    Ok(response)
}

fn print_response(response: &Response) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{response:?}"),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
