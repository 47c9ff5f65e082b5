// SPDX-License-Identifier: MIT

//! Translates a [`Job`] into the argv vector used to invoke the extractor
//! binary (conventionally `yt-dlp`). Pure and I/O-free: callers resolve
//! paths, stat the cookie file, and locate the binaries before calling in.

use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::model::{ClipFormat, Job, JobMode, VideoCodec};

/// Everything [`build_argv`] needs that isn't already on the [`Job`] itself.
pub struct CommandInputs<'a> {
    pub job: &'a Job,
    pub scratch_dir: &'a Path,
    /// `Some(path)` only when the caller has already verified the cookie
    /// file exists and is non-empty.
    pub cookie_file: Option<&'a Path>,
    pub yt_dlp_bin: &'a Path,
    pub ffmpeg_dir: &'a Path,
}

/// Build the full argv for one extractor invocation, URL included as the
/// final element.
pub fn build_argv(inputs: CommandInputs<'_>) -> CoreResult<Vec<String>> {
    let CommandInputs {
        job,
        scratch_dir,
        cookie_file,
        yt_dlp_bin,
        ffmpeg_dir,
    } = inputs;

    job.validate()?;

    let is_playlist = job.playlist_start.is_some()
        || job.playlist_end.is_some()
        || job.url.contains("list=");

    let mut argv = vec![yt_dlp_bin.display().to_string()];
    argv.extend(str_args([
        "--sleep-interval",
        "3",
        "--max-sleep-interval",
        "10",
    ]));
    argv.push("--ffmpeg-location".to_string());
    argv.push(ffmpeg_dir.display().to_string());

    // One JSON progress dict per tick, one JSON info object per finished item.
    argv.extend(str_args([
        "--newline",
        "--progress-template",
        "%(progress)j",
        "--print-json",
    ]));

    let out_template = if is_playlist {
        "%(playlist_index)s - %(title)s.%(ext)s"
    } else {
        "%(title)s.%(ext)s"
    };
    argv.push("-o".to_string());
    argv.push(scratch_dir.join(out_template).display().to_string());

    if let Some(start) = job.playlist_start {
        argv.push("--playlist-start".to_string());
        argv.push(start.to_string());
    }
    if let Some(end) = job.playlist_end {
        argv.push("--playlist-end".to_string());
        argv.push(end.to_string());
    }
    if is_playlist {
        argv.push("--ignore-errors".to_string());
    }

    if let Some(cookies) = cookie_file {
        argv.push("--cookies".to_string());
        argv.push(cookies.display().to_string());
    }

    if job.archive {
        argv.push("--download-archive".to_string());
        argv.push(
            scratch_dir
                .join("archive.temp.txt")
                .display()
                .to_string(),
        );
    }

    if let Some(proxy) = &job.proxy {
        argv.push("--proxy".to_string());
        argv.push(proxy.clone());
    }
    if let Some(rate) = &job.rate_limit {
        argv.push("--limit-rate".to_string());
        argv.push(rate.clone());
    }

    append_mode_args(&mut argv, &job.mode, is_playlist, &job.folder)?;

    argv.push(job.url.clone());
    Ok(argv)
}

fn append_mode_args(
    argv: &mut Vec<String>,
    mode: &JobMode,
    is_playlist: bool,
    folder: &str,
) -> CoreResult<()> {
    match mode {
        JobMode::Music { format, quality } => {
            argv.extend(str_args(["-f", "bestaudio/best", "-x"]));
            argv.push("--audio-format".to_string());
            argv.push(format.clone());
            argv.push("--audio-quality".to_string());
            argv.push(quality.clone());
            argv.extend(str_args(["--embed-metadata", "--embed-thumbnail"]));

            let album = if is_playlist && !folder.is_empty() { folder } else { "%(album)s" };
            let safe_album = album.replace('"', "'");
            argv.push("--postprocessor-args".to_string());
            argv.push(format!("-metadata album=\"{safe_album}\""));
            argv.push("--parse-metadata".to_string());
            argv.push("playlist_index:%(track_number)s".to_string());
            argv.push("--parse-metadata".to_string());
            argv.push("uploader:%(artist)s".to_string());
        }
        JobMode::Video {
            quality,
            format,
            embed_subs,
            codec,
        } => {
            let height_filter = height_filter(quality);
            let format_selector = match (codec, &height_filter) {
                (VideoCodec::Compatibility, Some(h)) => format!(
                    "bestvideo[ext=mp4][height<={h}]+bestaudio[ext=m4a]/best[ext=mp4][height<={h}]/best"
                ),
                (VideoCodec::Compatibility, None) => {
                    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
                }
                (VideoCodec::Quality, Some(h)) => {
                    format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best")
                }
                (VideoCodec::Quality, None) => "bestvideo+bestaudio/best".to_string(),
            };
            argv.push("-f".to_string());
            argv.push(format_selector);
            argv.push("--merge-output-format".to_string());
            argv.push(format.clone());
            if *embed_subs {
                argv.extend(str_args(["--embed-subs", "--sub-langs", "en.*"]));
            }
        }
        JobMode::Clip { format } => match format {
            ClipFormat::Audio => {
                argv.extend(str_args([
                    "-f",
                    "bestaudio/best",
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "0",
                ]));
            }
            ClipFormat::Video => {
                argv.extend(str_args([
                    "-f",
                    "bestvideo+bestaudio/best",
                    "--merge-output-format",
                    "mp4",
                ]));
            }
        },
        JobMode::Custom { custom_args } => {
            let extra = shlex::split(custom_args).ok_or_else(|| {
                CoreError::validation(format!("unparsable custom_args: {custom_args:?}"))
            })?;
            argv.extend(extra);
        }
    }
    Ok(())
}

/// Parse a quality string like `"720p"` into its height, if it has that shape.
fn height_filter(quality: &str) -> Option<u32> {
    quality.strip_suffix('p').and_then(|n| n.parse().ok())
}

fn str_args<const N: usize>(items: [&str; N]) -> impl Iterator<Item = String> + '_ {
    items.into_iter().map(str::to_string)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
