use std::path::PathBuf;

use super::*;
use crate::model::{Job, JobSpec};

fn job(mode: JobMode) -> Job {
    Job::new(
        1,
        JobSpec {
            url: "https://example.com/watch?v=abc".to_string(),
            folder: "clips".to_string(),
            resolved_folder: None,
            archive: false,
            playlist_start: None,
            playlist_end: None,
            proxy: None,
            rate_limit: None,
            mode,
        },
    )
}

fn inputs<'a>(job: &'a Job, scratch: &'a Path, yt_dlp: &'a Path, ffmpeg: &'a Path) -> CommandInputs<'a> {
    CommandInputs {
        job,
        scratch_dir: scratch,
        cookie_file: None,
        yt_dlp_bin: yt_dlp,
        ffmpeg_dir: ffmpeg,
    }
}

#[test]
fn music_job_builds_extraction_flags() {
    let job = job(JobMode::Music {
        format: "mp3".to_string(),
        quality: "0".to_string(),
    });
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    assert_eq!(argv[0], "/usr/bin/yt-dlp");
    assert!(argv.contains(&"--audio-format".to_string()));
    assert!(argv.contains(&"mp3".to_string()));
    assert_eq!(argv.last().unwrap(), &job.url);
}

#[test]
fn music_job_builds_the_exact_argv_including_metadata_postprocessing() {
    let job = job(JobMode::Music {
        format: "mp3".to_string(),
        quality: "0".to_string(),
    });
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    assert_eq!(
        argv,
        vec![
            "/usr/bin/yt-dlp",
            "--sleep-interval",
            "3",
            "--max-sleep-interval",
            "10",
            "--ffmpeg-location",
            "/usr/bin",
            "--newline",
            "--progress-template",
            "%(progress)j",
            "--print-json",
            "-o",
            "/tmp/scratch/%(title)s.%(ext)s",
            "-f",
            "bestaudio/best",
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
            "--embed-metadata",
            "--embed-thumbnail",
            "--postprocessor-args",
            "-metadata album=\"%(album)s\"",
            "--parse-metadata",
            "playlist_index:%(track_number)s",
            "--parse-metadata",
            "uploader:%(artist)s",
            "https://example.com/watch?v=abc",
        ]
    );
}

#[test]
fn music_playlist_job_sets_album_metadata_to_the_folder() {
    let job = Job::new(
        1,
        JobSpec {
            url: "https://example.com/playlist?list=abc".to_string(),
            folder: "clips".to_string(),
            resolved_folder: None,
            archive: false,
            playlist_start: None,
            playlist_end: None,
            proxy: None,
            rate_limit: None,
            mode: JobMode::Music { format: "mp3".to_string(), quality: "0".to_string() },
        },
    );
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    assert!(argv.contains(&"-metadata album=\"clips\"".to_string()));
    assert!(argv.contains(&"playlist_index:%(track_number)s".to_string()));
    assert!(argv.contains(&"uploader:%(artist)s".to_string()));
}

#[test]
fn video_job_with_compatibility_codec_and_height_filter() {
    let job = job(JobMode::Video {
        quality: "720p".to_string(),
        format: "mp4".to_string(),
        embed_subs: true,
        codec: VideoCodec::Compatibility,
    });
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    let format_idx = argv.iter().position(|a| a == "-f").unwrap();
    assert!(argv[format_idx + 1].contains("height<=720"));
    assert!(argv.contains(&"--embed-subs".to_string()));
}

#[test]
fn playlist_range_adds_start_end_and_ignore_errors() {
    let mut job = job(JobMode::Clip {
        format: ClipFormat::Audio,
    });
    job.playlist_start = Some(2);
    job.playlist_end = Some(9);
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    assert!(argv.windows(2).any(|w| w == ["--playlist-start", "2"]));
    assert!(argv.windows(2).any(|w| w == ["--playlist-end", "9"]));
    assert!(argv.contains(&"--ignore-errors".to_string()));
}

#[test]
fn archive_flag_points_at_scratch_temp_archive() {
    let mut job = job(JobMode::Clip {
        format: ClipFormat::Video,
    });
    job.archive = true;
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    let idx = argv.iter().position(|a| a == "--download-archive").unwrap();
    assert_eq!(argv[idx + 1], "/tmp/scratch/archive.temp.txt");
}

#[test]
fn custom_mode_splits_shell_like_args() {
    let job = job(JobMode::Custom {
        custom_args: "--no-playlist --format best".to_string(),
    });
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    let argv = build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).expect("builds");

    assert!(argv.contains(&"--no-playlist".to_string()));
    assert!(argv.windows(2).any(|w| w == ["--format", "best"]));
}

#[test]
fn custom_mode_rejects_unbalanced_quotes() {
    let job = job(JobMode::Custom {
        custom_args: "--format \"unterminated".to_string(),
    });
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    assert!(build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).is_err());
}

#[test]
fn invalid_job_is_rejected_before_argv_is_built() {
    let mut job = job(JobMode::Clip {
        format: ClipFormat::Audio,
    });
    job.url = String::new();
    let scratch = PathBuf::from("/tmp/scratch");
    let yt_dlp = PathBuf::from("/usr/bin/yt-dlp");
    let ffmpeg = PathBuf::from("/usr/bin");

    assert!(build_argv(inputs(&job, &scratch, &yt_dlp, &ffmpeg)).is_err());
}
