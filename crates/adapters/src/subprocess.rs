// SPDX-License-Identifier: MIT

//! Spawns the extractor process in its own process group so a cancel can
//! signal the whole group (the extractor plus any ffmpeg children it spawns),
//! not just the immediate child.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::error::{AdapterError, AdapterResult};

pub struct ExtractorChild {
    pub child: Child,
    pub pid: u32,
}

impl ExtractorChild {
    pub fn stdout_lines(&mut self) -> AdapterResult<Lines<BufReader<ChildStdout>>> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Io(io::Error::other("stdout not piped")))?;
        Ok(BufReader::new(stdout).lines())
    }

    pub fn stderr_lines(&mut self) -> AdapterResult<Lines<BufReader<ChildStderr>>> {
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| AdapterError::Io(io::Error::other("stderr not piped")))?;
        Ok(BufReader::new(stderr).lines())
    }
}

/// Spawn `argv[0]` with `argv[1..]`, stdout/stderr piped, in a fresh process
/// group so [`terminate_group`]/[`kill_group`] reach any children it forks
/// (notably ffmpeg, for merges and audio extraction).
pub fn spawn_extractor(argv: &[String]) -> AdapterResult<ExtractorChild> {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    let child = cmd.spawn().map_err(AdapterError::Spawn)?;
    let pid = child
        .id()
        .ok_or_else(|| AdapterError::Spawn(io::Error::other("child exited before pid was read")))?;
    Ok(ExtractorChild { child, pid })
}

/// Ask the process group to exit (`SIGTERM` on unix). Callers wait a grace
/// period before escalating to [`kill_group`].
#[cfg(unix)]
pub fn terminate_group(pid: u32) -> AdapterResult<()> {
    send_signal(pid, nix::sys::signal::Signal::SIGTERM)
}

#[cfg(windows)]
pub fn terminate_group(_pid: u32) -> AdapterResult<()> {
    // No safe (non-FFI) equivalent of CTRL_BREAK under `unsafe_code = "forbid"`;
    // the grace period simply elapses and the caller escalates to kill_group.
    Ok(())
}

/// Forcibly end the process group (`SIGKILL` on unix, `TerminateProcess` via
/// `Child::start_kill` on windows — see callers).
#[cfg(unix)]
pub fn kill_group(pid: u32) -> AdapterResult<()> {
    send_signal(pid, nix::sys::signal::Signal::SIGKILL)
}

#[cfg(windows)]
pub fn kill_group(_pid: u32) -> AdapterResult<()> {
    Ok(())
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> AdapterResult<()> {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pid as i32), signal).map_err(|errno| AdapterError::Signal {
        pid,
        source: io::Error::from_raw_os_error(errno as i32),
    })
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
