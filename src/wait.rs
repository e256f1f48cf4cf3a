use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use crate::monitor;
use crate::posix;

/// How a wait for a child process ended.
///
/// Exactly one of these holds; an exit code and a terminating signal are never reported
/// together, and neither is reported for a wait that timed out or failed.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum WaitOutcome {
    /// The timeout elapsed first. The process is still running and has not been reaped.
    TimedOut,

    /// The wait itself failed with the contained `errno`, e.g. `ECHILD` when the PID is
    /// not a child of this process or was already reaped.
    WaitFailed(i32),

    /// The process exited normally with the contained exit code.
    Exited(u8),

    /// The process was terminated by the contained signal.
    Signaled(i32),
}

impl WaitOutcome {
    pub(crate) fn from_raw(status: i32) -> WaitOutcome {
        if libc::WIFEXITED(status) {
            WaitOutcome::Exited(libc::WEXITSTATUS(status) as u8)
        } else if libc::WIFSIGNALED(status) {
            WaitOutcome::Signaled(libc::WTERMSIG(status))
        } else {
            // Stopped and continued children are only reported when asked for.
            log::warn!("unrecognized wait status {status:#x}");
            WaitOutcome::WaitFailed(posix::EINVAL)
        }
    }

    fn failed(e: io::Error) -> WaitOutcome {
        WaitOutcome::WaitFailed(e.raw_os_error().unwrap_or(posix::EINVAL))
    }

    /// Returns the exit code if the process exited normally.
    pub fn code(&self) -> Option<u8> {
        match *self {
            WaitOutcome::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Returns the signal number if the process was killed by a signal.
    pub fn signal(&self) -> Option<i32> {
        match *self {
            WaitOutcome::Signaled(signal) => Some(signal),
            _ => None,
        }
    }

    /// True if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }

    /// True if the wait gave up before the process terminated.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }

    /// Returns the OS error of a failed wait.
    pub fn error(&self) -> Option<io::Error> {
        match *self {
            WaitOutcome::WaitFailed(errno) => Some(io::Error::from_raw_os_error(errno)),
            _ => None,
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WaitOutcome::TimedOut => write!(f, "timed out"),
            WaitOutcome::WaitFailed(errno) => {
                write!(f, "wait failed: {}", io::Error::from_raw_os_error(errno))
            }
            WaitOutcome::Exited(code) => write!(f, "exit code {code}"),
            WaitOutcome::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Waits for the child process `pid` to terminate.
///
/// Without a timeout this blocks until the process terminates or `waitpid` fails. With a
/// timeout it returns [`WaitOutcome::TimedOut`] once the timeout elapses, leaving the
/// process unreaped; a zero timeout just polls.
///
/// The timed wait does not spin. A background monitor thread, shared by all timed waits on
/// the same PID, blocks until the process terminates without reaping it, and the caller
/// sleeps until either the monitor reports or the deadline passes.
pub fn wait_subprocess(pid: u32, timeout: Option<Duration>) -> WaitOutcome {
    // 0 and negative PIDs select process groups in waitpid.
    let outcome = if pid == 0 || pid > i32::MAX as u32 {
        WaitOutcome::WaitFailed(posix::EINVAL)
    } else {
        match timeout {
            None => blocking_wait(pid),
            Some(timeout) => timed_wait(pid, timeout),
        }
    };
    log::debug!("wait for pid {pid}: {outcome}");
    outcome
}

fn blocking_wait(pid: u32) -> WaitOutcome {
    loop {
        match posix::waitpid(pid, 0) {
            Ok((_, status)) => return WaitOutcome::from_raw(status),
            Err(e) if e.raw_os_error() == Some(posix::EINTR) => continue,
            Err(e) => return WaitOutcome::failed(e),
        }
    }
}

fn try_reap(pid: u32) -> Option<WaitOutcome> {
    match posix::waitpid(pid, posix::WNOHANG) {
        Ok((0, _)) => None,
        Ok((_, status)) => Some(WaitOutcome::from_raw(status)),
        Err(e) => Some(WaitOutcome::failed(e)),
    }
}

fn timed_wait(pid: u32, timeout: Duration) -> WaitOutcome {
    if let Some(outcome) = try_reap(pid) {
        return outcome;
    }
    if timeout.is_zero() {
        return WaitOutcome::TimedOut;
    }
    let Some(deadline) = Instant::now().checked_add(timeout) else {
        return blocking_wait(pid);
    };
    match monitor::watch(pid).wait_until(deadline) {
        None => WaitOutcome::TimedOut,
        Some(Err(errno)) => WaitOutcome::WaitFailed(errno),
        // The monitor saw the exit without reaping, so this cannot block for long.
        Some(Ok(())) => try_reap(pid).unwrap_or_else(|| blocking_wait(pid)),
    }
}
