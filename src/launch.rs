use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use thiserror::Error;

use crate::posix;
use crate::wait::{WaitOutcome, wait_subprocess};

/// Exit status of a child whose `execvp` failed.
///
/// The failure is not reported to the parent at launch time; it only shows up as this
/// exit code once the child is waited for.
pub const EXEC_FAILURE_STATUS: u8 = 1;

/// Error returned when a child process could not be launched.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Creating one of the three standard stream pipes failed. Pipes created before the
    /// failure have been closed.
    #[error("Failed to create pipe: {0}")]
    Pipe(#[source] io::Error),

    /// `fork()` failed, so no child exists.
    #[error("Failed to create child process: {0}")]
    Fork(#[source] io::Error),

    /// The program path or an argument cannot be passed to `execvp`.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A child process started by [`fork_execvp`] or [`Launch::spawn`].
///
/// The three pipe ends belong to the caller. Dropping a stream closes it, which is how
/// the child sees EOF on its standard input.
///
/// Dropping a `Child` does not wait for the process. Reaping it with [`wait`](Self::wait)
/// or [`wait_timeout`](Self::wait_timeout) is the caller's job.
#[derive(Debug)]
#[non_exhaustive]
pub struct Child {
    /// Write end of the pipe connected to the child's standard input.
    pub stdin: Option<File>,
    /// Read end of the pipe connected to the child's standard output.
    pub stdout: Option<File>,
    /// Read end of the pipe connected to the child's standard error.
    pub stderr: Option<File>,
    pid: u32,
}

impl Child {
    /// Returns the PID of the child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Blocks until the child terminates.
    pub fn wait(&self) -> WaitOutcome {
        wait_subprocess(self.pid, None)
    }

    /// Waits for the child to terminate, giving up after `timeout`.
    ///
    /// On [`WaitOutcome::TimedOut`] the child is left running and can be waited for again.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        wait_subprocess(self.pid, Some(timeout))
    }

    /// Sends `signal` to the child.
    ///
    /// Once the child has been reaped its PID may be reused, so this should only be
    /// called on a child that has not yet been successfully waited for.
    pub fn send_signal(&self, signal: i32) -> io::Result<()> {
        posix::kill(self.pid, signal)
    }

    /// Sends `SIGKILL` to the child.
    pub fn kill(&self) -> io::Result<()> {
        self.send_signal(posix::SIGKILL)
    }
}

/// Builder for launching a program with piped standard streams.
///
/// ```no_run
/// use runtime_support::Launch;
///
/// let child = Launch::new("sh").args(["-c", "exit 7"]).spawn()?;
/// assert_eq!(child.wait().code(), Some(7));
/// # Ok::<(), runtime_support::LaunchError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Launch {
    program: OsString,
    argv0: Option<OsString>,
    args: Vec<OsString>,
}

impl Launch {
    /// Constructs a new `Launch` that runs `program`, looked up in `PATH` if it contains
    /// no slash.
    pub fn new(program: impl AsRef<OsStr>) -> Launch {
        Launch {
            program: program.as_ref().to_owned(),
            argv0: None,
            args: vec![],
        }
    }

    /// Appends `arg` to the argument list.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Launch {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Extends the argument list with `args`.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Launch {
        self.args.extend(args.into_iter().map(|x| x.as_ref().to_owned()));
        self
    }

    /// Overrides `argv[0]`, which otherwise is the program name.
    pub fn argv0(mut self, argv0: impl AsRef<OsStr>) -> Launch {
        self.argv0 = Some(argv0.as_ref().to_owned());
        self
    }

    /// Returns the full argument vector the child will receive.
    pub fn argv(&self) -> Vec<OsString> {
        let argv0 = self.argv0.as_ref().unwrap_or(&self.program);
        std::iter::once(argv0.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Starts the program.
    ///
    /// A program that cannot be executed is not an error here: the child exits with
    /// [`EXEC_FAILURE_STATUS`].
    pub fn spawn(&self) -> Result<Child, LaunchError> {
        spawn(&self.program, &self.argv())
    }
}

/// Launches `program` with the full argument vector `argv` (including `argv[0]`).
///
/// The child's standard input, output and error are connected to fresh pipes whose
/// parent ends are returned in the [`Child`]. `program` is resolved through `PATH` the way
/// `execvp` does. An empty `argv` is replaced by `[program]`.
pub fn fork_execvp(
    program: impl AsRef<OsStr>,
    argv: &[impl AsRef<OsStr>],
) -> Result<Child, LaunchError> {
    let program = program.as_ref();
    let mut argv: Vec<OsString> = argv.iter().map(|a| a.as_ref().to_owned()).collect();
    if argv.is_empty() {
        argv.push(program.to_owned());
    }
    spawn(program, &argv)
}

fn check_nul(s: &OsStr) -> Result<(), LaunchError> {
    if s.as_bytes().contains(&0) {
        return Err(LaunchError::InvalidArgument(format!(
            "{s:?} contains a NUL byte"
        )));
    }
    Ok(())
}

fn spawn(program: &OsStr, argv: &[OsString]) -> Result<Child, LaunchError> {
    check_nul(program)?;
    for arg in argv {
        check_nul(arg)?;
    }
    let exec = posix::prep_execvp(program, argv)
        .map_err(|e| LaunchError::InvalidArgument(e.to_string()))?;

    // (read, write) for stdin, stdout and stderr. A failure drops, and so closes, the
    // pipes that were already created. All six ends are close-on-exec from creation, so
    // only the dup2 copies survive the exec, here and in children forked concurrently.
    let (stdin_read, stdin_write) = posix::pipe().map_err(LaunchError::Pipe)?;
    let (stdout_read, stdout_write) = posix::pipe().map_err(LaunchError::Pipe)?;
    let (stderr_read, stderr_write) = posix::pipe().map_err(LaunchError::Pipe)?;

    let pid = match unsafe { posix::fork() }.map_err(LaunchError::Fork)? {
        Some(pid) => pid,
        None => {
            let _ = redirect_and_exec(exec, [&stdin_read, &stdout_write, &stderr_write]);
            posix::_exit(EXEC_FAILURE_STATUS);
        }
    };
    log::debug!("launched {program:?} as pid {pid}");

    // stdin_read, stdout_write and stderr_write are dropped here, leaving the child as
    // the only holder of its ends.
    Ok(Child {
        stdin: Some(stdin_write),
        stdout: Some(stdout_read),
        stderr: Some(stderr_read),
        pid,
    })
}

// Runs in the forked child: no allocation, no logging.
fn redirect_and_exec(exec: impl FnOnce() -> io::Error, child_ends: [&File; 3]) -> io::Error {
    for (target, end) in (0..).zip(child_ends) {
        let fd = end.as_raw_fd();
        let redirected = if fd == target {
            // dup2 onto itself is a no-op that would leave close-on-exec set.
            posix::set_cloexec(end, false)
        } else {
            posix::dup2(fd, target)
        };
        if let Err(e) = redirected {
            return e;
        }
    }
    if let Err(e) = posix::reset_sigpipe() {
        return e;
    }
    exec()
}
