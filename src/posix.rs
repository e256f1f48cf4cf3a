use std::ffi::{CStr, CString, OsStr, OsString};
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::mem;
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::ptr;

pub use libc::{EINTR, EINVAL, ERANGE, SIGKILL};

fn check_err<T: Ord + Default>(num: T) -> Result<T> {
    if num < T::default() {
        return Err(Error::last_os_error());
    }
    Ok(num)
}

/// Create a pipe whose ends are both close-on-exec.
#[cfg(not(target_vendor = "apple"))]
pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
}

/// Create a pipe whose ends are both close-on-exec.
///
/// Without `pipe2` the flag is set after the fact, so a `fork` racing with this call
/// can still see the ends without it.
#[cfg(target_vendor = "apple")]
pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    let (read, write) = unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) };
    set_cloexec(&read, true)?;
    set_cloexec(&write, true)?;
    Ok((read, write))
}

pub const F_GETFD: i32 = libc::F_GETFD;
pub const F_SETFD: i32 = libc::F_SETFD;
pub const FD_CLOEXEC: i32 = libc::FD_CLOEXEC;

pub fn fcntl(fd: i32, cmd: i32, arg1: Option<i32>) -> Result<i32> {
    check_err(unsafe {
        match arg1 {
            Some(arg1) => libc::fcntl(fd, cmd, arg1),
            None => libc::fcntl(fd, cmd),
        }
    })
}

pub fn set_cloexec(f: &File, cloexec: bool) -> Result<()> {
    let fd = f.as_raw_fd();
    let old = fcntl(fd, F_GETFD, None)?;
    let new = if cloexec {
        old | FD_CLOEXEC
    } else {
        old & !FD_CLOEXEC
    };
    if new != old {
        fcntl(fd, F_SETFD, Some(new))?;
    }
    Ok(())
}

/// Fork the current process.
///
/// Returns `Some(pid)` in the parent and `None` in the child.
///
/// # Safety
///
/// The child of a multi-threaded parent may only perform async-signal-safe operations
/// until it calls `exec` or `_exit`. In particular it must not allocate.
pub unsafe fn fork() -> Result<Option<u32>> {
    let pid = check_err(unsafe { libc::fork() })?;
    Ok(if pid == 0 { None } else { Some(pid as u32) })
}

pub fn os_to_cstring(s: &OsStr) -> Result<CString> {
    CString::new(s.as_bytes()).map_err(|_| Error::from_raw_os_error(libc::EINVAL))
}

#[derive(Debug)]
struct CVec {
    // Individual C strings; they are not unused as rustc thinks, they
    // are pointed to by elements of self.ptrs.
    #[allow(dead_code)]
    strings: Vec<CString>,

    // nullptr-terminated vector of pointers to data inside
    // self.strings.
    ptrs: Vec<*const c_char>,
}

impl CVec {
    fn new(slice: &[impl AsRef<OsStr>]) -> Result<CVec> {
        let strings = slice
            .iter()
            .map(|x| os_to_cstring(x.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ptrs = strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(CVec { strings, ptrs })
    }

    fn as_c_vec(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}

/// Prepare everything `execvp` needs so that the returned closure does not allocate.
///
/// The closure only returns if the exec failed, yielding the OS error.
pub fn prep_execvp(cmd: &OsStr, args: &[OsString]) -> Result<impl FnOnce() -> Error + use<>> {
    let cmd = os_to_cstring(cmd)?;
    let argv = CVec::new(args)?;
    Ok(move || {
        unsafe {
            libc::execvp(cmd.as_ptr(), argv.as_c_vec());
        }
        Error::last_os_error()
    })
}

pub fn dup2(oldfd: i32, newfd: i32) -> Result<()> {
    check_err(unsafe { libc::dup2(oldfd, newfd) })?;
    Ok(())
}

pub fn _exit(status: u8) -> ! {
    unsafe { libc::_exit(status as c_int) }
}

pub fn reset_sigpipe() -> Result<()> {
    // libstd ignores SIGPIPE, and signal-handling libraries often set
    // a mask. Both are inherited across exec, so restore the defaults
    // that ordinary Unix programs expect.
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        check_err(libc::sigemptyset(&mut set))?;
        check_err(libc::pthread_sigmask(libc::SIG_SETMASK, &set, ptr::null_mut()))?;
        let ret = libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        if ret == libc::SIG_ERR {
            return Err(Error::last_os_error());
        }
    }
    Ok(())
}

pub const WNOHANG: i32 = libc::WNOHANG;

/// Returns the pid reported by `waitpid` and the raw wait status.
pub fn waitpid(pid: u32, flags: i32) -> Result<(u32, i32)> {
    let mut status = 0 as c_int;
    let pid = check_err(unsafe {
        libc::waitpid(pid as libc::pid_t, &mut status as *mut c_int, flags as c_int)
    })?;
    Ok((pid as u32, status))
}

/// Block until `pid` has terminated, leaving it waitable.
pub fn wait_exited_nowait(pid: u32) -> Result<()> {
    let mut info: libc::siginfo_t = unsafe { mem::zeroed() };
    check_err(unsafe {
        libc::waitid(
            libc::P_PID,
            pid as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOWAIT,
        )
    })?;
    Ok(())
}

pub fn kill(pid: u32, signal: i32) -> Result<()> {
    check_err(unsafe { libc::kill(pid as libc::pid_t, signal) })?;
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "emscripten"))]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__errno() }
}

#[cfg(any(target_vendor = "apple", target_os = "freebsd", target_os = "dragonfly"))]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__error() }
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::___errno() }
}

pub fn errno() -> i32 {
    Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub fn set_errno(value: i32) {
    unsafe { *errno_location() = value };
}

/// Run `f` with `errno` cleared, returning its result and the `errno` it left behind.
pub fn with_errno<T>(f: impl FnOnce() -> T) -> (T, i32) {
    set_errno(0);
    let value = f();
    (value, errno())
}

pub fn isspace(b: u8) -> bool {
    unsafe { libc::isspace(b as c_int) != 0 }
}

/// Result of one of the `strto*` family.
#[derive(Debug, Copy, Clone)]
pub struct Strto<T> {
    pub value: T,
    /// Number of bytes consumed from the start of the input.
    pub consumed: usize,
    pub errno: i32,
}

fn strto<T>(s: &CStr, f: impl FnOnce(*const c_char, *mut *mut c_char) -> T) -> Strto<T> {
    let start = s.as_ptr();
    let mut end: *mut c_char = ptr::null_mut();
    let (value, errno) = with_errno(|| f(start, &mut end));
    let consumed = if end.is_null() {
        0
    } else {
        end as usize - start as usize
    };
    Strto {
        value,
        consumed,
        errno,
    }
}

pub fn strtoll(s: &CStr) -> Strto<i64> {
    strto(s, |p, end| unsafe { libc::strtoll(p, end, 10) })
}

pub fn strtoull(s: &CStr) -> Strto<u64> {
    strto(s, |p, end| unsafe { libc::strtoull(p, end, 10) })
}

pub fn strtod(s: &CStr) -> Strto<f64> {
    strto(s, |p, end| unsafe { libc::strtod(p, end) })
}

pub fn strtof(s: &CStr) -> Strto<f32> {
    strto(s, |p, end| unsafe { libc::strtof(p, end) })
}

/// Format a double with a single-conversion `printf` format such as `%f` or `%.*e`.
///
/// When `precision` is given, the format must consume it through `*`.
pub fn snprintf_f64(fmt: &CStr, precision: Option<c_int>, value: f64) -> Result<String> {
    let print = |buf: *mut c_char, len: usize| unsafe {
        match precision {
            Some(p) => libc::snprintf(buf, len, fmt.as_ptr(), p, value),
            None => libc::snprintf(buf, len, fmt.as_ptr(), value),
        }
    };
    let needed = check_err(print(ptr::null_mut(), 0))? as usize;
    let mut buf = vec![0u8; needed + 1];
    check_err(print(buf.as_mut_ptr().cast(), buf.len()))?;
    buf.truncate(needed);
    String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

pub use libc::{CLOCK_MONOTONIC, CLOCK_REALTIME};

pub fn clock_gettime(clock: libc::clockid_t) -> Result<libc::timespec> {
    let mut ts: libc::timespec = unsafe { mem::zeroed() };
    check_err(unsafe { libc::clock_gettime(clock, &mut ts) })?;
    Ok(ts)
}

// XSI fixes CLOCKS_PER_SEC at one million on every conforming system.
pub const CLOCKS_PER_SEC: i64 = 1_000_000;

/// Processor time consumed by this process, in `CLOCKS_PER_SEC` units, like `clock()`.
pub fn clock() -> Result<i64> {
    let ts = clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID)?;
    Ok(ts.tv_sec as i64 * CLOCKS_PER_SEC + ts.tv_nsec as i64 / 1_000)
}

fn broken_down(
    t: libc::time_t,
    f: unsafe extern "C" fn(*const libc::time_t, *mut libc::tm) -> *mut libc::tm,
) -> Result<libc::tm> {
    let mut tm: libc::tm = unsafe { mem::zeroed() };
    let (ret, errno) = with_errno(|| unsafe { f(&t, &mut tm) });
    if ret.is_null() {
        return Err(Error::from_raw_os_error(if errno != 0 {
            errno
        } else {
            libc::EOVERFLOW
        }));
    }
    Ok(tm)
}

pub fn gmtime_r(t: libc::time_t) -> Result<libc::tm> {
    broken_down(t, libc::gmtime_r)
}

pub fn localtime_r(t: libc::time_t) -> Result<libc::tm> {
    broken_down(t, libc::localtime_r)
}

fn linear(
    tm: &mut libc::tm,
    f: unsafe extern "C" fn(*mut libc::tm) -> libc::time_t,
) -> Result<libc::time_t> {
    let (ret, errno) = with_errno(|| unsafe { f(tm) });
    // -1 is also a valid time (one second before the epoch), so only errno decides.
    if ret == -1 && errno != 0 {
        return Err(Error::from_raw_os_error(errno));
    }
    Ok(ret)
}

pub fn timegm(tm: &mut libc::tm) -> Result<libc::time_t> {
    linear(tm, libc::timegm)
}

pub fn mktime(tm: &mut libc::tm) -> Result<libc::time_t> {
    linear(tm, libc::mktime)
}
