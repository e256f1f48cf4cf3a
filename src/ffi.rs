//! Flat C ABI.
//!
//! Every function takes primitive arguments and reports through out-parameters. None of
//! the pointer arguments are checked: callers must pass pointers valid for the number of
//! elements each function documents, and NUL-terminated strings where a C string is
//! expected.

use std::cell::Cell;
use std::ffi::{CStr, CString, OsStr};
use std::io::{self, Write};
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::IntoRawFd;
use std::{ptr, slice};

use crate::bytes::{ByteCodec, Endian};
use crate::format::{FloatStyle, format_float};
use crate::launch::fork_execvp;
use crate::parse::{ParseError, ParseNumber};
use crate::time::{self, CalendarTime, Zone};
use crate::wait::{WaitOutcome, wait_subprocess};

/// Writes `msg` to standard error and flushes it.
///
/// # Safety
///
/// `msg` must be a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_eprint(msg: *const c_char) {
    let msg = unsafe { CStr::from_ptr(msg) };
    let mut stderr = io::stderr().lock();
    // Nowhere to report a failure to write to stderr.
    let _ = stderr.write_all(msg.to_bytes()).and_then(|()| stderr.flush());
}

/// Releases a string returned by this library, such as a launch error. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a pointer returned by this library and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// Byte codecs. Stores and loads use native byte order and need no alignment.

macro_rules! ffi_bytes {
    ($($t:ty => $to:ident, $from:ident;)*) => {
        $(
            /// Stores `v` at `buf` in native byte order.
            ///
            /// # Safety
            ///
            /// `buf` must be valid for writes of the value's width.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $to(buf: *mut u8, v: $t) {
                let buf = unsafe { slice::from_raw_parts_mut(buf, <$t>::WIDTH) };
                // An exactly sized buffer is never too short.
                let _ = v.encode(buf, Endian::Native);
            }

            /// Loads a value stored at `buf` in native byte order.
            ///
            /// # Safety
            ///
            /// `buf` must be valid for reads of the value's width.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $from(buf: *const u8) -> $t {
                let buf = unsafe { slice::from_raw_parts(buf, <$t>::WIDTH) };
                <$t>::decode(buf, Endian::Native).unwrap_or_default()
            }
        )*
    };
}

ffi_bytes! {
    u8 => rts_u8_to_bytes, rts_u8_from_bytes;
    u16 => rts_u16_to_bytes, rts_u16_from_bytes;
    u32 => rts_u32_to_bytes, rts_u32_from_bytes;
    u64 => rts_u64_to_bytes, rts_u64_from_bytes;
    f32 => rts_f32_to_bytes, rts_f32_from_bytes;
    f64 => rts_f64_to_bytes, rts_f64_from_bytes;
}

/// Copies `s` into `buf`, truncating to `cap - 1` bytes and always NUL-terminating when
/// `cap > 0`. Returns the full length of `s`, so a result `>= cap` means truncation.
unsafe fn write_c_str(buf: *mut c_char, cap: usize, s: &str) -> usize {
    if cap > 0 {
        let n = s.len().min(cap - 1);
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr(), buf.cast::<u8>(), n);
            *buf.add(n) = 0;
        }
    }
    s.len()
}

macro_rules! ffi_int_to_str {
    ($($t:ty => $name:ident;)*) => {
        $(
            /// Writes `v` in decimal to `buf`, which holds `cap` bytes. Returns the length
            /// of the full text, not counting the terminating NUL.
            ///
            /// # Safety
            ///
            /// `buf` must be valid for writes of `cap` bytes.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $name(buf: *mut c_char, cap: usize, v: $t) -> usize {
                unsafe { write_c_str(buf, cap, &v.to_string()) }
            }
        )*
    };
}

ffi_int_to_str! {
    i8 => rts_i8_to_str;
    u8 => rts_u8_to_str;
    i16 => rts_i16_to_str;
    u16 => rts_u16_to_str;
    i32 => rts_i32_to_str;
    u32 => rts_u32_to_str;
    i64 => rts_i64_to_str;
    u64 => rts_u64_to_str;
}

unsafe fn float_to_str(
    buf: *mut c_char,
    cap: usize,
    v: f64,
    style: FloatStyle,
    precision: Option<u8>,
) -> usize {
    match format_float(v, style, precision) {
        Ok(s) => unsafe { write_c_str(buf, cap, &s) },
        Err(e) => {
            log::warn!("formatting {v} failed: {e}");
            unsafe { write_c_str(buf, cap, "") }
        }
    }
}

macro_rules! ffi_float_to_str {
    ($t:ty => $plain:ident, $exp:ident, $plain_prec:ident, $exp_prec:ident) => {
        /// Formats `v` like `%f` into `buf`, which holds `cap` bytes. Returns the length
        /// of the full text, not counting the terminating NUL.
        ///
        /// # Safety
        ///
        /// `buf` must be valid for writes of `cap` bytes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $plain(buf: *mut c_char, cap: usize, v: $t) -> usize {
            unsafe { float_to_str(buf, cap, f64::from(v), FloatStyle::Fixed, None) }
        }

        /// Formats `v` like `%e`. See the `%f` variant for the buffer contract.
        ///
        /// # Safety
        ///
        /// `buf` must be valid for writes of `cap` bytes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $exp(buf: *mut c_char, cap: usize, v: $t) -> usize {
            unsafe { float_to_str(buf, cap, f64::from(v), FloatStyle::Exponent, None) }
        }

        /// Formats `v` like `%.Nf` with N = `precision`.
        ///
        /// # Safety
        ///
        /// `buf` must be valid for writes of `cap` bytes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $plain_prec(
            buf: *mut c_char,
            cap: usize,
            v: $t,
            precision: u8,
        ) -> usize {
            unsafe { float_to_str(buf, cap, f64::from(v), FloatStyle::Fixed, Some(precision)) }
        }

        /// Formats `v` like `%.Ne` with N = `precision`.
        ///
        /// # Safety
        ///
        /// `buf` must be valid for writes of `cap` bytes.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $exp_prec(
            buf: *mut c_char,
            cap: usize,
            v: $t,
            precision: u8,
        ) -> usize {
            unsafe {
                float_to_str(
                    buf,
                    cap,
                    f64::from(v),
                    FloatStyle::Exponent,
                    Some(precision),
                )
            }
        }
    };
}

ffi_float_to_str!(f32 => rts_f32_to_str, rts_f32_to_str_exp, rts_f32_to_str_precision, rts_f32_to_str_exp_precision);
ffi_float_to_str!(f64 => rts_f64_to_str, rts_f64_to_str_exp, rts_f64_to_str_precision, rts_f64_to_str_exp_precision);

// Parsing. The Rust API returns the error; here it is kept per thread for the query
// functions below.

thread_local! {
    static LAST_PARSE_ERROR: Cell<Option<ParseError>> = const { Cell::new(None) };
}

fn record_parse<T: Default>(result: Result<T, ParseError>) -> T {
    LAST_PARSE_ERROR.with(|last| last.set(result.as_ref().err().copied()));
    result.unwrap_or_default()
}

macro_rules! ffi_parse {
    ($($t:ty => $name:ident;)*) => {
        $(
            /// Parses `s` as a decimal number. Returns 0 on failure; the reason is then
            /// available from `rts_last_parse_invalid` and `rts_last_parse_out_of_range`.
            ///
            /// # Safety
            ///
            /// `s` must be a valid C string.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $name(s: *const c_char) -> $t {
                record_parse(<$t>::parse_cstr(unsafe { CStr::from_ptr(s) }))
            }
        )*
    };
}

ffi_parse! {
    i64 => rts_strtoll_10;
    u64 => rts_strtoull_10;
    f64 => rts_strtod;
    f32 => rts_strtof;
}

/// Returns 1 if the last parse on this thread failed because the input was not a number.
#[unsafe(no_mangle)]
pub extern "C" fn rts_last_parse_invalid() -> u8 {
    LAST_PARSE_ERROR.with(|last| last.get() == Some(ParseError::InvalidArgument)) as u8
}

/// Returns 1 if the last parse on this thread failed because the number was out of range.
#[unsafe(no_mangle)]
pub extern "C" fn rts_last_parse_out_of_range() -> u8 {
    LAST_PARSE_ERROR.with(|last| last.get() == Some(ParseError::OutOfRange)) as u8
}

// Time.

/// Stores the wall-clock time as `ret[0]` seconds and `ret[1]` nanoseconds.
///
/// # Safety
///
/// `ret` must be valid for writes of two `i64`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_clock_gettime(ret: *mut i64) {
    let now = time::realtime_now().unwrap_or_else(|e| {
        log::warn!("{e}");
        Default::default()
    });
    unsafe {
        *ret = now.sec;
        *ret.add(1) = now.nsec;
    }
}

fn zone(is_local: u8) -> Zone {
    if is_local > 0 { Zone::Local } else { Zone::Utc }
}

/// Breaks `sec` down into calendar fields in UTC, or local time if `is_local` is nonzero.
///
/// `ret[0..9]` receive the `struct tm` fields in order: seconds, minutes, hours, day of
/// month, month, years since 1900, weekday, day of year, DST flag. `ret[9]` is 1 if the
/// conversion failed, in which case the other fields are 0.
///
/// # Safety
///
/// `ret` must be valid for writes of ten `i64`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_gmlocaltime(is_local: u8, sec: i64, ret: *mut i64) {
    let (cal, failed) = match time::to_calendar(sec, zone(is_local)) {
        Ok(cal) => (cal, 0),
        Err(e) => {
            log::debug!("{e}");
            (CalendarTime::default(), 1)
        }
    };
    let fields = [
        cal.sec, cal.min, cal.hour, cal.mday, cal.mon, cal.year, cal.wday, cal.yday, cal.isdst,
        failed,
    ];
    let ret = unsafe { slice::from_raw_parts_mut(ret, fields.len()) };
    for (slot, field) in ret.iter_mut().zip(fields) {
        *slot = i64::from(field);
    }
}

/// Converts the nine calendar fields at `data` (laid out as for `rts_gmlocaltime`) to
/// seconds since the epoch, as UTC or local time. Returns -1 on failure.
///
/// # Safety
///
/// `data` must be valid for reads of nine `i64`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_timegmlocal(is_local: u8, data: *const i64) -> i64 {
    let data = unsafe { slice::from_raw_parts(data, 9) };
    // Fields are C ints; truncation matches a C cast.
    let f = |i: usize| data[i] as i32;
    let cal = CalendarTime {
        sec: f(0),
        min: f(1),
        hour: f(2),
        mday: f(3),
        mon: f(4),
        year: f(5),
        wday: f(6),
        yday: f(7),
        isdst: f(8),
    };
    time::from_calendar(&cal, zone(is_local)).unwrap_or_else(|e| {
        log::debug!("{e}");
        -1
    })
}

/// Processor time used so far, in clock ticks; -1 if unavailable.
#[unsafe(no_mangle)]
pub extern "C" fn rts_clock() -> i64 {
    time::processor_clock().unwrap_or(-1)
}

#[unsafe(no_mangle)]
pub extern "C" fn rts_clocks_to_sec(clocks: i64) -> f64 {
    time::clocks_to_secs(clocks)
}

// Subprocesses.

/// Launches `program_path` with the NULL-terminated argument vector `argv`.
///
/// On success `*out_error` is set to null, `out_fds[0..3]` receive the write end of the
/// child's stdin pipe and the read ends of its stdout and stderr pipes, and `*out_pid`
/// the child's PID. The caller owns the descriptors and must close them.
///
/// On failure `*out_error` points to a message that must be released with
/// `rts_free_string`, and nothing else is written.
///
/// # Safety
///
/// `program_path` and every element of `argv` must be valid C strings, `argv` must be
/// NULL-terminated, `out_fds` must be valid for writes of three `int`s, and the other
/// out-pointers must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_fork_execvp(
    program_path: *const c_char,
    argv: *const *const c_char,
    out_error: *mut *mut c_char,
    out_fds: *mut c_int,
    out_pid: *mut i64,
) {
    let program = OsStr::from_bytes(unsafe { CStr::from_ptr(program_path) }.to_bytes());
    let mut args = vec![];
    let mut p = argv;
    unsafe {
        while !(*p).is_null() {
            args.push(OsStr::from_bytes(CStr::from_ptr(*p).to_bytes()));
            p = p.add(1);
        }
    }

    match fork_execvp(program, &args) {
        Ok(mut child) => {
            let fds = [
                child.stdin.take(),
                child.stdout.take(),
                child.stderr.take(),
            ]
            .map(|f| f.map_or(-1, IntoRawFd::into_raw_fd));
            unsafe {
                *out_error = ptr::null_mut();
                ptr::copy_nonoverlapping(fds.as_ptr(), out_fds, fds.len());
                *out_pid = i64::from(child.pid());
            }
        }
        Err(e) => {
            // Messages are built from Debug-escaped strings and OS errors, so they contain
            // no NUL byte.
            let msg = CString::new(e.to_string()).unwrap_or_default();
            unsafe { *out_error = msg.into_raw() };
        }
    }
}

/// Flattened [`WaitOutcome`] for C callers.
///
/// At most one of `exit_status_available` and `stop_signal_available` is set, and
/// neither is set when `is_timeout` or `wait_failed` is.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct WaitReport {
    pub is_timeout: u8,
    pub wait_failed: u8,
    pub exit_status: u8,
    pub exit_status_available: u8,
    /// The signal that terminated the child.
    pub stop_signal: u8,
    pub stop_signal_available: u8,
}

impl From<WaitOutcome> for WaitReport {
    fn from(outcome: WaitOutcome) -> WaitReport {
        let mut report = WaitReport::default();
        match outcome {
            WaitOutcome::TimedOut => report.is_timeout = 1,
            WaitOutcome::WaitFailed(_) => report.wait_failed = 1,
            WaitOutcome::Exited(code) => {
                report.exit_status = code;
                report.exit_status_available = 1;
            }
            WaitOutcome::Signaled(signal) => {
                report.stop_signal = signal as u8;
                report.stop_signal_available = 1;
            }
        }
        report
    }
}

/// Waits for child `pid`, for at most `*timeout` seconds unless `timeout` is null.
///
/// A negative or NaN timeout polls once; an infinite one blocks.
///
/// # Safety
///
/// `timeout` must be null or valid for reads, and `out` valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rts_wait_subprocess(pid: i64, timeout: *const f64, out: *mut WaitReport) {
    let timeout = unsafe { timeout.as_ref() }
        .and_then(|&secs| std::time::Duration::try_from_secs_f64(secs.max(0.0)).ok());
    let outcome = match u32::try_from(pid) {
        Ok(pid) => wait_subprocess(pid, timeout),
        Err(_) => WaitOutcome::WaitFailed(libc::EINVAL),
    };
    unsafe { *out = WaitReport::from(outcome) };
}
