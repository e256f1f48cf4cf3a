//! Runtime primitives for a language's standard library.
//!
//! The crate bundles the small set of operating-system and C-library facilities a
//! language runtime needs below its standard library:
//!
//! * [`launch`] and [`wait`]: start a program with its standard streams connected to
//!   pipes, and wait for it with an optional timeout.
//! * [`parse`] and [`format`]: decimal number parsing and formatting with C semantics.
//! * [`bytes`]: fixed-width values in byte buffers.
//! * [`time`]: wall, monotonic and processor clocks, and calendar conversion.
//!
//! Each facility is also exported as a flat C ABI from [`ffi`], so the crate can be linked
//! as a static or dynamic library into generated code.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use std::time::Duration;
//! use runtime_support::{WaitOutcome, fork_execvp};
//!
//! let mut child = fork_execvp("echo", &["echo", "hello"])?;
//! let mut out = String::new();
//! child.stdout.take().unwrap().read_to_string(&mut out)?;
//! assert_eq!(out, "hello\n");
//! assert_eq!(child.wait_timeout(Duration::from_secs(5)), WaitOutcome::Exited(0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(not(unix))]
compile_error!("runtime-support only supports Unix-like systems");

mod monitor;
mod posix;

pub mod bytes;
pub mod ffi;
pub mod format;
pub mod launch;
pub mod parse;
pub mod time;
pub mod wait;

#[cfg(test)]
mod tests;

pub use bytes::{ByteCodec, CodecError, Endian};
pub use format::{FloatStyle, format_f32, format_float};
pub use launch::{Child, EXEC_FAILURE_STATUS, Launch, LaunchError, fork_execvp};
pub use parse::{ParseError, ParseNumber, parse_f32, parse_f64, parse_i64, parse_u64};
pub use time::{CalendarTime, TimeError, Timespec, Zone};
pub use wait::{WaitOutcome, wait_subprocess};
