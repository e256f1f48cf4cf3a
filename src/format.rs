//! Floating point formatting through `snprintf`.
//!
//! Output matches C's `%f` and `%e` conversions exactly, including `inf`, `nan` and the
//! two-digit minimum exponent (`1.500000e+00`). Integers need no such help; their
//! `Display` output already equals `%d`/`%u`.

use std::ffi::CStr;
use std::io;

use crate::posix;

/// Which `printf` conversion to use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FloatStyle {
    /// `%f`: `[-]ddd.dddddd`.
    #[default]
    Fixed,
    /// `%e`: `[-]d.dddddde±dd`.
    Exponent,
}

impl FloatStyle {
    fn format_str(self, with_precision: bool) -> &'static CStr {
        match (self, with_precision) {
            (FloatStyle::Fixed, false) => c"%f",
            (FloatStyle::Fixed, true) => c"%.*f",
            (FloatStyle::Exponent, false) => c"%e",
            (FloatStyle::Exponent, true) => c"%.*e",
        }
    }
}

/// Formats `value` in `style`.
///
/// `precision` is the number of digits after the decimal point; `None` uses C's default
/// of six.
pub fn format_float(value: f64, style: FloatStyle, precision: Option<u8>) -> io::Result<String> {
    posix::snprintf_f64(
        style.format_str(precision.is_some()),
        precision.map(i32::from),
        value,
    )
}

/// Formats an `f32`, promoted to `f64` as C varargs do.
pub fn format_f32(value: f32, style: FloatStyle, precision: Option<u8>) -> io::Result<String> {
    format_float(f64::from(value), style, precision)
}
