//! Decimal number parsing through the C library.
//!
//! The grammar is whatever `strtoll`, `strtoull`, `strtod` and `strtof` accept, with two
//! tightenings: the whole input must be consumed, and leading whitespace, which the C
//! functions skip, is rejected. Some consequences of delegating to libc are kept as is:
//! `parse_u64("-1")` wraps to `u64::MAX`, and the float parsers accept `inf`, `nan` and
//! hexadecimal floats.

use std::ffi::{CStr, CString};

use thiserror::Error;

use crate::posix::{self, Strto};

/// Why a string could not be parsed as a number.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ParseError {
    /// The input is empty, starts with whitespace, or is not entirely a number.
    #[error("invalid number")]
    InvalidArgument,

    /// The input is a number that the target type cannot represent.
    #[error("number out of range")]
    OutOfRange,
}

/// Types that can be parsed from a decimal string.
pub trait ParseNumber: Sized {
    /// Parses a C string.
    fn parse_cstr(s: &CStr) -> Result<Self, ParseError>;

    /// Parses a Rust string. An interior NUL byte makes the input invalid.
    fn parse_number(s: &str) -> Result<Self, ParseError> {
        let s = CString::new(s).map_err(|_| ParseError::InvalidArgument)?;
        Self::parse_cstr(&s)
    }
}

fn parse_with<T>(s: &CStr, strto: fn(&CStr) -> Strto<T>) -> Result<T, ParseError> {
    let bytes = s.to_bytes();
    match bytes.first() {
        None => return Err(ParseError::InvalidArgument),
        Some(&b) if posix::isspace(b) => return Err(ParseError::InvalidArgument),
        Some(_) => {}
    }
    let parsed = strto(s);
    if parsed.consumed == 0 || parsed.consumed != bytes.len() {
        return Err(ParseError::InvalidArgument);
    }
    if parsed.errno == posix::ERANGE {
        return Err(ParseError::OutOfRange);
    }
    Ok(parsed.value)
}

impl ParseNumber for i64 {
    fn parse_cstr(s: &CStr) -> Result<i64, ParseError> {
        parse_with(s, posix::strtoll)
    }
}

impl ParseNumber for u64 {
    fn parse_cstr(s: &CStr) -> Result<u64, ParseError> {
        parse_with(s, posix::strtoull)
    }
}

impl ParseNumber for f64 {
    fn parse_cstr(s: &CStr) -> Result<f64, ParseError> {
        parse_with(s, posix::strtod)
    }
}

impl ParseNumber for f32 {
    fn parse_cstr(s: &CStr) -> Result<f32, ParseError> {
        parse_with(s, posix::strtof)
    }
}

// Narrower integers go through the 64-bit parser of the same signedness.
macro_rules! impl_narrow {
    ($wide:ty => $($narrow:ty),*) => {
        $(
            impl ParseNumber for $narrow {
                fn parse_cstr(s: &CStr) -> Result<$narrow, ParseError> {
                    let wide = <$wide>::parse_cstr(s)?;
                    <$narrow>::try_from(wide).map_err(|_| ParseError::OutOfRange)
                }
            }
        )*
    };
}

impl_narrow!(i64 => i8, i16, i32);
impl_narrow!(u64 => u8, u16, u32);

/// Parses a base 10 signed integer.
pub fn parse_i64(s: &str) -> Result<i64, ParseError> {
    i64::parse_number(s)
}

/// Parses a base 10 unsigned integer.
pub fn parse_u64(s: &str) -> Result<u64, ParseError> {
    u64::parse_number(s)
}

/// Parses a double-precision float.
pub fn parse_f64(s: &str) -> Result<f64, ParseError> {
    f64::parse_number(s)
}

/// Parses a single-precision float.
pub fn parse_f32(s: &str) -> Result<f32, ParseError> {
    f32::parse_number(s)
}
