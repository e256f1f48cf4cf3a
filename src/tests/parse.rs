use crate::format::{FloatStyle, format_float};
use crate::{ParseError, ParseNumber, parse_f32, parse_f64, parse_i64, parse_u64};

use ParseError::{InvalidArgument, OutOfRange};

#[test]
fn integers() {
    assert_eq!(parse_i64("42"), Ok(42));
    assert_eq!(parse_i64("-42"), Ok(-42));
    assert_eq!(parse_i64("+7"), Ok(7));
    assert_eq!(parse_i64("0"), Ok(0));
    assert_eq!(parse_i64("9223372036854775807"), Ok(i64::MAX));
    assert_eq!(parse_i64("-9223372036854775808"), Ok(i64::MIN));
    assert_eq!(parse_u64("18446744073709551615"), Ok(u64::MAX));
}

#[test]
fn invalid_input() {
    for s in ["", " 1", "\t1", "\n1", "\u{b}1", "1 ", "12abc", "abc", "-", "1\02"] {
        assert_eq!(parse_i64(s), Err(InvalidArgument), "{s:?}");
        assert_eq!(parse_u64(s), Err(InvalidArgument), "{s:?}");
        assert_eq!(parse_f64(s), Err(InvalidArgument), "{s:?}");
        assert_eq!(parse_f32(s), Err(InvalidArgument), "{s:?}");
    }
    assert_eq!(parse_f64("1.5x"), Err(InvalidArgument));
    assert_eq!(parse_f64("."), Err(InvalidArgument));
    assert_eq!(parse_i64("1.5"), Err(InvalidArgument));
}

#[test]
fn out_of_range() {
    assert_eq!(parse_i64("9223372036854775808"), Err(OutOfRange));
    assert_eq!(parse_i64("-9223372036854775809"), Err(OutOfRange));
    assert_eq!(parse_u64("18446744073709551616"), Err(OutOfRange));
    assert_eq!(parse_f64("1e400"), Err(OutOfRange));
    assert_eq!(parse_f64("-1e400"), Err(OutOfRange));
    assert_eq!(parse_f32("3.5e38"), Err(OutOfRange));
}

#[test]
fn invalid_wins_over_out_of_range() {
    assert_eq!(parse_i64("99999999999999999999x"), Err(InvalidArgument));
}

#[test]
fn libc_grammar_kept() {
    assert_eq!(parse_u64("-1"), Ok(u64::MAX));
    assert_eq!(parse_f64("0x10"), Ok(16.0));
    assert!(parse_f64("inf").unwrap().is_infinite());
    assert!(parse_f64("-Infinity").unwrap().is_sign_negative());
    assert!(parse_f64("nan").unwrap().is_nan());
}

#[test]
fn floats() {
    assert_eq!(parse_f64("1.5"), Ok(1.5));
    assert_eq!(parse_f64("-0.25"), Ok(-0.25));
    assert_eq!(parse_f64("1e3"), Ok(1000.0));
    assert_eq!(parse_f32("1.25"), Ok(1.25));
    assert_eq!(parse_f32("0.1"), Ok(0.1f32));
}

#[test]
fn narrow_integers() {
    assert_eq!(i8::parse_number("127"), Ok(127));
    assert_eq!(i8::parse_number("128"), Err(OutOfRange));
    assert_eq!(i8::parse_number("-128"), Ok(-128));
    assert_eq!(u8::parse_number("255"), Ok(255));
    assert_eq!(u8::parse_number("-1"), Err(OutOfRange));
    assert_eq!(i32::parse_number("-2147483648"), Ok(i32::MIN));
    assert_eq!(u32::parse_number(" 1"), Err(InvalidArgument));
    assert_eq!(u16::parse_number("65536"), Err(OutOfRange));
}

#[test]
fn parse_cstr() {
    assert_eq!(i64::parse_cstr(c"-17"), Ok(-17));
    assert_eq!(f64::parse_cstr(c""), Err(InvalidArgument));
}

#[test]
fn integer_text_round_trip() {
    for v in [0, 1, -1, 1234567890123, i64::MIN, i64::MAX] {
        assert_eq!(parse_i64(&v.to_string()), Ok(v));
    }
    assert_eq!(parse_u64(&u64::MAX.to_string()), Ok(u64::MAX));
}

#[test]
fn float_text_round_trip() {
    for v in [0.1, -123.456, 1e300, f64::MAX] {
        let s = format_float(v, FloatStyle::Exponent, Some(17)).unwrap();
        assert_eq!(parse_f64(&s), Ok(v), "{s}");
    }
    let s = format_float(0.1f32.into(), FloatStyle::Exponent, Some(9)).unwrap();
    assert_eq!(parse_f32(&s), Ok(0.1f32));
}

#[test]
fn error_messages() {
    assert_eq!(InvalidArgument.to_string(), "invalid number");
    assert_eq!(OutOfRange.to_string(), "number out of range");
}
