use crate::bytes::{self, ByteCodec, CodecError, Endian};

fn round_trip<T: ByteCodec + PartialEq + std::fmt::Debug>(values: &[T]) {
    for &v in values {
        for endian in [Endian::Native, Endian::Little, Endian::Big] {
            let mut buf = [0u8; 8];
            v.encode(&mut buf, endian).unwrap();
            assert_eq!(T::decode(&buf, endian).unwrap(), v, "{endian:?}");
        }
    }
}

#[test]
fn integers_round_trip() {
    round_trip(&[0u8, 1, 0x7f, u8::MAX]);
    round_trip(&[0u16, 0x1234, u16::MAX]);
    round_trip(&[0u32, 0xdead_beef, u32::MAX]);
    round_trip(&[0u64, 0x0123_4567_89ab_cdef, u64::MAX]);
    round_trip(&[i8::MIN, -1, i8::MAX]);
    round_trip(&[i16::MIN, -1, i16::MAX]);
    round_trip(&[i32::MIN, -1, i32::MAX]);
    round_trip(&[i64::MIN, -1, i64::MAX]);
}

#[test]
fn floats_round_trip() {
    round_trip(&[0.0f32, -1.5, f32::MAX, f32::MIN_POSITIVE, f32::INFINITY]);
    round_trip(&[0.0f64, -1.5, f64::MAX, f64::MIN_POSITIVE, f64::NEG_INFINITY]);

    let mut buf = [0u8; 8];
    bytes::encode(f64::NAN, &mut buf).unwrap();
    let back: f64 = bytes::decode(&buf).unwrap();
    assert_eq!(back.to_bits(), f64::NAN.to_bits());
}

#[test]
fn byte_order() {
    let mut buf = [0u8; 4];
    0x0102_0304u32.encode(&mut buf, Endian::Little).unwrap();
    assert_eq!(buf, [4, 3, 2, 1]);
    0x0102_0304u32.encode(&mut buf, Endian::Big).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
    bytes::encode(0x0102_0304u32, &mut buf).unwrap();
    assert_eq!(buf, 0x0102_0304u32.to_ne_bytes());
    assert_eq!(f32::decode(&1.0f32.to_be_bytes(), Endian::Big), Ok(1.0));
}

#[test]
fn trailing_bytes_untouched() {
    let mut buf = [0xffu8; 4];
    bytes::encode(0u16, &mut buf).unwrap();
    assert_eq!(buf, [0, 0, 0xff, 0xff]);
    assert_eq!(bytes::decode::<u16>(&buf), Ok(0));
}

#[test]
fn short_buffer() {
    let mut buf = [0xaau8; 3];
    assert_eq!(
        bytes::encode(7u32, &mut buf),
        Err(CodecError::BufferTooShort { needed: 4, len: 3 })
    );
    assert_eq!(buf, [0xaa; 3]);
    assert_eq!(
        u64::decode(&[0; 4], Endian::Little),
        Err(CodecError::BufferTooShort { needed: 8, len: 4 })
    );
    assert_eq!(
        CodecError::BufferTooShort { needed: 8, len: 4 }.to_string(),
        "buffer of 4 bytes is too short for a 8-byte value"
    );
}

#[test]
fn widths() {
    assert_eq!(u8::WIDTH, 1);
    assert_eq!(i16::WIDTH, 2);
    assert_eq!(f32::WIDTH, 4);
    assert_eq!(f64::WIDTH, 8);
}
