//! Fixed-width values in byte buffers.
//!
//! [`Endian::Native`] reproduces a plain memory store: the bytes are in whatever order
//! the host uses, so buffers written this way are only meaningful on hosts of the same
//! endianness. Use [`Endian::Little`] or [`Endian::Big`] for anything that is persisted or
//! sent elsewhere.

use std::mem::size_of;

use thiserror::Error;

/// Byte order used by [`ByteCodec`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Endian {
    /// The host's byte order.
    #[default]
    Native,
    Little,
    Big,
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum CodecError {
    #[error("buffer of {len} bytes is too short for a {needed}-byte value")]
    BufferTooShort { needed: usize, len: usize },
}

/// A fixed-width value that can be stored at the start of a byte buffer.
pub trait ByteCodec: Sized + Copy {
    /// Number of bytes the value occupies.
    const WIDTH: usize;

    /// Writes `self` into the first [`WIDTH`](Self::WIDTH) bytes of `buf`.
    fn encode(self, buf: &mut [u8], endian: Endian) -> Result<(), CodecError>;

    /// Reads a value from the first [`WIDTH`](Self::WIDTH) bytes of `buf`.
    fn decode(buf: &[u8], endian: Endian) -> Result<Self, CodecError>;
}

fn check_len(len: usize, needed: usize) -> Result<(), CodecError> {
    if len < needed {
        return Err(CodecError::BufferTooShort { needed, len });
    }
    Ok(())
}

macro_rules! impl_byte_codec {
    ($($t:ty),*) => {
        $(
            impl ByteCodec for $t {
                const WIDTH: usize = size_of::<$t>();

                fn encode(self, buf: &mut [u8], endian: Endian) -> Result<(), CodecError> {
                    check_len(buf.len(), Self::WIDTH)?;
                    let bytes = match endian {
                        Endian::Native => self.to_ne_bytes(),
                        Endian::Little => self.to_le_bytes(),
                        Endian::Big => self.to_be_bytes(),
                    };
                    buf[..Self::WIDTH].copy_from_slice(&bytes);
                    Ok(())
                }

                fn decode(buf: &[u8], endian: Endian) -> Result<$t, CodecError> {
                    check_len(buf.len(), Self::WIDTH)?;
                    let mut bytes = [0u8; size_of::<$t>()];
                    bytes.copy_from_slice(&buf[..Self::WIDTH]);
                    Ok(match endian {
                        Endian::Native => <$t>::from_ne_bytes(bytes),
                        Endian::Little => <$t>::from_le_bytes(bytes),
                        Endian::Big => <$t>::from_be_bytes(bytes),
                    })
                }
            }
        )*
    };
}

impl_byte_codec!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Writes `value` in native byte order.
pub fn encode<T: ByteCodec>(value: T, buf: &mut [u8]) -> Result<(), CodecError> {
    value.encode(buf, Endian::Native)
}

/// Reads a value in native byte order.
pub fn decode<T: ByteCodec>(buf: &[u8]) -> Result<T, CodecError> {
    T::decode(buf, Endian::Native)
}
