//! Protobuf framing primitives.
//!
//! Only what is needed to embed a lazy field in a parent record lives here:
//! varints (for keys and length prefixes), field keys, and skipping values of
//! fields a decoder does not recognize.

use bytes::{Buf, BufMut};

use crate::DecodeError;

/// Largest field number protobuf allows.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Longest possible varint encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Wire types carried in the low three bits of a field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint.
    Varint = 0,
    /// Eight little-endian bytes.
    Fixed64 = 1,
    /// Varint length followed by that many bytes.
    LengthDelimited = 2,
    /// Deprecated group start.
    StartGroup = 3,
    /// Deprecated group end.
    EndGroup = 4,
    /// Four little-endian bytes.
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Varint,
            1 => Self::Fixed64,
            2 => Self::LengthDelimited,
            3 => Self::StartGroup,
            4 => Self::EndGroup,
            5 => Self::Fixed32,
            other => return Err(DecodeError::InvalidWireType(other)),
        })
    }
}

/// Write `value` as a base-128 varint.
#[inline]
pub fn encode_varint<B: BufMut>(mut value: u64, buf: &mut B) {
    while value >= 0x80 {
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u8(value as u8);
}

/// Number of bytes [`encode_varint`] writes for `value`.
#[inline]
#[must_use]
pub const fn encoded_len_varint(value: u64) -> usize {
    // Every 7 significant bits take one byte; zero still takes one.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Read a base-128 varint.
///
/// Accepts non-minimal encodings (padding with `0x80` continuation bytes) up
/// to [`MAX_VARINT_LEN`] bytes.
///
/// # Errors
///
/// [`DecodeError::UnexpectedEof`] if the input ends mid-varint,
/// [`DecodeError::VarintOverflow`] if it runs past ten bytes or encodes a
/// value wider than 64 bits.
pub fn decode_varint<B: Buf>(buf: &mut B) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for shift in (0..MAX_VARINT_LEN).map(|i| i * 7) {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = buf.get_u8();
        // The tenth byte holds only the top bit of a u64.
        if shift == 63 && byte > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(DecodeError::VarintOverflow)
}

/// Write a field key.
///
/// # Panics
///
/// Panics if `field_number` is zero or above [`MAX_FIELD_NUMBER`].
#[inline]
pub fn encode_key<B: BufMut>(field_number: u32, wire_type: WireType, buf: &mut B) {
    assert!(
        (1..=MAX_FIELD_NUMBER).contains(&field_number),
        "field number {field_number} out of range"
    );
    encode_varint(u64::from(field_number << 3 | wire_type as u32), buf);
}

/// Number of bytes [`encode_key`] writes for `field_number`.
#[inline]
#[must_use]
pub const fn encoded_len_key(field_number: u32) -> usize {
    encoded_len_varint((field_number as u64) << 3)
}

/// Read a field key.
///
/// # Errors
///
/// Fails on a truncated or oversized varint, an unknown wire type, or a field
/// number outside `1..=MAX_FIELD_NUMBER`.
pub fn decode_key<B: Buf>(buf: &mut B) -> Result<(u32, WireType), DecodeError> {
    split_key(decode_varint(buf)?)
}

/// Split an already-read key varint into field number and wire type.
///
/// # Errors
///
/// As [`decode_key`], minus the varint failures.
pub fn split_key(key: u64) -> Result<(u32, WireType), DecodeError> {
    if key > u64::from(u32::MAX) {
        return Err(DecodeError::InvalidFieldNumber);
    }
    #[allow(clippy::cast_possible_truncation)]
    let key = key as u32;
    #[allow(clippy::cast_possible_truncation)]
    let wire_type = WireType::try_from((key & 0x7) as u8)?;
    let field_number = key >> 3;
    if field_number == 0 {
        return Err(DecodeError::InvalidFieldNumber);
    }
    Ok((field_number, wire_type))
}

/// Write a complete length-delimited field: key, length prefix, body.
pub fn encode_bytes_field<B: BufMut>(field_number: u32, value: &[u8], buf: &mut B) {
    encode_key(field_number, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value);
}

/// Write a complete varint field: key and value.
pub fn encode_varint_field<B: BufMut>(field_number: u32, value: u64, buf: &mut B) {
    encode_key(field_number, WireType::Varint, buf);
    encode_varint(value, buf);
}

/// Encoded size of a length-delimited field whose body is `body_len` bytes.
#[inline]
#[must_use]
pub const fn encoded_len_length_delimited(field_number: u32, body_len: usize) -> usize {
    encoded_len_key(field_number) + encoded_len_varint(body_len as u64) + body_len
}

/// Encoded size of a varint field.
#[inline]
#[must_use]
pub const fn encoded_len_varint_field(field_number: u32, value: u64) -> usize {
    encoded_len_key(field_number) + encoded_len_varint(value)
}

/// Read a length prefix and split that many bytes off the front of `buf`.
///
/// # Errors
///
/// [`DecodeError::UnexpectedEof`] if fewer bytes remain than declared.
pub fn decode_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = decode_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof)?;
    if len > buf.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Read a length-delimited value as UTF-8.
///
/// # Errors
///
/// As [`decode_length_delimited`], plus [`DecodeError::InvalidUtf8`].
pub fn decode_str<'a>(buf: &mut &'a [u8]) -> Result<&'a str, DecodeError> {
    let raw = decode_length_delimited(buf)?;
    core::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)
}

/// Skip over the value of a field whose key has already been read.
///
/// # Errors
///
/// Fails on truncated input and on group wire types.
pub fn skip_field(wire_type: WireType, buf: &mut &[u8]) -> Result<(), DecodeError> {
    let skip = match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
            0
        }
        WireType::Fixed64 => 8,
        WireType::Fixed32 => 4,
        WireType::LengthDelimited => {
            decode_length_delimited(buf)?;
            0
        }
        WireType::StartGroup | WireType::EndGroup => return Err(DecodeError::UnsupportedGroup),
    };
    if skip > buf.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    buf.advance(skip);
    Ok(())
}
