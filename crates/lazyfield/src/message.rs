use alloc::vec::Vec;

use bytes::BufMut;

use crate::DecodeError;

/// The contract a structured type must meet to be wrapped in a
/// [`LazyField`](crate::LazyField).
///
/// Implementations are usually generated. The container relies on the
/// following protobuf conventions:
///
/// - the default value encodes to zero bytes, and decoding zero bytes yields
///   the default value;
/// - decoding onto an existing value merges (last scalar wins, repeated fields
///   append, nested messages merge recursively), so
///   `a.merge_bytes(x); a.merge_bytes(y)` equals decoding `x ++ y`;
/// - [`merge`](Message::merge) applies the same rules value-to-value.
pub trait Message: Default {
    /// Decode `buf` and merge the result into `self`.
    ///
    /// On malformed input `self` may be left partially populated.
    ///
    /// # Errors
    ///
    /// Returns the first decoding failure encountered.
    fn merge_bytes(&mut self, buf: &[u8]) -> Result<(), DecodeError>;

    /// Write the encoding of `self`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Exact number of bytes [`encode`](Message::encode) writes.
    fn encoded_len(&self) -> usize;

    /// Merge `other` into `self`.
    fn merge(&mut self, other: &Self);

    /// Reset every field to its default.
    fn clear(&mut self);

    /// Decode a fresh value from `buf`.
    ///
    /// # Errors
    ///
    /// As [`merge_bytes`](Message::merge_bytes).
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut value = Self::default();
        value.merge_bytes(buf)?;
        Ok(value)
    }

    /// Encode into a freshly allocated vector.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }
}
