use thiserror::Error;

/// Errors produced while decoding wire data.
///
/// The container itself never fails: these surface from the wrapped message's
/// decoder and from [`SegmentedReader`](crate::SegmentedReader).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A varint ran past ten bytes.
    #[error("varint overflows 64 bits")]
    VarintOverflow,
    /// A field key carried an unknown wire type.
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    /// A field key carried field number zero or one above the protobuf maximum.
    #[error("invalid field number")]
    InvalidFieldNumber,
    /// Group encoding is not supported.
    #[error("groups are not supported")]
    UnsupportedGroup,
    /// A length prefix exceeded the configured limit.
    #[error("length {length} exceeds limit {limit}")]
    LengthLimit {
        /// The declared length.
        length: u64,
        /// The configured maximum.
        limit: usize,
    },
    /// A string field held invalid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    /// A message-specific failure reported by the wrapped type.
    #[error("{0}")]
    Message(&'static str),
}
