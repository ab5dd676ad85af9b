//! Streaming field reader over chunked input.
//!
//! Input arrives as a sequence of [`Bytes`] chunks, e.g. network reads. The
//! reader yields one [`Field`] per complete key/value pair and never copies a
//! length-delimited body: a body inside one chunk becomes a slice of that
//! chunk, and a body spanning chunks becomes a list of [`Fragment`]s, one per
//! chunk touched. Either form can be handed straight to
//! [`LazyField::set_raw_payload`](crate::LazyField::set_raw_payload).
//!
//! A field is consumed only once all of its bytes have been fed; until then
//! the reader reports that it needs more input by yielding nothing.

use alloc::{collections::VecDeque, vec::Vec};

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

use crate::{
    DecodeError, Fragment, Payload, ReaderOptions,
    wire::{self, MAX_VARINT_LEN, WireType},
};

/// One decoded key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field number from the key.
    pub number: u32,
    /// The value, by wire type.
    pub value: FieldValue,
}

/// A field value as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A varint value.
    Varint(u64),
    /// An eight-byte little-endian value.
    Fixed64(u64),
    /// A four-byte little-endian value.
    Fixed32(u32),
    /// The body of a length-delimited value, uncopied.
    LengthDelimited(Payload),
}

impl FieldValue {
    /// The wire type this value is encoded with.
    #[must_use]
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Varint(_) => WireType::Varint,
            Self::Fixed64(_) => WireType::Fixed64,
            Self::Fixed32(_) => WireType::Fixed32,
            Self::LengthDelimited(_) => WireType::LengthDelimited,
        }
    }

    /// The payload of a length-delimited value.
    #[must_use]
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Self::LengthDelimited(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Field {
    /// Write the field back out with a canonical key and length prefix.
    ///
    /// Length-delimited bodies are written verbatim.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        wire::encode_key(self.number, self.value.wire_type(), buf);
        match &self.value {
            FieldValue::Varint(v) => wire::encode_varint(*v, buf),
            FieldValue::Fixed64(v) => buf.put_u64_le(*v),
            FieldValue::Fixed32(v) => buf.put_u32_le(*v),
            FieldValue::LengthDelimited(payload) => {
                wire::encode_varint(payload.binary_size() as u64, buf);
                payload.write_to(buf);
            }
        }
    }
}

/// A position in the unconsumed input.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    chunk: usize,
    offset: usize,
    /// Bytes passed since the start of the unconsumed input.
    pos: usize,
}

/// An incremental reader of protobuf fields over chunked input.
///
/// ```rust
/// use bytes::Bytes;
/// use lazyfield::{FieldValue, ReaderOptions, SegmentedReader};
///
/// let mut reader = SegmentedReader::new(ReaderOptions::default());
/// // field 1, length 5, "hello", split across two chunks
/// reader.feed(Bytes::from_static(b"\x0a\x05he"));
/// assert!(reader.next().is_none());
/// reader.feed(Bytes::from_static(b"llo"));
///
/// let field = reader.next().unwrap().unwrap();
/// assert_eq!(field.number, 1);
/// let FieldValue::LengthDelimited(payload) = field.value else { panic!() };
/// assert_eq!(&payload.concatenate()[..], b"hello");
/// assert_eq!(payload.region_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SegmentedReader {
    chunks: VecDeque<Bytes>,
    /// Consumed prefix of the front chunk.
    offset: usize,
    /// Unconsumed bytes across all chunks.
    buffered: usize,
    options: ReaderOptions,
    finished: bool,
    failed: bool,
}

impl SegmentedReader {
    /// Create a reader with the given options.
    #[must_use]
    pub fn new(options: ReaderOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Append a chunk of input.
    pub fn feed(&mut self, chunk: Bytes) {
        debug_assert!(!self.finished, "feed after finish");
        if chunk.is_empty() {
            return;
        }
        self.buffered += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Mark the end of input. A partially fed field remaining after this is
    /// reported as [`DecodeError::UnexpectedEof`].
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Bytes fed but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Read the next complete field.
    ///
    /// Returns `Ok(None)` when more input is needed (or, after
    /// [`finish`](Self::finish), when the input is exhausted).
    ///
    /// # Errors
    ///
    /// Malformed keys, oversized lengths, group encodings, and (after
    /// `finish`) truncated fields. The reader yields nothing further after an
    /// error.
    pub fn next_field(&mut self) -> Result<Option<Field>, DecodeError> {
        if self.failed {
            return Ok(None);
        }
        match self.peek_field() {
            Ok(Some((field, end))) => {
                self.consume(end);
                Ok(Some(field))
            }
            Ok(None) if self.finished && self.buffered > 0 => self.fail(DecodeError::UnexpectedEof),
            Ok(None) => Ok(None),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: DecodeError) -> Result<Option<Field>, DecodeError> {
        #[cfg(any(test, feature = "fuzzing"))]
        if self.options.panic_on_error {
            panic!("decode error: {err}");
        }
        self.failed = true;
        self.chunks.clear();
        self.offset = 0;
        self.buffered = 0;
        Err(err)
    }

    /// Parse one field without consuming it; `None` means incomplete.
    fn peek_field(&self) -> Result<Option<(Field, Cursor)>, DecodeError> {
        let mut cur = Cursor {
            chunk: 0,
            offset: self.offset,
            pos: 0,
        };
        let Some(key) = self.read_varint(&mut cur)? else {
            return Ok(None);
        };
        let (number, wire_type) = wire::split_key(key)?;
        let value = match wire_type {
            WireType::Varint => self.read_varint(&mut cur)?.map(FieldValue::Varint),
            WireType::Fixed64 => self
                .read_array::<8>(&mut cur)
                .map(|b| FieldValue::Fixed64(u64::from_le_bytes(b))),
            WireType::Fixed32 => self
                .read_array::<4>(&mut cur)
                .map(|b| FieldValue::Fixed32(u32::from_le_bytes(b))),
            WireType::LengthDelimited => {
                let Some(len) = self.read_varint(&mut cur)? else {
                    return Ok(None);
                };
                let len = self.check_length(len)?;
                self.capture(&mut cur, len).map(FieldValue::LengthDelimited)
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(DecodeError::UnsupportedGroup);
            }
        };
        Ok(value.map(|value| (Field { number, value }, cur)))
    }

    fn check_length(&self, len: u64) -> Result<usize, DecodeError> {
        let limit = self.options.max_length.unwrap_or(usize::MAX);
        match usize::try_from(len) {
            Ok(len) if len <= limit => Ok(len),
            _ => Err(DecodeError::LengthLimit { length: len, limit }),
        }
    }

    fn next_byte(&self, cur: &mut Cursor) -> Option<u8> {
        while let Some(chunk) = self.chunks.get(cur.chunk) {
            if let Some(&byte) = chunk.get(cur.offset) {
                cur.offset += 1;
                cur.pos += 1;
                return Some(byte);
            }
            cur.chunk += 1;
            cur.offset = 0;
        }
        None
    }

    fn read_varint(&self, cur: &mut Cursor) -> Result<Option<u64>, DecodeError> {
        let mut value = 0u64;
        for shift in (0..MAX_VARINT_LEN).map(|i| i * 7) {
            let Some(byte) = self.next_byte(cur) else {
                return Ok(None);
            };
            if shift == 63 && byte > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    fn read_array<const N: usize>(&self, cur: &mut Cursor) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        for slot in &mut out {
            *slot = self.next_byte(cur)?;
        }
        Some(out)
    }

    /// Capture `len` bytes starting at `cur` as a payload.
    fn capture(&self, cur: &mut Cursor, len: usize) -> Option<Payload> {
        if len > self.buffered - cur.pos {
            return None;
        }
        // (chunk index, start, end) of every region touched
        let mut regions = Vec::new();
        let mut left = len;
        while left > 0 {
            let chunk = &self.chunks[cur.chunk];
            let available = chunk.len() - cur.offset;
            if available == 0 {
                cur.chunk += 1;
                cur.offset = 0;
                continue;
            }
            let take = available.min(left);
            regions.push((cur.chunk, cur.offset, cur.offset + take));
            cur.offset += take;
            cur.pos += take;
            left -= take;
        }
        Some(self.payload_from(&regions, len))
    }

    fn payload_from(&self, regions: &[(usize, usize, usize)], len: usize) -> Payload {
        match regions {
            [] => Payload::empty(),
            [(chunk, start, end)] => Payload::Contiguous(self.chunks[*chunk].slice(*start..*end)),
            _ if self.options.coalesce_fragments => {
                let mut out = BytesMut::with_capacity(len);
                for &(chunk, start, end) in regions {
                    out.extend_from_slice(&self.chunks[chunk][start..end]);
                }
                Payload::Contiguous(out.freeze())
            }
            _ => {
                trace!("capturing {len} bytes as {} fragments", regions.len());
                regions
                    .iter()
                    .map(|&(chunk, start, end)| {
                        let buffer = &self.chunks[chunk];
                        Fragment::new(buffer.clone(), start, buffer.len() - end)
                    })
                    .collect()
            }
        }
    }

    fn consume(&mut self, end: Cursor) {
        self.chunks.drain(..end.chunk);
        self.offset = end.offset;
        self.buffered -= end.pos;
        if self.chunks.front().is_some_and(|front| front.len() == self.offset) {
            self.chunks.pop_front();
            self.offset = 0;
        }
    }
}

impl Iterator for SegmentedReader {
    type Item = Result<Field, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_field().transpose()
    }
}
