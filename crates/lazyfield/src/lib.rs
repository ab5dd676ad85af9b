//! Deferred-decode containers for embedded protobuf messages.
//!
//! A [`LazyField`] stores the raw wire bytes of a nested message and decodes
//! them only when structured access is requested. Fields that are never
//! inspected pass through a pipeline byte-for-byte, including encodings that
//! are valid but not canonical.
//!
//! ```rust
//! use bytes::BufMut;
//! use lazyfield::{DecodeError, LazyField, Message, wire};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Counter {
//!     hits: u64,
//! }
//!
//! impl Message for Counter {
//!     fn merge_bytes(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
//!         while !buf.is_empty() {
//!             match wire::decode_key(&mut buf)? {
//!                 (1, wire::WireType::Varint) => self.hits = wire::decode_varint(&mut buf)?,
//!                 (_, wire_type) => wire::skip_field(wire_type, &mut buf)?,
//!             }
//!         }
//!         Ok(())
//!     }
//!     fn encode<B: BufMut>(&self, buf: &mut B) {
//!         if self.hits != 0 {
//!             wire::encode_varint_field(1, self.hits, buf);
//!         }
//!     }
//!     fn encoded_len(&self) -> usize {
//!         if self.hits == 0 { 0 } else { wire::encoded_len_varint_field(1, self.hits) }
//!     }
//!     fn merge(&mut self, other: &Self) {
//!         if other.hits != 0 {
//!             self.hits = other.hits;
//!         }
//!     }
//!     fn clear(&mut self) {
//!         self.hits = 0;
//!     }
//! }
//!
//! // `hits = 5`, with a padded (non-minimal) varint.
//! let raw: &'static [u8] = &[0x08, 0x85, 0x00];
//! let mut field = LazyField::<Counter>::from_payload(raw);
//! assert_eq!(field.encode_to_vec(), raw);
//!
//! field.unpack().hits += 1;
//! assert_eq!(field.encode_to_vec(), [0x08, 0x06]);
//! ```

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod error;
mod fragment;
mod lazy_field;
mod message;
mod options;
mod payload;
mod reader;
pub mod scope;
pub mod wire;


pub use error::DecodeError;
pub use fragment::Fragment;
pub use lazy_field::LazyField;
pub use message::Message;
pub use options::ReaderOptions;
pub use payload::{Chunks, Payload};
pub use reader::{Field, FieldValue, SegmentedReader};
pub use scope::{Arena, Heap, Scope};
