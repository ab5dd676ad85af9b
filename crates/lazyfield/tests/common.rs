#![allow(missing_docs)]
#![allow(dead_code)]

use std::fmt::Write as _;

use bytes::{BufMut, Bytes};
use lazyfield::{
    DecodeError, FieldValue, LazyField, Message, Payload, ReaderOptions, SegmentedReader,
    wire::{self, WireType},
};

/// `message File { string name = 1; uint64 size = 2; bytes contents = 3; }`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub size: u64,
    pub contents: Vec<u8>,
}

impl File {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_owned(),
            size,
            contents: Vec::new(),
        }
    }
}

impl Message for File {
    fn merge_bytes(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
        while !buf.is_empty() {
            match wire::decode_key(&mut buf)? {
                (1, WireType::LengthDelimited) => self.name = wire::decode_str(&mut buf)?.to_owned(),
                (2, WireType::Varint) => self.size = wire::decode_varint(&mut buf)?,
                (3, WireType::LengthDelimited) => {
                    self.contents = wire::decode_length_delimited(&mut buf)?.to_vec();
                }
                (_, wire_type) => wire::skip_field(wire_type, &mut buf)?,
            }
        }
        Ok(())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        if !self.name.is_empty() {
            wire::encode_bytes_field(1, self.name.as_bytes(), buf);
        }
        if self.size != 0 {
            wire::encode_varint_field(2, self.size, buf);
        }
        if !self.contents.is_empty() {
            wire::encode_bytes_field(3, &self.contents, buf);
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += wire::encoded_len_length_delimited(1, self.name.len());
        }
        if self.size != 0 {
            len += wire::encoded_len_varint_field(2, self.size);
        }
        if !self.contents.is_empty() {
            len += wire::encoded_len_length_delimited(3, self.contents.len());
        }
        len
    }

    fn merge(&mut self, other: &Self) {
        if !other.name.is_empty() {
            self.name.clone_from(&other.name);
        }
        if other.size != 0 {
            self.size = other.size;
        }
        if !other.contents.is_empty() {
            self.contents.clone_from(&other.contents);
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// `message Folder { repeated File files = 1; string name = 2; }`, decoded
/// eagerly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Folder {
    pub files: Vec<File>,
    pub name: String,
}

impl Message for Folder {
    fn merge_bytes(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
        while !buf.is_empty() {
            match wire::decode_key(&mut buf)? {
                (1, WireType::LengthDelimited) => {
                    let body = wire::decode_length_delimited(&mut buf)?;
                    self.files.push(File::decode(body)?);
                }
                (2, WireType::LengthDelimited) => self.name = wire::decode_str(&mut buf)?.to_owned(),
                (_, wire_type) => wire::skip_field(wire_type, &mut buf)?,
            }
        }
        Ok(())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for file in &self.files {
            wire::encode_key(1, WireType::LengthDelimited, buf);
            wire::encode_varint(file.encoded_len() as u64, buf);
            file.encode(buf);
        }
        if !self.name.is_empty() {
            wire::encode_bytes_field(2, self.name.as_bytes(), buf);
        }
    }

    fn encoded_len(&self) -> usize {
        let files: usize = self
            .files
            .iter()
            .map(|file| wire::encoded_len_length_delimited(1, file.encoded_len()))
            .sum();
        if self.name.is_empty() {
            files
        } else {
            files + wire::encoded_len_length_delimited(2, self.name.len())
        }
    }

    fn merge(&mut self, other: &Self) {
        self.files.extend(other.files.iter().cloned());
        if !other.name.is_empty() {
            self.name.clone_from(&other.name);
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The same wire shape as [`Folder`], with every file held lazily.
#[derive(Debug, Default, Clone)]
pub struct LazyFolder {
    pub files: Vec<LazyField<File>>,
    pub name: String,
}

impl LazyFolder {
    /// Read a folder from chunked input without copying any file body.
    pub fn read(
        chunks: impl IntoIterator<Item = Bytes>,
        options: ReaderOptions,
    ) -> Result<Self, DecodeError> {
        let mut reader = SegmentedReader::new(options);
        for chunk in chunks {
            reader.feed(chunk);
        }
        reader.finish();

        let mut folder = Self::default();
        for field in reader {
            let field = field?;
            match (field.number, field.value) {
                (1, FieldValue::LengthDelimited(payload)) => {
                    folder.files.push(LazyField::from_payload(payload));
                }
                (2, FieldValue::LengthDelimited(payload)) => {
                    folder.name = String::from_utf8(payload.into_bytes().to_vec())
                        .map_err(|_| DecodeError::InvalidUtf8)?;
                }
                _ => {}
            }
        }
        Ok(folder)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.name.is_empty()
    }

    pub fn unpacked_count(&self) -> usize {
        self.files.iter().filter(|file| file.is_unpacked()).count()
    }
}

impl Message for LazyFolder {
    fn merge_bytes(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
        while !buf.is_empty() {
            match wire::decode_key(&mut buf)? {
                (1, WireType::LengthDelimited) => {
                    let body = wire::decode_length_delimited(&mut buf)?;
                    self.files
                        .push(LazyField::from_payload(Bytes::copy_from_slice(body)));
                }
                (2, WireType::LengthDelimited) => self.name = wire::decode_str(&mut buf)?.to_owned(),
                (_, wire_type) => wire::skip_field(wire_type, &mut buf)?,
            }
        }
        Ok(())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        for file in &self.files {
            file.encode_length_delimited(1, buf);
        }
        if !self.name.is_empty() {
            wire::encode_bytes_field(2, self.name.as_bytes(), buf);
        }
    }

    fn encoded_len(&self) -> usize {
        let files: usize = self
            .files
            .iter()
            .map(|file| file.encoded_len_length_delimited(1))
            .sum();
        if self.name.is_empty() {
            files
        } else {
            files + wire::encoded_len_length_delimited(2, self.name.len())
        }
    }

    fn merge(&mut self, other: &Self) {
        self.files.extend(other.files.iter().cloned());
        if !other.name.is_empty() {
            self.name.clone_from(&other.name);
        }
    }

    fn clear(&mut self) {
        self.files.clear();
        self.name.clear();
    }
}

/// `message Envelope { uint64 id = 1; Folder folder = 2; }`, with the folder
/// held lazily and its files held lazily in turn.
#[derive(Debug, Default)]
pub struct Envelope {
    pub id: u64,
    pub folder: LazyField<LazyFolder>,
}

impl Message for Envelope {
    fn merge_bytes(&mut self, mut buf: &[u8]) -> Result<(), DecodeError> {
        while !buf.is_empty() {
            match wire::decode_key(&mut buf)? {
                (1, WireType::Varint) => self.id = wire::decode_varint(&mut buf)?,
                (2, WireType::LengthDelimited) => {
                    let body = Bytes::copy_from_slice(wire::decode_length_delimited(&mut buf)?);
                    let untouched = self.folder.get().map_or_else(
                        || self.folder.payload().is_some_and(Payload::is_empty),
                        LazyFolder::is_empty,
                    );
                    if untouched {
                        self.folder.set_raw_payload(body);
                    } else {
                        // A repeated occurrence merges into the earlier one.
                        self.folder.merge(&LazyField::<LazyFolder>::from_payload(body))?;
                    }
                }
                (_, wire_type) => wire::skip_field(wire_type, &mut buf)?,
            }
        }
        Ok(())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        if self.id != 0 {
            wire::encode_varint_field(1, self.id, buf);
        }
        self.folder.encode_length_delimited(2, buf);
    }

    fn encoded_len(&self) -> usize {
        let id = if self.id == 0 {
            0
        } else {
            wire::encoded_len_varint_field(1, self.id)
        };
        id + self.folder.encoded_len_length_delimited(2)
    }

    fn merge(&mut self, other: &Self) {
        if other.id != 0 {
            self.id = other.id;
        }
        // A malformed nested folder merges whatever decoded.
        let _ = self.folder.merge(&other.folder);
    }

    fn clear(&mut self) {
        self.id = 0;
        self.folder.clear();
    }
}

/// Split `bytes` into `parts` nearly equal chunks, each its own allocation.
pub fn produce_chunks(bytes: &[u8], parts: usize) -> Vec<Bytes> {
    let size = bytes.len().div_ceil(parts.max(1)).max(1);
    bytes.chunks(size).map(Bytes::copy_from_slice).collect()
}

/// Space-separated lowercase hex.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write!(out, "{byte:02x}").unwrap();
    }
    out
}

pub fn sample_folder() -> Folder {
    Folder {
        files: vec![
            File::new("file1", 512),
            File::new("file2", 1024),
            File::new("file3", 2048),
        ],
        name: "docs".to_owned(),
    }
}
