#![no_main]
use arbitrary::Arbitrary;
use bytes::{BufMut, Bytes};
use lazyfield::{DecodeError, Field, FieldValue, LazyField, Message, ReaderOptions, SegmentedReader};
use libfuzzer_sys::fuzz_target;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Arbitrary)]
struct Input {
    flags: u8,
    split_seed: u64,
    data: Vec<u8>,
}

/// A message that keeps its bytes as-is, so any payload decodes.
#[derive(Debug, Default, Clone, PartialEq)]
struct Opaque(Vec<u8>);

impl Message for Opaque {
    fn merge_bytes(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        self.0.extend_from_slice(buf);
        Ok(())
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.0);
    }

    fn encoded_len(&self) -> usize {
        self.0.len()
    }

    fn merge(&mut self, other: &Self) {
        self.0.extend_from_slice(&other.0);
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// A field with its payload flattened, comparable across chunkings.
#[derive(Debug, PartialEq)]
enum Flat {
    Scalar(u32, FieldValue),
    Bytes(u32, Vec<u8>),
}

fn flatten(field: Field) -> Flat {
    match field.value {
        FieldValue::LengthDelimited(payload) => Flat::Bytes(field.number, payload.concatenate().into_owned()),
        value => Flat::Scalar(field.number, value),
    }
}

fn read(chunks: impl IntoIterator<Item = Bytes>, options: ReaderOptions) -> Vec<Result<Field, DecodeError>> {
    let mut reader = SegmentedReader::new(options);
    let mut out = Vec::new();
    for chunk in chunks {
        reader.feed(chunk);
        out.extend(reader.by_ref());
    }
    reader.finish();
    out.extend(reader);
    out
}

/// Split `data` into chunks of random nonzero length derived from `seed`.
fn split_into_chunks(data: &Bytes, seed: u64) -> Vec<Bytes> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let size = rng.random_range(1..=data.len() - start);
        chunks.push(data.slice(start..start + size));
        start += size;
    }
    chunks
}

fn reader(input: Input) {
    let Input {
        flags,
        split_seed,
        data,
    } = input;
    let data = Bytes::from(data);

    let options = ReaderOptions {
        coalesce_fragments: flags & 1 != 0,
        max_length: (flags & 2 != 0).then_some(usize::from(flags >> 2)),
        panic_on_error: false,
    };

    let whole = read([data.clone()], options);
    let chunked = read(split_into_chunks(&data, split_seed), options);
    assert_eq!(whole.len(), chunked.len());

    for (expected, actual) in whole.into_iter().zip(chunked) {
        let (expected, actual) = match (expected, actual) {
            (Ok(expected), Ok(actual)) => (expected, actual),
            (expected, actual) => {
                assert_eq!(expected.err(), actual.err());
                continue;
            }
        };

        let mut framed = Vec::new();
        actual.encode(&mut framed);

        if let FieldValue::LengthDelimited(payload) = &actual.value {
            // Packed passthrough and decoded re-encoding agree for opaque bytes.
            let mut field = LazyField::<Opaque>::from_payload(payload.clone());
            let mut lazy = Vec::new();
            field.encode_length_delimited(actual.number, &mut lazy);
            assert_eq!(lazy, framed);
            assert_eq!(field.encoded_len_length_delimited(actual.number), framed.len());

            field.unpack();
            let mut unpacked = Vec::new();
            field.encode_length_delimited(actual.number, &mut unpacked);
            assert_eq!(unpacked, framed);
        }

        assert_eq!(flatten(expected), flatten(actual));
    }
}

fuzz_target!(|input: Input| reader(input));
