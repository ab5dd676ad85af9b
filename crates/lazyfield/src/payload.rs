use alloc::{borrow::Cow, vec::Vec};
use core::{fmt, iter, slice};

use bytes::{BufMut, Bytes, BytesMut};

use crate::Fragment;

/// The not-yet-decoded wire bytes of one field occurrence.
///
/// Either a single contiguous region, or the ordered fragments a zero-copy
/// reader captured when the value straddled input chunks. Both forms describe
/// the same logical byte string; nothing is ever copied until [`concatenate`]
/// is called. Equality follows the logical bytes, so a contiguous payload
/// equals any fragment list spelling the same bytes.
///
/// [`concatenate`]: Payload::concatenate
#[derive(Clone)]
pub enum Payload {
    /// One contiguous region.
    Contiguous(Bytes),
    /// Ordered fragments, logically concatenated.
    Fragmented(Vec<Fragment>),
}

impl Payload {
    /// A payload with no bytes.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Contiguous(Bytes::new())
    }

    /// Total logical length in bytes.
    #[must_use]
    pub fn binary_size(&self) -> usize {
        match self {
            Self::Contiguous(bytes) => bytes.len(),
            Self::Fragmented(fragments) => fragments.iter().map(Fragment::len).sum(),
        }
    }

    /// Whether the payload holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Contiguous(bytes) => bytes.is_empty(),
            Self::Fragmented(fragments) => fragments.iter().all(Fragment::is_empty),
        }
    }

    /// Number of stored regions (one for a contiguous payload).
    #[must_use]
    pub fn region_count(&self) -> usize {
        match self {
            Self::Contiguous(_) => 1,
            Self::Fragmented(fragments) => fragments.len(),
        }
    }

    /// Iterate the logical regions in order.
    ///
    /// Empty fragments are yielded as empty slices; callers that care can skip
    /// them.
    pub fn chunks(&self) -> Chunks<'_> {
        match self {
            Self::Contiguous(bytes) => Chunks::Single(iter::once(&bytes[..])),
            Self::Fragmented(fragments) => Chunks::Fragments(fragments.iter()),
        }
    }

    /// The payload as one slice.
    ///
    /// Borrows when the bytes are already contiguous (a contiguous payload or
    /// at most one non-empty fragment) and copies otherwise.
    #[must_use]
    pub fn concatenate(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Contiguous(bytes) => Cow::Borrowed(&bytes[..]),
            Self::Fragmented(fragments) => {
                let mut non_empty = fragments.iter().filter(|f| !f.is_empty());
                match (non_empty.next(), non_empty.next()) {
                    (None, _) => Cow::Borrowed(&[]),
                    (Some(only), None) => Cow::Borrowed(only.as_slice()),
                    _ => {
                        let mut out = Vec::with_capacity(self.binary_size());
                        for fragment in fragments {
                            out.extend_from_slice(fragment.as_slice());
                        }
                        Cow::Owned(out)
                    }
                }
            }
        }
    }

    /// The payload as one `Bytes`, sharing storage whenever no copy is needed.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Contiguous(bytes) => bytes,
            Self::Fragmented(fragments) => match fragments.as_slice() {
                [] => Bytes::new(),
                [only] => only.to_bytes(),
                many => {
                    let mut out = BytesMut::with_capacity(many.iter().map(Fragment::len).sum());
                    for fragment in many {
                        out.extend_from_slice(fragment.as_slice());
                    }
                    out.freeze()
                }
            },
        }
    }

    /// Write the payload verbatim, one `put_slice` per region.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        for chunk in self.chunks() {
            buf.put_slice(chunk);
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Contiguous(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Contiguous(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Contiguous(Bytes::from_static(bytes))
    }
}

impl From<Vec<Fragment>> for Payload {
    fn from(fragments: Vec<Fragment>) -> Self {
        Self::Fragmented(fragments)
    }
}

impl FromIterator<Fragment> for Payload {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        Self::Fragmented(iter.into_iter().collect())
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.binary_size() == other.binary_size()
            && self.chunks().flatten().eq(other.chunks().flatten())
    }
}

impl Eq for Payload {}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contiguous(bytes) => f.debug_tuple("Contiguous").field(&bytes.len()).finish(),
            Self::Fragmented(fragments) => f
                .debug_tuple("Fragmented")
                .field(&fragments.iter().map(Fragment::len).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Iterator over the regions of a [`Payload`].
#[derive(Debug, Clone)]
pub enum Chunks<'a> {
    #[doc(hidden)]
    Single(iter::Once<&'a [u8]>),
    #[doc(hidden)]
    Fragments(slice::Iter<'a, Fragment>),
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Single(once) => once.next(),
            Self::Fragments(fragments) => fragments.next().map(Fragment::as_slice),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Single(once) => once.size_hint(),
            Self::Fragments(fragments) => fragments.size_hint(),
        }
    }
}

impl ExactSizeIterator for Chunks<'_> {}
