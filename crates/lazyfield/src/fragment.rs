use core::fmt;

use bytes::Bytes;

/// A trimmed view over a shared, immutable buffer.
///
/// The logical contents are `buffer[start_trim..buffer.len() - end_trim]`.
/// Cloning a fragment bumps the buffer's (atomic) reference count; the bytes
/// themselves are never copied or mutated, so fragments of the same buffer may
/// be held by any number of containers on any number of threads.
///
/// Equality compares the trimmed views, not the underlying buffers.
#[derive(Clone)]
pub struct Fragment {
    buffer: Bytes,
    start_trim: usize,
    end_trim: usize,
}

impl Fragment {
    /// Create a fragment over `buffer` with `start_trim` bytes dropped from the
    /// front and `end_trim` bytes dropped from the back.
    ///
    /// # Panics
    ///
    /// Panics if `start_trim + end_trim` exceeds `buffer.len()`. Out-of-range
    /// trims mean the producing reader is broken; there is no recovery.
    #[must_use]
    pub fn new(buffer: Bytes, start_trim: usize, end_trim: usize) -> Self {
        assert!(
            start_trim
                .checked_add(end_trim)
                .is_some_and(|trim| trim <= buffer.len()),
            "fragment trims {start_trim}+{end_trim} exceed buffer length {}",
            buffer.len()
        );
        Self {
            buffer,
            start_trim,
            end_trim,
        }
    }

    /// The untrimmed shared buffer.
    #[must_use]
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Bytes dropped from the front of the buffer.
    #[must_use]
    pub fn start_trim(&self) -> usize {
        self.start_trim
    }

    /// Bytes dropped from the back of the buffer.
    #[must_use]
    pub fn end_trim(&self) -> usize {
        self.end_trim
    }

    /// Logical length after trimming.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len() - self.start_trim - self.end_trim
    }

    /// Whether the trimmed view is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The trimmed view.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.start_trim..self.buffer.len() - self.end_trim]
    }

    /// The trimmed view as a `Bytes` sharing the same storage.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.buffer
            .slice(self.start_trim..self.buffer.len() - self.end_trim)
    }
}

impl From<Bytes> for Fragment {
    fn from(buffer: Bytes) -> Self {
        Self {
            buffer,
            start_trim: 0,
            end_trim: 0,
        }
    }
}

impl AsRef<[u8]> for Fragment {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Fragment {}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("buffer_len", &self.buffer.len())
            .field("start_trim", &self.start_trim)
            .field("end_trim", &self.end_trim)
            .finish()
    }
}
