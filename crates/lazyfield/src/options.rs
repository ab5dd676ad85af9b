/// Configuration options for [`SegmentedReader`](crate::SegmentedReader).
///
/// # Examples
///
/// ```rust
/// use lazyfield::{ReaderOptions, SegmentedReader};
///
/// let reader = SegmentedReader::new(ReaderOptions {
///     max_length: Some(64 << 20),
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderOptions {
    /// Largest accepted length prefix for a length-delimited field.
    ///
    /// Longer declared lengths fail with
    /// [`DecodeError::LengthLimit`](crate::DecodeError::LengthLimit) as soon
    /// as the prefix is read, without waiting for the body.
    ///
    /// # Default
    ///
    /// `None` (unlimited)
    pub max_length: Option<usize>,

    /// Whether to copy length-delimited values that span input chunks into a
    /// single contiguous buffer.
    ///
    /// When `false`, such values are captured as a list of
    /// [`Fragment`](crate::Fragment)s referencing the fed chunks and nothing is
    /// copied. Values that lie within one chunk are always zero-copy slices.
    ///
    /// # Default
    ///
    /// `false`
    pub coalesce_fragments: bool,

    #[cfg(any(test, feature = "fuzzing"))]
    /// Panic on decode errors instead of returning them.
    ///
    /// Enabled only in test builds to produce backtraces on failures.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub panic_on_error: bool,
}
