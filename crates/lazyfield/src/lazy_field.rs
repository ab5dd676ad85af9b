//! The deferred-decode container.
//!
//! A [`LazyField`] holds one occurrence of an embedded message. It starts out
//! either *packed* (holding the raw wire bytes handed over by a reader) or
//! *unpacked* (holding a decoded value, e.g. after default construction).
//!
//! While packed, encoding writes the stored bytes back verbatim: whatever
//! encoding choices the producer made (field order, redundant fields, padded
//! varints) survive a pass through the pipeline untouched. The first call to
//! [`LazyField::unpack`] decodes the bytes, and from then on the decoded value
//! is the only source of truth.
//!
//! ```text
//!   set_raw_payload ──► Packed ──unpack / merge──► Unpacked
//!         ▲                                           │
//!         └───────────────────────────────────────────┘
//! ```
//!
//! There is no way back from `Unpacked` to `Packed` except assigning a new
//! payload.

use core::{cell::Cell, fmt, marker::PhantomData, mem};

use bytes::BufMut;
use log::{debug, trace};

use crate::{
    DecodeError, Message, Payload,
    scope::{Heap, Scope},
    wire::{self, WireType},
};

enum State<T> {
    Packed {
        payload: Payload,
        cached_size: Cell<Option<usize>>,
        /// A previously decoded slot kept for the next unpack.
        spare: Option<T>,
    },
    Unpacked(T),
}

impl<T> State<T> {
    fn packed(payload: Payload, spare: Option<T>) -> Self {
        Self::Packed {
            payload,
            cached_size: Cell::new(None),
            spare,
        }
    }

    const fn empty() -> Self {
        Self::Packed {
            payload: Payload::empty(),
            cached_size: Cell::new(Some(0)),
            spare: None,
        }
    }
}

/// A field holding an embedded message of type `M`, decoded on first use.
///
/// `S` decides where the decoded value lives; see [`Scope`]. With the default
/// [`Heap`] scope the container owns its value. With `&Arena<M>` the arena does.
///
/// Decoding requires `&mut self`: a field cannot be unpacked concurrently from
/// several threads, and callers that need parallel access must clone the field
/// per consumer (a packed clone shares its bytes instead of copying them).
pub struct LazyField<M, S: Scope<M> = Heap> {
    state: State<S::Slot>,
    scope: S,
    marker: PhantomData<fn() -> M>,
}

impl<M: Message> LazyField<M> {
    /// An unpacked field holding `M::default()`, owned by the container.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(Heap)
    }

    /// A packed field holding `payload`, owned by the container.
    #[must_use]
    pub fn from_payload(payload: impl Into<Payload>) -> Self {
        Self::from_payload_in(payload, Heap)
    }
}

impl<M: Message, S: Scope<M>> LazyField<M, S> {
    /// An unpacked field holding `M::default()` allocated in `scope`.
    #[must_use]
    pub fn new_in(scope: S) -> Self {
        Self {
            state: State::Unpacked(scope.alloc(M::default())),
            scope,
            marker: PhantomData,
        }
    }

    /// A packed field holding `payload`; decoding will allocate in `scope`.
    #[must_use]
    pub fn from_payload_in(payload: impl Into<Payload>, scope: S) -> Self {
        let payload = payload.into();
        trace!("lazy field packed with {} bytes", payload.binary_size());
        Self {
            state: State::packed(payload, None),
            scope,
            marker: PhantomData,
        }
    }

    /// The scope decoded values are allocated in.
    #[must_use]
    pub fn scope(&self) -> S {
        self.scope
    }

    /// Replace the field's contents with raw wire bytes.
    ///
    /// Nothing is decoded. Until the next [`unpack`](Self::unpack), encoding
    /// reproduces exactly these bytes. A previously decoded value stops being
    /// authoritative; its allocation is kept for reuse.
    pub fn set_raw_payload(&mut self, payload: impl Into<Payload>) {
        let payload = payload.into();
        trace!(
            "lazy field packed with {} bytes in {} regions",
            payload.binary_size(),
            payload.region_count()
        );
        let spare = match mem::replace(&mut self.state, State::empty()) {
            State::Packed { spare, .. } => spare,
            State::Unpacked(slot) => Some(slot),
        };
        self.state = State::packed(payload, spare);
    }

    /// Replace the field's contents with a decoded value.
    pub fn set_value(&mut self, value: M) {
        match &mut self.state {
            State::Unpacked(slot) => **slot = value,
            State::Packed { spare, .. } => {
                let slot = match spare.take() {
                    Some(mut slot) => {
                        *slot = value;
                        slot
                    }
                    None => self.scope.alloc(value),
                };
                self.state = State::Unpacked(slot);
            }
        }
    }

    /// Whether the decoded value is authoritative.
    #[must_use]
    pub fn is_unpacked(&self) -> bool {
        matches!(self.state, State::Unpacked(_))
    }

    /// The raw payload, while the field is packed.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        match &self.state {
            State::Packed { payload, .. } => Some(payload),
            State::Unpacked(_) => None,
        }
    }

    /// The decoded value, if the field has been unpacked.
    #[must_use]
    pub fn get(&self) -> Option<&M> {
        match &self.state {
            State::Packed { .. } => None,
            State::Unpacked(slot) => Some(&**slot),
        }
    }

    /// Decode the payload if needed and return the decoded value.
    ///
    /// Decoding happens at most once per assigned payload; later calls return
    /// the cached value. Mutations made through the returned reference are
    /// reflected by every later [`encode`](Self::encode) and
    /// [`encoded_len`](Self::encoded_len).
    ///
    /// A malformed payload still unpacks: the value holds whatever was decoded
    /// before the failure. Use [`try_unpack`](Self::try_unpack) to observe the
    /// error.
    pub fn unpack(&mut self) -> &mut M {
        if let Err(err) = self.transition() {
            debug!("lazy field unpacked with decode error: {err}");
        }
        self.slot_mut()
    }

    /// Like [`unpack`](Self::unpack) but reports a decode failure.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error when this call performed the transition
    /// and the payload was malformed. The field is unpacked either way, so a
    /// second call returns `Ok` with the partially decoded value.
    pub fn try_unpack(&mut self) -> Result<&mut M, DecodeError> {
        self.transition()?;
        Ok(self.slot_mut())
    }

    fn transition(&mut self) -> Result<(), DecodeError> {
        let State::Packed { payload, spare, .. } = &mut self.state else {
            return Ok(());
        };
        trace!(
            "unpacking lazy field: {} bytes in {} regions",
            payload.binary_size(),
            payload.region_count()
        );
        let mut slot = reclaim::<M, S>(self.scope, spare);
        let result = slot.merge_bytes(&payload.concatenate());
        self.state = State::Unpacked(slot);
        result
    }

    fn slot_mut(&mut self) -> &mut M {
        match &mut self.state {
            State::Unpacked(slot) => &mut **slot,
            State::Packed { .. } => unreachable!("lazy field read before unpacking"),
        }
    }

    /// Write the field's encoding (without key or length prefix).
    ///
    /// Packed fields write their payload verbatim, one `put_slice` per stored
    /// region. Unpacked fields delegate to [`Message::encode`].
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        match &self.state {
            State::Packed { payload, .. } => payload.write_to(buf),
            State::Unpacked(slot) => slot.encode(buf),
        }
    }

    /// Encode into a freshly allocated vector.
    #[must_use]
    pub fn encode_to_vec(&self) -> alloc::vec::Vec<u8> {
        let mut out = alloc::vec::Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }

    /// Number of bytes [`encode`](Self::encode) writes.
    ///
    /// The payload length is computed once per payload and cached. The size of
    /// a decoded value is recomputed every time, since it may have been
    /// mutated in between.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match &self.state {
            State::Packed {
                payload,
                cached_size,
                ..
            } => {
                if let Some(size) = cached_size.get() {
                    return size;
                }
                let size = payload.binary_size();
                cached_size.set(Some(size));
                size
            }
            State::Unpacked(slot) => slot.encoded_len(),
        }
    }

    /// Write the field as a length-delimited entry of a parent record: key,
    /// length prefix, then the body from [`encode`](Self::encode).
    ///
    /// # Panics
    ///
    /// Panics if `field_number` is not a valid protobuf field number.
    pub fn encode_length_delimited<B: BufMut>(&self, field_number: u32, buf: &mut B) {
        wire::encode_key(field_number, WireType::LengthDelimited, buf);
        wire::encode_varint(self.encoded_len() as u64, buf);
        self.encode(buf);
    }

    /// Size of [`encode_length_delimited`](Self::encode_length_delimited)'s
    /// output.
    #[must_use]
    pub fn encoded_len_length_delimited(&self, field_number: u32) -> usize {
        wire::encoded_len_length_delimited(field_number, self.encoded_len())
    }

    /// Reset the field to the state of a default-constructed one: unpacked,
    /// holding `M::default()`.
    ///
    /// Reuses the current allocation when there is one.
    pub fn clear(&mut self) {
        match &mut self.state {
            State::Unpacked(slot) => slot.clear(),
            State::Packed { spare, .. } => {
                let slot = reclaim::<M, S>(self.scope, spare);
                self.state = State::Unpacked(slot);
            }
        }
    }

    /// Merge the contents of `other` into `self` using `M`'s merge rules.
    ///
    /// `self` is unpacked first. `other` is never modified: if it is packed,
    /// its payload is decoded into a temporary value, which is then merged.
    ///
    /// # Errors
    ///
    /// Reports a decode failure on either side. The merge is still applied
    /// with whatever was decoded; nothing is rolled back.
    pub fn merge<T: Scope<M>>(&mut self, other: &LazyField<M, T>) -> Result<(), DecodeError> {
        let own = self.transition();
        let target = self.slot_mut();
        let theirs = match &other.state {
            State::Unpacked(slot) => {
                target.merge(slot);
                Ok(())
            }
            State::Packed { payload, .. } => {
                let mut scratch = M::default();
                let result = scratch.merge_bytes(&payload.concatenate());
                target.merge(&scratch);
                result
            }
        };
        own.and(theirs)
    }

    /// Move the contents out, leaving an empty field in the same scope.
    ///
    /// The returned field carries whichever state was authoritative. The
    /// source is left packed with an empty payload, which encodes and decodes
    /// exactly like a cleared field.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            state: mem::replace(&mut self.state, State::empty()),
            scope: self.scope,
            marker: PhantomData,
        }
    }

    /// Consume the field and return its value, decoding if necessary.
    ///
    /// An arena-scoped value is moved out and replaced by `M::default()` in
    /// the arena.
    ///
    /// # Errors
    ///
    /// Returns the decode error of a malformed payload.
    pub fn into_value(mut self) -> Result<M, DecodeError> {
        match &mut self.state {
            State::Packed { payload, .. } => M::decode(&payload.concatenate()),
            State::Unpacked(slot) => Ok(mem::take(&mut **slot)),
        }
    }
}

/// A cleared slot: the spare one when available, else a new allocation.
fn reclaim<M: Message, S: Scope<M>>(scope: S, spare: &mut Option<S::Slot>) -> S::Slot {
    match spare.take() {
        Some(mut slot) => {
            slot.clear();
            slot
        }
        None => scope.alloc(M::default()),
    }
}

impl<M: Message> Default for LazyField<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> From<Payload> for LazyField<M> {
    fn from(payload: Payload) -> Self {
        Self::from_payload(payload)
    }
}

impl<M: Message + Clone, S: Scope<M>> Clone for LazyField<M, S> {
    /// Packed fields share their payload storage and are not decoded;
    /// unpacked fields deep-copy the value into the same scope.
    fn clone(&self) -> Self {
        let state = match &self.state {
            State::Packed {
                payload,
                cached_size,
                ..
            } => State::Packed {
                payload: payload.clone(),
                cached_size: cached_size.clone(),
                spare: None,
            },
            State::Unpacked(slot) => State::Unpacked(self.scope.alloc(M::clone(slot))),
        };
        Self {
            state,
            scope: self.scope,
            marker: PhantomData,
        }
    }
}

impl<M: Message + fmt::Debug, S: Scope<M>> fmt::Debug for LazyField<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("LazyField");
        match &self.state {
            State::Packed { payload, .. } => s.field("packed", payload),
            State::Unpacked(slot) => s.field("unpacked", &**slot),
        };
        s.field("external_scope", &self.scope.is_external())
            .finish()
    }
}
