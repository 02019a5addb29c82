// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Forward allocator for one serialization pass.
//!
//! Objects are laid out front to back, so every uoffset points forward.
//! Referenced objects are always allocated after the slot that refers to
//! them; the shared-string writer delays its writes to keep that true.

use crate::buffer::SpanWriter;
use crate::config::{SerializerOptions, VECTOR_LENGTH_SIZE, VOFFSET_SIZE, VTABLE_HEADER_SIZE};
use crate::error::{SerializeError, SerializeResult};
use crate::layout::align_to;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Deferred fixup run on the finished buffer (e.g. sorting a vector).
pub type PostSerializeAction = Box<dyn FnOnce(&mut [u8]) -> SerializeResult<()> + Send>;

pub struct SerializationContext {
    offset: usize,
    capacity: usize,
    deduplicate_vtables: bool,
    vtables: HashMap<Vec<u8>, usize>,
    post_serialize_actions: Vec<PostSerializeAction>,
    shared_strings: Option<LruCache<String, Vec<usize>>>,
}

impl SerializationContext {
    pub fn new(capacity: usize, options: &SerializerOptions) -> Self {
        Self {
            offset: 0,
            capacity,
            deduplicate_vtables: options.deduplicate_vtables,
            vtables: HashMap::new(),
            post_serialize_actions: Vec::new(),
            shared_strings: NonZeroUsize::new(options.shared_string_cache_size)
                .map(LruCache::new),
        }
    }

    /// Next free byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve `size` bytes at the next `alignment` boundary.
    pub fn allocate_space(&mut self, size: usize, alignment: usize) -> SerializeResult<usize> {
        let start = align_to(self.offset, alignment.max(1));
        self.claim(start, size)
    }

    /// Reserve a vector of `count` items. The count field is 4-aligned and
    /// the first item lands on `item_alignment`. Returns the count position.
    pub fn allocate_vector(
        &mut self,
        item_alignment: usize,
        count: usize,
        item_size: usize,
    ) -> SerializeResult<usize> {
        let mut start = align_to(self.offset, VECTOR_LENGTH_SIZE);
        let item_alignment = item_alignment.max(1);
        while (start + VECTOR_LENGTH_SIZE) % item_alignment != 0 {
            start += VECTOR_LENGTH_SIZE;
        }
        let body = count
            .checked_mul(item_size)
            .ok_or(SerializeError::OffsetOverflow { offset: start })?;
        self.claim(start, VECTOR_LENGTH_SIZE + body)
    }

    fn claim(&mut self, start: usize, size: usize) -> SerializeResult<usize> {
        match start.checked_add(size) {
            Some(end) if end <= self.capacity => {
                self.offset = end;
                Ok(start)
            }
            _ => Err(SerializeError::BufferTooSmall {
                offset: start,
                needed: size,
                capacity: self.capacity,
            }),
        }
    }

    /// Give back the unused tail of the most recent allocation.
    ///
    /// Tables reserve their worst-case inline size, then shrink to the bytes
    /// actually written. Only valid while nothing was allocated after it.
    pub fn shrink_to(&mut self, reserved_end: usize, actual_end: usize) {
        debug_assert_eq!(self.offset, reserved_end);
        debug_assert!(actual_end <= reserved_end);
        if self.offset == reserved_end && actual_end <= reserved_end {
            self.offset = actual_end;
        }
    }

    /// Write `vtable` (or reuse an identical earlier one) and return its
    /// position.
    pub fn finish_vtable(&mut self, span: &mut [u8], vtable: &[u8]) -> SerializeResult<usize> {
        if self.deduplicate_vtables {
            if let Some(&existing) = self.vtables.get(vtable) {
                return Ok(existing);
            }
        }
        let position = self.allocate_space(vtable.len(), VOFFSET_SIZE)?;
        span.write_bytes(position, vtable)?;
        if self.deduplicate_vtables {
            self.vtables.insert(vtable.to_vec(), position);
        }
        Ok(position)
    }

    pub fn add_post_serialize_action(&mut self, action: PostSerializeAction) {
        self.post_serialize_actions.push(action);
    }

    /// Allocate a length-prefixed, NUL-terminated string and point `slot`
    /// at it.
    pub fn write_string(&mut self, span: &mut [u8], slot: usize, value: &str) -> SerializeResult<()> {
        let position = self.write_string_body(span, value)?;
        span.write_uoffset(slot, position)
    }

    fn write_string_body(&mut self, span: &mut [u8], value: &str) -> SerializeResult<usize> {
        let bytes = value.as_bytes();
        let position = self.allocate_vector(1, bytes.len() + 1, 1)?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| SerializeError::OffsetOverflow { offset: position })?;
        span.write_u32(position, len)?;
        span.write_bytes(position + VECTOR_LENGTH_SIZE, bytes)?;
        span.write_u8(position + VECTOR_LENGTH_SIZE + bytes.len(), 0)?;
        Ok(position)
    }

    /// Record a shared string reference at `slot`.
    ///
    /// Equal strings are written once. The write is delayed until the
    /// string leaves the LRU (or [`finish`](Self::finish)), so the body
    /// always lands after every slot that points at it.
    pub fn write_shared_string(
        &mut self,
        span: &mut [u8],
        slot: usize,
        value: &str,
    ) -> SerializeResult<()> {
        let Some(cache) = self.shared_strings.as_mut() else {
            return self.write_string(span, slot, value);
        };
        if let Some(slots) = cache.get_mut(value) {
            slots.push(slot);
            return Ok(());
        }
        // Key is absent, so a returned pair is always an eviction.
        if let Some((evicted, slots)) = cache.push(value.to_owned(), vec![slot]) {
            self.flush_shared_string(span, &evicted, &slots)?;
        }
        Ok(())
    }

    fn flush_shared_string(
        &mut self,
        span: &mut [u8],
        value: &str,
        slots: &[usize],
    ) -> SerializeResult<()> {
        let position = self.write_string_body(span, value)?;
        for &slot in slots {
            span.write_uoffset(slot, position)?;
        }
        Ok(())
    }

    /// Flush pending shared strings, run post-serialize actions, and return
    /// the number of bytes used.
    pub fn finish(&mut self, span: &mut [u8]) -> SerializeResult<usize> {
        if let Some(mut cache) = self.shared_strings.take() {
            while let Some((value, slots)) = cache.pop_lru() {
                self.flush_shared_string(span, &value, &slots)?;
            }
        }
        for action in std::mem::take(&mut self.post_serialize_actions) {
            action(span)?;
        }
        Ok(self.offset)
    }
}

/// Encode a vtable: its own length, the table length, then one voffset
/// per slot with trailing absent slots trimmed.
pub fn encode_vtable(entries: &[u16], table_len: usize) -> SerializeResult<Vec<u8>> {
    let used = entries.iter().rposition(|&e| e != 0).map_or(0, |i| i + 1);
    let vtable_len = VTABLE_HEADER_SIZE + VOFFSET_SIZE * used;
    let overflow = || SerializeError::OffsetOverflow { offset: table_len };
    let mut out = Vec::with_capacity(vtable_len);
    out.extend_from_slice(&u16::try_from(vtable_len).map_err(|_| overflow())?.to_le_bytes());
    out.extend_from_slice(&u16::try_from(table_len).map_err(|_| overflow())?.to_le_bytes());
    for entry in &entries[..used] {
        out.extend_from_slice(&entry.to_le_bytes());
    }
    Ok(out)
}

impl std::fmt::Debug for SerializationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationContext")
            .field("offset", &self.offset)
            .field("capacity", &self.capacity)
            .field("vtables", &self.vtables.len())
            .field("post_serialize_actions", &self.post_serialize_actions.len())
            .finish()
    }
}
