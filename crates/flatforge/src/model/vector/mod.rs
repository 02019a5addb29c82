// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Vector models.
//!
//! All plain vectors share one wire shape: a uoffset to a `u32` count
//! followed by the items, each padded to the item alignment. Reference items
//! (strings, tables) are stored as uoffsets. Union vectors use two parallel
//! vectors instead.

mod indexed;
mod list;
mod union_vector;

pub use indexed::IndexedVectorModel;
pub use list::ListVectorModel;
pub use union_vector::UnionVectorModel;

use super::{type_mismatch, TypeModel};
use crate::buffer::{InputBuffer, SpanWriter};
use crate::config::{UOFFSET_SIZE, VECTOR_LENGTH_SIZE, VECTOR_MIN_SIZE};
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::layout::{alignment_padding, max_padding, PhysicalLayoutElement};
use crate::schema::TypeKey;
use crate::value::Value;

pub(crate) const VECTOR_LAYOUT: [PhysicalLayoutElement; 1] =
    [PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE)];

/// Per-item footprint of `item` inside a vector: the inline element for
/// inline types, a uoffset otherwise.
pub(crate) fn item_element(item: &dyn TypeModel) -> Result<PhysicalLayoutElement, SchemaError> {
    if !item.serializes_inline() {
        return Ok(PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE));
    }
    match item.physical_layout() {
        [element] => Ok(*element),
        _ => Err(SchemaError::invalid_type(
            item.type_key(),
            "vector items need a single-slot layout",
        )),
    }
}

pub(crate) fn padded_item_size(element: PhysicalLayoutElement) -> usize {
    element.inline_size + alignment_padding(element.inline_size, element.alignment)
}

/// Upper bound of a vector body holding `count` items of `element`,
/// excluding out-of-line item bodies.
pub(crate) fn vector_body_max_size(element: PhysicalLayoutElement, count: usize) -> usize {
    VECTOR_MIN_SIZE + max_padding(element.alignment) + padded_item_size(element) * count
}

pub(crate) fn expect_items<'v>(key: &TypeKey, value: &'v Value) -> SerializeResult<&'v [Value]> {
    match value {
        Value::Vector(items) => Ok(items),
        Value::Null => Err(SerializeError::NullValue {
            type_name: key.to_string(),
        }),
        other => Err(type_mismatch(key, other)),
    }
}

pub(crate) fn write_count(span: &mut [u8], position: usize, count: usize) -> SerializeResult<()> {
    let count =
        u32::try_from(count).map_err(|_| SerializeError::OffsetOverflow { offset: position })?;
    span.write_u32(position, count)
}

/// Allocate a vector of `count` items, point `slot` at it and write the
/// count. Returns the position of the first item.
pub(crate) fn begin_vector(
    writer: &mut crate::runtime::Writer<'_>,
    slot: usize,
    element: PhysicalLayoutElement,
    count: usize,
) -> SerializeResult<usize> {
    let position =
        writer
            .context
            .allocate_vector(element.alignment, count, padded_item_size(element))?;
    write_count(writer.span, position, count)?;
    writer.span.write_uoffset(slot, position)?;
    Ok(position + VECTOR_LENGTH_SIZE)
}

/// Follow the uoffset at `slot` to a vector and check that `count * stride`
/// bytes of items are in bounds. Returns (first item, count).
pub(crate) fn read_vector_header(
    buffer: &[u8],
    slot: usize,
    stride: usize,
) -> ParseResult<(usize, usize)> {
    let start = buffer.read_uoffset(slot)?;
    let count = buffer.read_u32(start)? as usize;
    let first = start + VECTOR_LENGTH_SIZE;
    let len = count
        .checked_mul(stride)
        .ok_or(ParseError::InvalidOffset { offset: start })?;
    buffer.read_bytes(first, len)?;
    Ok((first, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_item_size() {
        assert_eq!(padded_item_size(PhysicalLayoutElement::new(4, 4)), 4);
        assert_eq!(padded_item_size(PhysicalLayoutElement::new(12, 8)), 16);
        assert_eq!(padded_item_size(PhysicalLayoutElement::new(3, 1)), 3);
    }

    #[test]
    fn test_vector_body_bound() {
        // count (4) + its worst padding (3) + item padding (7) + 2 items.
        assert_eq!(vector_body_max_size(PhysicalLayoutElement::new(8, 8), 2), 7 + 7 + 16);
        assert_eq!(vector_body_max_size(PhysicalLayoutElement::new(1, 1), 0), 7);
    }

    #[test]
    fn test_header_rejects_truncated_items() {
        // uoffset -> count 3 at 4, but only 2 bytes follow.
        let buffer = [4u8, 0, 0, 0, 3, 0, 0, 0, 1, 2];
        assert!(matches!(
            read_vector_header(&buffer, 0, 1),
            Err(ParseError::OutOfBounds { .. })
        ));
        let buffer = [4u8, 0, 0, 0, 2, 0, 0, 0, 1, 2];
        assert_eq!(read_vector_header(&buffer, 0, 1).unwrap(), (8, 2));
    }
}
