// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sorted vectors of keyed tables.
//!
//! Sorting happens on the serialized bytes after the buffer is complete:
//! the uoffsets of the vector are permuted so the referenced tables appear
//! in key order. Readers can then binary-search the vector in place.

use crate::buffer::{InputBuffer, SpanWriter};
use crate::config::{UOFFSET_SIZE, VECTOR_LENGTH_SIZE};
use crate::error::{ParseError, ParseResult, SerializeError, SerializeResult};
use crate::schema::ScalarKind;
use crate::value::MapKey;
use std::cmp::Ordering;

/// Wire type of a sort key. Floats are excluded: NaN has no total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKeyKind {
    Bool,
    Signed(ScalarKind),
    Unsigned(ScalarKind),
    /// Compared bytewise.
    String,
}

impl SortKeyKind {
    pub fn from_scalar(kind: ScalarKind) -> Option<Self> {
        match kind {
            ScalarKind::Bool => Some(Self::Bool),
            ScalarKind::F32 | ScalarKind::F64 => None,
            k if k.is_signed() => Some(Self::Signed(k)),
            k => Some(Self::Unsigned(k)),
        }
    }

    /// Canonical form of a key for this kind, or `None` if it cannot be one.
    pub fn normalize(&self, key: &MapKey) -> Option<MapKey> {
        match (self, key) {
            (Self::Bool, MapKey::Bool(b)) => Some(MapKey::Bool(*b)),
            (Self::String, MapKey::String(s)) => Some(MapKey::String(s.clone())),
            (Self::Signed(kind), key) => {
                let v = key.as_i128()?;
                let (min, max) = kind.integer_range()?;
                (min..=max).contains(&v).then(|| MapKey::Int(v as i64))
            }
            (Self::Unsigned(kind), key) => {
                let v = key.as_i128()?;
                let (min, max) = kind.integer_range()?;
                (min..=max).contains(&v).then(|| MapKey::UInt(v as u64))
            }
            _ => None,
        }
    }

    /// Read the key stored at field location `location`.
    pub fn read(&self, buffer: &[u8], location: usize) -> ParseResult<MapKey> {
        Ok(match self {
            Self::Bool => MapKey::Bool(buffer.read_bool(location)?),
            Self::String => MapKey::String(buffer.read_string(location)?),
            Self::Signed(kind) => MapKey::Int(match kind {
                ScalarKind::I8 => i64::from(buffer.read_i8(location)?),
                ScalarKind::I16 => i64::from(buffer.read_i16(location)?),
                ScalarKind::I32 => i64::from(buffer.read_i32(location)?),
                _ => buffer.read_i64(location)?,
            }),
            Self::Unsigned(kind) => MapKey::UInt(match kind {
                ScalarKind::U8 => u64::from(buffer.read_u8(location)?),
                ScalarKind::U16 => u64::from(buffer.read_u16(location)?),
                ScalarKind::U32 => u64::from(buffer.read_u32(location)?),
                _ => buffer.read_u64(location)?,
            }),
        })
    }
}

/// How to find and compare the key of each table in a sorted vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeySpec {
    pub table: String,
    /// Vtable slot of the key member.
    pub index: u16,
    pub kind: SortKeyKind,
    /// Value of an absent scalar key.
    pub default: Option<MapKey>,
}

impl SortKeySpec {
    /// Key of the table at absolute position `table`.
    pub fn read_key(&self, buffer: &[u8], table: usize) -> ParseResult<Option<MapKey>> {
        match buffer.get_absolute_table_field_location(table, self.index)? {
            Some(location) => self.kind.read(buffer, location).map(Some),
            None => Ok(self.default.clone()),
        }
    }
}

fn item_slot(vector: usize, index: usize) -> usize {
    vector + VECTOR_LENGTH_SIZE + UOFFSET_SIZE * index
}

/// Reorder the vector of tables at `vector` by key.
///
/// Ties keep their serialized order.
pub fn sort_vector_of_tables(
    span: &mut [u8],
    vector: usize,
    key: &SortKeySpec,
) -> SerializeResult<()> {
    let corrupt = |_: ParseError| SerializeError::OffsetOverflow { offset: vector };
    let buffer: &[u8] = &*span;
    let count = buffer.read_u32(vector).map_err(corrupt)? as usize;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let table = buffer.read_uoffset(item_slot(vector, i)).map_err(corrupt)?;
        let Some(value) = key.read_key(buffer, table).map_err(corrupt)? else {
            return Err(SerializeError::MissingSortKey {
                type_name: key.table.clone(),
            });
        };
        entries.push((value, table));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (i, (_, table)) in entries.into_iter().enumerate() {
        span.write_uoffset(item_slot(vector, i), table)?;
    }
    Ok(())
}

/// Binary search a sorted vector of tables for `target`, returning the
/// absolute position of the matching table.
pub fn binary_search_by_key(
    buffer: &[u8],
    vector: usize,
    key: &SortKeySpec,
    target: &MapKey,
) -> ParseResult<Option<usize>> {
    let Some(target) = key.kind.normalize(target) else {
        return Ok(None);
    };
    let mut low = 0usize;
    let mut high = buffer.read_u32(vector)? as usize;
    while low < high {
        let mid = low + (high - low) / 2;
        let table = buffer.read_uoffset(item_slot(vector, mid))?;
        let Some(found) = key.read_key(buffer, table)? else {
            return Err(ParseError::InvalidOffset { offset: table });
        };
        match found.cmp(&target) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Ok(Some(table)),
        }
    }
    Ok(None)
}
