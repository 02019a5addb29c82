// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian primitive access over byte slices.
//!
//! [`InputBuffer`] reads, [`SpanWriter`] writes. Both are bounds-checked and
//! implemented for `[u8]`; offsets are absolute positions in the buffer.

use crate::config::{VOFFSET_SIZE, VTABLE_HEADER_SIZE};
use crate::error::{ParseError, ParseResult, SerializeError, SerializeResult};

/// Generate read methods for primitive types.
///
/// Each generated method checks bounds (`ParseError::OutOfBounds`) and
/// decodes via `from_le_bytes()`.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        fn $name(&self, offset: usize) -> ParseResult<$type> {
            let bytes = self.read_bytes(offset, $size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

/// Generate write methods for primitive types.
///
/// Each generated method encodes via `to_le_bytes()` and checks bounds
/// (`SerializeError::BufferTooSmall`).
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        fn $name(&mut self, offset: usize, value: $type) -> SerializeResult<()> {
            self.write_bytes(offset, &value.to_le_bytes())
        }
    };
}

pub trait InputBuffer {
    fn as_bytes(&self) -> &[u8];

    fn read_bytes(&self, offset: usize, len: usize) -> ParseResult<&[u8]> {
        let bytes = self.as_bytes();
        offset
            .checked_add(len)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(ParseError::OutOfBounds {
                offset,
                len,
                buffer_len: bytes.len(),
            })
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    fn read_bool(&self, offset: usize) -> ParseResult<bool> {
        Ok(self.read_u8(offset)? != 0)
    }

    /// Follow the uoffset stored at `offset` to its absolute target.
    fn read_uoffset(&self, offset: usize) -> ParseResult<usize> {
        let relative = self.read_u32(offset)? as usize;
        if relative == 0 {
            return Err(ParseError::InvalidOffset { offset });
        }
        offset
            .checked_add(relative)
            .filter(|target| *target < self.as_bytes().len())
            .ok_or(ParseError::InvalidOffset { offset })
    }

    /// Length-prefixed UTF-8 string referenced by the uoffset at `offset`.
    fn read_string(&self, offset: usize) -> ParseResult<String> {
        let start = self.read_uoffset(offset)?;
        let len = self.read_u32(start)? as usize;
        let bytes = self.read_bytes(start + 4, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ParseError::InvalidUtf8 { offset: start })
    }

    /// Absolute position of table field `index`, or `None` when the vtable
    /// is too short or the entry is 0.
    fn get_absolute_table_field_location(
        &self,
        table_offset: usize,
        index: u16,
    ) -> ParseResult<Option<usize>> {
        let soffset = i64::from(self.read_i32(table_offset)?);
        let vtable = table_offset as i64 - soffset;
        if vtable < 0 {
            return Err(ParseError::InvalidOffset {
                offset: table_offset,
            });
        }
        let vtable = vtable as usize;
        let vtable_len = self.read_u16(vtable)? as usize;
        let entry = VTABLE_HEADER_SIZE + VOFFSET_SIZE * index as usize;
        if entry + VOFFSET_SIZE > vtable_len {
            return Ok(None);
        }
        match self.read_u16(vtable + entry)? {
            0 => Ok(None),
            relative => Ok(Some(table_offset + relative as usize)),
        }
    }
}

impl InputBuffer for [u8] {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

impl InputBuffer for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

pub trait SpanWriter {
    fn as_bytes_mut(&mut self) -> &mut [u8];

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> SerializeResult<()> {
        let span = self.as_bytes_mut();
        let capacity = span.len();
        let target = offset
            .checked_add(data.len())
            .and_then(|end| span.get_mut(offset..end))
            .ok_or(SerializeError::BufferTooSmall {
                offset,
                needed: data.len(),
                capacity,
            })?;
        target.copy_from_slice(data);
        Ok(())
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    fn write_bool(&mut self, offset: usize, value: bool) -> SerializeResult<()> {
        self.write_u8(offset, u8::from(value))
    }

    /// Store at `offset` a forward uoffset to `target`.
    fn write_uoffset(&mut self, offset: usize, target: usize) -> SerializeResult<()> {
        if target <= offset {
            return Err(SerializeError::OffsetOverflow { offset });
        }
        let relative =
            u32::try_from(target - offset).map_err(|_| SerializeError::OffsetOverflow { offset })?;
        self.write_u32(offset, relative)
    }

    /// Store at `table_offset` the signed distance back to `vtable_offset`.
    fn write_soffset(&mut self, table_offset: usize, vtable_offset: usize) -> SerializeResult<()> {
        let relative = i32::try_from(table_offset as i64 - vtable_offset as i64).map_err(|_| {
            SerializeError::OffsetOverflow {
                offset: table_offset,
            }
        })?;
        self.write_i32(table_offset, relative)
    }
}

impl SpanWriter for [u8] {
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}
