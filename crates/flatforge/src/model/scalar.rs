// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{type_mismatch, SchemaKind, TypeModel};
use crate::buffer::{InputBuffer, SpanWriter};
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::runtime::{Reader, Writer};
use crate::schema::{ScalarKind, TypeKey};
use crate::sorted::SortKeyKind;
use crate::value::Value;

/// Fixed-width primitive.
#[derive(Debug)]
pub struct ScalarModel {
    key: TypeKey,
    kind: ScalarKind,
    layout: [PhysicalLayoutElement; 1],
}

impl ScalarModel {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            key: TypeKey::Scalar(kind),
            kind,
            layout: [PhysicalLayoutElement::new(kind.size(), kind.size())],
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
}

/// Zero of the given kind in canonical form.
pub(crate) fn zero_value(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Bool => Value::Bool(false),
        ScalarKind::F32 | ScalarKind::F64 => Value::Float(0.0),
        k if k.is_signed() => Value::Int(0),
        _ => Value::UInt(0),
    }
}

/// Canonical representation of `value` as `kind`, if it fits.
pub(crate) fn canonical_scalar(kind: ScalarKind, value: &Value) -> Option<Value> {
    match kind {
        ScalarKind::Bool => value.as_bool().map(Value::Bool),
        ScalarKind::F32 => value.as_f64().map(|v| Value::Float(f64::from(v as f32))),
        ScalarKind::F64 => value.as_f64().map(Value::Float),
        k => {
            let v = value.as_i128()?;
            let (min, max) = k.integer_range()?;
            if !(min..=max).contains(&v) {
                return None;
            }
            Some(if k.is_signed() {
                Value::Int(v as i64)
            } else {
                Value::UInt(v as u64)
            })
        }
    }
}

pub(crate) fn write_scalar(
    span: &mut [u8],
    kind: ScalarKind,
    offset: usize,
    value: &Value,
) -> SerializeResult<()> {
    if value.is_null() {
        return Err(SerializeError::NullValue {
            type_name: kind.name().into(),
        });
    }
    let mismatch = || type_mismatch(&TypeKey::Scalar(kind), value);
    let out_of_range = || SerializeError::OutOfRange {
        type_name: kind.name().into(),
        value: format!("{:?}", value),
    };
    macro_rules! int {
        ($type:ty) => {
            <$type>::try_from(value.as_i128().ok_or_else(mismatch)?).map_err(|_| out_of_range())?
        };
    }
    match kind {
        ScalarKind::Bool => span.write_bool(offset, value.as_bool().ok_or_else(mismatch)?),
        ScalarKind::F32 => match value {
            Value::Float(v) => span.write_f32(offset, *v as f32),
            _ => Err(mismatch()),
        },
        ScalarKind::F64 => match value {
            Value::Float(v) => span.write_f64(offset, *v),
            _ => Err(mismatch()),
        },
        ScalarKind::I8 => span.write_i8(offset, int!(i8)),
        ScalarKind::U8 => span.write_u8(offset, int!(u8)),
        ScalarKind::I16 => span.write_i16(offset, int!(i16)),
        ScalarKind::U16 => span.write_u16(offset, int!(u16)),
        ScalarKind::I32 => span.write_i32(offset, int!(i32)),
        ScalarKind::U32 => span.write_u32(offset, int!(u32)),
        ScalarKind::I64 => span.write_i64(offset, int!(i64)),
        ScalarKind::U64 => span.write_u64(offset, int!(u64)),
    }
}

pub(crate) fn read_scalar(buffer: &[u8], kind: ScalarKind, offset: usize) -> ParseResult<Value> {
    Ok(match kind {
        ScalarKind::Bool => Value::Bool(buffer.read_bool(offset)?),
        ScalarKind::I8 => Value::Int(i64::from(buffer.read_i8(offset)?)),
        ScalarKind::U8 => Value::UInt(u64::from(buffer.read_u8(offset)?)),
        ScalarKind::I16 => Value::Int(i64::from(buffer.read_i16(offset)?)),
        ScalarKind::U16 => Value::UInt(u64::from(buffer.read_u16(offset)?)),
        ScalarKind::I32 => Value::Int(i64::from(buffer.read_i32(offset)?)),
        ScalarKind::U32 => Value::UInt(u64::from(buffer.read_u32(offset)?)),
        ScalarKind::I64 => Value::Int(buffer.read_i64(offset)?),
        ScalarKind::U64 => Value::UInt(buffer.read_u64(offset)?),
        ScalarKind::F32 => Value::Float(f64::from(buffer.read_f32(offset)?)),
        ScalarKind::F64 => Value::Float(buffer.read_f64(offset)?),
    })
}

/// Rust literal for a canonical scalar value.
pub(crate) fn scalar_literal(kind: ScalarKind, value: &Value) -> String {
    match (kind, value) {
        (_, Value::Bool(b)) => b.to_string(),
        (_, Value::Float(v)) => format!("{:?}{}", v, kind.name()),
        (_, Value::Int(v)) => format!("{}{}", v, kind.name()),
        (_, Value::UInt(v)) => format!("{}{}", v, kind.name()),
        _ => format!("{}::default()", kind.name()),
    }
}

impl TypeModel for ScalarModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Scalar
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &self.layout
    }

    fn is_fixed_size(&self) -> bool {
        true
    }

    fn serializes_inline(&self) -> bool {
        true
    }

    fn is_valid_struct_member(&self) -> bool {
        true
    }

    fn is_valid_vector_member(&self) -> bool {
        true
    }

    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        SortKeyKind::from_scalar(self.kind)
    }

    fn default_value(&self) -> Value {
        zero_value(self.kind)
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        canonical_scalar(self.kind, value).ok_or_else(|| {
            SchemaError::invalid_type(
                &self.key,
                format!("default {:?} is not a valid {}", value, self.kind),
            )
        })
    }

    fn literal(&self, value: &Value) -> String {
        scalar_literal(self.kind, value)
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.write_{}({}, *{})",
            ctx.span_variable_name,
            self.kind.name(),
            ctx.offset_variable_name,
            ctx.value_variable_name
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.read_{}({})",
            ctx.input_buffer_variable_name,
            self.kind.name(),
            ctx.offset_variable_name
        )))
    }

    fn create_max_size_method(
        &self,
        _ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(self.max_inline_size().to_string()))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!("*{}", ctx.item_variable_name)))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        write_scalar(writer.span, self.kind, offset, value)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        read_scalar(reader.buffer, self.kind, offset)
    }

    fn max_size(&self, _graph: &ModelGraph, _value: &Value) -> SerializeResult<usize> {
        Ok(self.max_inline_size())
    }

    fn clone_value(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        canonical_scalar(self.kind, value).ok_or_else(|| type_mismatch(&self.key, value))
    }
}
