// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{type_mismatch, SchemaKind, TypeModel};
use crate::buffer::InputBuffer;
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::{UOFFSET_SIZE, VECTOR_MIN_SIZE};
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::runtime::{Reader, Writer};
use crate::schema::TypeKey;
use crate::sorted::SortKeyKind;
use crate::value::Value;

const STRING_LAYOUT: [PhysicalLayoutElement; 1] =
    [PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE)];

/// Worst case for a string body: count alignment, length, bytes and NUL.
pub(crate) fn string_max_size(len: usize) -> usize {
    VECTOR_MIN_SIZE + len + 1
}

fn expect_str<'v>(key: &TypeKey, value: &'v Value) -> SerializeResult<&'v str> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Err(SerializeError::NullValue {
            type_name: key.to_string(),
        }),
        other => Err(type_mismatch(key, other)),
    }
}

fn validate_string_default(key: &TypeKey, value: &Value) -> Result<Value, SchemaError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        other => Err(SchemaError::invalid_type(
            key,
            format!("default {:?} is not a string", other),
        )),
    }
}

/// UTF-8 string behind a uoffset.
#[derive(Debug)]
pub struct StringModel {
    key: TypeKey,
}

impl StringModel {
    pub fn new() -> Self {
        Self {
            key: TypeKey::String,
        }
    }
}

impl Default for StringModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeModel for StringModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::String
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &STRING_LAYOUT
    }

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn serializes_inline(&self) -> bool {
        false
    }

    fn is_valid_vector_member(&self) -> bool {
        true
    }

    fn is_valid_union_member(&self) -> bool {
        true
    }

    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        Some(SortKeyKind::String)
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        validate_string_default(&self.key, value)
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.write_string({}, {}, {})",
            ctx.serialization_context_variable_name,
            ctx.span_variable_name,
            ctx.offset_variable_name,
            ctx.value_variable_name
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.read_string({})",
            ctx.input_buffer_variable_name, ctx.offset_variable_name
        )))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{} + {}.len() + 1",
            VECTOR_MIN_SIZE, ctx.value_variable_name
        )))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.clone()",
            ctx.item_variable_name
        )))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let s = expect_str(&self.key, value)?;
        writer.context.write_string(writer.span, offset, s)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        reader.buffer.read_string(offset).map(Value::String)
    }

    fn max_size(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        Ok(string_max_size(expect_str(&self.key, value)?.len()))
    }

    fn clone_value(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        expect_str(&self.key, value).map(|s| Value::String(s.to_owned()))
    }
}

/// String written once per distinct value within a buffer.
///
/// Identical to [`StringModel`] on the wire; readers cannot tell the
/// difference.
#[derive(Debug)]
pub struct SharedStringModel {
    key: TypeKey,
}

impl SharedStringModel {
    pub fn new() -> Self {
        Self {
            key: TypeKey::SharedString,
        }
    }
}

impl Default for SharedStringModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeModel for SharedStringModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::String
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &STRING_LAYOUT
    }

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn serializes_inline(&self) -> bool {
        false
    }

    fn is_valid_vector_member(&self) -> bool {
        true
    }

    fn is_valid_union_member(&self) -> bool {
        true
    }

    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        Some(SortKeyKind::String)
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        validate_string_default(&self.key, value)
    }

    fn literal(&self, value: &Value) -> String {
        format!("SharedString({})", crate::codegen::rust_literal(value))
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.write_shared_string({}, {}, &{}.0)",
            ctx.serialization_context_variable_name,
            ctx.span_variable_name,
            ctx.offset_variable_name,
            ctx.value_variable_name
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.read_string({}).map(SharedString)",
            ctx.input_buffer_variable_name, ctx.offset_variable_name
        )))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{} + {}.0.len() + 1",
            VECTOR_MIN_SIZE, ctx.value_variable_name
        )))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "{}.clone()",
            ctx.item_variable_name
        )))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let s = expect_str(&self.key, value)?;
        writer.context.write_shared_string(writer.span, offset, s)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        reader.buffer.read_string(offset).map(Value::String)
    }

    fn max_size(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        Ok(string_max_size(expect_str(&self.key, value)?.len()))
    }

    fn clone_value(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        expect_str(&self.key, value).map(|s| Value::String(s.to_owned()))
    }
}
