// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{
    begin_vector, expect_items, item_element, padded_item_size, read_vector_header,
    vector_body_max_size, VECTOR_LAYOUT,
};
use crate::buffer::{InputBuffer, SpanWriter};
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::VECTOR_LENGTH_SIZE;
use crate::container::Resolver;
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::model::{type_mismatch, SchemaKind, TypeModel};
use crate::runtime::{Reader, Writer};
use crate::schema::{ScalarKind, TypeKey, VectorKind};
use crate::value::Value;
use std::fmt::Write as _;

/// Arrays, lists and memory blocks: one wire format, several host flavors.
///
/// Vectors of `u8` take a byte-block path on both sides: the items are
/// copied as one slice and parse to [`Value::Bytes`].
#[derive(Debug)]
pub struct ListVectorModel {
    key: TypeKey,
    kind: VectorKind,
    item: TypeKey,
}

impl ListVectorModel {
    pub fn new(kind: VectorKind, item: TypeKey) -> Self {
        Self {
            key: TypeKey::vector(kind, item.clone()),
            kind,
            item,
        }
    }

    pub fn kind(&self) -> VectorKind {
        self.kind
    }

    fn is_byte_block(&self) -> bool {
        self.item == TypeKey::Scalar(ScalarKind::U8)
    }

    /// Host expression viewing the generated value as a slice.
    fn host_slice(&self, value: &str) -> String {
        if self.kind.is_memory() {
            format!("&{}.0[..]", value)
        } else {
            format!("&{}[..]", value)
        }
    }
}

impl TypeModel for ListVectorModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Vector
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &VECTOR_LAYOUT
    }

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn serializes_inline(&self) -> bool {
        false
    }

    fn always_serialize(&self) -> bool {
        self.kind.is_memory()
    }

    fn default_value(&self) -> Value {
        if self.kind.is_memory() {
            Value::Bytes(Vec::new())
        } else {
            Value::Null
        }
    }

    fn literal(&self, value: &Value) -> String {
        match (self.kind.is_memory(), value) {
            (true, _) => "Memory::default()".to_owned(),
            (false, Value::Null) => "None".to_owned(),
            (false, _) => "Default::default()".to_owned(),
        }
    }

    fn children(&self) -> Vec<TypeKey> {
        vec![self.item.clone()]
    }

    fn vector_item(&self) -> Option<&TypeKey> {
        Some(&self.item)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        resolver.resolve(&self.item).map(|_| ())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        let item = graph.model(&self.item)?;
        if self.kind.is_memory() && !self.is_byte_block() {
            return Err(SchemaError::invalid_type(
                &self.key,
                "memory vectors must hold u8 items",
            ));
        }
        if item.vector_item().is_some() {
            return Err(SchemaError::invalid_type(
                &self.key,
                "vectors of vectors are not supported",
            ));
        }
        if item.as_union().is_some() || !item.is_valid_vector_member() {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("type '{}' cannot be a vector item", self.item),
            ));
        }
        item_element(item.as_ref()).map(|_| ())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let item = ctx.graph.model(&self.item)?;
        let element = item_element(item.as_ref())?;
        let stride = padded_item_size(element);
        let span = &ctx.span_variable_name;
        let sctx = &ctx.serialization_context_variable_name;
        let mut body = format!(
            "let items = {slice};\n\
             let pos = {sctx}.allocate_vector({align}, items.len(), {stride})?;\n\
             let count = u32::try_from(items.len()).map_err(|_| SerializeError::OffsetOverflow {{ offset: pos }})?;\n\
             {span}.write_u32(pos, count)?;\n\
             {span}.write_uoffset({offset}, pos)?;\n",
            slice = self.host_slice(&ctx.value_variable_name),
            sctx = sctx,
            align = element.alignment,
            stride = stride,
            span = span,
            offset = ctx.offset_variable_name
        );
        if self.is_byte_block() {
            let _ = writeln!(body, "{}.write_bytes(pos + {}, items)", span, VECTOR_LENGTH_SIZE);
        } else {
            let _ = writeln!(
                body,
                "for (i, v) in items.iter().enumerate() {{\n    {};\n}}\nOk(())",
                ctx.invoke(
                    &self.item,
                    "v",
                    &format!("pos + {} + i * {}", VECTOR_LENGTH_SIZE, stride)
                )
            );
        }
        Ok(GeneratedMethod::new(body.trim_end()))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let item = ctx.graph.model(&self.item)?;
        let stride = padded_item_size(item_element(item.as_ref())?);
        let buf = &ctx.input_buffer_variable_name;
        let depth = &ctx.depth_variable_name;
        let options = &ctx.options_variable_name;
        let mut body = format!(
            "let {depth} = {depth} + 1;\n\
             if {depth} > {options}.max_depth {{\n    \
             return Err(ParseError::DepthExceeded {{ limit: {options}.max_depth }});\n\
             }}\n\
             let start = {buf}.read_uoffset({offset})?;\n\
             let count = {buf}.read_u32(start)? as usize;\n\
             let first = start + {len};\n\
             {buf}.read_bytes(first, count.checked_mul({stride}).ok_or(ParseError::InvalidOffset {{ offset: start }})?)?;\n",
            depth = depth,
            options = options,
            buf = buf,
            offset = ctx.offset_variable_name,
            len = VECTOR_LENGTH_SIZE,
            stride = stride
        );
        if self.is_byte_block() {
            let _ = writeln!(body, "let items = {}.read_bytes(first, count)?.to_vec();", buf);
        } else {
            let _ = writeln!(
                body,
                "let mut items = Vec::with_capacity(count);\n\
                 for i in 0..count {{\n    \
                 items.push({});\n\
                 }}",
                ctx.invoke(&self.item, &format!("first + i * {}", stride), depth)
            );
        }
        body.push_str(match self.kind {
            VectorKind::Array => "Ok(items.into_boxed_slice())",
            VectorKind::Memory | VectorKind::ReadOnlyMemory => "Ok(Memory(items))",
            VectorKind::List | VectorKind::ReadOnlyList => "Ok(items)",
        });
        Ok(GeneratedMethod::new(body))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let item = ctx.graph.model(&self.item)?;
        let element = item_element(item.as_ref())?;
        let slice = self.host_slice(&ctx.value_variable_name);
        let fixed = vector_body_max_size(element, 0);
        let stride = padded_item_size(element);
        let body = if item.serializes_inline() {
            format!("let items = {};\n{} + {} * items.len()", slice, fixed, stride)
        } else {
            format!(
                "let items = {};\n{} + {} * items.len() + items.iter().map(|v| {}).sum::<usize>()",
                slice,
                fixed,
                stride,
                ctx.invoke(&self.item, "v")
            )
        };
        Ok(GeneratedMethod::new(body))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        if self.is_byte_block() {
            return Ok(GeneratedMethod::new(format!("{}.clone()", ctx.item_variable_name)));
        }
        Ok(GeneratedMethod::new(format!(
            "{}.iter().map(|v| {}).collect()",
            ctx.item_variable_name,
            ctx.invoke(&self.item, "v")
        )))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        if self.is_byte_block() {
            if let Value::Bytes(bytes) = value {
                let first = begin_vector(writer, offset, PhysicalLayoutElement::new(1, 1), bytes.len())?;
                return writer.span.write_bytes(first, bytes);
            }
        }
        let items = expect_items(&self.key, value)?;
        let item = writer.model(&self.item)?;
        let element = item_element(item.as_ref())?;
        let stride = padded_item_size(element);
        let first = begin_vector(writer, offset, element, items.len())?;
        for (i, value) in items.iter().enumerate() {
            if value.is_null() {
                return Err(SerializeError::NullVectorItem {
                    type_name: self.key.to_string(),
                    index: i,
                });
            }
            item.serialize(writer, value, first + i * stride)?;
        }
        Ok(())
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        let depth = reader.enter(depth)?;
        let item = reader.model(&self.item)?;
        let stride = padded_item_size(item_element(item.as_ref())?);
        let (first, count) = read_vector_header(reader.buffer, offset, stride)?;
        if self.is_byte_block() {
            return Ok(Value::Bytes(reader.buffer.read_bytes(first, count)?.to_vec()));
        }
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            items.push(item.parse(reader, first + i * stride, depth)?);
        }
        Ok(Value::Vector(items))
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        let item = graph.model(&self.item)?;
        let element = item_element(item.as_ref())?;
        if let (true, Value::Bytes(bytes)) = (self.is_byte_block(), value) {
            return Ok(vector_body_max_size(element, bytes.len()));
        }
        let items = expect_items(&self.key, value)?;
        let mut size = vector_body_max_size(element, items.len());
        if !item.serializes_inline() {
            for value in items {
                size += item.max_size(graph, value)?;
            }
        }
        Ok(size)
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        match value {
            Value::Bytes(bytes) if self.is_byte_block() => Ok(Value::Bytes(bytes.clone())),
            Value::Vector(items) => {
                let item = graph.model(&self.item)?;
                let cloned = items
                    .iter()
                    .map(|v| item.clone_value(graph, v))
                    .collect::<SerializeResult<Vec<_>>>()?;
                Ok(Value::Vector(cloned))
            }
            Value::Null => Err(SerializeError::NullValue {
                type_name: self.key.to_string(),
            }),
            other => Err(type_mismatch(&self.key, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerializerOptions;
    use crate::context::SerializationContext;
    use crate::model::{ScalarModel, StringModel};
    use crate::schema::ScalarKind;
    use std::sync::Arc;

    fn graph_with(models: Vec<crate::model::TypeModelRef>) -> ModelGraph {
        let mut graph = ModelGraph::new();
        for model in models {
            graph.insert(model.type_key().clone(), model);
        }
        graph
    }

    fn roundtrip(graph: &ModelGraph, model: &ListVectorModel, value: &Value) -> (Value, usize) {
        let options = SerializerOptions::default();
        let mut span = vec![0u8; 256];
        let mut ctx = SerializationContext::new(span.len(), &options);
        let slot = ctx.allocate_space(4, 4).unwrap();
        let mut writer = Writer::new(&mut span, &mut ctx, graph);
        model.serialize(&mut writer, value, slot).unwrap();
        let used = ctx.finish(&mut span).unwrap();
        let reader = Reader::new(&span, graph, &options);
        (model.parse(&reader, slot, 0).unwrap(), used)
    }

    #[test]
    fn test_byte_block_roundtrip() {
        let graph = graph_with(vec![Arc::new(ScalarModel::new(ScalarKind::U8))]);
        let model = ListVectorModel::new(VectorKind::Memory, TypeKey::Scalar(ScalarKind::U8));
        let value = Value::Bytes(vec![1, 2, 3]);
        let (parsed, used) = roundtrip(&graph, &model, &value);
        assert_eq!(parsed, value);
        assert!(used <= 4 + model.max_size(&graph, &value).unwrap());
        assert!(model.always_serialize());
    }

    #[test]
    fn test_string_list_roundtrip() {
        let graph = graph_with(vec![Arc::new(StringModel::new())]);
        let model = ListVectorModel::new(VectorKind::List, TypeKey::String);
        let value = Value::vector(["", "a", "bc"]);
        let (parsed, used) = roundtrip(&graph, &model, &value);
        assert_eq!(parsed, value);
        assert!(used <= 4 + model.max_size(&graph, &value).unwrap());
    }

    #[test]
    fn test_null_item_is_rejected() {
        let graph = graph_with(vec![Arc::new(ScalarModel::new(ScalarKind::I32))]);
        let model = ListVectorModel::new(VectorKind::List, TypeKey::Scalar(ScalarKind::I32));
        let options = SerializerOptions::default();
        let mut span = vec![0u8; 64];
        let mut ctx = SerializationContext::new(span.len(), &options);
        let slot = ctx.allocate_space(4, 4).unwrap();
        let mut writer = Writer::new(&mut span, &mut ctx, &graph);
        let err = model
            .serialize(&mut writer, &Value::vector([Value::Int(1), Value::Null]), slot)
            .unwrap_err();
        assert!(matches!(err, SerializeError::NullVectorItem { index: 1, .. }));
    }

    #[test]
    fn test_memory_of_non_bytes_is_invalid() {
        let graph = graph_with(vec![Arc::new(ScalarModel::new(ScalarKind::I32))]);
        let model = ListVectorModel::new(VectorKind::Memory, TypeKey::Scalar(ScalarKind::I32));
        assert!(matches!(
            model.validate(&graph),
            Err(SchemaError::InvalidType { .. })
        ));
    }
}
