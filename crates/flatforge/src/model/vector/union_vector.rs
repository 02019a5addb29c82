// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{begin_vector, expect_items, read_vector_header, vector_body_max_size};
use crate::buffer::InputBuffer;
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::{UOFFSET_SIZE, VECTOR_LENGTH_SIZE};
use crate::container::Resolver;
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::model::{type_mismatch, SchemaKind, TypeModel, TypeModelRef};
use crate::runtime::{Reader, Writer};
use crate::schema::{TypeKey, VectorKind};
use crate::value::Value;

const UNION_VECTOR_LAYOUT: [PhysicalLayoutElement; 2] = [
    PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE),
    PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE),
];

const TYPE_ELEMENT: PhysicalLayoutElement = PhysicalLayoutElement::new(1, 1);
const OFFSET_ELEMENT: PhysicalLayoutElement =
    PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE);

/// Vector of unions, written as two parallel vectors: one of `u8`
/// discriminators and one of uoffsets. Occupies two table slots.
#[derive(Debug)]
pub struct UnionVectorModel {
    key: TypeKey,
    kind: VectorKind,
    item: TypeKey,
}

impl UnionVectorModel {
    pub fn new(kind: VectorKind, item: TypeKey) -> Self {
        Self {
            key: TypeKey::vector(kind, item.clone()),
            kind,
            item,
        }
    }

    fn union_model(&self, graph: &ModelGraph) -> Result<TypeModelRef, SchemaError> {
        let model = graph.model(&self.item)?;
        if model.as_union().is_none() {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("'{}' is not a union", self.item),
            ));
        }
        Ok(model.clone())
    }

    fn inconsistent(&self) -> ParseError {
        ParseError::InconsistentUnionVector {
            type_name: self.key.to_string(),
        }
    }
}

impl TypeModel for UnionVectorModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Vector
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &UNION_VECTOR_LAYOUT
    }

    fn is_fixed_size(&self) -> bool {
        false
    }

    fn serializes_inline(&self) -> bool {
        false
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
        if self.kind.is_memory() {
            return Err(SchemaError::invalid_type(
                &self.key,
                "memory vectors must hold u8 items",
            ));
        }
        self.union_model(graph).map(|_| ())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let span = &ctx.span_variable_name;
        let sctx = &ctx.serialization_context_variable_name;
        let body = format!(
            "let items = &{value}[..];\n\
             let count = u32::try_from(items.len()).map_err(|_| SerializeError::OffsetOverflow {{ offset: {offset} }})?;\n\
             let types = {sctx}.allocate_vector(1, items.len(), 1)?;\n\
             {span}.write_u32(types, count)?;\n\
             {span}.write_uoffset({offset}, types)?;\n\
             let values = {sctx}.allocate_vector({size}, items.len(), {size})?;\n\
             {span}.write_u32(values, count)?;\n\
             {span}.write_uoffset({value_offset}, values)?;\n\
             for (i, v) in items.iter().enumerate() {{\n    \
             {call};\n\
             }}\n\
             Ok(())",
            value = ctx.value_variable_name,
            offset = ctx.offset_variable_name,
            value_offset = ctx.value_offset_variable_name,
            sctx = sctx,
            span = span,
            size = UOFFSET_SIZE,
            call = ctx.invoke_pair(
                &self.item,
                "v",
                &format!("types + {} + i", VECTOR_LENGTH_SIZE),
                &format!("values + {} + i * {}", VECTOR_LENGTH_SIZE, UOFFSET_SIZE)
            )
        );
        Ok(GeneratedMethod::new(body))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let buf = &ctx.input_buffer_variable_name;
        let depth = &ctx.depth_variable_name;
        let options = &ctx.options_variable_name;
        let inconsistent = format!(
            "ParseError::InconsistentUnionVector {{ type_name: \"{}\".into() }}",
            self.key
        );
        let body = format!(
            "let {depth} = {depth} + 1;\n\
             if {depth} > {options}.max_depth {{\n    \
             return Err(ParseError::DepthExceeded {{ limit: {options}.max_depth }});\n\
             }}\n\
             let (types, values) = match ({offset}, {value_offset}) {{\n    \
             (Some(t), Some(v)) => ({buf}.read_uoffset(t)?, {buf}.read_uoffset(v)?),\n    \
             _ => return Err({inconsistent}),\n\
             }};\n\
             let count = {buf}.read_u32(types)? as usize;\n\
             if {buf}.read_u32(values)? as usize != count {{\n    \
             return Err({inconsistent});\n\
             }}\n\
             {buf}.read_bytes(types + {len}, count)?;\n\
             {buf}.read_bytes(values + {len}, count.checked_mul({size}).ok_or(ParseError::InvalidOffset {{ offset: values }})?)?;\n\
             let mut items = Vec::with_capacity(count);\n\
             for i in 0..count {{\n    \
             items.push({call});\n\
             }}\n\
             Ok(items{finish})",
            depth = depth,
            options = options,
            buf = buf,
            offset = ctx.offset_variable_name,
            value_offset = ctx.value_offset_variable_name,
            inconsistent = inconsistent,
            len = VECTOR_LENGTH_SIZE,
            size = UOFFSET_SIZE,
            call = ctx.invoke_pair(
                &self.item,
                &format!("Some(types + {} + i)", VECTOR_LENGTH_SIZE),
                &format!("Some(values + {} + i * {})", VECTOR_LENGTH_SIZE, UOFFSET_SIZE),
                depth
            ),
            finish = if self.kind == VectorKind::Array {
                ".into_boxed_slice()"
            } else {
                ""
            }
        );
        Ok(GeneratedMethod::new(body))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let fixed = vector_body_max_size(TYPE_ELEMENT, 0) + vector_body_max_size(OFFSET_ELEMENT, 0);
        Ok(GeneratedMethod::new(format!(
            "let items = &{}[..];\n{} + {} * items.len() + items.iter().map(|v| {}).sum::<usize>()",
            ctx.value_variable_name,
            fixed,
            1 + UOFFSET_SIZE,
            ctx.invoke(&self.item, "v")
        )))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
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
        let _ = (writer, value, offset);
        Err(SchemaError::invalid_type(&self.key, "union vectors occupy two slots").into())
    }

    fn parse(&self, _reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        let _ = offset;
        Err(SchemaError::invalid_type(&self.key, "union vectors occupy two slots").into())
    }

    fn serialize_pair(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        first: usize,
        second: usize,
    ) -> SerializeResult<()> {
        let items = expect_items(&self.key, value)?;
        let model = self.union_model(writer.graph)?;
        let Some(union) = model.as_union() else {
            return Err(type_mismatch(&self.item, value));
        };
        let types = begin_vector(writer, first, TYPE_ELEMENT, items.len())?;
        let values = begin_vector(writer, second, OFFSET_ELEMENT, items.len())?;
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Union(discriminator, inner) if *discriminator != 0 => {
                    union.write_alternative(
                        writer,
                        *discriminator,
                        inner,
                        types + i,
                        values + i * UOFFSET_SIZE,
                    )?;
                }
                Value::Null | Value::Union(..) => {
                    return Err(SerializeError::NullVectorItem {
                        type_name: self.key.to_string(),
                        index: i,
                    })
                }
                other => return Err(type_mismatch(&self.item, other)),
            }
        }
        Ok(())
    }

    fn parse_pair(
        &self,
        reader: &Reader<'_>,
        first: Option<usize>,
        second: Option<usize>,
        depth: usize,
    ) -> ParseResult<Value> {
        let (first, second) = match (first, second) {
            (None, None) => return Ok(Value::Null),
            (Some(first), Some(second)) => (first, second),
            _ => return Err(self.inconsistent()),
        };
        let depth = reader.enter(depth)?;
        let model = self.union_model(reader.graph)?;
        let Some(union) = model.as_union() else {
            return Err(self.inconsistent());
        };
        let (types, count) = read_vector_header(reader.buffer, first, 1)?;
        let (values, value_count) = read_vector_header(reader.buffer, second, UOFFSET_SIZE)?;
        if count != value_count {
            return Err(self.inconsistent());
        }
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let discriminator = reader.buffer.read_u8(types + i)?;
            items.push(union.parse_alternative(
                reader,
                discriminator,
                values + i * UOFFSET_SIZE,
                depth,
            )?);
        }
        Ok(Value::Vector(items))
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        let items = expect_items(&self.key, value)?;
        let model = self.union_model(graph)?;
        let Some(union) = model.as_union() else {
            return Err(type_mismatch(&self.item, value));
        };
        let mut size = vector_body_max_size(TYPE_ELEMENT, items.len())
            + vector_body_max_size(OFFSET_ELEMENT, items.len());
        for item in items {
            if let Value::Union(discriminator, inner) = item {
                size += union.alternative_max_size(graph, *discriminator, inner)?;
            }
        }
        Ok(size)
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        let items = expect_items(&self.key, value)?;
        let model = self.union_model(graph)?;
        items
            .iter()
            .map(|item| model.clone_value(graph, item))
            .collect::<SerializeResult<Vec<_>>>()
            .map(Value::Vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerializerOptions;
    use crate::model::UnionModel;
    use crate::schema::UnionDeclaration;
    use std::sync::Arc;

    #[test]
    fn test_two_slots() {
        let model = UnionVectorModel::new(VectorKind::List, TypeKey::named("Equipment"));
        assert_eq!(model.physical_layout().len(), 2);
        assert_eq!(model.vector_item(), Some(&TypeKey::named("Equipment")));
    }

    #[test]
    fn test_half_present_vector_is_corrupt() {
        let mut graph = ModelGraph::new();
        let union = UnionModel::new(UnionDeclaration::new("Equipment").alternative(TypeKey::String));
        graph.insert(TypeKey::named("Equipment"), Arc::new(union));
        let options = SerializerOptions::default();
        let buffer = [0u8; 16];
        let reader = Reader::new(&buffer, &graph, &options);
        let model = UnionVectorModel::new(VectorKind::List, TypeKey::named("Equipment"));
        assert_eq!(model.parse_pair(&reader, None, None, 0).unwrap(), Value::Null);
        assert!(matches!(
            model.parse_pair(&reader, Some(0), None, 0),
            Err(ParseError::InconsistentUnionVector { .. })
        ));
    }
}
