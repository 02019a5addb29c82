// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{type_mismatch, SchemaKind, TypeModel};
use crate::buffer::{InputBuffer, SpanWriter};
use crate::codegen::{
    self, CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::{MAX_UNION_ALTERNATIVES, UOFFSET_SIZE};
use crate::container::Resolver;
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::runtime::{Reader, Writer};
use crate::schema::{TypeKey, UnionDeclaration};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt::Write as _;

const UNION_LAYOUT: [PhysicalLayoutElement; 2] = [
    PhysicalLayoutElement::new(1, 1),
    PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE),
];

/// Tagged choice between tables, structs and strings.
///
/// Occupies two table slots: a `u8` discriminator (0 means none) and a
/// uoffset to the selected value. Struct alternatives are written out of
/// line so the second slot is always a uoffset.
#[derive(Debug)]
pub struct UnionModel {
    key: TypeKey,
    declaration: UnionDeclaration,
}

impl UnionModel {
    pub fn new(declaration: UnionDeclaration) -> Self {
        Self {
            key: TypeKey::named(&declaration.name),
            declaration,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn alternatives(&self) -> &[TypeKey] {
        &self.declaration.alternatives
    }

    /// Alternative selected by a 1-based discriminator.
    pub fn alternative(&self, discriminator: u8) -> Option<&TypeKey> {
        usize::from(discriminator)
            .checked_sub(1)
            .and_then(|i| self.declaration.alternatives.get(i))
    }

    /// Rust enum variant naming the alternative in generated code.
    pub fn variant_name(key: &TypeKey) -> String {
        let fragment = key.ident_fragment();
        let mut chars = fragment.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => fragment,
        }
    }

    fn split<'v>(&self, value: &'v Value) -> SerializeResult<Option<(u8, &'v Value)>> {
        match value {
            Value::Null | Value::Union(0, _) => Ok(None),
            Value::Union(discriminator, inner) => Ok(Some((*discriminator, inner))),
            other => Err(type_mismatch(&self.key, other)),
        }
    }

    fn alternative_model(
        &self,
        graph: &ModelGraph,
        discriminator: u8,
    ) -> SerializeResult<crate::model::TypeModelRef> {
        let key = self
            .alternative(discriminator)
            .ok_or_else(|| SerializeError::InvalidDiscriminator {
                union: self.declaration.name.clone(),
                discriminator,
            })?;
        Ok(graph.model(key)?.clone())
    }

    /// Write the discriminator at `discriminator_slot` and the selected value
    /// behind the uoffset at `value_slot`.
    pub(crate) fn write_alternative(
        &self,
        writer: &mut Writer<'_>,
        discriminator: u8,
        value: &Value,
        discriminator_slot: usize,
        value_slot: usize,
    ) -> SerializeResult<()> {
        let model = self.alternative_model(writer.graph, discriminator)?;
        writer.span.write_u8(discriminator_slot, discriminator)?;
        if model.serializes_inline() {
            let element = model.physical_layout().first().copied().ok_or_else(|| {
                SchemaError::invalid_type(model.type_key(), "alternative has no layout")
            })?;
            let body = writer
                .context
                .allocate_space(element.inline_size, element.alignment)?;
            model.serialize(writer, value, body)?;
            writer.span.write_uoffset(value_slot, body)
        } else {
            model.serialize(writer, value, value_slot)
        }
    }

    /// Read the alternative selected by `discriminator` behind `value_slot`.
    pub(crate) fn parse_alternative(
        &self,
        reader: &Reader<'_>,
        discriminator: u8,
        value_slot: usize,
        depth: usize,
    ) -> ParseResult<Value> {
        let key = self.alternative(discriminator).ok_or_else(|| {
            ParseError::InvalidUnionDiscriminator {
                union: self.declaration.name.clone(),
                discriminator,
            }
        })?;
        let model = reader.model(key)?;
        let inner = if model.serializes_inline() {
            let body = reader.buffer.read_uoffset(value_slot)?;
            model.parse(reader, body, depth)?
        } else {
            model.parse(reader, value_slot, depth)?
        };
        Ok(Value::union(discriminator, inner))
    }

    pub(crate) fn alternative_max_size(
        &self,
        graph: &ModelGraph,
        discriminator: u8,
        value: &Value,
    ) -> SerializeResult<usize> {
        let model = self.alternative_model(graph, discriminator)?;
        if model.serializes_inline() {
            Ok(model.max_inline_size())
        } else {
            model.max_size(graph, value)
        }
    }
}

impl TypeModel for UnionModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Union
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &UNION_LAYOUT
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

    fn children(&self) -> Vec<TypeKey> {
        self.declaration.alternatives.clone()
    }

    fn as_union(&self) -> Option<&UnionModel> {
        Some(self)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        for alternative in &self.declaration.alternatives {
            resolver.resolve(alternative)?;
        }
        Ok(())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        let alternatives = &self.declaration.alternatives;
        if alternatives.is_empty() {
            return Err(SchemaError::invalid_type(&self.key, "union has no alternatives"));
        }
        if alternatives.len() > MAX_UNION_ALTERNATIVES {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!(
                    "{} alternatives exceed the limit of {}",
                    alternatives.len(),
                    MAX_UNION_ALTERNATIVES
                ),
            ));
        }
        let mut seen = HashSet::new();
        for alternative in alternatives {
            if !seen.insert(alternative) {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    alternative.to_string(),
                    "alternative is listed twice",
                ));
            }
            if !graph.model(alternative)?.is_valid_union_member() {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    alternative.to_string(),
                    "only tables, structs and strings can be union alternatives",
                ));
            }
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let name = &self.declaration.name;
        let mut body = format!("match {} {{\n", ctx.value_variable_name);
        for (i, alternative) in self.declaration.alternatives.iter().enumerate() {
            let discriminator = i + 1;
            let model = ctx.graph.model(alternative)?;
            let _ = writeln!(body, "    {}::{}(v) => {{", name, Self::variant_name(alternative));
            let _ = writeln!(
                body,
                "        {}.write_u8({}, {})?;",
                ctx.span_variable_name, ctx.offset_variable_name, discriminator
            );
            if model.serializes_inline() {
                let element = model.physical_layout().first().copied().ok_or_else(|| {
                    SchemaError::invalid_type(alternative, "alternative has no layout")
                })?;
                let _ = writeln!(
                    body,
                    "        let pos = {}.allocate_space({}, {})?;",
                    ctx.serialization_context_variable_name, element.inline_size, element.alignment
                );
                let _ = writeln!(body, "        {};", ctx.invoke(alternative, "v", "pos"));
                let _ = writeln!(
                    body,
                    "        {}.write_uoffset({}, pos)",
                    ctx.span_variable_name, ctx.value_offset_variable_name
                );
            } else {
                let _ = writeln!(
                    body,
                    "        {};\n        Ok(())",
                    ctx.invoke(alternative, "v", &ctx.value_offset_variable_name)
                );
            }
            body.push_str("    }\n");
        }
        body.push('}');
        Ok(GeneratedMethod::new(body).with_class_definition(self.discriminator_constants()))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let name = &self.declaration.name;
        let buf = &ctx.input_buffer_variable_name;
        let mut body = format!(
            "let discriminator_slot = {}.ok_or(ParseError::InvalidOffset {{ offset: 0 }})?;\n\
             let slot = {}.ok_or(ParseError::InvalidOffset {{ offset: discriminator_slot }})?;\n\
             match {}.read_u8(discriminator_slot)? {{\n",
            ctx.offset_variable_name, ctx.value_offset_variable_name, buf
        );
        for (i, alternative) in self.declaration.alternatives.iter().enumerate() {
            let model = ctx.graph.model(alternative)?;
            let target = if model.serializes_inline() {
                let _ = writeln!(body, "    {} => {{\n        let pos = {}.read_uoffset(slot)?;", i + 1, buf);
                "pos"
            } else {
                let _ = writeln!(body, "    {} => {{", i + 1);
                "slot"
            };
            let _ = writeln!(
                body,
                "        Ok({}::{}({}))\n    }}",
                name,
                Self::variant_name(alternative),
                ctx.invoke(alternative, target, &ctx.depth_variable_name)
            );
        }
        let _ = write!(
            body,
            "    d => Err(ParseError::InvalidUnionDiscriminator {{\n        union: \"{}\".into(),\n        discriminator: d,\n    }}),\n}}",
            name
        );
        Ok(GeneratedMethod::new(body))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let name = &self.declaration.name;
        let mut body = format!("match {} {{\n", ctx.value_variable_name);
        for alternative in &self.declaration.alternatives {
            let model = ctx.graph.model(alternative)?;
            let size = if model.serializes_inline() {
                model.max_inline_size().to_string()
            } else {
                ctx.invoke(alternative, "v")
            };
            let _ = writeln!(
                body,
                "    {}::{}(v) => {},",
                name,
                Self::variant_name(alternative),
                size
            );
        }
        body.push('}');
        Ok(GeneratedMethod::new(body))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let name = &self.declaration.name;
        let mut body = format!("match {} {{\n", ctx.item_variable_name);
        for alternative in &self.declaration.alternatives {
            let variant = Self::variant_name(alternative);
            let _ = writeln!(
                body,
                "    {}::{}(v) => {}::{}({}),",
                name,
                variant,
                name,
                variant,
                ctx.invoke(alternative, "v")
            );
        }
        body.push('}');
        Ok(GeneratedMethod::new(body))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let _ = (writer, value, offset);
        Err(SchemaError::invalid_type(&self.key, "unions occupy two slots").into())
    }

    fn parse(&self, _reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        let _ = offset;
        Err(SchemaError::invalid_type(&self.key, "unions occupy two slots").into())
    }

    fn serialize_pair(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        first: usize,
        second: usize,
    ) -> SerializeResult<()> {
        match self.split(value)? {
            Some((discriminator, inner)) => {
                self.write_alternative(writer, discriminator, inner, first, second)
            }
            None => Ok(()),
        }
    }

    fn parse_pair(
        &self,
        reader: &Reader<'_>,
        first: Option<usize>,
        second: Option<usize>,
        depth: usize,
    ) -> ParseResult<Value> {
        let Some(first) = first else {
            return Ok(Value::Null);
        };
        let discriminator = reader.buffer.read_u8(first)?;
        if discriminator == 0 {
            return Ok(Value::Null);
        }
        let second = second.ok_or(ParseError::InvalidOffset { offset: first })?;
        self.parse_alternative(reader, discriminator, second, depth)
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        match self.split(value)? {
            Some((discriminator, inner)) => self.alternative_max_size(graph, discriminator, inner),
            None => Ok(0),
        }
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        match self.split(value)? {
            Some((discriminator, inner)) => {
                let model = self.alternative_model(graph, discriminator)?;
                Ok(Value::union(discriminator, model.clone_value(graph, inner)?))
            }
            None => Ok(Value::Null),
        }
    }
}

impl UnionModel {
    fn discriminator_constants(&self) -> String {
        let prefix = codegen::to_snake_case(&self.declaration.name).to_ascii_uppercase();
        let mut out = String::new();
        for (i, alternative) in self.declaration.alternatives.iter().enumerate() {
            let _ = writeln!(
                out,
                "pub const {}_{}: u8 = {};",
                prefix,
                codegen::to_snake_case(&Self::variant_name(alternative)).to_ascii_uppercase(),
                i + 1
            );
        }
        out.trim_end().to_owned()
    }
}
