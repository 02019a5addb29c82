// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::member::StructMemberModel;
use super::{type_mismatch, SchemaKind, TypeModel};
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::container::Resolver;
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::{align_to, PhysicalLayoutElement};
use crate::runtime::{Reader, Writer};
use crate::schema::{StructDeclaration, StructKind, TypeKey};
use crate::value::{Fields, Value};
use std::fmt::Write as _;
use std::sync::OnceLock;

#[derive(Debug)]
struct StructLayout {
    members: Vec<StructMemberModel>,
    layout: [PhysicalLayoutElement; 1],
}

/// Fixed-layout aggregate of scalars, enums and other structs.
#[derive(Debug)]
pub struct StructModel {
    key: TypeKey,
    declaration: StructDeclaration,
    resolved: OnceLock<StructLayout>,
}

impl StructModel {
    pub fn new(declaration: StructDeclaration) -> Self {
        Self {
            key: TypeKey::named(&declaration.name),
            declaration,
            resolved: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn is_value_struct(&self) -> bool {
        self.declaration.kind == StructKind::Value
    }

    /// Members in offset order. Empty before initialization.
    pub fn members(&self) -> &[StructMemberModel] {
        match self.resolved.get() {
            Some(resolved) => &resolved.members,
            None => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&StructMemberModel> {
        self.members().iter().find(|m| m.name == name)
    }

    /// Padded size in bytes (0 before initialization).
    pub fn size(&self) -> usize {
        self.resolved.get().map_or(0, |r| r.layout[0].inline_size)
    }

    fn fields<'v>(&self, value: &'v Value) -> SerializeResult<&'v Fields> {
        match value {
            Value::Struct(fields) => Ok(fields),
            Value::Null => Err(SerializeError::NullValue {
                type_name: self.declaration.name.clone(),
            }),
            other => Err(type_mismatch(&self.key, other)),
        }
    }

    fn member_value<'v>(
        &self,
        fields: &'v Fields,
        member: &StructMemberModel,
    ) -> SerializeResult<&'v Value> {
        fields.get(&member.name).ok_or_else(|| SerializeError::NullValue {
            type_name: format!("{}.{}", self.declaration.name, member.name),
        })
    }
}

impl TypeModel for StructModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Struct
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        match self.resolved.get() {
            Some(resolved) => &resolved.layout,
            None => &[],
        }
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

    fn is_valid_union_member(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<TypeKey> {
        self.declaration
            .members
            .iter()
            .map(|m| m.type_key.clone())
            .collect()
    }

    fn as_struct(&self) -> Option<&StructModel> {
        Some(self)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        let name = &self.declaration.name;
        if self.declaration.members.is_empty() {
            return Err(SchemaError::invalid_type(name, "struct has no members"));
        }
        let mut declared: Vec<_> = self.declaration.members.iter().collect();
        declared.sort_by_key(|m| m.index);

        let mut members = Vec::with_capacity(declared.len());
        let mut cursor = 0usize;
        let mut alignment = 1usize;
        for (position, decl) in declared.into_iter().enumerate() {
            if usize::from(decl.index) != position {
                return Err(SchemaError::invalid_member(
                    name,
                    &decl.name,
                    format!("index {} leaves a gap; struct indices must be contiguous from 0", decl.index),
                ));
            }
            let item = resolver.resolve(&decl.type_key)?;
            let element = match item.physical_layout() {
                [] => {
                    return Err(SchemaError::invalid_member(
                        name,
                        &decl.name,
                        "recursive struct",
                    ))
                }
                [element] => *element,
                _ => {
                    return Err(SchemaError::invalid_member(
                        name,
                        &decl.name,
                        "multi-slot types cannot be struct members",
                    ))
                }
            };
            let offset = align_to(cursor, element.alignment);
            cursor = offset + element.inline_size;
            alignment = alignment.max(element.alignment);
            members.push(StructMemberModel {
                name: decl.name.clone(),
                index: decl.index,
                type_key: decl.type_key.clone(),
                offset,
                size: element.inline_size,
            });
        }
        let layout = PhysicalLayoutElement::new(align_to(cursor, alignment), alignment);

        if let (StructKind::Value, Some(host)) =
            (self.declaration.kind, self.declaration.host_layout)
        {
            if host != layout {
                return Err(SchemaError::invalid_type(
                    name,
                    format!(
                        "host layout ({} bytes, align {}) does not match wire layout ({} bytes, align {})",
                        host.inline_size, host.alignment, layout.inline_size, layout.alignment
                    ),
                ));
            }
        }

        log::trace!(
            "[StructModel] '{}' laid out: {} bytes, align {}",
            name,
            layout.inline_size,
            layout.alignment
        );
        // A failed initialize discards the model, so this runs at most once.
        let _ = self.resolved.set(StructLayout {
            members,
            layout: [layout],
        });
        Ok(())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        if self.resolved.get().is_none() {
            return Err(SchemaError::invalid_type(&self.key, "struct was not initialized"));
        }
        for member in self.members() {
            let item = graph.model(&member.type_key)?;
            if !item.is_valid_struct_member() {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    &member.name,
                    format!("type '{}' cannot be a struct member", member.type_key),
                ));
            }
            if self.is_value_struct() {
                if let Some(inner) = item.as_struct() {
                    if !inner.is_value_struct() {
                        return Err(SchemaError::invalid_member(
                            &self.key,
                            &member.name,
                            "value structs may only contain scalars, enums and value structs",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let mut body = String::new();
        for member in self.members() {
            let _ = writeln!(
                body,
                "{};",
                ctx.invoke(
                    &member.type_key,
                    &format!("&{}.{}", ctx.value_variable_name, member.name),
                    &format!("{} + {}", ctx.offset_variable_name, member.offset)
                )
            );
        }
        body.push_str("Ok(())");
        Ok(GeneratedMethod::new(body))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let mut body = format!("Ok({} {{\n", self.declaration.name);
        for member in self.members() {
            let _ = writeln!(
                body,
                "    {}: {},",
                member.name,
                ctx.invoke(
                    &member.type_key,
                    &format!("{} + {}", ctx.offset_variable_name, member.offset),
                    &ctx.depth_variable_name
                )
            );
        }
        body.push_str("})");
        Ok(GeneratedMethod::new(body))
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
        let mut body = format!("{} {{\n", self.declaration.name);
        for member in self.members() {
            let _ = writeln!(
                body,
                "    {}: {},",
                member.name,
                ctx.invoke(
                    &member.type_key,
                    &format!("&{}.{}", ctx.item_variable_name, member.name)
                )
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
        let fields = self.fields(value)?;
        for member in self.members() {
            let item = writer.model(&member.type_key)?;
            let member_value = self.member_value(fields, member)?;
            item.serialize(writer, member_value, offset + member.offset)?;
        }
        Ok(())
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        let mut fields = Fields::new();
        for member in self.members() {
            let item = reader.model(&member.type_key)?;
            fields.insert(
                member.name.clone(),
                item.parse(reader, offset + member.offset, depth)?,
            );
        }
        Ok(Value::Struct(fields))
    }

    fn max_size(&self, _graph: &ModelGraph, _value: &Value) -> SerializeResult<usize> {
        Ok(self.max_inline_size())
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        let fields = self.fields(value)?;
        let mut cloned = Fields::new();
        for member in self.members() {
            let item = graph.model(&member.type_key)?;
            let member_value = self.member_value(fields, member)?;
            cloned.insert(member.name.clone(), item.clone_value(graph, member_value)?);
        }
        Ok(Value::Struct(cloned))
    }
}
