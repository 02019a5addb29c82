// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tables: vtable-indexed records with optional, defaulted members.
//!
//! Wire shape of one table:
//!
//! ```text
//! [soffset to vtable][inline members, each aligned]   <- table
//! [vtable len u16][table len u16][voffset per slot]   <- vtable (shared)
//! [out-of-line children...]                           <- strings, vectors, tables
//! ```
//!
//! The inline region is reserved at its worst-case size, filled, then
//! shrunk to what was actually written. Children are written after the
//! vtable so every uoffset points forward.

use super::member::TableMemberModel;
use super::{type_mismatch, SchemaKind, TypeModel, TypeModelRef};
use crate::buffer::{InputBuffer, SpanWriter};
use crate::codegen::{
    self, CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::{
    SerializerOptions, MAX_VTABLE_BYTES, SOFFSET_SIZE, UOFFSET_SIZE, VOFFSET_SIZE,
    VTABLE_HEADER_SIZE,
};
use crate::container::Resolver;
use crate::context::{encode_vtable, SerializationContext};
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::{align_to, max_padding, PhysicalLayoutElement};
use crate::runtime::{Reader, Writer};
use crate::schema::{TableDeclaration, TypeKey};
use crate::sorted::{SortKeyKind, SortKeySpec};
use crate::value::{Fields, MapKey, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

const TABLE_LAYOUT: [PhysicalLayoutElement; 1] =
    [PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE)];

static NULL: Value = Value::Null;

/// Sizes fixed at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TablePlan {
    /// Worst-case inline bytes including the soffset.
    max_inline: usize,
    alignment: usize,
    /// Vtable slots, including deprecated members.
    slot_count: usize,
}

/// A child written after the table body.
struct Deferred<'m, 'v> {
    member: &'m TableMemberModel,
    item: TypeModelRef,
    value: &'v Value,
    slots: Vec<usize>,
}

#[derive(Debug)]
pub struct TableModel {
    key: TypeKey,
    declaration: TableDeclaration,
    members: OnceLock<Vec<TableMemberModel>>,
    plan: OnceLock<TablePlan>,
}

impl TableModel {
    pub fn new(declaration: TableDeclaration) -> Self {
        Self {
            key: TypeKey::named(&declaration.name),
            declaration,
            members: OnceLock::new(),
            plan: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn file_identifier(&self) -> Option<[u8; 4]> {
        self.declaration.file_identifier
    }

    /// Members in index order. Empty before initialization.
    pub fn members(&self) -> &[TableMemberModel] {
        match self.members.get() {
            Some(members) => members,
            None => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&TableMemberModel> {
        self.members().iter().find(|m| m.name() == name)
    }

    pub fn key_member(&self) -> Option<&TableMemberModel> {
        self.members()
            .iter()
            .find(|m| m.is_key() && !m.is_deprecated())
    }

    /// How sorted vectors of this table find and compare keys.
    pub fn sort_key_spec(&self, graph: &ModelGraph) -> Result<SortKeySpec, SchemaError> {
        let key = self
            .key_member()
            .ok_or_else(|| SchemaError::invalid_type(&self.key, "table has no key member"))?;
        let kind = graph.model(key.item_key())?.sort_key_kind().ok_or_else(|| {
            SchemaError::invalid_member(&self.key, key.name(), "type cannot be a sort key")
        })?;
        let default = key
            .default_value()
            .to_map_key()
            .and_then(|k| kind.normalize(&k));
        Ok(SortKeySpec {
            table: self.declaration.name.clone(),
            index: key.index(),
            kind,
            default,
        })
    }

    fn plan(&self) -> Result<TablePlan, SchemaError> {
        self.plan
            .get()
            .copied()
            .ok_or_else(|| SchemaError::invalid_type(&self.key, "table was not validated"))
    }

    fn fields<'v>(&self, value: &'v Value) -> SerializeResult<&'v Fields> {
        match value {
            Value::Table(fields) => Ok(fields),
            Value::Null => Err(SerializeError::NullValue {
                type_name: self.declaration.name.clone(),
            }),
            other => Err(type_mismatch(&self.key, other)),
        }
    }

    /// Value of `member` as it will be written, or `None` to leave it out.
    fn member_value<'v>(
        &self,
        fields: &'v Fields,
        member: &'v TableMemberModel,
        item: &dyn TypeModel,
    ) -> SerializeResult<Option<&'v Value>> {
        let value = match fields.get(member.name()) {
            None | Some(Value::Union(0, _)) => &NULL,
            Some(value) => value,
        };
        if value.is_null() {
            if member.is_required() {
                return Err(SerializeError::RequiredField {
                    type_name: self.declaration.name.clone(),
                    member: member.name().to_owned(),
                });
            }
            if !item.always_serialize() {
                return Ok(None);
            }
            return Ok(Some(member.default_value()));
        }
        let default = member.default_value();
        let elide = !member.always_written(item)
            && !default.is_null()
            && match item.canonical_value(value) {
                Some(canonical) => canonical.loosely_equals(default),
                None => value.loosely_equals(default),
            };
        Ok((!elide).then_some(value))
    }

    fn sorted_vector_spec(
        &self,
        graph: &ModelGraph,
        member: &TableMemberModel,
    ) -> Result<SortKeySpec, SchemaError> {
        let vector = graph.model(member.item_key())?;
        let element = vector.vector_item().ok_or_else(|| {
            SchemaError::invalid_member(&self.key, member.name(), "sorted member is not a vector")
        })?;
        let table = graph.model(element)?;
        let table = table.as_table().ok_or_else(|| {
            SchemaError::invalid_member(&self.key, member.name(), "sorted vector items must be tables")
        })?;
        table.sort_key_spec(graph)
    }

    fn validate_sorted_vector(
        &self,
        graph: &ModelGraph,
        member: &TableMemberModel,
        item: &dyn TypeModel,
    ) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::invalid_member(&self.key, member.name(), reason);
        let element = match (item.type_key(), item.vector_item()) {
            (TypeKey::Vector { .. }, Some(element)) => element,
            _ => return Err(invalid("sorted_vector requires a vector of tables".into())),
        };
        let element_model = graph.model(element)?;
        let Some(table) = element_model.as_table() else {
            return Err(invalid(format!("'{}' is not a table", element)));
        };
        let Some(key) = table.key_member() else {
            return Err(invalid(format!("table '{}' has no key member", element)));
        };
        if *element != self.key && !graph.is_validated(key.item_key()) {
            return Err(SchemaError::DependencyPending {
                type_name: self.declaration.name.clone(),
                dependency: key.item_key().clone(),
            });
        }
        if graph.model(key.item_key())?.sort_key_kind().is_none() {
            return Err(invalid(format!(
                "key '{}.{}' cannot be compared",
                element,
                key.name()
            )));
        }
        Ok(())
    }

    /// Read the table starting at absolute position `table`. `depth` must
    /// already account for this table.
    pub(crate) fn parse_table(
        &self,
        reader: &Reader<'_>,
        table: usize,
        depth: usize,
    ) -> ParseResult<Value> {
        let buffer = reader.buffer;
        let mut fields = Fields::new();
        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            let item = reader.model(member.item_key())?;
            let location = buffer.get_absolute_table_field_location(table, member.index())?;
            let value = if member.slot_count() == 2 {
                let second = buffer.get_absolute_table_field_location(table, member.index() + 1)?;
                item.parse_pair(reader, location, second, depth)?
            } else {
                match location {
                    Some(location) => item.parse(reader, location, depth)?,
                    None => member.default_value().clone(),
                }
            };
            if value.is_null() {
                if member.is_required() {
                    return Err(ParseError::RequiredFieldMissing {
                        type_name: self.declaration.name.clone(),
                        member: member.name().to_owned(),
                    });
                }
                continue;
            }
            fields.insert(member.name().to_owned(), value);
        }
        Ok(Value::Table(fields))
    }

    /// Overwrite an inline member of an existing buffer in place.
    ///
    /// `path` names a write-through member, optionally followed by struct
    /// member names. The member must be present in the buffer.
    pub fn write_through(
        &self,
        graph: &ModelGraph,
        buffer: &mut [u8],
        table: usize,
        path: &[&str],
        value: &Value,
    ) -> SerializeResult<()> {
        let not_write_through = || SerializeError::NotWriteThrough {
            path: path.join("."),
        };
        let (first, rest) = path.split_first().ok_or_else(not_write_through)?;
        let member = self
            .member(first)
            .filter(|m| m.is_write_through() && !m.is_deprecated())
            .ok_or_else(not_write_through)?;
        let mut location = buffer
            .get_absolute_table_field_location(table, member.index())
            .map_err(|_| not_write_through())?
            .ok_or_else(not_write_through)?;
        let mut item = graph.model(member.item_key())?.clone();
        for name in rest {
            let next = {
                let parent = item.as_struct().ok_or_else(not_write_through)?;
                let field = parent.member(name).ok_or_else(not_write_through)?;
                location += field.offset;
                field.type_key.clone()
            };
            item = graph.model(&next)?.clone();
        }
        // Inline writes never allocate.
        let mut context = SerializationContext::new(0, &SerializerOptions::default());
        let mut writer = Writer::new(buffer, &mut context, graph);
        item.serialize(&mut writer, value, location)
    }

}

/// Generated helper returning the sort key of `table`.
pub(crate) fn sort_key_function(
    table: &TableModel,
    graph: &ModelGraph,
) -> Result<(String, String), SchemaError> {
    let spec = table.sort_key_spec(graph)?;
    let name = format!("sort_key_{}", codegen::to_snake_case(table.name()));
    let default = match &spec.default {
        Some(key) => format!("Some({})", map_key_literal(key)),
        None => "None".to_owned(),
    };
    let kind = match spec.kind {
        SortKeyKind::Bool => "Bool".to_owned(),
        SortKeyKind::String => "String".to_owned(),
        SortKeyKind::Signed(scalar) => format!("Signed(flatforge::schema::ScalarKind::{:?})", scalar),
        SortKeyKind::Unsigned(scalar) => {
            format!("Unsigned(flatforge::schema::ScalarKind::{:?})", scalar)
        }
    };
    let definition = format!(
        "fn {}() -> flatforge::sorted::SortKeySpec {{\n    \
         flatforge::sorted::SortKeySpec {{\n        \
         table: \"{}\".into(),\n        \
         index: {},\n        \
         kind: flatforge::sorted::SortKeyKind::{},\n        \
         default: {},\n    \
         }}\n}}",
        name, spec.table, spec.index, kind, default
    );
    Ok((name, definition))
}

fn map_key_literal(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => format!("flatforge::value::MapKey::Bool({})", b),
        MapKey::Int(v) => format!("flatforge::value::MapKey::Int({})", v),
        MapKey::UInt(v) => format!("flatforge::value::MapKey::UInt({})", v),
        MapKey::String(s) => format!("flatforge::value::MapKey::String({:?}.to_owned())", s),
    }
}

impl TypeModel for TableModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Table
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &TABLE_LAYOUT
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

    fn children(&self) -> Vec<TypeKey> {
        self.declaration
            .members
            .iter()
            .map(|m| m.type_key.clone())
            .collect()
    }

    fn as_table(&self) -> Option<&TableModel> {
        Some(self)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        let mut members = Vec::with_capacity(self.declaration.members.len());
        for declaration in &self.declaration.members {
            let item = resolver.resolve(&declaration.type_key)?;
            members.push(TableMemberModel::new(
                &self.declaration.name,
                declaration.clone(),
                item.as_ref(),
            )?);
        }
        members.sort_by_key(|m| m.index());
        let _ = self.members.set(members);
        Ok(())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        let name = &self.declaration.name;
        if self.members.get().is_none() {
            return Err(SchemaError::invalid_type(name, "table was not initialized"));
        }

        let mut slots: BTreeMap<u32, &str> = BTreeMap::new();
        let mut slot_count = 0usize;
        for member in self.members() {
            for slot in member.slots() {
                if let Some(first) = slots.insert(slot, member.name()) {
                    return Err(SchemaError::IndexConflict {
                        type_name: name.clone(),
                        index: u16::try_from(slot).unwrap_or(u16::MAX),
                        first: first.to_owned(),
                        second: member.name().to_owned(),
                    });
                }
                slot_count = slot_count.max(slot as usize + 1);
            }
        }

        let mut key: Option<&TableMemberModel> = None;
        let mut max_inline = SOFFSET_SIZE;
        let mut alignment = SOFFSET_SIZE;
        for member in self.members() {
            let item = graph.model(member.item_key())?;
            let invalid =
                |reason: &str| SchemaError::invalid_member(name, member.name(), reason.to_owned());
            if member.is_deprecated() {
                if member.is_key() {
                    return Err(invalid("a deprecated member cannot be the key"));
                }
                continue;
            }
            if !item.is_valid_table_member() {
                return Err(invalid(&format!(
                    "type '{}' cannot be a table member",
                    member.item_key()
                )));
            }
            if member.is_key() {
                if let Some(existing) = key {
                    return Err(invalid(&format!(
                        "'{}' is already the key; a table has at most one",
                        existing.name()
                    )));
                }
                if item.sort_key_kind().is_none() {
                    return Err(invalid(&format!(
                        "type '{}' cannot be a sort key",
                        member.item_key()
                    )));
                }
                key = Some(member);
            }
            if member.is_sorted_vector() {
                self.validate_sorted_vector(graph, member, item.as_ref())?;
            }
            if member.is_required() && (item.is_nullable() || !member.default_value().is_null()) {
                return Err(invalid("only members without an implicit default can be required"));
            }
            if member.is_write_through() && (!item.serializes_inline() || item.is_nullable()) {
                return Err(invalid("write-through members must be inline and non-nullable"));
            }
            max_inline += item.max_inline_size();
            alignment = alignment.max(item.alignment());
        }

        let vtable_bytes = VTABLE_HEADER_SIZE + VOFFSET_SIZE * slot_count;
        if vtable_bytes > MAX_VTABLE_BYTES {
            return Err(SchemaError::invalid_type(
                name,
                format!("vtable of {} bytes exceeds {}", vtable_bytes, MAX_VTABLE_BYTES),
            ));
        }
        if max_inline > MAX_VTABLE_BYTES {
            return Err(SchemaError::invalid_type(
                name,
                format!("inline size {} exceeds {}", max_inline, MAX_VTABLE_BYTES),
            ));
        }

        let _ = self.plan.set(TablePlan {
            max_inline,
            alignment,
            slot_count,
        });
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let plan = self.plan()?;
        let span = &ctx.span_variable_name;
        let sctx = &ctx.serialization_context_variable_name;
        let value = &ctx.value_variable_name;
        let mut definitions = Vec::new();

        let mut body = String::new();
        let _ = writeln!(
            body,
            "let start = {}.allocate_space({}, {})?;",
            sctx, plan.max_inline, plan.alignment
        );
        let _ = writeln!(body, "let mut cursor = start + {};", SOFFSET_SIZE);
        let _ = writeln!(body, "let mut vtable = [0u16; {}];", plan.slot_count);

        let mut deferred = String::new();
        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            let item = ctx.graph.model(member.item_key())?;
            let field = format!("{}.{}", value, member.name());
            let optional = member.is_optional_in_host(item.as_ref());
            let _ = writeln!(body, "// {}", member.name());

            if item.serializes_inline() {
                let element = item.physical_layout().first().copied().ok_or_else(|| {
                    SchemaError::invalid_member(&self.key, member.name(), "no layout")
                })?;
                if optional {
                    let _ = writeln!(body, "if let Some(v) = &{} {{", field);
                } else if item.is_nullable() {
                    let _ = writeln!(body, "if {}.is_some() {{\n    let v = &{};", field, field);
                } else if member.always_written(item.as_ref()) || member.is_required() {
                    let _ = writeln!(body, "{{\n    let v = &{};", field);
                } else {
                    let _ = writeln!(
                        body,
                        "if {} != {} {{\n    let v = &{};",
                        field,
                        item.literal(member.default_value()),
                        field
                    );
                }
                let _ = writeln!(
                    body,
                    "    let pos = flatforge::layout::align_to(cursor, {});",
                    element.alignment
                );
                let _ = writeln!(body, "    {};", ctx.invoke(member.item_key(), "v", "pos"));
                let _ = writeln!(body, "    vtable[{}] = (pos - start) as u16;", member.index());
                let _ = writeln!(body, "    cursor = pos + {};\n}}", element.inline_size);
                continue;
            }

            let slots = format!("slots_{}", member.name());
            let layout = item.physical_layout();
            if optional {
                let _ = writeln!(body, "let {} = if {}.is_some() {{", slots, field);
            } else {
                let _ = writeln!(body, "let {} = {{", slots);
            }
            let mut positions = Vec::new();
            for (i, element) in layout.iter().enumerate() {
                let _ = writeln!(
                    body,
                    "    let pos{} = flatforge::layout::align_to(cursor, {});",
                    i, element.alignment
                );
                let _ = writeln!(
                    body,
                    "    vtable[{}] = (pos{} - start) as u16;",
                    usize::from(member.index()) + i,
                    i
                );
                let _ = writeln!(body, "    cursor = pos{} + {};", i, element.inline_size);
                positions.push(format!("pos{}", i));
            }
            if optional {
                let _ = writeln!(body, "    Some([{}])\n}} else {{\n    None\n}};", positions.join(", "));
                let _ = writeln!(
                    deferred,
                    "if let (Some(slots), Some(v)) = ({}, &{}) {{",
                    slots, field
                );
            } else {
                let _ = writeln!(body, "    Some([{}])\n}};", positions.join(", "));
                let _ = writeln!(deferred, "if let Some(slots) = {} {{\n    let v = &{};", slots, field);
            }
            let call = if layout.len() == 2 {
                ctx.invoke_pair(member.item_key(), "v", "slots[0]", "slots[1]")
            } else {
                ctx.invoke(member.item_key(), "v", "slots[0]")
            };
            let _ = writeln!(deferred, "    {};", call);
            if member.is_sorted_vector() {
                let element = item.vector_item().ok_or_else(|| {
                    SchemaError::invalid_member(&self.key, member.name(), "not a vector")
                })?;
                let element_model = ctx.graph.model(element)?;
                let table = element_model.as_table().ok_or_else(|| {
                    SchemaError::invalid_member(&self.key, member.name(), "items are not tables")
                })?;
                let (function, definition) = sort_key_function(table, ctx.graph)?;
                definitions.push(definition);
                let _ = writeln!(
                    deferred,
                    "    let vector = (&*{}).read_uoffset(slots[0]).map_err(|_| SerializeError::OffsetOverflow {{ offset: slots[0] }})?;",
                    span
                );
                let _ = writeln!(deferred, "    let spec = {}();", function);
                let _ = writeln!(
                    deferred,
                    "    {}.add_post_serialize_action(Box::new(move |span: &mut [u8]| {{\n        flatforge::sorted::sort_vector_of_tables(span, vector, &spec)\n    }}));",
                    sctx
                );
            }
            deferred.push_str("}\n");
        }

        let _ = writeln!(body, "{}.shrink_to(start + {}, cursor);", sctx, plan.max_inline);
        let _ = writeln!(
            body,
            "let vtable_bytes = flatforge::context::encode_vtable(&vtable, cursor - start)?;"
        );
        let _ = writeln!(
            body,
            "let vtable_pos = {}.finish_vtable({}, &vtable_bytes)?;",
            sctx, span
        );
        let _ = writeln!(body, "{}.write_soffset(start, vtable_pos)?;", span);
        let _ = writeln!(
            body,
            "{}.write_uoffset({}, start)?;",
            span, ctx.offset_variable_name
        );
        body.push_str(&deferred);
        body.push_str("Ok(())");

        let method = GeneratedMethod::new(body);
        Ok(if definitions.is_empty() {
            method
        } else {
            method.with_class_definition(definitions.join("\n\n"))
        })
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let buf = &ctx.input_buffer_variable_name;
        let depth = &ctx.depth_variable_name;
        let options = &ctx.options_variable_name;
        let mut body = format!(
            "let {depth} = {depth} + 1;\n\
             if {depth} > {options}.max_depth {{\n    \
             return Err(ParseError::DepthExceeded {{ limit: {options}.max_depth }});\n\
             }}\n\
             let table_start = {buf}.read_uoffset({offset})?;\n",
            depth = depth,
            options = options,
            buf = buf,
            offset = ctx.offset_variable_name
        );
        let mut construct = format!("Ok({} {{\n", self.declaration.name);

        for member in self.members() {
            let field = member.name();
            if member.is_deprecated() {
                let _ = writeln!(construct, "    {}: Default::default(),", field);
                continue;
            }
            let item = ctx.graph.model(member.item_key())?;
            let optional = member.is_optional_in_host(item.as_ref());
            let missing = format!(
                "return Err(ParseError::RequiredFieldMissing {{\n        type_name: \"{}\".into(),\n        member: \"{}\".into(),\n    }})",
                self.declaration.name, field
            );

            if item.physical_layout().len() == 2 {
                let call = ctx.invoke_pair(member.item_key(), "first", "second", depth);
                let (scrutinee, pattern) = if item.as_union().is_some() {
                    ("first", format!("Some(loc) if {}.read_u8(loc)? != 0", buf))
                } else {
                    ("(first, second)", "(Some(_), _) | (_, Some(_))".to_owned())
                };
                let present = if optional { format!("Some({})", call) } else { call };
                let absent = if member.is_required() {
                    missing
                } else {
                    item.literal(member.default_value())
                };
                let _ = writeln!(
                    body,
                    "let {field} = {{\n    \
                     let first = {buf}.get_absolute_table_field_location(table_start, {first})?;\n    \
                     let second = {buf}.get_absolute_table_field_location(table_start, {second})?;\n    \
                     match {scrutinee} {{\n        \
                     {pattern} => {present},\n        \
                     _ => {absent},\n    \
                     }}\n}};",
                    field = field,
                    buf = buf,
                    first = member.index(),
                    second = u32::from(member.index()) + 1,
                    scrutinee = scrutinee,
                    pattern = pattern,
                    present = present,
                    absent = absent
                );
            } else {
                let call = ctx.invoke(member.item_key(), "loc", depth);
                let present = if optional { format!("Some({})", call) } else { call };
                let absent = if member.is_required() {
                    missing
                } else if optional {
                    "None".to_owned()
                } else {
                    item.literal(member.default_value())
                };
                let _ = writeln!(
                    body,
                    "let {} = match {}.get_absolute_table_field_location(table_start, {})? {{\n    \
                     Some(loc) => {},\n    \
                     None => {},\n}};",
                    field,
                    buf,
                    member.index(),
                    present,
                    absent
                );
            }
            let _ = writeln!(construct, "    {},", field);
        }
        construct.push_str("})");
        body.push_str(&construct);
        Ok(GeneratedMethod::new(body))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let plan = self.plan()?;
        let fixed = max_padding(plan.alignment)
            + plan.max_inline
            + max_padding(VOFFSET_SIZE)
            + VTABLE_HEADER_SIZE
            + VOFFSET_SIZE * plan.slot_count;
        let mut body = format!("let mut size = {};\n", fixed);
        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            let item = ctx.graph.model(member.item_key())?;
            if item.serializes_inline() {
                continue;
            }
            let field = format!("{}.{}", ctx.value_variable_name, member.name());
            if member.is_optional_in_host(item.as_ref()) {
                let _ = writeln!(
                    body,
                    "if let Some(v) = &{} {{\n    size += {};\n}}",
                    field,
                    ctx.invoke(member.item_key(), "v")
                );
            } else {
                let _ = writeln!(
                    body,
                    "size += {};",
                    ctx.invoke(member.item_key(), &format!("&{}", field))
                );
            }
        }
        body.push_str("size");
        Ok(GeneratedMethod::new(body))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let mut body = format!("{} {{\n", self.declaration.name);
        for member in self.members() {
            let field = member.name();
            if member.is_deprecated() {
                let _ = writeln!(body, "    {}: Default::default(),", field);
                continue;
            }
            let item = ctx.graph.model(member.item_key())?;
            let access = format!("{}.{}", ctx.item_variable_name, field);
            if member.is_optional_in_host(item.as_ref()) {
                let _ = writeln!(
                    body,
                    "    {}: {}.as_ref().map({}),",
                    field,
                    access,
                    CloneCodeGenContext::method_name(member.item_key())
                );
            } else {
                let _ = writeln!(
                    body,
                    "    {}: {},",
                    field,
                    ctx.invoke(member.item_key(), &format!("&{}", access))
                );
            }
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
        let plan = self.plan()?;
        let start = writer
            .context
            .allocate_space(plan.max_inline, plan.alignment)?;
        let mut cursor = start + SOFFSET_SIZE;
        let mut entries = vec![0u16; plan.slot_count];
        let mut deferred = Vec::new();

        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            let item = writer.model(member.item_key())?;
            let Some(member_value) = self.member_value(fields, member, item.as_ref())? else {
                continue;
            };
            let mut slots = Vec::with_capacity(2);
            for (i, element) in item.physical_layout().iter().enumerate() {
                let position = align_to(cursor, element.alignment);
                cursor = position + element.inline_size;
                entries[usize::from(member.index()) + i] = u16::try_from(position - start)
                    .map_err(|_| SerializeError::OffsetOverflow { offset: position })?;
                slots.push(position);
            }
            if item.serializes_inline() {
                item.serialize(writer, member_value, slots[0])?;
            } else {
                deferred.push(Deferred {
                    member,
                    item,
                    value: member_value,
                    slots,
                });
            }
        }

        writer.context.shrink_to(start + plan.max_inline, cursor);
        let vtable = encode_vtable(&entries, cursor - start)?;
        let vtable_position = writer.context.finish_vtable(writer.span, &vtable)?;
        writer.span.write_soffset(start, vtable_position)?;
        writer.span.write_uoffset(offset, start)?;

        for child in deferred {
            match child.slots.as_slice() {
                [slot] => child.item.serialize(writer, child.value, *slot)?,
                [first, second] => child.item.serialize_pair(writer, child.value, *first, *second)?,
                _ => {
                    return Err(SchemaError::invalid_member(
                        &self.key,
                        child.member.name(),
                        "unsupported slot count",
                    )
                    .into())
                }
            }
            if child.member.is_sorted_vector() {
                let vector = writer.follow_uoffset(child.slots[0])?;
                let spec = self.sorted_vector_spec(writer.graph, child.member)?;
                writer.schedule_sort(vector, spec);
            }
        }
        Ok(())
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        let depth = reader.enter(depth)?;
        let table = reader.buffer.read_uoffset(offset)?;
        self.parse_table(reader, table, depth)
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        let fields = self.fields(value)?;
        let plan = self.plan()?;
        let mut size = max_padding(plan.alignment)
            + plan.max_inline
            + max_padding(VOFFSET_SIZE)
            + VTABLE_HEADER_SIZE
            + VOFFSET_SIZE * plan.slot_count;
        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            let item = graph.model(member.item_key())?;
            if item.serializes_inline() {
                continue;
            }
            if let Some(member_value) = self.member_value(fields, member, item.as_ref())? {
                size += item.max_size(graph, member_value)?;
            }
        }
        Ok(size)
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        let fields = self.fields(value)?;
        let mut cloned = Fields::new();
        for member in self.members().iter().filter(|m| !m.is_deprecated()) {
            match fields.get(member.name()) {
                None | Some(Value::Null) => {}
                Some(member_value) => {
                    let item = graph.model(member.item_key())?;
                    cloned.insert(
                        member.name().to_owned(),
                        item.clone_value(graph, member_value)?,
                    );
                }
            }
        }
        Ok(Value::Table(cloned))
    }
}
