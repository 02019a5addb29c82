// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{begin_vector, read_vector_header, vector_body_max_size, VECTOR_LAYOUT};
use crate::buffer::InputBuffer;
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::config::{DeserializationMode, UOFFSET_SIZE, VECTOR_LENGTH_SIZE};
use crate::container::Resolver;
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::model::table::sort_key_function;
use crate::model::{type_mismatch, SchemaKind, TableModel, TypeModel, TypeModelRef};
use crate::runtime::{Reader, Writer};
use crate::schema::{IndexedKind, TypeKey};
use crate::sorted::{self, SortKeySpec};
use crate::value::{Fields, MapKey, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

const OFFSET_ELEMENT: PhysicalLayoutElement =
    PhysicalLayoutElement::new(UOFFSET_SIZE, UOFFSET_SIZE);

/// Sorted vector of keyed tables exposed as a map.
///
/// On the wire this is a plain vector of table offsets sorted by the key
/// member of the value table. Each entry's key is the key member of its
/// table; map keys only select which table is written.
#[derive(Debug)]
pub struct IndexedVectorModel {
    key: TypeKey,
    kind: IndexedKind,
    key_type: TypeKey,
    value_type: TypeKey,
}

impl IndexedVectorModel {
    pub fn new(kind: IndexedKind, key_type: TypeKey, value_type: TypeKey) -> Self {
        Self {
            key: TypeKey::indexed(kind, key_type.clone(), value_type.clone()),
            kind,
            key_type,
            value_type,
        }
    }

    pub fn kind(&self) -> IndexedKind {
        self.kind
    }

    fn table<'g>(
        &self,
        graph: &'g ModelGraph,
    ) -> Result<(&'g TypeModelRef, &'g TableModel), SchemaError> {
        let model = graph.model(&self.value_type)?;
        let table = model.as_table().ok_or_else(|| {
            SchemaError::invalid_type(
                &self.key,
                format!("'{}' is not a table", self.value_type),
            )
        })?;
        Ok((model, table))
    }

    fn key_name<'g>(&self, table: &'g TableModel) -> Result<&'g str, SchemaError> {
        table.key_member().map(|m| m.name()).ok_or_else(|| {
            SchemaError::invalid_type(
                &self.key,
                format!("table '{}' has no key member", table.name()),
            )
        })
    }

    /// Table values in write order, each carrying its key member.
    fn entries<'v>(
        &self,
        graph: &ModelGraph,
        value: &'v Value,
    ) -> SerializeResult<Vec<Cow<'v, Value>>> {
        match value {
            Value::Vector(items) => Ok(items.iter().map(Cow::Borrowed).collect()),
            Value::Map(map) => {
                let (_, table) = self.table(graph)?;
                let spec = table.sort_key_spec(graph)?;
                let key_name = self.key_name(table)?;
                let mut entries = Vec::with_capacity(map.len());
                for (key, item) in map {
                    let fields = match item {
                        Value::Table(fields) => fields,
                        other => return Err(type_mismatch(&self.value_type, other)),
                    };
                    let mismatch = || SerializeError::KeyMismatch {
                        type_name: self.key.to_string(),
                        key: key.to_string(),
                    };
                    let expected = spec.kind.normalize(key).ok_or_else(mismatch)?;
                    match fields.get(key_name) {
                        Some(stored) if !stored.is_null() => {
                            let stored = stored.to_map_key().and_then(|k| spec.kind.normalize(&k));
                            if stored.as_ref() != Some(&expected) {
                                return Err(mismatch());
                            }
                            entries.push(Cow::Borrowed(item));
                        }
                        _ => {
                            let mut fields: Fields = fields.clone();
                            fields.insert(key_name.to_owned(), Value::from(key.clone()));
                            entries.push(Cow::Owned(Value::Table(fields)));
                        }
                    }
                }
                Ok(entries)
            }
            Value::Null => Err(SerializeError::NullValue {
                type_name: self.key.to_string(),
            }),
            other => Err(type_mismatch(&self.key, other)),
        }
    }

    fn materialize(&self, reader: &Reader<'_>) -> bool {
        self.kind == IndexedKind::Dictionary
            || reader.options.deserialization == DeserializationMode::Greedy
    }

    /// Binary-search the serialized vector behind the uoffset at `offset`
    /// for the table whose key equals `target`.
    pub fn lookup(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        target: &MapKey,
        depth: usize,
    ) -> ParseResult<Option<Value>> {
        let depth = reader.enter(depth)?;
        let (_, table) = self.table(reader.graph)?;
        let spec = table.sort_key_spec(reader.graph)?;
        let vector = reader.buffer.read_uoffset(offset)?;
        match sorted::binary_search_by_key(reader.buffer, vector, &spec, target)? {
            Some(position) => table
                .parse_table(reader, position, reader.enter(depth)?)
                .map(Some),
            None => Ok(None),
        }
    }

    fn sort_spec(&self, graph: &ModelGraph) -> Result<SortKeySpec, SchemaError> {
        let (_, table) = self.table(graph)?;
        table.sort_key_spec(graph)
    }

    /// Host expression for the underlying `BTreeMap`.
    fn host_map(&self, value: &str) -> String {
        match self.kind {
            IndexedKind::IndexedVector => format!("&{}.0", value),
            IndexedKind::Dictionary => value.to_owned(),
        }
    }
}

impl TypeModel for IndexedVectorModel {
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

    fn children(&self) -> Vec<TypeKey> {
        vec![self.key_type.clone(), self.value_type.clone()]
    }

    fn vector_item(&self) -> Option<&TypeKey> {
        Some(&self.value_type)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        resolver.resolve(&self.key_type)?;
        resolver.resolve(&self.value_type)?;
        Ok(())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        let (_, table) = self.table(graph)?;
        let key_member = table.key_member().ok_or_else(|| {
            SchemaError::invalid_type(
                &self.key,
                format!("table '{}' has no key member", table.name()),
            )
        })?;
        if *key_member.item_key() != self.key_type {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!(
                    "map key '{}' does not match key member '{}.{}' of type '{}'",
                    self.key_type,
                    table.name(),
                    key_member.name(),
                    key_member.item_key()
                ),
            ));
        }
        if !graph.is_validated(&self.value_type) {
            return Err(SchemaError::DependencyPending {
                type_name: self.key.to_string(),
                dependency: self.value_type.clone(),
            });
        }
        if graph.model(&self.key_type)?.sort_key_kind().is_none() {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("key type '{}' has no total order", self.key_type),
            ));
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let (_, table) = self.table(ctx.graph)?;
        let (function, definition) = sort_key_function(table, ctx.graph)?;
        let span = &ctx.span_variable_name;
        let sctx = &ctx.serialization_context_variable_name;
        let body = format!(
            "let map = {map};\n\
             let pos = {sctx}.allocate_vector({size}, map.len(), {size})?;\n\
             let count = u32::try_from(map.len()).map_err(|_| SerializeError::OffsetOverflow {{ offset: pos }})?;\n\
             {span}.write_u32(pos, count)?;\n\
             {span}.write_uoffset({offset}, pos)?;\n\
             // Each table writes its own key member.\n\
             for (i, v) in map.values().enumerate() {{\n    \
             {call};\n\
             }}\n\
             let spec = {function}();\n\
             {sctx}.add_post_serialize_action(Box::new(move |span: &mut [u8]| {{\n    \
             flatforge::sorted::sort_vector_of_tables(span, pos, &spec)\n\
             }}));\n\
             Ok(())",
            map = self.host_map(&ctx.value_variable_name),
            sctx = sctx,
            size = UOFFSET_SIZE,
            span = span,
            offset = ctx.offset_variable_name,
            call = ctx.invoke(
                &self.value_type,
                "v",
                &format!("pos + {} + i * {}", VECTOR_LENGTH_SIZE, UOFFSET_SIZE)
            ),
            function = function
        );
        Ok(GeneratedMethod::new(body).with_class_definition(definition))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let (model, table) = self.table(ctx.graph)?;
        let key_member = table.key_member().ok_or_else(|| {
            SchemaError::invalid_type(&self.key, "value table has no key member")
        })?;
        let key_item = ctx.graph.model(key_member.item_key())?;
        let key_expr = if key_member.is_optional_in_host(key_item.as_ref()) {
            format!(
                "v.{}.clone().ok_or(ParseError::RequiredFieldMissing {{\n        type_name: \"{}\".into(),\n        member: \"{}\".into(),\n    }})?",
                key_member.name(),
                table.name(),
                key_member.name()
            )
        } else {
            format!("v.{}.clone()", key_member.name())
        };
        let buf = &ctx.input_buffer_variable_name;
        let depth = &ctx.depth_variable_name;
        let options = &ctx.options_variable_name;
        let body = format!(
            "let {depth} = {depth} + 1;\n\
             if {depth} > {options}.max_depth {{\n    \
             return Err(ParseError::DepthExceeded {{ limit: {options}.max_depth }});\n\
             }}\n\
             let start = {buf}.read_uoffset({offset})?;\n\
             let count = {buf}.read_u32(start)? as usize;\n\
             let first = start + {len};\n\
             {buf}.read_bytes(first, count.checked_mul({size}).ok_or(ParseError::InvalidOffset {{ offset: start }})?)?;\n\
             let mut map = BTreeMap::new();\n\
             for i in 0..count {{\n    \
             let v = {call};\n    \
             let k = {key};\n    \
             map.insert(k, v);\n\
             }}\n\
             Ok({wrap})",
            depth = depth,
            options = options,
            buf = buf,
            offset = ctx.offset_variable_name,
            len = VECTOR_LENGTH_SIZE,
            size = UOFFSET_SIZE,
            call = ctx.invoke(model.type_key(), &format!("first + i * {}", UOFFSET_SIZE), depth),
            key = key_expr,
            wrap = match self.kind {
                IndexedKind::IndexedVector => "IndexedVector(map)",
                IndexedKind::Dictionary => "map",
            }
        );
        Ok(GeneratedMethod::new(body))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "let map = {};\n{} + {} * map.len() + map.values().map(|v| {}).sum::<usize>()",
            self.host_map(&ctx.value_variable_name),
            vector_body_max_size(OFFSET_ELEMENT, 0),
            UOFFSET_SIZE,
            ctx.invoke(&self.value_type, "v")
        )))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let collect = format!(
            "{}.iter().map(|(k, v)| (k.clone(), {})).collect()",
            self.host_map(&ctx.item_variable_name),
            ctx.invoke(&self.value_type, "v")
        );
        Ok(GeneratedMethod::new(match self.kind {
            IndexedKind::IndexedVector => format!("IndexedVector({})", collect),
            IndexedKind::Dictionary => collect,
        }))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let entries = self.entries(writer.graph, value)?;
        let (model, _) = self.table(writer.graph)?;
        let model = model.clone();
        let spec = self.sort_spec(writer.graph)?;
        let first = begin_vector(writer, offset, OFFSET_ELEMENT, entries.len())?;
        for (i, entry) in entries.iter().enumerate() {
            if entry.is_null() {
                return Err(SerializeError::NullVectorItem {
                    type_name: self.key.to_string(),
                    index: i,
                });
            }
            model.serialize(writer, entry, first + i * UOFFSET_SIZE)?;
        }
        writer.schedule_sort(first - VECTOR_LENGTH_SIZE, spec);
        Ok(())
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        let depth = reader.enter(depth)?;
        let (model, table) = self.table(reader.graph)?;
        let spec = table.sort_key_spec(reader.graph)?;
        let key_name = self.key_name(table)?;
        let (first, count) = read_vector_header(reader.buffer, offset, UOFFSET_SIZE)?;

        if !self.materialize(reader) {
            let mut items = Vec::with_capacity(count);
            for i in 0..count {
                items.push(model.parse(reader, first + i * UOFFSET_SIZE, depth)?);
            }
            return Ok(Value::Vector(items));
        }

        let mut map = BTreeMap::new();
        for i in 0..count {
            let item = model.parse(reader, first + i * UOFFSET_SIZE, depth)?;
            let key = item
                .get(key_name)
                .and_then(Value::to_map_key)
                .and_then(|k| spec.kind.normalize(&k))
                .ok_or_else(|| ParseError::RequiredFieldMissing {
                    type_name: table.name().to_owned(),
                    member: key_name.to_owned(),
                })?;
            map.insert(key, item);
        }
        Ok(Value::Map(map))
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        let entries = self.entries(graph, value)?;
        let (model, _) = self.table(graph)?;
        let mut size = vector_body_max_size(OFFSET_ELEMENT, entries.len());
        for entry in &entries {
            size += model.max_size(graph, entry)?;
        }
        Ok(size)
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        let (model, _) = self.table(graph)?;
        match value {
            Value::Map(map) => {
                let mut cloned = BTreeMap::new();
                for (key, item) in map {
                    cloned.insert(key.clone(), model.clone_value(graph, item)?);
                }
                Ok(Value::Map(cloned))
            }
            Value::Vector(items) => items
                .iter()
                .map(|item| model.clone_value(graph, item))
                .collect::<SerializeResult<Vec<_>>>()
                .map(Value::Vector),
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

    #[test]
    fn test_key_and_children() {
        let model = IndexedVectorModel::new(
            IndexedKind::Dictionary,
            TypeKey::String,
            TypeKey::named("Monster"),
        );
        assert_eq!(
            model.type_key().to_string(),
            "Dictionary<string, Monster>"
        );
        assert_eq!(
            model.children(),
            vec![TypeKey::String, TypeKey::named("Monster")]
        );
        assert_eq!(model.vector_item(), Some(&TypeKey::named("Monster")));
        assert_eq!(model.host_map("value"), "value");
    }

    #[test]
    fn test_missing_value_model() {
        let model = IndexedVectorModel::new(
            IndexedKind::IndexedVector,
            TypeKey::String,
            TypeKey::named("Monster"),
        );
        let graph = ModelGraph::new();
        assert!(matches!(
            model.max_size(&graph, &Value::Map(BTreeMap::new())),
            Err(SerializeError::Schema(SchemaError::MissingModel(_)))
        ));
        assert_eq!(model.host_map("value"), "&value.0");
    }
}
