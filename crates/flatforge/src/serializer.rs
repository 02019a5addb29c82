// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compiled serializer for one root table.
//!
//! Buffer layout:
//!
//! ```text
//! [0..4)  uoffset to the root table
//! [4..8)  file identifier (only when the root table declares one)
//! [8..)   root table, its vtable, then everything it references
//! ```

use crate::buffer::{InputBuffer, SpanWriter};
use crate::codegen::{self, GeneratedModule};
use crate::config::{SerializerOptions, FILE_IDENTIFIER_LENGTH, UOFFSET_SIZE};
use crate::context::SerializationContext;
use crate::error::{ParseError, ParseResult, SchemaError, SerializeResult};
use crate::graph::ModelGraph;
use crate::model::{TableModel, TypeModelRef};
use crate::runtime::{Reader, Writer};
use crate::schema::TypeKey;
use crate::value::{MapKey, Value};
use std::sync::Arc;

/// Immutable snapshot of a validated model graph plus its root.
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Serializer {
    graph: Arc<ModelGraph>,
    root: TypeKey,
    options: SerializerOptions,
}

impl Serializer {
    pub(crate) fn new(graph: Arc<ModelGraph>, root: TypeKey, options: SerializerOptions) -> Self {
        Self {
            graph,
            root,
            options,
        }
    }

    pub fn root(&self) -> &TypeKey {
        &self.root
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    fn root_model(&self) -> Result<&TypeModelRef, SchemaError> {
        self.graph.model(&self.root)
    }

    fn root_table(&self) -> Result<&TableModel, SchemaError> {
        self.root_model()?
            .as_table()
            .ok_or_else(|| SchemaError::InvalidRoot(self.root.clone()))
    }

    pub fn file_identifier(&self) -> Option<[u8; 4]> {
        self.root_table().ok().and_then(TableModel::file_identifier)
    }

    fn header_size(&self) -> usize {
        match self.file_identifier() {
            Some(_) => UOFFSET_SIZE + FILE_IDENTIFIER_LENGTH,
            None => UOFFSET_SIZE,
        }
    }

    /// Upper bound of the bytes [`write`](Self::write) needs for `value`.
    pub fn max_size(&self, value: &Value) -> SerializeResult<usize> {
        let body = self.root_model()?.max_size(&self.graph, value)?;
        Ok(self.header_size() + body)
    }

    /// Serialize `value` into `span` and return the number of bytes used.
    ///
    /// Fails with [`SerializeError::BufferTooSmall`] when `span` cannot hold
    /// the result; a span of [`max_size`](Self::max_size) bytes always can.
    pub fn write(&self, span: &mut [u8], value: &Value) -> SerializeResult<usize> {
        let model = self.root_model()?;
        let mut context = SerializationContext::new(span.len(), &self.options);
        let header = context.allocate_space(self.header_size(), UOFFSET_SIZE)?;
        if let Some(identifier) = self.file_identifier() {
            span.write_bytes(header + UOFFSET_SIZE, &identifier)?;
        }
        {
            let mut writer = Writer::new(span, &mut context, &self.graph);
            model.serialize(&mut writer, value, header)?;
        }
        let used = context.finish(span)?;
        log::trace!("[Serializer] wrote '{}' ({} bytes)", self.root, used);
        Ok(used)
    }

    /// Serialize into a freshly allocated buffer trimmed to size.
    pub fn serialize(&self, value: &Value) -> SerializeResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.max_size(value)?];
        let used = self.write(&mut buffer, value)?;
        buffer.truncate(used);
        Ok(buffer)
    }

    fn check_file_identifier(&self, buffer: &[u8]) -> ParseResult<()> {
        let Some(expected) = self.file_identifier() else {
            return Ok(());
        };
        if !self.options.verify_file_identifier {
            return Ok(());
        }
        let bytes = buffer.read_bytes(UOFFSET_SIZE, FILE_IDENTIFIER_LENGTH)?;
        let mut found = [0u8; FILE_IDENTIFIER_LENGTH];
        found.copy_from_slice(bytes);
        if found != expected {
            return Err(ParseError::FileIdentifierMismatch { expected, found });
        }
        Ok(())
    }

    pub fn parse(&self, buffer: &[u8]) -> ParseResult<Value> {
        self.check_file_identifier(buffer)?;
        let reader = Reader::new(buffer, &self.graph, &self.options);
        self.root_model()?.parse(&reader, 0, 0)
    }

    /// Deep copy of `value` keeping only what the root type serializes.
    pub fn clone_value(&self, value: &Value) -> SerializeResult<Value> {
        self.root_model()?.clone_value(&self.graph, value)
    }

    /// Overwrite a write-through member of the root table in place.
    ///
    /// `path` is a dotted member path: the first segment names the table
    /// member, later segments descend into struct fields.
    pub fn write_through(&self, buffer: &mut [u8], path: &str, value: &Value) -> crate::Result<()> {
        let table = self.root_table()?;
        let root = (&*buffer).read_uoffset(0)?;
        let segments: Vec<&str> = path.split('.').collect();
        table.write_through(&self.graph, buffer, root, &segments, value)?;
        log::trace!("[Serializer] wrote through '{}.{}'", self.root, path);
        Ok(())
    }

    /// Binary search the sorted vector stored in root member `member` for
    /// the table whose key equals `key`, without parsing the rest.
    pub fn lookup(
        &self,
        buffer: &[u8],
        member: &str,
        key: impl Into<MapKey>,
    ) -> crate::Result<Option<Value>> {
        self.check_file_identifier(buffer)?;
        let table = self.root_table()?;
        let not_sorted = || {
            SchemaError::invalid_member(&self.root, member, "not a sorted vector of tables")
        };
        let declared = table
            .member(member)
            .filter(|m| !m.is_deprecated())
            .ok_or_else(not_sorted)?;
        let element = match declared.item_key() {
            TypeKey::Indexed { value, .. } => (**value).clone(),
            TypeKey::Vector { item, .. } if declared.is_sorted_vector() => (**item).clone(),
            _ => return Err(not_sorted().into()),
        };
        let element = self.graph.model(&element)?;
        let element = element.as_table().ok_or_else(not_sorted)?;
        let spec = element.sort_key_spec(&self.graph)?;

        let reader = Reader::new(buffer, &self.graph, &self.options);
        let root = buffer.read_uoffset(0)?;
        let Some(slot) = buffer.get_absolute_table_field_location(root, declared.index())? else {
            return Ok(None);
        };
        let vector = buffer.read_uoffset(slot)?;
        // Root table, then the vector.
        let depth = reader.enter(reader.enter(0)?)?;
        let found = match crate::sorted::binary_search_by_key(buffer, vector, &spec, &key.into())? {
            Some(position) => Some(element.parse_table(&reader, position, depth)?),
            None => None,
        };
        Ok(found)
    }

    /// Rust source of the serialize, parse, max-size and clone functions
    /// for every type reachable from the root.
    pub fn generate_code(&self) -> Result<GeneratedModule, SchemaError> {
        codegen::generate_module(&self.graph, &self.root)
    }
}
