// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolved members of tables and structs.

use super::TypeModel;
use crate::error::SchemaError;
use crate::schema::{MemberDeclaration, TypeKey};
use crate::value::Value;
use std::ops::Range;

/// A table member bound to its resolved item type.
#[derive(Debug, Clone)]
pub struct TableMemberModel {
    declaration: MemberDeclaration,
    default: Value,
    slot_count: u16,
}

impl TableMemberModel {
    pub(crate) fn new(
        table: &str,
        declaration: MemberDeclaration,
        item: &dyn TypeModel,
    ) -> Result<Self, SchemaError> {
        let slots = item.physical_layout().len();
        if slots == 0 {
            return Err(SchemaError::invalid_member(
                table,
                &declaration.name,
                format!("type '{}' has no layout (recursive struct or facade)", item.type_key()),
            ));
        }
        let default = match &declaration.default {
            Some(value) => item.validate_default_value(value).map_err(|e| {
                SchemaError::invalid_member(table, &declaration.name, e.to_string())
            })?,
            None => item.default_value(),
        };
        Ok(Self {
            declaration,
            default,
            slot_count: slots as u16,
        })
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn index(&self) -> u16 {
        self.declaration.index
    }

    pub fn item_key(&self) -> &TypeKey {
        &self.declaration.type_key
    }

    /// Vtable slots occupied, starting at `index()`.
    pub fn slot_count(&self) -> u16 {
        self.slot_count
    }

    pub fn slots(&self) -> Range<u32> {
        let start = u32::from(self.declaration.index);
        start..start + u32::from(self.slot_count)
    }

    /// Value of the member when absent from the buffer.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn declaration(&self) -> &MemberDeclaration {
        &self.declaration
    }

    pub fn is_key(&self) -> bool {
        self.declaration.is_key
    }

    pub fn is_sorted_vector(&self) -> bool {
        self.declaration.is_sorted_vector
    }

    pub fn is_required(&self) -> bool {
        self.declaration.is_required
    }

    pub fn is_deprecated(&self) -> bool {
        self.declaration.is_deprecated
    }

    pub fn is_write_through(&self) -> bool {
        self.declaration.write_through
    }

    /// Written even when equal to the default.
    pub fn always_written(&self, item: &dyn TypeModel) -> bool {
        self.declaration.force_write
            || self.declaration.write_through
            || self.declaration.is_key
            || item.always_serialize()
    }

    /// Host field is `Option<T>`: absent reference members and absent
    /// structs are representable only that way.
    pub fn is_optional_in_host(&self, item: &dyn TypeModel) -> bool {
        !self.declaration.is_required
            && !item.is_nullable()
            && !item.always_serialize()
            && item.default_value().is_null()
    }
}

/// A struct member with its resolved position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMemberModel {
    pub name: String,
    pub index: u16,
    pub type_key: TypeKey,
    /// Byte offset from the start of the struct.
    pub offset: usize,
    pub size: usize,
}
