// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type models.
//!
//! A [`TypeModel`] is everything the engine knows about one exposed type:
//! its physical layout, where it may appear, how it validates, and the four
//! operations (serialize, parse, max-size, clone), both as generated code
//! and executed directly over [`Value`]s.
//!
//! Lifecycle is strictly linear: construction by a provider, `initialize`
//! (resolves children through the container), `validate` (may be retried
//! while dependencies settle), then any number of codegen or runtime calls.

mod enums;
mod member;
mod scalar;
mod string;
mod structs;
mod table;
mod union;
mod vector;
mod wrapper;

pub use enums::EnumModel;
pub use member::{StructMemberModel, TableMemberModel};
pub use scalar::ScalarModel;
pub use string::{SharedStringModel, StringModel};
pub use structs::StructModel;
pub use table::TableModel;
pub use union::UnionModel;
pub use vector::{IndexedVectorModel, ListVectorModel, UnionVectorModel};
pub use wrapper::{FacadeModel, FnFacade, NullableModel, TypeFacade};

use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::container::Resolver;
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::{self, PhysicalLayoutElement};
use crate::runtime::{Reader, Writer};
use crate::schema::TypeKey;
use crate::sorted::SortKeyKind;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a resolved model. One per type key per container.
pub type TypeModelRef = Arc<dyn TypeModel>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Scalar,
    String,
    Struct,
    Table,
    Vector,
    Union,
}

pub trait TypeModel: Send + Sync + fmt::Debug {
    fn type_key(&self) -> &TypeKey;

    fn schema_kind(&self) -> SchemaKind;

    /// Inline slots. One element for most kinds, two for unions and union
    /// vectors (discriminator, value). Empty until initialized.
    fn physical_layout(&self) -> &[PhysicalLayoutElement];

    /// Instances always occupy the same number of bytes.
    fn is_fixed_size(&self) -> bool;

    /// Written at the use site rather than behind a uoffset.
    fn serializes_inline(&self) -> bool;

    fn max_inline_size(&self) -> usize {
        layout::max_inline_size(self.physical_layout())
    }

    fn alignment(&self) -> usize {
        layout::max_alignment(self.physical_layout())
    }

    fn is_valid_struct_member(&self) -> bool {
        false
    }

    fn is_valid_table_member(&self) -> bool {
        true
    }

    fn is_valid_vector_member(&self) -> bool {
        false
    }

    fn is_valid_union_member(&self) -> bool {
        false
    }

    /// Only types with a total order over their wire form can key a sorted
    /// vector.
    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        None
    }

    fn is_valid_sorted_vector_key(&self) -> bool {
        self.sort_key_kind().is_some()
    }

    /// Absence is a value of this type (`Option` of a value type).
    fn is_nullable(&self) -> bool {
        false
    }

    /// Written in tables even when equal to the default.
    fn always_serialize(&self) -> bool {
        false
    }

    /// Value of an absent table member with no declared default.
    fn default_value(&self) -> Value {
        Value::Null
    }

    /// Check a declared default and return its canonical form.
    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        let _ = value;
        Err(SchemaError::invalid_type(
            self.type_key(),
            "type does not support default values",
        ))
    }

    /// Canonical form of a member value when it differs from the raw input
    /// (an enum constant given by name). Used when comparing to defaults.
    fn canonical_value(&self, value: &Value) -> Option<Value> {
        let _ = value;
        None
    }

    /// Directly referenced types.
    fn children(&self) -> Vec<TypeKey> {
        Vec::new()
    }

    /// Item type when this model is a vector of any flavor.
    fn vector_item(&self) -> Option<&TypeKey> {
        None
    }

    /// Rust type used in generated code.
    fn host_type(&self) -> String {
        crate::codegen::host_type_name(self.type_key())
    }

    /// Rust expression for a (canonical) value of this type.
    fn literal(&self, value: &Value) -> String {
        crate::codegen::rust_literal(value)
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        let _ = resolver;
        Ok(())
    }

    fn validate(&self, graph: &ModelGraph) -> Result<(), SchemaError> {
        let _ = graph;
        Ok(())
    }

    fn as_table(&self) -> Option<&TableModel> {
        None
    }

    fn as_struct(&self) -> Option<&StructModel> {
        None
    }

    fn as_union(&self) -> Option<&UnionModel> {
        None
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError>;

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError>;

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError>;

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError>;

    /// Write `value`. Inline types write at `offset`; reference types
    /// allocate their body and store a uoffset at `offset`.
    fn serialize(&self, writer: &mut Writer<'_>, value: &Value, offset: usize)
        -> SerializeResult<()>;

    /// Read the value written at `offset` (same convention as `serialize`).
    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value>;

    /// Two-slot write for unions and union vectors.
    fn serialize_pair(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        first: usize,
        second: usize,
    ) -> SerializeResult<()> {
        let _ = (writer, value, first, second);
        Err(SchemaError::invalid_type(self.type_key(), "type occupies a single slot").into())
    }

    /// Two-slot read; either slot may be absent from the vtable.
    fn parse_pair(
        &self,
        reader: &Reader<'_>,
        first: Option<usize>,
        second: Option<usize>,
        depth: usize,
    ) -> ParseResult<Value> {
        let _ = (reader, first, second, depth);
        Err(SchemaError::invalid_type(self.type_key(), "type occupies a single slot").into())
    }

    /// Upper bound of the bytes `serialize` consumes for `value`: inline
    /// types report their padded inline size, reference types report their
    /// out-of-line body.
    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize>;

    /// Deep copy that keeps only what this type would serialize.
    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value>;
}

pub(crate) fn type_mismatch(key: &TypeKey, value: &Value) -> SerializeError {
    SerializeError::TypeMismatch {
        expected: key.to_string(),
        found: value.kind_name(),
    }
}

/// Best-effort name of the exposed type for error messages.
pub(crate) fn type_name(model: &dyn TypeModel) -> String {
    model.type_key().to_string()
}
