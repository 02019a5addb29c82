// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decorator models.
//!
//! [`NullableModel`] exposes `Option<T>` over an inline value type.
//! [`FacadeModel`] exposes a user type stored on the wire as another type,
//! converting through a [`TypeFacade`]. Both delegate every structural
//! property to the wrapped model.

use super::{SchemaKind, TypeModel, TypeModelRef};
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::container::Resolver;
use crate::error::{ParseError, ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::runtime::{Reader, Writer};
use crate::schema::TypeKey;
use crate::sorted::SortKeyKind;
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// `Option<T>` of a fixed-size inline value type.
#[derive(Debug)]
pub struct NullableModel {
    key: TypeKey,
    inner_key: TypeKey,
    inner: OnceLock<TypeModelRef>,
}

impl NullableModel {
    pub fn new(inner: TypeKey) -> Self {
        Self {
            key: TypeKey::nullable(inner.clone()),
            inner_key: inner,
            inner: OnceLock::new(),
        }
    }

    pub fn inner_key(&self) -> &TypeKey {
        &self.inner_key
    }

    fn inner(&self) -> Result<&TypeModelRef, SchemaError> {
        self.inner
            .get()
            .ok_or_else(|| SchemaError::MissingModel(self.inner_key.clone()))
    }
}

impl TypeModel for NullableModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        self.inner
            .get()
            .map_or(SchemaKind::Scalar, |m| m.schema_kind())
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        self.inner.get().map_or(&[], |m| m.physical_layout())
    }

    fn is_fixed_size(&self) -> bool {
        true
    }

    fn serializes_inline(&self) -> bool {
        true
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.inner()?.validate_default_value(value)
    }

    fn canonical_value(&self, value: &Value) -> Option<Value> {
        self.inner().ok()?.canonical_value(value)
    }

    fn children(&self) -> Vec<TypeKey> {
        vec![self.inner_key.clone()]
    }

    fn literal(&self, value: &Value) -> String {
        match (value, self.inner.get()) {
            (Value::Null, _) | (_, None) => "None".to_owned(),
            (value, Some(inner)) => format!("Some({})", inner.literal(value)),
        }
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        let inner = resolver.resolve(&self.inner_key)?;
        let _ = self.inner.set(inner);
        Ok(())
    }

    fn validate(&self, _graph: &ModelGraph) -> Result<(), SchemaError> {
        let inner = self.inner()?;
        let value_type = matches!(inner.schema_kind(), SchemaKind::Scalar | SchemaKind::Struct);
        if !value_type || !inner.serializes_inline() || !inner.is_fixed_size() {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("'{}' is not an inline value type", self.inner_key),
            ));
        }
        if inner.is_nullable() {
            return Err(SchemaError::invalid_type(&self.key, "nested nullable"));
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "if let Some(v) = {} {{\n    {};\n}}\nOk(())",
            ctx.value_variable_name,
            ctx.invoke(&self.inner_key, "v", &ctx.offset_variable_name)
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "Ok(Some({}))",
            ctx.invoke(
                &self.inner_key,
                &ctx.offset_variable_name,
                &ctx.depth_variable_name
            )
        )))
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
        Ok(GeneratedMethod::new(format!(
            "{}.as_ref().map({})",
            ctx.item_variable_name,
            CloneCodeGenContext::method_name(&self.inner_key)
        )))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        if value.is_null() {
            return Ok(());
        }
        self.inner()?.serialize(writer, value, offset)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        self.inner()?.parse(reader, offset, depth)
    }

    fn max_size(&self, _graph: &ModelGraph, _value: &Value) -> SerializeResult<usize> {
        Ok(self.max_inline_size())
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.inner()?.clone_value(graph, value)
    }
}

/// Bidirectional conversion between a user type and its wire type.
///
/// Values handed to `to_underlying` are in the facade domain; the result
/// must be a valid value of `underlying_type`. Generated code converts with
/// `From`/`Into` between the two host types instead.
pub trait TypeFacade: Send + Sync + fmt::Debug {
    /// Exposed type identity, usually `TypeKey::Named`.
    fn type_key(&self) -> TypeKey;

    /// Wire type the facade is stored as.
    fn underlying_type(&self) -> TypeKey;

    /// Rust type used for the facade in generated code.
    fn host_type(&self) -> String {
        crate::codegen::host_type_name(&self.type_key())
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, String>;

    fn from_underlying(&self, value: Value) -> Result<Value, String>;
}

type Conversion = Box<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// [`TypeFacade`] built from two closures.
pub struct FnFacade {
    key: TypeKey,
    underlying: TypeKey,
    to_underlying: Conversion,
    from_underlying: Conversion,
}

impl FnFacade {
    pub fn new<T, F>(key: TypeKey, underlying: TypeKey, to_underlying: T, from_underlying: F) -> Self
    where
        T: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            key,
            underlying,
            to_underlying: Box::new(to_underlying),
            from_underlying: Box::new(from_underlying),
        }
    }
}

impl fmt::Debug for FnFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFacade")
            .field("key", &self.key)
            .field("underlying", &self.underlying)
            .finish_non_exhaustive()
    }
}

impl TypeFacade for FnFacade {
    fn type_key(&self) -> TypeKey {
        self.key.clone()
    }

    fn underlying_type(&self) -> TypeKey {
        self.underlying.clone()
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, String> {
        (self.to_underlying)(value)
    }

    fn from_underlying(&self, value: Value) -> Result<Value, String> {
        (self.from_underlying)(&value)
    }
}

/// Model of a facade: the underlying layout under another name.
#[derive(Debug)]
pub struct FacadeModel {
    key: TypeKey,
    underlying_key: TypeKey,
    facade: Arc<dyn TypeFacade>,
    underlying: OnceLock<TypeModelRef>,
}

impl FacadeModel {
    pub fn new(facade: Arc<dyn TypeFacade>) -> Self {
        Self {
            key: facade.type_key(),
            underlying_key: facade.underlying_type(),
            facade,
            underlying: OnceLock::new(),
        }
    }

    pub fn underlying_key(&self) -> &TypeKey {
        &self.underlying_key
    }

    fn underlying(&self) -> Result<&TypeModelRef, SchemaError> {
        self.underlying
            .get()
            .ok_or_else(|| SchemaError::MissingModel(self.underlying_key.clone()))
    }

    fn to_wire(&self, value: &Value) -> SerializeResult<Value> {
        self.facade
            .to_underlying(value)
            .map_err(|reason| SerializeError::Facade {
                type_name: self.key.to_string(),
                reason,
            })
    }

    fn from_wire(&self, value: Value) -> ParseResult<Value> {
        self.facade
            .from_underlying(value)
            .map_err(|reason| ParseError::Facade {
                type_name: self.key.to_string(),
                reason,
            })
    }

    fn underlying_host(&self, graph: &ModelGraph) -> Result<String, SchemaError> {
        Ok(graph.model(&self.underlying_key)?.host_type())
    }
}

impl TypeModel for FacadeModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        self.underlying
            .get()
            .map_or(SchemaKind::Scalar, |m| m.schema_kind())
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        self.underlying.get().map_or(&[], |m| m.physical_layout())
    }

    fn is_fixed_size(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.is_fixed_size())
    }

    fn serializes_inline(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.serializes_inline())
    }

    fn is_valid_struct_member(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.is_valid_struct_member())
    }

    fn is_valid_table_member(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.is_valid_table_member())
    }

    fn is_valid_vector_member(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.is_valid_vector_member())
    }

    // Host ordering of the facade may differ from the wire ordering.
    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        None
    }

    fn is_nullable(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.is_nullable())
    }

    fn always_serialize(&self) -> bool {
        self.underlying.get().is_some_and(|m| m.always_serialize())
    }

    fn default_value(&self) -> Value {
        let Some(underlying) = self.underlying.get() else {
            return Value::Null;
        };
        let wire = underlying.default_value();
        if wire.is_null() {
            return Value::Null;
        }
        self.facade.from_underlying(wire).unwrap_or(Value::Null)
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        let invalid = |reason: String| SchemaError::invalid_type(&self.key, reason);
        let wire = self.facade.to_underlying(value).map_err(invalid)?;
        let wire = self.underlying()?.validate_default_value(&wire)?;
        self.facade.from_underlying(wire).map_err(invalid)
    }

    fn children(&self) -> Vec<TypeKey> {
        vec![self.underlying_key.clone()]
    }

    fn vector_item(&self) -> Option<&TypeKey> {
        self.underlying.get().and_then(|m| m.vector_item())
    }

    fn host_type(&self) -> String {
        self.facade.host_type()
    }

    fn literal(&self, value: &Value) -> String {
        match (self.facade.to_underlying(value), self.underlying.get()) {
            (Ok(wire), Some(underlying)) => {
                format!("{}::from({})", self.host_type(), underlying.literal(&wire))
            }
            _ => "Default::default()".to_owned(),
        }
    }

    fn initialize(&self, resolver: &mut Resolver<'_>) -> Result<(), SchemaError> {
        if self.underlying_key == self.key {
            return Err(SchemaError::invalid_type(
                &self.key,
                "facade cannot wrap its own type",
            ));
        }
        let underlying = resolver.resolve(&self.underlying_key)?;
        let _ = self.underlying.set(underlying);
        Ok(())
    }

    fn validate(&self, _graph: &ModelGraph) -> Result<(), SchemaError> {
        let underlying = self.underlying()?;
        if underlying.physical_layout().len() != 1 {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("facade over two-slot type '{}'", self.underlying_key),
            ));
        }
        if underlying.as_table().is_some() {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("facade over table '{}'", self.underlying_key),
            ));
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "let wire: {} = {}.clone().into();\n{};\nOk(())",
            self.underlying_host(ctx.graph)?,
            ctx.value_variable_name,
            ctx.invoke(&self.underlying_key, "&wire", &ctx.offset_variable_name)
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "Ok({}::from({}))",
            self.host_type(),
            ctx.invoke(
                &self.underlying_key,
                &ctx.offset_variable_name,
                &ctx.depth_variable_name
            )
        )))
    }

    fn create_max_size_method(
        &self,
        ctx: &MaxSizeCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!(
            "let wire: {} = {}.clone().into();\n{}",
            self.underlying_host(ctx.graph)?,
            ctx.value_variable_name,
            ctx.invoke(&self.underlying_key, "&wire")
        )))
    }

    fn create_clone_method(
        &self,
        ctx: &CloneCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        Ok(GeneratedMethod::new(format!("{}.clone()", ctx.item_variable_name)))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let wire = self.to_wire(value)?;
        self.underlying()?.serialize(writer, &wire, offset)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, depth: usize) -> ParseResult<Value> {
        let wire = self.underlying()?.parse(reader, offset, depth)?;
        self.from_wire(wire)
    }

    fn max_size(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<usize> {
        let wire = self.to_wire(value)?;
        self.underlying()?.max_size(graph, &wire)
    }

    fn clone_value(&self, graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        let wire = self.to_wire(value)?;
        let wire = self.underlying()?.clone_value(graph, &wire)?;
        self.facade
            .from_underlying(wire)
            .map_err(|reason| SerializeError::Facade {
                type_name: self.key.to_string(),
                reason,
            })
    }
}
