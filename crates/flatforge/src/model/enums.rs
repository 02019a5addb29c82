// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::scalar::{read_scalar, write_scalar, zero_value};
use super::{type_mismatch, SchemaKind, TypeModel};
use crate::codegen::{
    CloneCodeGenContext, GeneratedMethod, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};
use crate::error::{ParseResult, SchemaError, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::layout::PhysicalLayoutElement;
use crate::runtime::{Reader, Writer};
use crate::schema::{EnumDeclaration, TypeKey};
use crate::sorted::SortKeyKind;
use crate::value::Value;
use std::collections::HashSet;

/// Named integer constants over an integer scalar.
#[derive(Debug)]
pub struct EnumModel {
    key: TypeKey,
    declaration: EnumDeclaration,
    layout: [PhysicalLayoutElement; 1],
}

impl EnumModel {
    pub fn new(declaration: EnumDeclaration) -> Self {
        let size = declaration.underlying.size();
        Self {
            key: TypeKey::named(&declaration.name),
            layout: [PhysicalLayoutElement::new(size, size)],
            declaration,
        }
    }

    pub fn declaration(&self) -> &EnumDeclaration {
        &self.declaration
    }

    fn flag_mask(&self) -> i128 {
        self.declaration.values.iter().fold(0, |mask, v| mask | v.value)
    }

    /// Declared value, or any OR of declared values for flag enums.
    pub fn is_defined(&self, value: i128) -> bool {
        if self.declaration.bit_flags {
            value >= 0 && value & !self.flag_mask() == 0
        } else {
            self.declaration.values.iter().any(|v| v.value == value)
        }
    }

    /// Integer form of `value`, which may also name a declared constant.
    fn resolve(&self, value: &Value) -> Option<i128> {
        match value {
            Value::String(name) => self
                .declaration
                .values
                .iter()
                .find(|v| v.name == *name)
                .map(|v| v.value),
            other => other.as_i128(),
        }
    }

    fn canonical(&self, raw: i128) -> Value {
        if self.declaration.underlying.is_signed() {
            Value::Int(raw as i64)
        } else {
            Value::UInt(raw as u64)
        }
    }

    fn checked(&self, value: &Value) -> SerializeResult<Value> {
        if value.is_null() {
            return Err(SerializeError::NullValue {
                type_name: self.declaration.name.clone(),
            });
        }
        let raw = self.resolve(value).ok_or_else(|| type_mismatch(&self.key, value))?;
        if !self.is_defined(raw) {
            return Err(SerializeError::OutOfRange {
                type_name: self.declaration.name.clone(),
                value: raw.to_string(),
            });
        }
        Ok(self.canonical(raw))
    }
}

impl TypeModel for EnumModel {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn schema_kind(&self) -> SchemaKind {
        SchemaKind::Scalar
    }

    fn physical_layout(&self) -> &[PhysicalLayoutElement] {
        &self.layout
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

    fn sort_key_kind(&self) -> Option<SortKeyKind> {
        SortKeyKind::from_scalar(self.declaration.underlying)
    }

    fn default_value(&self) -> Value {
        zero_value(self.declaration.underlying)
    }

    fn validate_default_value(&self, value: &Value) -> Result<Value, SchemaError> {
        match self.resolve(value) {
            Some(raw) if self.is_defined(raw) || raw == 0 => Ok(self.canonical(raw)),
            _ => Err(SchemaError::invalid_type(
                &self.key,
                format!("default {:?} is not a declared value", value),
            )),
        }
    }

    fn canonical_value(&self, value: &Value) -> Option<Value> {
        self.resolve(value).map(|raw| self.canonical(raw))
    }

    fn literal(&self, value: &Value) -> String {
        let raw = self.resolve(value).unwrap_or(0);
        match self.declaration.values.iter().find(|v| v.value == raw) {
            Some(named) => format!("{}::{}", self.declaration.name, named.name),
            None => format!(
                "<{} as FlatEnum>::from_i128({}).ok_or(SerializeError::OutOfRange {{ type_name: \"{}\".into(), value: \"{}\".into() }})?",
                self.declaration.name, raw, self.declaration.name, raw
            ),
        }
    }

    fn validate(&self, _graph: &ModelGraph) -> Result<(), SchemaError> {
        let underlying = self.declaration.underlying;
        let Some((min, max)) = underlying.integer_range() else {
            return Err(SchemaError::invalid_type(
                &self.key,
                format!("underlying type {} is not an integer", underlying),
            ));
        };
        if self.declaration.values.is_empty() {
            return Err(SchemaError::invalid_type(&self.key, "enum declares no values"));
        }
        let mut names = HashSet::new();
        let mut values = HashSet::new();
        for value in &self.declaration.values {
            if !names.insert(value.name.as_str()) {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    &value.name,
                    "duplicate value name",
                ));
            }
            if !values.insert(value.value) {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    &value.name,
                    format!("value {} is declared twice", value.value),
                ));
            }
            if !(min..=max).contains(&value.value) {
                return Err(SchemaError::invalid_member(
                    &self.key,
                    &value.name,
                    format!("value {} does not fit in {}", value.value, underlying),
                ));
            }
        }
        Ok(())
    }

    fn create_serialize_method(
        &self,
        ctx: &SerializationCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let underlying = self.declaration.underlying.name();
        Ok(GeneratedMethod::new(format!(
            "{}.write_{}({}, FlatEnum::to_i128(*{}) as {})",
            ctx.span_variable_name,
            underlying,
            ctx.offset_variable_name,
            ctx.value_variable_name,
            underlying
        )))
    }

    fn create_parse_method(
        &self,
        ctx: &ParserCodeGenContext<'_>,
    ) -> Result<GeneratedMethod, SchemaError> {
        let name = &self.declaration.name;
        Ok(GeneratedMethod::new(format!(
            "let raw = i128::from({}.read_{}({})?);\n\
             <{} as FlatEnum>::from_i128(raw).ok_or(ParseError::UnknownEnumValue {{\n    \
             type_name: \"{}\".into(),\n    value: raw,\n}})",
            ctx.input_buffer_variable_name,
            self.declaration.underlying.name(),
            ctx.offset_variable_name,
            name,
            name
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
        Ok(GeneratedMethod::new(format!("*{}", ctx.item_variable_name)))
    }

    fn serialize(
        &self,
        writer: &mut Writer<'_>,
        value: &Value,
        offset: usize,
    ) -> SerializeResult<()> {
        let value = self.checked(value)?;
        write_scalar(writer.span, self.declaration.underlying, offset, &value)
    }

    fn parse(&self, reader: &Reader<'_>, offset: usize, _depth: usize) -> ParseResult<Value> {
        // Unknown values are passed through; the schema may be newer than
        // the reader.
        read_scalar(reader.buffer, self.declaration.underlying, offset)
    }

    fn max_size(&self, _graph: &ModelGraph, _value: &Value) -> SerializeResult<usize> {
        Ok(self.max_inline_size())
    }

    fn clone_value(&self, _graph: &ModelGraph, value: &Value) -> SerializeResult<Value> {
        self.checked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    fn color() -> EnumModel {
        EnumModel::new(
            EnumDeclaration::new("Color", ScalarKind::U8)
                .value("Red", 0)
                .value("Green", 1)
                .value("Blue", 2),
        )
    }

    #[test]
    fn test_validate_rejects_bad_declarations() {
        let graph = ModelGraph::new();
        assert!(color().validate(&graph).is_ok());

        let float = EnumModel::new(EnumDeclaration::new("F", ScalarKind::F32).value("A", 0));
        assert!(float.validate(&graph).is_err());

        let dup = EnumModel::new(
            EnumDeclaration::new("D", ScalarKind::I8)
                .value("A", 1)
                .value("B", 1),
        );
        assert!(matches!(
            dup.validate(&graph),
            Err(SchemaError::InvalidMember { .. })
        ));

        let wide = EnumModel::new(EnumDeclaration::new("W", ScalarKind::U8).value("A", 256));
        assert!(wide.validate(&graph).is_err());
    }

    #[test]
    fn test_flags_accept_combinations() {
        let flags = EnumModel::new(
            EnumDeclaration::new("Perm", ScalarKind::U8)
                .value("Read", 1)
                .value("Write", 2)
                .value("Exec", 4)
                .bit_flags(),
        );
        assert!(flags.is_defined(0));
        assert!(flags.is_defined(3));
        assert!(flags.is_defined(7));
        assert!(!flags.is_defined(8));
        assert!(!color().is_defined(3));
    }

    #[test]
    fn test_defaults_accept_names() {
        let model = color();
        assert_eq!(
            model.validate_default_value(&Value::from("Blue")).unwrap(),
            Value::UInt(2)
        );
        assert!(model.validate_default_value(&Value::from("Pink")).is_err());
        assert_eq!(model.literal(&Value::UInt(1)), "Color::Green");
        assert_eq!(model.default_value(), Value::UInt(0));
    }

    #[test]
    fn test_sort_key_follows_underlying() {
        assert_eq!(
            color().sort_key_kind(),
            Some(SortKeyKind::Unsigned(ScalarKind::U8))
        );
    }
}
