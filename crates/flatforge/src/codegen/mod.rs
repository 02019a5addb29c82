// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rust source generation.
//!
//! Each model contributes four method bodies ([`GeneratedMethod`]) through
//! its `create_*_method` operations. [`generate_module`] walks the graph
//! from a root table and wraps those bodies into free functions.
//!
//! Generated code targets host structs whose table members are `Option<T>`
//! for reference types (unless `required`), plain values for scalars and
//! enums, and `Option<T>` for nullable value types.

mod context;

pub use context::{
    CloneCodeGenContext, MaxSizeCodeGenContext, ParserCodeGenContext,
    SerializationCodeGenContext,
};

use crate::error::SchemaError;
use crate::graph::ModelGraph;
use crate::schema::{IndexedKind, TypeKey, VectorKind};
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Output of one code generation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMethod {
    /// Function body, without the enclosing braces.
    pub body: String,
    /// Auxiliary items (constants, helper functions) the body depends on,
    /// separated by blank lines.
    pub class_definition: Option<String>,
}

impl GeneratedMethod {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            class_definition: None,
        }
    }

    pub fn with_class_definition(mut self, definition: impl Into<String>) -> Self {
        self.class_definition = Some(definition.into());
        self
    }
}

/// A rendered module for one root type.
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    pub root: TypeKey,
    pub source: String,
    /// Function names in emission order.
    pub methods: Vec<String>,
}

/// Convert `PascalCase_fragments` to `snake_case`.
pub(crate) fn to_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev_lower = false;
    for ch in ident.chars() {
        if ch == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        } else if ch.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

pub(crate) fn method_name(prefix: &str, key: &TypeKey) -> String {
    format!("{}_{}", prefix, to_snake_case(&key.ident_fragment()))
}

/// Host Rust type of `key` in generated code.
pub fn host_type_name(key: &TypeKey) -> String {
    match key {
        TypeKey::Scalar(kind) => kind.name().to_owned(),
        TypeKey::String => "String".to_owned(),
        TypeKey::SharedString => "SharedString".to_owned(),
        TypeKey::Named(name) => name.to_string(),
        TypeKey::Vector { kind, item } => match kind {
            VectorKind::Array => format!("Box<[{}]>", host_type_name(item)),
            VectorKind::List | VectorKind::ReadOnlyList => {
                format!("Vec<{}>", host_type_name(item))
            }
            VectorKind::Memory | VectorKind::ReadOnlyMemory => "Memory".to_owned(),
        },
        TypeKey::Indexed { kind, key, value } => match kind {
            IndexedKind::IndexedVector => format!(
                "IndexedVector<{}, {}>",
                host_type_name(key),
                host_type_name(value)
            ),
            IndexedKind::Dictionary => format!(
                "BTreeMap<{}, {}>",
                host_type_name(key),
                host_type_name(value)
            ),
        },
        TypeKey::Nullable(inner) => format!("Option<{}>", host_type_name(inner)),
    }
}

/// Untyped Rust literal for a default value.
pub(crate) fn rust_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => format!("{:?}", v),
        Value::String(s) => format!("{:?}.to_owned()", s),
        Value::Bytes(b) => format!("vec!{:?}", b),
        other => format!("Default::default() /* {} */", other.kind_name()),
    }
}

pub(crate) fn indent(body: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn emit_function(out: &mut String, signature: &str, method: &GeneratedMethod) {
    let _ = writeln!(out, "{} {{", signature);
    let _ = writeln!(out, "{}", indent(&method.body, 1));
    let _ = writeln!(out, "}}\n");
}

/// Render serialize, parse, max-size and clone functions for every type
/// reachable from `root`.
pub fn generate_module(graph: &ModelGraph, root: &TypeKey) -> Result<GeneratedModule, SchemaError> {
    let mut source = String::new();
    let mut methods = Vec::new();
    let mut definitions = BTreeSet::new();

    source.push_str("// Generated by flatforge. Do not edit.\n");
    source.push_str("#![allow(unused_variables, unused_mut, clippy::all)]\n\n");
    source.push_str("use flatforge::buffer::{InputBuffer, SpanWriter};\n");
    source.push_str("use flatforge::config::SerializerOptions;\n");
    source.push_str("use flatforge::context::SerializationContext;\n");
    source.push_str(
        "use flatforge::error::{ParseError, ParseResult, SerializeError, SerializeResult};\n",
    );
    source.push_str("use flatforge::schema::{FlatEnum, IndexedVector, Memory, SharedString};\n");
    source.push_str("use std::collections::BTreeMap;\n\n");

    for key in graph.reachable(root)? {
        let model = graph.model(&key)?;
        let host = model.host_type();
        let pair = model.physical_layout().len() == 2;

        let serialize = model.create_serialize_method(&SerializationCodeGenContext::new(graph))?;
        let parse = model.create_parse_method(&ParserCodeGenContext::new(graph))?;
        let max_size = model.create_max_size_method(&MaxSizeCodeGenContext::new(graph))?;
        let clone = model.create_clone_method(&CloneCodeGenContext::new(graph))?;

        let serialize_name = SerializationCodeGenContext::method_name(&key);
        let parse_name = ParserCodeGenContext::method_name(&key);
        let max_size_name = MaxSizeCodeGenContext::method_name(&key);
        let clone_name = CloneCodeGenContext::method_name(&key);

        let _ = writeln!(source, "// ---- {} ----\n", key);
        let serialize_signature = if pair {
            format!(
                "pub fn {}(span: &mut [u8], ctx: &mut SerializationContext, value: &{}, offset: usize, value_offset: usize) -> SerializeResult<()>",
                serialize_name, host
            )
        } else {
            format!(
                "pub fn {}(span: &mut [u8], ctx: &mut SerializationContext, value: &{}, offset: usize) -> SerializeResult<()>",
                serialize_name, host
            )
        };
        let parse_signature = if pair {
            format!(
                "pub fn {}(buf: &[u8], offset: Option<usize>, value_offset: Option<usize>, depth: usize, options: &SerializerOptions) -> ParseResult<{}>",
                parse_name, host
            )
        } else {
            format!(
                "pub fn {}(buf: &[u8], offset: usize, depth: usize, options: &SerializerOptions) -> ParseResult<{}>",
                parse_name, host
            )
        };
        emit_function(&mut source, &serialize_signature, &serialize);
        emit_function(&mut source, &parse_signature, &parse);
        emit_function(
            &mut source,
            &format!("pub fn {}(value: &{}) -> usize", max_size_name, host),
            &max_size,
        );
        emit_function(
            &mut source,
            &format!("pub fn {}(item: &{}) -> {}", clone_name, host, host),
            &clone,
        );

        for method in [serialize, parse, max_size, clone] {
            if let Some(definition) = method.class_definition {
                // Items are blank-line separated so shared helpers dedup.
                for item in definition.split("\n\n") {
                    definitions.insert(item.trim().to_owned());
                }
            }
        }
        methods.extend([serialize_name, parse_name, max_size_name, clone_name]);
    }

    for definition in definitions {
        source.push_str(&definition);
        source.push_str("\n\n");
    }

    log::debug!(
        "[codegen] generated {} functions for root '{}'",
        methods.len(),
        root
    );

    Ok(GeneratedModule {
        root: root.clone(),
        source,
        methods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("Monster"), "monster");
        assert_eq!(to_snake_case("List_Monster"), "list_monster");
        assert_eq!(
            to_snake_case("IndexedVector_string_Monster"),
            "indexed_vector_string_monster"
        );
        assert_eq!(to_snake_case("Vec3"), "vec3");
    }

    #[test]
    fn test_method_names_are_unique_per_key() {
        let a = method_name("parse", &TypeKey::list(TypeKey::Scalar(ScalarKind::I32)));
        let b = method_name(
            "parse",
            &TypeKey::vector(VectorKind::Array, TypeKey::Scalar(ScalarKind::I32)),
        );
        assert_eq!(a, "parse_list_i32");
        assert_ne!(a, b);
    }

    #[test]
    fn test_host_type_names() {
        assert_eq!(
            host_type_name(&TypeKey::nullable(TypeKey::Scalar(ScalarKind::U8))),
            "Option<u8>"
        );
        assert_eq!(
            host_type_name(&TypeKey::indexed(
                IndexedKind::Dictionary,
                TypeKey::String,
                TypeKey::named("Weapon")
            )),
            "BTreeMap<String, Weapon>"
        );
        assert_eq!(host_type_name(&TypeKey::memory()), "Memory");
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", 1), "    a\n\n    b");
    }
}
