// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Variable names and call helpers handed to the per-model code generators.

use super::method_name;
use crate::graph::ModelGraph;
use crate::schema::TypeKey;

/// Context for `serialize_*` methods.
#[derive(Clone)]
pub struct SerializationCodeGenContext<'a> {
    pub span_variable_name: String,
    pub serialization_context_variable_name: String,
    pub value_variable_name: String,
    pub offset_variable_name: String,
    /// Second slot of two-slot types.
    pub value_offset_variable_name: String,
    pub graph: &'a ModelGraph,
}

impl<'a> SerializationCodeGenContext<'a> {
    pub fn new(graph: &'a ModelGraph) -> Self {
        Self {
            span_variable_name: "span".into(),
            serialization_context_variable_name: "ctx".into(),
            value_variable_name: "value".into(),
            offset_variable_name: "offset".into(),
            value_offset_variable_name: "value_offset".into(),
            graph,
        }
    }

    pub fn method_name(key: &TypeKey) -> String {
        method_name("serialize", key)
    }

    /// Call expression serializing `value` of type `key` at `offset`.
    pub fn invoke(&self, key: &TypeKey, value: &str, offset: &str) -> String {
        format!(
            "{}({}, {}, {}, {})?",
            Self::method_name(key),
            self.span_variable_name,
            self.serialization_context_variable_name,
            value,
            offset
        )
    }

    pub fn invoke_pair(&self, key: &TypeKey, value: &str, first: &str, second: &str) -> String {
        format!(
            "{}({}, {}, {}, {}, {})?",
            Self::method_name(key),
            self.span_variable_name,
            self.serialization_context_variable_name,
            value,
            first,
            second
        )
    }
}

/// Context for `parse_*` methods.
#[derive(Clone)]
pub struct ParserCodeGenContext<'a> {
    pub input_buffer_variable_name: String,
    pub offset_variable_name: String,
    pub value_offset_variable_name: String,
    pub depth_variable_name: String,
    pub options_variable_name: String,
    pub graph: &'a ModelGraph,
}

impl<'a> ParserCodeGenContext<'a> {
    pub fn new(graph: &'a ModelGraph) -> Self {
        Self {
            input_buffer_variable_name: "buf".into(),
            offset_variable_name: "offset".into(),
            value_offset_variable_name: "value_offset".into(),
            depth_variable_name: "depth".into(),
            options_variable_name: "options".into(),
            graph,
        }
    }

    pub fn method_name(key: &TypeKey) -> String {
        method_name("parse", key)
    }

    pub fn invoke(&self, key: &TypeKey, offset: &str, depth: &str) -> String {
        format!(
            "{}({}, {}, {}, {})?",
            Self::method_name(key),
            self.input_buffer_variable_name,
            offset,
            depth,
            self.options_variable_name
        )
    }

    pub fn invoke_pair(&self, key: &TypeKey, first: &str, second: &str, depth: &str) -> String {
        format!(
            "{}({}, {}, {}, {}, {})?",
            Self::method_name(key),
            self.input_buffer_variable_name,
            first,
            second,
            depth,
            self.options_variable_name
        )
    }
}

/// Context for `max_size_*` methods.
#[derive(Clone)]
pub struct MaxSizeCodeGenContext<'a> {
    pub value_variable_name: String,
    pub graph: &'a ModelGraph,
}

impl<'a> MaxSizeCodeGenContext<'a> {
    pub fn new(graph: &'a ModelGraph) -> Self {
        Self {
            value_variable_name: "value".into(),
            graph,
        }
    }

    pub fn method_name(key: &TypeKey) -> String {
        method_name("max_size", key)
    }

    pub fn invoke(&self, key: &TypeKey, value: &str) -> String {
        format!("{}({})", Self::method_name(key), value)
    }
}

/// Context for `clone_*` methods.
#[derive(Clone)]
pub struct CloneCodeGenContext<'a> {
    pub item_variable_name: String,
    pub graph: &'a ModelGraph,
}

impl<'a> CloneCodeGenContext<'a> {
    pub fn new(graph: &'a ModelGraph) -> Self {
        Self {
            item_variable_name: "item".into(),
            graph,
        }
    }

    pub fn method_name(key: &TypeKey) -> String {
        method_name("clone", key)
    }

    pub fn invoke(&self, key: &TypeKey, item: &str) -> String {
        format!("{}({})", Self::method_name(key), item)
    }
}
