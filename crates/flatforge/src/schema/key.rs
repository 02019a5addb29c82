// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type identities.
//!
//! A [`TypeKey`] names an exposed type. The container caches exactly one
//! model per key, so keys double as the arena index through which models
//! reference their children.

use std::fmt;
use std::sync::Arc;

/// Fixed-width primitive kinds (FlatBuffers scalar types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    /// Wire size in bytes (also the alignment).
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Inclusive value range for integer kinds.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            Self::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::U8 => Some((0, u8::MAX as i128)),
            Self::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::U16 => Some((0, u16::MAX as i128)),
            Self::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::U32 => Some((0, u32::MAX as i128)),
            Self::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::U64 => Some((0, u64::MAX as i128)),
            Self::Bool | Self::F32 | Self::F64 => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-side flavor of a plain vector. All flavors share one wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VectorKind {
    Array,
    List,
    ReadOnlyList,
    /// Contiguous byte block; items must be `u8`.
    Memory,
    ReadOnlyMemory,
}

impl VectorKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Array => "Array",
            Self::List => "List",
            Self::ReadOnlyList => "ReadOnlyList",
            Self::Memory => "Memory",
            Self::ReadOnlyMemory => "ReadOnlyMemory",
        }
    }

    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Memory | Self::ReadOnlyMemory)
    }
}

/// Host-side flavor of a sorted vector of keyed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexedKind {
    /// Honors the configured deserialization mode.
    IndexedVector,
    /// Always materialized into a map on parse.
    Dictionary,
}

impl IndexedKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::IndexedVector => "IndexedVector",
            Self::Dictionary => "Dictionary",
        }
    }
}

/// Identity of an exposed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    Scalar(ScalarKind),
    String,
    /// A string deduplicated at write time; identical on the wire.
    SharedString,
    /// A declared table, struct, enum or union, or a user facade.
    Named(Arc<str>),
    Vector {
        kind: VectorKind,
        item: Box<TypeKey>,
    },
    Indexed {
        kind: IndexedKind,
        key: Box<TypeKey>,
        value: Box<TypeKey>,
    },
    /// A value type whose absence is meaningful.
    Nullable(Box<TypeKey>),
}

impl TypeKey {
    pub fn named(name: &str) -> Self {
        Self::Named(Arc::from(name))
    }

    pub fn vector(kind: VectorKind, item: TypeKey) -> Self {
        Self::Vector {
            kind,
            item: Box::new(item),
        }
    }

    pub fn list(item: TypeKey) -> Self {
        Self::vector(VectorKind::List, item)
    }

    pub fn memory() -> Self {
        Self::vector(VectorKind::Memory, Self::Scalar(ScalarKind::U8))
    }

    pub fn indexed(kind: IndexedKind, key: TypeKey, value: TypeKey) -> Self {
        Self::Indexed {
            kind,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn nullable(inner: TypeKey) -> Self {
        Self::Nullable(Box::new(inner))
    }

    /// Same key with every `String` replaced by `SharedString`, including
    /// vector items and map values.
    pub fn with_shared_strings(self) -> Self {
        match self {
            Self::String => Self::SharedString,
            Self::Vector { kind, item } => Self::vector(kind, item.with_shared_strings()),
            Self::Indexed { kind, key, value } => Self::Indexed {
                kind,
                key,
                value: Box::new(value.with_shared_strings()),
            },
            other => other,
        }
    }

    /// Declared name, if this is a named type.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Identifier-safe fragment used for generated method names.
    pub fn ident_fragment(&self) -> String {
        let mut out = String::new();
        let mut last_underscore = false;
        for ch in self.to_string().chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch);
                last_underscore = false;
            } else if !last_underscore && !out.is_empty() {
                out.push('_');
                last_underscore = true;
            }
        }
        while out.ends_with('_') {
            out.pop();
        }
        out
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Scalar(kind) => write!(f, "{}", kind),
            TypeKey::String => f.write_str("string"),
            TypeKey::SharedString => f.write_str("shared_string"),
            TypeKey::Named(name) => f.write_str(name),
            TypeKey::Vector { kind, item } => write!(f, "{}<{}>", kind.name(), item),
            TypeKey::Indexed { kind, key, value } => {
                write!(f, "{}<{}, {}>", kind.name(), key, value)
            }
            TypeKey::Nullable(inner) => write!(f, "Option<{}>", inner),
        }
    }
}
