// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping from host Rust types to type keys.
//!
//! The derive macros implement [`FlatType`] for user types; this module
//! covers primitives, strings, collections and the marker types.

use super::declaration::Declarations;
use super::key::{IndexedKind, ScalarKind, TypeKey, VectorKind};
use crate::error::SchemaError;
use std::collections::{BTreeMap, HashMap};

/// A host type with a FlatBuffers representation.
pub trait FlatType {
    /// True for types serialized inline with no null state (scalars, enums,
    /// value structs). `Option<T>` of such a type becomes `Nullable`.
    const IS_VALUE_TYPE: bool = false;

    /// Vtable slots a table member of this type occupies: two for unions
    /// and vectors of unions, one otherwise.
    const SLOTS: u16 = 1;

    fn type_key() -> TypeKey;

    /// Registers the declarations this type and its members need.
    fn declare(_declarations: &mut Declarations) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Conversion between a fieldless enum and its integer wire value.
///
/// Implemented by `#[derive(FlatEnum)]` and used by generated code.
pub trait FlatEnum: Copy + Sized {
    fn to_i128(self) -> i128;

    /// `None` for values outside the declared set (flags accept any
    /// combination of declared bits).
    fn from_i128(value: i128) -> Option<Self>;
}

macro_rules! impl_flat_scalar {
    ($($type:ty => $kind:ident),* $(,)?) => {
        $(
            impl FlatType for $type {
                const IS_VALUE_TYPE: bool = true;

                fn type_key() -> TypeKey {
                    TypeKey::Scalar(ScalarKind::$kind)
                }
            }
        )*
    };
}

impl_flat_scalar!(
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

impl FlatType for String {
    fn type_key() -> TypeKey {
        TypeKey::String
    }
}

/// String deduplicated at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(pub String);

impl FlatType for SharedString {
    fn type_key() -> TypeKey {
        TypeKey::SharedString
    }
}

/// Contiguous byte block, always written (there is no null memory).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory(pub Vec<u8>);

impl FlatType for Memory {
    fn type_key() -> TypeKey {
        TypeKey::memory()
    }
}

/// Sorted vector of keyed tables exposed as a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector<K, V>(pub BTreeMap<K, V>);

impl<K: FlatType, V: FlatType> FlatType for IndexedVector<K, V> {
    fn type_key() -> TypeKey {
        TypeKey::indexed(IndexedKind::IndexedVector, K::type_key(), V::type_key())
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        K::declare(declarations)?;
        V::declare(declarations)
    }
}

impl<T: FlatType> FlatType for Vec<T> {
    const SLOTS: u16 = T::SLOTS;

    fn type_key() -> TypeKey {
        TypeKey::vector(VectorKind::List, T::type_key())
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        T::declare(declarations)
    }
}

impl<T: FlatType> FlatType for Box<[T]> {
    const SLOTS: u16 = T::SLOTS;

    fn type_key() -> TypeKey {
        TypeKey::vector(VectorKind::Array, T::type_key())
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        T::declare(declarations)
    }
}

impl<T: FlatType> FlatType for Option<T> {
    const SLOTS: u16 = T::SLOTS;

    fn type_key() -> TypeKey {
        if T::IS_VALUE_TYPE {
            TypeKey::nullable(T::type_key())
        } else {
            // Reference types are already optional on the wire.
            T::type_key()
        }
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        T::declare(declarations)
    }
}

impl<T: FlatType> FlatType for Box<T> {
    const IS_VALUE_TYPE: bool = T::IS_VALUE_TYPE;

    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        T::declare(declarations)
    }
}

impl<K: FlatType, V: FlatType> FlatType for BTreeMap<K, V> {
    fn type_key() -> TypeKey {
        TypeKey::indexed(IndexedKind::Dictionary, K::type_key(), V::type_key())
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        K::declare(declarations)?;
        V::declare(declarations)
    }
}

impl<K: FlatType, V: FlatType, S> FlatType for HashMap<K, V, S> {
    fn type_key() -> TypeKey {
        TypeKey::indexed(IndexedKind::Dictionary, K::type_key(), V::type_key())
    }

    fn declare(declarations: &mut Declarations) -> Result<(), SchemaError> {
        K::declare(declarations)?;
        V::declare(declarations)
    }
}

/// Collects the declarations reachable from `T`.
pub fn declarations_for<T: FlatType>() -> Result<Declarations, SchemaError> {
    let mut declarations = Declarations::new();
    T::declare(&mut declarations)?;
    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_of_value_type_is_nullable() {
        assert_eq!(
            <Option<i32>>::type_key(),
            TypeKey::nullable(TypeKey::Scalar(ScalarKind::I32))
        );
        assert_eq!(<Option<String>>::type_key(), TypeKey::String);
    }

    #[test]
    fn test_collections_map_to_vector_kinds() {
        assert_eq!(
            <Vec<u8>>::type_key(),
            TypeKey::list(TypeKey::Scalar(ScalarKind::U8))
        );
        assert_eq!(
            <Box<[f32]>>::type_key(),
            TypeKey::vector(VectorKind::Array, TypeKey::Scalar(ScalarKind::F32))
        );
        assert_eq!(Memory::type_key(), TypeKey::memory());
        assert_eq!(
            <BTreeMap<String, u32>>::type_key(),
            TypeKey::indexed(
                IndexedKind::Dictionary,
                TypeKey::String,
                TypeKey::Scalar(ScalarKind::U32)
            )
        );
    }
}
