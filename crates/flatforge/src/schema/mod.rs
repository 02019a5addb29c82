// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema declarations: type keys, normalized declarations and the
//! host-type mapping used by the derive macros.

mod declaration;
mod flat_type;
mod key;

pub use declaration::{
    Declarations, EnumDeclaration, EnumValue, MemberDeclaration, StructDeclaration, StructKind,
    TableDeclaration, TypeDeclaration, UnionDeclaration,
};
pub use flat_type::{declarations_for, FlatEnum, FlatType, IndexedVector, Memory, SharedString};
pub use key::{IndexedKind, ScalarKind, TypeKey, VectorKind};
