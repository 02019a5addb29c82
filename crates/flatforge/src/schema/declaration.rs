// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Normalized type declarations.
//!
//! Declarations are the plain description of a user type (members, indices,
//! defaults, flags) produced by the derive macros or built by hand. Type
//! models are constructed from them; nothing downstream inspects host types.

use super::key::{ScalarKind, TypeKey};
use crate::error::SchemaError;
use crate::layout::PhysicalLayoutElement;
use crate::value::Value;
use std::collections::BTreeMap;

/// One member of a table or struct.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDeclaration {
    pub name: String,
    /// Vtable slot for tables, declaration order for structs.
    pub index: u16,
    pub type_key: TypeKey,
    pub default: Option<Value>,
    pub is_key: bool,
    pub is_sorted_vector: bool,
    pub is_required: bool,
    pub is_deprecated: bool,
    pub force_write: bool,
    pub write_through: bool,
}

impl MemberDeclaration {
    pub fn new(name: impl Into<String>, index: u16, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            index,
            type_key,
            default: None,
            is_key: false,
            is_sorted_vector: false,
            is_required: false,
            is_deprecated: false,
            force_write: false,
            write_through: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn sorted_vector(mut self) -> Self {
        self.is_sorted_vector = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }

    pub fn force_write(mut self) -> Self {
        self.force_write = true;
        self
    }

    pub fn write_through(mut self) -> Self {
        self.write_through = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDeclaration {
    pub name: String,
    /// Written after the root offset when this table is a buffer root.
    pub file_identifier: Option<[u8; 4]>,
    pub members: Vec<MemberDeclaration>,
}

impl TableDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_identifier: None,
            members: Vec::new(),
        }
    }

    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_file_identifier(mut self, identifier: [u8; 4]) -> Self {
        self.file_identifier = Some(identifier);
        self
    }
}

/// How a struct is exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    /// Members are read and written one at a time.
    Reference,
    /// The host type mirrors the wire layout exactly.
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclaration {
    pub name: String,
    pub kind: StructKind,
    pub members: Vec<MemberDeclaration>,
    /// Size and alignment of the host type, checked against the wire layout.
    pub host_layout: Option<PhysicalLayoutElement>,
}

impl StructDeclaration {
    pub fn new(name: impl Into<String>, kind: StructKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            host_layout: None,
        }
    }

    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_host_layout(mut self, size: usize, alignment: usize) -> Self {
        self.host_layout = Some(PhysicalLayoutElement::new(size, alignment));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDeclaration {
    pub name: String,
    pub underlying: ScalarKind,
    pub values: Vec<EnumValue>,
    /// Values combine as flags; any OR of declared values is valid.
    pub bit_flags: bool,
}

impl EnumDeclaration {
    pub fn new(name: impl Into<String>, underlying: ScalarKind) -> Self {
        Self {
            name: name.into(),
            underlying,
            values: Vec::new(),
            bit_flags: false,
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: i128) -> Self {
        self.values.push(EnumValue {
            name: name.into(),
            value,
        });
        self
    }

    pub fn bit_flags(mut self) -> Self {
        self.bit_flags = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDeclaration {
    pub name: String,
    /// Alternatives in discriminator order; the first is discriminator 1.
    pub alternatives: Vec<TypeKey>,
}

impl UnionDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn alternative(mut self, key: TypeKey) -> Self {
        self.alternatives.push(key);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclaration {
    Table(TableDeclaration),
    Struct(StructDeclaration),
    Enum(EnumDeclaration),
    Union(UnionDeclaration),
}

impl TypeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclaration::Table(d) => &d.name,
            TypeDeclaration::Struct(d) => &d.name,
            TypeDeclaration::Enum(d) => &d.name,
            TypeDeclaration::Union(d) => &d.name,
        }
    }

    pub fn type_key(&self) -> TypeKey {
        TypeKey::named(self.name())
    }
}

impl From<TableDeclaration> for TypeDeclaration {
    fn from(value: TableDeclaration) -> Self {
        Self::Table(value)
    }
}

impl From<StructDeclaration> for TypeDeclaration {
    fn from(value: StructDeclaration) -> Self {
        Self::Struct(value)
    }
}

impl From<EnumDeclaration> for TypeDeclaration {
    fn from(value: EnumDeclaration) -> Self {
        Self::Enum(value)
    }
}

impl From<UnionDeclaration> for TypeDeclaration {
    fn from(value: UnionDeclaration) -> Self {
        Self::Union(value)
    }
}

/// Name-indexed registry of declarations.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    by_name: BTreeMap<String, TypeDeclaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declaration. Re-registering an identical one is a no-op.
    pub fn insert(&mut self, declaration: impl Into<TypeDeclaration>) -> Result<(), SchemaError> {
        let declaration = declaration.into();
        match self.by_name.get(declaration.name()) {
            Some(existing) if *existing == declaration => Ok(()),
            Some(_) => Err(SchemaError::DuplicateDeclaration(
                declaration.name().to_owned(),
            )),
            None => {
                self.by_name
                    .insert(declaration.name().to_owned(), declaration);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDeclaration> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.by_name.values()
    }

    /// Merges another registry, failing on the first conflicting name.
    pub fn extend(&mut self, other: Declarations) -> Result<(), SchemaError> {
        for declaration in other.by_name.into_values() {
            self.insert(declaration)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_redeclaration_is_accepted() {
        let mut decls = Declarations::new();
        let table = TableDeclaration::new("Monster")
            .member(MemberDeclaration::new("hp", 0, TypeKey::Scalar(ScalarKind::I16)));
        decls.insert(table.clone()).unwrap();
        decls.insert(table).unwrap();
        assert_eq!(decls.len(), 1);
    }

    #[test]
    fn test_conflicting_redeclaration_is_rejected() {
        let mut decls = Declarations::new();
        decls.insert(TableDeclaration::new("Monster")).unwrap();
        let err = decls
            .insert(StructDeclaration::new("Monster", StructKind::Reference))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateDeclaration("Monster".into()));
    }

    #[test]
    fn test_member_builders_set_flags() {
        let member = MemberDeclaration::new("name", 2, TypeKey::String)
            .key()
            .required();
        assert!(member.is_key);
        assert!(member.is_required);
        assert!(!member.is_sorted_vector);
        assert_eq!(member.default, None);
    }
}
