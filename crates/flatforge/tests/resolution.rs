// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container resolution: identity, cycles, validation and rollback.

#![allow(clippy::missing_panics_doc)]

use flatforge::provider::TypeModelProvider;
use flatforge::schema::{
    Declarations, EnumDeclaration, IndexedKind, MemberDeclaration, ScalarKind,
    StructDeclaration, StructKind, TableDeclaration, TypeDeclaration, UnionDeclaration,
};
use flatforge::{
    SchemaError, SchemaKind, SerializerOptions, TypeKey, TypeModelContainer, TypeModelRef,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn declarations(items: Vec<TypeDeclaration>) -> Declarations {
    let mut declarations = Declarations::new();
    for item in items {
        declarations.insert(item).unwrap();
    }
    declarations
}

fn monster_schema() -> Declarations {
    declarations(vec![
        TableDeclaration::new("Monster")
            .member(
                MemberDeclaration::new("hp", 0, TypeKey::Scalar(ScalarKind::I16)).with_default(100),
            )
            .member(MemberDeclaration::new("name", 1, TypeKey::String))
            .member(MemberDeclaration::new(
                "weapons",
                2,
                TypeKey::list(TypeKey::named("Weapon")),
            ))
            .into(),
        TableDeclaration::new("Weapon")
            .member(MemberDeclaration::new("name", 0, TypeKey::String))
            .member(MemberDeclaration::new(
                "damage",
                1,
                TypeKey::Scalar(ScalarKind::I16),
            ))
            .into(),
    ])
}

#[test]
fn test_same_key_yields_same_model() {
    let container = TypeModelContainer::with_declarations(monster_schema());
    let first = container.resolve(&TypeKey::named("Monster")).unwrap();
    let second = container.resolve(&TypeKey::named("Monster")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // Children resolved through the table are the cached instances too.
    let weapon = container.resolve(&TypeKey::named("Weapon")).unwrap();
    let again = container.try_resolve(&TypeKey::named("Weapon")).unwrap();
    assert!(Arc::ptr_eq(&weapon, &again));
}

#[test]
fn test_resolution_caches_the_whole_closure() {
    let container = TypeModelContainer::with_declarations(monster_schema());
    container.resolve(&TypeKey::named("Monster")).unwrap();
    for key in [
        TypeKey::named("Monster"),
        TypeKey::named("Weapon"),
        TypeKey::list(TypeKey::named("Weapon")),
        TypeKey::String,
        TypeKey::Scalar(ScalarKind::I16),
    ] {
        assert!(container.contains(&key), "missing {}", key);
    }
    assert_eq!(container.len(), 5);
}

#[test]
fn test_schema_kinds() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        EnumDeclaration::new("Color", ScalarKind::U8)
            .value("Red", 0)
            .value("Green", 1)
            .into(),
        StructDeclaration::new("Vec2", StructKind::Reference)
            .member(MemberDeclaration::new("x", 0, TypeKey::Scalar(ScalarKind::F32)))
            .member(MemberDeclaration::new("y", 1, TypeKey::Scalar(ScalarKind::F32)))
            .into(),
        TableDeclaration::new("Point").into(),
        UnionDeclaration::new("Shape")
            .alternative(TypeKey::named("Point"))
            .into(),
    ]));
    let kind = |key: TypeKey| container.resolve(&key).unwrap().schema_kind();
    assert_eq!(kind(TypeKey::Scalar(ScalarKind::U64)), SchemaKind::Scalar);
    assert_eq!(kind(TypeKey::String), SchemaKind::String);
    assert_eq!(kind(TypeKey::named("Color")), SchemaKind::Scalar);
    assert_eq!(kind(TypeKey::named("Vec2")), SchemaKind::Struct);
    assert_eq!(kind(TypeKey::named("Point")), SchemaKind::Table);
    assert_eq!(kind(TypeKey::named("Shape")), SchemaKind::Union);
    assert_eq!(
        kind(TypeKey::list(TypeKey::Scalar(ScalarKind::I32))),
        SchemaKind::Vector
    );
}

#[test]
fn test_mutually_recursive_tables_resolve() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Folder")
            .member(MemberDeclaration::new("files", 0, TypeKey::list(TypeKey::named("File"))))
            .into(),
        TableDeclaration::new("File")
            .member(MemberDeclaration::new("parent", 0, TypeKey::named("Folder")))
            .into(),
    ]));
    let folder = container.resolve(&TypeKey::named("Folder")).unwrap();
    let file = container.resolve(&TypeKey::named("File")).unwrap();
    assert_eq!(folder.as_table().unwrap().members().len(), 1);
    assert_eq!(
        file.as_table().unwrap().member("parent").unwrap().item_key(),
        &TypeKey::named("Folder")
    );
}

#[test]
fn test_struct_containing_itself_is_rejected() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        StructDeclaration::new("Outer", StructKind::Reference)
            .member(MemberDeclaration::new("inner", 0, TypeKey::named("Inner")))
            .into(),
        StructDeclaration::new("Inner", StructKind::Reference)
            .member(MemberDeclaration::new("outer", 0, TypeKey::named("Outer")))
            .into(),
    ]));
    assert!(container.resolve(&TypeKey::named("Outer")).is_err());
    assert!(!container.contains(&TypeKey::named("Outer")));
    assert!(!container.contains(&TypeKey::named("Inner")));
}

#[test]
fn test_duplicate_index_is_reported() {
    let container = TypeModelContainer::with_declarations(declarations(vec![TableDeclaration::new(
        "Monster",
    )
    .member(MemberDeclaration::new("hp", 3, TypeKey::Scalar(ScalarKind::I16)))
    .member(MemberDeclaration::new("mana", 3, TypeKey::Scalar(ScalarKind::I16)))
    .into()]));
    match container.resolve(&TypeKey::named("Monster")) {
        Err(SchemaError::IndexConflict {
            index,
            first,
            second,
            ..
        }) => {
            assert_eq!(index, 3);
            assert_eq!(first, "hp");
            assert_eq!(second, "mana");
        }
        other => panic!("expected an index conflict, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_union_overlapping_next_slot_is_reported() {
    // A union member takes its index and the one after it.
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Sword").into(),
        UnionDeclaration::new("Equipment")
            .alternative(TypeKey::named("Sword"))
            .into(),
        TableDeclaration::new("Monster")
            .member(MemberDeclaration::new("equipped", 0, TypeKey::named("Equipment")))
            .member(MemberDeclaration::new("hp", 1, TypeKey::Scalar(ScalarKind::I16)))
            .into(),
    ]));
    assert!(matches!(
        container.resolve(&TypeKey::named("Monster")),
        Err(SchemaError::IndexConflict { index: 1, .. })
    ));
}

#[test]
fn test_failed_root_leaves_container_usable() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Broken")
            .member(MemberDeclaration::new("nested", 0, TypeKey::list(TypeKey::list(TypeKey::String))))
            .into(),
        TableDeclaration::new("Fine")
            .member(MemberDeclaration::new("name", 0, TypeKey::String))
            .into(),
    ]));
    assert!(container.resolve(&TypeKey::named("Broken")).is_err());
    assert!(!container.contains(&TypeKey::named("Broken")));

    let fine = container.resolve(&TypeKey::named("Fine")).unwrap();
    assert!(fine.as_table().is_some());
    assert!(container
        .compile_serializer(&TypeKey::named("Fine"), SerializerOptions::default())
        .is_ok());
}

#[test]
fn test_sorted_vector_requires_key() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Entry")
            .member(MemberDeclaration::new("name", 0, TypeKey::String))
            .into(),
        TableDeclaration::new("Catalog")
            .member(
                MemberDeclaration::new("entries", 0, TypeKey::list(TypeKey::named("Entry")))
                    .sorted_vector(),
            )
            .into(),
    ]));
    assert!(matches!(
        container.resolve(&TypeKey::named("Catalog")),
        Err(SchemaError::InvalidMember { .. })
    ));
}

#[test]
fn test_indexed_vector_key_type_must_match() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Item")
            .member(MemberDeclaration::new("id", 0, TypeKey::String).key())
            .into(),
        TableDeclaration::new("Registry")
            .member(MemberDeclaration::new(
                "items",
                0,
                TypeKey::indexed(
                    IndexedKind::IndexedVector,
                    TypeKey::Scalar(ScalarKind::I32),
                    TypeKey::named("Item"),
                ),
            ))
            .into(),
    ]));
    assert!(container.resolve(&TypeKey::named("Registry")).is_err());
    assert!(!container.contains(&TypeKey::named("Registry")));
}

#[test]
fn test_unknown_named_type_cannot_resolve() {
    let container = TypeModelContainer::new();
    assert_eq!(
        container.resolve(&TypeKey::named("Ghost")).unwrap_err(),
        SchemaError::CannotResolve(TypeKey::named("Ghost"))
    );
}

#[test]
fn test_union_root_is_rejected() {
    let container = TypeModelContainer::with_declarations(declarations(vec![
        TableDeclaration::new("Point").into(),
        UnionDeclaration::new("Shape")
            .alternative(TypeKey::named("Point"))
            .into(),
    ]));
    assert!(matches!(
        container.compile_serializer(&TypeKey::named("Shape"), SerializerOptions::default()),
        Err(SchemaError::InvalidRoot(_))
    ));
}

/// Counts how often the container asks it for a model.
#[derive(Debug, Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

impl TypeModelProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn try_create(
        &self,
        _key: &TypeKey,
        _declarations: &Declarations,
    ) -> Result<Option<TypeModelRef>, SchemaError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }
}

#[test]
fn test_user_providers_are_consulted_first_and_once() {
    let container = TypeModelContainer::new();
    let provider = Arc::new(CountingProvider::default());
    container.register_provider(provider.clone());

    container.resolve(&TypeKey::String).unwrap();
    container.resolve(&TypeKey::String).unwrap();
    assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
}

#[test]
fn test_concurrent_resolution_agrees() {
    let container = Arc::new(TypeModelContainer::with_declarations(monster_schema()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || container.resolve(&TypeKey::named("Monster")).unwrap())
        })
        .collect();
    let models: Vec<TypeModelRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for model in &models[1..] {
        assert!(Arc::ptr_eq(&models[0], model));
    }
}
