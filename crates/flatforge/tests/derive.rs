// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Declarations produced by the derive macros.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use flatforge::schema::{
    declarations_for, IndexedKind, ScalarKind, StructKind, TypeDeclaration, VectorKind,
};
use flatforge::{
    FlatEnum, FlatStruct, FlatTable, FlatType, FlatUnion, IndexedVector, MapKey, Memory,
    SerializerOptions, SharedString, TypeKey, TypeModelContainer, Value,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FlatEnum)]
#[repr(u8)]
enum Color {
    Red,
    Green,
    Blue = 5,
    Violet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FlatEnum)]
#[repr(i16)]
enum Tilt {
    Left = -1,
    Level,
    Right,
}

#[derive(Debug, Clone, Copy, FlatStruct)]
#[flat(value)]
#[repr(C)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, FlatStruct)]
struct Bounds {
    min: Vec3,
    max: Vec3,
}

#[derive(Debug, Clone, FlatTable)]
struct Weapon {
    #[flat(key)]
    name: String,
    damage: i16,
}

#[derive(Debug, Clone, FlatTable)]
struct Shield {
    armor: u32,
}

#[derive(Debug, Clone, FlatUnion)]
enum Equipment {
    Weapon(Weapon),
    Shield(Shield),
}

#[derive(Debug, Clone, FlatTable)]
#[flat(file_identifier = "MONS")]
struct Monster {
    pos: Option<Vec3>,
    #[flat(default = 100)]
    hp: i16,
    #[flat(required)]
    name: String,
    inventory: Memory,
    #[flat(default = "Blue")]
    color: Color,
    #[flat(sorted_vector)]
    weapons: Option<Vec<Weapon>>,
    #[flat(index = 6)]
    equipped: Option<Equipment>,
    #[flat(index = 8, deprecated)]
    mana: i16,
    bag: IndexedVector<String, Weapon>,
    #[flat(shared_string)]
    tags: Vec<String>,
    motto: Option<SharedString>,
    tilt: Option<Tilt>,
}

#[derive(Debug, Clone, FlatTable)]
struct Loadout {
    primary: Option<Equipment>,
    spares: Vec<Equipment>,
    count: u8,
}

fn table_declaration<T: FlatType>(name: &str) -> flatforge::schema::TableDeclaration {
    match declarations_for::<T>().unwrap().get(name) {
        Some(TypeDeclaration::Table(table)) => table.clone(),
        other => panic!("expected table '{}', got {:?}", name, other),
    }
}

#[test]
fn test_enum_discriminants_follow_rust_rules() {
    let declarations = declarations_for::<Color>().unwrap();
    let Some(TypeDeclaration::Enum(color)) = declarations.get("Color") else {
        panic!("Color not declared");
    };
    assert_eq!(color.underlying, ScalarKind::U8);
    let values: Vec<(&str, i128)> = color
        .values
        .iter()
        .map(|v| (v.name.as_str(), v.value))
        .collect();
    assert_eq!(
        values,
        [("Red", 0), ("Green", 1), ("Blue", 5), ("Violet", 6)]
    );

    assert_eq!(Color::Blue.to_i128(), 5);
    assert_eq!(Color::from_i128(6), Some(Color::Violet));
    assert_eq!(Color::from_i128(2), None);
    assert_eq!(Tilt::from_i128(-1), Some(Tilt::Left));
    assert_eq!(Tilt::Right.to_i128(), 1);
    assert_eq!(<Option<Tilt>>::type_key(), TypeKey::nullable(Tilt::type_key()));
}

#[test]
fn test_table_indices_are_inferred() {
    let monster = table_declaration::<Monster>("Monster");
    let indices: Vec<(&str, u16)> = monster
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.index))
        .collect();
    assert_eq!(
        indices,
        [
            ("pos", 0),
            ("hp", 1),
            ("name", 2),
            ("inventory", 3),
            ("color", 4),
            ("weapons", 5),
            ("equipped", 6),
            ("mana", 8),
            ("bag", 9),
            ("tags", 10),
            ("motto", 11),
            ("tilt", 12),
        ]
    );
    assert_eq!(monster.file_identifier, Some(*b"MONS"));
}

#[test]
fn test_inferred_indices_skip_union_slots() {
    assert_eq!(Equipment::SLOTS, 2);
    assert_eq!(<Vec<Equipment>>::SLOTS, 2);
    assert_eq!(<Option<Weapon>>::SLOTS, 1);

    let loadout = table_declaration::<Loadout>("Loadout");
    let indices: Vec<(&str, u16)> = loadout
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.index))
        .collect();
    assert_eq!(indices, [("primary", 0), ("spares", 2), ("count", 4)]);

    let serializer = TypeModelContainer::new()
        .compile_serializer_for::<Loadout>(SerializerOptions::default())
        .unwrap();
    let value = Value::table([
        (
            "primary",
            Value::union(2, Value::table([("armor", Value::from(3u32))])),
        ),
        (
            "spares",
            Value::vector([Value::union(
                1,
                Value::table([("name", Value::from("knife")), ("damage", Value::from(4i16))]),
            )]),
        ),
        ("count", Value::from(2u8)),
    ]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(serializer.parse(&bytes).unwrap(), value);
}

#[test]
fn test_member_types_and_flags() {
    let monster = table_declaration::<Monster>("Monster");
    let member = |name: &str| {
        monster
            .members
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .unwrap()
    };
    assert_eq!(
        member("pos").type_key,
        TypeKey::nullable(TypeKey::named("Vec3"))
    );
    assert_eq!(member("hp").default, Some(Value::Int(100)));
    assert!(member("name").is_required);
    assert_eq!(member("inventory").type_key, TypeKey::memory());
    assert!(member("weapons").is_sorted_vector);
    assert_eq!(
        member("weapons").type_key,
        TypeKey::vector(VectorKind::List, TypeKey::named("Weapon"))
    );
    assert!(member("mana").is_deprecated);
    assert_eq!(
        member("bag").type_key,
        TypeKey::indexed(
            IndexedKind::IndexedVector,
            TypeKey::String,
            TypeKey::named("Weapon")
        )
    );
    assert_eq!(member("tags").type_key, TypeKey::list(TypeKey::SharedString));
    assert_eq!(member("motto").type_key, TypeKey::SharedString);
}

#[test]
fn test_nested_declarations_are_collected() {
    let declarations = declarations_for::<Monster>().unwrap();
    for name in ["Monster", "Vec3", "Color", "Weapon", "Shield", "Equipment", "Tilt"] {
        assert!(declarations.contains(name), "missing {}", name);
    }

    let bounds = declarations_for::<Bounds>().unwrap();
    let Some(TypeDeclaration::Struct(decl)) = bounds.get("Bounds") else {
        panic!("Bounds not declared");
    };
    assert_eq!(decl.kind, StructKind::Reference);
    let Some(TypeDeclaration::Struct(vec3)) = bounds.get("Vec3") else {
        panic!("Vec3 not declared");
    };
    assert_eq!(vec3.kind, StructKind::Value);
    assert_eq!(
        vec3.host_layout.map(|l| (l.inline_size, l.alignment)),
        Some((12, 4))
    );
}

#[test]
fn test_union_alternatives_keep_declaration_order() {
    let declarations = declarations_for::<Equipment>().unwrap();
    let Some(TypeDeclaration::Union(union)) = declarations.get("Equipment") else {
        panic!("Equipment not declared");
    };
    assert_eq!(
        union.alternatives,
        [TypeKey::named("Weapon"), TypeKey::named("Shield")]
    );
}

#[test]
fn test_derived_schema_roundtrip() {
    let container = TypeModelContainer::new();
    let serializer = container
        .compile_serializer_for::<Monster>(SerializerOptions::default())
        .unwrap();
    assert_eq!(serializer.root(), &TypeKey::named("Monster"));

    let mut bag = BTreeMap::new();
    bag.insert(
        MapKey::from("club"),
        Value::table([("damage", Value::from(2i16))]),
    );
    let value = Value::table([
        (
            "pos",
            Value::structure([
                ("x", Value::from(0.5f32)),
                ("y", Value::from(1.5f32)),
                ("z", Value::from(2.5f32)),
            ]),
        ),
        ("name", Value::from("orc")),
        ("color", Value::from("Violet")),
        (
            "equipped",
            Value::union(1, Value::table([("name", Value::from("axe"))])),
        ),
        ("bag", Value::Map(bag)),
        ("tags", Value::vector(["green", "green", "angry"])),
        ("tilt", Value::from(-1i16)),
    ]);
    let bytes = serializer.serialize(&value).unwrap();
    let parsed = serializer.parse(&bytes).unwrap();

    assert_eq!(parsed.get("hp"), Some(&Value::Int(100)));
    assert_eq!(parsed.get("color"), Some(&Value::UInt(6)));
    assert_eq!(parsed.get("tilt"), Some(&Value::Int(-1)));
    assert_eq!(
        parsed.get("tags"),
        Some(&Value::vector(["green", "green", "angry"]))
    );
    assert_eq!(
        parsed.get("pos").and_then(|p| p.get("y")).and_then(Value::as_f64),
        Some(1.5)
    );
    let Some(Value::Union(1, axe)) = parsed.get("equipped") else {
        panic!("equipped missing");
    };
    assert_eq!(axe.get("name").and_then(Value::as_str), Some("axe"));
    let Some(Value::Map(bag)) = parsed.get("bag") else {
        panic!("bag missing");
    };
    assert_eq!(
        bag[&MapKey::from("club")].get("damage"),
        Some(&Value::Int(2))
    );
}

#[test]
fn test_resolve_type_declares_on_demand() {
    let container = TypeModelContainer::new();
    let weapon = container.resolve_type::<Weapon>().unwrap();
    let table = weapon.as_table().unwrap();
    assert_eq!(table.key_member().map(|m| m.name()), Some("name"));
    assert!(container.contains(&TypeKey::named("Weapon")));
    assert!(!container.contains(&TypeKey::named("Monster")));
}
