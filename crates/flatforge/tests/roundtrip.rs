// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialize, parse, clone and max-size through compiled serializers.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)]

use flatforge::buffer::InputBuffer;
use flatforge::schema::{
    Declarations, EnumDeclaration, IndexedKind, MemberDeclaration, ScalarKind,
    StructDeclaration, StructKind, TableDeclaration, TypeDeclaration, UnionDeclaration,
};
use flatforge::{
    DeserializationMode, Error, FnFacade, MapKey, ParseError, SerializeError, Serializer,
    SerializerOptions, TypeKey, TypeModelContainer, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn compile(items: Vec<TypeDeclaration>, root: &str, options: SerializerOptions) -> Serializer {
    let mut declarations = Declarations::new();
    for item in items {
        declarations.insert(item).unwrap();
    }
    TypeModelContainer::with_declarations(declarations)
        .compile_serializer(&TypeKey::named(root), options)
        .unwrap()
}

fn game_schema() -> Vec<TypeDeclaration> {
    vec![
        EnumDeclaration::new("Color", ScalarKind::U8)
            .value("Red", 0)
            .value("Green", 1)
            .value("Blue", 2)
            .into(),
        StructDeclaration::new("Vec3", StructKind::Reference)
            .member(MemberDeclaration::new("x", 0, TypeKey::Scalar(ScalarKind::F32)))
            .member(MemberDeclaration::new("y", 1, TypeKey::Scalar(ScalarKind::F32)))
            .member(MemberDeclaration::new("z", 2, TypeKey::Scalar(ScalarKind::F32)))
            .into(),
        TableDeclaration::new("Weapon")
            .member(MemberDeclaration::new("name", 0, TypeKey::String).key())
            .member(MemberDeclaration::new(
                "damage",
                1,
                TypeKey::Scalar(ScalarKind::I16),
            ))
            .into(),
        TableDeclaration::new("Shield")
            .member(MemberDeclaration::new("armor", 0, TypeKey::Scalar(ScalarKind::U32)))
            .into(),
        UnionDeclaration::new("Equipment")
            .alternative(TypeKey::named("Weapon"))
            .alternative(TypeKey::named("Shield"))
            .into(),
        TableDeclaration::new("Monster")
            .member(MemberDeclaration::new("pos", 0, TypeKey::named("Vec3")).write_through())
            .member(
                MemberDeclaration::new("hp", 1, TypeKey::Scalar(ScalarKind::I16)).with_default(100),
            )
            .member(MemberDeclaration::new("name", 2, TypeKey::String).required())
            .member(MemberDeclaration::new("inventory", 3, TypeKey::memory()))
            .member(
                MemberDeclaration::new("color", 4, TypeKey::named("Color")).with_default("Blue"),
            )
            .member(
                MemberDeclaration::new("weapons", 5, TypeKey::list(TypeKey::named("Weapon")))
                    .sorted_vector(),
            )
            .member(MemberDeclaration::new("equipped", 6, TypeKey::named("Equipment")))
            .member(MemberDeclaration::new("mana", 8, TypeKey::Scalar(ScalarKind::I16)).deprecated())
            .member(MemberDeclaration::new(
                "level",
                9,
                TypeKey::nullable(TypeKey::Scalar(ScalarKind::U8)),
            ))
            .member(
                MemberDeclaration::new("gold", 10, TypeKey::Scalar(ScalarKind::U32)).write_through(),
            )
            .with_file_identifier(*b"MONS")
            .into(),
    ]
}

fn weapon(name: &str, damage: i16) -> Value {
    Value::table([("name", Value::from(name)), ("damage", Value::from(damage))])
}

fn orc() -> Value {
    Value::table([
        (
            "pos",
            Value::structure([
                ("x", Value::from(1.0f32)),
                ("y", Value::from(2.5f32)),
                ("z", Value::from(-3.0f32)),
            ]),
        ),
        ("hp", Value::from(80i16)),
        ("name", Value::from("orc")),
        ("inventory", Value::Bytes(vec![1, 2, 3, 4, 5])),
        ("color", Value::from(1u8)),
        (
            "weapons",
            Value::vector([weapon("sword", 3), weapon("axe", 5)]),
        ),
        ("equipped", Value::union(2, Value::table([("armor", Value::from(7u32))]))),
        ("level", Value::from(12u8)),
        ("gold", Value::from(50u32)),
    ])
}

fn monster_serializer() -> Serializer {
    compile(game_schema(), "Monster", SerializerOptions::default())
}

#[test]
fn test_full_table_roundtrip() {
    let serializer = monster_serializer();
    let bytes = serializer.serialize(&orc()).unwrap();
    let parsed = serializer.parse(&bytes).unwrap();

    assert_eq!(parsed.get("hp"), Some(&Value::Int(80)));
    assert_eq!(parsed.get("name").and_then(Value::as_str), Some("orc"));
    assert_eq!(parsed.get("inventory"), Some(&Value::Bytes(vec![1, 2, 3, 4, 5])));
    assert_eq!(parsed.get("color"), Some(&Value::UInt(1)));
    assert_eq!(parsed.get("level"), Some(&Value::UInt(12)));

    let pos = parsed.get("pos").unwrap();
    assert_eq!(pos.get("x").and_then(Value::as_f64), Some(1.0));
    assert_eq!(pos.get("y").and_then(Value::as_f64), Some(2.5));
    assert_eq!(pos.get("z").and_then(Value::as_f64), Some(-3.0));

    assert_eq!(
        parsed.get("equipped"),
        Some(&Value::union(2, Value::table([("armor", Value::UInt(7))])))
    );
    assert!(parsed.get("mana").is_none());
}

#[test]
fn test_serialization_is_deterministic() {
    let first = monster_serializer();
    let second = monster_serializer();
    let a = first.serialize(&orc()).unwrap();
    let b = first.serialize(&orc()).unwrap();
    let c = second.serialize(&orc()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn test_buffer_starts_with_root_offset_and_identifier() {
    let serializer = monster_serializer();
    assert_eq!(serializer.file_identifier(), Some(*b"MONS"));
    let bytes = serializer.serialize(&orc()).unwrap();
    assert_eq!(&bytes[4..8], b"MONS");
    let root = bytes.read_uoffset(0).unwrap();
    assert!(root >= 8);
}

#[test]
fn test_defaults_are_elided_and_restored() {
    let serializer = monster_serializer();
    let plain = Value::table([("name", Value::from("rat")), ("hp", Value::from(100i16))]);
    let bytes = serializer.serialize(&plain).unwrap();

    let root = bytes.read_uoffset(0).unwrap();
    // hp (slot 1) equals its default and color (slot 4) is absent.
    assert_eq!(bytes.get_absolute_table_field_location(root, 1).unwrap(), None);
    assert_eq!(bytes.get_absolute_table_field_location(root, 4).unwrap(), None);
    assert!(bytes
        .get_absolute_table_field_location(root, 2)
        .unwrap()
        .is_some());

    let parsed = serializer.parse(&bytes).unwrap();
    assert_eq!(parsed.get("hp"), Some(&Value::Int(100)));
    assert_eq!(parsed.get("color"), Some(&Value::UInt(2)));
    assert!(parsed.get("weapons").is_none());
    assert!(parsed.get("level").is_none());
    assert!(parsed.get("pos").is_none());
}

#[test]
fn test_enum_default_given_by_name_is_elided() {
    let serializer = monster_serializer();
    let plain = serializer
        .serialize(&Value::table([("name", Value::from("rat"))]))
        .unwrap();
    let by_name = serializer
        .serialize(&Value::table([
            ("name", Value::from("rat")),
            ("color", Value::from("Blue")),
        ]))
        .unwrap();
    let by_value = serializer
        .serialize(&Value::table([
            ("name", Value::from("rat")),
            ("color", Value::from(2u8)),
        ]))
        .unwrap();
    assert_eq!(by_name.len(), plain.len());
    assert_eq!(by_name, by_value);

    let root = by_name.read_uoffset(0).unwrap();
    assert_eq!(by_name.get_absolute_table_field_location(root, 4).unwrap(), None);
    assert_eq!(
        serializer.parse(&by_name).unwrap().get("color"),
        Some(&Value::UInt(2))
    );

    // Any other constant is still written.
    let green = serializer
        .serialize(&Value::table([
            ("name", Value::from("rat")),
            ("color", Value::from("Green")),
        ]))
        .unwrap();
    let root = green.read_uoffset(0).unwrap();
    assert!(green
        .get_absolute_table_field_location(root, 4)
        .unwrap()
        .is_some());
    assert_eq!(
        serializer.parse(&green).unwrap().get("color"),
        Some(&Value::UInt(1))
    );
}

#[test]
fn test_missing_required_member_fails() {
    let serializer = monster_serializer();
    let err = serializer
        .serialize(&Value::table([("hp", Value::from(5i16))]))
        .unwrap_err();
    assert!(matches!(
        err,
        SerializeError::RequiredField { ref member, .. } if member == "name"
    ));
}

#[test]
fn test_union_discriminator_zero_means_none() {
    let serializer = monster_serializer();
    let value = Value::table([
        ("name", Value::from("ghost")),
        ("equipped", Value::union(0, Value::Null)),
    ]);
    let bytes = serializer.serialize(&value).unwrap();
    let root = bytes.read_uoffset(0).unwrap();
    assert_eq!(bytes.get_absolute_table_field_location(root, 6).unwrap(), None);
    assert_eq!(bytes.get_absolute_table_field_location(root, 7).unwrap(), None);
    assert!(serializer.parse(&bytes).unwrap().get("equipped").is_none());
}

#[test]
fn test_unknown_union_discriminator_is_rejected() {
    let serializer = monster_serializer();
    let value = Value::table([
        ("name", Value::from("ghost")),
        ("equipped", Value::union(9, Value::table([("armor", Value::from(1u32))]))),
    ]);
    assert!(matches!(
        serializer.serialize(&value),
        Err(SerializeError::InvalidDiscriminator { discriminator: 9, .. })
    ));
}

#[test]
fn test_sorted_vector_parses_in_key_order() {
    let serializer = monster_serializer();
    let value = Value::table([
        ("name", Value::from("hoarder")),
        (
            "weapons",
            Value::vector(["d", "c", "b", "a", ""].map(|name| weapon(name, 1))),
        ),
    ]);
    let bytes = serializer.serialize(&value).unwrap();
    let parsed = serializer.parse(&bytes).unwrap();
    let Some(Value::Vector(weapons)) = parsed.get("weapons") else {
        panic!("weapons missing");
    };
    let names: Vec<&str> = weapons
        .iter()
        .map(|w| w.get("name").and_then(Value::as_str).unwrap())
        .collect();
    assert_eq!(names, ["", "a", "b", "c", "d"]);
}

#[test]
fn test_lookup_binary_searches_the_buffer() {
    let serializer = monster_serializer();
    let value = Value::table([
        ("name", Value::from("hoarder")),
        (
            "weapons",
            Value::vector([weapon("mace", 4), weapon("bow", 2), weapon("dagger", 1)]),
        ),
    ]);
    let bytes = serializer.serialize(&value).unwrap();

    let bow = serializer.lookup(&bytes, "weapons", "bow").unwrap().unwrap();
    assert_eq!(bow.get("damage"), Some(&Value::Int(2)));
    assert!(serializer.lookup(&bytes, "weapons", "spear").unwrap().is_none());
    assert!(matches!(
        serializer.lookup(&bytes, "name", "x"),
        Err(Error::Schema(_))
    ));
}

#[test]
fn test_write_through_updates_buffer_in_place() {
    let serializer = monster_serializer();
    let mut bytes = serializer.serialize(&orc()).unwrap();
    let len = bytes.len();

    serializer
        .write_through(&mut bytes, "pos.y", &Value::from(9.5f32))
        .unwrap();
    serializer
        .write_through(&mut bytes, "gold", &Value::from(12u32))
        .unwrap();
    assert_eq!(bytes.len(), len);

    let parsed = serializer.parse(&bytes).unwrap();
    assert_eq!(parsed.get("gold"), Some(&Value::UInt(12)));
    assert_eq!(parsed.get("hp"), Some(&Value::Int(80)));
    let pos = parsed.get("pos").unwrap();
    assert_eq!(pos.get("y").and_then(Value::as_f64), Some(9.5));
    assert_eq!(pos.get("x").and_then(Value::as_f64), Some(1.0));

    assert!(matches!(
        serializer.write_through(&mut bytes, "hp", &Value::from(1i16)),
        Err(Error::Serialize(SerializeError::NotWriteThrough { .. }))
    ));
}

#[test]
fn test_file_identifier_is_verified() {
    let serializer = monster_serializer();
    let mut bytes = serializer.serialize(&orc()).unwrap();
    bytes[4..8].copy_from_slice(b"NOPE");
    assert!(matches!(
        serializer.parse(&bytes),
        Err(ParseError::FileIdentifierMismatch { expected, found })
            if expected == *b"MONS" && found == *b"NOPE"
    ));

    let lenient = compile(
        game_schema(),
        "Monster",
        SerializerOptions::default().with_verify_file_identifier(false),
    );
    assert!(lenient.parse(&bytes).is_ok());
}

#[test]
fn test_truncated_buffer_is_an_error() {
    let serializer = monster_serializer();
    let bytes = serializer.serialize(&orc()).unwrap();
    assert!(serializer.parse(&bytes[..bytes.len() / 2]).is_err());
    assert!(serializer.parse(&[]).is_err());
}

#[test]
fn test_write_reports_small_span() {
    let serializer = monster_serializer();
    let mut span = vec![0u8; 16];
    assert!(matches!(
        serializer.write(&mut span, &orc()),
        Err(SerializeError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_clone_drops_unknown_members() {
    let serializer = monster_serializer();
    let mut value = orc();
    if let Value::Table(fields) = &mut value {
        fields.insert("unknown".into(), Value::from(1i32));
    }
    let cloned = serializer.clone_value(&value).unwrap();
    assert!(cloned.get("unknown").is_none());
    assert_eq!(cloned.get("name"), value.get("name"));
    assert_eq!(cloned.get("weapons"), value.get("weapons"));
}

fn node_schema() -> Vec<TypeDeclaration> {
    vec![TableDeclaration::new("Node")
        .member(MemberDeclaration::new("id", 0, TypeKey::Scalar(ScalarKind::U32)))
        .member(MemberDeclaration::new("next", 1, TypeKey::named("Node")))
        .member(MemberDeclaration::new(
            "children",
            2,
            TypeKey::list(TypeKey::named("Node")),
        ))
        .into()]
}

fn chain(length: u32) -> Value {
    let mut node = Value::table([("id", Value::from(length))]);
    for id in (1..length).rev() {
        node = Value::table([("id", Value::from(id)), ("next", node)]);
    }
    node
}

#[test]
fn test_recursive_table_roundtrip() {
    let serializer = compile(node_schema(), "Node", SerializerOptions::default());
    let tree = Value::table([
        ("id", Value::from(1u32)),
        (
            "children",
            Value::vector([
                Value::table([("id", Value::from(2u32))]),
                Value::table([
                    ("id", Value::from(3u32)),
                    ("children", Value::vector([Value::table([("id", Value::from(4u32))])])),
                ]),
            ]),
        ),
    ]);
    let bytes = serializer.serialize(&tree).unwrap();
    assert_eq!(serializer.parse(&bytes).unwrap(), tree);
}

#[test]
fn test_depth_limit_stops_deep_buffers() {
    let value = chain(10);
    let shallow = compile(
        node_schema(),
        "Node",
        SerializerOptions::default().with_max_depth(4),
    );
    let bytes = shallow.serialize(&value).unwrap();
    assert!(matches!(
        shallow.parse(&bytes),
        Err(ParseError::DepthExceeded { limit: 4 })
    ));

    let deep = compile(node_schema(), "Node", SerializerOptions::default());
    assert_eq!(deep.parse(&bytes).unwrap(), value);
}

#[test]
fn test_max_size_bounds_random_values() {
    let serializer = monster_serializer();
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..100 {
        let name: String = (0..rng.usize(0..40)).map(|_| rng.alphanumeric()).collect();
        let weapons: Vec<Value> = (0..rng.usize(0..8))
            .map(|i| weapon(&format!("w{}-{}", i, rng.u32(..)), rng.i16(..)))
            .collect();
        let inventory: Vec<u8> = (0..rng.usize(0..64)).map(|_| rng.u8(..)).collect();
        let mut fields = vec![
            ("name", Value::from(name)),
            ("hp", Value::from(rng.i16(..))),
            ("inventory", Value::Bytes(inventory)),
            ("weapons", Value::Vector(weapons)),
        ];
        if rng.bool() {
            fields.push(("equipped", Value::union(1, weapon("spare", 1))));
        }
        if rng.bool() {
            fields.push(("level", Value::from(rng.u8(..))));
        }
        let value = Value::table(fields);

        let max = serializer.max_size(&value).unwrap();
        let mut span = vec![0u8; max];
        let used = serializer.write(&mut span, &value).unwrap();
        assert!(used <= max, "used {} > max {}", used, max);
        let parsed = serializer.parse(&span[..used]).unwrap();
        assert_eq!(parsed.get("name"), value.get("name"));
    }

    let bundles = compile(payload_schema(), "Bundle", SerializerOptions::default());
    for _ in 0..100 {
        let payloads: Vec<Value> = (0..rng.usize(0..12))
            .map(|_| match rng.u8(1..=3) {
                1 => {
                    let label: String = (0..rng.usize(0..24)).map(|_| rng.alphanumeric()).collect();
                    Value::union(1, tag(&label))
                }
                2 => Value::union(2, big(rng.i64(..), rng.u8(..))),
                _ => {
                    let text: String = (0..rng.usize(0..24)).map(|_| rng.alphanumeric()).collect();
                    Value::union(3, Value::from(text))
                }
            })
            .collect();
        let bigs: Vec<Value> = (0..rng.usize(0..6))
            .map(|_| big(rng.i64(..), rng.u8(..)))
            .collect();
        let value = Value::table([
            ("payloads", Value::Vector(payloads)),
            ("bigs", Value::Vector(bigs)),
            ("single", Value::union(2, big(rng.i64(..), rng.u8(..)))),
        ]);

        let max = bundles.max_size(&value).unwrap();
        let mut span = vec![0u8; max];
        let used = bundles.write(&mut span, &value).unwrap();
        assert!(used <= max, "used {} > max {}", used, max);
        assert_eq!(bundles.parse(&span[..used]).unwrap(), value);
    }
}

fn payload_schema() -> Vec<TypeDeclaration> {
    vec![
        // i64 then u8: 9 bytes of members padded to a 16-byte stride.
        StructDeclaration::new("Big", StructKind::Reference)
            .member(MemberDeclaration::new("lo", 0, TypeKey::Scalar(ScalarKind::I64)))
            .member(MemberDeclaration::new("flag", 1, TypeKey::Scalar(ScalarKind::U8)))
            .into(),
        TableDeclaration::new("Tag")
            .member(MemberDeclaration::new("label", 0, TypeKey::String))
            .into(),
        UnionDeclaration::new("Payload")
            .alternative(TypeKey::named("Tag"))
            .alternative(TypeKey::named("Big"))
            .alternative(TypeKey::String)
            .into(),
        TableDeclaration::new("Bundle")
            .member(MemberDeclaration::new(
                "payloads",
                0,
                TypeKey::list(TypeKey::named("Payload")),
            ))
            .member(MemberDeclaration::new("bigs", 2, TypeKey::list(TypeKey::named("Big"))))
            .member(MemberDeclaration::new("single", 3, TypeKey::named("Payload")))
            .member(MemberDeclaration::new("labels", 5, TypeKey::list(TypeKey::String)))
            .into(),
    ]
}

fn big(lo: i64, flag: u8) -> Value {
    Value::structure([("lo", Value::from(lo)), ("flag", Value::from(flag))])
}

fn tag(label: &str) -> Value {
    Value::table([("label", Value::from(label))])
}

#[test]
fn test_union_vector_roundtrip() {
    let serializer = compile(payload_schema(), "Bundle", SerializerOptions::default());
    let value = Value::table([
        (
            "payloads",
            Value::vector([
                Value::union(1, tag("first")),
                Value::union(2, big(i64::MIN, 255)),
                Value::union(3, Value::from("")),
                Value::union(1, tag("")),
            ]),
        ),
        ("labels", Value::Vector(Vec::new())),
    ]);
    let bytes = serializer.serialize(&value).unwrap();
    assert!(bytes.len() <= serializer.max_size(&value).unwrap());
    assert_eq!(serializer.parse(&bytes).unwrap(), value);

    // Discriminators land in the first slot's vector, values in the second.
    let root = bytes.read_uoffset(0).unwrap();
    let types = bytes
        .get_absolute_table_field_location(root, 0)
        .unwrap()
        .unwrap();
    let types = bytes.read_uoffset(types).unwrap();
    assert_eq!(bytes.read_u32(types).unwrap(), 4);
    assert_eq!(bytes.read_bytes(types + 4, 4).unwrap(), &[1, 2, 3, 1]);
    assert!(bytes
        .get_absolute_table_field_location(root, 1)
        .unwrap()
        .is_some());
}

#[test]
fn test_union_vector_rejects_empty_items() {
    let serializer = compile(payload_schema(), "Bundle", SerializerOptions::default());
    let value = Value::table([(
        "payloads",
        Value::vector([Value::union(1, tag("a")), Value::union(0, Value::Null)]),
    )]);
    assert!(matches!(
        serializer.serialize(&value),
        Err(SerializeError::NullVectorItem { index: 1, .. })
    ));
}

#[test]
fn test_vector_of_padded_structs_roundtrip() {
    let container = TypeModelContainer::with_declarations({
        let mut declarations = Declarations::new();
        for item in payload_schema() {
            declarations.insert(item).unwrap();
        }
        declarations
    });
    let layout = container
        .resolve(&TypeKey::named("Big"))
        .unwrap()
        .physical_layout()
        .to_vec();
    assert_eq!(
        layout
            .iter()
            .map(|l| (l.inline_size, l.alignment))
            .collect::<Vec<_>>(),
        [(16, 8)]
    );

    let serializer = container
        .compile_serializer(&TypeKey::named("Bundle"), SerializerOptions::default())
        .unwrap();
    let value = Value::table([(
        "bigs",
        Value::vector([big(i64::MIN, 0), big(-1, 255), big(i64::MAX, 7)]),
    )]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(serializer.parse(&bytes).unwrap(), value);

    let root = bytes.read_uoffset(0).unwrap();
    let slot = bytes
        .get_absolute_table_field_location(root, 2)
        .unwrap()
        .unwrap();
    let vector = bytes.read_uoffset(slot).unwrap();
    assert_eq!(bytes.read_u32(vector).unwrap(), 3);
    let first = vector + 4;
    assert_eq!(first % 8, 0);
    assert_eq!(bytes.read_i64(first).unwrap(), i64::MIN);
    assert_eq!(bytes.read_i64(first + 16).unwrap(), -1);
    assert_eq!(bytes.read_u8(first + 16 + 8).unwrap(), 255);
    assert_eq!(bytes.read_i64(first + 32).unwrap(), i64::MAX);
}

#[test]
fn test_union_with_struct_alternative_roundtrip() {
    let serializer = compile(payload_schema(), "Bundle", SerializerOptions::default());
    let value = Value::table([("single", Value::union(2, big(42, 9)))]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(serializer.parse(&bytes).unwrap(), value);

    // The value slot holds an offset to an out-of-line copy of the struct.
    let root = bytes.read_uoffset(0).unwrap();
    let discriminator = bytes
        .get_absolute_table_field_location(root, 3)
        .unwrap()
        .unwrap();
    assert_eq!(bytes.read_u8(discriminator).unwrap(), 2);
    let slot = bytes
        .get_absolute_table_field_location(root, 4)
        .unwrap()
        .unwrap();
    let body = bytes.read_uoffset(slot).unwrap();
    assert_eq!(body % 8, 0);
    assert_eq!(bytes.read_i64(body).unwrap(), 42);
    assert_eq!(bytes.read_u8(body + 8).unwrap(), 9);
}

#[test]
fn test_numeric_limits_roundtrip() {
    let kinds = [
        ("i8", ScalarKind::I8),
        ("u8", ScalarKind::U8),
        ("i16", ScalarKind::I16),
        ("u16", ScalarKind::U16),
        ("i32", ScalarKind::I32),
        ("u32", ScalarKind::U32),
        ("i64", ScalarKind::I64),
        ("u64", ScalarKind::U64),
        ("f32", ScalarKind::F32),
        ("f64", ScalarKind::F64),
        ("flag", ScalarKind::Bool),
    ];
    let mut limits = TableDeclaration::new("Limits");
    for (index, (name, kind)) in kinds.iter().enumerate() {
        limits = limits.member(MemberDeclaration::new(
            *name,
            index as u16,
            TypeKey::Scalar(*kind),
        ));
    }
    let serializer = compile(vec![limits.into()], "Limits", SerializerOptions::default());

    let minimum = Value::table([
        ("i8", Value::from(i8::MIN)),
        ("u8", Value::from(u8::MIN)),
        ("i16", Value::from(i16::MIN)),
        ("u16", Value::from(u16::MIN)),
        ("i32", Value::from(i32::MIN)),
        ("u32", Value::from(u32::MIN)),
        ("i64", Value::from(i64::MIN)),
        ("u64", Value::from(u64::MIN)),
        ("f32", Value::from(f32::MIN)),
        ("f64", Value::from(f64::MIN)),
        ("flag", Value::from(false)),
    ]);
    let maximum = Value::table([
        ("i8", Value::from(i8::MAX)),
        ("u8", Value::from(u8::MAX)),
        ("i16", Value::from(i16::MAX)),
        ("u16", Value::from(u16::MAX)),
        ("i32", Value::from(i32::MAX)),
        ("u32", Value::from(u32::MAX)),
        ("i64", Value::from(i64::MAX)),
        ("u64", Value::from(u64::MAX)),
        ("f32", Value::from(f32::MAX)),
        ("f64", Value::from(f64::MAX)),
        ("flag", Value::from(true)),
    ]);
    for value in [minimum, maximum] {
        let bytes = serializer.serialize(&value).unwrap();
        assert!(bytes.len() <= serializer.max_size(&value).unwrap());
        assert_eq!(serializer.parse(&bytes).unwrap(), value);
    }

    let overflow = Value::table([("u8", Value::from(256u16))]);
    assert!(matches!(
        serializer.serialize(&overflow),
        Err(SerializeError::OutOfRange { .. })
    ));
}

fn registry_schema() -> Vec<TypeDeclaration> {
    vec![
        TableDeclaration::new("Item")
            .member(MemberDeclaration::new("id", 0, TypeKey::String).key())
            .member(MemberDeclaration::new("count", 1, TypeKey::Scalar(ScalarKind::U16)))
            .into(),
        TableDeclaration::new("Registry")
            .member(MemberDeclaration::new(
                "items",
                0,
                TypeKey::indexed(
                    IndexedKind::IndexedVector,
                    TypeKey::String,
                    TypeKey::named("Item"),
                ),
            ))
            .into(),
    ]
}

fn items() -> Value {
    let mut map = BTreeMap::new();
    for (id, count) in [("potion", 3u16), ("arrow", 40), ("gem", 1)] {
        // The key member may be left out; the map key fills it in.
        map.insert(
            MapKey::from(id),
            Value::table([("count", Value::from(count))]),
        );
    }
    Value::table([("items", Value::Map(map))])
}

#[test]
fn test_indexed_vector_parses_to_map() {
    let serializer = compile(registry_schema(), "Registry", SerializerOptions::default());
    let bytes = serializer.serialize(&items()).unwrap();
    let parsed = serializer.parse(&bytes).unwrap();
    let Some(Value::Map(map)) = parsed.get("items") else {
        panic!("items missing");
    };
    assert_eq!(map.len(), 3);
    let arrow = &map[&MapKey::from("arrow")];
    assert_eq!(arrow.get("id").and_then(Value::as_str), Some("arrow"));
    assert_eq!(arrow.get("count"), Some(&Value::UInt(40)));

    let gem = serializer.lookup(&bytes, "items", "gem").unwrap().unwrap();
    assert_eq!(gem.get("count"), Some(&Value::UInt(1)));
}

#[test]
fn test_lazy_mode_keeps_wire_order() {
    let serializer = compile(
        registry_schema(),
        "Registry",
        SerializerOptions::default().with_deserialization(DeserializationMode::Lazy),
    );
    let bytes = serializer.serialize(&items()).unwrap();
    let parsed = serializer.parse(&bytes).unwrap();
    let Some(Value::Vector(items)) = parsed.get("items") else {
        panic!("items missing");
    };
    let ids: Vec<&str> = items
        .iter()
        .map(|item| item.get("id").and_then(Value::as_str).unwrap())
        .collect();
    assert_eq!(ids, ["arrow", "gem", "potion"]);
}

#[test]
fn test_mismatched_map_key_is_rejected() {
    let serializer = compile(registry_schema(), "Registry", SerializerOptions::default());
    let mut map = BTreeMap::new();
    map.insert(
        MapKey::from("potion"),
        Value::table([("id", Value::from("elixir"))]),
    );
    assert!(matches!(
        serializer.serialize(&Value::table([("items", Value::Map(map))])),
        Err(SerializeError::KeyMismatch { .. })
    ));
}

#[test]
fn test_shared_strings_shrink_the_buffer() {
    let schema = |key: TypeKey| {
        vec![TableDeclaration::new("Log")
            .member(MemberDeclaration::new("lines", 0, TypeKey::list(key)))
            .into()]
    };
    let value = Value::table([(
        "lines",
        Value::vector(std::iter::repeat("the same long line of text").take(16)),
    )]);

    let plain = compile(schema(TypeKey::String), "Log", SerializerOptions::default());
    let shared = compile(schema(TypeKey::SharedString), "Log", SerializerOptions::default());
    let plain_bytes = plain.serialize(&value).unwrap();
    let shared_bytes = shared.serialize(&value).unwrap();
    assert!(shared_bytes.len() < plain_bytes.len());
    assert_eq!(shared.parse(&shared_bytes).unwrap(), value);
}

#[test]
fn test_facade_member_roundtrip() {
    let mut declarations = Declarations::new();
    declarations
        .insert(
            TableDeclaration::new("Reading")
                .member(MemberDeclaration::new("temperature", 0, TypeKey::named("Celsius"))),
        )
        .unwrap();
    let container = TypeModelContainer::with_declarations(declarations);
    container.register_type_facade(Arc::new(FnFacade::new(
        TypeKey::named("Celsius"),
        TypeKey::Scalar(ScalarKind::I32),
        |v| {
            v.as_f64()
                .map(|c| Value::Int((c * 100.0).round() as i64))
                .ok_or_else(|| "expected a temperature".to_owned())
        },
        |v| {
            v.as_i128()
                .map(|raw| Value::Float(raw as f64 / 100.0))
                .ok_or_else(|| "expected centidegrees".to_owned())
        },
    )));
    let serializer = container
        .compile_serializer(&TypeKey::named("Reading"), SerializerOptions::default())
        .unwrap();

    let value = Value::table([("temperature", Value::Float(21.5))]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(serializer.parse(&bytes).unwrap(), value);

    let bad = Value::table([("temperature", Value::from("hot"))]);
    assert!(matches!(
        serializer.serialize(&bad),
        Err(SerializeError::Facade { .. })
    ));
}

#[test]
fn test_generated_code_names_every_operation() {
    let serializer = monster_serializer();
    let module = serializer.generate_code().unwrap();
    for name in [
        "serialize_monster",
        "parse_monster",
        "max_size_monster",
        "clone_monster",
        "parse_equipment",
        "serialize_list_weapon",
        "sort_key_weapon",
    ] {
        assert!(module.source.contains(name), "missing {}", name);
    }
    assert!(module.methods.contains(&"parse_vec3".to_owned()));
    assert_eq!(module.root, TypeKey::named("Monster"));
}
