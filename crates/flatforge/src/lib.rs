// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Flatforge - FlatBuffers type models in pure Rust
//!
//! Flatforge turns declared types (tables, structs, enums, unions, vectors)
//! into validated *type models*. Each model knows its wire layout and where
//! it may appear, and implements four operations: serialize, parse,
//! max-size and clone. They run directly over dynamic [`Value`]s, and can
//! also be emitted as Rust source for a static serializer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flatforge::{FlatTable, SerializerOptions, TypeModelContainer, Value};
//!
//! #[derive(FlatTable)]
//! struct Monster {
//!     #[flat(index = 0, default = 100)]
//!     hp: i16,
//!     #[flat(index = 1)]
//!     name: Option<String>,
//! }
//!
//! fn main() -> flatforge::Result<()> {
//!     let container = TypeModelContainer::new();
//!     let serializer =
//!         container.compile_serializer_for::<Monster>(SerializerOptions::default())?;
//!
//!     let orc = Value::table([("hp", Value::from(80i16)), ("name", Value::from("orc"))]);
//!     let bytes = serializer.serialize(&orc)?;
//!     assert_eq!(serializer.parse(&bytes)?.get("hp"), Some(&Value::Int(80)));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Declarations (derives / builders)  ->  TypeModelContainer          |
//! |      providers -> initialize (cycles) -> validation queue           |
//! +---------------------------------------------------------------------+
//! |  ModelGraph (key-indexed, immutable once compiled)                  |
//! +---------------------------------------------------------------------+
//! |  Serializer: runtime ops over Value  |  codegen: Rust source text   |
//! +---------------------------------------------------------------------+
//! |  SerializationContext (forward allocator) | InputBuffer/SpanWriter  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`schema`] - type keys, declarations, host-type mapping
//! - [`container`] - resolution engine
//! - [`model`] - one model per kind of type
//! - [`serializer`] - compiled runtime serializer
//! - [`codegen`] - generated method artifacts and module rendering
//! - [`config`] - wire constants and [`SerializerOptions`]

// Lets the derives refer to `::flatforge` from inside this crate's tests.
extern crate self as flatforge;

/// Bounds-checked little-endian reads and writes over byte slices.
pub mod buffer;
/// Rust source generation from model graphs.
pub mod codegen;
/// Wire constants and serializer options.
pub mod config;
/// Type model resolution engine.
pub mod container;
/// Forward allocator used while writing a buffer.
pub mod context;
/// Error types.
pub mod error;
/// Key-indexed model arena.
pub mod graph;
/// Inline layout helpers.
pub mod layout;
/// Type models.
pub mod model;
/// Type model providers.
pub mod provider;
/// Runtime read/write state.
pub mod runtime;
/// Schema declarations and host-type mapping.
pub mod schema;
/// Compiled serializer.
pub mod serializer;
/// Sorted vectors: post-serialize sorting and binary search.
pub mod sorted;
/// Dynamic values.
pub mod value;

pub use config::{DeserializationMode, SerializerOptions};
pub use container::TypeModelContainer;
pub use error::{Error, ParseError, Result, SchemaError, SerializeError};
pub use graph::ModelGraph;
pub use model::{FnFacade, SchemaKind, TypeFacade, TypeModel, TypeModelRef};
pub use provider::TypeModelProvider;
pub use schema::{
    Declarations, FlatEnum, FlatType, IndexedVector, Memory, SharedString, TypeKey,
};
pub use serializer::Serializer;
pub use value::{MapKey, Value};

pub use flatforge_derive::{FlatEnum, FlatStruct, FlatTable, FlatUnion};
