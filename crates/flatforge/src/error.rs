// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for schema resolution, serialization and parsing.
//!
//! Three failure domains are kept apart:
//!
//! - [`SchemaError`]: the declared type graph is invalid (raised while the
//!   `TypeModelContainer` resolves and validates models).
//! - [`SerializeError`]: a value cannot be written with a valid schema.
//! - [`ParseError`]: the buffer is corrupt, or a required field is absent.
//!
//! [`Error`] wraps all of them for callers that do not care about the split.

use crate::schema::TypeKey;
use std::fmt;

/// Schema definition and resolution failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A declared type violates a structural rule.
    InvalidType { type_name: String, reason: String },
    /// A member of a table, struct or union violates a structural rule.
    InvalidMember {
        type_name: String,
        member: String,
        reason: String,
    },
    /// Two table members claim the same vtable slot.
    IndexConflict {
        type_name: String,
        index: u16,
        first: String,
        second: String,
    },
    /// A different declaration was already registered under this name.
    DuplicateDeclaration(String),
    /// No registered provider can build a model for the type.
    CannotResolve(TypeKey),
    /// Validation depends on a model that has not validated yet.
    ///
    /// Only ever raised inside the container's validation queue, where it is
    /// retried; it surfaces to callers only if the queue stalls.
    DependencyPending {
        type_name: String,
        dependency: TypeKey,
    },
    /// Serializers can only be compiled for table roots.
    InvalidRoot(TypeKey),
    /// The model graph has no entry for the key.
    MissingModel(TypeKey),
}

impl SchemaError {
    pub(crate) fn invalid_type(type_name: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_member(
        type_name: impl fmt::Display,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidMember {
            type_name: type_name.to_string(),
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// True for transient failures the validation queue may retry.
    pub fn is_deferral(&self) -> bool {
        matches!(self, Self::DependencyPending { .. })
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::InvalidType { type_name, reason } => {
                write!(f, "invalid type '{}': {}", type_name, reason)
            }
            SchemaError::InvalidMember {
                type_name,
                member,
                reason,
            } => write!(f, "invalid member '{}.{}': {}", type_name, member, reason),
            SchemaError::IndexConflict {
                type_name,
                index,
                first,
                second,
            } => write!(
                f,
                "table '{}': members '{}' and '{}' both claim vtable slot {}",
                type_name, first, second, index
            ),
            SchemaError::DuplicateDeclaration(name) => {
                write!(f, "conflicting declarations for type '{}'", name)
            }
            SchemaError::CannotResolve(key) => write!(f, "cannot resolve type '{}'", key),
            SchemaError::DependencyPending {
                type_name,
                dependency,
            } => write!(
                f,
                "type '{}' cannot validate before '{}' is validated",
                type_name, dependency
            ),
            SchemaError::InvalidRoot(key) => {
                write!(f, "type '{}' cannot be a root: only tables are allowed", key)
            }
            SchemaError::MissingModel(key) => write!(f, "no model for type '{}'", key),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Failures while writing a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SerializeError {
    /// The target span cannot hold the allocation.
    BufferTooSmall {
        offset: usize,
        needed: usize,
        capacity: usize,
    },
    /// The value shape does not match the type model.
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// A numeric value does not fit the scalar width.
    OutOfRange { type_name: String, value: String },
    /// A non-nullable value was null.
    NullValue { type_name: String },
    /// A vector element was null.
    NullVectorItem { type_name: String, index: usize },
    /// A required table member was left unset.
    RequiredField { type_name: String, member: String },
    /// A union value carries a discriminator outside its alternatives.
    InvalidDiscriminator { union: String, discriminator: u8 },
    /// A table stored in a sorted vector has no key value.
    MissingSortKey { type_name: String },
    /// A map entry disagrees with the key stored in its table.
    KeyMismatch { type_name: String, key: String },
    /// A relative offset does not fit its wire width.
    OffsetOverflow { offset: usize },
    /// The member path does not name a write-through member.
    NotWriteThrough { path: String },
    /// A user facade conversion failed.
    Facade { type_name: String, reason: String },
    /// The compiled graph was inconsistent.
    Schema(SchemaError),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::BufferTooSmall {
                offset,
                needed,
                capacity,
            } => write!(
                f,
                "buffer too small: {} bytes needed at offset {}, capacity {}",
                needed, offset, capacity
            ),
            SerializeError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            SerializeError::OutOfRange { type_name, value } => {
                write!(f, "value {} out of range for {}", value, type_name)
            }
            SerializeError::NullValue { type_name } => {
                write!(f, "null value for non-nullable type '{}'", type_name)
            }
            SerializeError::NullVectorItem { type_name, index } => {
                write!(f, "null item at index {} of vector '{}'", index, type_name)
            }
            SerializeError::RequiredField { type_name, member } => {
                write!(f, "required field '{}.{}' is not set", type_name, member)
            }
            SerializeError::InvalidDiscriminator {
                union,
                discriminator,
            } => write!(
                f,
                "union '{}' has no alternative for discriminator {}",
                union, discriminator
            ),
            SerializeError::MissingSortKey { type_name } => {
                write!(f, "sorted vector item '{}' has no key value", type_name)
            }
            SerializeError::KeyMismatch { type_name, key } => write!(
                f,
                "map key {} does not match the key stored in table '{}'",
                key, type_name
            ),
            SerializeError::OffsetOverflow { offset } => {
                write!(f, "offset {} does not fit its wire representation", offset)
            }
            SerializeError::NotWriteThrough { path } => {
                write!(f, "'{}' is not a write-through member", path)
            }
            SerializeError::Facade { type_name, reason } => {
                write!(f, "facade '{}' conversion failed: {}", type_name, reason)
            }
            SerializeError::Schema(err) => write!(f, "schema error: {}", err),
        }
    }
}

impl std::error::Error for SerializeError {}

impl From<SchemaError> for SerializeError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Failures while reading a buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A read ran past the end of the buffer.
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },
    /// A relative offset points outside the buffer or backwards.
    InvalidOffset { offset: usize },
    /// A union discriminator is outside the declared alternatives.
    InvalidUnionDiscriminator { union: String, discriminator: u8 },
    /// Nesting exceeded the configured depth limit.
    DepthExceeded { limit: usize },
    /// A required table member is absent from the buffer.
    RequiredFieldMissing { type_name: String, member: String },
    /// String bytes are not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// An enum value has no host counterpart.
    UnknownEnumValue { type_name: String, value: i128 },
    /// Discriminator and value vectors of a union vector disagree.
    InconsistentUnionVector { type_name: String },
    /// The root file identifier does not match the schema.
    FileIdentifierMismatch { expected: [u8; 4], found: [u8; 4] },
    /// A user facade conversion failed.
    Facade { type_name: String, reason: String },
    /// The compiled graph was inconsistent.
    Schema(SchemaError),
}

impl ParseError {
    /// True when the error reflects bad data rather than bad schema usage.
    pub fn is_data_corruption(&self) -> bool {
        !matches!(
            self,
            ParseError::RequiredFieldMissing { .. }
                | ParseError::Facade { .. }
                | ParseError::Schema(_)
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::OutOfBounds {
                offset,
                len,
                buffer_len,
            } => write!(
                f,
                "read of {} bytes at offset {} exceeds buffer length {}",
                len, offset, buffer_len
            ),
            ParseError::InvalidOffset { offset } => {
                write!(f, "invalid offset at {}", offset)
            }
            ParseError::InvalidUnionDiscriminator {
                union,
                discriminator,
            } => write!(
                f,
                "invalid discriminator {} for union '{}'",
                discriminator, union
            ),
            ParseError::DepthExceeded { limit } => {
                write!(f, "object depth limit {} exceeded", limit)
            }
            ParseError::RequiredFieldMissing { type_name, member } => {
                write!(f, "required field '{}.{}' is missing", type_name, member)
            }
            ParseError::InvalidUtf8 { offset } => {
                write!(f, "string at offset {} is not valid UTF-8", offset)
            }
            ParseError::UnknownEnumValue { type_name, value } => {
                write!(f, "value {} is not a member of enum '{}'", value, type_name)
            }
            ParseError::InconsistentUnionVector { type_name } => write!(
                f,
                "union vector '{}' has mismatched discriminator and value vectors",
                type_name
            ),
            ParseError::FileIdentifierMismatch { expected, found } => write!(
                f,
                "file identifier mismatch: expected {:?}, found {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(found)
            ),
            ParseError::Facade { type_name, reason } => {
                write!(f, "facade '{}' conversion failed: {}", type_name, reason)
            }
            ParseError::Schema(err) => write!(f, "schema error: {}", err),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<SchemaError> for ParseError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Umbrella error for callers that mix resolution, serialization and parsing.
#[derive(Debug)]
pub enum Error {
    Schema(SchemaError),
    Serialize(SerializeError),
    Parse(ParseError),
    /// Options could not be loaded.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(e) => write!(f, "{}", e),
            Error::Serialize(e) => write!(f, "{}", e),
            Error::Parse(e) => write!(f, "{}", e),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Schema(e) => Some(e),
            Error::Serialize(e) => Some(e),
            Error::Parse(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<SchemaError> for Error {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<SerializeError> for Error {
    fn from(value: SerializeError) -> Self {
        Self::Serialize(value)
    }
}

impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
pub type SerializeResult<T> = std::result::Result<T, SerializeError>;
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    #[test]
    fn test_schema_error_names_type_and_member() {
        let err = SchemaError::invalid_member("Monster", "inventory", "vectors of vectors");
        assert_eq!(
            err.to_string(),
            "invalid member 'Monster.inventory': vectors of vectors"
        );

        let err = SchemaError::IndexConflict {
            type_name: "Monster".into(),
            index: 3,
            first: "hp".into(),
            second: "mana".into(),
        };
        assert!(err.to_string().contains("'hp' and 'mana'"));
        assert!(err.to_string().contains("slot 3"));
    }

    #[test]
    fn test_only_pending_dependencies_are_deferrals() {
        let pending = SchemaError::DependencyPending {
            type_name: "Monster".into(),
            dependency: TypeKey::String,
        };
        assert!(pending.is_deferral());
        assert!(!SchemaError::CannotResolve(TypeKey::Scalar(ScalarKind::I32)).is_deferral());
    }

    #[test]
    fn test_parse_error_corruption_split() {
        assert!(ParseError::DepthExceeded { limit: 4 }.is_data_corruption());
        assert!(ParseError::InvalidUnionDiscriminator {
            union: "Any".into(),
            discriminator: 9
        }
        .is_data_corruption());
        assert!(!ParseError::RequiredFieldMissing {
            type_name: "Monster".into(),
            member: "name".into()
        }
        .is_data_corruption());
    }

    #[test]
    fn test_umbrella_error_conversions() {
        let err: Error = SerializeError::OffsetOverflow { offset: 12 }.into();
        match err {
            Error::Serialize(SerializeError::OffsetOverflow { offset }) => assert_eq!(offset, 12),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
