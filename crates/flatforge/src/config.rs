// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flatforge configuration: wire-format constants and serializer options.
//!
//! - **Level 1 (Static)**: FlatBuffers wire constants. Never hardcode these
//!   elsewhere.
//! - **Level 2 (Dynamic)**: [`SerializerOptions`], built in code or loaded
//!   from YAML with the `config-loaders` feature.

use crate::layout::max_padding;

// =======================================================================
// FlatBuffers wire format
// =======================================================================

/// Unsigned forward offset to a referenced object.
pub const UOFFSET_SIZE: usize = 4;

/// Signed offset from a table to its vtable.
pub const SOFFSET_SIZE: usize = 4;

/// Vtable entry (field offset relative to the table start).
pub const VOFFSET_SIZE: usize = 2;

/// Vtable length plus table inline length.
pub const VTABLE_HEADER_SIZE: usize = 2 * VOFFSET_SIZE;

/// Vector element count prefix.
pub const VECTOR_LENGTH_SIZE: usize = 4;

/// Minimum bytes of any vector: count field plus its worst-case padding.
pub const VECTOR_MIN_SIZE: usize = VECTOR_LENGTH_SIZE + max_padding(VECTOR_LENGTH_SIZE);

/// Length of the optional root file identifier.
pub const FILE_IDENTIFIER_LENGTH: usize = 4;

/// Union discriminators are a byte and 0 means "none".
pub const MAX_UNION_ALTERNATIVES: usize = u8::MAX as usize;

/// Vtable entries are u16, so neither a table nor its vtable may exceed this.
pub const MAX_VTABLE_BYTES: usize = u16::MAX as usize;

// =======================================================================
// Serializer defaults
// =======================================================================

pub const DEFAULT_MAX_DEPTH: usize = 1000;
pub const DEFAULT_SHARED_STRING_CACHE_SIZE: usize = 1024;

/// How sorted vectors exposed as indexed vectors are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-loaders", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config-loaders", serde(rename_all = "lowercase"))]
pub enum DeserializationMode {
    /// Indexed vectors become maps.
    #[default]
    Greedy,
    /// Indexed vectors stay in wire order as plain vectors.
    Lazy,
}

/// Runtime knobs of a compiled serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config-loaders", serde(default))]
pub struct SerializerOptions {
    pub deserialization: DeserializationMode,
    /// Maximum nesting of tables, vectors and unions accepted on parse.
    pub max_depth: usize,
    /// LRU capacity of the shared-string writer; 0 disables deduplication.
    pub shared_string_cache_size: usize,
    pub deduplicate_vtables: bool,
    /// Reject buffers whose root file identifier does not match.
    pub verify_file_identifier: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            deserialization: DeserializationMode::Greedy,
            max_depth: DEFAULT_MAX_DEPTH,
            shared_string_cache_size: DEFAULT_SHARED_STRING_CACHE_SIZE,
            deduplicate_vtables: true,
            verify_file_identifier: true,
        }
    }
}

impl SerializerOptions {
    pub fn with_deserialization(mut self, mode: DeserializationMode) -> Self {
        self.deserialization = mode;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_shared_string_cache_size(mut self, size: usize) -> Self {
        self.shared_string_cache_size = size;
        self
    }

    pub fn with_deduplicate_vtables(mut self, enabled: bool) -> Self {
        self.deduplicate_vtables = enabled;
        self
    }

    pub fn with_verify_file_identifier(mut self, enabled: bool) -> Self {
        self.verify_file_identifier = enabled;
        self
    }

    /// Parse options from a YAML document. Missing keys keep their defaults.
    ///
    /// ```rust,ignore
    /// let opts = SerializerOptions::from_yaml_str("deserialization: lazy\nmax_depth: 64\n")?;
    /// ```
    #[cfg(feature = "config-loaders")]
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load options from a YAML file.
    #[cfg(feature = "config-loaders")]
    pub fn load_yaml<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}
