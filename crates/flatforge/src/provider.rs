// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model providers.
//!
//! A [`TypeModelProvider`] maps a [`TypeKey`] to a fresh, uninitialized
//! model, or declines with `Ok(None)`. The container asks its providers in
//! priority order and the first one that answers wins, so a provider
//! registered ahead of the built-ins shadows them.

use crate::error::SchemaError;
use crate::model::{
    EnumModel, FacadeModel, IndexedVectorModel, ListVectorModel, NullableModel, ScalarModel,
    SharedStringModel, StringModel, StructModel, TableModel, TypeFacade, TypeModelRef,
    UnionModel, UnionVectorModel,
};
use crate::schema::{Declarations, TypeDeclaration, TypeKey};
use std::fmt;
use std::sync::Arc;

pub trait TypeModelProvider: Send + Sync + fmt::Debug {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Build a model for `key`, or `Ok(None)` when this provider does not
    /// handle it.
    fn try_create(
        &self,
        key: &TypeKey,
        declarations: &Declarations,
    ) -> Result<Option<TypeModelRef>, SchemaError>;
}

// ---------------------------------------------------------------------------
// Built-in providers
// ---------------------------------------------------------------------------

/// Fixed-width primitives.
#[derive(Debug, Default)]
pub struct ScalarProvider;

impl TypeModelProvider for ScalarProvider {
    fn name(&self) -> &str {
        "scalar"
    }

    fn try_create(
        &self,
        key: &TypeKey,
        _declarations: &Declarations,
    ) -> Result<Option<TypeModelRef>, SchemaError> {
        match key {
            TypeKey::Scalar(kind) => Ok(Some(Arc::new(ScalarModel::new(*kind)))),
            _ => Ok(None),
        }
    }
}

/// Strings, declared types, vectors and nullable wrappers.
#[derive(Debug, Default)]
pub struct DefaultProvider;

impl DefaultProvider {
    fn is_union(key: &TypeKey, declarations: &Declarations) -> bool {
        key.declared_name()
            .and_then(|name| declarations.get(name))
            .is_some_and(|d| matches!(d, TypeDeclaration::Union(_)))
    }
}

impl TypeModelProvider for DefaultProvider {
    fn name(&self) -> &str {
        "default"
    }

    fn try_create(
        &self,
        key: &TypeKey,
        declarations: &Declarations,
    ) -> Result<Option<TypeModelRef>, SchemaError> {
        let model: TypeModelRef = match key {
            TypeKey::String => Arc::new(StringModel::new()),
            TypeKey::SharedString => Arc::new(SharedStringModel::new()),
            TypeKey::Named(name) => match declarations.get(name) {
                Some(TypeDeclaration::Table(d)) => Arc::new(TableModel::new(d.clone())),
                Some(TypeDeclaration::Struct(d)) => Arc::new(StructModel::new(d.clone())),
                Some(TypeDeclaration::Enum(d)) => Arc::new(EnumModel::new(d.clone())),
                Some(TypeDeclaration::Union(d)) => Arc::new(UnionModel::new(d.clone())),
                None => return Ok(None),
            },
            TypeKey::Vector { kind, item } => {
                if Self::is_union(item, declarations) {
                    Arc::new(UnionVectorModel::new(*kind, (**item).clone()))
                } else {
                    Arc::new(ListVectorModel::new(*kind, (**item).clone()))
                }
            }
            TypeKey::Indexed {
                kind,
                key: map_key,
                value,
            } => Arc::new(IndexedVectorModel::new(
                *kind,
                (**map_key).clone(),
                (**value).clone(),
            )),
            TypeKey::Nullable(inner) => Arc::new(NullableModel::new((**inner).clone())),
            TypeKey::Scalar(_) => return Ok(None),
        };
        Ok(Some(model))
    }
}

// ---------------------------------------------------------------------------
// User facades
// ---------------------------------------------------------------------------

/// Serves one [`TypeFacade`] under its exposed key.
#[derive(Debug)]
pub struct FacadeProvider {
    key: TypeKey,
    name: String,
    facade: Arc<dyn TypeFacade>,
}

impl FacadeProvider {
    pub fn new(facade: Arc<dyn TypeFacade>) -> Self {
        let key = facade.type_key();
        Self {
            name: format!("facade:{}", key),
            key,
            facade,
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.key
    }
}

impl TypeModelProvider for FacadeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_create(
        &self,
        key: &TypeKey,
        _declarations: &Declarations,
    ) -> Result<Option<TypeModelRef>, SchemaError> {
        if *key != self.key {
            return Ok(None);
        }
        Ok(Some(Arc::new(FacadeModel::new(self.facade.clone()))))
    }
}

/// Providers every default container starts with, highest priority first.
pub fn default_providers() -> Vec<Arc<dyn TypeModelProvider>> {
    vec![Arc::new(ScalarProvider), Arc::new(DefaultProvider)]
}
