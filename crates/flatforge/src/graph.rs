// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key-indexed model arena.
//!
//! Models never own their children: they store [`TypeKey`]s and look them up
//! here. This keeps cyclic schemas (a table holding a vector of itself)
//! representable without reference cycles.

use crate::error::SchemaError;
use crate::model::TypeModelRef;
use crate::schema::TypeKey;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct ModelEntry {
    model: TypeModelRef,
    validated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    entries: HashMap<TypeKey, ModelEntry>,
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TypeKey) -> Option<&TypeModelRef> {
        self.entries.get(key).map(|e| &e.model)
    }

    /// Lookup that fails with [`SchemaError::MissingModel`].
    pub fn model(&self, key: &TypeKey) -> Result<&TypeModelRef, SchemaError> {
        self.get(key)
            .ok_or_else(|| SchemaError::MissingModel(key.clone()))
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_validated(&self, key: &TypeKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.validated)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn insert(&mut self, key: TypeKey, model: TypeModelRef) {
        self.entries.insert(
            key,
            ModelEntry {
                model,
                validated: false,
            },
        );
    }

    pub(crate) fn remove(&mut self, key: &TypeKey) {
        self.entries.remove(key);
    }

    pub(crate) fn mark_validated(&mut self, key: &TypeKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.validated = true;
        }
    }

    /// Depth-first preorder of every key reachable from `root`, following
    /// `children()`. Each key is visited once, so cycles terminate.
    pub fn reachable(&self, root: &TypeKey) -> Result<Vec<TypeKey>, SchemaError> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(key) = stack.pop() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let model = self.model(&key)?;
            // Reverse so the first child is visited first.
            for child in model.children().into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
            order.push(key);
        }
        Ok(order)
    }

    /// Copy of the part of the graph reachable from `root`.
    pub fn subgraph(&self, root: &TypeKey) -> Result<ModelGraph, SchemaError> {
        let mut graph = ModelGraph::new();
        for key in self.reachable(root)? {
            if let Some(entry) = self.entries.get(&key) {
                graph.entries.insert(key, entry.clone());
            }
        }
        Ok(graph)
    }
}
