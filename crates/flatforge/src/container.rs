// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model resolution engine.
//!
//! [`TypeModelContainer`] turns type keys into validated [`TypeModel`]s:
//!
//! 1. Cached keys return the cached model (one instance per key).
//! 2. Otherwise providers are asked in priority order; the first answer wins.
//! 3. The new model is cached *before* `initialize`, so cyclic schemas find
//!    it while it is still being built.
//! 4. Once the outermost resolution has materialized the graph, every new
//!    model is validated. Validations failing with a pending dependency are
//!    retried until the queue drains or stops making progress.
//! 5. Any failure removes every model added by the call.
//!
//! A single lock covers the whole transaction, so concurrent callers always
//! see the cache as it was before or after a complete resolution.
//!
//! [`TypeModel`]: crate::model::TypeModel

use crate::config::SerializerOptions;
use crate::error::SchemaError;
use crate::graph::ModelGraph;
use crate::model::{TypeFacade, TypeModelRef};
use crate::provider::{default_providers, FacadeProvider, TypeModelProvider};
use crate::schema::{Declarations, FlatType, TypeKey};
use crate::serializer::Serializer;
use parking_lot::Mutex;
use std::sync::Arc;

/// Mutable container state guarded by the container lock.
#[derive(Debug)]
pub struct ResolverState {
    graph: ModelGraph,
    declarations: Declarations,
    /// User-registered providers, first registered first.
    user_providers: Vec<Arc<dyn TypeModelProvider>>,
    builtin_providers: Vec<Arc<dyn TypeModelProvider>>,
    /// Keys added by the running transaction, in discovery order.
    pending: Vec<TypeKey>,
    depth: usize,
}

impl ResolverState {
    fn new(builtin_providers: Vec<Arc<dyn TypeModelProvider>>) -> Self {
        Self {
            graph: ModelGraph::new(),
            declarations: Declarations::new(),
            user_providers: Vec::new(),
            builtin_providers,
            pending: Vec::new(),
            depth: 0,
        }
    }

    fn create(&self, key: &TypeKey) -> Result<TypeModelRef, SchemaError> {
        let providers = self.user_providers.iter().chain(&self.builtin_providers);
        for provider in providers {
            if let Some(model) = provider.try_create(key, &self.declarations)? {
                if model.type_key() != key {
                    return Err(SchemaError::invalid_type(
                        key,
                        format!(
                            "provider '{}' returned a model for '{}'",
                            provider.name(),
                            model.type_key()
                        ),
                    ));
                }
                log::trace!(
                    "[TypeModelContainer] provider '{}' created '{}' at depth {}",
                    provider.name(),
                    key,
                    self.depth
                );
                return Ok(model);
            }
        }
        Err(SchemaError::CannotResolve(key.clone()))
    }

    /// Validate every pending model, retrying deferrals while each pass
    /// settles at least one of them.
    fn drain_validation_queue(&mut self) -> Result<(), SchemaError> {
        let mut queue = self.pending.clone();
        while !queue.is_empty() {
            let before = queue.len();
            let mut deferred = Vec::new();
            let mut blocked = Vec::new();
            for key in queue {
                let model = self.graph.model(&key)?.clone();
                match model.validate(&self.graph) {
                    Ok(()) => self.graph.mark_validated(&key),
                    Err(e) if e.is_deferral() => {
                        log::trace!("[TypeModelContainer] deferring '{}': {}", key, e);
                        blocked.push(e);
                        deferred.push(key);
                    }
                    Err(e) => return Err(e),
                }
            }
            if deferred.len() == before {
                return Err(stalled(&deferred, &blocked));
            }
            queue = deferred;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        for key in self.pending.drain(..) {
            self.graph.remove(&key);
        }
    }

    fn transaction(&mut self, key: &TypeKey) -> Result<TypeModelRef, SchemaError> {
        if let Some(model) = self.graph.get(key) {
            return Ok(model.clone());
        }
        self.pending.clear();
        let resolved = Resolver { state: &mut *self }.resolve(key);
        let result = resolved.and_then(|model| self.drain_validation_queue().map(|()| model));
        match result {
            Ok(model) => {
                log::debug!(
                    "[TypeModelContainer] resolved '{}' ({} new models)",
                    key,
                    self.pending.len()
                );
                self.pending.clear();
                Ok(model)
            }
            Err(e) => {
                log::debug!(
                    "[TypeModelContainer] resolving '{}' failed, rolling back {} models: {}",
                    key,
                    self.pending.len(),
                    e
                );
                self.rollback();
                Err(e)
            }
        }
    }
}

/// Hard failure for a validation sweep that settled nothing. Names every
/// blocked type in queue order.
fn stalled(keys: &[TypeKey], blocked: &[SchemaError]) -> SchemaError {
    let details: Vec<String> = blocked
        .iter()
        .map(|e| match e {
            SchemaError::DependencyPending {
                type_name,
                dependency,
            } => format!("'{}' waits on '{}'", type_name, dependency),
            other => other.to_string(),
        })
        .collect();
    let first = keys
        .first()
        .map_or_else(|| "<empty>".to_owned(), ToString::to_string);
    SchemaError::invalid_type(
        first,
        format!("validation did not converge: {}", details.join(", ")),
    )
}

/// Handle passed to `TypeModel::initialize` for resolving children.
pub struct Resolver<'a> {
    state: &'a mut ResolverState,
}

impl Resolver<'_> {
    /// Cached model for `key`, creating and initializing it when absent.
    ///
    /// A model returned while its own initialization is still running has
    /// an empty layout; callers that need a layout treat that as a cycle.
    pub fn resolve(&mut self, key: &TypeKey) -> Result<TypeModelRef, SchemaError> {
        if let Some(model) = self.state.graph.get(key) {
            return Ok(model.clone());
        }
        let model = self.state.create(key)?;
        self.state.graph.insert(key.clone(), model.clone());
        self.state.pending.push(key.clone());

        self.state.depth += 1;
        let result = model.initialize(self);
        self.state.depth -= 1;
        result?;
        Ok(model)
    }

    pub fn declarations(&self) -> &Declarations {
        &self.state.declarations
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.state.graph
    }

    /// Nesting level of the model currently initializing (1 for the root).
    pub fn depth(&self) -> usize {
        self.state.depth
    }
}

/// Registry of providers and cache of resolved models.
#[derive(Debug)]
pub struct TypeModelContainer {
    state: Mutex<ResolverState>,
}

impl Default for TypeModelContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeModelContainer {
    /// Container with the scalar and built-in providers registered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ResolverState::new(default_providers())),
        }
    }

    /// Container with no providers at all.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(ResolverState::new(Vec::new())),
        }
    }

    pub fn with_declarations(declarations: Declarations) -> Self {
        let container = Self::new();
        container.state.lock().declarations = declarations;
        container
    }

    /// Add declarations. Names already declared identically are accepted.
    pub fn add_declarations(&self, declarations: Declarations) -> Result<(), SchemaError> {
        self.state.lock().declarations.extend(declarations)
    }

    /// Register the declarations `T` needs and return its key.
    pub fn declare<T: FlatType>(&self) -> Result<TypeKey, SchemaError> {
        let mut declarations = Declarations::new();
        T::declare(&mut declarations)?;
        self.add_declarations(declarations)?;
        Ok(T::type_key())
    }

    /// Register a provider ahead of the built-ins. Providers registered
    /// earlier keep priority over later ones.
    pub fn register_provider(&self, provider: Arc<dyn TypeModelProvider>) {
        let mut state = self.state.lock();
        log::debug!(
            "[TypeModelContainer] registered provider '{}'",
            provider.name()
        );
        state.user_providers.push(provider);
    }

    pub fn register_type_facade(&self, facade: Arc<dyn TypeFacade>) {
        self.register_provider(Arc::new(FacadeProvider::new(facade)));
    }

    pub fn resolve(&self, key: &TypeKey) -> Result<TypeModelRef, SchemaError> {
        self.state.lock().transaction(key)
    }

    /// Like [`resolve`](Self::resolve) but reports failure as `None`.
    pub fn try_resolve(&self, key: &TypeKey) -> Option<TypeModelRef> {
        self.resolve(key).ok()
    }

    /// Declare and resolve a host type.
    pub fn resolve_type<T: FlatType>(&self) -> Result<TypeModelRef, SchemaError> {
        let key = self.declare::<T>()?;
        self.resolve(&key)
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.state.lock().graph.contains(key)
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.state.lock().graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the model graph reachable from `root`.
    pub fn graph_for(&self, root: &TypeKey) -> Result<ModelGraph, SchemaError> {
        self.state.lock().graph.subgraph(root)
    }

    /// Resolve `root`, which must be a table, and freeze its graph into a
    /// serializer.
    pub fn compile_serializer(
        &self,
        root: &TypeKey,
        options: SerializerOptions,
    ) -> Result<Serializer, SchemaError> {
        let mut state = self.state.lock();
        let model = state.transaction(root)?;
        if model.as_table().is_none() {
            return Err(SchemaError::InvalidRoot(root.clone()));
        }
        let graph = state.graph.subgraph(root)?;
        log::debug!(
            "[TypeModelContainer] compiled serializer for '{}' ({} models)",
            root,
            graph.len()
        );
        Ok(Serializer::new(Arc::new(graph), root.clone(), options))
    }

    pub fn compile_serializer_for<T: FlatType>(
        &self,
        options: SerializerOptions,
    ) -> Result<Serializer, SchemaError> {
        let key = self.declare::<T>()?;
        self.compile_serializer(&key, options)
    }
}
