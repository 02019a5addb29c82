// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State threaded through the runtime serialize and parse operations.

use crate::buffer::InputBuffer;
use crate::config::SerializerOptions;
use crate::context::SerializationContext;
use crate::error::{ParseError, ParseResult, SerializeError, SerializeResult};
use crate::graph::ModelGraph;
use crate::model::TypeModelRef;
use crate::schema::TypeKey;
use crate::sorted::{self, SortKeySpec};

/// Write-side state: the target span, its allocator and the model graph.
pub struct Writer<'a> {
    pub span: &'a mut [u8],
    pub context: &'a mut SerializationContext,
    pub graph: &'a ModelGraph,
}

impl<'a> Writer<'a> {
    pub fn new(
        span: &'a mut [u8],
        context: &'a mut SerializationContext,
        graph: &'a ModelGraph,
    ) -> Self {
        Self {
            span,
            context,
            graph,
        }
    }

    pub fn model(&self, key: &TypeKey) -> SerializeResult<TypeModelRef> {
        Ok(self.graph.model(key)?.clone())
    }

    /// Absolute target of the uoffset already written at `slot`.
    pub fn follow_uoffset(&self, slot: usize) -> SerializeResult<usize> {
        let span: &[u8] = &*self.span;
        span.read_uoffset(slot)
            .map_err(|_| SerializeError::OffsetOverflow { offset: slot })
    }

    /// Sort the vector of tables at `vector` once the buffer is complete.
    pub fn schedule_sort(&mut self, vector: usize, key: SortKeySpec) {
        self.context.add_post_serialize_action(Box::new(move |span: &mut [u8]| {
            sorted::sort_vector_of_tables(span, vector, &key)
        }));
    }
}

/// Read-side state.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    pub buffer: &'a [u8],
    pub graph: &'a ModelGraph,
    pub options: &'a SerializerOptions,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8], graph: &'a ModelGraph, options: &'a SerializerOptions) -> Self {
        Self {
            buffer,
            graph,
            options,
        }
    }

    pub fn model(&self, key: &TypeKey) -> ParseResult<TypeModelRef> {
        Ok(self.graph.model(key)?.clone())
    }

    /// Step one nesting level down, enforcing the depth limit.
    pub fn enter(&self, depth: usize) -> ParseResult<usize> {
        let next = depth + 1;
        if next > self.options.max_depth {
            return Err(ParseError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(next)
    }
}
