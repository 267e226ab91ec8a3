//! Saving and loading entities together with their references.
//!
//! [`GraphLoader`] drives a blocking [`Executor`], [`AsyncGraphLoader`] an
//! [`AsyncExecutor`]. Both compile exactly the same statements; only the
//! execute step differs.
//!
//! Saving walks the graph depth-first. Each node is persisted once per
//! call, children holding the parent's key get it before they are saved,
//! and parents holding a child's key are updated once that child has a key.
//! Loading runs the root query and then one batched query per reference
//! property, never one per row.

pub mod entity_graph;
pub mod errors;
pub mod load;
pub mod reference_plan;
pub mod save;

use crate::dialect::DialectRef;
use crate::execution::{AsyncExecutor, Executor};

pub use entity_graph::{EntityGraph, RefValue};
pub use errors::GraphError;
pub use reference_plan::{plan_references, Include, ReferencePlan};

pub struct GraphLoader<E: Executor> {
    executor: E,
    dialect: DialectRef,
}

impl<E: Executor> GraphLoader<E> {
    pub fn new(executor: E, dialect: DialectRef) -> Self {
        Self { executor, dialect }
    }

    pub fn dialect(&self) -> &DialectRef {
        &self.dialect
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }
}

pub struct AsyncGraphLoader<E: AsyncExecutor> {
    executor: E,
    dialect: DialectRef,
}

impl<E: AsyncExecutor> AsyncGraphLoader<E> {
    pub fn new(executor: E, dialect: DialectRef) -> Self {
        Self { executor, dialect }
    }

    pub fn dialect(&self) -> &DialectRef {
        &self.dialect
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }
}
