//! ormgraph - typed SQL query building and reference-graph persistence
//!
//! This crate compiles typed predicate expressions into dialect-specific SQL
//! and loads or saves entities together with the entities they reference:
//! - Entity metadata declared once per Rust type and memoized process-wide
//! - An expression DSL with typed column handles and SQL marker helpers
//! - A fluent query builder with joins, aliases, filters and projections
//! - Parameter numbering that stays contiguous across merged sub-queries
//! - Batched reference loading and cycle-safe graph saving over a
//!   caller-supplied executor

pub mod config;
pub mod dialect;
pub mod entity_catalog;
pub mod errors;
pub mod execution;
pub mod expression;
pub mod query_builder;
pub mod reference_graph;
pub mod sql_generator;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use config::OrmSettings;
pub use dialect::{
    Dialect, DialectRef, MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect,
    SqliteDialect,
};
pub use entity_catalog::{metadata, Entity, EntityDescriptor, EntityMetadata, FieldDef, ReferenceDef};
pub use errors::OrmError;
pub use execution::{AsyncExecutor, ExecutionError, Executor, Row, RowMapper};
pub use expression::{sql, Col, Expr, IntoExpr};
pub use query_builder::{CompiledSql, Query, QueryError, ResultShape};
pub use reference_graph::{AsyncGraphLoader, EntityGraph, GraphError, GraphLoader, Include, RefValue};
pub use value::{SqlType, Value};
