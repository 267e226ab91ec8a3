use thiserror::Error;

use crate::config::ConfigError;
use crate::entity_catalog::EntityCatalogError;
use crate::execution::{ColumnMappingError, ExecutionError};
use crate::query_builder::QueryError;
use crate::reference_graph::GraphError;
use crate::sql_generator::{AliasError, TranslateError};

/// Any error the crate can return.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Entity catalog error: {0}")]
    Catalog(#[from] EntityCatalogError),

    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Alias error: {0}")]
    Alias(#[from] AliasError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Column mapping error: {0}")]
    ColumnMapping(#[from] ColumnMappingError),

    #[error("Reference graph error: {0}")]
    Graph(GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<GraphError> for OrmError {
    fn from(error: GraphError) -> Self {
        // Driver errors pass through unwrapped
        match error {
            GraphError::Execution(e) => OrmError::Execution(e),
            other => OrmError::Graph(other),
        }
    }
}
