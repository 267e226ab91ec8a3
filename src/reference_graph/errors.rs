use thiserror::Error;

use crate::entity_catalog::EntityCatalogError;
use crate::execution::{ColumnMappingError, ExecutionError};
use crate::query_builder::QueryError;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Catalog(#[from] EntityCatalogError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Mapping(#[from] ColumnMappingError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Cannot include '{reference}': entity '{entity}' declares no such reference")]
    UnknownInclude { entity: String, reference: String },

    #[error("Query over '{entity}' does not select whole entities and cannot be loaded as a graph")]
    NotEntityProjection { entity: String },

    #[error("Insert into '{entity}' did not return a generated key")]
    MissingGeneratedKey { entity: String },
}
