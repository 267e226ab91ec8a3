use thiserror::Error;

use crate::entity_catalog::EntityCatalogError;
use crate::sql_generator::{AliasError, TranslateError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Catalog(#[from] EntityCatalogError),

    #[error("Raw SQL references parameter {{{index}}} but only {provided} were supplied: {sql}")]
    MissingRawParameter {
        index: usize,
        provided: usize,
        sql: String,
    },

    #[error("Raw SQL references named parameter '{0}' which was not supplied")]
    MissingNamedParameter(String),

    #[error("No foreign key links '{target}' to any table already in the query")]
    NoJoinCondition { target: String },

    #[error("Update of '{entity}' has no column to set")]
    EmptyUpdate { entity: String },
}
