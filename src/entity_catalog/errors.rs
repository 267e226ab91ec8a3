use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EntityCatalogError {
    #[error("Entity '{0}' has no primary key (flag a field with primary_key() or name one 'Id')")]
    MissingPrimaryKey(String),

    #[error("Field '{field}' not found on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("Reference '{reference}' not found on entity '{entity}'")]
    UnknownReference { entity: String, reference: String },

    #[error(
        "Cannot find a foreign key linking '{parent}.{reference}' to '{child}' \
         (declare references::<{parent}>() on the child, or a '{parent}Id' field)"
    )]
    ReferenceKeyNotFound {
        parent: String,
        reference: String,
        child: String,
    },
}
