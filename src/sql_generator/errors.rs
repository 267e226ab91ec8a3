use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    #[error("Unsupported expression '{construct}': {reason}")]
    UnsupportedExpression { construct: String, reason: String },
}

impl TranslateError {
    pub fn unsupported(construct: impl Into<String>, reason: impl Into<String>) -> Self {
        TranslateError::UnsupportedExpression {
            construct: construct.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AliasError {
    #[error(
        "Alias '{alias}' is already bound in this query (join '{entity}' again with an explicit alias)"
    )]
    Collision { alias: String, entity: String },

    #[error("Entity '{0}' is not part of this query")]
    Unbound(String),

    #[error("Entity '{0}' is joined more than once; qualify the column with an alias marker")]
    Ambiguous(String),

    #[error("Alias '{0}' is not bound in this query")]
    UnknownAlias(String),
}
