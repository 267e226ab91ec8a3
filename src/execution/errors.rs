use std::fmt;

use thiserror::Error;

/// Failure reported by an executor.
///
/// The loader never inspects these; they reach the caller unmodified, with
/// the driver's message and source chain intact.
#[derive(Debug)]
pub struct ExecutionError(Box<dyn std::error::Error + Send + Sync>);

impl ExecutionError {
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(error.into())
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.0
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ColumnMappingError {
    #[error("No column matches field(s) {fields:?} of entity '{entity}'")]
    ColumnMappingMismatch { entity: String, fields: Vec<String> },

    #[error("Tuple groups cover {expected} columns but the row has {actual}")]
    TupleWidth { expected: usize, actual: usize },
}
