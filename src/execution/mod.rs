//! The seam between compiled SQL and a database driver.
//!
//! The crate never talks to a database itself. Callers implement
//! [`Executor`] (or [`AsyncExecutor`]) over their connection; everything the
//! crate needs is "run this SQL with these ordered parameters".

pub mod errors;
pub mod row_mapper;

use std::sync::Arc;

use async_trait::async_trait;

use crate::value::Value;

pub use errors::{ColumnMappingError, ExecutionError};
pub use row_mapper::RowMapper;

/// Blocking execution collaborator.
pub trait Executor {
    /// Run a statement that returns rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError>;

    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError>;

    /// First column of the first row, if any.
    fn scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>, ExecutionError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        (**self).query(sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        (**self).execute(sql, params)
    }

    fn scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>, ExecutionError> {
        (**self).scalar(sql, params)
    }
}

/// Suspending twin of [`Executor`].
#[async_trait]
pub trait AsyncExecutor: Send {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError>;

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError>;

    async fn scalar(&mut self, sql: &str, params: &[Value])
        -> Result<Option<Value>, ExecutionError>;
}

#[async_trait]
impl<E: AsyncExecutor + ?Sized> AsyncExecutor for &mut E {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        (**self).query(sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        (**self).execute(sql, params).await
    }

    async fn scalar(&mut self, sql: &str, params: &[Value])
        -> Result<Option<Value>, ExecutionError> {
        (**self).scalar(sql, params).await
    }
}

/// One result row. Column names are shared by every row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Row from `(column, value)` pairs, mostly for drivers and tests.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Columns in select order as a JSON object.
    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), serde_json::Value::from(v)))
            .collect()
    }
}

/// Split a row into the column groups of a tuple projection.
pub fn map_tuple_row(row: &Row, groups: &[usize]) -> Result<Vec<Row>, ColumnMappingError> {
    let expected: usize = groups.iter().sum();
    if expected != row.len() {
        return Err(ColumnMappingError::TupleWidth {
            expected,
            actual: row.len(),
        });
    }

    let mut start = 0;
    Ok(groups
        .iter()
        .map(|&width| {
            let end = start + width;
            let part = Row::new(
                row.columns[start..end].to_vec().into(),
                row.values[start..end].to_vec(),
            );
            start = end;
            part
        })
        .collect())
}
